use serde::{Deserialize, Serialize};

use seq_tools::adc_event::AdcEvent;
use seq_tools::gradient_event::GradEvent;
use seq_tools::pulse::{Hardpulse, Pulse};
use seq_tools::scanner::Scanner;
use seq_tools::sequence::{Block, Sequence};

use crate::q_calc;
use crate::SequenceParameters;

/// Symmetric pulsed-gradient spin echo. Two identical trapezoid lobes
/// bracket the refocusing pulse; `separation` is the lobe onset-to-onset
/// time Delta, `delta` the full lobe width.
#[derive(Clone, Serialize, Deserialize)]
pub struct PgseParams {
    pub te: f64,
    pub pulse_duration: f64,
    /// total lobe duration including both ramps
    pub delta: f64,
    /// lobe onset-to-onset time
    pub separation: f64,
    pub ramp: f64,
    /// lobe amplitude in T/m before projection onto the direction
    pub amplitude: f64,
    pub direction: (f64, f64, f64),
    pub n_samples: usize,
    pub dwell: f64,
}

impl Default for PgseParams {
    fn default() -> PgseParams {
        PgseParams {
            te: 35e-3,
            pulse_duration: 0.5e-3,
            delta: 10e-3,
            separation: 20e-3,
            ramp: 2e-4,
            amplitude: 0.05,
            direction: (0.0, 0.0, 1.0),
            n_samples: 32,
            dwell: 5e-5,
        }
    }
}

impl PgseParams {
    fn lobe(&self, scale: f64, delay: f64) -> GradEvent {
        GradEvent::trap(
            self.amplitude * scale,
            delay,
            self.ramp,
            self.delta - 2.0 * self.ramp,
            self.ramp,
        )
    }

    fn unit_direction(&self) -> (f64, f64, f64) {
        let (x, y, z) = self.direction;
        let norm = (x * x + y * y + z * z).sqrt();
        assert!(norm > 0.0, "diffusion direction must be nonzero");
        (x / norm, y / norm, z / norm)
    }

    /// global time of the refocusing pulse center
    pub fn inversion_time(&self) -> f64 {
        self.pulse_duration / 2.0 + self.te / 2.0
    }

    /// global time of the echo
    pub fn echo_time(&self) -> f64 {
        self.pulse_duration / 2.0 + self.te
    }

    /// numeric diffusion weighting of the built sequence, in s/mm^2
    pub fn b_value(&self, scanner: &Scanner) -> f64 {
        let seq = self.build(scanner);
        q_calc::b_si_to_smm2(q_calc::b_value(
            &seq,
            &[self.inversion_time()],
            self.echo_time(),
            10_000,
        ))
    }

    /// solve the lobe amplitude that produces the target weighting by
    /// bisection on [0, g_max]
    pub fn amplitude_for_b(&self, b_smm2: f64, scanner: &Scanner) -> f64 {
        if b_smm2 == 0.0 {
            return 0.0;
        }
        let mut probe = self.clone();
        probe.amplitude = scanner.g_max;
        let b_max = probe.b_value(scanner);
        assert!(b_smm2 <= b_max, "b value out of range: {} > {}", b_smm2, b_max);
        let mut lo = 0.0;
        let mut hi = scanner.g_max;
        for _ in 0..40 {
            let mid = (lo + hi) / 2.0;
            probe.amplitude = mid;
            if probe.b_value(scanner) > b_smm2 {
                hi = mid;
            } else {
                lo = mid;
            }
        }
        (lo + hi) / 2.0
    }

    fn timing(&self) -> (f64, f64, f64, f64) {
        let tau = self.pulse_duration;
        let read = self.n_samples as f64 * self.dwell;
        // lobe 1 starts right after the excitation block
        let d_refocus = self.te / 2.0 - tau - self.delta; // delay inside the 180 block
        let d_lobe2 = self.separation - self.delta - d_refocus - tau; // delay inside lobe-2 block
        let d_adc = self.echo_time()
            - (tau + self.delta + d_refocus + tau + d_lobe2 + self.delta)
            - read / 2.0;
        assert!(d_refocus >= 0.0, "TE too short for the diffusion lobe");
        assert!(d_lobe2 >= 0.0, "separation too short for the refocusing pulse");
        assert!(d_adc >= 0.0, "TE too short for the readout window");
        (d_refocus, d_lobe2, d_adc, read)
    }
}

impl SequenceParameters for PgseParams {
    fn name(&self) -> String {
        String::from("pgse")
    }

    fn build(&self, scanner: &Scanner) -> Sequence {
        assert!(
            self.delta > 2.0 * self.ramp,
            "lobe too short for its ramps"
        );
        assert!(
            self.amplitude.abs() <= scanner.g_max,
            "lobe amplitude exceeds the gradient limit"
        );
        let (d_refocus, d_lobe2, d_adc, _read) = self.timing();
        let (ux, uy, uz) = self.unit_direction();
        let rf90 = Hardpulse::new(self.pulse_duration).to_rf(
            std::f64::consts::FRAC_PI_2,
            scanner.rf_raster,
            0.0,
            0.0,
        );
        let rf180 = Hardpulse::new(self.pulse_duration).to_rf(
            std::f64::consts::PI,
            scanner.rf_raster,
            0.0,
            std::f64::consts::FRAC_PI_2,
        );
        let lobe = |delay: f64| Block {
            gx: (ux != 0.0).then(|| self.lobe(ux, delay)),
            gy: (uy != 0.0).then(|| self.lobe(uy, delay)),
            gz: (uz != 0.0).then(|| self.lobe(uz, delay)),
            ..Block::default()
        };

        let mut rf180_block = Block::with_rf(rf180);
        rf180_block.rf.as_mut().unwrap().delay = d_refocus;

        let adc = AdcEvent::new(self.n_samples, self.dwell, d_adc, 0.0);

        let mut seq = Sequence::new();
        seq.definitions.push(("Name".to_string(), self.name()));
        seq.push(Block::with_rf(rf90));
        seq.push(lobe(0.0));
        seq.push(rf180_block);
        seq.push(lobe(d_lobe2));
        seq.push(Block::with_adc(adc));
        seq
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use seq_tools::constants::GAMMA;

    #[test]
    fn refocusing_pulse_centered() {
        let p = PgseParams::default();
        let seq = p.build(&Scanner::default());
        let starts = seq.block_starts();
        let c180 = starts[2] + seq.rf_center(2).unwrap();
        assert!((c180 - p.inversion_time()).abs() < 1e-9);
        let t = seq.adc_sample_times();
        let mid = (t[0] + t[t.len() - 1]) / 2.0;
        assert!((mid - p.echo_time()).abs() <= p.dwell / 2.0 + 1e-9);
    }

    #[test]
    fn lobes_are_separation_apart() {
        let p = PgseParams::default();
        let seq = p.build(&Scanner::default());
        let starts = seq.block_starts();
        // lobe onsets: block 1 starts its trap at once, block 3 after d_lobe2
        let (_, d_lobe2, _, _) = p.timing();
        let onset1 = starts[1];
        let onset2 = starts[3] + d_lobe2;
        assert!((onset2 - onset1 - p.separation).abs() < 1e-9);
    }

    #[test]
    fn numeric_b_close_to_stejskal_tanner() {
        let p = PgseParams::default();
        let b = p.b_value(&Scanner::default());
        // rectangle approximation with the effective flat-top width
        let d_eff = p.delta - p.ramp;
        let expected = GAMMA * GAMMA
            * p.amplitude
            * p.amplitude
            * d_eff
            * d_eff
            * (p.separation - d_eff / 3.0)
            * 1e-6;
        assert!((b - expected).abs() / expected < 0.02, "b {} vs {}", b, expected);
    }

    #[test]
    fn amplitude_solver_hits_target() {
        let p = PgseParams::default();
        let scanner = Scanner::default();
        for target in [250.0, 1000.0, 2000.0] {
            let mut q = p.clone();
            q.amplitude = q.amplitude_for_b(target, &scanner);
            let b = q.b_value(&scanner);
            assert!((b - target).abs() / target < 1e-3, "b {} target {}", b, target);
        }
    }
}
