use serde::{Deserialize, Serialize};

use seq_tools::adc_event::AdcEvent;
use seq_tools::pulse::{Hardpulse, Pulse};
use seq_tools::scanner::Scanner;
use seq_tools::sequence::{Block, Sequence};

use crate::SequenceParameters;

/// Hard-pulse spin echo: 90x, refocusing 180y, readout centered on the
/// echo at TE after the excitation center.
#[derive(Clone, Serialize, Deserialize)]
pub struct SpinEchoParams {
    pub te: f64,
    pub pulse_duration: f64,
    pub n_samples: usize,
    pub dwell: f64,
}

impl Default for SpinEchoParams {
    fn default() -> SpinEchoParams {
        SpinEchoParams {
            te: 20e-3,
            pulse_duration: 0.5e-3,
            n_samples: 64,
            dwell: 5e-5,
        }
    }
}

impl SpinEchoParams {
    /// block-local delays that center the 180 at TE/2 and the readout
    /// window at TE, both measured from the excitation center
    fn timing(&self) -> (f64, f64) {
        let tau = self.pulse_duration;
        let read = self.n_samples as f64 * self.dwell;
        let d_refocus = self.te / 2.0 - tau; // from end of 90 to start of 180
        let d_adc = self.te / 2.0 - tau / 2.0 - read / 2.0; // inside the adc block
        assert!(d_refocus >= 0.0, "TE too short for the refocusing pulse");
        assert!(d_adc >= 0.0, "TE too short for the readout window");
        (d_refocus, d_adc)
    }
}

impl SequenceParameters for SpinEchoParams {
    fn name(&self) -> String {
        String::from("spin_echo")
    }

    fn build(&self, scanner: &Scanner) -> Sequence {
        let (d_refocus, d_adc) = self.timing();
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
        let adc = AdcEvent::new(self.n_samples, self.dwell, d_adc, 0.0);
        let mut seq = Sequence::new();
        seq.definitions.push(("Name".to_string(), self.name()));
        seq.push(Block::with_rf(rf90));
        seq.push(Block::delay(d_refocus));
        seq.push(Block::with_rf(rf180));
        seq.push(Block::with_adc(adc));
        seq
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn echo_lands_at_te() {
        let p = SpinEchoParams::default();
        let seq = p.build(&Scanner::default());
        let starts = seq.block_starts();
        // center of the 180 sits TE/2 after the excitation center
        let c90 = p.pulse_duration / 2.0;
        let c180 = starts[2] + seq.rf_center(2).unwrap();
        assert!((c180 - (c90 + p.te / 2.0)).abs() < 1e-9);
        // the middle of the readout window sits at TE
        let t = seq.adc_sample_times();
        let mid = (t[0] + t[t.len() - 1]) / 2.0;
        assert!((mid - (c90 + p.te)).abs() <= p.dwell / 2.0 + 1e-9);
    }

    #[test]
    #[should_panic(expected = "TE too short")]
    fn rejects_impossible_te() {
        let p = SpinEchoParams {
            te: 0.3e-3,
            ..SpinEchoParams::default()
        };
        p.build(&Scanner::default());
    }
}
