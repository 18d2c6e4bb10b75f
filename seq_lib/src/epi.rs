use serde::{Deserialize, Serialize};

use seq_tools::adc_event::AdcEvent;
use seq_tools::constants::GAMMA_BAR;
use seq_tools::gradient_event::GradEvent;
use seq_tools::pulse::{Hardpulse, Pulse};
use seq_tools::scanner::Scanner;
use seq_tools::sequence::{Block, Sequence};

use crate::SequenceParameters;

/// Single-shot EPI: excitation, corner-of-k-space prephasers, then an
/// alternating readout train with phase blips between the lines.
#[derive(Clone, Serialize, Deserialize)]
pub struct EpiParams {
    pub n_read: usize,
    pub n_phase: usize,
    /// field of view in m, isotropic
    pub fov: f64,
    pub dwell: f64,
    pub pulse_duration: f64,
    pub ramp: f64,
    pub blip_duration: f64,
}

impl Default for EpiParams {
    fn default() -> EpiParams {
        EpiParams {
            n_read: 64,
            n_phase: 64,
            fov: 0.02,
            dwell: 5e-6,
            pulse_duration: 0.2e-3,
            ramp: 1e-4,
            blip_duration: 2e-4,
        }
    }
}

impl EpiParams {
    /// k-space step in 1/m
    fn delta_k(&self) -> f64 {
        1.0 / self.fov
    }

    /// readout plateau amplitude covering one k-space line during the flat top
    fn g_read(&self) -> f64 {
        self.delta_k() / (GAMMA_BAR * self.dwell)
    }

    fn flat(&self) -> f64 {
        self.n_read as f64 * self.dwell
    }
}

impl SequenceParameters for EpiParams {
    fn name(&self) -> String {
        String::from("epi")
    }

    fn build(&self, scanner: &Scanner) -> Sequence {
        let rf = Hardpulse::new(self.pulse_duration).to_rf(
            std::f64::consts::FRAC_PI_2,
            scanner.rf_raster,
            0.0,
            0.0,
        );

        // move to (-kmax, -kmax) before the train; half a line plus half a
        // ramp lobe in read, half the phase extent in phase
        let read_area = self.g_read() * (self.flat() + self.ramp);
        let pre_read_area = -read_area / 2.0;
        let pre_phase_area = -(self.n_phase as f64 / 2.0) * self.delta_k() / GAMMA_BAR;
        let pre_dur = 1e-3;
        let pre_flat = pre_dur - 2.0 * self.ramp;
        let prephase = Block {
            gx: Some(GradEvent::trap(
                pre_read_area / (self.ramp + pre_flat),
                0.0,
                self.ramp,
                pre_flat,
                self.ramp,
            )),
            gy: Some(GradEvent::trap(
                pre_phase_area / (self.ramp + pre_flat),
                0.0,
                self.ramp,
                pre_flat,
                self.ramp,
            )),
            ..Block::default()
        };

        let blip_area = self.delta_k() / GAMMA_BAR;
        let blip_flat = self.blip_duration - 2.0 * self.ramp;
        let mut seq = Sequence::new();
        seq.definitions.push(("Name".to_string(), self.name()));
        seq.definitions
            .push(("FOV".to_string(), format!("{} {} {}", self.fov, self.fov, self.fov)));
        seq.push(Block::with_rf(rf));
        seq.push(prephase);

        for line in 0..self.n_phase {
            let sign = if line % 2 == 0 { 1.0 } else { -1.0 };
            let readout = GradEvent::trap(sign * self.g_read(), 0.0, self.ramp, self.flat(), self.ramp);
            // samples cover the flat top
            let adc = AdcEvent::new(self.n_read, self.dwell, self.ramp, 0.0);
            seq.push(Block {
                gx: Some(readout),
                adc: Some(adc),
                ..Block::default()
            });
            if line + 1 < self.n_phase {
                let blip = GradEvent::trap(
                    blip_area / (self.ramp + blip_flat),
                    0.0,
                    self.ramp,
                    blip_flat,
                    self.ramp,
                );
                seq.push(Block {
                    gy: Some(blip),
                    ..Block::default()
                });
            }
        }
        seq
    }
}
