use serde::{Deserialize, Serialize};

use seq_tools::adc_event::AdcEvent;
use seq_tools::pulse::{Hardpulse, Pulse};
use seq_tools::scanner::Scanner;
use seq_tools::sequence::{Block, Sequence};

use crate::SequenceParameters;

/// Hard excitation followed by a free-induction readout.
#[derive(Clone, Serialize, Deserialize)]
pub struct OnePulseParams {
    pub flip_deg: f64,
    pub pulse_duration: f64,
    pub n_samples: usize,
    pub dwell: f64,
    pub adc_delay: f64,
    pub rf_phase_deg: f64,
}

impl Default for OnePulseParams {
    fn default() -> OnePulseParams {
        OnePulseParams {
            flip_deg: 90.0,
            pulse_duration: 1e-3,
            n_samples: 100,
            dwell: 1e-3,
            adc_delay: 0.0,
            rf_phase_deg: 0.0,
        }
    }
}

impl SequenceParameters for OnePulseParams {
    fn name(&self) -> String {
        String::from("one_pulse")
    }

    fn build(&self, scanner: &Scanner) -> Sequence {
        let rf = Hardpulse::new(self.pulse_duration).to_rf(
            self.flip_deg.to_radians(),
            scanner.rf_raster,
            0.0,
            self.rf_phase_deg.to_radians(),
        );
        let adc = AdcEvent::new(self.n_samples, self.dwell, self.adc_delay, 0.0);
        let mut seq = Sequence::new();
        seq.definitions.push(("Name".to_string(), self.name()));
        seq.push(Block::with_rf(rf));
        seq.push(Block::with_adc(adc));
        seq
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn builds_two_blocks() {
        let p = OnePulseParams::default();
        let seq = p.build(&Scanner::default());
        assert_eq!(seq.len(), 2);
        assert!(seq.rf_on(0));
        assert!(seq.adc_on(1));
        let rf = seq.blocks[0].rf.as_ref().unwrap();
        assert!((rf.flip_angle().to_degrees() - 90.0).abs() < 1e-6);
        assert!((seq.duration() - (1e-3 + 0.1)).abs() < 1e-9);
    }

    #[test]
    fn params_round_trip() {
        let p = OnePulseParams {
            flip_deg: 30.0,
            ..OnePulseParams::default()
        };
        let path = std::env::temp_dir().join("one_pulse_params.json");
        p.write(&path);
        let q = OnePulseParams::load(&path);
        assert_eq!(q.flip_deg, 30.0);
        assert_eq!(q.n_samples, 100);
    }
}
