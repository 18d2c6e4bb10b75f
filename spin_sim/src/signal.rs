use ndarray::Array2;
use num_complex::Complex;
use seq_tools::sequence::Sequence;

use crate::magnetization::Magnetization;

/// Samples grouped per ADC window, with their acquisition times.
#[derive(Clone, Debug)]
pub struct Readout {
    pub times: Vec<f64>,
    pub samples: Vec<Complex<f64>>,
}

#[derive(Clone, Debug, Default)]
pub struct RawAcquisition {
    pub readouts: Vec<Readout>,
}

/// What a run hands back, depending on the requested return type.
#[derive(Clone, Debug)]
pub enum SimOutput {
    /// acquisition-ordered samples as a column matrix
    Signal(Array2<Complex<f64>>),
    /// per-spin samples, samples x spins
    Dict(Array2<Complex<f64>>),
    /// final magnetization of every spin
    State(Magnetization),
    Raw(RawAcquisition),
}

/// split the flat acquisition-ordered sample vector into per-window
/// readouts following the sequence's ADC events
pub fn group_readouts(
    seq: &Sequence,
    times: &[f64],
    samples: &[Complex<f64>],
) -> RawAcquisition {
    let mut readouts = Vec::new();
    let mut at = 0;
    for block in &seq.blocks {
        if let Some(adc) = &block.adc {
            if adc.n == 0 {
                continue;
            }
            let hi = (at + adc.n).min(samples.len());
            readouts.push(Readout {
                times: times[at..hi].to_vec(),
                samples: samples[at..hi].to_vec(),
            });
            at = hi;
        }
    }
    RawAcquisition { readouts }
}

pub fn signal_matrix(samples: Vec<Complex<f64>>) -> Array2<Complex<f64>> {
    let n = samples.len();
    Array2::from_shape_vec((n, 1), samples).expect("flat sample vector always reshapes")
}

#[cfg(test)]
mod tests {
    use super::*;
    use seq_tools::adc_event::AdcEvent;
    use seq_tools::sequence::Block;

    #[test]
    fn grouping_follows_windows() {
        let mut seq = Sequence::new();
        seq.push(Block::with_adc(AdcEvent::new(3, 1e-4, 0.0, 0.0)));
        seq.push(Block::delay(1e-3));
        seq.push(Block::with_adc(AdcEvent::new(2, 1e-4, 0.0, 0.0)));
        let samples: Vec<Complex<f64>> =
            (0..5).map(|i| Complex::new(i as f64, 0.0)).collect();
        let times: Vec<f64> = (0..5).map(|i| i as f64).collect();
        let raw = group_readouts(&seq, &times, &samples);
        assert_eq!(raw.readouts.len(), 2);
        assert_eq!(raw.readouts[0].samples.len(), 3);
        assert_eq!(raw.readouts[1].samples.len(), 2);
        assert_eq!(raw.readouts[1].samples[0].re, 3.0);
    }

    #[test]
    fn matrix_is_a_column() {
        let m = signal_matrix(vec![Complex::new(1.0, 0.0); 4]);
        assert_eq!(m.dim(), (4, 1));
    }
}
