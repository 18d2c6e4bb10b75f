use num_complex::Complex;
use seq_tools::sequence::{GradAxis, Sequence};
use seq_tools::time_grid::TimeGrid;

/// One RF-break part of the grid with every waveform pre-evaluated at its
/// points. Step i runs from t[i] to t[i+1]; `adc` pairs a local point
/// index with the receiver phase of its window.
#[derive(Clone, Debug)]
pub struct PartSamples {
    pub t: Vec<f64>,
    pub gx: Vec<f64>,
    pub gy: Vec<f64>,
    pub gz: Vec<f64>,
    pub b1: Vec<Complex<f64>>,
    pub adc: Vec<(usize, f64)>,
    pub rf_on: bool,
    /// global index of the part's first step, for diagnostics
    pub step_offset: usize,
}

impl PartSamples {
    pub fn n_steps(&self) -> usize {
        self.t.len() - 1
    }
}

/// The discretized sequence handed to the kernels.
#[derive(Clone, Debug, Default)]
pub struct SeqSamples {
    pub parts: Vec<PartSamples>,
    pub n_adc: usize,
    /// acquisition-ordered ADC sample times
    pub adc_times: Vec<f64>,
}

impl SeqSamples {
    pub fn build(seq: &Sequence, grid: &TimeGrid) -> SeqSamples {
        if grid.n_steps() == 0 {
            return SeqSamples::default();
        }
        let starts = seq.block_starts();
        let points = grid.points();
        let gx: Vec<f64> = points.iter().map(|&t| seq.grad_at(t, GradAxis::X, &starts)).collect();
        let gy: Vec<f64> = points.iter().map(|&t| seq.grad_at(t, GradAxis::Y, &starts)).collect();
        let gz: Vec<f64> = points.iter().map(|&t| seq.grad_at(t, GradAxis::Z, &starts)).collect();
        let b1: Vec<Complex<f64>> = points.iter().map(|&t| seq.b1_at(t, &starts)).collect();

        // receiver phase for each sample, in acquisition order
        let phases: Vec<f64> = seq
            .blocks
            .iter()
            .filter_map(|b| b.adc.as_ref())
            .flat_map(|a| std::iter::repeat(a.phase).take(a.n))
            .collect();
        debug_assert_eq!(phases.len(), grid.adc_indices.len());

        let mut parts = Vec::with_capacity(grid.parts.len());
        let mut cursor = 0; // walks the acquisition-ordered adc indices
        for p in &grid.parts {
            let lo = p.steps.start;
            let hi = p.steps.end;
            let mut adc = Vec::new();
            while cursor < grid.adc_indices.len() && grid.adc_indices[cursor] < hi {
                let idx = grid.adc_indices[cursor];
                adc.push((idx - lo, phases[cursor]));
                cursor += 1;
            }
            parts.push(PartSamples {
                t: points[lo..=hi].to_vec(),
                gx: gx[lo..=hi].to_vec(),
                gy: gy[lo..=hi].to_vec(),
                gz: gz[lo..=hi].to_vec(),
                b1: b1[lo..=hi].to_vec(),
                adc,
                rf_on: p.rf_on,
                step_offset: lo,
            });
        }

        let adc_times: Vec<f64> = grid.adc_indices.iter().map(|&i| grid.t[i]).collect();
        SeqSamples {
            parts,
            n_adc: grid.adc_indices.len(),
            adc_times,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use seq_tools::adc_event::AdcEvent;
    use seq_tools::gradient_event::GradEvent;
    use seq_tools::rf_event::RfEvent;
    use seq_tools::sequence::Block;
    use seq_tools::time_grid::{discretize, DEFAULT_DT_GR, DEFAULT_DT_RF};
    use std::f64::consts::FRAC_PI_2;

    #[test]
    fn parts_cover_every_step_and_sample() {
        let rf = RfEvent::hard(FRAC_PI_2, 1e-3, 1e-6, 0.0);
        let grad = GradEvent::trap(0.02, 0.0, 2e-4, 3.2e-3, 2e-4);
        let adc = AdcEvent::new(32, 1e-4, 2e-4, 0.25);
        let mut seq = Sequence::new();
        seq.push(Block::with_rf(rf));
        seq.push(Block {
            gx: Some(grad),
            adc: Some(adc),
            ..Block::default()
        });
        let grid = discretize(&seq, DEFAULT_DT_GR, DEFAULT_DT_RF);
        let samples = SeqSamples::build(&seq, &grid);

        let total: usize = samples.parts.iter().map(|p| p.n_steps()).sum();
        assert_eq!(total, grid.n_steps());
        let collected: usize = samples.parts.iter().map(|p| p.adc.len()).sum();
        assert_eq!(collected, 32);
        assert_eq!(samples.n_adc, 32);
        // receiver phase rides along with every sample
        for p in &samples.parts {
            for &(local, phase) in &p.adc {
                assert!(local < p.n_steps());
                assert_eq!(phase, 0.25);
            }
        }
        // rf parts expose nonzero b1, precession parts do not
        for p in &samples.parts {
            let peak = p.b1.iter().map(|b| b.norm()).fold(0.0, f64::max);
            if p.rf_on {
                assert!(peak > 0.0);
            }
        }
    }

    #[test]
    fn gradient_values_line_up() {
        let grad = GradEvent::trap(0.02, 0.0, 2e-4, 3.2e-3, 2e-4);
        let mut seq = Sequence::new();
        seq.push(Block {
            gx: Some(grad),
            ..Block::default()
        });
        let grid = discretize(&seq, 1e-4, DEFAULT_DT_RF);
        let samples = SeqSamples::build(&seq, &grid);
        let p = &samples.parts[0];
        // plateau points sit at the nominal amplitude
        let on_plateau = p
            .t
            .iter()
            .zip(p.gx.iter())
            .filter(|(&t, _)| t > 3e-4 && t < 3.2e-3)
            .count();
        assert!(on_plateau > 10);
        for (&t, &g) in p.t.iter().zip(p.gx.iter()) {
            if t > 3e-4 && t < 3.2e-3 {
                assert!((g - 0.02).abs() < 1e-9, "plateau at {} got {}", t, g);
            }
        }
    }
}
