use num_complex::Complex;

use crate::adc_event::AdcEvent;
use crate::gradient_event::GradEvent;
use crate::rf_event::RfEvent;

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum GradAxis {
    X,
    Y,
    Z,
}

impl GradAxis {
    pub const ALL: [GradAxis; 3] = [GradAxis::X, GradAxis::Y, GradAxis::Z];
}

/// An atomic span of the sequence timeline. Carries at most one RF event,
/// one gradient per axis and one ADC window; `extension` is dead time that
/// can stretch the block beyond its last event.
#[derive(Clone, Debug, Default)]
pub struct Block {
    pub rf: Option<RfEvent>,
    pub gx: Option<GradEvent>,
    pub gy: Option<GradEvent>,
    pub gz: Option<GradEvent>,
    pub adc: Option<AdcEvent>,
    pub extension: f64,
}

impl Block {
    pub fn delay(duration: f64) -> Block {
        Block {
            extension: duration,
            ..Block::default()
        }
    }

    pub fn with_rf(rf: RfEvent) -> Block {
        Block {
            rf: Some(rf),
            ..Block::default()
        }
    }

    pub fn with_adc(adc: AdcEvent) -> Block {
        Block {
            adc: Some(adc),
            ..Block::default()
        }
    }

    pub fn grad(&self, axis: GradAxis) -> Option<&GradEvent> {
        match axis {
            GradAxis::X => self.gx.as_ref(),
            GradAxis::Y => self.gy.as_ref(),
            GradAxis::Z => self.gz.as_ref(),
        }
    }

    /// block duration is the maximum of all contained event end-times
    pub fn duration(&self) -> f64 {
        let mut d = self.extension;
        if let Some(rf) = &self.rf {
            d = d.max(rf.end_time());
        }
        for axis in GradAxis::ALL {
            if let Some(g) = self.grad(axis) {
                d = d.max(g.end_time());
            }
        }
        if let Some(adc) = &self.adc {
            d = d.max(adc.duration());
        }
        d
    }
}

/// Ordered blocks placed end-to-end on a monotonically increasing time axis.
#[derive(Clone, Debug, Default)]
pub struct Sequence {
    pub blocks: Vec<Block>,
    /// free-form key/value definitions, order preserved and written back
    /// verbatim by the codec
    pub definitions: Vec<(String, String)>,
}

impl Sequence {
    pub fn new() -> Sequence {
        Sequence::default()
    }

    pub fn from_blocks(blocks: Vec<Block>) -> Sequence {
        Sequence {
            blocks,
            definitions: Vec::new(),
        }
    }

    pub fn push(&mut self, block: Block) {
        self.blocks.push(block);
    }

    pub fn len(&self) -> usize {
        self.blocks.len()
    }

    pub fn is_empty(&self) -> bool {
        self.blocks.is_empty()
    }

    /// append the other sequence's blocks after this one's
    pub fn concat(mut self, other: Sequence) -> Sequence {
        self.blocks.extend(other.blocks);
        self
    }

    /// scale every gradient amplitude; RF is untouched
    pub fn scale_amplitude(&mut self, factor: f64) {
        for b in self.blocks.iter_mut() {
            b.gx = b.gx.take().map(|g| g.scaled(factor));
            b.gy = b.gy.take().map(|g| g.scaled(factor));
            b.gz = b.gz.take().map(|g| g.scaled(factor));
        }
    }

    /// contiguous block range as a new sequence
    pub fn subset(&self, range: std::ops::Range<usize>) -> Sequence {
        Sequence {
            blocks: self.blocks[range].to_vec(),
            definitions: self.definitions.clone(),
        }
    }

    pub fn duration(&self) -> f64 {
        self.blocks.iter().map(|b| b.duration()).sum()
    }

    /// start time of every block plus the total duration as a final entry
    pub fn block_starts(&self) -> Vec<f64> {
        let mut starts = Vec::with_capacity(self.blocks.len() + 1);
        let mut t = 0.0;
        for b in &self.blocks {
            starts.push(t);
            t += b.duration();
        }
        starts.push(t);
        starts
    }

    pub fn rf_on(&self, block: usize) -> bool {
        self.blocks[block].rf.as_ref().map_or(false, |rf| rf.is_on())
    }

    pub fn grad_on(&self, block: usize, axis: GradAxis) -> bool {
        self.blocks[block]
            .grad(axis)
            .map_or(false, |g| g.is_on())
    }

    pub fn adc_on(&self, block: usize) -> bool {
        self.blocks[block].adc.as_ref().map_or(false, |a| a.is_on())
    }

    /// block-local time of the RF envelope maximum, including delay
    pub fn rf_center(&self, block: usize) -> Option<f64> {
        self.blocks[block].rf.as_ref().map(|rf| rf.center())
    }

    /// all ADC sample times on the global axis
    pub fn adc_sample_times(&self) -> Vec<f64> {
        let starts = self.block_starts();
        let mut out = Vec::new();
        for (i, b) in self.blocks.iter().enumerate() {
            if let Some(adc) = &b.adc {
                out.extend(adc.sample_times().iter().map(|t| starts[i] + t));
            }
        }
        out
    }

    /// total number of ADC samples
    pub fn n_adc_samples(&self) -> usize {
        self.blocks
            .iter()
            .filter_map(|b| b.adc.as_ref())
            .map(|a| a.n)
            .sum()
    }

    fn block_index_at(&self, t: f64, starts: &[f64]) -> Option<usize> {
        if self.blocks.is_empty() || t < starts[0] || t > starts[starts.len() - 1] {
            return None;
        }
        let i = match starts.partition_point(|v| *v <= t) {
            0 => 0,
            i => i - 1,
        };
        Some(i.min(self.blocks.len() - 1))
    }

    /// gradient amplitude on one axis at a global time
    pub fn grad_at(&self, t: f64, axis: GradAxis, starts: &[f64]) -> f64 {
        match self.block_index_at(t, starts) {
            Some(i) => self.blocks[i]
                .grad(axis)
                .map_or(0.0, |g| g.amp_at(t - starts[i])),
            None => 0.0,
        }
    }

    /// complex B1 at a global time, carrier applied
    pub fn b1_at(&self, t: f64, starts: &[f64]) -> Complex<f64> {
        match self.block_index_at(t, starts) {
            Some(i) => self.blocks[i]
                .rf
                .as_ref()
                .map_or(Complex::new(0.0, 0.0), |rf| rf.b1_at(t - starts[i])),
            None => Complex::new(0.0, 0.0),
        }
    }

    /// global (start, end) window of every RF waveform, in block order
    pub fn rf_windows(&self) -> Vec<(f64, f64)> {
        let starts = self.block_starts();
        let mut out = Vec::new();
        for (i, b) in self.blocks.iter().enumerate() {
            if let Some(rf) = &b.rf {
                if rf.is_on() {
                    out.push((starts[i] + rf.delay, starts[i] + rf.end_time()));
                }
            }
        }
        out
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::f64::consts::FRAC_PI_2;

    fn demo_sequence() -> Sequence {
        let rf = RfEvent::hard(FRAC_PI_2, 1e-3, 1e-5, 0.0);
        let grad = GradEvent::trap(0.02, 0.0, 2e-4, 4e-3, 2e-4);
        let adc = AdcEvent::new(16, 1e-4, 1e-4, 0.0);
        let mut seq = Sequence::new();
        seq.push(Block::with_rf(rf));
        seq.push(Block {
            gx: Some(grad),
            adc: Some(adc),
            ..Block::default()
        });
        seq
    }

    #[test]
    fn predicates() {
        let seq = demo_sequence();
        assert!(seq.rf_on(0));
        assert!(!seq.rf_on(1));
        assert!(seq.grad_on(1, GradAxis::X));
        assert!(!seq.grad_on(1, GradAxis::Y));
        assert!(seq.adc_on(1));
        assert!(!seq.adc_on(0));
    }

    #[test]
    fn durations_accumulate() {
        let seq = demo_sequence();
        let starts = seq.block_starts();
        assert!((starts[1] - 1e-3).abs() < 1e-12);
        assert!((seq.duration() - (1e-3 + 4.4e-3)).abs() < 1e-12);
    }

    #[test]
    fn concat_and_subset() {
        let a = demo_sequence();
        let b = demo_sequence();
        let c = a.concat(b);
        assert_eq!(c.len(), 4);
        let s = c.subset(1..3);
        assert_eq!(s.len(), 2);
        assert!(s.adc_on(0));
        assert!(s.rf_on(1));
    }

    #[test]
    fn gradient_scaling_leaves_rf_alone() {
        let mut seq = demo_sequence();
        let flip = seq.blocks[0].rf.as_ref().unwrap().flip_angle();
        seq.scale_amplitude(0.5);
        assert!((seq.blocks[0].rf.as_ref().unwrap().flip_angle() - flip).abs() < 1e-12);
        let g = seq.blocks[1].gx.as_ref().unwrap();
        assert!((g.amp_at(1e-3) - 0.01).abs() < 1e-12);
    }

    #[test]
    fn global_sampling() {
        let seq = demo_sequence();
        let starts = seq.block_starts();
        // plateau of the readout gradient, 1ms into block 1
        assert!((seq.grad_at(2e-3, GradAxis::X, &starts) - 0.02).abs() < 1e-12);
        assert_eq!(seq.grad_at(0.5e-3, GradAxis::X, &starts), 0.0);
        assert!(seq.b1_at(0.5e-3, &starts).norm() > 0.0);
        assert_eq!(seq.b1_at(2e-3, &starts).norm(), 0.0);
    }

    #[test]
    fn adc_times_are_global() {
        let seq = demo_sequence();
        let t = seq.adc_sample_times();
        assert_eq!(t.len(), 16);
        assert!((t[0] - (1e-3 + 1e-4 + 0.5e-4)).abs() < 1e-12);
    }
}
