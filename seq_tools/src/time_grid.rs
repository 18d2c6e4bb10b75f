use std::ops::Range;

use crate::constants::EPS_TIME;
use crate::sequence::{GradAxis, Sequence};

pub const DEFAULT_DT_GR: f64 = 1e-3;
pub const DEFAULT_DT_RF: f64 = 1e-5;

/// A maximal run of integration steps with a constant RF-on state.
#[derive(Clone, Debug)]
pub struct Part {
    pub steps: Range<usize>,
    pub rf_on: bool,
}

/// Non-uniform integration grid. `t[i]` is the start of step i and
/// `dt[i] = t[i+1] - t[i]`; both vectors have equal length. `adc_indices`
/// are the grid indices holding an ADC sample time, `parts` is the
/// RF-break partition consumed by the integrator.
#[derive(Clone, Debug, Default)]
pub struct TimeGrid {
    pub t: Vec<f64>,
    pub dt: Vec<f64>,
    pub adc_indices: Vec<usize>,
    pub parts: Vec<Part>,
}

impl TimeGrid {
    pub fn n_steps(&self) -> usize {
        self.dt.len()
    }

    /// end time of step i
    pub fn step_end(&self, i: usize) -> f64 {
        self.t[i] + self.dt[i]
    }

    /// every grid point including the final step end
    pub fn points(&self) -> Vec<f64> {
        let mut p = self.t.clone();
        if let (Some(&t), Some(&dt)) = (self.t.last(), self.dt.last()) {
            p.push(t + dt);
        }
        p
    }

    /// grid indices bracketing each RF waveform, in order
    pub fn rf_breaks(&self) -> Vec<usize> {
        self.parts
            .iter()
            .filter(|p| p.rf_on)
            .flat_map(|p| [p.steps.start, p.steps.end])
            .collect()
    }
}

/// fill (a,b] with points no farther apart than dt_max, keeping both ends
fn densify(times: &mut Vec<f64>, a: f64, b: f64, dt_max: f64) {
    if b <= a {
        return;
    }
    let n = ((b - a) / dt_max).ceil().max(1.0) as usize;
    let step = (b - a) / n as f64;
    for k in 0..=n {
        times.push(a + step * k as f64);
    }
}

/// Build the adaptive grid for a sequence: dense (<= dt_rf) across RF
/// waveforms, corner-resolved (<= dt_gr) across gradients, exact at every
/// ADC sample time, sparse over dead time.
pub fn discretize(seq: &Sequence, dt_gr: f64, dt_rf: f64) -> TimeGrid {
    assert!(dt_gr > 0.0 && dt_rf > 0.0, "nominal steps must be positive");
    if seq.is_empty() {
        return TimeGrid::default();
    }
    let starts = seq.block_starts();
    let mut times: Vec<f64> = Vec::new();

    for (i, block) in seq.blocks.iter().enumerate() {
        let t0 = starts[i];
        // block boundaries keep dead-time blocks on the axis
        times.push(t0);

        if seq.rf_on(i) {
            let rf = block.rf.as_ref().unwrap();
            let t1 = t0 + rf.delay;
            let t2 = t0 + rf.end_time();
            let tc = t0 + rf.center();
            let keys = [t1, t1 + EPS_TIME, tc, t2 - EPS_TIME, t2];
            for pair in keys.windows(2) {
                densify(&mut times, pair[0], pair[1], dt_rf);
            }
        }

        for axis in GradAxis::ALL {
            if seq.grad_on(i, axis) {
                let g = block.grad(axis).unwrap();
                let mut corners: Vec<f64> = Vec::new();
                for c in g.corners() {
                    let c = t0 + c;
                    corners.push(c - EPS_TIME);
                    corners.push(c);
                    corners.push(c + EPS_TIME);
                }
                for pair in corners.windows(2) {
                    densify(&mut times, pair[0], pair[1], dt_gr);
                }
            }
        }
    }
    times.push(starts[starts.len() - 1]);

    let adc_times = seq.adc_sample_times();
    times.extend(adc_times.iter());

    times.sort_by(|a, b| a.partial_cmp(b).unwrap());
    times.dedup();

    // bracket the run so boundary ADCs sit between finite intervals
    let first = times[0];
    let last = times[times.len() - 1];
    times.insert(0, first - EPS_TIME);
    times.push(last + EPS_TIME);
    times.dedup();

    let n = times.len() - 1;
    let t: Vec<f64> = times[..n].to_vec();
    let dt: Vec<f64> = (0..n).map(|i| times[i + 1] - times[i]).collect();

    let adc_indices = locate(&t, &adc_times);
    let parts = partition(&t, &dt, &seq.rf_windows());

    TimeGrid {
        t,
        dt,
        adc_indices,
        parts,
    }
}

/// grid index of each query time; queries are values previously inserted
/// into the grid so an exact or nearest-within-fuzz hit always exists
fn locate(t: &[f64], queries: &[f64]) -> Vec<usize> {
    let mut sorted: Vec<f64> = queries.to_vec();
    sorted.sort_by(|a, b| a.partial_cmp(b).unwrap());
    sorted
        .iter()
        .map(|&q| {
            let i = t.partition_point(|v| *v < q);
            // prefer the exact slot, fall back to the closer neighbor
            if i < t.len() && (t[i] - q).abs() <= EPS_TIME {
                i
            } else if i > 0 && (t[i - 1] - q).abs() <= EPS_TIME {
                i - 1
            } else if i >= t.len() {
                t.len() - 1
            } else {
                i
            }
        })
        .collect()
}

fn partition(t: &[f64], dt: &[f64], rf_windows: &[(f64, f64)]) -> Vec<Part> {
    let inside = |mid: f64| {
        rf_windows
            .iter()
            .any(|&(a, b)| mid > a - EPS_TIME && mid < b + EPS_TIME)
    };
    let mut parts: Vec<Part> = Vec::new();
    for i in 0..dt.len() {
        let rf_on = inside(t[i] + dt[i] / 2.0);
        match parts.last_mut() {
            Some(p) if p.rf_on == rf_on => p.steps.end = i + 1,
            _ => parts.push(Part {
                steps: i..i + 1,
                rf_on,
            }),
        }
    }
    parts
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::adc_event::AdcEvent;
    use crate::gradient_event::GradEvent;
    use crate::rf_event::RfEvent;
    use crate::sequence::Block;
    use std::f64::consts::FRAC_PI_2;

    fn demo_sequence() -> Sequence {
        let rf = RfEvent::hard(FRAC_PI_2, 1e-3, 1e-5, 0.0);
        let grad = GradEvent::trap(0.02, 0.0, 2e-4, 4e-3, 2e-4);
        let adc = AdcEvent::new(32, 1e-4, 2e-4, 0.0);
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
    fn empty_sequence_empty_grid() {
        let grid = discretize(&Sequence::new(), DEFAULT_DT_GR, DEFAULT_DT_RF);
        assert_eq!(grid.n_steps(), 0);
        assert!(grid.adc_indices.is_empty());
        assert!(grid.parts.is_empty());
    }

    #[test]
    fn strictly_increasing() {
        let grid = discretize(&demo_sequence(), DEFAULT_DT_GR, DEFAULT_DT_RF);
        for i in 0..grid.t.len() - 1 {
            assert!(grid.t[i + 1] > grid.t[i], "t not increasing at {}", i);
        }
        for (i, &dt) in grid.dt.iter().enumerate() {
            assert!(dt > 0.0, "non-positive step at {}", i);
            assert!((grid.t[i] + dt
                - grid.t.get(i + 1).copied().unwrap_or(grid.t[i] + dt))
                .abs()
                < 1e-15);
        }
        assert_eq!(grid.t.len(), grid.dt.len());
    }

    #[test]
    fn adc_samples_are_on_the_grid() {
        let seq = demo_sequence();
        let grid = discretize(&seq, DEFAULT_DT_GR, DEFAULT_DT_RF);
        let adc_times = {
            let mut t = seq.adc_sample_times();
            t.sort_by(|a, b| a.partial_cmp(b).unwrap());
            t
        };
        assert_eq!(grid.adc_indices.len(), adc_times.len());
        for (&idx, &ta) in grid.adc_indices.iter().zip(adc_times.iter()) {
            assert!((grid.t[idx] - ta).abs() <= EPS_TIME, "adc sample off-grid");
        }
    }

    #[test]
    fn rf_window_is_densified() {
        let grid = discretize(&demo_sequence(), DEFAULT_DT_GR, DEFAULT_DT_RF);
        // every step under the 1 ms pulse must respect dt_rf
        for p in grid.parts.iter().filter(|p| p.rf_on) {
            for i in p.steps.clone() {
                assert!(grid.dt[i] <= DEFAULT_DT_RF + 1e-12);
            }
        }
    }

    #[test]
    fn partition_alternates_and_covers() {
        let seq = demo_sequence();
        let two_shots = seq.clone().concat(demo_sequence());
        let grid = discretize(&two_shots, DEFAULT_DT_GR, DEFAULT_DT_RF);
        assert!(grid.parts.iter().filter(|p| p.rf_on).count() >= 2);
        let mut covered = 0;
        for w in grid.parts.windows(2) {
            assert_ne!(w[0].rf_on, w[1].rf_on, "adjacent parts must alternate");
            assert_eq!(w[0].steps.end, w[1].steps.start);
        }
        if let (Some(first), Some(last)) = (grid.parts.first(), grid.parts.last()) {
            covered = last.steps.end - first.steps.start;
        }
        assert_eq!(covered, grid.n_steps());
    }

    #[test]
    fn gradient_corners_present() {
        let seq = demo_sequence();
        let grid = discretize(&seq, DEFAULT_DT_GR, DEFAULT_DT_RF);
        // ramp-up end of the readout gradient at 1ms + 0.2ms
        let corner = 1e-3 + 2e-4;
        assert!(
            grid.t.iter().any(|&t| (t - corner).abs() <= EPS_TIME),
            "missing corner time"
        );
    }
}
