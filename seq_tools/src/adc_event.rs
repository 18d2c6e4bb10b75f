/// Receiver sampling window. Samples fall at the center of each dwell
/// period: delay + (k + 1/2) * dwell.
#[derive(Clone, Debug)]
pub struct AdcEvent {
    pub n: usize,
    pub dwell: f64,
    pub delay: f64,
    /// receiver phase offset in rad
    pub phase: f64,
}

impl AdcEvent {
    pub fn new(n: usize, dwell: f64, delay: f64, phase: f64) -> AdcEvent {
        assert!(dwell > 0.0, "dwell time must be positive");
        assert!(delay >= 0.0, "adc delay must be positive or 0");
        AdcEvent {
            n,
            dwell,
            delay,
            phase,
        }
    }

    pub fn duration(&self) -> f64 {
        self.delay + self.n as f64 * self.dwell
    }

    pub fn is_on(&self) -> bool {
        self.n > 0
    }

    /// block-local sample times, center-of-dwell convention
    pub fn sample_times(&self) -> Vec<f64> {
        (0..self.n)
            .map(|k| self.delay + (k as f64 + 0.5) * self.dwell)
            .collect()
    }
}
