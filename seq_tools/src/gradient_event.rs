/// Gradient waveform on a single axis. A trapezoid is defined by its timing
/// segments; anything else is a sampled piecewise-linear waveform on a
/// uniform raster. Amplitudes are in T/m.
#[derive(Clone, Debug)]
pub enum GradEvent {
    Trap(TrapGrad),
    Arbitrary(ArbGrad),
}

#[derive(Clone, Debug)]
pub struct TrapGrad {
    pub amplitude: f64,
    pub delay: f64,
    pub rise: f64,
    pub flat: f64,
    pub fall: f64,
}

#[derive(Clone, Debug)]
pub struct ArbGrad {
    pub samples: Vec<f64>,
    pub raster: f64,
    pub delay: f64,
}

impl GradEvent {
    pub fn trap(amplitude: f64, delay: f64, rise: f64, flat: f64, fall: f64) -> GradEvent {
        assert!(delay >= 0.0 && rise >= 0.0 && flat >= 0.0 && fall >= 0.0,
            "gradient timing segments must be positive or 0");
        GradEvent::Trap(TrapGrad {
            amplitude,
            delay,
            rise,
            flat,
            fall,
        })
    }

    pub fn arbitrary(samples: Vec<f64>, raster: f64, delay: f64) -> GradEvent {
        assert!(!samples.is_empty(), "gradient waveform needs at least one sample");
        assert!(raster > 0.0, "gradient raster must be positive");
        assert!(delay >= 0.0, "gradient delay must be positive or 0");
        GradEvent::Arbitrary(ArbGrad {
            samples,
            raster,
            delay,
        })
    }

    pub fn duration(&self) -> f64 {
        match self {
            GradEvent::Trap(g) => g.delay + g.rise + g.flat + g.fall,
            GradEvent::Arbitrary(g) => g.delay + (g.samples.len() - 1).max(1) as f64 * g.raster,
        }
    }

    pub fn end_time(&self) -> f64 {
        self.duration()
    }

    pub fn is_on(&self) -> bool {
        match self {
            GradEvent::Trap(g) => g.rise + g.flat + g.fall > 0.0,
            GradEvent::Arbitrary(g) => g.samples.len() > 1,
        }
    }

    /// theoretical corner times (block-local). For a sampled waveform every
    /// sample is a corner
    pub fn corners(&self) -> Vec<f64> {
        match self {
            GradEvent::Trap(g) => vec![
                g.delay,
                g.delay + g.rise,
                g.delay + g.rise + g.flat,
                g.delay + g.rise + g.flat + g.fall,
            ],
            GradEvent::Arbitrary(g) => (0..g.samples.len())
                .map(|i| g.delay + i as f64 * g.raster)
                .collect(),
        }
    }

    /// amplitude at a block-local time. Zero outside the waveform
    pub fn amp_at(&self, t_block: f64) -> f64 {
        match self {
            GradEvent::Trap(g) => {
                let tl = t_block - g.delay;
                if tl < 0.0 || tl > g.rise + g.flat + g.fall {
                    0.0
                } else if tl < g.rise {
                    g.amplitude * tl / g.rise
                } else if tl <= g.rise + g.flat {
                    g.amplitude
                } else {
                    let td = tl - g.rise - g.flat;
                    g.amplitude * (1.0 - td / g.fall)
                }
            }
            GradEvent::Arbitrary(g) => {
                if g.samples.len() < 2 {
                    return 0.0;
                }
                let tl = t_block - g.delay;
                let span = (g.samples.len() - 1) as f64 * g.raster;
                if tl < 0.0 || tl > span {
                    return 0.0;
                }
                let i = ((tl / g.raster) as usize).min(g.samples.len() - 2);
                let t0 = i as f64 * g.raster;
                utils::lerp(
                    (t0, t0 + g.raster),
                    (g.samples[i], g.samples[i + 1]),
                    tl,
                )
            }
        }
    }

    /// zeroth moment in T/m * s
    pub fn area(&self) -> f64 {
        match self {
            GradEvent::Trap(g) => g.amplitude * (g.rise / 2.0 + g.flat + g.fall / 2.0),
            GradEvent::Arbitrary(g) => utils::trapz(&g.samples, g.raster),
        }
    }

    pub fn scaled(&self, factor: f64) -> GradEvent {
        match self {
            GradEvent::Trap(g) => {
                let mut g = g.clone();
                g.amplitude *= factor;
                GradEvent::Trap(g)
            }
            GradEvent::Arbitrary(g) => {
                let mut g = g.clone();
                g.samples.iter_mut().for_each(|s| *s *= factor);
                GradEvent::Arbitrary(g)
            }
        }
    }
}
