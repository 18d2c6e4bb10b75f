/*
 A pulse (in this module) is a normalized waveform shape with unit peak
 magnitude. Normalized power is what links a shape to physical quantities:
 flip angle for RF, zeroth moment for gradients.
 */

use std::f64::consts::PI;

use num_complex::Complex;

use crate::constants::GAMMA;
use crate::rf_event::RfEvent;

pub trait Pulse {
    fn duration(&self) -> f64;
    /// normalized waveform sampled at the given raster
    fn render(&self, raster: f64) -> Vec<f64>;
    /// integral of the normalized waveform over its duration
    fn power_net(&self, raster: f64) -> f64 {
        utils::trapz(&self.render(raster), raster)
    }
    /// peak magnitude that yields the requested net power
    fn magnitude_net(&self, power_net: f64, raster: f64) -> f64 {
        power_net / self.power_net(raster)
    }
    /// scale the shape into an RF event reaching the given flip angle
    fn to_rf(&self, flip_rad: f64, raster: f64, delay: f64, phase: f64) -> RfEvent {
        let b1 = self.magnitude_net(flip_rad / GAMMA, raster);
        let amplitude = self
            .render(raster)
            .iter()
            .map(|v| Complex::new(b1 * v, 0.0))
            .collect();
        RfEvent::new(amplitude, raster, delay, 0.0, phase)
    }
}

#[derive(Clone, Copy)]
pub struct Hardpulse {
    duration: f64,
}

impl Hardpulse {
    pub fn new(duration: f64) -> Hardpulse {
        assert!(duration > 0.0, "duration must be positive");
        Hardpulse { duration }
    }
    pub fn bandwidth_hz(&self) -> f64 {
        1.0 / (4.0 * self.duration)
    }
}

impl Pulse for Hardpulse {
    fn duration(&self) -> f64 {
        self.duration
    }
    fn render(&self, raster: f64) -> Vec<f64> {
        let n = (self.duration / raster).round().max(1.0) as usize;
        vec![1.0; n]
    }
    fn power_net(&self, _raster: f64) -> f64 {
        self.duration
    }
}

#[derive(Clone, Copy)]
pub struct HalfSin {
    pub duration: f64,
}

impl HalfSin {
    pub fn new(duration: f64) -> HalfSin {
        assert!(duration > 0.0, "duration must be positive");
        HalfSin { duration }
    }
}

impl Pulse for HalfSin {
    fn duration(&self) -> f64 {
        self.duration
    }
    fn render(&self, raster: f64) -> Vec<f64> {
        let n = (self.duration / raster).round().max(2.0) as usize;
        (0..n)
            .map(|i| (PI * i as f64 / (n - 1) as f64).sin())
            .collect()
    }
    fn power_net(&self, _raster: f64) -> f64 {
        2.0 * self.duration / PI
    }
}

pub struct SincPulse {
    duration: f64,
    n_lobes: u16,
}

impl SincPulse {
    pub fn new(duration: f64, lobes: u16) -> SincPulse {
        let lobes = if lobes % 2 == 0 { lobes + 1 } else { lobes };
        SincPulse {
            duration,
            n_lobes: lobes,
        }
    }
}

impl Pulse for SincPulse {
    fn duration(&self) -> f64 {
        self.duration
    }
    fn render(&self, raster: f64) -> Vec<f64> {
        let n = (self.duration / raster).floor().max(2.0) as usize;
        let half = (self.n_lobes + 1) as f64 / 2.0;
        (0..n)
            .map(|i| {
                // symmetric argument spanning +/- (lobes+1)/2 periods
                let x = (2.0 * i as f64 / (n - 1) as f64 - 1.0) * half;
                if x == 0.0 {
                    1.0
                } else {
                    (PI * x).sin() / (PI * x)
                }
            })
            .collect()
    }
}
