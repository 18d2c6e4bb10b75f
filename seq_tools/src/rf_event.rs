use std::f64::consts::PI;

use num_complex::Complex;

use crate::constants::GAMMA;

/// An RF pulse within a block. The complex envelope is sampled on a uniform
/// raster and is played out after an initial delay; the carrier applies a
/// constant phase offset plus a frequency offset accrued from the waveform
/// start.
#[derive(Clone, Debug)]
pub struct RfEvent {
    /// envelope samples in tesla, one per raster tick
    pub amplitude: Vec<Complex<f64>>,
    /// sample spacing in seconds
    pub raster: f64,
    /// dead time before the waveform starts
    pub delay: f64,
    /// carrier frequency offset in Hz
    pub freq_offset: f64,
    /// carrier phase offset in rad
    pub phase_offset: f64,
}

impl RfEvent {
    pub fn new(
        amplitude: Vec<Complex<f64>>,
        raster: f64,
        delay: f64,
        freq_offset: f64,
        phase_offset: f64,
    ) -> RfEvent {
        assert!(!amplitude.is_empty(), "rf envelope needs at least one sample");
        assert!(raster > 0.0, "rf raster must be positive");
        assert!(delay >= 0.0, "rf delay must be positive or 0");
        RfEvent {
            amplitude,
            raster,
            delay,
            freq_offset,
            phase_offset,
        }
    }

    /// constant-envelope pulse reaching the requested flip angle
    pub fn hard(flip_rad: f64, duration: f64, raster: f64, phase_offset: f64) -> RfEvent {
        assert!(duration > 0.0, "pulse duration must be positive");
        let n = (duration / raster).round().max(1.0) as usize;
        let b1 = flip_rad / (GAMMA * n as f64 * raster);
        RfEvent::new(
            vec![Complex::new(b1, 0.0); n],
            raster,
            0.0,
            0.0,
            phase_offset,
        )
    }

    /// waveform play-out time, excluding the delay
    pub fn duration(&self) -> f64 {
        self.amplitude.len() as f64 * self.raster
    }

    pub fn end_time(&self) -> f64 {
        self.delay + self.duration()
    }

    pub fn is_on(&self) -> bool {
        self.duration() > 0.0
    }

    /// block-local time of the first envelope maximum, including the delay
    pub fn center(&self) -> f64 {
        let mut imax = 0;
        let mut vmax = 0.0;
        for (i, a) in self.amplitude.iter().enumerate() {
            let m = a.norm();
            if m > vmax {
                vmax = m;
                imax = i;
            }
        }
        self.delay + imax as f64 * self.raster
    }

    pub fn peak_b1(&self) -> f64 {
        self.amplitude.iter().map(|a| a.norm()).fold(0.0, f64::max)
    }

    /// on-resonance flip angle in rad
    pub fn flip_angle(&self) -> f64 {
        let mag: Vec<f64> = self.amplitude.iter().map(|a| a.norm()).collect();
        // envelope samples are piecewise constant over the raster
        GAMMA * mag.iter().sum::<f64>() * self.raster
    }

    /// complex B1 at a block-local time, carrier applied. Zero outside the
    /// waveform window
    pub fn b1_at(&self, t_block: f64) -> Complex<f64> {
        let tl = t_block - self.delay;
        if tl < 0.0 || tl > self.duration() {
            return Complex::new(0.0, 0.0);
        }
        let idx = ((tl / self.raster) as usize).min(self.amplitude.len() - 1);
        let env = self.amplitude[idx];
        let carrier = self.phase_offset + 2.0 * PI * self.freq_offset * tl;
        env * Complex::from_polar(1.0, carrier)
    }

    /// spectral full-width half-max of the envelope, zero-padded
    pub fn bandwidth_hz(&self) -> f64 {
        let pad = self.amplitude.len() * 16;
        let mut w = self.amplitude.clone();
        w.resize(pad, Complex::new(0.0, 0.0));
        utils::bandwidth(&w, self.raster)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::f64::consts::FRAC_PI_2;

    #[test]
    fn hard_pulse_flip_angle() {
        let rf = RfEvent::hard(FRAC_PI_2, 1e-3, 1e-6, 0.0);
        assert!((rf.flip_angle() - FRAC_PI_2).abs() / FRAC_PI_2 < 1e-9);
        assert!((rf.duration() - 1e-3).abs() < 1e-9);
    }

    #[test]
    fn center_is_first_peak() {
        let mut amp = vec![Complex::new(0.1e-6, 0.0); 10];
        amp[6] = Complex::new(1.0e-6, 0.0);
        let rf = RfEvent::new(amp, 1e-6, 5e-6, 0.0, 0.0);
        assert!((rf.center() - (5e-6 + 6e-6)).abs() < 1e-12);
    }

    #[test]
    fn carrier_phase_accrues_from_waveform_start() {
        let rf = RfEvent::new(
            vec![Complex::new(1e-6, 0.0); 100],
            1e-6,
            0.0,
            1000.0,
            0.0,
        );
        // 0.25 ms into the pulse the carrier has advanced a quarter turn
        let b1 = rf.b1_at(0.25e-3);
        let expected = Complex::from_polar(1e-6, 2.0 * PI * 1000.0 * 0.25e-3);
        assert!((b1 - expected).norm() < 1e-12);
    }

    #[test]
    fn zero_outside_window() {
        let rf = RfEvent::new(vec![Complex::new(1e-6, 0.0); 10], 1e-6, 1e-5, 0.0, 0.0);
        assert_eq!(rf.b1_at(0.0).norm(), 0.0);
        assert_eq!(rf.b1_at(1e-3).norm(), 0.0);
        assert!(rf.b1_at(1.5e-5).norm() > 0.0);
    }
}
