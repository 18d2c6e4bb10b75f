use num_complex::Complex;
use rustfft::FftPlanner;

/// n evenly spaced values covering [a,b] inclusive
pub fn linspace(a: f64, b: f64, n: usize) -> Vec<f64> {
    if n == 0 {
        return Vec::new();
    }
    if n == 1 {
        return vec![a];
    }
    let step = (b - a) / (n - 1) as f64;
    (0..n).map(|i| a + step * i as f64).collect()
}

pub fn trapz(a: &[f64], dt: f64) -> f64 {
    let mut sum = 0.0;
    for i in 0..a.len().saturating_sub(1) {
        sum += dt * (a[i] + a[i + 1]) / 2.0;
    }
    sum
}

/// trapezoid rule on a non-uniform grid
pub fn trapz_t(a: &[f64], t: &[f64]) -> f64 {
    let mut sum = 0.0;
    for i in 0..a.len().saturating_sub(1) {
        sum += (t[i + 1] - t[i]) * (a[i] + a[i + 1]) / 2.0;
    }
    sum
}

pub fn cumsum(a: &[f64]) -> Vec<f64> {
    let mut sum = 0.0;
    let mut o = Vec::with_capacity(a.len());
    for val in a {
        sum += val;
        o.push(sum);
    }
    o
}

/// cumulative trapezoid integral, same length as the input, starting at 0
pub fn cumtrapz(a: &[f64], dt: f64) -> Vec<f64> {
    let mut atmp = Vec::with_capacity(a.len().saturating_sub(1));
    for i in 0..a.len().saturating_sub(1) {
        atmp.push(dt * (a[i] + a[i + 1]) / 2.0)
    }
    let mut b = cumsum(&atmp);
    b.insert(0, 0.0);
    b
}

/// parameterize the space between x.0 and x.1
pub fn lerp(x: (f64, f64), y: (f64, f64), qx: f64) -> f64 {
    let p = (qx - x.0) / (x.1 - x.0);
    (1.0 - p) * y.0 + p * y.1
}

/// interpolate a sample from sorted abscissa x; clamps outside the domain
pub fn interp1(x: &[f64], y: &[f64], qx: f64) -> f64 {
    let n = x.len() - 1;
    if qx <= x[0] {
        return y[0];
    }
    if qx >= x[n] {
        return y[n];
    }
    let i = match x.binary_search_by(|v| v.partial_cmp(&qx).unwrap()) {
        Ok(i) => i,
        Err(i) => i - 1,
    };
    if i >= n {
        return y[n];
    }
    lerp((x[i], x[i + 1]), (y[i], y[i + 1]), qx)
}

pub fn abs(a: &[f64]) -> Vec<f64> {
    a.iter().map(|v| v.abs()).collect()
}

pub fn real_to_complex(real: &[f64]) -> Vec<Complex<f64>> {
    real.iter().map(|val| Complex::new(*val, 0.0)).collect()
}

/// fourier transform an array of reals and return the magnitude spectrum.
/// fftshift=true moves zero-frequency to the center of the array
pub fn fft_real_abs(real: &[f64], fftshift: bool) -> Vec<f64> {
    let n = real.len();
    let mut fft_planner = FftPlanner::<f64>::new();
    let fft = fft_planner.plan_fft_forward(n);
    let mut complex_tmp = real_to_complex(real);
    fft.process(&mut complex_tmp);
    if fftshift {
        complex_tmp.rotate_right(n / 2);
    }
    complex_tmp.iter().map(|val| val.norm()).collect()
}

/// full-width half-max of the magnitude spectrum of a complex waveform
/// sampled at dt. Returned in Hz.
pub fn bandwidth(waveform: &[Complex<f64>], dt: f64) -> f64 {
    let n = waveform.len();
    let mut fft_planner = FftPlanner::<f64>::new();
    let fft = fft_planner.plan_fft_forward(n);
    let mut spec = waveform.to_vec();
    fft.process(&mut spec);
    spec.rotate_right(n / 2);
    let mag: Vec<f64> = spec.iter().map(|v| v.norm()).collect();
    let peak = mag.iter().cloned().fold(0.0, f64::max);
    let half = peak / 2.0;
    let above: Vec<usize> = (0..n).filter(|&i| mag[i] >= half).collect();
    match (above.first(), above.last()) {
        (Some(&lo), Some(&hi)) => {
            let df = 1.0 / (n as f64 * dt);
            (hi - lo + 1) as f64 * df
        }
        _ => 0.0,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn linspace_endpoints() {
        let v = linspace(0.0, 1.0, 11);
        assert_eq!(v.len(), 11);
        assert_eq!(v[0], 0.0);
        assert!((v[10] - 1.0).abs() < 1e-12);
        assert!((v[5] - 0.5).abs() < 1e-12);
    }

    #[test]
    fn trapz_of_ramp() {
        // integral of t over [0,1] is 1/2
        let t = linspace(0.0, 1.0, 101);
        let dt = t[1] - t[0];
        assert!((trapz(&t, dt) - 0.5).abs() < 1e-9);
    }

    #[test]
    fn cumtrapz_matches_trapz() {
        let a = vec![1.0, 3.0, 2.0, 5.0];
        let c = cumtrapz(&a, 0.5);
        assert_eq!(c.len(), a.len());
        assert_eq!(c[0], 0.0);
        assert!((c[3] - trapz(&a, 0.5)).abs() < 1e-12);
    }

    #[test]
    fn interp_clamps_and_interpolates() {
        let x = vec![0.0, 1.0, 2.0];
        let y = vec![0.0, 10.0, 0.0];
        assert_eq!(interp1(&x, &y, -1.0), 0.0);
        assert_eq!(interp1(&x, &y, 3.0), 0.0);
        assert!((interp1(&x, &y, 0.5) - 5.0).abs() < 1e-12);
        assert!((interp1(&x, &y, 1.5) - 5.0).abs() < 1e-12);
    }

    #[test]
    fn hard_pulse_bandwidth_scales_inversely_with_duration() {
        // 1ms rect pulse zero-padded into a 100ms window: fwhm of sinc is ~1.2/T
        let dt = 1e-5;
        let n = 10_000;
        let mut w = vec![Complex::new(0.0, 0.0); n];
        for v in w.iter_mut().take(100) {
            *v = Complex::new(1.0, 0.0);
        }
        let bw = bandwidth(&w, dt);
        let expected = 1.2 / 1e-3;
        assert!((bw - expected).abs() / expected < 0.2, "bw {}", bw);
    }
}
