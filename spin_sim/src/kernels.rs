// operator splitting for the Bloch equations: hard rotation about the
// effective field, then the relaxation operator, per time step

use num_complex::Complex;
use phantom::Phantom;
use seq_tools::constants::GAMMA;

use crate::sampling::PartSamples;

/// rotate (mx,my,mz) clockwise by phi about the unit axis n
#[inline]
fn rotate(m: [f64; 3], n: [f64; 3], phi: f64) -> [f64; 3] {
    let cosphi = phi.cos();
    let onemcosphi = 1.0 - cosphi;
    let sinphi = phi.sin();
    let nxsinphi = n[0] * sinphi;
    let nysinphi = n[1] * sinphi;
    let nzsinphi = n[2] * sinphi;
    let nxnx = n[0] * n[0];
    let nyny = n[1] * n[1];
    let nznz = n[2] * n[2];
    let nxny = n[0] * n[1];
    let nxnz = n[0] * n[2];
    let nynz = n[1] * n[2];
    [
        (nxnx + (1.0 - nxnx) * cosphi) * m[0]
            + (nxny * onemcosphi + nzsinphi) * m[1]
            + (nxnz * onemcosphi - nysinphi) * m[2],
        (nxny * onemcosphi - nzsinphi) * m[0]
            + (nyny + (1.0 - nyny) * cosphi) * m[1]
            + (nynz * onemcosphi + nxsinphi) * m[2],
        (nxnz * onemcosphi + nysinphi) * m[0]
            + (nynz * onemcosphi - nxsinphi) * m[1]
            + (nznz + (1.0 - nznz) * cosphi) * m[2],
    ]
}

#[inline]
fn relax(mxy: Complex<f64>, mz: f64, rho: f64, t1: f64, t2: f64, dt: f64) -> (Complex<f64>, f64) {
    let e2 = (-dt / t2).exp();
    let e1 = (-dt / t1).exp();
    (mxy * e2, rho + (mz - rho) * e1)
}

/// advance one spin through an RF-off part, recording ADC samples into
/// `out` (one slot per sample carried by the part)
pub fn precess_spin(
    part: &PartSamples,
    phantom: &Phantom,
    spin: usize,
    mxy: &mut Complex<f64>,
    mz: &mut f64,
    out: &mut [Complex<f64>],
) {
    let rho = phantom.rho[spin];
    let t1 = phantom.t1[spin];
    let t2 = phantom.t2[spin];
    let dw = phantom.dw[spin];

    let omega = |i: usize| {
        let r = phantom.position(spin, part.t[i]);
        GAMMA * (part.gx[i] * r[0] + part.gy[i] * r[1] + part.gz[i] * r[2]) + dw
    };

    let mut cursor = 0;
    let mut w0 = omega(0);
    for i in 0..part.n_steps() {
        while cursor < part.adc.len() && part.adc[cursor].0 == i {
            out[cursor] = *mxy * Complex::from_polar(1.0, -part.adc[cursor].1);
            cursor += 1;
        }
        let dt = part.t[i + 1] - part.t[i];
        let w1 = omega(i + 1);
        // trapezoidal phase over the step
        let phi = 0.5 * (w0 + w1) * dt;
        let (nxy, nz) = relax(*mxy * Complex::from_polar(1.0, -phi), *mz, rho, t1, t2, dt);
        *mxy = nxy;
        *mz = nz;
        w0 = w1;
    }
}

/// advance one spin through an RF-on part with the full rotation operator
pub fn excite_spin(
    part: &PartSamples,
    phantom: &Phantom,
    spin: usize,
    mxy: &mut Complex<f64>,
    mz: &mut f64,
    out: &mut [Complex<f64>],
) {
    let rho = phantom.rho[spin];
    let t1 = phantom.t1[spin];
    let t2 = phantom.t2[spin];
    let dw = phantom.dw[spin];

    let mut cursor = 0;
    for i in 0..part.n_steps() {
        while cursor < part.adc.len() && part.adc[cursor].0 == i {
            out[cursor] = *mxy * Complex::from_polar(1.0, -part.adc[cursor].1);
            cursor += 1;
        }
        let dt = part.t[i + 1] - part.t[i];
        let r = phantom.position(spin, part.t[i]);
        let b1 = part.b1[i];
        let bz = part.gx[i] * r[0] + part.gy[i] * r[1] + part.gz[i] * r[2] + dw / GAMMA;
        let norm = (b1.norm_sqr() + bz * bz).sqrt();
        if norm > 0.0 {
            let n = [b1.re / norm, b1.im / norm, bz / norm];
            let phi = GAMMA * norm * dt;
            let m = rotate([mxy.re, mxy.im, *mz], n, phi);
            *mxy = Complex::new(m[0], m[1]);
            *mz = m[2];
        }
        let (nxy, nz) = relax(*mxy, *mz, rho, t1, t2, dt);
        *mxy = nxy;
        *mz = nz;
    }
}
