use std::fmt;

use ndarray::Array2;
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};

pub mod motion;

pub use motion::Motion;

pub type Result<T> = std::result::Result<T, Error>;

#[derive(Debug)]
pub enum Error {
    /// per-spin arrays of unequal length
    ShapeMismatch { field: &'static str, expected: usize, found: usize },
    /// relaxation times must be strictly positive and T2 <= T2*
    InvalidRelaxation { spin: usize },
}

impl fmt::Display for Error {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Error::ShapeMismatch { field, expected, found } => {
                write!(f, "phantom array '{}' has {} entries, expected {}", field, found, expected)
            }
            Error::InvalidRelaxation { spin } => {
                write!(f, "invalid relaxation times for spin {}", spin)
            }
        }
    }
}

impl std::error::Error for Error {}

/// A spatial cloud of spin isochromats. Arrays are indexed per spin; the
/// motion model returns a displacement for any spin at any time.
#[derive(Clone, Debug, Default)]
pub struct Phantom {
    pub name: String,
    pub x: Vec<f64>,
    pub y: Vec<f64>,
    pub z: Vec<f64>,
    /// proton density
    pub rho: Vec<f64>,
    pub t1: Vec<f64>,
    pub t2: Vec<f64>,
    pub t2s: Vec<f64>,
    /// off-resonance in rad/s
    pub dw: Vec<f64>,
    // diffusion tensor parameters, carried for sequence design tooling
    pub d_lambda1: Vec<f64>,
    pub d_lambda2: Vec<f64>,
    pub d_theta: Vec<f64>,
    pub motion: Motion,
}

impl Phantom {
    /// minimal constructor; T2* defaults to T2, everything else to zero
    pub fn new(
        name: &str,
        x: Vec<f64>,
        y: Vec<f64>,
        z: Vec<f64>,
        rho: Vec<f64>,
        t1: Vec<f64>,
        t2: Vec<f64>,
    ) -> Result<Phantom> {
        let n = x.len();
        let t2s = t2.clone();
        let p = Phantom {
            name: name.to_string(),
            x,
            y,
            z,
            rho,
            t1,
            t2,
            t2s,
            dw: vec![0.0; n],
            d_lambda1: vec![0.0; n],
            d_lambda2: vec![0.0; n],
            d_theta: vec![0.0; n],
            motion: Motion::Zero,
        };
        p.validate()?;
        Ok(p)
    }

    /// single stationary spin at a position
    pub fn point(x: f64, y: f64, z: f64, rho: f64, t1: f64, t2: f64) -> Phantom {
        Phantom::new("point", vec![x], vec![y], vec![z], vec![rho], vec![t1], vec![t2])
            .expect("point phantom is always well formed")
    }

    /// n spins at the origin performing independent random walks with step
    /// variance 2*D*dt per axis; the walk is stored as sampled motion
    pub fn brownian(
        n: usize,
        diffusivity: f64,
        duration: f64,
        n_steps: usize,
        t1: f64,
        t2: f64,
        seed: u64,
    ) -> Phantom {
        assert!(n_steps >= 2, "random walk needs at least 2 samples");
        let mut rng = StdRng::seed_from_u64(seed);
        let dt = duration / (n_steps - 1) as f64;
        let sigma = (2.0 * diffusivity * dt).sqrt();
        let mut walk = || {
            let mut d = Array2::<f64>::zeros((n, n_steps));
            for i in 0..n {
                let mut pos = 0.0;
                for k in 1..n_steps {
                    // Box-Muller from two uniform draws
                    let u1: f64 = rng.gen_range(f64::MIN_POSITIVE..1.0);
                    let u2: f64 = rng.gen_range(0.0..1.0);
                    let g = (-2.0 * u1.ln()).sqrt()
                        * (2.0 * std::f64::consts::PI * u2).cos();
                    pos += sigma * g;
                    d[[i, k]] = pos;
                }
            }
            d
        };
        let dx = walk();
        let dy = walk();
        let dz = walk();
        let mut p = Phantom::new(
            "brownian",
            vec![0.0; n],
            vec![0.0; n],
            vec![0.0; n],
            vec![1.0; n],
            vec![t1; n],
            vec![t2; n],
        )
        .expect("brownian phantom arrays are uniform");
        p.motion = Motion::Sampled {
            t0: 0.0,
            dt,
            period: None,
            dx,
            dy,
            dz,
        };
        p
    }

    pub fn len(&self) -> usize {
        self.x.len()
    }

    pub fn is_empty(&self) -> bool {
        self.x.is_empty()
    }

    pub fn validate(&self) -> Result<()> {
        let n = self.x.len();
        let check = |field: &'static str, len: usize| {
            if len != n {
                Err(Error::ShapeMismatch { field, expected: n, found: len })
            } else {
                Ok(())
            }
        };
        check("y", self.y.len())?;
        check("z", self.z.len())?;
        check("rho", self.rho.len())?;
        check("t1", self.t1.len())?;
        check("t2", self.t2.len())?;
        check("t2s", self.t2s.len())?;
        check("dw", self.dw.len())?;
        check("d_lambda1", self.d_lambda1.len())?;
        check("d_lambda2", self.d_lambda2.len())?;
        check("d_theta", self.d_theta.len())?;
        self.motion.validate(n).map_err(|(field, found)| Error::ShapeMismatch {
            field,
            expected: n,
            found,
        })?;
        for i in 0..n {
            if !(self.t1[i] > 0.0) || !(self.t2[i] > 0.0) || self.t2[i] > self.t2s[i] {
                return Err(Error::InvalidRelaxation { spin: i });
            }
        }
        Ok(())
    }

    /// spin position at a time, motion applied
    pub fn position(&self, spin: usize, t: f64) -> [f64; 3] {
        let d = self.motion.displacement(spin, t);
        [self.x[spin] + d[0], self.y[spin] + d[1], self.z[spin] + d[2]]
    }

    /// scale proton density (and with it the equilibrium magnetization)
    pub fn scale_density(&mut self, factor: f64) {
        self.rho.iter_mut().for_each(|r| *r *= factor);
    }

    /// contiguous spin range as a new phantom
    pub fn subset(&self, range: std::ops::Range<usize>) -> Phantom {
        Phantom {
            name: self.name.clone(),
            x: self.x[range.clone()].to_vec(),
            y: self.y[range.clone()].to_vec(),
            z: self.z[range.clone()].to_vec(),
            rho: self.rho[range.clone()].to_vec(),
            t1: self.t1[range.clone()].to_vec(),
            t2: self.t2[range.clone()].to_vec(),
            t2s: self.t2s[range.clone()].to_vec(),
            dw: self.dw[range.clone()].to_vec(),
            d_lambda1: self.d_lambda1[range.clone()].to_vec(),
            d_lambda2: self.d_lambda2[range.clone()].to_vec(),
            d_theta: self.d_theta[range.clone()].to_vec(),
            motion: self.motion.subset(range),
        }
    }

    /// merge two stationary phantoms into one cloud
    pub fn concat(mut self, other: Phantom) -> Phantom {
        assert!(
            matches!(self.motion, Motion::Zero) && matches!(other.motion, Motion::Zero),
            "concat requires stationary phantoms"
        );
        self.x.extend(other.x);
        self.y.extend(other.y);
        self.z.extend(other.z);
        self.rho.extend(other.rho);
        self.t1.extend(other.t1);
        self.t2.extend(other.t2);
        self.t2s.extend(other.t2s);
        self.dw.extend(other.dw);
        self.d_lambda1.extend(other.d_lambda1);
        self.d_lambda2.extend(other.d_lambda2);
        self.d_theta.extend(other.d_theta);
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn point_phantom_is_valid() {
        let p = Phantom::point(0.0, 0.0, 0.0, 1.0, 1.0, 0.1);
        assert_eq!(p.len(), 1);
        assert!(p.validate().is_ok());
        assert_eq!(p.t2s[0], p.t2[0]);
    }

    #[test]
    fn shape_mismatch_detected() {
        let mut p = Phantom::point(0.0, 0.0, 0.0, 1.0, 1.0, 0.1);
        p.rho.push(1.0);
        assert!(matches!(p.validate(), Err(Error::ShapeMismatch { .. })));
    }

    #[test]
    fn bad_relaxation_detected() {
        let mut p = Phantom::point(0.0, 0.0, 0.0, 1.0, 1.0, 0.1);
        p.t2s[0] = 0.05; // T2 > T2*
        assert!(matches!(p.validate(), Err(Error::InvalidRelaxation { spin: 0 })));
        let mut q = Phantom::point(0.0, 0.0, 0.0, 1.0, 1.0, 0.1);
        q.t1[0] = 0.0;
        assert!(q.validate().is_err());
    }

    #[test]
    fn subset_and_concat() {
        let a = Phantom::point(0.0, 0.0, 0.0, 1.0, 1.0, 0.1);
        let b = Phantom::point(1e-3, 0.0, 0.0, 2.0, 1.0, 0.1);
        let c = a.concat(b);
        assert_eq!(c.len(), 2);
        let s = c.subset(1..2);
        assert_eq!(s.len(), 1);
        assert_eq!(s.rho[0], 2.0);
        assert_eq!(s.x[0], 1e-3);
    }

    #[test]
    fn brownian_walk_variance() {
        let d = 2e-9;
        let duration = 20e-3;
        let p = Phantom::brownian(4000, d, duration, 200, 1.0, 1.0, 42);
        assert!(p.validate().is_ok());
        // <x^2> = 2 D t at the end of the walk
        let var: f64 = (0..p.len())
            .map(|i| {
                let r = p.motion.displacement(i, duration);
                r[0] * r[0]
            })
            .sum::<f64>()
            / p.len() as f64;
        let expected = 2.0 * d * duration;
        assert!(
            (var - expected).abs() / expected < 0.1,
            "variance {} vs {}",
            var,
            expected
        );
    }

    #[test]
    fn density_scaling() {
        let mut p = Phantom::point(0.0, 0.0, 0.0, 1.0, 1.0, 0.1);
        p.scale_density(0.5);
        assert_eq!(p.rho[0], 0.5);
    }
}
