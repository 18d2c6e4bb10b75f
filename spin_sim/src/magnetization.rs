use num_complex::Complex;
use phantom::Phantom;

/// Evolving state of every spin: transverse component as a complex number,
/// longitudinal component as a real. Owned exclusively by the integrator
/// for the duration of a run.
#[derive(Clone, Debug)]
pub struct Magnetization {
    pub mxy: Vec<Complex<f64>>,
    pub mz: Vec<f64>,
}

impl Magnetization {
    /// thermal equilibrium: nothing transverse, Mz at the proton density
    pub fn equilibrium(phantom: &Phantom) -> Magnetization {
        Magnetization {
            mxy: vec![Complex::new(0.0, 0.0); phantom.len()],
            mz: phantom.rho.clone(),
        }
    }

    pub fn len(&self) -> usize {
        self.mxy.len()
    }

    pub fn is_empty(&self) -> bool {
        self.mxy.is_empty()
    }

    pub fn has_nan(&self) -> bool {
        self.mxy.iter().any(|m| m.re.is_nan() || m.im.is_nan())
            || self.mz.iter().any(|m| m.is_nan())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn equilibrium_matches_density() {
        let p = Phantom::point(0.0, 0.0, 0.0, 0.8, 1.0, 0.1);
        let m = Magnetization::equilibrium(&p);
        assert_eq!(m.len(), 1);
        assert_eq!(m.mz[0], 0.8);
        assert_eq!(m.mxy[0].norm(), 0.0);
        assert!(!m.has_nan());
    }

    #[test]
    fn nan_detection() {
        let p = Phantom::point(0.0, 0.0, 0.0, 1.0, 1.0, 0.1);
        let mut m = Magnetization::equilibrium(&p);
        m.mz[0] = f64::NAN;
        assert!(m.has_nan());
    }
}
