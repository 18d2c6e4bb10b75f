use ndarray::Array2;

/// Per-spin displacement field as a tagged variant. Every arm evaluates in
/// O(1) per spin per time point and carries no captured state, so the whole
/// model ships to a compute backend as flat arrays.
#[derive(Clone, Debug)]
pub enum Motion {
    Zero,
    /// constant per-spin velocity in m/s
    Linear {
        vx: Vec<f64>,
        vy: Vec<f64>,
        vz: Vec<f64>,
    },
    /// per-spin displacement tables on a uniform time grid, linear
    /// interpolation between samples. `period` wraps time for cyclic
    /// phantoms; outside the table the trajectory clamps to its ends
    Sampled {
        t0: f64,
        dt: f64,
        period: Option<f64>,
        dx: Array2<f64>,
        dy: Array2<f64>,
        dz: Array2<f64>,
    },
}

impl Default for Motion {
    fn default() -> Motion {
        Motion::Zero
    }
}

impl Motion {
    pub fn displacement(&self, spin: usize, t: f64) -> [f64; 3] {
        match self {
            Motion::Zero => [0.0, 0.0, 0.0],
            Motion::Linear { vx, vy, vz } => [vx[spin] * t, vy[spin] * t, vz[spin] * t],
            Motion::Sampled {
                t0,
                dt,
                period,
                dx,
                dy,
                dz,
            } => {
                let mut tl = t - t0;
                if let Some(p) = period {
                    tl = tl.rem_euclid(*p);
                }
                let k = dx.ncols();
                let s = tl / dt;
                if s <= 0.0 {
                    return [dx[[spin, 0]], dy[[spin, 0]], dz[[spin, 0]]];
                }
                if s >= (k - 1) as f64 {
                    return [
                        dx[[spin, k - 1]],
                        dy[[spin, k - 1]],
                        dz[[spin, k - 1]],
                    ];
                }
                let i = s as usize;
                let frac = s - i as f64;
                let pick = |a: &Array2<f64>| {
                    (1.0 - frac) * a[[spin, i]] + frac * a[[spin, i + 1]]
                };
                [pick(dx), pick(dy), pick(dz)]
            }
        }
    }

    /// check per-spin table sizes; Err carries (field, found)
    pub fn validate(&self, n_spins: usize) -> Result<(), (&'static str, usize)> {
        match self {
            Motion::Zero => Ok(()),
            Motion::Linear { vx, vy, vz } => {
                for (field, len) in [("vx", vx.len()), ("vy", vy.len()), ("vz", vz.len())] {
                    if len != n_spins {
                        return Err((field, len));
                    }
                }
                Ok(())
            }
            Motion::Sampled { dx, dy, dz, .. } => {
                for (field, rows) in [
                    ("dx", dx.nrows()),
                    ("dy", dy.nrows()),
                    ("dz", dz.nrows()),
                ] {
                    if rows != n_spins {
                        return Err((field, rows));
                    }
                }
                Ok(())
            }
        }
    }

    pub fn subset(&self, range: std::ops::Range<usize>) -> Motion {
        match self {
            Motion::Zero => Motion::Zero,
            Motion::Linear { vx, vy, vz } => Motion::Linear {
                vx: vx[range.clone()].to_vec(),
                vy: vy[range.clone()].to_vec(),
                vz: vz[range].to_vec(),
            },
            Motion::Sampled {
                t0,
                dt,
                period,
                dx,
                dy,
                dz,
            } => Motion::Sampled {
                t0: *t0,
                dt: *dt,
                period: *period,
                dx: dx.slice(ndarray::s![range.clone(), ..]).to_owned(),
                dy: dy.slice(ndarray::s![range.clone(), ..]).to_owned(),
                dz: dz.slice(ndarray::s![range, ..]).to_owned(),
            },
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn linear_motion() {
        let m = Motion::Linear {
            vx: vec![1e-3],
            vy: vec![0.0],
            vz: vec![-1e-3],
        };
        let d = m.displacement(0, 2.0);
        assert!((d[0] - 2e-3).abs() < 1e-12);
        assert!((d[2] + 2e-3).abs() < 1e-12);
    }

    #[test]
    fn sampled_interpolates_and_clamps() {
        let dx = Array2::from_shape_vec((1, 3), vec![0.0, 1.0, 1.0]).unwrap();
        let m = Motion::Sampled {
            t0: 0.0,
            dt: 1.0,
            period: None,
            dx: dx.clone(),
            dy: dx.clone(),
            dz: dx,
        };
        assert!((m.displacement(0, 0.5)[0] - 0.5).abs() < 1e-12);
        assert_eq!(m.displacement(0, -1.0)[0], 0.0);
        assert_eq!(m.displacement(0, 10.0)[0], 1.0);
    }

    #[test]
    fn periodic_wraps() {
        let dx = Array2::from_shape_vec((1, 3), vec![0.0, 1.0, 0.0]).unwrap();
        let m = Motion::Sampled {
            t0: 0.0,
            dt: 0.5,
            period: Some(1.0),
            dx: dx.clone(),
            dy: dx.clone(),
            dz: dx,
        };
        assert!((m.displacement(0, 0.25)[0] - 0.5).abs() < 1e-12);
        assert!((m.displacement(0, 1.25)[0] - 0.5).abs() < 1e-12);
    }

    #[test]
    fn validate_catches_short_tables() {
        let m = Motion::Linear {
            vx: vec![0.0; 2],
            vy: vec![0.0; 2],
            vz: vec![0.0; 1],
        };
        assert_eq!(m.validate(2), Err(("vz", 1)));
    }
}
