use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::OnceLock;

use num_complex::Complex;
use phantom::Phantom;
use rayon::prelude::*;
use tracing::{debug, info, warn};

use crate::kernels::{excite_spin, precess_spin};
use crate::sampling::PartSamples;

/// a kernel launch covers at least this many spin-step updates so the
/// dispatch cost amortizes
pub const MIN_UPDATES_PER_BATCH: usize = 10_000;

/// Argument pack for one kernel launch over all spins of a part. The
/// magnetization slices are written in disjoint slots; `signal` receives
/// the order-independent per-sample sums.
pub struct KernelArgs<'a> {
    pub part: &'a PartSamples,
    pub phantom: &'a Phantom,
    pub mxy: &'a mut [Complex<f64>],
    pub mz: &'a mut [f64],
    pub signal: &'a mut [Complex<f64>],
    /// per-spin samples, spin-major, length n_spins * part.adc.len()
    pub dict: Option<&'a mut [Complex<f64>]>,
}

pub enum Kernel<'a> {
    Precess(KernelArgs<'a>),
    Excite(KernelArgs<'a>),
}

/// The integrator sees compute through this interface. Buffer traffic
/// (allocate/copy in/copy out) collapses to no-ops on the host backend; a
/// device provider interns its copies behind the same launches.
pub trait ComputeBackend: Send + Sync {
    fn name(&self) -> &'static str;
    fn launch(&self, kernel: Kernel<'_>);
    /// barrier after asynchronous launches; the host backend is already
    /// synchronous
    fn synchronize(&self) {}
}

/// Thread-parallel host backend.
pub struct CpuBackend;

type SpinFn = fn(&PartSamples, &Phantom, usize, &mut Complex<f64>, &mut f64, &mut [Complex<f64>]);

impl CpuBackend {
    fn run(args: KernelArgs<'_>, spin_fn: SpinFn) {
        let n_spins = args.mxy.len();
        if n_spins == 0 {
            return;
        }
        let part = args.part;
        let ph = args.phantom;
        let k = part.adc.len();
        let steps = part.n_steps().max(1);
        let batch = ((MIN_UPDATES_PER_BATCH + steps - 1) / steps).clamp(1, n_spins);

        let process = |offset: usize,
                       mxy_c: &mut [Complex<f64>],
                       mz_c: &mut [f64],
                       mut dict_c: Option<&mut [Complex<f64>]>|
         -> Vec<Complex<f64>> {
            let mut local = vec![Complex::new(0.0, 0.0); k];
            let mut scratch = vec![Complex::new(0.0, 0.0); k];
            for j in 0..mxy_c.len() {
                scratch.iter_mut().for_each(|v| *v = Complex::new(0.0, 0.0));
                spin_fn(part, ph, offset + j, &mut mxy_c[j], &mut mz_c[j], &mut scratch);
                for (l, v) in scratch.iter().enumerate() {
                    local[l] += v;
                }
                if let Some(d) = dict_c.as_mut() {
                    d[j * k..(j + 1) * k].copy_from_slice(&scratch);
                }
            }
            local
        };

        let zero = || vec![Complex::new(0.0, 0.0); k];
        let add = |mut a: Vec<Complex<f64>>, b: Vec<Complex<f64>>| {
            for (x, y) in a.iter_mut().zip(b) {
                *x += y;
            }
            a
        };

        let sums = match args.dict.filter(|_| k > 0) {
            Some(dict) => args
                .mxy
                .par_chunks_mut(batch)
                .zip(args.mz.par_chunks_mut(batch))
                .zip(dict.par_chunks_mut(batch * k))
                .enumerate()
                .map(|(bi, ((mxy_c, mz_c), dict_c))| {
                    process(bi * batch, mxy_c, mz_c, Some(dict_c))
                })
                .reduce(zero, add),
            None => args
                .mxy
                .par_chunks_mut(batch)
                .zip(args.mz.par_chunks_mut(batch))
                .enumerate()
                .map(|(bi, (mxy_c, mz_c))| process(bi * batch, mxy_c, mz_c, None))
                .reduce(zero, add),
        };

        for (s, v) in args.signal.iter_mut().zip(sums) {
            *s += v;
        }
    }
}

impl ComputeBackend for CpuBackend {
    fn name(&self) -> &'static str {
        "cpu"
    }

    fn launch(&self, kernel: Kernel<'_>) {
        match kernel {
            Kernel::Precess(args) => CpuBackend::run(args, precess_spin),
            Kernel::Excite(args) => CpuBackend::run(args, excite_spin),
        }
    }
}

static CPU: CpuBackend = CpuBackend;
static SELECTED: OnceLock<&'static dyn ComputeBackend> = OnceLock::new();

/// accelerator providers found functional in this process; none are
/// compiled into a host-only build
fn accelerator_providers() -> Vec<&'static dyn ComputeBackend> {
    Vec::new()
}

/// Process-wide backend handle. The first caller probes the available
/// providers and the decision is published for everyone after; ambiguous
/// or empty probe results bind the CPU.
pub fn select() -> &'static dyn ComputeBackend {
    *SELECTED.get_or_init(|| {
        let providers = accelerator_providers();
        match providers.len() {
            1 => {
                info!(backend = providers[0].name(), "accelerator backend bound");
                providers[0]
            }
            0 => {
                debug!("no accelerator provider is functional, binding cpu");
                &CPU
            }
            n => {
                warn!(
                    candidates = n,
                    "multiple accelerator providers are functional, falling back to cpu"
                );
                &CPU
            }
        }
    })
}

/// Resolve the backend for a run. A GPU request that cannot be honored
/// degrades to the CPU with a single warning for the whole process.
pub fn request(gpu: bool) -> &'static dyn ComputeBackend {
    let b = select();
    if gpu && b.name() == "cpu" {
        static WARNED: AtomicBool = AtomicBool::new(false);
        if !WARNED.swap(true, Ordering::Relaxed) {
            warn!("gpu requested but no accelerator is available, running on cpu");
        }
    }
    b
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn selection_is_stable() {
        let a = select();
        let b = select();
        assert!(std::ptr::eq(a, b));
        assert_eq!(select().name(), "cpu");
    }

    #[test]
    fn gpu_request_degrades_to_cpu() {
        assert_eq!(request(true).name(), "cpu");
        assert_eq!(request(false).name(), "cpu");
    }
}
