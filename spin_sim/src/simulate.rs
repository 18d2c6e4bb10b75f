use ndarray::Array2;
use num_complex::Complex;
use phantom::Phantom;
use seq_tools::scanner::Scanner;
use seq_tools::sequence::Sequence;
use seq_tools::time_grid::{discretize, DEFAULT_DT_GR, DEFAULT_DT_RF};
use serde::{Deserialize, Serialize};
use tracing::{debug, info};

use crate::backend::{self, Kernel, KernelArgs};
use crate::magnetization::Magnetization;
use crate::sampling::SeqSamples;
use crate::signal::{group_readouts, signal_matrix, SimOutput};
use crate::{CancelToken, Error, Result};

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum SimMethod {
    /// aggregate signal over the phantom
    Bloch,
    /// keep every spin's contribution at every sample
    BlochDict,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum ReturnType {
    /// complex samples as a matrix
    Mat,
    /// final magnetization state
    State,
    /// samples regrouped per readout window
    Raw,
}

#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct SimParams {
    /// nominal gradient/ADC step
    pub dt_gr: f64,
    /// nominal step under RF
    pub dt_rf: f64,
    pub gpu: bool,
    /// worker threads; 0 leaves the pool at its default width
    pub nthreads: usize,
    pub method: SimMethod,
    pub return_type: ReturnType,
}

impl Default for SimParams {
    fn default() -> SimParams {
        SimParams {
            dt_gr: DEFAULT_DT_GR,
            dt_rf: DEFAULT_DT_RF,
            gpu: false,
            nthreads: 0,
            method: SimMethod::Bloch,
            return_type: ReturnType::Mat,
        }
    }
}

#[derive(Debug)]
pub struct SimResult {
    pub output: SimOutput,
    /// false when the run was cancelled and the signal is partial
    pub complete: bool,
}

/// Synchronous simulation entry point: evolve the phantom through the
/// sequence and collect the receiver samples.
pub fn simulate(
    phantom: &Phantom,
    seq: &Sequence,
    scanner: &Scanner,
    params: &SimParams,
) -> Result<SimResult> {
    run(phantom, seq, scanner, params, None)
}

/// Same as [`simulate`] with a cooperative cancellation token, checked
/// between parts.
pub fn simulate_cancellable(
    phantom: &Phantom,
    seq: &Sequence,
    scanner: &Scanner,
    params: &SimParams,
    token: &CancelToken,
) -> Result<SimResult> {
    run(phantom, seq, scanner, params, Some(token))
}

fn run(
    phantom: &Phantom,
    seq: &Sequence,
    scanner: &Scanner,
    params: &SimParams,
    token: Option<&CancelToken>,
) -> Result<SimResult> {
    phantom.validate()?;

    let grid = discretize(seq, params.dt_gr, params.dt_rf);
    let samples = SeqSamples::build(seq, &grid);
    let n_spins = phantom.len();
    let n_adc = samples.n_adc;

    info!(
        spins = n_spins,
        steps = grid.n_steps(),
        adc_samples = n_adc,
        b0 = scanner.b0,
        "starting bloch run"
    );

    let be = backend::request(params.gpu);
    debug!(backend = be.name(), "backend resolved");

    let mut mag = Magnetization::equilibrium(phantom);
    let mut flat: Vec<Complex<f64>> = vec![Complex::new(0.0, 0.0); n_adc];
    let mut dict: Vec<Complex<f64>> = match params.method {
        SimMethod::BlochDict => vec![Complex::new(0.0, 0.0); n_spins * n_adc],
        SimMethod::Bloch => Vec::new(),
    };

    let mut complete = true;
    let mut adc_at = 0;

    let mut body = || {
        for part in &samples.parts {
            if token.map_or(false, |t| t.is_cancelled()) {
                complete = false;
                return Ok(());
            }
            let k = part.adc.len();
            // per-part dict slice, spin-major over this part's samples
            let mut part_dict: Vec<Complex<f64>> = match params.method {
                SimMethod::BlochDict if k > 0 => {
                    vec![Complex::new(0.0, 0.0); n_spins * k]
                }
                _ => Vec::new(),
            };
            let args = KernelArgs {
                part,
                phantom,
                mxy: &mut mag.mxy,
                mz: &mut mag.mz,
                signal: &mut flat[adc_at..adc_at + k],
                dict: if part_dict.is_empty() {
                    None
                } else {
                    Some(&mut part_dict)
                },
            };
            let kernel = if part.rf_on {
                Kernel::Excite(args)
            } else {
                Kernel::Precess(args)
            };
            be.launch(kernel);
            be.synchronize();

            if mag.has_nan() {
                return Err(Error::NumericalInstability {
                    step: part.step_offset,
                });
            }

            if !part_dict.is_empty() {
                for spin in 0..n_spins {
                    for l in 0..k {
                        dict[spin * n_adc + adc_at + l] = part_dict[spin * k + l];
                    }
                }
            }
            adc_at += k;
        }
        Ok(())
    };

    match params.nthreads {
        0 => body()?,
        n => {
            let pool = rayon::ThreadPoolBuilder::new()
                .num_threads(n)
                .build()
                .expect("cannot build worker pool");
            pool.install(body)?
        }
    }

    let output = match (params.method, params.return_type) {
        (SimMethod::BlochDict, _) => {
            let d = Array2::from_shape_vec((n_spins, n_adc), dict)
                .expect("dict buffer always reshapes");
            SimOutput::Dict(d.reversed_axes())
        }
        (_, ReturnType::Mat) => SimOutput::Signal(signal_matrix(flat)),
        (_, ReturnType::State) => SimOutput::State(mag),
        (_, ReturnType::Raw) => {
            SimOutput::Raw(group_readouts(seq, &samples.adc_times, &flat))
        }
    };

    info!(complete, "bloch run finished");
    Ok(SimResult { output, complete })
}
