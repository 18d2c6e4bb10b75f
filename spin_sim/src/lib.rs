//! Bloch simulation of a phantom under a pulse sequence.
//!
//! The scheduler's non-uniform grid is split into RF-on and RF-off parts;
//! an excitation kernel rotates the magnetization through the full 3x3
//! operator while a precession kernel advances it in closed form. Spins
//! run in parallel batches on the selected compute backend; the time axis
//! is strictly sequential.

use std::fmt;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

pub mod backend;
pub mod kernels;
pub mod magnetization;
pub mod sampling;
pub mod signal;
pub mod simulate;

pub use magnetization::Magnetization;
pub use signal::{RawAcquisition, Readout, SimOutput};
pub use simulate::{simulate, simulate_cancellable, ReturnType, SimMethod, SimParams, SimResult};

pub type Result<T> = std::result::Result<T, Error>;

#[derive(Debug)]
pub enum Error {
    /// phantom failed validation before the run
    Phantom(phantom::Error),
    /// NaN surfaced in the magnetization; the run is unrecoverable
    NumericalInstability { step: usize },
}

impl fmt::Display for Error {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Error::Phantom(e) => write!(f, "phantom error: {}", e),
            Error::NumericalInstability { step } => {
                write!(f, "numerical instability at step {}", step)
            }
        }
    }
}

impl std::error::Error for Error {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            Error::Phantom(e) => Some(e),
            _ => None,
        }
    }
}

impl From<phantom::Error> for Error {
    fn from(e: phantom::Error) -> Self {
        Error::Phantom(e)
    }
}

/// Cooperative cancellation flag, checked between parts. A cancelled run
/// returns the signal collected so far with `complete = false`.
#[derive(Clone, Debug, Default)]
pub struct CancelToken(Arc<AtomicBool>);

impl CancelToken {
    pub fn new() -> CancelToken {
        CancelToken::default()
    }

    pub fn cancel(&self) {
        self.0.store(true, Ordering::Relaxed);
    }

    pub fn is_cancelled(&self) -> bool {
        self.0.load(Ordering::Relaxed)
    }
}
