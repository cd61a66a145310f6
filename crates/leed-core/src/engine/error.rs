use thiserror::Error;

use super::config::ConfigError;
use crate::core::linalg::MatrixError;

#[derive(Debug, Error)]
pub enum EngineError {
    #[error("Invalid configuration: {0}")]
    Config(#[from] ConfigError),

    #[error("Matrix operation failed: {source}")]
    Matrix {
        #[from]
        source: MatrixError,
    },

    #[error("Lattice sum requires positive damping (Im k = {imag_k:.3e})")]
    NonConvergentDamping { imag_k: f64 },

    #[error("Layer doubling did not converge after {iterations} doublings (last change {change:.3e})")]
    ConvergenceFailure { iterations: usize, change: f64 },

    #[error("Scattering type {0} is referenced but has no phase shifts")]
    MissingScatteringType(usize),

    #[error("Energy {energy_ev:.2} eV lies below the inner potential")]
    NonPositiveEnergy { energy_ev: f64 },

    #[error("No beams are active at {energy_ev:.2} eV")]
    NoActiveBeams { energy_ev: f64 },

    #[error("Internal logic error: {0}")]
    Internal(String),
}
