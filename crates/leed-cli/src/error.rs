use leedpp::core::analysis::RFactorError;
use leedpp::core::io::intensities::IntensityFileError;
use leedpp::core::io::structure::StructureLoadError;
use leedpp::engine::error::EngineError;
use std::path::PathBuf;
use thiserror::Error;

pub type Result<T> = std::result::Result<T, CliError>;

#[derive(Debug, Error)]
pub enum CliError {
    #[error(transparent)]
    LeedCore(#[from] EngineError),

    #[error(transparent)]
    Structure(#[from] StructureLoadError),

    #[error("Intensity table error: {0}")]
    Intensities(#[from] IntensityFileError),

    #[error("R-factor comparison failed: {0}")]
    RFactor(#[from] RFactorError),

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Failed to parse file '{path}': {source}", path = path.display())]
    FileParsing {
        path: PathBuf,
        #[source]
        source: anyhow::Error,
    },

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error(transparent)]
    Other(#[from] anyhow::Error),
}
