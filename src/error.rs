use std::path::PathBuf;

use thiserror::Error;

/// The five error kinds the engine distinguishes.
///
/// `StatisticalDegeneracy` never surfaces through this type: it is
/// represented in-band as `None` wherever a test result is optional.
#[derive(Debug, Error)]
pub enum EngineError {
    #[error("[ERROR] - input error in {path}: {message}")]
    Input { path: PathBuf, message: String },

    #[error("[ERROR] - config error: {0}")]
    Config(String),

    #[error("[ERROR] - referential error: {0}")]
    Referential(String),

    #[error("[ERROR] - I/O error at {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}

pub type Result<T> = std::result::Result<T, EngineError>;

impl EngineError {
    pub fn input(path: impl Into<PathBuf>, message: impl Into<String>) -> Self {
        EngineError::Input {
            path: path.into(),
            message: message.into(),
        }
    }

    pub fn config(message: impl Into<String>) -> Self {
        EngineError::Config(message.into())
    }

    pub fn referential(message: impl Into<String>) -> Self {
        EngineError::Referential(message.into())
    }

    pub fn io(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        EngineError::Io {
            path: path.into(),
            source,
        }
    }
}
