use std::path::PathBuf;
use symedit::core::symmetry::groups::GroupError;
use symedit::engine::error::EngineError;
use symedit::engine::pathway::PathwayError;
use thiserror::Error;

pub type Result<T> = std::result::Result<T, CliError>;

#[derive(Debug, Error)]
pub enum CliError {
    #[error(transparent)]
    SymEditCore(#[from] EngineError),

    #[error("Pathway error: {0}")]
    Pathway(#[from] PathwayError),

    #[error("Group error: {0}")]
    Group(#[from] GroupError),

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

    #[error("Invalid argument: {0}")]
    Argument(String),

    #[error(transparent)]
    Other(#[from] anyhow::Error),
}
