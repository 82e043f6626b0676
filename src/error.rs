use std::path::PathBuf;

use thiserror::Error;

pub type Result<T, E = DashboardError> = std::result::Result<T, E>;

#[derive(Debug, Error)]
pub enum DashboardError {
    #[error("Malformed input: {0}")]
    MalformedInput(String),
    #[error("Invalid argument: {0}")]
    InvalidArgument(String),
    #[error("Invalid dashboard config {path:?}: {message}")]
    Config { path: PathBuf, message: String },
    #[error("Reading {path:?}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}
