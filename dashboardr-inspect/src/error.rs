//! Error types for the inspector

use std::path::PathBuf;

use dashboardr::RuntimeError;
use error_stack::Report;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum InspectError {
    #[error("Failed to read {}: {source}", path.display())]
    Read {
        path: PathBuf,
        source: std::io::Error,
    },

    #[error("{0:?}")]
    Runtime(Report<RuntimeError>),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}

impl From<Report<RuntimeError>> for InspectError {
    fn from(report: Report<RuntimeError>) -> Self {
        InspectError::Runtime(report)
    }
}

pub type Result<T> = std::result::Result<T, InspectError>;
