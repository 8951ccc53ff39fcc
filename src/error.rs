//! Error types for the runtime

use thiserror::Error;

#[derive(Error, Debug, Clone, PartialEq)]
pub enum RuntimeError {
    #[error("Malformed condition: {0}")]
    Condition(String),

    #[error("Invalid configuration")]
    Config,

    #[error("Invalid page snapshot")]
    Snapshot,

    #[error("DOM access failed: {0}")]
    Dom(String),
}

pub type Result<T> = std::result::Result<T, error_stack::Report<RuntimeError>>;
