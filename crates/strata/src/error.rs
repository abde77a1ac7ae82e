//! Runtime error type.

use strata_core::{ConfigError, PersistError, RegistryError};
use thiserror::Error;

/// Failures surfaced by the generation runtime.
///
/// Per-chunk placement failures never reach this type; they bail the
/// chunk and are only counted.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum StrataError {
    /// Registry misuse.
    #[error(transparent)]
    Registry(#[from] RegistryError),

    /// Invalid configuration.
    #[error(transparent)]
    Config(#[from] ConfigError),

    /// Persisted state could not be written.
    #[error(transparent)]
    Persist(#[from] PersistError),

    /// A command string did not parse.
    #[error("unknown command: {0}")]
    UnknownCommand(String),
}

/// Result type for the runtime.
pub type StrataResult<T> = Result<T, StrataError>;
