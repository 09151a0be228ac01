//! Application layer errors

use thiserror::Error;
use crate::domain::MessageKind;

/// Boxed error raised inside a handler or behavior body
pub type BoxError = Box<dyn std::error::Error + Send + Sync>;

/// Result of a dispatch or of any link in the pipeline
pub type DispatchResult<T> = Result<T, DispatchError>;

/// Dispatch errors
#[derive(Error, Debug)]
pub enum DispatchError {
    #[error("No handler registered for {message}")]
    HandlerNotFound { message: &'static str },

    #[error("Execution failed: {0}")]
    Execution(#[source] BoxError),

    #[error("Invalid message: {0}")]
    Invalid(String),

    #[error("Operation cancelled")]
    Cancelled,
}

impl DispatchError {
    /// Wrap a failure raised by a handler or behavior
    pub fn execution(err: impl Into<BoxError>) -> Self {
        DispatchError::Execution(err.into())
    }

    pub fn is_handler_not_found(&self) -> bool {
        matches!(self, DispatchError::HandlerNotFound { .. })
    }

    pub fn is_cancelled(&self) -> bool {
        matches!(self, DispatchError::Cancelled)
    }
}

/// Handler registration errors
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum RegistryError {
    #[error("{capability} already bound to {existing}, refusing {requested}")]
    DuplicateHandler {
        capability: &'static str,
        existing: &'static str,
        requested: &'static str,
    },

    #[error("{message} already registered as {existing}, cannot register it as {requested}")]
    KindConflict {
        message: &'static str,
        existing: MessageKind,
        requested: MessageKind,
    },
}

/// Configuration errors
#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("Failed to read config: {0}")]
    Read(#[from] std::io::Error),

    #[error("Failed to parse config: {0}")]
    Parse(#[from] serde_yaml::Error),

    #[error("Invalid value: {0}")]
    InvalidValue(String),
}
