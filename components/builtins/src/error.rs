//! Native failure values

use core_types::{ErrorKind, SloError, Value};
use memory_manager::NativeContext;
use thiserror::Error;

/// A failure raised by a native function.
///
/// Natives cannot unwind the engine themselves. The failure is turned into
/// an error object that the engine raises as a fault of the same kind.
#[derive(Debug, Clone, PartialEq, Error)]
#[error("[{kind}] {message}")]
pub struct NativeError {
    /// Kind of the fault the engine reports
    pub kind: ErrorKind,
    /// Fault message
    pub message: String,
}

impl NativeError {
    /// Create a failure of any kind
    pub fn new(kind: ErrorKind, message: impl Into<String>) -> Self {
        Self {
            kind,
            message: message.into(),
        }
    }

    /// Generic runtime failure
    pub fn runtime(message: impl Into<String>) -> Self {
        Self::new(ErrorKind::Runtime, message)
    }

    /// Wrong argument type or value
    pub fn type_error(message: impl Into<String>) -> Self {
        Self::new(ErrorKind::Type, message)
    }

    /// Out-of-range index or missing key
    pub fn index(message: impl Into<String>) -> Self {
        Self::new(ErrorKind::Index, message)
    }

    /// File or OS failure
    pub fn io(message: impl Into<String>) -> Self {
        Self::new(ErrorKind::Io, message)
    }
}

impl From<SloError> for NativeError {
    fn from(error: SloError) -> Self {
        Self::new(error.kind, error.message)
    }
}

/// Result type for native bodies
pub type NativeResult<T = Value> = Result<T, NativeError>;

/// Convert a native body's result into the value handed to the engine
pub(crate) fn finish(ctx: &mut NativeContext<'_>, result: NativeResult) -> Value {
    match result {
        Ok(value) => value,
        Err(error) => ctx.error(error.kind, error.message),
    }
}
