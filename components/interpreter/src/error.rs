//! Outcomes of running source through the engine

use core_types::{ErrorKind, SloError};
use parser::CompileErrors;
use thiserror::Error;

/// Why an [`interpret`](crate::Vm::interpret) call did not complete normally
#[derive(Debug, Clone, PartialEq, Error)]
pub enum InterpretError {
    /// The source did not compile; nothing was executed
    #[error(transparent)]
    Compile(#[from] CompileErrors),
    /// A fault was raised while executing
    #[error(transparent)]
    Runtime(SloError),
    /// The script called `exit(code)`
    #[error("script exited with status {0}")]
    Exit(i32),
}

impl InterpretError {
    /// The full report a host prints for this outcome
    pub fn render(&self) -> String {
        match self {
            InterpretError::Compile(errors) => errors.render(),
            InterpretError::Runtime(error) => error.render(),
            InterpretError::Exit(_) => String::new(),
        }
    }

    /// The runtime fault, if this is one
    pub fn as_runtime(&self) -> Option<&SloError> {
        match self {
            InterpretError::Runtime(error) => Some(error),
            _ => None,
        }
    }
}

/// Result of [`Vm::interpret`](crate::Vm::interpret)
pub type InterpretResult = Result<(), InterpretError>;

/// Why the dispatch loop stopped before the script returned
#[derive(Debug)]
pub(crate) enum Interrupt {
    Fault(SloError),
    Exit(i32),
}

impl From<SloError> for Interrupt {
    fn from(error: SloError) -> Self {
        Interrupt::Fault(error)
    }
}

/// Raise a fault without position information; the engine attaches it
pub(crate) fn fault<T>(kind: ErrorKind, message: impl Into<String>) -> Result<T, Interrupt> {
    Err(Interrupt::Fault(SloError::new(kind, message)))
}
