//! Compile error types and helpers

use core_types::{ErrorKind, SloError, SourcePosition};
use thiserror::Error;

/// Every syntax error found in one source, in source order
#[derive(Debug, Clone, PartialEq, Error)]
#[error("{}", summary(.errors))]
pub struct CompileErrors {
    /// The collected errors, all of kind [`ErrorKind::Syntax`]
    pub errors: Vec<SloError>,
}

impl CompileErrors {
    /// Number of errors
    pub fn len(&self) -> usize {
        self.errors.len()
    }

    /// Returns true if no errors were collected
    pub fn is_empty(&self) -> bool {
        self.errors.is_empty()
    }

    /// Full reports for every error, separated by blank lines
    pub fn render(&self) -> String {
        self.errors
            .iter()
            .map(SloError::render)
            .collect::<Vec<_>>()
            .join("\n")
    }
}

fn summary(errors: &[SloError]) -> String {
    match errors {
        [] => "no syntax errors".to_string(),
        [only] => only.to_string(),
        [first, rest @ ..] => format!("{} (and {} more)", first, rest.len()),
    }
}

/// Create a syntax error at a given position
pub fn syntax_error(message: impl Into<String>, position: SourcePosition) -> SloError {
    SloError::new(ErrorKind::Syntax, message).with_position(position)
}
