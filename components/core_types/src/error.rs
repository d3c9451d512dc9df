//! Fault taxonomy and the fault report.
//!
//! Both the compiler and the execution engine surface problems through one
//! type, [`SloError`], which carries the kind, message, location and (for
//! runtime faults) the call stack at the time of the fault.

use crate::{SourcePosition, StackFrame};
use std::fmt;
use thiserror::Error;

/// The kind of a fault.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ErrorKind {
    /// Generic runtime failure, also the default for failing natives
    Runtime,
    /// Compile-time syntax error
    Syntax,
    /// Operand or argument of the wrong type, wrong arity
    Type,
    /// Undefined property or method
    Attribute,
    /// File or OS failure
    Io,
    /// Allocation failure
    Memory,
    /// List index out of bounds or missing dict key
    Index,
    /// Module could not be loaded
    Import,
    /// Undefined or final variable
    Name,
    /// Failed `assert` statement
    Assertion,
}

impl ErrorKind {
    /// The user-facing name printed in fault reports
    pub fn display_name(self) -> &'static str {
        match self {
            ErrorKind::Runtime => "RuntimeException",
            ErrorKind::Syntax => "SyntaxException",
            ErrorKind::Type => "TypeException",
            ErrorKind::Attribute => "AttributeException",
            ErrorKind::Io => "IOException",
            ErrorKind::Memory => "MemoryException",
            ErrorKind::Index => "IndexException",
            ErrorKind::Import => "ImportException",
            ErrorKind::Name => "NameException",
            ErrorKind::Assertion => "AssertionException",
        }
    }
}

impl fmt::Display for ErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.display_name())
    }
}

/// A reported fault.
///
/// # Examples
///
/// ```
/// use core_types::{ErrorKind, SloError, SourcePosition};
///
/// let error = SloError::new(ErrorKind::Index, "Index out of bounds.")
///     .with_file("main.slo")
///     .with_position(SourcePosition::new(3, 7));
///
/// assert_eq!(error.kind, ErrorKind::Index);
/// assert!(error.render().starts_with("[IndexException] Index out of bounds. at main.slo:3:7"));
/// ```
#[derive(Debug, Clone, PartialEq, Error)]
#[error("[{kind}] {message}")]
pub struct SloError {
    /// The kind of fault
    pub kind: ErrorKind,
    /// Human-readable message
    pub message: String,
    /// File label of the faulting code
    pub file: Option<String>,
    /// Where the fault happened
    pub position: Option<SourcePosition>,
    /// The text of the faulting source line, without its newline
    pub source_line: Option<String>,
    /// Active frames at the time of the fault, innermost first
    pub stack: Vec<StackFrame>,
}

impl SloError {
    /// Create a fault with no location information
    pub fn new(kind: ErrorKind, message: impl Into<String>) -> Self {
        Self {
            kind,
            message: message.into(),
            file: None,
            position: None,
            source_line: None,
            stack: Vec::new(),
        }
    }

    /// Attach the file label
    pub fn with_file(mut self, file: impl Into<String>) -> Self {
        self.file = Some(file.into());
        self
    }

    /// Attach the line and column
    pub fn with_position(mut self, position: SourcePosition) -> Self {
        self.position = Some(position);
        self
    }

    /// Attach the text of the faulting line
    pub fn with_source_line(mut self, line: impl Into<String>) -> Self {
        self.source_line = Some(line.into());
        self
    }

    /// Attach a call stack, innermost frame first
    pub fn with_stack(mut self, stack: Vec<StackFrame>) -> Self {
        self.stack = stack;
        self
    }

    /// Render the full report: header, source excerpt with caret, stack trace.
    pub fn render(&self) -> String {
        let mut out = format!("[{}] {}", self.kind, self.message);
        match (&self.file, &self.position) {
            (Some(file), Some(pos)) => out.push_str(&format!(" at {}:{}", file, pos)),
            (Some(file), None) => out.push_str(&format!(" at {}", file)),
            (None, Some(pos)) => out.push_str(&format!(" at {}", pos)),
            (None, None) => {}
        }
        out.push('\n');

        if let (Some(text), Some(pos)) = (&self.source_line, &self.position) {
            let gutter = format!("    {} | ", pos.line);
            out.push_str(&gutter);
            out.push_str(text);
            out.push('\n');
            if pos.column > 0 {
                let pad = gutter.len() + pos.column as usize - 1;
                out.push_str(&" ".repeat(pad));
                out.push_str("^\n");
            }
        }

        if !self.stack.is_empty() {
            out.push_str("Stack trace:\n");
            for frame in &self.stack {
                out.push_str(&format!("  {}\n", frame));
            }
        }
        out
    }
}
