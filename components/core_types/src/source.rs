//! Source position and stack frame types for fault reporting.

use std::fmt;

/// A position in source code.
///
/// Lines and columns are both 1-based. A column of 0 means the column is
/// unknown and no caret is rendered under the source line.
///
/// # Examples
///
/// ```
/// use core_types::SourcePosition;
///
/// let pos = SourcePosition::new(10, 5);
/// assert_eq!(pos.to_string(), "10:5");
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct SourcePosition {
    /// Line number (1-based)
    pub line: u32,
    /// Column number (1-based)
    pub column: u32,
}

impl SourcePosition {
    /// Create a new source position
    pub fn new(line: u32, column: u32) -> Self {
        Self { line, column }
    }
}

impl fmt::Display for SourcePosition {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}", self.line, self.column)
    }
}

/// A single frame in a rendered call stack.
///
/// # Examples
///
/// ```
/// use core_types::StackFrame;
///
/// let frame = StackFrame {
///     function_name: "fib".to_string(),
///     file: "main.slo".to_string(),
///     line: 25,
///     column: 10,
/// };
///
/// assert_eq!(frame.to_string(), "at fib (main.slo:25:10)");
/// ```
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StackFrame {
    /// Name of the function, `<script>` for top-level code
    pub function_name: String,
    /// File label the function was compiled from
    pub file: String,
    /// Line of the instruction being executed in this frame
    pub line: u32,
    /// Column of the instruction being executed in this frame
    pub column: u32,
}

impl fmt::Display for StackFrame {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "at {} ({}:{}:{})",
            self.function_name, self.file, self.line, self.column
        )
    }
}
