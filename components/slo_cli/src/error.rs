//! Error types for the CLI

use interpreter::InterpretError;
use rustyline::error::ReadlineError;
use thiserror::Error;

/// Process exit status for a compile error
pub const EXIT_COMPILE_ERROR: i32 = 65;
/// Process exit status for a runtime fault
pub const EXIT_RUNTIME_ERROR: i32 = 70;
/// Process exit status for an I/O failure
pub const EXIT_IO_ERROR: i32 = 74;

/// CLI-specific errors
#[derive(Debug, Error)]
pub enum CliError {
    /// A script file could not be read
    #[error("Could not read file '{path}': {source}")]
    Io {
        /// Path as given on the command line
        path: String,
        /// Underlying failure
        #[source]
        source: std::io::Error,
    },

    /// Compilation or execution failed, or the script called `exit`
    #[error(transparent)]
    Interpret(#[from] InterpretError),

    /// The line editor failed
    #[error("REPL error: {0}")]
    Readline(#[from] ReadlineError),
}

impl CliError {
    /// Status the process should exit with
    pub fn exit_code(&self) -> i32 {
        match self {
            CliError::Io { .. } | CliError::Readline(_) => EXIT_IO_ERROR,
            CliError::Interpret(InterpretError::Compile(_)) => EXIT_COMPILE_ERROR,
            CliError::Interpret(InterpretError::Runtime(_)) => EXIT_RUNTIME_ERROR,
            CliError::Interpret(InterpretError::Exit(code)) => *code,
        }
    }

    /// Text for stderr; empty for a plain `exit`
    pub fn report(&self) -> String {
        match self {
            CliError::Interpret(error) => error.render(),
            other => format!("{}\n", other),
        }
    }
}

impl From<std::io::Error> for CliError {
    fn from(source: std::io::Error) -> Self {
        CliError::Io {
            path: String::new(),
            source,
        }
    }
}

/// Result type for CLI operations
pub type CliResult<T> = Result<T, CliError>;
