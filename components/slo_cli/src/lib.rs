//! slo command-line library
//!
//! Provides the Runtime struct and supporting modules for the `slo` binary.

#![warn(missing_docs)]
#![warn(clippy::all)]

pub mod cli;
pub mod error;
pub mod repl;
pub mod runtime;

pub use cli::{Cli, Mode};
pub use error::{CliError, CliResult, EXIT_COMPILE_ERROR, EXIT_IO_ERROR, EXIT_RUNTIME_ERROR};
pub use runtime::{Runtime, EVAL_LABEL, REPL_LABEL};

/// Run whatever `cli` asks for against a fresh runtime
pub fn run(cli: &Cli) -> CliResult<()> {
    let mut runtime = Runtime::new(cli.vm_config())
        .with_print_bytecode(cli.print_bytecode, Box::new(std::io::stdout()));
    match cli.mode() {
        Mode::File(path) => runtime.execute_file(&path),
        Mode::Eval(code) => runtime.execute_string(&code, EVAL_LABEL),
        Mode::Repl => repl::run_repl(&mut runtime),
    }
}
