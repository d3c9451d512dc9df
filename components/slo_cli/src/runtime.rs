//! Runtime orchestration for script execution
//!
//! The Runtime owns one persistent [`Vm`], so globals defined by one call
//! stay visible to the next. That is what the REPL relies on.

use crate::error::{CliError, CliResult};
use interpreter::{InterpretError, Vm, VmConfig};
use std::io::Write;
use std::path::Path;

/// File label used for REPL input
pub const REPL_LABEL: &str = "<repl>";

/// File label used for `--eval` input
pub const EVAL_LABEL: &str = "<eval>";

/// Runs slo source through one engine instance
pub struct Runtime {
    vm: Vm,
    /// Whether to print bytecode before execution
    print_bytecode: bool,
    /// Where bytecode listings go
    listing: Box<dyn Write>,
}

impl Runtime {
    /// Create a runtime printing to stdout
    ///
    /// # Example
    /// ```
    /// use interpreter::VmConfig;
    /// use slo_cli::Runtime;
    ///
    /// let mut runtime = Runtime::new(VmConfig::default());
    /// runtime.execute_string("var x = 42;", "<eval>").unwrap();
    /// ```
    pub fn new(config: VmConfig) -> Self {
        Self {
            vm: Vm::with_config(config),
            print_bytecode: false,
            listing: Box::new(std::io::stdout()),
        }
    }

    /// Redirect script output (`print`, `println`)
    pub fn with_output(mut self, out: Box<dyn Write>) -> Self {
        self.vm = self.vm.with_output(out);
        self
    }

    /// Enable bytecode printing, writing listings to `listing`
    pub fn with_print_bytecode(mut self, enabled: bool, listing: Box<dyn Write>) -> Self {
        self.print_bytecode = enabled;
        self.listing = listing;
        self
    }

    /// Execute a script file
    ///
    /// # Errors
    /// Returns `CliError` if the file cannot be read or execution fails
    pub fn execute_file(&mut self, path: &Path) -> CliResult<()> {
        let source = std::fs::read_to_string(path).map_err(|source| CliError::Io {
            path: path.display().to_string(),
            source,
        })?;
        log::debug!("running {} ({} bytes)", path.display(), source.len());
        self.execute_string(&source, &path.display().to_string())
    }

    /// Execute source text under a file label
    pub fn execute_string(&mut self, source: &str, label: &str) -> CliResult<()> {
        if self.print_bytecode {
            let listing = self
                .vm
                .disassemble(source, label)
                .map_err(InterpretError::from)?;
            self.listing.write_all(listing.as_bytes())?;
            self.listing.flush()?;
        }
        self.vm.interpret(source, label)?;
        Ok(())
    }

    /// The engine, for inspection
    pub fn vm(&self) -> &Vm {
        &self.vm
    }

    /// Mutable access to the engine
    pub fn vm_mut(&mut self) -> &mut Vm {
        &mut self.vm
    }
}
