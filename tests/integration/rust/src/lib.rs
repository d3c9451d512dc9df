//! Integration test suite for the slo workspace
//!
//! This crate provides integration tests that verify components work
//! together correctly across component boundaries.

use interpreter::{InterpretError, SharedBuffer, Vm, VmConfig};

/// Re-export components for test convenience
pub mod components {
    pub use builtins;
    pub use bytecode_system;
    pub use core_types;
    pub use interpreter;
    pub use memory_manager;
    pub use parser;
    pub use slo_cli;
}

/// Output and outcome of one script run
#[derive(Debug)]
pub struct Run {
    /// Everything the script printed
    pub output: String,
    /// How `interpret` returned
    pub result: Result<(), InterpretError>,
}

/// Run `source` on a fresh engine with `config`
pub fn run_with(config: VmConfig, source: &str) -> Run {
    let out = SharedBuffer::new();
    let mut vm = Vm::with_config(config).with_output(Box::new(out.clone()));
    let result = vm.interpret(source, "test.slo");
    Run {
        output: out.contents(),
        result,
    }
}

/// Run `source` and return its output, panicking with the report on failure
pub fn run_ok(source: &str) -> String {
    let run = run_with(VmConfig::default(), source);
    if let Err(error) = &run.result {
        panic!("script failed:\n{}", error.render());
    }
    run.output
}
