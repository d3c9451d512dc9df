//! Command-line arguments

use clap::{ArgAction, Parser};
use interpreter::VmConfig;
use log::LevelFilter;
use std::path::PathBuf;

/// slo - run a script, evaluate a snippet or start the REPL
#[derive(Parser, Debug, Clone, PartialEq, Eq)]
#[command(name = "slo", version, about = "Bytecode interpreter for the slo language")]
pub struct Cli {
    /// Script to run
    pub file: Option<PathBuf>,

    /// Evaluate CODE instead of a file
    #[arg(short, long, value_name = "CODE", conflicts_with = "file")]
    pub eval: Option<String>,

    /// Start the interactive REPL
    #[arg(long)]
    pub repl: bool,

    /// Print the compiled bytecode before running
    #[arg(long)]
    pub print_bytecode: bool,

    /// Log every executed instruction (needs -vv)
    #[arg(long)]
    pub trace: bool,

    /// Collect garbage at every allocation boundary
    #[arg(long)]
    pub stress_gc: bool,

    /// Increase log verbosity (-v debug, -vv trace)
    #[arg(short, long, action = ArgAction::Count)]
    pub verbose: u8,
}

/// What the binary was asked to do
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Mode {
    /// Run a script file
    File(PathBuf),
    /// Evaluate source given on the command line
    Eval(String),
    /// Interactive loop
    Repl,
}

impl Cli {
    /// Resolve the run mode; no file and no `--eval` means the REPL
    pub fn mode(&self) -> Mode {
        if self.repl {
            return Mode::Repl;
        }
        match (&self.file, &self.eval) {
            (Some(file), _) => Mode::File(file.clone()),
            (None, Some(code)) => Mode::Eval(code.clone()),
            (None, None) => Mode::Repl,
        }
    }

    /// Engine settings selected by the flags
    pub fn vm_config(&self) -> VmConfig {
        VmConfig {
            stress_gc: self.stress_gc,
            trace_execution: self.trace,
            ..VmConfig::default()
        }
    }

    /// Log level for `-v` repetitions; `RUST_LOG` still takes precedence
    pub fn log_level(&self) -> LevelFilter {
        match self.verbose {
            0 => LevelFilter::Warn,
            1 => LevelFilter::Debug,
            _ => LevelFilter::Trace,
        }
    }
}
