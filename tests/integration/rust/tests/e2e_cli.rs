//! CLI End-to-End Tests
//!
//! Drives the slo_cli Runtime and entry point over real script files.

use clap::Parser as ClapParser;
use interpreter::{InterpretError, SharedBuffer, VmConfig};
use slo_cli::{
    Cli, CliError, Runtime, EVAL_LABEL, EXIT_COMPILE_ERROR, EXIT_IO_ERROR, EXIT_RUNTIME_ERROR,
    REPL_LABEL,
};
use std::ffi::OsString;
use std::io::Write;
use tempfile::NamedTempFile;

fn script(source: &str) -> NamedTempFile {
    let mut file = tempfile::Builder::new().suffix(".slo").tempfile().unwrap();
    file.write_all(source.as_bytes()).unwrap();
    file
}

fn runtime() -> (Runtime, SharedBuffer) {
    let out = SharedBuffer::new();
    let runtime = Runtime::new(VmConfig::default()).with_output(Box::new(out.clone()));
    (runtime, out)
}

/// Test: A script file runs to completion
#[test]
fn test_execute_program_file() {
    let file = script(
        "class Counter {\n  func __init__() { self.n = 0; }\n  func tick() { self.n += 1; return self; }\n}\nvar c = Counter();\nc.tick().tick().tick();\nprintln(c.n);\n",
    );
    let (mut runtime, out) = runtime();

    runtime.execute_file(file.path()).unwrap();
    assert_eq!(out.contents(), "3\n");
}

/// Test: Output before a fault is kept and the fault maps to the runtime status
#[test]
fn test_partial_output_then_fault() {
    let file = script("println(\"before\");\nvar d = {};\nprintln(d[\"missing\"]);\nprintln(\"after\");\n");
    let (mut runtime, out) = runtime();

    let error = runtime.execute_file(file.path()).unwrap_err();
    assert_eq!(out.contents(), "before\n");
    assert_eq!(error.exit_code(), EXIT_RUNTIME_ERROR);
    assert!(error.report().contains("Key not found in dictionary."));
}

/// Test: Each failure class maps to its exit status
#[test]
fn test_exit_status_mapping() {
    let (mut runtime, _) = runtime();

    let compile = runtime.execute_string("var = ;", EVAL_LABEL).unwrap_err();
    assert_eq!(compile.exit_code(), EXIT_COMPILE_ERROR);

    let fault = runtime.execute_string("nil();", EVAL_LABEL).unwrap_err();
    assert_eq!(fault.exit_code(), EXIT_RUNTIME_ERROR);

    let exit = runtime.execute_string("exit(3);", EVAL_LABEL).unwrap_err();
    assert!(matches!(exit, CliError::Interpret(InterpretError::Exit(3))));
    assert_eq!(exit.exit_code(), 3);

    let missing = runtime
        .execute_file(std::path::Path::new("/no/such/file.slo"))
        .unwrap_err();
    assert_eq!(missing.exit_code(), EXIT_IO_ERROR);
}

/// Test: The engine survives a fault and keeps its globals
#[test]
fn test_session_continues_after_fault() {
    let (mut runtime, out) = runtime();

    runtime.execute_string("var total = 10;", REPL_LABEL).unwrap();
    assert!(runtime.execute_string("total = total + nil;", REPL_LABEL).is_err());
    runtime.execute_string("total += 5; println(total);", REPL_LABEL).unwrap();

    assert_eq!(out.contents(), "15\n");
    assert_eq!(runtime.vm().stack_depth(), 0);
}

/// Test: Faults in REPL input name the REPL label
#[test]
fn test_repl_label_in_report() {
    let (mut runtime, _) = runtime();

    let error = runtime.execute_string("undefinedName;", REPL_LABEL).unwrap_err();
    let report = error.report();
    assert!(report.starts_with("[NameException] Undefined variable 'undefinedName'."));
    assert!(report.contains("<repl>:1:"));
}

/// Test: Bytecode listings cover nested functions
#[test]
fn test_print_bytecode_lists_functions() {
    let listing = SharedBuffer::new();
    let out = SharedBuffer::new();
    let mut runtime = Runtime::new(VmConfig::default())
        .with_output(Box::new(out.clone()))
        .with_print_bytecode(true, Box::new(listing.clone()));

    runtime
        .execute_string("func square(x) { return x * x; } println(square(7));", EVAL_LABEL)
        .unwrap();

    let text = listing.contents();
    assert!(text.contains("== <script> =="));
    assert!(text.contains("== square =="));
    assert!(text.contains("MULTIPLY"));
    assert_eq!(out.contents(), "49\n");
}

/// Test: A compile error prints no listing and runs nothing
#[test]
fn test_print_bytecode_on_compile_error() {
    let listing = SharedBuffer::new();
    let out = SharedBuffer::new();
    let mut runtime = Runtime::new(VmConfig::default())
        .with_output(Box::new(out.clone()))
        .with_print_bytecode(true, Box::new(listing.clone()));

    assert!(runtime.execute_string("println(1); var = 2;", EVAL_LABEL).is_err());
    assert_eq!(listing.contents(), "");
    assert_eq!(out.contents(), "");
}

/// Test: The entry point runs a file named on the command line
#[test]
fn test_run_entry_point_with_file() {
    let file = script("var x = 2 ** 3;\nassert x == 8;\n");
    let args = [OsString::from("slo"), file.path().as_os_str().to_owned()];
    let cli = Cli::try_parse_from(args).unwrap();

    slo_cli::run(&cli).unwrap();
}

/// Test: The entry point reports exit codes from --eval
#[test]
fn test_run_entry_point_exit_code() {
    let cli = Cli::try_parse_from(["slo", "--stress-gc", "-e", "exit(9);"]).unwrap();

    let error = slo_cli::run(&cli).unwrap_err();
    assert_eq!(error.exit_code(), 9);
    assert_eq!(error.report(), "");
}
