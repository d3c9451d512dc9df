//! Contract tests for interpreter API
//!
//! These tests pin the public surface hosts depend on.

use core_types::{ErrorKind, Value};
use interpreter::{
    InterpretError, InterpretResult, SharedBuffer, Vm, VmConfig, FRAMES_MAX, STACK_MAX,
};

/// Vm::interpret returns Ok for a valid program
#[test]
fn test_interpret_ok_contract() {
    let mut vm = Vm::new();
    let result: InterpretResult = vm.interpret("var a = 1;", "main.slo");
    assert!(result.is_ok());
}

/// Compile errors arrive as InterpretError::Compile and run nothing
#[test]
fn test_compile_error_contract() {
    let out = SharedBuffer::new();
    let mut vm = Vm::new().with_output(Box::new(out.clone()));
    let result = vm.interpret("println(1); var;", "main.slo");
    assert!(matches!(result, Err(InterpretError::Compile(_))));
    assert_eq!(out.contents(), "");
}

/// Runtime faults arrive as InterpretError::Runtime with stacks emptied
#[test]
fn test_runtime_error_contract() {
    let mut vm = Vm::new();
    let result = vm.interpret("var x = -\"a\";", "main.slo");
    let error = result.unwrap_err();
    assert_eq!(error.as_runtime().map(|e| e.kind), Some(ErrorKind::Type));
    assert!(!error.render().is_empty());
    assert_eq!(vm.stack_depth(), 0);
    assert_eq!(vm.frame_count(), 0);
}

/// Vm::interpret never panics on hostile input
#[test]
fn test_interpret_does_not_panic_contract() {
    let mut vm = Vm::new();
    for source in [
        "",
        ";;;",
        "}",
        "\"unterminated",
        "class { }",
        "super.x;",
        "self;",
        "return 1;",
        "var x = [1, 2; x[",
        "func f( { }",
        "1 / 0;",
        "[][0];",
        "{}[[]];",
    ] {
        let _ = vm.interpret(source, "fuzz.slo");
        assert_eq!(vm.stack_depth(), 0, "stack left behind by {:?}", source);
    }
}

/// Unhashable dictionary keys are a Type fault
#[test]
fn test_unhashable_key_contract() {
    let mut vm = Vm::new();
    let error = vm.interpret("var d = {[1]: 2};", "main.slo").unwrap_err();
    assert_eq!(error.as_runtime().map(|e| e.kind), Some(ErrorKind::Type));
}

/// Interned strings: equal literals are the same heap object
#[test]
fn test_string_interning_contract() {
    let mut vm = Vm::new();
    vm.interpret("var a = \"same\"; var b = \"sa\" + \"me\";", "main.slo")
        .unwrap();
    let a = vm.global("a").unwrap();
    let b = vm.global("b").unwrap();
    assert_eq!(a, b);
    assert!(vm.heap().values_equal(a, b));
}

/// The engine limits are the documented constants
#[test]
fn test_limits_contract() {
    assert_eq!(FRAMES_MAX, 256);
    assert_eq!(STACK_MAX, 256 * 256);
}

/// Vm::with_config applies the collector settings
#[test]
fn test_with_config_contract() {
    let config = VmConfig {
        initial_gc_threshold: 4096,
        gc_growth_factor: 3,
        stress_gc: false,
        trace_execution: false,
    };
    let vm = Vm::with_config(config);
    assert_eq!(vm.config().gc_growth_factor, 3);
    assert!(vm.heap_stats().next_gc >= 4096);
}

/// set_global and global round-trip host values
#[test]
fn test_global_contract() {
    let mut vm = Vm::new();
    vm.set_global("flag", Value::Bool(true));
    assert_eq!(vm.global("flag"), Some(Value::Bool(true)));
    assert_eq!(vm.global("missing"), None);
}
