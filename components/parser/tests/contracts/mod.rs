//! Contract tests for the parser public API
//!
//! The execution engine depends on these shapes of compiled code.

use bytecode_system::OpCode;
use core_types::{ErrorKind, Value};
use memory_manager::Heap;
use parser::{compile, CompileErrors};

#[test]
fn contract_compile_returns_script_function() {
    let mut heap = Heap::new();
    let script = compile(&mut heap, "print(1);", "c.slo").unwrap();
    let function = heap.as_function(script).unwrap();
    assert_eq!(function.arity, 0);
    assert!(function.name.is_none());
    assert_eq!(heap.str_of(function.file.unwrap()), "c.slo");
}

#[test]
fn contract_script_ends_with_nil_return() {
    let mut heap = Heap::new();
    let script = compile(&mut heap, "var a = 1;", "c.slo").unwrap();
    let code = &heap.as_function(script).unwrap().chunk.code;
    assert_eq!(&code[code.len() - 2..], &[OpCode::Nil, OpCode::Return]);
}

#[test]
fn contract_every_error_is_syntax_kind_with_file() {
    let mut heap = Heap::new();
    let CompileErrors { errors } = compile(&mut heap, "var = 1;\nfunc (", "bad.slo").unwrap_err();
    assert!(!errors.is_empty());
    for error in &errors {
        assert_eq!(error.kind, ErrorKind::Syntax);
        assert_eq!(error.file.as_deref(), Some("bad.slo"));
        assert!(error.position.is_some());
    }
}

#[test]
fn contract_failed_compile_leaves_no_roots() {
    let mut heap = Heap::new();
    let before = heap.root_count();
    let _ = compile(&mut heap, "func f() { \"x\"; ", "c.slo");
    assert_eq!(heap.root_count(), before);
}

#[test]
fn contract_compiled_script_survives_collection_when_rooted() {
    let mut heap = Heap::new();
    let script = compile(&mut heap, "func f() { return \"kept\"; }", "c.slo").unwrap();
    heap.push_root(Value::Obj(script));
    heap.collect_garbage();
    assert!(heap.contains(script));
    let inner = heap
        .as_function(script)
        .unwrap()
        .chunk
        .constants
        .iter()
        .filter_map(|c| c.as_obj())
        .find(|r| heap.as_function(*r).is_some())
        .unwrap();
    assert!(heap.contains(inner));
}

#[test]
fn contract_line_table_maps_instructions_to_source() {
    let mut heap = Heap::new();
    let script = compile(&mut heap, "var a = 1;\n\nvar b = 2;", "c.slo").unwrap();
    let chunk = &heap.as_function(script).unwrap().chunk;
    assert_eq!(chunk.get_line(0), 1);
    assert_eq!(chunk.get_line(2), 3);
}
