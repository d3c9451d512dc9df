//! Unit tests for the instruction set and chunk container

use bytecode_system::{disassemble_chunk, Chunk, OpCode, UpvalueDescriptor};
use core_types::{SourcePosition, Value};

fn at(line: u32, column: u32) -> SourcePosition {
    SourcePosition::new(line, column)
}

// ============================================================================
// Chunk Tests
// ============================================================================

#[test]
fn test_new_chunk_is_empty() {
    let chunk = Chunk::new();
    assert!(chunk.is_empty());
    assert!(chunk.constants.is_empty());
    assert!(chunk.lines().is_empty());
}

#[test]
fn test_add_constant_returns_sequential_indices() {
    let mut chunk = Chunk::new();
    assert_eq!(chunk.add_constant(Value::Number(1.0)), 0);
    assert_eq!(chunk.add_constant(Value::Nil), 1);
    assert_eq!(chunk.constants[0], Value::Number(1.0));
}

#[test]
fn test_line_table_is_run_length_encoded() {
    let mut chunk = Chunk::new();
    for _ in 0..10 {
        chunk.write(OpCode::Nil, at(1, 1));
    }
    for _ in 0..10 {
        chunk.write(OpCode::Pop, at(2, 4));
    }
    assert_eq!(chunk.len(), 20);
    assert_eq!(chunk.lines().len(), 2);
    assert_eq!(chunk.lines()[1].offset, 10);
}

#[test]
fn test_column_change_starts_new_run() {
    let mut chunk = Chunk::new();
    chunk.write(OpCode::Nil, at(1, 1));
    chunk.write(OpCode::Nil, at(1, 6));
    assert_eq!(chunk.lines().len(), 2);
    assert_eq!(chunk.get_column(1), 6);
}

#[test]
fn test_position_lookup_over_many_runs() {
    let mut chunk = Chunk::new();
    for i in 0..1000u32 {
        chunk.write(OpCode::Nil, at(i + 1, i % 7 + 1));
    }
    for i in 0..1000usize {
        assert_eq!(chunk.get_line(i), i as u32 + 1);
        assert_eq!(chunk.get_column(i), i as u32 % 7 + 1);
    }
}

#[test]
fn test_patch_jump_only_touches_jumps() {
    let mut chunk = Chunk::new();
    let jump = chunk.write(OpCode::Jump(0), at(1, 1));
    let other = chunk.write(OpCode::Add, at(1, 1));
    chunk.patch_jump(jump, 12);
    chunk.patch_jump(other, 12);
    assert_eq!(chunk.code[jump], OpCode::Jump(12));
    assert_eq!(chunk.code[other], OpCode::Add);
}

// ============================================================================
// OpCode Tests
// ============================================================================

#[test]
fn test_opcode_names() {
    assert_eq!(OpCode::Power.name(), "POW");
    assert_eq!(OpCode::HasNot.name(), "HAS_NOT");
    assert_eq!(OpCode::ImportAs(0, 1).name(), "IMPORT_AS");
}

#[test]
fn test_upvalue_descriptor() {
    let desc = UpvalueDescriptor::new(true, 3);
    assert!(desc.is_local);
    assert_eq!(desc.index, 3);
}

// ============================================================================
// Disassembler Tests
// ============================================================================

#[test]
fn test_disassemble_invoke() {
    let mut chunk = Chunk::new();
    let name = chunk.add_constant(Value::Nil) as u16;
    chunk.write(OpCode::Invoke(name, 2), at(3, 1));
    let listing = disassemble_chunk(&chunk, "m", &|_| "append".to_string());
    assert!(listing.contains("INVOKE"));
    assert!(listing.contains("(2 args)"));
    assert!(listing.contains("'append'"));
}

#[test]
fn test_disassemble_bad_constant_does_not_panic() {
    let mut chunk = Chunk::new();
    chunk.write(OpCode::GetGlobal(9), at(1, 1));
    let listing = disassemble_chunk(&chunk, "m", &|_| String::new());
    assert!(listing.contains("<bad constant>"));
}
