//! Contract tests for the bytecode_system public API
//!
//! The execution engine and the compiler both depend on these guarantees.

use bytecode_system::{Chunk, OpCode, MAX_CONSTANTS};
use core_types::{SourcePosition, Value};

#[test]
fn contract_write_returns_instruction_index() {
    let mut chunk = Chunk::new();
    for expected in 0..5 {
        assert_eq!(chunk.write(OpCode::Nil, SourcePosition::new(1, 1)), expected);
    }
}

#[test]
fn contract_offsets_past_end_report_last_position() {
    let mut chunk = Chunk::new();
    chunk.write(OpCode::Return, SourcePosition::new(9, 2));
    assert_eq!(chunk.position(100), SourcePosition::new(9, 2));
}

#[test]
fn contract_constant_indices_fit_u16() {
    assert_eq!(MAX_CONSTANTS - 1, u16::MAX as usize);
}

#[test]
fn contract_opcode_is_copy() {
    let op = OpCode::Call(2);
    let copy = op;
    assert_eq!(op, copy);
}

#[test]
fn contract_chunk_clone_is_deep() {
    let mut chunk = Chunk::new();
    chunk.add_constant(Value::Number(1.0));
    let mut copy = chunk.clone();
    copy.add_constant(Value::Number(2.0));
    assert_eq!(chunk.constants.len(), 1);
    assert_eq!(copy.constants.len(), 2);
}
