//! Human-readable bytecode listings.
//!
//! Constants live in the heap, so the caller supplies the renderer used for
//! constant-pool operands.

use crate::chunk::Chunk;
use crate::opcode::OpCode;
use core_types::Value;
use std::fmt::Write;

/// Render every instruction of `chunk` under a `== name ==` header.
pub fn disassemble_chunk(chunk: &Chunk, name: &str, render: &dyn Fn(Value) -> String) -> String {
    let mut out = format!("== {} ==\n", name);
    for offset in 0..chunk.len() {
        out.push_str(&disassemble_instruction(chunk, offset, render));
        out.push('\n');
    }
    out
}

/// Render one instruction: offset, source line, mnemonic and operands.
///
/// The line column shows `|` when the instruction shares the previous
/// instruction's line.
pub fn disassemble_instruction(
    chunk: &Chunk,
    offset: usize,
    render: &dyn Fn(Value) -> String,
) -> String {
    let mut out = format!("{:04} ", offset);
    let line = chunk.get_line(offset);
    if offset > 0 && line == chunk.get_line(offset - 1) {
        out.push_str("   | ");
    } else {
        let _ = write!(out, "{:4} ", line);
    }

    let Some(op) = chunk.code.get(offset) else {
        out.push_str("<out of range>");
        return out;
    };

    let constant = |index: u16| -> String {
        chunk
            .constants
            .get(index as usize)
            .map(|value| render(*value))
            .unwrap_or_else(|| "<bad constant>".to_string())
    };

    let name = op.name();
    let _ = match *op {
        OpCode::Constant(i)
        | OpCode::DefineGlobal(i)
        | OpCode::DefineFinalGlobal(i)
        | OpCode::GetGlobal(i)
        | OpCode::SetGlobal(i)
        | OpCode::Closure(i)
        | OpCode::Class(i)
        | OpCode::Method(i)
        | OpCode::GetProperty(i)
        | OpCode::SetProperty(i)
        | OpCode::GetSuper(i)
        | OpCode::Import(i) => write!(out, "{:<20} {:4} '{}'", name, i, constant(i)),
        OpCode::Invoke(i, argc) | OpCode::SuperInvoke(i, argc) => {
            write!(out, "{:<20} ({} args) {:4} '{}'", name, argc, i, constant(i))
        }
        OpCode::Enum(i, count) => {
            write!(out, "{:<20} {:4} '{}' ({} members)", name, i, constant(i), count)
        }
        OpCode::ImportAs(module, alias) => write!(
            out,
            "{:<20} '{}' as '{}'",
            name,
            constant(module),
            constant(alias)
        ),
        OpCode::GetLocal(slot)
        | OpCode::SetLocal(slot)
        | OpCode::GetUpvalue(slot)
        | OpCode::SetUpvalue(slot)
        | OpCode::Call(slot)
        | OpCode::Interpolate(slot) => write!(out, "{:<20} {:4}", name, slot),
        OpCode::List(count) | OpCode::Dict(count) => write!(out, "{:<20} {:4}", name, count),
        OpCode::Jump(d) | OpCode::JumpIfFalse(d) | OpCode::JumpIfTrue(d) => {
            write!(out, "{:<20} {:4} -> {}", name, offset, offset + 1 + d as usize)
        }
        OpCode::Loop(d) => write!(
            out,
            "{:<20} {:4} -> {}",
            name,
            offset,
            (offset + 1).saturating_sub(d as usize)
        ),
        OpCode::Assert(with_message) => {
            if with_message {
                write!(out, "{:<20} (message)", name)
            } else {
                write!(out, "{}", name)
            }
        }
        _ => write!(out, "{}", name),
    };
    out
}
