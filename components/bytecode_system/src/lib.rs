//! Bytecode system for the slo virtual machine
//!
//! This crate provides the instruction set, the chunk container the
//! compiler emits into, and a disassembler for debugging output.
//!
//! # Example
//!
//! ```
//! use bytecode_system::{disassemble_chunk, Chunk, OpCode};
//! use core_types::{format_number, SourcePosition, Value};
//!
//! let mut chunk = Chunk::new();
//! let idx = chunk.add_constant(Value::Number(42.0));
//! chunk.write(OpCode::Constant(idx as u16), SourcePosition::new(1, 1));
//! chunk.write(OpCode::Return, SourcePosition::new(1, 1));
//!
//! let listing = disassemble_chunk(&chunk, "demo", &|value| match value {
//!     Value::Number(n) => format_number(n),
//!     _ => "?".to_string(),
//! });
//! assert!(listing.contains("CONSTANT"));
//! ```

#![warn(missing_docs)]
#![warn(clippy::all)]

pub mod chunk;
pub mod disassembler;
pub mod opcode;

// Re-export main types at crate root
pub use chunk::{Chunk, LineStart, MAX_CONSTANTS};
pub use disassembler::{disassemble_chunk, disassemble_instruction};
pub use opcode::{OpCode, UpvalueDescriptor};
