//! Bytecode interpreter for the slo language
//!
//! This crate provides the execution engine:
//! - Stack-based dispatch over [`bytecode_system::OpCode`]
//! - Call frames, closures and upvalue capture
//! - Classes with flattened inheritance and bound methods
//! - Root marking for the [`memory_manager`] collector
//!
//! # Example
//!
//! ```
//! use interpreter::{SharedBuffer, Vm};
//!
//! let buffer = SharedBuffer::new();
//! let mut vm = Vm::new().with_output(Box::new(buffer.clone()));
//! vm.interpret("var xs = [1, 2] + [3]; println(xs[-1]);", "demo.slo").unwrap();
//! assert_eq!(buffer.contents(), "3\n");
//! ```

#![warn(missing_docs)]
#![warn(clippy::all)]

pub mod call_frame;
mod calls;
mod containers;
pub mod dispatch;
pub mod error;
pub mod gc_integration;
pub mod output;
mod upvalue;
pub mod vm;

// Re-export main types at crate root
pub use call_frame::{CallFrame, FRAMES_MAX, STACK_MAX};
pub use dispatch::ieee_remainder;
pub use error::{InterpretError, InterpretResult};
pub use output::SharedBuffer;
pub use vm::{Vm, VmConfig};
