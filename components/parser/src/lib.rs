//! slo Parser Component
//!
//! Turns slo source text into bytecode functions living on the heap.
//!
//! # Overview
//!
//! - [`Lexer`] - Tokenizes slo source, including string interpolation
//! - [`Token`] - Token types: identifiers, literals, keywords, punctuators
//! - [`compile`] - Single-pass Pratt compiler emitting bytecode directly
//! - [`CompileErrors`] - Every syntax error found in one source
//!
//! # Example
//!
//! ```
//! use memory_manager::Heap;
//! use parser::compile;
//!
//! let mut heap = Heap::new();
//! let script = compile(&mut heap, "var greeting = \"hi\";", "main.slo").unwrap();
//! let function = heap.as_function(script).unwrap();
//! assert!(!function.chunk.is_empty());
//! ```

#![warn(missing_docs)]
#![warn(clippy::all)]

pub mod compiler;
pub mod error;
pub mod lexer;

pub use compiler::{compile, MAX_ARGS, MAX_LOCALS, MAX_NESTING, MAX_UPVALUES};
pub use error::{syntax_error, CompileErrors};
pub use lexer::{Keyword, Lexer, Punctuator, SpannedToken, Token};
