//! Core value types and error reporting for the slo runtime.
//!
//! This crate provides the foundational types shared by every other
//! component: the tagged [`Value`] representation, the [`ObjRef`] handle
//! used to address heap objects, and the fault types produced by the
//! compiler and the execution engine.
//!
//! # Overview
//!
//! - [`Value`] - Tagged representation of slo values
//! - [`ObjRef`] - Stable handle to an object in the heap arena
//! - [`SloError`] - A reported fault with position and stack trace
//! - [`ErrorKind`] - The fault taxonomy
//! - [`SourcePosition`] - Line and column in a source file
//! - [`StackFrame`] - One entry of a rendered call stack
//!
//! # Examples
//!
//! ```
//! use core_types::{ErrorKind, SloError, Value};
//!
//! let num = Value::Number(42.0);
//! assert!(!num.is_falsey());
//! assert_eq!(num.as_number(), Some(42.0));
//!
//! let error = SloError::new(ErrorKind::Type, "Operands must be numbers.");
//! assert_eq!(error.to_string(), "[TypeException] Operands must be numbers.");
//! ```

#![warn(missing_docs)]
#![warn(clippy::all)]
#![deny(unsafe_code)]

mod error;
mod source;
mod value;

pub use error::{ErrorKind, SloError};
pub use source::{SourcePosition, StackFrame};
pub use value::{format_number, ObjRef, Value};
