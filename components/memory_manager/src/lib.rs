//! Memory Manager - object model, heap and garbage collector
//!
//! This component provides:
//! - The heap object variants and native-function calling convention
//! - An arena heap addressed by stable handles, with string interning
//! - The open-addressing hash table used throughout the runtime
//! - A tracing mark-sweep collector with flip-polarity mark bits

#![warn(missing_docs)]
#![warn(clippy::all)]
#![deny(unsafe_code)]

pub mod gc;
pub mod heap;
pub mod object;
pub mod table;

// Re-export main types
pub use gc::GcReport;
pub use heap::{
    BuiltinClasses, Heap, HeapStats, DEFAULT_GC_GROWTH_FACTOR, DEFAULT_GC_THRESHOLD,
    INIT_METHOD_NAME,
};
pub use object::{
    hash_string, FileMode, NativeContext, NativeFn, Obj, ObjBoundMethod, ObjClass, ObjClosure,
    ObjDict, ObjEnum, ObjError, ObjFile, ObjFunction, ObjInstance, ObjList, ObjModule, ObjNative,
    ObjString, ObjUpvalue, ParamInfo,
};
pub use table::{Entry, Table, TableKey};
