//! Heap object variants.
//!
//! Every heap-allocated slo value is one of the [`Obj`] variants. Objects
//! refer to each other through [`ObjRef`] handles, never through pointers,
//! so cycles are harmless to the arena and the collector.

use crate::heap::Heap;
use crate::table::Table;
use bytecode_system::{Chunk, UpvalueDescriptor};
use core_types::{ErrorKind, ObjRef, Value};
use std::fmt;
use std::fs::File;
use std::io::{BufReader, Write};

/// Interned, immutable string
#[derive(Debug, Clone)]
pub struct ObjString {
    /// String contents
    pub chars: String,
    /// FNV-1a hash of the bytes, computed once at creation
    pub hash: u32,
}

/// A compiled function
#[derive(Debug, Clone, Default)]
pub struct ObjFunction {
    /// Number of declared parameters
    pub arity: u8,
    /// Captured-variable descriptors, one per upvalue
    pub upvalues: Vec<UpvalueDescriptor>,
    /// Instructions, constants and line table
    pub chunk: Chunk,
    /// Function name, `None` for the top-level script
    pub name: Option<ObjRef>,
    /// Label of the file the function was compiled from
    pub file: Option<ObjRef>,
}

impl ObjFunction {
    /// Number of upvalues a closure over this function captures
    pub fn upvalue_count(&self) -> usize {
        self.upvalues.len()
    }
}

/// A function paired with its captured variables
#[derive(Debug, Clone)]
pub struct ObjClosure {
    /// The wrapped [`ObjFunction`]
    pub function: ObjRef,
    /// One [`ObjUpvalue`] handle per captured variable
    pub upvalues: Vec<ObjRef>,
}

/// A captured variable
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum ObjUpvalue {
    /// Still living in the operand stack at this absolute slot
    Open(usize),
    /// Copied off the stack after its frame returned
    Closed(Value),
}

/// A class: user-defined or one of the built-in receiver classes
#[derive(Debug, Clone)]
pub struct ObjClass {
    /// Class name string
    pub name: ObjRef,
    /// Superclass, recorded for display and introspection only
    pub superclass: Option<ObjRef>,
    /// Method name to closure or native
    pub methods: Table,
    /// Property name to native getter, for built-in classes
    pub native_properties: Table,
}

/// An instance of a user class
#[derive(Debug, Clone)]
pub struct ObjInstance {
    /// The instance's class
    pub class: ObjRef,
    /// Field name to value
    pub fields: Table,
}

/// A method closure bound to its receiver
#[derive(Debug, Clone, Copy)]
pub struct ObjBoundMethod {
    /// The receiver placed in slot zero of the call
    pub receiver: Value,
    /// The method closure
    pub method: ObjRef,
}

/// Everything a native function may touch while it runs
pub struct NativeContext<'a> {
    /// The object heap
    pub heap: &'a mut Heap,
    /// Destination for `print` output
    pub out: &'a mut dyn Write,
    /// State of the pseudo-random generator behind the `random` module
    pub random_state: &'a mut u64,
    /// Set by `exit()`; the engine stops after the native returns
    pub exit_code: Option<i32>,
}

impl<'a> NativeContext<'a> {
    /// Allocate an error value of the given kind
    pub fn error(&mut self, kind: ErrorKind, message: impl Into<String>) -> Value {
        self.heap.error_value(kind, message)
    }

    /// Allocate a runtime error value
    pub fn runtime_error(&mut self, message: impl Into<String>) -> Value {
        self.error(ErrorKind::Runtime, message)
    }

    /// Allocate a type error value
    pub fn type_error(&mut self, message: impl Into<String>) -> Value {
        self.error(ErrorKind::Type, message)
    }

    /// Allocate an I/O error value
    pub fn io_error(&mut self, message: impl Into<String>) -> Value {
        self.error(ErrorKind::Io, message)
    }
}

/// Signature shared by all native functions.
///
/// `args` is the argument window. For methods it starts with the receiver.
pub type NativeFn = fn(&mut NativeContext<'_>, &[Value]) -> Value;

/// Named-parameter descriptor of a native
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ParamInfo {
    /// Parameter name
    pub name: &'static str,
    /// Whether the caller must supply it
    pub required: bool,
}

impl ParamInfo {
    /// A required parameter
    pub const fn required(name: &'static str) -> Self {
        Self {
            name,
            required: true,
        }
    }

    /// An optional parameter
    pub const fn optional(name: &'static str) -> Self {
        Self {
            name,
            required: false,
        }
    }
}

/// A host function callable from slo
#[derive(Clone)]
pub struct ObjNative {
    /// Name used in arity errors
    pub name: &'static str,
    /// The host function
    pub function: NativeFn,
    /// Fewest arguments accepted, receiver included for methods
    pub arity_min: u8,
    /// Most arguments accepted, receiver included for methods
    pub arity_max: u8,
    /// Parameter descriptors
    pub params: Vec<ParamInfo>,
}

impl ObjNative {
    /// Check `argc` against the declared bounds.
    ///
    /// Returns the message for a type fault when the count is out of range.
    pub fn check_arity(&self, argc: usize) -> Result<(), String> {
        let min = self.arity_min as usize;
        let max = self.arity_max as usize;
        if argc >= min && argc <= max {
            return Ok(());
        }
        let expected = if min == max {
            format!("{} argument{}", min, if min == 1 { "" } else { "s" })
        } else {
            format!("{} to {} arguments", min, max)
        };
        Err(format!("{}() expects {} but got {}.", self.name, expected, argc))
    }
}

impl fmt::Debug for ObjNative {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ObjNative")
            .field("name", &self.name)
            .field("arity_min", &self.arity_min)
            .field("arity_max", &self.arity_max)
            .field("params", &self.params)
            .finish()
    }
}

/// A growable list
#[derive(Debug, Clone, Default)]
pub struct ObjList {
    /// Elements in order
    pub values: Vec<Value>,
    /// The runtime class used for method dispatch
    pub class: Option<ObjRef>,
}

/// A hash dictionary
#[derive(Debug, Clone, Default)]
pub struct ObjDict {
    /// Key to value
    pub table: Table,
    /// The runtime class used for method dispatch
    pub class: Option<ObjRef>,
}

/// An imported module
#[derive(Debug, Clone)]
pub struct ObjModule {
    /// Canonical module name
    pub name: ObjRef,
    /// Exported name to value
    pub exports: Table,
}

/// An enum declaration
#[derive(Debug, Clone)]
pub struct ObjEnum {
    /// Enum name
    pub name: ObjRef,
    /// Member name to ordinal
    pub members: Table,
}

/// How a file was opened
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FileMode {
    /// `"r"`
    Read,
    /// `"w"`
    Write,
    /// `"a"`
    Append,
    /// `"r+"`, `"w+"` or `"a+"`
    ReadWrite,
}

impl FileMode {
    /// Parse an `open()` mode string
    pub fn parse(mode: &str) -> Option<Self> {
        match mode {
            "r" | "rb" => Some(FileMode::Read),
            "w" | "wb" => Some(FileMode::Write),
            "a" | "ab" => Some(FileMode::Append),
            "r+" | "w+" | "a+" => Some(FileMode::ReadWrite),
            _ => None,
        }
    }

    /// The canonical mode string
    pub fn as_str(self) -> &'static str {
        match self {
            FileMode::Read => "r",
            FileMode::Write => "w",
            FileMode::Append => "a",
            FileMode::ReadWrite => "r+",
        }
    }

    /// Returns true if reads are allowed
    pub fn can_read(self) -> bool {
        matches!(self, FileMode::Read | FileMode::ReadWrite)
    }

    /// Returns true if writes are allowed
    pub fn can_write(self) -> bool {
        !matches!(self, FileMode::Read)
    }
}

/// An open (or explicitly closed) OS file
#[derive(Debug)]
pub struct ObjFile {
    /// The handle, `None` once closed
    pub handle: Option<BufReader<File>>,
    /// Access mode
    pub mode: FileMode,
    /// Path the file was opened with
    pub path: ObjRef,
}

impl ObjFile {
    /// Returns true once `close` ran
    pub fn is_closed(&self) -> bool {
        self.handle.is_none()
    }
}

/// A first-class error value returned by a failing native
#[derive(Debug, Clone, PartialEq)]
pub struct ObjError {
    /// Kind of the fault the engine raises for it
    pub kind: ErrorKind,
    /// Fault message
    pub message: String,
}

/// A heap object
#[derive(Debug)]
pub enum Obj {
    /// Interned string
    String(ObjString),
    /// Compiled function
    Function(Box<ObjFunction>),
    /// Closure over a function
    Closure(ObjClosure),
    /// Captured variable
    Upvalue(ObjUpvalue),
    /// Class
    Class(Box<ObjClass>),
    /// Instance of a user class
    Instance(Box<ObjInstance>),
    /// Bound method
    BoundMethod(ObjBoundMethod),
    /// Host function
    Native(Box<ObjNative>),
    /// List
    List(ObjList),
    /// Dictionary
    Dict(Box<ObjDict>),
    /// Module
    Module(Box<ObjModule>),
    /// Enum
    Enum(Box<ObjEnum>),
    /// File
    File(Box<ObjFile>),
    /// Error value
    Error(ObjError),
}

impl Obj {
    /// User-facing type name
    pub fn type_name(&self) -> &'static str {
        match self {
            Obj::String(_) => "string",
            Obj::Function(_) | Obj::Closure(_) => "function",
            Obj::Upvalue(_) => "upvalue",
            Obj::Class(_) => "class",
            Obj::Instance(_) => "instance",
            Obj::BoundMethod(_) => "method",
            Obj::Native(_) => "native function",
            Obj::List(_) => "list",
            Obj::Dict(_) => "dict",
            Obj::Module(_) => "module",
            Obj::Enum(_) => "enum",
            Obj::File(_) => "file",
            Obj::Error(_) => "error",
        }
    }

    /// Returns true for kinds with no outgoing references
    pub fn is_leaf(&self) -> bool {
        matches!(self, Obj::String(_) | Obj::Native(_) | Obj::Error(_))
    }

    /// Approximate number of bytes this object owns
    pub fn size_estimate(&self) -> usize {
        let value = std::mem::size_of::<Value>();
        let base = std::mem::size_of::<Obj>();
        base + match self {
            Obj::String(s) => s.chars.capacity(),
            Obj::Function(f) => {
                std::mem::size_of::<ObjFunction>()
                    + f.chunk.code.capacity() * std::mem::size_of::<bytecode_system::OpCode>()
                    + f.chunk.constants.capacity() * value
                    + f.upvalues.capacity() * std::mem::size_of::<UpvalueDescriptor>()
            }
            Obj::Closure(c) => c.upvalues.capacity() * std::mem::size_of::<ObjRef>(),
            Obj::Upvalue(_) | Obj::BoundMethod(_) | Obj::Error(_) => 0,
            Obj::Class(c) => {
                std::mem::size_of::<ObjClass>()
                    + c.methods.allocated_bytes()
                    + c.native_properties.allocated_bytes()
            }
            Obj::Instance(i) => std::mem::size_of::<ObjInstance>() + i.fields.allocated_bytes(),
            Obj::Native(n) => {
                std::mem::size_of::<ObjNative>() + n.params.capacity() * std::mem::size_of::<ParamInfo>()
            }
            Obj::List(l) => l.values.capacity() * value,
            Obj::Dict(d) => std::mem::size_of::<ObjDict>() + d.table.allocated_bytes(),
            Obj::Module(m) => std::mem::size_of::<ObjModule>() + m.exports.allocated_bytes(),
            Obj::Enum(e) => std::mem::size_of::<ObjEnum>() + e.members.allocated_bytes(),
            Obj::File(_) => std::mem::size_of::<ObjFile>(),
        }
    }
}

/// FNV-1a over the string's bytes
pub fn hash_string(chars: &str) -> u32 {
    let mut hash: u32 = 2_166_136_261;
    for byte in chars.bytes() {
        hash ^= byte as u32;
        hash = hash.wrapping_mul(16_777_619);
    }
    hash
}
