//! Arena heap holding every slo object.
//!
//! Objects live in a vector of slots addressed by [`ObjRef`]. Freed slots
//! go on a free list and are reused by later allocations. Mark bits live
//! in a parallel vector so the collector can flip them while reading the
//! objects themselves (see [`crate::gc`]).
//!
//! Allocation only records pressure. The engine asks [`Heap::should_collect`]
//! between instructions and runs a collection there, so a cycle never
//! observes a half-finished instruction.
//!
//! Objects can also grow after allocation (a list appended to, a dict
//! that resizes). Every mutable access records the handle, and
//! [`Heap::account_growth`] re-measures those objects so the charge stays
//! current between collections.

use crate::object::{
    hash_string, FileMode, NativeFn, Obj, ObjBoundMethod, ObjClass, ObjClosure, ObjDict,
    ObjEnum, ObjError, ObjFile, ObjFunction, ObjInstance, ObjList, ObjModule, ObjNative,
    ObjString, ObjUpvalue, ParamInfo,
};
use crate::table::{Table, TableKey};
use core_types::{format_number, ErrorKind, ObjRef, SloError, Value};
use std::fs::File;
use std::io::BufReader;

/// Default collection threshold (1 MiB)
pub const DEFAULT_GC_THRESHOLD: usize = 1024 * 1024;

/// Default threshold multiplier applied after each collection
pub const DEFAULT_GC_GROWTH_FACTOR: usize = 2;

/// Name of the initializer method looked up on construction
pub const INIT_METHOD_NAME: &str = "__init__";

/// Nesting depth after which containers print as `...`
const MAX_DISPLAY_DEPTH: usize = 32;

/// Nesting depth after which list equality stops descending
const MAX_EQUALITY_DEPTH: usize = 512;

/// One occupied arena slot
#[derive(Debug)]
pub(crate) struct Slot {
    pub(crate) obj: Obj,
    /// Bytes charged for this object
    pub(crate) size: usize,
}

/// The built-in receiver classes whose method tables back strings,
/// lists, dicts and files.
#[derive(Debug, Clone, Copy, Default)]
pub struct BuiltinClasses {
    /// Methods shared by lists and dicts
    pub container: Option<ObjRef>,
    /// List methods
    pub list: Option<ObjRef>,
    /// Dict methods
    pub dict: Option<ObjRef>,
    /// String methods
    pub string: Option<ObjRef>,
    /// File methods and properties
    pub file: Option<ObjRef>,
}

impl BuiltinClasses {
    pub(crate) fn iter(&self) -> impl Iterator<Item = ObjRef> {
        [self.container, self.list, self.dict, self.string, self.file]
            .into_iter()
            .flatten()
    }
}

/// Heap counters
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct HeapStats {
    /// Bytes charged to live objects
    pub bytes_allocated: usize,
    /// Threshold that triggers the next collection
    pub next_gc: usize,
    /// Number of objects currently in the arena
    pub live_objects: usize,
    /// Completed collection cycles
    pub collections: usize,
}

/// The object arena
#[derive(Debug)]
pub struct Heap {
    pub(crate) objects: Vec<Option<Slot>>,
    pub(crate) marks: Vec<bool>,
    pub(crate) free_slots: Vec<usize>,
    /// Intern table: every live string, keyed by itself
    pub(crate) strings: Table,
    pub(crate) bytes_allocated: usize,
    pub(crate) next_gc: usize,
    pub(crate) growth_factor: usize,
    /// Polarity meaning "reached" in the current cycle
    pub(crate) mark_value: bool,
    pub(crate) gray: Vec<ObjRef>,
    /// Values held live by callers outside the engine's own roots
    pub(crate) extra_roots: Vec<Value>,
    pub(crate) collections: usize,
    pub(crate) collect_requested: bool,
    pub(crate) stress: bool,
    pub(crate) allocated_since_collect: bool,
    /// Objects handed out mutably since their size was last charged
    pub(crate) touched: Vec<ObjRef>,
    init_string: ObjRef,
    /// Receiver classes for built-in types
    pub classes: BuiltinClasses,
}

impl Default for Heap {
    fn default() -> Self {
        Self::new()
    }
}

impl Heap {
    /// Create a heap with the default collection settings
    pub fn new() -> Self {
        Self::with_gc_settings(DEFAULT_GC_THRESHOLD, DEFAULT_GC_GROWTH_FACTOR)
    }

    /// Create a heap with an explicit first threshold and growth factor
    pub fn with_gc_settings(initial_threshold: usize, growth_factor: usize) -> Self {
        let mut heap = Heap {
            objects: Vec::new(),
            marks: Vec::new(),
            free_slots: Vec::new(),
            strings: Table::new(),
            bytes_allocated: 0,
            next_gc: initial_threshold,
            growth_factor: growth_factor.max(1),
            mark_value: true,
            gray: Vec::new(),
            extra_roots: Vec::new(),
            collections: 0,
            collect_requested: false,
            stress: false,
            allocated_since_collect: false,
            touched: Vec::new(),
            init_string: ObjRef::new(0),
            classes: BuiltinClasses::default(),
        };
        heap.init_string = heap.intern(INIT_METHOD_NAME);
        heap
    }

    /// Collect at every boundary that follows an allocation
    pub fn set_stress(&mut self, stress: bool) {
        self.stress = stress;
    }

    /// The interned `__init__` string
    pub fn init_string(&self) -> ObjRef {
        self.init_string
    }

    // ------------------------------------------------------------------
    // Allocation
    // ------------------------------------------------------------------

    /// Place an object in the arena and charge its size
    pub fn alloc(&mut self, obj: Obj) -> ObjRef {
        let size = obj.size_estimate();
        self.bytes_allocated += size;
        self.allocated_since_collect = true;
        let slot = Slot { obj, size };
        let unmarked = !self.mark_value;
        let index = match self.free_slots.pop() {
            Some(index) => {
                self.objects[index] = Some(slot);
                self.marks[index] = unmarked;
                index
            }
            None => {
                self.objects.push(Some(slot));
                self.marks.push(unmarked);
                self.objects.len() - 1
            }
        };
        log::trace!("allocate {} bytes at #{}", size, index);
        ObjRef::new(index)
    }

    /// Intern a string by copying it
    pub fn intern(&mut self, chars: &str) -> ObjRef {
        let hash = hash_string(chars);
        if let Some(existing) = self.find_interned(chars, hash) {
            return existing;
        }
        self.alloc_string(chars.to_string(), hash)
    }

    /// Intern a string, taking ownership of the buffer
    pub fn intern_owned(&mut self, chars: String) -> ObjRef {
        let hash = hash_string(&chars);
        if let Some(existing) = self.find_interned(&chars, hash) {
            return existing;
        }
        self.alloc_string(chars, hash)
    }

    /// Intern a string and wrap it as a value
    pub fn string_value(&mut self, chars: &str) -> Value {
        Value::Obj(self.intern(chars))
    }

    fn find_interned(&self, chars: &str, hash: u32) -> Option<ObjRef> {
        let objects = &self.objects;
        self.strings.find_interned_string(hash, |r| {
            matches!(
                objects.get(r.index()),
                Some(Some(Slot { obj: Obj::String(s), .. })) if s.chars == chars
            )
        })
    }

    fn alloc_string(&mut self, chars: String, hash: u32) -> ObjRef {
        let r = self.alloc(Obj::String(ObjString { chars, hash }));
        self.strings.set(TableKey::new(Value::Obj(r), hash), Value::Nil);
        r
    }

    /// Allocate an empty function
    pub fn new_function(&mut self) -> ObjRef {
        self.alloc(Obj::Function(Box::default()))
    }

    /// Allocate a closure with unfilled upvalue slots
    pub fn new_closure(&mut self, function: ObjRef, upvalues: Vec<ObjRef>) -> ObjRef {
        self.alloc(Obj::Closure(ObjClosure { function, upvalues }))
    }

    /// Allocate an open upvalue for a stack slot
    pub fn new_upvalue(&mut self, slot: usize) -> ObjRef {
        self.alloc(Obj::Upvalue(ObjUpvalue::Open(slot)))
    }

    /// Allocate a class with empty tables
    pub fn new_class(&mut self, name: ObjRef, superclass: Option<ObjRef>) -> ObjRef {
        self.alloc(Obj::Class(Box::new(ObjClass {
            name,
            superclass,
            methods: Table::new(),
            native_properties: Table::new(),
        })))
    }

    /// Allocate an instance with no fields
    pub fn new_instance(&mut self, class: ObjRef) -> ObjRef {
        self.alloc(Obj::Instance(Box::new(ObjInstance {
            class,
            fields: Table::new(),
        })))
    }

    /// Allocate a bound method
    pub fn new_bound_method(&mut self, receiver: Value, method: ObjRef) -> ObjRef {
        self.alloc(Obj::BoundMethod(ObjBoundMethod { receiver, method }))
    }

    /// Allocate a native function
    pub fn new_native(
        &mut self,
        name: &'static str,
        function: NativeFn,
        arity_min: u8,
        arity_max: u8,
        params: &[ParamInfo],
    ) -> ObjRef {
        self.alloc(Obj::Native(Box::new(ObjNative {
            name,
            function,
            arity_min,
            arity_max,
            params: params.to_vec(),
        })))
    }

    /// Allocate a list of the built-in list class
    pub fn new_list(&mut self, values: Vec<Value>) -> ObjRef {
        let class = self.classes.list;
        self.alloc(Obj::List(ObjList { values, class }))
    }

    /// Allocate an empty dict of the built-in dict class
    pub fn new_dict(&mut self) -> ObjRef {
        let class = self.classes.dict;
        self.alloc(Obj::Dict(Box::new(ObjDict {
            table: Table::new(),
            class,
        })))
    }

    /// Allocate an empty module
    pub fn new_module(&mut self, name: ObjRef) -> ObjRef {
        self.alloc(Obj::Module(Box::new(ObjModule {
            name,
            exports: Table::new(),
        })))
    }

    /// Allocate an enum with no members
    pub fn new_enum(&mut self, name: ObjRef) -> ObjRef {
        self.alloc(Obj::Enum(Box::new(ObjEnum {
            name,
            members: Table::new(),
        })))
    }

    /// Allocate a file object owning `handle`
    pub fn new_file(&mut self, handle: File, mode: FileMode, path: ObjRef) -> ObjRef {
        self.alloc(Obj::File(Box::new(ObjFile {
            handle: Some(BufReader::new(handle)),
            mode,
            path,
        })))
    }

    /// Allocate an error value
    pub fn error_value(&mut self, kind: ErrorKind, message: impl Into<String>) -> Value {
        Value::Obj(self.alloc(Obj::Error(ObjError {
            kind,
            message: message.into(),
        })))
    }

    // ------------------------------------------------------------------
    // Access
    // ------------------------------------------------------------------

    /// The object behind a handle.
    ///
    /// # Panics
    ///
    /// Panics if the handle points at a freed slot. Live values never hold
    /// such handles; hitting this is an engine bug.
    pub fn get(&self, r: ObjRef) -> &Obj {
        match self.objects.get(r.index()) {
            Some(Some(slot)) => &slot.obj,
            _ => panic!("dangling object handle {}", r),
        }
    }

    /// Mutable access to the object behind a handle.
    ///
    /// The handle is queued for [`Heap::account_growth`], since the caller
    /// may grow the object.
    ///
    /// # Panics
    ///
    /// Same contract as [`Heap::get`].
    pub fn get_mut(&mut self, r: ObjRef) -> &mut Obj {
        if self.touched.last() != Some(&r) {
            self.touched.push(r);
        }
        match self.objects.get_mut(r.index()) {
            Some(Some(slot)) => &mut slot.obj,
            _ => panic!("dangling object handle {}", r),
        }
    }

    /// Returns true if the handle points at a live slot
    pub fn contains(&self, r: ObjRef) -> bool {
        matches!(self.objects.get(r.index()), Some(Some(_)))
    }

    fn obj(&self, value: Value) -> Option<&Obj> {
        match value {
            Value::Obj(r) => Some(self.get(r)),
            _ => None,
        }
    }

    /// The string contents of a value, if it is a string
    pub fn as_str(&self, value: Value) -> Option<&str> {
        match self.obj(value) {
            Some(Obj::String(s)) => Some(&s.chars),
            _ => None,
        }
    }

    /// The contents of a string handle; empty for non-strings
    pub fn str_of(&self, r: ObjRef) -> &str {
        match self.get(r) {
            Obj::String(s) => &s.chars,
            _ => "",
        }
    }

    /// Returns true if the value is a string
    pub fn is_string(&self, value: Value) -> bool {
        matches!(self.obj(value), Some(Obj::String(_)))
    }

    /// The list behind a value
    pub fn as_list(&self, value: Value) -> Option<&ObjList> {
        match self.obj(value) {
            Some(Obj::List(l)) => Some(l),
            _ => None,
        }
    }

    /// Mutable list behind a value
    pub fn as_list_mut(&mut self, value: Value) -> Option<&mut ObjList> {
        match value {
            Value::Obj(r) => match self.get_mut(r) {
                Obj::List(l) => Some(l),
                _ => None,
            },
            _ => None,
        }
    }

    /// The dict behind a value
    pub fn as_dict(&self, value: Value) -> Option<&ObjDict> {
        match self.obj(value) {
            Some(Obj::Dict(d)) => Some(d),
            _ => None,
        }
    }

    /// Mutable dict behind a value
    pub fn as_dict_mut(&mut self, value: Value) -> Option<&mut ObjDict> {
        match value {
            Value::Obj(r) => match self.get_mut(r) {
                Obj::Dict(d) => Some(d),
                _ => None,
            },
            _ => None,
        }
    }

    /// The class behind a value
    pub fn as_class(&self, value: Value) -> Option<&ObjClass> {
        match self.obj(value) {
            Some(Obj::Class(c)) => Some(c),
            _ => None,
        }
    }

    /// The function behind a handle
    pub fn as_function(&self, r: ObjRef) -> Option<&ObjFunction> {
        match self.get(r) {
            Obj::Function(f) => Some(f),
            _ => None,
        }
    }

    /// The closure behind a handle
    pub fn as_closure(&self, r: ObjRef) -> Option<&ObjClosure> {
        match self.get(r) {
            Obj::Closure(c) => Some(c),
            _ => None,
        }
    }

    /// The file behind a value
    pub fn as_file_mut(&mut self, value: Value) -> Option<&mut ObjFile> {
        match value {
            Value::Obj(r) => match self.get_mut(r) {
                Obj::File(f) => Some(f),
                _ => None,
            },
            _ => None,
        }
    }

    /// The error behind a value
    pub fn as_error(&self, value: Value) -> Option<&ObjError> {
        match self.obj(value) {
            Some(Obj::Error(e)) => Some(e),
            _ => None,
        }
    }

    // ------------------------------------------------------------------
    // Keys, equality, display
    // ------------------------------------------------------------------

    /// Table key for an interned string handle
    pub fn string_key(&self, r: ObjRef) -> TableKey {
        let hash = match self.get(r) {
            Obj::String(s) => s.hash,
            _ => 0,
        };
        TableKey::new(Value::Obj(r), hash)
    }

    /// Table key for any hashable value.
    ///
    /// Booleans, nil, numbers and strings are hashable. Other objects are
    /// rejected with a type fault.
    pub fn key(&self, value: Value) -> Result<TableKey, SloError> {
        if let Some(hash) = value.hash_primitive() {
            return Ok(TableKey::new(value, hash));
        }
        match self.obj(value) {
            Some(Obj::String(s)) => Ok(TableKey::new(value, s.hash)),
            _ => Err(SloError::new(
                ErrorKind::Type,
                format!("Unhashable type '{}'.", self.type_name(value)),
            )),
        }
    }

    /// Intern `name` and return its key
    pub fn name_key(&mut self, name: &str) -> TableKey {
        let r = self.intern(name);
        self.string_key(r)
    }

    /// User-facing type name
    pub fn type_name(&self, value: Value) -> &'static str {
        match self.obj(value) {
            Some(obj) => obj.type_name(),
            None => value.primitive_type_name(),
        }
    }

    /// Structural equality.
    ///
    /// Lists compare element-wise; strings by content; other objects by
    /// identity. Lists nested deeper than `MAX_EQUALITY_DEPTH` (which
    /// includes any list that contains itself) compare unequal unless they
    /// are the same handle.
    pub fn values_equal(&self, a: Value, b: Value) -> bool {
        self.equal_at(a, b, 0)
    }

    fn equal_at(&self, a: Value, b: Value, depth: usize) -> bool {
        match (a, b) {
            (Value::Obj(x), Value::Obj(y)) => {
                if x == y {
                    return true;
                }
                match (self.get(x), self.get(y)) {
                    (Obj::String(s), Obj::String(t)) => s.chars == t.chars,
                    (Obj::List(l), Obj::List(m)) => {
                        depth < MAX_EQUALITY_DEPTH
                            && l.values.len() == m.values.len()
                            && l
                                .values
                                .iter()
                                .zip(m.values.iter())
                                .all(|(p, q)| self.equal_at(*p, *q, depth + 1))
                    }
                    _ => false,
                }
            }
            (Value::Empty, Value::Empty) => true,
            _ => a == b,
        }
    }

    /// Canonical display string, as `print` shows it
    pub fn display(&self, value: Value) -> String {
        let mut out = String::new();
        self.write_value(&mut out, value, 0);
        out
    }

    fn function_label(&self, function: ObjRef) -> String {
        match self.as_function(function).and_then(|f| f.name) {
            Some(name) => format!("<fn {}>", self.str_of(name)),
            None => "<script>".to_string(),
        }
    }

    fn write_table(&self, out: &mut String, table: &Table, depth: usize) {
        for (i, (key, value)) in table.iter().enumerate() {
            if i > 0 {
                out.push_str(", ");
            }
            self.write_value(out, key, depth + 1);
            out.push_str(": ");
            self.write_value(out, value, depth + 1);
        }
    }

    fn write_value(&self, out: &mut String, value: Value, depth: usize) {
        let r = match value {
            Value::Bool(b) => return out.push_str(if b { "true" } else { "false" }),
            Value::Nil => return out.push_str("nil"),
            Value::Number(n) => return out.push_str(&format_number(n)),
            Value::Empty => return out.push_str("<empty>"),
            Value::Obj(r) => r,
        };
        if depth > MAX_DISPLAY_DEPTH {
            out.push_str("...");
            return;
        }
        match self.get(r) {
            Obj::String(s) => out.push_str(&s.chars),
            Obj::Function(_) => out.push_str(&self.function_label(r)),
            Obj::Closure(c) => out.push_str(&self.function_label(c.function)),
            Obj::BoundMethod(b) => match self.as_closure(b.method) {
                Some(c) => out.push_str(&self.function_label(c.function)),
                None => out.push_str("<native fn>"),
            },
            Obj::Upvalue(_) => out.push_str("upvalue"),
            Obj::Class(c) => out.push_str(self.str_of(c.name)),
            Obj::Instance(i) => {
                let class_name = match self.get(i.class) {
                    Obj::Class(c) => self.str_of(c.name),
                    _ => "?",
                };
                out.push_str(class_name);
                out.push_str(" instance");
            }
            Obj::Native(_) => out.push_str("<native fn>"),
            Obj::List(l) => {
                out.push('[');
                for (i, item) in l.values.iter().enumerate() {
                    if i > 0 {
                        out.push_str(", ");
                    }
                    self.write_value(out, *item, depth + 1);
                }
                out.push(']');
            }
            Obj::Dict(d) => {
                out.push('{');
                self.write_table(out, &d.table, depth);
                out.push('}');
            }
            Obj::Module(m) => {
                out.push_str("<module ");
                out.push_str(self.str_of(m.name));
                out.push('>');
            }
            Obj::Enum(e) => {
                out.push_str("enum ");
                out.push_str(self.str_of(e.name));
                out.push_str(": {");
                self.write_table(out, &e.members, depth);
                out.push('}');
            }
            Obj::File(f) => {
                out.push_str("<file ");
                out.push_str(self.str_of(f.path));
                out.push_str(if f.is_closed() { " (closed)>" } else { " (open)>" });
            }
            Obj::Error(e) => {
                out.push_str("<error: ");
                out.push_str(&e.message);
                out.push('>');
            }
        }
    }

    // ------------------------------------------------------------------
    // Roots and accounting
    // ------------------------------------------------------------------

    /// Keep a value alive across collections until popped
    pub fn push_root(&mut self, value: Value) {
        self.extra_roots.push(value);
    }

    /// Release the most recent extra root
    pub fn pop_root(&mut self) -> Option<Value> {
        self.extra_roots.pop()
    }

    /// Release extra roots down to `len`
    pub fn truncate_roots(&mut self, len: usize) {
        self.extra_roots.truncate(len);
    }

    /// Number of extra roots held
    pub fn root_count(&self) -> usize {
        self.extra_roots.len()
    }

    /// Ask for a collection at the next opportunity
    pub fn request_collection(&mut self) {
        self.collect_requested = true;
    }

    /// Re-charge every object handed out mutably since the last call.
    ///
    /// Sizes follow buffer capacity, so an object that grew raises
    /// `bytes_allocated` and one that shrank lowers it.
    pub fn account_growth(&mut self) {
        for r in std::mem::take(&mut self.touched) {
            if let Some(Some(slot)) = self.objects.get_mut(r.index()) {
                let size = slot.obj.size_estimate();
                self.bytes_allocated = (self.bytes_allocated + size).saturating_sub(slot.size);
                slot.size = size;
            }
        }
    }

    /// Returns true if the engine should collect now
    pub fn should_collect(&self) -> bool {
        self.collect_requested
            || self.bytes_allocated > self.next_gc
            || (self.stress && self.allocated_since_collect)
    }

    /// Current counters
    pub fn stats(&self) -> HeapStats {
        HeapStats {
            bytes_allocated: self.bytes_allocated,
            next_gc: self.next_gc,
            live_objects: self.objects.len() - self.free_slots.len(),
            collections: self.collections,
        }
    }

    /// Number of interned strings
    pub fn interned_count(&self) -> usize {
        self.strings.len()
    }
}
