//! Native declarations and argument helpers shared by every library module.

use crate::error::{NativeError, NativeResult};
use core_types::{ObjRef, Value};
use memory_manager::{Heap, NativeFn, Obj, ParamInfo, Table};

/// Maximum declared arity, used for variadic natives
pub const VARIADIC: u8 = u8::MAX;

/// Receiver parameter of every built-in method
pub(crate) const SELF: ParamInfo = ParamInfo::required("self");

/// Static description of one native function
#[derive(Clone, Copy)]
pub struct NativeSpec {
    /// Name the native is bound under
    pub name: &'static str,
    /// Host function
    pub function: NativeFn,
    /// Fewest arguments, receiver included for methods
    pub arity_min: u8,
    /// Most arguments, receiver included for methods
    pub arity_max: u8,
    /// Named-parameter descriptors
    pub params: &'static [ParamInfo],
}

impl NativeSpec {
    /// Describe a native
    pub const fn new(
        name: &'static str,
        function: NativeFn,
        arity_min: u8,
        arity_max: u8,
        params: &'static [ParamInfo],
    ) -> Self {
        Self {
            name,
            function,
            arity_min,
            arity_max,
            params,
        }
    }
}

/// Allocate every native in `specs` and bind it by name in `table`
pub fn define_all(heap: &mut Heap, table: &mut Table, specs: &[NativeSpec]) {
    for spec in specs {
        let native = heap.new_native(
            spec.name,
            spec.function,
            spec.arity_min,
            spec.arity_max,
            spec.params,
        );
        let key = heap.name_key(spec.name);
        table.set(key, Value::Obj(native));
    }
}

/// Bind a plain value by name in `table`
pub(crate) fn define_value(heap: &mut Heap, table: &mut Table, name: &str, value: Value) {
    let key = heap.name_key(name);
    table.set(key, value);
}

/// Create a class whose method table holds `methods` and whose native
/// property table holds `properties`
pub(crate) fn native_class(
    heap: &mut Heap,
    name: &str,
    superclass: Option<ObjRef>,
    methods: &[NativeSpec],
    properties: &[NativeSpec],
) -> ObjRef {
    let name = heap.intern(name);
    let mut method_table = Table::new();
    define_all(heap, &mut method_table, methods);
    let mut property_table = Table::new();
    define_all(heap, &mut property_table, properties);

    let class = heap.new_class(name, superclass);
    if let Obj::Class(class) = heap.get_mut(class) {
        class.methods = method_table;
        class.native_properties = property_table;
    }
    class
}

// ----------------------------------------------------------------------
// Argument extraction
// ----------------------------------------------------------------------

/// A number argument, or a type failure with `message`
pub(crate) fn number(value: Value, message: &str) -> NativeResult<f64> {
    value
        .as_number()
        .ok_or_else(|| NativeError::type_error(message))
}

/// An integral argument, truncated toward zero
pub(crate) fn integer(value: Value, message: &str) -> NativeResult<i64> {
    number(value, message).map(|n| n as i64)
}

/// A copy of a string argument, or a type failure with `message`
pub(crate) fn string(heap: &Heap, value: Value, message: &str) -> NativeResult<String> {
    heap.as_str(value)
        .map(str::to_owned)
        .ok_or_else(|| NativeError::type_error(message))
}

/// A copy of a list argument's elements, or a type failure with `message`
pub(crate) fn list(heap: &Heap, value: Value, message: &str) -> NativeResult<Vec<Value>> {
    heap.as_list(value)
        .map(|list| list.values.clone())
        .ok_or_else(|| NativeError::type_error(message))
}

/// Intern an owned string and wrap it as a value
pub(crate) fn new_string(heap: &mut Heap, chars: String) -> Value {
    Value::Obj(heap.intern_owned(chars))
}

/// Allocate a list value
pub(crate) fn new_list(heap: &mut Heap, values: Vec<Value>) -> Value {
    Value::Obj(heap.new_list(values))
}

/// Resolve a possibly negative index against `len`
pub(crate) fn resolve_index(index: i64, len: usize) -> Option<usize> {
    let len = len as i64;
    let resolved = if index < 0 { index + len } else { index };
    (0..len).contains(&resolved).then_some(resolved as usize)
}
