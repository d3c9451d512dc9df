//! Unit tests for natives reached through their registered tables

use builtins::{define_globals, load_module, register_classes};
use core_types::{ErrorKind, ObjRef, Value};
use memory_manager::{Heap, NativeContext, Obj, Table};

struct Env {
    heap: Heap,
    globals: Table,
    out: Vec<u8>,
    random_state: u64,
}

impl Env {
    fn new() -> Self {
        let mut heap = Heap::new();
        register_classes(&mut heap);
        let mut globals = Table::new();
        define_globals(&mut heap, &mut globals);
        Self {
            heap,
            globals,
            out: Vec::new(),
            random_state: 7,
        }
    }

    fn lookup(&mut self, table: &Table, name: &str) -> ObjRef {
        let key = self.heap.name_key(name);
        table
            .get(key)
            .and_then(|v| v.as_obj())
            .unwrap_or_else(|| panic!("{} is not bound", name))
    }

    fn invoke(&mut self, native: ObjRef, args: &[Value]) -> Value {
        let function = match self.heap.get(native) {
            Obj::Native(n) => {
                n.check_arity(args.len()).unwrap();
                n.function
            }
            other => panic!("expected native, got {:?}", other),
        };
        let mut ctx = NativeContext {
            heap: &mut self.heap,
            out: &mut self.out,
            random_state: &mut self.random_state,
            exit_code: None,
        };
        function(&mut ctx, args)
    }

    fn global(&mut self, name: &str, args: &[Value]) -> Value {
        let globals = std::mem::take(&mut self.globals);
        let native = self.lookup(&globals, name);
        self.globals = globals;
        self.invoke(native, args)
    }

    fn method(&mut self, class: Option<ObjRef>, name: &str, args: &[Value]) -> Value {
        let class = class.unwrap();
        let methods = match self.heap.get(class) {
            Obj::Class(c) => c.methods.clone(),
            _ => unreachable!(),
        };
        let native = self.lookup(&methods, name);
        self.invoke(native, args)
    }

    fn module(&mut self, module: &str, name: &str, args: &[Value]) -> Value {
        let module = load_module(&mut self.heap, module).unwrap();
        let exports = match self.heap.get(module) {
            Obj::Module(m) => m.exports.clone(),
            _ => unreachable!(),
        };
        let native = self.lookup(&exports, name);
        self.invoke(native, args)
    }
}

#[test]
fn test_print_concatenates_without_separator() {
    let mut env = Env::new();
    let a = env.heap.string_value("a");
    env.global("print", &[a, Value::Number(1.0), Value::Nil]);
    env.global("println", &[]);
    assert_eq!(String::from_utf8(env.out.clone()).unwrap(), "a1nil\n");
}

#[test]
fn test_type_names() {
    let mut env = Env::new();
    let list = Value::Obj(env.heap.new_list(Vec::new()));
    let cases = [
        (Value::Nil, "nil"),
        (Value::Bool(true), "bool"),
        (Value::Number(1.0), "number"),
        (list, "list"),
    ];
    for (value, expected) in cases {
        let name = env.global("type", &[value]);
        assert_eq!(env.heap.as_str(name), Some(expected));
    }
}

#[test]
fn test_clock_is_monotonic() {
    let mut env = Env::new();
    let a = env.global("clock", &[]).as_number().unwrap();
    let b = env.global("clock", &[]).as_number().unwrap();
    assert!(b >= a);
    assert!(env.global("time", &[]).as_number().unwrap() > 1.0e9);
}

#[test]
fn test_list_methods_through_class() {
    let mut env = Env::new();
    let list = Value::Obj(env.heap.new_list(Vec::new()));
    let class = env.heap.classes.list;
    env.method(class, "append", &[list, Value::Number(2.0)]);
    env.method(class, "append", &[list, Value::Number(1.0)]);
    env.method(class, "sort", &[list]);
    assert_eq!(env.heap.display(list), "[1, 2]");
}

#[test]
fn test_container_methods_are_inherited_by_lookup_chain() {
    let mut env = Env::new();
    let list = Value::Obj(env.heap.new_list(vec![Value::Number(1.0)]));
    let container = env.heap.classes.container;
    let popped = env.method(container, "pop", &[list]);
    assert_eq!(popped, Value::Number(1.0));
}

#[test]
fn test_string_methods_through_class() {
    let mut env = Env::new();
    let s = env.heap.string_value("a b");
    let class = env.heap.classes.string;
    let upper = env.method(class, "upper", &[s]);
    assert_eq!(env.heap.as_str(upper), Some("A B"));
}

#[test]
fn test_math_module() {
    let mut env = Env::new();
    let r = env.module("math", "floor", &[Value::Number(2.7)]);
    assert_eq!(r, Value::Number(2.0));
}

#[test]
fn test_json_module_round_trip_text() {
    let mut env = Env::new();
    let text = env.heap.string_value(r#"{"k":[1,2]}"#);
    let value = env.module("json", "loads", &[text]);
    let back = env.module("json", "dumps", &[value]);
    assert_eq!(env.heap.as_str(back), Some(r#"{"k":[1,2]}"#));
}

#[test]
fn test_natives_report_kinds_as_error_values() {
    let mut env = Env::new();
    let err = env.global("len", &[Value::Nil]);
    let error = env.heap.as_error(err).unwrap();
    assert_eq!(error.kind, ErrorKind::Type);
    assert_eq!(
        error.message,
        "len() expects a single argument of type string, list, or dict."
    );
}

#[test]
fn test_file_class_exposes_properties() {
    let mut env = Env::new();
    let file = env.heap.classes.file.unwrap();
    let mode = env.heap.name_key("mode");
    match env.heap.get(file) {
        Obj::Class(c) => assert!(c.native_properties.contains(mode)),
        _ => unreachable!(),
    }
}
