//! Contract tests for the memory_manager public API
//!
//! These pin the guarantees the execution engine relies on.

use core_types::Value;
use memory_manager::{Heap, Table, INIT_METHOD_NAME};

#[test]
fn contract_table_set_reports_new_keys() {
    let mut heap = Heap::new();
    let mut table = Table::new();
    let key = heap.name_key("x");
    assert!(table.set(key, Value::Nil));
    assert!(!table.set(key, Value::Bool(true)));
}

#[test]
fn contract_get_after_set_returns_value() {
    let mut heap = Heap::new();
    let mut table = Table::new();
    let key = heap.key(Value::Number(7.0)).unwrap();
    table.set(key, Value::Number(49.0));
    assert_eq!(table.get(key), Some(Value::Number(49.0)));
}

#[test]
fn contract_interned_strings_share_identity() {
    let mut heap = Heap::new();
    let a = heap.string_value("same");
    let b = heap.string_value("same");
    assert_eq!(a, b);
}

#[test]
fn contract_init_string_survives_collection() {
    let mut heap = Heap::new();
    heap.collect_garbage();
    let init = heap.init_string();
    assert_eq!(heap.as_str(Value::Obj(init)), Some(INIT_METHOD_NAME));
}

#[test]
fn contract_builtin_classes_are_roots() {
    let mut heap = Heap::new();
    let name = heap.intern("list");
    let class = heap.new_class(name, None);
    heap.classes.list = Some(class);
    heap.collect_garbage();
    assert!(heap.contains(class));
    let list = heap.new_list(Vec::new());
    assert_eq!(heap.as_list(Value::Obj(list)).unwrap().class, Some(class));
}

#[test]
fn contract_unreachable_object_freed_once() {
    let mut heap = Heap::new();
    heap.new_list(Vec::new());
    let first = heap.collect_garbage();
    let second = heap.collect_garbage();
    assert_eq!(first.freed_objects, 1);
    assert_eq!(second.freed_objects, 0);
}
