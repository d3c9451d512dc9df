//! Memory Manager and Interpreter Integration Tests
//!
//! Tests the integration between memory_manager and interpreter components.
//! Verifies that the engine's roots keep live objects through collections
//! and that unreachable objects are reclaimed.

use core_types::Value;
use integration_tests::{run_ok, run_with};
use interpreter::{SharedBuffer, Vm, VmConfig};
use memory_manager::{Heap, Table};
use proptest::prelude::*;

fn stress() -> VmConfig {
    VmConfig {
        stress_gc: true,
        ..VmConfig::default()
    }
}

/// Test: An object reachable only through a closed upvalue survives
#[test]
fn test_upvalue_only_object_survives() {
    let source = r#"
        func hold() {
            var secret = {"k": [1, 2, 3]};
            func peek() { return secret["k"]; }
            return peek;
        }
        var peek = hold();
        gc();
        var noise = [];
        for (var i = 0; i < 100; i += 1) { noise = [i]; }
        gc();
        println(peek());
    "#;
    assert_eq!(run_ok(source), "[1, 2, 3]\n");
}

/// Test: Elements of reachable containers survive
#[test]
fn test_container_elements_survive() {
    let source = r#"
        var outer = [[1], {"inner": [2]}];
        gc();
        println(outer[0]);
        println(outer[1]["inner"]);
    "#;
    assert_eq!(run_ok(source), "[1]\n[2]\n");
}

/// Test: Unreachable objects are freed within one cycle and never twice
#[test]
fn test_unreachable_freed_once() {
    let mut vm = Vm::new();
    vm.interpret("var temp = [[1], [2], [3]]; temp = nil;", "test.slo")
        .unwrap();

    let first = vm.collect_garbage();
    assert!(first.freed_objects >= 4);
    let second = vm.collect_garbage();
    assert_eq!(second.freed_objects, 0);
    assert_eq!(second.bytes_after, first.bytes_after);
}

/// Test: Stress collection runs every program identically
#[test]
fn test_stress_matches_normal_run() {
    let source = r#"
        class Node {
            func __init__(value, next) { self.value = value; self.next = next; }
        }
        var head = nil;
        for (var i = 0; i < 30; i += 1) { head = Node(i, head); }
        var total = 0;
        var walk = head;
        while (walk != nil) { total += walk.value; walk = walk.next; }
        println(total);
        var words = "a,b,c".split(",");
        println(words);
        println("${words[0]}-${len(words)}");
    "#;
    let normal = run_with(VmConfig::default(), source);
    let stressed = run_with(stress(), source);

    assert!(normal.result.is_ok(), "{:?}", normal.result);
    assert!(stressed.result.is_ok(), "{:?}", stressed.result);
    assert_eq!(normal.output, "435\n[a, b, c]\na-3\n");
    assert_eq!(stressed.output, normal.output);
}

/// Test: Cycles between instances are collected once unreachable
#[test]
fn test_cycles_are_collected() {
    let mut vm = Vm::new();
    vm.interpret(
        "class P {} var a = P(); var b = P(); a.other = b; b.other = a; a = nil; b = nil;",
        "test.slo",
    )
    .unwrap();
    let live_before = vm.heap_stats().live_objects;
    let report = vm.collect_garbage();

    assert!(report.freed_objects >= 2);
    assert!(vm.heap_stats().live_objects < live_before);
}

/// Test: Interned strings are shared between scripts and the host
#[test]
fn test_interning_across_boundary() {
    let out = SharedBuffer::new();
    let mut vm = Vm::new().with_output(Box::new(out.clone()));
    let host = vm.heap_mut().string_value("shared");
    vm.set_global("fromHost", host);
    vm.interpret("var fromScript = \"sha\" + \"red\"; println(fromHost == fromScript);", "test.slo")
        .unwrap();

    assert_eq!(out.contents(), "true\n");
    assert_eq!(vm.global("fromScript"), Some(host));
}

/// Test: Heap statistics move with allocation and collection
#[test]
fn test_heap_stats_track_allocation() {
    let mut vm = Vm::new();
    let before = vm.heap_stats();
    vm.interpret("var big = []; for (var i = 0; i < 200; i += 1) { big.append([i]); }", "test.slo")
        .unwrap();
    let after = vm.heap_stats();

    assert!(after.bytes_allocated > before.bytes_allocated);
    assert!(after.live_objects >= before.live_objects + 200);
}

proptest! {
    /// Set, delete and reinsert under colliding hashes never loses keys
    #[test]
    fn prop_table_reinsert_after_delete(ops in proptest::collection::vec((0u8..24, any::<bool>()), 1..200)) {
        let mut heap = Heap::new();
        let mut table = Table::new();
        let mut model = std::collections::HashMap::new();
        let keys: Vec<_> = (0..24).map(|i| heap.name_key(&format!("k{}", i % 24))).collect();

        for (step, (slot, insert)) in ops.into_iter().enumerate() {
            let key = keys[slot as usize];
            if insert {
                table.set(key, Value::Number(step as f64));
                model.insert(slot, step as f64);
            } else {
                table.delete(key);
                model.remove(&slot);
            }
        }
        for (slot, key) in keys.iter().enumerate() {
            let expected = model.get(&(slot as u8)).map(|n| Value::Number(*n));
            prop_assert_eq!(table.get(*key), expected);
        }
        prop_assert_eq!(table.len(), model.len());
    }
}
