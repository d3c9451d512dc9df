//! Integration tests for interpreter
//!
//! Whole programs run through compiler, engine, heap and built-ins.

use core_types::ErrorKind;
use interpreter::{InterpretError, SharedBuffer, Vm, VmConfig};

fn run_with(config: VmConfig, source: &str) -> (Vm, String, Result<(), InterpretError>) {
    let out = SharedBuffer::new();
    let mut vm = Vm::with_config(config).with_output(Box::new(out.clone()));
    let result = vm.interpret(source, "main.slo");
    let printed = out.contents();
    (vm, printed, result)
}

fn run(source: &str) -> String {
    let (_, printed, result) = run_with(VmConfig::default(), source);
    if let Err(error) = result {
        panic!("script failed: {}", error.render());
    }
    printed
}

fn fault(source: &str) -> (ErrorKind, String) {
    let (_, _, result) = run_with(VmConfig::default(), source);
    match result {
        Err(InterpretError::Runtime(error)) => (error.kind, error.message),
        other => panic!("expected a runtime fault, got {:?}", other),
    }
}

// ============================================================================
// Globals and closures
// ============================================================================

#[test]
fn test_function_updates_global() {
    let source = "var x = 1; func f() { x = x + 1; return x; } println(f()); println(f());";
    assert_eq!(run(source), "2\n3\n");
}

#[test]
fn test_closures_share_captured_local() {
    let source = r#"
        func make() {
            var n = 0;
            func inc() { n = n + 1; return n; }
            func get() { return n; }
            return [inc, get];
        }
        var pair = make();
        var inc = pair[0];
        var get = pair[1];
        inc();
        inc();
        println(get());
    "#;
    assert_eq!(run(source), "2\n");
}

#[test]
fn test_mutation_visible_while_frame_is_open() {
    let source = r#"
        func outer() {
            var x = 1;
            func set() { x = 10; }
            func read() { return x; }
            set();
            println(read());
            println(x);
        }
        outer();
    "#;
    assert_eq!(run(source), "10\n10\n");
}

#[test]
fn test_each_call_gets_its_own_capture() {
    let source = r#"
        func counter() {
            var count = 0;
            func next() { count = count + 1; return count; }
            return next;
        }
        var a = counter();
        var b = counter();
        a(); a();
        println(a());
        println(b());
    "#;
    assert_eq!(run(source), "3\n1\n");
}

#[test]
fn test_loop_variables_are_captured_per_iteration() {
    let source = r#"
        var fns = [];
        for (x in [1, 2, 3]) {
            func show() { return x; }
            fns.append(show);
        }
        println(fns[0]());
        println(fns[2]());
    "#;
    assert_eq!(run(source), "1\n3\n");
}

#[test]
fn test_recursion() {
    let source = r#"
        func fib(n) {
            if (n < 2) return n;
            return fib(n - 1) + fib(n - 2);
        }
        println(fib(15));
    "#;
    assert_eq!(run(source), "610\n");
}

// ============================================================================
// Operators
// ============================================================================

#[test]
fn test_arithmetic_and_concatenation() {
    let source = r#"
        println(1 + 1 == 2);
        println("a" + "b");
        println([1, 2] + [3]);
        println(2 ** 10);
        println(7 / 2);
    "#;
    assert_eq!(run(source), "true\nab\n[1, 2, 3]\n1024\n3.5\n");
}

#[test]
fn test_modulo_is_ieee_remainder() {
    // The quotient rounds to nearest, so 5 % 3 is -1 rather than 2
    assert_eq!(run("println(5 % 3); println(4 % 3); println(6 % 3);"), "-1\n1\n0\n");
}

#[test]
fn test_arithmetic_type_fault() {
    let (kind, message) = fault("var x = 10 / \"two\";");
    assert_eq!(kind, ErrorKind::Type);
    assert!(message.contains("number"), "{}", message);
}

#[test]
fn test_mismatched_addition() {
    let (kind, message) = fault("1 + \"a\";");
    assert_eq!(kind, ErrorKind::Type);
    assert_eq!(message, "Mismatched types: number and string.");
}

#[test]
fn test_logical_operators_short_circuit() {
    let source = r#"
        var hits = 0;
        func touch() { hits = hits + 1; return true; }
        false and touch();
        true or touch();
        println(hits);
        println(nil or "fallback");
    "#;
    assert_eq!(run(source), "0\nfallback\n");
}

#[test]
fn test_string_interpolation() {
    let source = r#"
        var name = "slo";
        var n = 3;
        println("hi ${name}, ${n + 1} times");
    "#;
    assert_eq!(run(source), "hi slo, 4 times\n");
}

// ============================================================================
// Containers
// ============================================================================

#[test]
fn test_list_indexing() {
    assert_eq!(run("var xs = [1, 2, 3]; println(xs[-1]); println(xs[0]);"), "3\n1\n");
    let (kind, message) = fault("var xs = [1, 2, 3]; xs[3];");
    assert_eq!(kind, ErrorKind::Index);
    assert_eq!(message, "Index out of bounds.");
}

#[test]
fn test_index_assignment() {
    let source = r#"
        var xs = [1, 2, 3];
        xs[1] = 20;
        xs[-1] += 5;
        println(xs);
        var d = {"a": 1};
        d["b"] = 2;
        println(len(d));
        println(d["b"]);
    "#;
    assert_eq!(run(source), "[1, 20, 8]\n2\n2\n");
}

#[test]
fn test_missing_dict_key() {
    let (kind, message) = fault("var d = {\"a\": 1}; d[\"z\"];");
    assert_eq!(kind, ErrorKind::Index);
    assert_eq!(message, "Key not found in dictionary.");
}

#[test]
fn test_slices() {
    let source = r#"
        var xs = [1, 2, 3, 4];
        println(xs[1:3]);
        println(xs[:2]);
        println(xs[-1:]);
        println("hello"[1:]);
        println("hello"[-1]);
    "#;
    assert_eq!(run(source), "[2, 3]\n[1, 2]\n[4]\nello\no\n");
}

#[test]
fn test_slice_bounds_must_be_numbers() {
    let (kind, message) = fault("[1, 2][\"a\":];");
    assert_eq!(kind, ErrorKind::Type);
    assert_eq!(message, "Slice bounds must be numbers.");
}

#[test]
fn test_membership() {
    let source = r#"
        println([1, [2]] has [2]);
        println("abc" has "b");
        println({"a": 1} has "a");
        println([1] has not 1);
    "#;
    assert_eq!(run(source), "true\ntrue\ntrue\nfalse\n");
    let (kind, _) = fault("\"abc\" has 1;");
    assert_eq!(kind, ErrorKind::Type);
}

#[test]
fn test_for_in_over_list_and_string() {
    let source = r#"
        var total = 0;
        for (x in [1, 2, 3]) { total += x; }
        println(total);
        var letters = "";
        for (c in "abc") { letters = c + letters; }
        println(letters);
    "#;
    assert_eq!(run(source), "6\ncba\n");
}

#[test]
fn test_builtin_methods() {
    let source = r#"
        var xs = [1, 2];
        xs.append(3);
        println(len(xs));
        println("Hello".upper());
        var d = {"k": "v"};
        println(d.get("k"));
    "#;
    assert_eq!(run(source), "3\nHELLO\nv\n");
}

#[test]
fn test_undefined_builtin_method() {
    let (kind, message) = fault("[1].frobnicate();");
    assert_eq!(kind, ErrorKind::Attribute);
    assert_eq!(message, "Undefined method 'frobnicate' for list.");
}

#[test]
fn test_enum_members_are_ordinals() {
    let source = "enum Color { RED, GREEN, BLUE } println(Color.RED); println(Color.BLUE);";
    assert_eq!(run(source), "0\n2\n");
}

// ============================================================================
// Classes
// ============================================================================

const ANIMALS: &str = r#"
    class Animal {
        func __init__(name) { self.name = name; }
        func speak() { return self.name + " makes a sound"; }
        func kind() { return "animal"; }
    }
    class Dog extends Animal {
        func speak() { return self.name + " barks"; }
        func base() { return super.speak(); }
    }
"#;

#[test]
fn test_inherited_and_overridden_methods() {
    let source = format!(
        "{}\nvar d = Dog(\"Rex\"); println(d.speak()); println(d.kind()); println(d.base());",
        ANIMALS
    );
    assert_eq!(run(&source), "Rex barks\nanimal\nRex makes a sound\n");
}

#[test]
fn test_bound_method_keeps_receiver() {
    let source = format!("{}\nvar f = Dog(\"Rex\").speak; println(f());", ANIMALS);
    assert_eq!(run(&source), "Rex barks\n");
}

#[test]
fn test_field_shadows_method() {
    let source = format!(
        "{}\nfunc loud() {{ return \"LOUD\"; }}\nvar d = Dog(\"Rex\"); d.speak = loud; println(d.speak());",
        ANIMALS
    );
    assert_eq!(run(&source), "LOUD\n");
}

#[test]
fn test_undefined_method_names_it() {
    let source = format!("{}\nDog(\"Rex\").fly();", ANIMALS);
    let (kind, message) = fault(&source);
    assert_eq!(kind, ErrorKind::Attribute);
    assert!(message.contains("fly"), "{}", message);
}

#[test]
fn test_undefined_property() {
    let source = format!("{}\nDog(\"Rex\").age;", ANIMALS);
    let (kind, message) = fault(&source);
    assert_eq!(kind, ErrorKind::Attribute);
    assert_eq!(message, "Undefined property 'age'.");
}

#[test]
fn test_fields_only_on_instances() {
    let (kind, message) = fault("var x = 1; x.y = 2;");
    assert_eq!(kind, ErrorKind::Attribute);
    assert_eq!(message, "Only instances have fields.");
    let (kind, message) = fault("true.y;");
    assert_eq!(kind, ErrorKind::Attribute);
    assert_eq!(message, "Only instances have properties.");
}

#[test]
fn test_class_without_initializer_rejects_arguments() {
    let (kind, _) = fault("class Empty {} Empty(1);");
    assert_eq!(kind, ErrorKind::Type);
    assert_eq!(run("class Empty {} println(Empty());"), "Empty instance\n");
}

#[test]
fn test_superclass_must_be_class() {
    let (kind, message) = fault("var NotAClass = 1; class C extends NotAClass {}");
    assert_eq!(kind, ErrorKind::Type);
    assert_eq!(message, "Superclass must be a class.");
}

#[test]
fn test_later_base_methods_are_not_inherited() {
    // Inheritance copies the method table when the subclass is created
    let source = r#"
        class Base { func a() { return 1; } }
        class Derived extends Base {}
        println(Derived().a());
    "#;
    assert_eq!(run(source), "1\n");
}

// ============================================================================
// Faults and control
// ============================================================================

#[test]
fn test_unbounded_recursion_overflows() {
    let (vm, _, result) = run_with(
        VmConfig::default(),
        "func down(n) { return down(n + 1); } down(0);",
    );
    let error = result.unwrap_err();
    let error = error.as_runtime().expect("runtime fault");
    assert_eq!(error.kind, ErrorKind::Runtime);
    assert_eq!(error.message, "Stack overflow.");
    assert!(error.stack.len() > 100);
    assert_eq!(vm.frame_count(), 0);
    assert_eq!(vm.stack_depth(), 0);
}

#[test]
fn test_wrong_arity() {
    let (kind, message) = fault("func f(a, b) {} f(1);");
    assert_eq!(kind, ErrorKind::Type);
    assert!(message.contains("expected 2 arguments but got 1"), "{}", message);
}

#[test]
fn test_calling_a_number() {
    let (kind, _) = fault("var x = 1; x();");
    assert_eq!(kind, ErrorKind::Type);
}

#[test]
fn test_undefined_variable() {
    let (kind, message) = fault("println(nope);");
    assert_eq!(kind, ErrorKind::Name);
    assert_eq!(message, "Undefined variable 'nope'.");
    let (kind, _) = fault("nope = 1;");
    assert_eq!(kind, ErrorKind::Name);
}

#[test]
fn test_final_globals() {
    let (kind, message) = fault("final limit = 1; limit = 2;");
    assert_eq!(kind, ErrorKind::Name);
    assert_eq!(message, "Cannot reassign final variable 'limit'.");
    assert_eq!(run("final limit = 3; println(limit);"), "3\n");
}

#[test]
fn test_assert() {
    assert_eq!(run("assert 1 == 1; println(\"ok\");"), "ok\n");
    let (kind, message) = fault("assert 1 == 2;");
    assert_eq!(kind, ErrorKind::Assertion);
    assert_eq!(message, "Assertion failed.");
    let (_, message) = fault("assert false, \"custom ${1 + 1}\";");
    assert_eq!(message, "custom 2");
}

#[test]
fn test_exit_stops_execution() {
    let (_, printed, result) = run_with(VmConfig::default(), "println(1); exit(3); println(2);");
    assert_eq!(printed, "1\n");
    assert!(matches!(result, Err(InterpretError::Exit(3))));
}

#[test]
fn test_native_failure_becomes_fault() {
    let (kind, _) = fault("[1, 2].remove(9);");
    assert_eq!(kind, ErrorKind::Index);
}

// ============================================================================
// Modules
// ============================================================================

#[test]
fn test_import_binds_module() {
    assert_eq!(run("import math; println(math.floor(2.7));"), "2\n");
}

#[test]
fn test_import_as_binds_only_alias() {
    assert_eq!(run("import math as m; println(m.sqrt(16));"), "4\n");
    let (kind, _) = fault("import math as m; math.sqrt(4);");
    assert_eq!(kind, ErrorKind::Name);
}

#[test]
fn test_unknown_module() {
    let (kind, message) = fault("import nowhere;");
    assert_eq!(kind, ErrorKind::Import);
    assert_eq!(message, "Failed to import module 'nowhere'.");
}

#[test]
fn test_missing_export() {
    let (kind, _) = fault("import math; math.nothing();");
    assert_eq!(kind, ErrorKind::Attribute);
}

// ============================================================================
// Collector
// ============================================================================

const CHURN: &str = r#"
    func keeper() {
        var data = [1, 2, 3];
        func get() { return data; }
        return get;
    }
    var g = keeper();
    var table = {"nested": [4, 5]};
    gc();
    var junk = [];
    for (var i = 0; i < 200; i += 1) { junk = [i, "s${i}"]; }
    gc();
    println(g());
    println(table["nested"]);
    println(junk);
"#;

#[test]
fn test_values_survive_explicit_collection() {
    let (vm, printed, result) = run_with(VmConfig::default(), CHURN);
    assert!(result.is_ok(), "{:?}", result);
    assert_eq!(printed, "[1, 2, 3]\n[4, 5]\n[199, s199]\n");
    assert!(vm.heap_stats().collections >= 2);
}

#[test]
fn test_stress_collection_preserves_results() {
    let config = VmConfig {
        stress_gc: true,
        ..VmConfig::default()
    };
    let (vm, printed, result) = run_with(config, CHURN);
    assert!(result.is_ok(), "{:?}", result);
    assert_eq!(printed, "[1, 2, 3]\n[4, 5]\n[199, s199]\n");
    assert!(vm.heap_stats().collections > 100);
}

#[test]
fn test_stress_collection_with_classes() {
    let config = VmConfig {
        stress_gc: true,
        ..VmConfig::default()
    };
    let source = format!(
        "{}\nvar dogs = []; for (var i = 0; i < 20; i += 1) {{ dogs.append(Dog(\"d${{i}}\")); }}\nprintln(dogs[19].speak());",
        ANIMALS
    );
    let (_, printed, result) = run_with(config, &source);
    assert!(result.is_ok(), "{:?}", result);
    assert_eq!(printed, "d19 barks\n");
}

#[test]
fn test_small_threshold_grows() {
    let config = VmConfig {
        initial_gc_threshold: 1024,
        ..VmConfig::default()
    };
    let (vm, _, result) = run_with(
        config,
        "var keep = []; for (var i = 0; i < 500; i += 1) { keep.append([i]); }",
    );
    assert!(result.is_ok());
    let stats = vm.heap_stats();
    assert!(stats.collections >= 1);
    assert!(stats.next_gc > 1024);
}

#[test]
fn test_discarded_growth_triggers_collection() {
    let source = r#"
        for (var i = 0; i < 200; i += 1) {
            var t = [];
            for (var j = 0; j < 1000; j += 1) { t.append(j); }
        }
    "#;
    let (vm, _, result) = run_with(VmConfig::default(), source);
    assert!(result.is_ok(), "{:?}", result);
    let stats = vm.heap_stats();
    assert!(stats.collections > 0);
    assert!(stats.bytes_allocated <= stats.next_gc);
}

#[test]
fn test_growth_through_fields_and_indexing_is_charged() {
    let config = VmConfig {
        initial_gc_threshold: 64 * 1024,
        ..VmConfig::default()
    };
    let source = r#"
        class Bag {}
        for (var i = 0; i < 40; i += 1) {
            var d = {};
            var b = Bag();
            for (var j = 0; j < 200; j += 1) { d[j] = j; }
            b.items = d;
        }
    "#;
    let (vm, _, result) = run_with(config, source);
    assert!(result.is_ok(), "{:?}", result);
    assert!(vm.heap_stats().collections > 0);
}

// ============================================================================
// Self-referencing and deeply nested values
// ============================================================================

#[test]
fn test_self_referencing_list_equality() {
    let source = r#"
        var a = [];
        a.append(a);
        var b = [];
        b.append(b);
        println(a == b);
        println(a != b);
        println(a == a);
        println(a has a);
        println(a.count(b));
    "#;
    assert_eq!(run(source), "false\ntrue\ntrue\ntrue\n0\n");
}

#[test]
fn test_deeply_nested_list_equality() {
    let source = r#"
        var x = 0;
        var y = 0;
        for (var i = 0; i < 50000; i += 1) { x = [x]; y = [y]; }
        println(x == y);
        var p = [[[1, [2]]]];
        var q = [[[1, [2]]]];
        println(p == q);
    "#;
    assert_eq!(run(source), "false\ntrue\n");
}

#[test]
fn test_deeply_nested_source_is_a_compile_error() {
    let source = format!("var x = {}1{};", "(".repeat(50_000), ")".repeat(50_000));
    let (_, printed, result) = run_with(VmConfig::default(), &source);
    match result {
        Err(InterpretError::Compile(errors)) => {
            assert_eq!(errors.errors[0].kind, ErrorKind::Syntax);
            assert_eq!(errors.errors[0].message, "Expression nested too deeply.");
        }
        other => panic!("expected compile errors, got {:?}", other),
    }
    assert_eq!(printed, "");
}
