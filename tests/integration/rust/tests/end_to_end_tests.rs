//! End-to-End Tests
//!
//! Complete slo programs run from source, checking the printed output.

use core_types::ErrorKind;
use integration_tests::{run_ok, run_with};
use interpreter::VmConfig;

/// Test: A function assigning a global sees its own updates
#[test]
fn test_function_over_global() {
    let source = "var x = 1; func f() { x = x + 1; return x; } println(f()); println(f());";
    assert_eq!(run_ok(source), "2\n3\n");
}

/// Test: Sibling closures share one captured variable
#[test]
fn test_sibling_closures_share_state() {
    let source = r#"
        func pair() {
            var count = 0;
            func inc() { count += 1; return count; }
            func get() { return count; }
            inc();
            println(get());
            return [inc, get];
        }
        var fns = pair();
        var inc = fns[0];
        var get = fns[1];
        inc();
        inc();
        println(get());
    "#;
    assert_eq!(run_ok(source), "1\n3\n");
}

/// Test: Separate calls produce independent captured variables
#[test]
fn test_counters_are_independent() {
    let source = r#"
        func counter() {
            var n = 0;
            func next() { n += 1; return n; }
            return next;
        }
        var a = counter();
        var b = counter();
        a(); a(); a();
        println(a());
        println(b());
    "#;
    assert_eq!(run_ok(source), "4\n1\n");
}

/// Test: Arithmetic identities from the language definition
#[test]
fn test_arithmetic_identities() {
    let source = r#"
        println(1 + 1 == 2);
        println("a" + "b" == "ab");
        println([1, 2] + [3] == [1, 2, 3]);
        println(5 % 3);
        println([10, 20, 30][-1]);
    "#;
    assert_eq!(run_ok(source), "true\ntrue\ntrue\n-1\n30\n");
}

/// Test: Faults named by the arithmetic and indexing rules
#[test]
fn test_arithmetic_faults() {
    let kind = |source: &str| {
        run_with(VmConfig::default(), source)
            .result
            .err()
            .and_then(|e| e.as_runtime().map(|e| e.kind))
    };
    assert_eq!(kind("println(1 / \"2\");"), Some(ErrorKind::Type));
    assert_eq!(kind("println([1, 2, 3][3]);"), Some(ErrorKind::Index));
}

/// Test: Inherited, overridden and missing methods
#[test]
fn test_inheritance_resolution() {
    let source = r#"
        class Shape {
            func __init__(name) { self.name = name; }
            func area() { return 0; }
            func describe() { return "${self.name} with area ${self.area()}"; }
        }
        class Square extends Shape {
            func __init__(side) { super.__init__("square"); self.side = side; }
            func area() { return self.side * self.side; }
        }
        class Blob extends Shape {}
        println(Square(3).describe());
        println(Blob("blob").describe());
    "#;
    assert_eq!(run_ok(source), "square with area 9\nblob with area 0\n");

    let run = run_with(
        VmConfig::default(),
        "class Base {} class Child extends Base {} Child().fly();",
    );
    let error = run.result.unwrap_err();
    let fault = error.as_runtime().unwrap();
    assert_eq!(fault.kind, ErrorKind::Attribute);
    assert!(fault.message.contains("fly"));
}

/// Test: Unbounded recursion ends in a reported stack overflow
#[test]
fn test_unbounded_recursion() {
    let run = run_with(VmConfig::default(), "func forever(n) { return forever(n + 1); } forever(0);");
    let error = run.result.unwrap_err();
    let fault = error.as_runtime().unwrap();
    assert_eq!(fault.kind, ErrorKind::Runtime);
    assert_eq!(fault.message, "Stack overflow.");
    assert!(!fault.stack.is_empty());
}

/// Test: Word frequency with dicts, splitting and sorting
#[test]
fn test_word_frequency() {
    let source = r#"
        var text = "the cat and the hat and the bat";
        var counts = {};
        for (word in text.split(" ")) {
            if (counts has word) counts[word] += 1;
            else counts[word] = 1;
        }
        var words = counts.keys();
        words.sort();
        for (w in words) println("${w}: ${counts[w]}");
    "#;
    assert_eq!(
        run_ok(source),
        "and: 2\nbat: 1\ncat: 1\nhat: 1\nthe: 3\n"
    );
}

/// Test: Memoized recursion through a global dict
#[test]
fn test_memoized_fibonacci() {
    let source = r#"
        var memo = {};
        func fib(n) {
            if (n < 2) return n;
            if (memo has n) return memo[n];
            var value = fib(n - 1) + fib(n - 2);
            memo[n] = value;
            return value;
        }
        println(fib(60));
    "#;
    assert_eq!(run_ok(source), "1548008755920\n");
}

/// Test: A hand-written insertion sort over a list
#[test]
fn test_insertion_sort() {
    let source = r#"
        func insertion_sort(xs) {
            for (var i = 1; i < len(xs); i += 1) {
                var key = xs[i];
                var j = i - 1;
                while (j >= 0 and xs[j] > key) {
                    xs[j + 1] = xs[j];
                    j -= 1;
                }
                xs[j + 1] = key;
            }
            return xs;
        }
        println(insertion_sort([5, 2, 9, 1, 5, 6]));
    "#;
    assert_eq!(run_ok(source), "[1, 2, 5, 5, 6, 9]\n");
}

/// Test: A stack class built on a list, with a bound method passed around
#[test]
fn test_stack_class_and_bound_methods() {
    let source = r#"
        class Stack {
            func __init__() { self.items = []; }
            func push(x) { self.items.append(x); }
            func pop() { return self.items.pop(); }
            func size() { return len(self.items); }
        }
        var s = Stack();
        var push = s.push;
        for (i in [1, 2, 3]) push(i * 10);
        println(s.size());
        println(s.pop());
        println(s.items);
    "#;
    assert_eq!(run_ok(source), "3\n30\n[10, 20]\n");
}

/// Test: Enums, slices and string slicing in one program
#[test]
fn test_enums_and_slices() {
    let source = r#"
        enum Level { Low, Mid, High }
        var names = ["low", "mid", "high"];
        println(names[Level.Mid]);
        println(names[1:]);
        println(names[:1]);
        println("sloth"[0:3]);
        println(Level.High > Level.Low);
    "#;
    assert_eq!(run_ok(source), "mid\n[mid, high]\n[low]\nslo\ntrue\n");
}

/// Test: Final globals reject reassignment at runtime
#[test]
fn test_final_global() {
    let run = run_with(VmConfig::default(), "final limit = 3; limit = 4;");
    let error = run.result.unwrap_err();
    let fault = error.as_runtime().unwrap();
    assert_eq!(fault.kind, ErrorKind::Name);
    assert_eq!(fault.message, "Cannot reassign final variable 'limit'.");
}

/// Test: A long-running allocation-heavy program under stress collection
#[test]
fn test_allocation_heavy_program_under_stress() {
    let source = r#"
        class Pair { func __init__(a, b) { self.a = a; self.b = b; } }
        var pairs = [];
        for (var i = 0; i < 60; i += 1) {
            pairs.append(Pair("k${i}", [i, i * i]));
        }
        var sum = 0;
        for (p in pairs) sum += p.b[1];
        println(sum);
        println(pairs[59].a);
    "#;
    let config = VmConfig {
        stress_gc: true,
        ..VmConfig::default()
    };
    let run = run_with(config, source);
    assert!(run.result.is_ok(), "{:?}", run.result);
    assert_eq!(run.output, "70210\nk59\n");
}
