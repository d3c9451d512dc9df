//! Full Pipeline Integration Tests
//!
//! Source text through lexer, compiler, engine and fault reporting.

use core_types::ErrorKind;
use integration_tests::{run_ok, run_with};
use interpreter::{InterpretError, VmConfig};

/// Test: A runtime fault renders header, excerpt, caret and stack trace
#[test]
fn test_runtime_fault_report() {
    let source = "var x = 1;\nfunc bad() {\n  return x - \"a\";\n}\nbad();\n";
    let run = run_with(VmConfig::default(), source);
    let error = run.result.unwrap_err();
    let report = error.render();

    let lines: Vec<&str> = report.lines().collect();
    assert!(lines[0].starts_with("[TypeException] Operands must be numbers"));
    assert!(lines[0].contains("at test.slo:3:"));
    assert_eq!(lines[1], "    3 |   return x - \"a\";");
    assert!(lines[2].trim_end().ends_with('^'));
    assert_eq!(lines[3], "Stack trace:");
    assert!(lines[4].starts_with("  at bad (test.slo:3:"));
    assert!(lines[5].starts_with("  at <script> (test.slo:5:"));
}

/// Test: Compile errors render every collected error
#[test]
fn test_compile_error_report() {
    let run = run_with(VmConfig::default(), "var = 1;\nvar y = ;\n");
    let Err(InterpretError::Compile(errors)) = run.result else {
        panic!("expected compile errors");
    };
    let report = errors.render();

    assert_eq!(report.matches("[SyntaxException]").count(), errors.errors.len());
    assert!(report.contains("test.slo:1"));
    assert!(report.contains("test.slo:2"));
    assert_eq!(run.output, "");
}

/// Test: Control flow statements work together
#[test]
fn test_control_flow() {
    let source = r#"
        var out = [];
        for (var i = 0; i < 10; i += 1) {
            if (i == 2) continue;
            if (i == 6) break;
            if (i % 2 == 0) { out.append("even"); }
            elif (i == 5) { out.append("five"); }
            else { out.append(i); }
        }
        println(out);
        var n = 0;
        while (true) { n++; if (n >= 3) break; }
        println(n);
    "#;
    assert_eq!(run_ok(source), "[even, 1, 3, even, five]\n3\n");
}

/// Test: Compound assignment on globals, fields, elements and locals
#[test]
fn test_compound_assignment_targets() {
    let source = r#"
        var g = 1;
        g += 2;
        g *= 3;
        class Box { func __init__() { self.v = 10; } }
        var b = Box();
        b.v -= 4;
        b.v += 1;
        var xs = [1, 2];
        xs[0] /= 2;
        func local() { var l = 5; l--; return l; }
        println(g);
        println(b.v);
        println(xs[0]);
        println(local());
    "#;
    assert_eq!(run_ok(source), "9\n7\n0.5\n4\n");
}

/// Test: Deep but bounded recursion stays within the frame limit
#[test]
fn test_recursion_below_limit() {
    let source = "func depth(n) { if (n == 0) return 0; return 1 + depth(n - 1); } println(depth(200));";
    assert_eq!(run_ok(source), "200\n");
}

/// Test: Runtime fault kinds surface through the pipeline
#[test]
fn test_fault_kinds() {
    let cases = [
        ("undefinedThing;", ErrorKind::Name),
        ("[1][5];", ErrorKind::Index),
        ("nil.x;", ErrorKind::Attribute),
        ("-true;", ErrorKind::Type),
        ("import missing;", ErrorKind::Import),
        ("assert false;", ErrorKind::Assertion),
        ("func r() { return r(); } r();", ErrorKind::Runtime),
    ];
    for (source, kind) in cases {
        let run = run_with(VmConfig::default(), source);
        let error = run.result.unwrap_err();
        assert_eq!(
            error.as_runtime().map(|e| e.kind),
            Some(kind),
            "wrong kind for {:?}",
            source
        );
    }
}

/// Test: Method calls on every receiver kind
#[test]
fn test_receiver_kinds() {
    let source = r#"
        import math;
        enum Dir { N, E }
        class K { func hi() { return "k"; } }
        println("abc".upper());
        println([3, 1, 2].count(1));
        println({"a": 1}.keys());
        println(math.ceil(1.2));
        println(K().hi());
        println(Dir.E);
    "#;
    assert_eq!(run_ok(source), "ABC\n1\n[a]\n2\nk\n1\n");
}
