//! Unit tests for the slo lexer and compiler

use bytecode_system::{disassemble_chunk, OpCode};
use core_types::{ErrorKind, ObjRef, SourcePosition, Value};
use memory_manager::Heap;
use parser::{compile, Keyword, Lexer, Punctuator, Token};
use proptest::prelude::*;

fn lex(source: &str) -> Vec<Token> {
    let mut lexer = Lexer::new(source);
    let mut tokens = Vec::new();
    loop {
        let token = lexer.next_token().unwrap().token;
        if token == Token::EOF {
            return tokens;
        }
        tokens.push(token);
    }
}

fn ops(source: &str) -> Vec<OpCode> {
    let mut heap = Heap::new();
    let script = compile(&mut heap, source, "unit.slo").unwrap();
    heap.as_function(script).unwrap().chunk.code.clone()
}

fn messages(source: &str) -> Vec<String> {
    let mut heap = Heap::new();
    compile(&mut heap, source, "unit.slo")
        .unwrap_err()
        .errors
        .into_iter()
        .map(|e| e.message)
        .collect()
}

fn nested_functions(heap: &Heap, function: ObjRef) -> Vec<ObjRef> {
    heap.as_function(function)
        .unwrap()
        .chunk
        .constants
        .iter()
        .filter_map(|c| c.as_obj())
        .filter(|r| heap.as_function(*r).is_some())
        .collect()
}

// ============================================================================
// Lexer Tests
// ============================================================================

#[test]
fn test_lex_operators() {
    assert_eq!(
        lex("a ** b += c"),
        vec![
            Token::Identifier("a".into()),
            Token::Punctuator(Punctuator::StarStar),
            Token::Identifier("b".into()),
            Token::Punctuator(Punctuator::PlusEq),
            Token::Identifier("c".into()),
        ]
    );
}

#[test]
fn test_lex_has_not_is_one_token() {
    assert_eq!(
        lex("xs has not 3"),
        vec![
            Token::Identifier("xs".into()),
            Token::Keyword(Keyword::HasNot),
            Token::Number(3.0),
        ]
    );
}

#[test]
fn test_lex_interpolated_string() {
    assert_eq!(
        lex("\"a${x}b${y}c\""),
        vec![
            Token::TemplateHead("a".into()),
            Token::Identifier("x".into()),
            Token::TemplateMiddle("b".into()),
            Token::Identifier("y".into()),
            Token::TemplateTail("c".into()),
        ]
    );
}

#[test]
fn test_lex_skips_both_comment_styles() {
    assert_eq!(
        lex("// line\n# hash\n1"),
        vec![Token::Number(1.0)]
    );
}

#[test]
fn test_lex_positions_are_one_based() {
    let mut lexer = Lexer::new("\n  foo");
    let token = lexer.next_token().unwrap();
    assert_eq!(token.position, SourcePosition::new(2, 3));
    assert_eq!(token.lexeme, "foo");
}

#[test]
fn test_lex_unterminated_string() {
    let mut lexer = Lexer::new("\"abc");
    let err = lexer.next_token().unwrap_err();
    assert_eq!(err.kind, ErrorKind::Syntax);
    assert_eq!(err.message, "Unterminated string.");
}

proptest! {
    #[test]
    fn prop_integer_literals_lex_exactly(n in 0u32..1_000_000) {
        prop_assert_eq!(lex(&n.to_string()), vec![Token::Number(f64::from(n))]);
    }

    #[test]
    fn prop_plain_identifiers_lex_as_identifiers(name in "[a-z_][a-z0-9_]{0,12}") {
        prop_assume!(Keyword::from_word(&name).is_none());
        prop_assert_eq!(lex(&name), vec![Token::Identifier(name.clone())]);
    }
}

// ============================================================================
// Compiler Tests
// ============================================================================

#[test]
fn test_arithmetic_precedence() {
    assert_eq!(
        ops("1 + 2 * 3;"),
        vec![
            OpCode::Constant(0),
            OpCode::Constant(1),
            OpCode::Constant(2),
            OpCode::Multiply,
            OpCode::Add,
            OpCode::Pop,
            OpCode::Nil,
            OpCode::Return,
        ]
    );
}

#[test]
fn test_function_arity_and_name() {
    let mut heap = Heap::new();
    let script = compile(&mut heap, "func add(a, b) { return a + b; }", "unit.slo").unwrap();
    let inner = nested_functions(&heap, script);
    assert_eq!(inner.len(), 1);
    let function = heap.as_function(inner[0]).unwrap();
    assert_eq!(function.arity, 2);
    assert_eq!(heap.str_of(function.name.unwrap()), "add");
    assert_eq!(
        function.chunk.code,
        vec![
            OpCode::GetLocal(1),
            OpCode::GetLocal(2),
            OpCode::Add,
            OpCode::Return,
            OpCode::Nil,
            OpCode::Return,
        ]
    );
}

#[test]
fn test_initializer_returns_self() {
    let mut heap = Heap::new();
    let script = compile(&mut heap, "class P { func __init__() {} }", "unit.slo").unwrap();
    let init = nested_functions(&heap, script)[0];
    assert_eq!(
        heap.as_function(init).unwrap().chunk.code,
        vec![OpCode::GetLocal(0), OpCode::Return]
    );
}

#[test]
fn test_method_declaration() {
    let code = ops("class P { func f() {} }");
    assert_eq!(code[0], OpCode::Class(0));
    assert!(code.contains(&OpCode::Method(1)));
}

#[test]
fn test_list_and_dict_literals() {
    assert!(ops("[1, 2, 3];").contains(&OpCode::List(3)));
    assert!(ops("var d = {\"a\": 1, \"b\": 2,};").contains(&OpCode::Dict(2)));
}

#[test]
fn test_membership_operators() {
    assert!(ops("1 has 2;").contains(&OpCode::Has));
    assert!(ops("1 has not 2;").contains(&OpCode::HasNot));
}

#[test]
fn test_string_interpolation_part_count() {
    assert!(ops("var x = 1; \"a${x}b\";").contains(&OpCode::Interpolate(3)));
}

#[test]
fn test_closure_in_loop_body_captures_loop_variable() {
    let code = ops("for (var i = 0; i < 3; i = i + 1) { func f() { return i; } }");
    assert!(code.contains(&OpCode::CloseUpvalue));
}

#[test]
fn test_disassembly_lists_every_instruction() {
    let mut heap = Heap::new();
    let script = compile(&mut heap, "var a = 1;", "unit.slo").unwrap();
    let chunk = &heap.as_function(script).unwrap().chunk;
    let listing = disassemble_chunk(chunk, "<script>", &|v: Value| heap.display(v));
    assert!(listing.starts_with("== <script> =="));
    assert_eq!(listing.lines().count(), chunk.len() + 1);
}

// ============================================================================
// Compile Error Tests
// ============================================================================

#[test]
fn test_missing_semicolon() {
    assert_eq!(messages("1 + 2"), vec!["Expect ';' after expression."]);
}

#[test]
fn test_invalid_assignment_target() {
    assert_eq!(messages("1 + 2 = 3;"), vec!["Invalid assignment target."]);
}

#[test]
fn test_continue_outside_loop() {
    assert_eq!(
        messages("continue;"),
        vec!["Can't use 'continue' outside of a loop."]
    );
}

#[test]
fn test_super_outside_class() {
    assert_eq!(
        messages("super.f();"),
        vec!["Can't use 'super' outside of a class."]
    );
}

#[test]
fn test_too_many_parameters() {
    let params: Vec<String> = (0..256).map(|i| format!("p{}", i)).collect();
    let source = format!("func f({}) {{}}", params.join(", "));
    assert!(messages(&source).contains(&"Can't have more than 255 parameters.".to_string()));
}

#[test]
fn test_lexer_errors_are_collected() {
    let errors = messages("var a = @;");
    assert_eq!(errors[0], "Unexpected character.");
}

#[test]
fn test_deeply_nested_parentheses_are_rejected() {
    let source = format!("var x = {}1{};", "(".repeat(50_000), ")".repeat(50_000));
    let errors = messages(&source);
    assert_eq!(errors[0], "Expression nested too deeply.");
}

#[test]
fn test_deep_unary_chain_is_rejected() {
    let source = format!("var x = {}1;", "-".repeat(50_000));
    assert!(messages(&source).contains(&"Expression nested too deeply.".to_string()));
}

#[test]
fn test_nesting_below_the_limit_compiles() {
    let depth = parser::MAX_NESTING / 2;
    let source = format!("var x = {}1{};", "(".repeat(depth), ")".repeat(depth));
    assert_eq!(ops(&source).first(), Some(&OpCode::Constant(1)));
}

#[test]
fn test_deeply_nested_statements_are_rejected() {
    let blocks = format!("{}{}", "{".repeat(50_000), "}".repeat(50_000));
    assert_eq!(messages(&blocks)[0], "Statement nested too deeply.");

    let ifs = format!("{}x;", "if (true) ".repeat(50_000));
    assert_eq!(messages(&ifs)[0], "Statement nested too deeply.");
}
