// spec.md §8 scenario 1: identity addition end to end.

use neurowasm_core::token::TokenKind;
use neurowasm_core::Compiler;

#[test]
fn tokens_begin_with_the_expected_lexeme_sequence() {
    let source = "function add(a, b) { return a + b; }";
    let compiler = Compiler::new();
    let result = compiler.compile_source(source);
    let kinds: Vec<TokenKind> = result.tokens.iter().map(|t| t.kind.clone()).take(14).collect();
    assert_eq!(
        kinds,
        vec![
            TokenKind::Function,
            TokenKind::Identifier,
            TokenKind::LParen,
            TokenKind::Identifier,
            TokenKind::Comma,
            TokenKind::Identifier,
            TokenKind::RParen,
            TokenKind::LBrace,
            TokenKind::Return,
            TokenKind::Identifier,
            TokenKind::Plus,
            TokenKind::Identifier,
            TokenKind::Semicolon,
            TokenKind::RBrace,
        ]
    );
}

#[test]
fn wat_body_lowers_to_two_local_gets_and_an_add() {
    let compiler = Compiler::new();
    let result = compiler.compile_source("function add(a, b) { return a + b; }");
    assert!(result.errors.is_empty(), "unexpected errors: {:?}", result.errors);
    assert!(result.wat_text.contains("local.get $a"));
    assert!(result.wat_text.contains("local.get $b"));
    assert!(result.wat_text.contains("i32.add"));
}

#[test]
fn binary_module_has_one_type_one_function_one_export() {
    let compiler = Compiler::new();
    let result = compiler.compile_source("function add(a, b) { return a + b; }");
    let module = result.ast.as_ref().unwrap();
    assert_eq!(module.body.len(), 1);
    assert_eq!(&result.wasm_binary[0..4], b"\0asm");
    assert!(!result.wasm_binary.is_empty());
}
