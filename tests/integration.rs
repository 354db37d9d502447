//! Black-box pipeline tests: source text in, IR/ASM text or a typed error
//! out. These never invoke `nasm`/`gcc`; `driver::compile` is exercised with
//! `asm_only` so the suite runs without either tool installed.

use std::path::PathBuf;
use winx64cc::adapter::adapt;
use winx64cc::asmgen;
use winx64cc::driver::{self, Options};
use winx64cc::ir;
use winx64cc::lexer::Lexer;
use winx64cc::parser::{Parser, ParseErrorKind};

/// Runs a source string through lex/adapt/parse/ir/asm and returns both the
/// IR's canonical text lines and the generated assembly.
fn compile_to_text(source: &str) -> (Vec<String>, String) {
    let raw = Lexer::new(source).tokenize().expect("lex ok");
    let tokens = adapt(raw).expect("adapt ok");
    let program = Parser::new(tokens).parse().expect("parse ok");
    let (instrs, strings) = ir::generate(&program);
    let ir_text = instrs.iter().map(|i| i.to_string()).collect();
    let asm = asmgen::generate(&instrs, &strings);
    (ir_text, asm)
}

// ===================
// End-to-end scenarios
// ===================

#[test]
fn empty_main() {
    let (ir_text, asm) = compile_to_text("int main() { return 0; }");
    assert_eq!(ir_text, vec!["func main()", "return 0", "endfunc main"]);
    assert!(asm.contains("global main"));
    assert!(asm.contains("xor rax, rax") || asm.contains("mov rax, 0"));
}

#[test]
fn arithmetic_with_precedence() {
    let (ir_text, asm) = compile_to_text("int main() { int x = 1 + 2 * 3; return x; }");
    assert!(ir_text.iter().any(|l| l.contains("2 * 3")));
    assert!(ir_text.iter().any(|l| l.starts_with("x = t")));
    assert!(asm.contains("imul rax, rbx"));
    assert!(asm.contains("add rax, rbx"));
}

#[test]
fn if_else() {
    let (ir_text, _) = compile_to_text(
        "int main() { int x = 0; if (1) { x = 1; } else { x = 2; } return x; }",
    );
    let if_false_count = ir_text.iter().filter(|l| l.starts_with("ifFalse")).count();
    let goto_count = ir_text.iter().filter(|l| l.starts_with("goto")).count();
    let label_count = ir_text.iter().filter(|l| l.ends_with(':') && !l.contains(' ')).count();
    assert_eq!(if_false_count, 1);
    assert_eq!(goto_count, 1);
    assert_eq!(label_count, 2);
}

#[test]
fn while_loop_has_a_back_edge() {
    let (ir_text, _) = compile_to_text("int main() { int i = 0; while (i < 10) { i = i + 1; } return i; }");
    let start_label = ir_text.iter().find(|l| l.ends_with(':') && !l.contains(' ')).unwrap();
    let start = start_label.trim_end_matches(':');
    assert!(ir_text.iter().any(|l| l == &format!("goto {}", start)));
}

#[test]
fn for_loop_orders_init_and_step_around_the_back_edge() {
    let (ir_text, _) = compile_to_text(
        "int main() { int s = 0; for (int i = 0; i < 3; i = i + 1) { s = s + i; } return s; }",
    );
    let init_idx = ir_text.iter().position(|l| l == "i = 0").unwrap();
    let start_idx = ir_text.iter().position(|l| l.ends_with(':') && !l.contains(' ')).unwrap();
    assert!(init_idx < start_idx);
    let goto_idx = ir_text.iter().rposition(|l| l.starts_with("goto")).unwrap();
    let step_idx = ir_text
        .iter()
        .position(|l| l.starts_with("i = ") && l != "i = 0")
        .unwrap();
    assert!(step_idx < goto_idx);
}

#[test]
fn printf_with_a_string_literal() {
    let (ir_text, asm) = compile_to_text(r#"int main() { printf("hi\n"); return 0; }"#);
    assert!(ir_text.iter().any(|l| l == "param str0"));
    assert!(asm.contains(r#"str0: db "hi", 10, "", 0"#));
    assert!(asm.contains("lea rcx, [str0]"));
    assert!(asm.contains("sub rsp, 32"));
    assert!(asm.contains("call printf"));
    assert!(asm.contains("add rsp, 32"));
}

// ===================
// Negative scenarios
// ===================

fn parse_err(source: &str) -> winx64cc::parser::ParseError {
    let raw = Lexer::new(source).tokenize().expect("lex ok");
    let tokens = adapt(raw).expect("adapt ok");
    Parser::new(tokens).parse().unwrap_err()
}

#[test]
fn redeclaring_a_variable_is_a_semantic_error() {
    let err = parse_err("int main() { int x = 1; int x = 2; return 0; }");
    assert_eq!(err.kind, ParseErrorKind::Semantic);
}

#[test]
fn using_an_undeclared_identifier_is_a_semantic_error() {
    let err = parse_err("int main() { return y; }");
    assert_eq!(err.kind, ParseErrorKind::Semantic);
}

#[test]
fn string_to_int_initializer_is_a_semantic_error() {
    let err = parse_err(r#"int main() { int x = "s"; return 0; }"#);
    assert_eq!(err.kind, ParseErrorKind::Semantic);
}

#[test]
fn assignment_inside_a_condition_is_a_syntax_error() {
    let err = parse_err("int main() { int x = 0; if (x = 5) { return 0; } return 1; }");
    assert_eq!(err.kind, ParseErrorKind::Syntax);
}

#[test]
fn unterminated_block_comment_is_a_lex_error() {
    let result = Lexer::new("int main() { /* never closed").tokenize();
    assert!(result.is_err());
}

// ===================
// Driver pipeline (asm-only, no external tools required)
// ===================

#[test]
fn driver_writes_an_asm_file_and_stops_when_asm_only() {
    let dir = tempfile::tempdir().expect("tempdir");
    let source_path = dir.path().join("prog.lang");
    std::fs::write(&source_path, "int main() { return 0; }").unwrap();

    let opts = Options {
        source_path: source_path.clone(),
        output_name: None,
        show_ir: false,
        show_asm: false,
        asm_only: true,
    };
    let (_source, result) = driver::compile(&opts);
    assert!(result.is_ok());

    let asm_path: PathBuf = dir.path().join("prog.asm");
    let asm = std::fs::read_to_string(&asm_path).expect("asm file written");
    assert!(asm.contains("global main"));
}

#[test]
fn driver_surfaces_a_parse_error_without_touching_disk_artifacts() {
    let dir = tempfile::tempdir().expect("tempdir");
    let source_path = dir.path().join("bad.lang");
    std::fs::write(&source_path, "int main() { return y; }").unwrap();

    let opts = Options {
        source_path: source_path.clone(),
        output_name: None,
        show_ir: false,
        show_asm: false,
        asm_only: true,
    };
    let (source, result) = driver::compile(&opts);
    assert!(result.is_err());
    assert!(source.contains("return y"));
    assert!(!dir.path().join("bad.asm").exists());
}
