//! Grammar compilation: surface syntax and static validation.

mod common;

use std::sync::Arc;

use common::compile;
use miette::Diagnostic;
use peggy::ast::{Builtin, Expr};
use peggy::grammar::GrammarBuilder;
use peggy::{Expectation, Grammar, GrammarError, ParseError};

fn compile_error(src: &str) -> GrammarError {
    match Grammar::compile(src) {
        Ok(_) => panic!("grammar unexpectedly compiled:\n{}", src),
        Err(e) => e,
    }
}

fn code(err: &GrammarError) -> String {
    err.code().map(|c| c.to_string()).unwrap_or_default()
}

#[test]
fn compiles_rules_in_definition_order() {
    let grammar = compile("main = a b\na = \"a\"\nb = \"b\"");
    let names: Vec<&str> = grammar.rules().iter().map(|(_, r)| &*r.name).collect();
    assert_eq!(names, vec!["main", "a", "b"]);
    assert_eq!(grammar.rule("main").unwrap().expr.to_string(), "a b");
}

#[test]
fn duplicate_rule_labels_both_definitions() {
    let err = compile_error("main = a\na = \"x\"\na = \"y\"");
    assert_eq!(code(&err), "peggy::grammar::duplicate_rule");
    let labels: Vec<_> = err.labels().unwrap().collect();
    assert_eq!(labels.len(), 2);
}

#[test]
fn undefined_rule_points_at_the_reference() {
    let src = "main = \"a\" missing";
    let err = compile_error(src);
    assert_eq!(code(&err), "peggy::grammar::undefined_rule");
    let label = err.labels().unwrap().next().unwrap();
    assert_eq!(label.offset(), src.find("missing").unwrap());
    assert_eq!(label.len(), "missing".len());
}

#[test]
fn unknown_builtin_lists_the_available_ones() {
    let err = compile_error("main = B_DIGITS");
    let help = err.help().map(|h| h.to_string()).unwrap_or_default();
    assert!(help.contains("B_ASCII_DIGIT"), "{}", help);
}

#[test]
fn reserved_names_cannot_be_defined() {
    let err = compile_error("main = \"a\"\nB_MINE = \"b\"");
    assert!(matches!(err, GrammarError::ReservedRuleName { ref name, .. } if name == "B_MINE"));
}

#[test]
fn external_names_are_reserved() {
    let err = compile_error("main = \"a\"\nE_MINE = \"b\"");
    assert!(matches!(err, GrammarError::ReservedRuleName { ref name, .. } if name == "E_MINE"));

    let mut builder = Grammar::builder();
    let defined = builder.define("E_MINE", Expr::literal("b"));
    assert!(matches!(defined, Err(GrammarError::ReservedRuleName { .. })));
}

#[test]
fn external_rules_use_caller_matchers() {
    let src = "main = E_IDENT (°\".\" E_IDENT)*";
    assert!(matches!(
        compile_error(src),
        GrammarError::UndefinedRule { ref name, .. } if name == "E_IDENT"
    ));

    let mut builder = GrammarBuilder::from_source("path.peggy", src).unwrap();
    builder
        .external(
            "E_IDENT",
            Arc::new(|rest: &str| {
                let len = rest
                    .char_indices()
                    .take_while(|(_, c)| c.is_alphanumeric())
                    .map(|(i, c)| i + c.len_utf8())
                    .last()?;
                Some(len)
            }),
        )
        .unwrap();
    let grammar = builder.build().unwrap();

    let tree = grammar.parse("std.ffi.Ösé").unwrap();
    let parts: Vec<&str> = tree
        .find_all("E_IDENT")
        .iter()
        .map(|node| tree.text(node))
        .collect();
    assert_eq!(parts, vec!["std", "ffi", "Ösé"]);

    let err = grammar.parse("std..ffi").unwrap_err();
    assert!(matches!(err, ParseError::TrailingInput { position: 4, .. }));
    assert!(err
        .expectations()
        .contains(&Expectation::External("E_IDENT".into())));
}

#[test]
fn external_matchers_must_respect_character_boundaries() {
    let mut builder = GrammarBuilder::from_source("grammar", "main = E_BYTE").unwrap();
    builder.external("E_BYTE", Arc::new(|_: &str| Some(1))).unwrap();
    let grammar = builder.build().unwrap();

    let err = grammar.parse("ü").unwrap_err();
    assert_eq!(
        err.code().map(|c| c.to_string()).as_deref(),
        Some("peggy::parse::external_rule")
    );
    assert!(grammar.parse("u").is_ok());
}

#[test]
fn deeply_nested_grammar_text_is_malformed() {
    let depth = 20_000;
    let src = format!("main = {}\"a\"{}", "(".repeat(depth), ")".repeat(depth));
    let err = compile_error(&src);
    assert_eq!(code(&err), "peggy::grammar::malformed_expression");
    assert!(err.to_string().contains("expression nested too deeply"), "{}", err);
}

#[test]
fn missing_main_is_reported() {
    let err = compile_error("start = \"a\"");
    assert_eq!(code(&err), "peggy::grammar::missing_entry_rule");
}

#[test]
fn malformed_expressions() {
    let cases = [
        ("main = 'a'", "single quote"),
        ("main = \"a\"{3,1}", "minimum 3 exceeds maximum 1"),
        ("main = (\"a\"", "unclosed group"),
        ("main = [z-a]", "inverted character range"),
        ("main = \"abc", "unterminated string"),
        ("main = \"a\"\n###\nnever closed", "unterminated block comment"),
        ("main = \"\\q\"", "unknown escape"),
        ("main = (\"a\"?)+", "can match empty input"),
    ];
    for (src, fragment) in cases {
        let err = compile_error(src);
        assert_eq!(code(&err), "peggy::grammar::malformed_expression", "{}", src);
        assert!(
            err.to_string().contains(fragment),
            "{:?} should mention {:?}, got {}",
            src,
            fragment,
            err
        );
    }
}

#[test]
fn left_recursion_reports_the_cycle() {
    let err = compile_error("main = expr\nexpr = term | expr \"+\" term\nterm = B_ASCII_DIGIT");
    match err {
        GrammarError::LeftRecursion { cycle, .. } => assert_eq!(cycle, "expr -> expr"),
        other => panic!("expected LeftRecursion, got {:?}", other),
    }
}

#[test]
fn left_recursion_through_nullable_prefix() {
    let err = compile_error("main = ws main \"x\" | \"x\"\nws = \" \"*");
    assert!(matches!(err, GrammarError::LeftRecursion { .. }));
}

#[test]
fn comments_are_ignored() {
    let grammar = compile(
        "# leading comment\nmain = a # trailing\n###\nnot = a rule\n###\na = \"#\"",
    );
    assert_eq!(grammar.rules().len(), 2);
    assert!(grammar.parse("#").is_ok());
}

#[test]
fn prefixes_stack() {
    let grammar = compile("main = !&°x:\"a\" B_ANY");
    assert!(grammar.parse("b").is_ok());
    assert!(grammar.parse("a").is_err());
}

#[test]
fn builder_and_source_text_agree() {
    let from_text = compile("main = digit+\ndigit = B_ASCII_DIGIT");

    let mut builder = Grammar::builder();
    builder
        .define("main", Expr::one_or_more(Expr::rule("digit")))
        .unwrap()
        .define("digit", Expr::builtin(Builtin::AsciiDigit))
        .unwrap();
    let built = builder.build().unwrap();

    let a = from_text.parse("123").unwrap();
    let b = built.parse("123").unwrap();
    assert_eq!(a.pretty(), b.pretty());
}

#[test]
fn builder_rejects_inverted_bounds() {
    let mut builder = Grammar::builder();
    builder
        .define("main", Expr::repeat(Expr::literal("a"), 2, Some(1)))
        .unwrap();
    let err = builder.build().unwrap_err();
    assert!(err.to_string().contains("malformed repetition bounds"));
}

#[test]
fn diagnostics_render_with_source() {
    let err = compile_error("main = \"a\" missing");
    let rendered = format!("{:?}", miette::Report::new(err));
    assert!(rendered.contains("peggy::grammar::undefined_rule"), "{}", rendered);
}
