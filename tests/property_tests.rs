//! Engine-wide properties: literals, left bias, repetition, suppression,
//! memoization transparency and sharing a grammar across threads.

mod common;

use std::thread;

use common::{all_names, compile, ARITHMETIC, JSON};
use peggy::ast::Expr;
use peggy::{Grammar, ParseOptions, ParseTree};

fn render(result: &Result<ParseTree, peggy::ParseError>) -> String {
    match result {
        Ok(tree) => tree.pretty(),
        Err(err) => format!("{:?}", err),
    }
}

#[test]
fn every_literal_matches_itself() {
    let literals = ["a", "abc", "with space", "ünïcödé", "\"quoted\"", "back\\slash", "tab\there"];
    for literal in literals {
        let mut builder = Grammar::builder();
        builder.define("main", Expr::literal(literal)).unwrap();
        let grammar = builder.build().unwrap();

        let tree = grammar.parse(literal).unwrap();
        assert_eq!(tree.root().span.end, literal.len(), "{:?}", literal);
    }
}

#[test]
fn literals_survive_a_print_and_recompile() {
    for literal in ["plain", "\"", "\\", "\n\r\t", "\u{0}", "°"] {
        let src = format!("main = {}", Expr::literal(literal));
        let grammar = compile(&src);
        assert!(grammar.parse(literal).is_ok(), "{}", src);
    }
}

#[test]
fn ordered_choice_prefers_the_first_success() {
    let inputs = ["x", "xy", "xyz"];
    let grammar = compile("main = (a | b) B_ANY*\na = \"x\"\nb = \"x\"");
    for input in inputs {
        let tree = grammar.parse(input).unwrap();
        assert_eq!(all_names(&tree), vec!["main", "a"]);
    }
}

#[test]
fn star_always_succeeds() {
    let grammar = compile("main = \"a\"*");
    for input in ["", "a", "aaaa"] {
        assert!(grammar.parse(input).is_ok(), "{:?}", input);
    }
    let partial = ParseOptions::default().with_partial(true);
    let tree = grammar.parse_with("bbb", &partial).unwrap();
    assert_eq!(tree.root().span.end, 0);
}

#[test]
fn suppressed_matches_never_appear() {
    let grammar = compile(
        "main = item+\n\
         item = °wrapper | plain\n\
         wrapper = inner \"!\"?\n\
         inner = leaf\n\
         leaf = \"w\"\n\
         plain = \"p\"",
    );
    let tree = grammar.parse("wpw!").unwrap();
    let names = all_names(&tree);
    assert!(!names.iter().any(|n| n == "wrapper"), "{:?}", names);
    assert_eq!(tree.find_all("inner").len(), 2);
    assert_eq!(tree.find_all("leaf").len(), 2);
    assert_eq!(tree.find_all("plain").len(), 1);
}

#[test]
fn nested_suppression_removes_one_layer_each() {
    let grammar = compile("main = °(°outer)\nouter = middle\nmiddle = inner\ninner = \"x\"");
    let tree = grammar.parse("x").unwrap();
    assert_eq!(all_names(&tree), vec!["main", "inner"]);
}

#[test]
fn memoization_is_transparent() {
    let memo = ParseOptions::default();
    let no_memo = ParseOptions::default().with_memoize(false);

    let cases: [(&Grammar, &[&str]); 2] = [
        (&*ARITHMETIC, &["3 + 4", "(1+2)*3", "((7))", "1 +", "1 + (2", "", "9 9"]),
        (
            &*JSON,
            &[
                r#"{"a": 1, "b": [true, null]}"#,
                r#"{"a": }"#,
                "[1, 2, [3, [4]]]",
                r#""unterminated"#,
                "nul",
            ],
        ),
    ];

    for (grammar, inputs) in cases {
        for input in inputs {
            let with = render(&grammar.parse_with(input, &memo));
            let without = render(&grammar.parse_with(input, &no_memo));
            assert_eq!(with, without, "results differ for {:?}", input);
        }
    }
}

#[test]
fn shared_grammar_across_threads() {
    let inputs: Vec<String> = (0..16).map(|i| format!("({} + {}) * {}", i, i + 1, i + 2)).collect();

    let trees: Vec<String> = thread::scope(|scope| {
        let handles: Vec<_> = inputs
            .iter()
            .map(|input| scope.spawn(move || ARITHMETIC.parse(input).map(|t| t.pretty())))
            .collect();
        handles
            .into_iter()
            .map(|h| h.join().unwrap().unwrap())
            .collect()
    });

    for (input, tree) in inputs.iter().zip(&trees) {
        assert_eq!(tree, &ARITHMETIC.parse(input).unwrap().pretty());
    }
}

#[test]
fn grammar_is_send_and_sync() {
    fn assert_send_sync<T: Send + Sync>() {}
    assert_send_sync::<Grammar>();
    assert_send_sync::<ParseTree>();
}
