//! Every grammar under `tests/grammars` must compile, and every input under
//! `tests/inputs` must parse with the grammar of the same name.

mod common;

use std::fs;

use common::{discover_grammars, grammars_dir, load_grammar};

#[test]
fn discovers_the_bundled_grammars() {
    let names: Vec<String> = discover_grammars(grammars_dir())
        .iter()
        .filter_map(|p| p.file_stem().map(|s| s.to_string_lossy().into_owned()))
        .collect();
    assert!(names.contains(&"arithmetic".to_string()), "{:?}", names);
    assert!(names.contains(&"json".to_string()), "{:?}", names);
}

#[test]
fn bundled_grammars_compile_without_unreachable_rules() {
    for path in discover_grammars(grammars_dir()) {
        let name = path.file_stem().unwrap().to_string_lossy().into_owned();
        let grammar = load_grammar(&name);
        let reachable = grammar.reachable_from(grammar.entry());
        assert_eq!(
            reachable.len(),
            grammar.rules().len(),
            "{} has unreachable rules",
            path.display()
        );
    }
}

#[test]
fn bundled_inputs_parse() {
    let inputs = grammars_dir().parent().unwrap().join("inputs");
    for entry in fs::read_dir(&inputs).unwrap() {
        let path = entry.unwrap().path();
        let name = path.file_stem().unwrap().to_string_lossy().into_owned();
        let grammar = load_grammar(&name);
        let input = fs::read_to_string(&path).unwrap();
        if let Err(err) = grammar.parse(&input) {
            panic!("{}: {:?}", path.display(), miette::Report::new(err));
        }
    }
}
