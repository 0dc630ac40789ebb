//! # Peggy Test Support
//!
//! Shared grammars and small helpers for the integration tests.

#![allow(dead_code)]

use std::path::{Path, PathBuf};

use once_cell::sync::Lazy;
use peggy::{Grammar, ParseNode, ParseTree};
use walkdir::WalkDir;

pub fn grammars_dir() -> PathBuf {
    Path::new(env!("CARGO_MANIFEST_DIR")).join("tests").join("grammars")
}

/// Compiles `tests/grammars/<name>.peggy`.
pub fn load_grammar(name: &str) -> Grammar {
    let path = grammars_dir().join(format!("{}.peggy", name));
    let source = std::fs::read_to_string(&path)
        .unwrap_or_else(|e| panic!("failed to read {}: {}", path.display(), e));
    Grammar::compile_named(&path.display().to_string(), &source)
        .unwrap_or_else(|e| panic!("{:?}", miette::Report::new(e)))
}

pub static ARITHMETIC: Lazy<Grammar> = Lazy::new(|| load_grammar("arithmetic"));
pub static JSON: Lazy<Grammar> = Lazy::new(|| load_grammar("json"));

/// Every `.peggy` file under `root`, sorted by path.
pub fn discover_grammars<P: AsRef<Path>>(root: P) -> Vec<PathBuf> {
    let mut files: Vec<PathBuf> = WalkDir::new(root)
        .into_iter()
        .filter_map(|e| e.ok())
        .filter(|e| {
            e.file_type().is_file() && e.path().extension().is_some_and(|ext| ext == "peggy")
        })
        .map(|e| e.path().to_path_buf())
        .collect();
    files.sort();
    files
}

pub fn compile(src: &str) -> Grammar {
    Grammar::compile(src).unwrap_or_else(|e| panic!("{:?}", miette::Report::new(e)))
}

/// Names of the direct children of `node`.
pub fn child_names(node: &ParseNode) -> Vec<&str> {
    node.children.iter().map(|c| &*c.name).collect()
}

/// Text of the direct children of `node`.
pub fn child_texts<'t>(tree: &'t ParseTree, node: &ParseNode) -> Vec<&'t str> {
    node.children.iter().map(|c| tree.text(c)).collect()
}

/// Every node name in the tree, depth first.
pub fn all_names(tree: &ParseTree) -> Vec<String> {
    let mut names = Vec::new();
    tree.root().walk(&mut |node, _| names.push(node.name.to_string()));
    names
}
