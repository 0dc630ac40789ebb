//! The Peggy Command-Line Interface.
//!
//! Thin glue: read files, call the library, print the result. Every error is
//! returned as a `miette::Report` for the binary to render.

use std::fs;
use std::io::{self, Read};
use std::path::Path;

use miette::{IntoDiagnostic, WrapErr};

use crate::cli::args::{Command, Format, PeggyArgs};
use crate::grammar::Grammar;
use crate::runtime::ParseOptions;

pub mod args;
pub mod output;

/// Runs one CLI command.
pub fn run(args: PeggyArgs) -> miette::Result<()> {
    match args.command {
        Command::Check { grammar } => handle_check(&grammar),
        Command::Parse {
            grammar,
            input,
            entry,
            partial,
            no_memo,
            max_depth,
            format,
        } => {
            let mut options = ParseOptions::default()
                .with_memoize(!no_memo)
                .with_max_depth(max_depth)
                .with_partial(partial);
            if let Some(entry) = entry {
                options = options.with_entry(entry);
            }
            handle_parse(&grammar, input.as_deref(), options, format)
        }
    }
}

fn load_grammar(path: &Path) -> miette::Result<Grammar> {
    let source = fs::read_to_string(path)
        .into_diagnostic()
        .wrap_err_with(|| format!("failed to read grammar {}", path.display()))?;
    Ok(Grammar::compile_named(&path.display().to_string(), &source)?)
}

fn handle_check(path: &Path) -> miette::Result<()> {
    let grammar = load_grammar(path)?;
    output::print_rules(&grammar).into_diagnostic()
}

fn handle_parse(
    grammar_path: &Path,
    input_path: Option<&Path>,
    options: ParseOptions,
    format: Format,
) -> miette::Result<()> {
    let grammar = load_grammar(grammar_path)?;

    let (name, input) = match input_path {
        Some(path) => {
            let input = fs::read_to_string(path)
                .into_diagnostic()
                .wrap_err_with(|| format!("failed to read input {}", path.display()))?;
            (path.display().to_string(), input)
        }
        None => {
            let mut input = String::new();
            io::stdin()
                .read_to_string(&mut input)
                .into_diagnostic()
                .wrap_err("failed to read input from stdin")?;
            ("<stdin>".to_string(), input)
        }
    };

    let options = options.with_source_name(name);
    let tree = grammar.parse_with(&input, &options)?;

    let printed = match format {
        Format::Tree => output::print_tree(&tree),
        Format::Json => output::print_json(&tree),
    };
    printed.into_diagnostic()
}
