//! Command-line arguments for the `peggy` binary.

use clap::{Parser, Subcommand, ValueEnum};
use std::path::PathBuf;

use crate::runtime::DEFAULT_MAX_DEPTH;

#[derive(Debug, Parser)]
#[command(
    name = "peggy",
    version,
    about = "Compile PEG grammars and parse inputs with them."
)]
pub struct PeggyArgs {
    #[command(subcommand)]
    pub command: Command,
}

#[derive(Debug, Subcommand)]
pub enum Command {
    /// Compile a grammar and list its rules.
    Check {
        /// The grammar file.
        #[arg(required = true)]
        grammar: PathBuf,
    },
    /// Parse an input with a grammar and print the parse tree.
    Parse {
        /// The grammar file.
        #[arg(required = true)]
        grammar: PathBuf,
        /// The input file; stdin when omitted.
        input: Option<PathBuf>,
        /// Start from this rule instead of `main`.
        #[arg(long)]
        entry: Option<String>,
        /// Accept a match that leaves trailing input.
        #[arg(long)]
        partial: bool,
        /// Disable the packrat cache.
        #[arg(long)]
        no_memo: bool,
        /// Maximum nested rule invocations.
        #[arg(long, default_value_t = DEFAULT_MAX_DEPTH)]
        max_depth: usize,
        #[arg(long, value_enum, default_value_t = Format::Tree)]
        format: Format,
    },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum Format {
    /// Indented outline.
    Tree,
    /// JSON document.
    Json,
}
