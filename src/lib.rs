//! Peggy: a packrat interpreter for PEG grammars.
//!
//! Grammars are compiled from source text into an immutable [`Grammar`], then
//! used to parse any number of inputs into [`ParseTree`]s.
//!
//! ```rust
//! let grammar = peggy::compile_grammar(r#"
//!     main   = number (°"," number)*
//!     number = B_ASCII_DIGIT+
//! "#)?;
//! let tree = peggy::parse(&grammar, "1,22,333")?;
//! let numbers: Vec<&str> = tree.find_all("number").iter().map(|n| tree.text(n)).collect();
//! assert_eq!(numbers, ["1", "22", "333"]);
//! # Ok::<(), Box<dyn std::error::Error>>(())
//! ```

pub use crate::ast::{Expr, ParseNode, ParseTree, Span};
pub use crate::errors::{Expectation, GrammarError, ParseError};
pub use crate::grammar::{compile_grammar, Grammar, GrammarBuilder};
pub use crate::runtime::{parse, parse_with, ParseOptions};

pub mod ast;
pub mod cli;
pub mod errors;
pub mod grammar;
pub mod runtime;
pub mod syntax;
