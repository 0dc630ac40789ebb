//! Peggy Error Handling
//!
//! Two error families, both rendered through `miette`:
//! - [`GrammarError`]: a grammar failed to compile. Fatal to that compile call;
//!   no partial grammar is ever returned.
//! - [`ParseError`]: an input could not be parsed with a compiled grammar.
//!
//! Match failures inside the evaluator are ordinary values and never surface
//! here; only the top-level parse call converts an ultimate failure into a
//! [`ParseError`].

use miette::{Diagnostic, NamedSource, SourceSpan};
use serde::Serialize;
use std::fmt;
use std::sync::Arc;
use thiserror::Error;

pub(crate) mod builders;
pub mod context;

pub use context::SourceContext;

// ============================================================================
// GRAMMAR ERRORS
// ============================================================================

/// Errors raised while compiling grammar source text.
#[derive(Error, Diagnostic, Debug)]
pub enum GrammarError {
    #[error("duplicate rule '{name}'")]
    #[diagnostic(
        code(peggy::grammar::duplicate_rule),
        help("each rule may only be defined once; merge the alternatives with '|'")
    )]
    DuplicateRule {
        name: String,
        #[source_code]
        src: Arc<NamedSource<String>>,
        #[label("redefined here")]
        span: SourceSpan,
        #[label("first defined here")]
        first: SourceSpan,
    },

    #[error("rule '{referenced_from}' references undefined rule '{name}'")]
    #[diagnostic(code(peggy::grammar::undefined_rule))]
    UndefinedRule {
        name: String,
        referenced_from: String,
        #[source_code]
        src: Arc<NamedSource<String>>,
        #[label("undefined rule")]
        span: SourceSpan,
        #[help]
        help: Option<String>,
    },

    #[error("malformed expression: {message}")]
    #[diagnostic(code(peggy::grammar::malformed_expression))]
    MalformedExpression {
        message: String,
        #[source_code]
        src: Arc<NamedSource<String>>,
        #[label("here")]
        span: SourceSpan,
        #[help]
        help: Option<String>,
    },

    #[error("rule name '{name}' is reserved")]
    #[diagnostic(
        code(peggy::grammar::reserved_rule_name),
        help("names starting with 'B_' (built-in classes) or 'E_' (external rules) are reserved")
    )]
    ReservedRuleName {
        name: String,
        #[source_code]
        src: Arc<NamedSource<String>>,
        #[label("reserved name")]
        span: SourceSpan,
    },

    #[error("grammar has no '{entry}' rule")]
    #[diagnostic(
        code(peggy::grammar::missing_entry_rule),
        help("declare a rule named 'main'; it is the entry point of the grammar")
    )]
    MissingEntryRule {
        entry: String,
        #[source_code]
        src: Arc<NamedSource<String>>,
    },

    #[error("left recursion: {cycle}")]
    #[diagnostic(
        code(peggy::grammar::left_recursion),
        help("make sure every recursive path consumes input before recursing")
    )]
    LeftRecursion {
        cycle: String,
        #[source_code]
        src: Arc<NamedSource<String>>,
        #[label("recurses into itself without consuming input")]
        span: SourceSpan,
    },
}

// ============================================================================
// PARSE ERRORS
// ============================================================================

/// What the parser would have accepted at the furthest failure position.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize)]
pub enum Expectation {
    Literal(String),
    /// A character class, by its description ("ASCII digit").
    Class(String),
    /// An external rule, by name.
    External(String),
    EndOfInput,
}

/// Errors raised by a top-level parse call.
#[derive(Error, Diagnostic, Debug)]
pub enum ParseError {
    #[error(
        "no match for rule '{rule}' at line {line}, column {column}: {}",
        describe_expectations(.expectations)
    )]
    #[diagnostic(code(peggy::parse::no_match))]
    NoMatch {
        rule: String,
        position: usize,
        line: usize,
        column: usize,
        expectations: Vec<Expectation>,
        #[source_code]
        src: Arc<NamedSource<String>>,
        #[label("parsing stopped here")]
        span: SourceSpan,
    },

    #[error(
        "trailing input after rule '{rule}' at line {line}, column {column}: {}",
        describe_expectations(.expectations)
    )]
    #[diagnostic(
        code(peggy::parse::trailing_input),
        help("the entry rule matched a prefix of the input but not all of it")
    )]
    TrailingInput {
        rule: String,
        position: usize,
        line: usize,
        column: usize,
        expectations: Vec<Expectation>,
        #[source_code]
        src: Arc<NamedSource<String>>,
        #[label("unconsumed input starts here")]
        span: SourceSpan,
    },

    #[error("recursion limit of {max_depth} nested rules exceeded at line {line}, column {column}")]
    #[diagnostic(
        code(peggy::parse::recursion_limit),
        help("raise the limit with `ParseOptions::with_max_depth` or check the grammar for runaway recursion")
    )]
    RecursionLimit {
        max_depth: usize,
        position: usize,
        line: usize,
        column: usize,
        #[source_code]
        src: Arc<NamedSource<String>>,
        #[label("limit reached here")]
        span: SourceSpan,
    },

    #[error("external rule '{name}' consumed {consumed} bytes at line {line}, column {column}, past a character boundary or the end of input")]
    #[diagnostic(
        code(peggy::parse::external_rule),
        help("an external matcher must return a length that ends on a character boundary of the input it was given")
    )]
    ExternalRule {
        name: String,
        consumed: usize,
        position: usize,
        line: usize,
        column: usize,
        #[source_code]
        src: Arc<NamedSource<String>>,
        #[label("matcher called here")]
        span: SourceSpan,
    },

    #[error("entry rule '{name}' is not defined in the grammar")]
    #[diagnostic(code(peggy::parse::unknown_entry_rule))]
    UnknownEntryRule { name: String },

    #[error("internal engine error: {message}")]
    #[diagnostic(
        code(peggy::parse::internal),
        help("This is an internal engine error. Please report this as a bug.")
    )]
    Internal { message: String },
}

impl ParseError {
    /// Byte offset the error refers to, if it is tied to the input.
    pub fn position(&self) -> Option<usize> {
        match self {
            ParseError::NoMatch { position, .. }
            | ParseError::TrailingInput { position, .. }
            | ParseError::RecursionLimit { position, .. }
            | ParseError::ExternalRule { position, .. } => Some(*position),
            ParseError::UnknownEntryRule { .. } | ParseError::Internal { .. } => None,
        }
    }

    /// Sorted expectations recorded at the furthest failure position.
    pub fn expectations(&self) -> &[Expectation] {
        match self {
            ParseError::NoMatch { expectations, .. }
            | ParseError::TrailingInput { expectations, .. } => expectations,
            _ => &[],
        }
    }
}

impl fmt::Display for Expectation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Expectation::Literal(text) => {
                f.write_str("\"")?;
                for c in text.chars() {
                    f.write_str(&crate::ast::escape_char(c, false))?;
                }
                f.write_str("\"")
            }
            Expectation::Class(description) | Expectation::External(description) => {
                f.write_str(description)
            }
            Expectation::EndOfInput => f.write_str("end of input"),
        }
    }
}

/// Renders an expectation set as "expected digit, \"-\" or \"(\"".
///
/// # Examples
///
/// ```rust
/// use peggy::errors::{describe_expectations, Expectation};
/// let expected = vec![
///     Expectation::Literal("(".into()),
///     Expectation::Class("ASCII digit".into()),
/// ];
/// assert_eq!(describe_expectations(&expected), "expected \"(\" or ASCII digit");
/// ```
pub fn describe_expectations(expectations: &[Expectation]) -> String {
    let rendered: Vec<String> = expectations.iter().map(|e| e.to_string()).collect();
    match rendered.as_slice() {
        [] => "unexpected input".to_string(),
        [only] => format!("expected {}", only),
        [init @ .., last] => format!("expected {} or {}", init.join(", "), last),
    }
}
