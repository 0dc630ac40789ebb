//! Parsing inputs with a compiled grammar.
//!
//! A parse call owns its evaluator, memo cache and failure tracker; the
//! [`Grammar`] is only read, so any number of calls may share one grammar
//! across threads.

use tracing::debug;

use crate::ast::ParseTree;
use crate::errors::builders::{internal_error, unknown_entry_rule};
use crate::errors::{Expectation, ParseError, SourceContext};
use crate::grammar::Grammar;

pub mod context;
pub(crate) mod eval;
pub mod memo;
pub(crate) mod tree;

pub use context::{ParseOptions, DEFAULT_MAX_DEPTH};
pub use memo::MemoStats;

use eval::{Evaluator, Halt, MatchResult};

/// Parses `input` from the grammar's `main` rule with default options.
///
/// # Examples
///
/// ```rust
/// use peggy::grammar::Grammar;
/// let grammar = Grammar::compile(r#"main = word (°" " word)*
/// word = B_ASCII_ALPHABETIC+"#).unwrap();
/// let tree = peggy::runtime::parse(&grammar, "hello world").unwrap();
/// assert_eq!(tree.find_all("word").len(), 2);
/// ```
pub fn parse(grammar: &Grammar, input: &str) -> Result<ParseTree, ParseError> {
    parse_with(grammar, input, &ParseOptions::default())
}

pub fn parse_with(
    grammar: &Grammar,
    input: &str,
    options: &ParseOptions,
) -> Result<ParseTree, ParseError> {
    let source = SourceContext::new(&options.source_name, input);

    let entry_id = match &options.entry {
        Some(name) => grammar
            .rules()
            .id_of(name)
            .ok_or_else(|| unknown_entry_rule(name))?,
        None => grammar.entry(),
    };
    let entry = grammar.rules().get(entry_id);

    let mut evaluator = Evaluator::new(grammar, input, options);
    let outcome = evaluator.call_rule(entry_id, 0, false);

    let stats = evaluator.memo_stats();
    debug!(
        entry = %entry.name,
        input_len = input.len(),
        memo_hits = stats.hits,
        memo_misses = stats.misses,
        memo_entries = stats.entries,
        "parse finished"
    );

    let result = match outcome {
        Ok(result) => result,
        Err(Halt::RecursionLimit { position }) => {
            return Err(source.recursion_limit(options.max_depth, position))
        }
        Err(Halt::External {
            name,
            position,
            consumed,
        }) => return Err(source.external_rule(&name, position, consumed)),
        Err(Halt::Internal(message)) => return Err(internal_error(message)),
    };

    let failures = evaluator.failures();
    match result {
        MatchResult::Success { end, captures } => {
            if end < input.len() && !options.allow_partial {
                let (position, expectations) =
                    trailing_expectations(end, failures.furthest(), failures.expectations());
                return Err(source.trailing_input(&entry.name, position, expectations));
            }
            let root = tree::root(entry, end, captures);
            Ok(ParseTree::new(source.shared_content(), root))
        }
        MatchResult::Failure { furthest } => {
            let (position, expectations) = if failures.furthest() >= furthest {
                (failures.furthest(), failures.expectations())
            } else {
                (furthest, Vec::new())
            };
            Err(source.no_match(&entry.name, position, expectations))
        }
    }
}

/// Where a trailing-input error points and what it says was expected there.
///
/// If something failed beyond the end of the match, that failure is the more
/// useful report; at the end itself, end of input joins the expectations.
fn trailing_expectations(
    end: usize,
    furthest: usize,
    mut expected: Vec<Expectation>,
) -> (usize, Vec<Expectation>) {
    if furthest > end {
        (furthest, expected)
    } else if furthest == end {
        expected.push(Expectation::EndOfInput);
        expected.sort();
        expected.dedup();
        (end, expected)
    } else {
        (end, vec![Expectation::EndOfInput])
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn trailing_expectations_prefer_the_furthest_failure() {
        let digit = vec![Expectation::Class("ASCII digit".into())];
        assert_eq!(trailing_expectations(3, 5, digit.clone()), (5, digit.clone()));
        assert_eq!(
            trailing_expectations(3, 3, digit.clone()),
            (
                3,
                vec![
                    Expectation::Class("ASCII digit".into()),
                    Expectation::EndOfInput
                ]
            )
        );
        assert_eq!(
            trailing_expectations(3, 1, digit),
            (3, vec![Expectation::EndOfInput])
        );
    }

    #[test]
    fn unknown_entry_rule_is_reported() {
        let grammar = Grammar::compile("main = \"a\"").unwrap();
        let options = ParseOptions::default().with_entry("missing");
        assert!(matches!(
            parse_with(&grammar, "a", &options),
            Err(ParseError::UnknownEntryRule { .. })
        ));
    }

    #[test]
    fn partial_matches_can_be_allowed() {
        let grammar = Grammar::compile("main = \"a\"+").unwrap();
        assert!(matches!(
            parse(&grammar, "aab"),
            Err(ParseError::TrailingInput { position: 2, .. })
        ));

        let options = ParseOptions::default().with_partial(true);
        let tree = parse_with(&grammar, "aab", &options).unwrap();
        assert_eq!(tree.text(tree.root()), "aa");
    }
}
