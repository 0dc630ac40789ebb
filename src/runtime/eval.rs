//! The expression evaluator.
//!
//! Matches expressions against the input by recursive descent. Match failure
//! is an ordinary [`MatchResult`] value; only conditions that abort the whole
//! parse (the recursion limit, engine bugs) travel as [`Halt`] through `Err`.
//!
//! ## Failure Tracking
//!
//! Every terminal that fails records what it expected at its position in the
//! [`FailureTracker`], which keeps only the furthest position seen. Failures
//! under lookahead are *quiet* and record nothing.
//!
//! ## Stack Usage
//!
//! One rule call costs several nested `eval` frames, so the native stack
//! would run out long before `max_depth` on a small thread stack. `eval`
//! moves onto a heap-allocated segment whenever the remaining stack runs low,
//! which leaves `max_depth` as the only limit on nesting.

use std::collections::BTreeSet;
use std::sync::Arc;

use tracing::trace;

use super::memo::{MemoCache, MemoKey, MemoStats};
use super::tree;
use super::ParseOptions;
use crate::ast::{CharClass, Expr, ParseNode, Polarity, Span};
use crate::errors::Expectation;
use crate::grammar::{ExternalRule, Grammar, RuleId};

/// Remaining stack below which `eval` switches to a fresh segment.
const RED_ZONE: usize = 128 * 1024;
/// Size of each heap-allocated stack segment.
const STACK_SEGMENT: usize = 2 * 1024 * 1024;

// ============================================================================
// CORE DATA STRUCTURES
// ============================================================================

/// Outcome of matching one expression at one position.
#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) enum MatchResult {
    /// Matched up to `end`, producing `captures` for the enclosing node.
    Success {
        end: usize,
        captures: Vec<Arc<ParseNode>>,
    },
    /// No match; `furthest` is the furthest position reached on the way.
    Failure { furthest: usize },
}

/// Aborts the parse outright.
#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) enum Halt {
    RecursionLimit {
        position: usize,
    },
    /// An external matcher returned a length that does not fit the input.
    External {
        name: String,
        position: usize,
        consumed: usize,
    },
    Internal(String),
}

type EvalResult = Result<MatchResult, Halt>;

/// Expectations at the furthest failure position.
#[derive(Debug, Default)]
pub(crate) struct FailureTracker {
    furthest: usize,
    expected: BTreeSet<Expectation>,
}

impl FailureTracker {
    pub fn record(&mut self, position: usize, expectation: Expectation) {
        if position > self.furthest {
            self.furthest = position;
            self.expected.clear();
        }
        if position == self.furthest {
            self.expected.insert(expectation);
        }
    }

    pub fn furthest(&self) -> usize {
        self.furthest
    }

    /// Sorted expectations recorded at `furthest()`.
    pub fn expectations(&self) -> Vec<Expectation> {
        self.expected.iter().cloned().collect()
    }
}

// ============================================================================
// EVALUATOR
// ============================================================================

/// State of one top-level parse call.
pub(crate) struct Evaluator<'g> {
    grammar: &'g Grammar,
    input: &'g str,
    options: &'g ParseOptions,
    memo: MemoCache,
    failures: FailureTracker,
    depth: usize,
}

impl<'g> Evaluator<'g> {
    pub fn new(grammar: &'g Grammar, input: &'g str, options: &'g ParseOptions) -> Self {
        Self {
            grammar,
            input,
            options,
            memo: MemoCache::default(),
            failures: FailureTracker::default(),
            depth: 0,
        }
    }

    pub fn failures(&self) -> &FailureTracker {
        &self.failures
    }

    pub fn memo_stats(&self) -> MemoStats {
        self.memo.stats()
    }

    /// Invokes a rule, consulting the memo cache and enforcing the depth limit.
    ///
    /// A non-silent rule wraps its captures in a node named after itself; a
    /// silent rule passes them through.
    pub fn call_rule(&mut self, id: RuleId, position: usize, quiet: bool) -> EvalResult {
        let key = MemoKey {
            rule: id,
            position,
            quiet,
        };
        let grammar = self.grammar;
        let rule = grammar.rules().get(id);

        if self.options.memoize {
            if let Some(hit) = self.memo.get(&key) {
                trace!(rule = %rule.name, position, "memo hit");
                return Ok(hit);
            }
        }

        if self.depth >= self.options.max_depth {
            return Err(Halt::RecursionLimit { position });
        }

        trace!(rule = %rule.name, position, depth = self.depth, "enter rule");
        self.depth += 1;
        let outcome = self.eval(&rule.expr, position, quiet);
        self.depth -= 1;

        let result = match outcome? {
            MatchResult::Success { end, captures } if !rule.silent => MatchResult::Success {
                end,
                captures: vec![tree::wrap(&rule.name, Span::new(position, end), captures)],
            },
            other => other,
        };

        if self.options.memoize {
            self.memo.put(key, result.clone());
        }
        Ok(result)
    }

    fn eval(&mut self, expr: &'g Expr, position: usize, quiet: bool) -> EvalResult {
        stacker::maybe_grow(RED_ZONE, STACK_SEGMENT, || self.dispatch(expr, position, quiet))
    }

    fn dispatch(&mut self, expr: &'g Expr, position: usize, quiet: bool) -> EvalResult {
        let grammar = self.grammar;
        match expr {
            Expr::Literal(text) => Ok(self.eval_literal(text, position, quiet)),
            Expr::Class(class) => Ok(self.eval_class(class, position, quiet)),
            Expr::Rule { name, .. } => {
                if let Some(id) = grammar.rules().id_of(name) {
                    self.call_rule(id, position, quiet)
                } else if let Some(external) = grammar.rules().external(name) {
                    self.eval_external(external, position, quiet)
                } else {
                    Err(Halt::Internal(format!("unresolved rule reference '{}'", name)))
                }
            }
            Expr::Sequence(children) => self.eval_sequence(children, position, quiet),
            Expr::Choice(alternatives) => self.eval_choice(alternatives, position, quiet),
            Expr::Repeat { expr, min, max, .. } => {
                self.eval_repeat(expr, *min, *max, position, quiet)
            }
            Expr::Lookahead { expr, polarity } => self.eval_lookahead(expr, *polarity, position),
            Expr::Capture {
                expr,
                label,
                suppressed,
            } => self.eval_capture(expr, label.as_ref(), *suppressed, position, quiet),
        }
    }

    fn fail(&mut self, position: usize, quiet: bool, expectation: Expectation) -> MatchResult {
        if !quiet {
            self.failures.record(position, expectation);
        }
        MatchResult::Failure { furthest: position }
    }

    // ------------------------------------------------------------------------
    // Terminals
    // ------------------------------------------------------------------------

    fn eval_literal(&mut self, text: &str, position: usize, quiet: bool) -> MatchResult {
        if self.input[position..].starts_with(text) {
            MatchResult::Success {
                end: position + text.len(),
                captures: Vec::new(),
            }
        } else {
            self.fail(position, quiet, Expectation::Literal(text.to_string()))
        }
    }

    fn eval_class(&mut self, class: &CharClass, position: usize, quiet: bool) -> MatchResult {
        match self.input[position..].chars().next() {
            Some(c) if class.matches(c) => MatchResult::Success {
                end: position + c.len_utf8(),
                captures: Vec::new(),
            },
            _ => self.fail(position, quiet, Expectation::Class(class.describe())),
        }
    }

    /// Runs a caller-supplied matcher. A match becomes a leaf node named
    /// after the rule.
    fn eval_external(&mut self, external: &ExternalRule, position: usize, quiet: bool) -> EvalResult {
        let rest = &self.input[position..];
        match external.matches(rest) {
            Some(consumed) if rest.is_char_boundary(consumed) => {
                let end = position + consumed;
                Ok(MatchResult::Success {
                    end,
                    captures: vec![tree::wrap(&external.name, Span::new(position, end), Vec::new())],
                })
            }
            Some(consumed) => Err(Halt::External {
                name: external.name.to_string(),
                position,
                consumed,
            }),
            None => Ok(self.fail(
                position,
                quiet,
                Expectation::External(external.name.to_string()),
            )),
        }
    }

    // ------------------------------------------------------------------------
    // Combinators
    // ------------------------------------------------------------------------

    fn eval_sequence(&mut self, children: &'g [Expr], position: usize, quiet: bool) -> EvalResult {
        let mut cursor = position;
        let mut captures = Vec::new();

        for child in children {
            match self.eval(child, cursor, quiet)? {
                MatchResult::Success {
                    end,
                    captures: produced,
                } => {
                    cursor = end;
                    captures.extend(produced);
                }
                failure @ MatchResult::Failure { .. } => return Ok(failure),
            }
        }

        Ok(MatchResult::Success {
            end: cursor,
            captures,
        })
    }

    fn eval_choice(&mut self, alternatives: &'g [Expr], position: usize, quiet: bool) -> EvalResult {
        let mut furthest = position;

        for alternative in alternatives {
            match self.eval(alternative, position, quiet)? {
                success @ MatchResult::Success { .. } => return Ok(success),
                MatchResult::Failure { furthest: reached } => furthest = furthest.max(reached),
            }
        }

        Ok(MatchResult::Failure { furthest })
    }

    fn eval_repeat(
        &mut self,
        child: &'g Expr,
        min: usize,
        max: Option<usize>,
        position: usize,
        quiet: bool,
    ) -> EvalResult {
        let mut count = 0;
        let mut cursor = position;
        let mut captures = Vec::new();
        let mut furthest = position;

        while max.map_or(true, |max| count < max) {
            match self.eval(child, cursor, quiet)? {
                MatchResult::Success {
                    end,
                    captures: produced,
                } => {
                    captures.extend(produced);
                    if end == cursor {
                        // Every further iteration would match the same empty span.
                        count = (count + 1).max(min);
                        break;
                    }
                    cursor = end;
                    count += 1;
                }
                MatchResult::Failure { furthest: reached } => {
                    furthest = reached;
                    break;
                }
            }
        }

        if count >= min {
            Ok(MatchResult::Success {
                end: cursor,
                captures,
            })
        } else {
            Ok(MatchResult::Failure {
                furthest: furthest.max(cursor),
            })
        }
    }

    fn eval_lookahead(&mut self, child: &'g Expr, polarity: Polarity, position: usize) -> EvalResult {
        let matched = matches!(
            self.eval(child, position, true)?,
            MatchResult::Success { .. }
        );

        let passed = match polarity {
            Polarity::Positive => matched,
            Polarity::Negative => !matched,
        };

        Ok(if passed {
            MatchResult::Success {
                end: position,
                captures: Vec::new(),
            }
        } else {
            MatchResult::Failure { furthest: position }
        })
    }

    fn eval_capture(
        &mut self,
        child: &'g Expr,
        label: Option<&Arc<str>>,
        suppressed: bool,
        position: usize,
        quiet: bool,
    ) -> EvalResult {
        let (end, captures) = match self.eval(child, position, quiet)? {
            MatchResult::Success { end, captures } => (end, captures),
            failure @ MatchResult::Failure { .. } => return Ok(failure),
        };

        let captures = match (suppressed, label) {
            (true, _) => tree::splice(captures),
            (false, Some(label)) => vec![tree::wrap(label, Span::new(position, end), captures)],
            (false, None) => captures,
        };

        Ok(MatchResult::Success { end, captures })
    }
}
