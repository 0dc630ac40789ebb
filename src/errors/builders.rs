//! Builder functions for creating errors.
//!
//! Error values are never assembled by hand outside this module; callers go
//! through these helpers so every diagnostic carries its source and span.

use super::{Expectation, GrammarError, ParseError, SourceContext};
use crate::ast::{Builtin, Span, BUILTIN_PREFIX, EXTERNAL_PREFIX};

// ============================================================================
// GRAMMAR ERRORS
// ============================================================================

impl SourceContext {
    pub(crate) fn duplicate_rule(&self, name: &str, span: Span, first: Span) -> GrammarError {
        GrammarError::DuplicateRule {
            name: name.to_string(),
            src: self.to_named_source(),
            span: span.into(),
            first: first.into(),
        }
    }

    pub(crate) fn undefined_rule(&self, name: &str, referenced_from: &str, span: Span) -> GrammarError {
        let help = if name.starts_with(BUILTIN_PREFIX) {
            let known: Vec<&str> = Builtin::ALL.iter().map(|b| b.name()).collect();
            Some(format!("unknown built-in class; available: {}", known.join(", ")))
        } else if name.starts_with(EXTERNAL_PREFIX) {
            Some("external rules need a matcher registered with `GrammarBuilder::external`".to_string())
        } else {
            Some(format!("define it with `{} = ...`", name))
        };
        GrammarError::UndefinedRule {
            name: name.to_string(),
            referenced_from: referenced_from.to_string(),
            src: self.to_named_source(),
            span: span.into(),
            help,
        }
    }

    pub(crate) fn malformed(
        &self,
        message: impl Into<String>,
        span: Span,
        help: Option<&str>,
    ) -> GrammarError {
        GrammarError::MalformedExpression {
            message: message.into(),
            src: self.to_named_source(),
            span: span.into(),
            help: help.map(str::to_string),
        }
    }

    pub(crate) fn reserved_rule_name(&self, name: &str, span: Span) -> GrammarError {
        GrammarError::ReservedRuleName {
            name: name.to_string(),
            src: self.to_named_source(),
            span: span.into(),
        }
    }

    pub(crate) fn missing_entry_rule(&self, entry: &str) -> GrammarError {
        GrammarError::MissingEntryRule {
            entry: entry.to_string(),
            src: self.to_named_source(),
        }
    }

    pub(crate) fn left_recursion(&self, cycle: &[&str], span: Span) -> GrammarError {
        GrammarError::LeftRecursion {
            cycle: cycle.join(" -> "),
            src: self.to_named_source(),
            span: span.into(),
        }
    }
}

// ============================================================================
// PARSE ERRORS
// ============================================================================

impl SourceContext {
    pub(crate) fn no_match(
        &self,
        rule: &str,
        position: usize,
        expectations: Vec<Expectation>,
    ) -> ParseError {
        let (line, column) = self.line_col(position);
        ParseError::NoMatch {
            rule: rule.to_string(),
            position,
            line,
            column,
            expectations,
            src: self.to_named_source(),
            span: self.span_at(position),
        }
    }

    pub(crate) fn trailing_input(
        &self,
        rule: &str,
        position: usize,
        expectations: Vec<Expectation>,
    ) -> ParseError {
        let (line, column) = self.line_col(position);
        ParseError::TrailingInput {
            rule: rule.to_string(),
            position,
            line,
            column,
            expectations,
            src: self.to_named_source(),
            span: self.span_at(position),
        }
    }

    pub(crate) fn recursion_limit(&self, max_depth: usize, position: usize) -> ParseError {
        let (line, column) = self.line_col(position);
        ParseError::RecursionLimit {
            max_depth,
            position,
            line,
            column,
            src: self.to_named_source(),
            span: self.span_at(position),
        }
    }

    pub(crate) fn external_rule(&self, name: &str, position: usize, consumed: usize) -> ParseError {
        let (line, column) = self.line_col(position);
        ParseError::ExternalRule {
            name: name.to_string(),
            consumed,
            position,
            line,
            column,
            src: self.to_named_source(),
            span: self.span_at(position),
        }
    }
}

pub(crate) fn unknown_entry_rule(name: &str) -> ParseError {
    ParseError::UnknownEntryRule {
        name: name.to_string(),
    }
}

pub(crate) fn internal_error(message: impl Into<String>) -> ParseError {
    ParseError::Internal {
        message: message.into(),
    }
}
