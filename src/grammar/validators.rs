//! Static grammar checks.
//!
//! Each validator focuses on a single concern and returns the first error it
//! finds, in rule definition order.

use super::{RuleId, RuleTable, ENTRY_RULE};
use crate::ast::{Expr, Span};
use crate::errors::GrammarError;

pub(crate) struct GrammarValidators;

impl GrammarValidators {
    /// Every rule reference, in any rule, must name a defined rule or a
    /// registered external rule.
    pub fn check_rule_references(table: &RuleTable) -> Result<(), GrammarError> {
        for (_, rule) in table.iter() {
            let mut result = Ok(());
            rule.expr.walk(&mut |expr| {
                if result.is_err() {
                    return;
                }
                if let Expr::Rule { name, span } = expr {
                    if table.external(name).is_none() {
                        result = table.resolve(name, &rule.name, *span).map(|_| ());
                    }
                }
            });
            result?;
        }
        Ok(())
    }

    pub fn check_entry_rule(table: &RuleTable) -> Result<RuleId, GrammarError> {
        table
            .id_of(ENTRY_RULE)
            .ok_or_else(|| table.source().missing_entry_rule(ENTRY_RULE))
    }

    /// Bounds can only be inverted in programmatically built grammars; the
    /// grammar parser already rejects them in source text.
    pub fn check_repetition_bounds(table: &RuleTable) -> Result<(), GrammarError> {
        for (_, rule) in table.iter() {
            let mut found = None;
            rule.expr.walk(&mut |expr| {
                if let Expr::Repeat {
                    min,
                    max: Some(max),
                    span,
                    ..
                } = expr
                {
                    if min > max && found.is_none() {
                        found = Some((*min, *max, *span));
                    }
                }
            });

            if let Some((min, max, span)) = found {
                return Err(table.source().malformed(
                    format!(
                        "malformed repetition bounds: minimum {} exceeds maximum {}",
                        min, max
                    ),
                    located(span, rule.span),
                    None,
                ));
            }
        }
        Ok(())
    }

    /// Unbounded repetition over something that can match empty input would
    /// never terminate.
    pub fn check_nullable_repetitions(
        table: &RuleTable,
        nullable: &[bool],
    ) -> Result<(), GrammarError> {
        for (_, rule) in table.iter() {
            let mut found = None;
            rule.expr.walk(&mut |expr| {
                if let Expr::Repeat {
                    expr: child,
                    max: None,
                    span,
                    ..
                } = expr
                {
                    if found.is_none() && is_nullable(child, table, nullable) {
                        found = Some(*span);
                    }
                }
            });

            if let Some(span) = found {
                return Err(table.source().malformed(
                    format!(
                        "unbounded repetition in rule '{}' can match empty input",
                        rule.name
                    ),
                    located(span, rule.span),
                    Some("the repeated expression must consume input on every iteration"),
                ));
            }
        }
        Ok(())
    }

    /// Rejects cycles of rule calls that can be reached without consuming input.
    pub fn check_left_recursion(table: &RuleTable, nullable: &[bool]) -> Result<(), GrammarError> {
        let edges: Vec<Vec<(RuleId, Span)>> = table
            .iter()
            .map(|(_, rule)| {
                let mut calls = Vec::new();
                leading_calls(&rule.expr, table, nullable, &mut calls);
                calls
            })
            .collect();

        let mut state = vec![Visit::New; table.len()];
        let mut path = Vec::new();

        for (id, _) in table.iter() {
            if state[id.0] == Visit::New {
                if let Some((cycle, span)) = find_cycle(id, &edges, &mut state, &mut path) {
                    let names: Vec<&str> = cycle.iter().map(|id| &*table.get(*id).name).collect();
                    let span = located(span, table.get(cycle[0]).span);
                    return Err(table.source().left_recursion(&names, span));
                }
            }
        }
        Ok(())
    }

    /// Least fixpoint of rule silence, indexed by rule id.
    pub fn silent_rules(table: &RuleTable) -> Vec<bool> {
        let mut silent = vec![false; table.len()];
        loop {
            let mut changed = false;
            for (id, rule) in table.iter() {
                if !silent[id.0] && is_silent(&rule.expr, table, &silent) {
                    silent[id.0] = true;
                    changed = true;
                }
            }
            if !changed {
                return silent;
            }
        }
    }

    /// Least fixpoint of rule nullability.
    pub fn nullable_rules(table: &RuleTable) -> Vec<bool> {
        let mut nullable = vec![false; table.len()];
        loop {
            let mut changed = false;
            for (id, rule) in table.iter() {
                if !nullable[id.0] && is_nullable(&rule.expr, table, &nullable) {
                    nullable[id.0] = true;
                    changed = true;
                }
            }
            if !changed {
                return nullable;
            }
        }
    }
}

/// Prefers the expression's own span, falling back to its rule's.
fn located(span: Span, fallback: Span) -> Span {
    if span == Span::default() {
        fallback
    } else {
        span
    }
}

/// Can `expr` succeed without consuming input?
pub(crate) fn is_nullable(expr: &Expr, table: &RuleTable, nullable: &[bool]) -> bool {
    match expr {
        Expr::Literal(text) => text.is_empty(),
        Expr::Class(_) => false,
        Expr::Rule { name, .. } => table.id_of(name).is_some_and(|id| nullable[id.0]),
        Expr::Sequence(children) => children.iter().all(|c| is_nullable(c, table, nullable)),
        Expr::Choice(alternatives) => alternatives
            .iter()
            .any(|a| is_nullable(a, table, nullable)),
        Expr::Repeat { expr, min, .. } => *min == 0 || is_nullable(expr, table, nullable),
        Expr::Lookahead { .. } => true,
        Expr::Capture { expr, .. } => is_nullable(expr, table, nullable),
    }
}

/// Does `expr` produce no node of its own? Suppressed captures and
/// lookahead are silent, and so are references to silent rules and any
/// composite made only of silent parts. Terminals, labels and external rules
/// are not.
fn is_silent(expr: &Expr, table: &RuleTable, silent: &[bool]) -> bool {
    if expr.is_suppressed() {
        return true;
    }
    match expr {
        Expr::Literal(_) | Expr::Class(_) => false,
        Expr::Rule { name, .. } => table.id_of(name).is_some_and(|id| silent[id.0]),
        Expr::Sequence(children) | Expr::Choice(children) => {
            children.iter().all(|c| is_silent(c, table, silent))
        }
        Expr::Repeat { expr, .. } => is_silent(expr, table, silent),
        Expr::Lookahead { .. } => true,
        Expr::Capture { label: Some(_), .. } => false,
        Expr::Capture { expr, .. } => is_silent(expr, table, silent),
    }
}

/// Rules that `expr` may call before consuming any input.
fn leading_calls(expr: &Expr, table: &RuleTable, nullable: &[bool], out: &mut Vec<(RuleId, Span)>) {
    match expr {
        Expr::Literal(_) | Expr::Class(_) => {}
        Expr::Rule { name, span } => {
            if let Some(id) = table.id_of(name) {
                out.push((id, *span));
            }
        }
        Expr::Sequence(children) => {
            for child in children {
                leading_calls(child, table, nullable, out);
                if !is_nullable(child, table, nullable) {
                    break;
                }
            }
        }
        Expr::Choice(alternatives) => {
            for alternative in alternatives {
                leading_calls(alternative, table, nullable, out);
            }
        }
        Expr::Repeat { expr, .. } | Expr::Lookahead { expr, .. } | Expr::Capture { expr, .. } => {
            leading_calls(expr, table, nullable, out)
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Visit {
    New,
    Active,
    Done,
}

/// Depth-first search for a back edge. Returns the cycle as a rule path that
/// starts and ends with the same rule, plus the span of the closing reference.
fn find_cycle(
    id: RuleId,
    edges: &[Vec<(RuleId, Span)>],
    state: &mut [Visit],
    path: &mut Vec<RuleId>,
) -> Option<(Vec<RuleId>, Span)> {
    state[id.0] = Visit::Active;
    path.push(id);

    for &(callee, span) in &edges[id.0] {
        match state[callee.0] {
            Visit::Active => {
                let start = path.iter().position(|&p| p == callee).unwrap_or(0);
                let mut cycle = path[start..].to_vec();
                cycle.push(callee);
                return Some((cycle, span));
            }
            Visit::New => {
                if let Some(found) = find_cycle(callee, edges, state, path) {
                    return Some(found);
                }
            }
            Visit::Done => {}
        }
    }

    path.pop();
    state[id.0] = Visit::Done;
    None
}
