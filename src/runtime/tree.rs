//! Parse tree assembly.
//!
//! The evaluator hands every expression's captured nodes upward as a flat
//! list; these helpers decide what a rule, label or suppression turns that
//! list into.

use std::sync::Arc;

use crate::ast::{ParseNode, Span};
use crate::grammar::Rule;

/// Wraps captured children in a node named `name`.
pub(crate) fn wrap(name: &Arc<str>, span: Span, children: Vec<Arc<ParseNode>>) -> Arc<ParseNode> {
    Arc::new(ParseNode::new(Arc::clone(name), span, children))
}

/// Drops the directly captured nodes, lifting their children in order.
pub(crate) fn splice(captures: Vec<Arc<ParseNode>>) -> Vec<Arc<ParseNode>> {
    captures
        .iter()
        .flat_map(|node| node.children.iter().cloned())
        .collect()
}

/// The root node for a successful entry match.
///
/// A non-silent entry rule already produced exactly one node. A silent one
/// produced a flat list, which still gets a root named after the rule.
pub(crate) fn root(entry: &Rule, end: usize, mut captures: Vec<Arc<ParseNode>>) -> Arc<ParseNode> {
    if !entry.silent && captures.len() == 1 {
        if let Some(node) = captures.pop() {
            return node;
        }
    }
    wrap(&entry.name, Span::new(0, end), captures)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn node(name: &str, children: Vec<Arc<ParseNode>>) -> Arc<ParseNode> {
        wrap(&Arc::from(name), Span::new(0, 1), children)
    }

    #[test]
    fn splice_lifts_grandchildren() {
        let captures = vec![
            node("a", vec![node("x", vec![]), node("y", vec![])]),
            node("b", vec![]),
            node("c", vec![node("z", vec![])]),
        ];
        let names: Vec<_> = splice(captures).iter().map(|n| n.name.to_string()).collect();
        assert_eq!(names, vec!["x", "y", "z"]);
    }
}
