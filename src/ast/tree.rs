//! Parse trees produced by a successful parse.
//!
//! Nodes only hold byte spans; text is recovered through the owning
//! [`ParseTree`], which keeps the input alive.

use crate::ast::Span;
use serde::ser::{SerializeStruct, Serializer};
use serde::Serialize;
use std::fmt::Write as _;
use std::sync::Arc;

/// A named node of the parse tree.
///
/// `name` is the rule name, or the label of a labelled capture. Children are
/// shared so that memoized matches can be reused without copying subtrees.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ParseNode {
    pub name: Arc<str>,
    pub span: Span,
    pub children: Vec<Arc<ParseNode>>,
}

/// The result of a successful parse: the input plus the root node.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ParseTree {
    source: Arc<str>,
    root: Arc<ParseNode>,
}

impl ParseNode {
    pub fn new(name: Arc<str>, span: Span, children: Vec<Arc<ParseNode>>) -> Self {
        Self {
            name,
            span,
            children,
        }
    }

    pub fn is_leaf(&self) -> bool {
        self.children.is_empty()
    }

    /// First direct child with the given name.
    pub fn child(&self, name: &str) -> Option<&ParseNode> {
        self.children
            .iter()
            .map(|child| child.as_ref())
            .find(|child| &*child.name == name)
    }

    /// Depth-first, pre-order traversal; `visit` receives each node and its depth.
    pub fn walk<'a>(&'a self, visit: &mut dyn FnMut(&'a ParseNode, usize)) {
        self.walk_at(0, visit);
    }

    fn walk_at<'a>(&'a self, depth: usize, visit: &mut dyn FnMut(&'a ParseNode, usize)) {
        visit(self, depth);
        for child in &self.children {
            child.walk_at(depth + 1, visit);
        }
    }
}

impl ParseTree {
    pub fn new(source: Arc<str>, root: Arc<ParseNode>) -> Self {
        Self { source, root }
    }

    pub fn root(&self) -> &ParseNode {
        &self.root
    }

    pub fn source(&self) -> &str {
        &self.source
    }

    /// The input text matched by `node`.
    pub fn text(&self, node: &ParseNode) -> &str {
        &self.source[node.span.start..node.span.end]
    }

    /// Every node named `name`, in document order.
    pub fn find_all(&self, name: &str) -> Vec<&ParseNode> {
        let mut found = Vec::new();
        self.root.walk(&mut |node, _| {
            if &*node.name == name {
                found.push(node);
            }
        });
        found
    }

    /// Renders the tree as an indented outline, leaves showing their text.
    ///
    /// ```text
    /// operation "3 + 4"
    ///   operand "3"
    /// ```
    pub fn pretty(&self) -> String {
        let mut out = String::new();
        self.root.walk(&mut |node, depth| {
            let _ = writeln!(
                out,
                "{:indent$}{} {:?}",
                "",
                node.name,
                self.text(node),
                indent = depth * 2
            );
        });
        out
    }
}

// ============================================================================
// SERIALIZATION
// ============================================================================

/// Serializes a node together with the text it matched.
struct NodeView<'a> {
    node: &'a ParseNode,
    source: &'a str,
}

impl Serialize for NodeView<'_> {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let children: Vec<NodeView<'_>> = self
            .node
            .children
            .iter()
            .map(|child| NodeView {
                node: child,
                source: self.source,
            })
            .collect();

        let mut state = serializer.serialize_struct("ParseNode", 4)?;
        state.serialize_field("name", &*self.node.name)?;
        state.serialize_field("span", &self.node.span)?;
        state.serialize_field(
            "text",
            &self.source[self.node.span.start..self.node.span.end],
        )?;
        state.serialize_field("children", &children)?;
        state.end()
    }
}

impl Serialize for ParseTree {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        NodeView {
            node: &self.root,
            source: &self.source,
        }
        .serialize(serializer)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn leaf(name: &str, start: usize, end: usize) -> Arc<ParseNode> {
        Arc::new(ParseNode::new(name.into(), Span::new(start, end), vec![]))
    }

    fn sample() -> ParseTree {
        let root = ParseNode::new(
            "sum".into(),
            Span::new(0, 5),
            vec![leaf("num", 0, 1), leaf("op", 2, 3), leaf("num", 4, 5)],
        );
        ParseTree::new("1 + 2".into(), Arc::new(root))
    }

    #[test]
    fn text_and_lookup() {
        let tree = sample();
        assert_eq!(tree.text(tree.root()), "1 + 2");
        let nums: Vec<_> = tree.find_all("num").iter().map(|n| tree.text(n)).collect();
        assert_eq!(nums, vec!["1", "2"]);
        assert_eq!(tree.root().child("op").map(|n| tree.text(n)), Some("+"));
    }

    #[test]
    fn pretty_indents_children() {
        let tree = sample();
        assert_eq!(
            tree.pretty(),
            "sum \"1 + 2\"\n  num \"1\"\n  op \"+\"\n  num \"2\"\n"
        );
    }

    #[test]
    fn serializes_with_text() {
        let json = serde_json::to_value(sample()).unwrap();
        assert_eq!(json["name"], "sum");
        assert_eq!(json["children"][1]["text"], "+");
        assert_eq!(json["children"][2]["span"]["start"], 4);
    }
}
