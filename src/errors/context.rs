//! Source context for error reporting.
//!
//! Grammar sources and parse inputs are both wrapped in a [`SourceContext`] so
//! every diagnostic can point back into the text it came from.

use miette::{NamedSource, SourceSpan};
use std::sync::Arc;

/// A named piece of source text shared by all diagnostics raised against it.
#[derive(Debug, Clone)]
pub struct SourceContext {
    name: Arc<str>,
    named: Arc<NamedSource<String>>,
    content: Arc<str>,
}

impl SourceContext {
    pub fn new(name: impl AsRef<str>, content: impl Into<String>) -> Self {
        let content: String = content.into();
        Self {
            name: Arc::from(name.as_ref()),
            content: Arc::from(content.as_str()),
            named: Arc::new(NamedSource::new(name, content)),
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn content(&self) -> &str {
        &self.content
    }

    /// Shared handle on the text, used by parse trees.
    pub fn shared_content(&self) -> Arc<str> {
        Arc::clone(&self.content)
    }

    pub fn to_named_source(&self) -> Arc<NamedSource<String>> {
        Arc::clone(&self.named)
    }

    /// 1-based line and column (in characters) of a byte offset.
    ///
    /// # Examples
    ///
    /// ```rust
    /// use peggy::errors::SourceContext;
    /// let ctx = SourceContext::new("input", "ab\ncd");
    /// assert_eq!(ctx.line_col(0), (1, 1));
    /// assert_eq!(ctx.line_col(4), (2, 2));
    /// ```
    pub fn line_col(&self, position: usize) -> (usize, usize) {
        let position = position.min(self.content.len());
        let before = &self.content[..position];
        let line = before.matches('\n').count() + 1;
        let line_start = before.rfind('\n').map_or(0, |i| i + 1);
        let column = before[line_start..].chars().count() + 1;
        (line, column)
    }

    /// A span covering the character at `position`, or an empty span at the end.
    pub fn span_at(&self, position: usize) -> SourceSpan {
        let position = position.min(self.content.len());
        let width = self.content[position..]
            .chars()
            .next()
            .map_or(0, |c| c.len_utf8());
        SourceSpan::from(position..position + width)
    }
}
