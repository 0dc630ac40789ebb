//! Expression tree for Peggy grammars
//!
//! This module provides the expression node types a grammar is made of, the
//! built-in character classes, and the parse tree types produced by a parse.
//! A [`Grammar`](crate::grammar::Grammar) exclusively owns its expressions;
//! rule references are by name and resolve through the rule table.

// ============================================================================
// IMPORTS
// ============================================================================

use serde::Serialize;
use std::fmt;
use std::sync::Arc;

pub mod tree;

pub use tree::{ParseNode, ParseTree};

// ============================================================================
// CORE DATA STRUCTURES
// ============================================================================

/// Represents a byte range in a grammar source or a parse input.
///
/// # Examples
///
/// ```rust
/// use peggy::ast::Span;
/// let span = Span::new(2, 5);
/// assert_eq!(span.len(), 3);
/// assert!(!span.is_empty());
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Default)]
pub struct Span {
    pub start: usize,
    pub end: usize,
}

/// Polarity of a lookahead.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Polarity {
    /// `&e`: succeeds iff `e` succeeds.
    Positive,
    /// `!e`: succeeds iff `e` fails.
    Negative,
}

/// A single grammar expression node.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Expr {
    /// Matches exactly this text.
    Literal(String),
    /// Matches one character satisfying the class.
    Class(CharClass),
    /// Matches the named rule. `span` locates the reference in the grammar source.
    Rule { name: String, span: Span },
    /// Matches every child in order.
    Sequence(Vec<Expr>),
    /// Matches the first child that succeeds.
    Choice(Vec<Expr>),
    /// Greedy repetition; `max == None` is unbounded.
    Repeat {
        expr: Box<Expr>,
        min: usize,
        max: Option<usize>,
        span: Span,
    },
    /// Zero-width test of `expr`.
    Lookahead { expr: Box<Expr>, polarity: Polarity },
    /// Controls what `expr` contributes to the parse tree.
    ///
    /// A suppressed capture drops the nodes `expr` produces directly, lifting
    /// their children. A labelled capture wraps the match in a node named after
    /// the label.
    Capture {
        expr: Box<Expr>,
        label: Option<Arc<str>>,
        suppressed: bool,
    },
}

/// A character predicate consuming exactly one Unicode scalar value.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CharClass {
    Builtin(Builtin),
    /// `[a-z_]` or, when negated, `[^"\\]`.
    Set { items: Vec<ClassItem>, negated: bool },
}

/// A member of a bracketed character set.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ClassItem {
    Single(char),
    Range(char, char),
}

/// Built-in character classes, referenced in grammars by their `B_` name.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Builtin {
    Any,
    Newline,
    NewlineCr,
    NewlineLf,
    DoubleQuote,
    Ascii,
    AsciiAlphabetic,
    AsciiAlphanumeric,
    AsciiControl,
    AsciiDigit,
    AsciiGraphic,
    AsciiHexdigit,
    AsciiLowercase,
    AsciiPunctuation,
    AsciiUppercase,
    AsciiWhitespace,
    Alphabetic,
    Alphanumeric,
    Control,
    Lowercase,
    Numeric,
    Uppercase,
    Whitespace,
}

/// Prefix shared by every built-in class name. Rules may not use it.
pub const BUILTIN_PREFIX: &str = "B_";

/// Prefix of external rules, matched by caller-supplied code. Grammar rules
/// may not use it either.
pub const EXTERNAL_PREFIX: &str = "E_";

/// Is `name` in one of the reserved namespaces?
pub fn is_reserved_name(name: &str) -> bool {
    name.starts_with(BUILTIN_PREFIX) || name.starts_with(EXTERNAL_PREFIX)
}

// ============================================================================
// PUBLIC API IMPLEMENTATION
// ============================================================================

impl Span {
    pub fn new(start: usize, end: usize) -> Self {
        Self { start, end }
    }

    pub fn len(&self) -> usize {
        self.end - self.start
    }

    pub fn is_empty(&self) -> bool {
        self.start == self.end
    }
}

impl From<Span> for miette::SourceSpan {
    fn from(span: Span) -> Self {
        miette::SourceSpan::from(span.start..span.end)
    }
}

impl Expr {
    pub fn literal(text: impl Into<String>) -> Self {
        Expr::Literal(text.into())
    }

    pub fn rule(name: impl Into<String>) -> Self {
        Expr::Rule {
            name: name.into(),
            span: Span::default(),
        }
    }

    pub fn builtin(class: Builtin) -> Self {
        Expr::Class(CharClass::Builtin(class))
    }

    pub fn set(items: Vec<ClassItem>, negated: bool) -> Self {
        Expr::Class(CharClass::Set { items, negated })
    }

    pub fn seq(children: Vec<Expr>) -> Self {
        Expr::Sequence(children)
    }

    pub fn choice(alternatives: Vec<Expr>) -> Self {
        Expr::Choice(alternatives)
    }

    pub fn repeat(expr: Expr, min: usize, max: Option<usize>) -> Self {
        Expr::Repeat {
            expr: Box::new(expr),
            min,
            max,
            span: Span::default(),
        }
    }

    /// `e*`
    pub fn zero_or_more(expr: Expr) -> Self {
        Self::repeat(expr, 0, None)
    }

    /// `e+`
    pub fn one_or_more(expr: Expr) -> Self {
        Self::repeat(expr, 1, None)
    }

    /// `e?`
    pub fn optional(expr: Expr) -> Self {
        Self::repeat(expr, 0, Some(1))
    }

    /// `&e`
    pub fn followed_by(expr: Expr) -> Self {
        Expr::Lookahead {
            expr: Box::new(expr),
            polarity: Polarity::Positive,
        }
    }

    /// `!e`
    pub fn not_followed_by(expr: Expr) -> Self {
        Expr::Lookahead {
            expr: Box::new(expr),
            polarity: Polarity::Negative,
        }
    }

    /// `°e`
    pub fn suppress(expr: Expr) -> Self {
        Expr::Capture {
            expr: Box::new(expr),
            label: None,
            suppressed: true,
        }
    }

    /// `label:e`
    pub fn labelled(label: &str, expr: Expr) -> Self {
        Expr::Capture {
            expr: Box::new(expr),
            label: Some(Arc::from(label)),
            suppressed: false,
        }
    }

    /// Is this expression a suppressed capture at its top level?
    pub fn is_suppressed(&self) -> bool {
        matches!(self, Expr::Capture { suppressed: true, .. })
    }

    /// Calls `visit` on this expression and every sub-expression, parents first.
    pub fn walk<'a>(&'a self, visit: &mut dyn FnMut(&'a Expr)) {
        visit(self);
        match self {
            Expr::Literal(_) | Expr::Class(_) | Expr::Rule { .. } => {}
            Expr::Sequence(children) | Expr::Choice(children) => {
                for child in children {
                    child.walk(visit);
                }
            }
            Expr::Repeat { expr, .. }
            | Expr::Lookahead { expr, .. }
            | Expr::Capture { expr, .. } => expr.walk(visit),
        }
    }

    /// Binding strength used when printing, higher binds tighter.
    fn precedence(&self) -> u8 {
        match self {
            Expr::Choice(only) | Expr::Sequence(only) if only.len() == 1 => only[0].precedence(),
            Expr::Choice(alternatives) if alternatives.len() > 1 => 0,
            Expr::Sequence(children) if children.len() > 1 => 1,
            Expr::Lookahead { .. } => 2,
            Expr::Capture {
                label, suppressed, ..
            } if label.is_some() || *suppressed => 2,
            Expr::Capture { expr, .. } => expr.precedence(),
            Expr::Repeat { .. } => 3,
            _ => 4,
        }
    }

    fn fmt_operand(&self, f: &mut fmt::Formatter<'_>, min_precedence: u8) -> fmt::Result {
        if self.precedence() < min_precedence {
            write!(f, "({})", self)
        } else {
            write!(f, "{}", self)
        }
    }
}

impl CharClass {
    /// Does `c` belong to the class?
    pub fn matches(&self, c: char) -> bool {
        match self {
            CharClass::Builtin(builtin) => builtin.matches(c),
            CharClass::Set { items, negated } => {
                let hit = items.iter().any(|item| match *item {
                    ClassItem::Single(single) => c == single,
                    ClassItem::Range(low, high) => (low..=high).contains(&c),
                });
                hit != *negated
            }
        }
    }

    /// Human-readable description used in "expected ..." diagnostics.
    pub fn describe(&self) -> String {
        match self {
            CharClass::Builtin(builtin) => builtin.description().to_string(),
            CharClass::Set { .. } => format!("character in {}", self),
        }
    }
}

impl Builtin {
    pub const ALL: &'static [Builtin] = &[
        Builtin::Any,
        Builtin::Newline,
        Builtin::NewlineCr,
        Builtin::NewlineLf,
        Builtin::DoubleQuote,
        Builtin::Ascii,
        Builtin::AsciiAlphabetic,
        Builtin::AsciiAlphanumeric,
        Builtin::AsciiControl,
        Builtin::AsciiDigit,
        Builtin::AsciiGraphic,
        Builtin::AsciiHexdigit,
        Builtin::AsciiLowercase,
        Builtin::AsciiPunctuation,
        Builtin::AsciiUppercase,
        Builtin::AsciiWhitespace,
        Builtin::Alphabetic,
        Builtin::Alphanumeric,
        Builtin::Control,
        Builtin::Lowercase,
        Builtin::Numeric,
        Builtin::Uppercase,
        Builtin::Whitespace,
    ];

    /// Looks up a built-in class by its grammar name (e.g. `B_ASCII_DIGIT`).
    ///
    /// # Examples
    ///
    /// ```rust
    /// use peggy::ast::Builtin;
    /// assert_eq!(Builtin::from_name("B_ASCII_DIGIT"), Some(Builtin::AsciiDigit));
    /// assert_eq!(Builtin::from_name("digit"), None);
    /// ```
    pub fn from_name(name: &str) -> Option<Self> {
        Self::ALL.iter().copied().find(|builtin| builtin.name() == name)
    }

    pub const fn name(self) -> &'static str {
        match self {
            Builtin::Any => "B_ANY",
            Builtin::Newline => "B_NEWLINE",
            Builtin::NewlineCr => "B_NEWLINE_CR",
            Builtin::NewlineLf => "B_NEWLINE_LF",
            Builtin::DoubleQuote => "B_DOUBLE_QUOTE",
            Builtin::Ascii => "B_ASCII",
            Builtin::AsciiAlphabetic => "B_ASCII_ALPHABETIC",
            Builtin::AsciiAlphanumeric => "B_ASCII_ALPHANUMERIC",
            Builtin::AsciiControl => "B_ASCII_CONTROL",
            Builtin::AsciiDigit => "B_ASCII_DIGIT",
            Builtin::AsciiGraphic => "B_ASCII_GRAPHIC",
            Builtin::AsciiHexdigit => "B_ASCII_HEXDIGIT",
            Builtin::AsciiLowercase => "B_ASCII_LOWERCASE",
            Builtin::AsciiPunctuation => "B_ASCII_PUNCTUATION",
            Builtin::AsciiUppercase => "B_ASCII_UPPERCASE",
            Builtin::AsciiWhitespace => "B_ASCII_WHITESPACE",
            Builtin::Alphabetic => "B_ALPHABETIC",
            Builtin::Alphanumeric => "B_ALPHANUMERIC",
            Builtin::Control => "B_CONTROL",
            Builtin::Lowercase => "B_LOWERCASE",
            Builtin::Numeric => "B_NUMERIC",
            Builtin::Uppercase => "B_UPPERCASE",
            Builtin::Whitespace => "B_WHITESPACE",
        }
    }

    pub const fn description(self) -> &'static str {
        match self {
            Builtin::Any => "any character",
            Builtin::Newline => "newline",
            Builtin::NewlineCr => "carriage return",
            Builtin::NewlineLf => "line feed",
            Builtin::DoubleQuote => "double quote",
            Builtin::Ascii => "ASCII character",
            Builtin::AsciiAlphabetic => "ASCII letter",
            Builtin::AsciiAlphanumeric => "ASCII letter or digit",
            Builtin::AsciiControl => "ASCII control character",
            Builtin::AsciiDigit => "ASCII digit",
            Builtin::AsciiGraphic => "ASCII graphic character",
            Builtin::AsciiHexdigit => "hexadecimal digit",
            Builtin::AsciiLowercase => "lowercase ASCII letter",
            Builtin::AsciiPunctuation => "ASCII punctuation",
            Builtin::AsciiUppercase => "uppercase ASCII letter",
            Builtin::AsciiWhitespace => "ASCII whitespace",
            Builtin::Alphabetic => "letter",
            Builtin::Alphanumeric => "letter or digit",
            Builtin::Control => "control character",
            Builtin::Lowercase => "lowercase letter",
            Builtin::Numeric => "numeric character",
            Builtin::Uppercase => "uppercase letter",
            Builtin::Whitespace => "whitespace",
        }
    }

    pub fn matches(self, c: char) -> bool {
        match self {
            Builtin::Any => true,
            Builtin::Newline => c == '\n' || c == '\r',
            Builtin::NewlineCr => c == '\r',
            Builtin::NewlineLf => c == '\n',
            Builtin::DoubleQuote => c == '"',
            Builtin::Ascii => c.is_ascii(),
            Builtin::AsciiAlphabetic => c.is_ascii_alphabetic(),
            Builtin::AsciiAlphanumeric => c.is_ascii_alphanumeric(),
            Builtin::AsciiControl => c.is_ascii_control(),
            Builtin::AsciiDigit => c.is_ascii_digit(),
            Builtin::AsciiGraphic => c.is_ascii_graphic(),
            Builtin::AsciiHexdigit => c.is_ascii_hexdigit(),
            Builtin::AsciiLowercase => c.is_ascii_lowercase(),
            Builtin::AsciiPunctuation => c.is_ascii_punctuation(),
            Builtin::AsciiUppercase => c.is_ascii_uppercase(),
            Builtin::AsciiWhitespace => c.is_ascii_whitespace(),
            Builtin::Alphabetic => c.is_alphabetic(),
            Builtin::Alphanumeric => c.is_alphanumeric(),
            Builtin::Control => c.is_control(),
            Builtin::Lowercase => c.is_lowercase(),
            Builtin::Numeric => c.is_numeric(),
            Builtin::Uppercase => c.is_uppercase(),
            Builtin::Whitespace => c.is_whitespace(),
        }
    }
}

/// Escapes a character for display inside a literal (`in_set == false`) or a
/// bracketed set (`in_set == true`).
pub fn escape_char(c: char, in_set: bool) -> String {
    match c {
        '\\' => "\\\\".into(),
        '\n' => "\\n".into(),
        '\r' => "\\r".into(),
        '\t' => "\\t".into(),
        '\0' => "\\0".into(),
        '"' if !in_set => "\\\"".into(),
        ']' | '-' | '^' if in_set => format!("\\{}", c),
        c if c.is_control() => format!("\\u{{{:x}}}", c as u32),
        c => c.to_string(),
    }
}

// ============================================================================
// DISPLAY: grammar surface syntax
// ============================================================================

impl fmt::Display for Expr {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Expr::Literal(text) => {
                f.write_str("\"")?;
                for c in text.chars() {
                    f.write_str(&escape_char(c, false))?;
                }
                f.write_str("\"")
            }
            Expr::Class(class) => write!(f, "{}", class),
            Expr::Rule { name, .. } => f.write_str(name),
            Expr::Sequence(children) => {
                if children.is_empty() {
                    return f.write_str("\"\"");
                }
                for (i, child) in children.iter().enumerate() {
                    if i > 0 {
                        f.write_str(" ")?;
                    }
                    child.fmt_operand(f, 2)?;
                }
                Ok(())
            }
            Expr::Choice(alternatives) => {
                for (i, alternative) in alternatives.iter().enumerate() {
                    if i > 0 {
                        f.write_str(" | ")?;
                    }
                    alternative.fmt_operand(f, 1)?;
                }
                Ok(())
            }
            Expr::Repeat { expr, min, max, .. } => {
                expr.fmt_operand(f, 3)?;
                match (*min, *max) {
                    (0, None) => f.write_str("*"),
                    (1, None) => f.write_str("+"),
                    (0, Some(1)) => f.write_str("?"),
                    (min, None) => write!(f, "{{{},}}", min),
                    (0, Some(max)) => write!(f, "{{,{}}}", max),
                    (min, Some(max)) if min == max => write!(f, "{{{}}}", min),
                    (min, Some(max)) => write!(f, "{{{},{}}}", min, max),
                }
            }
            Expr::Lookahead { expr, polarity } => {
                f.write_str(match polarity {
                    Polarity::Positive => "&",
                    Polarity::Negative => "!",
                })?;
                expr.fmt_operand(f, 2)
            }
            Expr::Capture {
                expr,
                label,
                suppressed,
            } => {
                if *suppressed {
                    f.write_str("°")?;
                }
                if let Some(label) = label {
                    write!(f, "{}:", label)?;
                }
                if *suppressed || label.is_some() {
                    expr.fmt_operand(f, 2)
                } else {
                    write!(f, "{}", expr)
                }
            }
        }
    }
}

impl fmt::Display for CharClass {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            CharClass::Builtin(builtin) => f.write_str(builtin.name()),
            CharClass::Set { items, negated } => {
                f.write_str("[")?;
                if *negated {
                    f.write_str("^")?;
                }
                for item in items {
                    match *item {
                        ClassItem::Single(c) => f.write_str(&escape_char(c, true))?,
                        ClassItem::Range(low, high) => write!(
                            f,
                            "{}-{}",
                            escape_char(low, true),
                            escape_char(high, true)
                        )?,
                    }
                }
                f.write_str("]")
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn builtin_names_round_trip() {
        for builtin in Builtin::ALL {
            assert_eq!(Builtin::from_name(builtin.name()), Some(*builtin));
            assert!(builtin.name().starts_with(BUILTIN_PREFIX));
        }
    }

    #[test]
    fn negated_set_inverts_membership() {
        let class = CharClass::Set {
            items: vec![ClassItem::Single('"'), ClassItem::Range('0', '9')],
            negated: true,
        };
        assert!(!class.matches('"'));
        assert!(!class.matches('5'));
        assert!(class.matches('a'));
    }

    #[test]
    fn display_parenthesises_by_precedence() {
        let expr = Expr::seq(vec![
            Expr::zero_or_more(Expr::choice(vec![Expr::literal("a"), Expr::rule("b")])),
            Expr::suppress(Expr::builtin(Builtin::AsciiDigit)),
            Expr::not_followed_by(Expr::builtin(Builtin::Any)),
        ]);
        assert_eq!(expr.to_string(), r#"("a" | b)* °B_ASCII_DIGIT !B_ANY"#);
    }

    #[test]
    fn display_renders_bounds_and_labels() {
        let expr = Expr::labelled("digits", Expr::repeat(Expr::rule("d"), 2, Some(4)));
        assert_eq!(expr.to_string(), "digits:d{2,4}");
        assert_eq!(Expr::repeat(Expr::rule("d"), 3, Some(3)).to_string(), "d{3}");
        assert_eq!(Expr::literal("a\"b").to_string(), r#""a\"b""#);
    }
}
