//! Recursive-descent parser turning grammar tokens into rule definitions.
//!
//! Precedence, loosest first: choice `|`, sequence, prefixes (`! & ° label:`),
//! suffixes (`* + ? {n,m}`), primaries.

use super::lexer::{tokenize, Token, TokenKind};
use crate::ast::{is_reserved_name, Builtin, Expr, Polarity, Span};
use crate::errors::{GrammarError, SourceContext};

/// One `name = expr` declaration, in source order.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RuleDef {
    pub name: String,
    pub span: Span,
    pub expr: Expr,
}

/// Parses grammar source text into its rule definitions.
///
/// Only syntax is checked here; references and structure are validated when
/// the definitions are compiled into a grammar.
pub fn parse_rules(ctx: &SourceContext) -> Result<Vec<RuleDef>, GrammarError> {
    let tokens = tokenize(ctx)?;
    let mut parser = Parser {
        ctx,
        tokens,
        pos: 0,
        nesting: 0,
    };

    let mut rules = Vec::new();
    while !parser.at_end() {
        rules.push(parser.rule()?);
    }
    Ok(rules)
}

const EXPRESSION_HELP: &str =
    "expected a literal, character set, rule name, group or prefixed expression";

/// Deepest allowed stack of groups and prefixes inside one expression.
pub const MAX_NESTING_DEPTH: usize = 256;

/// Remaining stack below which a new segment is allocated, and its size.
const RED_ZONE: usize = 64 * 1024;
const STACK_SEGMENT: usize = 1024 * 1024;

struct Parser<'a> {
    ctx: &'a SourceContext,
    tokens: Vec<Token>,
    pos: usize,
    /// Groups and prefixes currently open.
    nesting: usize,
}

impl Parser<'_> {
    fn at_end(&self) -> bool {
        self.pos >= self.tokens.len()
    }

    fn peek(&self) -> Option<&TokenKind> {
        self.tokens.get(self.pos).map(|t| &t.kind)
    }

    fn peek_at(&self, offset: usize) -> Option<&Token> {
        self.tokens.get(self.pos + offset)
    }

    fn advance(&mut self) -> Option<Token> {
        let token = self.tokens.get(self.pos).cloned();
        if token.is_some() {
            self.pos += 1;
        }
        token
    }

    fn eat(&mut self, kind: &TokenKind) -> bool {
        if self.peek() == Some(kind) {
            self.pos += 1;
            true
        } else {
            false
        }
    }

    /// Span of the current token, or an empty span at the end of the source.
    fn here(&self) -> Span {
        match self.tokens.get(self.pos) {
            Some(token) => token.span,
            None => {
                let end = self.ctx.content().len();
                Span::new(end, end)
            }
        }
    }

    /// A rule body ends at the end of input or where the next `name =` begins.
    fn at_rule_end(&self) -> bool {
        match (self.peek_at(0), self.peek_at(1)) {
            (None, _) => true,
            (Some(name), Some(assign)) => {
                matches!(name.kind, TokenKind::Ident(_)) && assign.kind == TokenKind::Assign
            }
            _ => false,
        }
    }

    fn at_sequence_end(&self) -> bool {
        self.at_rule_end() || matches!(self.peek(), Some(TokenKind::Pipe | TokenKind::RParen))
    }

    // ------------------------------------------------------------------------
    // Rules
    // ------------------------------------------------------------------------

    fn rule(&mut self) -> Result<RuleDef, GrammarError> {
        let (name, span) = match self.advance() {
            Some(Token {
                kind: TokenKind::Ident(name),
                span,
            }) => (name, span),
            Some(token) => {
                return Err(self.ctx.malformed(
                    format!("expected a rule declaration, found {}", token.kind.describe()),
                    token.span,
                    Some("rules are declared as `name = expression`"),
                ))
            }
            None => {
                return Err(self.ctx.malformed(
                    "expected a rule declaration",
                    self.here(),
                    None,
                ))
            }
        };

        if is_reserved_name(&name) {
            return Err(self.ctx.reserved_rule_name(&name, span));
        }

        if !self.eat(&TokenKind::Assign) {
            return Err(self.ctx.malformed(
                format!("expected '=' after rule name '{}'", name),
                self.here(),
                Some("you may have forgotten the assignment operator '='"),
            ));
        }

        if self.at_rule_end() {
            return Err(self.ctx.malformed(
                format!("rule '{}' has an empty body", name),
                span,
                Some(EXPRESSION_HELP),
            ));
        }

        let expr = self.choice()?;

        if !self.at_rule_end() {
            let stray = self.here();
            let found = self
                .peek()
                .map(TokenKind::describe)
                .unwrap_or_else(|| "end of grammar".to_string());
            let help = if self.peek() == Some(&TokenKind::RParen) {
                Some("this ')' has no matching '('")
            } else {
                None
            };
            return Err(self
                .ctx
                .malformed(format!("unexpected {}", found), stray, help));
        }

        Ok(RuleDef { name, span, expr })
    }

    // ------------------------------------------------------------------------
    // Expressions
    // ------------------------------------------------------------------------

    fn choice(&mut self) -> Result<Expr, GrammarError> {
        // A leading '|' is allowed so that alternatives can be aligned.
        self.eat(&TokenKind::Pipe);

        let mut alternatives = vec![self.sequence()?];
        while self.eat(&TokenKind::Pipe) {
            alternatives.push(self.sequence()?);
        }

        Ok(match alternatives.len() {
            1 => alternatives.remove(0),
            _ => Expr::Choice(alternatives),
        })
    }

    fn sequence(&mut self) -> Result<Expr, GrammarError> {
        let mut items = Vec::new();
        while !self.at_sequence_end() {
            items.push(self.prefixed()?);
        }

        match items.len() {
            0 => Err(self.ctx.malformed(
                "expected an expression",
                self.here(),
                Some(EXPRESSION_HELP),
            )),
            1 => Ok(items.remove(0)),
            _ => Ok(Expr::Sequence(items)),
        }
    }

    /// Every group and prefix passes through here, so this is where nesting
    /// is counted.
    fn prefixed(&mut self) -> Result<Expr, GrammarError> {
        if self.nesting >= MAX_NESTING_DEPTH {
            return Err(self.ctx.malformed(
                "expression nested too deeply",
                self.here(),
                Some("split the expression into smaller rules"),
            ));
        }

        self.nesting += 1;
        let expr = stacker::maybe_grow(RED_ZONE, STACK_SEGMENT, || self.prefix_chain());
        self.nesting -= 1;
        expr
    }

    fn prefix_chain(&mut self) -> Result<Expr, GrammarError> {
        match self.peek() {
            Some(TokenKind::Bang) => {
                self.pos += 1;
                Ok(Expr::Lookahead {
                    expr: Box::new(self.prefixed()?),
                    polarity: Polarity::Negative,
                })
            }
            Some(TokenKind::Amp) => {
                self.pos += 1;
                Ok(Expr::Lookahead {
                    expr: Box::new(self.prefixed()?),
                    polarity: Polarity::Positive,
                })
            }
            Some(TokenKind::Suppress) => {
                self.pos += 1;
                Ok(Expr::suppress(self.prefixed()?))
            }
            Some(TokenKind::Ident(label)) if self.at_label() => {
                let label = label.clone();
                self.pos += 2;
                let inner = self.prefixed()?;
                Ok(if label == "_" {
                    Expr::suppress(inner)
                } else {
                    Expr::labelled(&label, inner)
                })
            }
            _ => self.suffixed(),
        }
    }

    /// `label:` needs the colon directly after the identifier.
    fn at_label(&self) -> bool {
        match (self.peek_at(0), self.peek_at(1)) {
            (Some(ident), Some(colon)) => {
                colon.kind == TokenKind::Colon && ident.span.end == colon.span.start
            }
            _ => false,
        }
    }

    fn suffixed(&mut self) -> Result<Expr, GrammarError> {
        let start = self.here().start;
        let mut expr = self.primary()?;
        let mut depth = self.nesting;

        loop {
            let (min, max) = match self.peek() {
                Some(TokenKind::Star) => (0, None),
                Some(TokenKind::Plus) => (1, None),
                Some(TokenKind::Question) => (0, Some(1)),
                Some(TokenKind::Bounds { min, max }) => (*min, *max),
                _ => break,
            };
            depth += 1;
            if depth > MAX_NESTING_DEPTH {
                return Err(self.ctx.malformed(
                    "expression nested too deeply",
                    self.here(),
                    Some("split the expression into smaller rules"),
                ));
            }
            let end = self.here().end;
            self.pos += 1;
            expr = Expr::Repeat {
                expr: Box::new(expr),
                min,
                max,
                span: Span::new(start, end),
            };
        }

        Ok(expr)
    }

    fn primary(&mut self) -> Result<Expr, GrammarError> {
        let here = self.here();
        let Some(token) = self.advance() else {
            return Err(self
                .ctx
                .malformed("expected an expression", here, Some(EXPRESSION_HELP)));
        };

        match token.kind {
            TokenKind::Literal(text) => Ok(Expr::Literal(text)),
            TokenKind::Set { items, negated } => Ok(Expr::set(items, negated)),
            TokenKind::Ident(name) => Ok(match Builtin::from_name(&name) {
                Some(builtin) => Expr::builtin(builtin),
                None => Expr::Rule {
                    name,
                    span: token.span,
                },
            }),
            TokenKind::LParen => {
                let inner = self.choice()?;
                if !self.eat(&TokenKind::RParen) {
                    return Err(self.ctx.malformed(
                        "unclosed group",
                        token.span,
                        Some("add a ')' to close the group"),
                    ));
                }
                Ok(inner)
            }
            other => Err(self.ctx.malformed(
                format!("expected an expression, found {}", other.describe()),
                token.span,
                Some(EXPRESSION_HELP),
            )),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ast::ClassItem;

    fn rules(src: &str) -> Vec<RuleDef> {
        parse_rules(&SourceContext::new("grammar", src)).unwrap()
    }

    fn body(src: &str) -> Expr {
        rules(src).remove(0).expr
    }

    fn error(src: &str) -> String {
        parse_rules(&SourceContext::new("grammar", src))
            .unwrap_err()
            .to_string()
    }

    #[test]
    fn rules_may_span_lines() {
        let defs = rules("main = a\n  b\n  | c\na = \"x\"\nb=\"y\" c = \"z\"");
        let names: Vec<_> = defs.iter().map(|d| d.name.as_str()).collect();
        assert_eq!(names, vec!["main", "a", "b", "c"]);
        assert_eq!(defs[0].expr.to_string(), "a b | c");
        assert_eq!(defs[0].span, Span::new(0, 4));
    }

    #[test]
    fn leading_pipe_is_allowed() {
        assert_eq!(body("main =\n  | \"a\"\n  | \"b\"").to_string(), r#""a" | "b""#);
    }

    #[test]
    fn suffixes_bind_tighter_than_prefixes() {
        let expr = body("main = !\"a\"* b");
        match expr {
            Expr::Sequence(items) => match &items[0] {
                Expr::Lookahead { expr, polarity } => {
                    assert_eq!(*polarity, Polarity::Negative);
                    assert!(matches!(**expr, Expr::Repeat { min: 0, max: None, .. }));
                }
                other => panic!("expected lookahead, got {:?}", other),
            },
            other => panic!("expected sequence, got {:?}", other),
        }
    }

    #[test]
    fn builtins_resolve_to_classes() {
        assert_eq!(body("main = B_ASCII_DIGIT"), Expr::builtin(Builtin::AsciiDigit));
        assert_eq!(
            body("main = [0-9]"),
            Expr::set(vec![ClassItem::Range('0', '9')], false)
        );
    }

    #[test]
    fn suppression_and_labels() {
        assert_eq!(body("main = °\"a\""), Expr::suppress(Expr::literal("a")));
        assert_eq!(body("main = _:\"a\""), Expr::suppress(Expr::literal("a")));
        assert_eq!(
            body("main = key:\"a\""),
            Expr::labelled("key", Expr::literal("a"))
        );
    }

    #[test]
    fn separated_colon_is_not_a_label() {
        assert!(error("main = key : \"a\"").contains("found ':'"));
    }

    #[test]
    fn bounded_repetition() {
        match body("main = \"a\"{2,3}") {
            Expr::Repeat { min, max, span, .. } => {
                assert_eq!((min, max), (2, Some(3)));
                assert_eq!(span, Span::new(7, 15));
            }
            other => panic!("expected repetition, got {:?}", other),
        }
    }

    #[test]
    fn reports_syntax_errors() {
        assert!(error("main = (\"a\"").contains("unclosed group"));
        assert!(error("main = \"a\")").contains("unexpected ')'"));
        assert!(error("main =").contains("empty body"));
        assert!(error("main \"a\"").contains("expected '='"));
        assert!(error("main = a | ").contains("expected an expression"));
        assert!(error("B_DIGITS = \"1\"").contains("reserved"));
        assert!(error("E_IDENT = \"1\"").contains("reserved"));
    }

    #[test]
    fn deep_nesting_is_rejected() {
        let ok = MAX_NESTING_DEPTH / 2 - 1;
        let src = format!("main = {}\"a\"{}", "(".repeat(ok), ")".repeat(ok));
        assert_eq!(body(&src), Expr::literal("a"));

        let deep = 20_000;
        let src = format!("main = {}\"a\"{}", "(".repeat(deep), ")".repeat(deep));
        assert!(error(&src).contains("expression nested too deeply"));

        let prefixes = format!("main = {}\"a\"", "!".repeat(deep));
        assert!(error(&prefixes).contains("expression nested too deeply"));

        let suffixes = format!("main = \"a\"{}", "?".repeat(deep));
        assert!(error(&suffixes).contains("expression nested too deeply"));
    }
}
