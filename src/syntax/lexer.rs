//! Tokenizer for grammar source text.
//!
//! Comments are dropped here: `#` runs to the end of the line, and a line made
//! only of `###` opens or closes a block comment.

use crate::ast::{ClassItem, Span};
use crate::errors::{GrammarError, SourceContext};

#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) enum TokenKind {
    Ident(String),
    Literal(String),
    Set { items: Vec<ClassItem>, negated: bool },
    Bounds { min: usize, max: Option<usize> },
    Assign,
    Pipe,
    LParen,
    RParen,
    Star,
    Plus,
    Question,
    Bang,
    Amp,
    Suppress,
    Colon,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) struct Token {
    pub kind: TokenKind,
    pub span: Span,
}

impl TokenKind {
    pub(crate) fn describe(&self) -> String {
        match self {
            TokenKind::Ident(name) => format!("identifier '{}'", name),
            TokenKind::Literal(_) => "string literal".into(),
            TokenKind::Set { .. } => "character set".into(),
            TokenKind::Bounds { .. } => "repetition bounds".into(),
            TokenKind::Assign => "'='".into(),
            TokenKind::Pipe => "'|'".into(),
            TokenKind::LParen => "'('".into(),
            TokenKind::RParen => "')'".into(),
            TokenKind::Star => "'*'".into(),
            TokenKind::Plus => "'+'".into(),
            TokenKind::Question => "'?'".into(),
            TokenKind::Bang => "'!'".into(),
            TokenKind::Amp => "'&'".into(),
            TokenKind::Suppress => "'°'".into(),
            TokenKind::Colon => "':'".into(),
        }
    }
}

pub(crate) fn tokenize(ctx: &SourceContext) -> Result<Vec<Token>, GrammarError> {
    Lexer {
        ctx,
        src: ctx.content(),
        pos: 0,
    }
    .run()
}

struct Lexer<'a> {
    ctx: &'a SourceContext,
    src: &'a str,
    pos: usize,
}

impl<'a> Lexer<'a> {
    fn run(mut self) -> Result<Vec<Token>, GrammarError> {
        let mut tokens = Vec::new();

        while let Some(c) = self.peek() {
            let start = self.pos;

            if c.is_whitespace() {
                self.bump();
                continue;
            }

            if c == '#' {
                self.skip_comment()?;
                continue;
            }

            let kind = match c {
                c if c.is_ascii_alphabetic() || c == '_' => self.ident(),
                '"' => self.literal()?,
                '[' => self.set()?,
                '{' => self.bounds()?,
                '\'' => {
                    return Err(self.ctx.malformed(
                        "unexpected single quote",
                        Span::new(start, start + 1),
                        Some("strings require double quotes"),
                    ))
                }
                _ => {
                    self.bump();
                    match c {
                        '=' => TokenKind::Assign,
                        '|' => TokenKind::Pipe,
                        '(' => TokenKind::LParen,
                        ')' => TokenKind::RParen,
                        '*' => TokenKind::Star,
                        '+' => TokenKind::Plus,
                        '?' => TokenKind::Question,
                        '!' => TokenKind::Bang,
                        '&' => TokenKind::Amp,
                        '°' => TokenKind::Suppress,
                        ':' => TokenKind::Colon,
                        other => {
                            let help = if other.is_ascii_digit() {
                                Some("digits are not allowed to begin a rule name")
                            } else {
                                None
                            };
                            return Err(self.ctx.malformed(
                                format!("unexpected character '{}'", other),
                                Span::new(start, self.pos),
                                help,
                            ));
                        }
                    }
                }
            };

            tokens.push(Token {
                kind,
                span: Span::new(start, self.pos),
            });
        }

        Ok(tokens)
    }

    fn peek(&self) -> Option<char> {
        self.src[self.pos..].chars().next()
    }

    fn bump(&mut self) -> Option<char> {
        let c = self.peek()?;
        self.pos += c.len_utf8();
        Some(c)
    }

    fn eat(&mut self, expected: char) -> bool {
        if self.peek() == Some(expected) {
            self.bump();
            true
        } else {
            false
        }
    }

    fn ident(&mut self) -> TokenKind {
        let start = self.pos;
        while let Some(c) = self.peek() {
            if !(c.is_ascii_alphanumeric() || c == '_') {
                break;
            }
            self.bump();
        }
        TokenKind::Ident(self.src[start..self.pos].to_string())
    }

    // ------------------------------------------------------------------------
    // Comments
    // ------------------------------------------------------------------------

    fn line_bounds(&self, at: usize) -> (usize, usize) {
        let start = self.src[..at].rfind('\n').map_or(0, |i| i + 1);
        let end = self.src[at..].find('\n').map_or(self.src.len(), |i| at + i);
        (start, end)
    }

    fn is_block_delimiter(&self, at: usize) -> bool {
        let (start, end) = self.line_bounds(at);
        self.src[start..end].trim() == "###"
    }

    fn skip_comment(&mut self) -> Result<(), GrammarError> {
        let opening = self.pos;
        let (_, line_end) = self.line_bounds(opening);

        if !self.is_block_delimiter(opening) {
            self.pos = line_end;
            return Ok(());
        }

        let mut cursor = line_end;
        while cursor < self.src.len() {
            let line_start = cursor + 1;
            if line_start > self.src.len() {
                break;
            }
            let (_, end) = self.line_bounds(line_start.min(self.src.len()));
            if self.src[line_start..end].trim() == "###" {
                self.pos = end;
                return Ok(());
            }
            cursor = end;
        }

        Err(self.ctx.malformed(
            "unterminated block comment",
            Span::new(opening, opening + 3),
            Some("add '###' on a line of its own to close the comment"),
        ))
    }

    // ------------------------------------------------------------------------
    // Literals and sets
    // ------------------------------------------------------------------------

    fn literal(&mut self) -> Result<TokenKind, GrammarError> {
        let start = self.pos;
        self.bump();
        let mut text = String::new();

        loop {
            match self.bump() {
                Some('"') => return Ok(TokenKind::Literal(text)),
                Some('\\') => text.push(self.escape()?),
                Some('\n') | None => {
                    return Err(self.ctx.malformed(
                        "unterminated string literal",
                        Span::new(start, start + 1),
                        Some("close the string with '\"' on the same line"),
                    ))
                }
                Some(c) => text.push(c),
            }
        }
    }

    fn set(&mut self) -> Result<TokenKind, GrammarError> {
        let start = self.pos;
        self.bump();
        let negated = self.eat('^');
        let mut items = Vec::new();

        loop {
            let low = match self.bump() {
                Some(']') => break,
                Some('\\') => self.escape()?,
                Some('\n') | None => {
                    return Err(self.ctx.malformed(
                        "unterminated character set",
                        Span::new(start, start + 1),
                        Some("close the set with ']'"),
                    ))
                }
                Some(c) => c,
            };

            let is_range = self.peek() == Some('-') && !self.src[self.pos + 1..].starts_with(']');
            if !is_range {
                items.push(ClassItem::Single(low));
                continue;
            }

            self.bump();
            let high = match self.bump() {
                Some('\\') => self.escape()?,
                Some('\n') | None => {
                    return Err(self.ctx.malformed(
                        "unterminated character set",
                        Span::new(start, start + 1),
                        Some("close the set with ']'"),
                    ))
                }
                Some(c) => c,
            };
            if low > high {
                return Err(self.ctx.malformed(
                    format!("inverted character range '{}-{}'", low, high),
                    Span::new(start, self.pos),
                    Some("write ranges from the lower to the higher character"),
                ));
            }
            items.push(ClassItem::Range(low, high));
        }

        if items.is_empty() {
            return Err(self.ctx.malformed(
                "empty character set",
                Span::new(start, self.pos),
                None,
            ));
        }

        Ok(TokenKind::Set { items, negated })
    }

    /// Decodes the escape following a backslash.
    fn escape(&mut self) -> Result<char, GrammarError> {
        let start = self.pos - 1;
        let c = match self.bump() {
            Some('n') => '\n',
            Some('r') => '\r',
            Some('t') => '\t',
            Some('0') => '\0',
            Some(c @ ('\\' | '"' | '\'' | '[' | ']' | '-' | '^')) => c,
            Some('u') => return self.unicode_escape(start),
            _ => {
                return Err(self.ctx.malformed(
                    "unknown escape sequence",
                    Span::new(start, self.pos),
                    Some("supported escapes: \\n \\r \\t \\0 \\\\ \\\" \\u{...}"),
                ))
            }
        };
        Ok(c)
    }

    fn unicode_escape(&mut self, start: usize) -> Result<char, GrammarError> {
        let malformed = |lexer: &Self| {
            lexer.ctx.malformed(
                "malformed unicode escape",
                Span::new(start, lexer.pos),
                Some("write unicode escapes as \\u{1F600}"),
            )
        };

        if !self.eat('{') {
            return Err(malformed(&*self));
        }
        let src: &'a str = self.src;
        let digits_start = self.pos;
        while self.peek().is_some_and(|c| c.is_ascii_hexdigit()) {
            self.bump();
        }
        let digits = &src[digits_start..self.pos];
        if !self.eat('}') {
            return Err(malformed(&*self));
        }
        u32::from_str_radix(digits, 16)
            .ok()
            .and_then(char::from_u32)
            .ok_or_else(|| malformed(&*self))
    }

    // ------------------------------------------------------------------------
    // Repetition bounds
    // ------------------------------------------------------------------------

    fn number(&mut self) -> Result<Option<usize>, GrammarError> {
        while self.peek().is_some_and(|c| c == ' ' || c == '\t') {
            self.bump();
        }
        let start = self.pos;
        while self.peek().is_some_and(|c| c.is_ascii_digit()) {
            self.bump();
        }
        if start == self.pos {
            return Ok(None);
        }
        let value = self.src[start..self.pos].parse::<usize>().map_err(|_| {
            self.ctx
                .malformed("repetition bound is too large", Span::new(start, self.pos), None)
        })?;
        while self.peek().is_some_and(|c| c == ' ' || c == '\t') {
            self.bump();
        }
        Ok(Some(value))
    }

    fn bounds(&mut self) -> Result<TokenKind, GrammarError> {
        let start = self.pos;
        self.bump();

        let min = self.number()?;
        let (min, max) = if self.eat(',') {
            (min, self.number()?)
        } else {
            (min, min)
        };
        let closed = self.eat('}');

        let bounds = match (min, max) {
            (Some(min), max) if closed && self.src[start..self.pos].contains(',') => (min, max),
            (Some(min), Some(max)) if closed => (min, Some(max)),
            (None, Some(max)) if closed => (0, Some(max)),
            _ => {
                return Err(self.ctx.malformed(
                    "malformed repetition bounds",
                    Span::new(start, self.pos),
                    Some("use {n}, {n,}, {,m} or {n,m}"),
                ))
            }
        };

        if let (min, Some(max)) = bounds {
            if min > max {
                return Err(self.ctx.malformed(
                    format!(
                        "malformed repetition bounds: minimum {} exceeds maximum {}",
                        min, max
                    ),
                    Span::new(start, self.pos),
                    None,
                ));
            }
        }

        Ok(TokenKind::Bounds {
            min: bounds.0,
            max: bounds.1,
        })
    }
}
