//! Compiled grammars.
//!
//! A [`Grammar`] is built once from source text (or through a
//! [`GrammarBuilder`]), validated eagerly and immutable afterwards. Rules are
//! stored in a [`RuleTable`] and referenced by name; the evaluator resolves
//! references lazily through the table, so recursive rules never form owning
//! cycles.
//!
//! Rules named `E_...` are *external*: the caller supplies their matcher
//! through [`GrammarBuilder::external`], and grammar text may reference them
//! like any other rule.

use std::collections::{HashMap, HashSet};
use std::fmt;
use std::sync::Arc;

use tracing::{debug, warn};

use crate::ast::{is_reserved_name, Expr, ParseTree, Span, EXTERNAL_PREFIX};
use crate::errors::{GrammarError, ParseError, SourceContext};
use crate::runtime::{self, ParseOptions};
use crate::syntax::parse_rules;

pub(crate) mod validators;

use validators::GrammarValidators;

/// Name of the rule every grammar must define.
pub const ENTRY_RULE: &str = "main";

// ============================================================================
// RULE TABLE
// ============================================================================

/// Index of a rule inside its [`RuleTable`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct RuleId(pub(crate) usize);

/// A named rule.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Rule {
    pub name: Arc<str>,
    pub expr: Expr,
    /// Location of the rule name in the grammar source.
    pub span: Span,
    /// Silent rules never produce a node of their own. Computed when the
    /// grammar is validated.
    pub silent: bool,
}

/// Caller-supplied matcher for an external rule. It receives the input from
/// the current position onwards and returns how many bytes it consumes, or
/// `None` if it does not match.
pub type ExternalMatcher = dyn Fn(&str) -> Option<usize> + Send + Sync;

/// An `E_` rule backed by a caller-supplied matcher.
#[derive(Clone)]
pub struct ExternalRule {
    pub name: Arc<str>,
    matcher: Arc<ExternalMatcher>,
}

impl ExternalRule {
    pub fn matches(&self, rest: &str) -> Option<usize> {
        (self.matcher)(rest)
    }
}

impl fmt::Debug for ExternalRule {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ExternalRule")
            .field("name", &self.name)
            .finish_non_exhaustive()
    }
}

/// Named rules in definition order.
#[derive(Debug, Clone)]
pub struct RuleTable {
    rules: Vec<Rule>,
    index: HashMap<Arc<str>, RuleId>,
    externals: HashMap<Arc<str>, ExternalRule>,
    source: SourceContext,
}

impl RuleTable {
    pub fn new(source: SourceContext) -> Self {
        Self {
            rules: Vec::new(),
            index: HashMap::new(),
            externals: HashMap::new(),
            source,
        }
    }

    /// Registers a rule.
    ///
    /// Fails with `DuplicateRule` if the name is taken and with
    /// `ReservedRuleName` for names in the built-in or external namespaces.
    pub fn define(&mut self, name: &str, expr: Expr, span: Span) -> Result<RuleId, GrammarError> {
        if is_reserved_name(name) {
            return Err(self.source.reserved_rule_name(name, span));
        }
        if let Some(existing) = self.index.get(name) {
            let first = self.rules[existing.0].span;
            return Err(self.source.duplicate_rule(name, span, first));
        }

        let id = RuleId(self.rules.len());
        let name: Arc<str> = Arc::from(name);
        self.index.insert(Arc::clone(&name), id);
        self.rules.push(Rule {
            name,
            expr,
            span,
            silent: false,
        });
        Ok(id)
    }

    /// Registers the matcher of an external rule. Its name must start with
    /// `E_`.
    pub fn define_external(
        &mut self,
        name: &str,
        matcher: Arc<ExternalMatcher>,
    ) -> Result<(), GrammarError> {
        if !name.starts_with(EXTERNAL_PREFIX) || name.len() == EXTERNAL_PREFIX.len() {
            return Err(self.source.malformed(
                format!("external rule '{}' must be named 'E_<name>'", name),
                Span::default(),
                Some("external rules live in the 'E_' namespace"),
            ));
        }
        if self.externals.contains_key(name) {
            return Err(self.source.duplicate_rule(name, Span::default(), Span::default()));
        }

        let name: Arc<str> = Arc::from(name);
        self.externals
            .insert(Arc::clone(&name), ExternalRule { name, matcher });
        Ok(())
    }

    pub fn external(&self, name: &str) -> Option<&ExternalRule> {
        self.externals.get(name)
    }

    pub fn externals(&self) -> impl Iterator<Item = &ExternalRule> {
        self.externals.values()
    }

    fn mark_silent(&mut self, silent: &[bool]) {
        for (rule, &flag) in self.rules.iter_mut().zip(silent) {
            rule.silent = flag;
        }
    }

    /// Resolves a reference made from rule `referenced_from` at `span`.
    pub fn resolve(
        &self,
        name: &str,
        referenced_from: &str,
        span: Span,
    ) -> Result<RuleId, GrammarError> {
        self.id_of(name)
            .ok_or_else(|| self.source.undefined_rule(name, referenced_from, span))
    }

    pub fn id_of(&self, name: &str) -> Option<RuleId> {
        self.index.get(name).copied()
    }

    pub fn get(&self, id: RuleId) -> &Rule {
        &self.rules[id.0]
    }

    pub fn by_name(&self, name: &str) -> Option<&Rule> {
        self.id_of(name).map(|id| self.get(id))
    }

    pub fn iter(&self) -> impl Iterator<Item = (RuleId, &Rule)> {
        self.rules.iter().enumerate().map(|(i, rule)| (RuleId(i), rule))
    }

    pub fn len(&self) -> usize {
        self.rules.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rules.is_empty()
    }

    pub fn source(&self) -> &SourceContext {
        &self.source
    }
}

// ============================================================================
// GRAMMAR
// ============================================================================

/// A validated, immutable grammar. Safe to share across threads.
#[derive(Debug, Clone)]
pub struct Grammar {
    table: RuleTable,
    entry: RuleId,
}

/// Compiles grammar source text.
///
/// # Examples
///
/// ```rust
/// let grammar = peggy::compile_grammar(r#"main = "a"+"#).unwrap();
/// assert!(grammar.parse("aaa").is_ok());
/// ```
pub fn compile_grammar(src: &str) -> Result<Grammar, GrammarError> {
    Grammar::compile(src)
}

impl Grammar {
    pub fn compile(src: &str) -> Result<Self, GrammarError> {
        Self::compile_named("grammar", src)
    }

    /// Compiles `src`, naming it `name` in diagnostics (usually a file path).
    pub fn compile_named(name: &str, src: &str) -> Result<Self, GrammarError> {
        GrammarBuilder::from_source(name, src)?.build()
    }

    pub fn builder() -> GrammarBuilder {
        GrammarBuilder::default()
    }

    /// Runs every static check and freezes the table.
    fn from_table(mut table: RuleTable) -> Result<Self, GrammarError> {
        GrammarValidators::check_rule_references(&table)?;
        let silent = GrammarValidators::silent_rules(&table);
        table.mark_silent(&silent);

        let entry = GrammarValidators::check_entry_rule(&table)?;
        GrammarValidators::check_repetition_bounds(&table)?;
        let nullable = GrammarValidators::nullable_rules(&table);
        GrammarValidators::check_nullable_repetitions(&table, &nullable)?;
        GrammarValidators::check_left_recursion(&table, &nullable)?;

        let grammar = Self { table, entry };
        grammar.log_summary();
        Ok(grammar)
    }

    fn log_summary(&self) {
        let silent: Vec<&str> = self
            .table
            .iter()
            .filter(|(_, rule)| rule.silent)
            .map(|(_, rule)| &*rule.name)
            .collect();
        debug!(
            rules = self.table.len(),
            externals = self.table.externals.len(),
            silent = ?silent,
            "compiled grammar {}",
            self.table.source().name()
        );

        let reachable = self.reachable_from(self.entry);
        for (id, rule) in self.table.iter() {
            if !reachable.contains(&id) {
                warn!(rule = %rule.name, "rule is not reachable from '{}'", ENTRY_RULE);
            }
        }
    }

    /// Rules reachable through references from `start`, including itself.
    pub fn reachable_from(&self, start: RuleId) -> HashSet<RuleId> {
        let mut seen = HashSet::from([start]);
        let mut pending = vec![start];

        while let Some(id) = pending.pop() {
            self.table.get(id).expr.walk(&mut |expr| {
                if let Expr::Rule { name, .. } = expr {
                    if let Some(callee) = self.table.id_of(name) {
                        if seen.insert(callee) {
                            pending.push(callee);
                        }
                    }
                }
            });
        }
        seen
    }

    pub fn rules(&self) -> &RuleTable {
        &self.table
    }

    pub fn rule(&self, name: &str) -> Option<&Rule> {
        self.table.by_name(name)
    }

    pub fn entry(&self) -> RuleId {
        self.entry
    }

    /// Parses `input` starting from `main` with default options.
    pub fn parse(&self, input: &str) -> Result<ParseTree, ParseError> {
        runtime::parse(self, input)
    }

    pub fn parse_with(&self, input: &str, options: &ParseOptions) -> Result<ParseTree, ParseError> {
        runtime::parse_with(self, input, options)
    }
}

// ============================================================================
// BUILDER
// ============================================================================

/// Assembles a grammar from expressions instead of source text.
///
/// # Examples
///
/// ```rust
/// use peggy::ast::{Builtin, Expr};
/// use peggy::grammar::Grammar;
///
/// let mut builder = Grammar::builder();
/// builder
///     .define("main", Expr::one_or_more(Expr::rule("digit")))?
///     .define("digit", Expr::builtin(Builtin::AsciiDigit))?;
/// let grammar = builder.build()?;
/// assert_eq!(grammar.parse("42")?.root().children.len(), 2);
/// # Ok::<(), Box<dyn std::error::Error>>(())
/// ```
#[derive(Debug, Clone)]
pub struct GrammarBuilder {
    table: RuleTable,
}

impl Default for GrammarBuilder {
    fn default() -> Self {
        Self {
            table: RuleTable::new(SourceContext::new("<builder>", "")),
        }
    }
}

impl GrammarBuilder {
    /// Starts from the rules declared in grammar source text, so that
    /// external matchers can be added before the grammar is validated.
    ///
    /// # Examples
    ///
    /// ```rust
    /// use std::sync::Arc;
    /// use peggy::grammar::GrammarBuilder;
    ///
    /// let mut builder = GrammarBuilder::from_source("grammar", "main = E_WORD (°\" \" E_WORD)*")?;
    /// builder.external(
    ///     "E_WORD",
    ///     Arc::new(|rest: &str| {
    ///         let len = rest.find(' ').unwrap_or(rest.len());
    ///         (len > 0).then_some(len)
    ///     }),
    /// )?;
    /// let grammar = builder.build()?;
    /// assert_eq!(grammar.parse("two words")?.find_all("E_WORD").len(), 2);
    /// # Ok::<(), Box<dyn std::error::Error>>(())
    /// ```
    pub fn from_source(name: &str, src: &str) -> Result<Self, GrammarError> {
        let source = SourceContext::new(name, src);
        let definitions = parse_rules(&source)?;

        let mut table = RuleTable::new(source);
        for definition in definitions {
            table.define(&definition.name, definition.expr, definition.span)?;
        }
        Ok(Self { table })
    }

    pub fn define(&mut self, name: &str, expr: Expr) -> Result<&mut Self, GrammarError> {
        self.table.define(name, expr, Span::default())?;
        Ok(self)
    }

    /// Supplies the matcher for the external rule `name`.
    pub fn external(
        &mut self,
        name: &str,
        matcher: Arc<ExternalMatcher>,
    ) -> Result<&mut Self, GrammarError> {
        self.table.define_external(name, matcher)?;
        Ok(self)
    }

    pub fn build(self) -> Result<Grammar, GrammarError> {
        Grammar::from_table(self.table)
    }
}
