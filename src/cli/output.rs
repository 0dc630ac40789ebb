//! Handles all user-facing output for the CLI.
//!
//! Colors are only used when stdout is a terminal, so piped output stays
//! plain and stable.

use std::io::{self, IsTerminal, Write};

use termcolor::{Color, ColorChoice, ColorSpec, StandardStream, WriteColor};

use crate::ast::ParseTree;
use crate::grammar::Grammar;

fn stdout() -> StandardStream {
    let choice = if io::stdout().is_terminal() {
        ColorChoice::Auto
    } else {
        ColorChoice::Never
    };
    StandardStream::stdout(choice)
}

/// Prints the tree as an indented outline: node names, then matched text.
pub fn print_tree(tree: &ParseTree) -> io::Result<()> {
    let mut out = stdout();
    write_tree(&mut out, tree)?;
    out.reset()
}

pub fn write_tree(out: &mut dyn WriteColor, tree: &ParseTree) -> io::Result<()> {
    let mut result = Ok(());
    tree.root().walk(&mut |node, depth| {
        if result.is_ok() {
            result = write_node(out, &node.name, tree.text(node), depth);
        }
    });
    result
}

fn write_node(out: &mut dyn WriteColor, name: &str, text: &str, depth: usize) -> io::Result<()> {
    write!(out, "{:indent$}", "", indent = depth * 2)?;
    out.set_color(ColorSpec::new().set_fg(Some(Color::Cyan)).set_bold(true))?;
    write!(out, "{}", name)?;
    out.set_color(ColorSpec::new().set_fg(Some(Color::Green)))?;
    writeln!(out, " {:?}", text)?;
    out.reset()
}

pub fn print_json(tree: &ParseTree) -> io::Result<()> {
    let json = serde_json::to_string_pretty(tree)?;
    let mut out = io::stdout().lock();
    writeln!(out, "{}", json)
}

/// Lists the rules of a grammar, marking the entry rule and silent rules.
pub fn print_rules(grammar: &Grammar) -> io::Result<()> {
    let mut out = stdout();
    let rules = grammar.rules();

    for (id, rule) in rules.iter() {
        out.set_color(ColorSpec::new().set_fg(Some(Color::Cyan)).set_bold(true))?;
        write!(out, "{}", rule.name)?;
        out.reset()?;
        if id == grammar.entry() {
            write!(out, " (entry)")?;
        }
        if rule.silent {
            write!(out, " (silent)")?;
        }
        writeln!(out, " = {}", rule.expr)?;
    }

    out.set_color(ColorSpec::new().set_fg(Some(Color::Green)).set_bold(true))?;
    writeln!(out, "ok: {} rules", rules.len())?;
    out.reset()
}
