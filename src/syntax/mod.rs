//! Grammar source loading.
//!
//! Turns grammar text into a list of [`RuleDef`]s. Nothing here knows about
//! rule resolution; the [`grammar`](crate::grammar) module compiles the
//! definitions and validates them.

pub(crate) mod lexer;
pub mod parser;

pub use parser::{parse_rules, RuleDef};
