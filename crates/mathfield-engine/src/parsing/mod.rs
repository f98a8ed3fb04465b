//! # Parsing
//!
//! The editor talks to an expression parser through [`MathParser`]. Parsing
//! feeds two features:
//!
//! - **Decoration**: the parser's per-character [`SyntaxRole`] map is
//!   projected onto blocks through the printer's source map.
//! - **Paste**: pasted linear text is parsed into an [`AstNode`] tree which
//!   the [`builder`] lowers into blocks.
//!
//! [`CalchubParser`] is the bundled implementation of the calchub linear
//! grammar. Hosts with their own math engine can plug in another parser.
//!
//! ## Modules
//!
//! - **`lexer`**: logos tokenizer
//! - **`parser`**: recursive-descent `CalchubParser`
//! - **`builder`**: AST to block lowering

pub mod builder;
pub mod lexer;
pub mod parser;

use std::ops::Range;

use serde::Serialize;

pub use builder::{BuildError, build_from_text, build_from_tree};
pub use parser::CalchubParser;

pub trait MathParser {
    fn parse(&self, text: &str, known_functions: &[String]) -> ParseResult;
}

/// Output of one parse.
///
/// `source_map` has one entry per character of the input, naming the
/// syntactic role of that character. It may be partially filled when
/// `error` is set.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ParseResult {
    pub tree: Option<AstNode>,
    pub error: Option<ParseError>,
    pub source_map: Vec<Option<SyntaxRole>>,
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct AstNode {
    pub kind: AstKind,
    /// Character range in the parsed text
    pub span: Range<usize>,
    pub children: Vec<AstNode>,
}

impl AstNode {
    pub fn leaf(kind: AstKind, span: Range<usize>) -> Self {
        Self {
            kind,
            span,
            children: Vec::new(),
        }
    }

    pub fn with_children(kind: AstKind, span: Range<usize>, children: Vec<AstNode>) -> Self {
        Self {
            kind,
            span,
            children,
        }
    }
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub enum AstKind {
    Empty,
    Number(String),
    /// Single letter or named symbol such as `pi`
    Symbol(String),
    /// Operator text; empty for implicit multiplication
    Binary(String),
    Unary(String),
    Postfix(String),
    /// Parenthesized expression
    Group,
    /// `[num, denom]`
    Fraction,
    /// `[index, inner]`, index may be `Empty`
    Radical,
    /// `[base, exponent]`
    Power,
    /// `[base, subscript]`
    Subscript,
    /// `[left bound, right bound, integrand, variable]`
    Integral,
    /// `[variable, inner]`
    Derivative,
    Differential,
    /// Cells in row-major order
    Matrix { rows: usize, cols: usize },
    /// Known function applied to its argument list
    Call(String),
}

#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "camelCase")]
pub enum SyntaxRole {
    Number,
    Variable,
    Constant,
    Operator,
    Function,
    Bracket,
    Structure,
}

#[derive(Clone, Debug, PartialEq, Eq, thiserror::Error)]
#[error("{message} at offset {offset}")]
pub struct ParseError {
    pub message: String,
    /// Character offset
    pub offset: usize,
}

impl ParseError {
    pub fn new(message: impl Into<String>, offset: usize) -> Self {
        Self {
            message: message.into(),
            offset,
        }
    }
}
