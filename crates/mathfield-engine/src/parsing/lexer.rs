//! # Lexer - Tokenizing Linear Math
//!
//! Breaks calchub linear text into tokens using the [Logos] lexer generator.
//!
//! [Logos]: https://docs.rs/logos
//!
//! Tokens are context-free. The lexer doesn't know whether `,` separates
//! command arguments or matrix cells, or whether a letter run is a function
//! name; that's the parser's job.
//!
//! Spans are in **characters**, not bytes, because the printer's source map
//! is indexed per character.

use std::ops::Range;

use logos::Logos;

#[derive(Logos, Debug, Clone, Copy, PartialEq, Eq)]
pub enum TokenKind {
    #[regex(r"[ \t\r\n]+")]
    Whitespace,

    /// `\h<hex>;` escaped text
    #[regex(r"\\h[0-9a-fA-F]*;")]
    Hex,

    /// `\frac`, `\pi`, `\cdot`, ...
    #[regex(r"\\[A-Za-z]+")]
    Command,

    #[regex(r"[0-9]+(\.[0-9]*)?")]
    #[regex(r"\.[0-9]+")]
    Number,

    /// A single letter; names are split so `xy` is two symbols
    #[regex(r"[A-Za-z]")]
    Letter,

    #[token("+")]
    Plus,

    #[token("-")]
    Minus,

    #[token("*")]
    Star,

    #[token("/")]
    Slash,

    #[token("=")]
    Eq,

    #[token("<")]
    Lt,

    #[token(">")]
    Gt,

    #[token(",")]
    Comma,

    #[token(";")]
    Semicolon,

    #[token("!")]
    Bang,

    #[token("^")]
    Caret,

    #[token("_")]
    Underscore,

    #[token("(")]
    LParen,

    #[token(")")]
    RParen,

    #[token("{")]
    LBrace,

    #[token("}")]
    RBrace,

    #[token("[")]
    LBracket,

    #[token("]")]
    RBracket,

    #[token("|")]
    Pipe,
}

/// A lexed token. `kind` is `None` for characters the lexer doesn't know.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Token<'a> {
    pub kind: Option<TokenKind>,
    pub text: &'a str,
    pub span: Range<usize>,
}

impl Token<'_> {
    pub fn is(&self, kind: TokenKind) -> bool {
        self.kind == Some(kind)
    }
}

/// Lex the input, keeping whitespace and unknown characters as tokens.
pub fn lex(input: &str) -> Vec<Token<'_>> {
    let offsets = char_offsets(input);
    let mut tokens = Vec::new();
    let mut lexer = TokenKind::lexer(input);

    while let Some(result) = lexer.next() {
        let bytes = lexer.span();
        let span = offsets[bytes.start]..offsets[bytes.end];
        tokens.push(Token {
            kind: result.ok(),
            text: lexer.slice(),
            span,
        });
    }

    tokens
}

/// Character index for every byte boundary of `input`.
fn char_offsets(input: &str) -> Vec<usize> {
    let mut offsets = vec![0; input.len() + 1];
    let mut count = 0;
    for (byte, ch) in input.char_indices() {
        for k in 0..ch.len_utf8() {
            offsets[byte + k] = count;
        }
        count += 1;
    }
    offsets[input.len()] = count;
    offsets
}
