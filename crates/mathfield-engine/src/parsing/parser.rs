//! Recursive-descent parser for the calchub linear grammar.
//!
//! Precedence, loosest first:
//!
//! | level          | operators                                  |
//! |----------------|--------------------------------------------|
//! | list           | `,` (only outside command arguments)       |
//! | relation       | `=` `<` `>` `\le` `\ge` `\ne`              |
//! | sum            | `+` `-` `\pm`                              |
//! | product        | `*` `/` `\cdot` `\times`, juxtaposition    |
//! | sign           | prefix `-` `+`                             |
//! | postfix        | `_sub` `^{sup}` `!`                        |
//!
//! Letter runs are split into single-letter symbols unless a known function
//! name (longest match first) prefixes the run and is followed by `(`.

use std::ops::Range;

use super::lexer::{Token, TokenKind, lex};
use super::{AstKind, AstNode, MathParser, ParseError, ParseResult, SyntaxRole};
use crate::printing::Output;

#[derive(Copy, Clone, Debug, PartialEq, Eq)]
enum OpClass {
    Relation,
    Sum,
    Product,
}

const NAMED_OPERATORS: &[(&str, OpClass)] = &[
    ("le", OpClass::Relation),
    ("ge", OpClass::Relation),
    ("ne", OpClass::Relation),
    ("pm", OpClass::Sum),
    ("cdot", OpClass::Product),
    ("times", OpClass::Product),
];

fn operator_class(name: &str) -> Option<OpClass> {
    NAMED_OPERATORS
        .iter()
        .find(|(op, _)| *op == name)
        .map(|(_, class)| *class)
}

/// Whether `name` is a named operator such as `cdot`.
pub fn is_operator_name(name: &str) -> bool {
    operator_class(name).is_some()
}

#[derive(Clone, Copy, Debug, Default)]
pub struct CalchubParser;

impl MathParser for CalchubParser {
    fn parse(&self, text: &str, known_functions: &[String]) -> ParseResult {
        let tokens: Vec<Token<'_>> = lex(text)
            .into_iter()
            .filter(|token| !token.is(TokenKind::Whitespace))
            .collect();
        let end = text.chars().count();
        let mut parser = Parser {
            tokens: &tokens,
            pos: 0,
            known: known_functions,
            roles: vec![None; end],
            end,
        };
        match parser.root() {
            Ok(tree) => ParseResult {
                tree: Some(tree),
                error: None,
                source_map: parser.roles,
            },
            Err(error) => ParseResult {
                tree: None,
                error: Some(error),
                source_map: parser.roles,
            },
        }
    }
}

struct Parser<'t, 'a> {
    tokens: &'t [Token<'a>],
    pos: usize,
    known: &'t [String],
    roles: Vec<Option<SyntaxRole>>,
    end: usize,
}

fn empty(at: usize) -> AstNode {
    AstNode::leaf(AstKind::Empty, at..at)
}

fn binary(op: &str, lhs: AstNode, rhs: AstNode) -> AstNode {
    wrap(AstKind::Binary(op.to_string()), lhs, rhs)
}

fn wrap(kind: AstKind, first: AstNode, second: AstNode) -> AstNode {
    let span = first.span.start..second.span.end.max(first.span.end);
    AstNode::with_children(kind, span, vec![first, second])
}

/// Pin a subtree parsed from decoded text onto the span of its escape.
fn respan(mut node: AstNode, span: &Range<usize>) -> AstNode {
    node.span = span.clone();
    node.children = node
        .children
        .into_iter()
        .map(|child| respan(child, span))
        .collect();
    node
}

impl<'t, 'a> Parser<'t, 'a> {
    fn root(&mut self) -> Result<AstNode, ParseError> {
        if self.tokens.is_empty() {
            return Ok(empty(0));
        }
        let node = self.expr(true)?;
        match self.peek() {
            Some(token) => Err(self.unexpected(token)),
            None => Ok(node),
        }
    }

    fn peek(&self) -> Option<&'t Token<'a>> {
        let tokens = self.tokens;
        tokens.get(self.pos)
    }

    fn nth(&self, n: usize) -> Option<&'t Token<'a>> {
        let tokens = self.tokens;
        tokens.get(self.pos + n)
    }

    fn peek_kind(&self) -> Option<TokenKind> {
        self.peek().and_then(|token| token.kind)
    }

    fn at(&self, kind: TokenKind) -> bool {
        self.peek_kind() == Some(kind)
    }

    fn offset(&self) -> usize {
        self.peek().map_or(self.end, |token| token.span.start)
    }

    fn mark(&mut self, span: Range<usize>, role: SyntaxRole) {
        for i in span {
            if let Some(slot) = self.roles.get_mut(i) {
                *slot = Some(role);
            }
        }
    }

    fn bump(&mut self, role: SyntaxRole) -> Result<&'t Token<'a>, ParseError> {
        let token = self
            .peek()
            .ok_or_else(|| ParseError::new("unexpected end of input", self.end))?;
        self.pos += 1;
        self.mark(token.span.clone(), role);
        Ok(token)
    }

    fn expect(
        &mut self,
        kind: TokenKind,
        role: SyntaxRole,
        what: &str,
    ) -> Result<&'t Token<'a>, ParseError> {
        match self.peek() {
            Some(token) if token.is(kind) => self.bump(role),
            Some(token) => Err(ParseError::new(
                format!("expected {what}, found '{}'", token.text),
                token.span.start,
            )),
            None => Err(ParseError::new(format!("expected {what}"), self.end)),
        }
    }

    fn unexpected(&self, token: &Token<'_>) -> ParseError {
        match token.kind {
            Some(_) => ParseError::new(format!("unexpected '{}'", token.text), token.span.start),
            None => ParseError::new(
                format!("unrecognised character '{}'", token.text),
                token.span.start,
            ),
        }
    }

    fn expr(&mut self, commas: bool) -> Result<AstNode, ParseError> {
        let mut lhs = self.relation()?;
        while commas && self.at(TokenKind::Comma) {
            self.bump(SyntaxRole::Operator)?;
            let rhs = self.relation()?;
            lhs = binary(",", lhs, rhs);
        }
        Ok(lhs)
    }

    fn relation(&mut self) -> Result<AstNode, ParseError> {
        let mut lhs = self.sum()?;
        while let Some(op) = self.operator(OpClass::Relation)? {
            let rhs = self.sum()?;
            lhs = binary(&op, lhs, rhs);
        }
        Ok(lhs)
    }

    fn sum(&mut self) -> Result<AstNode, ParseError> {
        let mut lhs = self.product()?;
        while let Some(op) = self.operator(OpClass::Sum)? {
            let rhs = self.product()?;
            lhs = binary(&op, lhs, rhs);
        }
        Ok(lhs)
    }

    fn product(&mut self) -> Result<AstNode, ParseError> {
        let mut lhs = self.sign()?;
        loop {
            if let Some(op) = self.operator(OpClass::Product)? {
                let rhs = self.sign()?;
                lhs = binary(&op, lhs, rhs);
            } else if self.starts_operand() {
                let rhs = self.postfix()?;
                lhs = binary("", lhs, rhs);
            } else {
                return Ok(lhs);
            }
        }
    }

    /// Consume the next token if it is an operator of `class`.
    fn operator(&mut self, class: OpClass) -> Result<Option<String>, ParseError> {
        let Some(token) = self.peek() else {
            return Ok(None);
        };
        let op = match token.kind {
            Some(TokenKind::Eq | TokenKind::Lt | TokenKind::Gt) if class == OpClass::Relation => {
                token.text
            }
            Some(TokenKind::Plus | TokenKind::Minus) if class == OpClass::Sum => token.text,
            Some(TokenKind::Star | TokenKind::Slash) if class == OpClass::Product => token.text,
            Some(TokenKind::Command) if operator_class(&token.text[1..]) == Some(class) => {
                &token.text[1..]
            }
            _ => return Ok(None),
        };
        self.bump(SyntaxRole::Operator)?;
        Ok(Some(op.to_string()))
    }

    fn starts_operand(&self) -> bool {
        match self.peek() {
            Some(token) => match token.kind {
                Some(TokenKind::Number | TokenKind::Letter | TokenKind::LParen) => true,
                Some(TokenKind::Command) => !is_operator_name(&token.text[1..]),
                _ => false,
            },
            None => false,
        }
    }

    fn sign(&mut self) -> Result<AstNode, ParseError> {
        match self.peek() {
            Some(token) if token.is(TokenKind::Minus) || token.is(TokenKind::Plus) => {
                self.bump(SyntaxRole::Operator)?;
                let operand = self.sign()?;
                let span = token.span.start..operand.span.end;
                Ok(AstNode::with_children(
                    AstKind::Unary(token.text.to_string()),
                    span,
                    vec![operand],
                ))
            }
            _ => self.postfix(),
        }
    }

    fn postfix(&mut self) -> Result<AstNode, ParseError> {
        let mut node = self.primary()?;
        loop {
            match self.peek_kind() {
                Some(TokenKind::Underscore) => {
                    self.bump(SyntaxRole::Structure)?;
                    let sub = self.subscript()?;
                    node = wrap(AstKind::Subscript, node, sub);
                }
                Some(TokenKind::Caret) => {
                    self.bump(SyntaxRole::Structure)?;
                    let exponent = self.exponent()?;
                    node = wrap(AstKind::Power, node, exponent);
                }
                Some(TokenKind::Bang) => {
                    let bang = self.bump(SyntaxRole::Operator)?;
                    let span = node.span.start..bang.span.end;
                    node = AstNode::with_children(AstKind::Postfix("!".into()), span, vec![node]);
                }
                _ => return Ok(node),
            }
        }
    }

    fn exponent(&mut self) -> Result<AstNode, ParseError> {
        if self.at(TokenKind::LBrace) {
            self.bump(SyntaxRole::Structure)?;
            let inner = self.arg()?;
            self.expect(TokenKind::RBrace, SyntaxRole::Structure, "'}'")?;
            return Ok(inner);
        }
        match self.peek() {
            Some(token) if token.is(TokenKind::Minus) => {
                self.bump(SyntaxRole::Operator)?;
                let operand = self.primary()?;
                let span = token.span.start..operand.span.end;
                Ok(AstNode::with_children(
                    AstKind::Unary("-".into()),
                    span,
                    vec![operand],
                ))
            }
            _ => self.primary(),
        }
    }

    fn subscript(&mut self) -> Result<AstNode, ParseError> {
        let Some(token) = self.peek() else {
            return Err(ParseError::new("expected a subscript", self.end));
        };
        match token.kind {
            Some(TokenKind::Hex) => {
                self.bump(SyntaxRole::Variable)?;
                let decoded = Output::decode_hex(token.text);
                let inner = CalchubParser.parse(&decoded, self.known);
                match (inner.tree, inner.error) {
                    (_, Some(error)) => Err(ParseError::new(
                        format!("in subscript: {}", error.message),
                        token.span.start,
                    )),
                    (Some(tree), None) => Ok(respan(tree, &token.span)),
                    (None, None) => Ok(empty(token.span.start)),
                }
            }
            Some(TokenKind::LBrace) => {
                self.bump(SyntaxRole::Structure)?;
                let inner = self.arg()?;
                self.expect(TokenKind::RBrace, SyntaxRole::Structure, "'}'")?;
                Ok(inner)
            }
            Some(TokenKind::Letter) => {
                self.bump(SyntaxRole::Variable)?;
                Ok(AstNode::leaf(
                    AstKind::Symbol(token.text.to_string()),
                    token.span.clone(),
                ))
            }
            Some(TokenKind::Number) => {
                self.bump(SyntaxRole::Number)?;
                Ok(AstNode::leaf(
                    AstKind::Number(token.text.to_string()),
                    token.span.clone(),
                ))
            }
            Some(TokenKind::Command) => self.command(),
            _ => Err(ParseError::new("expected a subscript", token.span.start)),
        }
    }

    fn primary(&mut self) -> Result<AstNode, ParseError> {
        let Some(token) = self.peek() else {
            return Err(ParseError::new("expected an operand", self.end));
        };
        match token.kind {
            Some(TokenKind::Number) => {
                self.bump(SyntaxRole::Number)?;
                Ok(AstNode::leaf(
                    AstKind::Number(token.text.to_string()),
                    token.span.clone(),
                ))
            }
            Some(TokenKind::Letter) => self.letters(),
            Some(TokenKind::Command) => self.command(),
            Some(TokenKind::LParen) => self.group(),
            _ => Err(self.unexpected(token)),
        }
    }

    fn group(&mut self) -> Result<AstNode, ParseError> {
        let open = self.expect(TokenKind::LParen, SyntaxRole::Bracket, "'('")?;
        let inner = if self.at(TokenKind::RParen) {
            empty(self.offset())
        } else {
            self.expr(true)?
        };
        let close = self.expect(TokenKind::RParen, SyntaxRole::Bracket, "')'")?;
        Ok(AstNode::with_children(
            AstKind::Group,
            open.span.start..close.span.end,
            vec![inner],
        ))
    }

    /// Adjacent letters starting at the current token.
    fn letter_run(&self) -> String {
        let mut run = String::new();
        let mut next_start = None;
        for token in &self.tokens[self.pos..] {
            if !token.is(TokenKind::Letter) || next_start.is_some_and(|s| s != token.span.start) {
                break;
            }
            run.push_str(token.text);
            next_start = Some(token.span.end);
        }
        run
    }

    fn letters(&mut self) -> Result<AstNode, ParseError> {
        let run = self.letter_run();
        let known = self.known;
        let call = known
            .iter()
            .filter(|name| !name.is_empty() && run.starts_with(name.as_str()))
            .max_by_key(|name| name.len());

        if let Some(name) = call {
            let len = name.chars().count();
            if self.nth(len).is_some_and(|token| token.is(TokenKind::LParen)) {
                let start = self.offset();
                for _ in 0..len {
                    self.bump(SyntaxRole::Function)?;
                }
                let mut group = self.group()?;
                let span = start..group.span.end;
                let args = group.children.pop().unwrap_or_else(|| empty(span.end));
                return Ok(AstNode::with_children(
                    AstKind::Call(name.clone()),
                    span,
                    vec![args],
                ));
            }
        }

        let token = self.bump(SyntaxRole::Variable)?;
        Ok(AstNode::leaf(
            AstKind::Symbol(token.text.to_string()),
            token.span.clone(),
        ))
    }

    fn command(&mut self) -> Result<AstNode, ParseError> {
        let token = self.bump(SyntaxRole::Structure)?;
        let name = &token.text[1..];
        let start = token.span.start;
        let (kind, children, end) = match name {
            "frac" => {
                let (args, end) = self.braced_args(2)?;
                (AstKind::Fraction, args, end)
            }
            "sqrt" => {
                let index = if self.at(TokenKind::LBracket) {
                    self.bump(SyntaxRole::Structure)?;
                    let index = self.arg()?;
                    self.expect(TokenKind::RBracket, SyntaxRole::Structure, "']'")?;
                    index
                } else {
                    empty(self.offset())
                };
                let (mut args, end) = self.braced_args(1)?;
                args.insert(0, index);
                (AstKind::Radical, args, end)
            }
            "int" => {
                let (args, end) = self.braced_args(4)?;
                (AstKind::Integral, args, end)
            }
            "deriv" => {
                let (args, end) = self.braced_args(2)?;
                (AstKind::Derivative, args, end)
            }
            "diff" => {
                let (args, end) = self.braced_args(1)?;
                (AstKind::Differential, args, end)
            }
            "matrix" => return self.matrix(start),
            _ if is_operator_name(name) => {
                return Err(ParseError::new(
                    format!("operator '\\{name}' needs a left operand"),
                    start,
                ));
            }
            _ => {
                self.mark(token.span.clone(), SyntaxRole::Constant);
                return Ok(AstNode::leaf(
                    AstKind::Symbol(name.to_string()),
                    token.span.clone(),
                ));
            }
        };
        Ok(AstNode::with_children(kind, start..end, children))
    }

    /// `{a,b,...}` with exactly `count` arguments. Returns the end offset.
    fn braced_args(&mut self, count: usize) -> Result<(Vec<AstNode>, usize), ParseError> {
        self.expect(TokenKind::LBrace, SyntaxRole::Structure, "'{'")?;
        let mut args = Vec::with_capacity(count);
        for i in 0..count {
            if i > 0 {
                self.expect(TokenKind::Comma, SyntaxRole::Structure, "','")?;
            }
            args.push(self.arg()?);
        }
        let close = self.expect(TokenKind::RBrace, SyntaxRole::Structure, "'}'")?;
        Ok((args, close.span.end))
    }

    /// One command argument or matrix cell; may be empty.
    fn arg(&mut self) -> Result<AstNode, ParseError> {
        match self.peek_kind() {
            None
            | Some(
                TokenKind::Comma | TokenKind::RBrace | TokenKind::RBracket | TokenKind::Semicolon,
            ) => Ok(empty(self.offset())),
            _ => self.expr(false),
        }
    }

    fn matrix(&mut self, start: usize) -> Result<AstNode, ParseError> {
        self.expect(TokenKind::LBrace, SyntaxRole::Structure, "'{'")?;
        let mut rows: Vec<Vec<AstNode>> = vec![Vec::new()];
        loop {
            let cell = self.arg()?;
            if let Some(row) = rows.last_mut() {
                row.push(cell);
            }
            match self.peek_kind() {
                Some(TokenKind::Comma) => {
                    self.bump(SyntaxRole::Structure)?;
                }
                Some(TokenKind::Semicolon) => {
                    self.bump(SyntaxRole::Structure)?;
                    rows.push(Vec::new());
                }
                _ => break,
            }
        }
        let close = self.expect(TokenKind::RBrace, SyntaxRole::Structure, "'}'")?;

        let cols = rows.first().map_or(0, Vec::len);
        if rows.iter().any(|row| row.len() != cols) {
            return Err(ParseError::new("matrix rows have different lengths", start));
        }
        let count = rows.len();
        Ok(AstNode::with_children(
            AstKind::Matrix { rows: count, cols },
            start..close.span.end,
            rows.into_iter().flatten().collect(),
        ))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use rstest::rstest;

    fn known() -> Vec<String> {
        vec!["sin".into(), "sinh".into(), "ln".into()]
    }

    /// Compact s-expression rendering of a tree.
    fn sexp(node: &AstNode) -> String {
        let head = match &node.kind {
            AstKind::Empty => "∅".to_string(),
            AstKind::Number(text) | AstKind::Symbol(text) => text.clone(),
            AstKind::Binary(op) if op.is_empty() => "·".to_string(),
            AstKind::Binary(op) | AstKind::Unary(op) | AstKind::Postfix(op) => op.clone(),
            AstKind::Group => "()".to_string(),
            AstKind::Fraction => "frac".to_string(),
            AstKind::Radical => "sqrt".to_string(),
            AstKind::Power => "^".to_string(),
            AstKind::Subscript => "_".to_string(),
            AstKind::Integral => "int".to_string(),
            AstKind::Derivative => "deriv".to_string(),
            AstKind::Differential => "diff".to_string(),
            AstKind::Matrix { rows, cols } => format!("matrix{rows}x{cols}"),
            AstKind::Call(name) => format!("{name}()"),
        };
        if node.children.is_empty() {
            head
        } else {
            let children: Vec<String> = node.children.iter().map(sexp).collect();
            format!("({head} {})", children.join(" "))
        }
    }

    fn parse(text: &str) -> ParseResult {
        CalchubParser.parse(text, &known())
    }

    #[rstest]
    #[case("", "∅")]
    #[case("a+b", "(+ a b)")]
    #[case("2x+1", "(+ (· 2 x) 1)")]
    #[case("a+b/c", "(+ a (/ b c))")]
    #[case("-x^{2}", "(- (^ x 2))")]
    #[case("\\frac{a,}+b", "(+ (frac a ∅) b)")]
    #[case("x_1^{2}", "(^ (_ x 1) 2)")]
    #[case("x_\\h6162;", "(_ x (· a b))")]
    #[case("\\sqrt[3]{x}", "(sqrt 3 x)")]
    #[case("\\sqrt{x}", "(sqrt ∅ x)")]
    #[case("sin(x)", "(sin() x)")]
    #[case("sinh(x)", "(sinh() x)")]
    #[case("f(x)", "(· f (() x))")]
    #[case("\\matrix{1,2;3,4}", "(matrix2x2 1 2 3 4)")]
    #[case("\\pi r^{2}", "(· pi (^ r 2))")]
    #[case("a\\cdot b", "(cdot a b)")]
    #[case("n!", "(! n)")]
    #[case("\\int{0,1,x,x}", "(int 0 1 x x)")]
    #[case("\\int{,,x,x}", "(int ∅ ∅ x x)")]
    #[case("\\deriv{x,y}", "(deriv x y)")]
    #[case("a=b,c", "(, (= a b) c)")]
    #[case("a\\le b", "(le a b)")]
    fn parses(#[case] input: &str, #[case] expected: &str) {
        let result = parse(input);
        assert_eq!(result.error, None);
        assert_eq!(sexp(&result.tree.unwrap()), expected);
    }

    #[rstest]
    #[case("a+", "expected an operand")]
    #[case("\\frac{a", "expected ','")]
    #[case("\\matrix{1,2;3}", "matrix rows have different lengths")]
    #[case("a)", "unexpected ')'")]
    #[case("x_+", "expected a subscript")]
    #[case("2#", "unrecognised character '#'")]
    fn reports_errors(#[case] input: &str, #[case] message: &str) {
        let result = parse(input);
        assert_eq!(result.tree, None);
        let error = result.error.unwrap();
        assert!(
            error.message.starts_with(message),
            "{input:?} gave {error}"
        );
    }

    #[test]
    fn source_map_roles() {
        let result = parse("2x+sin(y)");
        use SyntaxRole::*;
        assert_eq!(
            result.source_map,
            vec![
                Some(Number),
                Some(Variable),
                Some(Operator),
                Some(Function),
                Some(Function),
                Some(Function),
                Some(Bracket),
                Some(Variable),
                Some(Bracket),
            ]
        );
    }

    #[test]
    fn structure_and_constants() {
        let result = parse("\\frac{\\pi,2}");
        let roles = result.source_map;
        assert_eq!(roles[0], Some(SyntaxRole::Structure));
        assert_eq!(roles[6], Some(SyntaxRole::Constant));
        assert_eq!(roles[10], Some(SyntaxRole::Number));
    }

    #[test]
    fn spans_cover_operands() {
        let tree = parse("ab+c").tree.unwrap();
        assert_eq!(tree.span, 0..4);
        assert_eq!(tree.children[0].span, 0..2);
    }
}
