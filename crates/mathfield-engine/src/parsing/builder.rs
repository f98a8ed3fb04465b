//! AST to block lowering.
//!
//! Each [`AstKind`] has a lowering function that appends blocks to a
//! [`ChainBuilder`]. Nested chains (fraction parts, scripts, arguments) are
//! built by child builders. The result is a detached chain, ready to be
//! spliced in at the cursor.
//!
//! Notable rewrites:
//!
//! - `a/b` becomes a fraction, with one layer of parentheses stripped from
//!   either side
//! - powers and subscripts attach to a script block, merging into the
//!   previous one when it still has the slot free, so `x_1^{2}` is one block
//! - numbers are split into one atom per character

use super::{AstKind, AstNode, MathParser, ParseError};
use crate::model::kinds::parse_dimensions;
use crate::model::{BlockId, BlockKind, Document, ModelError, slot};

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum BuildError {
    #[error("parse failed: {0}")]
    Parse(#[from] ParseError),
    #[error(transparent)]
    Model(#[from] ModelError),
    #[error("cannot build {0}")]
    Unsupported(String),
}

type Lowering = fn(&mut ChainBuilder<'_>, &AstNode) -> Result<(), BuildError>;

fn lowering_for(kind: &AstKind) -> Lowering {
    match kind {
        AstKind::Empty => lower_empty,
        AstKind::Number(_) => lower_number,
        AstKind::Symbol(_) => lower_symbol,
        AstKind::Binary(_) => lower_binary,
        AstKind::Unary(_) => lower_unary,
        AstKind::Postfix(_) => lower_postfix,
        AstKind::Group => lower_group,
        AstKind::Fraction => lower_fraction,
        AstKind::Radical => lower_radical,
        AstKind::Power => lower_power,
        AstKind::Subscript => lower_subscript,
        AstKind::Integral => lower_integral,
        AstKind::Derivative => lower_derivative,
        AstKind::Differential => lower_differential,
        AstKind::Matrix { .. } => lower_matrix,
        AstKind::Call(_) => lower_call,
    }
}

/// Build blocks for `tree`. Returns the start of a detached chain, or
/// `None` when the tree is empty.
pub fn build_from_tree(doc: &mut Document, tree: &AstNode) -> Result<Option<BlockId>, BuildError> {
    let mut builder = ChainBuilder::new(doc);
    builder.lower(tree)?;
    builder.finish()
}

/// Parse `text` and build blocks for it.
pub fn build_from_text(
    doc: &mut Document,
    parser: &dyn MathParser,
    text: &str,
    known_functions: &[String],
) -> Result<Option<BlockId>, BuildError> {
    let result = parser.parse(text, known_functions);
    if let Some(error) = result.error {
        return Err(error.into());
    }
    match result.tree {
        Some(tree) => build_from_tree(doc, &tree),
        None => Ok(None),
    }
}

struct ChainBuilder<'d> {
    doc: &'d mut Document,
    blocks: Vec<BlockId>,
}

impl<'d> ChainBuilder<'d> {
    fn new(doc: &'d mut Document) -> Self {
        Self {
            doc,
            blocks: Vec::new(),
        }
    }

    fn lower(&mut self, node: &AstNode) -> Result<(), BuildError> {
        (lowering_for(&node.kind))(self, node)
    }

    fn finish(self) -> Result<Option<BlockId>, BuildError> {
        Ok(self.doc.link_chain(&self.blocks)?)
    }

    fn atom(&mut self, text: &str) {
        let id = self.doc.create(BlockKind::Atom, Some(text.to_string()));
        self.blocks.push(id);
    }

    /// Build `node` as a separate chain.
    fn chain(&mut self, node: &AstNode) -> Result<Option<BlockId>, BuildError> {
        let mut nested = ChainBuilder::new(self.doc);
        nested.lower(node)?;
        nested.finish()
    }

    fn composite(
        &mut self,
        kind: BlockKind,
        data: Option<String>,
        parts: &[(usize, &AstNode)],
    ) -> Result<BlockId, BuildError> {
        let id = self.doc.create(kind, data);
        for &(slot, node) in parts {
            if let Some(start) = self.chain(node)? {
                self.doc.replace_chain(id, slot, Some(start))?;
            }
        }
        self.blocks.push(id);
        Ok(id)
    }

    /// Put `node` in the `slot` script of the trailing script block,
    /// starting a new one when there is none or the slot is taken.
    fn attach_script(&mut self, slot: usize, node: &AstNode) -> Result<(), BuildError> {
        let start = match self.chain(node)? {
            Some(start) => start,
            None => self.doc.create(BlockKind::Blank, None),
        };
        let target = match self.blocks.last() {
            Some(&last)
                if self.doc.kind(last) == Some(BlockKind::SupSub)
                    && self.doc.child(last, slot).is_none() =>
            {
                last
            }
            _ => {
                let id = self.doc.create(BlockKind::SupSub, None);
                self.blocks.push(id);
                id
            }
        };
        self.doc.replace_chain(target, slot, Some(start))?;
        Ok(())
    }
}

fn child(node: &AstNode, index: usize) -> Result<&AstNode, BuildError> {
    node.children
        .get(index)
        .ok_or_else(|| BuildError::Unsupported(format!("{:?} without operand {index}", node.kind)))
}

fn strip_group(node: &AstNode) -> &AstNode {
    match (&node.kind, node.children.first()) {
        (AstKind::Group, Some(inner)) => inner,
        _ => node,
    }
}

fn lower_empty(_builder: &mut ChainBuilder<'_>, _node: &AstNode) -> Result<(), BuildError> {
    Ok(())
}

fn lower_number(builder: &mut ChainBuilder<'_>, node: &AstNode) -> Result<(), BuildError> {
    if let AstKind::Number(text) = &node.kind {
        for ch in text.chars() {
            builder.atom(&ch.to_string());
        }
    }
    Ok(())
}

fn lower_symbol(builder: &mut ChainBuilder<'_>, node: &AstNode) -> Result<(), BuildError> {
    if let AstKind::Symbol(name) = &node.kind {
        builder.atom(name);
    }
    Ok(())
}

fn lower_binary(builder: &mut ChainBuilder<'_>, node: &AstNode) -> Result<(), BuildError> {
    let AstKind::Binary(op) = &node.kind else {
        return Ok(());
    };
    let (lhs, rhs) = (child(node, 0)?, child(node, 1)?);
    if op == "/" {
        builder.composite(
            BlockKind::Fraction,
            None,
            &[(slot::NUM, strip_group(lhs)), (slot::DENOM, strip_group(rhs))],
        )?;
        return Ok(());
    }
    builder.lower(lhs)?;
    if !op.is_empty() {
        builder.atom(op);
    }
    builder.lower(rhs)
}

fn lower_unary(builder: &mut ChainBuilder<'_>, node: &AstNode) -> Result<(), BuildError> {
    if let AstKind::Unary(op) = &node.kind {
        builder.atom(op);
    }
    builder.lower(child(node, 0)?)
}

fn lower_postfix(builder: &mut ChainBuilder<'_>, node: &AstNode) -> Result<(), BuildError> {
    builder.lower(child(node, 0)?)?;
    if let AstKind::Postfix(op) = &node.kind {
        builder.atom(op);
    }
    Ok(())
}

fn lower_group(builder: &mut ChainBuilder<'_>, node: &AstNode) -> Result<(), BuildError> {
    builder.atom("(");
    builder.lower(child(node, 0)?)?;
    builder.atom(")");
    Ok(())
}

fn lower_fraction(builder: &mut ChainBuilder<'_>, node: &AstNode) -> Result<(), BuildError> {
    builder.composite(
        BlockKind::Fraction,
        None,
        &[(slot::NUM, child(node, 0)?), (slot::DENOM, child(node, 1)?)],
    )?;
    Ok(())
}

fn lower_radical(builder: &mut ChainBuilder<'_>, node: &AstNode) -> Result<(), BuildError> {
    builder.composite(
        BlockKind::Radical,
        None,
        &[
            (slot::RADICAL_INDEX, child(node, 0)?),
            (slot::RADICAL_INNER, child(node, 1)?),
        ],
    )?;
    Ok(())
}

fn lower_power(builder: &mut ChainBuilder<'_>, node: &AstNode) -> Result<(), BuildError> {
    builder.lower(child(node, 0)?)?;
    builder.attach_script(slot::SUP, strip_group(child(node, 1)?))
}

fn lower_subscript(builder: &mut ChainBuilder<'_>, node: &AstNode) -> Result<(), BuildError> {
    builder.lower(child(node, 0)?)?;
    builder.attach_script(slot::SUB, child(node, 1)?)
}

fn lower_integral(builder: &mut ChainBuilder<'_>, node: &AstNode) -> Result<(), BuildError> {
    builder.composite(
        BlockKind::Integral,
        None,
        &[
            (slot::LEFT_BOUND, child(node, 0)?),
            (slot::RIGHT_BOUND, child(node, 1)?),
            (slot::INTEGRAND, child(node, 2)?),
            (slot::INTEGRAL_WRT, child(node, 3)?),
        ],
    )?;
    Ok(())
}

fn lower_derivative(builder: &mut ChainBuilder<'_>, node: &AstNode) -> Result<(), BuildError> {
    builder.composite(
        BlockKind::Derivative,
        None,
        &[
            (slot::DERIVATIVE_WRT, child(node, 0)?),
            (slot::DERIVATIVE_INNER, child(node, 1)?),
        ],
    )?;
    Ok(())
}

fn lower_differential(builder: &mut ChainBuilder<'_>, node: &AstNode) -> Result<(), BuildError> {
    builder.composite(
        BlockKind::Differential,
        None,
        &[(slot::DIFFERENTIAL_INNER, child(node, 0)?)],
    )?;
    Ok(())
}

fn lower_matrix(builder: &mut ChainBuilder<'_>, node: &AstNode) -> Result<(), BuildError> {
    let AstKind::Matrix { rows, cols } = node.kind else {
        return Ok(());
    };
    let data = format!("{rows}x{cols}");
    if parse_dimensions(Some(&data)).is_none() || node.children.len() != rows * cols {
        return Err(BuildError::Unsupported(format!("a {data} matrix")));
    }
    let parts: Vec<(usize, &AstNode)> = node.children.iter().enumerate().collect();
    builder.composite(BlockKind::Matrix, Some(data), &parts)?;
    Ok(())
}

fn lower_call(builder: &mut ChainBuilder<'_>, node: &AstNode) -> Result<(), BuildError> {
    let AstKind::Call(name) = &node.kind else {
        return Ok(());
    };
    builder.composite(
        BlockKind::Function,
        Some(name.clone()),
        &[(slot::ARGS, child(node, 0)?)],
    )?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::parsing::CalchubParser;
    use crate::printing::to_calchub;
    use pretty_assertions::assert_eq;
    use rstest::rstest;

    /// Build `text` into an otherwise empty document and print it back.
    fn rebuild(text: &str) -> String {
        let mut doc = Document::new();
        let known = vec!["sin".to_string()];
        let start = build_from_text(&mut doc, &CalchubParser, text, &known)
            .unwrap()
            .unwrap();
        let body = doc.body().unwrap();
        doc.replace_with(body, start).unwrap();
        doc.collect_garbage();
        doc.check_integrity().unwrap();
        to_calchub(&doc).text().to_string()
    }

    #[rstest]
    #[case("a+b")]
    #[case("\\frac{a,}+b")]
    #[case("x_1^{2}")]
    #[case("x_\\h6162;")]
    #[case("\\sqrt[3]{x}-\\sqrt{y}")]
    #[case("\\int{0,1,x^{2},x}")]
    #[case("\\int{,,x,x}")]
    #[case("\\deriv{x,y}\\diff{x}")]
    #[case("\\matrix{1,2;3,4}")]
    #[case("sin(x)")]
    #[case("\\pi r^{2}")]
    #[case("3!")]
    fn linear_text_survives_rebuild(#[case] text: &str) {
        assert_eq!(rebuild(text), text);
    }

    #[rstest]
    #[case("1/2", "\\frac{1,2}")]
    #[case("(a+b)/c", "\\frac{a+b,c}")]
    #[case("2x/3", "\\frac{2x,3}")]
    #[case("x^(n+1)", "x^{n+1}")]
    #[case("x^2", "x^{2}")]
    #[case("a \\cdot b", "a\\cdot b")]
    fn linear_text_is_canonicalised(#[case] text: &str, #[case] expected: &str) {
        assert_eq!(rebuild(text), expected);
    }

    #[test]
    fn scripts_merge_into_one_block() {
        let mut doc = Document::new();
        let start = build_from_text(&mut doc, &CalchubParser, "x_1^{2}", &[])
            .unwrap()
            .unwrap();
        let blocks = doc.chain_blocks(Some(start));
        assert_eq!(blocks.len(), 2);
        assert_eq!(doc.kind(blocks[1]), Some(BlockKind::SupSub));
        assert!(doc.child(blocks[1], slot::SUP).is_some());
        assert!(doc.child(blocks[1], slot::SUB).is_some());
    }

    #[test]
    fn empty_text_builds_nothing() {
        let mut doc = Document::new();
        let start = build_from_text(&mut doc, &CalchubParser, "", &[]).unwrap();
        assert_eq!(start, None);
    }

    #[test]
    fn parse_errors_surface() {
        let mut doc = Document::new();
        let result = build_from_text(&mut doc, &CalchubParser, "a+", &[]);
        assert!(matches!(result, Err(BuildError::Parse(_))));
    }
}
