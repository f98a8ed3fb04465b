//! Structural addressing.
//!
//! A [`Position`] locates a block by the path from the root body: one
//! `(index, slot)` step per enclosing composite, then the index in the final
//! chain. Positions order lexicographically on the flattened path, so an
//! ancestor sorts before everything it contains.

use std::cmp::Ordering;

use super::{BlockId, Document, ModelError};

#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub struct Position {
    steps: Vec<(usize, usize)>,
    index: usize,
}

/// How one position relates to another.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum Relation {
    Same,
    Left,
    Right,
    /// Strict ancestor
    Above,
    /// Strict descendant
    Below,
}

impl Position {
    pub fn new(steps: Vec<(usize, usize)>, index: usize) -> Self {
        Self { steps, index }
    }

    pub fn steps(&self) -> &[(usize, usize)] {
        &self.steps
    }

    pub fn index(&self) -> usize {
        self.index
    }

    pub fn depth(&self) -> usize {
        self.steps.len()
    }

    fn key(&self) -> Vec<usize> {
        let mut key = Vec::with_capacity(self.steps.len() * 2 + 1);
        for &(index, slot) in &self.steps {
            key.push(index);
            key.push(slot);
        }
        key.push(self.index);
        key
    }

    pub fn relation(&self, other: &Position) -> Relation {
        let (a, b) = (self.key(), other.key());
        match a.iter().zip(&b).position(|(x, y)| x != y) {
            Some(at) if a[at] < b[at] => Relation::Left,
            Some(_) => Relation::Right,
            None => match a.len().cmp(&b.len()) {
                Ordering::Equal => Relation::Same,
                Ordering::Less => Relation::Above,
                Ordering::Greater => Relation::Below,
            },
        }
    }

    pub fn is_left_of(&self, other: &Position) -> bool {
        self.relation(other) == Relation::Left
    }

    pub fn is_right_of(&self, other: &Position) -> bool {
        self.relation(other) == Relation::Right
    }

    /// `self` is nested inside the block at `other`.
    pub fn is_below(&self, other: &Position) -> bool {
        self.relation(other) == Relation::Below
    }

    /// `self` is an ancestor of the block at `other`.
    pub fn is_above(&self, other: &Position) -> bool {
        self.relation(other) == Relation::Above
    }
}

impl Ord for Position {
    fn cmp(&self, other: &Self) -> Ordering {
        self.key().cmp(&other.key())
    }
}

impl PartialOrd for Position {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl Document {
    /// Structural position of an attached block.
    pub fn position(&self, id: BlockId) -> Result<Position, ModelError> {
        // (index in chain, slot of that chain), innermost first
        let mut levels = Vec::new();
        let mut current = id;
        loop {
            let link = self.owner(current).ok_or(ModelError::Detached(current))?;
            levels.push((self.index_in_chain(current), link.slot));
            if link.block == self.root {
                break;
            }
            if levels.len() > self.nodes.len() {
                return Err(ModelError::Cycle(id));
            }
            current = link.block;
        }
        levels.reverse();

        let steps = levels.windows(2).map(|w| (w[0].0, w[1].1)).collect();
        let index = levels.last().map_or(0, |level| level.0);
        Ok(Position::new(steps, index))
    }

    /// The block at `position`, if there is one.
    pub fn block_at(&self, position: &Position) -> Option<BlockId> {
        let mut chain = self.body();
        for &(index, slot) in position.steps() {
            let block = *self.chain_blocks(chain).get(index)?;
            chain = self.child(block, slot);
        }
        self.chain_blocks(chain).get(position.index()).copied()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::{BlockKind, slot};
    use pretty_assertions::assert_eq;

    /// `a \frac{b,c} d` laid out in the body.
    fn fraction_doc() -> (Document, [BlockId; 5]) {
        let mut doc = Document::new();
        let a = doc.create(BlockKind::Atom, Some("a".into()));
        let frac = doc.create(BlockKind::Fraction, None);
        let d = doc.create(BlockKind::Atom, Some("d".into()));
        let b = doc.create(BlockKind::Atom, Some("b".into()));
        let c = doc.create(BlockKind::Atom, Some("c".into()));
        doc.replace_chain(frac, slot::NUM, Some(b)).unwrap();
        doc.replace_chain(frac, slot::DENOM, Some(c)).unwrap();
        let start = doc.link_chain(&[a, frac, d]).unwrap().unwrap();
        let body = doc.body().unwrap();
        doc.replace_with(body, start).unwrap();
        (doc, [a, frac, b, c, d])
    }

    #[test]
    fn positions_of_nested_blocks() {
        let (doc, [a, frac, b, c, _]) = fraction_doc();

        assert_eq!(doc.position(a).unwrap(), Position::new(vec![], 0));
        assert_eq!(doc.position(frac).unwrap(), Position::new(vec![], 1));
        assert_eq!(doc.position(b).unwrap(), Position::new(vec![(1, slot::NUM)], 0));
        assert_eq!(doc.position(c).unwrap(), Position::new(vec![(1, slot::DENOM)], 0));
    }

    #[test]
    fn block_at_inverts_position() {
        let (doc, blocks) = fraction_doc();
        for id in blocks {
            let position = doc.position(id).unwrap();
            assert_eq!(doc.block_at(&position), Some(id));
        }
        assert_eq!(doc.block_at(&Position::new(vec![], 7)), None);
    }

    #[test]
    fn order_is_document_preorder() {
        let (doc, [a, frac, b, c, d]) = fraction_doc();
        let mut positions: Vec<(Position, BlockId)> = [d, c, b, frac, a]
            .into_iter()
            .map(|id| (doc.position(id).unwrap(), id))
            .collect();
        positions.sort();
        let order: Vec<BlockId> = positions.into_iter().map(|(_, id)| id).collect();
        assert_eq!(order, vec![a, frac, b, c, d]);
    }

    #[test]
    fn relations() {
        let (doc, [a, frac, b, c, d]) = fraction_doc();
        let pos = |id| doc.position(id).unwrap();

        assert!(pos(a).is_left_of(&pos(b)));
        assert!(pos(b).is_left_of(&pos(c)));
        assert!(pos(d).is_right_of(&pos(c)));
        assert!(pos(b).is_below(&pos(frac)));
        assert!(pos(frac).is_above(&pos(c)));
        assert_eq!(pos(c).relation(&pos(c)), Relation::Same);
    }

    #[test]
    fn detached_block_has_no_position() {
        let mut doc = Document::new();
        let loose = doc.create(BlockKind::Atom, Some("x".into()));
        assert_eq!(doc.position(loose), Err(ModelError::Detached(loose)));
    }
}
