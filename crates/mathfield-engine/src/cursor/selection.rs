//! Selections.
//!
//! A selection keeps the raw anchor (where it started) and focus (where the
//! cursor is). Either may be `None`, which means there is no selection at
//! all. `start`/`end` are the two ends in document order. [`SelectionRange::clamp`]
//! lifts both ends until they share a chain, which is the range editing
//! operations actually act on.

use std::cmp::Ordering;

use super::{CursorPosition, Side};
use crate::model::{BlockId, Document, ParentLink};

#[derive(Copy, Clone, Debug, Default, PartialEq, Eq)]
pub struct SelectionRange {
    pub anchor: Option<CursorPosition>,
    pub focus: Option<CursorPosition>,
}

impl SelectionRange {
    pub fn new(anchor: CursorPosition, focus: CursorPosition) -> Self {
        Self {
            anchor: Some(anchor),
            focus: Some(focus),
        }
    }

    pub fn collapsed(at: CursorPosition) -> Self {
        Self::new(at, at)
    }

    pub fn is_empty(&self) -> bool {
        self.anchor.is_none() || self.focus.is_none()
    }

    pub fn is_collapsed(&self, doc: &Document) -> bool {
        match (self.anchor, self.focus) {
            (Some(anchor), Some(focus)) => anchor.same_boundary(focus, doc),
            _ => false,
        }
    }

    pub fn normalize(self, doc: &Document) -> Self {
        Self {
            anchor: self.anchor.map(|p| p.normalize(doc)),
            focus: self.focus.map(|p| p.normalize(doc)),
        }
    }

    pub fn start(&self, doc: &Document) -> Option<CursorPosition> {
        let (anchor, focus) = (self.anchor?, self.focus?);
        match focus.cmp_in(anchor, doc)? {
            Ordering::Less => Some(focus),
            _ => Some(anchor),
        }
    }

    pub fn end(&self, doc: &Document) -> Option<CursorPosition> {
        let (anchor, focus) = (self.anchor?, self.focus?);
        match focus.cmp_in(anchor, doc)? {
            Ordering::Less => Some(anchor),
            _ => Some(focus),
        }
    }

    /// Lift both ends to the deepest chain containing them both.
    ///
    /// An end nested inside a composite is widened to cover the whole
    /// composite, so the result never cuts a block in half.
    pub fn clamp(&self, doc: &Document) -> Option<ChainRange> {
        let start = self.start(doc)?.normalize(doc);
        let end = self.end(doc)?.normalize(doc);
        let start_levels = lift(doc, start, Side::Before);
        let end_levels = lift(doc, end, Side::After);

        start_levels.iter().find_map(|(link, start)| {
            end_levels
                .iter()
                .find(|(other, _)| other == link)
                .map(|(_, end)| ChainRange {
                    owner: *link,
                    start: *start,
                    end: *end,
                })
        })
    }
}

/// The boundary as seen from each enclosing chain, innermost first.
fn lift(doc: &Document, position: CursorPosition, side: Side) -> Vec<(ParentLink, CursorPosition)> {
    let mut levels = Vec::new();
    let mut current = position;
    for _ in 0..=doc.len() {
        let Some(link) = doc.owner(current.block) else {
            break;
        };
        levels.push((link, current));
        if link.block == doc.root() {
            break;
        }
        current = CursorPosition::new(link.block, side).normalize(doc);
    }
    levels
}

/// A selection clamped to one chain.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub struct ChainRange {
    pub owner: ParentLink,
    pub start: CursorPosition,
    pub end: CursorPosition,
}

impl ChainRange {
    /// Blocks strictly between the two boundaries.
    pub fn blocks(&self, doc: &Document) -> Vec<BlockId> {
        let (Some(first), Some(last)) = (self.start.block_right(doc), self.end.block_left(doc))
        else {
            return Vec::new();
        };
        let mut blocks = Vec::new();
        let mut current = Some(first);
        while let Some(id) = current {
            blocks.push(id);
            if id == last {
                return blocks;
            }
            current = doc.right(id);
        }
        Vec::new()
    }

    pub fn is_empty(&self, doc: &Document) -> bool {
        self.blocks(doc).is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::{BlockKind, slot};
    use pretty_assertions::assert_eq;

    /// `a \frac{n,d} b`
    fn fixture() -> (Document, [BlockId; 5]) {
        let mut doc = Document::new();
        let a = doc.create(BlockKind::Atom, Some("a".into()));
        let frac = doc.create(BlockKind::Fraction, None);
        let b = doc.create(BlockKind::Atom, Some("b".into()));
        let n = doc.create(BlockKind::Atom, Some("n".into()));
        let d = doc.create(BlockKind::Atom, Some("d".into()));
        doc.replace_chain(frac, slot::NUM, Some(n)).unwrap();
        doc.replace_chain(frac, slot::DENOM, Some(d)).unwrap();
        let start = doc.link_chain(&[a, frac, b]).unwrap().unwrap();
        let body = doc.body().unwrap();
        doc.replace_with(body, start).unwrap();
        (doc, [a, frac, b, n, d])
    }

    #[test]
    fn start_and_end_follow_document_order() {
        let (doc, [a, _, b, ..]) = fixture();
        let backwards = SelectionRange::new(CursorPosition::after(b), CursorPosition::before(a));
        assert_eq!(backwards.start(&doc), Some(CursorPosition::before(a)));
        assert_eq!(backwards.end(&doc), Some(CursorPosition::after(b)));
    }

    #[test]
    fn empty_selection_has_no_ends() {
        let (doc, _) = fixture();
        let empty = SelectionRange::default();
        assert!(empty.is_empty());
        assert_eq!(empty.start(&doc), None);
        assert_eq!(empty.clamp(&doc), None);
    }

    #[test]
    fn clamp_within_one_chain() {
        let (doc, [a, frac, b, ..]) = fixture();
        let range = SelectionRange::new(CursorPosition::before(a), CursorPosition::after(frac))
            .clamp(&doc)
            .unwrap();
        assert_eq!(range.owner, ParentLink::new(doc.root(), slot::BODY));
        assert_eq!(range.blocks(&doc), vec![a, frac]);
        assert_ne!(range.blocks(&doc).last(), Some(&b));
    }

    #[test]
    fn clamp_widens_nested_end_to_whole_block() {
        let (doc, [a, frac, _, n, _]) = fixture();
        let range = SelectionRange::new(CursorPosition::before(a), CursorPosition::after(n))
            .clamp(&doc)
            .unwrap();
        assert_eq!(range.end, CursorPosition::after(frac));
        assert_eq!(range.blocks(&doc), vec![a, frac]);
    }

    #[test]
    fn clamp_between_sibling_chains_lifts_to_parent() {
        let (doc, [a, frac, _, n, d]) = fixture();
        let range = SelectionRange::new(CursorPosition::before(n), CursorPosition::after(d))
            .clamp(&doc)
            .unwrap();
        assert_eq!(range.start, CursorPosition::after(a));
        assert_eq!(range.end, CursorPosition::after(frac));
        assert_eq!(range.blocks(&doc), vec![frac]);
    }

    #[test]
    fn collapsed_range_covers_nothing() {
        let (doc, [a, ..]) = fixture();
        let selection = SelectionRange::collapsed(CursorPosition::after(a));
        assert!(selection.is_collapsed(&doc));
        assert!(selection.clamp(&doc).unwrap().is_empty(&doc));
    }
}
