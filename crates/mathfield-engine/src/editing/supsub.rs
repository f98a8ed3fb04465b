//! Sup/sub auto-merge.
//!
//! Two adjacent script blocks whose scripts complement each other collapse
//! into one: `x_{1}` followed by `^{2}` becomes `x_{1}^{2}`. The outcome
//! only depends on which scripts each side has:
//!
//! | left       | right      | result                       |
//! |------------|------------|------------------------------|
//! | none       | any        | left removed                 |
//! | any        | none       | right removed                |
//! | sub only   | sup only   | right's sup moves into left  |
//! | sup only   | sub only   | right's sub moves into left  |
//! | otherwise  |            | unchanged                    |
//!
//! The "otherwise" cases always have one script present on both sides,
//! and merging them would overwrite user content.

use crate::cursor::CursorPosition;
use crate::model::{BlockId, BlockKind, Document, ModelError, slot};

/// Result of merging a pair: `removed` is gone from the tree and its
/// content (if any) now lives in `survivor`.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub struct Merge {
    pub survivor: BlockId,
    pub removed: BlockId,
    removed_was_left: bool,
}

impl Merge {
    /// Move a cursor that referenced the removed block onto the survivor.
    pub fn relocate(&self, cursor: CursorPosition) -> CursorPosition {
        if cursor.block != self.removed {
            cursor
        } else if self.removed_was_left {
            CursorPosition::before(self.survivor)
        } else {
            CursorPosition::after(self.survivor)
        }
    }
}

/// Which scripts a block carries, as `(sub, sup)`.
fn scripts(doc: &Document, id: BlockId) -> (bool, bool) {
    (
        doc.child(id, slot::SUB).is_some(),
        doc.child(id, slot::SUP).is_some(),
    )
}

fn is_sup_sub(doc: &Document, id: BlockId) -> bool {
    doc.kind(id) == Some(BlockKind::SupSub)
}

/// Merge `right` into `left` if both are adjacent script blocks.
pub fn merge_pair(
    doc: &mut Document,
    left: BlockId,
    right: BlockId,
) -> Result<Option<Merge>, ModelError> {
    if !is_sup_sub(doc, left) || !is_sup_sub(doc, right) || doc.right(left) != Some(right) {
        return Ok(None);
    }
    let moved = match (scripts(doc, left), scripts(doc, right)) {
        ((false, false), _) => {
            doc.remove(left)?;
            return Ok(Some(Merge {
                survivor: right,
                removed: left,
                removed_was_left: true,
            }));
        }
        (_, (false, false)) => None,
        ((true, false), (false, true)) => Some(slot::SUP),
        ((false, true), (true, false)) => Some(slot::SUB),
        _ => return Ok(None),
    };
    if let Some(script) = moved {
        let chain = doc.take_chain(right, script)?;
        doc.replace_chain(left, script, chain)?;
    }
    doc.remove(right)?;
    Ok(Some(Merge {
        survivor: left,
        removed: right,
        removed_was_left: false,
    }))
}

/// Merge the pair on either side of `cursor`.
pub fn merge_at(doc: &mut Document, cursor: CursorPosition) -> Result<CursorPosition, ModelError> {
    let (Some(left), Some(right)) = (cursor.block_left(doc), cursor.block_right(doc)) else {
        return Ok(cursor);
    };
    Ok(match merge_pair(doc, left, right)? {
        Some(merge) => merge.relocate(cursor),
        None => cursor,
    })
}

/// Merge `id` with its left neighbour, then the result with its right one.
pub fn merge_around(
    doc: &mut Document,
    id: BlockId,
    cursor: CursorPosition,
) -> Result<CursorPosition, ModelError> {
    let mut cursor = cursor;
    let mut id = id;
    if let Some(left) = doc.left(id)
        && let Some(merge) = merge_pair(doc, left, id)?
    {
        cursor = merge.relocate(cursor);
        id = merge.survivor;
    }
    if let Some(right) = doc.right(id)
        && let Some(merge) = merge_pair(doc, id, right)?
    {
        cursor = merge.relocate(cursor);
    }
    Ok(cursor)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::printing::to_calchub;
    use pretty_assertions::assert_eq;
    use rstest::rstest;

    /// Body `x` followed by two script blocks with the given scripts.
    fn pair(left: (bool, bool), right: (bool, bool)) -> (Document, BlockId, BlockId) {
        let mut doc = Document::new();
        let x = doc.create(BlockKind::Atom, Some("x".into()));
        let mut blocks = vec![x];
        for (n, (sub, sup)) in [left, right].into_iter().enumerate() {
            let id = doc.create(BlockKind::SupSub, None);
            if sub {
                let atom = doc.create(BlockKind::Atom, Some(format!("{}", n + 1)));
                doc.replace_chain(id, slot::SUB, Some(atom)).unwrap();
            }
            if sup {
                let atom = doc.create(BlockKind::Atom, Some(format!("{}", n + 3)));
                doc.replace_chain(id, slot::SUP, Some(atom)).unwrap();
            }
            blocks.push(id);
        }
        let start = doc.link_chain(&blocks).unwrap().unwrap();
        let body = doc.body().unwrap();
        doc.replace_with(body, start).unwrap();
        (doc, blocks[1], blocks[2])
    }

    #[rstest]
    #[case((true, false), (false, true), "x_1^{4}")]
    #[case((false, true), (true, false), "x_2^{3}")]
    #[case((false, false), (true, true), "x_2^{4}")]
    #[case((true, true), (false, false), "x_1^{3}")]
    #[case((true, false), (true, false), "x_1_2")]
    #[case((false, true), (false, true), "x^{3}^{4}")]
    #[case((true, true), (true, false), "x_1^{3}_2")]
    #[case((true, false), (true, true), "x_1_2^{4}")]
    fn merge_table(#[case] left: (bool, bool), #[case] right: (bool, bool), #[case] expected: &str) {
        let (mut doc, l, r) = pair(left, right);
        merge_pair(&mut doc, l, r).unwrap();
        doc.check_integrity().unwrap();
        doc.collect_garbage();
        assert_eq!(to_calchub(&doc).text(), expected);
    }

    #[test]
    fn merge_at_seam_keeps_cursor_on_survivor() {
        let (mut doc, l, r) = pair((true, false), (false, true));
        let at = merge_at(&mut doc, CursorPosition::after(l)).unwrap();
        assert_eq!(at, CursorPosition::after(l));
        assert!(!doc.is_attached(r));
    }

    #[test]
    fn cursor_on_removed_left_block_moves_right() {
        let (mut doc, l, r) = pair((false, false), (true, false));
        let at = merge_at(&mut doc, CursorPosition::after(l)).unwrap();
        assert_eq!(at, CursorPosition::before(r));
    }

    #[test]
    fn merge_around_checks_both_sides() {
        let (mut doc, l, r) = pair((true, false), (false, true));
        let at = merge_around(&mut doc, r, CursorPosition::after(r)).unwrap();
        assert_eq!(at, CursorPosition::after(l));
        assert!(doc.child(l, slot::SUP).is_some());
    }

    #[test]
    fn non_scripts_are_ignored() {
        let (mut doc, l, _) = pair((true, false), (false, true));
        let x = doc.left(l).unwrap();
        assert_eq!(merge_pair(&mut doc, x, l).unwrap(), None);
    }
}
