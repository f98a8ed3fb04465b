//! # Cursor
//!
//! The cursor sits on a block boundary, written as a block plus a side.
//! Two spellings can name the same boundary (`(x, After)` and
//! `(x.right, Before)`), so positions are normalized before they are stored
//! or compared: the left neighbour's `After` side is preferred, and a blank
//! placeholder is always addressed from its `Before` side.
//!
//! ## Modules
//!
//! - **`navigation`**: the arrow-key state machine (`next_position`)
//! - **`selection`**: anchor/focus ranges and clamping to a common chain

pub mod navigation;
pub mod selection;

use std::cmp::Ordering;

use serde::{Deserialize, Serialize};

use crate::model::{BlockId, Document, ParentLink};

pub use navigation::{next_position, next_position_out_of};
pub use selection::{ChainRange, SelectionRange};

#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum Side {
    Before = 0,
    After = 1,
}

impl Side {
    pub fn as_u8(self) -> u8 {
        self as u8
    }

    pub fn from_u8(value: u8) -> Option<Side> {
        match value {
            0 => Some(Side::Before),
            1 => Some(Side::After),
            _ => None,
        }
    }
}

#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum Direction {
    Left,
    Right,
    Up,
    Down,
}

impl Direction {
    pub fn is_horizontal(self) -> bool {
        matches!(self, Direction::Left | Direction::Right)
    }

    /// Right and Down walk forwards through lanes.
    pub fn is_forward(self) -> bool {
        matches!(self, Direction::Right | Direction::Down)
    }
}

#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash)]
pub struct CursorPosition {
    pub block: BlockId,
    pub side: Side,
}

impl CursorPosition {
    pub fn new(block: BlockId, side: Side) -> Self {
        Self { block, side }
    }

    pub fn before(block: BlockId) -> Self {
        Self::new(block, Side::Before)
    }

    pub fn after(block: BlockId) -> Self {
        Self::new(block, Side::After)
    }

    pub fn normalize(self, doc: &Document) -> Self {
        if doc.is_blank(self.block) {
            return Self::before(self.block);
        }
        match (self.side, doc.left(self.block)) {
            (Side::Before, Some(left)) if !doc.is_blank(left) => Self::after(left),
            _ => self,
        }
    }

    /// The block immediately left of this boundary.
    pub fn block_left(self, doc: &Document) -> Option<BlockId> {
        match self.side {
            Side::After if !doc.is_blank(self.block) => Some(self.block),
            _ => doc.left(self.block),
        }
    }

    /// The block immediately right of this boundary.
    pub fn block_right(self, doc: &Document) -> Option<BlockId> {
        match self.side {
            Side::Before if !doc.is_blank(self.block) => Some(self.block),
            _ => doc.right(self.block),
        }
    }

    pub fn owner(self, doc: &Document) -> Option<ParentLink> {
        doc.owner(self.block)
    }

    pub fn is_chain_start(self, doc: &Document) -> bool {
        self.block_left(doc).is_none()
    }

    pub fn is_chain_end(self, doc: &Document) -> bool {
        self.block_right(doc).is_none()
    }

    /// Sort key for boundaries in document order.
    ///
    /// Block `i` of a chain spans keys `2i..=2i+2` with its contents at
    /// `2i+1`, so the key of `(x, After)` equals the key of
    /// `(x.right, Before)` and a boundary inside a composite sorts strictly
    /// between the composite's own sides.
    pub fn boundary_key(self, doc: &Document) -> Option<Vec<usize>> {
        let position = doc.position(self.block).ok()?;
        let mut key = Vec::with_capacity(position.depth() * 2 + 1);
        for &(index, slot) in position.steps() {
            key.push(2 * index + 1);
            key.push(slot);
        }
        let side = if doc.is_blank(self.block) {
            0
        } else {
            self.side.as_u8() as usize
        };
        key.push(2 * position.index() + 2 * side);
        Some(key)
    }

    /// Document-order comparison; `None` when either side is detached.
    pub fn cmp_in(self, other: CursorPosition, doc: &Document) -> Option<Ordering> {
        Some(self.boundary_key(doc)?.cmp(&other.boundary_key(doc)?))
    }

    pub fn same_boundary(self, other: CursorPosition, doc: &Document) -> bool {
        self.normalize(doc) == other.normalize(doc)
    }
}

/// Cursor at the start of the chain beginning with `start`.
pub fn chain_start_position(start: BlockId) -> CursorPosition {
    CursorPosition::before(start)
}

/// Cursor at the end of the chain containing `id`.
pub fn chain_end_position(doc: &Document, id: BlockId) -> CursorPosition {
    let end = doc.chain_end(id);
    if doc.is_blank(end) {
        CursorPosition::before(end)
    } else {
        CursorPosition::after(end)
    }
}
