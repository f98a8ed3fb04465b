//! Arrow-key navigation.
//!
//! [`next_position`] is total: for any cursor and direction it either
//! returns the next cursor or `None`, meaning the cursor would leave the
//! field. It never panics on blocks missing from the document.
//!
//! Horizontal moves step over atoms and enter composites through their
//! `across` entry chain. Vertical moves only ever enter a neighbouring
//! composite (trying the block on the left first) and otherwise climb to
//! the next chain in the enclosing block's up-to-down lane.

use super::{CursorPosition, Direction, Side, chain_end_position, chain_start_position};
use crate::model::{BlockId, Document, ParentLink};

pub fn next_position(
    doc: &Document,
    position: CursorPosition,
    direction: Direction,
) -> Option<CursorPosition> {
    if !doc.contains(position.block) || position.block == doc.root() {
        return None;
    }
    let position = position.normalize(doc);
    match direction {
        Direction::Right => match position.block_right(doc) {
            Some(next) => Some(
                enter(doc, next, Side::Before, direction).unwrap_or(CursorPosition::after(next)),
            ),
            None => next_position_out_of(doc, doc.owner(position.block)?, direction),
        },
        Direction::Left => match position.block_left(doc) {
            Some(previous) => Some(
                enter(doc, previous, Side::After, direction)
                    .unwrap_or_else(|| CursorPosition::before(previous).normalize(doc)),
            ),
            None => next_position_out_of(doc, doc.owner(position.block)?, direction),
        },
        Direction::Up | Direction::Down => {
            let beside = position
                .block_left(doc)
                .and_then(|left| enter(doc, left, Side::After, direction))
                .or_else(|| {
                    position
                        .block_right(doc)
                        .and_then(|right| enter(doc, right, Side::Before, direction))
                });
            match beside {
                Some(entered) => Some(entered),
                None => next_position_out_of(doc, doc.owner(position.block)?, direction),
            }
        }
    }
}

/// Where the cursor goes after running off the edge of the chain in `link`.
pub fn next_position_out_of(
    doc: &Document,
    link: ParentLink,
    direction: Direction,
) -> Option<CursorPosition> {
    let mut link = link;
    for _ in 0..=doc.len() {
        if let Some(start) = lane_neighbour(doc, link, direction) {
            return Some(if direction.is_forward() {
                chain_start_position(start)
            } else {
                chain_end_position(doc, start)
            });
        }
        if link.block == doc.root() {
            return None;
        }
        match direction {
            Direction::Right => return Some(CursorPosition::after(link.block)),
            Direction::Left => return Some(CursorPosition::before(link.block).normalize(doc)),
            Direction::Up | Direction::Down => link = doc.owner(link.block)?,
        }
    }
    None
}

/// Enter `block` from `from`, landing at the start or end of the first
/// present chain its entry rules allow.
pub(crate) fn enter(
    doc: &Document,
    block: BlockId,
    from: Side,
    direction: Direction,
) -> Option<CursorPosition> {
    let config = doc.config(block)?;
    let start = config
        .entry(from, direction)
        .iter()
        .find_map(|&slot| doc.child(block, slot))?;
    let at_start = match direction {
        Direction::Right => true,
        Direction::Left => false,
        Direction::Up | Direction::Down => from == Side::Before,
    };
    Some(if at_start {
        chain_start_position(start)
    } else {
        chain_end_position(doc, start)
    })
}

/// Start of the next present chain after `link` in its lane.
pub(crate) fn lane_neighbour(doc: &Document, link: ParentLink, direction: Direction) -> Option<BlockId> {
    let config = doc.config(link.block)?;
    let lane = config.lane(link.slot, direction)?;
    let at = lane.iter().position(|&slot| slot == link.slot)?;
    if direction.is_forward() {
        lane[at + 1..]
            .iter()
            .find_map(|&slot| doc.child(link.block, slot))
    } else {
        lane[..at]
            .iter()
            .rev()
            .find_map(|&slot| doc.child(link.block, slot))
    }
}
