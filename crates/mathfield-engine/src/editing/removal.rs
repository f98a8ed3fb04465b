//! Per-kind backspace/delete rules.
//!
//! These run when the cursor sits at the edge of a child chain and the
//! user deletes towards the composite that owns it. Backspace rules are
//! called with the cursor at the start of the chain in `link`, delete
//! rules with the cursor at its end. Each returns the new cursor, or `None`
//! when there is nothing to do.

use crate::cursor::navigation::lane_neighbour;
use crate::cursor::{CursorPosition, Direction, Side, chain_end_position, chain_start_position};
use crate::model::{BlockId, BlockKind, Document, ModelError, ParentLink, slot};

type Removal = Result<Option<CursorPosition>, ModelError>;

/// Unlink `id`, returning the boundary it leaves behind. The last block of
/// a chain is swapped for a blank so the chain never disappears.
pub fn remove_block(doc: &mut Document, id: BlockId) -> Result<CursorPosition, ModelError> {
    if doc.owner(id).is_none() {
        return Err(ModelError::Detached(id));
    }
    let (left, right) = (doc.left(id), doc.right(id));
    match (left, right) {
        (Some(left), _) => {
            doc.remove(id)?;
            Ok(CursorPosition::after(left).normalize(doc))
        }
        (None, Some(right)) => {
            doc.remove(id)?;
            Ok(CursorPosition::before(right))
        }
        (None, None) => {
            let blank = doc.create(BlockKind::Blank, None);
            doc.replace_with(id, blank)?;
            Ok(CursorPosition::before(blank))
        }
    }
}

/// Replace `block` with the contents of its `slot` chain.
///
/// With `Side::Before` the cursor lands where the block started, with
/// `Side::After` at the end of the promoted content. A blank chain has no
/// content, so the block is simply removed.
pub fn promote(
    doc: &mut Document,
    block: BlockId,
    slot: usize,
    land: Side,
) -> Result<CursorPosition, ModelError> {
    if doc.is_blank_chain(doc.child(block, slot)) {
        return remove_block(doc, block);
    }
    let start = doc
        .take_chain(block, slot)?
        .ok_or(ModelError::MissingChainStart {
            parent: block,
            slot,
        })?;
    doc.replace_with(block, start)?;
    Ok(match land {
        Side::Before => CursorPosition::before(start).normalize(doc),
        Side::After => chain_end_position(doc, start),
    })
}

/// Remove `block` when nothing was typed into it, otherwise step out of it
/// on `side`.
pub fn exit_or_remove(
    doc: &mut Document,
    block: BlockId,
    side: Side,
) -> Result<CursorPosition, ModelError> {
    if doc.is_all_blank(block) {
        remove_block(doc, block)
    } else {
        Ok(CursorPosition::new(block, side).normalize(doc))
    }
}

fn end_of(doc: &Document, block: BlockId, slot: usize) -> Option<CursorPosition> {
    doc.child(block, slot)
        .map(|start| chain_end_position(doc, start))
}

pub fn stay(_doc: &mut Document, _link: ParentLink) -> Removal {
    Ok(None)
}

pub fn backspace_default(doc: &mut Document, link: ParentLink) -> Removal {
    if let Some(previous) = lane_neighbour(doc, link, Direction::Left) {
        return Ok(Some(chain_end_position(doc, previous)));
    }
    exit_or_remove(doc, link.block, Side::Before).map(Some)
}

pub fn delete_default(doc: &mut Document, link: ParentLink) -> Removal {
    if let Some(next) = lane_neighbour(doc, link, Direction::Right) {
        return Ok(Some(chain_start_position(next)));
    }
    exit_or_remove(doc, link.block, Side::After).map(Some)
}

pub fn backspace_fraction(doc: &mut Document, link: ParentLink) -> Removal {
    let fraction = link.block;
    if link.slot != slot::DENOM {
        return exit_or_remove(doc, fraction, Side::Before).map(Some);
    }
    if doc.is_blank_chain(doc.child(fraction, slot::DENOM)) {
        promote(doc, fraction, slot::NUM, Side::After).map(Some)
    } else {
        Ok(end_of(doc, fraction, slot::NUM))
    }
}

pub fn delete_fraction(doc: &mut Document, link: ParentLink) -> Removal {
    let fraction = link.block;
    if link.slot != slot::NUM {
        return exit_or_remove(doc, fraction, Side::After).map(Some);
    }
    if doc.is_blank_chain(doc.child(fraction, slot::DENOM)) {
        promote(doc, fraction, slot::NUM, Side::After).map(Some)
    } else {
        Ok(doc
            .child(fraction, slot::DENOM)
            .map(chain_start_position))
    }
}

pub fn backspace_radical(doc: &mut Document, link: ParentLink) -> Removal {
    let radical = link.block;
    let index = doc.child(radical, slot::RADICAL_INDEX);
    match (link.slot, index) {
        (slot::RADICAL_INNER, None) => {
            promote(doc, radical, slot::RADICAL_INNER, Side::Before).map(Some)
        }
        (_, Some(_)) if doc.is_blank_chain(index) => {
            doc.take_chain(radical, slot::RADICAL_INDEX)?;
            Ok(doc
                .child(radical, slot::RADICAL_INNER)
                .map(chain_start_position))
        }
        (slot::RADICAL_INNER, Some(index)) => Ok(Some(chain_end_position(doc, index))),
        _ => exit_or_remove(doc, radical, Side::Before).map(Some),
    }
}

pub fn backspace_sup_sub(doc: &mut Document, link: ParentLink) -> Removal {
    if doc.is_blank_chain(doc.child(link.block, link.slot)) {
        return drop_script(doc, link, Side::Before).map(Some);
    }
    Ok(Some(CursorPosition::before(link.block).normalize(doc)))
}

pub fn delete_sup_sub(doc: &mut Document, link: ParentLink) -> Removal {
    if doc.is_blank_chain(doc.child(link.block, link.slot)) {
        return drop_script(doc, link, Side::After).map(Some);
    }
    Ok(Some(CursorPosition::after(link.block)))
}

/// Drop the script in `link`; a script block left with neither script is
/// removed. Otherwise the cursor moves into the remaining script, at its
/// end for backspace and its start for delete.
fn drop_script(doc: &mut Document, link: ParentLink, towards: Side) -> Result<CursorPosition, ModelError> {
    let scripts = link.block;
    doc.take_chain(scripts, link.slot)?;
    let other = if link.slot == slot::SUP {
        slot::SUB
    } else {
        slot::SUP
    };
    match doc.child(scripts, other) {
        None => remove_block(doc, scripts),
        Some(start) => Ok(match towards {
            Side::Before => chain_end_position(doc, start),
            Side::After => chain_start_position(start),
        }),
    }
}

/// Blank bounds collapse into an indefinite integral; every other edge
/// follows the default lane rule.
pub fn backspace_integral(doc: &mut Document, link: ParentLink) -> Removal {
    let integral = link.block;
    let on_bound = link.slot == slot::LEFT_BOUND || link.slot == slot::RIGHT_BOUND;
    let left = doc.child(integral, slot::LEFT_BOUND);
    let right = doc.child(integral, slot::RIGHT_BOUND);
    if on_bound
        && (left.is_some() || right.is_some())
        && doc.is_blank_chain(left)
        && doc.is_blank_chain(right)
    {
        doc.take_chain(integral, slot::LEFT_BOUND)?;
        doc.take_chain(integral, slot::RIGHT_BOUND)?;
        return Ok(doc
            .child(integral, slot::INTEGRAND)
            .map(chain_start_position));
    }
    backspace_default(doc, link)
}

pub fn backspace_derivative(doc: &mut Document, link: ParentLink) -> Removal {
    if link.slot == slot::DERIVATIVE_WRT {
        return promote(doc, link.block, slot::DERIVATIVE_INNER, Side::Before).map(Some);
    }
    backspace_default(doc, link)
}

pub fn backspace_differential(doc: &mut Document, link: ParentLink) -> Removal {
    promote(doc, link.block, slot::DIFFERENTIAL_INNER, Side::Before).map(Some)
}
