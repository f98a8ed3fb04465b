//! Edit commands.
//!
//! [`execute`] runs one [`Cmd`] against an [`Editor`]. Commands may leave the
//! selection pointing at removed blocks or skip normalization; the editor's
//! settle step cleans that up. Returning `EditError::InvalidAction` rolls
//! the whole command back.

use crate::cursor::navigation::enter;
use crate::cursor::{
    CursorPosition, Direction, SelectionRange, Side, chain_end_position, chain_start_position,
    next_position,
};
use crate::model::kinds::parse_dimensions;
use crate::model::{BlockId, BlockKind, Document, ModelError, behavior, slot};
use crate::parsing::parser::is_operator_name;
use crate::parsing::{BuildError, build_from_text};
use crate::printing::Output;

use super::editor::Editor;
use super::patch::Event;
use super::removal::remove_block;
use super::state::SerializedState;
use super::supsub::{merge_around, merge_at};
use super::{EditError, SerializedSelection};

#[derive(Clone, Debug, PartialEq, Eq)]
pub enum Cmd {
    InsertText { text: String },
    InsertBlock { kind: BlockKind, data: Option<String> },
    Backspace,
    Delete,
    MoveCursor { direction: Direction },
    ExpandSelection { direction: Direction },
    SelectAll,
    SetSelection { selection: SelectionRange },
    Undo,
    Redo,
    Focus,
    Blur,
}

const OPERATOR_ATOMS: &[&str] = &["+", "-", "=", "<", ">", ",", ";", "*", "/"];

pub(crate) fn execute(
    editor: &mut Editor,
    cmd: &Cmd,
    events: &mut Vec<Event>,
) -> Result<(), EditError> {
    match cmd {
        Cmd::InsertText { text } => insert_text(editor, text),
        Cmd::InsertBlock { kind, data } => insert_block(editor, *kind, data.clone()),
        Cmd::Backspace => remove(editor, Direction::Left, events),
        Cmd::Delete => remove(editor, Direction::Right, events),
        Cmd::MoveCursor { direction } => {
            move_cursor(editor, *direction, events);
            Ok(())
        }
        Cmd::ExpandSelection { direction } => {
            expand_selection(editor, *direction);
            Ok(())
        }
        Cmd::SelectAll => {
            select_all(editor);
            Ok(())
        }
        Cmd::SetSelection { selection } => {
            editor.selection = *selection;
            Ok(())
        }
        Cmd::Undo => match editor.history.undo_target().cloned() {
            Some(state) => {
                restore(editor, &state)?;
                editor.history.undo();
                Ok(())
            }
            None => Ok(()),
        },
        Cmd::Redo => match editor.history.redo_target().cloned() {
            Some(state) => {
                restore(editor, &state)?;
                editor.history.redo();
                Ok(())
            }
            None => Ok(()),
        },
        Cmd::Focus => {
            editor.focused = true;
            if editor.selection.is_empty() {
                editor.selection = SelectionRange::collapsed(editor.document_end());
            }
            Ok(())
        }
        Cmd::Blur => {
            editor.focused = false;
            editor.selection = SelectionRange::default();
            Ok(())
        }
    }
}

fn restore(editor: &mut Editor, state: &SerializedState) -> Result<(), EditError> {
    editor.doc = Document::from_serialized(&state.root)?;
    editor.selection = state
        .selection
        .map(SerializedSelection::to_range)
        .unwrap_or_default();
    Ok(())
}

fn set_cursor(editor: &mut Editor, at: CursorPosition) {
    editor.selection = SelectionRange::collapsed(at);
}

fn is_operator_atom(doc: &Document, id: BlockId) -> bool {
    doc.kind(id) == Some(BlockKind::Atom)
        && doc
            .data(id)
            .is_some_and(|text| OPERATOR_ATOMS.contains(&text) || is_operator_name(text))
}

/// A single-letter or named variable such as `x` or `alpha`.
fn is_symbol_atom(doc: &Document, id: BlockId) -> bool {
    doc.kind(id) == Some(BlockKind::Atom)
        && doc.data(id).is_some_and(|text| {
            !text.is_empty() && text.chars().all(char::is_alphabetic) && !is_operator_name(text)
        })
}

// --- insertion ---

fn insert_text(editor: &mut Editor, text: &str) -> Result<(), EditError> {
    let decoded = Output::decode_hex(text);
    let mut chars = decoded.chars();
    match (chars.next(), chars.next()) {
        (None, _) => Ok(()),
        (Some(ch), None) => insert_char(editor, ch),
        // hex escapes inside subscripts are the parser's to decode
        _ => paste(editor, text),
    }
}

fn insert_char(editor: &mut Editor, ch: char) -> Result<(), EditError> {
    match ch {
        '/' => insert_fraction(editor),
        '^' => insert_script(editor, slot::SUP),
        '_' => insert_script(editor, slot::SUB),
        ch if ch.is_whitespace() => Ok(()),
        ch => {
            delete_selection_if_any(editor)?;
            insert_atom(editor, ch)
        }
    }
}

fn insert_atom(editor: &mut Editor, ch: char) -> Result<(), EditError> {
    let atom = editor.doc.create(BlockKind::Atom, Some(ch.to_string()));
    insert_chain_at_cursor(editor, atom)
}

/// Parse `text` and splice the result in; text the parser rejects is typed
/// in one character at a time.
fn paste(editor: &mut Editor, text: &str) -> Result<(), EditError> {
    delete_selection_if_any(editor)?;
    let known = editor.known_functions();
    match build_from_text(&mut editor.doc, editor.parser.as_ref(), text, &known) {
        Ok(Some(start)) => insert_chain_at_cursor(editor, start),
        Ok(None) => Ok(()),
        Err(BuildError::Model(error)) => Err(error.into()),
        Err(error) => {
            log::debug!("pasting {text:?} as plain text: {error}");
            for ch in Output::decode_hex(text).chars() {
                insert_char(editor, ch)?;
            }
            Ok(())
        }
    }
}

/// Link the detached chain at `start` in at the cursor without moving it.
/// A blank under the cursor is replaced.
fn place(doc: &mut Document, at: CursorPosition, start: BlockId) -> Result<(), ModelError> {
    let at = at.normalize(doc);
    if doc.is_blank(at.block) {
        doc.replace_with(at.block, start)
    } else {
        match at.side {
            Side::After => doc.insert_chain_right(at.block, start),
            Side::Before => doc.insert_chain_left(at.block, start),
        }
    }
}

/// Insert a chain at the cursor and move the cursor past it.
fn insert_chain_at_cursor(editor: &mut Editor, start: BlockId) -> Result<(), EditError> {
    let at = editor.edit_cursor();
    let doc = &mut editor.doc;
    place(doc, at, start)?;
    let end = doc.chain_end(start);
    let cursor = merge_around(doc, end, CursorPosition::after(end))?;
    let cursor = merge_around(doc, start, cursor)?;
    set_cursor(editor, cursor);
    Ok(())
}

/// The run of blocks left of `at` back to the nearest operator or
/// unmatched opening bracket.
fn smart_numerator(doc: &Document, at: CursorPosition) -> Option<(BlockId, BlockId)> {
    let last = at.block_left(doc)?;
    let mut first = None;
    let mut depth = 0usize;
    let mut current = Some(last);
    while let Some(id) = current {
        match doc.data(id).filter(|_| doc.kind(id) == Some(BlockKind::Atom)) {
            Some(")") => depth += 1,
            Some("(") if depth == 0 => break,
            Some("(") => depth -= 1,
            _ if depth == 0 && is_operator_atom(doc, id) => break,
            _ => {}
        }
        first = Some(id);
        current = doc.left(id);
    }
    first.map(|first| (first, last))
}

fn insert_fraction(editor: &mut Editor) -> Result<(), EditError> {
    let at = editor.edit_cursor();
    let selected = if editor.selection.is_collapsed(&editor.doc) || editor.selection.is_empty() {
        None
    } else {
        editor.selection.clamp(&editor.doc).and_then(|range| {
            let blocks = range.blocks(&editor.doc);
            Some((*blocks.first()?, *blocks.last()?))
        })
    };
    let numerator = match selected {
        Some(run) => Some(run),
        None if editor.options.smart_fraction => smart_numerator(&editor.doc, at),
        None => None,
    };

    let doc = &mut editor.doc;
    let fraction = doc.create(BlockKind::Fraction, None);
    let cursor = match numerator {
        Some((first, last)) => {
            doc.insert_chain_right(last, fraction)?;
            let start = doc.detach_range(first, last)?;
            doc.replace_chain(fraction, slot::NUM, Some(start))?;
            doc.child(fraction, slot::DENOM)
                .map(chain_start_position)
        }
        None => {
            place(doc, at, fraction)?;
            doc.child(fraction, slot::NUM).map(chain_start_position)
        }
    };
    set_cursor(editor, cursor.unwrap_or(CursorPosition::after(fraction)));
    Ok(())
}

fn as_scripts(doc: &Document, id: Option<BlockId>) -> Option<BlockId> {
    id.filter(|id| doc.kind(*id) == Some(BlockKind::SupSub))
}

/// Open the `script` slot of an adjacent sup/sub block, creating one right
/// of the cursor when there is none.
fn insert_script(editor: &mut Editor, script: usize) -> Result<(), EditError> {
    delete_selection_if_any(editor)?;
    let at = editor.edit_cursor();
    let doc = &mut editor.doc;
    let left = at.block_left(doc);
    let existing = as_scripts(doc, left).or_else(|| as_scripts(doc, at.block_right(doc)));
    let base = match existing {
        Some(scripts) if Some(scripts) == left => doc.left(scripts),
        _ => left,
    };

    if script == slot::SUB && !base.is_some_and(|base| is_symbol_atom(doc, base)) {
        return Err(EditError::invalid(
            "Subscripts can only be attached to a symbol",
        ));
    }
    if existing.is_none() && base.is_none() {
        return Err(EditError::invalid(
            "Superscripts need something to their left",
        ));
    }

    let scripts = match existing {
        Some(scripts) => scripts,
        None => {
            let scripts = doc.create(BlockKind::SupSub, None);
            place(doc, at, scripts)?;
            scripts
        }
    };
    let cursor = match doc.child(scripts, script) {
        Some(start) => chain_end_position(doc, start),
        None => {
            let blank = doc.create(BlockKind::Blank, None);
            doc.replace_chain(scripts, script, Some(blank))?;
            CursorPosition::before(blank)
        }
    };
    set_cursor(editor, cursor);
    Ok(())
}

fn insert_block(editor: &mut Editor, kind: BlockKind, data: Option<String>) -> Result<(), EditError> {
    let definite = kind == BlockKind::Integral && data.as_deref() == Some("definite");
    let data = match kind {
        BlockKind::Fraction
        | BlockKind::Radical
        | BlockKind::Integral
        | BlockKind::Derivative
        | BlockKind::Differential => None,
        BlockKind::Matrix => {
            if parse_dimensions(data.as_deref()).is_none() {
                return Err(EditError::invalid(
                    "Matrix size must be RxC with 1 to 10 rows and columns",
                ));
            }
            data
        }
        BlockKind::Function => {
            let valid = data
                .as_deref()
                .is_some_and(|name| !name.is_empty() && name.chars().all(|c| c.is_ascii_alphabetic()));
            if !valid {
                return Err(EditError::invalid("Function names must be letters only"));
            }
            data
        }
        BlockKind::Root | BlockKind::Blank | BlockKind::Atom | BlockKind::SupSub => {
            return Err(EditError::invalid(format!("{kind} blocks can't be inserted")));
        }
    };

    delete_selection_if_any(editor)?;
    let at = editor.edit_cursor();
    let doc = &mut editor.doc;
    let block = doc.create(kind, data);
    if definite {
        for bound in [slot::LEFT_BOUND, slot::RIGHT_BOUND] {
            let blank = doc.create(BlockKind::Blank, None);
            doc.replace_chain(block, bound, Some(blank))?;
        }
    }
    place(doc, at, block)?;
    let cursor = next_position(doc, CursorPosition::before(block), Direction::Right)
        .unwrap_or(CursorPosition::after(block));
    set_cursor(editor, cursor);
    Ok(())
}

// --- removal ---

/// Remove the selected blocks. Returns false when there was nothing
/// selected.
fn delete_selection_if_any(editor: &mut Editor) -> Result<bool, EditError> {
    if editor.selection.is_empty() || editor.selection.is_collapsed(&editor.doc) {
        return Ok(false);
    }
    let Some(range) = editor.selection.clamp(&editor.doc) else {
        return Ok(false);
    };
    let blocks = range.blocks(&editor.doc);
    let (Some(&first), Some(&last)) = (blocks.first(), blocks.last()) else {
        set_cursor(editor, range.start);
        return Ok(false);
    };
    let cursor = remove_range(&mut editor.doc, first, last)?;
    set_cursor(editor, cursor);
    Ok(true)
}

/// Cut `first..=last` out of its chain, returning the boundary left behind.
pub fn remove_range(
    doc: &mut Document,
    first: BlockId,
    last: BlockId,
) -> Result<CursorPosition, ModelError> {
    let cursor = match (doc.left(first), doc.right(last)) {
        (Some(left), _) => {
            doc.detach_range(first, last)?;
            CursorPosition::after(left)
        }
        (None, Some(right)) => {
            doc.detach_range(first, last)?;
            CursorPosition::before(right)
        }
        (None, None) => {
            let blank = doc.create(BlockKind::Blank, None);
            doc.insert_chain_right(last, blank)?;
            doc.detach_range(first, last)?;
            CursorPosition::before(blank)
        }
    };
    merge_at(doc, cursor)
}

/// Backspace (`Left`) or delete (`Right`).
fn remove(editor: &mut Editor, direction: Direction, events: &mut Vec<Event>) -> Result<(), EditError> {
    if delete_selection_if_any(editor)? {
        return Ok(());
    }
    let at = editor.edit_cursor();
    let backwards = direction == Direction::Left;
    let doc = &mut editor.doc;
    let neighbour = if backwards {
        at.block_left(doc)
    } else {
        at.block_right(doc)
    };

    let cursor = match neighbour {
        Some(id) if doc.is_composite(id) => {
            let from = if backwards { Side::After } else { Side::Before };
            match enter(doc, id, from, direction) {
                Some(inside) => inside,
                None => {
                    let cursor = remove_block(doc, id)?;
                    merge_at(doc, cursor)?
                }
            }
        }
        Some(id) => {
            let cursor = remove_block(doc, id)?;
            merge_at(doc, cursor)?
        }
        None => {
            let link = doc.owner(at.block).ok_or(ModelError::Detached(at.block))?;
            if link.block == doc.root() {
                events.push(Event::DeleteOutOf(direction));
                return Ok(());
            }
            let kind = doc.kind(link.block).ok_or(ModelError::UnknownBlock(link.block))?;
            let rule = if backwards {
                behavior(kind).backspace_from_child
            } else {
                behavior(kind).delete_from_child
            };
            match rule(doc, link)? {
                Some(cursor) => merge_at(doc, cursor)?,
                None => at,
            }
        }
    };
    set_cursor(editor, cursor);
    Ok(())
}

// --- cursor and selection ---

fn move_cursor(editor: &mut Editor, direction: Direction, events: &mut Vec<Event>) {
    let selection = editor.selection;
    if direction.is_horizontal()
        && !selection.is_empty()
        && !selection.is_collapsed(&editor.doc)
    {
        let edge = match direction {
            Direction::Left => selection.start(&editor.doc),
            _ => selection.end(&editor.doc),
        };
        if let Some(edge) = edge {
            set_cursor(editor, edge);
            return;
        }
    }

    let at = editor.edit_cursor();
    match next_position(&editor.doc, at, direction) {
        Some(next) => set_cursor(editor, next),
        None => {
            events.push(Event::CursorLeave(direction));
            set_cursor(editor, at);
        }
    }
}

/// Move the focus one block along its chain, stepping out to the enclosing
/// block at the chain's edge.
fn expand_selection(editor: &mut Editor, direction: Direction) {
    let doc = &editor.doc;
    let cursor = editor.edit_cursor();
    let anchor = editor.selection.anchor.unwrap_or(cursor);
    let focus = cursor;

    let step_out = |side: Side| {
        doc.owner(focus.block)
            .filter(|link| link.block != doc.root())
            .map(|link| CursorPosition::new(link.block, side).normalize(doc))
    };
    let next = match direction {
        Direction::Right => match focus.block_right(doc) {
            Some(id) => Some(CursorPosition::after(id)),
            None => step_out(Side::After),
        },
        Direction::Left => match focus.block_left(doc) {
            Some(id) => Some(CursorPosition::before(id).normalize(doc)),
            None => step_out(Side::Before),
        },
        Direction::Up if focus.is_chain_start(doc) => step_out(Side::Before),
        Direction::Up => Some(chain_start_position(doc.chain_start(focus.block))),
        Direction::Down if focus.is_chain_end(doc) => step_out(Side::After),
        Direction::Down => Some(chain_end_position(doc, focus.block)),
    };
    if let Some(next) = next {
        editor.selection = SelectionRange::new(anchor, next);
    }
}

fn select_all(editor: &mut Editor) {
    if let Some(body) = editor.doc.body() {
        editor.selection = SelectionRange::new(
            CursorPosition::before(body),
            chain_end_position(&editor.doc, body),
        );
    }
}
