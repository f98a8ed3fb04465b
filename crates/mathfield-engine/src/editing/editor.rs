use crate::cursor::{CursorPosition, Direction, SelectionRange, chain_end_position};
use crate::model::{BlockId, BlockKind, Document, ModelError, SerializedBlock};
use crate::parsing::{CalchubParser, MathParser, SyntaxRole};
use crate::printing::{Output, Printer, to_calchub};

use super::commands::{self, Cmd};
use super::decoration::Decorations;
use super::history::History;
use super::patch::{Event, Patch};
use super::state::{SerializedSelection, SerializedState};
use super::{EditError, EditorOptions};

/// One editable math field.
pub struct Editor {
    pub(crate) doc: Document,
    pub(crate) selection: SelectionRange,
    pub(crate) history: History,
    pub(crate) parser: Box<dyn MathParser>,
    pub(crate) options: EditorOptions,
    pub(crate) focused: bool,
    decorations: Decorations,
    linear: Output,
    version: u64,
}

impl Editor {
    pub fn new(options: EditorOptions) -> Self {
        Self::with_parser(options, Box::new(CalchubParser))
    }

    pub fn with_parser(options: EditorOptions, parser: Box<dyn MathParser>) -> Self {
        let doc = Document::new();
        let selection = doc
            .body()
            .map(|body| SelectionRange::collapsed(CursorPosition::before(body)))
            .unwrap_or_default();
        let mut editor = Self {
            doc,
            selection,
            history: History::new(options.history_limit),
            parser,
            options,
            focused: false,
            decorations: Decorations::default(),
            linear: Output::new(),
            version: 0,
        };
        editor.refresh();
        let seed = editor.serialize();
        editor.history.reset(seed);
        editor
    }

    /// Run one command through the full edit cycle.
    pub fn apply(&mut self, cmd: Cmd) -> Patch {
        let before_doc = self.doc.clone();
        let before_selection = self.selection;
        let before_root = self.history.current().map(|state| state.root.clone());
        let mut events = Vec::new();

        let outcome = commands::execute(self, &cmd, &mut events)
            .and_then(|()| self.doc.check_integrity().map_err(EditError::from));
        match outcome {
            Ok(()) => {}
            Err(EditError::InvalidAction(message)) => {
                self.doc = before_doc;
                self.selection = before_selection;
                events.push(Event::Notice(message));
            }
            Err(EditError::Model(error)) => {
                log::error!("{cmd:?} broke the block tree, restoring: {error}");
                self.doc = before_doc;
                self.selection = before_selection;
                events.retain(|event| matches!(event, Event::Notice(_)));
            }
        }

        let changed = self.settle(before_root.as_ref(), &mut events);
        Patch {
            events,
            changed,
            version: self.version,
        }
    }

    /// Sweep, repair and re-derive after a command. Returns whether the
    /// tree changed.
    fn settle(&mut self, before_root: Option<&SerializedBlock>, events: &mut Vec<Event>) -> bool {
        self.doc.collect_garbage();
        self.recover_selection();
        self.refresh();

        let state = self.serialize();
        let changed = before_root != Some(&state.root);
        self.history.record(state.clone());
        self.history.finish_replay();
        if changed {
            self.version += 1;
            events.push(Event::Change(state));
        }
        changed
    }

    fn refresh(&mut self) {
        self.linear = to_calchub(&self.doc);
        let parsed = self
            .parser
            .parse(self.linear.text(), &self.known_functions());
        self.decorations.refresh(&self.linear, &parsed);
    }

    /// Fall back to the document start when the selection names blocks that
    /// are gone.
    fn recover_selection(&mut self) {
        if self.selection.is_empty() {
            return;
        }
        let doc = &self.doc;
        let live = |position: Option<CursorPosition>| {
            position.is_some_and(|p| p.block != doc.root() && doc.is_attached(p.block))
        };
        if live(self.selection.anchor) && live(self.selection.focus) {
            self.selection = self.selection.normalize(doc);
            return;
        }
        log::warn!(
            "selection {:?} refers to removed blocks, moving to start",
            self.selection
        );
        self.selection = doc
            .body()
            .map(|body| SelectionRange::collapsed(CursorPosition::before(body)))
            .unwrap_or_default();
    }

    /// Replace the whole state, e.g. when the host loads a saved field.
    /// History starts over from the new state.
    pub fn apply_state(&mut self, state: &SerializedState) -> Result<(), ModelError> {
        self.doc = Document::from_serialized(&state.root)?;
        self.selection = state
            .selection
            .map(SerializedSelection::to_range)
            .unwrap_or_default();
        let mut events = Vec::new();
        self.settle(None, &mut events);
        let seed = self.serialize();
        self.history.reset(seed);
        Ok(())
    }

    pub fn serialize(&self) -> SerializedState {
        SerializedState {
            root: self.doc.serialize(),
            selection: SerializedSelection::from_range(&self.selection),
        }
    }

    pub fn document(&self) -> &Document {
        &self.doc
    }

    pub fn selection(&self) -> SelectionRange {
        self.selection
    }

    pub fn cursor(&self) -> Option<CursorPosition> {
        self.selection.focus
    }

    /// Cursor used by edits: the focus, or the document end when there is
    /// no selection.
    pub(crate) fn edit_cursor(&self) -> CursorPosition {
        match self.selection.focus {
            Some(focus) => focus.normalize(&self.doc),
            None => self.document_end(),
        }
    }

    pub(crate) fn document_end(&self) -> CursorPosition {
        match self.doc.body() {
            Some(body) => chain_end_position(&self.doc, body),
            None => CursorPosition::before(self.doc.root()),
        }
    }

    pub fn to_calchub(&self) -> String {
        self.linear.text().to_string()
    }

    pub fn linear(&self) -> &Output {
        &self.linear
    }

    pub fn decoration(&self, id: BlockId) -> Option<SyntaxRole> {
        self.decorations.role(id)
    }

    pub fn decorations(&self) -> &Decorations {
        &self.decorations
    }

    pub fn render_display(&self) -> String {
        Printer::display(self.cursor())
            .print_document(&self.doc)
            .text()
            .to_string()
    }

    /// Cursor offset in characters into [`Editor::to_calchub`].
    pub fn cursor_offset(&self) -> Option<usize> {
        Printer::calchub()
            .with_cursor(self.cursor())
            .cursor_offset(&self.doc)
    }

    /// Configured function names plus any used in the document.
    pub fn known_functions(&self) -> Vec<String> {
        let mut names = self.options.known_functions.clone();
        names.extend(self.doc.function_names());
        names.sort();
        names.dedup();
        names
    }

    pub fn options(&self) -> &EditorOptions {
        &self.options
    }

    pub fn is_focused(&self) -> bool {
        self.focused
    }

    pub fn version(&self) -> u64 {
        self.version
    }

    pub fn can_undo(&self) -> bool {
        self.history.can_undo()
    }

    pub fn can_redo(&self) -> bool {
        self.history.can_redo()
    }

    pub fn insert_text(&mut self, text: &str) -> Patch {
        self.apply(Cmd::InsertText {
            text: text.to_string(),
        })
    }

    pub fn insert_block(&mut self, kind: BlockKind, data: Option<&str>) -> Patch {
        self.apply(Cmd::InsertBlock {
            kind,
            data: data.map(str::to_string),
        })
    }

    pub fn backspace(&mut self) -> Patch {
        self.apply(Cmd::Backspace)
    }

    pub fn delete(&mut self) -> Patch {
        self.apply(Cmd::Delete)
    }

    pub fn move_cursor(&mut self, direction: Direction) -> Patch {
        self.apply(Cmd::MoveCursor { direction })
    }

    pub fn expand_selection(&mut self, direction: Direction) -> Patch {
        self.apply(Cmd::ExpandSelection { direction })
    }

    pub fn select_all(&mut self) -> Patch {
        self.apply(Cmd::SelectAll)
    }

    pub fn set_selection(&mut self, selection: SelectionRange) -> Patch {
        self.apply(Cmd::SetSelection { selection })
    }

    pub fn undo(&mut self) -> Patch {
        self.apply(Cmd::Undo)
    }

    pub fn redo(&mut self) -> Patch {
        self.apply(Cmd::Redo)
    }

    pub fn focus(&mut self) -> Patch {
        self.apply(Cmd::Focus)
    }

    pub fn blur(&mut self) -> Patch {
        self.apply(Cmd::Blur)
    }
}

impl Default for Editor {
    fn default() -> Self {
        Self::new(EditorOptions::default())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::editing::SerializedCursor;
    use crate::parsing::{ParseError, ParseResult};
    use pretty_assertions::assert_eq;

    /// A parser that understands nothing.
    struct Failing;

    impl MathParser for Failing {
        fn parse(&self, text: &str, _known: &[String]) -> ParseResult {
            ParseResult {
                tree: None,
                error: Some(ParseError::new("unsupported", 0)),
                source_map: vec![None; text.chars().count()],
            }
        }
    }

    #[test]
    fn new_editor_is_empty_with_cursor_in_body() {
        let editor = Editor::default();
        assert_eq!(editor.to_calchub(), "");
        assert_eq!(editor.render_display(), "│□");
        assert!(!editor.can_undo());
        assert_eq!(editor.cursor_offset(), Some(0));
    }

    #[test]
    fn change_event_carries_state() {
        let mut editor = Editor::default();
        let patch = editor.insert_text("x");
        assert!(patch.changed);
        assert_eq!(patch.version, 1);
        assert_eq!(patch.events, vec![Event::Change(editor.serialize())]);
    }

    #[test]
    fn cursor_moves_do_not_change() {
        let mut editor = Editor::default();
        editor.insert_text("x");
        let patch = editor.move_cursor(Direction::Left);
        assert!(!patch.changed);
        assert_eq!(patch.version, 1);
        assert!(!editor.can_redo());
    }

    #[test]
    fn apply_state_round_trip() {
        let mut editor = Editor::default();
        editor.insert_text("\\frac{1,x}");
        let state = editor.serialize();

        let mut other = Editor::default();
        other.apply_state(&state).unwrap();
        assert_eq!(other.serialize(), state);
        assert_eq!(other.to_calchub(), "\\frac{1,x}");
        assert!(!other.can_undo());
    }

    #[test]
    fn stale_selection_falls_back_to_start() {
        let mut editor = Editor::default();
        editor.insert_text("ab");
        let mut state = editor.serialize();
        let stale = SerializedCursor {
            block_id: BlockId(999),
            side: 0,
        };
        state.selection = Some(SerializedSelection {
            start: stale,
            end: stale,
        });
        editor.apply_state(&state).unwrap();
        let body = editor.document().body().unwrap();
        assert_eq!(editor.cursor(), Some(CursorPosition::before(body)));
    }

    #[test]
    fn failing_parser_keeps_working() {
        let mut editor = Editor::with_parser(EditorOptions::default(), Box::new(Failing));
        editor.insert_text("x");
        assert_eq!(editor.to_calchub(), "x");
        assert!(editor.decorations().error().is_some());
        // paste falls back to literal atoms
        editor.insert_text("+1");
        assert_eq!(editor.to_calchub(), "x+1");
    }

    #[test]
    fn edit_error_messages() {
        assert_eq!(EditError::invalid("nope").to_string(), "nope");
    }

    #[test]
    fn known_functions_include_document_functions() {
        let mut editor = Editor::default();
        editor.insert_block(BlockKind::Function, Some("g"));
        assert!(editor.known_functions().contains(&"g".to_string()));
        assert!(editor.known_functions().contains(&"sin".to_string()));
    }
}
