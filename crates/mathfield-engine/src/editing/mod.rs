/*!
 * # Editing Core
 *
 * The [`Editor`] owns a [`Document`](crate::model::Document), the current
 * selection, undo history and decorations. Hosts drive it with [`Cmd`]s.
 *
 * ## Command Cycle
 *
 * Every [`Editor::apply`] call runs the same steps:
 *
 * 1. Snapshot the document and selection
 * 2. Execute the command against the block tree
 * 3. Check the tree's integrity; on an internal failure restore the
 *    snapshot and log it, on a rejected user action restore it and emit a
 *    [`Event::Notice`]
 * 4. Settle: sweep unreachable blocks, repair a stale cursor, reprint the
 *    linear text, refresh decorations, record history
 * 5. Return a [`Patch`] with the events for the host
 *
 * Only settled states are ever visible, so a half-applied command can't
 * leak out of `apply`.
 *
 * ## Module Structure
 *
 * - **`editor`**: `Editor`, the command cycle and read accessors
 * - **`commands`**: `Cmd` and the implementation of each command
 * - **`removal`**: per-kind backspace/delete rules
 * - **`supsub`**: sup/sub auto-merge
 * - **`history`**: snapshot undo/redo
 * - **`decoration`**: parser roles projected onto blocks
 * - **`state`**: serialized tree + selection
 * - **`patch`**: command results and host events
 */

pub mod commands;
pub mod decoration;
pub mod editor;
pub mod history;
pub mod patch;
pub mod removal;
pub mod state;
pub mod supsub;

pub use commands::Cmd;
pub use decoration::Decorations;
pub use editor::Editor;
pub use history::History;
pub use patch::{Event, Patch};
pub use state::{SerializedCursor, SerializedSelection, SerializedState};

use crate::model::ModelError;

/// Why a command did not complete.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum EditError {
    /// Rejected user action; shown to the user, tree left unchanged
    #[error("{0}")]
    InvalidAction(String),
    #[error(transparent)]
    Model(#[from] ModelError),
}

impl EditError {
    pub fn invalid(message: impl Into<String>) -> Self {
        EditError::InvalidAction(message.into())
    }
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct EditorOptions {
    /// Function names the parser recognises before `(`
    pub known_functions: Vec<String>,
    pub history_limit: usize,
    /// Pull the operand left of the cursor into the numerator on `/`
    pub smart_fraction: bool,
}

impl Default for EditorOptions {
    fn default() -> Self {
        Self {
            known_functions: ["sin", "cos", "tan", "log", "ln", "exp"]
                .map(String::from)
                .to_vec(),
            history_limit: history::DEFAULT_HISTORY_LIMIT,
            smart_fraction: true,
        }
    }
}
