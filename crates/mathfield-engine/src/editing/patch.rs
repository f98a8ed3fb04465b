use crate::cursor::Direction;

use super::state::SerializedState;

/// Something the host should react to after a command.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum Event {
    /// The tree changed; carries the new state
    Change(SerializedState),
    /// The cursor tried to move out of the field
    CursorLeave(Direction),
    /// Backspace/delete at the very edge of the field
    DeleteOutOf(Direction),
    /// User-facing message for a rejected action
    Notice(String),
}

/// Result of applying a command
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct Patch {
    pub events: Vec<Event>,
    /// Whether the block tree changed
    pub changed: bool,
    pub version: u64,
}

impl Patch {
    pub fn notices(&self) -> impl Iterator<Item = &str> {
        self.events.iter().filter_map(|event| match event {
            Event::Notice(message) => Some(message.as_str()),
            _ => None,
        })
    }

    pub fn has(&self, wanted: impl Fn(&Event) -> bool) -> bool {
        self.events.iter().any(wanted)
    }
}
