//! Serialized editor state: the block tree plus the selection.
//!
//! This is what the host persists, what `Change` events carry and what the
//! undo history stores.

use serde::{Deserialize, Serialize};

use crate::cursor::{CursorPosition, SelectionRange, Side};
use crate::model::{BlockId, SerializedBlock};

#[derive(Copy, Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct SerializedCursor {
    #[serde(rename = "blockId")]
    pub block_id: BlockId,
    /// 0 for before, 1 for after
    pub side: u8,
}

impl From<CursorPosition> for SerializedCursor {
    fn from(position: CursorPosition) -> Self {
        Self {
            block_id: position.block,
            side: position.side.as_u8(),
        }
    }
}

impl SerializedCursor {
    /// `None` for an out-of-range side.
    pub fn to_position(self) -> Option<CursorPosition> {
        Side::from_u8(self.side).map(|side| CursorPosition::new(self.block_id, side))
    }
}

#[derive(Copy, Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct SerializedSelection {
    pub start: SerializedCursor,
    pub end: SerializedCursor,
}

impl SerializedSelection {
    pub fn from_range(range: &SelectionRange) -> Option<Self> {
        Some(Self {
            start: range.anchor?.into(),
            end: range.focus?.into(),
        })
    }

    pub fn to_range(self) -> SelectionRange {
        SelectionRange {
            anchor: self.start.to_position(),
            focus: self.end.to_position(),
        }
    }
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct SerializedState {
    pub root: SerializedBlock,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub selection: Option<SerializedSelection>,
}

impl SerializedState {
    pub fn to_json(&self) -> Result<String, serde_json::Error> {
        serde_json::to_string(self)
    }

    pub fn from_json(json: &str) -> Result<Self, serde_json::Error> {
        serde_json::from_str(json)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::Document;
    use insta::assert_snapshot;
    use pretty_assertions::assert_eq;

    #[test]
    fn state_json_shape() {
        let doc = Document::new();
        let body = doc.body().unwrap();
        let state = SerializedState {
            root: doc.serialize(),
            selection: SerializedSelection::from_range(&SelectionRange::collapsed(
                CursorPosition::before(body),
            )),
        };
        assert_snapshot!(state.to_json().unwrap(), @r#"{"root":{"id":0,"type":"root","children":{"body":[{"id":1,"type":"blank"}]}},"selection":{"start":{"blockId":1,"side":0},"end":{"blockId":1,"side":0}}}"#);
    }

    #[test]
    fn selection_survives_json() {
        let doc = Document::new();
        let body = doc.body().unwrap();
        let range = SelectionRange::new(CursorPosition::before(body), CursorPosition::after(body));
        let state = SerializedState {
            root: doc.serialize(),
            selection: SerializedSelection::from_range(&range),
        };
        let back = SerializedState::from_json(&state.to_json().unwrap()).unwrap();
        assert_eq!(back, state);
        assert_eq!(back.selection.unwrap().to_range(), range);
    }

    #[test]
    fn bad_side_is_dropped() {
        let cursor = SerializedCursor {
            block_id: BlockId(3),
            side: 7,
        };
        assert_eq!(cursor.to_position(), None);
    }
}
