//! Parser-driven decoration.
//!
//! The parser reports a role per character of the linear text; the
//! printer's source map says which block printed each character. Joining
//! the two gives every block a role. The first role seen for a block wins,
//! so a fraction's `\frac` prefix decides the fraction's role rather than
//! its closing brace.

use std::collections::HashMap;

use crate::model::BlockId;
use crate::parsing::{ParseError, ParseResult, SyntaxRole};
use crate::printing::Output;

#[derive(Clone, Debug, Default)]
pub struct Decorations {
    roles: HashMap<BlockId, SyntaxRole>,
    error: Option<ParseError>,
}

impl Decorations {
    pub fn role(&self, id: BlockId) -> Option<SyntaxRole> {
        self.roles.get(&id).copied()
    }

    /// The error from the most recent parse, if it failed.
    pub fn error(&self) -> Option<&ParseError> {
        self.error.as_ref()
    }

    /// Project `parsed` onto blocks. On a parse error the previous roles
    /// are kept.
    pub fn refresh(&mut self, linear: &Output, parsed: &ParseResult) {
        if let Some(error) = &parsed.error {
            log::debug!("decoration kept after parse error: {error}");
            self.error = Some(error.clone());
            return;
        }
        self.error = None;
        self.roles.clear();
        for (source, role) in linear.source().iter().zip(&parsed.source_map) {
            if let (Some(id), Some(role)) = (source, role) {
                self.roles.entry(*id).or_insert(*role);
            }
        }
    }
}
