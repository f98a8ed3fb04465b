//! # mathfield-engine
//!
//! Core of a structured math editor. A formula is a tree of typed blocks:
//! atoms, plus composites (fractions, radicals, scripts, integrals,
//! derivatives, differentials, matrices, functions) that own named child
//! chains. The engine navigates and edits that tree and prints it to a
//! linear "calchub" text form for parsing and copy/paste.
//!
//! ```
//! use mathfield_engine::{Editor, EditorOptions};
//!
//! let mut editor = Editor::new(EditorOptions::default());
//! editor.insert_text("a");
//! editor.insert_text("/");
//! editor.insert_text("2");
//! assert_eq!(editor.to_calchub(), "\\frac{a,2}");
//! ```
//!
//! ## Modules
//!
//! - **`model`**: the block arena, chains, kinds and serialization
//! - **`cursor`**: cursor positions, arrow-key navigation, selections
//! - **`printing`**: block tree to linear text with a source map
//! - **`parsing`**: the parser boundary, the calchub parser and the
//!   AST-to-block builder
//! - **`editing`**: the `Editor`, commands, undo history and decoration

pub mod cursor;
pub mod editing;
pub mod model;
pub mod parsing;
pub mod printing;

pub use cursor::{CursorPosition, Direction, SelectionRange, Side};
pub use editing::{Cmd, EditError, Editor, EditorOptions, Event, Patch, SerializedState};
pub use model::{BlockId, BlockKind, Document, ModelError, SerializedBlock};
pub use parsing::{CalchubParser, MathParser, ParseError, ParseResult, SyntaxRole};
pub use printing::{Output, Printer};
