//! # Printing
//!
//! Turns the block tree into linear text. Two flavours share one printer:
//!
//! - the calchub linear form (`\frac{a,b}`, `x_1^{2}`, ...) fed to the
//!   parser for decoration and used as the copy/paste format
//! - a display form for terminals, with a placeholder for blanks and an
//!   optional cursor marker
//!
//! Every printed character carries the id of the block that produced it
//! (see [`Output`]), which is how parser results map back onto blocks.

pub mod output;
pub mod printer;

pub use output::{HEX_PREFIX, HEX_SUFFIX, Output};
pub use printer::Printer;

use crate::model::Document;

/// The calchub linear form of the whole document.
pub fn to_calchub(doc: &Document) -> Output {
    Printer::calchub().print_document(doc)
}
