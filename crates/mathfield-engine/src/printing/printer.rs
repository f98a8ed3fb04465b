//! Block-tree printer.
//!
//! The per-kind `print_*` functions are wired into the kind behavior table;
//! [`Printer::print_block`] dispatches through it.

use crate::cursor::CursorPosition;
use crate::model::kinds::parse_dimensions;
use crate::model::{BlockId, Document, behavior, slot};

use super::Output;

const DISPLAY_PLACEHOLDER: &str = "□";
const DISPLAY_CURSOR: &str = "│";

#[derive(Clone, Copy, Debug, Default)]
pub struct Printer {
    placeholder: Option<&'static str>,
    cursor: Option<CursorPosition>,
    /// Multi-character subscripts as `\h..;` tokens rather than `{..}`
    hex_subscripts: bool,
}

impl Printer {
    /// The linear form used for parsing and copy/paste.
    pub fn calchub() -> Self {
        Self {
            placeholder: None,
            cursor: None,
            hex_subscripts: true,
        }
    }

    /// Human-facing form: blanks show a placeholder and the cursor (already
    /// normalized) is drawn as a bar.
    pub fn display(cursor: Option<CursorPosition>) -> Self {
        Self {
            placeholder: Some(DISPLAY_PLACEHOLDER),
            cursor,
            hex_subscripts: false,
        }
    }

    pub fn with_cursor(mut self, cursor: Option<CursorPosition>) -> Self {
        self.cursor = cursor;
        self
    }

    pub fn print_document(&self, doc: &Document) -> Output {
        self.print_chain(doc, doc.body())
    }

    /// Character offset of the cursor in this printer's rendering of `doc`.
    pub fn cursor_offset(&self, doc: &Document) -> Option<usize> {
        let out = self.print_document(doc);
        let text = out.text();
        text.find(DISPLAY_CURSOR)
            .map(|byte| text[..byte].chars().count())
    }

    pub fn print_block(&self, doc: &Document, id: BlockId) -> Output {
        match doc.kind(id) {
            Some(kind) => (behavior(kind).print)(self, doc, id),
            None => Output::new(),
        }
    }

    pub fn print_chain(&self, doc: &Document, start: Option<BlockId>) -> Output {
        let mut out = Output::new();
        let mut named: Option<BlockId> = None;
        for (i, id) in doc.chain_blocks(start).into_iter().enumerate() {
            if i == 0 {
                self.mark(&mut out, CursorPosition::before(id));
            }
            let printed = self.print_block(doc, id);
            // `\pi x` must not read back as `\pix`
            if let Some(previous) = named.take()
                && printed.first_char().is_some_and(|c| c.is_ascii_alphabetic())
            {
                out.push(Output::from_text(" ", Some(previous)));
            }
            if is_named_atom(doc, id) {
                named = Some(id);
            }
            out.push(printed);
            self.mark(&mut out, CursorPosition::after(id));
        }
        out
    }

    fn mark(&self, out: &mut Output, at: CursorPosition) {
        if self.cursor == Some(at) {
            out.push(Output::from_text(DISPLAY_CURSOR, None));
        }
    }

    fn braced(&self, doc: &Document, id: BlockId, slot: usize) -> Output {
        self.print_chain(doc, doc.child(id, slot))
            .prepend("{", Some(id))
            .append("}", Some(id))
    }
}

fn is_named_atom(doc: &Document, id: BlockId) -> bool {
    doc.kind(id) == Some(crate::model::BlockKind::Atom)
        && doc.data(id).is_some_and(|d| d.chars().count() > 1)
}

/// `\name{a,b,...}` with every structural character sourced to `id`.
fn command<I: IntoIterator<Item = Output>>(id: BlockId, name: &str, args: I) -> Output {
    Output::between(args, &Output::from_text(",", Some(id)))
        .prepend(&format!("{name}{{"), Some(id))
        .append("}", Some(id))
}

pub(crate) fn print_root(printer: &Printer, doc: &Document, id: BlockId) -> Output {
    printer.print_chain(doc, doc.child(id, slot::BODY))
}

pub(crate) fn print_blank(printer: &Printer, _doc: &Document, id: BlockId) -> Output {
    printer
        .placeholder
        .map(|placeholder| Output::from_text(placeholder, Some(id)))
        .unwrap_or_default()
}

pub(crate) fn print_atom(_printer: &Printer, doc: &Document, id: BlockId) -> Output {
    let text = doc.data(id).unwrap_or_default();
    if text.chars().count() > 1 {
        Output::from_text(&format!("\\{text}"), Some(id))
    } else {
        Output::from_text(text, Some(id))
    }
}

pub(crate) fn print_fraction(printer: &Printer, doc: &Document, id: BlockId) -> Output {
    command(
        id,
        "\\frac",
        [slot::NUM, slot::DENOM].map(|s| printer.print_chain(doc, doc.child(id, s))),
    )
}

pub(crate) fn print_radical(printer: &Printer, doc: &Document, id: BlockId) -> Output {
    let mut out = Output::from_text("\\sqrt", Some(id));
    if let Some(index) = doc.child(id, slot::RADICAL_INDEX) {
        let index = printer.print_chain(doc, Some(index));
        if !index.is_empty() {
            out.push(index.prepend("[", Some(id)).append("]", Some(id)));
        }
    }
    out.push(printer.braced(doc, id, slot::RADICAL_INNER));
    out
}

pub(crate) fn print_sup_sub(printer: &Printer, doc: &Document, id: BlockId) -> Output {
    let mut out = Output::new();
    if let Some(sub) = doc.child(id, slot::SUB) {
        let printed = printer.print_chain(doc, Some(sub));
        let printed = if printer.hex_subscripts {
            if printed.len() == 1 {
                printed
            } else {
                printed.expand_to_hex()
            }
        } else {
            printed.prepend("{", Some(id)).append("}", Some(id))
        };
        out.push(printed.prepend("_", Some(id)));
    }
    if doc.child(id, slot::SUP).is_some() {
        out.push(printer.braced(doc, id, slot::SUP).prepend("^", Some(id)));
    }
    out
}

pub(crate) fn print_integral(printer: &Printer, doc: &Document, id: BlockId) -> Output {
    command(
        id,
        "\\int",
        [
            slot::LEFT_BOUND,
            slot::RIGHT_BOUND,
            slot::INTEGRAND,
            slot::INTEGRAL_WRT,
        ]
        .map(|s| printer.print_chain(doc, doc.child(id, s))),
    )
}

pub(crate) fn print_derivative(printer: &Printer, doc: &Document, id: BlockId) -> Output {
    command(
        id,
        "\\deriv",
        [slot::DERIVATIVE_WRT, slot::DERIVATIVE_INNER]
            .map(|s| printer.print_chain(doc, doc.child(id, s))),
    )
}

pub(crate) fn print_differential(printer: &Printer, doc: &Document, id: BlockId) -> Output {
    command(
        id,
        "\\diff",
        [printer.print_chain(doc, doc.child(id, slot::DIFFERENTIAL_INNER))],
    )
}

pub(crate) fn print_matrix(printer: &Printer, doc: &Document, id: BlockId) -> Output {
    let (rows, cols) = parse_dimensions(doc.data(id)).unwrap_or((1, 1));
    let comma = Output::from_text(",", Some(id));
    let rows = (0..rows).map(|r| {
        Output::between(
            (0..cols).map(|c| printer.print_chain(doc, doc.child(id, r * cols + c))),
            &comma,
        )
    });
    Output::between(rows, &Output::from_text(";", Some(id)))
        .prepend("\\matrix{", Some(id))
        .append("}", Some(id))
}

pub(crate) fn print_function(printer: &Printer, doc: &Document, id: BlockId) -> Output {
    let name = doc.data(id).unwrap_or_default();
    printer
        .print_chain(doc, doc.child(id, slot::ARGS))
        .prepend(&format!("{name}("), Some(id))
        .append(")", Some(id))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::BlockKind;
    use crate::printing::to_calchub;
    use pretty_assertions::assert_eq;

    fn atoms(doc: &mut Document, text: &str) -> Option<BlockId> {
        let ids: Vec<BlockId> = text
            .chars()
            .map(|c| doc.create(BlockKind::Atom, Some(c.to_string())))
            .collect();
        doc.link_chain(&ids).unwrap()
    }

    fn set_body(doc: &mut Document, blocks: &[BlockId]) {
        let start = doc.link_chain(blocks).unwrap().unwrap();
        let body = doc.body().unwrap();
        doc.replace_with(body, start).unwrap();
    }

    #[test]
    fn empty_document_prints_nothing() {
        let doc = Document::new();
        assert_eq!(to_calchub(&doc).text(), "");
        assert_eq!(Printer::display(None).print_document(&doc).text(), "□");
    }

    #[test]
    fn fraction_with_blank_denominator() {
        let mut doc = Document::new();
        let frac = doc.create(BlockKind::Fraction, None);
        let a = atoms(&mut doc, "a");
        doc.replace_chain(frac, slot::NUM, a).unwrap();
        let plus = doc.create(BlockKind::Atom, Some("+".into()));
        let b = doc.create(BlockKind::Atom, Some("b".into()));
        set_body(&mut doc, &[frac, plus, b]);

        let out = to_calchub(&doc);
        assert_eq!(out.text(), "\\frac{a,}+b");
        // structural characters belong to the fraction
        assert_eq!(out.source()[0], Some(frac));
        assert_eq!(out.source()[6], a);
    }

    #[test]
    fn named_atom_spacing() {
        let mut doc = Document::new();
        let pi = doc.create(BlockKind::Atom, Some("pi".into()));
        let r = doc.create(BlockKind::Atom, Some("r".into()));
        let two = doc.create(BlockKind::Atom, Some("2".into()));
        let pi2 = doc.create(BlockKind::Atom, Some("pi".into()));
        set_body(&mut doc, &[pi, r, pi2, two]);
        assert_eq!(to_calchub(&doc).text(), "\\pi r\\pi2");
    }

    #[test]
    fn scripts_print_sub_then_sup() {
        let mut doc = Document::new();
        let x = doc.create(BlockKind::Atom, Some("x".into()));
        let scripts = doc.create(BlockKind::SupSub, None);
        let sub = atoms(&mut doc, "ij");
        let sup = atoms(&mut doc, "2");
        doc.replace_chain(scripts, slot::SUB, sub).unwrap();
        doc.replace_chain(scripts, slot::SUP, sup).unwrap();
        set_body(&mut doc, &[x, scripts]);

        assert_eq!(to_calchub(&doc).text(), "x_\\h696a;^{2}");
        assert_eq!(
            Printer::display(None).print_document(&doc).text(),
            "x_{ij}^{2}"
        );
    }

    #[test]
    fn composite_formats() {
        let mut doc = Document::new();
        let radical = doc.create(BlockKind::Radical, None);
        let three = atoms(&mut doc, "3");
        let x = atoms(&mut doc, "x");
        doc.replace_chain(radical, slot::RADICAL_INDEX, three).unwrap();
        doc.replace_chain(radical, slot::RADICAL_INNER, x).unwrap();

        let integral = doc.create(BlockKind::Integral, None);
        let matrix = doc.create(BlockKind::Matrix, Some("2x2".into()));
        let cell = atoms(&mut doc, "1");
        doc.replace_chain(matrix, 0, cell).unwrap();
        let function = doc.create(BlockKind::Function, Some("f".into()));
        let derivative = doc.create(BlockKind::Derivative, None);
        let differential = doc.create(BlockKind::Differential, None);
        set_body(
            &mut doc,
            &[radical, integral, matrix, function, derivative, differential],
        );

        assert_eq!(
            to_calchub(&doc).text(),
            "\\sqrt[3]{x}\\int{,,,}\\matrix{1,;,}f()\\deriv{,}\\diff{}"
        );
    }

    #[test]
    fn display_draws_cursor() {
        let mut doc = Document::new();
        let ab = atoms(&mut doc, "ab").unwrap();
        let body = doc.body().unwrap();
        doc.replace_with(body, ab).unwrap();

        let printer = Printer::display(Some(CursorPosition::after(ab)));
        assert_eq!(printer.print_document(&doc).text(), "a│b");
    }

    #[test]
    fn cursor_offset_in_linear_text() {
        let mut doc = Document::new();
        let frac = doc.create(BlockKind::Fraction, None);
        let a = atoms(&mut doc, "a");
        doc.replace_chain(frac, slot::NUM, a).unwrap();
        set_body(&mut doc, &[frac]);
        let denom = doc.child(frac, slot::DENOM).unwrap();

        let printer = Printer::calchub().with_cursor(Some(CursorPosition::before(denom)));
        // `\frac{a,` is eight characters
        assert_eq!(printer.cursor_offset(&doc), Some(8));
        assert_eq!(Printer::calchub().cursor_offset(&doc), None);
    }
}
