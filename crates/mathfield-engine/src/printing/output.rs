//! Text with a per-character source map.

use std::borrow::Cow;

use crate::model::BlockId;

pub const HEX_PREFIX: &str = "\\h";
pub const HEX_SUFFIX: &str = ";";

/// Printed text where every character remembers the block that produced it.
///
/// `source` always has exactly one entry per `char` of `text`.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct Output {
    text: String,
    source: Vec<Option<BlockId>>,
}

impl Output {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn from_text(text: &str, source: Option<BlockId>) -> Self {
        Self {
            text: text.to_string(),
            source: vec![source; text.chars().count()],
        }
    }

    pub fn from_many<I: IntoIterator<Item = Output>>(items: I) -> Self {
        let mut out = Self::new();
        for item in items {
            out.push(item);
        }
        out
    }

    /// Join `items` with a copy of `separator` between each pair.
    pub fn between<I: IntoIterator<Item = Output>>(items: I, separator: &Output) -> Self {
        let mut out = Self::new();
        for (i, item) in items.into_iter().enumerate() {
            if i > 0 {
                out.push(separator.clone());
            }
            out.push(item);
        }
        out
    }

    pub fn push(&mut self, other: Output) {
        self.text.push_str(&other.text);
        self.source.extend(other.source);
    }

    pub fn append(mut self, text: &str, source: Option<BlockId>) -> Self {
        self.push(Self::from_text(text, source));
        self
    }

    pub fn prepend(self, text: &str, source: Option<BlockId>) -> Self {
        let mut out = Self::from_text(text, source);
        out.push(self);
        out
    }

    pub fn text(&self) -> &str {
        &self.text
    }

    pub fn source(&self) -> &[Option<BlockId>] {
        &self.source
    }

    /// Length in characters.
    pub fn len(&self) -> usize {
        self.source.len()
    }

    pub fn is_empty(&self) -> bool {
        self.source.is_empty()
    }

    pub fn first_char(&self) -> Option<char> {
        self.text.chars().next()
    }

    /// Re-encode as a single `\h<hex>;` token.
    ///
    /// Each hex digit pair keeps the source of the character it encodes; the
    /// prefix takes the first character's source and the suffix the last.
    pub fn expand_to_hex(&self) -> Output {
        let first = self.source.first().copied().flatten();
        let last = self.source.last().copied().flatten();
        let mut out = Self::from_text(HEX_PREFIX, first);
        for (ch, source) in self.text.chars().zip(&self.source) {
            let mut buf = [0u8; 4];
            for byte in ch.encode_utf8(&mut buf).bytes() {
                out.push(Self::from_text(&format!("{byte:02x}"), *source));
            }
        }
        out.push(Self::from_text(HEX_SUFFIX, last));
        out
    }

    /// Decode every well-formed `\h<hex>;` token in `text`. Anything that
    /// does not decode to UTF-8 is left untouched.
    pub fn decode_hex(text: &str) -> Cow<'_, str> {
        if !text.contains(HEX_PREFIX) {
            return Cow::Borrowed(text);
        }
        let mut out = String::with_capacity(text.len());
        let mut rest = text;
        while let Some(at) = rest.find(HEX_PREFIX) {
            out.push_str(&rest[..at]);
            let after = &rest[at + HEX_PREFIX.len()..];
            match decode_token(after) {
                Some((decoded, consumed)) => {
                    out.push_str(&decoded);
                    rest = &after[consumed..];
                }
                None => {
                    out.push_str(HEX_PREFIX);
                    rest = after;
                }
            }
        }
        out.push_str(rest);
        Cow::Owned(out)
    }
}

fn decode_token(text: &str) -> Option<(String, usize)> {
    let end = text.find(HEX_SUFFIX)?;
    let digits = &text[..end];
    if digits.len() % 2 != 0 || !digits.bytes().all(|b| b.is_ascii_hexdigit()) {
        return None;
    }
    let bytes = (0..digits.len())
        .step_by(2)
        .map(|i| u8::from_str_radix(&digits[i..i + 2], 16))
        .collect::<Result<Vec<u8>, _>>()
        .ok()?;
    let decoded = String::from_utf8(bytes).ok()?;
    Some((decoded, end + HEX_SUFFIX.len()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use rstest::rstest;

    const A: Option<BlockId> = Some(BlockId(1));
    const B: Option<BlockId> = Some(BlockId(2));

    #[test]
    fn source_tracks_every_char() {
        let out = Output::from_text("ab", A)
            .append("π", B)
            .prepend("(", None);
        assert_eq!(out.text(), "(abπ");
        assert_eq!(out.source(), &[None, A, A, B]);
        assert_eq!(out.len(), 4);
    }

    #[test]
    fn between_inserts_separators() {
        let sep = Output::from_text(",", None);
        let out = Output::between(
            [Output::from_text("x", A), Output::new(), Output::from_text("y", B)],
            &sep,
        );
        assert_eq!(out.text(), "x,,y");
    }

    #[test]
    fn hex_expansion_keeps_sources() {
        let out = Output::from_many([Output::from_text("a", A), Output::from_text("b", B)]);
        let hex = out.expand_to_hex();
        assert_eq!(hex.text(), "\\h6162;");
        assert_eq!(hex.source(), &[A, A, A, A, B, B, B]);
    }

    #[rstest]
    #[case("\\h6162;", "ab")]
    #[case("x_\\hcf80;+1", "x_π+1")]
    #[case("\\hbar", "\\hbar")]
    #[case("\\h616;", "\\h616;")]
    #[case("plain", "plain")]
    fn decode(#[case] input: &str, #[case] expected: &str) {
        assert_eq!(Output::decode_hex(input), expected);
    }

    #[test]
    fn decode_inverts_expand() {
        let out = Output::from_text("x²+1", A);
        let hex = out.expand_to_hex();
        assert_eq!(Output::decode_hex(hex.text()), "x²+1");
    }
}
