use std::fmt;

use num_bigint::BigInt;
use num_traits::{Signed, ToPrimitive, Zero};
use strum::{EnumIs, EnumTryAs};

/// Flavour of a string literal.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, EnumIs)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum StrKind {
    /// `"text"`
    Narrow,
    /// `'text'`
    NarrowChar,
    /// `L"text"`
    Wide,
    /// `L'text'`
    WideChar,
}

impl StrKind {
    pub fn is_unicode(self) -> bool {
        matches!(self, StrKind::Wide | StrKind::WideChar)
    }
}

/// A string literal with its quotes removed. Escape sequences are kept verbatim.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct StrLit {
    pub kind: StrKind,
    pub text: String,
}

impl StrLit {
    pub fn narrow(text: impl Into<String>) -> Self {
        Self {
            kind: StrKind::Narrow,
            text: text.into(),
        }
    }

    /// Comparison key of the literal.
    ///
    /// Narrow strings compare by their bare text; every other kind keeps its
    /// quotes (and `L` prefix), so `'a'` never equals `"a"`.
    pub fn key(&self) -> String {
        match self.kind {
            StrKind::Narrow => self.text.clone(),
            StrKind::NarrowChar => format!("'{}'", self.text),
            StrKind::Wide => format!("L\"{}\"", self.text),
            StrKind::WideChar => format!("L'{}'", self.text),
        }
    }

    /// Canonical source form, always quoted.
    pub fn literal(&self) -> String {
        match self.kind {
            StrKind::Narrow => format!("\"{}\"", self.text),
            _ => self.key(),
        }
    }

    /// Decoded characters, resolving the usual C escapes.
    pub fn chars(&self) -> Vec<char> {
        let mut out = Vec::with_capacity(self.text.len());
        let mut it = self.text.chars();
        while let Some(ch) = it.next() {
            if ch != '\\' {
                out.push(ch);
                continue;
            }
            match it.next() {
                Some('n') => out.push('\n'),
                Some('t') => out.push('\t'),
                Some('r') => out.push('\r'),
                Some('0') => out.push('\0'),
                Some(other) => out.push(other),
                None => out.push('\\'),
            }
        }
        out
    }
}

/// Runtime value of an operand.
#[derive(Debug, Clone, PartialEq, Eq, Hash, EnumIs, EnumTryAs)]
pub enum Value {
    Int(BigInt),
    Bool(bool),
    Str(StrLit),
    /// Canonical `{0x..,..}` text of a byte list or GUID structure.
    Array(String),
}

impl Value {
    /// Strings and arrays share the string typing rules.
    pub fn is_stringy(&self) -> bool {
        matches!(self, Value::Str(_) | Value::Array(_))
    }

    pub fn is_unicode(&self) -> bool {
        matches!(self, Value::Str(s) if s.kind.is_unicode())
    }

    /// Comparison key for string-typed values.
    pub fn string_key(&self) -> Option<String> {
        match self {
            Value::Str(s) => Some(s.key()),
            Value::Array(a) => Some(a.clone()),
            _ => None,
        }
    }

    /// Integer view of a number or boolean.
    pub fn as_int(&self) -> Option<BigInt> {
        match self {
            Value::Int(i) => Some(i.clone()),
            Value::Bool(b) => Some(BigInt::from(*b as u8)),
            _ => None,
        }
    }

    pub fn is_truthy(&self) -> bool {
        match self {
            Value::Int(i) => !i.is_zero(),
            Value::Bool(b) => *b,
            Value::Str(s) => !s.key().is_empty(),
            Value::Array(a) => !a.is_empty(),
        }
    }

    /// Packs the value's bytes, least significant first, into a narrow string.
    ///
    /// Used to give numbers a string form on either side of `IN`. Non-positive
    /// numbers yield an empty quoted string.
    pub fn int_to_str(&self) -> Value {
        let mut packed = String::from("\"");
        if let Some(mut n) = self.as_int() {
            let mask = BigInt::from(0xffu8);
            while n.is_positive() {
                let byte = (&n & &mask).to_u8().unwrap_or_default();
                packed.push(char::from(byte));
                n >>= 8u32;
            }
        }
        packed.push('"');
        Value::Str(StrLit::narrow(packed))
    }

    /// Short name used in diagnostics.
    pub fn type_name(&self) -> &'static str {
        match self {
            Value::Int(_) => "number",
            Value::Bool(_) => "boolean",
            Value::Str(s) if s.kind.is_unicode() => "unicode string",
            Value::Str(_) => "string",
            Value::Array(_) => "array",
        }
    }
}

impl fmt::Display for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Value::Int(i) => write!(f, "{i}"),
            Value::Bool(true) => f.write_str("True"),
            Value::Bool(false) => f.write_str("False"),
            Value::Str(s) => f.write_str(&s.literal()),
            Value::Array(a) => f.write_str(a),
        }
    }
}

/// Parses a numeric literal: `0x`/`0X` hexadecimal or decimal, with an
/// optional sign and an optional `u`/`l` suffix combination.
pub fn parse_number(text: &str) -> Option<BigInt> {
    let text = text.trim();
    let (negative, body) = match text.as_bytes().first() {
        Some(b'-') => (true, &text[1..]),
        Some(b'+') => (false, &text[1..]),
        _ => (false, text),
    };
    let body = body.trim_end_matches(['u', 'U', 'l', 'L']);
    if body.is_empty() {
        return None;
    }

    let (digits, radix) = match body.get(..2) {
        Some("0x") | Some("0X") if body.len() > 2 => (&body[2..], 16),
        _ => (body, 10),
    };
    if !digits.bytes().all(|b| b.is_ascii_hexdigit()) {
        return None;
    }
    let value = BigInt::parse_bytes(digits.as_bytes(), radix)?;
    Some(if negative { -value } else { value })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn numbers_with_suffix_and_radix() {
        assert_eq!(parse_number("0x1F"), Some(BigInt::from(31)));
        assert_eq!(parse_number("0X10UL"), Some(BigInt::from(16)));
        assert_eq!(parse_number("42u"), Some(BigInt::from(42)));
        assert_eq!(parse_number("-7"), Some(BigInt::from(-7)));
        assert_eq!(parse_number("0x"), None);
        assert_eq!(parse_number("12ab"), None);
        assert_eq!(parse_number("L"), None);
    }

    #[test]
    fn int_to_str_is_little_endian() {
        let v = Value::Int(BigInt::from(0x4241)).int_to_str();
        assert_eq!(v, Value::Str(StrLit::narrow("\"AB\"")));
        assert_eq!(
            Value::Int(BigInt::from(0)).int_to_str(),
            Value::Str(StrLit::narrow("\"\""))
        );
    }

    #[test]
    fn string_keys_keep_flavour() {
        let wide = StrLit {
            kind: StrKind::Wide,
            text: "abc".into(),
        };
        assert_eq!(wide.key(), "L\"abc\"");
        assert_eq!(StrLit::narrow("abc").key(), "abc");
        assert_eq!(StrLit::narrow("abc").literal(), "\"abc\"");
    }
}
