use std::io::{self, Write};

use crate::{
    emit::{SymbolResolver, render_field},
    opcode::OpCode,
    package::SerializedPackage,
    records::{FieldValue, IfrRecord},
    tree::{NodeId, TreeNode, TreeVisitor},
};

/// Plain words that YAML 1.1 or 1.2 resolve to a boolean or null.
const RESERVED_WORDS: [&str; 10] = ["true", "false", "yes", "no", "on", "off", "y", "n", "null", "~"];

/// Whether a plain scalar would load as a number rather than a string.
fn looks_numeric(text: &str) -> bool {
    let body = text.strip_prefix(['+', '-']).unwrap_or(text);
    let body = body.replace('_', "").to_ascii_lowercase();
    if let Some(digits) = body.strip_prefix("0x") {
        return !digits.is_empty() && digits.bytes().all(|b| b.is_ascii_hexdigit());
    }
    if let Some(digits) = body.strip_prefix("0o").or_else(|| body.strip_prefix("0b")) {
        return !digits.is_empty() && digits.bytes().all(|b| b.is_ascii_digit());
    }
    matches!(body.as_str(), ".inf" | ".nan")
        || (body.bytes().any(|b| b.is_ascii_digit()) && body.parse::<f64>().is_ok())
}

/// Plain text stays bare unless YAML would read it as something other than
/// a string; everything else is double-quoted.
fn scalar(text: &str) -> String {
    let plain = !text.is_empty()
        && text
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || matches!(c, '_' | '-' | '.' | '[' | ']' | ','));
    if plain
        && !text.starts_with(['-', '['])
        && !RESERVED_WORDS.contains(&text.to_ascii_lowercase().as_str())
        && !looks_numeric(text)
    {
        return text.to_string();
    }
    let mut quoted = String::with_capacity(text.len() + 2);
    quoted.push('"');
    for c in text.chars() {
        match c {
            '"' => quoted.push_str("\\\""),
            '\\' => quoted.push_str("\\\\"),
            '\n' => quoted.push_str("\\n"),
            c => quoted.push(c),
        }
    }
    quoted.push('"');
    quoted
}

struct YamlWriter<'a, W> {
    out: &'a mut W,
    symbols: &'a dyn SymbolResolver,
}

impl<W: Write> YamlWriter<'_, W> {
    fn indent(depth: usize) -> usize {
        2 + depth * 6
    }
}

impl<W: Write> TreeVisitor for YamlWriter<'_, W> {
    type Error = io::Error;

    fn enter(&mut self, _id: NodeId, node: &TreeNode, depth: usize) -> io::Result<()> {
        let item = " ".repeat(Self::indent(depth));
        let field = " ".repeat(Self::indent(depth) + 4);

        writeln!(self.out, "{item}- {}:", node.opcode().ifr_name())?;
        writeln!(self.out, "{field}line: {}", node.line())?;
        match node.offset() {
            Some(offset) => writeln!(self.out, "{field}offset: 0x{offset:X}")?,
            None => writeln!(self.out, "{field}offset: none")?,
        }
        writeln!(self.out, "{field}length: {}", node.length())?;
        if node.opcode() != OpCode::ShownDefaultStore {
            writeln!(self.out, "{field}scope: {}", node.scope())?;
        }
        if let Some(condition) = node.condition() {
            writeln!(self.out, "{field}condition: {}", scalar(condition))?;
        }
        for (name, value) in node.record().fields() {
            let text = render_field(&value, self.symbols);
            match value {
                FieldValue::Int(_) | FieldValue::Hex(_) | FieldValue::Flags(_) => {
                    writeln!(self.out, "{field}{name}: {text}")?
                }
                _ => writeln!(self.out, "{field}{name}: {}", scalar(&text))?,
            }
        }
        if !node.children().is_empty() {
            writeln!(self.out, "{field}children:")?;
        }
        Ok(())
    }
}

/// Writes the tree as YAML, one mapping per record with its children nested.
pub fn write_yaml<W: Write>(
    package: SerializedPackage<'_>,
    symbols: &dyn SymbolResolver,
    out: &mut W,
) -> io::Result<()> {
    writeln!(out, "package_length: 0x{:X}", package.pkg_length())?;
    if package.tree().is_empty() {
        writeln!(out, "records: []")?;
        return Ok(());
    }
    writeln!(out, "records:")?;
    package.tree().walk(&mut YamlWriter { out, symbols })
}

#[cfg(test)]
mod tests {
    use super::scalar;

    #[test]
    fn scalars_are_quoted_when_needed() {
        assert_eq!(scalar("STR_TITLE"), "STR_TITLE");
        assert_eq!(scalar("0x1F"), "\"0x1F\"");
        assert_eq!(scalar("A | B"), "\"A | B\"");
        assert_eq!(scalar("say \"hi\""), "\"say \\\"hi\\\"\"");
        assert_eq!(scalar(""), "\"\"");
        assert_eq!(scalar("-1"), "\"-1\"");
    }

    #[test]
    fn reserved_words_and_numbers_are_quoted() {
        for word in ["true", "False", "TRUE", "null", "Null", "yes", "No", "on", "OFF", "y", "N"] {
            assert_eq!(scalar(word), format!("\"{word}\""));
        }
        assert_eq!(scalar("~"), "\"~\"");
        for number in ["1", "42", "1.5", ".5", "1e3", "1_000", "0o17", "0b101", ".inf", ".NaN"] {
            assert_eq!(scalar(number), format!("\"{number}\""));
        }
        assert_eq!(scalar("Enable"), "Enable");
        assert_eq!(scalar("truely"), "truely");
        assert_eq!(scalar("v1.2"), "v1.2");
        assert_eq!(scalar("A1"), "A1");
    }
}
