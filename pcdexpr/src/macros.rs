use log::trace;

use crate::{
    IN_OPERAND_MACROS, SymbolTable,
    error::{ExprError, ExprResult},
};

/// Upper bound on substitutions inside one quoted segment. Values that expand
/// to themselves would otherwise never terminate.
const MAX_SUBSTITUTIONS: usize = 1024;

/// Splits `text` into alternating unquoted and quoted segments.
///
/// Quoted segments keep their quotes. Backslash escapes never open or close a
/// quote, and a single quote inside a double-quoted segment (or vice versa) is
/// plain text.
pub fn split_quoted(text: &str) -> ExprResult<Vec<String>> {
    let mut segments = Vec::new();
    let mut item = String::new();
    let mut quote: Option<char> = None;
    let mut escaped = false;

    for ch in text.trim().chars() {
        if escaped {
            escaped = false;
            item.push(ch);
            continue;
        }
        match ch {
            '\\' => {
                escaped = true;
                item.push(ch);
            }
            '"' | '\'' if quote == Some(ch) => {
                item.push(ch);
                segments.push(std::mem::take(&mut item));
                quote = None;
            }
            '"' | '\'' if quote.is_none() => {
                if !item.is_empty() {
                    segments.push(std::mem::take(&mut item));
                }
                quote = Some(ch);
                item.push(ch);
            }
            _ => item.push(ch),
        }
    }

    if quote.is_some() {
        return Err(ExprError::UnterminatedString { literal: item });
    }
    if !item.is_empty() {
        segments.push(item);
    }
    Ok(segments)
}

/// Expands every `$(NAME)` reference in `text`.
///
/// Rules, applied per segment:
///  - an undefined macro becomes `0`, quoted or not;
///  - inside a double-quoted segment a defined macro is substituted verbatim;
///  - outside quotes, one of [`IN_OPERAND_MACROS`] is wrapped in double quotes,
///    an empty value becomes `""`, anything else is substituted verbatim;
///  - outside quotes, a macro directly following `IN` must be one of
///    [`IN_OPERAND_MACROS`].
pub fn replace_macros(text: &str, symbols: &SymbolTable) -> ExprResult<String> {
    let mut segments = split_quoted(text)?;

    for segment in segments.iter_mut() {
        let in_quote = segment.starts_with('"');
        let mut substitutions = 0usize;

        while let Some(start) = segment.find("$(") {
            let end = match segment[start..].find(')') {
                Some(offset) => start + offset,
                None => {
                    return Err(ExprError::MacroToken {
                        rest: segment[start..].to_string(),
                    });
                }
            };
            let name = &segment[start + 2..end];

            substitutions += 1;
            if substitutions > MAX_SUBSTITUTIONS {
                return Err(ExprError::RecursionTooDeep {
                    name: name.to_string(),
                    depth: MAX_SUBSTITUTIONS,
                });
            }

            let mut expanded = segment[..start].to_string();
            match symbols.get(name) {
                None => expanded.push('0'),
                Some(value) if !in_quote => {
                    let quoted = IN_OPERAND_MACROS.contains(&name);
                    let after_in = matches!(expanded.split_whitespace().last(), Some("IN" | "in"));
                    if after_in && !quoted {
                        return Err(ExprError::InOperandMacro {
                            name: name.to_string(),
                        });
                    }
                    if quoted {
                        expanded.push('"');
                        expanded.push_str(value);
                        expanded.push('"');
                    } else if value.trim().is_empty() {
                        expanded.push_str("\"\"");
                    } else {
                        expanded.push_str(value);
                    }
                }
                Some(value) => expanded.push_str(value),
            }
            trace!("expanded $({name}) in `{segment}`");
            expanded.push_str(&segment[end + 1..]);
            *segment = expanded;
        }
    }

    Ok(segments.concat())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn table(entries: &[(&str, &str)]) -> SymbolTable {
        entries
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect()
    }

    #[test]
    fn split_keeps_quotes_and_escapes() {
        let parts = split_quoted(r#"A == "x\"y" && 'c'"#).expect("balanced quotes");
        assert_eq!(parts, vec!["A == ", r#""x\"y""#, " && ", "'c'"]);
    }

    #[test]
    fn split_rejects_open_quote() {
        assert!(split_quoted("\"abc").unwrap_err().is_unterminated_string());
    }

    #[test]
    fn undefined_macro_is_zero_everywhere() {
        let symbols = SymbolTable::new();
        assert_eq!(replace_macros("$(FOO) == 0", &symbols).unwrap(), "0 == 0");
        assert_eq!(replace_macros("\"$(FOO)\"", &symbols).unwrap(), "\"0\"");
    }

    #[test]
    fn in_operand_macros_are_quoted() {
        let symbols = table(&[("ARCH", "IA32 X64"), ("FOO", "1")]);
        assert_eq!(
            replace_macros("IA32 in $(ARCH)", &symbols).unwrap(),
            "IA32 in \"IA32 X64\""
        );
        assert!(
            replace_macros("1 in $(FOO)", &symbols)
                .unwrap_err()
                .is_in_operand_macro()
        );
    }

    #[test]
    fn empty_value_becomes_empty_string() {
        let symbols = table(&[("EMPTY", "  ")]);
        assert_eq!(replace_macros("$(EMPTY) == \"\"", &symbols).unwrap(), "\"\" == \"\"");
    }

    #[test]
    fn unterminated_reference_is_reported() {
        let err = replace_macros("$(FOO == 1", &SymbolTable::new()).unwrap_err();
        assert_eq!(
            err,
            ExprError::MacroToken {
                rest: "$(FOO == 1".into()
            }
        );
    }

    #[test]
    fn self_expanding_macro_terminates() {
        let symbols = table(&[("LOOP", "$(LOOP)")]);
        assert!(
            replace_macros("$(LOOP)", &symbols)
                .unwrap_err()
                .is_recursion_too_deep()
        );
    }
}
