use uuid::Uuid;

/// Returns the byte length of a registry-format GUID
/// (`xxxxxxxx-xxxx-xxxx-xxxx-xxxxxxxxxxxx`) at the start of `text`.
pub fn match_registry_guid(text: &str) -> Option<usize> {
    const GROUPS: [usize; 5] = [8, 4, 4, 4, 12];
    let bytes = text.as_bytes();
    let mut idx = 0;
    for (n, len) in GROUPS.iter().enumerate() {
        if n > 0 {
            if bytes.get(idx) != Some(&b'-') {
                return None;
            }
            idx += 1;
        }
        let group = bytes.get(idx..idx + len)?;
        if !group.iter().all(u8::is_ascii_hexdigit) {
            return None;
        }
        idx += len;
    }
    Some(idx)
}

/// Converts `xxxxxxxx-xxxx-xxxx-xxxx-xxxxxxxxxxxx` to the C initializer form
/// `{0xxxxxxxxx, 0xxxxx, 0xxxxx, {0xxx, 0xxx, ...}}`.
///
/// Digit case is preserved. Returns `None` if `guid` is not a registry GUID.
pub fn guid_string_to_structure_string(guid: &str) -> Option<String> {
    if match_registry_guid(guid) != Some(guid.len()) {
        return None;
    }
    let parts: Vec<&str> = guid.split('-').collect();
    let mut out = format!("{{0x{}, 0x{}, 0x{}, {{", parts[0], parts[1], parts[2]);
    let tail = format!("{}{}", parts[3], parts[4]);
    let bytes: Vec<String> = (0..tail.len())
        .step_by(2)
        .map(|i| format!("0x{}", &tail[i..i + 2]))
        .collect();
    out.push_str(&bytes.join(", "));
    out.push_str("}}");
    Some(out)
}

/// Converts a C initializer GUID back to lowercase registry format.
///
/// Whitespace, braces and a trailing `;` are ignored. Returns `None` unless
/// exactly eleven hexadecimal fields of the right widths are present.
pub fn guid_structure_to_string(structure: &str) -> Option<String> {
    let cleaned: String = structure
        .chars()
        .filter(|c| !c.is_whitespace() && !matches!(c, '{' | '}' | ';'))
        .collect();
    let fields: Vec<&str> = cleaned.split(',').collect();
    if fields.len() != 11 {
        return None;
    }
    let parse = |field: &str, max_digits: usize| -> Option<u64> {
        let digits = field
            .strip_prefix("0x")
            .or_else(|| field.strip_prefix("0X"))?;
        if digits.is_empty() || digits.len() > max_digits {
            return None;
        }
        u64::from_str_radix(digits, 16).ok()
    };

    let d1 = parse(fields[0], 8)? as u32;
    let d2 = parse(fields[1], 4)? as u16;
    let d3 = parse(fields[2], 4)? as u16;
    let mut d4 = [0u8; 8];
    for (slot, field) in d4.iter_mut().zip(&fields[3..]) {
        *slot = parse(field, 2)? as u8;
    }
    Some(
        Uuid::from_fields(d1, d2, d3, &d4)
            .hyphenated()
            .to_string(),
    )
}
