use std::io::{self, Write};

use crate::package::{PACKAGE_HEADER_SIZE, SerializedPackage};

const BYTES_PER_LINE: usize = 16;

fn write_bytes<W: Write>(out: &mut W, bytes: &[u8], last: bool) -> io::Result<()> {
    for (index, chunk) in bytes.chunks(BYTES_PER_LINE).enumerate() {
        let final_chunk = last && (index + 1) * BYTES_PER_LINE >= bytes.len();
        let items: Vec<String> = chunk.iter().map(|b| format!("0x{b:02X}")).collect();
        write!(out, "  {}", items.join(", "))?;
        writeln!(out, "{}", if final_chunk { "" } else { "," })?;
    }
    Ok(())
}

/// Writes the package as a C byte array named `<base_name>Bin`.
///
/// The array starts with its own length (4 little-endian bytes, counted in
/// the length), then the package header, then the package data.
pub fn write_c_source<W: Write>(
    package: SerializedPackage<'_>,
    base_name: &str,
    out: &mut W,
) -> io::Result<()> {
    let payload: Vec<u8> = package
        .records()
        .flat_map(|record| record.bytes.iter().copied())
        .collect();
    let array_length = (payload.len() + PACKAGE_HEADER_SIZE + 4) as u32;

    writeln!(out, "//")?;
    writeln!(out, "//  DO NOT EDIT -- auto-generated file")?;
    writeln!(out, "//")?;
    writeln!(out)?;
    writeln!(out, "unsigned char {base_name}Bin[] = {{")?;
    writeln!(out, "  // ARRAY LENGTH")?;
    write_bytes(out, &array_length.to_le_bytes(), false)?;
    writeln!(out)?;
    writeln!(out, "  // PACKAGE HEADER")?;
    write_bytes(out, &package.header(), payload.is_empty())?;
    if !payload.is_empty() {
        writeln!(out)?;
        writeln!(out, "  // PACKAGE DATA")?;
        write_bytes(out, &payload, true)?;
    }
    writeln!(out, "}};")?;
    Ok(())
}
