use std::{
    collections::BTreeMap,
    io::{self, Write},
};

use crate::package::{EmittedRecord, SerializedPackage};

fn write_record<W: Write>(out: &mut W, record: &EmittedRecord<'_>) -> io::Result<()> {
    write!(out, ">{:08X}: ", record.offset)?;
    for byte in record.bytes {
        write!(out, "{byte:02X} ")?;
    }
    writeln!(out)
}

/// Writes the human readable record list.
///
/// With `source`, every line of the preprocessed source is echoed and
/// followed by the records created from it. Records whose line is not part
/// of the source (or every record, without source) are listed afterwards.
pub fn write_record_list<W: Write>(
    package: SerializedPackage<'_>,
    source: Option<&str>,
    out: &mut W,
) -> io::Result<()> {
    let mut by_line: BTreeMap<u32, Vec<EmittedRecord<'_>>> = BTreeMap::new();
    for record in package.records() {
        by_line.entry(record.node.line()).or_default().push(record);
    }

    if let Some(source) = source {
        for (index, text) in source.lines().enumerate() {
            writeln!(out, "{text}")?;
            if let Some(records) = by_line.remove(&(index as u32 + 1)) {
                for record in &records {
                    write_record(out, record)?;
                }
            }
        }
    }

    // Whatever is left has no source line to hang off; keep document order.
    let mut rest: Vec<EmittedRecord<'_>> = by_line.into_values().flatten().collect();
    rest.sort_by_key(|record| record.offset);
    for record in &rest {
        write_record(out, record)?;
    }

    writeln!(out)?;
    writeln!(out, "Total Size of all record is 0x{:08X}", package.pkg_length())?;
    Ok(())
}
