use std::io::{self, Write};

use crate::package::SerializedPackage;

/// Writes the `.hpk` form package: header, then every record in document order.
pub fn write_binary<W: Write>(package: SerializedPackage<'_>, out: &mut W) -> io::Result<()> {
    out.write_all(&package.header())?;
    for record in package.records() {
        out.write_all(record.bytes)?;
    }
    Ok(())
}
