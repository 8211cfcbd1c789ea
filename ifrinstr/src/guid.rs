use std::{fmt, str::FromStr};

use uuid::Uuid;

/// GUID stored in the EFI mixed-endian layout: `Data1` u32 LE, `Data2` and
/// `Data3` u16 LE, then the 8 `Data4` bytes as-is.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Default)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct EfiGuid(pub Uuid);

impl EfiGuid {
    pub const SIZE: usize = 16;
    pub const NIL: EfiGuid = EfiGuid(Uuid::nil());

    pub const fn from_fields(data1: u32, data2: u16, data3: u16, data4: [u8; 8]) -> Self {
        EfiGuid(Uuid::from_fields(data1, data2, data3, &data4))
    }

    /// Parses the registry form `XXXXXXXX-XXXX-XXXX-XXXX-XXXXXXXXXXXX`.
    pub fn parse(text: &str) -> Option<Self> {
        Uuid::try_parse(text.trim()).ok().map(EfiGuid)
    }

    pub fn to_bytes(&self) -> [u8; 16] {
        self.0.to_bytes_le()
    }

    pub fn from_bytes(bytes: [u8; 16]) -> Self {
        EfiGuid(Uuid::from_bytes_le(bytes))
    }

    /// C initializer form, `{0x..., 0x..., 0x..., {0x.., ...}}`.
    pub fn to_c_structure(&self) -> String {
        let (d1, d2, d3, d4) = self.0.as_fields();
        let tail: Vec<String> = d4.iter().map(|b| format!("0x{b:02x}")).collect();
        format!("{{0x{d1:08x}, 0x{d2:04x}, 0x{d3:04x}, {{{}}}}}", tail.join(", "))
    }
}

impl fmt::Display for EfiGuid {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0.hyphenated().to_string().to_uppercase())
    }
}

impl FromStr for EfiGuid {
    type Err = uuid::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Uuid::try_parse(s.trim()).map(EfiGuid)
    }
}

impl From<Uuid> for EfiGuid {
    fn from(uuid: Uuid) -> Self {
        EfiGuid(uuid)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn mixed_endian_layout() {
        let guid = EfiGuid::parse("8BE4DF61-93CA-11D2-AA0D-00E098032B8C").expect("valid guid");
        assert_eq!(
            guid.to_bytes(),
            [
                0x61, 0xDF, 0xE4, 0x8B, 0xCA, 0x93, 0xD2, 0x11, 0xAA, 0x0D, 0x00, 0xE0, 0x98, 0x03,
                0x2B, 0x8C
            ]
        );
        assert_eq!(EfiGuid::from_bytes(guid.to_bytes()), guid);
        assert_eq!(guid.to_string(), "8BE4DF61-93CA-11D2-AA0D-00E098032B8C");
    }

    #[test]
    fn c_structure() {
        let guid = EfiGuid::from_fields(0x1, 0x2, 0x3, [4, 5, 6, 7, 8, 9, 10, 11]);
        assert_eq!(
            guid.to_c_structure(),
            "{0x00000001, 0x0002, 0x0003, {0x04, 0x05, 0x06, 0x07, 0x08, 0x09, 0x0a, 0x0b}}"
        );
    }
}
