use bitflags::{Flags, bitflags};
use strum::{EnumIter, FromRepr, IntoStaticStr};

use crate::{
    opcode::OpCode,
    utils::{Error, IfrResult},
};

bitflags! {
    /// Flags of the question header shared by every question opcode.
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
    #[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
    pub struct QuestionFlags: u8 {
        /// The question cannot be modified by the user.
        const READ_ONLY = 0x01;
        /// Changes are reported to the driver through its config access callback.
        const CALLBACK = 0x04;
        /// A platform reset is needed for changes to take effect.
        const RESET_REQUIRED = 0x10;
        /// The question is exposed through the REST style configuration.
        const REST_STYLE = 0x20;
        /// The controller must be reconnected for changes to take effect.
        const RECONNECT_REQUIRED = 0x40;
        /// Only the options are shown, not the question itself.
        const OPTIONS_ONLY = 0x80;
    }
}

impl QuestionFlags {
    /// Obsolete `INTERACTIVE` and `NV_ACCESS` bits. Accepted for compatibility
    /// with older sources but never stored.
    pub const LEGACY_IGNORED: u8 = 0x02 | 0x08;
}

bitflags! {
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
    #[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
    pub struct CheckBoxFlags: u8 {
        /// Checked by default in the standard defaults.
        const DEFAULT = 0x01;
        /// Checked by default in the manufacturing defaults.
        const DEFAULT_MFG = 0x02;
    }
}

bitflags! {
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
    #[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
    pub struct OptionFlags: u8 {
        /// The option is the standard default.
        const DEFAULT = 0x10;
        /// The option is the manufacturing default.
        const DEFAULT_MFG = 0x20;
    }
}

bitflags! {
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
    #[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
    pub struct DateFlags: u8 {
        const YEAR_SUPPRESS = 0x01;
        const MONTH_SUPPRESS = 0x02;
        const DAY_SUPPRESS = 0x04;
    }
}

bitflags! {
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
    #[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
    pub struct TimeFlags: u8 {
        const HOUR_SUPPRESS = 0x01;
        const MINUTE_SUPPRESS = 0x02;
        const SECOND_SUPPRESS = 0x04;
    }
}

bitflags! {
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
    #[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
    pub struct StringFlags: u8 {
        /// The editor accepts more than one line of text.
        const MULTI_LINE = 0x01;
    }
}

bitflags! {
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
    #[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
    pub struct OrderedListFlags: u8 {
        /// Every option may appear at most once.
        const UNIQUE_SET = 0x01;
        /// The list may not be left empty.
        const NO_EMPTY_SET = 0x02;
    }
}

bitflags! {
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
    #[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
    pub struct SubtitleFlags: u8 {
        /// Following statements are laid out on the same row.
        const HORIZONTAL = 0x01;
    }
}

bitflags! {
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
    #[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
    pub struct SpanFlags: u8 {
        /// Search for the first character not in the set instead of the first one in it.
        const FIRST_NON_MATCHING = 0x01;
    }
}

/// Storage width of numeric and one-of questions (`EFI_IFR_NUMERIC_SIZE`).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Default, FromRepr, EnumIter, IntoStaticStr)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[repr(u8)]
pub enum NumericSize {
    #[default]
    #[strum(serialize = "NUMERIC_SIZE_1")]
    Size1 = 0x00,
    #[strum(serialize = "NUMERIC_SIZE_2")]
    Size2 = 0x01,
    #[strum(serialize = "NUMERIC_SIZE_4")]
    Size4 = 0x02,
    #[strum(serialize = "NUMERIC_SIZE_8")]
    Size8 = 0x03,
}

impl NumericSize {
    pub const MASK: u8 = 0x03;

    pub const fn bytes(self) -> u8 {
        1 << (self as u8)
    }

    pub fn max_value(self) -> u64 {
        match self {
            NumericSize::Size1 => u8::MAX as u64,
            NumericSize::Size2 => u16::MAX as u64,
            NumericSize::Size4 => u32::MAX as u64,
            NumericSize::Size8 => u64::MAX,
        }
    }
}

/// Display format of numeric questions (`EFI_IFR_DISPLAY`).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, FromRepr, EnumIter, IntoStaticStr)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[repr(u8)]
pub enum NumericDisplay {
    #[strum(serialize = "DISPLAY_INT_DEC")]
    IntDec = 0x00,
    #[default]
    #[strum(serialize = "DISPLAY_UINT_DEC")]
    UintDec = 0x10,
    #[strum(serialize = "DISPLAY_UINT_HEX")]
    UintHex = 0x20,
}

impl NumericDisplay {
    pub const MASK: u8 = 0x30;
}

/// Opcode-specific flags of numeric and one-of questions.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct NumericFlags {
    pub size: NumericSize,
    pub display: NumericDisplay,
}

impl NumericFlags {
    pub fn bits(self) -> u8 {
        self.size as u8 | self.display as u8
    }

    /// Splits a raw flags byte. Without an explicit display setting the
    /// display defaults to unsigned decimal.
    pub fn from_bits(opcode: OpCode, flags: u8, display_specified: bool) -> IfrResult<Self> {
        let mut residual = flags;
        let size = NumericSize::from_repr(residual & NumericSize::MASK).unwrap_or_default();
        residual &= !NumericSize::MASK;

        let display = if display_specified {
            let display = NumericDisplay::from_repr(residual & NumericDisplay::MASK);
            residual &= !NumericDisplay::MASK;
            match display {
                Some(display) => display,
                None => {
                    return Err(Error::FlagsUnsupported {
                        opcode,
                        flags,
                        residual: flags & NumericDisplay::MASK,
                    });
                }
            }
        } else {
            NumericDisplay::UintDec
        };

        if residual != 0 {
            return Err(Error::FlagsUnsupported {
                opcode,
                flags,
                residual,
            });
        }
        Ok(NumericFlags { size, display })
    }
}

/// Storage location of date and time questions (`QF_DATE_STORAGE`).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, FromRepr, EnumIter, IntoStaticStr)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[repr(u8)]
pub enum DateTimeStorage {
    #[default]
    #[strum(serialize = "STORAGE_NORMAL")]
    Normal = 0x00,
    #[strum(serialize = "STORAGE_TIME")]
    Time = 0x10,
    #[strum(serialize = "STORAGE_WAKEUP")]
    Wakeup = 0x20,
}

impl DateTimeStorage {
    pub const MASK: u8 = 0x30;
}

/// Clears every flag known to `T` out of `flags`, one at a time. Bits in
/// `ignored` are dropped silently. Anything left over is reported and nothing
/// is returned, so callers only commit a fully recognized value.
pub(crate) fn clear_recognized<T>(opcode: OpCode, flags: u8, ignored: u8) -> IfrResult<T>
where
    T: Flags<Bits = u8>,
{
    let mut residual = flags & !ignored;
    let mut recognized = T::empty();
    for flag in T::FLAGS {
        let bits = flag.value().bits();
        if bits != 0 && residual & bits == bits {
            residual &= !bits;
            recognized.insert(T::from_bits_retain(bits));
        }
    }

    if residual != 0 {
        return Err(Error::FlagsUnsupported {
            opcode,
            flags,
            residual,
        });
    }
    Ok(recognized)
}

/// Splits a date or time flags byte into its suppress bits and storage kind.
pub(crate) fn split_date_time<T>(opcode: OpCode, flags: u8) -> IfrResult<(T, DateTimeStorage)>
where
    T: Flags<Bits = u8>,
{
    let storage = DateTimeStorage::from_repr(flags & DateTimeStorage::MASK).ok_or(
        Error::FlagsUnsupported {
            opcode,
            flags,
            residual: flags & DateTimeStorage::MASK,
        },
    )?;
    let suppress = clear_recognized::<T>(opcode, flags & !DateTimeStorage::MASK, 0).map_err(
        |_| Error::FlagsUnsupported {
            opcode,
            flags,
            residual: flags & !DateTimeStorage::MASK & !T::all().bits(),
        },
    )?;
    Ok((suppress, storage))
}
