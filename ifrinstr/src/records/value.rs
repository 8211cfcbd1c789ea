use std::fmt;

use strum::{EnumIs, EnumIter, FromRepr, IntoStaticStr};

use crate::{
    guid::EfiGuid,
    opcode::OpCode,
    records::flags::NumericSize,
    utils::{Error, IfrResult},
};

/// `EFI_IFR_TYPE_*` codes of an option or default value.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, FromRepr, EnumIter, IntoStaticStr)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[repr(u8)]
pub enum ValueType {
    #[strum(serialize = "EFI_IFR_TYPE_NUM_SIZE_8")]
    NumSize8 = 0x00,
    #[strum(serialize = "EFI_IFR_TYPE_NUM_SIZE_16")]
    NumSize16 = 0x01,
    #[strum(serialize = "EFI_IFR_TYPE_NUM_SIZE_32")]
    NumSize32 = 0x02,
    #[strum(serialize = "EFI_IFR_TYPE_NUM_SIZE_64")]
    NumSize64 = 0x03,
    #[strum(serialize = "EFI_IFR_TYPE_BOOLEAN")]
    Boolean = 0x04,
    #[strum(serialize = "EFI_IFR_TYPE_TIME")]
    Time = 0x05,
    #[strum(serialize = "EFI_IFR_TYPE_DATE")]
    Date = 0x06,
    #[strum(serialize = "EFI_IFR_TYPE_STRING")]
    String = 0x07,
    #[strum(serialize = "EFI_IFR_TYPE_OTHER")]
    Other = 0x08,
    #[strum(serialize = "EFI_IFR_TYPE_UNDEFINED")]
    Undefined = 0x09,
    #[strum(serialize = "EFI_IFR_TYPE_ACTION")]
    Action = 0x0A,
    #[strum(serialize = "EFI_IFR_TYPE_BUFFER")]
    Buffer = 0x0B,
    #[strum(serialize = "EFI_IFR_TYPE_REF")]
    Ref = 0x0C,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct HiiTime {
    pub hour: u8,
    pub minute: u8,
    pub second: u8,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct HiiDate {
    pub year: u16,
    pub month: u8,
    pub day: u8,
}

/// Target of a cross reference (`EFI_HII_REF`).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct HiiRef {
    pub question_id: u16,
    pub form_id: u16,
    pub formset_guid: EfiGuid,
    pub device_path: u16,
}

/// Typed value of an option or a default (`EFI_IFR_TYPE_VALUE`).
///
/// The encoded size depends on the variant, which is what makes
/// `ONE_OF_OPTION` and `DEFAULT` records variable-length.
#[derive(Debug, Clone, PartialEq, Eq, Hash, EnumIs)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum IfrValue {
    U8(u8),
    U16(u16),
    U32(u32),
    U64(u64),
    Bool(bool),
    Time(HiiTime),
    Date(HiiDate),
    String(u16),
    Other,
    Undefined,
    Action(u16),
    Buffer(Vec<u8>),
    Ref(HiiRef),
}

impl IfrValue {
    pub fn value_type(&self) -> ValueType {
        match self {
            IfrValue::U8(_) => ValueType::NumSize8,
            IfrValue::U16(_) => ValueType::NumSize16,
            IfrValue::U32(_) => ValueType::NumSize32,
            IfrValue::U64(_) => ValueType::NumSize64,
            IfrValue::Bool(_) => ValueType::Boolean,
            IfrValue::Time(_) => ValueType::Time,
            IfrValue::Date(_) => ValueType::Date,
            IfrValue::String(_) => ValueType::String,
            IfrValue::Other => ValueType::Other,
            IfrValue::Undefined => ValueType::Undefined,
            IfrValue::Action(_) => ValueType::Action,
            IfrValue::Buffer(_) => ValueType::Buffer,
            IfrValue::Ref(_) => ValueType::Ref,
        }
    }

    pub fn size(&self) -> usize {
        match self {
            IfrValue::U8(_) | IfrValue::Bool(_) => 1,
            IfrValue::U16(_) | IfrValue::String(_) | IfrValue::Action(_) => 2,
            IfrValue::U32(_) | IfrValue::Date(_) => 4,
            IfrValue::Time(_) => 3,
            IfrValue::U64(_) => 8,
            IfrValue::Other | IfrValue::Undefined => 0,
            IfrValue::Buffer(bytes) => bytes.len(),
            IfrValue::Ref(_) => 22,
        }
    }

    /// Integer value of the numeric variants, booleans as 0/1.
    pub fn as_u64(&self) -> Option<u64> {
        match *self {
            IfrValue::U8(v) => Some(v as u64),
            IfrValue::U16(v) => Some(v as u64),
            IfrValue::U32(v) => Some(v as u64),
            IfrValue::U64(v) => Some(v),
            IfrValue::Bool(b) => Some(b as u64),
            _ => None,
        }
    }

    /// Builds the numeric variant matching a storage width.
    pub fn numeric(opcode: OpCode, size: NumericSize, value: u64) -> IfrResult<Self> {
        let out_of_range = || Error::ValueOutOfRange {
            opcode,
            value,
            width: size.bytes(),
        };
        Ok(match size {
            NumericSize::Size1 => IfrValue::U8(u8::try_from(value).map_err(|_| out_of_range())?),
            NumericSize::Size2 => IfrValue::U16(u16::try_from(value).map_err(|_| out_of_range())?),
            NumericSize::Size4 => IfrValue::U32(u32::try_from(value).map_err(|_| out_of_range())?),
            NumericSize::Size8 => IfrValue::U64(value),
        })
    }

    pub fn encode<F: FnMut(&[u8])>(&self, f: &mut F) {
        match self {
            IfrValue::U8(v) => f(&[*v]),
            IfrValue::U16(v) | IfrValue::String(v) | IfrValue::Action(v) => f(&v.to_le_bytes()),
            IfrValue::U32(v) => f(&v.to_le_bytes()),
            IfrValue::U64(v) => f(&v.to_le_bytes()),
            IfrValue::Bool(b) => f(&[*b as u8]),
            IfrValue::Time(t) => f(&[t.hour, t.minute, t.second]),
            IfrValue::Date(d) => {
                f(&d.year.to_le_bytes());
                f(&[d.month, d.day]);
            }
            IfrValue::Other | IfrValue::Undefined => {}
            IfrValue::Buffer(bytes) => f(bytes),
            IfrValue::Ref(r) => {
                f(&r.question_id.to_le_bytes());
                f(&r.form_id.to_le_bytes());
                f(&r.formset_guid.to_bytes());
                f(&r.device_path.to_le_bytes());
            }
        }
    }
}

impl fmt::Display for IfrValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            IfrValue::U8(v) => write!(f, "{v}"),
            IfrValue::U16(v) => write!(f, "{v}"),
            IfrValue::U32(v) => write!(f, "{v}"),
            IfrValue::U64(v) => write!(f, "{v}"),
            IfrValue::Bool(b) => write!(f, "{}", if *b { "TRUE" } else { "FALSE" }),
            IfrValue::Time(t) => write!(f, "{:02}:{:02}:{:02}", t.hour, t.minute, t.second),
            IfrValue::Date(d) => write!(f, "{:04}/{:02}/{:02}", d.year, d.month, d.day),
            IfrValue::String(id) => write!(f, "STRING_TOKEN(0x{id:04X})"),
            IfrValue::Other => write!(f, "OTHER"),
            IfrValue::Undefined => write!(f, "UNDEFINED"),
            IfrValue::Action(id) => write!(f, "ACTION(0x{id:04X})"),
            IfrValue::Buffer(bytes) => {
                let list: Vec<String> = bytes.iter().map(|b| format!("0x{b:02X}")).collect();
                write!(f, "{{{}}}", list.join(","))
            }
            IfrValue::Ref(r) => write!(
                f,
                "{};{};{};0x{:04X}",
                r.question_id, r.form_id, r.formset_guid, r.device_path
            ),
        }
    }
}

/// Minimum, maximum and step of a numeric or one-of question.
///
/// A first `set` stores the values as given. Later calls widen the range to
/// cover both (lowest minimum, highest maximum) and replace the step; this is
/// how bit fields sharing one storage unit combine their limits.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct MinMaxStep {
    pub min: u64,
    pub max: u64,
    pub step: u64,
    initialized: bool,
}

impl MinMaxStep {
    pub fn new(min: u64, max: u64, step: u64) -> Self {
        MinMaxStep {
            min,
            max,
            step,
            initialized: true,
        }
    }

    pub fn is_set(&self) -> bool {
        self.initialized
    }

    /// Returns the accumulated limits without modifying `self`.
    pub fn merged(&self, min: u64, max: u64, step: u64) -> MinMaxStep {
        if !self.initialized {
            return MinMaxStep::new(min, max, step);
        }
        MinMaxStep::new(self.min.min(min), self.max.max(max), step)
    }

    /// Checks the three limits fit `size`.
    pub fn check(&self, opcode: OpCode, size: NumericSize) -> IfrResult<()> {
        for value in [self.min, self.max, self.step] {
            if value > size.max_value() {
                return Err(Error::ValueOutOfRange {
                    opcode,
                    value,
                    width: size.bytes(),
                });
            }
        }
        Ok(())
    }

    /// Writes min, max and step truncated to the storage width. Call
    /// [`MinMaxStep::check`] first.
    pub fn encode<F: FnMut(&[u8])>(&self, size: NumericSize, f: &mut F) {
        let width = size.bytes() as usize;
        for value in [self.min, self.max, self.step] {
            f(&value.to_le_bytes()[..width]);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn value_sizes() {
        assert_eq!(IfrValue::U8(1).size(), 1);
        assert_eq!(IfrValue::Time(HiiTime::default()).size(), 3);
        assert_eq!(IfrValue::Date(HiiDate::default()).size(), 4);
        assert_eq!(IfrValue::Ref(HiiRef::default()).size(), 22);

        for value in [
            IfrValue::U64(7),
            IfrValue::Date(HiiDate {
                year: 2024,
                month: 2,
                day: 29,
            }),
            IfrValue::Ref(HiiRef::default()),
            IfrValue::Buffer(vec![1, 2, 3]),
        ] {
            let mut bytes = Vec::new();
            value.encode(&mut |b| bytes.extend_from_slice(b));
            assert_eq!(bytes.len(), value.size(), "{value:?}");
        }
    }

    #[test]
    fn numeric_values_fit_their_width() {
        assert_eq!(
            IfrValue::numeric(OpCode::OneOfOption, NumericSize::Size2, 0x1234).unwrap(),
            IfrValue::U16(0x1234)
        );
        assert!(
            IfrValue::numeric(OpCode::OneOfOption, NumericSize::Size1, 0x100)
                .unwrap_err()
                .is_value_out_of_range()
        );
    }

    #[test]
    fn min_max_step_widens() {
        let first = MinMaxStep::default().merged(10, 20, 1);
        assert_eq!((first.min, first.max, first.step), (10, 20, 1));

        let second = first.merged(5, 15, 2);
        assert_eq!((second.min, second.max, second.step), (5, 20, 2));

        let mut bytes = Vec::new();
        second.encode(NumericSize::Size2, &mut |b| bytes.extend_from_slice(b));
        assert_eq!(bytes, [5, 0, 20, 0, 2, 0]);
    }
}
