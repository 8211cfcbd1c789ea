use crate::{
    guid::EfiGuid,
    opcode::OpCode,
    records::{
        FieldValue, IfrRecord, QuestionField,
        flags::{SpanFlags, clear_recognized},
    },
    utils::{Error, IfrResult},
};

fn no_such_field(opcode: OpCode, field: QuestionField) -> Error {
    Error::NoSuchField {
        opcode,
        field: field.name(),
    }
}

/// `EFI_IFR_EQ_ID_VAL`: question value equals a 16-bit constant.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct EqIdVal {
    pub question_id: u16,
    pub value: u16,
}

impl IfrRecord for EqIdVal {
    fn opcode(&self) -> OpCode {
        OpCode::EqIdVal
    }

    fn encode_payload<F: FnMut(&[u8])>(&self, f: &mut F) {
        f(&self.question_id.to_le_bytes());
        f(&self.value.to_le_bytes());
    }

    fn fields(&self) -> Vec<(&'static str, FieldValue)> {
        vec![
            ("QuestionId", FieldValue::QuestionId(self.question_id)),
            ("Value", FieldValue::Int(self.value as u64)),
        ]
    }

    fn patch_reference(&mut self, field: QuestionField, value: u16) -> IfrResult<()> {
        match field {
            QuestionField::QuestionId => {
                self.question_id = value;
                Ok(())
            }
            _ => Err(no_such_field(OpCode::EqIdVal, field)),
        }
    }
}

/// `EFI_IFR_EQ_ID_ID`: two questions hold equal values.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct EqIdId {
    pub question_id1: u16,
    pub question_id2: u16,
}

impl IfrRecord for EqIdId {
    fn opcode(&self) -> OpCode {
        OpCode::EqIdId
    }

    fn encode_payload<F: FnMut(&[u8])>(&self, f: &mut F) {
        f(&self.question_id1.to_le_bytes());
        f(&self.question_id2.to_le_bytes());
    }

    fn fields(&self) -> Vec<(&'static str, FieldValue)> {
        vec![
            ("QuestionId1", FieldValue::QuestionId(self.question_id1)),
            ("QuestionId2", FieldValue::QuestionId(self.question_id2)),
        ]
    }

    fn patch_reference(&mut self, field: QuestionField, value: u16) -> IfrResult<()> {
        match field {
            QuestionField::QuestionId1 => self.question_id1 = value,
            QuestionField::QuestionId2 => self.question_id2 = value,
            _ => return Err(no_such_field(OpCode::EqIdId, field)),
        }
        Ok(())
    }
}

/// `EFI_IFR_EQ_ID_VAL_LIST`: question value is one of a list.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct EqIdValList {
    pub question_id: u16,
    pub values: Vec<u16>,
}

impl IfrRecord for EqIdValList {
    fn opcode(&self) -> OpCode {
        OpCode::EqIdValList
    }

    fn length(&self) -> usize {
        6 + 2 * self.values.len()
    }

    fn encode_payload<F: FnMut(&[u8])>(&self, f: &mut F) {
        f(&self.question_id.to_le_bytes());
        f(&(self.values.len() as u16).to_le_bytes());
        for value in &self.values {
            f(&value.to_le_bytes());
        }
    }

    fn fields(&self) -> Vec<(&'static str, FieldValue)> {
        vec![
            ("QuestionId", FieldValue::QuestionId(self.question_id)),
            ("ListLength", FieldValue::Int(self.values.len() as u64)),
            (
                "ValueList",
                FieldValue::List(self.values.iter().map(|v| *v as u64).collect()),
            ),
        ]
    }

    fn patch_reference(&mut self, field: QuestionField, value: u16) -> IfrResult<()> {
        match field {
            QuestionField::QuestionId => {
                self.question_id = value;
                Ok(())
            }
            _ => Err(no_such_field(OpCode::EqIdValList, field)),
        }
    }
}

/// `EFI_IFR_QUESTION_REF1`: pushes the value of a question.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct QuestionRef1 {
    pub question_id: u16,
}

impl IfrRecord for QuestionRef1 {
    fn opcode(&self) -> OpCode {
        OpCode::QuestionRef1
    }

    fn encode_payload<F: FnMut(&[u8])>(&self, f: &mut F) {
        f(&self.question_id.to_le_bytes());
    }

    fn fields(&self) -> Vec<(&'static str, FieldValue)> {
        vec![("QuestionId", FieldValue::QuestionId(self.question_id))]
    }

    fn patch_reference(&mut self, field: QuestionField, value: u16) -> IfrResult<()> {
        match field {
            QuestionField::QuestionId => {
                self.question_id = value;
                Ok(())
            }
            _ => Err(no_such_field(OpCode::QuestionRef1, field)),
        }
    }
}

/// `EFI_IFR_QUESTION_REF3` and its `_2`/`_3` extensions.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum QuestionRef3 {
    Plain,
    DevicePath(u16),
    Guid { device_path: u16, guid: EfiGuid },
}

impl IfrRecord for QuestionRef3 {
    fn opcode(&self) -> OpCode {
        OpCode::QuestionRef3
    }

    fn length(&self) -> usize {
        match self {
            QuestionRef3::Plain => 2,
            QuestionRef3::DevicePath(_) => 4,
            QuestionRef3::Guid { .. } => 20,
        }
    }

    fn encode_payload<F: FnMut(&[u8])>(&self, f: &mut F) {
        match self {
            QuestionRef3::Plain => {}
            QuestionRef3::DevicePath(path) => f(&path.to_le_bytes()),
            QuestionRef3::Guid { device_path, guid } => {
                f(&device_path.to_le_bytes());
                f(&guid.to_bytes());
            }
        }
    }

    fn fields(&self) -> Vec<(&'static str, FieldValue)> {
        match self {
            QuestionRef3::Plain => Vec::new(),
            QuestionRef3::DevicePath(path) => vec![("DevicePath", FieldValue::StringId(*path))],
            QuestionRef3::Guid { device_path, guid } => vec![
                ("DevicePath", FieldValue::StringId(*device_path)),
                ("Guid", FieldValue::Guid(*guid)),
            ],
        }
    }
}

/// `EFI_IFR_UINT8` to `EFI_IFR_UINT64` constants.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum Constant {
    U8(u8),
    U16(u16),
    U32(u32),
    U64(u64),
}

impl Constant {
    /// Narrowest constant able to hold `value`.
    pub fn fitting(value: u64) -> Self {
        if let Ok(v) = u8::try_from(value) {
            Constant::U8(v)
        } else if let Ok(v) = u16::try_from(value) {
            Constant::U16(v)
        } else if let Ok(v) = u32::try_from(value) {
            Constant::U32(v)
        } else {
            Constant::U64(value)
        }
    }

    pub fn value(&self) -> u64 {
        match *self {
            Constant::U8(v) => v as u64,
            Constant::U16(v) => v as u64,
            Constant::U32(v) => v as u64,
            Constant::U64(v) => v,
        }
    }
}

impl IfrRecord for Constant {
    fn opcode(&self) -> OpCode {
        match self {
            Constant::U8(_) => OpCode::Uint8,
            Constant::U16(_) => OpCode::Uint16,
            Constant::U32(_) => OpCode::Uint32,
            Constant::U64(_) => OpCode::Uint64,
        }
    }

    fn encode_payload<F: FnMut(&[u8])>(&self, f: &mut F) {
        match self {
            Constant::U8(v) => f(&[*v]),
            Constant::U16(v) => f(&v.to_le_bytes()),
            Constant::U32(v) => f(&v.to_le_bytes()),
            Constant::U64(v) => f(&v.to_le_bytes()),
        }
    }

    fn fields(&self) -> Vec<(&'static str, FieldValue)> {
        vec![("Value", FieldValue::Int(self.value()))]
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct Span {
    flags: SpanFlags,
}

impl Span {
    pub fn flags(&self) -> SpanFlags {
        self.flags
    }

    pub fn set_flags(&mut self, flags: u8) -> IfrResult<()> {
        self.flags = clear_recognized(OpCode::Span, flags, 0)?;
        Ok(())
    }
}

impl IfrRecord for Span {
    fn opcode(&self) -> OpCode {
        OpCode::Span
    }

    fn encode_payload<F: FnMut(&[u8])>(&self, f: &mut F) {
        f(&[self.flags.bits()]);
    }

    fn fields(&self) -> Vec<(&'static str, FieldValue)> {
        vec![("Flags", FieldValue::Flags(self.flags.bits()))]
    }
}

/// `EFI_IFR_GET` and `EFI_IFR_SET`: direct storage access.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct VarAccess {
    opcode: OpCode,
    pub var_store_id: u16,
    pub var_store_info: u16,
    pub var_store_type: u8,
}

impl VarAccess {
    pub fn get(var_store_id: u16, var_store_info: u16, var_store_type: u8) -> Self {
        VarAccess {
            opcode: OpCode::Get,
            var_store_id,
            var_store_info,
            var_store_type,
        }
    }

    pub fn set(var_store_id: u16, var_store_info: u16, var_store_type: u8) -> Self {
        VarAccess {
            opcode: OpCode::Set,
            ..VarAccess::get(var_store_id, var_store_info, var_store_type)
        }
    }
}

impl IfrRecord for VarAccess {
    fn opcode(&self) -> OpCode {
        self.opcode
    }

    fn encode_payload<F: FnMut(&[u8])>(&self, f: &mut F) {
        f(&self.var_store_id.to_le_bytes());
        f(&self.var_store_info.to_le_bytes());
        f(&[self.var_store_type]);
    }

    fn fields(&self) -> Vec<(&'static str, FieldValue)> {
        vec![
            ("VarStoreId", FieldValue::Int(self.var_store_id as u64)),
            ("VarStoreInfo", FieldValue::Hex(self.var_store_info as u64)),
            ("VarStoreType", FieldValue::Hex(self.var_store_type as u64)),
        ]
    }
}

/// Records whose payload is a single byte.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct ByteOperand {
    opcode: OpCode,
    pub value: u8,
}

impl ByteOperand {
    fn field_name(opcode: OpCode) -> Option<&'static str> {
        match opcode {
            OpCode::Rule | OpCode::RuleRef => Some("RuleId"),
            OpCode::Refresh => Some("RefreshInterval"),
            OpCode::ToString | OpCode::Find => Some("Format"),
            _ => None,
        }
    }

    pub fn new(opcode: OpCode, value: u8) -> IfrResult<Self> {
        match Self::field_name(opcode) {
            Some(_) => Ok(ByteOperand { opcode, value }),
            None => Err(Error::UnsupportedLayout {
                opcode,
                layout: "byte",
            }),
        }
    }
}

impl IfrRecord for ByteOperand {
    fn opcode(&self) -> OpCode {
        self.opcode
    }

    fn encode_payload<F: FnMut(&[u8])>(&self, f: &mut F) {
        f(&[self.value]);
    }

    fn fields(&self) -> Vec<(&'static str, FieldValue)> {
        let name = Self::field_name(self.opcode).unwrap_or("Value");
        vec![(name, FieldValue::Int(self.value as u64))]
    }
}

/// Records whose payload is a single 16-bit word.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct WordOperand {
    opcode: OpCode,
    pub value: u16,
}

impl WordOperand {
    fn field_name(opcode: OpCode) -> Option<&'static str> {
        match opcode {
            OpCode::Image | OpCode::Animation => Some("Id"),
            OpCode::StringRef1 => Some("StringId"),
            OpCode::NoSubmitIf | OpCode::InconsistentIf => Some("Error"),
            OpCode::VarStoreDevice => Some("DevicePath"),
            _ => None,
        }
    }

    pub fn new(opcode: OpCode, value: u16) -> IfrResult<Self> {
        match Self::field_name(opcode) {
            Some(_) => Ok(WordOperand { opcode, value }),
            None => Err(Error::UnsupportedLayout {
                opcode,
                layout: "word",
            }),
        }
    }
}

impl IfrRecord for WordOperand {
    fn opcode(&self) -> OpCode {
        self.opcode
    }

    fn encode_payload<F: FnMut(&[u8])>(&self, f: &mut F) {
        f(&self.value.to_le_bytes());
    }

    fn fields(&self) -> Vec<(&'static str, FieldValue)> {
        let name = Self::field_name(self.opcode).unwrap_or("Value");
        let value = match self.opcode {
            OpCode::Image | OpCode::Animation => FieldValue::Int(self.value as u64),
            _ => FieldValue::StringId(self.value),
        };
        vec![(name, value)]
    }
}

/// Records whose payload is a single GUID.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct GuidOperand {
    opcode: OpCode,
    pub guid: EfiGuid,
}

impl GuidOperand {
    fn field_name(opcode: OpCode) -> Option<&'static str> {
        match opcode {
            OpCode::Security => Some("Permissions"),
            OpCode::Match2 => Some("SyntaxType"),
            OpCode::RefreshId => Some("RefreshEventGroupId"),
            _ => None,
        }
    }

    pub fn new(opcode: OpCode, guid: EfiGuid) -> IfrResult<Self> {
        match Self::field_name(opcode) {
            Some(_) => Ok(GuidOperand { opcode, guid }),
            None => Err(Error::UnsupportedLayout {
                opcode,
                layout: "guid",
            }),
        }
    }
}

impl IfrRecord for GuidOperand {
    fn opcode(&self) -> OpCode {
        self.opcode
    }

    fn encode_payload<F: FnMut(&[u8])>(&self, f: &mut F) {
        f(&self.guid.to_bytes());
    }

    fn fields(&self) -> Vec<(&'static str, FieldValue)> {
        let name = Self::field_name(self.opcode).unwrap_or("Guid");
        vec![(name, FieldValue::Guid(self.guid))]
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::records::IfrOp;

    #[test]
    fn constants_pick_their_opcode() {
        assert_eq!(Constant::fitting(0xFF).opcode(), OpCode::Uint8);
        assert_eq!(Constant::fitting(0x100).opcode(), OpCode::Uint16);
        assert_eq!(Constant::fitting(0x1_0000).opcode(), OpCode::Uint32);
        assert_eq!(Constant::fitting(u64::MAX).opcode(), OpCode::Uint64);

        assert_eq!(
            IfrOp::from(Constant::U16(0xBEEF)).to_bytes(false),
            [0x43, 0x04, 0xEF, 0xBE]
        );
    }

    #[test]
    fn value_list_length() {
        let list = EqIdValList {
            question_id: 3,
            values: vec![1, 2, 3],
        };
        let bytes = IfrOp::from(list).to_bytes(false);
        assert_eq!(bytes.len(), 12);
        assert_eq!(&bytes[..6], [0x14, 12, 3, 0, 3, 0]);
    }

    #[test]
    fn eq_id_id_patches_either_side() {
        let mut eq = EqIdId {
            question_id1: 0,
            question_id2: 0,
        };
        eq.patch_reference(QuestionField::QuestionId2, 7)
            .expect("second operand");
        eq.patch_reference(QuestionField::QuestionId1, 6)
            .expect("first operand");
        assert_eq!((eq.question_id1, eq.question_id2), (6, 7));
        assert!(
            eq.patch_reference(QuestionField::RefQuestionId, 1)
                .unwrap_err()
                .is_no_such_field()
        );
    }

    #[test]
    fn shared_layouts_check_their_opcode() {
        assert!(ByteOperand::new(OpCode::RuleRef, 1).is_ok());
        assert!(WordOperand::new(OpCode::Image, 1).is_ok());
        assert!(GuidOperand::new(OpCode::Security, EfiGuid::NIL).is_ok());
        assert!(
            WordOperand::new(OpCode::Form, 1)
                .unwrap_err()
                .is_unsupported_layout()
        );
    }

    #[test]
    fn span_flags() {
        let mut span = Span::default();
        span.set_flags(0x01).expect("first non-matching");
        assert!(span.set_flags(0x02).unwrap_err().is_flags_unsupported());
        assert_eq!(span.flags(), SpanFlags::FIRST_NON_MATCHING);
    }
}
