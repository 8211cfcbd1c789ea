use crate::{
    guid::EfiGuid,
    opcode::OpCode,
    records::{
        FieldValue, IfrRecord, StatementHeader,
        flags::{SubtitleFlags, clear_recognized},
        header::encode_ascii_name,
    },
    utils::{Error, IfrResult},
};

/// Most class GUIDs a formset may list; the count lives in two flag bits.
pub const MAX_CLASS_GUIDS: usize = 3;

/// `EFI_IFR_FORM_SET`: root of a form package.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct FormSet {
    pub guid: EfiGuid,
    pub title: u16,
    pub help: u16,
    class_guids: Vec<EfiGuid>,
}

impl FormSet {
    pub fn new(guid: EfiGuid, title: u16, help: u16) -> Self {
        FormSet {
            guid,
            title,
            help,
            class_guids: Vec::new(),
        }
    }

    pub fn class_guids(&self) -> &[EfiGuid] {
        &self.class_guids
    }

    pub fn add_class_guid(&mut self, guid: EfiGuid) -> IfrResult<()> {
        if self.class_guids.len() == MAX_CLASS_GUIDS {
            return Err(Error::ListTooLong {
                opcode: OpCode::FormSet,
                count: self.class_guids.len() + 1,
            });
        }
        self.class_guids.push(guid);
        Ok(())
    }
}

impl IfrRecord for FormSet {
    fn opcode(&self) -> OpCode {
        OpCode::FormSet
    }

    fn length(&self) -> usize {
        23 + EfiGuid::SIZE * self.class_guids.len()
    }

    fn encode_payload<F: FnMut(&[u8])>(&self, f: &mut F) {
        f(&self.guid.to_bytes());
        f(&self.title.to_le_bytes());
        f(&self.help.to_le_bytes());
        f(&[self.class_guids.len() as u8 & 0x03]);
        for class in &self.class_guids {
            f(&class.to_bytes());
        }
    }

    fn fields(&self) -> Vec<(&'static str, FieldValue)> {
        let mut fields = vec![
            ("Guid", FieldValue::Guid(self.guid)),
            ("FormSetTitle", FieldValue::StringId(self.title)),
            ("Help", FieldValue::StringId(self.help)),
            ("Flags", FieldValue::Flags(self.class_guids.len() as u8)),
        ];
        fields.extend(
            self.class_guids
                .iter()
                .map(|class| ("ClassGuid", FieldValue::Guid(*class))),
        );
        fields
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct Form {
    pub form_id: u16,
    pub title: u16,
}

impl Form {
    pub fn new(form_id: u16, title: u16) -> Self {
        Form { form_id, title }
    }
}

impl IfrRecord for Form {
    fn opcode(&self) -> OpCode {
        OpCode::Form
    }

    fn encode_payload<F: FnMut(&[u8])>(&self, f: &mut F) {
        f(&self.form_id.to_le_bytes());
        f(&self.title.to_le_bytes());
    }

    fn fields(&self) -> Vec<(&'static str, FieldValue)> {
        vec![
            ("FormId", FieldValue::Int(self.form_id as u64)),
            ("FormTitle", FieldValue::StringId(self.title)),
        ]
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct FormMapMethod {
    pub title: u16,
    pub identifier: EfiGuid,
}

/// `EFI_IFR_FORM_MAP`: a form reachable through several configuration methods.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct FormMap {
    pub form_id: u16,
    pub methods: Vec<FormMapMethod>,
}

impl FormMap {
    pub fn new(form_id: u16) -> Self {
        FormMap {
            form_id,
            methods: Vec::new(),
        }
    }

    pub fn add_method(&mut self, title: u16, identifier: EfiGuid) {
        self.methods.push(FormMapMethod { title, identifier });
    }
}

impl IfrRecord for FormMap {
    fn opcode(&self) -> OpCode {
        OpCode::FormMap
    }

    fn length(&self) -> usize {
        4 + 18 * self.methods.len()
    }

    fn encode_payload<F: FnMut(&[u8])>(&self, f: &mut F) {
        f(&self.form_id.to_le_bytes());
        for method in &self.methods {
            f(&method.title.to_le_bytes());
            f(&method.identifier.to_bytes());
        }
    }

    fn fields(&self) -> Vec<(&'static str, FieldValue)> {
        let mut fields = vec![("FormId", FieldValue::Int(self.form_id as u64))];
        for method in &self.methods {
            fields.push(("MethodTitle", FieldValue::StringId(method.title)));
            fields.push(("MethodIdentifier", FieldValue::Guid(method.identifier)));
        }
        fields
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct DefaultStore {
    pub name: u16,
    pub default_id: u16,
}

impl IfrRecord for DefaultStore {
    fn opcode(&self) -> OpCode {
        OpCode::DefaultStore
    }

    fn encode_payload<F: FnMut(&[u8])>(&self, f: &mut F) {
        f(&self.name.to_le_bytes());
        f(&self.default_id.to_le_bytes());
    }

    fn fields(&self) -> Vec<(&'static str, FieldValue)> {
        vec![
            ("DefaultName", FieldValue::StringId(self.name)),
            ("DefaultId", FieldValue::Hex(self.default_id as u64)),
        ]
    }
}

/// `EFI_IFR_VARSTORE`: buffer storage, named by an ASCII string.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct VarStore {
    pub guid: EfiGuid,
    pub var_store_id: u16,
    pub size: u16,
    pub name: String,
}

impl IfrRecord for VarStore {
    fn opcode(&self) -> OpCode {
        OpCode::VarStore
    }

    fn length(&self) -> usize {
        22 + self.name.len() + 1
    }

    fn encode_payload<F: FnMut(&[u8])>(&self, f: &mut F) {
        f(&self.guid.to_bytes());
        f(&self.var_store_id.to_le_bytes());
        f(&self.size.to_le_bytes());
        encode_ascii_name(&self.name, f);
    }

    fn fields(&self) -> Vec<(&'static str, FieldValue)> {
        vec![
            ("Guid", FieldValue::Guid(self.guid)),
            ("VarStoreId", FieldValue::Int(self.var_store_id as u64)),
            ("Size", FieldValue::Int(self.size as u64)),
            ("Name", FieldValue::Text(self.name.clone())),
        ]
    }
}

/// `EFI_IFR_VARSTORE_EFI`: storage backed by a UEFI variable.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct VarStoreEfi {
    pub var_store_id: u16,
    pub guid: EfiGuid,
    pub attributes: u32,
    pub size: u16,
    pub name: String,
}

impl IfrRecord for VarStoreEfi {
    fn opcode(&self) -> OpCode {
        OpCode::VarStoreEfi
    }

    fn length(&self) -> usize {
        26 + self.name.len() + 1
    }

    fn encode_payload<F: FnMut(&[u8])>(&self, f: &mut F) {
        f(&self.var_store_id.to_le_bytes());
        f(&self.guid.to_bytes());
        f(&self.attributes.to_le_bytes());
        f(&self.size.to_le_bytes());
        encode_ascii_name(&self.name, f);
    }

    fn fields(&self) -> Vec<(&'static str, FieldValue)> {
        vec![
            ("VarStoreId", FieldValue::Int(self.var_store_id as u64)),
            ("Guid", FieldValue::Guid(self.guid)),
            ("Attributes", FieldValue::Hex(self.attributes as u64)),
            ("Size", FieldValue::Int(self.size as u64)),
            ("Name", FieldValue::Text(self.name.clone())),
        ]
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct VarStoreNameValue {
    pub var_store_id: u16,
    pub guid: EfiGuid,
}

impl IfrRecord for VarStoreNameValue {
    fn opcode(&self) -> OpCode {
        OpCode::VarStoreNameValue
    }

    fn encode_payload<F: FnMut(&[u8])>(&self, f: &mut F) {
        f(&self.var_store_id.to_le_bytes());
        f(&self.guid.to_bytes());
    }

    fn fields(&self) -> Vec<(&'static str, FieldValue)> {
        vec![
            ("VarStoreId", FieldValue::Int(self.var_store_id as u64)),
            ("Guid", FieldValue::Guid(self.guid)),
        ]
    }
}

/// `EFI_IFR_GUID`: vendor extension, the GUID followed by opaque data.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct GuidOp {
    pub guid: EfiGuid,
    pub data: Vec<u8>,
}

impl IfrRecord for GuidOp {
    fn opcode(&self) -> OpCode {
        OpCode::Guid
    }

    fn length(&self) -> usize {
        18 + self.data.len()
    }

    fn encode_payload<F: FnMut(&[u8])>(&self, f: &mut F) {
        f(&self.guid.to_bytes());
        f(&self.data);
    }

    fn fields(&self) -> Vec<(&'static str, FieldValue)> {
        vec![
            ("Guid", FieldValue::Guid(self.guid)),
            (
                "Data",
                FieldValue::List(self.data.iter().map(|b| *b as u64).collect()),
            ),
        ]
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct Subtitle {
    pub statement: StatementHeader,
    flags: SubtitleFlags,
}

impl Subtitle {
    pub fn new(statement: StatementHeader) -> Self {
        Subtitle {
            statement,
            flags: SubtitleFlags::empty(),
        }
    }

    pub fn flags(&self) -> SubtitleFlags {
        self.flags
    }

    pub fn set_flags(&mut self, flags: u8) -> IfrResult<()> {
        self.flags = clear_recognized(OpCode::Subtitle, flags, 0)?;
        Ok(())
    }
}

impl IfrRecord for Subtitle {
    fn opcode(&self) -> OpCode {
        OpCode::Subtitle
    }

    fn encode_payload<F: FnMut(&[u8])>(&self, f: &mut F) {
        self.statement.encode(f);
        f(&[self.flags.bits()]);
    }

    fn fields(&self) -> Vec<(&'static str, FieldValue)> {
        vec![
            ("Prompt", FieldValue::StringId(self.statement.prompt)),
            ("Help", FieldValue::StringId(self.statement.help)),
            ("Flags", FieldValue::Flags(self.flags.bits())),
        ]
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct Text {
    pub statement: StatementHeader,
    pub text_two: u16,
}

impl Text {
    pub fn new(statement: StatementHeader, text_two: u16) -> Self {
        Text {
            statement,
            text_two,
        }
    }
}

impl IfrRecord for Text {
    fn opcode(&self) -> OpCode {
        OpCode::Text
    }

    fn encode_payload<F: FnMut(&[u8])>(&self, f: &mut F) {
        self.statement.encode(f);
        f(&self.text_two.to_le_bytes());
    }

    fn fields(&self) -> Vec<(&'static str, FieldValue)> {
        vec![
            ("Prompt", FieldValue::StringId(self.statement.prompt)),
            ("Help", FieldValue::StringId(self.statement.help)),
            ("TextTwo", FieldValue::StringId(self.text_two)),
        ]
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct ResetButton {
    pub statement: StatementHeader,
    pub default_id: u16,
}

impl IfrRecord for ResetButton {
    fn opcode(&self) -> OpCode {
        OpCode::ResetButton
    }

    fn encode_payload<F: FnMut(&[u8])>(&self, f: &mut F) {
        self.statement.encode(f);
        f(&self.default_id.to_le_bytes());
    }

    fn fields(&self) -> Vec<(&'static str, FieldValue)> {
        vec![
            ("Prompt", FieldValue::StringId(self.statement.prompt)),
            ("Help", FieldValue::StringId(self.statement.help)),
            ("DefaultId", FieldValue::Hex(self.default_id as u64)),
        ]
    }
}

/// `EFI_IFR_WARNING_IF`: warning string shown while its expression holds.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct WarningIf {
    pub warning: u16,
    pub timeout: u8,
}

impl IfrRecord for WarningIf {
    fn opcode(&self) -> OpCode {
        OpCode::WarningIf
    }

    fn encode_payload<F: FnMut(&[u8])>(&self, f: &mut F) {
        f(&self.warning.to_le_bytes());
        f(&[self.timeout]);
    }

    fn fields(&self) -> Vec<(&'static str, FieldValue)> {
        vec![
            ("Warning", FieldValue::StringId(self.warning)),
            ("TimeOut", FieldValue::Int(self.timeout as u64)),
        ]
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::records::IfrOp;

    #[test]
    fn formset_grows_with_class_guids() {
        let mut formset = FormSet::new(EfiGuid::NIL, 2, 3);
        assert_eq!(formset.length(), 23);
        formset
            .add_class_guid(EfiGuid::from_fields(1, 2, 3, [0; 8]))
            .expect("first class guid");
        assert_eq!(formset.length(), 39);

        let bytes = IfrOp::from(formset.clone()).to_bytes(true);
        assert_eq!(bytes.len(), 39);
        assert_eq!(&bytes[..2], [0x0E, 0x80 | 39]);
        assert_eq!(bytes[22], 1, "class guid count");

        formset.add_class_guid(EfiGuid::NIL).expect("second");
        formset.add_class_guid(EfiGuid::NIL).expect("third");
        assert!(
            formset
                .add_class_guid(EfiGuid::NIL)
                .unwrap_err()
                .is_list_too_long()
        );
    }

    #[test]
    fn varstore_name_is_nul_terminated() {
        let store = VarStore {
            guid: EfiGuid::NIL,
            var_store_id: 1,
            size: 16,
            name: "Setup".into(),
        };
        let bytes = IfrOp::from(store).to_bytes(false);
        assert_eq!(bytes.len(), 28);
        assert_eq!(bytes[1], 28);
        assert_eq!(&bytes[22..], b"Setup\0");
    }

    #[test]
    fn subtitle_flags() {
        let mut subtitle = Subtitle::new(StatementHeader::new(1, 2));
        subtitle.set_flags(0x01).expect("horizontal");
        assert_eq!(subtitle.flags(), SubtitleFlags::HORIZONTAL);

        assert!(subtitle.set_flags(0x03).unwrap_err().is_flags_unsupported());
        assert_eq!(subtitle.flags(), SubtitleFlags::HORIZONTAL);
    }

    #[test]
    fn text_layout() {
        let text = Text::new(StatementHeader::new(0x10, 0x11), 0x12);
        assert_eq!(
            IfrOp::from(text).to_bytes(false),
            [0x03, 0x08, 0x10, 0x00, 0x11, 0x00, 0x12, 0x00]
        );
    }
}
