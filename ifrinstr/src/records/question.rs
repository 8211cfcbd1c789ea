use strum::{EnumIter, IntoStaticStr};

use crate::{
    guid::EfiGuid,
    opcode::OpCode,
    records::{
        FieldValue, IfrRecord, IfrValue, MinMaxStep, QuestionField, QuestionHeader,
        flags::{
            CheckBoxFlags, DateFlags, NumericFlags, OptionFlags, OrderedListFlags, StringFlags,
            TimeFlags, clear_recognized, split_date_time,
        },
    },
    utils::{Error, IfrResult},
};

fn question_fields(question: &QuestionHeader) -> Vec<(&'static str, FieldValue)> {
    vec![
        ("Prompt", FieldValue::StringId(question.statement.prompt)),
        ("Help", FieldValue::StringId(question.statement.help)),
        ("QuestionId", FieldValue::QuestionId(question.question_id)),
        ("VarStoreId", FieldValue::Int(question.var_store_id as u64)),
        ("VarStoreInfo", FieldValue::Hex(question.var_store_info as u64)),
        ("QuestionFlags", FieldValue::Flags(question.flags().bits())),
    ]
}

macro_rules! impl_question_access {
    () => {
        fn question(&self) -> Option<&QuestionHeader> {
            Some(&self.question)
        }

        fn question_mut(&mut self) -> Option<&mut QuestionHeader> {
            Some(&mut self.question)
        }
    };
}

/// `EFI_IFR_NUMERIC` and `EFI_IFR_ONE_OF`, which share their layout.
///
/// The min/max/step triple is stored at the width selected by the size
/// flags, so the record is 17, 20, 26 or 38 bytes long.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct Numeric {
    opcode: OpCode,
    pub question: QuestionHeader,
    flags: NumericFlags,
    limits: MinMaxStep,
}

impl Numeric {
    pub fn numeric(question: QuestionHeader) -> Self {
        Numeric {
            opcode: OpCode::Numeric,
            question,
            flags: NumericFlags::default(),
            limits: MinMaxStep::default(),
        }
    }

    pub fn one_of(question: QuestionHeader) -> Self {
        Numeric {
            opcode: OpCode::OneOf,
            ..Numeric::numeric(question)
        }
    }

    pub fn flags(&self) -> NumericFlags {
        self.flags
    }

    pub fn limits(&self) -> MinMaxStep {
        self.limits
    }

    /// Validates both flag bytes and commits them together. The limits
    /// already set must fit the new storage width.
    pub fn set_flags(
        &mut self,
        question_flags: u8,
        numeric_flags: u8,
        display_specified: bool,
    ) -> IfrResult<()> {
        let question = QuestionHeader::check_flags(self.opcode, question_flags)?;
        let flags = NumericFlags::from_bits(self.opcode, numeric_flags, display_specified)?;
        if self.limits.is_set() {
            self.limits.check(self.opcode, flags.size)?;
        }
        self.question.commit_flags(question);
        self.flags = flags;
        Ok(())
    }

    /// Sets or widens the limits, see [`MinMaxStep`].
    pub fn set_min_max_step(&mut self, min: u64, max: u64, step: u64) -> IfrResult<()> {
        let merged = self.limits.merged(min, max, step);
        merged.check(self.opcode, self.flags.size)?;
        self.limits = merged;
        Ok(())
    }
}

impl IfrRecord for Numeric {
    fn opcode(&self) -> OpCode {
        self.opcode
    }

    fn length(&self) -> usize {
        14 + 3 * self.flags.size.bytes() as usize
    }

    fn encode_payload<F: FnMut(&[u8])>(&self, f: &mut F) {
        self.question.encode(f);
        f(&[self.flags.bits()]);
        self.limits.encode(self.flags.size, f);
    }

    fn fields(&self) -> Vec<(&'static str, FieldValue)> {
        let mut fields = question_fields(&self.question);
        fields.push(("Flags", FieldValue::Flags(self.flags.bits())));
        fields.push(("MinValue", FieldValue::Int(self.limits.min)));
        fields.push(("MaxValue", FieldValue::Int(self.limits.max)));
        fields.push(("Step", FieldValue::Int(self.limits.step)));
        fields
    }

    impl_question_access!();
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct CheckBox {
    pub question: QuestionHeader,
    flags: CheckBoxFlags,
}

impl CheckBox {
    pub fn new(question: QuestionHeader) -> Self {
        CheckBox {
            question,
            flags: CheckBoxFlags::empty(),
        }
    }

    pub fn flags(&self) -> CheckBoxFlags {
        self.flags
    }

    pub fn set_flags(&mut self, question_flags: u8, checkbox_flags: u8) -> IfrResult<()> {
        let question = QuestionHeader::check_flags(OpCode::CheckBox, question_flags)?;
        let flags = clear_recognized(OpCode::CheckBox, checkbox_flags, 0)?;
        self.question.commit_flags(question);
        self.flags = flags;
        Ok(())
    }
}

impl IfrRecord for CheckBox {
    fn opcode(&self) -> OpCode {
        OpCode::CheckBox
    }

    fn encode_payload<F: FnMut(&[u8])>(&self, f: &mut F) {
        self.question.encode(f);
        f(&[self.flags.bits()]);
    }

    fn fields(&self) -> Vec<(&'static str, FieldValue)> {
        let mut fields = question_fields(&self.question);
        fields.push(("Flags", FieldValue::Flags(self.flags.bits())));
        fields
    }

    impl_question_access!();
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct Password {
    pub question: QuestionHeader,
    pub min_size: u16,
    pub max_size: u16,
}

impl IfrRecord for Password {
    fn opcode(&self) -> OpCode {
        OpCode::Password
    }

    fn encode_payload<F: FnMut(&[u8])>(&self, f: &mut F) {
        self.question.encode(f);
        f(&self.min_size.to_le_bytes());
        f(&self.max_size.to_le_bytes());
    }

    fn fields(&self) -> Vec<(&'static str, FieldValue)> {
        let mut fields = question_fields(&self.question);
        fields.push(("MinSize", FieldValue::Int(self.min_size as u64)));
        fields.push(("MaxSize", FieldValue::Int(self.max_size as u64)));
        fields
    }

    impl_question_access!();
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct Action {
    pub question: QuestionHeader,
    pub config: u16,
}

impl IfrRecord for Action {
    fn opcode(&self) -> OpCode {
        OpCode::Action
    }

    fn encode_payload<F: FnMut(&[u8])>(&self, f: &mut F) {
        self.question.encode(f);
        f(&self.config.to_le_bytes());
    }

    fn fields(&self) -> Vec<(&'static str, FieldValue)> {
        let mut fields = question_fields(&self.question);
        fields.push(("QuestionConfig", FieldValue::StringId(self.config)));
        fields
    }

    impl_question_access!();
}

/// Layout revision of a `REF` record; each one appends fields to the previous.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, EnumIter, IntoStaticStr)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum RefVariant {
    /// `REF5`: no target, the browser resolves it at runtime.
    Ref5,
    /// `REF`: a form of the same formset.
    Ref,
    /// `REF2`: a question of a form.
    Ref2,
    /// `REF3`: a question in another formset.
    Ref3,
    /// `REF4`: a question in a formset of another driver.
    Ref4,
}

impl RefVariant {
    pub fn length(self) -> usize {
        match self {
            RefVariant::Ref5 => 13,
            RefVariant::Ref => 15,
            RefVariant::Ref2 => 17,
            RefVariant::Ref3 => 33,
            RefVariant::Ref4 => 35,
        }
    }
}

/// `EFI_IFR_REF`: cross reference to a form or question.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct Ref {
    pub question: QuestionHeader,
    pub variant: RefVariant,
    pub form_id: u16,
    pub ref_question_id: u16,
    pub formset: EfiGuid,
    pub device_path: u16,
}

impl Ref {
    pub fn new(question: QuestionHeader, variant: RefVariant) -> Self {
        Ref {
            question,
            variant,
            form_id: 0,
            ref_question_id: 0,
            formset: EfiGuid::NIL,
            device_path: 0,
        }
    }
}

impl IfrRecord for Ref {
    fn opcode(&self) -> OpCode {
        OpCode::Ref
    }

    fn length(&self) -> usize {
        self.variant.length()
    }

    fn encode_payload<F: FnMut(&[u8])>(&self, f: &mut F) {
        self.question.encode(f);
        if self.variant == RefVariant::Ref5 {
            return;
        }
        f(&self.form_id.to_le_bytes());
        if self.variant == RefVariant::Ref {
            return;
        }
        f(&self.ref_question_id.to_le_bytes());
        if self.variant == RefVariant::Ref2 {
            return;
        }
        f(&self.formset.to_bytes());
        if self.variant == RefVariant::Ref4 {
            f(&self.device_path.to_le_bytes());
        }
    }

    fn fields(&self) -> Vec<(&'static str, FieldValue)> {
        let mut fields = question_fields(&self.question);
        if self.variant != RefVariant::Ref5 {
            fields.push(("FormId", FieldValue::Int(self.form_id as u64)));
        }
        if matches!(
            self.variant,
            RefVariant::Ref2 | RefVariant::Ref3 | RefVariant::Ref4
        ) {
            fields.push(("RefQuestionId", FieldValue::QuestionId(self.ref_question_id)));
        }
        if matches!(self.variant, RefVariant::Ref3 | RefVariant::Ref4) {
            fields.push(("FormSetId", FieldValue::Guid(self.formset)));
        }
        if self.variant == RefVariant::Ref4 {
            fields.push(("DevicePath", FieldValue::StringId(self.device_path)));
        }
        fields
    }

    impl_question_access!();

    fn patch_reference(&mut self, field: QuestionField, value: u16) -> IfrResult<()> {
        match field {
            QuestionField::RefQuestionId if !matches!(self.variant, RefVariant::Ref5 | RefVariant::Ref) => {
                self.ref_question_id = value;
                Ok(())
            }
            _ => Err(Error::NoSuchField {
                opcode: OpCode::Ref,
                field: field.name(),
            }),
        }
    }
}

/// `EFI_IFR_DATE` and `EFI_IFR_TIME`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct DateTime {
    opcode: OpCode,
    pub question: QuestionHeader,
    flags: u8,
}

impl DateTime {
    pub fn date(question: QuestionHeader) -> Self {
        DateTime {
            opcode: OpCode::Date,
            question,
            flags: 0,
        }
    }

    pub fn time(question: QuestionHeader) -> Self {
        DateTime {
            opcode: OpCode::Time,
            ..DateTime::date(question)
        }
    }

    pub fn flags(&self) -> u8 {
        self.flags
    }

    pub fn set_flags(&mut self, question_flags: u8, flags: u8) -> IfrResult<()> {
        let question = QuestionHeader::check_flags(self.opcode, question_flags)?;
        if self.opcode == OpCode::Date {
            split_date_time::<DateFlags>(self.opcode, flags)?;
        } else {
            split_date_time::<TimeFlags>(self.opcode, flags)?;
        }
        self.question.commit_flags(question);
        self.flags = flags;
        Ok(())
    }
}

impl IfrRecord for DateTime {
    fn opcode(&self) -> OpCode {
        self.opcode
    }

    fn encode_payload<F: FnMut(&[u8])>(&self, f: &mut F) {
        self.question.encode(f);
        f(&[self.flags]);
    }

    fn fields(&self) -> Vec<(&'static str, FieldValue)> {
        let mut fields = question_fields(&self.question);
        fields.push(("Flags", FieldValue::Flags(self.flags)));
        fields
    }

    impl_question_access!();
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct StringQuestion {
    pub question: QuestionHeader,
    pub min_size: u8,
    pub max_size: u8,
    flags: StringFlags,
}

impl StringQuestion {
    pub fn new(question: QuestionHeader, min_size: u8, max_size: u8) -> Self {
        StringQuestion {
            question,
            min_size,
            max_size,
            flags: StringFlags::empty(),
        }
    }

    pub fn flags(&self) -> StringFlags {
        self.flags
    }

    pub fn set_flags(&mut self, question_flags: u8, string_flags: u8) -> IfrResult<()> {
        let question = QuestionHeader::check_flags(OpCode::String, question_flags)?;
        let flags = clear_recognized(OpCode::String, string_flags, 0)?;
        self.question.commit_flags(question);
        self.flags = flags;
        Ok(())
    }
}

impl IfrRecord for StringQuestion {
    fn opcode(&self) -> OpCode {
        OpCode::String
    }

    fn encode_payload<F: FnMut(&[u8])>(&self, f: &mut F) {
        self.question.encode(f);
        f(&[self.min_size, self.max_size, self.flags.bits()]);
    }

    fn fields(&self) -> Vec<(&'static str, FieldValue)> {
        let mut fields = question_fields(&self.question);
        fields.push(("MinSize", FieldValue::Int(self.min_size as u64)));
        fields.push(("MaxSize", FieldValue::Int(self.max_size as u64)));
        fields.push(("Flags", FieldValue::Flags(self.flags.bits())));
        fields
    }

    impl_question_access!();
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct OrderedList {
    pub question: QuestionHeader,
    pub max_containers: u8,
    flags: OrderedListFlags,
}

impl OrderedList {
    pub fn new(question: QuestionHeader, max_containers: u8) -> Self {
        OrderedList {
            question,
            max_containers,
            flags: OrderedListFlags::empty(),
        }
    }

    pub fn flags(&self) -> OrderedListFlags {
        self.flags
    }

    pub fn set_flags(&mut self, question_flags: u8, list_flags: u8) -> IfrResult<()> {
        let question = QuestionHeader::check_flags(OpCode::OrderedList, question_flags)?;
        let flags = clear_recognized(OpCode::OrderedList, list_flags, 0)?;
        self.question.commit_flags(question);
        self.flags = flags;
        Ok(())
    }
}

impl IfrRecord for OrderedList {
    fn opcode(&self) -> OpCode {
        OpCode::OrderedList
    }

    fn encode_payload<F: FnMut(&[u8])>(&self, f: &mut F) {
        self.question.encode(f);
        f(&[self.max_containers, self.flags.bits()]);
    }

    fn fields(&self) -> Vec<(&'static str, FieldValue)> {
        let mut fields = question_fields(&self.question);
        fields.push(("MaxContainers", FieldValue::Int(self.max_containers as u64)));
        fields.push(("Flags", FieldValue::Flags(self.flags.bits())));
        fields
    }

    impl_question_access!();
}

/// `EFI_IFR_ONE_OF_OPTION`: sized to its value type.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct OneOfOption {
    pub option: u16,
    flags: OptionFlags,
    pub value: IfrValue,
}

impl OneOfOption {
    pub fn new(option: u16, value: IfrValue) -> Self {
        OneOfOption {
            option,
            flags: OptionFlags::empty(),
            value,
        }
    }

    pub fn flags(&self) -> OptionFlags {
        self.flags
    }

    /// Only the default bits are set here; the type nibble of the encoded
    /// flags always follows the value.
    pub fn set_flags(&mut self, flags: u8) -> IfrResult<()> {
        self.flags = clear_recognized(OpCode::OneOfOption, flags, 0)?;
        Ok(())
    }
}

impl IfrRecord for OneOfOption {
    fn opcode(&self) -> OpCode {
        OpCode::OneOfOption
    }

    fn length(&self) -> usize {
        6 + self.value.size()
    }

    fn encode_payload<F: FnMut(&[u8])>(&self, f: &mut F) {
        f(&self.option.to_le_bytes());
        f(&[self.flags.bits(), self.value.value_type() as u8]);
        self.value.encode(f);
    }

    fn fields(&self) -> Vec<(&'static str, FieldValue)> {
        vec![
            ("Option", FieldValue::StringId(self.option)),
            ("Flags", FieldValue::Flags(self.flags.bits())),
            (
                "Type",
                FieldValue::Text(<&'static str>::from(self.value.value_type()).to_string()),
            ),
            ("Value", FieldValue::Value(self.value.clone())),
        ]
    }
}

/// `EFI_IFR_DEFAULT`. Without a value this is the `DEFAULT_2` form whose
/// value comes from a nested `VALUE` expression scope.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct DefaultValue {
    pub default_id: u16,
    pub value_type: u8,
    pub value: Option<IfrValue>,
}

impl DefaultValue {
    pub fn with_value(default_id: u16, value: IfrValue) -> Self {
        DefaultValue {
            default_id,
            value_type: value.value_type() as u8,
            value: Some(value),
        }
    }

    pub fn with_expression(default_id: u16, value_type: u8) -> Self {
        DefaultValue {
            default_id,
            value_type,
            value: None,
        }
    }
}

impl IfrRecord for DefaultValue {
    fn opcode(&self) -> OpCode {
        OpCode::Default
    }

    fn length(&self) -> usize {
        5 + self.value.as_ref().map_or(0, IfrValue::size)
    }

    fn encode_payload<F: FnMut(&[u8])>(&self, f: &mut F) {
        f(&self.default_id.to_le_bytes());
        f(&[self.value_type]);
        if let Some(value) = &self.value {
            value.encode(f);
        }
    }

    fn fields(&self) -> Vec<(&'static str, FieldValue)> {
        let mut fields = vec![
            ("DefaultId", FieldValue::Hex(self.default_id as u64)),
            ("Type", FieldValue::Hex(self.value_type as u64)),
        ];
        if let Some(value) = &self.value {
            fields.push(("Value", FieldValue::Value(value.clone())));
        }
        fields
    }
}
