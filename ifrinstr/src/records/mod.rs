use strum::{EnumDiscriminants, EnumIs, EnumIter, EnumTryAs, IntoStaticStr};

use crate::{
    guid::EfiGuid,
    opcode::{OP_HEADER_SIZE, OpCode},
    utils::{Error, IfrResult},
};

pub mod expression;
pub mod flags;
pub mod header;
pub mod question;
pub mod statement;
pub mod value;

pub use header::{QuestionHeader, StatementHeader};
pub use value::{IfrValue, MinMaxStep};

/// Field of a record that a forward question reference patches once the
/// referenced question is declared.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, EnumIter, IntoStaticStr)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum QuestionField {
    /// `QuestionId` of `EQ_ID_VAL`, `EQ_ID_VAL_LIST` and `QUESTION_REF1`.
    QuestionId,
    /// First operand of `EQ_ID_ID`.
    QuestionId1,
    /// Second operand of `EQ_ID_ID`.
    QuestionId2,
    /// Target question of a `REF` (`REF2` and above).
    RefQuestionId,
}

impl QuestionField {
    pub fn name(self) -> &'static str {
        self.into()
    }
}

/// Decoded field of a record, as shown by the YAML and JSON dumps.
#[derive(Debug, Clone, PartialEq, Eq, Hash, EnumIs)]
pub enum FieldValue {
    Int(u64),
    Hex(u64),
    Flags(u8),
    StringId(u16),
    QuestionId(u16),
    Guid(EfiGuid),
    Text(String),
    Value(IfrValue),
    List(Vec<u64>),
}

/// Behavior shared by every opcode record.
///
/// A record knows its opcode and how to write the bytes following the
/// two-byte opcode header. Header length and scope are derived by the tree.
pub trait IfrRecord {
    fn opcode(&self) -> OpCode;

    /// Size of the record header included. Defaults to the fixed size of the
    /// opcode; variable-length records override it.
    fn length(&self) -> usize {
        self.opcode().info().size as usize
    }

    fn encode_payload<F: FnMut(&[u8])>(&self, f: &mut F);

    /// Named fields, in declaration order.
    fn fields(&self) -> Vec<(&'static str, FieldValue)>;

    fn question(&self) -> Option<&QuestionHeader> {
        None
    }

    fn question_mut(&mut self) -> Option<&mut QuestionHeader> {
        None
    }

    /// Writes a resolved question id into `field`.
    fn patch_reference(&mut self, field: QuestionField, _value: u16) -> IfrResult<()> {
        Err(Error::NoSuchField {
            opcode: self.opcode(),
            field: field.name(),
        })
    }

    /// Full record bytes: opcode, `length | scope << 7`, payload.
    fn encode<F: FnMut(&[u8])>(&self, scope: bool, f: &mut F) {
        let opcode = self.opcode();
        if opcode == OpCode::ShownDefaultStore {
            return;
        }
        let length = self.length() as u8 & 0x7F;
        f(&[opcode as u8, length | ((scope as u8) << 7)]);
        self.encode_payload(f);
    }
}

/// Record without payload: logic operators, constants such as `TRUE` or
/// `ONES`, scope openers such as `SUPPRESS_IF`, and `END`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct Bare {
    opcode: OpCode,
}

impl Bare {
    pub fn new(opcode: OpCode) -> IfrResult<Self> {
        let size = opcode.info().size as usize;
        if size == OP_HEADER_SIZE || opcode == OpCode::ShownDefaultStore {
            Ok(Bare { opcode })
        } else {
            Err(Error::UnsupportedLayout {
                opcode,
                layout: "bare",
            })
        }
    }

    pub fn end() -> Self {
        Bare {
            opcode: OpCode::End,
        }
    }
}

impl IfrRecord for Bare {
    fn opcode(&self) -> OpCode {
        self.opcode
    }

    fn encode_payload<F: FnMut(&[u8])>(&self, _f: &mut F) {}

    fn fields(&self) -> Vec<(&'static str, FieldValue)> {
        Vec::new()
    }
}

/// Every opcode record, one variant per layout.
#[derive(Debug, Clone, PartialEq, Eq, Hash, EnumIs, EnumTryAs, EnumDiscriminants)]
#[strum_discriminants(name(IfrOpKind), derive(EnumIter, IntoStaticStr))]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum IfrOp {
    // Formset structure
    FormSet(statement::FormSet),
    Form(statement::Form),
    FormMap(statement::FormMap),
    DefaultStore(statement::DefaultStore),
    VarStore(statement::VarStore),
    VarStoreEfi(statement::VarStoreEfi),
    VarStoreNameValue(statement::VarStoreNameValue),
    Guid(statement::GuidOp),

    // Statements
    Subtitle(statement::Subtitle),
    Text(statement::Text),
    ResetButton(statement::ResetButton),
    WarningIf(statement::WarningIf),

    // Questions
    Numeric(question::Numeric),
    CheckBox(question::CheckBox),
    Password(question::Password),
    Action(question::Action),
    Ref(question::Ref),
    DateTime(question::DateTime),
    String(question::StringQuestion),
    OrderedList(question::OrderedList),
    OneOfOption(question::OneOfOption),
    Default(question::DefaultValue),

    // Expressions
    EqIdVal(expression::EqIdVal),
    EqIdId(expression::EqIdId),
    EqIdValList(expression::EqIdValList),
    QuestionRef1(expression::QuestionRef1),
    QuestionRef3(expression::QuestionRef3),
    Constant(expression::Constant),
    Span(expression::Span),
    VarAccess(expression::VarAccess),

    // Shared layouts
    Byte(expression::ByteOperand),
    Word(expression::WordOperand),
    GuidOperand(expression::GuidOperand),
    Bare(Bare),
}

impl IfrOp {
    pub fn kind(&self) -> IfrOpKind {
        self.into()
    }

    pub fn end() -> Self {
        IfrOp::Bare(Bare::end())
    }

    /// Encodes the full record into a byte vector.
    pub fn to_bytes(&self, scope: bool) -> Vec<u8> {
        let mut bytes = Vec::with_capacity(self.length());
        self.encode(scope, &mut |b| bytes.extend_from_slice(b));
        bytes
    }
}

macro_rules! define_ifr_op_dispatch {
    (
        $($variant:ident),* $(,)?
    ) => {
        impl IfrRecord for IfrOp {
            fn opcode(&self) -> OpCode {
                match self {
                    $(
                        IfrOp::$variant(record) => record.opcode(),
                    )*
                }
            }

            fn length(&self) -> usize {
                match self {
                    $(
                        IfrOp::$variant(record) => record.length(),
                    )*
                }
            }

            fn encode_payload<F: FnMut(&[u8])>(&self, f: &mut F) {
                match self {
                    $(
                        IfrOp::$variant(record) => record.encode_payload(f),
                    )*
                }
            }

            fn fields(&self) -> Vec<(&'static str, FieldValue)> {
                match self {
                    $(
                        IfrOp::$variant(record) => record.fields(),
                    )*
                }
            }

            fn question(&self) -> Option<&QuestionHeader> {
                match self {
                    $(
                        IfrOp::$variant(record) => record.question(),
                    )*
                }
            }

            fn question_mut(&mut self) -> Option<&mut QuestionHeader> {
                match self {
                    $(
                        IfrOp::$variant(record) => record.question_mut(),
                    )*
                }
            }

            fn patch_reference(&mut self, field: QuestionField, value: u16) -> IfrResult<()> {
                match self {
                    $(
                        IfrOp::$variant(record) => record.patch_reference(field, value),
                    )*
                }
            }
        }
    };
}

define_ifr_op_dispatch! {
    FormSet,
    Form,
    FormMap,
    DefaultStore,
    VarStore,
    VarStoreEfi,
    VarStoreNameValue,
    Guid,
    Subtitle,
    Text,
    ResetButton,
    WarningIf,
    Numeric,
    CheckBox,
    Password,
    Action,
    Ref,
    DateTime,
    String,
    OrderedList,
    OneOfOption,
    Default,
    EqIdVal,
    EqIdId,
    EqIdValList,
    QuestionRef1,
    QuestionRef3,
    Constant,
    Span,
    VarAccess,
    Byte,
    Word,
    GuidOperand,
    Bare,
}

macro_rules! define_ifr_op_from {
    ($typ:ty, $variant:ident) => {
        impl From<$typ> for IfrOp {
            fn from(record: $typ) -> Self {
                IfrOp::$variant(record)
            }
        }
    };
}

define_ifr_op_from!(statement::FormSet, FormSet);
define_ifr_op_from!(statement::Form, Form);
define_ifr_op_from!(statement::FormMap, FormMap);
define_ifr_op_from!(statement::DefaultStore, DefaultStore);
define_ifr_op_from!(statement::VarStore, VarStore);
define_ifr_op_from!(statement::VarStoreEfi, VarStoreEfi);
define_ifr_op_from!(statement::VarStoreNameValue, VarStoreNameValue);
define_ifr_op_from!(statement::GuidOp, Guid);

define_ifr_op_from!(statement::Subtitle, Subtitle);
define_ifr_op_from!(statement::Text, Text);
define_ifr_op_from!(statement::ResetButton, ResetButton);
define_ifr_op_from!(statement::WarningIf, WarningIf);

define_ifr_op_from!(question::Numeric, Numeric);
define_ifr_op_from!(question::CheckBox, CheckBox);
define_ifr_op_from!(question::Password, Password);
define_ifr_op_from!(question::Action, Action);
define_ifr_op_from!(question::Ref, Ref);
define_ifr_op_from!(question::DateTime, DateTime);
define_ifr_op_from!(question::StringQuestion, String);
define_ifr_op_from!(question::OrderedList, OrderedList);
define_ifr_op_from!(question::OneOfOption, OneOfOption);
define_ifr_op_from!(question::DefaultValue, Default);

define_ifr_op_from!(expression::EqIdVal, EqIdVal);
define_ifr_op_from!(expression::EqIdId, EqIdId);
define_ifr_op_from!(expression::EqIdValList, EqIdValList);
define_ifr_op_from!(expression::QuestionRef1, QuestionRef1);
define_ifr_op_from!(expression::QuestionRef3, QuestionRef3);
define_ifr_op_from!(expression::Constant, Constant);
define_ifr_op_from!(expression::Span, Span);
define_ifr_op_from!(expression::VarAccess, VarAccess);

define_ifr_op_from!(expression::ByteOperand, Byte);
define_ifr_op_from!(expression::WordOperand, Word);
define_ifr_op_from!(expression::GuidOperand, GuidOperand);
define_ifr_op_from!(Bare, Bare);

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn bare_records_have_no_payload() {
        let and = IfrOp::from(Bare::new(OpCode::And).expect("AND has no payload"));
        assert_eq!(and.to_bytes(false), [0x15, 0x02]);

        let suppress = IfrOp::from(Bare::new(OpCode::SuppressIf).expect("no payload"));
        assert_eq!(suppress.to_bytes(true), [0x0A, 0x82]);

        assert!(
            Bare::new(OpCode::Text)
                .unwrap_err()
                .is_unsupported_layout()
        );
    }

    #[test]
    fn shown_default_store_produces_no_bytes() {
        let sentinel = IfrOp::from(Bare::new(OpCode::ShownDefaultStore).expect("sentinel"));
        assert!(sentinel.to_bytes(false).is_empty());
    }

    #[test]
    fn records_without_reference_fields_refuse_patches() {
        let mut end = IfrOp::end();
        let err = end
            .patch_reference(QuestionField::QuestionId, 3)
            .unwrap_err();
        assert!(err.is_no_such_field());
    }
}
