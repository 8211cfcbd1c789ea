use strum::{EnumIter, FromRepr, IntoStaticStr};

/// Size of the opcode header (`OpCode` byte plus `Length:7 | Scope:1` byte).
pub const OP_HEADER_SIZE: usize = 2;

/// Largest record length expressible in the 7-bit header length field.
pub const MAX_RECORD_LENGTH: usize = 0x7F;

/// IFR opcodes, numbered as in the UEFI HII specification.
///
/// `ShownDefaultStore` is not an HII opcode. It marks the position where the
/// default stores of a formset are listed in dumps and produces no bytes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, FromRepr, EnumIter, IntoStaticStr)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[repr(u8)]
#[strum(serialize_all = "SCREAMING_SNAKE_CASE")]
pub enum OpCode {
    Form = 0x01,
    Subtitle = 0x02,
    Text = 0x03,
    Image = 0x04,
    OneOf = 0x05,
    CheckBox = 0x06,
    Numeric = 0x07,
    Password = 0x08,
    OneOfOption = 0x09,
    SuppressIf = 0x0A,
    Locked = 0x0B,
    Action = 0x0C,
    ResetButton = 0x0D,
    FormSet = 0x0E,
    Ref = 0x0F,
    NoSubmitIf = 0x10,
    InconsistentIf = 0x11,
    EqIdVal = 0x12,
    EqIdId = 0x13,
    EqIdValList = 0x14,
    And = 0x15,
    Or = 0x16,
    Not = 0x17,
    Rule = 0x18,
    GrayOutIf = 0x19,
    Date = 0x1A,
    Time = 0x1B,
    String = 0x1C,
    Refresh = 0x1D,
    DisableIf = 0x1E,
    Animation = 0x1F,
    ToLower = 0x20,
    ToUpper = 0x21,
    Map = 0x22,
    OrderedList = 0x23,
    VarStore = 0x24,
    VarStoreNameValue = 0x25,
    VarStoreEfi = 0x26,
    VarStoreDevice = 0x27,
    Version = 0x28,
    End = 0x29,
    Match = 0x2A,
    Get = 0x2B,
    Set = 0x2C,
    Read = 0x2D,
    Write = 0x2E,
    Equal = 0x2F,
    NotEqual = 0x30,
    GreaterThan = 0x31,
    GreaterEqual = 0x32,
    LessThan = 0x33,
    LessEqual = 0x34,
    BitwiseAnd = 0x35,
    BitwiseOr = 0x36,
    BitwiseNot = 0x37,
    ShiftLeft = 0x38,
    ShiftRight = 0x39,
    Add = 0x3A,
    Subtract = 0x3B,
    Multiply = 0x3C,
    Divide = 0x3D,
    Modulo = 0x3E,
    RuleRef = 0x3F,
    QuestionRef1 = 0x40,
    QuestionRef2 = 0x41,
    Uint8 = 0x42,
    Uint16 = 0x43,
    Uint32 = 0x44,
    Uint64 = 0x45,
    True = 0x46,
    False = 0x47,
    ToUint = 0x48,
    ToString = 0x49,
    ToBoolean = 0x4A,
    Mid = 0x4B,
    Find = 0x4C,
    Token = 0x4D,
    StringRef1 = 0x4E,
    StringRef2 = 0x4F,
    Conditional = 0x50,
    QuestionRef3 = 0x51,
    Zero = 0x52,
    One = 0x53,
    Ones = 0x54,
    Undefined = 0x55,
    Length = 0x56,
    Dup = 0x57,
    This = 0x58,
    Span = 0x59,
    Value = 0x5A,
    Default = 0x5B,
    DefaultStore = 0x5C,
    FormMap = 0x5D,
    Catenate = 0x5E,
    Guid = 0x5F,
    Security = 0x60,
    ModalTag = 0x61,
    RefreshId = 0x62,
    WarningIf = 0x63,
    Match2 = 0x64,
    ShownDefaultStore = 0xFE,
}

/// Static layout information of an opcode.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct OpCodeInfo {
    /// Size of the fixed record, header included. Records with a variable
    /// part (names, lists, narrower numeric widths) compute their own length.
    pub size: u8,
    /// The opcode always opens a scope closed by an `End` record.
    pub scope: bool,
}

const fn info(size: u8, scope: bool) -> OpCodeInfo {
    OpCodeInfo { size, scope }
}

impl OpCode {
    pub fn from_u8(byte: u8) -> Option<OpCode> {
        OpCode::from_repr(byte)
    }

    /// Name as it appears in HII headers, e.g. `EFI_IFR_ONE_OF_OP`.
    pub fn ifr_name(self) -> String {
        let name: &'static str = self.into();
        format!("EFI_IFR_{name}_OP")
    }

    /// Fixed size and inherent scope of the opcode.
    pub const fn info(self) -> OpCodeInfo {
        use OpCode::*;
        match self {
            Form => info(6, true),
            Subtitle => info(7, true),
            Text => info(8, false),
            Image => info(4, false),
            OneOf => info(38, true),
            CheckBox => info(14, true),
            Numeric => info(38, true),
            Password => info(17, true),
            OneOfOption => info(28, false),
            SuppressIf => info(2, true),
            Locked => info(2, false),
            Action => info(15, true),
            ResetButton => info(8, true),
            FormSet => info(39, true),
            Ref => info(15, false),
            NoSubmitIf => info(4, true),
            InconsistentIf => info(4, true),
            EqIdVal => info(6, false),
            EqIdId => info(6, false),
            EqIdValList => info(8, false),
            And | Or | Not => info(2, false),
            Rule => info(3, true),
            GrayOutIf => info(2, true),
            Date => info(14, true),
            Time => info(14, true),
            String => info(16, true),
            Refresh => info(3, false),
            DisableIf => info(2, true),
            Animation => info(4, false),
            ToLower | ToUpper => info(2, false),
            Map => info(2, true),
            OrderedList => info(15, true),
            VarStore => info(23, false),
            VarStoreNameValue => info(20, false),
            VarStoreEfi => info(27, false),
            VarStoreDevice => info(4, true),
            Version | End | Match => info(2, false),
            Get | Set => info(7, false),
            Read | Write => info(2, false),
            Equal | NotEqual | GreaterThan | GreaterEqual | LessThan | LessEqual => info(2, false),
            BitwiseAnd | BitwiseOr | BitwiseNot | ShiftLeft | ShiftRight => info(2, false),
            Add | Subtract | Multiply | Divide | Modulo => info(2, false),
            RuleRef => info(3, false),
            QuestionRef1 => info(4, false),
            QuestionRef2 => info(2, false),
            Uint8 => info(3, false),
            Uint16 => info(4, false),
            Uint32 => info(6, false),
            Uint64 => info(10, false),
            True | False => info(2, false),
            ToUint => info(2, false),
            ToString => info(3, false),
            ToBoolean | Mid => info(2, false),
            Find => info(3, false),
            Token => info(2, false),
            StringRef1 => info(4, false),
            StringRef2 | Conditional | QuestionRef3 => info(2, false),
            Zero | One | Ones | Undefined | Length | Dup | This => info(2, false),
            Span => info(3, false),
            Value => info(2, true),
            Default => info(27, false),
            DefaultStore => info(6, false),
            FormMap => info(4, true),
            Catenate => info(2, false),
            Guid | Security => info(18, false),
            ModalTag => info(2, false),
            RefreshId => info(18, false),
            WarningIf => info(5, true),
            Match2 => info(18, false),
            ShownDefaultStore => info(0, false),
        }
    }

    /// Opcodes that appear inside expressions. Their bytes are produced at
    /// serialization time, after forward references were patched.
    pub const fn is_expression(self) -> bool {
        use OpCode::*;
        matches!(
            self,
            EqIdVal
                | EqIdId
                | EqIdValList
                | And
                | Or
                | Not
                | ToLower
                | ToUpper
                | Map
                | Version
                | Match
                | Get
                | Set
                | Equal
                | NotEqual
                | GreaterThan
                | GreaterEqual
                | LessThan
                | LessEqual
                | BitwiseAnd
                | BitwiseOr
                | BitwiseNot
                | ShiftLeft
                | ShiftRight
                | Add
                | Subtract
                | Multiply
                | Divide
                | Modulo
                | RuleRef
                | QuestionRef1
                | QuestionRef2
                | Uint8
                | Uint16
                | Uint32
                | Uint64
                | True
                | False
                | ToUint
                | ToString
                | ToBoolean
                | Mid
                | Find
                | Token
                | StringRef1
                | StringRef2
                | Conditional
                | QuestionRef3
                | Zero
                | One
                | Ones
                | Undefined
                | Length
                | Dup
                | This
                | Span
                | Catenate
                | Security
                | Match2
        )
    }

    /// Opcodes whose scope guards the records nested in it.
    pub const fn is_condition(self) -> bool {
        matches!(
            self,
            OpCode::SuppressIf
                | OpCode::GrayOutIf
                | OpCode::DisableIf
                | OpCode::NoSubmitIf
                | OpCode::InconsistentIf
                | OpCode::WarningIf
        )
    }

    /// Opcodes that carry a question header.
    pub const fn is_question(self) -> bool {
        matches!(
            self,
            OpCode::OneOf
                | OpCode::CheckBox
                | OpCode::Numeric
                | OpCode::Password
                | OpCode::Action
                | OpCode::Ref
                | OpCode::Date
                | OpCode::Time
                | OpCode::String
                | OpCode::OrderedList
        )
    }
}

#[cfg(test)]
mod tests {
    use strum::IntoEnumIterator;

    use super::*;

    #[test]
    fn repr_round_trips() {
        for op in OpCode::iter() {
            assert_eq!(OpCode::from_u8(op as u8), Some(op));
        }
        assert_eq!(OpCode::from_u8(0x00), None);
        assert_eq!(OpCode::from_u8(0x65), None);
    }

    #[test]
    fn fixed_sizes_fit_the_header_field() {
        for op in OpCode::iter() {
            let info = op.info();
            assert!(info.size as usize <= MAX_RECORD_LENGTH, "{op:?}");
            if op != OpCode::ShownDefaultStore {
                assert!(info.size as usize >= OP_HEADER_SIZE, "{op:?}");
            }
        }
    }

    #[test]
    fn header_names() {
        assert_eq!(OpCode::OneOfOption.ifr_name(), "EFI_IFR_ONE_OF_OPTION_OP");
        assert_eq!(OpCode::QuestionRef1.ifr_name(), "EFI_IFR_QUESTION_REF1_OP");
        assert_eq!(OpCode::EqIdValList.ifr_name(), "EFI_IFR_EQ_ID_VAL_LIST_OP");
    }
}
