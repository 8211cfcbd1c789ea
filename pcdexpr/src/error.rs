use std::fmt;

use strum::{EnumIs, EnumTryAs};
use thiserror::Error;

/// Fatal evaluation failure. No value is produced.
#[derive(Debug, Clone, PartialEq, Eq, Hash, EnumIs, EnumTryAs, Error)]
pub enum ExprError {
    /// The expression is empty once macros are expanded and whitespace trimmed.
    #[error("Empty expression is not allowed.")]
    EmptyExpression,

    /// The tokenizer found text that does not start any valid token.
    #[error("Invalid token found at `{rest}`. Expected an identifier, a literal or a parenthesis.")]
    BadToken { rest: String },

    /// A quoted string has no closing quote.
    #[error("String literal `{literal}` is missing its closing quote.")]
    UnterminatedString { literal: String },

    /// A `{...}` literal is neither a byte list nor a structured GUID.
    #[error(
        "Array literal `{literal}` is malformed. Expected a byte list such as {{0x01,0x02}} or a GUID structure such as {{0x00000000,0x0000,0x0000,{{0x00,0x00,0x00,0x00,0x00,0x00,0x00,0x00}}}}."
    )]
    BadArray { literal: String },

    /// An element inside `{...}` is not a hex literal or a nested array.
    #[error("Array element `{element}` is not a hexadecimal literal or a nested array.")]
    BadArrayElement { element: String },

    /// `$(` without a closing `)`.
    #[error("Macro reference `{rest}` is not terminated by `)`.")]
    MacroToken { rest: String },

    /// Symbolic operator text outside the supported set.
    #[error("Operator `{op}` is not supported.")]
    UnsupportedOperator { op: String },

    /// `!`/`NOT` at the membership level must be followed by `IN`.
    #[error("Expected `IN` after `NOT` near `{rest}`. Only `NOT IN` may combine a negation with a relational operator.")]
    NotWithoutIn { rest: String },

    /// Missing or surplus parenthesis.
    #[error("Parentheses do not match near `{rest}`.")]
    UnmatchedParen { rest: String },

    /// `cond ? a` without `: b`.
    #[error("Ternary operator is missing its `:` branch near `{rest}`.")]
    MissingColon { rest: String },

    /// An operand was expected but the input ended or held an operator.
    #[error("Expected an operand near `{rest}`.")]
    MissingOperand { rest: String },

    /// Text remains after a complete expression was parsed.
    #[error("Unexpected text `{rest}` after the end of the expression.")]
    Syntax { rest: String },

    /// Parentheses, casts, ternaries and prefix operators nest too deeply.
    #[error("Expression nests deeper than {max} levels near `{rest}`.")]
    NestingTooDeep { rest: String, max: usize },

    /// A `TokenSpace.Name` reference is absent from the symbol table.
    #[error("PCD `{name}` cannot be resolved. It is not defined in the symbol table.")]
    PcdNotResolved { name: String },

    /// A non-comparison operator received a string or array operand.
    #[error("Operator `{op}` cannot be applied to an operand of string type.")]
    StringOperatorMisuse { op: String },

    /// Number and boolean mixed outside of comparisons and bitwise/logical operators.
    #[error("Operator `{op}` cannot mix operands `{lhs}` and `{rhs}` of different types.")]
    TypeMismatch { lhs: String, op: String, rhs: String },

    /// Relational operator between a string and a number or boolean.
    #[error("Relational operator `{op}` cannot compare a string with a number or a boolean.")]
    RelationalStringMismatch { op: String },

    /// Wide and narrow strings are never comparable.
    #[error("Unicode and ASCII strings cannot be compared: `{lhs}` {op} `{rhs}`.")]
    StringCompareMismatch { lhs: String, op: String, rhs: String },

    /// A macro used as the right-hand side of `IN` must be one of the quoted macros.
    #[error(
        "Macro `{name}` cannot be used as an `IN` operand. Only TARGET, TOOL_CHAIN_TAG, ARCH and FAMILY are supported."
    )]
    InOperandMacro { name: String },

    /// `/` or `%` with a zero divisor.
    #[error("Division by zero in `{lhs} {op} 0`.")]
    DivisionByZero { lhs: String, op: String },

    /// Shift count is negative or unreasonably large.
    #[error("Shift count `{count}` is invalid. It must be between 0 and {max}.")]
    InvalidShift { count: String, max: u32 },

    /// Nested PCD or macro expansion exceeded the depth bound.
    #[error(
        "Evaluation of `{name}` exceeds the maximum nesting depth of {depth}. The PCD is likely self-referential."
    )]
    RecursionTooDeep { name: String, depth: usize },

    /// Value does not fit the requested width.
    #[error("Value `{value}` does not fit in type {ty}.")]
    ValueOutOfRange { value: String, ty: String },

    /// Value kind cannot be represented as the requested datum type.
    #[error("Value `{value}` cannot be converted to datum type {ty}.")]
    DatumTypeMismatch { value: String, ty: String },
}

pub type ExprResult<T> = Result<T, ExprError>;

/// Category of a non-fatal diagnostic.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, EnumIs)]
pub enum WarningKind {
    /// A boolean took part in `+` or `-`.
    BoolInArithmetic,
    /// `==` between a string and a number or boolean, always false.
    StringEqualsOther,
    /// `!=` between a string and a number or boolean, always true.
    StringNotEqualsOther,
}

/// Non-fatal diagnostic attached to a successful evaluation.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Warning {
    pub kind: WarningKind,
    /// Operator text that triggered the warning.
    pub op: String,
}

impl Warning {
    pub fn new(kind: WarningKind, op: impl Into<String>) -> Self {
        Self {
            kind,
            op: op.into(),
        }
    }
}

impl fmt::Display for Warning {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.kind {
            WarningKind::BoolInArithmetic => write!(
                f,
                "operand of boolean type used in arithmetic expression `{}`",
                self.op
            ),
            WarningKind::StringEqualsOther => write!(
                f,
                "`==` between a string and a number or boolean always evaluates to False"
            ),
            WarningKind::StringNotEqualsOther => write!(
                f,
                "`!=` between a string and a number or boolean always evaluates to True"
            ),
        }
    }
}
