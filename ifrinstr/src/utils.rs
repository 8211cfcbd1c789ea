use strum::{EnumIs, EnumTryAs};
use thiserror::Error;

use crate::opcode::OpCode;

#[derive(Debug, PartialEq, Eq, Hash, EnumIs, EnumTryAs, Error)]
pub enum Error {
    /// The record does not fit the 7-bit length field of the opcode header.
    #[error(
        "Record `{opcode:?}` would be {length} bytes long, but the opcode header can only describe records of up to 127 bytes."
    )]
    RecordTooLarge { opcode: OpCode, length: usize },

    /// Residual bits remained once every recognized flag was cleared.
    #[error(
        "Flags 0x{flags:02X} are not supported by `{opcode:?}`: bits 0x{residual:02X} are not recognized for this opcode. The stored flags were left unchanged."
    )]
    FlagsUnsupported { opcode: OpCode, flags: u8, residual: u8 },

    /// A numeric value does not fit the storage width selected for the question.
    #[error("Value {value} does not fit in the {width}-byte storage of `{opcode:?}`.")]
    ValueOutOfRange {
        opcode: OpCode,
        value: u64,
        width: u8,
    },

    /// A generic record layout was asked to carry an opcode with another layout.
    #[error("Opcode `{opcode:?}` cannot be built with the `{layout}` record layout.")]
    UnsupportedLayout { opcode: OpCode, layout: &'static str },

    /// The record kind does not carry the field a pending reference targets.
    #[error("Record `{opcode:?}` has no `{field}` field that could receive a resolved reference.")]
    NoSuchField { opcode: OpCode, field: &'static str },

    /// A node id that does not belong to the tree.
    #[error("Node #{node} does not belong to this form tree.")]
    InvalidNode { node: u32 },

    /// The payload of a variable-length record exceeds what its count field can describe.
    #[error("Record `{opcode:?}` holds {count} list entries, more than its count field allows.")]
    ListTooLong { opcode: OpCode, count: usize },

    /// A scoped opcode has no terminating `End` as its last child.
    #[error(
        "Scope opened by `{opcode:?}` (line {line}) is never closed: its last child must be an `End` record."
    )]
    MissingEnd { opcode: OpCode, line: u32 },

    /// An `End` record found where no scope is open.
    #[error("`End` record at line {line} does not close any open scope.")]
    StrayEnd { line: u32 },

    /// `End` records never have children.
    #[error("`End` record at line {line} has children; it cannot open a scope.")]
    EndWithChildren { line: u32 },

    /// Serialization was requested before every pending reference was resolved.
    #[error(
        "{count} pending references are still unresolved; the package cannot be serialized before they are all resolved."
    )]
    UnresolvedBeforeSerialize { count: usize },

    /// Serialization was requested before the package offsets were computed.
    #[error("The package length and node offsets must be computed before serialization.")]
    OffsetsNotComputed,
}

pub type IfrResult<T> = Result<T, Error>;
