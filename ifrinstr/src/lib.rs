//! IFR opcode records, the form tree they are arranged in and the writers of
//! the HII form package built from that tree.
//!
//! A form is compiled by inserting records into a [`FormPackage`], resolving
//! the question references that were used before their question was
//! declared, computing the offsets with [`FormPackage::build_pkg`] and
//! finally handing the [`SerializedPackage`] to the emitters in [`emit`].

pub mod diagnostic;
pub mod emit;
pub mod guid;
pub mod opcode;
pub mod package;
pub mod pending;
pub mod records;
pub mod tree;
pub mod utils;

pub use diagnostic::{Diagnostic, Severity};
pub use guid::EfiGuid;
pub use opcode::OpCode;
pub use package::{FormPackage, SerializedPackage};
pub use pending::PendingAssignList;
pub use records::{IfrOp, IfrRecord, QuestionField};
pub use tree::{FormTree, NodeId};
pub use utils::{Error, IfrResult};
