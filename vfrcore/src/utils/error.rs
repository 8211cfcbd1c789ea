use std::path::PathBuf;

use ifrinstr::{Diagnostic, OpCode};
use pcdexpr::ExprError;
use strum::EnumIs;
use thiserror::Error;

#[derive(Debug, EnumIs, Error)]
pub enum VfrError {
    #[error("Expression evaluation failed: {0}")]
    Expr(#[from] ExprError),

    #[error("Form package error: {0}")]
    Ifr(#[from] ifrinstr::Error),

    #[error("I/O error on '{}': {source}", path.display())]
    Io {
        path: PathBuf,
        source: std::io::Error,
    },

    #[error("Failed to parse configuration file '{file}': {source}")]
    ConfigParse {
        file: String,
        source: toml::de::Error,
    },

    #[error(
        "{} question references are never resolved; every referenced question must be declared.",
        .0.len()
    )]
    UnresolvedReferences(Vec<Diagnostic>),

    #[error("Scope opened by `{opcode:?}` at line {line} is never closed.")]
    UnclosedScope { opcode: OpCode, line: u32 },

    #[error("`End` at line {line} does not close any open scope.")]
    NoOpenScope { line: u32 },

    #[error("Record `{opcode:?}` at line {line} does not open a conditional scope.")]
    NotAConditional { opcode: OpCode, line: u32 },

    #[error("Record `{opcode:?}` at line {line} carries no question header.")]
    NotAQuestion { opcode: OpCode, line: u32 },

    #[error("Question `{name}` is already declared with id {id}.")]
    DuplicateQuestionName { name: String, id: u16 },

    #[error("Question id {id} is already used by another question.")]
    DuplicateQuestionId { id: u16 },

    #[error("All 65535 question ids are in use; no id is left for `{name}`.")]
    QuestionIdsExhausted { name: String },

    #[error("GUID `{text}` given for `{name}` is not in registry format.")]
    InvalidGuid { name: String, text: String },
}

pub type VfrResult<T> = Result<T, VfrError>;

impl VfrError {
    pub(crate) fn io(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        VfrError::Io {
            path: path.into(),
            source,
        }
    }
}
