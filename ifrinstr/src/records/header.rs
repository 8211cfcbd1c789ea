use crate::{
    opcode::OpCode,
    records::flags::{QuestionFlags, clear_recognized},
    utils::IfrResult,
};

/// Prompt and help string tokens of every statement.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct StatementHeader {
    pub prompt: u16,
    pub help: u16,
}

impl StatementHeader {
    pub const SIZE: usize = 4;

    pub fn new(prompt: u16, help: u16) -> Self {
        StatementHeader { prompt, help }
    }

    pub fn encode<F: FnMut(&[u8])>(&self, f: &mut F) {
        f(&self.prompt.to_le_bytes());
        f(&self.help.to_le_bytes());
    }
}

/// Header shared by every question (`EFI_IFR_QUESTION_HEADER`).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct QuestionHeader {
    pub statement: StatementHeader,
    pub question_id: u16,
    pub var_store_id: u16,
    /// Either a name string token (name/value stores) or a byte offset.
    pub var_store_info: u16,
    flags: QuestionFlags,
}

impl QuestionHeader {
    pub const SIZE: usize = StatementHeader::SIZE + 7;

    pub fn new(statement: StatementHeader, question_id: u16) -> Self {
        QuestionHeader {
            statement,
            question_id,
            ..Default::default()
        }
    }

    pub fn set_var_store_info(&mut self, var_store_id: u16, var_store_info: u16) {
        self.var_store_id = var_store_id;
        self.var_store_info = var_store_info;
    }

    pub fn flags(&self) -> QuestionFlags {
        self.flags
    }

    /// Validates and stores the question flags. On failure the stored flags
    /// are left as they were.
    pub fn set_flags(&mut self, opcode: OpCode, flags: u8) -> IfrResult<()> {
        self.flags = Self::check_flags(opcode, flags)?;
        Ok(())
    }

    pub(crate) fn check_flags(opcode: OpCode, flags: u8) -> IfrResult<QuestionFlags> {
        clear_recognized(opcode, flags, QuestionFlags::LEGACY_IGNORED)
    }

    pub(crate) fn commit_flags(&mut self, flags: QuestionFlags) {
        self.flags = flags;
    }

    pub fn encode<F: FnMut(&[u8])>(&self, f: &mut F) {
        self.statement.encode(f);
        f(&self.question_id.to_le_bytes());
        f(&self.var_store_id.to_le_bytes());
        f(&self.var_store_info.to_le_bytes());
        f(&[self.flags.bits()]);
    }
}

/// Encodes a NUL-terminated ASCII name as stored by `VARSTORE` records.
pub(crate) fn encode_ascii_name<F: FnMut(&[u8])>(name: &str, f: &mut F) {
    f(name.as_bytes());
    f(&[0]);
}
