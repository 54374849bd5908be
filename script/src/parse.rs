//! Instruction decoding.

use factorn_types::MAX_SCRIPT_ELEMENT_SIZE;

use crate::opcodes::{OP_0, OP_1, OP_16, OP_1NEGATE, OP_PUSHDATA1, OP_PUSHDATA2, OP_PUSHDATA4};
use crate::ScriptValidationError;

/// One decoded script instruction.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Instruction<'a> {
    /// A data push (including `OP_0`, which pushes nothing).
    Push(&'a [u8]),
    Op(u8),
}

impl Instruction<'_> {
    pub fn is_push(&self) -> bool {
        matches!(self, Instruction::Push(_))
    }

    /// The bytes this instruction leaves on the stack when it is a push.
    /// `OP_1NEGATE` and `OP_1`..`OP_16` count as pushes of their value.
    pub fn pushed_bytes(&self) -> Option<Vec<u8>> {
        match *self {
            Instruction::Push(data) => Some(data.to_vec()),
            Instruction::Op(OP_1NEGATE) => Some(vec![0x81]),
            Instruction::Op(op @ OP_1..=OP_16) => Some(vec![op - OP_1 + 1]),
            Instruction::Op(_) => None,
        }
    }
}

/// Iterator over the instructions of a script.
///
/// Yields an error for a truncated or oversized push and stops afterwards.
pub struct Instructions<'a> {
    bytes: &'a [u8],
    pos: usize,
    failed: bool,
}

pub fn instructions(bytes: &[u8]) -> Instructions<'_> {
    Instructions {
        bytes,
        pos: 0,
        failed: false,
    }
}

impl<'a> Instructions<'a> {
    fn take_push(&mut self, opcode: u8, width: usize) -> Result<&'a [u8], ScriptValidationError> {
        let len_end = self.pos + width;
        if len_end > self.bytes.len() {
            return Err(ScriptValidationError::BadOpcode(opcode));
        }
        let len = self.bytes[self.pos..len_end]
            .iter()
            .rev()
            .fold(0usize, |acc, &b| (acc << 8) | b as usize);
        self.pos = len_end;
        self.take(opcode, len)
    }

    fn take(&mut self, opcode: u8, len: usize) -> Result<&'a [u8], ScriptValidationError> {
        if len > MAX_SCRIPT_ELEMENT_SIZE {
            return Err(ScriptValidationError::PushSize(len));
        }
        let end = self
            .pos
            .checked_add(len)
            .filter(|end| *end <= self.bytes.len())
            .ok_or(ScriptValidationError::BadOpcode(opcode))?;
        let data = &self.bytes[self.pos..end];
        self.pos = end;
        Ok(data)
    }
}

impl<'a> Iterator for Instructions<'a> {
    type Item = Result<Instruction<'a>, ScriptValidationError>;

    fn next(&mut self) -> Option<Self::Item> {
        if self.failed || self.pos >= self.bytes.len() {
            return None;
        }
        let opcode = self.bytes[self.pos];
        self.pos += 1;
        let result = match opcode {
            OP_0 => Ok(Instruction::Push(&[])),
            0x01..=0x4b => self.take(opcode, opcode as usize).map(Instruction::Push),
            OP_PUSHDATA1 => self.take_push(opcode, 1).map(Instruction::Push),
            OP_PUSHDATA2 => self.take_push(opcode, 2).map(Instruction::Push),
            OP_PUSHDATA4 => self.take_push(opcode, 4).map(Instruction::Push),
            op => Ok(Instruction::Op(op)),
        };
        if result.is_err() {
            self.failed = true;
        }
        Some(result)
    }
}
