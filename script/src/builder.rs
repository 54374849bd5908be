//! Script assembly.

use factorn_types::Script;

use crate::opcodes::{OP_0, OP_PUSHDATA1, OP_PUSHDATA2};

/// Appends opcodes and data pushes to a script.
///
/// Data is pushed with the smallest direct-push form for its length. Unlike a
/// general-purpose builder it never rewrites single-byte values into
/// small-integer opcodes, so the bytes pushed are exactly the bytes given.
#[derive(Clone, Debug, Default)]
pub struct ScriptBuilder {
    bytes: Vec<u8>,
}

impl ScriptBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push_opcode(mut self, op: u8) -> Self {
        self.bytes.push(op);
        self
    }

    pub fn push_slice(mut self, data: &[u8]) -> Self {
        match data.len() {
            0 => self.bytes.push(OP_0),
            len @ 1..=0x4b => self.bytes.push(len as u8),
            len @ 0x4c..=0xff => {
                self.bytes.push(OP_PUSHDATA1);
                self.bytes.push(len as u8);
            }
            len => {
                self.bytes.push(OP_PUSHDATA2);
                self.bytes.extend_from_slice(&(len as u16).to_le_bytes());
            }
        }
        self.bytes.extend_from_slice(data);
        self
    }

    pub fn into_script(self) -> Script {
        Script::new(self.bytes)
    }
}
