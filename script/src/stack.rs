//! Evaluation stack.

use factorn_types::MAX_SCRIPT_ELEMENT_SIZE;

use crate::ScriptValidationError;

pub const MAX_STACK_SIZE: usize = 1000;

#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct Stack {
    items: Vec<Vec<u8>>,
}

impl Stack {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&mut self, data: Vec<u8>) -> Result<(), ScriptValidationError> {
        if data.len() > MAX_SCRIPT_ELEMENT_SIZE {
            return Err(ScriptValidationError::PushSize(data.len()));
        }
        if self.items.len() >= MAX_STACK_SIZE {
            return Err(ScriptValidationError::StackSize);
        }
        self.items.push(data);
        Ok(())
    }

    pub fn push_bool(&mut self, value: bool) -> Result<(), ScriptValidationError> {
        self.push(if value { vec![1] } else { Vec::new() })
    }

    pub fn pop(&mut self) -> Result<Vec<u8>, ScriptValidationError> {
        self.items.pop().ok_or(ScriptValidationError::StackUnderflow)
    }

    /// Element `depth` positions below the top (0 is the top).
    pub fn peek(&self, depth: usize) -> Result<&[u8], ScriptValidationError> {
        self.items
            .len()
            .checked_sub(depth + 1)
            .map(|i| self.items[i].as_slice())
            .ok_or(ScriptValidationError::StackUnderflow)
    }

    pub fn len(&self) -> usize {
        self.items.len()
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }
}

/// Script truthiness: any non-zero byte, except a lone sign bit in the last byte.
pub fn cast_to_bool(data: &[u8]) -> bool {
    for (i, &b) in data.iter().enumerate() {
        if b != 0 {
            return !(i == data.len() - 1 && b == 0x80);
        }
    }
    false
}
