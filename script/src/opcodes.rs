//! Opcode values understood by the deadpool interpreter.

pub const OP_0: u8 = 0x00;
pub const OP_PUSHDATA1: u8 = 0x4c;
pub const OP_PUSHDATA2: u8 = 0x4d;
pub const OP_PUSHDATA4: u8 = 0x4e;
pub const OP_1NEGATE: u8 = 0x4f;
pub const OP_1: u8 = 0x51;
pub const OP_TRUE: u8 = OP_1;
pub const OP_16: u8 = 0x60;
pub const OP_NOP: u8 = 0x61;
pub const OP_VERIFY: u8 = 0x69;
pub const OP_RETURN: u8 = 0x6a;
pub const OP_2DROP: u8 = 0x6d;
pub const OP_DROP: u8 = 0x75;
pub const OP_DUP: u8 = 0x76;
pub const OP_EQUAL: u8 = 0x87;
pub const OP_EQUALVERIFY: u8 = 0x88;
pub const OP_SHA256: u8 = 0xa8;
pub const OP_HASH256: u8 = 0xaa;

/// Verify a pending claim against a usable announcement.
pub const OP_ANNOUNCEVERIFY: u8 = 0xb8;
/// Verify that a supplied factor properly divides N.
pub const OP_CHECKDIVVERIFY: u8 = 0xb9;
/// Marks an announcement output. Never executable.
pub const OP_ANNOUNCE: u8 = 0xba;

/// Opcodes gated by the deadpool activation height.
pub fn is_deadpool_opcode(op: u8) -> bool {
    matches!(op, OP_ANNOUNCEVERIFY | OP_CHECKDIVVERIFY | OP_ANNOUNCE)
}
