//! Script layer of the FactorN deadpool.
//!
//! - [`opcodes`]: opcode values, including the two deadpool primitives
//! - [`parse`] / [`builder`]: instruction decoding and script assembly
//! - [`template`]: entry, announce and claim script shapes
//! - [`interpreter`]: evaluation of a spending input against its locking script
//! - [`tx_builder`]: unfunded entry/announce templates and claim transactions

pub mod builder;
pub mod error;
pub mod interpreter;
pub mod opcodes;
pub mod parse;
pub mod stack;
pub mod template;
pub mod tx_builder;

pub use builder::ScriptBuilder;
pub use error::{BuildError, ScriptValidationError};
pub use interpreter::{verify_input, EvalOutcome, ExecContext};
pub use parse::{instructions, Instruction};
pub use stack::Stack;
pub use template::{
    announce_script, claim_script_sig, entry_script, parse_claim_script_sig, uses_deadpool_opcodes,
    ClaimWitness, DeadpoolScript,
};
pub use tx_builder::{
    build_announce_template, build_claim_transaction, build_entry_template, ClaimInput,
    DEFAULT_CLAIM_FEE_RATE,
};
