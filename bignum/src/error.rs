use thiserror::Error;

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum BignumError {
    #[error("integer is not minimally encoded")]
    MalformedInteger,

    #[error("integer is empty")]
    Empty,

    #[error("integer has {bits} bits, minimum is {min}")]
    TooSmall { bits: u64, min: u64 },

    #[error("integer has {bits} bits, maximum is {max}")]
    TooLarge { bits: u64, max: u64 },

    #[error("invalid decimal integer: {0:?}")]
    InvalidDecimal(String),
}
