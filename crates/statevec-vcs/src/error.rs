//! error types for the commitment engine

use thiserror::Error;

pub type Result<T> = std::result::Result<T, VcsError>;

#[derive(Debug, Error)]
pub enum VcsError {
    #[error("index {index} out of range (vector has {size} entries)")]
    IndexOutOfRange { index: u64, size: u64 },

    #[error("vector length {got} does not match key size {expected}")]
    LengthMismatch { expected: usize, got: usize },

    #[error("depth {got} does not match key depth {expected}")]
    DepthMismatch { expected: u8, got: u8 },

    #[error("slice lengths differ: {indices} indices, {other} {what}")]
    BatchShape {
        indices: usize,
        other: usize,
        what: &'static str,
    },

    #[error("proof for index {index} has {got} siblings, expected {expected}")]
    ProofLength {
        index: u64,
        expected: usize,
        got: usize,
    },

    #[error("conflicting proofs for index {0}")]
    ConflictingProofs(u64),

    #[error("proof tree not opened")]
    NotOpened,

    #[error("not enough elements: requested {requested}, file holds {available}")]
    NotEnoughElements { requested: u64, available: u64 },

    #[error("invalid field element: {0}")]
    InvalidElement(String),

    #[error("invalid key material: {0}")]
    InvalidKeys(String),

    #[error("io error: {0}")]
    Io(#[from] std::io::Error),
}
