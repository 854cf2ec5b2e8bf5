//! error types for the state pipeline

use std::num::ParseIntError;

use statevec_vcs::VcsError;
use thiserror::Error;

pub type Result<T> = std::result::Result<T, OrchestratorError>;

#[derive(Debug, Error)]
pub enum CodecError {
    #[error("{field} value {value} does not fit in 21 bits")]
    FieldOverflow { field: &'static str, value: u64 },

    #[error("element {decimal} is not a 64-bit word: {source}")]
    NotAWord {
        decimal: String,
        #[source]
        source: ParseIntError,
    },
}

#[derive(Debug, Error)]
pub enum ConsolidateError {
    #[error("batch shape mismatch: {indices} indices, {deltas} deltas, {values} values")]
    Shape {
        indices: usize,
        deltas: usize,
        values: usize,
    },

    #[error("index {0} appears with different snapshot values")]
    InconsistentSnapshot(u64),
}

#[derive(Debug, Error)]
pub enum OrchestratorError {
    #[error("commitment engine: {0}")]
    Engine(#[from] VcsError),

    #[error("codec: {0}")]
    Codec(#[from] CodecError),

    #[error("consolidation: {0}")]
    Consolidate(#[from] ConsolidateError),

    #[error("batch size must be positive")]
    EmptyBatch,

    #[error("state vector has {got} accounts, depth {depth} needs {expected}")]
    StateSize { depth: u8, expected: usize, got: usize },
}
