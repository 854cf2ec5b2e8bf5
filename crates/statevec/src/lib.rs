//! Statevec - batched account updates over a vector commitment
//!
//! Accounts are packed into field elements and committed as one vector.
//! Every epoch draws a batch of transactions, checks the batch against the
//! current commitment three ways, applies it homomorphically and checks again.
//!
//! # Architecture
//!
//! ```text
//! ┌──────────────┐   snapshot   ┌──────────────┐  batch   ┌──────────────────┐
//! │ StateVector  │ ───────────► │    txgen     │ ───────► │   consolidate    │
//! │ (2^L packed  │              │ (seeded K tx,│          │ (net delta per   │
//! │  accounts)   │ ◄─────────── │  audit log)  │          │  distinct index) │
//! └──────┬───────┘  net deltas  └──────────────┘          └────────┬─────────┘
//!        │                                                         │
//!        ▼                                                         ▼
//! ┌────────────────────────────────────────────────────────────────────────────┐
//! │ Orchestrator<V: VectorCommitment>                                          │
//! │   commit → open → verify (naive, memoized) → update → re-verify → aggregate│
//! └────────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! Verification mismatches are collected in each [`EpochReport`] instead of
//! aborting, so one run surfaces every divergence.

pub mod audit;
pub mod codec;
pub mod config;
pub mod consolidate;
pub mod error;
pub mod orchestrator;
pub mod state;
pub mod txgen;

pub use audit::AuditLog;
pub use codec::{account_delta, encode, extract_field, Account, AccountField};
pub use config::SimConfig;
pub use consolidate::{consolidate, Consolidation};
pub use error::{CodecError, ConsolidateError, OrchestratorError, Result};
pub use orchestrator::{Divergence, EpochPhase, EpochReport, Orchestrator};
pub use state::StateVector;
pub use txgen::{Transaction, TransactionBatch};
