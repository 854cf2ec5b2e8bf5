// src/lib.rs
//! Vector commitment with incremental proof trees and batched openings
//!
//! A state vector of `2^L` field elements is committed as `Σ v_i·h_i` over a
//! key basis. Because the commitment is linear, updates are homomorphic:
//! adding `δ` at index `i` moves the digest by `δ·h_i`, and the proof tree
//! only changes along the path of `i`.
//!
//! # Example
//!
//! ```
//! use ff::Field;
//! use statevec_vcs::{Fr, HomomorphicVcs, KeyMaterial, VectorCommitment};
//!
//! let keys = KeyMaterial::generate(16, 2, &[0u8; 32]).unwrap();
//! let mut vcs = HomomorphicVcs::new(keys, 4);
//!
//! let v = vec![Fr::ONE; 4];
//! let digest = vcs.commit(&v, 2).unwrap();
//! vcs.open_all(&v).unwrap();
//!
//! let proof = vcs.proof_path(1).unwrap();
//! assert!(vcs.verify(&digest, 1, &v[1], &proof));
//! ```

pub mod batch;
pub mod engine;
pub mod error;
pub mod field;
pub mod keys;
pub mod memo;
pub mod ser;
pub mod tree;

pub use batch::{prove_aggregate, verify_aggregate, AggregatedProof};
pub use engine::{Digest, HomomorphicVcs, VectorCommitment};
pub use error::{Result, VcsError};
pub use field::{fr_from_bytes, fr_from_i64, fr_to_bytes, fr_to_decimal, Fr, ELEMENT_SIZE};
pub use keys::{keygen, KeyMaterial, KEY_FILE, MAX_DEPTH};
pub use memo::MemoStats;
pub use ser::{load_vector, save_vector, VECTOR_FILE};
pub use tree::{build_proof_tree, OpeningProof, ProofTree};
