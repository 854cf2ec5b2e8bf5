//! Vector commitment capability and its software engine

use std::collections::{BTreeMap, BTreeSet};
use std::fmt;
use std::path::Path;

use ff::Field;

use crate::batch::{prove_aggregate, verify_aggregate, AggregatedProof};
use crate::error::{Result, VcsError};
use crate::field::{fr_to_bytes, Fr};
use crate::keys::KeyMaterial;
use crate::memo::{verify_memoized, MemoStats};
use crate::tree::{build_proof_tree, fold_path, leaf_term, linear_commit, OpeningProof, ProofTree};

/// Commitment to a whole state vector
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct Digest(pub Fr);

impl fmt::Display for Digest {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        // most significant bytes first, truncated for logs
        let mut bytes = fr_to_bytes(&self.0);
        bytes.reverse();
        write!(f, "{}", &hex::encode(bytes)[..16])
    }
}

/// Operations a vector commitment scheme offers to the state pipeline
///
/// Engines are deterministic: every call either succeeds or reports an error,
/// and verification answers are plain booleans.
pub trait VectorCommitment {
    type Proof: Clone + fmt::Debug;
    type AggregatedProof: fmt::Debug;

    /// Tree depth the keys were loaded for
    fn depth(&self) -> u8;

    /// Pure function of the vector contents
    fn commit(&self, vector: &[Fr], depth: u8) -> Result<Digest>;

    /// Precompute proof state for every index under the commitment to `vector`
    fn open_all(&mut self, vector: &[Fr]) -> Result<()>;

    /// Current proof for one index
    fn proof_path(&self, index: u64) -> Result<Self::Proof>;

    fn verify(&self, digest: &Digest, index: u64, value: &Fr, proof: &Self::Proof) -> bool;

    /// Must equal the AND of [`VectorCommitment::verify`] over the batch
    fn verify_memoized(
        &self,
        digest: &Digest,
        indices: &[u64],
        values: &[Fr],
        proofs: &[Self::Proof],
    ) -> (bool, MemoStats);

    /// Advance the proof state of one index by `delta`
    fn update_proof_tree(&mut self, index: u64, delta: &Fr) -> Result<()>;

    /// Advance several indices at once; returns the number of distinct tree nodes touched
    fn update_proof_tree_bulk(&mut self, indices: &[u64], deltas: &[Fr]) -> Result<usize>;

    /// Homomorphic update: equals committing to the vector with all deltas applied
    fn update_com_vec(&self, digest: &Digest, indices: &[u64], deltas: &[Fr]) -> Result<Digest>;

    fn agg_prove(&self, indices: &[u64], proofs: &[Self::Proof]) -> Result<Self::AggregatedProof>;

    fn agg_verify(
        &self,
        proof: &Self::AggregatedProof,
        digest: &Digest,
        indices: &[u64],
        values: &[Fr],
    ) -> bool;
}

/// Homomorphic sum-tree commitment over a key basis
///
/// `Commit(v) = Σ v_i·h_i`; proofs are sibling paths in a tree whose nodes are
/// sums of their children. Not hiding and not binding against an adversary
/// choosing proofs freely; it exists to exercise the state pipeline end to end.
#[derive(Clone, Debug)]
pub struct HomomorphicVcs {
    keys: KeyMaterial,
    tree: Option<ProofTree>,
    batch_hint: usize,
}

impl HomomorphicVcs {
    pub fn new(keys: KeyMaterial, batch_hint: usize) -> Self {
        Self { keys, tree: None, batch_hint }
    }

    /// Load keys from `key_dir`; missing or corrupt key material is an error
    pub fn key_gen_load(
        security_param: u32,
        depth: u8,
        key_dir: &Path,
        batch_hint: usize,
    ) -> Result<Self> {
        let keys = KeyMaterial::load(security_param, depth, key_dir)?;
        tracing::info!(
            "loaded keys: depth {}, {} positions, batch hint {}",
            depth,
            keys.size(),
            batch_hint
        );
        Ok(Self::new(keys, batch_hint))
    }

    pub fn keys(&self) -> &KeyMaterial {
        &self.keys
    }

    pub fn batch_hint(&self) -> usize {
        self.batch_hint
    }

    /// Root of the opened proof tree, if any
    pub fn tree_root(&self) -> Option<Digest> {
        self.tree.as_ref().map(|t| Digest(t.root()))
    }

    fn tree_mut(&mut self) -> Result<&mut ProofTree> {
        self.tree.as_mut().ok_or(VcsError::NotOpened)
    }

    fn check_vector(&self, vector: &[Fr]) -> Result<()> {
        let expected = self.keys.size() as usize;
        if vector.len() != expected {
            return Err(VcsError::LengthMismatch { expected, got: vector.len() });
        }
        Ok(())
    }

    fn check_deltas(indices: &[u64], deltas: &[Fr]) -> Result<()> {
        if indices.len() != deltas.len() {
            return Err(VcsError::BatchShape {
                indices: indices.len(),
                other: deltas.len(),
                what: "deltas",
            });
        }
        Ok(())
    }
}

impl VectorCommitment for HomomorphicVcs {
    type Proof = OpeningProof;
    type AggregatedProof = AggregatedProof;

    fn depth(&self) -> u8 {
        self.keys.depth()
    }

    fn commit(&self, vector: &[Fr], depth: u8) -> Result<Digest> {
        if depth != self.keys.depth() {
            return Err(VcsError::DepthMismatch { expected: self.keys.depth(), got: depth });
        }
        self.check_vector(vector)?;
        Ok(Digest(linear_commit(vector, self.keys.basis())))
    }

    fn open_all(&mut self, vector: &[Fr]) -> Result<()> {
        self.check_vector(vector)?;
        let tree = build_proof_tree(vector, self.keys.basis())?;
        tracing::debug!("opened proof tree over {} positions", tree.size());
        self.tree = Some(tree);
        Ok(())
    }

    fn proof_path(&self, index: u64) -> Result<OpeningProof> {
        self.tree.as_ref().ok_or(VcsError::NotOpened)?.path(index)
    }

    fn verify(&self, digest: &Digest, index: u64, value: &Fr, proof: &OpeningProof) -> bool {
        let Ok(h) = self.keys.get(index) else {
            return false;
        };
        if proof.siblings.len() != self.keys.depth() as usize {
            return false;
        }
        fold_path(leaf_term(value, &h), &proof.siblings) == digest.0
    }

    fn verify_memoized(
        &self,
        digest: &Digest,
        indices: &[u64],
        values: &[Fr],
        proofs: &[OpeningProof],
    ) -> (bool, MemoStats) {
        verify_memoized(
            &digest.0,
            self.keys.depth() as usize,
            self.keys.basis(),
            indices,
            values,
            proofs,
        )
    }

    fn update_proof_tree(&mut self, index: u64, delta: &Fr) -> Result<()> {
        let h = self.keys.get(index)?;
        self.tree_mut()?.add_at(index, leaf_term(delta, &h))
    }

    fn update_proof_tree_bulk(&mut self, indices: &[u64], deltas: &[Fr]) -> Result<usize> {
        Self::check_deltas(indices, deltas)?;

        let mut net: BTreeMap<u64, Fr> = BTreeMap::new();
        for (&index, delta) in indices.iter().zip(deltas) {
            *net.entry(index).or_insert(Fr::ZERO) += delta;
        }

        let depth = self.keys.depth() as usize;
        let mut touched = BTreeSet::new();
        for (index, delta) in net {
            if bool::from(delta.is_zero()) {
                continue;
            }
            self.update_proof_tree(index, &delta)?;
            for level in 0..=depth {
                touched.insert((level, index >> level));
            }
        }

        Ok(touched.len())
    }

    fn update_com_vec(&self, digest: &Digest, indices: &[u64], deltas: &[Fr]) -> Result<Digest> {
        Self::check_deltas(indices, deltas)?;

        let mut acc = digest.0;
        for (&index, delta) in indices.iter().zip(deltas) {
            acc += leaf_term(delta, &self.keys.get(index)?);
        }
        Ok(Digest(acc))
    }

    fn agg_prove(&self, indices: &[u64], proofs: &[OpeningProof]) -> Result<AggregatedProof> {
        prove_aggregate(indices, proofs, self.keys.depth() as usize)
    }

    fn agg_verify(
        &self,
        proof: &AggregatedProof,
        digest: &Digest,
        indices: &[u64],
        values: &[Fr],
    ) -> bool {
        verify_aggregate(
            proof,
            &digest.0,
            self.keys.depth() as usize,
            self.keys.basis(),
            indices,
            values,
        )
    }
}
