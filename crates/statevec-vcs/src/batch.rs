// src/batch.rs
//! Aggregated openings
//!
//! Collapses individual proofs into the minimal sibling set of a batched
//! opening: siblings that another queried path already recomputes are dropped.

use std::collections::BTreeMap;

use crate::error::{Result, VcsError};
use crate::field::{Fr, ELEMENT_SIZE};
use crate::tree::{leaf_term, OpeningProof};

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct AggregatedProof {
    /// Distinct indices covered, ascending
    pub queries: Vec<u64>,
    /// Remaining siblings, layer by layer from the leaves up
    pub siblings: Vec<Fr>,
}

impl AggregatedProof {
    pub fn size_of(&self) -> usize {
        self.queries.len() * 8 + self.siblings.len() * ELEMENT_SIZE
    }
}

/// Aggregate per-index proofs (indices may repeat, 0-based)
pub fn prove_aggregate(
    indices: &[u64],
    proofs: &[OpeningProof],
    depth: usize,
) -> Result<AggregatedProof> {
    if indices.len() != proofs.len() {
        return Err(VcsError::BatchShape {
            indices: indices.len(),
            other: proofs.len(),
            what: "proofs",
        });
    }

    let size = 1u64 << depth;
    let mut first_seen: BTreeMap<u64, usize> = BTreeMap::new();
    for (k, (&index, proof)) in indices.iter().zip(proofs).enumerate() {
        if index >= size {
            return Err(VcsError::IndexOutOfRange { index, size });
        }
        if proof.siblings.len() != depth {
            return Err(VcsError::ProofLength { index, expected: depth, got: proof.siblings.len() });
        }
        match first_seen.get(&index) {
            Some(&j) if proofs[j] != *proof => return Err(VcsError::ConflictingProofs(index)),
            Some(_) => {}
            None => {
                first_seen.insert(index, k);
            }
        }
    }

    let queries: Vec<u64> = first_seen.keys().copied().collect();
    let mut positions: Vec<usize> = queries.iter().map(|&q| q as usize).collect();
    let mut reps: Vec<usize> = first_seen.values().copied().collect();
    let mut siblings = Vec::new();

    for layer in 0..depth {
        ith_layer(layer, &mut positions, &mut reps, indices, proofs, &mut siblings)?;
    }

    Ok(AggregatedProof { queries, siblings })
}

/// Verify an aggregated proof against `root` for the given (index, value) pairs
pub fn verify_aggregate(
    proof: &AggregatedProof,
    root: &Fr,
    depth: usize,
    basis: &[Fr],
    indices: &[u64],
    values: &[Fr],
) -> bool {
    if indices.len() != values.len() || basis.len() != 1usize << depth {
        return false;
    }

    // every occurrence of an index must claim the same value
    let mut claimed: BTreeMap<u64, Fr> = BTreeMap::new();
    for (&index, value) in indices.iter().zip(values) {
        if let Some(prev) = claimed.insert(index, *value) {
            if prev != *value {
                return false;
            }
        }
    }

    if !claimed.keys().copied().eq(proof.queries.iter().copied()) {
        return false;
    }

    let mut layer = Vec::with_capacity(claimed.len());
    let mut positions = Vec::with_capacity(claimed.len());
    for (&index, value) in &claimed {
        let Some(h) = basis.get(index as usize) else {
            return false;
        };
        layer.push(leaf_term(value, h));
        positions.push(index as usize);
    }

    if layer.is_empty() {
        return false;
    }

    let mut cursor = 0;
    for _ in 0..depth {
        if !verify_ith_layer(&mut layer, &mut positions, &proof.siblings, &mut cursor) {
            return false;
        }
    }

    layer.len() == 1 && cursor == proof.siblings.len() && layer[0] == *root
}

fn ith_layer(
    layer: usize,
    positions: &mut Vec<usize>,
    reps: &mut Vec<usize>,
    indices: &[u64],
    proofs: &[OpeningProof],
    siblings: &mut Vec<Fr>,
) -> Result<()> {
    let cnt = positions.len();
    let mut next = 0;
    let mut i = 0;

    while i < cnt {
        let pos = positions[i];
        let rep = reps[i];

        if pos % 2 == 0 && i + 1 < cnt && positions[i + 1] == pos ^ 1 {
            // both children are queried; above this point the paths coincide
            let other = reps[i + 1];
            if proofs[rep].siblings[layer + 1..] != proofs[other].siblings[layer + 1..] {
                return Err(VcsError::ConflictingProofs(indices[other]));
            }
            i += 2;
        } else {
            siblings.push(proofs[rep].siblings[layer]);
            i += 1;
        }

        positions[next] = pos >> 1;
        reps[next] = rep;
        next += 1;
    }

    positions.truncate(next);
    reps.truncate(next);
    Ok(())
}

fn verify_ith_layer(
    layer: &mut Vec<Fr>,
    positions: &mut Vec<usize>,
    siblings: &[Fr],
    cursor: &mut usize,
) -> bool {
    let cnt = positions.len();
    let mut next = 0;
    let mut i = 0;

    while i < cnt {
        let pos = positions[i];
        let node = layer[i];

        let parent = if pos % 2 == 0 && i + 1 < cnt && positions[i + 1] == pos ^ 1 {
            let right = layer[i + 1];
            i += 2;
            node + right
        } else {
            let Some(sibling) = siblings.get(*cursor) else {
                return false;
            };
            *cursor += 1;
            i += 1;
            node + sibling
        };

        positions[next] = pos >> 1;
        layer[next] = parent;
        next += 1;
    }

    positions.truncate(next);
    layer.truncate(next);
    true
}
