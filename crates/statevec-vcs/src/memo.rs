//! Memoized batch verification
//!
//! Nodes recomputed on an accepted path are cached together with the proof
//! that produced them. A later path reaching a cached node with the same value
//! and the same siblings above it is accepted by comparison alone.

use std::collections::HashMap;

use crate::field::Fr;
use crate::tree::{leaf_term, OpeningProof};

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct MemoStats {
    /// Entries that verified
    pub verified: usize,
    /// Paths cut short by a cached node
    pub memo_hits: usize,
    /// Field multiplications and additions performed
    pub field_ops: usize,
}

struct Cached {
    node: Fr,
    /// Position of the proof that produced the node
    proof: usize,
}

/// Batch verification whose result equals the AND of per-entry verification
pub fn verify_memoized(
    root: &Fr,
    depth: usize,
    basis: &[Fr],
    indices: &[u64],
    values: &[Fr],
    proofs: &[OpeningProof],
) -> (bool, MemoStats) {
    let mut stats = MemoStats::default();

    if indices.len() != values.len() || indices.len() != proofs.len() {
        return (false, stats);
    }

    let mut memo: HashMap<(usize, usize), Cached> =
        HashMap::with_capacity(indices.len() * (depth + 1));
    let mut all_ok = true;

    for (k, (&index, value)) in indices.iter().zip(values).enumerate() {
        let proof = &proofs[k];
        let Some(h) = basis.get(index as usize) else {
            all_ok = false;
            continue;
        };
        if proof.siblings.len() != depth {
            all_ok = false;
            continue;
        }

        let mut acc = leaf_term(value, h);
        stats.field_ops += 1;

        let mut pos = index as usize;
        let mut path = Vec::with_capacity(depth);
        let mut outcome = None;

        for level in 0..depth {
            if let Some(cached) = memo.get(&(level, pos)) {
                let suffix_matches =
                    proofs[cached.proof].siblings[level..] == proof.siblings[level..];
                if suffix_matches {
                    // same siblings from here up: the verdict follows from the node alone
                    if cached.node == acc {
                        stats.memo_hits += 1;
                    }
                    outcome = Some(cached.node == acc);
                    break;
                }
            }

            path.push((level, pos, acc));
            acc += proof.siblings[level];
            stats.field_ops += 1;
            pos >>= 1;
        }

        let ok = outcome.unwrap_or(acc == *root);
        if ok {
            stats.verified += 1;
            for (level, pos, node) in path {
                memo.entry((level, pos)).or_insert(Cached { node, proof: k });
            }
        } else {
            all_ok = false;
        }
    }

    (all_ok, stats)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::tree::{build_proof_tree, fold_path};
    use ff::Field;
    use proptest::prelude::*;
    use rand::{rngs::StdRng, Rng, SeedableRng};

    fn naive(root: &Fr, basis: &[Fr], index: u64, value: &Fr, proof: &OpeningProof) -> bool {
        fold_path(leaf_term(value, &basis[index as usize]), &proof.siblings) == *root
    }

    #[test]
    fn test_memo_hits_on_shared_paths() {
        let mut rng = StdRng::seed_from_u64(9);
        let values: Vec<Fr> = (0..8).map(|_| Fr::random(&mut rng)).collect();
        let basis: Vec<Fr> = (0..8).map(|_| Fr::random(&mut rng)).collect();
        let tree = build_proof_tree(&values, &basis).unwrap();

        let indices = vec![3, 3, 3];
        let proofs: Vec<_> = indices.iter().map(|&i| tree.path(i).unwrap()).collect();
        let vals: Vec<Fr> = indices.iter().map(|&i| values[i as usize]).collect();

        let (ok, stats) = verify_memoized(&tree.root(), 3, &basis, &indices, &vals, &proofs);
        assert!(ok);
        assert_eq!(stats.verified, 3);
        assert_eq!(stats.memo_hits, 2);
    }

    #[test]
    fn test_stale_value_rejected_through_memo() {
        let mut rng = StdRng::seed_from_u64(10);
        let values: Vec<Fr> = (0..4).map(|_| Fr::random(&mut rng)).collect();
        let basis: Vec<Fr> = (0..4).map(|_| Fr::random(&mut rng)).collect();
        let tree = build_proof_tree(&values, &basis).unwrap();

        let proofs = vec![tree.path(1).unwrap(), tree.path(1).unwrap()];
        let vals = vec![values[1], values[1] + Fr::ONE];

        let (ok, stats) = verify_memoized(&tree.root(), 2, &basis, &[1, 1], &vals, &proofs);
        assert!(!ok);
        assert_eq!(stats.verified, 1);
    }

    #[test]
    fn test_shape_mismatch() {
        let basis = vec![Fr::ONE; 2];
        let (ok, _) = verify_memoized(&Fr::ZERO, 1, &basis, &[0], &[], &[]);
        assert!(!ok);
    }

    proptest! {
        #[test]
        fn prop_memoized_equals_and_of_naive(
            seed in any::<u64>(),
            picks in prop::collection::vec((0u64..16, any::<bool>(), 0usize..4), 1..24),
        ) {
            let mut rng = StdRng::seed_from_u64(seed);
            let values: Vec<Fr> = (0..16).map(|_| Fr::random(&mut rng)).collect();
            let basis: Vec<Fr> = (0..16).map(|_| Fr::random(&mut rng)).collect();
            let tree = build_proof_tree(&values, &basis).unwrap();
            let root = tree.root();

            let mut indices = Vec::new();
            let mut vals = Vec::new();
            let mut proofs = Vec::new();
            for (index, tamper, level) in picks {
                let mut proof = tree.path(index).unwrap();
                let mut value = values[index as usize];
                if tamper {
                    // corrupt either the value or one sibling
                    if rng.gen::<bool>() {
                        value += Fr::ONE;
                    } else {
                        proof.siblings[level] += Fr::ONE;
                    }
                }
                indices.push(index);
                vals.push(value);
                proofs.push(proof);
            }

            let expected = indices
                .iter()
                .zip(&vals)
                .zip(&proofs)
                .all(|((&i, v), p)| naive(&root, &basis, i, v, p));

            let (ok, _) = verify_memoized(&root, 4, &basis, &indices, &vals, &proofs);
            prop_assert_eq!(ok, expected);
        }
    }
}
