//! Homomorphic proof tree
//!
//! ```text
//!              root = Σ v_i·h_i
//!             /                \
//!      v0·h0 + v1·h1     v2·h2 + v3·h3
//!        /      \          /      \
//!     v0·h0   v1·h1     v2·h2   v3·h3    ← leaf terms
//! ```
//!
//! Every internal node is the field sum of its children, so the root equals
//! the linear commitment and a change at one leaf only touches its path.

#[cfg(feature = "parallel")]
use rayon::prelude::*;

use crate::error::{Result, VcsError};
use crate::field::{Fr, ELEMENT_SIZE};

/// Sibling nodes from the leaf level up to (excluding) the root
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct OpeningProof {
    pub siblings: Vec<Fr>,
}

impl OpeningProof {
    pub fn size_of(&self) -> usize {
        self.siblings.len() * ELEMENT_SIZE
    }
}

#[derive(Clone, Debug)]
pub struct ProofTree {
    /// layers[0] holds the leaf terms, the last layer holds the root
    layers: Vec<Vec<Fr>>,
}

pub fn leaf_term(value: &Fr, basis: &Fr) -> Fr {
    *value * basis
}

/// Recompute the root implied by a leaf term and its siblings
pub fn fold_path(leaf: Fr, siblings: &[Fr]) -> Fr {
    siblings.iter().fold(leaf, |acc, s| acc + s)
}

/// Σ v_i·h_i
pub fn linear_commit(values: &[Fr], basis: &[Fr]) -> Fr {
    #[cfg(feature = "parallel")]
    {
        if values.len() >= 128 {
            return values
                .par_iter()
                .zip(basis.par_iter())
                .map(|(v, h)| leaf_term(v, h))
                .sum();
        }
    }

    values.iter().zip(basis).map(|(v, h)| leaf_term(v, h)).sum()
}

pub fn build_proof_tree(values: &[Fr], basis: &[Fr]) -> Result<ProofTree> {
    if values.len() != basis.len() {
        return Err(VcsError::LengthMismatch { expected: basis.len(), got: values.len() });
    }
    if !values.len().is_power_of_two() {
        return Err(VcsError::InvalidElement(format!(
            "vector length {} is not a power of two",
            values.len()
        )));
    }

    let mut current_layer: Vec<Fr> = {
        #[cfg(feature = "parallel")]
        {
            if values.len() >= 128 {
                values.par_iter().zip(basis.par_iter()).map(|(v, h)| leaf_term(v, h)).collect()
            } else {
                values.iter().zip(basis).map(|(v, h)| leaf_term(v, h)).collect()
            }
        }
        #[cfg(not(feature = "parallel"))]
        {
            values.iter().zip(basis).map(|(v, h)| leaf_term(v, h)).collect()
        }
    };

    let mut layers = vec![current_layer.clone()];

    while current_layer.len() > 1 {
        let next_layer: Vec<Fr> = current_layer
            .chunks_exact(2)
            .map(|pair| pair[0] + pair[1])
            .collect();

        layers.push(next_layer.clone());
        current_layer = next_layer;
    }

    Ok(ProofTree { layers })
}

impl ProofTree {
    pub fn root(&self) -> Fr {
        self.layers.last().and_then(|layer| layer.first()).copied().unwrap_or_default()
    }

    pub fn depth(&self) -> usize {
        self.layers.len().saturating_sub(1)
    }

    pub fn size(&self) -> u64 {
        self.layers.first().map_or(0, |leaves| leaves.len() as u64)
    }

    fn check_index(&self, index: u64) -> Result<usize> {
        if index >= self.size() {
            return Err(VcsError::IndexOutOfRange { index, size: self.size() });
        }
        Ok(index as usize)
    }

    pub fn path(&self, index: u64) -> Result<OpeningProof> {
        let mut pos = self.check_index(index)?;

        let mut siblings = Vec::with_capacity(self.depth());
        for layer in &self.layers[..self.depth()] {
            siblings.push(layer[pos ^ 1]);
            pos >>= 1;
        }

        Ok(OpeningProof { siblings })
    }

    /// Add `term` to the leaf at `index` and every ancestor
    pub fn add_at(&mut self, index: u64, term: Fr) -> Result<()> {
        let mut pos = self.check_index(index)?;

        for layer in self.layers.iter_mut() {
            layer[pos] += term;
            pos >>= 1;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use ff::Field;
    use rand::thread_rng;

    fn random_vec(n: usize) -> Vec<Fr> {
        let mut rng = thread_rng();
        (0..n).map(|_| Fr::random(&mut rng)).collect()
    }

    #[test]
    fn test_root_is_linear_commitment() {
        let values = random_vec(16);
        let basis = random_vec(16);
        let tree = build_proof_tree(&values, &basis).unwrap();

        assert_eq!(tree.depth(), 4);
        assert_eq!(tree.root(), linear_commit(&values, &basis));
    }

    #[test]
    fn test_single_leaf() {
        let tree = build_proof_tree(&[Fr::from(5u64)], &[Fr::from(3u64)]).unwrap();
        assert_eq!(tree.depth(), 0);
        assert_eq!(tree.root(), Fr::from(15u64));
        assert!(tree.path(0).unwrap().siblings.is_empty());
    }

    #[test]
    fn test_paths_fold_to_root() {
        let values = random_vec(8);
        let basis = random_vec(8);
        let tree = build_proof_tree(&values, &basis).unwrap();

        for i in 0..8 {
            let proof = tree.path(i as u64).unwrap();
            assert_eq!(proof.siblings.len(), 3);
            assert_eq!(fold_path(leaf_term(&values[i], &basis[i]), &proof.siblings), tree.root());
        }
        assert!(tree.path(8).is_err());
    }

    #[test]
    fn test_add_at_matches_rebuild() {
        let mut values = random_vec(8);
        let basis = random_vec(8);
        let mut tree = build_proof_tree(&values, &basis).unwrap();

        let delta = Fr::from(41u64);
        tree.add_at(5, delta * basis[5]).unwrap();
        values[5] += delta;

        let rebuilt = build_proof_tree(&values, &basis).unwrap();
        assert_eq!(tree.root(), rebuilt.root());
        for i in 0..8 {
            assert_eq!(tree.path(i).unwrap(), rebuilt.path(i).unwrap());
        }
    }

    #[test]
    fn test_rejects_bad_shapes() {
        assert!(build_proof_tree(&random_vec(6), &random_vec(6)).is_err());
        assert!(build_proof_tree(&random_vec(4), &random_vec(8)).is_err());
    }
}
