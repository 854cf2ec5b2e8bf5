//! Delta consolidation
//!
//! A batch may touch the same account several times. The engine applies the
//! summed delta of an index once, so post-batch values are computed the same
//! way: seed each distinct index with its snapshot value, add the net delta,
//! and hand every transaction on that index the same result.

use std::collections::BTreeMap;

use ff::Field;
use statevec_vcs::Fr;

use crate::error::ConsolidateError;

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Consolidation {
    /// Post-batch value for every transaction, in batch order
    pub new_values: Vec<Fr>,
    /// Summed delta per distinct index, zero sums included
    pub net_deltas: BTreeMap<u64, Fr>,
}

impl Consolidation {
    /// Net updates that actually change a value
    pub fn net_updates(&self) -> impl Iterator<Item = (u64, Fr)> + '_ {
        self.net_deltas
            .iter()
            .filter(|(_, d)| !bool::from(d.is_zero()))
            .map(|(&i, &d)| (i, d))
    }

    pub fn distinct_indices(&self) -> usize {
        self.net_deltas.len()
    }
}

/// Collapse duplicate-index deltas and compute post-batch values
///
/// `values[k]` is the pre-batch snapshot value at `indices[k]`; every
/// occurrence of an index must carry the same snapshot.
pub fn consolidate(
    indices: &[u64],
    deltas: &[Fr],
    values: &[Fr],
) -> Result<Consolidation, ConsolidateError> {
    if indices.len() != deltas.len() || indices.len() != values.len() {
        return Err(ConsolidateError::Shape {
            indices: indices.len(),
            deltas: deltas.len(),
            values: values.len(),
        });
    }

    let mut value_map: BTreeMap<u64, Fr> = BTreeMap::new();
    let mut net_deltas: BTreeMap<u64, Fr> = BTreeMap::new();

    for ((&index, delta), value) in indices.iter().zip(deltas).zip(values) {
        match value_map.get(&index) {
            Some(seen) if seen != value => {
                return Err(ConsolidateError::InconsistentSnapshot(index));
            }
            Some(_) => {}
            None => {
                value_map.insert(index, *value);
            }
        }
        *net_deltas.entry(index).or_insert(Fr::ZERO) += delta;
    }

    for (index, net) in &net_deltas {
        if bool::from(net.is_zero()) {
            continue;
        }
        if let Some(v) = value_map.get_mut(index) {
            *v += net;
        }
    }

    let new_values = indices
        .iter()
        .map(|i| value_map.get(i).copied().unwrap_or(Fr::ZERO))
        .collect();

    Ok(Consolidation { new_values, net_deltas })
}
