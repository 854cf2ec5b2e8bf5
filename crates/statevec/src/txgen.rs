//! Pseudo-transaction generator
//!
//! Draws a deterministic batch from one state snapshot. Indices may repeat and
//! every transaction records the snapshot value, never a value produced by an
//! earlier transaction of the same batch.

use rand::{Rng, SeedableRng};
use rand_chacha::ChaCha8Rng;
use statevec_vcs::Fr;

use crate::audit::AuditLog;
use crate::codec::account_delta;
use crate::error::CodecError;

/// Value deltas are drawn from `[0, MAX_VALUE_DELTA)`
pub const MAX_VALUE_DELTA: u64 = 1000;

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Transaction {
    pub index: u64,
    /// Packed delta: nonce += 1, value += `value_delta`, address unchanged
    pub delta: Fr,
    pub value_delta: u64,
    /// Account value in the snapshot the batch was drawn from
    pub value_at_generation: Fr,
}

#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct TransactionBatch {
    txs: Vec<Transaction>,
}

impl TransactionBatch {
    pub fn new(txs: Vec<Transaction>) -> Self {
        Self { txs }
    }

    pub fn len(&self) -> usize {
        self.txs.len()
    }

    pub fn is_empty(&self) -> bool {
        self.txs.is_empty()
    }

    pub fn transactions(&self) -> &[Transaction] {
        &self.txs
    }

    pub fn indices(&self) -> Vec<u64> {
        self.txs.iter().map(|tx| tx.index).collect()
    }

    pub fn deltas(&self) -> Vec<Fr> {
        self.txs.iter().map(|tx| tx.delta).collect()
    }

    pub fn snapshot_values(&self) -> Vec<Fr> {
        self.txs.iter().map(|tx| tx.value_at_generation).collect()
    }
}

/// Generate `batch_size` transactions against `snapshot`
pub fn generate(
    snapshot: &[Fr],
    batch_size: usize,
    seed: u64,
    audit: &mut AuditLog,
) -> Result<TransactionBatch, CodecError> {
    let mut rng = ChaCha8Rng::seed_from_u64(seed);
    let accounts = snapshot.len() as u64;

    if accounts == 0 {
        return Ok(TransactionBatch::default());
    }

    let txs = (0..batch_size)
        .map(|_| {
            let index = rng.gen_range(0..accounts);
            let value_delta = rng.gen_range(0..MAX_VALUE_DELTA);
            audit.record_step(accounts, index, value_delta);

            Ok(Transaction {
                index,
                delta: account_delta(0, 1, value_delta)?,
                value_delta,
                value_at_generation: snapshot[index as usize],
            })
        })
        .collect::<Result<Vec<_>, CodecError>>()?;

    Ok(TransactionBatch { txs })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::codec::{extract_field, Account, NONCE_OFFSET, VALUE_OFFSET};

    fn genesis(n: usize) -> Vec<Fr> {
        vec![Account::GENESIS.encode(); n]
    }

    #[test]
    fn test_deterministic_for_seed() {
        let snapshot = genesis(16);
        let a = generate(&snapshot, 8, 42, &mut AuditLog::new()).unwrap();
        let b = generate(&snapshot, 8, 42, &mut AuditLog::new()).unwrap();
        let c = generate(&snapshot, 8, 43, &mut AuditLog::new()).unwrap();

        assert_eq!(a, b);
        assert_ne!(a, c);
    }

    #[test]
    fn test_delta_layout() {
        let batch = generate(&genesis(4), 32, 7, &mut AuditLog::new()).unwrap();
        for tx in batch.transactions() {
            assert!(tx.index < 4);
            assert!(tx.value_delta < MAX_VALUE_DELTA);
            assert_eq!(extract_field(&tx.delta, NONCE_OFFSET).unwrap(), 1);
            assert_eq!(extract_field(&tx.delta, VALUE_OFFSET).unwrap(), tx.value_delta);
        }
    }

    #[test]
    fn test_snapshot_values_from_pre_batch_state() {
        let snapshot: Vec<Fr> = (0..4u64).map(|i| Fr::from(i * 2)).collect();
        // 32 draws over 4 accounts guarantees repeats
        let batch = generate(&snapshot, 32, 1, &mut AuditLog::new()).unwrap();
        for tx in batch.transactions() {
            assert_eq!(tx.value_at_generation, snapshot[tx.index as usize]);
        }
    }

    #[test]
    fn test_audit_log_filled() {
        let mut audit = AuditLog::new();
        let batch = generate(&genesis(4), 5, 42, &mut audit).unwrap();

        assert_eq!(audit.steps(), 5);
        for account in 0..4 {
            let expected: Vec<u64> = batch
                .transactions()
                .iter()
                .map(|tx| if tx.index == account { tx.value_delta } else { 0 })
                .collect();
            assert_eq!(audit.history(account), expected.as_slice());
        }
    }

    #[test]
    fn test_empty_snapshot() {
        assert!(generate(&[], 4, 42, &mut AuditLog::new()).unwrap().is_empty());
    }
}
