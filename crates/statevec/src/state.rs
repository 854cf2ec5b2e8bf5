//! Account state vector
//!
//! Fixed-length vector of `2^depth` packed accounts. Created once at genesis,
//! afterwards changed only by consolidated net deltas.

use rayon::prelude::*;
use statevec_vcs::{Fr, VcsError};

use crate::codec::{extract_field, Account, AccountField};
use crate::error::{OrchestratorError, Result};

/// Accounts filled per rayon task at genesis
const GENESIS_CHUNK: usize = 1024;

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct StateVector {
    depth: u8,
    accounts: Vec<Fr>,
}

impl StateVector {
    /// All `2^depth` accounts at the genesis record
    pub fn genesis(depth: u8) -> Self {
        let size = 1usize << depth;
        let record = Account::GENESIS.encode();

        let mut accounts = vec![Fr::default(); size];
        accounts
            .par_chunks_mut(GENESIS_CHUNK)
            .for_each(|chunk| chunk.iter_mut().for_each(|a| *a = record));

        Self { depth, accounts }
    }

    pub fn from_vec(depth: u8, accounts: Vec<Fr>) -> Result<Self> {
        let expected = 1usize << depth;
        if accounts.len() != expected {
            return Err(OrchestratorError::StateSize { depth, expected, got: accounts.len() });
        }
        Ok(Self { depth, accounts })
    }

    pub fn depth(&self) -> u8 {
        self.depth
    }

    pub fn len(&self) -> usize {
        self.accounts.len()
    }

    pub fn is_empty(&self) -> bool {
        self.accounts.is_empty()
    }

    pub fn as_slice(&self) -> &[Fr] {
        &self.accounts
    }

    pub fn get(&self, index: u64) -> Option<&Fr> {
        self.accounts.get(index as usize)
    }

    /// Add net deltas; indices outside the vector are rejected before anything changes
    pub fn apply<I>(&mut self, net_updates: I) -> Result<()>
    where
        I: IntoIterator<Item = (u64, Fr)>,
    {
        let updates: Vec<(u64, Fr)> = net_updates.into_iter().collect();
        let size = self.accounts.len() as u64;
        if let Some(&(index, _)) = updates.iter().find(|(i, _)| *i >= size) {
            return Err(VcsError::IndexOutOfRange { index, size }.into());
        }

        for (index, delta) in updates {
            self.accounts[index as usize] += delta;
        }
        Ok(())
    }

    /// Decoded accounts at debug level; fields that fail to decode are skipped
    pub fn log_snapshot(&self) {
        for (i, fe) in self.accounts.iter().enumerate() {
            let mut fields = Vec::with_capacity(3);
            for field in AccountField::ALL {
                match extract_field(fe, field.offset()) {
                    Ok(v) => fields.push(format!("{}={}", field.name(), v)),
                    Err(e) => {
                        tracing::warn!("account {}: {} not extracted: {}", i, field.name(), e)
                    }
                }
            }
            tracing::debug!("account {}: {}", i, fields.join(" "));
        }
    }
}
