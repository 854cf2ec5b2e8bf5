//! Per-account transaction history
//!
//! Append-only: one entry per generated transaction for every account, the raw
//! value delta for the touched account and 0 for the rest. Informational only.

use std::collections::BTreeMap;

#[derive(Clone, Debug, Default)]
pub struct AuditLog {
    entries: BTreeMap<u64, Vec<u64>>,
    steps: usize,
}

impl AuditLog {
    pub fn new() -> Self {
        Self::default()
    }

    /// Record one transaction step over `accounts` accounts
    pub fn record_step(&mut self, accounts: u64, touched: u64, value_delta: u64) {
        for account in 0..accounts {
            let entry = if account == touched { value_delta } else { 0 };
            self.entries.entry(account).or_default().push(entry);
        }
        self.steps += 1;
    }

    pub fn steps(&self) -> usize {
        self.steps
    }

    pub fn history(&self, account: u64) -> &[u64] {
        self.entries.get(&account).map_or(&[], |h| h.as_slice())
    }

    pub fn total_value_delta(&self, account: u64) -> u64 {
        self.history(account).iter().sum()
    }

    pub fn accounts(&self) -> impl Iterator<Item = (u64, &[u64])> + '_ {
        self.entries.iter().map(|(&a, h)| (a, h.as_slice()))
    }

    /// Dump the log at debug level
    pub fn log(&self) {
        for (account, history) in self.accounts() {
            tracing::debug!("account {}: {:?}", account, history);
        }
    }
}
