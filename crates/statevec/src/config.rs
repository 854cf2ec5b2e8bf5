//! Simulation settings

use std::path::{Path, PathBuf};

use statevec_vcs::{KEY_FILE, VECTOR_FILE};

/// Parameters of one simulation run
#[derive(Clone, Debug)]
pub struct SimConfig {
    /// Tree depth; the state holds `2^depth` accounts
    pub depth: u8,
    /// Transactions per epoch
    pub batch_size: usize,
    pub epochs: u64,
    /// Generator seed for epoch 0; epoch `e` uses `seed + e`
    pub seed: u64,
    pub security_param: u32,
    pub key_dir: PathBuf,
    pub vector_dir: PathBuf,
}

impl Default for SimConfig {
    fn default() -> Self {
        Self {
            depth: 2,
            batch_size: 4,
            epochs: 3,
            seed: 42,
            security_param: 16,
            key_dir: PathBuf::from("pkvk-02"),
            vector_dir: PathBuf::from("pkvk"),
        }
    }
}

impl SimConfig {
    pub fn accounts(&self) -> usize {
        1 << self.depth
    }

    pub fn key_path(&self) -> PathBuf {
        self.key_dir.join(KEY_FILE)
    }

    pub fn vector_path(&self) -> PathBuf {
        self.vector_dir.join(VECTOR_FILE)
    }

    pub fn epoch_seed(&self, epoch: u64) -> u64 {
        self.seed.wrapping_add(epoch)
    }

    /// Same settings with both data directories moved under `root`
    pub fn rooted_at(mut self, root: &Path) -> Self {
        self.key_dir = root.join(&self.key_dir);
        self.vector_dir = root.join(&self.vector_dir);
        self
    }
}
