//! Epoch state machine
//!
//! One epoch runs the whole pipeline against the commitment engine:
//!
//! ```text
//! Committed ─► Opened ─► BatchGenerated ─► VerifiedNaive ─► VerifiedMemoized
//!     ▲                                                           │
//!     │                                                           ▼
//! AggVerified ◄── Aggregated ◄── ReVerified ◄──────────────── Updated
//! ```
//!
//! Engine errors end the epoch. Verification answers never do: every
//! mismatch is recorded as a [`Divergence`] and the remaining stages still run,
//! so one report shows everything that went wrong.

use rand::{Rng, SeedableRng};
use rand_chacha::ChaCha8Rng;
use statevec_vcs::{Digest, Fr, MemoStats, VectorCommitment};

use crate::audit::AuditLog;
use crate::config::SimConfig;
use crate::consolidate::consolidate;
use crate::error::{OrchestratorError, Result};
use crate::state::StateVector;
use crate::txgen::{self, TransactionBatch};

/// Mixed into the epoch seed for the re-sampled aggregate check
const RESAMPLE_DOMAIN: u64 = 0x7265_7361_6d70_6c65;

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum EpochPhase {
    Initialized,
    Committed,
    Opened,
    BatchGenerated,
    VerifiedNaive,
    VerifiedMemoized,
    Updated,
    ReVerified,
    Aggregated,
    AggVerified,
}

/// An inconsistency between the engine and the locally tracked state
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum Divergence {
    /// Naive verification rejected a transaction's snapshot value
    NaiveFailed { position: usize, index: u64 },
    /// Memoized answer differs from the AND of naive answers
    MemoizedMismatch { phase: EpochPhase, naive: bool, memoized: bool },
    /// Homomorphic digest differs from committing to the updated state
    HomomorphicMismatch { updated: Digest, recomputed: Digest },
    /// Consolidated value differs from the state vector after the update
    ValueMismatch { position: usize, index: u64 },
    /// A refreshed proof does not verify the post-batch value
    ProofRefreshFailed { position: usize, index: u64 },
    ReVerifyFailed,
    /// Aggregate answer differs from per-entry verification
    AggregateMismatch { resampled: bool, expected: bool, got: bool },
}

/// Outcome of one epoch
#[derive(Clone, Debug)]
pub struct EpochReport {
    pub epoch: u64,
    pub seed: u64,
    pub batch_size: usize,
    pub digest_before: Digest,
    pub digest_after: Digest,
    pub naive: Vec<bool>,
    pub memoized: bool,
    pub memo_stats: MemoStats,
    pub nodes_touched: usize,
    pub reverified: bool,
    pub reverify_stats: MemoStats,
    pub aggregate: bool,
    pub resampled_aggregate: bool,
    pub divergences: Vec<Divergence>,
}

impl EpochReport {
    pub fn is_consistent(&self) -> bool {
        self.divergences.is_empty()
    }

    pub fn naive_passed(&self) -> usize {
        self.naive.iter().filter(|ok| **ok).count()
    }
}

/// Drives epochs over one engine and one state vector
pub struct Orchestrator<V: VectorCommitment> {
    engine: V,
    config: SimConfig,
    state: StateVector,
    digest: Option<Digest>,
    /// Digest the engine's proof state currently answers for
    opened_for: Option<Digest>,
    audit: AuditLog,
    phase: EpochPhase,
    epoch: u64,
}

impl<V: VectorCommitment> Orchestrator<V> {
    pub fn new(engine: V, config: SimConfig, state: StateVector) -> Result<Self> {
        if config.batch_size == 0 {
            return Err(OrchestratorError::EmptyBatch);
        }
        let expected = 1usize << engine.depth();
        if state.depth() != engine.depth() || state.len() != expected {
            return Err(OrchestratorError::StateSize {
                depth: engine.depth(),
                expected,
                got: state.len(),
            });
        }

        Ok(Self {
            engine,
            config,
            state,
            digest: None,
            opened_for: None,
            audit: AuditLog::new(),
            phase: EpochPhase::Initialized,
            epoch: 0,
        })
    }

    pub fn engine(&self) -> &V {
        &self.engine
    }

    pub fn state(&self) -> &StateVector {
        &self.state
    }

    pub fn digest(&self) -> Option<Digest> {
        self.digest
    }

    pub fn audit(&self) -> &AuditLog {
        &self.audit
    }

    pub fn phase(&self) -> EpochPhase {
        self.phase
    }

    /// Index of the next epoch to run
    pub fn epoch(&self) -> u64 {
        self.epoch
    }

    /// Run `epochs` epochs back to back
    pub fn run(&mut self, epochs: u64) -> Result<Vec<EpochReport>> {
        (0..epochs).map(|_| self.run_epoch()).collect()
    }

    pub fn run_epoch(&mut self) -> Result<EpochReport> {
        let epoch = self.epoch;
        let seed = self.config.epoch_seed(epoch);
        let depth = self.engine.depth();
        let mut divergences = Vec::new();

        tracing::info!("epoch {} (seed {})", epoch, seed);

        // commit once at genesis, afterwards the digest is carried forward
        let digest = match self.digest {
            Some(d) => d,
            None => {
                let d = self.engine.commit(self.state.as_slice(), depth)?;
                tracing::info!("genesis commitment {}", d);
                self.digest = Some(d);
                d
            }
        };
        self.phase = EpochPhase::Committed;

        if self.opened_for != Some(digest) {
            self.engine.open_all(self.state.as_slice())?;
            self.opened_for = Some(digest);
            tracing::info!("opened all {} positions", self.state.len());
        }
        self.phase = EpochPhase::Opened;

        let batch = txgen::generate(
            self.state.as_slice(),
            self.config.batch_size,
            seed,
            &mut self.audit,
        )?;
        let indices = batch.indices();
        let values = batch.snapshot_values();
        tracing::info!("generated {} transactions", batch.len());
        self.phase = EpochPhase::BatchGenerated;

        let proofs = self.proofs_for(&indices)?;
        let naive = self.verify_each(&digest, &indices, &values, &proofs);
        for (position, ok) in naive.iter().enumerate() {
            if *ok {
                tracing::debug!("tx {} index {}: verification passed", position, indices[position]);
            } else {
                tracing::error!("tx {} index {}: verification failed", position, indices[position]);
                divergences.push(Divergence::NaiveFailed { position, index: indices[position] });
            }
        }
        let naive_all = naive.iter().all(|ok| *ok);
        if naive_all {
            tracing::info!("verification passed");
        }
        self.phase = EpochPhase::VerifiedNaive;

        let (memoized, memo_stats) =
            self.engine.verify_memoized(&digest, &indices, &values, &proofs);
        Self::check_memoized(EpochPhase::VerifiedMemoized, naive_all, memoized, &mut divergences);
        self.phase = EpochPhase::VerifiedMemoized;
        if memoized {
            tracing::info!("fast verification passed ({} memo hits)", memo_stats.memo_hits);
        }

        let (digest_after, new_values, nodes_touched) =
            self.update(&batch, &digest, &mut divergences)?;

        let new_proofs = self.proofs_for(&indices)?;
        let re_naive = self.verify_each(&digest_after, &indices, &new_values, &new_proofs);
        for (position, ok) in re_naive.iter().enumerate() {
            if !ok {
                let index = indices[position];
                tracing::error!("tx {} index {}: refreshed proof rejected", position, index);
                divergences.push(Divergence::ProofRefreshFailed { position, index });
            }
        }
        let re_naive_all = re_naive.iter().all(|ok| *ok);
        if re_naive_all {
            tracing::info!("UpdateProofTree passed ({} nodes touched)", nodes_touched);
        }

        let (reverified, reverify_stats) =
            self.engine.verify_memoized(&digest_after, &indices, &new_values, &new_proofs);
        Self::check_memoized(EpochPhase::ReVerified, re_naive_all, reverified, &mut divergences);
        if reverified {
            tracing::info!("re-verification passed");
        } else {
            tracing::error!("re-verification failed");
            divergences.push(Divergence::ReVerifyFailed);
        }
        self.phase = EpochPhase::ReVerified;

        let agg = self.engine.agg_prove(&indices, &new_proofs)?;
        self.phase = EpochPhase::Aggregated;

        let aggregate = self.engine.agg_verify(&agg, &digest_after, &indices, &new_values);
        Self::check_aggregate(false, re_naive_all, aggregate, &mut divergences);

        // same pool, new draw with replacement
        let mut rng = ChaCha8Rng::seed_from_u64(seed ^ RESAMPLE_DOMAIN);
        let picks: Vec<usize> = (0..indices.len())
            .map(|_| rng.gen_range(0..indices.len()))
            .collect();
        let sub_indices: Vec<u64> = picks.iter().map(|&k| indices[k]).collect();
        let sub_values: Vec<Fr> = picks.iter().map(|&k| new_values[k]).collect();
        let sub_proofs: Vec<V::Proof> = picks.iter().map(|&k| new_proofs[k].clone()).collect();
        let sub_expected = picks.iter().all(|&k| re_naive[k]);

        let sub_agg = self.engine.agg_prove(&sub_indices, &sub_proofs)?;
        let resampled_aggregate =
            self.engine.agg_verify(&sub_agg, &digest_after, &sub_indices, &sub_values);
        Self::check_aggregate(true, sub_expected, resampled_aggregate, &mut divergences);
        self.phase = EpochPhase::AggVerified;

        self.audit.log();
        self.state.log_snapshot();

        if divergences.is_empty() {
            tracing::info!("epoch {} consistent, digest {} -> {}", epoch, digest, digest_after);
        } else {
            tracing::error!("epoch {}: {} divergences", epoch, divergences.len());
        }

        self.epoch += 1;
        Ok(EpochReport {
            epoch,
            seed,
            batch_size: batch.len(),
            digest_before: digest,
            digest_after,
            naive,
            memoized,
            memo_stats,
            nodes_touched,
            reverified,
            reverify_stats,
            aggregate,
            resampled_aggregate,
            divergences,
        })
    }

    /// Apply the batch to the digest, the state vector and the proof tree
    fn update(
        &mut self,
        batch: &TransactionBatch,
        digest: &Digest,
        divergences: &mut Vec<Divergence>,
    ) -> Result<(Digest, Vec<Fr>, usize)> {
        let indices = batch.indices();
        let deltas = batch.deltas();
        let consolidation = consolidate(&indices, &deltas, &batch.snapshot_values())?;

        let updated = self.engine.update_com_vec(digest, &indices, &deltas)?;

        self.state.apply(consolidation.net_updates())?;
        let recomputed = self.engine.commit(self.state.as_slice(), self.engine.depth())?;
        if updated != recomputed {
            tracing::error!("homomorphic update {} != recommitted {}", updated, recomputed);
            divergences.push(Divergence::HomomorphicMismatch { updated, recomputed });
        }

        let consolidated = indices.iter().zip(&consolidation.new_values);
        for (position, (&index, value)) in consolidated.enumerate() {
            if self.state.get(index) != Some(value) {
                tracing::error!(
                    "tx {} index {}: consolidated value differs from state",
                    position,
                    index
                );
                divergences.push(Divergence::ValueMismatch { position, index });
            }
        }

        let (net_indices, net_deltas): (Vec<u64>, Vec<Fr>) = consolidation.net_updates().unzip();
        let touched = self.engine.update_proof_tree_bulk(&net_indices, &net_deltas)?;

        self.digest = Some(updated);
        self.opened_for = Some(updated);
        self.phase = EpochPhase::Updated;
        tracing::info!(
            "updated {} distinct accounts, digest {}",
            consolidation.distinct_indices(),
            updated
        );

        Ok((updated, consolidation.new_values, touched))
    }

    fn proofs_for(&self, indices: &[u64]) -> Result<Vec<V::Proof>> {
        indices
            .iter()
            .map(|&i| self.engine.proof_path(i).map_err(OrchestratorError::from))
            .collect()
    }

    fn verify_each(
        &self,
        digest: &Digest,
        indices: &[u64],
        values: &[Fr],
        proofs: &[V::Proof],
    ) -> Vec<bool> {
        indices
            .iter()
            .zip(values)
            .zip(proofs)
            .map(|((&i, v), p)| self.engine.verify(digest, i, v, p))
            .collect()
    }

    fn check_memoized(
        phase: EpochPhase,
        naive: bool,
        memoized: bool,
        divergences: &mut Vec<Divergence>,
    ) {
        if naive != memoized {
            tracing::error!("memoized {} disagrees with naive {}", memoized, naive);
            divergences.push(Divergence::MemoizedMismatch { phase, naive, memoized });
        }
    }

    fn check_aggregate(
        resampled: bool,
        expected: bool,
        got: bool,
        divergences: &mut Vec<Divergence>,
    ) {
        if expected == got {
            if got {
                let which = if resampled { " (re-sampled)" } else { "" };
                tracing::info!("aggregation passed{}", which);
            }
            return;
        }
        tracing::error!("aggregate verification {} but entries say {}", got, expected);
        divergences.push(Divergence::AggregateMismatch { resampled, expected, got });
    }
}
