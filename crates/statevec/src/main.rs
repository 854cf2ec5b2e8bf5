//! Statevec - fixed three-epoch simulation
//!
//! Run without arguments to simulate; any argument turns the run into a no-op.

use anyhow::Context;
use clap::Parser;
use statevec::{Orchestrator, SimConfig, StateVector};
use statevec_vcs::{keygen, load_vector, save_vector, HomomorphicVcs};
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

#[derive(Parser)]
#[command(name = "statevec")]
#[command(about = "Batched account-state updates over a homomorphic vector commitment")]
struct Cli {
    /// Any argument skips the simulation
    #[arg(hide = true, trailing_var_arg = true, allow_hyphen_values = true)]
    rest: Vec<String>,
}

fn main() -> anyhow::Result<()> {
    tracing_subscriber::registry()
        .with(fmt::layer())
        .with(EnvFilter::from_default_env().add_directive("statevec=info".parse()?))
        .init();

    let cli = Cli::parse();
    if !cli.rest.is_empty() {
        return Ok(());
    }

    simulate(&SimConfig::default())
}

fn simulate(config: &SimConfig) -> anyhow::Result<()> {
    if !config.key_path().exists() {
        tracing::info!("no key material in {}, generating", config.key_dir.display());
        keygen(config.security_param, config.depth, &config.key_dir)
            .with_context(|| format!("generating keys in {}", config.key_dir.display()))?;
    }

    let engine = HomomorphicVcs::key_gen_load(
        config.security_param,
        config.depth,
        &config.key_dir,
        config.batch_size,
    )
    .with_context(|| format!("loading keys from {}", config.key_path().display()))?;

    let genesis = StateVector::genesis(config.depth);
    save_vector(&config.vector_path(), genesis.as_slice())
        .with_context(|| format!("saving {}", config.vector_path().display()))?;

    let loaded = load_vector(&config.vector_path(), config.accounts() as u64)
        .with_context(|| format!("loading {}", config.vector_path().display()))?;
    let state = StateVector::from_vec(config.depth, loaded)?;
    tracing::info!("state vector ready: {} accounts", state.len());

    let mut orchestrator = Orchestrator::new(engine, config.clone(), state)?;
    let reports = orchestrator.run(config.epochs)?;

    println!("\n=== Simulation Summary ===");
    println!(
        "Depth: {} ({} accounts), batch size {}",
        config.depth,
        config.accounts(),
        config.batch_size
    );

    for r in &reports {
        println!(
            "Epoch {}: digest {} -> {}, naive {}/{}, memoized {}, re-verified {}, \
             aggregate {}/{}, {} nodes touched",
            r.epoch,
            r.digest_before,
            r.digest_after,
            r.naive_passed(),
            r.naive.len(),
            r.memoized,
            r.reverified,
            r.aggregate,
            r.resampled_aggregate,
            r.nodes_touched,
        );
    }

    let divergent: Vec<_> = reports.iter().filter(|r| !r.is_consistent()).collect();
    if divergent.is_empty() {
        println!("All {} epochs consistent", reports.len());
    } else {
        for r in divergent {
            for d in &r.divergences {
                println!("Epoch {} divergence: {:?}", r.epoch, d);
            }
        }
    }

    Ok(())
}
