//! Binary entry point.
//!
//! Loads a chain-profile .env file, wires the pipeline over the dry-run
//! backends, and runs until interrupted. Live submission needs a relay
//! endpoint and an external signer; this build refuses LIVE_MODE rather
//! than pretend. SIGUSR1 is the operator's circuit-breaker reset.

use alloy::primitives::{Address, U256};
use anyhow::{bail, Context, Result};
use clap::Parser;
use flasharb_bot::audit::AuditEvent;
use flasharb_bot::bundle::{DryRunRelay, DryRunSigner};
use flasharb_bot::chain::{ChainReader, FixtureReader};
use flasharb_bot::config::load_config_from_file;
use flasharb_bot::orchestrator::{Orchestrator, ScanTrigger, TriggerSource};
use flasharb_bot::risk::RiskGovernor;
use flasharb_bot::types::{ChainId, FeeData, VenueId};
use futures::StreamExt;
use signal_hook::consts::SIGUSR1;
use signal_hook_tokio::Signals;
use std::collections::HashMap;
use std::str::FromStr;
use std::sync::Arc;
use tokio::sync::mpsc;
use tokio_stream::wrappers::IntervalStream;
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;

/// Gas used by the dry-run relay's pretend inclusions.
const DRY_RUN_GAS_USED: u64 = 300_000;

#[derive(Parser, Debug)]
#[command(
    name = "flasharb-bot",
    about = "Multi-chain flash-loan arbitrage bot (dry-run backend)"
)]
struct Args {
    /// Chain profile to load: reads .env.<profile>
    #[arg(long, default_value = "polygon")]
    profile: String,

    /// Emit logs as JSON lines
    #[arg(long)]
    json_logs: bool,
}

fn init_logging(json: bool) {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    let builder = tracing_subscriber::fmt().with_env_filter(filter);
    if json {
        builder.json().init();
    } else {
        builder.init();
    }
}

/// Optional FIXTURE_RATES entries: "venue:token_in:token_out:num:den,..."
/// seed the offline reader so dry runs have something to quote.
fn apply_fixture_rates(reader: &mut FixtureReader, raw: &str) -> Result<()> {
    for entry in raw.split(',').filter(|e| !e.trim().is_empty()) {
        let parts: Vec<&str> = entry.trim().split(':').collect();
        if parts.len() != 5 {
            bail!("invalid fixture rate '{}'", entry);
        }
        reader.set_rate(
            &VenueId::new(parts[0]),
            Address::from_str(parts[1]).context("bad fixture token_in")?,
            Address::from_str(parts[2]).context("bad fixture token_out")?,
            parts[3].parse().context("bad fixture rate numerator")?,
            parts[4].parse().context("bad fixture rate denominator")?,
        );
    }
    Ok(())
}

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();
    init_logging(args.json_logs);

    let profile_path = format!(".env.{}", args.profile);
    let config = Arc::new(
        load_config_from_file(&profile_path)
            .with_context(|| format!("loading {}", profile_path))?,
    );

    if config.live_mode {
        bail!(
            "LIVE_MODE requires a relay endpoint and external signer; \
             this build ships the dry-run backend only"
        );
    }
    info!(
        "starting in DRY RUN mode: {} chain(s), {} pair(s), {} venue(s)",
        config.chains.len(),
        config.pairs.len(),
        config.venues.len()
    );

    // Offline readers, one per configured chain, optionally seeded with
    // fixture rates so scans produce quotes.
    let fee = FeeData {
        base_fee_per_gas: U256::from(30_000_000_000u64),
        suggested_priority_fee: U256::from(1_000_000_000u64),
    };
    let fixture_rates = std::env::var("FIXTURE_RATES").unwrap_or_default();
    let mut readers: HashMap<ChainId, Arc<dyn ChainReader>> = HashMap::new();
    for chain in &config.chains {
        let mut reader = FixtureReader::new(chain.chain_id, fee, 1);
        apply_fixture_rates(&mut reader, &fixture_rates)?;
        readers.insert(chain.chain_id, Arc::new(reader));
    }

    let governor = Arc::new(RiskGovernor::new(
        config.loss_threshold_native,
        config.cooldown_ms,
    ));
    let orchestrator = Arc::new(Orchestrator::new(
        Arc::clone(&config),
        readers.clone(),
        Arc::clone(&governor),
        Arc::new(DryRunRelay::new(DRY_RUN_GAS_USED)),
        Arc::new(DryRunSigner::new(config.executor_address)),
    )?);

    let (trigger_tx, trigger_rx) = mpsc::channel::<ScanTrigger>(64);

    // Per-chain scan timers.
    for chain in &config.chains {
        let tx = trigger_tx.clone();
        let chain_id = chain.chain_id;
        let interval = config.scan_interval_ms;
        tokio::spawn(async move {
            let mut ticks = IntervalStream::new(tokio::time::interval(
                std::time::Duration::from_millis(interval),
            ));
            while ticks.next().await.is_some() {
                if tx
                    .send(ScanTrigger {
                        chain_id,
                        source: TriggerSource::Timer,
                    })
                    .await
                    .is_err()
                {
                    break;
                }
            }
        });
    }

    // Per-chain block watchers: a new block is a fresher scan signal than
    // the timer.
    for chain in &config.chains {
        let tx = trigger_tx.clone();
        let chain_id = chain.chain_id;
        let block_time = chain.block_time_ms;
        let reader = Arc::clone(readers.get(&chain_id).expect("reader just inserted"));
        tokio::spawn(async move {
            let mut last_seen = 0u64;
            let mut ticker =
                tokio::time::interval(std::time::Duration::from_millis(block_time));
            loop {
                ticker.tick().await;
                match reader.block_number().await {
                    Ok(n) if n > last_seen => {
                        last_seen = n;
                        if let Ok(info) = reader.block(n).await {
                            tracing::debug!(
                                "chain {} block {}: {:.0}% full",
                                chain_id,
                                n,
                                info.utilization() * 100.0
                            );
                        }
                        if tx
                            .send(ScanTrigger {
                                chain_id,
                                source: TriggerSource::NewBlock(n),
                            })
                            .await
                            .is_err()
                        {
                            break;
                        }
                    }
                    Ok(_) => {}
                    Err(e) => warn!("block watcher for chain {}: {}", chain_id, e),
                }
            }
        });
    }

    // SIGUSR1 = operator circuit-breaker reset.
    let mut signals = Signals::new([SIGUSR1]).context("installing SIGUSR1 handler")?;
    {
        let governor = Arc::clone(&governor);
        tokio::spawn(async move {
            while signals.next().await.is_some() {
                let cleared = governor.snapshot().cumulative_loss_native;
                governor.reset();
                AuditEvent::breaker_reset(cleared).emit();
            }
        });
    }

    drop(trigger_tx);
    tokio::select! {
        _ = orchestrator.run(trigger_rx) => {}
        _ = tokio::signal::ctrl_c() => {
            info!("interrupt received - shutting down");
        }
    }
    Ok(())
}
