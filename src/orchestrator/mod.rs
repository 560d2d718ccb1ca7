//! Pipeline orchestration.
//!
//! One scan cycle per trigger: propose thresholds, enforce them, scan,
//! discount survivors for slippage, and offer the best to the single
//! execution slot. The execution loop drains that slot through the risk
//! gate and the bundle submitter. A failure anywhere in one cycle is
//! logged and absorbed - the next trigger starts clean.
//!
//! Triggers from the per-chain timers and block watchers land on one
//! queue; a per-chain latch coalesces triggers that arrive while that
//! chain's scan is still running.

use crate::audit::AuditEvent;
use crate::bundle::{providers_from_config, BundleBuilder, BundleSubmitter, RelayClient, Signer};
use crate::chain::{with_retry, ChainReader};
use crate::config::BotConfig;
use crate::error::BotError;
use crate::optimizer::ThresholdOptimizer;
use crate::risk::RiskGovernor;
use crate::scanner::OpportunityScanner;
use crate::types::{
    unix_ms, wei_to_native, BundleResult, ChainId, ExecutionOutcome, Opportunity, ThresholdSet,
};
use crate::validator::ParameterValidator;
use alloy::primitives::U256;
use dashmap::DashMap;
use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex};
use tokio::sync::{mpsc, Notify};
use tracing::{debug, error, info, warn};

/// What woke the scanner up.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TriggerSource {
    Timer,
    NewBlock(u64),
}

#[derive(Debug, Clone, Copy)]
pub struct ScanTrigger {
    pub chain_id: ChainId,
    pub source: TriggerSource,
}

/// Frees a chain's scan latch on drop, so a panicking scan task cannot
/// leave the chain permanently coalesced.
struct ScanLatch<'a> {
    scanning: &'a DashMap<ChainId, ()>,
    chain_id: ChainId,
}

impl Drop for ScanLatch<'_> {
    fn drop(&mut self) {
        self.scanning.remove(&self.chain_id);
    }
}

pub struct Orchestrator {
    config: Arc<BotConfig>,
    readers: HashMap<ChainId, Arc<dyn ChainReader>>,
    scanner: OpportunityScanner,
    optimizer: Mutex<ThresholdOptimizer>,
    validator: ParameterValidator,
    governor: Arc<RiskGovernor>,
    builder: BundleBuilder,
    submitters: HashMap<ChainId, BundleSubmitter>,
    /// Per-chain scan-in-progress latch.
    scanning: DashMap<ChainId, ()>,
    /// Single execution slot: the best pending candidate. A newly offered
    /// candidate replaces the occupant only if it outranks it.
    slot: Mutex<Option<Opportunity>>,
    slot_ready: Notify,
    shutdown: AtomicBool,
}

impl Orchestrator {
    pub fn new(
        config: Arc<BotConfig>,
        readers: HashMap<ChainId, Arc<dyn ChainReader>>,
        governor: Arc<RiskGovernor>,
        relay: Arc<dyn RelayClient>,
        signer: Arc<dyn Signer>,
    ) -> Result<Self, BotError> {
        let providers = providers_from_config(&config)?;
        let submitters = config
            .chains
            .iter()
            .map(|c| {
                (
                    c.chain_id,
                    BundleSubmitter::new(
                        Arc::clone(&relay),
                        config.max_submit_retries,
                        config.grace_blocks,
                        c.block_time_ms,
                    ),
                )
            })
            .collect();

        Ok(Self {
            scanner: OpportunityScanner::new(Arc::clone(&config)),
            optimizer: Mutex::new(ThresholdOptimizer::default()),
            validator: ParameterValidator::new(config.risk_preset, config.trade_size_native),
            builder: BundleBuilder::new(Arc::clone(&config), providers, signer),
            submitters,
            config,
            readers,
            governor,
            scanning: DashMap::new(),
            slot: Mutex::new(None),
            slot_ready: Notify::new(),
            shutdown: AtomicBool::new(false),
        })
    }

    /// Optimizer proposal, passed through the validator. Never returns an
    /// out-of-bounds set.
    fn current_thresholds(&self) -> ThresholdSet {
        let proposal = self
            .optimizer
            .lock()
            .expect("optimizer poisoned")
            .propose();
        self.validator.enforce(proposal)
    }

    /// One full scan cycle for a chain. Returns the number of candidates
    /// accepted into the execution slot race.
    pub async fn scan_cycle(&self, chain_id: ChainId) -> Result<usize, BotError> {
        let reader = self
            .readers
            .get(&chain_id)
            .ok_or_else(|| BotError::Validation(format!("no reader for chain {}", chain_id)))?;
        let thresholds = self.current_thresholds();

        // Feed the gas window before scanning so the next proposal sees
        // this cycle's market.
        if let Ok(fee) = with_retry("fee_data", self.config.max_rpc_retries, || {
            reader.fee_data()
        })
        .await
        {
            let gwei = fee.effective_per_gas().saturating_to::<u128>() as f64 / 1e9;
            self.optimizer
                .lock()
                .expect("optimizer poisoned")
                .record_gas_gwei(gwei);
        }

        let mut report = self.scanner.scan_chain(reader.as_ref(), &thresholds).await;
        for (dest_id, dest) in &self.readers {
            if *dest_id == chain_id {
                continue;
            }
            let cross = self
                .scanner
                .scan_cross_chain_routes(reader.as_ref(), dest.as_ref(), &thresholds)
                .await;
            report.candidates.extend(cross.candidates);
            report.errors.extend(cross.errors);
            report.paths_scanned += cross.paths_scanned;
        }

        for e in &report.errors {
            warn!("scan error on chain {}: {}", chain_id, e);
        }
        AuditEvent::scan_cycle(
            chain_id,
            report.paths_scanned,
            report.candidates.len(),
            report.errors.len(),
            &thresholds,
        )
        .emit();

        {
            let mut optimizer = self.optimizer.lock().expect("optimizer poisoned");
            for c in &report.candidates {
                optimizer.record_spread_bps(c.spread_bps as f64);
            }
        }

        let mut accepted = 0;
        for candidate in report.candidates {
            let discounted = candidate.with_slippage_discount(thresholds.slippage_buffer_bps);
            if discounted.net_profit_native() < thresholds.min_profit_native {
                debug!(
                    "opportunity #{} below profit floor after slippage ({:.6} < {:.6})",
                    discounted.id,
                    discounted.net_profit_native(),
                    thresholds.min_profit_native
                );
                continue;
            }
            self.offer(discounted);
            accepted += 1;
        }
        Ok(accepted)
    }

    /// Offer a candidate to the execution slot. Latest-highest-rank wins;
    /// the displaced candidate is simply dropped (it was priced for a
    /// market that no longer exists).
    fn offer(&self, candidate: Opportunity) {
        let mut slot = self.slot.lock().expect("execution slot poisoned");
        match &*slot {
            Some(current) if !candidate.outranks(current) => return,
            _ => {}
        }
        debug!(
            "execution slot <- opportunity #{} (priority {}, net {:.6})",
            candidate.id,
            candidate.priority,
            candidate.net_profit_native()
        );
        *slot = Some(candidate);
        self.slot_ready.notify_one();
    }

    /// Take the slotted candidate (if any) through gate -> build -> submit
    /// -> record. Returns the recorded outcome, or None when the slot was
    /// empty or the attempt was denied/abandoned.
    pub async fn execute_pending(&self) -> Option<ExecutionOutcome> {
        let opp = self.slot.lock().expect("execution slot poisoned").take()?;

        if let Err(reason) = self.governor.gate(&opp, unix_ms()) {
            info!("execution denied for opportunity #{}: {}", opp.id, reason);
            AuditEvent::execution_denied(&opp, &reason).emit();
            return None;
        }

        match self.execute_gated(&opp).await {
            Ok(outcome) => {
                self.governor.record_outcome(&outcome, unix_ms());
                AuditEvent::execution_attempt(&opp, &outcome, &self.governor.snapshot()).emit();
                Some(outcome)
            }
            Err(e) => {
                // Nothing reached the relay; free the latch without
                // touching the loss counters.
                self.governor.release();
                error!("execution attempt for #{} abandoned: {}", opp.id, e);
                None
            }
        }
    }

    async fn execute_gated(&self, opp: &Opportunity) -> Result<ExecutionOutcome, BotError> {
        let reader = self
            .readers
            .get(&opp.chain_id)
            .ok_or_else(|| BotError::Validation(format!("no reader for chain {}", opp.chain_id)))?;
        let submitter = self
            .submitters
            .get(&opp.chain_id)
            .ok_or_else(|| BotError::Validation(format!("no submitter for chain {}", opp.chain_id)))?;

        let retries = self.config.max_rpc_retries;
        let fee = with_retry("fee_data", retries, || reader.fee_data()).await?;
        let block = with_retry("block_number", retries, || reader.block_number()).await?;

        let thresholds = self.current_thresholds();
        let bundle = self.builder.build(opp, &thresholds, &fee, block).await?;
        let result = submitter.execute(&bundle).await;

        // Realized PnL: estimated gross minus the gas actually burned.
        // Attempts that never landed cost nothing.
        let pnl_native = match &result {
            BundleResult::Included { gas_used, .. } => {
                let gas_cost = U256::from(*gas_used) * fee.effective_per_gas();
                wei_to_native(opp.gross_profit) - wei_to_native(gas_cost)
            }
            BundleResult::SimulationFailed(_)
            | BundleResult::NotIncluded
            | BundleResult::SubmissionError(_) => 0.0,
        };

        Ok(ExecutionOutcome {
            opportunity_id: opp.id,
            result,
            pnl_native,
        })
    }

    /// Main loop: consume triggers until the channel closes, executing
    /// slotted candidates concurrently.
    pub async fn run(self: Arc<Self>, mut triggers: mpsc::Receiver<ScanTrigger>) {
        let executor = {
            let this = Arc::clone(&self);
            tokio::spawn(async move {
                loop {
                    this.slot_ready.notified().await;
                    if this.shutdown.load(Ordering::SeqCst) {
                        break;
                    }
                    while this.execute_pending().await.is_some() {}
                }
            })
        };

        while let Some(trigger) = triggers.recv().await {
            let this = Arc::clone(&self);
            tokio::spawn(async move {
                if this.scanning.insert(trigger.chain_id, ()).is_some() {
                    debug!(
                        "chain {} scan already running - trigger {:?} coalesced",
                        trigger.chain_id, trigger.source
                    );
                    return;
                }
                let _latch = ScanLatch {
                    scanning: &this.scanning,
                    chain_id: trigger.chain_id,
                };
                if let Err(e) = this.scan_cycle(trigger.chain_id).await {
                    warn!("scan cycle for chain {} failed: {}", trigger.chain_id, e);
                }
            });
        }

        info!("trigger channel closed - shutting down");
        self.shutdown.store(true, Ordering::SeqCst);
        self.slot_ready.notify_one();
        let _ = executor.await;
    }
}
