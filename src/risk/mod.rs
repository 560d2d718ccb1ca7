//! Risk governor - circuit breaker, cooldown, and execution serialization.
//!
//! One state machine over a single latch: `Armed -> Tripped`. The trip fires
//! when cumulative realized loss exceeds the configured threshold after any
//! recorded outcome; there is no automatic untrip - only an explicit operator
//! `reset()` (wired to SIGUSR1 in main). The cooldown is independent of the
//! breaker: `gate()` denies whenever the last execution was less than
//! `cooldown_ms` ago, regardless of opportunity quality. Timestamps are
//! passed in by the caller so tests stay deterministic.

use crate::error::DenyReason;
use crate::types::{ExecutionOutcome, Opportunity, RiskSnapshot};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Mutex;
use tracing::{info, warn};

#[derive(Debug, Default)]
struct Counters {
    cumulative_loss: f64,
    last_execution_ms: u64,
    /// Exactly one execution may be in flight per signer (shared nonce
    /// space). Set by a successful gate, cleared by record_outcome.
    in_flight: bool,
}

pub struct RiskGovernor {
    /// Monotonic false -> true; reset only by explicit operator action.
    tripped: AtomicBool,
    counters: Mutex<Counters>,
    loss_threshold_native: f64,
    cooldown_ms: u64,
}

impl RiskGovernor {
    pub fn new(loss_threshold_native: f64, cooldown_ms: u64) -> Self {
        Self {
            tripped: AtomicBool::new(false),
            counters: Mutex::new(Counters::default()),
            loss_threshold_native,
            cooldown_ms,
        }
    }

    /// Request permission to execute `opportunity` at `now_ms`.
    /// On allow, the in-flight latch is taken - the caller MUST follow up
    /// with `record_outcome` (or `release`) to free it.
    pub fn gate(&self, opportunity: &Opportunity, now_ms: u64) -> Result<(), DenyReason> {
        if self.tripped.load(Ordering::SeqCst) {
            return Err(DenyReason::BreakerTripped);
        }

        let mut c = self.counters.lock().expect("risk counters poisoned");
        if c.in_flight {
            return Err(DenyReason::ExecutionInFlight);
        }
        let elapsed = now_ms.saturating_sub(c.last_execution_ms);
        if c.last_execution_ms > 0 && elapsed < self.cooldown_ms {
            return Err(DenyReason::CooldownActive {
                remaining_ms: self.cooldown_ms - elapsed,
            });
        }

        c.in_flight = true;
        info!(
            "gate: allow opportunity #{} ({}) net={:.6}",
            opportunity.id,
            opportunity.kind.label(),
            opportunity.net_profit_native()
        );
        Ok(())
    }

    /// Record the outcome of an execution attempt. Wins and losses both
    /// update the execution timestamp; only losses add to cumulative loss.
    /// Trips the breaker when the threshold is exceeded.
    pub fn record_outcome(&self, outcome: &ExecutionOutcome, now_ms: u64) {
        let (loss_total, tripped_now) = {
            let mut c = self.counters.lock().expect("risk counters poisoned");
            c.in_flight = false;
            c.last_execution_ms = now_ms;
            if outcome.pnl_native < 0.0 {
                c.cumulative_loss += -outcome.pnl_native;
            }
            let should_trip = c.cumulative_loss > self.loss_threshold_native
                && !self.tripped.load(Ordering::SeqCst);
            (c.cumulative_loss, should_trip)
        };

        if tripped_now {
            self.tripped.store(true, Ordering::SeqCst);
            warn!(
                "CIRCUIT BREAKER TRIPPED: cumulative loss {:.6} > threshold {:.6} - \
                 execution halted until operator reset",
                loss_total, self.loss_threshold_native
            );
        }
    }

    /// Free the in-flight latch without recording an outcome (e.g. the
    /// attempt was abandoned before simulation).
    pub fn release(&self) {
        let mut c = self.counters.lock().expect("risk counters poisoned");
        c.in_flight = false;
    }

    /// Explicit operator reset. The only way out of `Tripped`.
    pub fn reset(&self) {
        let was = self.tripped.swap(false, Ordering::SeqCst);
        let mut c = self.counters.lock().expect("risk counters poisoned");
        c.cumulative_loss = 0.0;
        if was {
            warn!("circuit breaker reset by operator - execution re-armed");
        } else {
            info!("risk counters reset by operator (breaker was not tripped)");
        }
    }

    pub fn snapshot(&self) -> RiskSnapshot {
        let c = self.counters.lock().expect("risk counters poisoned");
        RiskSnapshot {
            cumulative_loss_native: c.cumulative_loss,
            last_execution_ms: c.last_execution_ms,
            breaker_tripped: self.tripped.load(Ordering::SeqCst),
        }
    }

    pub fn is_tripped(&self) -> bool {
        self.tripped.load(Ordering::SeqCst)
    }
}
