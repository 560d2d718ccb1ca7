//! Structured audit trail.
//!
//! Every scan cycle and every execution attempt emits one JSON record on
//! the `audit` log target, separable from operational logs by filter.
//! Records carry enough to reconstruct what the bot saw and did without
//! replaying the chain.

use crate::types::{ExecutionOutcome, Opportunity, RiskSnapshot, ThresholdSet};
use chrono::{DateTime, Utc};
use serde::Serialize;
use tracing::info;

#[derive(Debug, Serialize)]
#[serde(tag = "event", rename_all = "snake_case")]
pub enum AuditEvent {
    ScanCycle {
        timestamp: DateTime<Utc>,
        chain_id: u64,
        paths_scanned: usize,
        candidates: usize,
        errors: usize,
        thresholds: ThresholdSet,
    },
    ExecutionAttempt {
        timestamp: DateTime<Utc>,
        opportunity_id: u64,
        chain_id: u64,
        kind: &'static str,
        amount_in_wei: String,
        net_profit_native: f64,
        priority: u8,
        result: &'static str,
        pnl_native: f64,
        cumulative_loss_native: f64,
        breaker_tripped: bool,
    },
    ExecutionDenied {
        timestamp: DateTime<Utc>,
        opportunity_id: u64,
        chain_id: u64,
        reason: String,
    },
    BreakerReset {
        timestamp: DateTime<Utc>,
        cleared_loss_native: f64,
    },
}

impl AuditEvent {
    pub fn scan_cycle(
        chain_id: u64,
        paths_scanned: usize,
        candidates: usize,
        errors: usize,
        thresholds: &ThresholdSet,
    ) -> Self {
        AuditEvent::ScanCycle {
            timestamp: Utc::now(),
            chain_id,
            paths_scanned,
            candidates,
            errors,
            thresholds: thresholds.clone(),
        }
    }

    pub fn execution_attempt(
        opp: &Opportunity,
        outcome: &ExecutionOutcome,
        risk: &RiskSnapshot,
    ) -> Self {
        AuditEvent::ExecutionAttempt {
            timestamp: Utc::now(),
            opportunity_id: opp.id,
            chain_id: opp.chain_id,
            kind: opp.kind.label(),
            amount_in_wei: opp.amount_in.to_string(),
            net_profit_native: opp.net_profit_native(),
            priority: opp.priority,
            result: outcome.result.label(),
            pnl_native: outcome.pnl_native,
            cumulative_loss_native: risk.cumulative_loss_native,
            breaker_tripped: risk.breaker_tripped,
        }
    }

    pub fn execution_denied(opp: &Opportunity, reason: impl ToString) -> Self {
        AuditEvent::ExecutionDenied {
            timestamp: Utc::now(),
            opportunity_id: opp.id,
            chain_id: opp.chain_id,
            reason: reason.to_string(),
        }
    }

    pub fn breaker_reset(cleared_loss_native: f64) -> Self {
        AuditEvent::BreakerReset {
            timestamp: Utc::now(),
            cleared_loss_native,
        }
    }

    /// Emit the record on the dedicated audit target. Serialization of
    /// these shapes cannot fail; the fallback keeps the trail append-only
    /// even if that ever changes.
    pub fn emit(&self) {
        let payload = serde_json::to_string(self)
            .unwrap_or_else(|e| format!(r#"{{"event":"serialize_error","detail":"{}"}}"#, e));
        info!(target: "audit", "{}", payload);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::{BundleResult, OpportunityKind, VenueId};
    use alloy::primitives::{Address, U256};

    fn opp() -> Opportunity {
        Opportunity {
            id: 42,
            chain_id: 137,
            kind: OpportunityKind::DualVenue {
                venue_buy: VenueId::new("venue_a"),
                venue_sell: VenueId::new("venue_b"),
            },
            path: vec![Address::ZERO],
            amount_in: U256::from(1_000u64),
            gross_profit: U256::from(20u64),
            gas_estimate: 400_000,
            net_profit: U256::from(15u64),
            spread_bps: 100,
            priority: 8,
            created_at_ms: 1,
        }
    }

    #[test]
    fn test_execution_attempt_serializes_with_tag() {
        let outcome = ExecutionOutcome {
            opportunity_id: 42,
            result: BundleResult::NotIncluded,
            pnl_native: 0.0,
        };
        let risk = RiskSnapshot {
            cumulative_loss_native: 1.5,
            last_execution_ms: 123,
            breaker_tripped: false,
        };
        let event = AuditEvent::execution_attempt(&opp(), &outcome, &risk);
        let json = serde_json::to_string(&event).unwrap();
        assert!(json.contains(r#""event":"execution_attempt""#));
        assert!(json.contains(r#""result":"not_included""#));
        assert!(json.contains(r#""opportunity_id":42"#));
    }

    #[test]
    fn test_scan_cycle_carries_thresholds() {
        let t = ThresholdSet {
            min_profit_native: 0.01,
            min_spread_bps: 30,
            gas_buffer_multiplier: 1.25,
            slippage_buffer_bps: 50,
        };
        let json =
            serde_json::to_string(&AuditEvent::scan_cycle(137, 12, 2, 0, &t)).unwrap();
        assert!(json.contains(r#""event":"scan_cycle""#));
        assert!(json.contains(r#""min_spread_bps":30"#));
    }
}
