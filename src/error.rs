//! Error taxonomy for the arbitrage pipeline.
//!
//! The split matters operationally: `Network` is retried with backoff and
//! never trips the breaker, `QuoteUnavailable` skips a single pair/path,
//! `SimulationFailed` abandons one attempt with nothing broadcast, and
//! `BreakerTripped` halts execution (scanning continues read-only) until an
//! explicit operator reset.

use thiserror::Error;

/// Reason an execution request was denied by the risk governor.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum DenyReason {
    #[error("circuit breaker tripped - manual reset required")]
    BreakerTripped,
    #[error("cooldown active - {remaining_ms}ms remaining")]
    CooldownActive { remaining_ms: u64 },
    #[error("another execution is in flight for this signer")]
    ExecutionInFlight,
}

#[derive(Debug, Error)]
pub enum BotError {
    /// RPC unreachable or timed out. Retryable; never trips the breaker.
    #[error("network error: {0}")]
    Network(String),

    /// Venue has no liquidity or the quote call reverted. Skip the pair,
    /// continue the scan.
    #[error("quote unavailable on {venue} for {pair}")]
    QuoteUnavailable { venue: String, pair: String },

    /// Parameter outside hard safety bounds and not clampable.
    #[error("parameter validation failed: {0}")]
    Validation(String),

    /// Relay simulation rejected the bundle. No transaction was broadcast.
    #[error("simulation failed: {0}")]
    SimulationFailed(String),

    /// Relay-level submission failure after bounded retries.
    #[error("bundle submission failed: {0}")]
    Submission(String),

    /// Cumulative realized loss exceeded the configured threshold.
    #[error("circuit breaker tripped: cumulative loss {loss:.6} exceeds threshold {threshold:.6}")]
    BreakerTripped { loss: f64, threshold: f64 },

    #[error("execution denied: {0}")]
    Denied(#[from] DenyReason),
}

impl BotError {
    /// True for transient failures the caller may retry with backoff.
    pub fn is_retryable(&self) -> bool {
        matches!(self, BotError::Network(_))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_only_network_errors_retryable() {
        assert!(BotError::Network("rpc timeout".into()).is_retryable());
        assert!(!BotError::SimulationFailed("revert".into()).is_retryable());
        assert!(!BotError::Submission("relay 503".into()).is_retryable());
        assert!(!BotError::QuoteUnavailable {
            venue: "uniswap".into(),
            pair: "WETH/USDC".into()
        }
        .is_retryable());
    }

    #[test]
    fn test_deny_reason_display() {
        let d = DenyReason::CooldownActive { remaining_ms: 10_000 };
        assert!(d.to_string().contains("10000ms"));
    }

    #[test]
    fn test_breaker_error_names_both_figures() {
        let e = BotError::BreakerTripped { loss: 10.1, threshold: 10.0 };
        let msg = e.to_string();
        assert!(msg.contains("10.1"));
        assert!(msg.contains("10.0"));
    }
}
