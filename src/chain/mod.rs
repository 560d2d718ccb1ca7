//! Per-chain read-only accessor seam.
//!
//! `ChainReader` is the only surface the pipeline uses to observe a chain:
//! venue quotes, fee data, and block metadata. Every call is side-effect-free
//! and safe to retry. A venue with no liquidity (or a reverting quote call)
//! is reported as `QuoteOutcome::Unavailable` - a value, not an error - so
//! callers skip the pair instead of aborting the scan.

pub mod fixture;

pub use fixture::FixtureReader;

use crate::error::BotError;
use crate::types::{BlockInfo, ChainId, FeeData, VenueId};
use alloy::primitives::{Address, U256};
use async_trait::async_trait;
use std::future::Future;
use std::time::Duration;
use tracing::{debug, warn};

/// Result of a single quote call.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum QuoteOutcome {
    Amount(U256),
    /// No liquidity for this pair/amount on this venue. Skip, don't abort.
    Unavailable,
}

#[async_trait]
pub trait ChainReader: Send + Sync {
    fn chain_id(&self) -> ChainId;

    /// Simulated swap output for `amount_in` of `token_in` on `venue`.
    async fn quote(
        &self,
        venue: &VenueId,
        token_in: Address,
        token_out: Address,
        amount_in: U256,
    ) -> Result<QuoteOutcome, BotError>;

    async fn fee_data(&self) -> Result<FeeData, BotError>;

    async fn block_number(&self) -> Result<u64, BotError>;

    async fn block(&self, number: u64) -> Result<BlockInfo, BotError>;
}

/// Initial backoff for retried network calls. Doubles per attempt.
const RETRY_BASE_DELAY_MS: u64 = 100;

/// Retry `op` up to `max_attempts` times with exponential backoff.
/// Only `BotError::Network` is retried - every other error is the caller's
/// problem and returns immediately.
pub async fn with_retry<T, F, Fut>(
    op_name: &str,
    max_attempts: u32,
    mut op: F,
) -> Result<T, BotError>
where
    F: FnMut() -> Fut,
    Fut: Future<Output = Result<T, BotError>>,
{
    let mut attempt = 0u32;
    loop {
        match op().await {
            Ok(v) => return Ok(v),
            Err(e) if e.is_retryable() && attempt + 1 < max_attempts => {
                let delay = RETRY_BASE_DELAY_MS << attempt;
                debug!(
                    "{}: transient failure (attempt {}/{}), retrying in {}ms: {}",
                    op_name,
                    attempt + 1,
                    max_attempts,
                    delay,
                    e
                );
                tokio::time::sleep(Duration::from_millis(delay)).await;
                attempt += 1;
            }
            Err(e) => {
                if e.is_retryable() {
                    warn!("{}: giving up after {} attempts: {}", op_name, max_attempts, e);
                }
                return Err(e);
            }
        }
    }
}
