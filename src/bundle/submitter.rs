//! Bundle submission state machine.
//!
//! Every bundle is simulated first; a failed simulation abandons the
//! attempt with nothing broadcast. Submission retries a bounded number of
//! times, then the submitter waits out the target block plus a grace
//! window. A bundle that simply never lands resolves to `NotIncluded`,
//! which is an expected outcome rather than an error.

use super::relay::{RelayClient, Resolution};
use crate::types::{BundleRequest, BundleResult};
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, info, warn};

pub struct BundleSubmitter {
    relay: Arc<dyn RelayClient>,
    max_submit_retries: u32,
    grace_blocks: u64,
    block_time_ms: u64,
}

impl BundleSubmitter {
    pub fn new(
        relay: Arc<dyn RelayClient>,
        max_submit_retries: u32,
        grace_blocks: u64,
        block_time_ms: u64,
    ) -> Self {
        Self {
            relay,
            max_submit_retries,
            grace_blocks,
            block_time_ms,
        }
    }

    /// Drive one bundle from simulation to a terminal result. Infallible by
    /// construction: every failure mode maps to a `BundleResult` variant.
    pub async fn execute(&self, bundle: &BundleRequest) -> BundleResult {
        // Stage 1: mandatory simulation.
        let report = match self.relay.simulate(bundle).await {
            Ok(report) => report,
            Err(e) => {
                warn!("relay simulation call failed: {}", e);
                return BundleResult::SubmissionError(e.to_string());
            }
        };
        if !report.ok {
            let reason = report
                .revert_reason
                .unwrap_or_else(|| "simulation reverted without reason".into());
            info!(
                "bundle for block {} failed simulation: {} - nothing broadcast",
                bundle.target_block, reason
            );
            return BundleResult::SimulationFailed(reason);
        }
        debug!(
            "bundle for block {} simulated ok ({} gas)",
            bundle.target_block, report.gas_used
        );

        // Stage 2: submit, retrying relay-level failures a bounded number
        // of times.
        let mut handle = None;
        let mut last_err = String::new();
        for attempt in 0..=self.max_submit_retries {
            match self.relay.submit(bundle).await {
                Ok(h) => {
                    handle = Some(h);
                    break;
                }
                Err(e) => {
                    warn!(
                        "submit attempt {}/{} failed: {}",
                        attempt + 1,
                        self.max_submit_retries + 1,
                        e
                    );
                    last_err = e.to_string();
                }
            }
        }
        let handle = match handle {
            Some(h) => h,
            None => return BundleResult::SubmissionError(last_err),
        };

        // Stage 3: wait out the target block plus the grace window.
        let window = Duration::from_millis((1 + self.grace_blocks) * self.block_time_ms);
        match tokio::time::timeout(window, self.relay.wait_for_inclusion(&handle)).await {
            Ok(Ok(Resolution::Included { block, gas_used })) => {
                info!(
                    "bundle {} included in block {} ({} gas)",
                    handle.bundle_id, block, gas_used
                );
                BundleResult::Included { block, gas_used }
            }
            Ok(Ok(Resolution::Dropped)) => {
                debug!("bundle {} dropped by relay", handle.bundle_id);
                BundleResult::NotIncluded
            }
            Ok(Err(e)) => BundleResult::SubmissionError(e.to_string()),
            Err(_) => {
                debug!(
                    "bundle {} not seen within {} blocks of target - giving up",
                    handle.bundle_id,
                    1 + self.grace_blocks
                );
                BundleResult::NotIncluded
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::super::relay::{BundleHandle, SimulationReport};
    use super::*;
    use crate::error::BotError;
    use crate::types::SignedTx;
    use alloy::primitives::{Bytes, B256};
    use async_trait::async_trait;
    use std::sync::atomic::{AtomicU32, Ordering};

    /// Scriptable relay that counts calls per stage.
    struct MockRelay {
        sim_ok: bool,
        submit_fails: bool,
        resolution: Option<Resolution>, // None = never resolves
        simulate_calls: AtomicU32,
        submit_calls: AtomicU32,
    }

    impl MockRelay {
        fn new(sim_ok: bool, submit_fails: bool, resolution: Option<Resolution>) -> Self {
            Self {
                sim_ok,
                submit_fails,
                resolution,
                simulate_calls: AtomicU32::new(0),
                submit_calls: AtomicU32::new(0),
            }
        }
    }

    #[async_trait]
    impl RelayClient for MockRelay {
        async fn simulate(&self, _: &BundleRequest) -> Result<SimulationReport, BotError> {
            self.simulate_calls.fetch_add(1, Ordering::SeqCst);
            Ok(SimulationReport {
                ok: self.sim_ok,
                gas_used: 321_000,
                revert_reason: (!self.sim_ok).then(|| "insufficient output".to_string()),
            })
        }

        async fn submit(&self, b: &BundleRequest) -> Result<BundleHandle, BotError> {
            self.submit_calls.fetch_add(1, Ordering::SeqCst);
            if self.submit_fails {
                return Err(BotError::Submission("relay 503".into()));
            }
            Ok(BundleHandle {
                bundle_id: "test".into(),
                target_block: b.target_block,
            })
        }

        async fn wait_for_inclusion(&self, _: &BundleHandle) -> Result<Resolution, BotError> {
            match &self.resolution {
                Some(r) => Ok(r.clone()),
                None => futures::future::pending().await,
            }
        }
    }

    fn bundle() -> BundleRequest {
        BundleRequest {
            txs: vec![SignedTx {
                raw: Bytes::from(vec![1, 2, 3]),
                hash: B256::ZERO,
            }],
            target_block: 100,
        }
    }

    fn submitter(relay: Arc<MockRelay>) -> BundleSubmitter {
        BundleSubmitter::new(relay, 2, 1, 50)
    }

    #[tokio::test]
    async fn test_failed_simulation_never_submits() {
        let relay = Arc::new(MockRelay::new(false, false, None));
        let result = submitter(relay.clone()).execute(&bundle()).await;

        assert_eq!(
            result,
            BundleResult::SimulationFailed("insufficient output".into())
        );
        assert_eq!(relay.simulate_calls.load(Ordering::SeqCst), 1);
        assert_eq!(relay.submit_calls.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn test_submit_retries_are_bounded() {
        let relay = Arc::new(MockRelay::new(true, true, None));
        let result = submitter(relay.clone()).execute(&bundle()).await;

        assert!(matches!(result, BundleResult::SubmissionError(_)));
        // max_submit_retries = 2 -> three attempts total
        assert_eq!(relay.submit_calls.load(Ordering::SeqCst), 3);
    }

    #[tokio::test]
    async fn test_included_resolution() {
        let relay = Arc::new(MockRelay::new(
            true,
            false,
            Some(Resolution::Included {
                block: 100,
                gas_used: 321_000,
            }),
        ));
        let result = submitter(relay).execute(&bundle()).await;
        assert_eq!(
            result,
            BundleResult::Included {
                block: 100,
                gas_used: 321_000
            }
        );
    }

    #[tokio::test]
    async fn test_grace_window_expiry_is_not_included() {
        // Relay never resolves; (1 + grace) x block_time = 100ms window.
        let relay = Arc::new(MockRelay::new(true, false, None));
        let result = submitter(relay).execute(&bundle()).await;
        assert_eq!(result, BundleResult::NotIncluded);
    }

    #[tokio::test]
    async fn test_relay_drop_is_not_included() {
        let relay = Arc::new(MockRelay::new(true, false, Some(Resolution::Dropped)));
        let result = submitter(relay).execute(&bundle()).await;
        assert_eq!(result, BundleResult::NotIncluded);
    }
}
