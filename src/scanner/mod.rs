//! Opportunity scanner.
//!
//! Evaluates candidate trades through the read-only `ChainReader` surface:
//! two-venue round trips, fixed three-hop cycles, and cross-chain spreads.
//! One pair's failure never aborts the rest of the cycle - errors are
//! collected into the report and the scan continues.

pub mod cross_chain;
pub mod dual_venue;
pub mod priority;
pub mod triangular;

use crate::chain::ChainReader;
use crate::config::BotConfig;
use crate::error::BotError;
use crate::types::{ChainId, Opportunity, ThresholdSet};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use tracing::debug;

/// Result of one scan cycle: surviving candidates plus collected errors.
#[derive(Debug, Default)]
pub struct ScanReport {
    pub candidates: Vec<Opportunity>,
    pub errors: Vec<BotError>,
    pub paths_scanned: usize,
}

impl ScanReport {
    fn merge(&mut self, other: ScanReport) {
        self.candidates.extend(other.candidates);
        self.errors.extend(other.errors);
        self.paths_scanned += other.paths_scanned;
    }
}

pub struct OpportunityScanner {
    config: Arc<BotConfig>,
    next_id: AtomicU64,
}

impl OpportunityScanner {
    pub fn new(config: Arc<BotConfig>) -> Self {
        Self {
            config,
            next_id: AtomicU64::new(1),
        }
    }

    pub(crate) fn config(&self) -> &BotConfig {
        &self.config
    }

    pub(crate) fn allocate_id(&self) -> u64 {
        self.next_id.fetch_add(1, Ordering::Relaxed)
    }

    pub(crate) fn chain_preference(&self, chain_id: ChainId) -> u8 {
        self.config
            .chains
            .iter()
            .find(|c| c.chain_id == chain_id)
            .map(|c| c.preference)
            .unwrap_or(0)
    }

    /// Scan one chain for dual-venue and (if enabled) triangular
    /// opportunities. Candidates come back sorted into execution order.
    pub async fn scan_chain(
        &self,
        reader: &dyn ChainReader,
        thresholds: &ThresholdSet,
    ) -> ScanReport {
        let mut report = ScanReport::default();

        report.merge(self.scan_dual_venue(reader, thresholds).await);

        if self.config.enable_triangular {
            report.merge(self.scan_triangular(reader, thresholds).await);
        }

        priority::sort_candidates(&mut report.candidates);
        debug!(
            "scan chain {}: {} paths, {} candidates, {} errors",
            reader.chain_id(),
            report.paths_scanned,
            report.candidates.len(),
            report.errors.len()
        );
        report
    }

    /// Scan all configured bridge routes between two chains.
    pub async fn scan_cross_chain_routes(
        &self,
        source: &dyn ChainReader,
        dest: &dyn ChainReader,
        thresholds: &ThresholdSet,
    ) -> ScanReport {
        let mut report = ScanReport::default();
        if !self.config.enable_cross_chain {
            return report;
        }
        for route in self
            .config
            .bridge_routes
            .iter()
            .filter(|r| r.source_chain == source.chain_id() && r.dest_chain == dest.chain_id())
        {
            report.paths_scanned += 1;
            match self.check_bridge_route(source, dest, route, thresholds).await {
                Ok(Some(opp)) => report.candidates.push(opp),
                Ok(None) => {}
                Err(e) => report.errors.push(e),
            }
        }
        priority::sort_candidates(&mut report.candidates);
        report
    }
}
