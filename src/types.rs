// Core data structures shared across the pipeline.

use alloy::primitives::{Address, Bytes, B256, U256};
use serde::{Deserialize, Serialize};
use std::fmt;

pub type ChainId = u64;

/// Identifier for an execution venue (DEX router/pool family) on a chain.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct VenueId(pub String);

impl VenueId {
    pub fn new(name: impl Into<String>) -> Self {
        Self(name.into())
    }
}

impl fmt::Display for VenueId {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Current fee market snapshot from a chain.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FeeData {
    pub base_fee_per_gas: U256,
    pub suggested_priority_fee: U256,
}

impl FeeData {
    /// Effective per-gas price a bundle pays if included next block.
    pub fn effective_per_gas(&self) -> U256 {
        self.base_fee_per_gas + self.suggested_priority_fee
    }
}

/// Block metadata surfaced by the reader; gas figures feed the watcher's
/// utilization log.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BlockInfo {
    pub number: u64,
    pub gas_used: u64,
    pub gas_limit: u64,
}

impl BlockInfo {
    /// Gas used as a fraction of the limit, 0.0..=1.0.
    pub fn utilization(&self) -> f64 {
        if self.gas_limit == 0 {
            return 0.0;
        }
        self.gas_used as f64 / self.gas_limit as f64
    }
}

/// Wall-clock milliseconds since the Unix epoch.
pub fn unix_ms() -> u64 {
    std::time::SystemTime::now()
        .duration_since(std::time::UNIX_EPOCH)
        .map(|d| d.as_millis() as u64)
        .unwrap_or_default()
}

/// Convert a wei amount to native units (18 decimals) for display/thresholds.
pub fn wei_to_native(wei: U256) -> f64 {
    wei.saturating_to::<u128>() as f64 / 1e18
}

/// Opportunity class payload. Which venues/chains the trade touches.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum OpportunityKind {
    /// Two-venue round trip on one chain: buy on one venue, sell on the other.
    DualVenue { venue_buy: VenueId, venue_sell: VenueId },
    /// Fixed three-hop cycle X -> Y -> Z -> X, one venue per hop.
    Triangular { venues: [VenueId; 3] },
    /// Same token on two chains, settled via a bridge route.
    CrossChain {
        source_chain: ChainId,
        dest_chain: ChainId,
        bridge: String,
        transit_secs: u64,
    },
}

impl OpportunityKind {
    pub fn label(&self) -> &'static str {
        match self {
            OpportunityKind::DualVenue { .. } => "dual_venue",
            OpportunityKind::Triangular { .. } => "triangular",
            OpportunityKind::CrossChain { .. } => "cross_chain",
        }
    }
}

/// A scored arbitrage candidate. Immutable once created: downstream stages
/// derive adjusted copies instead of mutating.
#[derive(Debug, Clone)]
pub struct Opportunity {
    pub id: u64,
    pub chain_id: ChainId,
    pub kind: OpportunityKind,
    /// Token path, starting and ending at the financed token.
    pub path: Vec<Address>,
    pub amount_in: U256,
    pub gross_profit: U256,
    /// Estimated gas units for the atomic execution.
    pub gas_estimate: u64,
    /// Gross profit minus buffered gas cost (and bridge fee for cross-chain).
    pub net_profit: U256,
    pub spread_bps: u32,
    /// Deterministic score in 0..=PRIORITY_MAX (see scanner::priority).
    pub priority: u8,
    pub created_at_ms: u64,
}

impl Opportunity {
    /// Upper bound of the priority score: profit bucket (5) + spread
    /// bucket (3) + chain preference (5).
    pub const PRIORITY_MAX: u8 = 13;

    pub fn net_profit_native(&self) -> f64 {
        wei_to_native(self.net_profit)
    }

    /// Derived copy with profit discounted for expected slippage. The
    /// original record is left untouched.
    pub fn with_slippage_discount(&self, slippage_buffer_bps: u32) -> Self {
        let keep = 10_000u64.saturating_sub(slippage_buffer_bps as u64);
        let adjusted = self.net_profit * U256::from(keep) / U256::from(10_000u64);
        Self {
            net_profit: adjusted,
            ..self.clone()
        }
    }

    /// Ordering key: priority desc, net profit desc, oldest first.
    pub fn ranking_key(&self) -> (u8, U256, std::cmp::Reverse<u64>) {
        (self.priority, self.net_profit, std::cmp::Reverse(self.created_at_ms))
    }

    /// True if this candidate should replace `other` in the execution slot.
    pub fn outranks(&self, other: &Opportunity) -> bool {
        self.ranking_key() > other.ranking_key()
    }
}

/// Tunable thresholds consumed by the scanner and bundle builder. Proposed
/// by the optimizer, always validator-checked before use.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ThresholdSet {
    /// Minimum acceptable net profit, in native units.
    pub min_profit_native: f64,
    /// Minimum spread in basis points for a candidate to survive the scan.
    pub min_spread_bps: u32,
    /// Multiplier applied to the estimated gas cost (>= 1.0).
    pub gas_buffer_multiplier: f64,
    /// Expected-slippage discount applied to candidate profit, in bps.
    pub slippage_buffer_bps: u32,
}

/// Read-only copy of the governor's state. Other components never see the
/// owned state directly.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct RiskSnapshot {
    pub cumulative_loss_native: f64,
    pub last_execution_ms: u64,
    pub breaker_tripped: bool,
}

/// An unsigned transaction handed to the external signer.
#[derive(Debug, Clone)]
pub struct TxRequest {
    pub to: Address,
    pub data: Bytes,
    pub value: U256,
    pub gas_limit: u64,
    pub max_fee_per_gas: U256,
    pub max_priority_fee_per_gas: U256,
    pub chain_id: ChainId,
}

/// A signed, relay-ready transaction.
#[derive(Debug, Clone)]
pub struct SignedTx {
    pub raw: Bytes,
    pub hash: B256,
}

/// Ordered transaction set targeting a specific block.
#[derive(Debug, Clone)]
pub struct BundleRequest {
    pub txs: Vec<SignedTx>,
    pub target_block: u64,
}

/// Terminal outcome of one execution attempt.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum BundleResult {
    /// Simulation rejected the bundle; nothing was broadcast.
    SimulationFailed(String),
    Included { block: u64, gas_used: u64 },
    /// Target block (plus grace) passed without inclusion. Expected,
    /// unprofitable-this-time outcome - not an error.
    NotIncluded,
    SubmissionError(String),
}

impl BundleResult {
    pub fn label(&self) -> &'static str {
        match self {
            BundleResult::SimulationFailed(_) => "simulation_failed",
            BundleResult::Included { .. } => "included",
            BundleResult::NotIncluded => "not_included",
            BundleResult::SubmissionError(_) => "submission_error",
        }
    }
}

/// Execution outcome fed back into the risk governor and optimizer.
#[derive(Debug, Clone)]
pub struct ExecutionOutcome {
    pub opportunity_id: u64,
    pub result: BundleResult,
    /// Realized profit (negative = loss) in native units. Zero when nothing
    /// was broadcast.
    pub pnl_native: f64,
}

/// Flash-loan financing source. A tagged variant with a uniform capability
/// surface - selection never inspects runtime types.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FlashLoanProvider {
    Balancer { vault: Address, max_liquidity: U256 },
    Aave { pool: Address, max_liquidity: U256 },
}

impl FlashLoanProvider {
    /// Loan fee in basis points. Balancer vaults lend fee-free; Aave V3
    /// charges 5 bps.
    pub fn fee_bps(&self) -> u32 {
        match self {
            FlashLoanProvider::Balancer { .. } => 0,
            FlashLoanProvider::Aave { .. } => 5,
        }
    }

    pub fn address(&self) -> Address {
        match self {
            FlashLoanProvider::Balancer { vault, .. } => *vault,
            FlashLoanProvider::Aave { pool, .. } => *pool,
        }
    }

    pub fn can_fund(&self, amount: U256) -> bool {
        match self {
            FlashLoanProvider::Balancer { max_liquidity, .. }
            | FlashLoanProvider::Aave { max_liquidity, .. } => *max_liquidity >= amount,
        }
    }

    pub fn label(&self) -> &'static str {
        match self {
            FlashLoanProvider::Balancer { .. } => "balancer",
            FlashLoanProvider::Aave { .. } => "aave",
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn opp(priority: u8, net: u64, created: u64) -> Opportunity {
        Opportunity {
            id: 1,
            chain_id: 137,
            kind: OpportunityKind::DualVenue {
                venue_buy: VenueId::new("uniswap_v3"),
                venue_sell: VenueId::new("sushiswap_v3"),
            },
            path: vec![Address::ZERO],
            amount_in: U256::from(1_000u64),
            gross_profit: U256::from(net + 5),
            gas_estimate: 400_000,
            net_profit: U256::from(net),
            spread_bps: 30,
            priority,
            created_at_ms: created,
        }
    }

    #[test]
    fn test_ranking_priority_then_profit_then_age() {
        // Higher priority wins
        assert!(opp(5, 10, 100).outranks(&opp(3, 999, 100)));
        // Same priority: higher net profit wins
        assert!(opp(5, 20, 100).outranks(&opp(5, 10, 100)));
        // Full tie: earlier creation wins
        assert!(opp(5, 10, 50).outranks(&opp(5, 10, 100)));
        assert!(!opp(5, 10, 100).outranks(&opp(5, 10, 50)));
    }

    #[test]
    fn test_slippage_discount_derives_copy() {
        let o = opp(5, 10_000, 100);
        let adjusted = o.with_slippage_discount(100); // 1%
        assert_eq!(adjusted.net_profit, U256::from(9_900u64));
        // Original untouched
        assert_eq!(o.net_profit, U256::from(10_000u64));
    }

    #[test]
    fn test_provider_selection_surface() {
        let balancer = FlashLoanProvider::Balancer {
            vault: Address::ZERO,
            max_liquidity: U256::from(100u64),
        };
        let aave = FlashLoanProvider::Aave {
            pool: Address::ZERO,
            max_liquidity: U256::from(1_000u64),
        };
        assert_eq!(balancer.fee_bps(), 0);
        assert_eq!(aave.fee_bps(), 5);
        assert!(!balancer.can_fund(U256::from(500u64)));
        assert!(aave.can_fund(U256::from(500u64)));
    }

    #[test]
    fn test_wei_to_native() {
        let one = U256::from(10u64).pow(U256::from(18u64));
        assert!((wei_to_native(one) - 1.0).abs() < 1e-12);
    }
}
