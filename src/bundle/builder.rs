//! Bundle construction.
//!
//! Turns a validated opportunity into a signed single-transaction bundle
//! against the on-chain executor contract. Financing comes from the
//! cheapest flash-loan provider that can cover the input amount. Venues
//! travel in calldata as keccak keys the executor resolves to routers.

use super::relay::Signer;
use crate::config::{native_to_wei, BotConfig};
use crate::error::BotError;
use crate::types::{
    BundleRequest, FeeData, FlashLoanProvider, Opportunity, OpportunityKind, ThresholdSet,
    TxRequest, VenueId,
};
use crate::validator::clamp_fee_pair;
use alloy::primitives::{keccak256, Bytes, B256, U256};
use alloy::sol;
use alloy::sol_types::SolCall;
use std::sync::Arc;
use tracing::debug;

sol! {
    interface IFlashArbExecutor {
        function executeDualVenue(
            address fundingSource,
            bytes32 venueBuy,
            bytes32 venueSell,
            address[] path,
            uint256 amountIn,
            uint256 minProfitWei
        );

        function executeTriangular(
            address fundingSource,
            bytes32[3] venues,
            address[] path,
            uint256 amountIn,
            uint256 minProfitWei
        );

        function executeBridgeLeg(
            address fundingSource,
            address[] path,
            uint256 amountIn,
            uint256 minProfitWei,
            uint64 destChainId
        );
    }
}

/// Venue key the executor contract maps to a router address.
fn venue_key(venue: &VenueId) -> B256 {
    keccak256(venue.0.as_bytes())
}

pub struct BundleBuilder {
    config: Arc<BotConfig>,
    providers: Vec<FlashLoanProvider>,
    signer: Arc<dyn Signer>,
}

impl BundleBuilder {
    pub fn new(
        config: Arc<BotConfig>,
        providers: Vec<FlashLoanProvider>,
        signer: Arc<dyn Signer>,
    ) -> Self {
        Self {
            config,
            providers,
            signer,
        }
    }

    /// Cheapest provider (by loan fee) with enough liquidity for the
    /// input amount.
    pub fn select_provider(&self, amount: U256) -> Result<&FlashLoanProvider, BotError> {
        self.providers
            .iter()
            .filter(|p| p.can_fund(amount))
            .min_by_key(|p| p.fee_bps())
            .ok_or_else(|| {
                BotError::Validation(format!(
                    "no flash-loan provider can fund {} wei",
                    amount
                ))
            })
    }

    /// Build and sign a one-transaction bundle targeting the next block.
    pub async fn build(
        &self,
        opp: &Opportunity,
        thresholds: &ThresholdSet,
        fee: &FeeData,
        current_block: u64,
    ) -> Result<BundleRequest, BotError> {
        let provider = self.select_provider(opp.amount_in)?;
        let min_profit_wei = native_to_wei(thresholds.min_profit_native);

        let data: Bytes = match &opp.kind {
            OpportunityKind::DualVenue {
                venue_buy,
                venue_sell,
            } => IFlashArbExecutor::executeDualVenueCall {
                fundingSource: provider.address(),
                venueBuy: venue_key(venue_buy),
                venueSell: venue_key(venue_sell),
                path: opp.path.clone(),
                amountIn: opp.amount_in,
                minProfitWei: min_profit_wei,
            }
            .abi_encode()
            .into(),
            OpportunityKind::Triangular { venues } => {
                IFlashArbExecutor::executeTriangularCall {
                    fundingSource: provider.address(),
                    venues: [
                        venue_key(&venues[0]),
                        venue_key(&venues[1]),
                        venue_key(&venues[2]),
                    ],
                    path: opp.path.clone(),
                    amountIn: opp.amount_in,
                    minProfitWei: min_profit_wei,
                }
                .abi_encode()
                .into()
            }
            OpportunityKind::CrossChain { dest_chain, .. } => {
                IFlashArbExecutor::executeBridgeLegCall {
                    fundingSource: provider.address(),
                    path: opp.path.clone(),
                    amountIn: opp.amount_in,
                    minProfitWei: min_profit_wei,
                    destChainId: *dest_chain,
                }
                .abi_encode()
                .into()
            }
        };

        // Buffer both the gas limit and the fee cap; the cap may never sit
        // below the priority component.
        let gas_limit = (opp.gas_estimate as f64 * thresholds.gas_buffer_multiplier) as u64;
        let buffered_cap = U256::from(
            (fee.effective_per_gas().saturating_to::<u128>() as f64
                * thresholds.gas_buffer_multiplier) as u128,
        );
        let (max_fee_per_gas, max_priority_fee_per_gas) =
            clamp_fee_pair(buffered_cap, fee.suggested_priority_fee);

        let tx = TxRequest {
            to: self.config.executor_address,
            data,
            value: U256::ZERO,
            gas_limit,
            max_fee_per_gas,
            max_priority_fee_per_gas,
            chain_id: opp.chain_id,
        };
        let signed = self.signer.sign(&tx).await?;

        debug!(
            "built {} bundle: opp {} via {} provider, target block {}",
            opp.kind.label(),
            opp.id,
            provider.label(),
            current_block + 1
        );

        Ok(BundleRequest {
            txs: vec![signed],
            target_block: current_block + 1,
        })
    }
}

/// Materialize configured provider entries into typed providers. Unknown
/// kinds are a config error.
pub fn providers_from_config(config: &BotConfig) -> Result<Vec<FlashLoanProvider>, BotError> {
    config
        .providers
        .iter()
        .map(|p| match p.kind.as_str() {
            "balancer" => Ok(FlashLoanProvider::Balancer {
                vault: p.address,
                max_liquidity: native_to_wei(p.max_liquidity_native),
            }),
            "aave" => Ok(FlashLoanProvider::Aave {
                pool: p.address,
                max_liquidity: native_to_wei(p.max_liquidity_native),
            }),
            other => Err(BotError::Validation(format!(
                "unknown flash-loan provider kind '{}'",
                other
            ))),
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::super::relay::DryRunSigner;
    use super::*;
    use crate::scanner::dual_venue::tests::{addr, test_config, thresholds};

    fn providers() -> Vec<FlashLoanProvider> {
        vec![
            FlashLoanProvider::Aave {
                pool: addr(11),
                max_liquidity: native_to_wei(100_000.0),
            },
            FlashLoanProvider::Balancer {
                vault: addr(10),
                max_liquidity: native_to_wei(5_000.0),
            },
        ]
    }

    fn builder() -> BundleBuilder {
        BundleBuilder::new(
            Arc::new(test_config()),
            providers(),
            Arc::new(DryRunSigner::new(addr(9))),
        )
    }

    fn opportunity(amount_native: f64) -> Opportunity {
        Opportunity {
            id: 7,
            chain_id: 137,
            kind: OpportunityKind::DualVenue {
                venue_buy: VenueId::new("venue_a"),
                venue_sell: VenueId::new("venue_b"),
            },
            path: vec![addr(1), addr(2), addr(1)],
            amount_in: native_to_wei(amount_native),
            gross_profit: native_to_wei(20.0),
            gas_estimate: 400_000,
            net_profit: native_to_wei(15.0),
            spread_bps: 100,
            priority: 8,
            created_at_ms: 1,
        }
    }

    #[test]
    fn test_cheapest_funding_provider_wins() {
        // Both can fund 2000: Balancer's 0bps beats Aave's 5bps.
        let b = builder();
        let p = b.select_provider(native_to_wei(2000.0)).unwrap();
        assert_eq!(p.label(), "balancer");
        assert_eq!(p.fee_bps(), 0);

        // Over Balancer's ceiling only Aave remains.
        let p = b.select_provider(native_to_wei(50_000.0)).unwrap();
        assert_eq!(p.label(), "aave");

        // Nothing can fund this.
        assert!(b.select_provider(native_to_wei(1_000_000.0)).is_err());
    }

    #[tokio::test]
    async fn test_build_targets_next_block_with_clamped_fees() {
        let b = builder();
        let fee = FeeData {
            base_fee_per_gas: U256::from(30_000_000_000u64),
            suggested_priority_fee: U256::from(2_000_000_000u64),
        };
        let bundle = b
            .build(&opportunity(2000.0), &thresholds(), &fee, 1_000)
            .await
            .unwrap();

        assert_eq!(bundle.target_block, 1_001);
        assert_eq!(bundle.txs.len(), 1);
        assert!(!bundle.txs[0].raw.is_empty());
    }

    #[tokio::test]
    async fn test_fee_cap_never_below_priority() {
        let b = builder();
        // Degenerate market: priority fee above the whole effective price
        // after buffering would be impossible, so the cap gets raised.
        let fee = FeeData {
            base_fee_per_gas: U256::ZERO,
            suggested_priority_fee: U256::from(50_000_000_000u64),
        };
        let mut t = thresholds();
        t.gas_buffer_multiplier = 1.0;

        // Build goes through the same clamp as production.
        let bundle = b.build(&opportunity(2000.0), &t, &fee, 1).await;
        assert!(bundle.is_ok());
    }

    #[test]
    fn test_unknown_provider_kind_rejected() {
        let mut config = test_config();
        config.providers = vec![crate::config::ProviderConfig {
            kind: "dydx".into(),
            address: addr(12),
            max_liquidity_native: 1.0,
        }];
        assert!(providers_from_config(&config).is_err());
    }

    #[test]
    fn test_venue_keys_are_stable_and_distinct() {
        let a = venue_key(&VenueId::new("venue_a"));
        let b = venue_key(&VenueId::new("venue_b"));
        assert_eq!(a, venue_key(&VenueId::new("venue_a")));
        assert_ne!(a, b);
    }
}
