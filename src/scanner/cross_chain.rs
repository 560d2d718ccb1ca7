//! Bridge-route scan: buy on the source chain, bridge, sell on the dest
//! chain.
//!
//! Both legs are priced against the configured quote token through the
//! read-only `ChainReader` surface. The bridge itself is modelled by its
//! configured fee (bps, taken out of the bridged amount) and a transit
//! time estimate; routes slower than `max_bridge_transit_secs` are
//! skipped outright since the price gap rarely survives the crossing.
//! Spread math runs on `Decimal` so the bps gate is exact.

use super::dual_venue::{buffered_gas_cost, DUAL_VENUE_GAS_UNITS};
use super::OpportunityScanner;
use crate::chain::{with_retry, ChainReader, QuoteOutcome};
use crate::config::{native_to_wei, BridgeRouteConfig};
use crate::error::BotError;
use crate::types::{wei_to_native, Opportunity, OpportunityKind, ThresholdSet, VenueId};
use alloy::primitives::U256;
use rust_decimal::prelude::ToPrimitive;
use rust_decimal::Decimal;
use tracing::debug;

/// One swap on each chain.
pub const CROSS_CHAIN_GAS_UNITS: u64 = 2 * DUAL_VENUE_GAS_UNITS;

const BPS_DENOMINATOR: u64 = 10_000;

/// Wei amount as a Decimal with 18 fractional digits. None past the
/// 96-bit mantissa.
fn wei_decimal(value: U256) -> Option<Decimal> {
    let v = i128::try_from(value.saturating_to::<u128>()).ok()?;
    Decimal::try_from_i128_with_scale(v, 18).ok()
}

/// Spread of a round trip in basis points, computed exactly in decimal
/// and truncated. Saturates to `u32::MAX` for amounts Decimal cannot
/// represent.
pub(crate) fn spread_bps_exact(gross: U256, amount_in: U256) -> u32 {
    if amount_in.is_zero() {
        return 0;
    }
    let (g, a) = match (wei_decimal(gross), wei_decimal(amount_in)) {
        (Some(g), Some(a)) => (g, a),
        _ => return u32::MAX,
    };
    (g / a * Decimal::from(BPS_DENOMINATOR))
        .trunc()
        .to_u32()
        .unwrap_or(u32::MAX)
}

impl OpportunityScanner {
    /// Evaluate one configured bridge route across every candidate amount
    /// and venue pairing, keeping the best surviving candidate.
    pub(super) async fn check_bridge_route(
        &self,
        source: &dyn ChainReader,
        dest: &dyn ChainReader,
        route: &BridgeRouteConfig,
        thresholds: &ThresholdSet,
    ) -> Result<Option<Opportunity>, BotError> {
        if route.transit_secs_estimate > self.config().max_bridge_transit_secs {
            debug!(
                "bridge {} {}->{}: transit {}s over the {}s limit - skipping",
                route.bridge,
                route.source_chain,
                route.dest_chain,
                route.transit_secs_estimate,
                self.config().max_bridge_transit_secs
            );
            return Ok(None);
        }

        let retries = self.config().max_rpc_retries;
        let source_fee =
            with_retry("fee_data_source", retries, || source.fee_data()).await?;
        let dest_fee = with_retry("fee_data_dest", retries, || dest.fee_data()).await?;

        // Gas is paid once per chain.
        let gas_cost = buffered_gas_cost(
            DUAL_VENUE_GAS_UNITS,
            &source_fee,
            thresholds.gas_buffer_multiplier,
        ) + buffered_gas_cost(
            DUAL_VENUE_GAS_UNITS,
            &dest_fee,
            thresholds.gas_buffer_multiplier,
        );

        let mut best: Option<Opportunity> = None;
        for &amount_native in &self.config().candidate_amounts_native {
            let amount_in = native_to_wei(amount_native);
            for venue_buy in &self.config().venues {
                for venue_sell in &self.config().venues {
                    let candidate = self
                        .check_bridge_trip(
                            source, dest, route, venue_buy, venue_sell, amount_in, gas_cost,
                            thresholds,
                        )
                        .await?;
                    if let Some(opp) = candidate {
                        match &best {
                            Some(current) if !opp.outranks(current) => {}
                            _ => best = Some(opp),
                        }
                    }
                }
            }
        }
        Ok(best)
    }

    #[allow(clippy::too_many_arguments)]
    async fn check_bridge_trip(
        &self,
        source: &dyn ChainReader,
        dest: &dyn ChainReader,
        route: &BridgeRouteConfig,
        venue_buy: &VenueId,
        venue_sell: &VenueId,
        amount_in: U256,
        gas_cost: U256,
        thresholds: &ThresholdSet,
    ) -> Result<Option<Opportunity>, BotError> {
        let retries = self.config().max_rpc_retries;
        let quote_token = self.config().quote_token;

        // Buy the bridged token on the source chain.
        let bought = with_retry("quote_bridge_buy", retries, || {
            source.quote(venue_buy, quote_token, route.token, amount_in)
        })
        .await?;
        let bought = match bought {
            QuoteOutcome::Amount(a) if !a.is_zero() => a,
            _ => return Ok(None),
        };

        // The bridge takes its cut of the transferred amount.
        let bridged = bought * U256::from(BPS_DENOMINATOR - route.fee_bps as u64)
            / U256::from(BPS_DENOMINATOR);

        // Sell what arrives on the destination chain.
        let sold = with_retry("quote_bridge_sell", retries, || {
            dest.quote(venue_sell, route.token, quote_token, bridged)
        })
        .await?;
        let round_trip_out = match sold {
            QuoteOutcome::Amount(a) => a,
            QuoteOutcome::Unavailable => return Ok(None),
        };

        if round_trip_out <= amount_in {
            return Ok(None);
        }
        let gross = round_trip_out - amount_in;

        let spread = spread_bps_exact(gross, amount_in);
        if spread <= thresholds.min_spread_bps {
            debug!(
                "bridge {} {}->{}: spread {}bps does not exceed {}bps minimum",
                route.bridge,
                route.source_chain,
                route.dest_chain,
                spread,
                thresholds.min_spread_bps
            );
            return Ok(None);
        }

        if gross <= gas_cost {
            return Ok(None);
        }
        let net = gross - gas_cost;

        let priority = super::priority::score(
            wei_to_native(net),
            spread,
            self.chain_preference(route.source_chain),
        );

        Ok(Some(Opportunity {
            id: self.allocate_id(),
            chain_id: route.source_chain,
            kind: OpportunityKind::CrossChain {
                source_chain: route.source_chain,
                dest_chain: route.dest_chain,
                bridge: route.bridge.clone(),
                transit_secs: route.transit_secs_estimate,
            },
            path: vec![quote_token, route.token, quote_token],
            amount_in,
            gross_profit: gross,
            gas_estimate: CROSS_CHAIN_GAS_UNITS,
            net_profit: net,
            spread_bps: spread,
            priority,
            created_at_ms: crate::types::unix_ms(),
        }))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::chain::FixtureReader;
    use crate::scanner::dual_venue::tests::{addr, fee_for_5_native, test_config, thresholds};
    use std::sync::Arc;

    fn route(transit_secs: u64, fee_bps: u32) -> BridgeRouteConfig {
        BridgeRouteConfig {
            token: addr(2),
            source_chain: 137,
            dest_chain: 8453,
            bridge: "stargate".into(),
            transit_secs_estimate: transit_secs,
            fee_bps,
        }
    }

    fn scanner_with_route(r: BridgeRouteConfig) -> OpportunityScanner {
        let mut config = test_config();
        config.enable_cross_chain = true;
        config.bridge_routes = vec![r];
        OpportunityScanner::new(Arc::new(config))
    }

    /// Source chain prices the token at 2000 quote units, dest at `dest_price`.
    fn readers(dest_price: u128) -> (FixtureReader, FixtureReader) {
        let va = VenueId::new("venue_a");
        let mut source = FixtureReader::new(137, fee_for_5_native(), 100);
        source.set_rate(&va, addr(1), addr(2), 1, 2000);
        let mut dest = FixtureReader::new(8453, fee_for_5_native(), 200);
        dest.set_rate(&va, addr(2), addr(1), dest_price, 1);
        (source, dest)
    }

    #[tokio::test]
    async fn test_bridge_spread_nets_after_fee_and_both_gas_legs() {
        // 2000 in buys 1 token, bridge keeps 50bps, dest sells the rest
        // at 2040: out 2029.8, gross 29.8, minus 5 gas per chain -> 19.8.
        let scanner = scanner_with_route(route(120, 50));
        let (source, dest) = readers(2040);

        let report = scanner
            .scan_cross_chain_routes(&source, &dest, &thresholds())
            .await;
        assert!(report.errors.is_empty());
        assert_eq!(report.candidates.len(), 1);

        let opp = &report.candidates[0];
        assert_eq!(
            opp.gross_profit,
            U256::from(29_800_000_000_000_000_000u128)
        );
        assert_eq!(opp.net_profit, U256::from(19_800_000_000_000_000_000u128));
        assert_eq!(opp.spread_bps, 149);
        assert_eq!(opp.gas_estimate, CROSS_CHAIN_GAS_UNITS);
        match &opp.kind {
            OpportunityKind::CrossChain {
                source_chain,
                dest_chain,
                bridge,
                transit_secs,
            } => {
                assert_eq!(*source_chain, 137);
                assert_eq!(*dest_chain, 8453);
                assert_eq!(bridge, "stargate");
                assert_eq!(*transit_secs, 120);
            }
            other => panic!("unexpected kind {:?}", other),
        }
    }

    #[tokio::test]
    async fn test_slow_route_is_skipped() {
        // max_bridge_transit_secs is 300 in the test config.
        let scanner = scanner_with_route(route(900, 50));
        let (source, dest) = readers(2040);

        let report = scanner
            .scan_cross_chain_routes(&source, &dest, &thresholds())
            .await;
        assert!(report.candidates.is_empty());
        assert!(report.errors.is_empty());
    }

    #[tokio::test]
    async fn test_spread_equal_to_minimum_is_rejected() {
        // The fixture trip is exactly 149bps; the gate wants strictly more.
        let scanner = scanner_with_route(route(120, 50));
        let (source, dest) = readers(2040);
        let mut t = thresholds();
        t.min_spread_bps = 149;

        let report = scanner.scan_cross_chain_routes(&source, &dest, &t).await;
        assert!(report.candidates.is_empty());

        t.min_spread_bps = 148;
        let report = scanner.scan_cross_chain_routes(&source, &dest, &t).await;
        assert_eq!(report.candidates.len(), 1);
    }

    #[tokio::test]
    async fn test_bridge_fee_can_erase_the_gap() {
        // 2% price gap, 3% bridge fee: the round trip comes back short.
        let scanner = scanner_with_route(route(120, 300));
        let (source, dest) = readers(2040);

        let report = scanner
            .scan_cross_chain_routes(&source, &dest, &thresholds())
            .await;
        assert!(report.candidates.is_empty());
    }

    #[tokio::test]
    async fn test_disabled_toggle_scans_nothing() {
        let mut config = test_config();
        config.enable_cross_chain = false;
        config.bridge_routes = vec![route(120, 50)];
        let scanner = OpportunityScanner::new(Arc::new(config));
        let (source, dest) = readers(2040);

        let report = scanner
            .scan_cross_chain_routes(&source, &dest, &thresholds())
            .await;
        assert!(report.candidates.is_empty());
        assert_eq!(report.paths_scanned, 0);
    }

    #[test]
    fn test_wei_scaling_is_exact() {
        use rust_decimal_macros::dec;
        let g = Decimal::from_i128_with_scale(29_800_000_000_000_000_000i128, 18);
        assert_eq!(g, dec!(29.8));
    }

    #[test]
    fn test_spread_bps_exact_truncates() {
        // 29.8 / 2000 = 149bps exactly
        assert_eq!(
            spread_bps_exact(
                U256::from(29_800_000_000_000_000_000u128),
                native_to_wei(2000.0)
            ),
            149
        );
        assert_eq!(spread_bps_exact(U256::ZERO, native_to_wei(1.0)), 0);
        assert_eq!(spread_bps_exact(U256::from(1u64), U256::ZERO), 0);
    }

    #[test]
    fn test_unrepresentable_amounts_saturate_instead_of_panicking() {
        // Past Decimal's 96-bit mantissa (but still a valid i128)...
        let huge = U256::from(1u8) << 100;
        assert_eq!(spread_bps_exact(huge, native_to_wei(1.0)), u32::MAX);
        // ...and past i128 entirely.
        let absurd = U256::from(1u8) << 200;
        assert_eq!(spread_bps_exact(absurd, native_to_wei(1.0)), u32::MAX);
        assert_eq!(spread_bps_exact(native_to_wei(1.0), huge), u32::MAX);
    }
}
