//! Two-venue round-trip scan.
//!
//! For each configured pair and candidate amount, query the round trip in
//! both venue orders (buy on A / sell on B, and the reverse). An opportunity
//! exists when the round-trip output exceeds the input. Gross profit is
//! round-trip output minus input; net profit subtracts the buffered gas
//! cost. Candidates below the minimum spread or with non-positive net are
//! discarded here, before the validator stage ever sees them.

use super::{OpportunityScanner, ScanReport};
use crate::chain::{with_retry, ChainReader, QuoteOutcome};
use crate::config::{native_to_wei, PairConfig};
use crate::types::{
    wei_to_native, FeeData, Opportunity, OpportunityKind, ThresholdSet, VenueId,
};
use alloy::primitives::U256;
use tracing::debug;

/// Estimated gas units for a two-leg atomic execution (flash loan + two
/// swaps + repayment).
pub const DUAL_VENUE_GAS_UNITS: u64 = 400_000;

/// Buffered gas cost in wei: units x effective per-gas price x buffer.
pub(crate) fn buffered_gas_cost(gas_units: u64, fee: &FeeData, buffer: f64) -> U256 {
    let per_gas = fee.effective_per_gas().saturating_to::<u128>();
    let raw = per_gas.saturating_mul(gas_units as u128);
    U256::from((raw as f64 * buffer) as u128)
}

/// Spread of a round trip in basis points, relative to the input amount.
pub(crate) fn spread_bps(gross: U256, amount_in: U256) -> u32 {
    if amount_in.is_zero() {
        return 0;
    }
    (gross * U256::from(10_000u64) / amount_in).saturating_to::<u32>()
}

impl OpportunityScanner {
    pub(super) async fn scan_dual_venue(
        &self,
        reader: &dyn ChainReader,
        thresholds: &ThresholdSet,
    ) -> ScanReport {
        let mut report = ScanReport::default();

        let fee = match with_retry("fee_data", self.config().max_rpc_retries, || {
            reader.fee_data()
        })
        .await
        {
            Ok(fee) => fee,
            Err(e) => {
                // No fee data means no net-profit math for this cycle.
                report.errors.push(e);
                return report;
            }
        };

        let venues = &self.config().venues;
        for pair in &self.config().pairs {
            for &amount_native in &self.config().candidate_amounts_native {
                let amount_in = native_to_wei(amount_native);
                for buy in venues {
                    for sell in venues.iter().filter(|v| *v != buy) {
                        report.paths_scanned += 1;
                        match self
                            .check_round_trip(
                                reader, pair, buy, sell, amount_in, &fee, thresholds,
                            )
                            .await
                        {
                            Ok(Some(opp)) => report.candidates.push(opp),
                            Ok(None) => {}
                            Err(e) => report.errors.push(e),
                        }
                    }
                }
            }
        }
        report
    }

    /// Evaluate one ordered (buy venue, sell venue) round trip.
    #[allow(clippy::too_many_arguments)]
    async fn check_round_trip(
        &self,
        reader: &dyn ChainReader,
        pair: &PairConfig,
        venue_buy: &VenueId,
        venue_sell: &VenueId,
        amount_in: U256,
        fee: &FeeData,
        thresholds: &ThresholdSet,
    ) -> Result<Option<Opportunity>, crate::error::BotError> {
        let retries = self.config().max_rpc_retries;

        // Leg 1: token0 -> token1 on the buy venue
        let leg1 = with_retry("quote_leg1", retries, || {
            reader.quote(venue_buy, pair.token0, pair.token1, amount_in)
        })
        .await?;
        let mid_amount = match leg1 {
            QuoteOutcome::Amount(a) if !a.is_zero() => a,
            _ => {
                debug!("{}: no liquidity on {} - skipping", pair.symbol, venue_buy);
                return Ok(None);
            }
        };

        // Leg 2: token1 -> token0 on the sell venue
        let leg2 = with_retry("quote_leg2", retries, || {
            reader.quote(venue_sell, pair.token1, pair.token0, mid_amount)
        })
        .await?;
        let round_trip_out = match leg2 {
            QuoteOutcome::Amount(a) => a,
            QuoteOutcome::Unavailable => {
                debug!("{}: no liquidity on {} - skipping", pair.symbol, venue_sell);
                return Ok(None);
            }
        };

        if round_trip_out <= amount_in {
            return Ok(None);
        }
        let gross = round_trip_out - amount_in;

        // The spread must strictly exceed the minimum.
        let spread = spread_bps(gross, amount_in);
        if spread <= thresholds.min_spread_bps {
            debug!(
                "{}: spread {}bps does not exceed {}bps minimum ({} -> {})",
                pair.symbol, spread, thresholds.min_spread_bps, venue_buy, venue_sell
            );
            return Ok(None);
        }

        let gas_cost =
            buffered_gas_cost(DUAL_VENUE_GAS_UNITS, fee, thresholds.gas_buffer_multiplier);
        if gross <= gas_cost {
            debug!(
                "{}: gross {} does not cover buffered gas {} - skipping",
                pair.symbol, gross, gas_cost
            );
            return Ok(None);
        }
        let net = gross - gas_cost;

        let chain_id = reader.chain_id();
        let priority = super::priority::score(
            wei_to_native(net),
            spread,
            self.chain_preference(chain_id),
        );

        Ok(Some(Opportunity {
            id: self.allocate_id(),
            chain_id,
            kind: OpportunityKind::DualVenue {
                venue_buy: venue_buy.clone(),
                venue_sell: venue_sell.clone(),
            },
            path: vec![pair.token0, pair.token1, pair.token0],
            amount_in,
            gross_profit: gross,
            gas_estimate: DUAL_VENUE_GAS_UNITS,
            net_profit: net,
            spread_bps: spread,
            priority,
            created_at_ms: crate::types::unix_ms(),
        }))
    }
}
