//! Deterministic priority scoring and candidate ordering.
//!
//! The score is a fixed weighted sum with a documented range of
//! 0..=13: net-profit bucket (0/1/3/5) + spread bucket (0/1/2/3) +
//! configured chain preference (0..=5). Identical inputs always produce
//! identical scores, and the full candidate ordering
//! (priority desc, net profit desc, earliest creation first) is total.

use crate::types::Opportunity;

/// Net-profit bucket thresholds, native units.
const PROFIT_HIGH: f64 = 0.1;
const PROFIT_MID: f64 = 0.05;
const PROFIT_LOW: f64 = 0.01;

/// Spread bucket thresholds, basis points.
const SPREAD_HIGH_BPS: u32 = 100; // 1%
const SPREAD_MID_BPS: u32 = 50; // 0.5%
const SPREAD_LOW_BPS: u32 = 20; // 0.2%

/// Highest chain-preference contribution.
const CHAIN_PREFERENCE_CAP: u8 = 5;

/// Score an opportunity. Output is always in 0..=Opportunity::PRIORITY_MAX.
pub fn score(net_profit_native: f64, spread_bps: u32, chain_preference: u8) -> u8 {
    let profit_bucket: u8 = if net_profit_native > PROFIT_HIGH {
        5
    } else if net_profit_native > PROFIT_MID {
        3
    } else if net_profit_native > PROFIT_LOW {
        1
    } else {
        0
    };

    let spread_bucket: u8 = if spread_bps > SPREAD_HIGH_BPS {
        3
    } else if spread_bps > SPREAD_MID_BPS {
        2
    } else if spread_bps > SPREAD_LOW_BPS {
        1
    } else {
        0
    };

    profit_bucket + spread_bucket + chain_preference.min(CHAIN_PREFERENCE_CAP)
}

/// Sort candidates into execution order: priority desc, net profit desc,
/// ties broken by earliest creation timestamp.
pub fn sort_candidates(candidates: &mut [Opportunity]) {
    candidates.sort_by(|a, b| b.ranking_key().cmp(&a.ranking_key()));
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::{OpportunityKind, VenueId};
    use alloy::primitives::{Address, U256};

    #[test]
    fn test_score_buckets() {
        // Profit buckets alone
        assert_eq!(score(0.2, 0, 0), 5);
        assert_eq!(score(0.06, 0, 0), 3);
        assert_eq!(score(0.02, 0, 0), 1);
        assert_eq!(score(0.005, 0, 0), 0);
        // Spread buckets alone
        assert_eq!(score(0.0, 150, 0), 3);
        assert_eq!(score(0.0, 60, 0), 2);
        assert_eq!(score(0.0, 30, 0), 1);
        assert_eq!(score(0.0, 10, 0), 0);
        // Everything maxed stays at the documented ceiling
        assert_eq!(score(1.0, 1_000, 200), Opportunity::PRIORITY_MAX);
    }

    #[test]
    fn test_score_is_deterministic() {
        for _ in 0..10 {
            assert_eq!(score(0.07, 55, 2), score(0.07, 55, 2));
        }
    }

    fn opp(id: u64, priority: u8, net: u64, created: u64) -> Opportunity {
        Opportunity {
            id,
            chain_id: 137,
            kind: OpportunityKind::DualVenue {
                venue_buy: VenueId::new("a"),
                venue_sell: VenueId::new("b"),
            },
            path: vec![Address::ZERO],
            amount_in: U256::from(100u64),
            gross_profit: U256::from(net),
            gas_estimate: 400_000,
            net_profit: U256::from(net),
            spread_bps: 30,
            priority,
            created_at_ms: created,
        }
    }

    #[test]
    fn test_sort_order_reproducible() {
        let mut candidates = vec![
            opp(1, 3, 100, 10),
            opp(2, 8, 50, 20),
            opp(3, 8, 50, 5), // same priority+profit as #2, older
            opp(4, 8, 90, 30),
        ];
        sort_candidates(&mut candidates);
        let ids: Vec<u64> = candidates.iter().map(|o| o.id).collect();
        assert_eq!(ids, vec![4, 3, 2, 1]);

        // Shuffled input produces the identical order
        let mut shuffled = vec![
            opp(2, 8, 50, 20),
            opp(4, 8, 90, 30),
            opp(1, 3, 100, 10),
            opp(3, 8, 50, 5),
        ];
        sort_candidates(&mut shuffled);
        let ids2: Vec<u64> = shuffled.iter().map(|o| o.id).collect();
        assert_eq!(ids, ids2);
    }
}
