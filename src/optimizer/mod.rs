//! Adaptive threshold proposals from rolling market observations.
//!
//! Two bounded circular buffers track recent spread (bps) and gas price
//! (gwei) observations. Each recompute derives min-spread and gas-buffer
//! values as monotonically non-decreasing functions of observed volatility
//! and gas level: choppier markets demand a wider spread before a trade is
//! worth attempting. With no observations the proposal is the bounds table's
//! recommended set. This module only proposes - ParameterValidator enforces.

use crate::types::ThresholdSet;
use crate::validator::BOUNDS;
use std::collections::VecDeque;

/// Fixed-capacity observation window. Oldest entries evicted first.
#[derive(Debug)]
pub struct ObservationWindow {
    buf: VecDeque<f64>,
    capacity: usize,
}

impl ObservationWindow {
    pub fn new(capacity: usize) -> Self {
        Self {
            buf: VecDeque::with_capacity(capacity),
            capacity: capacity.max(1),
        }
    }

    pub fn push(&mut self, value: f64) {
        if self.buf.len() == self.capacity {
            self.buf.pop_front();
        }
        self.buf.push_back(value);
    }

    pub fn len(&self) -> usize {
        self.buf.len()
    }

    pub fn is_empty(&self) -> bool {
        self.buf.is_empty()
    }

    pub fn mean(&self) -> f64 {
        if self.buf.is_empty() {
            return 0.0;
        }
        self.buf.iter().sum::<f64>() / self.buf.len() as f64
    }

    /// Population standard deviation - the volatility measure.
    pub fn std_dev(&self) -> f64 {
        if self.buf.len() < 2 {
            return 0.0;
        }
        let mean = self.mean();
        let var =
            self.buf.iter().map(|v| (v - mean).powi(2)).sum::<f64>() / self.buf.len() as f64;
        var.sqrt()
    }
}

/// Default window capacity (~recent half hour at one observation per block
/// batch on a fast chain).
const DEFAULT_WINDOW: usize = 256;

/// Gas level (gwei) at which the gas buffer reaches its strongest scaling.
const GAS_SCALE_GWEI: f64 = 200.0;

pub struct ThresholdOptimizer {
    spreads_bps: ObservationWindow,
    gas_gwei: ObservationWindow,
}

impl Default for ThresholdOptimizer {
    fn default() -> Self {
        Self::new(DEFAULT_WINDOW)
    }
}

impl ThresholdOptimizer {
    pub fn new(window: usize) -> Self {
        Self {
            spreads_bps: ObservationWindow::new(window),
            gas_gwei: ObservationWindow::new(window),
        }
    }

    pub fn record_spread_bps(&mut self, spread_bps: f64) {
        if spread_bps.is_finite() && spread_bps >= 0.0 {
            self.spreads_bps.push(spread_bps);
        }
    }

    pub fn record_gas_gwei(&mut self, gas_gwei: f64) {
        if gas_gwei.is_finite() && gas_gwei >= 0.0 {
            self.gas_gwei.push(gas_gwei);
        }
    }

    pub fn observation_counts(&self) -> (usize, usize) {
        (self.spreads_bps.len(), self.gas_gwei.len())
    }

    /// Derive a threshold proposal from the current windows.
    ///
    /// min_spread_bps and gas_buffer_multiplier never go below their
    /// recommended floors and grow with volatility / gas level. The caller
    /// must pass the result through ParameterValidator before use.
    pub fn propose(&self) -> ThresholdSet {
        let b = &*BOUNDS;

        if self.spreads_bps.is_empty() && self.gas_gwei.is_empty() {
            return ThresholdSet {
                min_profit_native: b.min_profit_native.recommended,
                min_spread_bps: b.min_spread_bps.recommended.round() as u32,
                gas_buffer_multiplier: b.gas_buffer_multiplier.recommended,
                slippage_buffer_bps: b.slippage_buffer_bps.recommended.round() as u32,
            };
        }

        // Spread volatility widens the required spread: one observed
        // sigma of spread noise demands two sigmas of headroom.
        let spread_vol = self.spreads_bps.std_dev();
        let min_spread = b.min_spread_bps.recommended + 2.0 * spread_vol;

        // Gas level scales the buffer linearly up to +1.0 at GAS_SCALE_GWEI.
        let gas_level = self.gas_gwei.mean();
        let gas_buffer =
            b.gas_buffer_multiplier.recommended + (gas_level / GAS_SCALE_GWEI).min(1.0);

        // Slippage headroom follows spread volatility as well.
        let slippage = b.slippage_buffer_bps.recommended + spread_vol;

        ThresholdSet {
            min_profit_native: b.min_profit_native.recommended,
            min_spread_bps: min_spread.round() as u32,
            gas_buffer_multiplier: gas_buffer,
            slippage_buffer_bps: slippage.round() as u32,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::validator::{ParameterValidator, RiskPreset};

    #[test]
    fn test_window_evicts_oldest() {
        let mut w = ObservationWindow::new(3);
        for v in [1.0, 2.0, 3.0, 4.0] {
            w.push(v);
        }
        assert_eq!(w.len(), 3);
        assert!((w.mean() - 3.0).abs() < 1e-9); // 2,3,4
    }

    #[test]
    fn test_empty_windows_propose_recommended() {
        let opt = ThresholdOptimizer::new(16);
        let proposal = opt.propose();
        assert_eq!(proposal, ParameterValidator::new(RiskPreset::Standard, 10.0).safe_parameters());
    }

    #[test]
    fn test_higher_volatility_never_lowers_min_spread() {
        let mut calm = ThresholdOptimizer::new(32);
        let mut choppy = ThresholdOptimizer::new(32);
        for i in 0..32 {
            calm.record_spread_bps(30.0);
            // Alternating 10/90 bps: high variance around the same mean
            choppy.record_spread_bps(if i % 2 == 0 { 10.0 } else { 90.0 });
        }
        let calm_p = calm.propose();
        let choppy_p = choppy.propose();
        assert!(choppy_p.min_spread_bps > calm_p.min_spread_bps);
        assert!(calm_p.min_spread_bps >= BOUNDS.min_spread_bps.recommended.round() as u32);
    }

    #[test]
    fn test_higher_gas_never_lowers_buffer() {
        let mut cheap = ThresholdOptimizer::new(32);
        let mut expensive = ThresholdOptimizer::new(32);
        for _ in 0..32 {
            cheap.record_gas_gwei(20.0);
            expensive.record_gas_gwei(400.0);
        }
        let cheap_p = cheap.propose();
        let expensive_p = expensive.propose();
        assert!(expensive_p.gas_buffer_multiplier > cheap_p.gas_buffer_multiplier);
        assert!(cheap_p.gas_buffer_multiplier >= BOUNDS.gas_buffer_multiplier.recommended);
    }

    #[test]
    fn test_validated_proposals_always_in_bounds() {
        // Optimizer output passed through the validator lands in
        // [min, max] for every field, even under extreme observations.
        let validator = ParameterValidator::new(RiskPreset::Standard, 10.0);
        let mut opt = ThresholdOptimizer::new(64);
        for i in 0..64 {
            opt.record_spread_bps(if i % 2 == 0 { 0.0 } else { 5_000.0 });
            opt.record_gas_gwei(10_000.0);
        }
        let enforced = validator.enforce(opt.propose());
        let b = &*BOUNDS;
        assert!(enforced.min_profit_native >= b.min_profit_native.min);
        assert!(enforced.min_profit_native <= b.min_profit_native.max);
        assert!((enforced.min_spread_bps as f64) >= b.min_spread_bps.min);
        assert!((enforced.min_spread_bps as f64) <= b.min_spread_bps.max);
        assert!(enforced.gas_buffer_multiplier >= b.gas_buffer_multiplier.min);
        assert!(enforced.gas_buffer_multiplier <= b.gas_buffer_multiplier.max);
        assert!((enforced.slippage_buffer_bps as f64) >= b.slippage_buffer_bps.min);
        assert!((enforced.slippage_buffer_bps as f64) <= b.slippage_buffer_bps.max);
    }
}
