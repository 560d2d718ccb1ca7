//! Hard safety bounds for every tunable parameter.
//!
//! The optimizer only proposes; this module is the gate. Out-of-range values
//! produce an error plus a clamped adjusted set - never a silent drop. Values
//! inside range but below the recommended floor produce a warning only.
//! `safe_parameters()` is the all-recommended fallback used whenever
//! validation fails and no adjusted set is derivable.

use crate::types::ThresholdSet;
use alloy::primitives::U256;
use once_cell::sync::Lazy;
use tracing::warn;

/// Hard [min, max] plus the recommended default for one tunable field.
#[derive(Debug, Clone, Copy)]
pub struct Bound {
    pub min: f64,
    pub max: f64,
    pub recommended: f64,
}

impl Bound {
    fn clamp(&self, value: f64) -> f64 {
        value.clamp(self.min, self.max)
    }

    fn contains(&self, value: f64) -> bool {
        value >= self.min && value <= self.max
    }
}

/// Process-wide bounds table. Read-only after initialization.
#[derive(Debug)]
pub struct ParameterBounds {
    pub min_profit_native: Bound,
    pub min_spread_bps: Bound,
    pub gas_buffer_multiplier: Bound,
    pub slippage_buffer_bps: Bound,
    /// Sane band for min_profit / trade_size (advisory only).
    pub profit_to_size_ratio: Bound,
}

pub static BOUNDS: Lazy<ParameterBounds> = Lazy::new(|| ParameterBounds {
    min_profit_native: Bound { min: 0.001, max: 10.0, recommended: 0.01 },
    min_spread_bps: Bound { min: 5.0, max: 500.0, recommended: 30.0 },
    gas_buffer_multiplier: Bound { min: 1.0, max: 3.0, recommended: 1.25 },
    slippage_buffer_bps: Bound { min: 10.0, max: 500.0, recommended: 50.0 },
    profit_to_size_ratio: Bound { min: 1e-5, max: 0.1, recommended: 1e-3 },
});

/// Risk-level preset imposing additional soft constraints.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RiskPreset {
    Conservative,
    Standard,
    Aggressive,
}

impl RiskPreset {
    pub fn parse(s: &str) -> Option<Self> {
        match s.to_lowercase().as_str() {
            "conservative" => Some(RiskPreset::Conservative),
            "standard" => Some(RiskPreset::Standard),
            "aggressive" => Some(RiskPreset::Aggressive),
            _ => None,
        }
    }
}

/// Outcome of validating a proposed threshold set.
#[derive(Debug, Clone)]
pub struct Validation {
    pub is_valid: bool,
    pub errors: Vec<String>,
    pub warnings: Vec<String>,
    /// Clamped set, present whenever any field was out of range.
    pub adjusted: Option<ThresholdSet>,
}

pub struct ParameterValidator {
    bounds: &'static ParameterBounds,
    preset: RiskPreset,
    /// Reference trade size for the profit-to-size ratio check, native units.
    trade_size_native: f64,
}

impl ParameterValidator {
    pub fn new(preset: RiskPreset, trade_size_native: f64) -> Self {
        Self { bounds: &BOUNDS, preset, trade_size_native }
    }

    /// Check every tunable field against its hard bounds and the cross-field
    /// rules. Out-of-range fields are errors with a clamped `adjusted` set;
    /// in-range-but-below-recommended fields are warnings only.
    pub fn validate(&self, params: &ThresholdSet) -> Validation {
        let mut errors = Vec::new();
        let mut warnings = Vec::new();
        let mut adjusted = params.clone();
        let mut clamped_any = false;

        let b = self.bounds;

        if !b.min_profit_native.contains(params.min_profit_native) {
            errors.push(format!(
                "min_profit_native {} outside [{}, {}]",
                params.min_profit_native, b.min_profit_native.min, b.min_profit_native.max
            ));
            adjusted.min_profit_native = b.min_profit_native.clamp(params.min_profit_native);
            clamped_any = true;
        } else if params.min_profit_native < b.min_profit_native.recommended {
            warnings.push(format!(
                "min_profit_native {} below recommended {}",
                params.min_profit_native, b.min_profit_native.recommended
            ));
        }

        let spread = params.min_spread_bps as f64;
        if !b.min_spread_bps.contains(spread) {
            errors.push(format!(
                "min_spread_bps {} outside [{}, {}]",
                params.min_spread_bps, b.min_spread_bps.min, b.min_spread_bps.max
            ));
            adjusted.min_spread_bps = b.min_spread_bps.clamp(spread).round() as u32;
            clamped_any = true;
        } else if spread < b.min_spread_bps.recommended {
            warnings.push(format!(
                "min_spread_bps {} below recommended {}",
                params.min_spread_bps, b.min_spread_bps.recommended
            ));
        }

        if !b.gas_buffer_multiplier.contains(params.gas_buffer_multiplier) {
            errors.push(format!(
                "gas_buffer_multiplier {} outside [{}, {}]",
                params.gas_buffer_multiplier,
                b.gas_buffer_multiplier.min,
                b.gas_buffer_multiplier.max
            ));
            adjusted.gas_buffer_multiplier =
                b.gas_buffer_multiplier.clamp(params.gas_buffer_multiplier);
            clamped_any = true;
        } else if params.gas_buffer_multiplier < b.gas_buffer_multiplier.recommended {
            warnings.push(format!(
                "gas_buffer_multiplier {} below recommended {}",
                params.gas_buffer_multiplier, b.gas_buffer_multiplier.recommended
            ));
        }

        let slippage = params.slippage_buffer_bps as f64;
        if !b.slippage_buffer_bps.contains(slippage) {
            errors.push(format!(
                "slippage_buffer_bps {} outside [{}, {}]",
                params.slippage_buffer_bps, b.slippage_buffer_bps.min, b.slippage_buffer_bps.max
            ));
            adjusted.slippage_buffer_bps = b.slippage_buffer_bps.clamp(slippage).round() as u32;
            clamped_any = true;
        } else if slippage < b.slippage_buffer_bps.recommended {
            warnings.push(format!(
                "slippage_buffer_bps {} below recommended {}",
                params.slippage_buffer_bps, b.slippage_buffer_bps.recommended
            ));
        }

        // Cross-field: profit threshold vs. trade size (advisory band).
        if self.trade_size_native > 0.0 {
            let ratio = adjusted.min_profit_native / self.trade_size_native;
            if !b.profit_to_size_ratio.contains(ratio) {
                warnings.push(format!(
                    "profit/trade-size ratio {:.2e} outside sane band [{:.0e}, {:.0e}]",
                    ratio, b.profit_to_size_ratio.min, b.profit_to_size_ratio.max
                ));
            }
        }

        // Preset soft constraints.
        if self.preset == RiskPreset::Conservative && adjusted.slippage_buffer_bps > 100 {
            warnings.push(format!(
                "conservative preset with slippage tolerance {}bps (> 100bps)",
                adjusted.slippage_buffer_bps
            ));
        }

        Validation {
            is_valid: errors.is_empty(),
            errors,
            warnings,
            adjusted: if clamped_any { Some(adjusted) } else { None },
        }
    }

    /// The all-recommended configuration. Hard fallback whenever validation
    /// fails and no adjusted set is derivable.
    pub fn safe_parameters(&self) -> ThresholdSet {
        let b = self.bounds;
        ThresholdSet {
            min_profit_native: b.min_profit_native.recommended,
            min_spread_bps: b.min_spread_bps.recommended.round() as u32,
            gas_buffer_multiplier: b.gas_buffer_multiplier.recommended,
            slippage_buffer_bps: b.slippage_buffer_bps.recommended.round() as u32,
        }
    }

    /// Validate a proposal and return a set that is guaranteed in-bounds:
    /// the proposal itself, its clamped adjustment, or safe parameters.
    pub fn enforce(&self, proposal: ThresholdSet) -> ThresholdSet {
        let v = self.validate(&proposal);
        for w in &v.warnings {
            warn!("threshold warning: {}", w);
        }
        if v.is_valid {
            return proposal;
        }
        for e in &v.errors {
            warn!("threshold clamped: {}", e);
        }
        v.adjusted.unwrap_or_else(|| self.safe_parameters())
    }
}

/// The per-gas fee cap must never be below the priority-fee component.
/// Returns the pair with the cap raised if needed.
pub fn clamp_fee_pair(max_fee_per_gas: U256, priority_fee: U256) -> (U256, U256) {
    if max_fee_per_gas < priority_fee {
        (priority_fee, priority_fee)
    } else {
        (max_fee_per_gas, priority_fee)
    }
}
