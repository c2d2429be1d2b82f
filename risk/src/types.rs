//! Risk engine configuration and result types.

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

/// Tunable thresholds the risk engine checks a proposed order against.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RiskConfig {
    pub max_open_positions: usize,
    /// Fraction of equity (e.g. `0.01` for 1%) a single trade's nominal
    /// risk (size × stop distance) may not exceed.
    pub max_risk_per_trade_fraction: Decimal,
    pub min_equity: Decimal,
    /// Inclusive minute-of-day window trading is permitted in, when set.
    pub trading_hours_start_minute: Option<u16>,
    pub trading_hours_end_minute: Option<u16>,
}

impl Default for RiskConfig {
    fn default() -> Self {
        Self {
            max_open_positions: 5,
            max_risk_per_trade_fraction: Decimal::new(1, 2), // 1%
            min_equity: Decimal::ZERO,
            trading_hours_start_minute: None,
            trading_hours_end_minute: None,
        }
    }
}

/// Outcome of `RiskEngine::evaluate`. `violations` is populated even when
/// `allowed` is true with any non-blocking RISK_* codes a future, stricter
/// configuration might reject on (currently unused, kept for symmetry with
/// the diagnostics counters that key off these codes).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RiskEvaluationResult {
    pub allowed: bool,
    pub reason: String,
    pub violations: Vec<String>,
}

impl RiskEvaluationResult {
    pub fn approved() -> Self {
        Self {
            allowed: true,
            reason: "within risk limits".to_string(),
            violations: Vec::new(),
        }
    }

    pub fn refused(reason: impl Into<String>, violations: Vec<String>) -> Self {
        Self {
            allowed: false,
            reason: reason.into(),
            violations,
        }
    }
}
