//! `BreakoutRange`: the persisted high/low snapshot built during a
//! range-building session phase and consumed by the strategy engine.

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use smol_str::SmolStr;

use crate::phase::SessionPhase;

/// A persisted per-asset, per-phase breakout range.
///
/// `high == max(manual_high, computed_high)` semantics: a manual override
/// wins whenever it is present and positive, otherwise the computed value is
/// authoritative. `is_valid()` enforces `high > low`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BreakoutRange {
    pub asset_epic: SmolStr,
    pub phase: SessionPhase,
    pub start_time: DateTime<Utc>,
    pub end_time: DateTime<Utc>,
    pub computed_high: Decimal,
    pub computed_low: Decimal,
    pub height_ticks: i64,
    pub height_points: Decimal,
    pub candle_count: u32,
    pub atr: Option<Decimal>,
    pub manual_high: Option<Decimal>,
    pub manual_low: Option<Decimal>,
    pub last_adjusted_by: Option<SmolStr>,
    pub last_adjusted_at: Option<DateTime<Utc>>,
}

impl BreakoutRange {
    /// Effective high: the manual override if present and positive, else
    /// the computed high.
    pub fn high(&self) -> Decimal {
        match self.manual_high {
            Some(h) if h > Decimal::ZERO => h,
            _ => self.computed_high,
        }
    }

    /// Effective low: the manual override if present and positive, else the
    /// computed low.
    pub fn low(&self) -> Decimal {
        match self.manual_low {
            Some(l) if l > Decimal::ZERO => l,
            _ => self.computed_low,
        }
    }

    pub fn is_valid(&self) -> bool {
        self.high() > self.low()
    }

    /// Recomputes `height_ticks`/`height_points` from the effective high/low
    /// and the asset's tick size.
    pub fn recompute_height(&mut self, tick_size: Decimal) {
        let height = self.high() - self.low();
        self.height_points = height;
        self.height_ticks = if tick_size.is_zero() {
            0
        } else {
            (height / tick_size).round().try_into().unwrap_or(0)
        };
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    fn ts(s: &str) -> DateTime<Utc> {
        DateTime::parse_from_rfc3339(s).unwrap().with_timezone(&Utc)
    }

    fn range() -> BreakoutRange {
        BreakoutRange {
            asset_epic: "CC.D.CL.UNC.IP".into(),
            phase: SessionPhase::AsiaRange,
            start_time: ts("2026-01-05T23:00:00Z"),
            end_time: ts("2026-01-06T08:00:00Z"),
            computed_high: dec!(75.50),
            computed_low: dec!(75.30),
            height_ticks: 0,
            height_points: dec!(0),
            candle_count: 4,
            atr: None,
            manual_high: None,
            manual_low: None,
            last_adjusted_by: None,
            last_adjusted_at: None,
        }
    }

    #[test]
    fn computed_values_used_when_no_manual_override() {
        let r = range();
        assert_eq!(r.high(), dec!(75.50));
        assert_eq!(r.low(), dec!(75.30));
        assert!(r.is_valid());
    }

    #[test]
    fn manual_override_wins_when_positive() {
        let mut r = range();
        r.manual_high = Some(dec!(76.00));
        assert_eq!(r.high(), dec!(76.00));
    }

    #[test]
    fn non_positive_manual_override_is_ignored() {
        let mut r = range();
        r.manual_low = Some(dec!(-1));
        assert_eq!(r.low(), dec!(75.30));
    }

    #[test]
    fn recompute_height_uses_tick_size() {
        let mut r = range();
        r.recompute_height(dec!(0.01));
        assert_eq!(r.height_points, dec!(0.20));
        assert_eq!(r.height_ticks, 20);
    }
}
