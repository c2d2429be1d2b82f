//! The Risk Engine: gates a proposed order against account state, existing
//! positions, nominal trade risk, time-of-day, and per-asset trading mode.
//! Does not mutate state — evaluation is a pure function of its inputs.

use chrono::{DateTime, Timelike, Utc};
use rust_decimal::Decimal;

use fiona_markets::account::{AccountState, OrderRequest, Position};
use fiona_markets::TradingMode;
use fiona_strategies::SetupCandidate;

use crate::codes::{
    RISK_INSUFFICIENT_EQUITY, RISK_INVALID_SIZE, RISK_MAX_OPEN_POSITIONS,
    RISK_MISSING_STOP_LOSS, RISK_OUTSIDE_TRADING_HOURS, RISK_OVERSIZED_NOTIONAL,
};
use crate::types::{RiskConfig, RiskEvaluationResult};

pub struct RiskEngine {
    config: RiskConfig,
}

impl RiskEngine {
    pub fn new(config: RiskConfig) -> Self {
        Self { config }
    }

    pub fn evaluate(
        &self,
        account: &AccountState,
        positions: &[Position],
        setup: &SetupCandidate,
        order: &OrderRequest,
        trading_mode: TradingMode,
        now: DateTime<Utc>,
    ) -> RiskEvaluationResult {
        let _ = setup;
        let mut violations = Vec::new();

        if account.equity < self.config.min_equity {
            violations.push(RISK_INSUFFICIENT_EQUITY.to_string());
        }

        if trading_mode == TradingMode::Strict && positions.len() >= self.config.max_open_positions {
            violations.push(RISK_MAX_OPEN_POSITIONS.to_string());
        }

        if order.size <= Decimal::ZERO {
            violations.push(RISK_INVALID_SIZE.to_string());
        }

        match order.stop_loss {
            None => violations.push(RISK_MISSING_STOP_LOSS.to_string()),
            Some(stop) => {
                let entry = order.limit_price.unwrap_or(setup.reference_price);
                let nominal_risk = order.size * (entry - stop).abs();
                let max_allowed = account.equity * self.config.max_risk_per_trade_fraction;
                if account.equity > Decimal::ZERO && nominal_risk > max_allowed {
                    violations.push(RISK_OVERSIZED_NOTIONAL.to_string());
                }
            }
        }

        if let (Some(start), Some(end)) = (
            self.config.trading_hours_start_minute,
            self.config.trading_hours_end_minute,
        ) {
            let minute_of_day = now.time().num_seconds_from_midnight() / 60;
            let in_window = if start <= end {
                (start as u32..=end as u32).contains(&minute_of_day)
            } else {
                minute_of_day >= start as u32 || minute_of_day <= end as u32
            };
            if !in_window {
                violations.push(RISK_OUTSIDE_TRADING_HOURS.to_string());
            }
        }

        if violations.is_empty() {
            RiskEvaluationResult::approved()
        } else {
            let reason = format!("rejected: {}", violations.join(", "));
            RiskEvaluationResult::refused(reason, violations)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;
    use fiona_markets::account::OrderType;
    use fiona_markets::{SessionPhase, Side};
    use fiona_strategies::SetupKind;
    use rust_decimal_macros::dec;
    use std::collections::HashMap;
    use uuid::Uuid;

    fn account(equity: Decimal) -> AccountState {
        AccountState {
            currency: "USD".into(),
            balance: equity,
            available: equity,
            equity,
            margin_used: Decimal::ZERO,
            as_of: Utc::now(),
        }
    }

    fn setup() -> SetupCandidate {
        SetupCandidate {
            id: Uuid::new_v4(),
            created_at: Utc::now(),
            epic: "EPIC1".into(),
            setup_kind: SetupKind::Breakout,
            phase: SessionPhase::UsCoreTrading,
            reference_price: dec!(100),
            direction: Side::Long,
            breakout_context: None,
            eia_context: None,
            quality_flags: HashMap::new(),
        }
    }

    fn order(size: Decimal, stop_loss: Option<Decimal>) -> OrderRequest {
        OrderRequest {
            symbol: "EPIC1".into(),
            side: Side::Long,
            size,
            order_type: OrderType::Market,
            limit_price: None,
            stop_loss,
            take_profit: None,
        }
    }

    #[test]
    fn approves_well_formed_order_within_limits() {
        let engine = RiskEngine::new(RiskConfig {
            max_open_positions: 5,
            max_risk_per_trade_fraction: dec!(0.05),
            min_equity: dec!(1000),
            trading_hours_start_minute: None,
            trading_hours_end_minute: None,
        });
        let result = engine.evaluate(
            &account(dec!(10000)),
            &[],
            &setup(),
            &order(dec!(1), Some(dec!(98))),
            TradingMode::Strict,
            Utc::now(),
        );
        assert!(result.allowed);
    }

    #[test]
    fn rejects_when_equity_below_minimum() {
        let engine = RiskEngine::new(RiskConfig {
            min_equity: dec!(5000),
            ..RiskConfig::default()
        });
        let result = engine.evaluate(
            &account(dec!(1000)),
            &[],
            &setup(),
            &order(dec!(1), Some(dec!(98))),
            TradingMode::Strict,
            Utc::now(),
        );
        assert!(!result.allowed);
        assert!(result.violations.contains(&RISK_INSUFFICIENT_EQUITY.to_string()));
    }

    #[test]
    fn rejects_when_max_open_positions_reached_in_strict_mode() {
        let engine = RiskEngine::new(RiskConfig {
            max_open_positions: 1,
            ..RiskConfig::default()
        });
        let existing = Position {
            symbol: "OTHER".into(),
            side: Side::Long,
            size: dec!(1),
            entry_price: dec!(50),
            current_price: dec!(51),
            unrealized_pnl: dec!(1),
            opened_at: Utc::now(),
        };
        let result = engine.evaluate(
            &account(dec!(100000)),
            &[existing],
            &setup(),
            &order(dec!(1), Some(dec!(98))),
            TradingMode::Strict,
            Utc::now(),
        );
        assert!(!result.allowed);
        assert!(result.violations.contains(&RISK_MAX_OPEN_POSITIONS.to_string()));
    }

    #[test]
    fn relaxed_mode_exempts_position_count_check() {
        let engine = RiskEngine::new(RiskConfig {
            max_open_positions: 1,
            ..RiskConfig::default()
        });
        let existing = Position {
            symbol: "OTHER".into(),
            side: Side::Long,
            size: dec!(1),
            entry_price: dec!(50),
            current_price: dec!(51),
            unrealized_pnl: dec!(1),
            opened_at: Utc::now(),
        };
        let result = engine.evaluate(
            &account(dec!(100000)),
            &[existing],
            &setup(),
            &order(dec!(1), Some(dec!(98))),
            TradingMode::Relaxed,
            Utc::now(),
        );
        assert!(!result.violations.contains(&RISK_MAX_OPEN_POSITIONS.to_string()));
    }

    #[test]
    fn missing_stop_loss_is_flagged() {
        let engine = RiskEngine::new(RiskConfig::default());
        let result = engine.evaluate(
            &account(dec!(100000)),
            &[],
            &setup(),
            &order(dec!(1), None),
            TradingMode::Strict,
            Utc::now(),
        );
        assert!(result.violations.contains(&RISK_MISSING_STOP_LOSS.to_string()));
    }

    #[test]
    fn oversized_notional_is_rejected() {
        let engine = RiskEngine::new(RiskConfig {
            max_risk_per_trade_fraction: dec!(0.01),
            ..RiskConfig::default()
        });
        let result = engine.evaluate(
            &account(dec!(1000)),
            &[],
            &setup(),
            &order(dec!(100), Some(dec!(90))),
            TradingMode::Strict,
            Utc::now(),
        );
        assert!(!result.allowed);
        assert!(result.violations.contains(&RISK_OVERSIZED_NOTIONAL.to_string()));
    }

    #[test]
    fn outside_trading_hours_is_rejected() {
        let engine = RiskEngine::new(RiskConfig {
            trading_hours_start_minute: Some(14 * 60),
            trading_hours_end_minute: Some(21 * 60),
            ..RiskConfig::default()
        });
        let midnight_utc = DateTime::parse_from_rfc3339("2026-01-05T02:00:00Z")
            .unwrap()
            .with_timezone(&Utc);
        let result = engine.evaluate(
            &account(dec!(100000)),
            &[],
            &setup(),
            &order(dec!(1), Some(dec!(98))),
            TradingMode::Strict,
            midnight_utc,
        );
        assert!(result.violations.contains(&RISK_OUTSIDE_TRADING_HOURS.to_string()));
    }
}
