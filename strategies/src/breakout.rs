//! The default breakout strategy: compares the current price against the
//! Asia/London/Pre-US ranges persisted for an epic and emits a setup when
//! price has broken outside one of them while the asset is in a tradeable
//! phase.

use std::sync::Arc;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use smol_str::SmolStr;
use uuid::Uuid;

use fiona_data::MarketStateProvider;
use fiona_markets::{SessionPhase, Side};

use crate::engine::StrategyEngine;
use crate::error::StrategyError;
use crate::types::{BreakoutContext, CriteriaEntry, EvalSummary, SetupCandidate, SetupKind};

/// Range-building phases checked for a breakout, most recently closed first.
const RANGE_PHASES: [SessionPhase; 3] = [
    SessionPhase::PreUsRange,
    SessionPhase::LondonCore,
    SessionPhase::AsiaRange,
];

pub struct BreakoutStrategy {
    provider: Arc<MarketStateProvider>,
}

impl BreakoutStrategy {
    pub fn new(provider: Arc<MarketStateProvider>) -> Self {
        Self { provider }
    }

    fn reference_price(&self, epic: &str, now: DateTime<Utc>) -> Option<Decimal> {
        self.provider
            .get_recent_candles(epic, 1, false, now)
            .last()
            .map(|c| c.close)
    }

    async fn evaluate_inner(
        &self,
        epic: &str,
        now: DateTime<Utc>,
    ) -> Result<(Vec<SetupCandidate>, Vec<CriteriaEntry>), StrategyError> {
        let mut criteria = Vec::new();
        let phase = self.provider.get_phase(now);
        let phase_tradeable = self.provider.is_phase_tradeable(phase);
        criteria.push(CriteriaEntry {
            name: "phase_tradeable".into(),
            passed: phase_tradeable,
            detail: format!("current phase {phase} tradeable={phase_tradeable}"),
        });

        if !phase_tradeable {
            return Ok((Vec::new(), criteria));
        }

        let Some(reference_price) = self.reference_price(epic, now) else {
            criteria.push(CriteriaEntry {
                name: "reference_price_available".into(),
                passed: false,
                detail: "no cached candle to derive a reference price from".into(),
            });
            return Ok((Vec::new(), criteria));
        };

        let mut setups = Vec::new();
        for range_phase in RANGE_PHASES {
            let Some(range) = self
                .provider
                .latest_range(epic, range_phase, now)
                .await?
            else {
                criteria.push(CriteriaEntry {
                    name: format!("{range_phase}_range_available").into(),
                    passed: false,
                    detail: "no fresh persisted range for this phase".into(),
                });
                continue;
            };

            if !range.is_valid() {
                criteria.push(CriteriaEntry {
                    name: format!("{range_phase}_range_valid").into(),
                    passed: false,
                    detail: "range failed high > low invariant".into(),
                });
                continue;
            }

            let direction = if reference_price > range.high() {
                Some(Side::Long)
            } else if reference_price < range.low() {
                Some(Side::Short)
            } else {
                None
            };

            let Some(direction) = direction else {
                criteria.push(CriteriaEntry {
                    name: format!("{range_phase}_breakout").into(),
                    passed: false,
                    detail: format!(
                        "price {reference_price} within range [{}, {}]",
                        range.low(),
                        range.high()
                    ),
                });
                continue;
            };

            criteria.push(CriteriaEntry {
                name: format!("{range_phase}_breakout").into(),
                passed: true,
                detail: format!("price {reference_price} broke {direction} of range"),
            });

            setups.push(SetupCandidate {
                id: Uuid::new_v4(),
                created_at: now,
                epic: SmolStr::new(epic),
                setup_kind: SetupKind::Breakout,
                phase,
                reference_price,
                direction,
                breakout_context: Some(BreakoutContext {
                    range_phase,
                    range_high: range.high(),
                    range_low: range.low(),
                    breakout_level: reference_price,
                }),
                eia_context: None,
                quality_flags: Default::default(),
            });
        }

        Ok((setups, criteria))
    }
}

#[async_trait]
impl StrategyEngine for BreakoutStrategy {
    async fn evaluate(&self, epic: &str, now: DateTime<Utc>) -> Result<Vec<SetupCandidate>, StrategyError> {
        Ok(self.evaluate_inner(epic, now).await?.0)
    }

    async fn evaluate_with_diagnostics(
        &self,
        epic: &str,
        now: DateTime<Utc>,
    ) -> Result<(Vec<SetupCandidate>, EvalSummary, Vec<CriteriaEntry>), StrategyError> {
        let (setups, criteria) = self.evaluate_inner(epic, now).await?;
        let summary = EvalSummary {
            setups_generated: setups.len(),
            message: if setups.is_empty() {
                "no breakout setups this tick".to_string()
            } else {
                format!("{} breakout setup(s) generated", setups.len())
            },
        };
        Ok((setups, summary, criteria))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use fiona_data::InMemoryRangeStore;
    use fiona_markets::{BreakoutRange, BrokerRegistry};
    use rust_decimal_macros::dec;
    use std::collections::HashMap;

    fn ts(s: &str) -> DateTime<Utc> {
        DateTime::parse_from_rfc3339(s).unwrap().with_timezone(&Utc)
    }

    async fn provider_with_range(range: BreakoutRange) -> Arc<MarketStateProvider> {
        let store = Arc::new(InMemoryRangeStore::new());
        store.save_range(range).await.unwrap();
        let registry = Arc::new(BrokerRegistry::new(HashMap::new()));
        Arc::new(MarketStateProvider::new(registry, None, store))
    }

    fn range(phase: SessionPhase, end_time: DateTime<Utc>) -> BreakoutRange {
        BreakoutRange {
            asset_epic: "EPIC1".into(),
            phase,
            start_time: end_time - chrono::Duration::hours(8),
            end_time,
            computed_high: dec!(75.50),
            computed_low: dec!(75.30),
            height_ticks: 20,
            height_points: dec!(0.20),
            candle_count: 4,
            atr: None,
            manual_high: None,
            manual_low: None,
            last_adjusted_by: None,
            last_adjusted_at: None,
        }
    }

    #[tokio::test]
    async fn no_setups_when_phase_not_tradeable() {
        let provider = provider_with_range(range(SessionPhase::AsiaRange, ts("2026-01-06T08:00:00Z"))).await;
        let strategy = BreakoutStrategy::new(provider);
        let setups = strategy.evaluate("EPIC1", ts("2026-01-06T10:00:00Z")).await.unwrap();
        assert!(setups.is_empty());
    }

    use fiona_markets::{AssetSessionPhaseConfig, SessionTimes};

    #[tokio::test]
    async fn emits_long_setup_on_breakout_above_range() {
        let end = ts("2026-01-06T08:00:00Z");
        let provider = provider_with_range(range(SessionPhase::AsiaRange, end)).await;
        provider.set_current_asset(
            fiona_markets::TradingAsset {
                symbol: "WTI".into(),
                epic: "EPIC1".into(),
                broker_kind: fiona_markets::BrokerKind::Kraken,
                broker_symbol: None,
                category: "energy".into(),
                tick_size: dec!(0.01),
                is_crypto: false,
                is_active: true,
                trading_mode: Default::default(),
                trades_24_7: true,
            },
            SessionTimes::new(vec![AssetSessionPhaseConfig {
                phase: SessionPhase::UsCoreTrading,
                start_minute: 14 * 60,
                end_minute: 21 * 60,
                is_range_build_phase: false,
                is_trading_phase: true,
                enabled: true,
                priority: 0,
            }]),
        );
        provider.ingest_candle(
            "EPIC1",
            fiona_markets::Candle1m::from_single_price(
                "EPIC1".into(),
                ts("2026-01-06T15:00:00Z"),
                dec!(75.60),
            ),
        );

        let strategy = BreakoutStrategy::new(provider);
        let setups = strategy.evaluate("EPIC1", ts("2026-01-06T15:00:00Z")).await.unwrap();
        assert_eq!(setups.len(), 1);
        assert_eq!(setups[0].direction, Side::Long);
    }
}
