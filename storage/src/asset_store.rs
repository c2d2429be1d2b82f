//! Loads active [`TradingAsset`]s together with their
//! [`AssetSessionPhaseConfig`] rows. Phase configs for every active asset
//! are fetched in a single `WHERE asset_epic = ANY($1)` query rather than
//! one query per asset, so the worker loop's per-tick asset snapshot never
//! pays an N+1 cost.

use std::collections::HashMap;
use std::str::FromStr;

use rust_decimal::Decimal;
use smol_str::SmolStr;
use sqlx::postgres::PgPool;
use sqlx::Row;

use fiona_markets::{
    AssetSessionPhaseConfig, BrokerKind, SessionPhase, SessionTimes, TradingAsset, TradingMode,
};

use crate::error::StorageError;

fn broker_kind_from_str(s: &str) -> Option<BrokerKind> {
    match s {
        "IG" => Some(BrokerKind::Ig),
        "MEXC" => Some(BrokerKind::Mexc),
        "KRAKEN" => Some(BrokerKind::Kraken),
        _ => None,
    }
}

fn trading_mode_from_str(s: &str) -> TradingMode {
    match s {
        "RELAXED" => TradingMode::Relaxed,
        _ => TradingMode::Strict,
    }
}

pub struct AssetStore {
    pool: PgPool,
}

impl AssetStore {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    /// Returns every active asset paired with its derived `SessionTimes`
    /// (built from that asset's enabled phase config rows, if any).
    pub async fn load_active_assets(&self) -> Result<Vec<(TradingAsset, SessionTimes)>, StorageError> {
        let asset_rows = sqlx::query(
            r#"
            SELECT epic, symbol, broker_kind, broker_symbol, category, tick_size,
                   is_crypto, is_active, trading_mode, trades_24_7
            FROM trading_assets
            WHERE is_active = true
            "#,
        )
        .fetch_all(&self.pool)
        .await?;

        if asset_rows.is_empty() {
            return Ok(Vec::new());
        }

        let epics: Vec<String> = asset_rows.iter().map(|r| r.get::<String, _>("epic")).collect();

        let config_rows = sqlx::query(
            r#"
            SELECT asset_epic, phase, start_minute, end_minute, is_range_build_phase,
                   is_trading_phase, enabled, priority
            FROM asset_session_phase_configs
            WHERE asset_epic = ANY($1)
            "#,
        )
        .bind(&epics)
        .fetch_all(&self.pool)
        .await?;

        let mut configs_by_epic: HashMap<String, Vec<AssetSessionPhaseConfig>> = HashMap::new();
        for row in config_rows {
            let epic: String = row.get("asset_epic");
            let phase_label: String = row.get("phase");
            let Ok(phase) = SessionPhase::from_str(&phase_label) else {
                tracing::warn!(epic = %epic, phase = %phase_label, "ignoring phase config with unrecognized phase label");
                continue;
            };
            configs_by_epic.entry(epic).or_default().push(AssetSessionPhaseConfig {
                phase,
                start_minute: row.get::<i32, _>("start_minute") as u16,
                end_minute: row.get::<i32, _>("end_minute") as u16,
                is_range_build_phase: row.get("is_range_build_phase"),
                is_trading_phase: row.get("is_trading_phase"),
                enabled: row.get("enabled"),
                priority: row.get("priority"),
            });
        }

        let mut assets = Vec::with_capacity(asset_rows.len());
        for row in asset_rows {
            let epic: String = row.get("epic");
            let broker_kind_label: String = row.get("broker_kind");
            let Some(broker_kind) = broker_kind_from_str(&broker_kind_label) else {
                tracing::warn!(epic = %epic, broker_kind = %broker_kind_label, "ignoring asset with unrecognized broker kind");
                continue;
            };

            let asset = TradingAsset {
                symbol: SmolStr::new(row.get::<String, _>("symbol")),
                epic: SmolStr::new(&epic),
                broker_kind,
                broker_symbol: row.get::<Option<String>, _>("broker_symbol").map(SmolStr::new),
                category: SmolStr::new(row.get::<String, _>("category")),
                tick_size: row.get::<Decimal, _>("tick_size"),
                is_crypto: row.get("is_crypto"),
                is_active: row.get("is_active"),
                trading_mode: trading_mode_from_str(&row.get::<String, _>("trading_mode")),
                trades_24_7: row.get("trades_24_7"),
            };

            let windows = configs_by_epic.remove(&epic).unwrap_or_default();
            assets.push((asset, SessionTimes::new(windows)));
        }

        Ok(assets)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn broker_kind_from_str_rejects_unknown_label() {
        assert!(broker_kind_from_str("COINBASE").is_none());
    }

    #[test]
    fn trading_mode_from_str_defaults_to_strict() {
        assert_eq!(trading_mode_from_str("anything"), TradingMode::Strict);
        assert_eq!(trading_mode_from_str("RELAXED"), TradingMode::Relaxed);
    }
}
