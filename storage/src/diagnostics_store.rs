//! Bucketed per-asset, per-hourly-window `AssetDiagnostics` counters.
//!
//! Both the main worker loop and the streaming worker may bump the same
//! `(asset_epic, window_start)` row, so every counter update is an
//! upsert-with-increment rather than a read-modify-write.

use std::collections::HashMap;

use chrono::{DateTime, Duration, Timelike, Utc};
use sqlx::postgres::PgPool;
use sqlx::types::Json;
use sqlx::Row;

use crate::error::StorageError;
use crate::types::AssetDiagnostics;

/// Truncates `now` to the start of its hourly bucket.
pub fn hour_window_start(now: DateTime<Utc>) -> DateTime<Utc> {
    now.date_naive()
        .and_hms_opt(now.hour(), 0, 0)
        .expect("hour is always in range")
        .and_utc()
}

#[derive(Debug, Clone, Copy, Default)]
pub struct CounterDelta {
    pub candles_evaluated: i64,
    pub setups_generated: i64,
    pub setups_discarded: i64,
    pub setups_risk_approved: i64,
    pub setups_risk_rejected: i64,
    pub ranges_built: i64,
}

pub struct DiagnosticsStore {
    pool: PgPool,
}

impl DiagnosticsStore {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    /// Adds `delta` to the `(asset_epic, hour_window_start(now))` row,
    /// creating it if absent.
    pub async fn increment(
        &self,
        asset_epic: &str,
        now: DateTime<Utc>,
        delta: CounterDelta,
    ) -> Result<(), StorageError> {
        let window_start = hour_window_start(now);
        let window_end = window_start + Duration::hours(1);

        sqlx::query(
            r#"
            INSERT INTO asset_diagnostics
                (asset_epic, window_start, window_end, candles_evaluated, setups_generated,
                 setups_discarded, setups_risk_approved, setups_risk_rejected, ranges_built)
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9)
            ON CONFLICT (asset_epic, window_start) DO UPDATE SET
                candles_evaluated = asset_diagnostics.candles_evaluated + EXCLUDED.candles_evaluated,
                setups_generated = asset_diagnostics.setups_generated + EXCLUDED.setups_generated,
                setups_discarded = asset_diagnostics.setups_discarded + EXCLUDED.setups_discarded,
                setups_risk_approved = asset_diagnostics.setups_risk_approved + EXCLUDED.setups_risk_approved,
                setups_risk_rejected = asset_diagnostics.setups_risk_rejected + EXCLUDED.setups_risk_rejected,
                ranges_built = asset_diagnostics.ranges_built + EXCLUDED.ranges_built
            "#,
        )
        .bind(asset_epic)
        .bind(window_start)
        .bind(window_end)
        .bind(delta.candles_evaluated)
        .bind(delta.setups_generated)
        .bind(delta.setups_discarded)
        .bind(delta.setups_risk_approved)
        .bind(delta.setups_risk_rejected)
        .bind(delta.ranges_built)
        .execute(&self.pool)
        .await?;
        Ok(())
    }

    /// Bumps a single rejection-reason count in the row's JSONB map.
    pub async fn record_rejection(
        &self,
        asset_epic: &str,
        now: DateTime<Utc>,
        reason_code: &str,
    ) -> Result<(), StorageError> {
        let window_start = hour_window_start(now);
        let window_end = window_start + Duration::hours(1);

        sqlx::query(
            r#"
            INSERT INTO asset_diagnostics (asset_epic, window_start, window_end, rejection_reasons)
            VALUES ($1, $2, $3, jsonb_build_object($4::text, 1::int))
            ON CONFLICT (asset_epic, window_start) DO UPDATE SET
                rejection_reasons = jsonb_set(
                    asset_diagnostics.rejection_reasons,
                    ARRAY[$4::text],
                    to_jsonb(COALESCE((asset_diagnostics.rejection_reasons ->> $4)::bigint, 0) + 1)
                )
            "#,
        )
        .bind(asset_epic)
        .bind(window_start)
        .bind(window_end)
        .bind(reason_code)
        .execute(&self.pool)
        .await?;
        Ok(())
    }

    /// Aggregates all windows for `asset_epic` between `from` and `to`
    /// (inclusive of any window whose `window_start` falls in range).
    pub async fn aggregate(
        &self,
        asset_epic: &str,
        from: DateTime<Utc>,
        to: DateTime<Utc>,
    ) -> Result<Option<AssetDiagnostics>, StorageError> {
        let rows = sqlx::query(
            "SELECT * FROM asset_diagnostics WHERE asset_epic = $1 AND window_start >= $2 AND window_start <= $3",
        )
        .bind(asset_epic)
        .bind(from)
        .bind(to)
        .fetch_all(&self.pool)
        .await?;

        let mut acc: Option<AssetDiagnostics> = None;
        for row in rows {
            let rejection_reasons: Json<HashMap<String, i64>> = row.try_get("rejection_reasons")?;
            let entry = AssetDiagnostics {
                asset_epic: row.try_get::<String, _>("asset_epic")?.into(),
                window_start: row.try_get("window_start")?,
                window_end: row.try_get("window_end")?,
                candles_evaluated: row.try_get("candles_evaluated")?,
                setups_generated: row.try_get("setups_generated")?,
                setups_discarded: row.try_get("setups_discarded")?,
                setups_risk_approved: row.try_get("setups_risk_approved")?,
                setups_risk_rejected: row.try_get("setups_risk_rejected")?,
                ranges_built: row.try_get("ranges_built")?,
                rejection_reasons: rejection_reasons.0,
            };
            match &mut acc {
                Some(existing) => existing.merge(&entry),
                None => acc = Some(entry),
            }
        }
        Ok(acc)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn hour_window_start_truncates_minutes_and_seconds() {
        let now = DateTime::parse_from_rfc3339("2026-01-05T14:37:52Z")
            .unwrap()
            .with_timezone(&Utc);
        let start = hour_window_start(now);
        assert_eq!(start.hour(), 14);
        assert_eq!(start.minute(), 0);
        assert_eq!(start.second(), 0);
    }

    #[test]
    fn merge_sums_counters_and_widens_window() {
        let mut a = AssetDiagnostics {
            asset_epic: "EPIC1".into(),
            window_start: Utc::now(),
            window_end: Utc::now() + Duration::hours(1),
            candles_evaluated: 10,
            setups_generated: 1,
            setups_discarded: 0,
            setups_risk_approved: 1,
            setups_risk_rejected: 0,
            ranges_built: 1,
            rejection_reasons: HashMap::new(),
        };
        let mut reasons = HashMap::new();
        reasons.insert("RISK_OVERSIZED_NOTIONAL".to_string(), 2);
        let b = AssetDiagnostics {
            asset_epic: "EPIC1".into(),
            window_start: a.window_start - Duration::hours(1),
            window_end: a.window_end,
            candles_evaluated: 5,
            setups_generated: 2,
            setups_discarded: 1,
            setups_risk_approved: 0,
            setups_risk_rejected: 2,
            ranges_built: 0,
            rejection_reasons: reasons,
        };

        let expected_start = b.window_start;
        a.merge(&b);
        assert_eq!(a.candles_evaluated, 15);
        assert_eq!(a.setups_generated, 3);
        assert_eq!(a.setups_risk_rejected, 2);
        assert_eq!(a.rejection_reasons["RISK_OVERSIZED_NOTIONAL"], 2);
        assert_eq!(a.window_start, expected_start);
    }
}
