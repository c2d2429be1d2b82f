//! `sqlx`-backed [`RangeStore`] implementation, queried by
//! `(asset_epic, phase, end_time desc)`.

use std::str::FromStr;

use async_trait::async_trait;
use chrono::{DateTime, Duration, Utc};
use sqlx::postgres::PgPool;
use sqlx::Row;

use fiona_data::{RangeStore, RangeStoreError};
use fiona_markets::{BreakoutRange, SessionPhase};

pub struct SqlxRangeStore {
    pool: PgPool,
}

impl SqlxRangeStore {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl RangeStore for SqlxRangeStore {
    async fn save_range(&self, range: BreakoutRange) -> Result<(), RangeStoreError> {
        sqlx::query(
            r#"
            INSERT INTO breakout_ranges
                (asset_epic, phase, start_time, end_time, computed_high, computed_low,
                 height_ticks, height_points, candle_count, atr, manual_high, manual_low,
                 last_adjusted_by, last_adjusted_at)
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $12, $13, $14)
            "#,
        )
        .bind(range.asset_epic.as_str())
        .bind(range.phase.to_string())
        .bind(range.start_time)
        .bind(range.end_time)
        .bind(range.computed_high)
        .bind(range.computed_low)
        .bind(range.height_ticks)
        .bind(range.height_points)
        .bind(range.candle_count as i32)
        .bind(range.atr)
        .bind(range.manual_high)
        .bind(range.manual_low)
        .bind(range.last_adjusted_by.as_deref())
        .bind(range.last_adjusted_at)
        .execute(&self.pool)
        .await
        .map_err(|e| RangeStoreError::Backend(e.to_string()))?;
        Ok(())
    }

    async fn latest_range(
        &self,
        epic: &str,
        phase: SessionPhase,
        now: DateTime<Utc>,
    ) -> Result<Option<BreakoutRange>, RangeStoreError> {
        let row = sqlx::query(
            "SELECT * FROM breakout_ranges WHERE asset_epic = $1 AND phase = $2 ORDER BY end_time DESC LIMIT 1",
        )
        .bind(epic)
        .bind(phase.to_string())
        .fetch_optional(&self.pool)
        .await
        .map_err(|e| RangeStoreError::Backend(e.to_string()))?;

        let Some(row) = row else { return Ok(None) };

        let end_time: DateTime<Utc> = row
            .try_get("end_time")
            .map_err(|e| RangeStoreError::Backend(e.to_string()))?;
        if now.signed_duration_since(end_time) > Duration::hours(24) {
            return Ok(None);
        }

        let phase_label: String = row.try_get("phase").map_err(|e| RangeStoreError::Backend(e.to_string()))?;
        let phase = SessionPhase::from_str(&phase_label).map_err(|e| RangeStoreError::Backend(e.to_string()))?;

        Ok(Some(BreakoutRange {
            asset_epic: row
                .try_get::<String, _>("asset_epic")
                .map_err(|e| RangeStoreError::Backend(e.to_string()))?
                .into(),
            phase,
            start_time: row.try_get("start_time").map_err(|e| RangeStoreError::Backend(e.to_string()))?,
            end_time,
            computed_high: row.try_get("computed_high").map_err(|e| RangeStoreError::Backend(e.to_string()))?,
            computed_low: row.try_get("computed_low").map_err(|e| RangeStoreError::Backend(e.to_string()))?,
            height_ticks: row.try_get("height_ticks").map_err(|e| RangeStoreError::Backend(e.to_string()))?,
            height_points: row.try_get("height_points").map_err(|e| RangeStoreError::Backend(e.to_string()))?,
            candle_count: row.try_get::<i32, _>("candle_count").map_err(|e| RangeStoreError::Backend(e.to_string()))? as u32,
            atr: row.try_get("atr").map_err(|e| RangeStoreError::Backend(e.to_string()))?,
            manual_high: row.try_get("manual_high").map_err(|e| RangeStoreError::Backend(e.to_string()))?,
            manual_low: row.try_get("manual_low").map_err(|e| RangeStoreError::Backend(e.to_string()))?,
            last_adjusted_by: row
                .try_get::<Option<String>, _>("last_adjusted_by")
                .map_err(|e| RangeStoreError::Backend(e.to_string()))?
                .map(Into::into),
            last_adjusted_at: row.try_get("last_adjusted_at").map_err(|e| RangeStoreError::Backend(e.to_string()))?,
        }))
    }
}
