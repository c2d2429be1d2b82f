//! Singleton `WorkerStatus` row: last writer wins.

use sqlx::postgres::PgPool;
use sqlx::types::Json;
use sqlx::Row;

use crate::error::StorageError;
use crate::types::{CriteriaRecord, WorkerStatus};

pub struct StatusStore {
    pool: PgPool,
}

impl StatusStore {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    /// Overwrites the singleton row. Always `id = 1`; the `ON CONFLICT`
    /// clause makes this idempotent per tick regardless of whether a prior
    /// tick has ever written one.
    pub async fn write(&self, status: &WorkerStatus) -> Result<(), StorageError> {
        sqlx::query(
            r#"
            INSERT INTO worker_status
                (id, last_run_at, phase, last_mid_price, last_bid, last_ask, last_spread,
                 setup_count, message, criteria, poll_interval_secs)
            VALUES (1, $1, $2, $3, $4, $5, $6, $7, $8, $9, $10)
            ON CONFLICT (id) DO UPDATE SET
                last_run_at = EXCLUDED.last_run_at,
                phase = EXCLUDED.phase,
                last_mid_price = EXCLUDED.last_mid_price,
                last_bid = EXCLUDED.last_bid,
                last_ask = EXCLUDED.last_ask,
                last_spread = EXCLUDED.last_spread,
                setup_count = EXCLUDED.setup_count,
                message = EXCLUDED.message,
                criteria = EXCLUDED.criteria,
                poll_interval_secs = EXCLUDED.poll_interval_secs
            "#,
        )
        .bind(status.last_run_at)
        .bind(status.phase.as_str())
        .bind(status.last_mid_price)
        .bind(status.last_bid)
        .bind(status.last_ask)
        .bind(status.last_spread)
        .bind(status.setup_count)
        .bind(&status.message)
        .bind(Json(&status.criteria))
        .bind(status.poll_interval_secs)
        .execute(&self.pool)
        .await?;
        Ok(())
    }

    pub async fn load(&self) -> Result<Option<WorkerStatus>, StorageError> {
        let row = sqlx::query("SELECT * FROM worker_status WHERE id = 1")
            .fetch_optional(&self.pool)
            .await?;

        let Some(row) = row else { return Ok(None) };
        let criteria: Json<Vec<CriteriaRecord>> = row.try_get("criteria")?;

        Ok(Some(WorkerStatus {
            last_run_at: row.try_get("last_run_at")?,
            phase: row.try_get::<String, _>("phase")?.into(),
            last_mid_price: row.try_get("last_mid_price")?,
            last_bid: row.try_get("last_bid")?,
            last_ask: row.try_get("last_ask")?,
            last_spread: row.try_get("last_spread")?,
            setup_count: row.try_get("setup_count")?,
            message: row.try_get("message")?,
            criteria: criteria.0,
            poll_interval_secs: row.try_get("poll_interval_secs")?,
        }))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;
    use rust_decimal_macros::dec;

    fn sample() -> WorkerStatus {
        WorkerStatus {
            last_run_at: Utc::now(),
            phase: "US_CORE_TRADING".into(),
            last_mid_price: Some(dec!(2400.15)),
            last_bid: Some(dec!(2400.10)),
            last_ask: Some(dec!(2400.20)),
            last_spread: Some(dec!(0.10)),
            setup_count: 2,
            message: "2 setups generated".to_string(),
            criteria: vec![CriteriaRecord {
                name: "range_broken_above".to_string(),
                passed: true,
                detail: "close above 2400.00".to_string(),
            }],
            poll_interval_secs: 60,
        }
    }

    #[test]
    fn sample_status_serializes_criteria_as_expected_shape() {
        let status = sample();
        assert_eq!(status.criteria.len(), 1);
        assert!(status.criteria[0].passed);
    }
}
