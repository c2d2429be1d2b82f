//! `PriceSnapshot` persistence plus its retention trim job, and the
//! per-asset `AssetPriceStatus` row written every cycle.

use chrono::{DateTime, Duration, Utc};
use sqlx::postgres::PgPool;
use sqlx::Row;

use crate::error::StorageError;
use crate::types::{AssetPriceStatus, PriceSnapshot};

/// Snapshots older than this are dropped by [`PriceSnapshotStore::cleanup_old_snapshots`].
pub const SNAPSHOT_RETENTION: Duration = Duration::hours(2);

pub struct PriceSnapshotStore {
    pool: PgPool,
}

impl PriceSnapshotStore {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    pub async fn insert(&self, snapshot: &PriceSnapshot) -> Result<(), StorageError> {
        sqlx::query(
            "INSERT INTO price_snapshots (asset_epic, ts, price_mid, price_bid, price_ask) VALUES ($1, $2, $3, $4, $5)",
        )
        .bind(snapshot.asset_epic.as_str())
        .bind(snapshot.ts)
        .bind(snapshot.price_mid)
        .bind(snapshot.price_bid)
        .bind(snapshot.price_ask)
        .execute(&self.pool)
        .await?;
        Ok(())
    }

    /// Deletes every snapshot older than [`SNAPSHOT_RETENTION`] relative to
    /// `now`. Intended to run hourly from the worker loop, not per tick.
    pub async fn cleanup_old_snapshots(&self, now: DateTime<Utc>) -> Result<u64, StorageError> {
        let cutoff = now - SNAPSHOT_RETENTION;
        let result = sqlx::query("DELETE FROM price_snapshots WHERE ts < $1")
            .bind(cutoff)
            .execute(&self.pool)
            .await?;
        Ok(result.rows_affected())
    }

    pub async fn upsert_price_status(&self, status: &AssetPriceStatus) -> Result<(), StorageError> {
        sqlx::query(
            r#"
            INSERT INTO asset_price_status (asset_epic, bid, ask, spread, status_message, updated_at)
            VALUES ($1, $2, $3, $4, $5, $6)
            ON CONFLICT (asset_epic) DO UPDATE SET
                bid = EXCLUDED.bid,
                ask = EXCLUDED.ask,
                spread = EXCLUDED.spread,
                status_message = EXCLUDED.status_message,
                updated_at = EXCLUDED.updated_at
            "#,
        )
        .bind(status.asset_epic.as_str())
        .bind(status.bid)
        .bind(status.ask)
        .bind(status.spread)
        .bind(&status.status_message)
        .bind(status.updated_at)
        .execute(&self.pool)
        .await?;
        Ok(())
    }

    pub async fn load_price_status(&self, asset_epic: &str) -> Result<Option<AssetPriceStatus>, StorageError> {
        let row = sqlx::query("SELECT * FROM asset_price_status WHERE asset_epic = $1")
            .bind(asset_epic)
            .fetch_optional(&self.pool)
            .await?;

        let Some(row) = row else { return Ok(None) };
        Ok(Some(AssetPriceStatus {
            asset_epic: row.try_get::<String, _>("asset_epic")?.into(),
            bid: row.try_get("bid")?,
            ask: row.try_get("ask")?,
            spread: row.try_get("spread")?,
            status_message: row.try_get("status_message")?,
            updated_at: row.try_get("updated_at")?,
        }))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn retention_window_is_two_hours() {
        assert_eq!(SNAPSHOT_RETENTION, Duration::hours(2));
    }
}
