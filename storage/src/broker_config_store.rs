//! Persisted per-broker connection configuration, with `is_active` selection
//! (exactly one active row per broker kind at a time).

use sqlx::postgres::PgPool;
use sqlx::Row;

use fiona_markets::BrokerKind;

use crate::error::StorageError;
use crate::types::BrokerConfigRow;

pub struct BrokerConfigStore {
    pool: PgPool,
}

impl BrokerConfigStore {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    /// Replaces the config for `kind`, marking it active. Any other config
    /// previously active for the same kind is left in place but inactive
    /// (this table stores one row per broker kind, so the upsert overwrites).
    pub async fn set_active(&self, kind: BrokerKind, config: serde_json::Value) -> Result<(), StorageError> {
        sqlx::query(
            r#"
            INSERT INTO broker_configs (broker_kind, config, is_active)
            VALUES ($1, $2, true)
            ON CONFLICT (broker_kind) DO UPDATE SET
                config = EXCLUDED.config,
                is_active = true
            "#,
        )
        .bind(kind.to_string())
        .bind(config)
        .execute(&self.pool)
        .await?;
        Ok(())
    }

    pub async fn deactivate(&self, kind: BrokerKind) -> Result<(), StorageError> {
        sqlx::query("UPDATE broker_configs SET is_active = false WHERE broker_kind = $1")
            .bind(kind.to_string())
            .execute(&self.pool)
            .await?;
        Ok(())
    }

    pub async fn load_active(&self, kind: BrokerKind) -> Result<Option<BrokerConfigRow>, StorageError> {
        let row = sqlx::query("SELECT * FROM broker_configs WHERE broker_kind = $1 AND is_active = true")
            .bind(kind.to_string())
            .fetch_optional(&self.pool)
            .await?;

        let Some(row) = row else { return Ok(None) };
        Ok(Some(BrokerConfigRow {
            broker_kind: row.try_get::<String, _>("broker_kind")?.into(),
            config: row.try_get("config")?,
            is_active: row.try_get("is_active")?,
        }))
    }
}
