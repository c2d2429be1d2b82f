//! Connection pool setup and schema initialization.
//!
//! Mirrors the teacher's persistence bootstrap (connect, then run
//! `CREATE TABLE IF NOT EXISTS` once) rather than a migration runner, since
//! the worker owns a single small schema.

use sqlx::postgres::{PgPool, PgPoolOptions};

use crate::error::StorageError;

pub async fn connect(database_url: &str) -> Result<PgPool, StorageError> {
    let pool = PgPoolOptions::new()
        .max_connections(10)
        .connect(database_url)
        .await?;
    tracing::info!("connected to storage database");
    init_schema(&pool).await?;
    Ok(pool)
}

pub async fn init_schema(pool: &PgPool) -> Result<(), StorageError> {
    sqlx::query(
        r#"
        CREATE TABLE IF NOT EXISTS worker_status (
            id SMALLINT PRIMARY KEY DEFAULT 1 CHECK (id = 1),
            last_run_at TIMESTAMPTZ NOT NULL,
            phase TEXT NOT NULL,
            last_mid_price NUMERIC,
            last_bid NUMERIC,
            last_ask NUMERIC,
            last_spread NUMERIC,
            setup_count INTEGER NOT NULL DEFAULT 0,
            message TEXT NOT NULL DEFAULT '',
            criteria JSONB NOT NULL DEFAULT '[]',
            poll_interval_secs INTEGER NOT NULL
        )
        "#,
    )
    .execute(pool)
    .await?;

    sqlx::query(
        r#"
        CREATE TABLE IF NOT EXISTS asset_diagnostics (
            asset_epic TEXT NOT NULL,
            window_start TIMESTAMPTZ NOT NULL,
            window_end TIMESTAMPTZ NOT NULL,
            candles_evaluated BIGINT NOT NULL DEFAULT 0,
            setups_generated BIGINT NOT NULL DEFAULT 0,
            setups_discarded BIGINT NOT NULL DEFAULT 0,
            setups_risk_approved BIGINT NOT NULL DEFAULT 0,
            setups_risk_rejected BIGINT NOT NULL DEFAULT 0,
            ranges_built BIGINT NOT NULL DEFAULT 0,
            rejection_reasons JSONB NOT NULL DEFAULT '{}',
            PRIMARY KEY (asset_epic, window_start)
        )
        "#,
    )
    .execute(pool)
    .await?;

    sqlx::query(
        r#"
        CREATE TABLE IF NOT EXISTS breakout_ranges (
            id BIGSERIAL PRIMARY KEY,
            asset_epic TEXT NOT NULL,
            phase TEXT NOT NULL,
            start_time TIMESTAMPTZ NOT NULL,
            end_time TIMESTAMPTZ NOT NULL,
            computed_high NUMERIC NOT NULL,
            computed_low NUMERIC NOT NULL,
            height_ticks BIGINT NOT NULL,
            height_points NUMERIC NOT NULL,
            candle_count INTEGER NOT NULL,
            atr NUMERIC,
            manual_high NUMERIC,
            manual_low NUMERIC,
            last_adjusted_by TEXT,
            last_adjusted_at TIMESTAMPTZ
        )
        "#,
    )
    .execute(pool)
    .await?;
    sqlx::query("CREATE INDEX IF NOT EXISTS breakout_ranges_lookup ON breakout_ranges (asset_epic, phase, end_time DESC)")
        .execute(pool)
        .await?;

    sqlx::query(
        r#"
        CREATE TABLE IF NOT EXISTS price_snapshots (
            id BIGSERIAL PRIMARY KEY,
            asset_epic TEXT NOT NULL,
            ts TIMESTAMPTZ NOT NULL,
            price_mid NUMERIC NOT NULL,
            price_bid NUMERIC NOT NULL,
            price_ask NUMERIC NOT NULL
        )
        "#,
    )
    .execute(pool)
    .await?;
    sqlx::query("CREATE INDEX IF NOT EXISTS price_snapshots_by_asset_ts ON price_snapshots (asset_epic, ts)")
        .execute(pool)
        .await?;

    sqlx::query(
        r#"
        CREATE TABLE IF NOT EXISTS asset_price_status (
            asset_epic TEXT PRIMARY KEY,
            bid NUMERIC,
            ask NUMERIC,
            spread NUMERIC,
            status_message TEXT NOT NULL DEFAULT '',
            updated_at TIMESTAMPTZ NOT NULL
        )
        "#,
    )
    .execute(pool)
    .await?;

    sqlx::query(
        r#"
        CREATE TABLE IF NOT EXISTS broker_configs (
            broker_kind TEXT PRIMARY KEY,
            config JSONB NOT NULL,
            is_active BOOLEAN NOT NULL DEFAULT true
        )
        "#,
    )
    .execute(pool)
    .await?;

    sqlx::query(
        r#"
        CREATE TABLE IF NOT EXISTS trading_assets (
            epic TEXT PRIMARY KEY,
            symbol TEXT NOT NULL,
            broker_kind TEXT NOT NULL,
            broker_symbol TEXT,
            category TEXT NOT NULL,
            tick_size NUMERIC NOT NULL,
            is_crypto BOOLEAN NOT NULL DEFAULT false,
            is_active BOOLEAN NOT NULL DEFAULT true,
            trading_mode TEXT NOT NULL DEFAULT 'STRICT',
            trades_24_7 BOOLEAN NOT NULL DEFAULT false
        )
        "#,
    )
    .execute(pool)
    .await?;

    sqlx::query(
        r#"
        CREATE TABLE IF NOT EXISTS asset_session_phase_configs (
            id BIGSERIAL PRIMARY KEY,
            asset_epic TEXT NOT NULL REFERENCES trading_assets (epic),
            phase TEXT NOT NULL,
            start_minute INTEGER NOT NULL,
            end_minute INTEGER NOT NULL,
            is_range_build_phase BOOLEAN NOT NULL DEFAULT false,
            is_trading_phase BOOLEAN NOT NULL DEFAULT false,
            enabled BOOLEAN NOT NULL DEFAULT true,
            priority INTEGER NOT NULL DEFAULT 0
        )
        "#,
    )
    .execute(pool)
    .await?;
    sqlx::query(
        "CREATE INDEX IF NOT EXISTS asset_session_phase_configs_by_asset ON asset_session_phase_configs (asset_epic)",
    )
    .execute(pool)
    .await?;

    Ok(())
}
