//! [`TickSink`]: the write side of one tick, factored out of [`crate::tick`]
//! so the loop itself never depends on `sqlx`/Postgres directly. Production
//! binaries wire [`SqlxTickSink`]; tests use [`InMemoryTickSink`].

use std::sync::Mutex;

use async_trait::async_trait;
use chrono::{DateTime, Utc};

use fiona_storage::{AssetPriceStatus, CounterDelta, DiagnosticsStore, PriceSnapshot, PriceSnapshotStore, StatusStore, WorkerStatus};

/// Every write a tick makes against durable storage, minus asset/phase
/// config loading (which happens once, up front, via `AssetStore` directly).
#[async_trait]
pub trait TickSink: Send + Sync {
    async fn write_status(&self, status: &WorkerStatus);

    async fn increment(&self, asset_epic: &str, now: DateTime<Utc>, delta: CounterDelta);

    async fn record_rejection(&self, asset_epic: &str, now: DateTime<Utc>, reason_code: &str);

    async fn insert_price_snapshot(&self, snapshot: &PriceSnapshot);

    async fn upsert_price_status(&self, status: &AssetPriceStatus);
}

/// Best-effort Postgres-backed sink: a failed write is logged and does not
/// abort the tick, since diagnostics/status are observability, not the
/// trading decision path itself.
pub struct SqlxTickSink {
    status_store: StatusStore,
    diagnostics_store: DiagnosticsStore,
    price_snapshot_store: PriceSnapshotStore,
}

impl SqlxTickSink {
    pub fn new(
        status_store: StatusStore,
        diagnostics_store: DiagnosticsStore,
        price_snapshot_store: PriceSnapshotStore,
    ) -> Self {
        Self {
            status_store,
            diagnostics_store,
            price_snapshot_store,
        }
    }

    /// Drops `price_snapshots` rows older than the retention window. Run
    /// hourly from the worker loop, not per tick.
    pub async fn trim_price_snapshots(&self, now: DateTime<Utc>) -> Result<u64, fiona_storage::StorageError> {
        self.price_snapshot_store.cleanup_old_snapshots(now).await
    }
}

#[async_trait]
impl TickSink for SqlxTickSink {
    async fn write_status(&self, status: &WorkerStatus) {
        if let Err(err) = self.status_store.write(status).await {
            tracing::error!(error = %err, "failed to persist worker status");
        }
    }

    async fn increment(&self, asset_epic: &str, now: DateTime<Utc>, delta: CounterDelta) {
        if let Err(err) = self.diagnostics_store.increment(asset_epic, now, delta).await {
            tracing::warn!(asset_epic, error = %err, "failed to persist diagnostics counters");
        }
    }

    async fn record_rejection(&self, asset_epic: &str, now: DateTime<Utc>, reason_code: &str) {
        if let Err(err) = self.diagnostics_store.record_rejection(asset_epic, now, reason_code).await {
            tracing::warn!(asset_epic, error = %err, "failed to persist rejection reason");
        }
    }

    async fn insert_price_snapshot(&self, snapshot: &PriceSnapshot) {
        if let Err(err) = self.price_snapshot_store.insert(snapshot).await {
            tracing::warn!(asset_epic = %snapshot.asset_epic, error = %err, "failed to persist price snapshot");
        }
    }

    async fn upsert_price_status(&self, status: &AssetPriceStatus) {
        if let Err(err) = self.price_snapshot_store.upsert_price_status(status).await {
            tracing::warn!(asset_epic = %status.asset_epic, error = %err, "failed to persist asset price status");
        }
    }
}

/// Captures every call in memory, for asserting on tick behavior without a
/// database. Not behind `#[cfg(test)]` so `worker/tests/` (a separate
/// compilation unit) can use it too.
#[derive(Default)]
pub struct InMemoryTickSink {
    pub statuses: Mutex<Vec<WorkerStatus>>,
    pub increments: Mutex<Vec<(String, CounterDelta)>>,
    pub rejections: Mutex<Vec<(String, String)>>,
    pub price_snapshots: Mutex<Vec<PriceSnapshot>>,
    pub price_statuses: Mutex<Vec<AssetPriceStatus>>,
}

impl InMemoryTickSink {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn last_status(&self) -> Option<WorkerStatus> {
        self.statuses.lock().unwrap().last().cloned()
    }
}

#[async_trait]
impl TickSink for InMemoryTickSink {
    async fn write_status(&self, status: &WorkerStatus) {
        self.statuses.lock().unwrap().push(status.clone());
    }

    async fn increment(&self, asset_epic: &str, _now: DateTime<Utc>, delta: CounterDelta) {
        self.increments.lock().unwrap().push((asset_epic.to_string(), delta));
    }

    async fn record_rejection(&self, asset_epic: &str, _now: DateTime<Utc>, reason_code: &str) {
        self.rejections
            .lock()
            .unwrap()
            .push((asset_epic.to_string(), reason_code.to_string()));
    }

    async fn insert_price_snapshot(&self, snapshot: &PriceSnapshot) {
        self.price_snapshots.lock().unwrap().push(snapshot.clone());
    }

    async fn upsert_price_status(&self, status: &AssetPriceStatus) {
        self.price_statuses.lock().unwrap().push(status.clone());
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    fn sample_status() -> WorkerStatus {
        WorkerStatus {
            last_run_at: Utc::now(),
            phase: "US_CORE_TRADING".into(),
            last_mid_price: Some(dec!(100)),
            last_bid: Some(dec!(99.9)),
            last_ask: Some(dec!(100.1)),
            last_spread: Some(dec!(0.2)),
            setup_count: 0,
            message: "no setups".to_string(),
            criteria: Vec::new(),
            poll_interval_secs: 60,
        }
    }

    #[tokio::test]
    async fn in_memory_sink_records_the_last_status_written() {
        let sink = InMemoryTickSink::new();
        sink.write_status(&sample_status()).await;
        assert_eq!(sink.last_status().unwrap().message, "no setups");
    }

    #[tokio::test]
    async fn in_memory_sink_accumulates_rejections() {
        let sink = InMemoryTickSink::new();
        sink.record_rejection("EPIC1", Utc::now(), "RISK_INVALID_SIZE").await;
        sink.record_rejection("EPIC1", Utc::now(), "RISK_MISSING_STOP_LOSS").await;
        assert_eq!(sink.rejections.lock().unwrap().len(), 2);
    }
}
