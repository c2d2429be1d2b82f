//! Persisted diagnostics/status rows.

use std::collections::HashMap;

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use smol_str::SmolStr;

/// Singleton row: last-writer-wins snapshot of the worker's most recent tick.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WorkerStatus {
    pub last_run_at: DateTime<Utc>,
    pub phase: SmolStr,
    pub last_mid_price: Option<Decimal>,
    pub last_bid: Option<Decimal>,
    pub last_ask: Option<Decimal>,
    pub last_spread: Option<Decimal>,
    pub setup_count: i32,
    pub message: String,
    pub criteria: Vec<CriteriaRecord>,
    pub poll_interval_secs: i32,
}

/// JSON-serializable mirror of `fiona_strategies::CriteriaEntry`, stored in
/// the `worker_status.criteria` jsonb column.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CriteriaRecord {
    pub name: String,
    pub passed: bool,
    pub detail: String,
}

/// Bucketed per-asset, per-hourly-window counters. Additive within a window;
/// `rejection_reasons` maps a risk violation code to how many times it fired.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AssetDiagnostics {
    pub asset_epic: SmolStr,
    pub window_start: DateTime<Utc>,
    pub window_end: DateTime<Utc>,
    pub candles_evaluated: i64,
    pub setups_generated: i64,
    pub setups_discarded: i64,
    pub setups_risk_approved: i64,
    pub setups_risk_rejected: i64,
    pub ranges_built: i64,
    pub rejection_reasons: HashMap<String, i64>,
}

impl AssetDiagnostics {
    /// Merges another window's counters into this one (used to aggregate
    /// across a time range).
    pub fn merge(&mut self, other: &AssetDiagnostics) {
        self.candles_evaluated += other.candles_evaluated;
        self.setups_generated += other.setups_generated;
        self.setups_discarded += other.setups_discarded;
        self.setups_risk_approved += other.setups_risk_approved;
        self.setups_risk_rejected += other.setups_risk_rejected;
        self.ranges_built += other.ranges_built;
        for (reason, count) in &other.rejection_reasons {
            *self.rejection_reasons.entry(reason.clone()).or_insert(0) += count;
        }
        self.window_start = self.window_start.min(other.window_start);
        self.window_end = self.window_end.max(other.window_end);
    }
}

/// Per-asset last bid/ask/spread/status-message row, written every cycle.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AssetPriceStatus {
    pub asset_epic: SmolStr,
    pub bid: Option<Decimal>,
    pub ask: Option<Decimal>,
    pub spread: Option<Decimal>,
    pub status_message: String,
    pub updated_at: DateTime<Utc>,
}

/// A single price sample retained for a short trailing window, used to
/// reconstruct the most recent candles if the worker restarts mid-phase.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PriceSnapshot {
    pub asset_epic: SmolStr,
    pub ts: DateTime<Utc>,
    pub price_mid: Decimal,
    pub price_bid: Decimal,
    pub price_ask: Decimal,
}

/// A broker's persisted connection configuration row; exactly one row per
/// `broker_kind` may have `is_active = true` at a time.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BrokerConfigRow {
    pub broker_kind: SmolStr,
    pub config: serde_json::Value,
    pub is_active: bool,
}
