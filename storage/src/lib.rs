#![forbid(unsafe_code)]
#![warn(
    unused,
    clippy::cognitive_complexity,
    unused_crate_dependencies,
    unused_extern_crates,
    clippy::unused_self,
    clippy::useless_let_if_seq,
    missing_debug_implementations,
    rust_2018_idioms
)]
#![allow(clippy::type_complexity, clippy::too_many_arguments)]

//! # Storage
//!
//! The Diagnostics & Status Store: a `sqlx`/Postgres persistence layer for
//! `TradingAsset`/`AssetSessionPhaseConfig`, `WorkerStatus`,
//! `AssetDiagnostics`, `BreakoutRange` (via a [`fiona_data::RangeStore`]
//! implementation), `PriceSnapshot`, `AssetPriceStatus`, and per-broker
//! connection config rows.

pub mod asset_store;
pub mod broker_config_store;
pub mod diagnostics_store;
pub mod error;
pub mod pool;
pub mod price_snapshot_store;
pub mod range_store;
pub mod status_store;
pub mod types;

pub use asset_store::AssetStore;
pub use broker_config_store::BrokerConfigStore;
pub use diagnostics_store::{CounterDelta, DiagnosticsStore};
pub use error::StorageError;
pub use pool::connect;
pub use price_snapshot_store::{PriceSnapshotStore, SNAPSHOT_RETENTION};
pub use range_store::SqlxRangeStore;
pub use status_store::StatusStore;
pub use types::{AssetDiagnostics, AssetPriceStatus, BrokerConfigRow, CriteriaRecord, PriceSnapshot, WorkerStatus};
