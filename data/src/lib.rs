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

//! # Data
//!
//! The Market State Provider: phase resolution, the 1-minute candle cache,
//! and per-phase breakout range accumulation and persistence.

pub mod error;
pub mod provider;
pub mod range_store;

pub use error::DataError;
pub use provider::MarketStateProvider;
pub use range_store::{InMemoryRangeStore, RangeStore, RangeStoreError};
