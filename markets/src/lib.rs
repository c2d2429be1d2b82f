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

//! # Markets
//!
//! Domain model for the Fiona trading worker: tradable assets, session
//! phases, price/candle types, the persisted breakout range, and the
//! [`broker::BrokerClient`] trait with its [`registry::BrokerRegistry`].
//!
//! ## Modules
//! - `asset`: `TradingAsset`, `BrokerKind`, `TradingMode`
//! - `phase`: `SessionPhase`, `AssetSessionPhaseConfig`, `SessionTimes`
//! - `side`: `Side`
//! - `price`: `SymbolPrice`, `Candle1m`
//! - `range`: `BreakoutRange`
//! - `account`: `AccountState`, `Position`, `OrderRequest`, `OrderResult`
//! - `broker`: `BrokerClient` trait and `BrokerError`
//! - `registry`: the Broker Registry

pub mod account;
pub mod asset;
pub mod broker;
pub mod error;
pub mod phase;
pub mod price;
pub mod range;
pub mod registry;
pub mod side;

pub use account::{AccountState, OrderRequest, OrderResult, OrderStatus, OrderType, Position};
pub use asset::{BrokerKind, TradingAsset, TradingMode};
pub use broker::{BrokerClient, BrokerConnectionState, BrokerError};
pub use error::MarketsError;
pub use phase::{
    default_session_times, AssetSessionPhaseConfig, EiaReference, ParsePhaseError, SessionPhase, SessionTimes,
    FRIDAY_LATE_START_MINUTE,
};
pub use price::{Candle1m, SymbolPrice};
pub use range::BreakoutRange;
pub use registry::{BrokerFactory, BrokerRegistry, RegistryError};
pub use side::Side;
