//! The [`BrokerClient`] trait: the capability surface every venue adapter in
//! `fiona-brokers` implements, plus the connection-lifecycle error taxonomy.

use async_trait::async_trait;
use chrono::{DateTime, Utc};

use crate::account::{AccountState, OrderRequest, OrderResult, Position};
use crate::asset::BrokerKind;
use crate::price::{Candle1m, SymbolPrice};

/// Errors a [`BrokerClient`] implementation may surface. Distinguishes
/// authentication failures (retryable once via re-auth) from transport and
/// venue-reported failures so the worker loop can apply the right recovery.
#[derive(Debug, thiserror::Error)]
pub enum BrokerError {
    #[error("authentication failed: {0}")]
    Authentication(String),

    #[error("network timeout: {0}")]
    Timeout(String),

    #[error("network error: {0}")]
    Network(String),

    #[error("broker rejected request: {0}")]
    Broker(String),

    #[error("invalid argument: {0}")]
    InvalidArgument(String),

    #[error("not connected")]
    NotConnected,
}

/// Connection lifecycle state of a [`BrokerClient`].
///
/// Mirrors the re-auth state machine from §9's redesign notes: a client
/// starts `Disconnected`, moves to `Connecting` on `connect()`, and once
/// authenticated stays `Connected` until a request fails authentication, at
/// which point it moves to `ReAuthing` for a single retry before either
/// returning to `Connected` or falling to `Failed`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BrokerConnectionState {
    Disconnected,
    Connecting,
    Connected,
    ReAuthing,
    Failed,
}

/// Capability surface a broker adapter must provide: connection lifecycle,
/// account/position reads, symbol pricing, and order submission.
///
/// Streaming methods are optional — implementations that have no WebSocket
/// feed (or none enabled for the current symbol set) return
/// `BrokerError::NotConnected` from `get_live_candles_1m`.
#[async_trait]
pub trait BrokerClient: Send + Sync {
    fn kind(&self) -> BrokerKind;

    fn connection_state(&self) -> BrokerConnectionState;

    async fn connect(&self) -> Result<(), BrokerError>;

    async fn disconnect(&self) -> Result<(), BrokerError>;

    async fn get_account_state(&self) -> Result<AccountState, BrokerError>;

    async fn get_open_positions(&self) -> Result<Vec<Position>, BrokerError>;

    async fn get_symbol_price(&self, symbol: &str) -> Result<SymbolPrice, BrokerError>;

    async fn get_historical_candles(
        &self,
        symbol: &str,
        since: DateTime<Utc>,
        limit: usize,
    ) -> Result<Vec<Candle1m>, BrokerError>;

    async fn submit_order(&self, order: &OrderRequest) -> Result<OrderResult, BrokerError>;

    /// Begins streaming 1m candles for `symbols`. Implementations without a
    /// streaming feed return `Ok(())` and simply never push anything through
    /// `get_live_candles_1m`. Restarting with a different symbol set
    /// requires an explicit `stop_price_stream` + `start_price_stream` pair;
    /// callers must reload persisted candles for newly added symbols into
    /// their own cache before subscribing.
    async fn start_price_stream(&self, symbols: &[String]) -> Result<(), BrokerError> {
        let _ = symbols;
        Ok(())
    }

    async fn stop_price_stream(&self) -> Result<(), BrokerError> {
        Ok(())
    }

    async fn get_live_candles_1m(&self, symbol: &str) -> Result<Vec<Candle1m>, BrokerError> {
        let _ = symbol;
        Err(BrokerError::NotConnected)
    }
}
