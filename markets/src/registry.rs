//! The Broker Registry: a process-wide cache of connected [`BrokerClient`]s,
//! keyed by [`BrokerKind`].
//!
//! Grounded in the Python `BrokerRegistry` singleton (lazy-connect-and-cache
//! per broker kind, guarded by a lock, with `disconnect_all`/`clear`). The
//! Rust version drops the singleton/global-state pattern per the redesign
//! notes: callers own a `BrokerRegistry` value inside their `WorkerContext`
//! instead of reaching for a module-level instance.

use std::collections::HashMap;
use std::sync::Arc;

use parking_lot::Mutex;

use crate::asset::{BrokerKind, TradingAsset};
use crate::broker::{BrokerClient, BrokerError};

/// A factory that builds and returns an unconnected client for one broker
/// kind. Registered once at worker startup from persisted broker config
/// (`IgBrokerConfig`/`MexcBrokerConfig`/`KrakenBrokerConfig`).
pub type BrokerFactory = Arc<dyn Fn() -> Arc<dyn BrokerClient> + Send + Sync>;

#[derive(Debug, thiserror::Error)]
pub enum RegistryError {
    #[error("no active broker configuration for {0}")]
    ConfigMissing(BrokerKind),

    #[error("unsupported broker kind {0}")]
    UnsupportedBroker(BrokerKind),

    #[error(transparent)]
    Broker(#[from] BrokerError),
}

/// Caches one connected client per [`BrokerKind`]. Connection happens
/// lazily on first use and the resulting handle is reused until
/// `disconnect_all`/`clear` is called (on worker shutdown or as part of the
/// reconnect policy after repeated failures).
pub struct BrokerRegistry {
    factories: HashMap<BrokerKind, BrokerFactory>,
    clients: Mutex<HashMap<BrokerKind, Arc<dyn BrokerClient>>>,
}

impl BrokerRegistry {
    pub fn new(factories: HashMap<BrokerKind, BrokerFactory>) -> Self {
        Self {
            factories,
            clients: Mutex::new(HashMap::new()),
        }
    }

    /// Returns the cached client for `kind`, connecting and inserting it
    /// into the cache on first use.
    pub async fn get(&self, kind: BrokerKind) -> Result<Arc<dyn BrokerClient>, RegistryError> {
        if let Some(client) = self.clients.lock().get(&kind).cloned() {
            return Ok(client);
        }

        let factory = self
            .factories
            .get(&kind)
            .ok_or(RegistryError::ConfigMissing(kind))?;
        let client = factory();
        client.connect().await?;

        let mut clients = self.clients.lock();
        let client = clients.entry(kind).or_insert(client).clone();
        Ok(client)
    }

    /// Convenience wrapper resolving the broker for a given asset.
    pub async fn get_for_asset(
        &self,
        asset: &TradingAsset,
    ) -> Result<Arc<dyn BrokerClient>, RegistryError> {
        self.get(asset.broker_kind).await
    }

    /// Disconnects every cached client and empties the cache. Used both on
    /// graceful shutdown and as the first step of the worker's reconnect
    /// policy after repeated tick failures.
    pub async fn disconnect_all(&self) {
        let clients: Vec<_> = self.clients.lock().drain().map(|(_, c)| c).collect();
        for client in clients {
            if let Err(err) = client.disconnect().await {
                tracing::warn!(error = %err, "error disconnecting broker client");
            }
        }
    }

    /// Drops all cached clients without disconnecting them. Used when a
    /// client is known to be in a broken state and reconnect should start
    /// from a clean slate.
    pub fn clear(&self) {
        self.clients.lock().clear();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::account::{AccountState, OrderRequest, OrderResult};
    use crate::broker::BrokerConnectionState;
    use crate::price::SymbolPrice;
    use async_trait::async_trait;
    use chrono::{DateTime, Utc};
    use std::sync::atomic::{AtomicUsize, Ordering};

    struct CountingClient {
        kind: BrokerKind,
        connects: Arc<AtomicUsize>,
    }

    #[async_trait]
    impl BrokerClient for CountingClient {
        fn kind(&self) -> BrokerKind {
            self.kind
        }

        fn connection_state(&self) -> BrokerConnectionState {
            BrokerConnectionState::Connected
        }

        async fn connect(&self) -> Result<(), BrokerError> {
            self.connects.fetch_add(1, Ordering::SeqCst);
            Ok(())
        }

        async fn disconnect(&self) -> Result<(), BrokerError> {
            Ok(())
        }

        async fn get_account_state(&self) -> Result<AccountState, BrokerError> {
            unimplemented!()
        }

        async fn get_open_positions(&self) -> Result<Vec<crate::account::Position>, BrokerError> {
            unimplemented!()
        }

        async fn get_symbol_price(&self, _symbol: &str) -> Result<SymbolPrice, BrokerError> {
            unimplemented!()
        }

        async fn get_historical_candles(
            &self,
            _symbol: &str,
            _since: DateTime<Utc>,
            _limit: usize,
        ) -> Result<Vec<crate::price::Candle1m>, BrokerError> {
            unimplemented!()
        }

        async fn submit_order(&self, _order: &OrderRequest) -> Result<OrderResult, BrokerError> {
            unimplemented!()
        }
    }

    fn registry_with_one_counting_client(connects: Arc<AtomicUsize>) -> BrokerRegistry {
        let mut factories: HashMap<BrokerKind, BrokerFactory> = HashMap::new();
        let connects_clone = connects.clone();
        factories.insert(
            BrokerKind::Kraken,
            Arc::new(move || {
                Arc::new(CountingClient {
                    kind: BrokerKind::Kraken,
                    connects: connects_clone.clone(),
                }) as Arc<dyn BrokerClient>
            }),
        );
        BrokerRegistry::new(factories)
    }

    #[tokio::test]
    async fn get_connects_once_and_caches() {
        let connects = Arc::new(AtomicUsize::new(0));
        let registry = registry_with_one_counting_client(connects.clone());

        registry.get(BrokerKind::Kraken).await.unwrap();
        registry.get(BrokerKind::Kraken).await.unwrap();

        assert_eq!(connects.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn missing_config_is_reported() {
        let registry = BrokerRegistry::new(HashMap::new());
        let err = registry.get(BrokerKind::Ig).await.unwrap_err();
        assert!(matches!(err, RegistryError::ConfigMissing(BrokerKind::Ig)));
    }

    #[tokio::test]
    async fn clear_forces_reconnect_on_next_get() {
        let connects = Arc::new(AtomicUsize::new(0));
        let registry = registry_with_one_counting_client(connects.clone());

        registry.get(BrokerKind::Kraken).await.unwrap();
        registry.clear();
        registry.get(BrokerKind::Kraken).await.unwrap();

        assert_eq!(connects.load(Ordering::SeqCst), 2);
    }
}
