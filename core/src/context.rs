//! `WorkerContext`: the explicit, owned aggregate of every subsystem the
//! worker binaries drive each tick. Replaces the original's module-level
//! singletons (`BrokerRegistry`, `MarketDataService`, the Weaviate client)
//! with one value built once at startup and threaded through by reference.

use std::collections::HashMap;
use std::sync::Arc;

use reqwest::Client;

use fiona_brokers::{IgClient, IgConfig, KrakenClient, KrakenConfig, MexcClient, MexcConfig};
use fiona_data::MarketStateProvider;
use fiona_execution::ExecutionService;
use fiona_ki::{HttpLocalLlmEvaluator, HttpReflectionEvaluator, KiOrchestrator};
use fiona_markets::{BrokerClient, BrokerFactory, BrokerKind, BrokerRegistry};
use fiona_risk::{RiskConfig, RiskEngine};
use fiona_storage::{
    AssetStore, BrokerConfigStore, DiagnosticsStore, PriceSnapshotStore, SqlxRangeStore, StatusStore,
};

use crate::config::WorkerConfig;
use crate::error::WorkerError;

/// Everything a worker tick needs, built once from [`WorkerConfig`] and
/// shared (by `Arc` where a subsystem is itself referenced from another,
/// by plain ownership otherwise) across the lifetime of the process.
pub struct WorkerContext {
    pub registry: Arc<BrokerRegistry>,
    pub provider: Arc<MarketStateProvider>,
    pub risk: RiskEngine,
    pub execution: ExecutionService,
    pub ki: KiOrchestrator,
    pub status_store: StatusStore,
    pub diagnostics_store: DiagnosticsStore,
    pub price_snapshot_store: PriceSnapshotStore,
    pub broker_config_store: BrokerConfigStore,
    pub asset_store: AssetStore,
}

impl WorkerContext {
    /// Connects to storage, builds the broker factories for whichever
    /// credentials are present in `config`, and wires every subsystem
    /// together. Returns a `WorkerError::Config` if neither an LLM
    /// endpoint is configured (the KI Orchestrator requires both stages).
    pub async fn build(config: &WorkerConfig, shadow_only: bool) -> Result<Self, WorkerError> {
        let pool = fiona_storage::connect(&config.database_url).await?;

        let registry = Arc::new(BrokerRegistry::new(broker_factories(config)));
        let range_store = Arc::new(SqlxRangeStore::new(pool.clone()));
        let provider = Arc::new(MarketStateProvider::new(registry.clone(), None, range_store));

        let local_url = config
            .local_llm_url
            .clone()
            .ok_or_else(|| WorkerError::Config("FIONA_LOCAL_LLM_URL is not set".to_string()))?;
        let reflection_url = config
            .reflection_llm_url
            .clone()
            .ok_or_else(|| WorkerError::Config("FIONA_REFLECTION_LLM_URL is not set".to_string()))?;

        let http = Client::builder()
            .timeout(std::time::Duration::from_secs(config.timeout_secs))
            .build()
            .map_err(|e| WorkerError::Config(format!("failed to build HTTP client: {e}")))?;

        let local_eval = Arc::new(HttpLocalLlmEvaluator::new(http.clone(), local_url, config.llm_api_key.clone()));
        let reflection_eval =
            Arc::new(HttpReflectionEvaluator::new(http, reflection_url, config.llm_api_key.clone()));
        let ki = KiOrchestrator::new(local_eval, reflection_eval, None);

        Ok(Self {
            registry,
            provider,
            risk: RiskEngine::new(RiskConfig::default()),
            execution: ExecutionService::new(shadow_only),
            ki,
            status_store: StatusStore::new(pool.clone()),
            diagnostics_store: DiagnosticsStore::new(pool.clone()),
            price_snapshot_store: PriceSnapshotStore::new(pool.clone()),
            broker_config_store: BrokerConfigStore::new(pool.clone()),
            asset_store: AssetStore::new(pool),
        })
    }
}

/// Registers one factory per broker kind whose credentials are present in
/// `config`. A broker with no credentials configured is simply absent from
/// the registry; resolving it later surfaces `RegistryError::ConfigMissing`.
fn broker_factories(config: &WorkerConfig) -> HashMap<BrokerKind, BrokerFactory> {
    let mut factories: HashMap<BrokerKind, BrokerFactory> = HashMap::new();

    if let (Some(api_key), Some(identifier), Some(password)) =
        (&config.ig_api_key, &config.ig_identifier, &config.ig_password)
    {
        let cfg = IgConfig {
            api_key: api_key.clone(),
            identifier: identifier.clone(),
            password: password.clone(),
            base_url: config.ig_base_url.clone(),
        };
        factories.insert(
            BrokerKind::Ig,
            Arc::new(move || Arc::new(IgClient::new(cfg.clone())) as Arc<dyn BrokerClient>),
        );
    }

    if let (Some(client_id), Some(client_secret), Some(refresh_token)) =
        (&config.mexc_client_id, &config.mexc_client_secret, &config.mexc_refresh_token)
    {
        let cfg = MexcConfig {
            client_id: client_id.clone(),
            client_secret: client_secret.clone(),
            refresh_token: refresh_token.clone(),
            base_url: config.mexc_base_url.clone(),
        };
        factories.insert(
            BrokerKind::Mexc,
            Arc::new(move || Arc::new(MexcClient::new(cfg.clone())) as Arc<dyn BrokerClient>),
        );
    }

    if let (Some(api_key), Some(api_secret)) = (&config.kraken_api_key, &config.kraken_api_secret) {
        let cfg = KrakenConfig {
            api_key: api_key.clone(),
            api_secret: api_secret.clone(),
            base_url: config.kraken_base_url.clone(),
        };
        factories.insert(
            BrokerKind::Kraken,
            Arc::new(move || Arc::new(KrakenClient::new(cfg.clone())) as Arc<dyn BrokerClient>),
        );
    }

    factories
}

#[cfg(test)]
mod tests {
    use super::*;

    fn base_config() -> WorkerConfig {
        WorkerConfig {
            database_url: "postgres://localhost/test".to_string(),
            ig_api_key: None,
            ig_identifier: None,
            ig_password: None,
            ig_base_url: "https://demo-api.ig.com/gateway/deal".to_string(),
            mexc_client_id: None,
            mexc_client_secret: None,
            mexc_refresh_token: None,
            mexc_base_url: "https://api.mexc.com".to_string(),
            kraken_api_key: None,
            kraken_api_secret: None,
            kraken_base_url: "https://api.kraken.com".to_string(),
            local_llm_url: None,
            reflection_llm_url: None,
            llm_api_key: None,
            timeout_secs: 10,
        }
    }

    #[test]
    fn no_broker_factories_registered_without_credentials() {
        let factories = broker_factories(&base_config());
        assert!(factories.is_empty());
    }

    #[test]
    fn kraken_factory_registered_when_credentials_present() {
        let mut config = base_config();
        config.kraken_api_key = Some("key".to_string());
        config.kraken_api_secret = Some("c2VjcmV0".to_string());
        let factories = broker_factories(&config);
        assert!(factories.contains_key(&BrokerKind::Kraken));
        assert_eq!(factories.len(), 1);
    }

    #[test]
    fn partial_ig_credentials_do_not_register_a_factory() {
        let mut config = base_config();
        config.ig_api_key = Some("key".to_string());
        let factories = broker_factories(&config);
        assert!(!factories.contains_key(&BrokerKind::Ig));
    }
}
