//! End-to-end tick scenarios exercised against in-memory doubles: no
//! Postgres, no live brokers, just [`InMemoryTickSink`] and a couple of
//! scripted [`BrokerClient`] stand-ins.

use std::collections::HashMap;
use std::sync::Arc;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use rust_decimal_macros::dec;

use fiona_data::{InMemoryRangeStore, MarketStateProvider};
use fiona_execution::ExecutionService;
use fiona_ki::{Direction, KiError, KiOrchestrator, LocalLlmEvaluator, LocalLlmResult, PromptInputs, ReflectionEvaluator, ReflectionResult};
use fiona_markets::{
    AccountState, AssetSessionPhaseConfig, BrokerClient, BrokerConnectionState, BrokerError, BrokerFactory,
    BrokerKind, Candle1m, OrderRequest, OrderResult, OrderStatus, Position, SessionPhase, SessionTimes, SymbolPrice,
    TradingAsset, TradingMode,
};
use fiona_risk::{RiskConfig, RiskEngine};
use fiona_worker::{run_tick, InMemoryTickSink};

struct ScriptedBroker {
    kind: BrokerKind,
    price: Result<SymbolPrice, &'static str>,
}

#[async_trait]
impl BrokerClient for ScriptedBroker {
    fn kind(&self) -> BrokerKind {
        self.kind
    }

    fn connection_state(&self) -> BrokerConnectionState {
        BrokerConnectionState::Connected
    }

    async fn connect(&self) -> Result<(), BrokerError> {
        Ok(())
    }

    async fn disconnect(&self) -> Result<(), BrokerError> {
        Ok(())
    }

    async fn get_account_state(&self) -> Result<AccountState, BrokerError> {
        Ok(AccountState {
            currency: "USD".into(),
            balance: dec!(5000),
            available: dec!(5000),
            equity: dec!(5000),
            margin_used: dec!(0),
            as_of: Utc::now(),
        })
    }

    async fn get_open_positions(&self) -> Result<Vec<Position>, BrokerError> {
        Ok(Vec::new())
    }

    async fn get_symbol_price(&self, symbol: &str) -> Result<SymbolPrice, BrokerError> {
        match &self.price {
            Ok(p) => Ok(SymbolPrice {
                symbol: symbol.into(),
                ..p.clone()
            }),
            Err(reason) => Err(BrokerError::Network(reason.to_string())),
        }
    }

    async fn get_historical_candles(
        &self,
        _symbol: &str,
        _since: DateTime<Utc>,
        _limit: usize,
    ) -> Result<Vec<Candle1m>, BrokerError> {
        Ok(Vec::new())
    }

    async fn submit_order(&self, _order: &OrderRequest) -> Result<OrderResult, BrokerError> {
        Ok(OrderResult {
            broker_order_id: "SIM".into(),
            status: OrderStatus::Filled,
            filled_price: Some(dec!(100)),
            filled_size: Some(dec!(1)),
            submitted_at: Utc::now(),
            client_order_id: uuid::Uuid::new_v4(),
        })
    }
}

struct NoTradeLocal;

#[async_trait]
impl LocalLlmEvaluator for NoTradeLocal {
    async fn evaluate(&self, _inputs: &PromptInputs) -> Result<LocalLlmResult, KiError> {
        Ok(LocalLlmResult {
            direction: Direction::NoTrade,
            stop_loss: dec!(0),
            take_profit: dec!(0),
            size: dec!(0),
            reason: "no trade in this scenario".to_string(),
        })
    }
}

struct NoTradeReflection;

#[async_trait]
impl ReflectionEvaluator for NoTradeReflection {
    async fn evaluate(&self, _inputs: &PromptInputs, _local: &LocalLlmResult) -> Result<ReflectionResult, KiError> {
        Ok(ReflectionResult {
            corrections: None,
            confidence: 0,
            reasoning: "no reflection".to_string(),
        })
    }
}

fn asset(epic: &str, kind: BrokerKind) -> TradingAsset {
    TradingAsset {
        symbol: epic.into(),
        epic: epic.into(),
        broker_kind: kind,
        broker_symbol: None,
        category: "crypto".into(),
        tick_size: dec!(0.01),
        is_crypto: true,
        is_active: true,
        trading_mode: TradingMode::Strict,
        trades_24_7: true,
    }
}

fn never_trading_session() -> SessionTimes {
    SessionTimes::new(vec![AssetSessionPhaseConfig {
        phase: SessionPhase::AsiaRange,
        start_minute: 0,
        end_minute: 1439,
        is_range_build_phase: true,
        is_trading_phase: false,
        enabled: true,
        priority: 0,
    }])
}

fn price(mid: rust_decimal::Decimal) -> SymbolPrice {
    SymbolPrice {
        symbol: "".into(),
        bid: mid - dec!(0.01),
        ask: mid + dec!(0.01),
        timestamp: Utc::now(),
        day_high: None,
        day_low: None,
    }
}

fn ki_orchestrator() -> KiOrchestrator {
    KiOrchestrator::new(Arc::new(NoTradeLocal), Arc::new(NoTradeReflection), None)
}

/// §8 scenario 5: two active assets, the first asset's broker fails on
/// `get_symbol_price`, the second succeeds. A single `WorkerStatus` is
/// written, a rejection is recorded only for the failing asset, and the
/// second asset's price is still captured.
#[tokio::test]
async fn multi_asset_tick_one_broker_failure_does_not_block_the_other() {
    let broken: Arc<dyn BrokerClient> = Arc::new(ScriptedBroker {
        kind: BrokerKind::Ig,
        price: Err("quote service unavailable"),
    });
    let healthy: Arc<dyn BrokerClient> = Arc::new(ScriptedBroker {
        kind: BrokerKind::Kraken,
        price: Ok(price(dec!(200))),
    });

    let mut factories: HashMap<BrokerKind, BrokerFactory> = HashMap::new();
    factories.insert(BrokerKind::Ig, Arc::new(move || broken.clone()));
    factories.insert(BrokerKind::Kraken, Arc::new(move || healthy.clone()));
    let registry = Arc::new(fiona_markets::BrokerRegistry::new(factories));

    let range_store = Arc::new(InMemoryRangeStore::new());
    let provider = Arc::new(MarketStateProvider::new(registry.clone(), None, range_store));
    let risk = RiskEngine::new(RiskConfig::default());
    let execution = ExecutionService::new(true);
    let ki = ki_orchestrator();
    let sink = InMemoryTickSink::new();

    let assets = vec![
        (asset("FAIL.EPIC", BrokerKind::Ig), never_trading_session()),
        (asset("OK.EPIC", BrokerKind::Kraken), never_trading_session()),
    ];

    let report = run_tick(&registry, &provider, &risk, &execution, &ki, &sink, &assets, Utc::now(), 60, true).await;

    assert_eq!(report.assets_processed, 2);
    assert_eq!(sink.statuses.lock().unwrap().len(), 1);

    let rejections = sink.rejections.lock().unwrap();
    assert!(rejections.iter().any(|(epic, reason)| epic == "FAIL.EPIC" && reason == "PRICE_UNAVAILABLE"));
    assert!(!rejections.iter().any(|(epic, _)| epic == "OK.EPIC"));
    drop(rejections);

    let snapshots = sink.price_snapshots.lock().unwrap();
    assert_eq!(snapshots.len(), 1);
    assert_eq!(snapshots[0].asset_epic.as_str(), "OK.EPIC");
}

/// §8 scenario 5 (order independence): when the *first* asset in the slice
/// succeeds and a later one fails, the aggregated status still reflects the
/// first asset that produced a price, and the tick still processes every
/// asset rather than stopping at the failure.
#[tokio::test]
async fn a_later_failing_asset_does_not_change_the_already_captured_status_price() {
    let healthy: Arc<dyn BrokerClient> = Arc::new(ScriptedBroker {
        kind: BrokerKind::Kraken,
        price: Ok(price(dec!(50))),
    });
    let broken: Arc<dyn BrokerClient> = Arc::new(ScriptedBroker {
        kind: BrokerKind::Mexc,
        price: Err("timeout"),
    });

    let mut factories: HashMap<BrokerKind, BrokerFactory> = HashMap::new();
    factories.insert(BrokerKind::Kraken, Arc::new(move || healthy.clone()));
    factories.insert(BrokerKind::Mexc, Arc::new(move || broken.clone()));
    let registry = Arc::new(fiona_markets::BrokerRegistry::new(factories));

    let range_store = Arc::new(InMemoryRangeStore::new());
    let provider = Arc::new(MarketStateProvider::new(registry.clone(), None, range_store));
    let risk = RiskEngine::new(RiskConfig::default());
    let execution = ExecutionService::new(true);
    let ki = ki_orchestrator();
    let sink = InMemoryTickSink::new();

    let assets = vec![
        (asset("FIRST.EPIC", BrokerKind::Kraken), never_trading_session()),
        (asset("SECOND.EPIC", BrokerKind::Mexc), never_trading_session()),
    ];

    let report = run_tick(&registry, &provider, &risk, &execution, &ki, &sink, &assets, Utc::now(), 60, true).await;

    assert_eq!(report.assets_processed, 2);
    let status = sink.last_status().unwrap();
    assert_eq!(status.last_mid_price, Some(dec!(50)));
}
