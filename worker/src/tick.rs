//! The per-tick algorithm: one pass over every active asset, mutating
//! market state, running the strategy engine, and routing any setups
//! through KI, risk, and execution.

use std::sync::Arc;

use chrono::{DateTime, Utc};
use smol_str::SmolStr;

use fiona_data::MarketStateProvider;
use fiona_execution::ExecutionService;
use fiona_ki::{build_prompt_inputs, Direction as KiDirection, KiOrchestrator};
use fiona_markets::{BrokerRegistry, OrderRequest, OrderType, SessionPhase, SessionTimes, Side, SymbolPrice, TradingAsset};
use fiona_risk::RiskEngine;
use fiona_storage::{AssetPriceStatus, CounterDelta, CriteriaRecord, PriceSnapshot, WorkerStatus};
use fiona_strategies::{BreakoutStrategy, StrategyEngine};

use crate::sink::TickSink;

/// What one `run_tick` call produced, returned so callers (binaries and
/// tests) can log or assert on it without re-reading storage.
#[derive(Debug, Clone)]
pub struct TickReport {
    pub status: WorkerStatus,
    pub assets_processed: usize,
    pub setups_proposed: i32,
}

/// Runs one iteration over `assets`. Never fails: a broker, price, or
/// strategy error on one asset is recorded as a diagnostic and the loop
/// moves to the next asset, matching the "record error, continue" contract
/// every per-asset step below documents individually.
#[tracing::instrument(skip_all, fields(assets = assets.len(), poll_interval_secs, dry_run))]
pub async fn run_tick(
    registry: &BrokerRegistry,
    provider: &Arc<MarketStateProvider>,
    risk: &RiskEngine,
    execution: &ExecutionService,
    ki: &KiOrchestrator,
    sink: &dyn TickSink,
    assets: &[(TradingAsset, SessionTimes)],
    now: DateTime<Utc>,
    poll_interval_secs: i32,
    dry_run: bool,
) -> TickReport {
    if assets.is_empty() {
        let status = WorkerStatus {
            last_run_at: now,
            phase: SmolStr::new(SessionPhase::Other.to_string()),
            last_mid_price: None,
            last_bid: None,
            last_ask: None,
            last_spread: None,
            setup_count: 0,
            message: "no active assets".to_string(),
            criteria: Vec::new(),
            poll_interval_secs,
        };
        sink.write_status(&status).await;
        return TickReport {
            status,
            assets_processed: 0,
            setups_proposed: 0,
        };
    }

    let strategy = BreakoutStrategy::new(provider.clone());

    let mut total_setups = 0i32;
    let mut combined_criteria: Vec<CriteriaRecord> = Vec::new();
    let mut last_phase = SessionPhase::Other;
    let mut first_tick: Option<(SessionPhase, SymbolPrice)> = None;

    for (asset, session_times) in assets {
        let epic = asset.epic.as_str();

        let broker = match registry.get_for_asset(asset).await {
            Ok(broker) => broker,
            Err(err) => {
                tracing::warn!(epic, error = %err, "broker unavailable for asset, skipping this tick");
                sink.record_rejection(epic, now, "BROKER_UNAVAILABLE").await;
                continue;
            }
        };

        provider.set_current_asset(asset.clone(), session_times.clone());
        let phase = provider.get_phase(now);
        last_phase = phase;

        let price = match broker.get_symbol_price(asset.effective_broker_symbol()).await {
            Ok(price) => Some(price),
            Err(err) => {
                tracing::warn!(epic, error = %err, "price fetch failed for asset");
                sink.record_rejection(epic, now, "PRICE_UNAVAILABLE").await;
                None
            }
        };

        if let Some(price) = &price {
            if let Err(err) = provider.update_candle_from_price(epic, now).await {
                tracing::warn!(epic, error = %err, "candle update failed for asset");
            }

            sink.insert_price_snapshot(&PriceSnapshot {
                asset_epic: SmolStr::new(epic),
                ts: now,
                price_mid: price.mid_price(),
                price_bid: price.bid,
                price_ask: price.ask,
            })
            .await;
            sink.upsert_price_status(&AssetPriceStatus {
                asset_epic: SmolStr::new(epic),
                bid: Some(price.bid),
                ask: Some(price.ask),
                spread: Some(price.spread()),
                status_message: format!("phase={phase}"),
                updated_at: now,
            })
            .await;

            if first_tick.is_none() {
                first_tick = Some((phase, price.clone()));
            }

            sink.increment(
                epic,
                now,
                CounterDelta {
                    candles_evaluated: 1,
                    ..Default::default()
                },
            )
            .await;

            if session_times.is_range_building(phase) {
                provider.accumulate_range(epic, phase, price.mid_price(), now);
                if let Some((high, low, candle_count)) = provider.running_range(epic, phase) {
                    let start_time = provider.running_range_start_time(epic, phase).unwrap_or(now);
                    match provider
                        .set_range(epic, phase, high, low, start_time, now, candle_count, None)
                        .await
                    {
                        Ok(()) => {
                            sink.increment(
                                epic,
                                now,
                                CounterDelta {
                                    ranges_built: 1,
                                    ..Default::default()
                                },
                            )
                            .await;
                        }
                        Err(err) => tracing::warn!(epic, error = %err, "failed to persist breakout range"),
                    }
                }
            }
        } else {
            combined_criteria.push(CriteriaRecord {
                name: format!("{epic}_price_available"),
                passed: false,
                detail: "broker returned no price this tick".to_string(),
            });
        }

        if !session_times.is_trading_phase(phase) {
            provider.clear_current_asset();
            continue;
        }

        let (setups, summary, criteria) = match strategy.evaluate_with_diagnostics(epic, now).await {
            Ok(result) => result,
            Err(err) => {
                tracing::warn!(epic, error = %err, "strategy engine failed for asset");
                sink.record_rejection(epic, now, "STRATEGY_ERROR").await;
                provider.clear_current_asset();
                continue;
            }
        };

        combined_criteria.push(CriteriaRecord {
            name: format!("{epic}_summary"),
            passed: !setups.is_empty(),
            detail: summary.message,
        });
        for criterion in &criteria {
            combined_criteria.push(CriteriaRecord {
                name: format!("{epic}_{}", criterion.name),
                passed: criterion.passed,
                detail: criterion.detail.clone(),
            });
        }

        let discarded = criteria.iter().filter(|c| !c.passed).count() as i64;
        sink.increment(
            epic,
            now,
            CounterDelta {
                setups_generated: setups.len() as i64,
                setups_discarded: discarded,
                ..Default::default()
            },
        )
        .await;

        if setups.is_empty() {
            provider.clear_current_asset();
            continue;
        }

        let account = match broker.get_account_state().await {
            Ok(account) => account,
            Err(err) => {
                tracing::warn!(epic, error = %err, "account state unavailable, skipping this asset's setups");
                sink.record_rejection(epic, now, "ACCOUNT_UNAVAILABLE").await;
                provider.clear_current_asset();
                continue;
            }
        };
        let positions = broker.get_open_positions().await.unwrap_or_default();

        for setup in &setups {
            let prompt = build_prompt_inputs(setup, &account);
            let ki_eval = ki.evaluate(&prompt).await;

            let side = match ki_eval.direction {
                KiDirection::Long => Side::Long,
                KiDirection::Short => Side::Short,
                KiDirection::NoTrade => {
                    sink.record_rejection(epic, now, "KI_NO_TRADE").await;
                    sink.increment(
                        epic,
                        now,
                        CounterDelta {
                            setups_discarded: 1,
                            ..Default::default()
                        },
                    )
                    .await;
                    continue;
                }
            };

            total_setups += 1;

            let order = OrderRequest {
                symbol: SmolStr::new(asset.effective_broker_symbol()),
                side,
                size: ki_eval.size,
                order_type: OrderType::Market,
                limit_price: None,
                stop_loss: Some(ki_eval.stop_loss),
                take_profit: Some(ki_eval.take_profit),
            };

            let risk_eval = risk.evaluate(&account, &positions, setup, &order, asset.trading_mode, now);

            if risk_eval.allowed {
                sink.increment(
                    epic,
                    now,
                    CounterDelta {
                        setups_risk_approved: 1,
                        ..Default::default()
                    },
                )
                .await;
            } else {
                sink.increment(
                    epic,
                    now,
                    CounterDelta {
                        setups_risk_rejected: 1,
                        ..Default::default()
                    },
                )
                .await;
                for violation in &risk_eval.violations {
                    sink.record_rejection(epic, now, violation).await;
                }
            }

            let session = execution.propose_trade(setup, order, Some(ki_eval), risk_eval, now);

            if !dry_run {
                match execution.execute(session.id, broker.as_ref(), now).await {
                    Ok(outcome) => {
                        tracing::info!(epic, session_id = %session.id, ?outcome, "execution session routed")
                    }
                    Err(err) => {
                        tracing::error!(epic, session_id = %session.id, error = %err, "execution failed")
                    }
                }
            }
        }

        provider.clear_current_asset();
    }

    let status = match first_tick {
        Some((phase, price)) => WorkerStatus {
            last_run_at: now,
            phase: SmolStr::new(phase.to_string()),
            last_mid_price: Some(price.mid_price()),
            last_bid: Some(price.bid),
            last_ask: Some(price.ask),
            last_spread: Some(price.spread()),
            setup_count: total_setups,
            message: format!("{total_setups} setup(s) proposed across {} asset(s)", assets.len()),
            criteria: combined_criteria,
            poll_interval_secs,
        },
        None => WorkerStatus {
            last_run_at: now,
            phase: SmolStr::new(last_phase.to_string()),
            last_mid_price: None,
            last_bid: None,
            last_ask: None,
            last_spread: None,
            setup_count: total_setups,
            message: "no asset produced a price this tick".to_string(),
            criteria: combined_criteria,
            poll_interval_secs,
        },
    };

    sink.write_status(&status).await;

    TickReport {
        status,
        assets_processed: assets.len(),
        setups_proposed: total_setups,
    }
}
