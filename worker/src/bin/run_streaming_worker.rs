//! The Streaming Worker binary: subscribes to one broker's live 1m-candle
//! feed for every active asset of that broker kind and folds each update
//! straight into the shared market state cache, instead of polling REST
//! quotes on a fixed interval like `run-worker` does.
//!
//! A broker with no streaming feed (the default [`BrokerClient`] methods)
//! simply never produces candles here; the binary still runs, it just has
//! nothing to ingest.

use std::time::Duration as StdDuration;

use clap::Parser;

use fiona_core::{init_logging, wait_for_shutdown_or, WorkerConfig, WorkerContext};
use fiona_markets::BrokerKind;

#[derive(Debug, Parser)]
#[command(author, version, about = "Runs the Fiona streaming worker loop")]
struct Args {
    /// Seconds between polls of the broker's live candle buffer.
    #[arg(long, default_value_t = 5)]
    interval: u64,

    /// Which broker's live feed to subscribe to.
    #[arg(long, value_enum, default_value_t = StreamingBroker::Kraken)]
    broker: StreamingBroker,
}

#[derive(Debug, Clone, Copy, clap::ValueEnum)]
enum StreamingBroker {
    Ig,
    Mexc,
    Kraken,
}

impl From<StreamingBroker> for BrokerKind {
    fn from(value: StreamingBroker) -> Self {
        match value {
            StreamingBroker::Ig => BrokerKind::Ig,
            StreamingBroker::Mexc => BrokerKind::Mexc,
            StreamingBroker::Kraken => BrokerKind::Kraken,
        }
    }
}

#[tokio::main]
async fn main() -> std::process::ExitCode {
    init_logging();

    let args = Args::parse();
    let broker_kind: BrokerKind = args.broker.into();

    let config = WorkerConfig::load();
    let ctx = match WorkerContext::build(&config, true).await {
        Ok(ctx) => ctx,
        Err(err) => {
            tracing::error!(error = %err, "failed to build worker context");
            return std::process::ExitCode::FAILURE;
        }
    };

    let assets = match ctx.asset_store.load_active_assets().await {
        Ok(assets) => assets
            .into_iter()
            .filter(|(asset, _)| asset.broker_kind == broker_kind)
            .collect::<Vec<_>>(),
        Err(err) => {
            tracing::error!(error = %err, "failed to load active assets");
            return std::process::ExitCode::FAILURE;
        }
    };

    if assets.is_empty() {
        tracing::info!(broker = %broker_kind, "no active assets configured for this broker, exiting");
        return std::process::ExitCode::SUCCESS;
    }

    let broker = match ctx.registry.get(broker_kind).await {
        Ok(broker) => broker,
        Err(err) => {
            tracing::error!(error = %err, "failed to connect to streaming broker");
            return std::process::ExitCode::FAILURE;
        }
    };

    let symbols: Vec<String> = assets
        .iter()
        .map(|(asset, _)| asset.effective_broker_symbol().to_string())
        .collect();

    if let Err(err) = broker.start_price_stream(&symbols).await {
        tracing::error!(error = %err, "failed to start price stream");
        return std::process::ExitCode::FAILURE;
    }

    tracing::info!(broker = %broker_kind, symbols = symbols.len(), "streaming worker subscribed");

    wait_for_shutdown_or(async {
        loop {
            for (asset, _) in &assets {
                let symbol = asset.effective_broker_symbol();
                match broker.get_live_candles_1m(symbol).await {
                    Ok(candles) => {
                        for candle in candles {
                            ctx.provider.ingest_candle(asset.epic.as_str(), candle);
                        }
                    }
                    Err(fiona_markets::BrokerError::NotConnected) => {
                        // No streaming feed for this broker; nothing to ingest.
                    }
                    Err(err) => {
                        tracing::warn!(epic = %asset.epic, error = %err, "failed to read live candle buffer");
                    }
                }
            }

            tokio::time::sleep(StdDuration::from_secs(args.interval)).await;
        }
    })
    .await;

    tracing::info!("streaming worker shutting down");
    if let Err(err) = broker.stop_price_stream().await {
        tracing::warn!(error = %err, "failed to stop price stream cleanly");
    }
    ctx.registry.disconnect_all().await;

    std::process::ExitCode::SUCCESS
}
