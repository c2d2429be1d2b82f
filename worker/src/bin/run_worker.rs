//! The Worker Loop binary: polls every active asset on a fixed interval,
//! running each tick through market data, strategy, KI, risk, and execution.
//!
//! ```text
//! run-worker --interval 60 --dry-run
//! run-worker --epic CS.D.BITCOIN.CFD.IP --shadow-only
//! ```

use std::time::Duration as StdDuration;

use chrono::{Duration as ChronoDuration, Utc};
use clap::Parser;
use tracing::Instrument;

use fiona_core::{init_json_logging, init_logging, wait_for_shutdown_or, WorkerConfig, WorkerContext};
use fiona_worker::sink::SqlxTickSink;
use fiona_worker::tick::run_tick;

/// How many consecutive ticks with no priced asset trigger a registry reset.
/// A handful of misses is normal (a broker blip); this many in a row points
/// at a stuck connection.
const RECONNECT_AFTER_CONSECUTIVE_EMPTY_TICKS: u32 = 3;
const RECONNECT_BACKOFF: StdDuration = StdDuration::from_secs(5);

#[derive(Debug, Parser)]
#[command(author, version, about = "Runs the Fiona trading worker loop")]
struct Args {
    /// Seconds between ticks.
    #[arg(long, default_value_t = 60)]
    interval: u64,

    /// Route every order through the shadow (paper) execution path, never live.
    #[arg(long)]
    shadow_only: bool,

    /// Restrict the tick to a single epic, ignoring every other active asset.
    #[arg(long)]
    epic: Option<String>,

    /// No effect beyond documenting intent: every tick already evaluates all
    /// active assets unless `--epic` narrows it. Kept for CLI symmetry with
    /// `--epic`.
    #[arg(long)]
    multi_asset: bool,

    /// Emit JSON-formatted logs and enable debug-level output.
    #[arg(long)]
    verbose: bool,

    /// Evaluate every tick but never route an order to a broker.
    #[arg(long)]
    dry_run: bool,

    /// Run a single tick and exit.
    #[arg(long)]
    once: bool,

    /// Stop after this many ticks. 0 means unbounded.
    #[arg(long, default_value_t = 0)]
    max_iterations: u64,
}

#[tokio::main]
async fn main() -> std::process::ExitCode {
    let args = Args::parse();

    if args.verbose {
        if std::env::var("RUST_LOG").is_err() {
            std::env::set_var("RUST_LOG", "debug");
        }
        init_json_logging();
    } else {
        init_logging();
    }

    let config = WorkerConfig::load();
    let ctx = match WorkerContext::build(&config, args.shadow_only).await {
        Ok(ctx) => ctx,
        Err(err) => {
            tracing::error!(error = %err, "failed to build worker context");
            return std::process::ExitCode::FAILURE;
        }
    };

    let WorkerContext {
        registry,
        provider,
        risk,
        execution,
        ki,
        status_store,
        diagnostics_store,
        price_snapshot_store,
        broker_config_store: _,
        asset_store,
    } = ctx;

    let sink = SqlxTickSink::new(status_store, diagnostics_store, price_snapshot_store);

    tracing::info!(interval = args.interval, dry_run = args.dry_run, "worker loop starting");

    let mut iterations: u64 = 0;
    let mut last_trim = Utc::now();
    let mut consecutive_empty_ticks: u32 = 0;

    wait_for_shutdown_or(async {
        loop {
            let now = Utc::now();

            let assets = match asset_store.load_active_assets().await {
                Ok(all) => match &args.epic {
                    Some(epic) => all.into_iter().filter(|(asset, _)| asset.epic.as_str() == epic).collect(),
                    None => all,
                },
                Err(err) => {
                    tracing::error!(error = %err, "failed to load active assets for this tick");
                    Vec::new()
                }
            };

            let report = run_tick(
                &registry,
                &provider,
                &risk,
                &execution,
                &ki,
                &sink,
                &assets,
                now,
                args.interval as i32,
                args.dry_run,
            )
            .await;

            tracing::info!(
                assets_processed = report.assets_processed,
                setups_proposed = report.setups_proposed,
                phase = %report.status.phase,
                "tick complete"
            );

            if report.status.last_mid_price.is_none() && report.assets_processed > 0 {
                consecutive_empty_ticks += 1;
            } else {
                consecutive_empty_ticks = 0;
            }

            if consecutive_empty_ticks >= RECONNECT_AFTER_CONSECUTIVE_EMPTY_TICKS {
                tracing::warn!(
                    consecutive_empty_ticks,
                    "no asset priced across several ticks, resetting broker connections"
                );
                registry.clear();
                consecutive_empty_ticks = 0;
                tokio::time::sleep(RECONNECT_BACKOFF).await;
            }

            if now.signed_duration_since(last_trim) >= ChronoDuration::hours(1) {
                match sink.trim_price_snapshots(now).await {
                    Ok(deleted) => tracing::info!(deleted, "trimmed stale price snapshots"),
                    Err(err) => tracing::warn!(error = %err, "failed to trim stale price snapshots"),
                }
                last_trim = now;
            }

            iterations += 1;
            if args.once || (args.max_iterations > 0 && iterations >= args.max_iterations) {
                break;
            }

            // Span name must match `fiona_core::logging::TICK_SLEEP_SPAN_NAME`
            // so `init_logging`'s filter suppresses this debug line at INFO.
            async {
                tracing::debug!(seconds = args.interval, "sleeping until next tick");
                tokio::time::sleep(StdDuration::from_secs(args.interval)).await;
            }
            .instrument(tracing::info_span!("worker_tick_sleep"))
            .await;
        }
    })
    .await;

    tracing::info!("worker loop shutting down, disconnecting brokers");
    registry.disconnect_all().await;

    std::process::ExitCode::SUCCESS
}
