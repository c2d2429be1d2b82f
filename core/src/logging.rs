//! Standardized logging configuration for the worker. Structured logs with a
//! filter that suppresses a known-noisy span.
//!
//! ## Usage
//! ```rust,ignore
//! use fiona_core::logging::init_logging;
//!
//! fn main() {
//!     init_logging();
//!     tracing::info!("worker started");
//! }
//! ```
//!
//! `RUST_LOG` controls levels, e.g. `RUST_LOG=core=info,execution=debug`.

use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

/// Span name emitted once per tick while the worker loop sleeps until the
/// next poll; suppressed at INFO to avoid one log line per idle second.
pub const TICK_SLEEP_SPAN_NAME: &str = "worker_tick_sleep";

pub fn init_logging() {
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::filter::EnvFilter::builder()
                .with_default_directive(tracing_subscriber::filter::LevelFilter::INFO.into())
                .from_env_lossy(),
        )
        .with(tracing_subscriber::fmt::layer())
        .with(TickSleepSpanFilter)
        .init()
}

pub fn init_json_logging() {
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::filter::EnvFilter::builder()
                .with_default_directive(tracing_subscriber::filter::LevelFilter::INFO.into())
                .from_env_lossy(),
        )
        .with(tracing_subscriber::fmt::layer().json().flatten_event(true))
        .with(TickSleepSpanFilter)
        .init()
}

struct TickSleepSpanFilter;

impl<S> tracing_subscriber::layer::Layer<S> for TickSleepSpanFilter
where
    S: tracing::Subscriber + for<'a> tracing_subscriber::registry::LookupSpan<'a>,
{
    fn event_enabled(
        &self,
        _: &tracing::Event<'_>,
        ctx: tracing_subscriber::layer::Context<'_, S>,
    ) -> bool {
        if let Some(span) = ctx.lookup_current() {
            span.name() != TICK_SLEEP_SPAN_NAME
        } else {
            true
        }
    }
}
