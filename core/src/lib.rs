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

//! # Core
//!
//! Ambient wiring shared by both worker binaries: configuration, logging,
//! graceful shutdown, the workspace-level error type, and [`WorkerContext`]
//! — the explicit aggregate of every subsystem a tick needs.

pub mod config;
pub mod context;
pub mod error;
pub mod logging;
pub mod shutdown;

pub use config::WorkerConfig;
pub use context::WorkerContext;
pub use error::WorkerError;
pub use logging::{init_json_logging, init_logging, TICK_SLEEP_SPAN_NAME};
pub use shutdown::{wait_for_shutdown_or, AsyncShutdown, Shutdown, SyncShutdown};
