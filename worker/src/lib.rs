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

//! # Worker
//!
//! The per-tick loop both `run-worker` and `run-streaming-worker` drive:
//! resolve each active asset's broker and phase, update market state, run
//! the strategy engine, and push any setups through KI, risk, and
//! execution. [`tick::run_tick`] is the shared, storage-decoupled core;
//! [`sink::TickSink`] is the seam that lets it run against Postgres in
//! production and against an in-memory double in tests.

pub mod sink;
pub mod tick;

pub use sink::{InMemoryTickSink, SqlxTickSink, TickSink};
pub use tick::{run_tick, TickReport};
