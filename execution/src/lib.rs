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

//! # Execution
//!
//! The Execution Service: creates execution sessions from risk-evaluated
//! setups and routes them to a live or shadow trade.

pub mod error;
pub mod service;
pub mod types;

pub use error::ExecutionError;
pub use service::ExecutionService;
pub use types::{ExecutionOutcome, Session, SessionRoute, ShadowTrade, Trade};
