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

//! # Risk
//!
//! The Risk Engine: gates a proposed order against account equity,
//! existing positions, nominal trade risk, time-of-day and per-asset
//! trading mode. Never mutates state.

pub mod codes;
pub mod engine;
pub mod types;

pub use codes::*;
pub use engine::RiskEngine;
pub use types::{RiskConfig, RiskEvaluationResult};
