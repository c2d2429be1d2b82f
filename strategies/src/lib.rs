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

//! # Strategies
//!
//! The Strategy Engine: a pure function over the current market state that
//! emits an ordered list of setup candidates, plus per-criterion
//! diagnostics for the operator UI.

pub mod breakout;
pub mod engine;
pub mod error;
pub mod types;

pub use breakout::BreakoutStrategy;
pub use engine::StrategyEngine;
pub use error::StrategyError;
pub use types::{BreakoutContext, CriteriaEntry, EiaContext, EvalSummary, SetupCandidate, SetupKind};
