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

//! # KI
//!
//! The KI Orchestrator: a two-stage local-then-reflection LLM evaluation
//! pipeline sitting between the strategy engine and the execution service.

pub mod error;
pub mod evaluator;
pub mod http;
pub mod orchestrator;
pub mod prompt;
pub mod types;

pub use error::KiError;
pub use evaluator::{KiResultSink, LocalLlmEvaluator, ReflectionEvaluator};
pub use http::{HttpLocalLlmEvaluator, HttpReflectionEvaluator};
pub use orchestrator::KiOrchestrator;
pub use prompt::build_prompt_inputs;
pub use types::{
    determine_signal_strength, Direction, KiEvaluationResult, LocalLlmResult, PromptInputs,
    ReflectionCorrections, ReflectionResult, SignalStrength,
};
