//! Evaluator traits backing the two stages of the KI Orchestrator. See
//! [`crate::http`] for the HTTP-backed implementations; unit tests use the
//! `evaluate_with_fixed`/mock harness on [`crate::orchestrator::KiOrchestrator`]
//! instead.

use async_trait::async_trait;

use crate::error::KiError;
use crate::types::{LocalLlmResult, PromptInputs, ReflectionResult};

#[async_trait]
pub trait LocalLlmEvaluator: Send + Sync {
    async fn evaluate(&self, inputs: &PromptInputs) -> Result<LocalLlmResult, KiError>;
}

#[async_trait]
pub trait ReflectionEvaluator: Send + Sync {
    async fn evaluate(
        &self,
        inputs: &PromptInputs,
        local: &LocalLlmResult,
    ) -> Result<ReflectionResult, KiError>;
}

/// Optional sink for persisting evaluation results (the original's Weaviate
/// write). Persistence failures are logged and never fail the evaluation.
#[async_trait]
pub trait KiResultSink: Send + Sync {
    async fn store(&self, inputs: &PromptInputs, result: &crate::types::KiEvaluationResult);
}
