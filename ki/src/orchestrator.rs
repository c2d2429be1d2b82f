//! The KI Orchestrator: a two-stage local-then-reflection LLM evaluation
//! pipeline. Stage one proposes a trade idea; stage two critiques it,
//! optionally overriding fields, and always attaches a confidence score.
//!
//! Neither stage's failure is fatal to the tick: `evaluate` never returns an
//! error. A local-evaluation failure yields a `NoTrade`/`NoTrade`-strength
//! result carrying the failure in `reasoning`; a reflection failure falls
//! back to the local result alone at a fixed low confidence, since the
//! reflection pass is an enhancement rather than a requirement.

use std::sync::Arc;

use tracing::warn;

use crate::evaluator::{KiResultSink, LocalLlmEvaluator, ReflectionEvaluator};
use crate::types::{
    determine_signal_strength, Direction, KiEvaluationResult, LocalLlmResult, PromptInputs,
    ReflectionResult,
};

/// Confidence assigned when reflection could not run at all, placing the
/// result in the `Weak` band rather than discarding it outright.
const REFLECTION_UNAVAILABLE_CONFIDENCE: u8 = 60;

pub struct KiOrchestrator {
    local: Arc<dyn LocalLlmEvaluator>,
    reflection: Arc<dyn ReflectionEvaluator>,
    sink: Option<Arc<dyn KiResultSink>>,
}

impl KiOrchestrator {
    pub fn new(
        local: Arc<dyn LocalLlmEvaluator>,
        reflection: Arc<dyn ReflectionEvaluator>,
        sink: Option<Arc<dyn KiResultSink>>,
    ) -> Self {
        Self {
            local,
            reflection,
            sink,
        }
    }

    /// Runs both stages against `inputs`, merges them, and best-effort
    /// persists the result. Never fails: local/reflection failures are
    /// folded into the returned result's `reasoning`.
    pub async fn evaluate(&self, inputs: &PromptInputs) -> KiEvaluationResult {
        let local = match self.local.evaluate(inputs).await {
            Ok(local) => local,
            Err(err) => {
                warn!(error = %err, epic = %inputs.epic, "local KI evaluation failed");
                return KiEvaluationResult {
                    direction: Direction::NoTrade,
                    stop_loss: inputs.reference_price,
                    take_profit: inputs.reference_price,
                    size: rust_decimal::Decimal::ZERO,
                    confidence: 0,
                    signal_strength: crate::types::SignalStrength::NoTrade,
                    reasoning: format!("local evaluation failed: {err}"),
                };
            }
        };

        let reflection = match self.reflection.evaluate(inputs, &local).await {
            Ok(reflection) => Some(reflection),
            Err(err) => {
                warn!(error = %err, epic = %inputs.epic, "reflection KI evaluation failed, using local result only");
                None
            }
        };

        let result = Self::merge_results(&local, reflection.as_ref());

        if let Some(sink) = &self.sink {
            sink.store(inputs, &result).await;
        }

        result
    }

    /// Runs only the local stage, propagating its error. Used by callers
    /// that want the raw stage-1 idea without reflection or persistence.
    pub async fn evaluate_local_only(
        &self,
        inputs: &PromptInputs,
    ) -> Result<LocalLlmResult, crate::error::KiError> {
        self.local.evaluate(inputs).await
    }

    /// Deterministic test harness: merges a caller-supplied local result and
    /// optional reflection result without invoking either evaluator or the
    /// sink. Mirrors the original's `evaluate_with_mock`.
    pub fn evaluate_with_fixed(
        local: &LocalLlmResult,
        reflection: Option<&ReflectionResult>,
    ) -> KiEvaluationResult {
        Self::merge_results(local, reflection)
    }

    /// Corrections from the reflection pass override the corresponding
    /// local value field-by-field; reasoning is the concatenation of both
    /// stages' explanations. When the merged direction ends up `NoTrade`
    /// (either the local model declined, or reflection corrected it to
    /// decline), `signal_strength` is forced to `NoTrade` regardless of
    /// confidence.
    fn merge_results(local: &LocalLlmResult, reflection: Option<&ReflectionResult>) -> KiEvaluationResult {
        let corrections = reflection.and_then(|r| r.corrections.as_ref());

        let direction = corrections
            .and_then(|c| c.direction)
            .unwrap_or(local.direction);
        let stop_loss = corrections.and_then(|c| c.stop_loss).unwrap_or(local.stop_loss);
        let take_profit = corrections
            .and_then(|c| c.take_profit)
            .unwrap_or(local.take_profit);
        let size = corrections.and_then(|c| c.size).unwrap_or(local.size);

        let confidence = reflection
            .map(|r| r.confidence)
            .unwrap_or(REFLECTION_UNAVAILABLE_CONFIDENCE);

        let reasoning = match reflection {
            Some(r) => format!("{} | reflection: {}", local.reason, r.reasoning),
            None => format!("{} | reflection unavailable, local result used as-is", local.reason),
        };

        let signal_strength = determine_signal_strength(confidence, direction);

        KiEvaluationResult {
            direction,
            stop_loss,
            take_profit,
            size,
            confidence,
            signal_strength,
            reasoning,
        }
    }
}
