//! Errors a local or reflection LLM evaluator may raise. `KiOrchestrator`
//! never propagates these to its callers — see `orchestrator::evaluate`.

#[derive(Debug, thiserror::Error)]
pub enum KiError {
    #[error("local evaluator failed: {0}")]
    LocalEvaluation(String),

    #[error("reflection evaluator failed: {0}")]
    ReflectionEvaluation(String),

    #[error("http error talking to LLM backend: {0}")]
    Http(#[from] reqwest::Error),
}
