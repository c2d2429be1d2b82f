//! The [`StrategyEngine`] trait: pure function on market state at call time
//! producing an ordered list of setup candidates.

use async_trait::async_trait;
use chrono::{DateTime, Utc};

use crate::error::StrategyError;
use crate::types::{CriteriaEntry, EvalSummary, SetupCandidate};

/// Black-box strategy contract. Implementations must be pure over the
/// provider's observable state at call time and return setups
/// deterministically in the order generated; duplicate detection across
/// calls is the caller's responsibility.
#[async_trait]
pub trait StrategyEngine: Send + Sync {
    async fn evaluate(&self, epic: &str, now: DateTime<Utc>) -> Result<Vec<SetupCandidate>, StrategyError>;

    /// Like `evaluate`, but also surfaces per-criterion diagnostics for the
    /// operator UI (`name`, `passed`, `detail`).
    async fn evaluate_with_diagnostics(
        &self,
        epic: &str,
        now: DateTime<Utc>,
    ) -> Result<(Vec<SetupCandidate>, EvalSummary, Vec<CriteriaEntry>), StrategyError>;
}
