//! The [`RangeStore`] trait abstracts `BreakoutRange` persistence away from
//! [`crate::provider::MarketStateProvider`], so the provider's phase/range
//! logic can be unit tested without a database. `fiona-storage` provides the
//! sqlx-backed implementation used in production.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use fiona_markets::{BreakoutRange, SessionPhase};

#[derive(Debug, thiserror::Error)]
pub enum RangeStoreError {
    #[error("range store backend error: {0}")]
    Backend(String),
}

#[async_trait]
pub trait RangeStore: Send + Sync {
    async fn save_range(&self, range: BreakoutRange) -> Result<(), RangeStoreError>;

    /// Returns the most recent range for `(epic, phase)`, ordered by
    /// `end_time desc`, or `None` if none exists or the most recent one
    /// ended more than 24h ago (stale ranges are not reloaded).
    async fn latest_range(
        &self,
        epic: &str,
        phase: SessionPhase,
        now: DateTime<Utc>,
    ) -> Result<Option<BreakoutRange>, RangeStoreError>;
}

/// In-memory double used by `MarketStateProvider` unit tests.
#[derive(Debug, Default)]
pub struct InMemoryRangeStore {
    ranges: parking_lot::Mutex<Vec<BreakoutRange>>,
}

impl InMemoryRangeStore {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl RangeStore for InMemoryRangeStore {
    async fn save_range(&self, range: BreakoutRange) -> Result<(), RangeStoreError> {
        let mut ranges = self.ranges.lock();
        ranges.retain(|r| !(r.asset_epic == range.asset_epic && r.phase == range.phase));
        ranges.push(range);
        Ok(())
    }

    async fn latest_range(
        &self,
        epic: &str,
        phase: SessionPhase,
        now: DateTime<Utc>,
    ) -> Result<Option<BreakoutRange>, RangeStoreError> {
        let ranges = self.ranges.lock();
        let candidate = ranges
            .iter()
            .filter(|r| r.asset_epic == epic && r.phase == phase)
            .max_by_key(|r| r.end_time);

        Ok(candidate
            .filter(|r| now.signed_duration_since(r.end_time) <= chrono::Duration::hours(24))
            .cloned())
    }
}
