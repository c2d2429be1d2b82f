//! Session, Trade and ShadowTrade: the execution-side record of one
//! approved (or denied) setup as it moves from proposal to settlement.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use smol_str::SmolStr;
use uuid::Uuid;

use fiona_ki::KiEvaluationResult;
use fiona_markets::account::{OrderRequest, OrderResult};
use fiona_risk::RiskEvaluationResult;

/// Which path a session was routed down at proposal time.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum SessionRoute {
    Live,
    Shadow,
}

/// An execution session: the unit `propose_trade`/`confirm_live_trade`/
/// `confirm_shadow_trade` operate on. Identified by `id`, which is the
/// originating `SetupCandidate`'s id — this is what makes sessions
/// idempotent across worker ticks that re-observe the same setup.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Session {
    pub id: Uuid,
    pub epic: SmolStr,
    pub created_at: DateTime<Utc>,
    pub route: SessionRoute,
    pub order: OrderRequest,
    pub risk_eval: RiskEvaluationResult,
    pub ki_eval: Option<KiEvaluationResult>,
}

/// A trade actually submitted to a broker.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Trade {
    pub session_id: Uuid,
    pub order_result: OrderResult,
    pub executed_at: DateTime<Utc>,
}

/// A recorded, non-executed trade used for performance tracking when risk
/// denies a setup, shadow-only mode is active, or live execution raised.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ShadowTrade {
    pub session_id: Uuid,
    pub epic: SmolStr,
    pub order: OrderRequest,
    pub reason: String,
    pub recorded_at: DateTime<Utc>,
}

/// Outcome of routing a session to completion.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum ExecutionOutcome {
    Live(Trade),
    Shadow(ShadowTrade),
}
