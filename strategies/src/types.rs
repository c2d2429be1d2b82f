//! Setup candidate types produced by a [`crate::engine::StrategyEngine`].

use std::collections::HashMap;

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use smol_str::SmolStr;
use uuid::Uuid;

use fiona_markets::{SessionPhase, Side};

/// Which kind of setup a [`SetupCandidate`] represents. Carries no payload
/// itself; the payload lives in `breakout_context`/`eia_context` on the
/// candidate, since only one applies per kind.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum SetupKind {
    Breakout,
    EiaReversion,
    EiaTrendDay,
}

/// Payload for a `Breakout` setup: the range it broke out of.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BreakoutContext {
    pub range_phase: SessionPhase,
    pub range_high: Decimal,
    pub range_low: Decimal,
    pub breakout_level: Decimal,
}

/// Payload for `EiaReversion`/`EiaTrendDay` setups, built around the EIA
/// petroleum status report release.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EiaContext {
    pub report_time: DateTime<Utc>,
    pub pre_report_high: Decimal,
    pub pre_report_low: Decimal,
}

/// A candidate setup emitted by the strategy engine, ahead of risk
/// evaluation and (optionally) KI evaluation.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SetupCandidate {
    pub id: Uuid,
    pub created_at: DateTime<Utc>,
    pub epic: SmolStr,
    pub setup_kind: SetupKind,
    pub phase: SessionPhase,
    pub reference_price: Decimal,
    pub direction: Side,
    pub breakout_context: Option<BreakoutContext>,
    pub eia_context: Option<EiaContext>,
    pub quality_flags: HashMap<SmolStr, bool>,
}

/// One evaluated criterion, surfaced for the operator UI and for
/// `AssetDiagnostics`'s discarded-setup counters.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CriteriaEntry {
    pub name: SmolStr,
    pub passed: bool,
    pub detail: String,
}

/// Summary of one `evaluate_with_diagnostics` call.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EvalSummary {
    pub setups_generated: usize,
    pub message: String,
}
