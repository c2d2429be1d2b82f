//! The Execution Service: creates execution sessions, routes them to the
//! live or shadow path, and records the result.
//!
//! Router: a session goes live only when shadow-only mode is off and the
//! risk evaluation approved it. Live execution that raises falls back to a
//! shadow trade for the *same* session rather than retrying the live call;
//! the fallback outcome is cached so the next tick's re-observation of the
//! same setup does not attempt the live call again.

use std::collections::HashMap;
use std::sync::Arc;

use chrono::{DateTime, Utc};
use parking_lot::Mutex;
use uuid::Uuid;

use fiona_ki::KiEvaluationResult;
use fiona_markets::account::OrderRequest;
use fiona_markets::BrokerClient;
use fiona_risk::RiskEvaluationResult;
use fiona_strategies::SetupCandidate;

use crate::error::ExecutionError;
use crate::types::{ExecutionOutcome, Session, SessionRoute, ShadowTrade, Trade};

pub struct ExecutionService {
    shadow_only: bool,
    sessions: Mutex<HashMap<Uuid, Session>>,
    outcomes: Mutex<HashMap<Uuid, ExecutionOutcome>>,
}

impl ExecutionService {
    pub fn new(shadow_only: bool) -> Self {
        Self {
            shadow_only,
            sessions: Mutex::new(HashMap::new()),
            outcomes: Mutex::new(HashMap::new()),
        }
    }

    /// Creates (or returns the existing) session for `setup`. Sessions are
    /// keyed by the setup's own id, so calling this twice for the same
    /// setup never creates a second session.
    pub fn propose_trade(
        &self,
        setup: &SetupCandidate,
        order: OrderRequest,
        ki_eval: Option<KiEvaluationResult>,
        risk_eval: RiskEvaluationResult,
        now: DateTime<Utc>,
    ) -> Session {
        let mut sessions = self.sessions.lock();
        if let Some(existing) = sessions.get(&setup.id) {
            return existing.clone();
        }

        let route = if self.shadow_only || !risk_eval.allowed {
            SessionRoute::Shadow
        } else {
            SessionRoute::Live
        };

        let session = Session {
            id: setup.id,
            epic: setup.epic.clone(),
            created_at: now,
            route,
            order,
            risk_eval,
            ki_eval,
        };
        sessions.insert(session.id, session.clone());
        session
    }

    /// Submits the session's order to `broker`.
    pub async fn confirm_live_trade(
        &self,
        session_id: Uuid,
        broker: &dyn BrokerClient,
        now: DateTime<Utc>,
    ) -> Result<Trade, ExecutionError> {
        let session = self
            .sessions
            .lock()
            .get(&session_id)
            .cloned()
            .ok_or(ExecutionError::UnknownSession(session_id))?;

        let order_result = broker.submit_order(&session.order).await?;
        Ok(Trade {
            session_id,
            order_result,
            executed_at: now,
        })
    }

    /// Records a shadow trade for the session without touching any broker.
    pub fn confirm_shadow_trade(
        &self,
        session_id: Uuid,
        reason: impl Into<String>,
        now: DateTime<Utc>,
    ) -> Result<ShadowTrade, ExecutionError> {
        let session = self
            .sessions
            .lock()
            .get(&session_id)
            .cloned()
            .ok_or(ExecutionError::UnknownSession(session_id))?;

        Ok(ShadowTrade {
            session_id,
            epic: session.epic,
            order: session.order,
            reason: reason.into(),
            recorded_at: now,
        })
    }

    /// Drives a proposed session to completion per the router: shadow
    /// sessions go straight to `confirm_shadow_trade`; live sessions attempt
    /// `confirm_live_trade` and fall back to a shadow trade on any broker
    /// error, exactly once. Idempotent: a session that already has a
    /// recorded outcome returns that outcome again instead of re-executing.
    pub async fn execute(
        &self,
        session_id: Uuid,
        broker: &dyn BrokerClient,
        now: DateTime<Utc>,
    ) -> Result<ExecutionOutcome, ExecutionError> {
        if let Some(outcome) = self.outcomes.lock().get(&session_id).cloned() {
            return Ok(outcome);
        }

        let route = self
            .sessions
            .lock()
            .get(&session_id)
            .map(|s| s.route)
            .ok_or(ExecutionError::UnknownSession(session_id))?;

        let outcome = match route {
            SessionRoute::Shadow => {
                let shadow = self.confirm_shadow_trade(session_id, "risk denied or shadow-only mode", now)?;
                ExecutionOutcome::Shadow(shadow)
            }
            SessionRoute::Live => match self.confirm_live_trade(session_id, broker, now).await {
                Ok(trade) => ExecutionOutcome::Live(trade),
                Err(err) => {
                    tracing::warn!(error = %err, %session_id, "live execution failed, falling back to shadow trade");
                    let shadow = self.confirm_shadow_trade(
                        session_id,
                        format!("live execution failed: {err}"),
                        now,
                    )?;
                    ExecutionOutcome::Shadow(shadow)
                }
            },
        };

        self.outcomes.lock().insert(session_id, outcome.clone());
        Ok(outcome)
    }
}
