//! Types exchanged between the two stages of the KI Orchestrator: a local
//! LLM pass producing an initial trade idea, and a reflection pass that may
//! correct it and always attaches a confidence score.

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

/// Direction a local or reflected evaluation recommends. Distinct from
/// `fiona_markets::Side` because the local model may decline to trade.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Direction {
    Long,
    Short,
    NoTrade,
}

/// Output of the local (stage-1) LLM evaluation.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LocalLlmResult {
    pub direction: Direction,
    pub stop_loss: Decimal,
    pub take_profit: Decimal,
    pub size: Decimal,
    pub reason: String,
}

/// Fields the reflection pass may override on the local result. Any field
/// left `None` keeps the local model's value.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ReflectionCorrections {
    pub direction: Option<Direction>,
    pub stop_loss: Option<Decimal>,
    pub take_profit: Option<Decimal>,
    pub size: Option<Decimal>,
}

/// Output of the reflection (stage-2) LLM evaluation.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ReflectionResult {
    pub corrections: Option<ReflectionCorrections>,
    /// 0-100.
    pub confidence: u8,
    pub reasoning: String,
}

/// Derived strength band from `confidence`: `Strong` at >=80, `Weak` at
/// [60, 80), `NoTrade` below 60 — or whenever the merged direction itself is
/// `NoTrade`, regardless of confidence.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum SignalStrength {
    Strong,
    Weak,
    NoTrade,
}

/// Final merge of the local and reflection passes, as handed to the
/// execution service.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct KiEvaluationResult {
    pub direction: Direction,
    pub stop_loss: Decimal,
    pub take_profit: Decimal,
    pub size: Decimal,
    pub confidence: u8,
    pub signal_strength: SignalStrength,
    pub reasoning: String,
}

/// Pure-function prompt construction inputs. Built once per setup from the
/// strategy engine's output plus account context; never mutated once built,
/// so prompt construction stays a pure function of its inputs.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PromptInputs {
    pub epic: String,
    pub setup_kind: String,
    pub phase: String,
    pub reference_price: Decimal,
    pub direction_hint: String,
    pub range_high: Option<Decimal>,
    pub range_low: Option<Decimal>,
    pub account_equity: Decimal,
}

pub fn determine_signal_strength(confidence: u8, direction: Direction) -> SignalStrength {
    if direction == Direction::NoTrade {
        return SignalStrength::NoTrade;
    }
    match confidence {
        80..=100 => SignalStrength::Strong,
        60..=79 => SignalStrength::Weak,
        _ => SignalStrength::NoTrade,
    }
}
