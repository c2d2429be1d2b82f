//! Symbolic risk violation codes, so diagnostics can count them without
//! parsing free-text reasons.

pub const RISK_INSUFFICIENT_EQUITY: &str = "RISK_INSUFFICIENT_EQUITY";
pub const RISK_MAX_OPEN_POSITIONS: &str = "RISK_MAX_OPEN_POSITIONS";
pub const RISK_OVERSIZED_NOTIONAL: &str = "RISK_OVERSIZED_NOTIONAL";
pub const RISK_OUTSIDE_TRADING_HOURS: &str = "RISK_OUTSIDE_TRADING_HOURS";
pub const RISK_MISSING_STOP_LOSS: &str = "RISK_MISSING_STOP_LOSS";
pub const RISK_INVALID_SIZE: &str = "RISK_INVALID_SIZE";
