//! Tradable asset definitions.
//!
//! A [`TradingAsset`] is the unit the rest of the worker reasons about: it
//! names the venue (`broker_kind`), the venue-native symbol (`broker_symbol`,
//! defaulting to `epic`), and the trading-mode/crypto/24-7 flags that the
//! phase resolver and the weekend gate in `fiona-data` consult.

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use smol_str::SmolStr;

/// Venue a [`TradingAsset`] is traded on.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum BrokerKind {
    Ig,
    Mexc,
    Kraken,
}

impl std::fmt::Display for BrokerKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            BrokerKind::Ig => "IG",
            BrokerKind::Mexc => "MEXC",
            BrokerKind::Kraken => "KRAKEN",
        };
        f.write_str(s)
    }
}

/// How strictly the risk engine should treat this asset.
///
/// `Relaxed` assets may be exempted from some position-count checks (used
/// for small discretionary/manual symbols); `Strict` is the default.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
pub enum TradingMode {
    #[default]
    Strict,
    Relaxed,
}

/// A tradable instrument, as configured by an operator.
///
/// `epic` is the venue-agnostic identifier used throughout this system;
/// `broker_symbol` is the venue-native symbol sent on the wire. When no
/// `broker_symbol` is configured, `effective_broker_symbol()` falls back to
/// `epic` (mirrors the Python `effective_broker_symbol` property).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TradingAsset {
    pub symbol: SmolStr,
    pub epic: SmolStr,
    pub broker_kind: BrokerKind,
    pub broker_symbol: Option<SmolStr>,
    pub category: SmolStr,
    pub tick_size: Decimal,
    pub is_crypto: bool,
    pub is_active: bool,
    pub trading_mode: TradingMode,
    /// Whether this asset trades around the clock (replaces broker-kind
    /// string sniffing for the weekend/Friday-late gate — see DESIGN.md).
    pub trades_24_7: bool,
}

impl TradingAsset {
    pub fn effective_broker_symbol(&self) -> &str {
        self.broker_symbol.as_deref().unwrap_or(self.epic.as_str())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn asset(broker_symbol: Option<&str>) -> TradingAsset {
        TradingAsset {
            symbol: "WTI".into(),
            epic: "CC.D.CL.UNC.IP".into(),
            broker_kind: BrokerKind::Ig,
            broker_symbol: broker_symbol.map(SmolStr::new),
            category: "commodities".into(),
            tick_size: Decimal::new(1, 2),
            is_crypto: false,
            is_active: true,
            trading_mode: TradingMode::Strict,
            trades_24_7: false,
        }
    }

    #[test]
    fn effective_broker_symbol_falls_back_to_epic() {
        assert_eq!(asset(None).effective_broker_symbol(), "CC.D.CL.UNC.IP");
    }

    #[test]
    fn effective_broker_symbol_prefers_configured_value() {
        assert_eq!(asset(Some("CL1!")).effective_broker_symbol(), "CL1!");
    }
}
