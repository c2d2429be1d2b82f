//! Price and candle types shared across the worker.

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use smol_str::SmolStr;

/// Instantaneous bid/ask quote for a symbol.
///
/// `mid_price` and `spread` are derived, never stored independently, so they
/// cannot drift from `bid`/`ask`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SymbolPrice {
    pub symbol: SmolStr,
    pub bid: Decimal,
    pub ask: Decimal,
    pub timestamp: DateTime<Utc>,
    pub day_high: Option<Decimal>,
    pub day_low: Option<Decimal>,
}

impl SymbolPrice {
    pub fn mid_price(&self) -> Decimal {
        (self.bid + self.ask) / Decimal::TWO
    }

    pub fn spread(&self) -> Decimal {
        self.ask - self.bid
    }
}

/// A one-minute OHLCV bar. `time` is the minute-aligned bucket start.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Candle1m {
    pub symbol: SmolStr,
    pub time: DateTime<Utc>,
    pub open: Decimal,
    pub high: Decimal,
    pub low: Decimal,
    pub close: Decimal,
    pub volume: Decimal,
    pub trade_count: u32,
}

impl Candle1m {
    /// A single-tick bar synthesized from one price sample, as produced by
    /// `update_candle_from_price` when no trade stream is available.
    pub fn from_single_price(symbol: SmolStr, time: DateTime<Utc>, price: Decimal) -> Self {
        Self {
            symbol,
            time,
            open: price,
            high: price,
            low: price,
            close: price,
            volume: Decimal::ZERO,
            trade_count: 0,
        }
    }

    /// `low <= open, close <= high` holds for any well-formed candle.
    pub fn is_valid(&self) -> bool {
        self.low <= self.open
            && self.open <= self.high
            && self.low <= self.close
            && self.close <= self.high
    }

    /// Merges a new price sample into this bar (used by the streaming
    /// worker's in-memory aggregation before a bar closes).
    pub fn absorb(&mut self, price: Decimal, trade_count_delta: u32) {
        self.high = self.high.max(price);
        self.low = self.low.min(price);
        self.close = price;
        self.trade_count += trade_count_delta;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    fn ts() -> DateTime<Utc> {
        DateTime::parse_from_rfc3339("2026-01-05T12:00:00Z")
            .unwrap()
            .with_timezone(&Utc)
    }

    #[test]
    fn mid_and_spread_are_derived() {
        let p = SymbolPrice {
            symbol: "XAUUSD".into(),
            bid: dec!(2400.10),
            ask: dec!(2400.30),
            timestamp: ts(),
            day_high: None,
            day_low: None,
        };
        assert_eq!(p.mid_price(), dec!(2400.20));
        assert_eq!(p.spread(), dec!(0.20));
    }

    #[test]
    fn single_price_candle_is_valid() {
        let c = Candle1m::from_single_price("XAUUSD".into(), ts(), dec!(2400.20));
        assert!(c.is_valid());
    }

    #[test]
    fn absorb_widens_high_low_and_moves_close() {
        let mut c = Candle1m::from_single_price("XAUUSD".into(), ts(), dec!(100));
        c.absorb(dec!(105), 1);
        c.absorb(dec!(98), 1);
        assert_eq!(c.high, dec!(105));
        assert_eq!(c.low, dec!(98));
        assert_eq!(c.close, dec!(98));
        assert_eq!(c.trade_count, 2);
        assert!(c.is_valid());
    }
}
