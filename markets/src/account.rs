//! Account, position and order records: the standard broker-abstraction
//! surface every [`crate::broker::BrokerClient`] implementation speaks.

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use smol_str::SmolStr;
use uuid::Uuid;

use crate::side::Side;

/// Balance/available/equity/margin in account currency.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AccountState {
    pub currency: SmolStr,
    pub balance: Decimal,
    pub available: Decimal,
    pub equity: Decimal,
    pub margin_used: Decimal,
    pub as_of: DateTime<Utc>,
}

/// An open position held at the broker.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Position {
    pub symbol: SmolStr,
    pub side: Side,
    pub size: Decimal,
    pub entry_price: Decimal,
    pub current_price: Decimal,
    pub unrealized_pnl: Decimal,
    pub opened_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum OrderType {
    Market,
    Limit,
    Stop,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum OrderStatus {
    Pending,
    Filled,
    Rejected,
    Cancelled,
}

/// A request to open a position, as built by the execution service from a
/// `SetupCandidate` plus risk-approved sizing.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OrderRequest {
    pub symbol: SmolStr,
    pub side: Side,
    pub size: Decimal,
    pub order_type: OrderType,
    pub limit_price: Option<Decimal>,
    pub stop_loss: Option<Decimal>,
    pub take_profit: Option<Decimal>,
}

/// Outcome of submitting an [`OrderRequest`] to a broker.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OrderResult {
    pub broker_order_id: SmolStr,
    pub status: OrderStatus,
    pub filled_price: Option<Decimal>,
    pub filled_size: Option<Decimal>,
    pub submitted_at: DateTime<Utc>,
    pub client_order_id: Uuid,
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    #[test]
    fn order_request_round_trips_through_json() {
        let req = OrderRequest {
            symbol: "XAUUSD".into(),
            side: Side::Long,
            size: dec!(1.5),
            order_type: OrderType::Market,
            limit_price: None,
            stop_loss: Some(dec!(2390.00)),
            take_profit: Some(dec!(2420.00)),
        };
        let json = serde_json_roundtrip(&req);
        assert_eq!(json, req);
    }

    fn serde_json_roundtrip<T>(value: &T) -> T
    where
        T: Serialize + for<'de> Deserialize<'de>,
    {
        let encoded = serde_json::to_string(value).unwrap();
        serde_json::from_str(&encoded).unwrap()
    }
}
