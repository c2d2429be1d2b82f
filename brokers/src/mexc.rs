//! MEXC broker client: OAuth bearer token with refresh, used for the crypto
//! venue that backs the streaming worker's 24/7 asset set.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use parking_lot::RwLock;
use rust_decimal::Decimal;
use serde::Deserialize;

use fiona_markets::account::{AccountState, OrderRequest, OrderResult, OrderStatus, OrderType, Position};
use fiona_markets::{
    BrokerClient, BrokerConnectionState, BrokerError, BrokerKind, Candle1m, Side, SymbolPrice,
};

use crate::reauth::ReauthState;

#[derive(Debug, Clone)]
pub struct MexcConfig {
    pub client_id: String,
    pub client_secret: String,
    pub refresh_token: String,
    pub base_url: String,
}

#[derive(Debug, Default, Clone)]
struct MexcToken {
    access_token: String,
    expires_at: Option<DateTime<Utc>>,
}

pub struct MexcClient {
    config: MexcConfig,
    http: reqwest::Client,
    token: RwLock<Option<MexcToken>>,
    reauth: ReauthState,
}

#[derive(Debug, Deserialize)]
struct TokenResponse {
    access_token: String,
    expires_in: Option<i64>,
}

impl MexcClient {
    pub fn new(config: MexcConfig) -> Self {
        Self {
            config,
            http: reqwest::Client::new(),
            token: RwLock::new(None),
            reauth: ReauthState::new(),
        }
    }

    async fn refresh_token(&self) -> Result<(), BrokerError> {
        let response = self
            .http
            .post(format!("{}/oauth/token", self.config.base_url))
            .form(&[
                ("grant_type", "refresh_token"),
                ("client_id", self.config.client_id.as_str()),
                ("client_secret", self.config.client_secret.as_str()),
                ("refresh_token", self.config.refresh_token.as_str()),
            ])
            .send()
            .await
            .map_err(|e| BrokerError::Network(e.to_string()))?;

        if response.status() == reqwest::StatusCode::UNAUTHORIZED {
            return Err(BrokerError::Authentication("refresh token rejected".into()));
        }
        if !response.status().is_success() {
            return Err(BrokerError::Broker(format!("token refresh failed: HTTP {}", response.status())));
        }

        let parsed: TokenResponse = response
            .json()
            .await
            .map_err(|e| BrokerError::Broker(format!("malformed token response: {e}")))?;

        *self.token.write() = Some(MexcToken {
            access_token: parsed.access_token,
            expires_at: parsed.expires_in.map(|secs| Utc::now() + chrono::Duration::seconds(secs)),
        });
        Ok(())
    }

    fn bearer(&self) -> Result<String, BrokerError> {
        self.token
            .read()
            .clone()
            .map(|t| format!("Bearer {}", t.access_token))
            .ok_or(BrokerError::NotConnected)
    }

    async fn authed_get(&self, path: &str) -> Result<serde_json::Value, BrokerError> {
        let bearer = self.bearer()?;
        let response = self
            .http
            .get(format!("{}{path}", self.config.base_url))
            .header("Authorization", bearer)
            .send()
            .await
            .map_err(|e| BrokerError::Network(e.to_string()))?;
        parse_mexc_response(response).await
    }
}

async fn parse_mexc_response(response: reqwest::Response) -> Result<serde_json::Value, BrokerError> {
    let status = response.status();
    if status == reqwest::StatusCode::UNAUTHORIZED {
        return Err(BrokerError::Authentication(format!("HTTP {status}")));
    }
    let body: serde_json::Value = response
        .json()
        .await
        .map_err(|e| BrokerError::Network(e.to_string()))?;
    if !status.is_success() {
        return Err(BrokerError::Broker(format!("HTTP {status}: {body}")));
    }
    Ok(body)
}

fn decimal_field(value: &serde_json::Value, key: &str) -> Decimal {
    value
        .get(key)
        .and_then(|v| v.as_str().map(str::to_string).or_else(|| v.as_f64().map(|f| f.to_string())))
        .and_then(|s| s.parse().ok())
        .unwrap_or(Decimal::ZERO)
}

#[async_trait]
impl BrokerClient for MexcClient {
    fn kind(&self) -> BrokerKind {
        BrokerKind::Mexc
    }

    fn connection_state(&self) -> BrokerConnectionState {
        self.reauth.get()
    }

    async fn connect(&self) -> Result<(), BrokerError> {
        self.reauth.set(BrokerConnectionState::Connecting);
        self.refresh_token().await?;
        self.reauth.set(BrokerConnectionState::Connected);
        Ok(())
    }

    async fn disconnect(&self) -> Result<(), BrokerError> {
        *self.token.write() = None;
        self.reauth.set(BrokerConnectionState::Disconnected);
        Ok(())
    }

    async fn get_account_state(&self) -> Result<AccountState, BrokerError> {
        let body = self
            .reauth
            .run_with_single_reauth(|| self.authed_get("/api/v3/account"), || self.refresh_token())
            .await?;

        let balances = body.get("balances").and_then(|v| v.as_array()).cloned().unwrap_or_default();
        let usdt = balances
            .iter()
            .find(|b| b.get("asset").and_then(|a| a.as_str()) == Some("USDT"));
        let available = usdt.map(|b| decimal_field(b, "free")).unwrap_or(Decimal::ZERO);
        let locked = usdt.map(|b| decimal_field(b, "locked")).unwrap_or(Decimal::ZERO);

        Ok(AccountState {
            currency: "USDT".into(),
            balance: available + locked,
            available,
            equity: available + locked,
            margin_used: locked,
            as_of: Utc::now(),
        })
    }

    async fn get_open_positions(&self) -> Result<Vec<Position>, BrokerError> {
        // Spot trading has no margin positions; open orders are not positions.
        let _ = self
            .reauth
            .run_with_single_reauth(|| self.authed_get("/api/v3/openOrders"), || self.refresh_token())
            .await?;
        Ok(Vec::new())
    }

    async fn get_symbol_price(&self, symbol: &str) -> Result<SymbolPrice, BrokerError> {
        if symbol.is_empty() {
            return Err(BrokerError::InvalidArgument("symbol must not be empty".into()));
        }
        let url = format!("{}/api/v3/ticker/bookTicker?symbol={symbol}", self.config.base_url);
        let response = self
            .http
            .get(url)
            .send()
            .await
            .map_err(|e| BrokerError::Network(e.to_string()))?;
        let body = parse_mexc_response(response).await?;

        Ok(SymbolPrice {
            symbol: symbol.into(),
            bid: decimal_field(&body, "bidPrice"),
            ask: decimal_field(&body, "askPrice"),
            timestamp: Utc::now(),
            day_high: None,
            day_low: None,
        })
    }

    async fn get_historical_candles(
        &self,
        symbol: &str,
        since: DateTime<Utc>,
        limit: usize,
    ) -> Result<Vec<Candle1m>, BrokerError> {
        let url = format!(
            "{}/api/v3/klines?symbol={symbol}&interval=1m&startTime={}&limit={limit}",
            self.config.base_url,
            since.timestamp_millis()
        );
        let response = self
            .http
            .get(url)
            .send()
            .await
            .map_err(|e| BrokerError::Network(e.to_string()))?;
        let body = parse_mexc_response(response).await?;

        let rows = body.as_array().cloned().unwrap_or_default();
        let mut candles = Vec::with_capacity(rows.len());
        for row in rows {
            let Some(fields) = row.as_array() else { continue };
            if fields.len() < 6 {
                continue;
            }
            let as_decimal = |idx: usize| -> Decimal {
                fields[idx].as_str().and_then(|s| s.parse().ok()).unwrap_or(Decimal::ZERO)
            };
            let open_time = fields[0].as_i64().unwrap_or(0);
            candles.push(Candle1m {
                symbol: symbol.into(),
                time: DateTime::from_timestamp_millis(open_time).unwrap_or_else(Utc::now),
                open: as_decimal(1),
                high: as_decimal(2),
                low: as_decimal(3),
                close: as_decimal(4),
                volume: as_decimal(5),
                trade_count: fields.get(8).and_then(|v| v.as_u64()).unwrap_or(0) as u32,
            });
        }
        Ok(candles)
    }

    async fn submit_order(&self, order: &OrderRequest) -> Result<OrderResult, BrokerError> {
        let bearer = self.bearer()?;
        let response = self
            .http
            .post(format!("{}/api/v3/order", self.config.base_url))
            .header("Authorization", bearer)
            .form(&[
                ("symbol", order.symbol.to_string()),
                ("side", match order.side { Side::Long => "BUY".to_string(), Side::Short => "SELL".to_string() }),
                (
                    "type",
                    match order.order_type {
                        OrderType::Market => "MARKET".to_string(),
                        OrderType::Limit => "LIMIT".to_string(),
                        OrderType::Stop => "STOP_LOSS".to_string(),
                    },
                ),
                ("quantity", order.size.to_string()),
            ])
            .send()
            .await
            .map_err(|e| BrokerError::Network(e.to_string()))?;
        let body = parse_mexc_response(response).await?;

        let order_id = body
            .get("orderId")
            .map(|v| v.to_string())
            .unwrap_or_else(|| "unknown".to_string());

        Ok(OrderResult {
            broker_order_id: order_id.into(),
            status: OrderStatus::Pending,
            filled_price: None,
            filled_size: None,
            submitted_at: Utc::now(),
            client_order_id: uuid::Uuid::new_v4(),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn client() -> MexcClient {
        MexcClient::new(MexcConfig {
            client_id: "id".to_string(),
            client_secret: "secret".to_string(),
            refresh_token: "refresh".to_string(),
            base_url: "https://api.mexc.com".to_string(),
        })
    }

    #[test]
    fn fresh_client_has_no_bearer_token() {
        let c = client();
        assert!(matches!(c.bearer(), Err(BrokerError::NotConnected)));
    }

    #[test]
    fn decimal_field_parses_string_and_missing_values() {
        let value = serde_json::json!({"bidPrice": "123.45"});
        assert_eq!(decimal_field(&value, "bidPrice"), rust_decimal::Decimal::new(12345, 2));
        assert_eq!(decimal_field(&value, "missing"), rust_decimal::Decimal::ZERO);
    }
}
