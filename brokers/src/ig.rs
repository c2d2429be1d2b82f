//! IG broker client: session-header authentication (`CST` / `X-SECURITY-TOKEN`)
//! against the IG REST API.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use parking_lot::RwLock;
use reqwest::header::{HeaderMap, HeaderName, HeaderValue};
use rust_decimal::Decimal;
use serde::Deserialize;

use fiona_markets::account::{AccountState, OrderRequest, OrderResult, OrderStatus, OrderType, Position};
use fiona_markets::{
    BrokerClient, BrokerConnectionState, BrokerError, BrokerKind, Candle1m, Side, SymbolPrice,
};

use crate::reauth::ReauthState;

#[derive(Debug, Clone)]
pub struct IgConfig {
    pub api_key: String,
    pub identifier: String,
    pub password: String,
    pub base_url: String,
}

#[derive(Debug, Default, Clone)]
struct IgSession {
    cst: String,
    security_token: String,
}

pub struct IgClient {
    config: IgConfig,
    http: reqwest::Client,
    session: RwLock<Option<IgSession>>,
    reauth: ReauthState,
}

impl IgClient {
    pub fn new(config: IgConfig) -> Self {
        Self {
            config,
            http: reqwest::Client::new(),
            session: RwLock::new(None),
            reauth: ReauthState::new(),
        }
    }

    fn auth_headers(&self) -> Result<HeaderMap, BrokerError> {
        let session = self.session.read().clone().ok_or(BrokerError::NotConnected)?;
        let mut headers = HeaderMap::new();
        headers.insert(
            HeaderName::from_static("x-ig-api-key"),
            HeaderValue::from_str(&self.config.api_key)
                .map_err(|e| BrokerError::InvalidArgument(e.to_string()))?,
        );
        headers.insert(
            HeaderName::from_static("cst"),
            HeaderValue::from_str(&session.cst).map_err(|e| BrokerError::InvalidArgument(e.to_string()))?,
        );
        headers.insert(
            HeaderName::from_static("x-security-token"),
            HeaderValue::from_str(&session.security_token)
                .map_err(|e| BrokerError::InvalidArgument(e.to_string()))?,
        );
        Ok(headers)
    }

    async fn login(&self) -> Result<(), BrokerError> {
        let response = self
            .http
            .post(format!("{}/session", self.config.base_url))
            .header("X-IG-API-KEY", &self.config.api_key)
            .header("Content-Type", "application/json; charset=UTF-8")
            .json(&serde_json::json!({
                "identifier": self.config.identifier,
                "password": self.config.password,
            }))
            .send()
            .await
            .map_err(|e| BrokerError::Network(e.to_string()))?;

        if response.status() == reqwest::StatusCode::UNAUTHORIZED
            || response.status() == reqwest::StatusCode::FORBIDDEN
        {
            return Err(BrokerError::Authentication(format!(
                "login rejected with status {}",
                response.status()
            )));
        }
        if !response.status().is_success() {
            return Err(BrokerError::Broker(format!("login failed: HTTP {}", response.status())));
        }

        let cst = response
            .headers()
            .get("CST")
            .and_then(|v| v.to_str().ok())
            .ok_or_else(|| BrokerError::Authentication("no CST header in login response".into()))?
            .to_string();
        let security_token = response
            .headers()
            .get("X-SECURITY-TOKEN")
            .and_then(|v| v.to_str().ok())
            .ok_or_else(|| BrokerError::Authentication("no X-SECURITY-TOKEN header in login response".into()))?
            .to_string();

        *self.session.write() = Some(IgSession { cst, security_token });
        Ok(())
    }

    async fn authed_get(&self, path: &str) -> Result<serde_json::Value, BrokerError> {
        let headers = self.auth_headers()?;
        let response = self
            .http
            .get(format!("{}{path}", self.config.base_url))
            .headers(headers)
            .send()
            .await
            .map_err(|e| BrokerError::Network(e.to_string()))?;
        parse_ig_response(response).await
    }
}

/// Body-level error codes IG reports on an otherwise-2xx response when the
/// session token has expired or been revoked; these must still route
/// through the re-auth path rather than being returned as `Ok`.
const IG_TOKEN_INVALID_ERROR_CODES: &[&str] =
    &["error.security.client-token-invalid", "error.security.oauth-token-invalid"];

/// Maps a parsed response body to an error when it carries a known
/// token-invalid `errorCode`, even on an otherwise-2xx response.
fn ig_token_invalid_error(body: &serde_json::Value) -> Option<BrokerError> {
    let error_code = body.get("errorCode").and_then(|v| v.as_str())?;
    IG_TOKEN_INVALID_ERROR_CODES
        .contains(&error_code)
        .then(|| BrokerError::Authentication(error_code.to_string()))
}

async fn parse_ig_response(response: reqwest::Response) -> Result<serde_json::Value, BrokerError> {
    let status = response.status();
    if status == reqwest::StatusCode::UNAUTHORIZED {
        return Err(BrokerError::Authentication(format!("HTTP {status}")));
    }
    let body: serde_json::Value = response
        .json()
        .await
        .map_err(|e| BrokerError::Network(e.to_string()))?;

    if let Some(err) = ig_token_invalid_error(&body) {
        return Err(err);
    }

    if !status.is_success() {
        return Err(BrokerError::Broker(format!("HTTP {status}: {body}")));
    }
    Ok(body)
}

#[derive(Debug, Deserialize)]
struct IgAccountsResponse {
    accounts: Vec<IgAccount>,
}

#[derive(Debug, Deserialize)]
struct IgAccount {
    balance: IgBalance,
    currency: String,
    preferred: bool,
}

#[derive(Debug, Deserialize)]
struct IgBalance {
    balance: Decimal,
    available: Decimal,
    #[serde(rename = "deposit")]
    margin: Decimal,
}

#[async_trait]
impl BrokerClient for IgClient {
    fn kind(&self) -> BrokerKind {
        BrokerKind::Ig
    }

    fn connection_state(&self) -> BrokerConnectionState {
        self.reauth.get()
    }

    async fn connect(&self) -> Result<(), BrokerError> {
        self.reauth.set(BrokerConnectionState::Connecting);
        self.login().await?;
        self.reauth.set(BrokerConnectionState::Connected);
        Ok(())
    }

    async fn disconnect(&self) -> Result<(), BrokerError> {
        *self.session.write() = None;
        self.reauth.set(BrokerConnectionState::Disconnected);
        Ok(())
    }

    async fn get_account_state(&self) -> Result<AccountState, BrokerError> {
        let body = self
            .reauth
            .run_with_single_reauth(|| self.authed_get("/accounts"), || self.login())
            .await?;

        let parsed: IgAccountsResponse = serde_json::from_value(body)
            .map_err(|e| BrokerError::Broker(format!("malformed accounts payload: {e}")))?;
        let account = parsed
            .accounts
            .into_iter()
            .find(|a| a.preferred)
            .ok_or_else(|| BrokerError::Broker("no preferred IG account".into()))?;

        Ok(AccountState {
            currency: account.currency.into(),
            balance: account.balance.balance,
            available: account.balance.available,
            equity: account.balance.balance,
            margin_used: account.balance.margin,
            as_of: Utc::now(),
        })
    }

    async fn get_open_positions(&self) -> Result<Vec<Position>, BrokerError> {
        let body = self
            .reauth
            .run_with_single_reauth(|| self.authed_get("/positions"), || self.login())
            .await?;

        let positions = body
            .get("positions")
            .and_then(|p| p.as_array())
            .cloned()
            .unwrap_or_default();

        let mut out = Vec::with_capacity(positions.len());
        for entry in positions {
            let Some(position) = entry.get("position") else { continue };
            let Some(market) = entry.get("market") else { continue };
            let epic = market.get("epic").and_then(|v| v.as_str()).unwrap_or("").to_string();
            let direction = position.get("direction").and_then(|v| v.as_str()).unwrap_or("BUY");
            let size = position
                .get("size")
                .and_then(|v| v.as_f64())
                .and_then(|f| Decimal::try_from(f).ok())
                .unwrap_or(Decimal::ZERO);
            let level = position
                .get("level")
                .and_then(|v| v.as_f64())
                .and_then(|f| Decimal::try_from(f).ok())
                .unwrap_or(Decimal::ZERO);
            let bid = market.get("bid").and_then(|v| v.as_f64()).and_then(|f| Decimal::try_from(f).ok());
            let current = bid.unwrap_or(level);

            out.push(Position {
                symbol: epic.into(),
                side: if direction == "SELL" { Side::Short } else { Side::Long },
                size,
                entry_price: level,
                current_price: current,
                unrealized_pnl: (current - level) * size,
                opened_at: Utc::now(),
            });
        }
        Ok(out)
    }

    async fn get_symbol_price(&self, symbol: &str) -> Result<SymbolPrice, BrokerError> {
        if symbol.is_empty() {
            return Err(BrokerError::InvalidArgument("symbol must not be empty".into()));
        }
        let body = self
            .reauth
            .run_with_single_reauth(
                || self.authed_get(&format!("/markets/{symbol}")),
                || self.login(),
            )
            .await?;

        let snapshot = body
            .get("snapshot")
            .ok_or_else(|| BrokerError::Broker("missing snapshot in market response".into()))?;
        let bid = snapshot.get("bid").and_then(|v| v.as_f64()).and_then(|f| Decimal::try_from(f).ok()).unwrap_or(Decimal::ZERO);
        let ask = snapshot.get("offer").and_then(|v| v.as_f64()).and_then(|f| Decimal::try_from(f).ok()).unwrap_or(Decimal::ZERO);
        let high = snapshot.get("high").and_then(|v| v.as_f64()).and_then(|f| Decimal::try_from(f).ok());
        let low = snapshot.get("low").and_then(|v| v.as_f64()).and_then(|f| Decimal::try_from(f).ok());

        Ok(SymbolPrice {
            symbol: symbol.into(),
            bid,
            ask,
            timestamp: Utc::now(),
            day_high: high,
            day_low: low,
        })
    }

    async fn get_historical_candles(
        &self,
        symbol: &str,
        _since: DateTime<Utc>,
        limit: usize,
    ) -> Result<Vec<Candle1m>, BrokerError> {
        let body = self
            .reauth
            .run_with_single_reauth(
                || self.authed_get(&format!("/prices/{symbol}/MINUTE/{limit}")),
                || self.login(),
            )
            .await?;

        let rows = body.get("prices").and_then(|v| v.as_array()).cloned().unwrap_or_default();
        let mut candles = Vec::with_capacity(rows.len());
        for row in rows {
            let mid = |key: &str| -> Decimal {
                row.get(key)
                    .and_then(|p| p.get("bid"))
                    .and_then(|v| v.as_f64())
                    .and_then(|f| Decimal::try_from(f).ok())
                    .unwrap_or(Decimal::ZERO)
            };
            let time = row
                .get("snapshotTimeUTC")
                .and_then(|v| v.as_str())
                .and_then(|s| DateTime::parse_from_rfc3339(s).ok())
                .map(|dt| dt.with_timezone(&Utc))
                .unwrap_or_else(Utc::now);

            candles.push(Candle1m {
                symbol: symbol.into(),
                time,
                open: mid("openPrice"),
                high: mid("highPrice"),
                low: mid("lowPrice"),
                close: mid("closePrice"),
                volume: row
                    .get("lastTradedVolume")
                    .and_then(|v| v.as_u64())
                    .map(Decimal::from)
                    .unwrap_or(Decimal::ZERO),
                trade_count: 0,
            });
        }
        Ok(candles)
    }

    async fn submit_order(&self, order: &OrderRequest) -> Result<OrderResult, BrokerError> {
        let headers = self.auth_headers()?;
        let payload = serde_json::json!({
            "epic": order.symbol,
            "direction": match order.side { Side::Long => "BUY", Side::Short => "SELL" },
            "size": order.size,
            "orderType": match order.order_type {
                OrderType::Market => "MARKET",
                OrderType::Limit => "LIMIT",
                OrderType::Stop => "STOP",
            },
            "level": order.limit_price,
            "stopLevel": order.stop_loss,
            "limitLevel": order.take_profit,
            "currencyCode": "USD",
            "expiry": "-",
            "forceOpen": true,
            "guaranteedStop": false,
        });

        let response = self
            .http
            .post(format!("{}/positions/otc", self.config.base_url))
            .headers(headers)
            .json(&payload)
            .send()
            .await
            .map_err(|e| BrokerError::Network(e.to_string()))?;
        let body = parse_ig_response(response).await?;

        let deal_reference = body
            .get("dealReference")
            .and_then(|v| v.as_str())
            .unwrap_or("unknown")
            .to_string();

        Ok(OrderResult {
            broker_order_id: deal_reference.into(),
            status: OrderStatus::Pending,
            filled_price: None,
            filled_size: None,
            submitted_at: Utc::now(),
            client_order_id: uuid::Uuid::new_v4(),
        })
    }
}
