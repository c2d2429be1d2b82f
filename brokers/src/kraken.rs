//! Kraken broker client: HMAC-signed private REST endpoints for account and
//! order management, public endpoints for price/candle data.

use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::{SystemTime, UNIX_EPOCH};

use async_trait::async_trait;
use base64::Engine;
use chrono::{DateTime, TimeZone, Utc};
use hmac::{Hmac, Mac};
use rust_decimal::Decimal;
use serde::Deserialize;
use sha2::{Digest, Sha256, Sha512};

use fiona_markets::account::{AccountState, OrderRequest, OrderResult, OrderStatus, Position};
use fiona_markets::{
    BrokerClient, BrokerConnectionState, BrokerError, BrokerKind, Candle1m, Side, SymbolPrice,
};

use crate::reauth::ReauthState;

const CHARTS_API_EXPECTED_CANDLE_FIELDS: usize = 6;

#[derive(Debug, Clone)]
pub struct KrakenConfig {
    pub api_key: String,
    pub api_secret: String,
    pub base_url: String,
}

pub struct KrakenClient {
    config: KrakenConfig,
    http: reqwest::Client,
    reauth: ReauthState,
    nonce: AtomicU64,
}

impl KrakenClient {
    pub fn new(config: KrakenConfig) -> Self {
        Self {
            config,
            http: reqwest::Client::new(),
            reauth: ReauthState::new(),
            nonce: AtomicU64::new(0),
        }
    }

    fn next_nonce(&self) -> u64 {
        let now_ms = SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .unwrap_or_default()
            .as_millis() as u64;
        let last = self.nonce.fetch_max(now_ms, Ordering::SeqCst);
        last.max(now_ms) + 1
    }

    /// Kraken's signature: HMAC-SHA512(base64-decoded secret,
    /// path + SHA256(nonce + postdata)), base64-encoded.
    fn sign(&self, path: &str, nonce: u64, postdata: &str) -> Result<String, BrokerError> {
        let secret = base64::engine::general_purpose::STANDARD
            .decode(&self.config.api_secret)
            .map_err(|e| BrokerError::Authentication(format!("invalid api secret: {e}")))?;

        let mut sha256 = Sha256::new();
        sha256.update(nonce.to_string().as_bytes());
        sha256.update(postdata.as_bytes());
        let digest = sha256.finalize();

        let mut mac = Hmac::<Sha512>::new_from_slice(&secret)
            .map_err(|e| BrokerError::Authentication(format!("bad hmac key: {e}")))?;
        mac.update(path.as_bytes());
        mac.update(&digest);
        Ok(base64::engine::general_purpose::STANDARD.encode(mac.finalize().into_bytes()))
    }

    async fn private_post(&self, path: &str, mut params: HashMap<String, String>) -> Result<serde_json::Value, BrokerError> {
        let nonce = self.next_nonce();
        params.insert("nonce".to_string(), nonce.to_string());
        let postdata = serde_urlencoded::to_string(&params)
            .map_err(|e| BrokerError::Network(e.to_string()))?;
        let signature = self.sign(path, nonce, &postdata)?;

        let response = self
            .http
            .post(format!("{}{}", self.config.base_url, path))
            .header("API-Key", &self.config.api_key)
            .header("API-Sign", signature)
            .header("Content-Type", "application/x-www-form-urlencoded")
            .body(postdata)
            .send()
            .await
            .map_err(|e| BrokerError::Network(e.to_string()))?;

        parse_kraken_response(response).await
    }

    async fn relogin(&self) -> Result<(), BrokerError> {
        // Kraken's private endpoints are signed per-request with no session
        // token to refresh; "re-login" here just re-validates credentials
        // by probing the balance endpoint once.
        self.private_post("/0/private/Balance", HashMap::new()).await?;
        Ok(())
    }
}

async fn parse_kraken_response(response: reqwest::Response) -> Result<serde_json::Value, BrokerError> {
    let status = response.status();
    let body: serde_json::Value = response
        .json()
        .await
        .map_err(|e| BrokerError::Network(e.to_string()))?;

    if !status.is_success() {
        return Err(BrokerError::Broker(format!("HTTP {status}: {body}")));
    }

    if let Some(errors) = body.get("error").and_then(|e| e.as_array()) {
        if let Some(first) = errors.first().and_then(|e| e.as_str()) {
            if first.contains("Invalid key") || first.contains("Invalid signature") || first.contains("Permission denied") {
                return Err(BrokerError::Authentication(first.to_string()));
            }
            if !first.is_empty() {
                return Err(BrokerError::Broker(first.to_string()));
            }
        }
    }

    Ok(body)
}

#[derive(Debug, Deserialize)]
struct TickerResult {
    #[serde(rename = "a")]
    ask: Vec<String>,
    #[serde(rename = "b")]
    bid: Vec<String>,
}

#[async_trait]
impl BrokerClient for KrakenClient {
    fn kind(&self) -> BrokerKind {
        BrokerKind::Kraken
    }

    fn connection_state(&self) -> BrokerConnectionState {
        self.reauth.get()
    }

    async fn connect(&self) -> Result<(), BrokerError> {
        self.reauth.set(BrokerConnectionState::Connecting);
        self.private_post("/0/private/Balance", HashMap::new()).await?;
        self.reauth.set(BrokerConnectionState::Connected);
        Ok(())
    }

    async fn disconnect(&self) -> Result<(), BrokerError> {
        self.reauth.set(BrokerConnectionState::Disconnected);
        Ok(())
    }

    async fn get_account_state(&self) -> Result<AccountState, BrokerError> {
        let body = self
            .reauth
            .run_with_single_reauth(
                || self.private_post("/0/private/Balance", HashMap::new()),
                || self.relogin(),
            )
            .await?;

        let zusd = body
            .get("result")
            .and_then(|r| r.get("ZUSD"))
            .and_then(|v| v.as_str())
            .unwrap_or("0")
            .parse::<Decimal>()
            .unwrap_or(Decimal::ZERO);

        Ok(AccountState {
            currency: "USD".into(),
            balance: zusd,
            available: zusd,
            equity: zusd,
            margin_used: Decimal::ZERO,
            as_of: Utc::now(),
        })
    }

    async fn get_open_positions(&self) -> Result<Vec<Position>, BrokerError> {
        let _body = self
            .reauth
            .run_with_single_reauth(
                || self.private_post("/0/private/OpenPositions", HashMap::new()),
                || self.relogin(),
            )
            .await?;
        Ok(Vec::new())
    }

    async fn get_symbol_price(&self, symbol: &str) -> Result<SymbolPrice, BrokerError> {
        if symbol.is_empty() {
            return Err(BrokerError::InvalidArgument("symbol must not be empty".into()));
        }

        let url = format!("{}/0/public/Ticker?pair={symbol}", self.config.base_url);
        let response = self
            .http
            .get(url)
            .send()
            .await
            .map_err(|e| BrokerError::Network(e.to_string()))?;
        let body = parse_kraken_response(response).await?;

        let result = body
            .get("result")
            .and_then(|r| r.as_object())
            .and_then(|obj| obj.values().next())
            .ok_or_else(|| BrokerError::Broker(format!("no ticker data for {symbol}")))?;

        let ticker: TickerResult = serde_json::from_value(result.clone())
            .map_err(|e| BrokerError::Broker(format!("malformed ticker payload: {e}")))?;

        let ask = ticker.ask.first().and_then(|s| s.parse().ok()).unwrap_or(Decimal::ZERO);
        let bid = ticker.bid.first().and_then(|s| s.parse().ok()).unwrap_or(Decimal::ZERO);

        Ok(SymbolPrice {
            symbol: symbol.into(),
            bid,
            ask,
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
            "{}/0/public/OHLC?pair={symbol}&interval=1&since={}",
            self.config.base_url,
            since.timestamp()
        );
        let response = self
            .http
            .get(url)
            .send()
            .await
            .map_err(|e| BrokerError::Network(e.to_string()))?;
        let body = parse_kraken_response(response).await?;

        let rows = body
            .get("result")
            .and_then(|r| r.as_object())
            .and_then(|obj| obj.iter().find(|(k, _)| *k != "last"))
            .and_then(|(_, v)| v.as_array())
            .ok_or_else(|| BrokerError::Broker(format!("no OHLC data for {symbol}")))?;

        let mut candles = Vec::new();
        for row in rows {
            let Some(fields) = row.as_array() else { continue };
            if fields.len() < CHARTS_API_EXPECTED_CANDLE_FIELDS {
                continue;
            }
            let time = fields[0].as_i64().unwrap_or(0);
            let parse = |idx: usize| -> Decimal {
                fields[idx].as_str().and_then(|s| s.parse().ok()).unwrap_or(Decimal::ZERO)
            };
            candles.push(Candle1m {
                symbol: symbol.into(),
                time: Utc.timestamp_opt(time, 0).single().unwrap_or(Utc::now()),
                open: parse(1),
                high: parse(2),
                low: parse(3),
                close: parse(4),
                volume: parse(6),
                trade_count: fields.get(7).and_then(|v| v.as_u64()).unwrap_or(0) as u32,
            });
        }

        candles.truncate(limit);
        Ok(candles)
    }

    async fn submit_order(&self, order: &OrderRequest) -> Result<OrderResult, BrokerError> {
        let mut params = HashMap::new();
        params.insert("pair".to_string(), order.symbol.to_string());
        params.insert(
            "type".to_string(),
            match order.side {
                Side::Long => "buy".to_string(),
                Side::Short => "sell".to_string(),
            },
        );
        params.insert(
            "ordertype".to_string(),
            match order.order_type {
                fiona_markets::account::OrderType::Market => "market".to_string(),
                fiona_markets::account::OrderType::Limit => "limit".to_string(),
                fiona_markets::account::OrderType::Stop => "stop-loss".to_string(),
            },
        );
        params.insert("volume".to_string(), order.size.to_string());
        if let Some(price) = order.limit_price {
            params.insert("price".to_string(), price.to_string());
        }

        let body = self
            .reauth
            .run_with_single_reauth(
                || self.private_post("/0/private/AddOrder", params.clone()),
                || self.relogin(),
            )
            .await?;

        let order_id = body
            .get("result")
            .and_then(|r| r.get("txid"))
            .and_then(|v| v.as_array())
            .and_then(|a| a.first())
            .and_then(|v| v.as_str())
            .unwrap_or("unknown")
            .to_string();

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
