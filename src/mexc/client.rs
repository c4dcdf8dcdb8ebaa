//! MEXC spot API client
//!
//! Thin authenticated wrapper over the v3 REST endpoints the bot needs.
//! Every call runs through a bounded retry loop (doubling backoff, transient
//! errors only); signed endpoints rebuild the timestamp and signature on
//! each attempt so a retried request never carries a stale signature.

use std::collections::HashMap;
use std::time::Duration as StdDuration;

use async_trait::async_trait;
use chrono::Utc;
use hmac::{Hmac, Mac};
use reqwest::{Client, Method};
use sha2::Sha256;
use tracing::{debug, warn};

use super::error::MexcError;
use super::types::{
    candle_from_raw, AccountResponse, ExchangeInfoResponse, OrderResponse, RawTrade,
    Ticker24hResponse, TickerPriceResponse,
};
use crate::filter::MarketData;
use crate::types::{AssetBalance, Candle, Side, Symbol, SymbolRules, TradeRecord};

/// Base URL for the MEXC spot API
const MEXC_API_BASE: &str = "https://api.mexc.com/api/v3";

/// Attempts per logical request
const MAX_RETRIES: u32 = 3;

/// First retry delay; doubles on each subsequent attempt
const INITIAL_BACKOFF_MS: u64 = 500;

/// Signature validity window passed to signed endpoints (ms)
const RECV_WINDOW_MS: u64 = 5000;

type HmacSha256 = Hmac<Sha256>;

/// MEXC API client. Cheap to clone; the underlying HTTP pool is shared.
#[derive(Debug, Clone)]
pub struct MexcClient {
    client: Client,
    base_url: String,
    api_key: Option<String>,
    api_secret: Option<String>,
}

impl Default for MexcClient {
    fn default() -> Self {
        Self::new()
    }
}

impl MexcClient {
    /// Unauthenticated client; public market-data endpoints only
    pub fn new() -> Self {
        let client = Client::builder()
            .timeout(StdDuration::from_secs(30))
            .build()
            .expect("Failed to create HTTP client");

        MexcClient {
            client,
            base_url: MEXC_API_BASE.to_string(),
            api_key: None,
            api_secret: None,
        }
    }

    /// Client with credentials for account and order endpoints
    pub fn with_credentials(api_key: impl Into<String>, api_secret: impl Into<String>) -> Self {
        let mut c = Self::new();
        c.api_key = Some(api_key.into());
        c.api_secret = Some(api_secret.into());
        c
    }

    /// Point the client at a different host (test servers)
    pub fn with_base_url(mut self, base_url: impl Into<String>) -> Self {
        self.base_url = base_url.into();
        self
    }

    pub fn has_credentials(&self) -> bool {
        self.api_key.is_some() && self.api_secret.is_some()
    }

    /// HMAC-SHA256 over the query string, hex-encoded
    fn sign(&self, query: &str) -> Result<String, MexcError> {
        let secret = self.api_secret.as_ref().ok_or(MexcError::MissingCredentials)?;
        let mut mac = HmacSha256::new_from_slice(secret.as_bytes())
            .map_err(|_| MexcError::Malformed("invalid API secret".to_string()))?;
        mac.update(query.as_bytes());
        Ok(hex::encode(mac.finalize().into_bytes()))
    }

    /// One HTTP attempt. Signed requests get a fresh timestamp and
    /// signature here, inside the retry loop.
    async fn execute_once(
        &self,
        method: Method,
        path: &str,
        params: &[(&str, String)],
        signed: bool,
    ) -> Result<serde_json::Value, MexcError> {
        let mut query: String = params
            .iter()
            .map(|(k, v)| format!("{k}={v}"))
            .collect::<Vec<_>>()
            .join("&");

        if signed {
            if !query.is_empty() {
                query.push('&');
            }
            query.push_str(&format!(
                "recvWindow={}&timestamp={}",
                RECV_WINDOW_MS,
                Utc::now().timestamp_millis()
            ));
            let signature = self.sign(&query)?;
            query.push_str(&format!("&signature={signature}"));
        }

        let url = if query.is_empty() {
            format!("{}/{}", self.base_url, path)
        } else {
            format!("{}/{}?{}", self.base_url, path, query)
        };

        let mut request = self.client.request(method, &url);
        if signed {
            let key = self.api_key.as_ref().ok_or(MexcError::MissingCredentials)?;
            request = request.header("X-MEXC-APIKEY", key);
        }

        let response = request.send().await?;
        let status = response.status();
        let body = response.text().await?;

        if !status.is_success() {
            return Err(MexcError::Api {
                status: status.as_u16(),
                message: body,
            });
        }

        Ok(serde_json::from_str(&body)?)
    }

    /// Bounded retry with doubling backoff; only transient errors retry
    async fn execute(
        &self,
        method: Method,
        path: &str,
        params: &[(&str, String)],
        signed: bool,
    ) -> Result<serde_json::Value, MexcError> {
        let mut backoff = StdDuration::from_millis(INITIAL_BACKOFF_MS);

        for attempt in 1..=MAX_RETRIES {
            match self
                .execute_once(method.clone(), path, params, signed)
                .await
            {
                Ok(value) => return Ok(value),
                Err(e) if e.is_transient() && attempt < MAX_RETRIES => {
                    warn!(path, attempt, error = %e, "transient MEXC error, backing off");
                    tokio::time::sleep(backoff).await;
                    backoff *= 2;
                }
                Err(e) => return Err(e),
            }
        }

        unreachable!("retry loop returns on the final attempt")
    }

    /// Ordered candles, oldest first; may return fewer than `limit`
    pub async fn get_klines(
        &self,
        symbol: &Symbol,
        interval: &str,
        limit: u32,
    ) -> Result<Vec<Candle>, MexcError> {
        let params = [
            ("symbol", symbol.as_str().to_string()),
            ("interval", interval.to_string()),
            ("limit", limit.to_string()),
        ];
        debug!(%symbol, interval, limit, "fetching klines");

        let value = self.execute(Method::GET, "klines", &params, false).await?;
        let rows: Vec<Vec<serde_json::Value>> = serde_json::from_value(value)?;
        Ok(rows.iter().filter_map(|row| candle_from_raw(row)).collect())
    }

    /// Most recent trade price
    pub async fn get_ticker_price(&self, symbol: &Symbol) -> Result<f64, MexcError> {
        let params = [("symbol", symbol.as_str().to_string())];
        let value = self
            .execute(Method::GET, "ticker/price", &params, false)
            .await?;
        let ticker: TickerPriceResponse = serde_json::from_value(value)?;
        ticker
            .price
            .parse()
            .map_err(|_| MexcError::Malformed(format!("unparseable price: {}", ticker.price)))
    }

    /// Rolling 24h statistics; the filter uses the high
    pub async fn get_ticker_24h(&self, symbol: &Symbol) -> Result<Ticker24hResponse, MexcError> {
        let params = [("symbol", symbol.as_str().to_string())];
        let value = self
            .execute(Method::GET, "ticker/24hr", &params, false)
            .await?;
        Ok(serde_json::from_value(value)?)
    }

    /// All non-zero balances, keyed by asset
    pub async fn get_account_balances(&self) -> Result<HashMap<String, AssetBalance>, MexcError> {
        let value = self.execute(Method::GET, "account", &[], true).await?;
        let account: AccountResponse = serde_json::from_value(value)?;

        let mut balances = HashMap::new();
        for raw in account.balances {
            let balance = AssetBalance {
                free: raw.free.parse().unwrap_or(0.0),
                locked: raw.locked.parse().unwrap_or(0.0),
            };
            if balance.total() > 0.0 {
                balances.insert(raw.asset, balance);
            }
        }
        Ok(balances)
    }

    /// Fill history for one symbol. The exchange does not guarantee order;
    /// the accountant sorts before folding.
    pub async fn get_my_trades(
        &self,
        symbol: &Symbol,
        limit: u32,
    ) -> Result<Vec<TradeRecord>, MexcError> {
        let params = [
            ("symbol", symbol.as_str().to_string()),
            ("limit", limit.to_string()),
        ];
        let value = self.execute(Method::GET, "myTrades", &params, true).await?;
        let raw: Vec<RawTrade> = serde_json::from_value(value)?;

        Ok(raw
            .into_iter()
            .map(|t| TradeRecord {
                symbol: Symbol::new(&t.symbol),
                order_id: t.order_id_string(),
                // Unparseable numbers become 0.0 and are skipped downstream
                // as malformed trades rather than failing the whole history
                price: t.price.parse().unwrap_or(0.0),
                qty: t.qty.parse().unwrap_or(0.0),
                quote_qty: t.quote_qty.parse().unwrap_or(0.0),
                commission: t.commission.parse().unwrap_or(0.0),
                commission_asset: t.commission_asset,
                time_ms: t.time,
                is_buyer: t.is_buyer,
            })
            .collect())
    }

    /// Sizing rules for one symbol, derived from exchangeInfo precisions
    pub async fn get_symbol_rules(&self, symbol: &Symbol) -> Result<SymbolRules, MexcError> {
        let params = [("symbol", symbol.as_str().to_string())];
        let value = self
            .execute(Method::GET, "exchangeInfo", &params, false)
            .await?;
        let info: ExchangeInfoResponse = serde_json::from_value(value)?;

        info.symbols
            .iter()
            .find(|s| s.symbol == symbol.as_str())
            .map(|s| s.to_rules())
            .ok_or_else(|| MexcError::UnknownSymbol(symbol.to_string()))
    }

    /// Place an order; `price == None` means market order.
    ///
    /// This is the only path that surfaces hard failures to the caller — a
    /// rejected order is a decision input, not something to paper over.
    pub async fn place_order(
        &self,
        symbol: &Symbol,
        side: Side,
        quantity: f64,
        price: Option<f64>,
    ) -> Result<String, MexcError> {
        let mut params = vec![
            ("symbol", symbol.as_str().to_string()),
            ("side", side.as_str().to_string()),
            ("quantity", format!("{quantity}")),
        ];
        match price {
            Some(p) => {
                params.push(("type", "LIMIT".to_string()));
                params.push(("price", format!("{p}")));
            }
            None => params.push(("type", "MARKET".to_string())),
        }

        let value = self.execute(Method::POST, "order", &params, true).await?;
        let order: OrderResponse = serde_json::from_value(value)?;
        Ok(order.order_id_string())
    }
}

#[async_trait]
impl MarketData for MexcClient {
    async fn klines(
        &self,
        symbol: &Symbol,
        interval: &str,
        limit: u32,
    ) -> anyhow::Result<Vec<Candle>> {
        Ok(self.get_klines(symbol, interval, limit).await?)
    }

    async fn daily_high(&self, symbol: &Symbol) -> anyhow::Result<f64> {
        let ticker = self.get_ticker_24h(symbol).await?;
        ticker
            .high_price
            .parse()
            .map_err(|_| anyhow::anyhow!("unparseable 24h high: {}", ticker.high_price))
    }
}
