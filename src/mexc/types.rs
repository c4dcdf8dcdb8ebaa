//! Raw MEXC API response shapes
//!
//! The spot API reports most numbers as strings; these types keep the wire
//! shape and convert into the crate's own types at the client boundary.

use serde::Deserialize;

use crate::types::{Candle, SymbolRules};

/// Kline rows arrive as positional arrays:
/// [open_time, open, high, low, close, volume, close_time, quote_volume]
pub fn candle_from_raw(raw: &[serde_json::Value]) -> Option<Candle> {
    if raw.len() < 6 {
        return None;
    }

    fn num(v: &serde_json::Value) -> Option<f64> {
        match v {
            serde_json::Value::String(s) => s.parse().ok(),
            other => other.as_f64(),
        }
    }

    Some(Candle {
        open_time: raw[0].as_i64()?,
        open: num(&raw[1])?,
        high: num(&raw[2])?,
        low: num(&raw[3])?,
        close: num(&raw[4])?,
        volume: num(&raw[5])?,
    })
}

#[derive(Debug, Deserialize)]
pub struct TickerPriceResponse {
    pub price: String,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Ticker24hResponse {
    pub high_price: String,
    pub last_price: String,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RawBalance {
    pub asset: String,
    pub free: String,
    pub locked: String,
}

#[derive(Debug, Deserialize)]
pub struct AccountResponse {
    pub balances: Vec<RawBalance>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RawTrade {
    pub symbol: String,
    pub order_id: serde_json::Value,
    pub price: String,
    pub qty: String,
    pub quote_qty: String,
    pub commission: String,
    pub commission_asset: String,
    pub time: i64,
    pub is_buyer: bool,
}

impl RawTrade {
    /// Order ids arrive as either a number or a string depending on endpoint
    /// version; normalize to a string.
    pub fn order_id_string(&self) -> String {
        match &self.order_id {
            serde_json::Value::String(s) => s.clone(),
            other => other.to_string(),
        }
    }
}

/// exchangeInfo entry. MEXC expresses sizing rules through precisions and
/// string minimums rather than Binance-style filter objects.
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SymbolInfo {
    pub symbol: String,
    pub base_asset_precision: u32,
    #[serde(default)]
    pub quote_precision: u32,
    /// Minimum order quantity in base units
    #[serde(default)]
    pub base_size_precision: String,
    /// Minimum order value in quote units
    #[serde(default)]
    pub quote_amount_precision: String,
}

impl SymbolInfo {
    pub fn to_rules(&self) -> SymbolRules {
        let step_size = 10f64.powi(-(self.base_asset_precision as i32));
        SymbolRules {
            min_qty: self.base_size_precision.parse().unwrap_or(0.0),
            step_size,
            min_notional: self.quote_amount_precision.parse().unwrap_or(1.0),
            price_precision: self.quote_precision,
            quantity_precision: self.base_asset_precision,
        }
    }
}

#[derive(Debug, Deserialize)]
pub struct ExchangeInfoResponse {
    pub symbols: Vec<SymbolInfo>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct OrderResponse {
    pub order_id: serde_json::Value,
}

impl OrderResponse {
    pub fn order_id_string(&self) -> String {
        match &self.order_id {
            serde_json::Value::String(s) => s.clone(),
            other => other.to_string(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_candle_from_raw() {
        let raw: Vec<serde_json::Value> = serde_json::from_str(
            r#"[1700000000000, "100.0", "105.0", "99.0", "104.0", "1234.5", 1700003599999, "127000.0"]"#,
        )
        .unwrap();
        let candle = candle_from_raw(&raw).unwrap();

        assert_eq!(candle.open_time, 1700000000000);
        assert_eq!(candle.high, 105.0);
        assert_eq!(candle.volume, 1234.5);
    }

    #[test]
    fn test_candle_from_short_row_is_none() {
        let raw: Vec<serde_json::Value> = serde_json::from_str(r#"[1700000000000, "100.0"]"#).unwrap();
        assert!(candle_from_raw(&raw).is_none());
    }

    #[test]
    fn test_symbol_info_to_rules() {
        let info: SymbolInfo = serde_json::from_str(
            r#"{"symbol": "BTCUSDC", "baseAssetPrecision": 6, "quotePrecision": 2,
                "baseSizePrecision": "0.000001", "quoteAmountPrecision": "1"}"#,
        )
        .unwrap();
        let rules = info.to_rules();

        assert_eq!(rules.step_size, 1e-6);
        assert_eq!(rules.min_qty, 1e-6);
        assert_eq!(rules.min_notional, 1.0);
        assert_eq!(rules.quantity_precision, 6);
    }

    #[test]
    fn test_raw_trade_parses_numeric_order_id() {
        let trade: RawTrade = serde_json::from_str(
            r#"{"symbol": "BTCUSDC", "orderId": 123456, "price": "100.0", "qty": "1.0",
                "quoteQty": "100.0", "commission": "0.1", "commissionAsset": "USDC",
                "time": 1700000000000, "isBuyer": true}"#,
        )
        .unwrap();
        assert_eq!(trade.order_id_string(), "123456");
    }
}
