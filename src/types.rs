//! Core data types used across the trading system

use serde::{Deserialize, Serialize};

/// OHLCV candlestick data
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Candle {
    /// Bar open time in milliseconds since epoch
    pub open_time: i64,
    pub open: f64,
    pub high: f64,
    pub low: f64,
    pub close: f64,
    pub volume: f64,
}

/// Trading pair symbol (e.g. "BTCUSDC")
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Symbol(pub String);

impl Symbol {
    pub fn new(s: impl Into<String>) -> Self {
        Symbol(s.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Base asset, assuming a known quote suffix ("BTCUSDC" -> "BTC")
    pub fn base_asset(&self) -> &str {
        for quote in ["USDC", "USDT"] {
            if let Some(base) = self.0.strip_suffix(quote) {
                return base;
            }
        }
        &self.0
    }

    /// Quote asset ("BTCUSDC" -> "USDC"); defaults to USDT for unknown suffixes
    pub fn quote_asset(&self) -> &str {
        for quote in ["USDC", "USDT"] {
            if self.0.ends_with(quote) {
                return quote;
            }
        }
        "USDT"
    }
}

impl std::fmt::Display for Symbol {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Trade direction
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Side {
    Buy,
    Sell,
}

impl Side {
    pub fn as_str(&self) -> &'static str {
        match self {
            Side::Buy => "BUY",
            Side::Sell => "SELL",
        }
    }
}

/// A single fill from the exchange trade history
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TradeRecord {
    pub symbol: Symbol,
    pub order_id: String,
    pub price: f64,
    pub qty: f64,
    /// Trade value in quote currency
    pub quote_qty: f64,
    pub commission: f64,
    pub commission_asset: String,
    /// Execution time in milliseconds since epoch
    pub time_ms: i64,
    pub is_buyer: bool,
}

/// Free and locked balance for one asset
#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize)]
pub struct AssetBalance {
    pub free: f64,
    pub locked: f64,
}

impl AssetBalance {
    pub fn total(&self) -> f64 {
        self.free + self.locked
    }
}

/// Exchange-mandated order constraints for one symbol
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SymbolRules {
    pub min_qty: f64,
    pub step_size: f64,
    pub min_notional: f64,
    pub price_precision: u32,
    pub quantity_precision: u32,
}

impl Default for SymbolRules {
    fn default() -> Self {
        SymbolRules {
            min_qty: 0.0,
            step_size: 1e-8,
            min_notional: 1.0,
            price_precision: 8,
            quantity_precision: 8,
        }
    }
}

/// Output of the average-cost position accountant
///
/// `open_quantity` is derived from the trade ledger; `held_quantity` is the
/// balance actually sitting at the exchange. The two can diverge (dust,
/// manual transfers, partial history window) and both are reported so the
/// divergence stays visible.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PositionReport {
    pub avg_cost: f64,
    pub open_quantity: f64,
    pub held_quantity: f64,
    pub realized_pnl: f64,
    pub unrealized_pnl: f64,
}

impl PositionReport {
    pub fn flat() -> Self {
        PositionReport {
            avg_cost: 0.0,
            open_quantity: 0.0,
            held_quantity: 0.0,
            realized_pnl: 0.0,
            unrealized_pnl: 0.0,
        }
    }

    pub fn total_pnl(&self) -> f64 {
        self.realized_pnl + self.unrealized_pnl
    }
}
