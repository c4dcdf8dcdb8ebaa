//! Anti-hype spot trading bot
//!
//! Decision engine for an automated spot trading account: an ordered-rule
//! buy filter that refuses to chase pumps, average-cost position accounting
//! rebuilt from raw trade history, a free-funds-only 50/50 rebalancer, and
//! exchange-legal order sizing, wired to the MEXC spot API.
//!
//! # Filter Example
//! ```no_run
//! use hypeguard::filter::{AntiHypeFilter, FilterParams};
//! use hypeguard::mexc::MexcClient;
//! use hypeguard::Symbol;
//!
//! #[tokio::main]
//! async fn main() -> anyhow::Result<()> {
//!     let filter = AntiHypeFilter::new(MexcClient::new(), FilterParams::opportunistic());
//!     let verdict = filter.check_buy_permission(&Symbol::new("BTCUSDC")).await;
//!     println!("allowed={} x{}", verdict.allowed(), verdict.multiplier());
//!     Ok(())
//! }
//! ```
//!
//! # Accounting Example
//! ```
//! use hypeguard::accountant;
//!
//! let report = accountant::compute(&[], 0.0, 0.0);
//! assert_eq!(report.avg_cost, 0.0);
//! ```

pub mod accountant;
pub mod config;
pub mod filter;
pub mod indicators;
pub mod mexc;
pub mod monitor;
pub mod notify;
pub mod rebalance;
pub mod sizing;
pub mod types;

pub use config::Config;
pub use filter::{AntiHypeFilter, FilterParams, ReasonCode, Verdict};
pub use mexc::MexcClient;
pub use rebalance::{PortfolioSnapshot, RebalanceAction, RebalanceLimits};
pub use types::*;
