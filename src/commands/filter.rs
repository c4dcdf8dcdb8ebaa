//! One-off anti-hype filter evaluation
//!
//! Evaluates the buy filter against live market data and prints the verdict
//! per symbol. Public endpoints only; no credentials needed.

use anyhow::Result;
use tracing::info;

use hypeguard::filter::AntiHypeFilter;
use hypeguard::monitor::build_client;
use hypeguard::Symbol;

pub fn run(config_path: Option<String>, symbols: Option<String>, rebalancing: bool) -> Result<()> {
    let config = super::load_config(config_path.as_deref())?;
    let runtime = super::build_runtime()?;
    runtime.block_on(run_async(config, symbols, rebalancing))
}

async fn run_async(
    config: hypeguard::Config,
    symbols: Option<String>,
    rebalancing: bool,
) -> Result<()> {
    let symbols: Vec<Symbol> = match symbols {
        Some(list) => list.split(',').map(|s| Symbol::new(s.trim())).collect(),
        None => config.trading.symbols.iter().map(Symbol::new).collect(),
    };

    let params = if rebalancing {
        info!("using rebalancing parameter set");
        config.filter.rebalancing.clone()
    } else {
        info!("using opportunistic parameter set");
        config.filter.opportunistic.clone()
    };

    let filter = AntiHypeFilter::new(build_client(&config), params);

    println!(
        "{:<12} {:<8} {:<6} {:<24} {}",
        "SYMBOL", "ALLOWED", "MULT", "REASON", "DAILY HIGH DISTANCE"
    );
    for symbol in &symbols {
        let verdict = filter.check_buy_permission(symbol).await;
        let distance = verdict
            .snapshot()
            .map(|s| format!("{:.2}% below {}", s.distance_percent, s.daily_high))
            .unwrap_or_else(|| "-".to_string());
        println!(
            "{:<12} {:<8} {:<6.2} {:<24} {}",
            symbol,
            verdict.allowed(),
            verdict.multiplier(),
            verdict.reason().as_str(),
            distance
        );
    }

    Ok(())
}
