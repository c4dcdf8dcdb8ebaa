//! One-off position report from trade history

use anyhow::Result;

use hypeguard::monitor::build_client;
use hypeguard::{accountant, Symbol};

pub fn run(config_path: Option<String>, symbol: Option<String>) -> Result<()> {
    dotenv::dotenv().ok();
    let config = super::load_config(config_path.as_deref())?;
    config.validate_for_trading()?;
    let runtime = super::build_runtime()?;
    runtime.block_on(run_async(config, symbol))
}

async fn run_async(config: hypeguard::Config, symbol: Option<String>) -> Result<()> {
    let client = build_client(&config);
    let symbols: Vec<Symbol> = match symbol {
        Some(s) => vec![Symbol::new(s)],
        None => config.trading.symbols.iter().map(Symbol::new).collect(),
    };

    let balances = client.get_account_balances().await?;

    println!(
        "{:<12} {:>12} {:>12} {:>12} {:>12} {:>12}",
        "SYMBOL", "AVG COST", "OPEN QTY", "HELD", "REALIZED", "UNREALIZED"
    );
    for sym in &symbols {
        let held = balances
            .get(sym.base_asset())
            .map(|b| b.total())
            .unwrap_or(0.0);
        let trades = client
            .get_my_trades(sym, config.trading.trade_history_limit)
            .await?;
        let price = client.get_ticker_price(sym).await?;
        let report = accountant::compute(&trades, held, price);

        println!(
            "{:<12} {:>12.6} {:>12.6} {:>12.6} {:>12.4} {:>12.4}",
            sym,
            report.avg_cost,
            report.open_quantity,
            report.held_quantity,
            report.realized_pnl,
            report.unrealized_pnl
        );
    }

    Ok(())
}
