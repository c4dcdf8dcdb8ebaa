//! One-off 50/50 rebalance check
//!
//! Prints the planned action; `--execute` routes it through the order
//! router (anti-hype filter included) instead of just reporting it.

use anyhow::Result;
use tokio::sync::mpsc;
use tracing::info;

use hypeguard::monitor::{build_client, IntentOrigin, OrderRouter, SpendIntent};
use hypeguard::notify::Notifier;
use hypeguard::rebalance::{self, Bucket, PortfolioSnapshot, RebalanceAction};
use hypeguard::Symbol;

pub fn run(config_path: Option<String>, execute: bool) -> Result<()> {
    dotenv::dotenv().ok();
    let config = super::load_config(config_path.as_deref())?;
    config.validate_for_trading()?;
    let runtime = super::build_runtime()?;
    runtime.block_on(run_async(config, execute))
}

async fn run_async(config: hypeguard::Config, execute: bool) -> Result<()> {
    let client = build_client(&config);
    let pair = Symbol::new(format!(
        "{}{}",
        config.rebalance.asset_a, config.rebalance.asset_b
    ));

    let balances = client.get_account_balances().await?;
    let price = client.get_ticker_price(&pair).await?;
    let a = balances
        .get(config.rebalance.asset_a.as_str())
        .copied()
        .unwrap_or_default();
    let b = balances
        .get(config.rebalance.asset_b.as_str())
        .copied()
        .unwrap_or_default();

    let snapshot = PortfolioSnapshot {
        bucket_a_value: a.total() * price,
        bucket_b_value: b.total(),
        free_a: a.free * price,
        free_b: b.free,
    };

    println!(
        "{}: {:.2} ({:.2} free)   {}: {:.2} ({:.2} free)",
        config.rebalance.asset_a,
        snapshot.bucket_a_value,
        snapshot.free_a,
        config.rebalance.asset_b,
        snapshot.bucket_b_value,
        snapshot.free_b
    );

    let action = rebalance::plan(&snapshot, &config.rebalance.limits);
    match &action {
        RebalanceAction::NoOp { reason } => {
            println!("No action: {reason:?}");
            return Ok(());
        }
        RebalanceAction::Convert {
            from,
            to,
            amount,
            partial,
        } => {
            println!(
                "Plan: convert {:.2} from {:?} to {:?}{}",
                amount,
                from,
                to,
                if *partial { " (partial)" } else { "" }
            );
        }
    }

    if !execute {
        println!("Dry run; pass --execute to place the order");
        return Ok(());
    }

    if let RebalanceAction::Convert { from, amount, .. } = action {
        let intent = match from {
            Bucket::B => SpendIntent::Buy {
                symbol: pair.clone(),
                notional: amount,
                origin: IntentOrigin::Rebalance,
            },
            Bucket::A => SpendIntent::Sell {
                symbol: pair.clone(),
                quantity: amount / price,
            },
        };

        let (tx, rx) = mpsc::channel(1);
        let router = OrderRouter::new(client, &config, Notifier::from_config(config.telegram.as_ref()));
        let router_task = tokio::spawn(router.run(rx));
        tx.send(intent).await?;
        drop(tx);
        router_task.await?;
        info!("rebalance execution finished");
    }

    Ok(())
}
