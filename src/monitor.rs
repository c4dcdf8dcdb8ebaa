//! Long-running monitors and the single-writer order router
//!
//! Three interval tasks (buy-filter sweep, PnL sweep, rebalance check) run
//! independently and never place orders themselves. Anything that spends
//! funds is sent as a `SpendIntent` over a channel to one router task that
//! owns all order placement. Two monitors can therefore never observe the
//! same free balance and both spend it: the router re-reads price and rules
//! per intent and executes strictly one order at a time.

use std::time::Duration;

use anyhow::Result;
use tokio::sync::mpsc;
use tracing::{error, info, warn};

use crate::accountant;
use crate::config::Config;
use crate::filter::{AntiHypeFilter, FilterParams};
use crate::mexc::MexcClient;
use crate::notify::Notifier;
use crate::rebalance::{self, Bucket, RebalanceAction, PortfolioSnapshot};
use crate::sizing;
use crate::types::{Side, Symbol};

/// Channel depth for pending spend intents
const INTENT_QUEUE_DEPTH: usize = 32;

/// Which monitor asked for the spend; selects the filter parameter set
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum IntentOrigin {
    Opportunistic,
    Rebalance,
}

/// A request to move funds, submitted to the order router
#[derive(Debug)]
pub enum SpendIntent {
    /// Buy roughly `notional` quote units, subject to the anti-hype filter
    Buy {
        symbol: Symbol,
        notional: f64,
        origin: IntentOrigin,
    },
    /// Sell `quantity` base units at market
    Sell { symbol: Symbol, quantity: f64 },
}

/// The single owner of order placement
pub struct OrderRouter {
    client: MexcClient,
    opportunistic: AntiHypeFilter<MexcClient>,
    rebalancing: AntiHypeFilter<MexcClient>,
    notifier: Notifier,
    sizing_tolerance: f64,
}

impl OrderRouter {
    pub fn new(client: MexcClient, config: &Config, notifier: Notifier) -> Self {
        OrderRouter {
            opportunistic: AntiHypeFilter::new(
                client.clone(),
                config.filter.opportunistic.clone(),
            ),
            rebalancing: AntiHypeFilter::new(client.clone(), config.filter.rebalancing.clone()),
            client,
            notifier,
            sizing_tolerance: config.trading.sizing_tolerance,
        }
    }

    /// Drain intents until every sender is dropped
    pub async fn run(self, mut rx: mpsc::Receiver<SpendIntent>) {
        while let Some(intent) = rx.recv().await {
            match intent {
                SpendIntent::Buy {
                    symbol,
                    notional,
                    origin,
                } => {
                    if let Err(e) = self.execute_buy(&symbol, notional, origin).await {
                        error!(%symbol, error = %e, "buy intent failed");
                    }
                }
                SpendIntent::Sell { symbol, quantity } => {
                    if let Err(e) = self.execute_sell(&symbol, quantity).await {
                        error!(%symbol, error = %e, "sell intent failed");
                    }
                }
            }
        }
        info!("all intent senders closed, router stopping");
    }

    async fn execute_buy(
        &self,
        symbol: &Symbol,
        notional: f64,
        origin: IntentOrigin,
    ) -> Result<()> {
        let filter = match origin {
            IntentOrigin::Opportunistic => &self.opportunistic,
            IntentOrigin::Rebalance => &self.rebalancing,
        };

        let verdict = filter.check_buy_permission(symbol).await;
        if !verdict.allowed() {
            info!(%symbol, reason = %verdict.reason(), "buy blocked by anti-hype filter");
            self.notifier
                .send(&format!("Buy {symbol} blocked: {}", verdict.reason()))
                .await;
            return Ok(());
        }

        let adjusted = notional * verdict.multiplier();
        let price = self.client.get_ticker_price(symbol).await?;
        let rules = self.client.get_symbol_rules(symbol).await?;
        let quantity = sizing::size_buy(adjusted, price, &rules, self.sizing_tolerance);
        if quantity <= 0.0 {
            warn!(%symbol, adjusted, "buy too small for exchange minimums, skipping");
            return Ok(());
        }

        let order_id = self
            .client
            .place_order(symbol, Side::Buy, quantity, None)
            .await?;
        info!(
            %symbol,
            order_id,
            quantity,
            notional = adjusted,
            multiplier = verdict.multiplier(),
            reason = %verdict.reason(),
            "buy order placed"
        );
        self.notifier
            .send(&format!(
                "Bought {quantity} {symbol} (~{adjusted:.2} quote, {})",
                verdict.reason()
            ))
            .await;
        Ok(())
    }

    async fn execute_sell(&self, symbol: &Symbol, quantity: f64) -> Result<()> {
        let rules = self.client.get_symbol_rules(symbol).await?;
        let legal = sizing::size_sell(quantity, &rules);
        if legal <= 0.0 {
            warn!(%symbol, quantity, "sell below exchange minimums, skipping");
            return Ok(());
        }

        let order_id = self
            .client
            .place_order(symbol, Side::Sell, legal, None)
            .await?;
        info!(%symbol, order_id, quantity = legal, "sell order placed");
        self.notifier
            .send(&format!("Sold {legal} {symbol}"))
            .await;
        Ok(())
    }
}

/// Spawn all monitors plus the router and run until Ctrl-C.
pub async fn run(config: Config) -> Result<()> {
    config.validate_for_trading()?;
    let client = build_client(&config);

    let (tx, rx) = mpsc::channel(INTENT_QUEUE_DEPTH);
    let notifier = Notifier::from_config(config.telegram.as_ref());
    let router = OrderRouter::new(client.clone(), &config, notifier);
    let router_task = tokio::spawn(router.run(rx));

    let symbols: Vec<Symbol> = config
        .trading
        .symbols
        .iter()
        .map(Symbol::new)
        .collect();

    tokio::spawn(filter_sweep(
        client.clone(),
        config.filter.opportunistic.clone(),
        symbols.clone(),
        Duration::from_secs(config.monitor.filter_interval_secs),
    ));
    tokio::spawn(pnl_sweep(
        client.clone(),
        symbols,
        config.trading.trade_history_limit,
        Duration::from_secs(config.monitor.pnl_interval_secs),
    ));
    if config.rebalance.enabled {
        tokio::spawn(rebalance_sweep(
            client,
            config.clone(),
            tx,
            Duration::from_secs(config.monitor.rebalance_interval_secs),
        ));
    } else {
        // Dropping the last sender lets the router exit once idle
        drop(tx);
    }

    info!("monitors started, press Ctrl-C to stop");
    tokio::signal::ctrl_c().await?;
    info!("shutdown requested");
    router_task.abort();
    Ok(())
}

pub fn build_client(config: &Config) -> MexcClient {
    let mut client = match (&config.exchange.api_key, &config.exchange.api_secret) {
        (Some(key), Some(secret)) => MexcClient::with_credentials(key, secret),
        _ => MexcClient::new(),
    };
    if let Some(base_url) = &config.exchange.base_url {
        client = client.with_base_url(base_url);
    }
    client
}

/// Periodic visibility sweep: evaluate and log the verdict per symbol.
/// Observational only; buys are initiated by callers of the router.
async fn filter_sweep(
    client: MexcClient,
    params: FilterParams,
    symbols: Vec<Symbol>,
    interval: Duration,
) {
    let filter = AntiHypeFilter::new(client, params);
    let mut ticker = tokio::time::interval(interval);

    loop {
        ticker.tick().await;
        for symbol in &symbols {
            let verdict = filter.check_buy_permission(symbol).await;
            info!(
                %symbol,
                allowed = verdict.allowed(),
                multiplier = verdict.multiplier(),
                reason = %verdict.reason(),
                "filter sweep"
            );
        }
    }
}

/// Periodic position report from raw trade history
async fn pnl_sweep(client: MexcClient, symbols: Vec<Symbol>, history_limit: u32, interval: Duration) {
    let mut ticker = tokio::time::interval(interval);

    loop {
        ticker.tick().await;
        let balances = match client.get_account_balances().await {
            Ok(b) => b,
            Err(e) => {
                warn!(error = %e, "balance fetch failed, skipping PnL sweep");
                continue;
            }
        };

        for symbol in &symbols {
            let held = balances
                .get(symbol.base_asset())
                .map(|b| b.total())
                .unwrap_or(0.0);
            let trades = match client.get_my_trades(symbol, history_limit).await {
                Ok(t) => t,
                Err(e) => {
                    warn!(%symbol, error = %e, "trade history fetch failed");
                    continue;
                }
            };
            let price = match client.get_ticker_price(symbol).await {
                Ok(p) => p,
                Err(e) => {
                    warn!(%symbol, error = %e, "price fetch failed");
                    continue;
                }
            };

            let report = accountant::compute(&trades, held, price);
            info!(
                %symbol,
                avg_cost = report.avg_cost,
                open_qty = report.open_quantity,
                realized = report.realized_pnl,
                unrealized = report.unrealized_pnl,
                "position report"
            );
        }
    }
}

/// Periodic 50/50 check; conversions go through the router like any other
/// spend. Bucket B is the quote stablecoin, bucket A the asset against it.
async fn rebalance_sweep(
    client: MexcClient,
    config: Config,
    tx: mpsc::Sender<SpendIntent>,
    interval: Duration,
) {
    let pair = Symbol::new(format!(
        "{}{}",
        config.rebalance.asset_a, config.rebalance.asset_b
    ));
    let mut ticker = tokio::time::interval(interval);

    loop {
        ticker.tick().await;
        let snapshot = match portfolio_snapshot(&client, &config, &pair).await {
            Ok(s) => s,
            Err(e) => {
                warn!(error = %e, "snapshot failed, skipping rebalance check");
                continue;
            }
        };

        let action = rebalance::plan(&snapshot, &config.rebalance.limits);
        match action {
            RebalanceAction::NoOp { reason } => {
                info!(?reason, "rebalance check: no action");
            }
            RebalanceAction::Convert {
                from,
                amount,
                partial,
                ..
            } => {
                info!(?from, amount, partial, "rebalance conversion requested");
                let intent = match from {
                    // Stablecoin side overweight: buy the asset
                    Bucket::B => SpendIntent::Buy {
                        symbol: pair.clone(),
                        notional: amount,
                        origin: IntentOrigin::Rebalance,
                    },
                    // Asset side overweight: sell free units worth `amount`
                    Bucket::A => {
                        let price = match client.get_ticker_price(&pair).await {
                            Ok(p) if p > 0.0 => p,
                            _ => {
                                warn!(%pair, "no price for conversion, skipping");
                                continue;
                            }
                        };
                        SpendIntent::Sell {
                            symbol: pair.clone(),
                            quantity: amount / price,
                        }
                    }
                };
                if tx.send(intent).await.is_err() {
                    error!("order router gone, stopping rebalance sweep");
                    return;
                }
            }
        }
    }
}

/// Value both buckets in quote currency from live balances and price
async fn portfolio_snapshot(
    client: &MexcClient,
    config: &Config,
    pair: &Symbol,
) -> Result<PortfolioSnapshot> {
    let balances = client.get_account_balances().await?;
    let price = client.get_ticker_price(pair).await?;

    let a = balances
        .get(config.rebalance.asset_a.as_str())
        .copied()
        .unwrap_or_default();
    let b = balances
        .get(config.rebalance.asset_b.as_str())
        .copied()
        .unwrap_or_default();

    Ok(PortfolioSnapshot {
        bucket_a_value: a.total() * price,
        bucket_b_value: b.total(),
        free_a: a.free * price,
        free_b: b.free,
    })
}
