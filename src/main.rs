//! Anti-hype spot trading bot - main entry point
//!
//! This binary provides four subcommands:
//! - filter: Evaluate the anti-hype buy filter for symbols (public data)
//! - pnl: Rebuild average-cost positions from trade history
//! - rebalance: Check (and optionally execute) the 50/50 rebalance
//! - run: Long-running monitors with the order router

use anyhow::Result;
use clap::{Parser, Subcommand};
use std::path::PathBuf;
use tracing::info;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

mod commands;

#[derive(Parser, Debug)]
#[command(name = "hypeguard")]
#[command(about = "Anti-hype spot trading bot with average-cost accounting and 50/50 rebalancing", long_about = None)]
#[command(version)]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Verbose output
    #[arg(short, long, global = true)]
    verbose: bool,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Evaluate the anti-hype buy filter for symbols
    Filter {
        /// Path to configuration file
        #[arg(short, long)]
        config: Option<String>,

        /// Symbols to evaluate (comma-separated, overrides config)
        #[arg(short, long)]
        symbols: Option<String>,

        /// Use the rebalancing parameter set instead of the opportunistic one
        #[arg(long)]
        rebalancing: bool,
    },

    /// Rebuild average-cost positions from trade history
    Pnl {
        /// Path to configuration file
        #[arg(short, long)]
        config: Option<String>,

        /// Single symbol (overrides config)
        #[arg(short, long)]
        symbol: Option<String>,
    },

    /// Check the 50/50 bucket split and plan a conversion
    Rebalance {
        /// Path to configuration file
        #[arg(short, long)]
        config: Option<String>,

        /// Place the planned order (CAUTION - REAL MONEY!)
        #[arg(long)]
        execute: bool,
    },

    /// Run all monitors until interrupted
    Run {
        /// Path to configuration file
        #[arg(short, long)]
        config: Option<String>,
    },
}

fn setup_logging(verbose: bool, command_name: &str) -> Result<()> {
    // Create logs directory
    std::fs::create_dir_all("logs")?;

    let log_filename = format!(
        "{}_{}.log",
        command_name,
        chrono::Local::now().format("%Y-%m-%d_%H-%M-%S")
    );
    let log_path = PathBuf::from("logs").join(&log_filename);

    // Set log level - filter out noisy external crates
    let level = if verbose { "debug" } else { "info" };
    let filter_str = format!(
        "{},hyper=warn,hyper_util=warn,reqwest=warn,rustls=warn,h2=warn",
        level
    );
    let env_filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(&filter_str));

    let file_appender = tracing_appender::rolling::never("logs", &log_filename);

    let console_layer = tracing_subscriber::fmt::layer()
        .with_target(true)
        .with_line_number(true)
        .with_file(true)
        .with_ansi(true);

    // File layer - same format but without ANSI colors
    let file_layer = tracing_subscriber::fmt::layer()
        .with_writer(file_appender)
        .with_target(true)
        .with_line_number(true)
        .with_file(true)
        .with_ansi(false);

    tracing_subscriber::registry()
        .with(env_filter)
        .with(console_layer)
        .with(file_layer)
        .init();

    info!("Logging initialized");
    info!("Log file: {}", log_path.display());

    Ok(())
}

fn main() -> Result<()> {
    let cli = Cli::parse();

    let command_name = match &cli.command {
        Commands::Filter { .. } => "filter",
        Commands::Pnl { .. } => "pnl",
        Commands::Rebalance { .. } => "rebalance",
        Commands::Run { .. } => "run",
    };

    setup_logging(cli.verbose, command_name)?;

    match cli.command {
        Commands::Filter {
            config,
            symbols,
            rebalancing,
        } => commands::filter::run(config, symbols, rebalancing),

        Commands::Pnl { config, symbol } => commands::pnl::run(config, symbol),

        Commands::Rebalance { config, execute } => commands::rebalance::run(config, execute),

        Commands::Run { config } => commands::run::run(config),
    }
}
