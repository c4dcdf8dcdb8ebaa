//! CLI command implementations

pub mod filter;
pub mod pnl;
pub mod rebalance;
pub mod run;

use anyhow::{Context, Result};

use hypeguard::Config;

/// Load the config file if given, otherwise defaults plus environment
pub(crate) fn load_config(path: Option<&str>) -> Result<Config> {
    match path {
        Some(p) => Config::from_file(p).context(format!("Failed to load config from {p}")),
        None => {
            let mut config = Config::default();
            config.apply_env();
            Ok(config)
        }
    }
}

/// Build a runtime the way every command does
pub(crate) fn build_runtime() -> Result<tokio::runtime::Runtime> {
    tokio::runtime::Builder::new_multi_thread()
        .enable_all()
        .build()
        .context("Failed to build tokio runtime")
}
