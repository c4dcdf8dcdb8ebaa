//! Long-running mode: all monitors plus the order router

use anyhow::Result;

use hypeguard::monitor;

pub fn run(config_path: Option<String>) -> Result<()> {
    dotenv::dotenv().ok();
    let config = super::load_config(config_path.as_deref())?;
    let runtime = super::build_runtime()?;
    runtime.block_on(monitor::run(config))
}
