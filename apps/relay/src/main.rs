//! `relay` runs a small fan-out scenario on an event hub.
//!
//! Usage: `relay [CONFIG]`. Without an argument `./relay.toml` is read when
//! present; `RELAY__SECTION__KEY` environment variables override file values.

mod config;
mod demo;

use crate::config::{AppConfig, load_config};
use relay_logger::Logger;
use std::path::PathBuf;
use tokio_util::sync::CancellationToken;
use tracing::info;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let path = std::env::args_os().nth(1).map(PathBuf::from);
    let config: AppConfig = load_config(path.as_deref())?;

    let _logger = Logger::init(env!("CARGO_PKG_NAME"), &config.logger)?;
    info!(version = env!("CARGO_PKG_VERSION"), hub = %config.hub.name, "Starting relay");

    let token = CancellationToken::new();
    let report = demo::run(config.hub, &config.demo, token.clone()).await;
    token.cancel();

    let report = report?;
    info!(
        all = report.all.len(),
        filtered = report.filtered.len(),
        short = report.short.len(),
        "Demo complete"
    );
    Ok(())
}
