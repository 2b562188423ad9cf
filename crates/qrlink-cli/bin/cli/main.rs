mod cli;
mod commands;

use crate::cli::{LogFormatArg, CLI};
use clap::Parser;
use tracing::debug;
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let config = CLI::parse();
    init_tracing(config.log_format);

    debug!(
        store_dir = %config.store_dir.display(),
        base_url = %config.base_url,
        log_format = %config.log_format,
        "starting qrlink"
    );

    commands::run(config).await
}

/// Logs go to stderr so command output on stdout stays pipeable.
fn init_tracing(format: LogFormatArg) {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn"));
    let subscriber = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr);

    match format {
        LogFormatArg::Text => subscriber.init(),
        LogFormatArg::Json => subscriber.json().init(),
    }
}
