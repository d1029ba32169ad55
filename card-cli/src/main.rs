//! # Cardsmith
//!
//! Command-line host for the card layout editor.

use card_cli::{commands, init_tracing, CliArgs, CliConfig};
use clap::Parser;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    init_tracing();

    let args = CliArgs::parse();
    let config = CliConfig::from(args);
    tracing::debug!("Running {:?}", config.command);

    let mut stdout = std::io::stdout().lock();
    commands::run(config, &mut stdout).await
}
