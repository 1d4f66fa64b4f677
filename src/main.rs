//! Kolosal AutoFE - Main Entry Point

use clap::Parser;
use kolosal_autofe::cli::{run, Cli};

fn main() -> anyhow::Result<()> {
    // Initialize logging
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "kolosal_autofe=info".into()),
        )
        .init();

    let cli = Cli::parse();
    run(cli)
}
