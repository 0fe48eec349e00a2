use anyhow::{Context, Result};

use scp_terminal::{
    config::{Config, config_source_from_env},
    console, logging,
};

#[tokio::main]
async fn main() -> Result<()> {
    let source = config_source_from_env();
    let config = Config::from_source(&source)
        .with_context(|| format!("failed to load config from {}", source.path.display()))?;

    let logging_guard = logging::init_tracing(&config.logging)?;
    tracing::info!(
        target: "main",
        run_id = %logging_guard.run_id(),
        config_path = %source.path.display(),
        "terminal_starting"
    );

    console::run(config).await
}
