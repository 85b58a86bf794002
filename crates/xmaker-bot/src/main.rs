//! xmaker - cross-exchange market maker, entry point.

use anyhow::Result;
use clap::Parser;
use tracing::info;
use tracing_subscriber::EnvFilter;

/// Cross-exchange market maker: reference prices from one exchange,
/// resting limit orders on another.
#[derive(Parser, Debug)]
#[command(version, about, long_about = None)]
struct Args {
    /// Configuration file path (can also be set via XMAKER_CONFIG env var)
    #[arg(short, long)]
    config: Option<String>,
}

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();

    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .init();

    info!("starting xmaker v{}", env!("CARGO_PKG_VERSION"));

    let config_path = args
        .config
        .or_else(|| std::env::var("XMAKER_CONFIG").ok())
        .unwrap_or_else(|| "config/default.toml".to_string());
    info!(config_path = %config_path, "loading configuration");

    let config = xmaker_bot::AppConfig::from_file(&config_path)?;
    info!(
        pairs = config.pairs.len(),
        venue = %config.venue.base_url,
        "configuration loaded"
    );

    xmaker_bot::Application::new(config).run().await?;

    Ok(())
}
