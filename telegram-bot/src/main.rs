//! Binary: runs every bot configured through `BOT_<NAME>_<KEY>` variables.

use anyhow::{Context, Result};
use clap::Parser;
use telegram_bot::{run_telegram, summarize, AppConfig, Cli, Commands};
use tracing::{error, info};

#[tokio::main]
async fn main() -> Result<()> {
    dotenvy::dotenv().ok();

    let cli = Cli::parse();
    dbot_core::init_tracing(AppConfig::log_file_from_env())?;

    let config = match AppConfig::from_env() {
        Ok(config) => config,
        Err(e) => {
            error!(error = %e, "Invalid configuration");
            return Err(e).context("Failed to load configuration");
        }
    };

    match cli.command() {
        Commands::Run => {
            info!(
                bots = config.bots.len(),
                data_dir = %config.data_dir.display(),
                "Configuration loaded"
            );
            run_telegram(config).await
        }
        Commands::CheckConfig => {
            println!("{}", serde_json::to_string_pretty(&summarize(&config))?);
            Ok(())
        }
    }
}
