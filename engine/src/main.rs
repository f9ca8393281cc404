// Baton task orchestrator
// Main entry point for the baton binary

use baton_engine::cli::{Cli, Command, ConfigAction};
use baton_engine::config::Config;
use baton_engine::handlers::{
    handle_config_path, handle_config_show, handle_doctor, handle_run, handle_set_key,
    handle_specialists, OutputFormat,
};
use baton_engine::telemetry::{init_telemetry_with_level, valid_log_level};
use clap::Parser;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Parse CLI arguments
    let cli = Cli::parse();

    // Determine output format
    let format = if cli.json {
        OutputFormat::Json
    } else {
        OutputFormat::Text
    };

    // Load configuration (or use custom path if provided)
    let config = if let Some(config_path) = &cli.config {
        Config::load_from_path(config_path)?
    } else {
        Config::load_or_create()?
    };

    // RUST_LOG wins over --log, which wins over the config log level
    let log_level = match cli.log.as_deref() {
        Some(level) if valid_log_level(level) => level,
        Some(level) => anyhow::bail!(
            "Invalid log level '{}'. Must be one of: error, warn, info, debug, trace",
            level
        ),
        None => config.core.log_level.as_str(),
    };
    init_telemetry_with_level(log_level);

    tracing::debug!("Baton v{}", env!("CARGO_PKG_VERSION"));

    // Handle commands
    match cli.command {
        Command::Run {
            goal,
            max_iterations,
        } => {
            tracing::info!("Running goal: {}", goal);
            handle_run(goal, max_iterations, &config, format).await
        }

        Command::Specialists => handle_specialists(&config, format).await,

        Command::Config { action } => {
            tracing::debug!("Config management: {:?}", action);
            match action {
                ConfigAction::Show => handle_config_show(&config, format).await,
                ConfigAction::Path => handle_config_path(cli.config.as_deref(), format).await,
                ConfigAction::SetKey { provider } => handle_set_key(&provider).await,
            }
        }

        Command::Doctor => {
            tracing::info!("Running diagnostics...");
            handle_doctor(&config, format).await
        }
    }
}
