//! MedChat - streaming health-assistant chat CLI
//!
#![doc = "Main entry point for the MedChat application."]

use anyhow::Result;
use std::process::ExitCode;

use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

use medchat::cli::{Cli, Commands};
use medchat::commands;
use medchat::config::Config;

#[tokio::main]
async fn main() -> Result<ExitCode> {
    // Parse command line arguments
    let cli = Cli::parse_args();

    // Initialize tracing
    init_tracing(cli.verbose);

    // Load configuration
    let config_path = cli.config.as_deref().unwrap_or("config/config.yaml");
    let config = Config::load(config_path, &cli)?;

    // Validate configuration
    config.validate()?;

    // Execute command
    match cli.command {
        Commands::Chat { .. } => {
            commands::chat::run_chat(config).await?;
            Ok(ExitCode::SUCCESS)
        }
        Commands::Ask {
            prompt,
            attach,
            json,
            ..
        } => {
            if let Some(path) = &attach {
                tracing::debug!("Attachment: {}", path.display());
            }
            let args = commands::ask::AskArgs {
                prompt,
                attach,
                json,
            };
            let outcome = commands::ask::run_ask(config, args).await?;
            if outcome.is_completed() {
                Ok(ExitCode::SUCCESS)
            } else {
                Ok(ExitCode::FAILURE)
            }
        }
    }
}

/// Initialize tracing subscriber with environment filter
///
/// Logs go to stderr so streamed answers on stdout stay clean.
fn init_tracing(verbose: bool) {
    let default_filter = if verbose { "medchat=debug" } else { "medchat=warn" };
    let env_filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_filter));

    tracing_subscriber::registry()
        .with(env_filter)
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();
}
