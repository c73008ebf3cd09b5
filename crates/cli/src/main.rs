use std::process::ExitCode;

use clap::Parser;
use claimdesk_cli::Cli;
use claimdesk_core::config::{AppConfig, LoadOptions, LogFormat};

/// Logs go to stderr so stdout stays a single JSON payload per command.
fn init_logging(config: &AppConfig) -> anyhow::Result<()> {
    use tracing::Level;

    let log_level = config.logging.level.parse::<Level>().unwrap_or(Level::INFO);
    let builder = tracing_subscriber::fmt()
        .with_target(false)
        .with_max_level(log_level)
        .with_writer(std::io::stderr);

    let installed = match config.logging.format {
        LogFormat::Compact => builder.compact().try_init(),
        LogFormat::Pretty => builder.pretty().try_init(),
        LogFormat::Json => builder.json().try_init(),
    };
    installed.map_err(|error| anyhow::anyhow!("failed to install log subscriber: {error}"))
}

fn main() -> ExitCode {
    let cli = Cli::parse();

    let options = cli.options();
    let logging_config =
        AppConfig::load(LoadOptions { config_path: options.config_path, ..LoadOptions::default() })
            .unwrap_or_default();
    if let Err(error) = init_logging(&logging_config) {
        eprintln!("{error:#}");
    }

    claimdesk_cli::run(cli)
}
