//! Tally - Main Entry Point

use std::error::Error as StdError;
use std::process::ExitCode;

use clap::Parser;
use tally::{App, Cli, commands, telemetry};
use tally_application::handle_api_error;
use tally_infrastructure::Settings;

#[tokio::main]
async fn main() -> ExitCode {
    let cli = Cli::parse();

    let settings = match Settings::load(cli.config.as_deref()) {
        Ok(settings) => settings,
        Err(e) => {
            eprintln!("Failed to load configuration: {e}");
            return ExitCode::FAILURE;
        }
    };

    let filter = cli.log_level.as_deref().unwrap_or(&settings.log.filter);
    if let Err(e) = telemetry::init_tracing(filter) {
        eprintln!("Failed to setup tracing: {e}");
        return ExitCode::FAILURE;
    }

    tracing::debug!(base_url = %settings.api.base_url, "starting tally v{}", env!("CARGO_PKG_VERSION"));

    let app = match App::new(settings) {
        Ok(app) => app,
        Err(e) => {
            eprintln!("{e:#}");
            return ExitCode::FAILURE;
        }
    };

    match commands::run(&app, cli.command).await {
        Ok(output) => {
            println!("{output}");
            ExitCode::SUCCESS
        }
        Err(e) => {
            let error: &(dyn StdError + 'static) = e.as_ref();
            eprintln!("{}", handle_api_error(error));
            if app.session_expired() {
                eprintln!("Session expired, please log in again: tally login --email <EMAIL>");
            }
            ExitCode::FAILURE
        }
    }
}
