mod config;
mod course;
mod download;
mod errors;
mod extract;
mod logging;
mod orchestrator;
mod sanitize;
mod session;
mod status_bar;

use std::process::ExitCode;
use std::time::Instant;

use tracing::{debug, error, info};

use crate::config::{cli, settings};
use crate::logging::LogContext;

pub type Result<T> = anyhow::Result<T>;

#[tokio::main]
async fn main() -> ExitCode {
    let cli = <cli::Cli as clap::Parser>::parse();

    // Logging needs the log directory, so settings errors are reported once it is running
    let (settings, settings_error) = match settings::read_settings(&cli.config) {
        Ok(settings) => (settings, None),
        Err(e) => (settings::Settings::default(), Some(e)),
    };

    // Start logging
    let log = match LogContext::init(&settings.log_dir) {
        Ok(log) => log,
        Err(e) => {
            eprintln!("{:#}", e);
            return ExitCode::FAILURE;
        }
    };
    debug!("Logging to {}", log.log_file.display());

    if let Some(e) = settings_error {
        error!("{:#}", errors::FatalError::Settings(e));
        return ExitCode::FAILURE;
    }

    info!("dmstk-dl {}", env!("CARGO_PKG_VERSION"));
    let start = Instant::now();

    let code = match orchestrator::run(&cli, &settings).await {
        Ok(status) => {
            info!("Finished: {}", status);
            info!(
                "Total duration: {}",
                orchestrator::format_elapsed(start.elapsed())
            );
            ExitCode::SUCCESS
        }
        Err(e) => {
            error!("{}", e);
            ExitCode::FAILURE
        }
    };

    // Flush the log file before exiting
    drop(log);
    code
}
