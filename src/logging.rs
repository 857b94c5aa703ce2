use std::path::{Path, PathBuf};

use anyhow::Context;
use chrono::Local;
use tracing_appender::non_blocking::WorkerGuard;
use tracing_indicatif::IndicatifLayer;
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;

use crate::Result;

/// Console and per-run log file
///
/// Keep it alive for the whole run: dropping it flushes the log file.
pub struct LogContext {
    pub log_file: PathBuf,
    _guard: WorkerGuard,
}

impl LogContext {
    pub fn init(log_dir: &Path) -> Result<Self> {
        std::fs::create_dir_all(log_dir)
            .with_context(|| format!("Failed to create log directory {}", log_dir.display()))?;
        let file_name = log_file_name(&Local::now());
        let file_appender = tracing_appender::rolling::never(log_dir, &file_name);
        let (non_blocking, guard) = tracing_appender::non_blocking(file_appender);

        let indicatif_layer = IndicatifLayer::new();
        tracing_subscriber::registry()
            .with(
                tracing_subscriber::EnvFilter::try_from_default_env()
                    .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
            )
            .with(
                tracing_subscriber::fmt::layer()
                    .with_writer(indicatif_layer.get_stderr_writer())
                    .compact(),
            )
            .with(
                tracing_subscriber::fmt::layer()
                    .with_writer(non_blocking)
                    .with_ansi(false),
            )
            .with(indicatif_layer)
            .try_init()
            .context("Failed to set up logging")?;

        Ok(LogContext {
            log_file: log_dir.join(file_name),
            _guard: guard,
        })
    }
}

fn log_file_name(now: &chrono::DateTime<Local>) -> String {
    format!("{}.log", now.format("%d-%m-%Y_%H-%M-%S"))
}
