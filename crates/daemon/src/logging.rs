// Logging setup: stderr plus a daily rolling file

use crate::settings::LogConfig;
use anyhow::{Context, Result};
use std::path::Path;
use tracing_appender::non_blocking::WorkerGuard;
use tracing_subscriber::{fmt, layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

const LOG_FILE_PREFIX: &str = "todocore.log";
const DEFAULT_FILTER: &str = "todocore=info";

/// Install the global subscriber.
///
/// `TODOCORE_LOG_FORMAT` overrides the configured format. The returned guard
/// flushes the file writer on drop and must live until exit.
pub fn init_logging(config: &LogConfig, dir: &Path) -> Result<WorkerGuard> {
    let format = std::env::var("TODOCORE_LOG_FORMAT").unwrap_or_else(|_| config.format.clone());

    let env_filter = EnvFilter::try_from_default_env()
        .or_else(|_| EnvFilter::try_new(DEFAULT_FILTER))
        .context("invalid log filter")?;

    std::fs::create_dir_all(dir)
        .with_context(|| format!("cannot create log directory {}", dir.display()))?;
    let (file_writer, guard) =
        tracing_appender::non_blocking(tracing_appender::rolling::daily(dir, LOG_FILE_PREFIX));

    // the file always gets JSON so it stays machine readable
    let installed = match format.as_str() {
        "json" => tracing_subscriber::registry()
            .with(env_filter)
            .with(fmt::layer().json())
            .with(fmt::layer().json().with_writer(file_writer))
            .try_init(),
        _ => tracing_subscriber::registry()
            .with(env_filter)
            .with(fmt::layer().pretty())
            .with(fmt::layer().json().with_writer(file_writer))
            .try_init(),
    };
    installed.context("logging already initialised")?;

    Ok(guard)
}
