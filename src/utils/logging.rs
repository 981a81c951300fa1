use std::{path::Path, sync::LazyLock};

use anyhow::{anyhow, Result};
use tracing::level_filters::LevelFilter;
use tracing_appender::rolling::Rotation;
use tracing_subscriber::fmt::{format::FmtSpan, writer::MakeWriterExt};

const LOG_FILE_PREFIX: &str = "career-tally";
const DEFAULT_LEVEL: &str = "info";

/// Sends crate logs into daily rotated files under `<app_dir>/logs`, and to stdout when
/// `show_std` is set.
pub fn enable_logging(app_dir: &Path, log_level: Option<LevelFilter>, show_std: bool) -> Result<()> {
    let appender = tracing_appender::rolling::Builder::new()
        .rotation(Rotation::DAILY)
        .max_log_files(5)
        .filename_prefix(LOG_FILE_PREFIX)
        .build(app_dir.join("logs"))?;

    let stdout = std::io::stdout.with_filter(move |_| show_std);

    tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::new(filter_directive(
            log_level,
            std::env::var("RUST_LOG").ok(),
        )))
        .with_span_events(FmtSpan::CLOSE)
        .with_writer(stdout.and(appender))
        .pretty()
        .try_init()
        .map_err(|e| anyhow!("Failed to install logger {e}"))?;
    Ok(())
}

/// Filter limited to this crate. An explicit level beats `RUST_LOG`.
fn filter_directive(log_level: Option<LevelFilter>, env_level: Option<String>) -> String {
    let level = log_level
        .map(|v| v.to_string().to_lowercase())
        .or(env_level)
        .unwrap_or_else(|| DEFAULT_LEVEL.into());
    format!("{}={level}", env!("CARGO_PKG_NAME").replace('-', "_"))
}

pub static TEST_LOGGING: LazyLock<()> = LazyLock::new(|| {
    let _ = tracing_subscriber::fmt()
        .with_max_level(LevelFilter::TRACE)
        .with_test_writer()
        .pretty()
        .try_init();
});
