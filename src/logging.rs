use std::fs;
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

/// Initialize tracing with a human-readable console layer and a daily-rolling
/// JSON file layer under `logs/`.
pub fn init_logging() {
    let _ = fs::create_dir_all("logs");

    let file_appender = tracing_appender::rolling::daily("logs", "etl.log");
    let (file_writer, guard) = tracing_appender::non_blocking(file_appender);

    // RUST_LOG wins when set; otherwise default to info for this crate only.
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("gbw_etl=info"));

    tracing_subscriber::registry()
        .with(filter)
        .with(fmt::layer().json().with_writer(file_writer))
        .with(fmt::layer().with_writer(std::io::stdout))
        .init();

    // Leak the guard so buffered file output survives until process exit.
    std::mem::forget(guard);
}
