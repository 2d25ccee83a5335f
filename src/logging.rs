//! Logging setup: console output plus a daily-rolling file in the
//! configured directory.

use passtrack_core::config::LogConfig;
use tracing_appender::non_blocking::WorkerGuard;
use tracing_subscriber::fmt::writer::MakeWriterExt;
use tracing_subscriber::EnvFilter;

/// Initialize tracing. Returns the appender guard that must stay alive
/// for the lifetime of the process, or `None` when file logging is off.
pub fn init(config: &LogConfig) -> Option<WorkerGuard> {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(config.level.clone()));

    if !config.dir.is_empty() {
        match std::fs::create_dir_all(&config.dir) {
            Ok(()) => {
                let file_appender = tracing_appender::rolling::daily(&config.dir, "passtrack.log");
                let (non_blocking, guard) = tracing_appender::non_blocking(file_appender);
                tracing_subscriber::fmt()
                    .with_env_filter(filter)
                    .with_writer(non_blocking.and(std::io::stderr))
                    .with_ansi(false)
                    .init();
                return Some(guard);
            }
            Err(e) => {
                eprintln!(
                    "passtrack: cannot create log dir {}: {e}; logging to console only",
                    config.dir
                );
            }
        }
    }

    tracing_subscriber::fmt().with_env_filter(filter).init();
    None
}
