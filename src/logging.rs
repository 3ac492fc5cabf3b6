use std::path::PathBuf;
use std::sync::{Mutex, OnceLock};

use tracing_subscriber::{fmt, EnvFilter};

const DEFAULT_LOG_FILTER: &str = "info";

static LOGGING_INITIALIZED: OnceLock<Option<PathBuf>> = OnceLock::new();

fn log_path() -> Option<PathBuf> {
    dirs::cache_dir().map(|d| d.join("draggable-popup").join("draggable-popup.log"))
}

/// Route tracing output to a log file so it never draws over the TUI.
/// `RUST_LOG` overrides the default filter. Returns the log file path when
/// one could be opened; without it logging is silently disabled.
pub fn init_logging() -> Option<PathBuf> {
    LOGGING_INITIALIZED
        .get_or_init(|| {
            let path = log_path()?;
            if let Some(parent) = path.parent() {
                std::fs::create_dir_all(parent).ok()?;
            }
            let file = std::fs::OpenOptions::new()
                .create(true)
                .append(true)
                .open(&path)
                .ok()?;

            let env_filter = EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| EnvFilter::new(DEFAULT_LOG_FILTER));

            let _ = fmt()
                .with_env_filter(env_filter)
                .with_writer(Mutex::new(file))
                .with_ansi(false)
                .try_init();
            Some(path)
        })
        .clone()
}
