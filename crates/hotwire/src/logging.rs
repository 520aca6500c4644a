//! Persistent error log and subscriber setup.

use crate::error::HotwireError;
use anyhow::{anyhow, Context};
use chrono::Local;
use std::fs::{self, OpenOptions};
use std::io::Write;
use std::panic::{self, AssertUnwindSafe};
use std::path::{Path, PathBuf};
use tracing::error;

/// Install the stderr subscriber. `RUST_LOG` overrides the default filter.
pub fn init_tracing() {
    use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

    // A second call (tests, embedding) keeps the first subscriber.
    let _ = tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "hotwire=info".into()),
        )
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .try_init();
}

/// Append-only log of failed operations.
#[derive(Debug, Clone)]
pub struct ErrorLog {
    path: PathBuf,
}

impl ErrorLog {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    /// `<data dir>/hotwire/error.log`
    pub fn default_location() -> anyhow::Result<Self> {
        let base = dirs::data_dir()
            .or_else(dirs::home_dir)
            .ok_or_else(|| anyhow!("could not determine a data directory"))?;
        Ok(Self::new(base.join("hotwire").join("error.log")))
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Append `[YYYY-mm-dd HH:MM:SS] <operation>: <message>`.
    pub fn record(&self, operation: &str, message: &str) -> anyhow::Result<()> {
        if let Some(parent) = self.path.parent().filter(|p| !p.as_os_str().is_empty()) {
            fs::create_dir_all(parent)
                .with_context(|| format!("create log directory {}", parent.display()))?;
        }
        let mut file = OpenOptions::new()
            .create(true)
            .append(true)
            .open(&self.path)
            .with_context(|| format!("open error log {}", self.path.display()))?;
        let stamp = Local::now().format("%Y-%m-%d %H:%M:%S");
        writeln!(file, "[{stamp}] {operation}: {message}")
            .with_context(|| format!("write error log {}", self.path.display()))
    }
}

fn panic_message(payload: &(dyn std::any::Any + Send)) -> String {
    if let Some(s) = payload.downcast_ref::<&str>() {
        (*s).to_string()
    } else if let Some(s) = payload.downcast_ref::<String>() {
        s.clone()
    } else {
        "unknown panic".to_string()
    }
}

/// Run one user-facing operation.
///
/// Errors and panics are written to `log` with their full chain and turned
/// into a generic failure for `operation`.
pub fn guard<T>(
    log: &ErrorLog,
    operation: &str,
    f: impl FnOnce() -> anyhow::Result<T>,
) -> Result<T, HotwireError> {
    let message = match panic::catch_unwind(AssertUnwindSafe(f)) {
        Ok(Ok(value)) => return Ok(value),
        Ok(Err(err)) => format!("{err:?}"),
        Err(payload) => format!("panic: {}", panic_message(payload.as_ref())),
    };
    error!(operation, %message, "operation failed");
    if let Err(err) = log.record(operation, &message) {
        error!(%err, "could not write error log");
    }
    Err(HotwireError::OperationFailed(operation.to_string()))
}
