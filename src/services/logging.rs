//! Logging setup: console output plus a per-run log file
//!
//! Each run writes a timestamped file under the configured logs directory
//! so scheduled runs stay auditable. Old run logs are pruned, keeping the
//! newest 31 files.

use std::fs::{self, File};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::SystemTime;

use anyhow::{Context, Result};
use tracing::warn;
use tracing_subscriber::{EnvFilter, layer::SubscriberExt, util::SubscriberInitExt};

/// How many per-run log files to retain.
const KEEP_LOG_FILES: usize = 31;

/// Initialize the tracing subscriber: ANSI console layer plus a plain
/// file layer for this run. Call once at startup.
pub fn init(logs_dir: &Path) -> Result<()> {
    fs::create_dir_all(logs_dir)
        .with_context(|| format!("Failed to create logs directory {}", logs_dir.display()))?;
    prune_old_logs(logs_dir, KEEP_LOG_FILES);

    let file_name = format!("log_{}.txt", chrono::Local::now().format("%Y%m%d_%H%M%S"));
    let file = File::create(logs_dir.join(&file_name))
        .with_context(|| format!("Failed to create log file {}", file_name))?;

    tracing_subscriber::registry()
        .with(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| "trailarian=info".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .with(
            tracing_subscriber::fmt::layer()
                .with_ansi(false)
                .with_writer(Arc::new(file)),
        )
        .init();

    Ok(())
}

/// Delete the oldest `log_*` files beyond the retention count.
pub fn prune_old_logs(logs_dir: &Path, keep: usize) {
    let Ok(entries) = fs::read_dir(logs_dir) else {
        return;
    };

    let mut logs: Vec<(SystemTime, PathBuf)> = entries
        .flatten()
        .filter(|entry| {
            entry
                .file_name()
                .to_string_lossy()
                .starts_with("log_")
        })
        .filter_map(|entry| {
            let modified = entry.metadata().and_then(|m| m.modified()).ok()?;
            Some((modified, entry.path()))
        })
        .collect();

    if logs.len() <= keep {
        return;
    }

    logs.sort_by_key(|(modified, _)| *modified);
    let excess = logs.len() - keep;
    for (_, path) in logs.into_iter().take(excess) {
        if let Err(e) = fs::remove_file(&path) {
            warn!(file = %path.display(), error = %e, "Failed to prune old log file");
        }
    }
}
