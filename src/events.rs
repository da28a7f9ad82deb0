//! Run event log
//!
//! Appends one JSON object per line to `<state dir>/ledgerops/events.log`,
//! giving CI agents a history of installs and cache evictions across jobs.
//! Write failures are reported as warnings and never fail the command.

use crate::cache::MirrorStats;
use crate::config::{schema::Config, ConfigManager};
use chrono::{DateTime, Utc};
use serde::Serialize;
use std::path::{Path, PathBuf};
use tokio::io::AsyncWriteExt;
use tracing::{debug, warn};

/// Something worth remembering about a run
#[derive(Debug, Serialize)]
#[serde(tag = "event", content = "data")]
pub enum Event<'a> {
    #[serde(rename = "install.completed")]
    InstallCompleted {
        install_dir: &'a Path,
        features: &'a str,
        binaries: &'a [String],
        artifacts_copied: usize,
        artifacts_failed: usize,
        total_bytes: u64,
        elapsed_secs: u64,
    },
    #[serde(rename = "install.failed")]
    InstallFailed {
        install_dir: &'a Path,
        features: &'a str,
        error: String,
        exit_code: u8,
    },
    #[serde(rename = "cache.evicted")]
    CacheEvicted {
        label: &'a str,
        cache_dir: &'a Path,
        bytes: u64,
        max_size_gb: u64,
    },
    #[serde(rename = "cache.synced")]
    CacheSynced {
        label: &'a str,
        cache_dir: &'a Path,
        #[serde(flatten)]
        stats: MirrorStats,
    },
}

#[derive(Serialize)]
struct Record<'a> {
    timestamp: DateTime<Utc>,
    #[serde(flatten)]
    event: &'a Event<'a>,
}

/// Append-only JSON-lines event sink
pub struct EventLog {
    path: Option<PathBuf>,
}

impl EventLog {
    /// Event log at the state directory, or a no-op when disabled in config
    pub fn new(config: &Config) -> Self {
        Self {
            path: config
                .general
                .event_log
                .then(ConfigManager::event_log_path),
        }
    }

    /// Event log writing to `path`
    pub fn at(path: PathBuf) -> Self {
        Self { path: Some(path) }
    }

    /// Event log that drops everything
    pub fn disabled() -> Self {
        Self { path: None }
    }

    /// Record `event` with the current time
    pub async fn record(&self, event: &Event<'_>) {
        let Some(path) = &self.path else {
            return;
        };

        let record = Record {
            timestamp: Utc::now(),
            event,
        };
        let line = match serde_json::to_string(&record) {
            Ok(json) => json + "\n",
            Err(e) => {
                warn!("Skipping unserializable event: {}", e);
                return;
            }
        };

        match append_line(path, &line).await {
            Ok(()) => debug!("Recorded event in {}", path.display()),
            Err(e) => warn!("Failed to write event log {}: {}", path.display(), e),
        }
    }
}

async fn append_line(path: &Path, line: &str) -> std::io::Result<()> {
    if let Some(parent) = path.parent() {
        tokio::fs::create_dir_all(parent).await?;
    }

    let mut file = tokio::fs::OpenOptions::new()
        .create(true)
        .append(true)
        .open(path)
        .await?;
    file.write_all(line.as_bytes()).await?;
    file.flush().await
}
