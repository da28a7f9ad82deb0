//! CI pre-command hook
//!
//! Decrypts the secrets bundle, prunes the label's build cache when it has
//! grown past the threshold, and mirrors the cache into the workspace's
//! `target/` directory. The resulting environment is returned as a value for
//! the caller to export; the process environment is never modified.

use crate::cache::eviction::{apply_size_limit, measure_cache, CacheCheck};
use crate::cache::mirror::{mirror_with_links, MirrorStats};
use crate::config::Config;
use crate::error::{LedgerOpsError, LedgerOpsResult};
use crate::secrets::{shell_quote, SecretsProvider};
use std::fmt;
use std::path::{Path, PathBuf};
use tracing::{debug, info, warn};

/// Variable holding the shell tracing prefix
pub const TRACE_PREFIX_VAR: &str = "PS4";

/// A CI job label, usable as a single cache directory name
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct JobLabel(String);

impl JobLabel {
    /// Validate `raw`. Path separators are replaced so a label can never
    /// address anything outside its own directory under the cache root.
    pub fn parse(raw: &str) -> LedgerOpsResult<Self> {
        let invalid = |reason: &str| LedgerOpsError::InvalidLabel {
            label: raw.to_string(),
            reason: reason.to_string(),
        };

        if raw.trim().is_empty() {
            return Err(invalid("label is empty"));
        }
        if raw == "." || raw == ".." {
            return Err(invalid("label names a relative directory"));
        }

        let sanitized: String = raw
            .chars()
            .map(|c| if matches!(c, '/' | '\\' | '\0') { '_' } else { c })
            .collect();
        Ok(Self(sanitized))
    }

    /// Directory name under the cache root
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for JobLabel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Environment the hook hands to the rest of the CI job
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct HookEnvironment {
    vars: Vec<(String, String)>,
}

impl HookEnvironment {
    /// Set `key`, replacing an earlier value in place
    pub fn set(&mut self, key: impl Into<String>, value: impl Into<String>) {
        let key = key.into();
        let value = value.into();
        match self.vars.iter_mut().find(|(k, _)| *k == key) {
            Some((_, existing)) => *existing = value,
            None => self.vars.push((key, value)),
        }
    }

    /// Look up a variable
    pub fn get(&self, key: &str) -> Option<&str> {
        self.vars
            .iter()
            .find(|(k, _)| k == key)
            .map(|(_, v)| v.as_str())
    }

    /// Variables in insertion order
    pub fn iter(&self) -> impl Iterator<Item = (&str, &str)> {
        self.vars.iter().map(|(k, v)| (k.as_str(), v.as_str()))
    }

    /// Render as `export KEY='VALUE'` lines for `eval`
    pub fn render_exports(&self) -> String {
        self.iter()
            .map(|(k, v)| format!("export {}={}\n", k, shell_quote(v)))
            .collect()
    }
}

/// How the secrets step went
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SecretsStatus {
    /// Bundle decrypted into this many variables
    Decrypted(usize),
    /// No bundle in the workspace
    BundleMissing,
    /// Decryption was switched off
    Disabled,
}

/// State after secrets and measurement, before the cache is touched
#[derive(Debug, Clone)]
pub struct PreparedHook {
    /// Environment to export
    pub env: HookEnvironment,
    /// Secrets step result
    pub secrets: SecretsStatus,
    /// The label's cache directory
    pub cache_dir: PathBuf,
    /// Apparent size of the existing cache, if any
    pub measured: Option<u64>,
}

/// Everything one hook run did
#[derive(Debug, Clone)]
pub struct HookOutcome {
    /// Environment to export
    pub env: HookEnvironment,
    /// Secrets step result
    pub secrets: SecretsStatus,
    /// The label's cache directory
    pub cache_dir: PathBuf,
    /// Size check result
    pub check: CacheCheck,
    /// Mirror pass statistics
    pub mirror: MirrorStats,
}

/// Pre-command hook over one workspace
pub struct CacheHook<'a> {
    config: &'a Config,
    workspace: PathBuf,
    secrets: Option<&'a dyn SecretsProvider>,
}

impl<'a> CacheHook<'a> {
    /// Create a hook; pass `None` to skip secrets decryption
    pub fn new(
        config: &'a Config,
        workspace: PathBuf,
        secrets: Option<&'a dyn SecretsProvider>,
    ) -> Self {
        Self {
            config,
            workspace,
            secrets,
        }
    }

    /// Cache directory for `label`
    pub fn cache_dir(&self, label: &JobLabel) -> PathBuf {
        self.config.cache.root_dir().join(label.as_str())
    }

    /// Run the hook for `label`
    pub async fn run(&self, label: &JobLabel) -> LedgerOpsResult<HookOutcome> {
        let prepared = self.prepare(label).await?;
        self.sync(prepared).await
    }

    /// Decrypt secrets, set the trace prefix and measure the label's cache.
    /// Nothing on disk changes.
    pub async fn prepare(&self, label: &JobLabel) -> LedgerOpsResult<PreparedHook> {
        let mut env = HookEnvironment::default();
        let secrets = self.decrypt_into(&mut env).await?;
        env.set(TRACE_PREFIX_VAR, self.config.cache.shell_trace_prefix.clone());

        let cache_dir = self.cache_dir(label);
        let dir = cache_dir.clone();
        let measured = tokio::task::spawn_blocking(move || measure_cache(&dir))
            .await
            .map_err(|e| LedgerOpsError::Internal(format!("cache size task failed: {e}")))??;

        Ok(PreparedHook {
            env,
            secrets,
            cache_dir,
            measured,
        })
    }

    /// Evict an oversized cache, recreate it and mirror it into the workspace
    pub async fn sync(&self, prepared: PreparedHook) -> LedgerOpsResult<HookOutcome> {
        let PreparedHook {
            env,
            secrets,
            cache_dir,
            measured,
        } = prepared;
        let work_target = self.workspace.join("target");
        let max_gb = self.config.cache.max_size_gb;

        let dir = cache_dir.clone();
        let (check, mirror) = tokio::task::spawn_blocking(move || {
            sync_cache(&dir, measured, &work_target, max_gb)
        })
        .await
        .map_err(|e| LedgerOpsError::Internal(format!("cache task failed: {e}")))??;

        Ok(HookOutcome {
            env,
            secrets,
            cache_dir,
            check,
            mirror,
        })
    }

    async fn decrypt_into(&self, env: &mut HookEnvironment) -> LedgerOpsResult<SecretsStatus> {
        let Some(provider) = self.secrets else {
            debug!("Secrets decryption disabled");
            return Ok(SecretsStatus::Disabled);
        };

        let bundle = self.workspace.join(&self.config.secrets.file);
        if !bundle.is_file() {
            warn!("No secrets bundle at {}, skipping decryption", bundle.display());
            return Ok(SecretsStatus::BundleMissing);
        }

        let vars = provider.decrypt(&bundle).await?;
        let count = vars.len();
        for (key, value) in vars {
            env.set(key, value);
        }
        Ok(SecretsStatus::Decrypted(count))
    }
}

/// Prune, recreate and mirror the cache into `work_target`
fn sync_cache(
    cache_dir: &Path,
    measured: Option<u64>,
    work_target: &Path,
    max_gb: u64,
) -> LedgerOpsResult<(CacheCheck, MirrorStats)> {
    let check = apply_size_limit(cache_dir, measured, max_gb)?;

    let cache_target = cache_dir.join("target");
    std::fs::create_dir_all(&cache_target).map_err(|e| {
        LedgerOpsError::io(format!("creating cache directory {}", cache_target.display()), e)
    })?;

    let stats = mirror_with_links(&cache_target, work_target)?;
    info!(
        "Synced {} -> {}: {} linked, {} copied, {} unchanged, {} removed",
        cache_target.display(),
        work_target.display(),
        stats.linked,
        stats.copied,
        stats.unchanged,
        stats.removed
    );
    Ok((check, stats))
}
