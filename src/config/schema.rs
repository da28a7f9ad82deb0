//! Configuration schema for ledgerops
//!
//! Global configuration lives at `~/.config/ledgerops/config.toml`; a
//! project-local `.ledgerops.toml` overrides it section by section.

use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

/// Line prefixes Buildkite treats as collapsible log-section headers
pub const LOG_SECTION_MARKERS: [&str; 3] = ["+++", "---", "~~~"];

/// Root configuration structure
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    /// General settings
    pub general: GeneralConfig,

    /// Installer settings
    pub install: InstallConfig,

    /// CI build-cache settings
    pub cache: CacheConfig,

    /// Secrets bundle settings
    pub secrets: SecretsConfig,
}

impl Config {
    /// Check invariants serde cannot express
    pub fn validate(&self) -> Result<(), String> {
        let prefix = &self.cache.shell_trace_prefix;
        if prefix.is_empty() {
            return Err("cache.shell_trace_prefix must not be empty".to_string());
        }
        if let Some(marker) = LOG_SECTION_MARKERS.iter().find(|m| prefix.starts_with(**m)) {
            return Err(format!(
                "cache.shell_trace_prefix {prefix:?} starts with {marker:?}, which CI parses as a log section"
            ));
        }

        if let Some(bin) = self.install.bin_crates.iter().find(|b| b.name.trim().is_empty()) {
            return Err(format!("install.bin_crates entry with empty name (path {:?})", bin.path));
        }

        let programs = &self.install.programs;
        if programs.prefixes.is_empty()
            || programs.suffixes.is_empty()
            || programs.extensions.is_empty()
        {
            return Err(
                "install.programs prefixes, suffixes and extensions must each have at least one entry"
                    .to_string(),
            );
        }

        Ok(())
    }
}

/// General application settings
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct GeneralConfig {
    /// Append JSON-lines run events to the state directory
    pub event_log: bool,
}

impl Default for GeneralConfig {
    fn default() -> Self {
        Self { event_log: true }
    }
}

/// A binary crate installed into `<dest>/bin`
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BinCrate {
    /// Crate name, used in logs
    pub name: String,

    /// Crate path relative to the workspace root (defaults to `name`)
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub path: Option<PathBuf>,
}

impl BinCrate {
    /// Allowlist entry whose path matches its name
    pub fn named(name: &str) -> Self {
        Self {
            name: name.to_string(),
            path: None,
        }
    }

    /// Path handed to `cargo install --path`
    pub fn crate_path(&self) -> &Path {
        self.path
            .as_deref()
            .unwrap_or_else(|| Path::new(&self.name))
    }
}

/// Installer configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct InstallConfig {
    /// Binary allowlist, installed in listed order
    pub bin_crates: Vec<BinCrate>,

    /// Native program module discovery
    pub programs: ProgramsConfig,
}

impl Default for InstallConfig {
    fn default() -> Self {
        Self {
            bin_crates: [
                "drone",
                "keygen",
                "fullnode",
                "bench-streamer",
                "bench-tps",
                "wallet",
            ]
            .into_iter()
            .map(BinCrate::named)
            .collect(),
            programs: ProgramsConfig::default(),
        }
    }
}

/// Naming tables for native program shared libraries
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ProgramsConfig {
    /// Directory whose subdirectories are native programs
    pub dir: PathBuf,

    /// Build output directory searched for artifacts
    pub artifact_dir: PathBuf,

    /// Filename prefixes, in search order
    pub prefixes: Vec<String>,

    /// Suffixes appended after the program name
    pub suffixes: Vec<String>,

    /// Platform shared-library extensions
    pub extensions: Vec<String>,
}

impl Default for ProgramsConfig {
    fn default() -> Self {
        Self {
            dir: PathBuf::from("programs/native"),
            artifact_dir: PathBuf::from("target/release/deps"),
            prefixes: vec!["lib".to_string(), "libsolana_".to_string()],
            suffixes: vec![String::new(), "_program".to_string()],
            extensions: vec!["so".to_string(), "dylib".to_string(), "dll".to_string()],
        }
    }
}

/// CI build-cache configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct CacheConfig {
    /// Root holding one cache directory per job label
    /// (default: `~/cargo-target-cache`)
    #[serde(skip_serializing_if = "Option::is_none")]
    pub root: Option<PathBuf>,

    /// Evict a label's cache once it exceeds this many GB (10^9 bytes)
    pub max_size_gb: u64,

    /// Environment variable carrying the job label
    pub label_env: String,

    /// Shell tracing prefix exported as `PS4`
    pub shell_trace_prefix: String,
}

impl CacheConfig {
    /// Resolved cache root
    pub fn root_dir(&self) -> PathBuf {
        self.root.clone().unwrap_or_else(|| {
            dirs::home_dir()
                .unwrap_or_else(|| PathBuf::from("."))
                .join("cargo-target-cache")
        })
    }
}

impl Default for CacheConfig {
    fn default() -> Self {
        Self {
            root: None,
            max_size_gb: 10,
            label_env: "BUILDKITE_LABEL".to_string(),
            shell_trace_prefix: "++".to_string(),
        }
    }
}

/// Secrets bundle configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct SecretsConfig {
    /// Encrypted bundle, relative to the workspace root
    pub file: PathBuf,

    /// Decryption tool printing `export KEY=VALUE` lines
    pub decryptor: String,
}

impl Default for SecretsConfig {
    fn default() -> Self {
        Self {
            file: PathBuf::from(".buildkite/env/secrets.ejson"),
            decryptor: "ejson2env".to_string(),
        }
    }
}
