//! Error types for ledgerops
//!
//! All modules use `LedgerOpsResult<T>` as their return type.

use std::path::PathBuf;
use thiserror::Error;

/// Result type alias for ledgerops operations
pub type LedgerOpsResult<T> = Result<T, LedgerOpsError>;

/// All errors that can occur in ledgerops
#[derive(Error, Debug)]
pub enum LedgerOpsError {
    // Usage errors
    #[error("Install directory not specified")]
    InstallDirMissing,

    #[error("Invalid job label {label:?}: {reason}")]
    InvalidLabel { label: String, reason: String },

    // Toolchain errors
    #[error("Required CLI not found: {name}. {hint}")]
    CliNotFound { name: String, hint: String },

    #[error("Workspace build failed (exit code {code})")]
    BuildFailed { code: i32 },

    #[error("Install of {crate_name} failed (exit code {code})")]
    InstallFailed { crate_name: String, code: i32 },

    // Secrets errors
    #[error("Failed to decrypt secrets from {path}: {stderr}")]
    SecretsDecrypt { path: PathBuf, stderr: String },

    #[error("Unparseable secrets line {line:?}: {reason}")]
    SecretsParse { line: String, reason: String },

    // Configuration errors
    #[error("Invalid configuration at {path}: {reason}")]
    ConfigInvalid { path: PathBuf, reason: String },

    #[error("Failed to create config directory {path}: {source}")]
    ConfigDirCreate {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    // IO errors
    #[error("IO error: {context}")]
    Io {
        context: String,
        #[source]
        source: std::io::Error,
    },

    #[error("Path not found: {0}")]
    PathNotFound(PathBuf),

    #[error("Directory walk failed: {0}")]
    Walk(#[from] walkdir::Error),

    // Process errors
    #[error("Command failed: {command}")]
    CommandFailed {
        command: String,
        #[source]
        source: std::io::Error,
    },

    #[error("Process terminated by signal: {0}")]
    ProcessSignaled(String),

    // Serialization errors
    #[error("TOML serialize error: {0}")]
    TomlSerialize(#[from] toml::ser::Error),

    // General errors
    #[error("Internal error: {0}")]
    Internal(String),
}

impl LedgerOpsError {
    /// Create an IO error with context
    pub fn io(context: impl Into<String>, source: std::io::Error) -> Self {
        Self::Io {
            context: context.into(),
            source,
        }
    }

    /// Create a command failed error
    pub fn command_failed(command: impl Into<String>, source: std::io::Error) -> Self {
        Self::CommandFailed {
            command: command.into(),
            source,
        }
    }

    /// Process exit code for this error.
    ///
    /// Build and install failures surface the failing child's own status.
    pub fn exit_code(&self) -> u8 {
        match self {
            Self::BuildFailed { code } | Self::InstallFailed { code, .. } => {
                u8::try_from(*code).ok().filter(|c| *c != 0).unwrap_or(1)
            }
            _ => 1,
        }
    }

    /// Get actionable hint for the error
    pub fn hint(&self) -> Option<&'static str> {
        match self {
            Self::InstallDirMissing => Some("Usage: ledgerops install <DEST> [FEATURES]"),
            Self::InvalidLabel { .. } => Some("Pass --label or set BUILDKITE_LABEL"),
            Self::SecretsDecrypt { .. } => {
                Some("Check that the ejson private key is available on this agent")
            }
            Self::CliNotFound { .. } => Some("Install the tool or add it to PATH"),
            _ => None,
        }
    }
}
