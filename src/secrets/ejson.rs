//! `ejson2env` secrets provider

use crate::error::{LedgerOpsError, LedgerOpsResult};
use crate::secrets::{parse_export_lines, SecretsProvider};
use async_trait::async_trait;
use std::io::ErrorKind;
use std::path::Path;
use std::process::Stdio;
use tokio::process::Command;
use tracing::debug;

/// Runs an `ejson2env`-compatible tool on the bundle
pub struct Ejson2Env {
    program: String,
}

impl Ejson2Env {
    /// Create a provider running `program`
    pub fn new(program: impl Into<String>) -> Self {
        Self {
            program: program.into(),
        }
    }
}

impl Default for Ejson2Env {
    fn default() -> Self {
        Self::new("ejson2env")
    }
}

#[async_trait]
impl SecretsProvider for Ejson2Env {
    async fn decrypt(&self, bundle: &Path) -> LedgerOpsResult<Vec<(String, String)>> {
        debug!("Decrypting {} with {}", bundle.display(), self.program);

        let output = Command::new(&self.program)
            .arg(bundle)
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .output()
            .await
            .map_err(|e| {
                if e.kind() == ErrorKind::NotFound {
                    LedgerOpsError::CliNotFound {
                        name: self.program.clone(),
                        hint: "It must be installed on every CI agent.".to_string(),
                    }
                } else {
                    LedgerOpsError::command_failed(format!("{} {}", self.program, bundle.display()), e)
                }
            })?;

        if !output.status.success() {
            return Err(LedgerOpsError::SecretsDecrypt {
                path: bundle.to_path_buf(),
                stderr: String::from_utf8_lossy(&output.stderr).trim().to_string(),
            });
        }

        let vars = parse_export_lines(&String::from_utf8_lossy(&output.stdout))?;
        debug!("Decrypted {} secret(s)", vars.len());
        Ok(vars)
    }
}
