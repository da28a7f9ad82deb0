//! Secrets bundle decryption
//!
//! The CI agent keeps secrets in an encrypted bundle. A decryption tool
//! (`ejson2env`) turns it into `export KEY=VALUE` lines, which are parsed here
//! into plain key/value pairs. Nothing in this module touches the process
//! environment.

mod ejson;
mod shell;

pub use ejson::Ejson2Env;
pub use shell::{has_open_quote, is_valid_env_key, shell_quote, shell_unquote};

use crate::error::{LedgerOpsError, LedgerOpsResult};
use async_trait::async_trait;
use std::path::Path;

/// Decrypts a secrets bundle into environment assignments
#[async_trait]
pub trait SecretsProvider: Send + Sync {
    /// Decrypt `bundle`, returning assignments in the order the tool emitted them
    async fn decrypt(&self, bundle: &Path) -> LedgerOpsResult<Vec<(String, String)>>;
}

/// Parse `export KEY=VALUE` lines as printed by `ejson2env`.
///
/// Blank lines and `#` comments are skipped; the `export ` keyword is optional.
/// A quoted value may span several lines (PEM keys, for instance).
pub fn parse_export_lines(output: &str) -> LedgerOpsResult<Vec<(String, String)>> {
    let mut vars = Vec::new();
    let mut pending: Option<String> = None;

    for raw in output.lines() {
        let statement = match pending.take() {
            Some(mut open) => {
                open.push('\n');
                open.push_str(raw);
                open
            }
            None => {
                let line = raw.trim_start();
                if line.is_empty() || line.starts_with('#') {
                    continue;
                }
                line.to_string()
            }
        };

        if has_open_quote(&statement) {
            pending = Some(statement);
            continue;
        }
        vars.push(parse_assignment(statement.trim_end())?);
    }

    // Unterminated quote at end of output; unquoting reports it
    if let Some(statement) = pending {
        vars.push(parse_assignment(&statement)?);
    }

    Ok(vars)
}

/// Parse one complete `[export ]KEY=VALUE` statement
fn parse_assignment(statement: &str) -> LedgerOpsResult<(String, String)> {
    let assignment = statement
        .strip_prefix("export")
        .filter(|rest| rest.starts_with(char::is_whitespace))
        .map(str::trim_start)
        .unwrap_or(statement);

    let (key, value) = assignment
        .split_once('=')
        .ok_or_else(|| LedgerOpsError::SecretsParse {
            line: redact(statement),
            reason: "expected KEY=VALUE".to_string(),
        })?;

    if !is_valid_env_key(key) {
        return Err(LedgerOpsError::SecretsParse {
            line: redact(statement),
            reason: format!("invalid variable name {key:?}"),
        });
    }

    let value = shell_unquote(value).map_err(|reason| LedgerOpsError::SecretsParse {
        line: redact(statement),
        reason,
    })?;

    Ok((key.to_string(), value))
}

/// Keep only the variable name of a secrets line for error messages
fn redact(line: &str) -> String {
    match line.split_once('=') {
        Some((key, _)) => format!("{key}=<redacted>"),
        None => "<redacted>".to_string(),
    }
}
