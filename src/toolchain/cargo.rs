//! Cargo toolchain
//!
//! Runs `cargo build` / `cargo install` as child processes, streaming their
//! output line by line.

use crate::config::schema::BinCrate;
use crate::error::{LedgerOpsError, LedgerOpsResult};
use crate::toolchain::runtime::{OutputSink, Toolchain};
use crate::toolchain::{display_command, error_tail, stream_child_output};
use async_trait::async_trait;
use std::path::{Path, PathBuf};
use std::process::{ExitStatus, Stdio};
use tokio::process::Command;
use tracing::{debug, info, warn};

/// Toolchain backed by the `cargo` binary
pub struct CargoToolchain {
    program: PathBuf,
}

impl CargoToolchain {
    /// Use `$CARGO` when set (running under cargo), otherwise `cargo` from PATH
    pub fn new() -> Self {
        let program = std::env::var_os("CARGO")
            .map(PathBuf::from)
            .unwrap_or_else(|| PathBuf::from("cargo"));
        Self::with_program(program)
    }

    /// Use an explicit cargo binary
    pub fn with_program(program: impl Into<PathBuf>) -> Self {
        Self {
            program: program.into(),
        }
    }

    fn build_args(features: &str) -> Vec<String> {
        vec![
            "build".to_string(),
            "--all".to_string(),
            "--release".to_string(),
            "--features".to_string(),
            features.to_string(),
        ]
    }

    fn install_args(krate: &BinCrate, root: &Path, features: &str) -> Vec<String> {
        vec![
            "install".to_string(),
            "--force".to_string(),
            "--path".to_string(),
            krate.crate_path().display().to_string(),
            "--root".to_string(),
            root.display().to_string(),
            "--features".to_string(),
            features.to_string(),
        ]
    }

    /// Run cargo in `workspace`, returning its exit status and output lines
    async fn exec_streamed(
        &self,
        workspace: &Path,
        args: &[String],
        on_output: OutputSink<'_>,
    ) -> LedgerOpsResult<(ExitStatus, Vec<String>)> {
        let rendered = display_command(&self.program.to_string_lossy(), args);
        info!("+ {}", rendered);

        let mut child = Command::new(&self.program)
            .args(args)
            .current_dir(workspace)
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .spawn()
            .map_err(|e| LedgerOpsError::command_failed(rendered.clone(), e))?;

        let output = stream_child_output(&mut child, on_output).await?;
        let status = child
            .wait()
            .await
            .map_err(|e| LedgerOpsError::command_failed(rendered.clone(), e))?;

        debug!("{} exited with {}", rendered, status);
        Ok((status, output))
    }
}

impl Default for CargoToolchain {
    fn default() -> Self {
        Self::new()
    }
}

/// Map a finished child to the fail-fast contract
fn check_status(
    status: ExitStatus,
    output: &[String],
    on_failure: impl FnOnce(i32) -> LedgerOpsError,
) -> LedgerOpsResult<()> {
    if status.success() {
        return Ok(());
    }

    warn!("cargo output tail:\n{}", error_tail(output));
    match status.code() {
        Some(code) => Err(on_failure(code)),
        None => Err(LedgerOpsError::ProcessSignaled(status.to_string())),
    }
}

#[async_trait]
impl Toolchain for CargoToolchain {
    async fn is_available(&self) -> bool {
        Command::new(&self.program)
            .arg("--version")
            .stdout(Stdio::null())
            .stderr(Stdio::null())
            .status()
            .await
            .map(|s| s.success())
            .unwrap_or(false)
    }

    async fn build_release(
        &self,
        workspace: &Path,
        features: &str,
        on_output: OutputSink<'_>,
    ) -> LedgerOpsResult<()> {
        let args = Self::build_args(features);
        let (status, output) = self.exec_streamed(workspace, &args, on_output).await?;
        check_status(status, &output, |code| LedgerOpsError::BuildFailed { code })
    }

    async fn install_binary(
        &self,
        workspace: &Path,
        krate: &BinCrate,
        root: &Path,
        features: &str,
        on_output: OutputSink<'_>,
    ) -> LedgerOpsResult<()> {
        let args = Self::install_args(krate, root, features);
        let (status, output) = self.exec_streamed(workspace, &args, on_output).await?;
        check_status(status, &output, |code| LedgerOpsError::InstallFailed {
            crate_name: krate.name.clone(),
            code,
        })
    }

    fn toolchain_name(&self) -> &'static str {
        "cargo"
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn build_args_forward_features_verbatim() {
        assert_eq!(
            CargoToolchain::build_args("cuda erasure"),
            ["build", "--all", "--release", "--features", "cuda erasure"]
        );
        assert_eq!(CargoToolchain::build_args("").last().unwrap(), "");
    }

    #[test]
    fn install_args_force_into_root() {
        let krate = BinCrate::named("wallet");
        let args = CargoToolchain::install_args(&krate, Path::new("/opt/ledger"), "");
        assert_eq!(
            args,
            [
                "install", "--force", "--path", "wallet", "--root", "/opt/ledger", "--features",
                ""
            ]
        );
    }

    #[cfg(unix)]
    #[tokio::test]
    async fn failing_build_is_fatal() {
        let temp = tempfile::TempDir::new().unwrap();
        let toolchain = CargoToolchain::with_program("false");
        let err = toolchain
            .build_release(temp.path(), "", &|_| {})
            .await
            .unwrap_err();
        assert!(matches!(err, LedgerOpsError::BuildFailed { code: 1 }));
        assert_eq!(err.exit_code(), 1);
    }

    #[cfg(unix)]
    #[tokio::test]
    async fn failing_install_names_crate() {
        let temp = tempfile::TempDir::new().unwrap();
        let toolchain = CargoToolchain::with_program("false");
        let err = toolchain
            .install_binary(temp.path(), &BinCrate::named("keygen"), temp.path(), "", &|_| {})
            .await
            .unwrap_err();
        match err {
            LedgerOpsError::InstallFailed { crate_name, code } => {
                assert_eq!(crate_name, "keygen");
                assert_eq!(code, 1);
            }
            other => panic!("expected InstallFailed, got {other:?}"),
        }
    }

    #[cfg(unix)]
    #[tokio::test]
    async fn successful_build_streams_output() {
        let temp = tempfile::TempDir::new().unwrap();
        let toolchain = CargoToolchain::with_program("echo");
        let lines = std::sync::Mutex::new(Vec::new());
        toolchain
            .build_release(temp.path(), "cuda", &|line| lines.lock().unwrap().push(line))
            .await
            .unwrap();
        assert_eq!(
            lines.into_inner().unwrap(),
            ["build --all --release --features cuda"]
        );
    }

    #[tokio::test]
    async fn missing_program_is_command_failure() {
        let toolchain = CargoToolchain::with_program("/nonexistent/cargo-ledgerops-test");
        assert!(!toolchain.is_available().await);

        let temp = tempfile::TempDir::new().unwrap();
        let err = toolchain
            .build_release(temp.path(), "", &|_| {})
            .await
            .unwrap_err();
        assert!(matches!(err, LedgerOpsError::CommandFailed { .. }));
    }
}
