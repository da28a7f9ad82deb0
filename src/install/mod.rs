//! Workspace installer
//!
//! Builds the workspace, installs the binary allowlist and copies native
//! program modules into an install root:
//!
//! | Step | Failure policy |
//! |------|----------------|
//! | Build workspace (release) | fatal, aborts the run |
//! | Install each allowlisted binary | fatal, aborts remaining installs |
//! | Copy native program artifacts | per artifact, logged and skipped |
//! | Report disk usage and elapsed time | fatal only if the walk fails |
//!
//! Runs assume exclusive use of the install root; concurrent installs into
//! the same directory are not coordinated.

pub mod programs;

pub use programs::{candidate_file_names, deps_dir, discover_programs, ArtifactOutcome};

use crate::config::schema::InstallConfig;
use crate::disk::{disk_usage, DiskUsage};
use crate::error::{LedgerOpsError, LedgerOpsResult};
use crate::toolchain::{OutputSink, Toolchain};
use std::path::{Path, PathBuf};
use std::time::{Duration, Instant};
use tracing::info;

/// Everything a finished install produced
#[derive(Debug, Clone)]
pub struct InstallSummary {
    /// Absolute install root
    pub install_dir: PathBuf,
    /// Binary crates installed, in allowlist order
    pub binaries: Vec<String>,
    /// Native program artifacts handled
    pub artifacts: Vec<ArtifactOutcome>,
    /// Disk usage of the install root after the run
    pub usage: DiskUsage,
    /// Wall-clock time of the whole run
    pub elapsed: Duration,
}

impl InstallSummary {
    /// Artifacts that exist but could not be copied
    pub fn failed_artifacts(&self) -> impl Iterator<Item = &ArtifactOutcome> {
        self.artifacts.iter().filter(|a| !a.is_copied())
    }
}

/// Progress callbacks for the install pipeline
pub trait InstallObserver: Send + Sync {
    /// The workspace build is starting
    fn build_started(&self) {}
    /// A line of toolchain output
    fn output(&self, _line: String) {}
    /// The workspace build finished successfully
    fn build_finished(&self) {}
    /// Install of one allowlisted binary is starting
    fn binary_started(&self, _name: &str) {}
    /// One allowlisted binary was installed
    fn binary_installed(&self, _name: &str) {}
    /// Native program discovery is starting
    fn programs_started(&self) {}
    /// A native program artifact was handled
    fn artifact(&self, _outcome: &ArtifactOutcome) {}
}

/// Observer that ignores every event
pub struct SilentObserver;

impl InstallObserver for SilentObserver {}

/// Validate the requested destination and turn it into an existing absolute
/// directory. Nothing is created when the destination is missing or empty.
pub fn resolve_install_dir(requested: Option<&Path>) -> LedgerOpsResult<PathBuf> {
    let requested = match requested {
        Some(path) if !path.as_os_str().is_empty() => path,
        _ => return Err(LedgerOpsError::InstallDirMissing),
    };

    std::fs::create_dir_all(requested).map_err(|e| {
        LedgerOpsError::io(format!("creating install directory {}", requested.display()), e)
    })?;
    requested.canonicalize().map_err(|e| {
        LedgerOpsError::io(format!("resolving install directory {}", requested.display()), e)
    })
}

/// Install pipeline over one workspace
pub struct Installer<'a> {
    toolchain: &'a dyn Toolchain,
    config: &'a InstallConfig,
    workspace: PathBuf,
}

impl<'a> Installer<'a> {
    /// Create an installer for `workspace`
    pub fn new(toolchain: &'a dyn Toolchain, config: &'a InstallConfig, workspace: PathBuf) -> Self {
        Self {
            toolchain,
            config,
            workspace,
        }
    }

    /// Run every step into `install_dir` (already resolved) with `features`
    pub async fn run(
        &self,
        install_dir: &Path,
        features: &str,
        observer: &dyn InstallObserver,
    ) -> LedgerOpsResult<InstallSummary> {
        let started = Instant::now();
        let sink = |line: String| observer.output(line);
        let sink: OutputSink<'_> = &sink;

        info!("Install location: {}", install_dir.display());

        observer.build_started();
        self.toolchain
            .build_release(&self.workspace, features, sink)
            .await?;
        observer.build_finished();

        let mut binaries = Vec::with_capacity(self.config.bin_crates.len());
        for krate in &self.config.bin_crates {
            observer.binary_started(&krate.name);
            self.toolchain
                .install_binary(&self.workspace, krate, install_dir, features, sink)
                .await?;
            observer.binary_installed(&krate.name);
            binaries.push(krate.name.clone());
        }

        observer.programs_started();
        let programs = &self.config.programs;
        let artifacts = programs::install_program_artifacts(
            programs,
            &self.workspace.join(&programs.dir),
            &self.workspace.join(&programs.artifact_dir),
            &deps_dir(install_dir),
        )
        .await;
        for outcome in &artifacts {
            observer.artifact(outcome);
        }

        let root = install_dir.to_path_buf();
        let usage = tokio::task::spawn_blocking(move || disk_usage(&root))
            .await
            .map_err(|e| LedgerOpsError::Internal(format!("disk usage task failed: {e}")))??;

        Ok(InstallSummary {
            install_dir: install_dir.to_path_buf(),
            binaries,
            artifacts,
            usage,
            elapsed: started.elapsed(),
        })
    }
}

#[cfg(test)]
pub(crate) mod testing {
    //! In-process toolchain that fakes cargo's filesystem effects

    use super::*;
    use crate::config::schema::BinCrate;
    use async_trait::async_trait;
    use std::sync::Mutex;

    /// Records calls and writes fake binaries / artifacts
    #[derive(Default)]
    pub struct FakeToolchain {
        /// Build artifacts written into the workspace on build: (relative path, contents)
        pub build_outputs: Vec<(PathBuf, Vec<u8>)>,
        /// Exit code for the build step
        pub fail_build: Option<i32>,
        /// Crate whose install fails with exit code 1
        pub fail_install: Option<String>,
        /// Every invocation, rendered
        pub calls: Mutex<Vec<String>>,
    }

    #[async_trait]
    impl Toolchain for FakeToolchain {
        async fn is_available(&self) -> bool {
            true
        }

        async fn build_release(
            &self,
            workspace: &Path,
            features: &str,
            on_output: OutputSink<'_>,
        ) -> LedgerOpsResult<()> {
            self.calls
                .lock()
                .unwrap()
                .push(format!("build features={features:?}"));
            on_output("   Compiling fake v0.1.0".to_string());
            if let Some(code) = self.fail_build {
                return Err(LedgerOpsError::BuildFailed { code });
            }
            for (rel, contents) in &self.build_outputs {
                let path = workspace.join(rel);
                std::fs::create_dir_all(path.parent().unwrap()).unwrap();
                std::fs::write(path, contents).unwrap();
            }
            Ok(())
        }

        async fn install_binary(
            &self,
            _workspace: &Path,
            krate: &BinCrate,
            root: &Path,
            features: &str,
            _on_output: OutputSink<'_>,
        ) -> LedgerOpsResult<()> {
            self.calls
                .lock()
                .unwrap()
                .push(format!("install {} features={features:?}", krate.name));
            if self.fail_install.as_deref() == Some(krate.name.as_str()) {
                return Err(LedgerOpsError::InstallFailed {
                    crate_name: krate.name.clone(),
                    code: 1,
                });
            }
            let bin = root.join("bin");
            std::fs::create_dir_all(&bin).unwrap();
            std::fs::write(bin.join(&krate.name), krate.name.as_bytes()).unwrap();
            Ok(())
        }

        fn toolchain_name(&self) -> &'static str {
            "fake"
        }
    }

    impl FakeToolchain {
        pub fn calls(&self) -> Vec<String> {
            self.calls.lock().unwrap().clone()
        }
    }
}
