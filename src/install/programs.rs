//! Native program module discovery
//!
//! Each subdirectory of the programs directory names a program whose
//! release build may leave a shared library in the build output directory.
//! Copies are best-effort: a missing artifact is normal and a failed copy is
//! reported without stopping the install.

use crate::config::schema::ProgramsConfig;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};
use tokio::fs;
use tracing::{debug, info, warn};

/// Result of handling one discovered artifact
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ArtifactOutcome {
    /// Artifact copied into the deps directory
    Copied {
        program: String,
        file_name: String,
        bytes: u64,
    },
    /// Artifact exists but could not be copied
    Failed {
        program: String,
        file_name: String,
        reason: String,
    },
}

impl ArtifactOutcome {
    /// Whether the artifact landed in the deps directory
    pub fn is_copied(&self) -> bool {
        matches!(self, Self::Copied { .. })
    }
}

/// Candidate artifact file names for `program`, in search order.
///
/// Every prefix is combined with every suffix and extension, e.g. `lib{name}.so`
/// or `libsolana_{name}_program.dylib`.
pub fn candidate_file_names(config: &ProgramsConfig, program: &str) -> Vec<String> {
    let mut names = Vec::with_capacity(
        config.prefixes.len() * config.suffixes.len() * config.extensions.len(),
    );
    for prefix in &config.prefixes {
        for suffix in &config.suffixes {
            for ext in &config.extensions {
                names.push(format!("{prefix}{program}{suffix}.{ext}"));
            }
        }
    }
    names
}

/// Names of the program subdirectories under `dir`, sorted.
///
/// A missing or unreadable directory yields no programs.
pub async fn discover_programs(dir: &Path) -> Vec<String> {
    let mut read_dir = match fs::read_dir(dir).await {
        Ok(read_dir) => read_dir,
        Err(e) if e.kind() == ErrorKind::NotFound => {
            debug!("No native programs directory at {}", dir.display());
            return Vec::new();
        }
        Err(e) => {
            warn!("Cannot read native programs directory {}: {}", dir.display(), e);
            return Vec::new();
        }
    };

    let mut programs = Vec::new();
    loop {
        match read_dir.next_entry().await {
            Ok(Some(entry)) => {
                let is_dir = entry.file_type().await.map(|t| t.is_dir()).unwrap_or(false);
                if is_dir {
                    programs.push(entry.file_name().to_string_lossy().into_owned());
                }
            }
            Ok(None) => break,
            Err(e) => {
                warn!("Stopped listing {}: {}", dir.display(), e);
                break;
            }
        }
    }

    programs.sort();
    programs
}

/// Probe every program's candidates in `artifact_dir` and copy the ones that
/// exist into `deps_dir`, replacing any previous copy.
pub async fn install_program_artifacts(
    config: &ProgramsConfig,
    programs_dir: &Path,
    artifact_dir: &Path,
    deps_dir: &Path,
) -> Vec<ArtifactOutcome> {
    let mut outcomes = Vec::new();

    for program in discover_programs(programs_dir).await {
        for file_name in candidate_file_names(config, &program) {
            let artifact = artifact_dir.join(&file_name);
            if !is_regular_file(&artifact).await {
                continue;
            }

            let outcome = match replace_file(&artifact, &deps_dir.join(&file_name)).await {
                Ok(bytes) => {
                    info!("'{}' -> '{}'", artifact.display(), deps_dir.join(&file_name).display());
                    ArtifactOutcome::Copied {
                        program: program.clone(),
                        file_name,
                        bytes,
                    }
                }
                Err(e) => {
                    warn!("Failed to copy {}: {}", artifact.display(), e);
                    ArtifactOutcome::Failed {
                        program: program.clone(),
                        file_name,
                        reason: e.to_string(),
                    }
                }
            };
            outcomes.push(outcome);
        }
    }

    outcomes
}

async fn is_regular_file(path: &Path) -> bool {
    fs::metadata(path)
        .await
        .map(|m| m.is_file())
        .unwrap_or(false)
}

/// Copy `src` to `dest`, removing any existing `dest` first so the new file
/// never inherits the old one's inode or permissions.
async fn replace_file(src: &Path, dest: &Path) -> std::io::Result<u64> {
    if let Some(parent) = dest.parent() {
        fs::create_dir_all(parent).await?;
    }
    match fs::remove_file(dest).await {
        Ok(()) => debug!("Removed previous {}", dest.display()),
        Err(e) if e.kind() == ErrorKind::NotFound => {}
        Err(e) => return Err(e),
    }
    fs::copy(src, dest).await
}

/// Deps directory for native programs under an install root
pub fn deps_dir(install_dir: &Path) -> PathBuf {
    install_dir.join("bin").join("deps")
}
