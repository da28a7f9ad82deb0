//! Install command - build the workspace and populate an install root

use crate::cli::args::InstallArgs;
use crate::config::Config;
use crate::disk::{format_bytes, DiskUsage};
use crate::error::{LedgerOpsError, LedgerOpsResult};
use crate::events::{Event, EventLog};
use crate::install::{resolve_install_dir, ArtifactOutcome, InstallObserver, Installer};
use crate::toolchain::{CargoToolchain, Toolchain};
use crate::ui::{self, BuildProgress, UiContext};
use std::path::Path;
use std::sync::Mutex;

/// Execute the install command
pub async fn execute(args: InstallArgs, config: &Config, workspace: &Path) -> LedgerOpsResult<()> {
    // Validated before anything touches the filesystem
    let install_dir = resolve_install_dir(args.destination.as_deref())?;

    let ctx = UiContext::detect();
    let event_log = EventLog::new(config);

    let toolchain = CargoToolchain::new();
    if !toolchain.is_available().await {
        return Err(LedgerOpsError::CliNotFound {
            name: toolchain.toolchain_name().to_string(),
            hint: "Install a Rust toolchain from https://rustup.rs".to_string(),
        });
    }

    ui::intro(&ctx, "Installing workspace");
    ui::key_value(&ctx, "Install location", &install_dir.display().to_string());
    if !args.features.is_empty() {
        ui::key_value(&ctx, "Features", &args.features);
    }

    let observer = CliObserver::new(&ctx);
    let installer = Installer::new(&toolchain, &config.install, workspace.to_path_buf());

    let summary = match installer.run(&install_dir, &args.features, &observer).await {
        Ok(summary) => summary,
        Err(e) => {
            observer.finish_build();
            ui::outro_error(&ctx, "Install failed");
            event_log
                .record(&Event::InstallFailed {
                    install_dir: &install_dir,
                    features: &args.features,
                    error: e.to_string(),
                    exit_code: e.exit_code(),
                })
                .await;
            return Err(e);
        }
    };

    ui::section(&ctx, "Step 4: Summary");
    print_usage(&summary.usage);
    println!("Done after {} seconds", summary.elapsed.as_secs());

    let failed = summary.failed_artifacts().count();
    if failed > 0 {
        ui::outro_success(
            &ctx,
            &format!("Install complete ({} native artifact(s) not copied)", failed),
        );
    } else {
        ui::outro_success(&ctx, "Install complete");
    }

    event_log
        .record(&Event::InstallCompleted {
            install_dir: &summary.install_dir,
            features: &args.features,
            binaries: &summary.binaries,
            artifacts_copied: summary.artifacts.len() - failed,
            artifacts_failed: failed,
            total_bytes: summary.usage.total_bytes,
            elapsed_secs: summary.elapsed.as_secs(),
        })
        .await;

    Ok(())
}

/// `du -a` style listing, then the total
fn print_usage(usage: &DiskUsage) {
    for entry in &usage.entries {
        println!("{}\t{}", format_bytes(entry.bytes), entry.path.display());
    }
    println!("Total: {}", format_bytes(usage.total_bytes));
}

/// Renders install progress on stderr
struct CliObserver {
    ctx: UiContext,
    build: Mutex<Option<BuildProgress>>,
}

impl CliObserver {
    fn new(ctx: &UiContext) -> Self {
        Self {
            ctx: ctx.clone(),
            build: Mutex::new(None),
        }
    }

    fn finish_build(&self) {
        if let Ok(mut build) = self.build.lock() {
            if let Some(progress) = build.take() {
                progress.finish();
            }
        }
    }
}

impl InstallObserver for CliObserver {
    fn build_started(&self) {
        ui::section(&self.ctx, "Step 1: Building workspace");
        if let Ok(mut build) = self.build.lock() {
            *build = Some(BuildProgress::new(&self.ctx, "Compiling"));
        }
    }

    fn output(&self, line: String) {
        match self.build.lock() {
            Ok(build) => match build.as_ref() {
                Some(progress) => progress.on_line(line),
                None => eprintln!("{}", line),
            },
            Err(_) => eprintln!("{}", line),
        }
    }

    fn build_finished(&self) {
        self.finish_build();
        ui::step_ok(&self.ctx, "Workspace built");
        ui::section(&self.ctx, "Step 2: Installing binaries");
    }

    fn binary_started(&self, name: &str) {
        ui::step_info(&self.ctx, &format!("Installing {}", name));
    }

    fn binary_installed(&self, name: &str) {
        ui::step_ok(&self.ctx, &format!("{} installed", name));
    }

    fn programs_started(&self) {
        ui::section(&self.ctx, "Step 3: Copying native programs");
    }

    fn artifact(&self, outcome: &ArtifactOutcome) {
        match outcome {
            ArtifactOutcome::Copied { file_name, bytes, .. } => ui::step_ok_detail(
                &self.ctx,
                &format!("Copied {}", file_name),
                &format_bytes(*bytes),
            ),
            ArtifactOutcome::Failed {
                file_name, reason, ..
            } => ui::step_error_detail(&self.ctx, &format!("Could not copy {}", file_name), reason),
        }
    }
}
