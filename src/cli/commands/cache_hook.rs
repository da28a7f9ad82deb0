//! Cache-hook command - CI pre-command hook

use crate::cache::{CacheCheck, CacheHook, HookOutcome, JobLabel, PreparedHook, SecretsStatus};
use crate::cli::args::CacheHookArgs;
use crate::config::Config;
use crate::disk::format_bytes;
use crate::error::{LedgerOpsError, LedgerOpsResult};
use crate::events::{Event, EventLog};
use crate::secrets::{Ejson2Env, SecretsProvider};
use crate::ui::{self, TaskSpinner, UiContext};
use std::path::Path;
use tokio::fs;
use tracing::debug;

/// Execute the cache-hook command
///
/// Only `export` lines are written to stdout.
pub async fn execute(args: CacheHookArgs, config: &Config, workspace: &Path) -> LedgerOpsResult<()> {
    let ctx = UiContext::detect();

    let raw_label = match args.label {
        Some(label) => label,
        None => {
            debug!("Reading job label from ${}", config.cache.label_env);
            std::env::var(&config.cache.label_env).unwrap_or_default()
        }
    };
    let label = JobLabel::parse(&raw_label)?;

    let decryptor = Ejson2Env::new(config.secrets.decryptor.clone());
    let provider: Option<&dyn SecretsProvider> = if args.no_secrets {
        None
    } else {
        Some(&decryptor)
    };

    let hook = CacheHook::new(config, workspace.to_path_buf(), provider);

    let prepared = hook.prepare(&label).await?;
    report_prepared(&ctx, config, &prepared);

    let mut spinner = TaskSpinner::new(&ctx);
    spinner.start(&format!("Syncing build cache for {}", label));
    let outcome = match hook.sync(prepared).await {
        Ok(outcome) => outcome,
        Err(e) => {
            spinner.stop_error("Cache sync failed");
            return Err(e);
        }
    };
    spinner.stop(&format!("Build cache ready for {}", label));

    report_outcome(&ctx, config, &outcome);
    record_events(config, &label, &outcome).await;

    let exports = outcome.env.render_exports();
    if let Some(path) = args.env_file {
        fs::write(&path, &exports)
            .await
            .map_err(|e| LedgerOpsError::io(format!("writing env file {}", path.display()), e))?;
        debug!("Wrote {} variables to {}", outcome.env.iter().count(), path.display());
    }
    print!("{}", exports);

    Ok(())
}

/// Secrets result and cache size, shown before anything is evicted
fn report_prepared(ctx: &UiContext, config: &Config, prepared: &PreparedHook) {
    match prepared.secrets {
        SecretsStatus::Decrypted(count) => {
            ui::step_ok(ctx, &format!("Decrypted {} secret(s)", count))
        }
        SecretsStatus::BundleMissing => ui::step_warn_hint(
            ctx,
            &format!("No secrets bundle at {}", config.secrets.file.display()),
            "Skipping decryption",
        ),
        SecretsStatus::Disabled => {}
    }

    ui::key_value(ctx, "Cache", &prepared.cache_dir.display().to_string());
    match prepared.measured {
        Some(bytes) => ui::key_value(ctx, "Cache size", &format_bytes(bytes)),
        None => ui::step_info(ctx, "No cache yet, starting empty"),
    }
}

fn report_outcome(ctx: &UiContext, config: &Config, outcome: &HookOutcome) {
    match outcome.check {
        CacheCheck::Missing => {}
        CacheCheck::Kept { bytes } => ui::step_ok_detail(ctx, "Cache reused", &format_bytes(bytes)),
        CacheCheck::Evicted { bytes } => ui::step_warn_hint(
            ctx,
            &format!("Cache evicted at {}", format_bytes(bytes)),
            &format!("Limit is {} GB", config.cache.max_size_gb),
        ),
    }

    let stats = &outcome.mirror;
    ui::step_ok_detail(
        ctx,
        "target/ synced",
        &format!(
            "{} linked, {} copied, {} unchanged, {} removed",
            stats.linked, stats.copied, stats.unchanged, stats.removed
        ),
    );
}

async fn record_events(config: &Config, label: &JobLabel, outcome: &HookOutcome) {
    let event_log = EventLog::new(config);

    if let CacheCheck::Evicted { bytes } = outcome.check {
        event_log
            .record(&Event::CacheEvicted {
                label: label.as_str(),
                cache_dir: &outcome.cache_dir,
                bytes,
                max_size_gb: config.cache.max_size_gb,
            })
            .await;
    }

    event_log
        .record(&Event::CacheSynced {
            label: label.as_str(),
            cache_dir: &outcome.cache_dir,
            stats: outcome.mirror,
        })
        .await;
}
