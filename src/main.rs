//! ledgerops - workspace installer and CI build-cache hook
//!
//! CLI entry point that dispatches to subcommands.

use clap::Parser;
use console::style;
use ledgerops::cli::{Cli, Commands, LogFormat};
use ledgerops::config::ConfigManager;
use ledgerops::error::{LedgerOpsError, LedgerOpsResult};
use std::path::{Path, PathBuf};
use std::process::ExitCode;
use tracing::debug;
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() -> ExitCode {
    match run().await {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            eprintln!("{} {}", style("Error:").red().bold(), e);
            if let Some(hint) = e.hint() {
                eprintln!("{} {}", style("Hint:").yellow(), hint);
            }
            ExitCode::from(e.exit_code())
        }
    }
}

async fn run() -> LedgerOpsResult<()> {
    let cli = Cli::parse();

    init_logging(cli.verbose, cli.log_format);
    ledgerops::ui::init_theme();

    // Completions don't need config loading
    if let Commands::Completions { shell } = cli.command {
        ledgerops::cli::commands::completions(shell);
        return Ok(());
    }

    let workspace = resolve_workspace(cli.workspace.as_deref())?;
    debug!("Workspace: {}", workspace.display());

    let config_manager = if let Some(ref path) = cli.config {
        ConfigManager::with_path(path.clone())
    } else {
        ConfigManager::new()
    };

    // Find local config unless --no-local is set
    let local_config_path = if cli.no_local {
        debug!("Local config discovery disabled (--no-local)");
        None
    } else {
        let found = ConfigManager::find_local_config(&workspace);
        if let Some(ref path) = found {
            debug!("Found local config: {}", path.display());
        }
        found
    };

    let config = config_manager
        .load_merged(local_config_path.as_deref())
        .await?;

    match cli.command {
        Commands::Completions { .. } => Ok(()),
        Commands::Install(args) => {
            ledgerops::cli::commands::install(args, &config, &workspace).await
        }
        Commands::CacheHook(args) => {
            ledgerops::cli::commands::cache_hook(args, &config, &workspace).await
        }
        Commands::Config(args) => {
            ledgerops::cli::commands::config(args, &config, &config_manager).await
        }
    }
}

/// Logging goes to stderr: 0 = warn, 1 = info, 2+ = debug
fn init_logging(verbose: u8, format: LogFormat) {
    let filter = match verbose {
        0 => EnvFilter::new("ledgerops=warn"),
        1 => EnvFilter::new("ledgerops=info"),
        _ => EnvFilter::new("ledgerops=debug"),
    };

    let builder = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_target(false);

    match format {
        LogFormat::Text => builder.without_time().init(),
        LogFormat::Json => builder.json().init(),
    }
}

fn resolve_workspace(requested: Option<&Path>) -> LedgerOpsResult<PathBuf> {
    let path = match requested {
        Some(path) => path.to_path_buf(),
        None => std::env::current_dir()
            .map_err(|e| LedgerOpsError::io("getting current directory", e))?,
    };

    if !path.is_dir() {
        return Err(LedgerOpsError::PathNotFound(path));
    }
    path.canonicalize()
        .map_err(|e| LedgerOpsError::io(format!("resolving workspace {}", path.display()), e))
}
