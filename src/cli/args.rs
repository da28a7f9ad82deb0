//! CLI argument definitions using clap derive

use clap::builder::{OsStringValueParser, TypedValueParser};
use clap::{ArgAction, Parser, Subcommand, ValueEnum};
use clap_complete::Shell;
use std::path::PathBuf;

/// ledgerops - workspace installer and CI build-cache hook
///
/// Builds a ledger node workspace and installs its binaries and native
/// program modules, or prepares a CI agent's per-label build cache.
#[derive(Parser, Debug)]
#[command(name = "ledgerops")]
#[command(author, version, about, long_about = None)]
#[command(propagate_version = true)]
pub struct Cli {
    /// Subcommand to execute
    #[command(subcommand)]
    pub command: Commands,

    /// Increase verbosity (-v info, -vv debug)
    #[arg(short, long, global = true, action = ArgAction::Count)]
    pub verbose: u8,

    /// Configuration file path
    #[arg(short, long, global = true, env = "LEDGEROPS_CONFIG")]
    pub config: Option<PathBuf>,

    /// Skip local .ledgerops.toml discovery
    #[arg(long, global = true)]
    pub no_local: bool,

    /// Workspace root (defaults to current directory)
    #[arg(short = 'C', long, global = true)]
    pub workspace: Option<PathBuf>,

    /// Log line format on stderr
    #[arg(long, global = true, default_value = "text")]
    pub log_format: LogFormat,
}

/// Available commands
#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Build the workspace and install binaries and native programs into DEST
    ///
    /// Assumes exclusive use of DEST while it runs.
    Install(InstallArgs),

    /// CI pre-command hook: decrypt secrets and restore the label's build cache
    ///
    /// Prints `export` lines on stdout; use as `eval "$(ledgerops cache-hook)"`.
    /// Assumes one hook run per label at a time.
    CacheHook(CacheHookArgs),

    /// Show or initialize configuration
    Config(ConfigArgs),

    /// Print shell completions
    Completions {
        /// Target shell
        shell: Shell,
    },
}

/// Arguments for the install command
#[derive(Parser, Debug)]
pub struct InstallArgs {
    /// Install root; binaries land in DEST/bin
    ///
    /// Parsed without clap's empty-value check so an empty DEST reaches the
    /// install command's own usage error.
    #[arg(value_parser = OsStringValueParser::new().map(PathBuf::from))]
    pub destination: Option<PathBuf>,

    /// Cargo feature list forwarded to every build and install
    #[arg(default_value = "")]
    pub features: String,
}

/// Arguments for the cache-hook command
#[derive(Parser, Debug)]
pub struct CacheHookArgs {
    /// Job label keying the cache (default: from the configured label variable)
    #[arg(short, long)]
    pub label: Option<String>,

    /// Skip secrets decryption
    #[arg(long)]
    pub no_secrets: bool,

    /// Also write the export lines to this file
    #[arg(long)]
    pub env_file: Option<PathBuf>,
}

/// Arguments for the config command
#[derive(Parser, Debug)]
pub struct ConfigArgs {
    /// Subcommand for config
    #[command(subcommand)]
    pub action: Option<ConfigAction>,
}

/// Config subcommands
#[derive(Subcommand, Debug)]
pub enum ConfigAction {
    /// Show current configuration
    Show,

    /// Show configuration file path
    Path,

    /// Initialize default configuration
    Init {
        /// Overwrite existing configuration
        #[arg(short, long)]
        force: bool,
    },
}

/// Log line format
#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum LogFormat {
    /// Human-readable lines
    Text,
    /// One JSON object per line
    Json,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn cli_parses_install() {
        let cli = Cli::parse_from(["ledgerops", "install", "/opt/ledger", "cuda,erasure"]);
        match cli.command {
            Commands::Install(args) => {
                assert_eq!(args.destination, Some(PathBuf::from("/opt/ledger")));
                assert_eq!(args.features, "cuda,erasure");
            }
            _ => panic!("expected Install command"),
        }
    }

    #[test]
    fn cli_install_defaults() {
        let cli = Cli::parse_from(["ledgerops", "install"]);
        match cli.command {
            Commands::Install(args) => {
                assert!(args.destination.is_none());
                assert_eq!(args.features, "");
            }
            _ => panic!("expected Install command"),
        }
    }

    #[test]
    fn cli_install_accepts_empty_destination() {
        let cli = Cli::try_parse_from(["ledgerops", "install", ""]).unwrap();
        match cli.command {
            Commands::Install(args) => assert_eq!(args.destination, Some(PathBuf::new())),
            _ => panic!("expected Install command"),
        }
    }

    #[test]
    fn cli_parses_cache_hook() {
        let cli = Cli::parse_from([
            "ledgerops",
            "cache-hook",
            "--label",
            ":rust: stable",
            "--no-secrets",
            "--env-file",
            "/tmp/env",
        ]);
        match cli.command {
            Commands::CacheHook(args) => {
                assert_eq!(args.label.as_deref(), Some(":rust: stable"));
                assert!(args.no_secrets);
                assert_eq!(args.env_file, Some(PathBuf::from("/tmp/env")));
            }
            _ => panic!("expected CacheHook command"),
        }
    }

    #[test]
    fn cli_parses_config_init_force() {
        let cli = Cli::parse_from(["ledgerops", "config", "init", "--force"]);
        match cli.command {
            Commands::Config(ConfigArgs {
                action: Some(ConfigAction::Init { force }),
            }) => assert!(force),
            _ => panic!("expected Config Init command"),
        }
    }

    #[test]
    fn cli_parses_completions() {
        let cli = Cli::parse_from(["ledgerops", "completions", "bash"]);
        assert!(matches!(
            cli.command,
            Commands::Completions { shell: Shell::Bash }
        ));
    }

    #[test]
    fn cli_global_flags() {
        let cli = Cli::parse_from([
            "ledgerops",
            "--no-local",
            "-C",
            "/src/ledger",
            "--log-format",
            "json",
            "config",
        ]);
        assert!(cli.no_local);
        assert_eq!(cli.workspace, Some(PathBuf::from("/src/ledger")));
        assert_eq!(cli.log_format, LogFormat::Json);
    }

    #[test]
    fn cli_verbose_levels() {
        let cli = Cli::parse_from(["ledgerops", "config"]);
        assert_eq!(cli.verbose, 0);

        let cli = Cli::parse_from(["ledgerops", "-v", "config"]);
        assert_eq!(cli.verbose, 1);

        let cli = Cli::parse_from(["ledgerops", "-vv", "config"]);
        assert_eq!(cli.verbose, 2);
    }
}
