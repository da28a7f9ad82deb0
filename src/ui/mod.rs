//! UI module for consistent CLI output
//!
//! Uses `cliclack` for spinners and log lines in interactive terminals,
//! with automatic fallback to plain output in CI. Everything here writes to
//! stderr; stdout is reserved for machine-readable output such as the
//! cache hook's `export` lines.
//!
//! # Example
//!
//! ```rust,ignore
//! use ledgerops::ui::{self, UiContext, TaskSpinner};
//!
//! let ctx = UiContext::detect();
//!
//! ui::intro(&ctx, "Installing workspace");
//!
//! let mut spinner = TaskSpinner::new(&ctx);
//! spinner.start("Installing wallet...");
//! spinner.stop("wallet installed");
//!
//! ui::step_warn_hint(&ctx, "Secrets file missing", "Skipping decryption");
//! ui::outro_success(&ctx, "Install complete");
//! ```

mod context;
mod output;
mod progress;
mod theme;

pub use context::UiContext;
pub use output::{
    intro, key_value, outro_error, outro_success, section, step_error_detail, step_info, step_ok,
    step_ok_detail, step_warn_hint,
};
pub use progress::{BuildProgress, TaskSpinner};
pub use theme::{init_theme, LedgerOpsTheme};
