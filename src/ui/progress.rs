//! Progress indicators with CI fallback

use super::context::UiContext;
use console::style;
use indicatif::{ProgressBar, ProgressStyle};

/// A task spinner with CI fallback
pub struct TaskSpinner {
    spinner: Option<cliclack::ProgressBar>,
    interactive: bool,
}

impl TaskSpinner {
    /// Create a new spinner (shows on `start` in interactive mode)
    pub fn new(ctx: &UiContext) -> Self {
        Self {
            spinner: None,
            interactive: ctx.use_fancy_output(),
        }
    }

    /// Start the spinner with a message
    pub fn start(&mut self, message: &str) {
        if self.interactive {
            let spinner = cliclack::spinner();
            spinner.start(message);
            self.spinner = Some(spinner);
        } else {
            eprintln!("{} {}", style("...").dim(), message);
        }
    }

    /// Stop with success message
    pub fn stop(&mut self, message: &str) {
        if let Some(spinner) = self.spinner.take() {
            spinner.stop(message);
        } else {
            eprintln!("{} {}", style("[OK]").green(), message);
        }
    }

    /// Stop with error message
    pub fn stop_error(&mut self, message: &str) {
        if let Some(spinner) = self.spinner.take() {
            spinner.error(message);
        } else {
            eprintln!("{} {}", style("[FAIL]").red(), message);
        }
    }
}

/// Progress indicator for `cargo build`.
///
/// Counts `Compiling <crate>` lines on an indicatif spinner in interactive
/// mode. In CI every line is echoed to stderr so the build log stays intact.
pub struct BuildProgress {
    bar: Option<ProgressBar>,
}

impl BuildProgress {
    /// Create a new build progress indicator.
    pub fn new(ctx: &UiContext, label: &str) -> Self {
        let bar = if ctx.use_fancy_output() {
            let bar = ProgressBar::new_spinner();
            if let Ok(progress_style) = ProgressStyle::default_spinner()
                .template("  {spinner:.green} {prefix} {pos} crates {msg:.dim}  {elapsed:.dim}")
            {
                bar.set_style(progress_style.tick_chars("⠋⠙⠹⠸⠼⠴⠦⠧⠇⠏ "));
            }
            bar.set_prefix(label.to_string());
            bar.enable_steady_tick(std::time::Duration::from_millis(120));
            Some(bar)
        } else {
            eprintln!("{}...", label);
            None
        };
        Self { bar }
    }

    /// Process a line of cargo output.
    pub fn on_line(&self, line: String) {
        let Some(ref bar) = self.bar else {
            eprintln!("{}", line);
            return;
        };

        if let Some(krate) = parse_compiling_line(&line) {
            bar.inc(1);
            bar.set_message(krate.to_string());
        } else if is_diagnostic(&line) {
            bar.suspend(|| eprintln!("{}", line));
        }
    }

    /// Finish and clear the progress indicator.
    pub fn finish(&self) {
        if let Some(ref bar) = self.bar {
            bar.disable_steady_tick();
            bar.finish_and_clear();
        }
    }
}

/// Lines worth showing above the spinner
fn is_diagnostic(line: &str) -> bool {
    let trimmed = line.trim_start();
    trimmed.starts_with("error") || trimmed.starts_with("warning: unused")
}

/// Parse a cargo progress line like `   Compiling serde v1.0.210`
fn parse_compiling_line(line: &str) -> Option<&str> {
    let rest = line.trim_start().strip_prefix("Compiling ")?;
    rest.split_whitespace().next()
}
