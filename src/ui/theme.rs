//! Custom theme for cliclack output

use cliclack::ThemeState;
use console::Style;

/// Green-on-dim theme used for installer and hook output
#[derive(Debug, Clone, Default)]
pub struct LedgerOpsTheme;

impl cliclack::Theme for LedgerOpsTheme {
    fn bar_color(&self, state: &ThemeState) -> Style {
        match state {
            ThemeState::Active => Style::new().green(),
            ThemeState::Error(_) => Style::new().red(),
            ThemeState::Cancel => Style::new().dim(),
            ThemeState::Submit => Style::new().green().dim(),
        }
    }

    fn state_symbol_color(&self, state: &ThemeState) -> Style {
        match state {
            ThemeState::Active => Style::new().green(),
            ThemeState::Error(_) => Style::new().red(),
            ThemeState::Cancel => Style::new().dim(),
            ThemeState::Submit => Style::new().green().bold(),
        }
    }
}

/// Initialize the global theme
pub fn init_theme() {
    cliclack::set_theme(LedgerOpsTheme);
}
