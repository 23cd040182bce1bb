//! ANSI colors
//!
//! All coloring goes through [`Palette::paint`] so that `--no-color` and
//! `NO_COLOR` are honored in one place.

use colored::{ColoredString, Colorize};

/// Named colors used by the statusline
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Tone {
    BrightCyan,
    BrightGreen,
    BrightYellow,
    BrightRed,
    BrightWhite,
    DimGreen,
    DimYellow,
    DimRed,
    Gray,
    /// Bold white on red, for values that need attention now
    Alert,
}

impl Tone {
    fn apply(self, text: &str) -> ColoredString {
        match self {
            Self::BrightCyan => text.bright_cyan().bold(),
            Self::BrightGreen => text.bright_green().bold(),
            Self::BrightYellow => text.bright_yellow().bold(),
            Self::BrightRed => text.bright_red().bold(),
            Self::BrightWhite => text.bright_white().bold(),
            Self::DimGreen => text.green(),
            Self::DimYellow => text.yellow(),
            Self::DimRed => text.red(),
            Self::Gray => text.bright_black(),
            Self::Alert => text.bright_white().on_red().bold(),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Palette {
    enabled: bool,
}

impl Palette {
    pub fn new(enabled: bool) -> Self {
        Self { enabled }
    }

    /// Palette that never emits escape codes
    pub fn plain() -> Self {
        Self { enabled: false }
    }

    pub fn enabled(&self) -> bool {
        self.enabled
    }

    pub fn paint(&self, text: &str, tone: Tone) -> String {
        if self.enabled && !text.is_empty() {
            tone.apply(text).to_string()
        } else {
            text.to_string()
        }
    }
}
