//! Display width and layout mode
//!
//! Widths are measured in terminal cells: ANSI sequences count as zero,
//! East Asian wide characters and most emoji count as two.

use std::fmt;
use std::str::FromStr;
use tracing::debug;

const FULL_MIN_WIDTH: usize = 68;
const COMPACT_MIN_WIDTH: usize = 35;
const FALLBACK_WIDTH: usize = 80;

pub fn strip_ansi(text: &str) -> String {
    console::strip_ansi_codes(text).into_owned()
}

pub fn display_width(text: &str) -> usize {
    console::measure_text_width(text)
}

/// Cut `text` to `max_len` characters, ending with `...` when cut
pub fn truncate_text(text: &str, max_len: usize) -> String {
    if text.chars().count() <= max_len {
        return text.to_string();
    }
    if max_len <= 3 {
        return text.chars().take(max_len).collect();
    }
    let mut out: String = text.chars().take(max_len - 3).collect();
    out.push_str("...");
    out
}

/// Cut `text` to at most `available` cells, ending with `…` when cut
pub fn truncate_to_width(text: &str, available: usize) -> String {
    if display_width(text) <= available || available <= 3 {
        return text.to_string();
    }
    let mut out = String::new();
    let mut used = 0;
    let mut buf = [0u8; 4];
    for ch in text.chars() {
        let cell = display_width(ch.encode_utf8(&mut buf));
        if used + cell + 1 > available {
            break;
        }
        out.push(ch);
        used += cell;
    }
    out.push('…');
    out
}

/// Usable width: `COLUMNS` when set, else the terminal size, minus one
///
/// The last column is left free because some terminals wrap when it is
/// written.
pub fn terminal_width(columns_env: Option<&str>) -> usize {
    if let Some(columns) = columns_env.and_then(|c| c.trim().parse::<usize>().ok()) {
        return columns.saturating_sub(1);
    }
    if let Some((terminal_size::Width(w), _)) = terminal_size::terminal_size() {
        return usize::from(w).saturating_sub(1);
    }
    debug!("Terminal width unknown, using {}", FALLBACK_WIDTH);
    FALLBACK_WIDTH
}

/// How much detail fits on a line
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DisplayMode {
    Full,
    Compact,
    Tight,
}

impl DisplayMode {
    pub fn from_width(width: usize) -> Self {
        if width >= FULL_MIN_WIDTH {
            Self::Full
        } else if width >= COMPACT_MIN_WIDTH {
            Self::Compact
        } else {
            Self::Tight
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Full => "full",
            Self::Compact => "compact",
            Self::Tight => "tight",
        }
    }
}

impl FromStr for DisplayMode {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "full" => Ok(Self::Full),
            "compact" => Ok(Self::Compact),
            "tight" => Ok(Self::Tight),
            other => Err(format!(
                "invalid display mode '{other}', expected full, compact or tight"
            )),
        }
    }
}

impl fmt::Display for DisplayMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}
