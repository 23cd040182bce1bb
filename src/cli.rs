//! CLI interface for ccline
//!
//! Without a subcommand, ccline reads the Claude Code statusline payload from
//! stdin and prints up to four status lines. The `install` subcommand wires
//! ccline into Claude Code's `settings.json`.
//!
//! # Example
//!
//! ```bash
//! # What Claude Code runs on every refresh
//! echo '{"session_id":"abc","model":{"display_name":"Opus 4.6"}}' | ccline
//!
//! # Only the context and session lines
//! ccline --show simple
//!
//! # Register ccline as the statusline command
//! ccline install --show 1,2,3
//! ```

use ccline_terminal::DisplayMode;
use clap::{Args, Parser, Subcommand};
use std::collections::BTreeSet;
use std::fmt;
use std::path::PathBuf;
use std::str::FromStr;

const SHOW_FORMAT_ERROR: &str = "Invalid --show format. Use: 1,2,3,4, simple, or all";

/// Multi-line statusline for Claude Code
#[derive(Parser, Debug, Clone)]
#[command(name = "ccline")]
#[command(version, about, long_about = None)]
pub struct Cli {
    #[command(flatten)]
    pub render: RenderArgs,

    #[command(subcommand)]
    pub command: Option<Command>,
}

/// Options that shape the rendered lines
#[derive(Args, Debug, Clone, Default)]
pub struct RenderArgs {
    /// Lines to print: comma-separated numbers 1-4, `simple` (2,3) or `all`
    #[arg(long, value_parser = parse_line_selection)]
    pub show: Option<LineSelection>,

    /// Force a layout instead of choosing one from the terminal width
    #[arg(long, value_parser = parse_display_mode)]
    pub display_mode: Option<DisplayMode>,

    /// Disable colored output
    #[arg(long)]
    pub no_color: bool,

    /// Alternate line 1 with the next calendar event (needs `gog`)
    #[arg(long)]
    pub schedule: bool,

    /// Show five-hour and seven-day plan utilization from the Anthropic API
    #[arg(long)]
    pub usage_limits: bool,

    /// Claude data directory (default: ~/.claude)
    #[arg(long, env = "CLAUDE_CONFIG_DIR")]
    pub claude_dir: Option<PathBuf>,

    /// Timezone for displayed times (e.g. "America/New_York", "Asia/Tokyo")
    /// If not specified, uses the system's local timezone
    #[arg(long, short = 'z')]
    pub timezone: Option<String>,

    /// Show times in UTC (overrides --timezone)
    #[arg(long)]
    pub utc: bool,
}

#[derive(Subcommand, Debug, Clone)]
pub enum Command {
    /// Register ccline as the Claude Code statusline command
    Install {
        /// Settings file to update (default: <claude_dir>/settings.json)
        #[arg(long)]
        settings: Option<PathBuf>,

        /// Line selection baked into the installed command
        #[arg(long, value_parser = parse_line_selection)]
        show: Option<LineSelection>,

        /// Print the resulting settings instead of writing them
        #[arg(long)]
        dry_run: bool,
    },
}

/// Which of the four status lines to print
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LineSelection(BTreeSet<u8>);

impl LineSelection {
    pub fn all() -> Self {
        Self((1..=4).collect())
    }

    /// Context and session lines only
    pub fn simple() -> Self {
        Self([2, 3].into_iter().collect())
    }

    pub fn contains(&self, line: u8) -> bool {
        self.0.contains(&line)
    }

    pub fn is_all(&self) -> bool {
        self.0.len() == 4
    }
}

impl Default for LineSelection {
    fn default() -> Self {
        Self::all()
    }
}

impl FromStr for LineSelection {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "all" => return Ok(Self::all()),
            "simple" => return Ok(Self::simple()),
            _ => {}
        }

        let mut lines = BTreeSet::new();
        for part in s.split(',') {
            let line: u8 = part
                .trim()
                .parse()
                .map_err(|_| SHOW_FORMAT_ERROR.to_string())?;
            if !(1..=4).contains(&line) {
                return Err(SHOW_FORMAT_ERROR.to_string());
            }
            lines.insert(line);
        }
        Ok(Self(lines))
    }
}

/// Canonical `--show` argument: `all`, `simple` or the line numbers
impl fmt::Display for LineSelection {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.is_all() {
            return f.write_str("all");
        }
        if *self == Self::simple() {
            return f.write_str("simple");
        }
        let numbers: Vec<String> = self.0.iter().map(u8::to_string).collect();
        f.write_str(&numbers.join(","))
    }
}

pub fn parse_line_selection(value: &str) -> Result<LineSelection, String> {
    value.parse()
}

pub fn parse_display_mode(value: &str) -> Result<DisplayMode, String> {
    value.parse()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_cli_parsing() {
        let cli = Cli::parse_from(["ccline"]);
        assert!(cli.command.is_none());
        assert!(cli.render.show.is_none());
        assert!(!cli.render.no_color);

        let cli = Cli::parse_from(["ccline", "--show", "simple", "--no-color", "--schedule"]);
        assert_eq!(cli.render.show, Some(LineSelection::simple()));
        assert!(cli.render.no_color);
        assert!(cli.render.schedule);
    }

    #[test]
    fn test_display_mode_flag() {
        let cli = Cli::parse_from(["ccline", "--display-mode", "tight"]);
        assert_eq!(cli.render.display_mode, Some(DisplayMode::Tight));
        assert!(Cli::try_parse_from(["ccline", "--display-mode", "wide"]).is_err());
    }

    #[test]
    fn test_install_subcommand() {
        let cli = Cli::parse_from(["ccline", "install", "--show", "1,3", "--dry-run"]);
        match cli.command {
            Some(Command::Install { show, dry_run, settings }) => {
                assert_eq!(show.map(|s| s.to_string()), Some("1,3".to_string()));
                assert!(dry_run);
                assert!(settings.is_none());
            }
            _ => panic!("Expected Install command"),
        }
    }

    #[test]
    fn test_line_selection_parsing() {
        assert_eq!("all".parse::<LineSelection>(), Ok(LineSelection::all()));
        assert_eq!("SIMPLE".parse::<LineSelection>(), Ok(LineSelection::simple()));

        let lines: LineSelection = "3, 1".parse().unwrap();
        assert!(lines.contains(1));
        assert!(!lines.contains(2));
        assert!(lines.contains(3));
        assert_eq!(lines.to_string(), "1,3");
        assert_eq!("2,3".parse::<LineSelection>().unwrap().to_string(), "simple");
        assert_eq!("4,3,2,1".parse::<LineSelection>().unwrap().to_string(), "all");
    }

    #[test]
    fn test_line_selection_rejects_invalid() {
        for bad in ["0", "5", "1,,2", "one", ""] {
            assert_eq!(
                bad.parse::<LineSelection>(),
                Err(SHOW_FORMAT_ERROR.to_string()),
                "{bad:?} should be rejected"
            );
        }
    }
}
