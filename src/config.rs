//! Runtime configuration
//!
//! Command-line flags and the environment are folded into one
//! [`StatuslineConfig`] before anything is rendered. The environment is read
//! once, into an [`EnvSnapshot`], so the rest of the program never touches
//! process-wide state.

use ccline_core::error::{CclineError, Result};
use ccline_core::timezone::TimezoneConfig;
use ccline_terminal::DisplayMode;
use ccline_terminal::width::terminal_width;
use chrono::TimeDelta;
use std::path::{Path, PathBuf};
use tracing::debug;

use crate::cli::{LineSelection, RenderArgs};

pub const WINDOW_CACHE_TTL: TimeDelta = TimeDelta::seconds(30);
pub const USAGE_LIMITS_CACHE_TTL: TimeDelta = TimeDelta::seconds(300);
pub const SCHEDULE_CACHE_TTL: TimeDelta = TimeDelta::seconds(300);
pub const RECORD_LOOKBACK: TimeDelta = TimeDelta::hours(6);
pub const WINDOW_DURATION: TimeDelta = TimeDelta::hours(5);

/// The environment variables ccline looks at
#[derive(Debug, Clone, Default)]
pub struct EnvSnapshot {
    pub display_mode: Option<String>,
    pub statusline_mode: Option<String>,
    pub no_color: Option<String>,
    pub statusline_no_color: Option<String>,
    pub columns: Option<String>,
}

impl EnvSnapshot {
    pub fn from_env() -> Self {
        let var = |name: &str| std::env::var(name).ok();
        Self {
            display_mode: var("STATUSLINE_DISPLAY_MODE"),
            statusline_mode: var("STATUSLINE_MODE"),
            no_color: var("NO_COLOR"),
            statusline_no_color: var("STATUSLINE_NO_COLOR"),
            columns: var("COLUMNS"),
        }
    }

    pub fn color_disabled(&self) -> bool {
        [&self.no_color, &self.statusline_no_color]
            .into_iter()
            .any(|v| v.as_deref().is_some_and(|v| !v.is_empty()))
    }
}

/// Cache and lock files, all under the Claude data directory
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CachePaths {
    pub window_stats: PathBuf,
    pub usage_limits: PathBuf,
    pub usage_limits_lock: PathBuf,
    pub schedule: PathBuf,
    pub schedule_lock: PathBuf,
}

impl CachePaths {
    pub fn new(base: &Path) -> Self {
        Self {
            window_stats: base.join(".ccline_window_cache.json"),
            usage_limits: base.join(".ccline_usage_limits.json"),
            usage_limits_lock: base.join(".ccline_usage_limits.lock"),
            schedule: base.join(".schedule_cache.json"),
            schedule_lock: base.join(".schedule_cache.lock"),
        }
    }
}

/// Everything a render needs to know besides the stdin payload
#[derive(Debug, Clone)]
pub struct StatuslineConfig {
    pub claude_dir: PathBuf,
    pub lines: LineSelection,
    pub display_mode: DisplayMode,
    /// Usable columns
    pub width: usize,
    pub color: bool,
    pub schedule: bool,
    pub usage_limits: bool,
    pub timezone: TimezoneConfig,
    pub cache: CachePaths,
    pub window_cache_ttl: TimeDelta,
    pub usage_limits_ttl: TimeDelta,
    pub schedule_ttl: TimeDelta,
    pub lookback: TimeDelta,
    pub window_duration: TimeDelta,
}

impl StatuslineConfig {
    pub fn resolve(args: &RenderArgs, env: &EnvSnapshot) -> Result<Self> {
        let claude_dir = match &args.claude_dir {
            Some(dir) => dir.clone(),
            None => default_claude_dir()?,
        };
        let width = terminal_width(env.columns.as_deref());
        let display_mode = resolve_display_mode(args.display_mode, env, width);
        let timezone = TimezoneConfig::from_cli(args.timezone.as_deref(), args.utc)?;
        debug!(
            "Display mode {} at width {}, timezone {}",
            display_mode,
            width,
            timezone.display_name()
        );

        Ok(Self {
            cache: CachePaths::new(&claude_dir),
            claude_dir,
            lines: args.show.clone().unwrap_or_default(),
            display_mode,
            width,
            color: !args.no_color && !env.color_disabled(),
            schedule: args.schedule,
            usage_limits: args.usage_limits,
            timezone,
            window_cache_ttl: WINDOW_CACHE_TTL,
            usage_limits_ttl: USAGE_LIMITS_CACHE_TTL,
            schedule_ttl: SCHEDULE_CACHE_TTL,
            lookback: RECORD_LOOKBACK,
            window_duration: WINDOW_DURATION,
        })
    }

    /// `<claude_dir>/statusline-error.log`
    pub fn error_log_path(&self) -> PathBuf {
        self.claude_dir.join(crate::error_log::ERROR_LOG_FILE)
    }
}

pub fn default_claude_dir() -> Result<PathBuf> {
    dirs::home_dir()
        .map(|home| home.join(".claude"))
        .ok_or_else(|| CclineError::Config("could not determine home directory".to_string()))
}

/// `--display-mode`, then `STATUSLINE_DISPLAY_MODE`, then `STATUSLINE_MODE=single`, then width
fn resolve_display_mode(flag: Option<DisplayMode>, env: &EnvSnapshot, width: usize) -> DisplayMode {
    if let Some(mode) = flag {
        return mode;
    }
    if let Some(mode) = env.display_mode.as_deref() {
        match mode.parse() {
            Ok(mode) => return mode,
            Err(e) => debug!("Ignoring STATUSLINE_DISPLAY_MODE: {}", e),
        }
    }
    if env.statusline_mode.as_deref() == Some("single") {
        return DisplayMode::Tight;
    }
    DisplayMode::from_width(width)
}
