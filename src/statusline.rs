//! Statusline generation for Claude Code
//!
//! Claude Code pipes a JSON description of the session to the command on
//! every refresh. [`collect`] turns that payload into a [`RenderContext`] by
//! asking the usage service, git, the calendar and the usage API, and
//! [`Renderer`] lays the context out in one of three display modes.
//!
//! Full mode (68 columns and up):
//!
//! ```text
//! [Sonnet 4.5] | 🌿 main M2 | 📁 ccline | 💬 254 | 💰 $1.23
//! Compact: ████████▒▒▒▒▒▒▒▒▒▒▒▒ [41%] 82.0K/200.0K ♻️ 97% cached
//! Session: █████▒▒▒▒▒▒▒▒▒▒▒▒▒▒▒ [25%] 1h15m/5h 09:15 (08:00 to 13:00)
//! Burn:    ▁▂▃▄▅▆▇█▇▆▅▄▃▂▁▁▁▁▁▁ 14.0M token(w/cache), Rate: 187K t/m
//! ```

use anyhow::Context;
use ccline_core::aggregation::WindowStatistics;
use ccline_core::timezone::TimezoneConfig;
use ccline_core::types::{ConversationUsage, SessionId};
use ccline_core::window::WindowDetector;
use ccline_pricing::CostCalculator;
use ccline_provider_claude::DataLoader;
use ccline_terminal::{
    DisplayMode, Palette, Tone, display_width, format_cost, format_duration, format_token_count,
    format_token_count_short, percentage_tone, progress_bar, shorten_model_name, sparkline,
    truncate_text,
};
use chrono::{DateTime, Utc};
use serde::Deserialize;
use std::path::{Path, PathBuf};
use std::time::Duration;
use tokio::io::{self, AsyncReadExt};
use tokio::time::timeout;
use tracing::debug;

use crate::cli::LineSelection;
use crate::config::StatuslineConfig;
use crate::git::GitInfo;
use crate::schedule::{Schedule, UpcomingEvent, format_schedule_line, is_schedule_turn};
use crate::session::UsageService;
use crate::usage_api::{UsageLimit, UsageLimits, UsageLimitsProbe};

const READ_TIMEOUT: Duration = Duration::from_secs(5);
const DEFAULT_CONTEXT_WINDOW: u64 = 200_000;
const CONTEXT_ALERT_PERCENT: u64 = 85;
const CACHE_RATIO_SHOWN_FROM: f64 = 50.0;
const EXPENSIVE_SESSION_USD: f64 = 10.0;
const FULL_BAR_WIDTH: usize = 20;
const COMPACT_BAR_WIDTH: usize = 12;
const TIGHT_BAR_WIDTH: usize = 8;

/// Payload Claude Code writes to stdin; every field is optional
#[derive(Debug, Default, Deserialize)]
pub struct StatuslineInput {
    #[serde(default)]
    pub session_id: Option<String>,
    #[serde(default)]
    pub transcript_path: Option<PathBuf>,
    #[serde(default)]
    pub cwd: Option<String>,
    #[serde(default)]
    pub model: Option<ModelInfo>,
    #[serde(default)]
    pub workspace: Option<WorkspaceInfo>,
    #[serde(default)]
    pub cost: Option<CostInfo>,
    #[serde(default)]
    pub context_window: Option<ContextWindowInfo>,
}

#[derive(Debug, Default, Deserialize)]
pub struct ModelInfo {
    #[serde(default)]
    pub id: Option<String>,
    #[serde(default)]
    pub display_name: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
pub struct WorkspaceInfo {
    #[serde(default)]
    pub current_dir: Option<String>,
    #[serde(default)]
    pub active_files: Option<Vec<serde_json::Value>>,
}

#[derive(Debug, Default, Deserialize)]
pub struct CostInfo {
    #[serde(default)]
    pub total_cost_usd: Option<f64>,
    #[serde(default)]
    pub total_lines_added: Option<u64>,
    #[serde(default)]
    pub total_lines_removed: Option<u64>,
}

#[derive(Debug, Default, Deserialize)]
pub struct ContextWindowInfo {
    #[serde(default)]
    pub context_window_size: Option<u64>,
    /// Reported by newer Claude Code versions
    #[serde(default)]
    pub used_percentage: Option<f64>,
}

impl StatuslineInput {
    pub fn parse(payload: &str) -> anyhow::Result<Self> {
        serde_json::from_str(payload).context("statusline payload is not valid JSON")
    }

    pub fn session_id(&self) -> Option<SessionId> {
        self.session_id
            .as_deref()
            .filter(|id| !id.is_empty())
            .map(SessionId::new)
    }

    pub fn model_name(&self) -> &str {
        self.model
            .as_ref()
            .and_then(|m| m.display_name.as_deref())
            .unwrap_or("Unknown")
    }

    pub fn model_id(&self) -> Option<&str> {
        self.model.as_ref().and_then(|m| m.id.as_deref())
    }

    /// `workspace.current_dir`, then `cwd`, then `.`
    pub fn working_dir(&self) -> &str {
        self.workspace
            .as_ref()
            .and_then(|w| w.current_dir.as_deref())
            .or(self.cwd.as_deref())
            .unwrap_or(".")
    }
}

/// Context-window figures for line 2
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ContextMetrics {
    pub tokens: u64,
    pub window_size: u64,
    /// 0-100
    pub percentage: u64,
    pub cache_ratio: f64,
}

impl ContextMetrics {
    pub fn compute(usage: &ConversationUsage, window_size: Option<u64>, used_percentage: Option<f64>) -> Self {
        let tokens = usage.total_tokens();
        let window_size = window_size.filter(|s| *s > 0).unwrap_or(DEFAULT_CONTEXT_WINDOW);
        let percentage = match used_percentage {
            Some(pct) => pct.round().clamp(0.0, 100.0) as u64,
            None => (tokens as f64 / window_size as f64 * 100.0).round().min(100.0) as u64,
        };

        let counts = &usage.tokens;
        let (cache_read, cache_write) = (counts.cache_read_tokens, counts.cache_creation_tokens);
        let cache_ratio = if cache_read > 0 || cache_write > 0 {
            let fresh = counts.input_tokens + counts.output_tokens;
            cache_read as f64 / (fresh + cache_read + cache_write) as f64 * 100.0
        } else {
            0.0
        };

        Self {
            tokens,
            window_size,
            percentage,
            cache_ratio,
        }
    }
}

/// Reported cost when Claude Code provides one, else an estimate
pub fn session_cost(input: &StatuslineInput, usage: &ConversationUsage) -> f64 {
    match input.cost.as_ref().and_then(|c| c.total_cost_usd) {
        Some(cost) if cost > 0.0 => cost,
        _ => CostCalculator::calculate(&usage.tokens, Some(input.model_name()), input.model_id()),
    }
}

/// Everything the renderer shows, gathered up front
#[derive(Debug, Clone)]
pub struct RenderContext {
    pub model: String,
    pub git: GitInfo,
    pub dir_name: String,
    pub active_files: usize,
    pub messages: u64,
    pub lines_added: u64,
    pub lines_removed: u64,
    pub errors: u64,
    pub session_cost: f64,
    pub context: ContextMetrics,
    pub window: Option<WindowStatistics>,
    pub usage_limits: Option<UsageLimits>,
    pub event: Option<UpcomingEvent>,
    pub now: DateTime<Utc>,
}

/// Query every data source the configured lines need
pub async fn collect(config: &StatuslineConfig, input: &StatuslineInput, now: DateTime<Utc>) -> RenderContext {
    let session_id = input.session_id();
    let working_dir = PathBuf::from(input.working_dir());
    let full = config.display_mode == DisplayMode::Full;

    let service = UsageService::new(
        DataLoader::new(config.claude_dir.clone()),
        config.cache.window_stats.clone(),
        config.window_cache_ttl,
    )
    .with_detector(WindowDetector::new(config.window_duration).with_lookback(Some(config.lookback)))
    .with_lookback(config.lookback);

    let want_git = config.lines.contains(1);
    let want_event = config.schedule && full && want_git && is_schedule_turn(now);
    let want_limits = config.usage_limits && full && config.lines.contains(3);

    let (window, usage, git, usage_limits, event) = tokio::join!(
        async {
            match &session_id {
                Some(id) => service.window_statistics(Some(id), now).await,
                None => None,
            }
        },
        service.conversation_usage(session_id.as_ref(), input.transcript_path.as_deref()),
        async {
            if want_git {
                GitInfo::probe(&working_dir).await
            } else {
                GitInfo::default()
            }
        },
        async {
            if !want_limits {
                return None;
            }
            UsageLimitsProbe::new(
                &config.claude_dir,
                config.cache.usage_limits.clone(),
                config.cache.usage_limits_lock.clone(),
                config.usage_limits_ttl,
            )
            .limits(now)
            .await
        },
        async {
            if !want_event {
                return None;
            }
            Schedule::new(
                config.cache.schedule.clone(),
                config.cache.schedule_lock.clone(),
                config.schedule_ttl,
                config.timezone,
            )
            .next_event(now)
            .await
        },
    );

    let cost = input.cost.as_ref();
    let context_window = input.context_window.as_ref();
    RenderContext {
        model: input.model_name().to_string(),
        git,
        dir_name: dir_name(&working_dir),
        active_files: input
            .workspace
            .as_ref()
            .and_then(|w| w.active_files.as_ref())
            .map_or(0, Vec::len),
        messages: usage.total_messages(),
        lines_added: cost.and_then(|c| c.total_lines_added).unwrap_or(0),
        lines_removed: cost.and_then(|c| c.total_lines_removed).unwrap_or(0),
        errors: usage.error_count,
        session_cost: session_cost(input, &usage),
        context: ContextMetrics::compute(
            &usage,
            context_window.and_then(|c| c.context_window_size),
            context_window.and_then(|c| c.used_percentage),
        ),
        window,
        usage_limits,
        event,
        now,
    }
}

fn dir_name(path: &Path) -> String {
    path.file_name()
        .map(|name| name.to_string_lossy().into_owned())
        .unwrap_or_else(|| path.display().to_string())
}

/// Which optional parts line 1 carries, from most to least generous
#[derive(Debug, Clone, Copy)]
struct Line1Layout {
    branch_max: usize,
    dir_max: Option<usize>,
    active_files: bool,
    messages: bool,
    /// Cost, changed lines and errors
    extras: bool,
}

const LINE1_LAYOUTS: [Line1Layout; 6] = [
    Line1Layout {
        branch_max: 20,
        dir_max: None,
        active_files: true,
        messages: true,
        extras: true,
    },
    Line1Layout {
        branch_max: 20,
        dir_max: None,
        active_files: true,
        messages: true,
        extras: false,
    },
    Line1Layout {
        branch_max: 20,
        dir_max: None,
        active_files: false,
        messages: true,
        extras: false,
    },
    Line1Layout {
        branch_max: 20,
        dir_max: Some(12),
        active_files: false,
        messages: true,
        extras: false,
    },
    Line1Layout {
        branch_max: 12,
        dir_max: Some(12),
        active_files: false,
        messages: true,
        extras: false,
    },
    Line1Layout {
        branch_max: 10,
        dir_max: Some(10),
        active_files: false,
        messages: false,
        extras: false,
    },
];

/// Lays a [`RenderContext`] out as status lines
#[derive(Debug, Clone)]
pub struct Renderer {
    pub palette: Palette,
    pub mode: DisplayMode,
    pub width: usize,
    pub lines: LineSelection,
    pub timezone: TimezoneConfig,
}

impl Renderer {
    pub fn from_config(config: &StatuslineConfig) -> Self {
        Self {
            palette: Palette::new(config.color),
            mode: config.display_mode,
            width: config.width,
            lines: config.lines.clone(),
            timezone: config.timezone,
        }
    }

    /// The selected lines, unwrapped
    pub fn render(&self, ctx: &RenderContext) -> Vec<String> {
        let bar_width = match self.mode {
            DisplayMode::Full => FULL_BAR_WIDTH,
            DisplayMode::Compact => COMPACT_BAR_WIDTH,
            DisplayMode::Tight => TIGHT_BAR_WIDTH,
        };
        let mut lines = Vec::new();

        if self.lines.contains(1) {
            lines.push(match self.mode {
                DisplayMode::Full => self.full_line1(ctx),
                DisplayMode::Compact => self.compact_line1(ctx),
                DisplayMode::Tight => self.tight_line1(ctx),
            });
        }
        if self.lines.contains(2) {
            lines.push(match self.mode {
                DisplayMode::Full => self.full_context_line(&ctx.context),
                _ => self.short_context_line(&ctx.context, bar_width),
            });
        }
        if let Some(stats) = &ctx.window {
            if self.lines.contains(3) {
                lines.push(match self.mode {
                    DisplayMode::Full => self.full_session_line(ctx, stats),
                    _ => self.short_session_line(stats, bar_width),
                });
            }
            if self.lines.contains(4) {
                lines.push(match self.mode {
                    DisplayMode::Full => self.full_burn_line(stats),
                    _ => self.short_burn_line(stats, bar_width),
                });
            }
        }
        lines
    }

    fn paint(&self, text: &str, tone: Tone) -> String {
        self.palette.paint(text, tone)
    }

    fn full_line1(&self, ctx: &RenderContext) -> String {
        if let Some(event) = &ctx.event {
            return format_schedule_line(&self.palette, event, self.width);
        }

        let mut line = String::new();
        for layout in LINE1_LAYOUTS {
            line = self.line1_parts(ctx, layout).join(" | ");
            if display_width(&line) <= self.width {
                break;
            }
        }
        line
    }

    fn line1_parts(&self, ctx: &RenderContext, layout: Line1Layout) -> Vec<String> {
        let mut parts = vec![self.paint(
            &format!("[{}]", shorten_model_name(&ctx.model, false)),
            Tone::BrightYellow,
        )];

        if let Some(branch) = &ctx.git.branch {
            let mut git = self.paint(
                &format!("🌿 {}", truncate_text(branch, layout.branch_max)),
                Tone::BrightGreen,
            );
            if ctx.git.modified > 0 {
                git.push(' ');
                git.push_str(&self.paint(&format!("M{}", ctx.git.modified), Tone::BrightYellow));
            }
            parts.push(git);
        }

        let dir = match layout.dir_max {
            Some(max) => truncate_text(&ctx.dir_name, max),
            None => ctx.dir_name.clone(),
        };
        parts.push(self.paint(&format!("📁 {dir}"), Tone::BrightCyan));

        if layout.active_files && ctx.active_files > 0 {
            parts.push(self.paint(&format!("📝 {}", ctx.active_files), Tone::BrightWhite));
        }
        if layout.messages && ctx.messages > 0 {
            parts.push(self.paint(&format!("💬 {}", ctx.messages), Tone::BrightCyan));
        }
        if layout.extras {
            if ctx.lines_added > 0 || ctx.lines_removed > 0 {
                parts.push(format!(
                    "{}/{}",
                    self.paint(&format!("+{}", ctx.lines_added), Tone::BrightGreen),
                    self.paint(&format!("-{}", ctx.lines_removed), Tone::BrightRed)
                ));
            }
            if ctx.errors > 0 {
                parts.push(self.paint(&format!("⚠️ {}", ctx.errors), Tone::BrightRed));
            }
            if ctx.session_cost > 0.0 {
                let tone = if ctx.session_cost > EXPENSIVE_SESSION_USD {
                    Tone::BrightYellow
                } else {
                    Tone::BrightWhite
                };
                parts.push(self.paint(&format!("💰 {}", format_cost(ctx.session_cost)), tone));
            }
        }
        parts
    }

    fn compact_line1(&self, ctx: &RenderContext) -> String {
        let mut parts = vec![self.paint(
            &format!("[{}]", shorten_model_name(&ctx.model, false)),
            Tone::BrightYellow,
        )];
        if let Some(branch) = &ctx.git.branch {
            let mut git = branch.clone();
            if ctx.git.modified > 0 {
                git.push_str(&format!(" M{}", ctx.git.modified));
            }
            if ctx.git.untracked > 0 {
                git.push_str(&format!("+{}", ctx.git.untracked));
            }
            parts.push(self.paint(&git, Tone::BrightGreen));
        }
        parts.push(self.paint(&ctx.dir_name, Tone::BrightCyan));
        if ctx.messages > 0 {
            parts.push(self.paint(&format!("💬{}", ctx.messages), Tone::BrightCyan));
        }
        parts.join(" ")
    }

    fn tight_line1(&self, ctx: &RenderContext) -> String {
        let mut parts = vec![self.paint(
            &format!("[{}]", shorten_model_name(&ctx.model, true)),
            Tone::BrightYellow,
        )];
        if let Some(branch) = &ctx.git.branch {
            let git = if ctx.git.modified > 0 || ctx.git.untracked > 0 {
                format!("{branch} M{}+{}", ctx.git.modified, ctx.git.untracked)
            } else {
                branch.clone()
            };
            parts.push(self.paint(&git, Tone::BrightGreen));
        }
        parts.join(" ")
    }

    fn full_context_line(&self, context: &ContextMetrics) -> String {
        let pct = context.percentage;
        let (label, percentage) = if pct >= CONTEXT_ALERT_PERCENT {
            (
                self.paint("Compact:", Tone::Alert),
                self.paint(&format!("[{pct}%]"), Tone::Alert),
            )
        } else {
            (
                self.paint("Compact:", Tone::BrightCyan),
                self.paint(&format!("[{pct}%]"), percentage_tone(pct as f64)),
            )
        };

        let mut parts = vec![
            label,
            progress_bar(&self.palette, pct as f64, FULL_BAR_WIDTH),
            percentage,
            self.paint(
                &format!(
                    "{}/{}",
                    format_token_count(context.tokens),
                    format_token_count(context.window_size)
                ),
                Tone::BrightWhite,
            ),
        ];
        if context.cache_ratio >= CACHE_RATIO_SHOWN_FROM {
            parts.push(self.paint(
                &format!("♻️ {}% cached", context.cache_ratio as u64),
                Tone::BrightGreen,
            ));
        }
        parts.join(" ")
    }

    fn short_context_line(&self, context: &ContextMetrics, bar_width: usize) -> String {
        let pct = context.percentage;
        let amount = if self.mode == DisplayMode::Tight {
            format_token_count_short(context.tokens)
        } else {
            format!(
                "{}/{}",
                format_token_count_short(context.tokens),
                format_token_count_short(context.window_size)
            )
        };
        format!(
            "{} {} {} {}",
            self.paint("C:", Tone::BrightCyan),
            progress_bar(&self.palette, pct as f64, bar_width),
            self.paint(&format!("[{pct}%]"), percentage_tone(pct as f64)),
            self.paint(&amount, Tone::BrightWhite)
        )
    }

    fn full_session_line(&self, ctx: &RenderContext, stats: &WindowStatistics) -> String {
        let progress = stats.progress_percent();
        let mut parts = vec![
            self.paint("Session:", Tone::BrightCyan),
            progress_bar(&self.palette, progress, FULL_BAR_WIDTH),
            self.paint(&format!("[{}%]", progress as u64), Tone::BrightWhite),
            self.paint(
                &format!("{}/5h", format_duration(stats.duration_seconds)),
                Tone::BrightWhite,
            ),
        ];

        let clock = self.timezone.clock_time(ctx.now);
        let start = self.timezone.clock_time(stats.start);
        let end = self.timezone.clock_time(stats.nominal_end);
        if ctx.now > stats.nominal_end {
            parts.push(self.paint(&clock, Tone::BrightYellow));
            parts.push(self.paint(&format!("(ended at {end})"), Tone::BrightYellow));
        } else {
            parts.push(self.paint(&clock, Tone::BrightWhite));
            parts.push(self.paint(&format!("({start} to {end})"), Tone::BrightGreen));
        }

        if let Some(limits) = &ctx.usage_limits {
            let labelled = [("5h", &limits.five_hour), ("7d", &limits.seven_day)];
            for (label, limit) in labelled {
                if let Some(UsageLimit { utilization, .. }) = limit {
                    parts.push(self.paint(
                        &format!("{label}:{}%", utilization.round() as i64),
                        percentage_tone(*utilization),
                    ));
                }
            }
        }
        parts.join(" ")
    }

    fn short_session_line(&self, stats: &WindowStatistics, bar_width: usize) -> String {
        let progress = stats.progress_percent();
        let duration = format_duration(stats.duration_seconds);
        let duration = if self.mode == DisplayMode::Tight {
            duration
        } else {
            format!("{duration}/5h")
        };
        format!(
            "{} {} {} {}",
            self.paint("S:", Tone::BrightCyan),
            progress_bar(&self.palette, progress, bar_width),
            self.paint(&format!("[{}%]", progress as u64), Tone::BrightWhite),
            self.paint(&duration, Tone::BrightWhite)
        )
    }

    fn full_burn_line(&self, stats: &WindowStatistics) -> String {
        format!(
            "{} {} {}, Rate: {} t/m",
            self.paint("Burn:   ", Tone::BrightCyan),
            sparkline(&self.palette, &stats.timeline, FULL_BAR_WIDTH),
            self.paint(
                &format!("{} token(w/cache)", format_token_count_short(stats.total_tokens)),
                Tone::BrightWhite
            ),
            format_token_count_short(stats.burn_rate_per_minute() as u64)
        )
    }

    fn short_burn_line(&self, stats: &WindowStatistics, bar_width: usize) -> String {
        format!(
            "{} {} {}",
            self.paint("B:", Tone::BrightCyan),
            sparkline(&self.palette, &stats.timeline, bar_width),
            self.paint(&format_token_count_short(stats.total_tokens), Tone::BrightWhite)
        )
    }
}

/// Reset, then bold bright white as the base style for the line
pub fn wrap_line(palette: &Palette, line: &str) -> String {
    if palette.enabled() {
        format!("\x1b[0m\x1b[1;97m{line}\x1b[0m")
    } else {
        line.to_string()
    }
}

/// Printed instead of the status lines when something went wrong
pub fn fallback_lines(palette: &Palette) -> [String; 2] {
    [
        format!("{} . | 0 | 0%", palette.paint("[Error]", Tone::BrightRed)),
        palette.paint("Check ~/.claude/statusline-error.log", Tone::Gray),
    ]
}

/// Read the payload from stdin
///
/// `Ok(None)` for empty or whitespace-only input.
pub async fn read_input() -> anyhow::Result<Option<String>> {
    if is_terminal::is_terminal(std::io::stdin()) {
        anyhow::bail!(
            "ccline expects the statusline JSON payload on stdin.\n\
             It is meant to be run by Claude Code, not interactively.\n\
             \n\
             Example usage:\n\
             echo '{{\"session_id\": \"test\", \"model\": {{\"display_name\": \"Opus 4.6\"}}}}' | ccline\n\
             \n\
             Run `ccline install` to register it in Claude Code's settings."
        );
    }

    let mut buffer = String::new();
    timeout(READ_TIMEOUT, io::stdin().read_to_string(&mut buffer))
        .await
        .context("timed out waiting for the statusline payload on stdin")?
        .context("failed to read stdin")?;

    if buffer.trim().is_empty() {
        debug!("Empty payload, nothing to render");
        return Ok(None);
    }
    Ok(Some(buffer))
}

/// Render `payload` into printable, wrapped lines
pub async fn generate(config: &StatuslineConfig, payload: &str, now: DateTime<Utc>) -> anyhow::Result<Vec<String>> {
    let input = StatuslineInput::parse(payload)?;
    let ctx = collect(config, &input, now).await;
    let renderer = Renderer::from_config(config);
    Ok(renderer
        .render(&ctx)
        .iter()
        .map(|line| wrap_line(&renderer.palette, line))
        .collect())
}

#[cfg(test)]
mod tests {
    use super::*;
    use ccline_core::aggregation::MessageCounts;
    use ccline_core::types::TokenCounts;
    use ccline_terminal::strip_ansi;
    use chrono::TimeZone;

    fn at(h: u32, m: u32) -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2025, 6, 2, h, m, 0).unwrap()
    }

    fn usage(input: u64, output: u64, cache_write: u64, cache_read: u64) -> ConversationUsage {
        ConversationUsage {
            tokens: TokenCounts::new(input, output, cache_write, cache_read),
            user_messages: 4,
            assistant_messages: 6,
            error_count: 0,
        }
    }

    fn window_stats() -> WindowStatistics {
        let mut timeline = [0u64; 20];
        timeline[0] = 1_000;
        timeline[4] = 5_000;
        WindowStatistics {
            start: at(8, 0),
            nominal_end: at(13, 0),
            actual_end: at(9, 15),
            last_record: at(9, 10),
            tokens: TokenCounts::new(1_000, 2_000, 0, 3_000),
            total_tokens: 6_000,
            messages: MessageCounts::default(),
            skipped_duplicates: 0,
            timeline,
            is_active: true,
            duration_seconds: 75 * 60,
        }
    }

    fn context() -> RenderContext {
        RenderContext {
            model: "Claude Sonnet 4.5".to_string(),
            git: GitInfo {
                branch: Some("main".to_string()),
                modified: 2,
                untracked: 1,
            },
            dir_name: "ccline".to_string(),
            active_files: 3,
            messages: 10,
            lines_added: 12,
            lines_removed: 4,
            errors: 1,
            session_cost: 1.5,
            context: ContextMetrics::compute(&usage(2_000, 0, 0, 80_000), None, None),
            window: Some(window_stats()),
            usage_limits: None,
            event: None,
            now: at(9, 15),
        }
    }

    fn renderer(mode: DisplayMode, width: usize) -> Renderer {
        Renderer {
            palette: Palette::plain(),
            mode,
            width,
            lines: LineSelection::all(),
            timezone: TimezoneConfig::utc(),
        }
    }

    #[test]
    fn test_input_is_lenient() {
        let input = StatuslineInput::parse("{}").unwrap();
        assert_eq!(input.model_name(), "Unknown");
        assert_eq!(input.working_dir(), ".");
        assert!(input.session_id().is_none());

        let input = StatuslineInput::parse(
            r#"{"session_id": "", "cwd": "/home/me/proj", "model": {"display_name": null},
                "context_window": {"used_percentage": null}, "unknown": [1, 2]}"#,
        )
        .unwrap();
        assert!(input.session_id().is_none());
        assert_eq!(input.working_dir(), "/home/me/proj");
        assert_eq!(input.model_name(), "Unknown");

        assert!(StatuslineInput::parse("not json").is_err());
    }

    #[test]
    fn test_context_percentage_uses_window_size() {
        let metrics = ContextMetrics::compute(&usage(100_000, 0, 0, 0), None, None);
        assert_eq!(metrics.window_size, 200_000);
        assert_eq!(metrics.percentage, 50);

        let metrics = ContextMetrics::compute(&usage(900_000, 0, 0, 0), Some(1_000_000), None);
        assert_eq!(metrics.percentage, 90);

        // Reported percentage wins and is capped
        let metrics = ContextMetrics::compute(&usage(10, 0, 0, 0), None, Some(41.6));
        assert_eq!(metrics.percentage, 42);
        let metrics = ContextMetrics::compute(&usage(10, 0, 0, 0), None, Some(130.0));
        assert_eq!(metrics.percentage, 100);
    }

    #[test]
    fn test_cache_ratio() {
        assert_eq!(ContextMetrics::compute(&usage(500, 0, 0, 0), None, None).cache_ratio, 0.0);
        // 80K read out of 100K
        let metrics = ContextMetrics::compute(&usage(5_000, 5_000, 10_000, 80_000), None, None);
        assert!((metrics.cache_ratio - 80.0).abs() < 1e-9);
    }

    #[test]
    fn test_session_cost_prefers_reported_value() {
        let input = StatuslineInput::parse(r#"{"cost": {"total_cost_usd": 2.5}}"#).unwrap();
        assert_eq!(session_cost(&input, &usage(1_000_000, 0, 0, 0)), 2.5);

        let input = StatuslineInput::parse(
            r#"{"model": {"display_name": "Sonnet 4"}, "cost": {"total_cost_usd": 0}}"#,
        )
        .unwrap();
        let cost = session_cost(&input, &usage(1_000_000, 100_000, 0, 0));
        assert!((cost - 4.5).abs() < 1e-9);
    }

    #[test]
    fn test_full_mode_lines() {
        let lines = renderer(DisplayMode::Full, 120).render(&context());
        assert_eq!(lines.len(), 4);
        assert_eq!(
            lines[0],
            "[Sonnet 4.5] | 🌿 main M2 | 📁 ccline | 📝 3 | 💬 10 | +12/-4 | ⚠️ 1 | 💰 $1.50"
        );
        assert!(lines[1].starts_with("Compact: "));
        assert!(lines[1].ends_with("[41%] 82.0K/200.0K ♻️ 97% cached"));
        assert!(lines[2].starts_with("Session: "));
        assert!(lines[2].ends_with("[25%] 1h15m/5h 09:15 (08:00 to 13:00)"));
        assert!(lines[3].starts_with("Burn:    "));
        assert!(lines[3].ends_with(" 6.0K token(w/cache), Rate: 80 t/m"));
    }

    #[test]
    fn test_line1_degrades_to_fit() {
        let mut ctx = context();
        ctx.git.branch = Some("feature/very-long-branch-name".to_string());
        ctx.dir_name = "an-extremely-long-directory".to_string();

        let line = &renderer(DisplayMode::Full, 70).render(&ctx)[0];
        assert!(display_width(line) <= 70, "{line}");
        assert!(!line.contains('💰'));
        assert!(!line.contains('📝'));
        assert!(line.contains("📁 an-extrem..."));

        // Nothing fits: the smallest layout is used anyway
        let line = &renderer(DisplayMode::Full, 10).render(&ctx)[0];
        assert_eq!(line, "[Sonnet 4.5] | 🌿 feature... M2 | 📁 an-extr...");
    }

    #[test]
    fn test_compact_and_tight_lines() {
        let lines = renderer(DisplayMode::Compact, 60).render(&context());
        assert_eq!(lines[0], "[Sonnet 4.5] main M2+1 ccline 💬10");
        assert!(lines[1].starts_with("C: "));
        assert!(lines[1].ends_with(" [41%] 82.0K/200K"));
        assert_eq!(strip_ansi(&lines[1]).chars().count(), "C: ".len() + 12 + " [41%] 82.0K/200K".len());
        assert!(lines[2].ends_with(" [25%] 1h15m/5h"));
        assert!(lines[3].starts_with("B: "));
        assert!(lines[3].ends_with(" 6.0K"));

        let lines = renderer(DisplayMode::Tight, 30).render(&context());
        assert_eq!(lines[0], "[Son4.5] main M2+1");
        assert!(lines[1].ends_with(" [41%] 82.0K"));
        assert!(lines[2].ends_with(" [25%] 1h15m"));
    }

    #[test]
    fn test_no_window_hides_session_and_burn() {
        let mut ctx = context();
        ctx.window = None;
        let lines = renderer(DisplayMode::Full, 120).render(&ctx);
        assert_eq!(lines.len(), 2);
    }

    #[test]
    fn test_line_selection() {
        let mut r = renderer(DisplayMode::Full, 120);
        r.lines = LineSelection::simple();
        let lines = r.render(&context());
        assert_eq!(lines.len(), 2);
        assert!(lines[0].starts_with("Compact:"));
        assert!(lines[1].starts_with("Session:"));
    }

    #[test]
    fn test_ended_window_and_usage_limits() {
        let mut ctx = context();
        ctx.now = at(13, 30);
        ctx.usage_limits = Some(UsageLimits {
            five_hour: Some(UsageLimit {
                utilization: 42.4,
                resets_at: None,
            }),
            seven_day: Some(UsageLimit {
                utilization: 91.0,
                resets_at: None,
            }),
        });
        let line = &renderer(DisplayMode::Full, 120).render(&ctx)[2];
        assert!(line.ends_with("13:30 (ended at 13:00) 5h:42% 7d:91%"), "{line}");
    }

    #[test]
    fn test_schedule_event_replaces_line1() {
        let mut ctx = context();
        ctx.event = Some(UpcomingEvent {
            time: "10:00".to_string(),
            summary: "Standup".to_string(),
            minutes_until: 45,
        });
        let lines = renderer(DisplayMode::Full, 120).render(&ctx);
        assert_eq!(lines[0], "📅 10:00 Standup (in 45m)");
    }

    #[test]
    fn test_alert_colors_at_85_percent() {
        colored::control::set_override(true);
        let mut r = renderer(DisplayMode::Full, 120);
        r.palette = Palette::new(true);
        let mut ctx = context();
        ctx.context = ContextMetrics::compute(&usage(172_000, 0, 0, 0), None, None);

        let line = &r.render(&ctx)[1];
        assert!(line.starts_with(&r.palette.paint("Compact:", Tone::Alert)), "{line:?}");
        assert!(line.contains(&r.palette.paint("[86%]", Tone::Alert)));
        assert!(line.contains("[86%]"));
        assert!(strip_ansi(line).starts_with("Compact: "));
    }

    #[test]
    fn test_wrap_and_fallback() {
        assert_eq!(wrap_line(&Palette::plain(), "x"), "x");
        assert_eq!(wrap_line(&Palette::new(true), "x"), "\x1b[0m\x1b[1;97mx\x1b[0m");

        let [first, second] = fallback_lines(&Palette::plain());
        assert_eq!(first, "[Error] . | 0 | 0%");
        assert_eq!(second, "Check ~/.claude/statusline-error.log");
    }

    #[test]
    fn test_burn_rate_uses_elapsed_minutes() {
        let mut stats = window_stats();
        stats.duration_seconds = 0;
        let line = renderer(DisplayMode::Full, 120).full_burn_line(&stats);
        // Zero elapsed time counts as one second
        assert!(line.ends_with("Rate: 360K t/m"), "{line}");
    }
}
