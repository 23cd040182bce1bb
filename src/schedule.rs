//! Next calendar event, via the `gog` CLI
//!
//! With `--schedule`, line 1 alternates every second between the normal
//! model/git line and the next timed event of the day. Events are fetched
//! with `gog calendar events` and cached for five minutes; only the process
//! holding the refresh lock runs `gog`, the others use the last cached value.

use crate::command::run_with_timeout;
use ccline_core::cache::TtlCache;
use ccline_core::lock::{DEFAULT_LOCK_MAX_AGE, PidLock};
use ccline_core::timezone::TimezoneConfig;
use ccline_terminal::width::{display_width, truncate_to_width};
use ccline_terminal::{Palette, Tone};
use chrono::{DateTime, TimeDelta, Utc};
use serde::{Deserialize, Serialize};
use std::future::Future;
use std::path::PathBuf;
use std::time::Duration;
use tokio::process::Command;
use tracing::{debug, warn};

const GOG_TIMEOUT: Duration = Duration::from_secs(5);
const CACHE_KEY: &str = "gog-calendar";

/// A timed calendar event
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CalendarEvent {
    pub summary: String,
    pub start: DateTime<Utc>,
    pub end: Option<DateTime<Utc>>,
}

/// An event as shown on line 1
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UpcomingEvent {
    /// `HH:MM` in the display timezone
    pub time: String,
    pub summary: String,
    /// Negative once the event has started
    pub minutes_until: i64,
}

#[derive(Debug, Deserialize)]
struct GogEvents {
    #[serde(default)]
    events: Vec<GogEvent>,
}

#[derive(Debug, Deserialize)]
struct GogEvent {
    summary: Option<String>,
    #[serde(default)]
    start: GogTime,
    #[serde(default)]
    end: GogTime,
}

#[derive(Debug, Default, Deserialize)]
struct GogTime {
    #[serde(rename = "dateTime")]
    date_time: Option<String>,
}

/// First timed event in `gog --json` output; all-day events are skipped
pub fn parse_gog_events(json: &str) -> Option<CalendarEvent> {
    let parsed: GogEvents = serde_json::from_str(json)
        .inspect_err(|e| debug!("Unreadable gog output: {}", e))
        .ok()?;
    parsed.events.into_iter().find_map(|event| {
        let start = parse_instant(event.start.date_time.as_deref()?)?;
        Some(CalendarEvent {
            summary: event.summary.unwrap_or_else(|| "Untitled".to_string()),
            start,
            end: event.end.date_time.as_deref().and_then(parse_instant),
        })
    })
}

fn parse_instant(text: &str) -> Option<DateTime<Utc>> {
    DateTime::parse_from_rfc3339(text)
        .ok()
        .map(|dt| dt.with_timezone(&Utc))
}

/// Run `gog`; `None` when it is missing, fails, times out or lists nothing
pub async fn fetch_from_gog() -> Option<CalendarEvent> {
    let mut command = Command::new("gog");
    command.args(["calendar", "events", "--days=1", "--max=10", "--json"]);

    match run_with_timeout(command, GOG_TIMEOUT).await {
        Ok(stdout) => parse_gog_events(&stdout),
        Err(e) => {
            debug!("No calendar events: {}", e);
            None
        }
    }
}

/// Cached access to the next calendar event
pub struct Schedule {
    cache: TtlCache,
    lock_path: PathBuf,
    timezone: TimezoneConfig,
}

impl Schedule {
    pub fn new(cache_path: PathBuf, lock_path: PathBuf, ttl: TimeDelta, timezone: TimezoneConfig) -> Self {
        Self {
            cache: TtlCache::new(cache_path, ttl),
            lock_path,
            timezone,
        }
    }

    pub async fn next_event(&self, now: DateTime<Utc>) -> Option<UpcomingEvent> {
        self.next_event_with(now, fetch_from_gog).await
    }

    /// Like [`Schedule::next_event`] with a custom fetcher
    pub async fn next_event_with<F, Fut>(&self, now: DateTime<Utc>, fetch: F) -> Option<UpcomingEvent>
    where
        F: FnOnce() -> Fut,
        Fut: Future<Output = Option<CalendarEvent>>,
    {
        // An event that has ended makes the entry stale even within the TTL
        let cached = self
            .cache
            .read::<Option<CalendarEvent>>(CACHE_KEY, now)
            .filter(|event| !event.as_ref().is_some_and(|e| has_ended(e, now)));
        let event = match cached {
            Some(event) => event,
            None => self.refresh(now, fetch).await,
        };
        event
            .filter(|e| !has_ended(e, now))
            .map(|e| self.upcoming(e, now))
    }

    async fn refresh<F, Fut>(&self, now: DateTime<Utc>, fetch: F) -> Option<CalendarEvent>
    where
        F: FnOnce() -> Fut,
        Fut: Future<Output = Option<CalendarEvent>>,
    {
        let _guard = match PidLock::try_acquire(&self.lock_path, DEFAULT_LOCK_MAX_AGE) {
            Ok(Some(guard)) => guard,
            Ok(None) => {
                debug!("Schedule refresh in progress elsewhere, using stale cache");
                return self.cache.read_stale::<Option<CalendarEvent>>(CACHE_KEY).flatten();
            }
            Err(e) => {
                warn!("Failed to take schedule lock: {}", e);
                return self.cache.read_stale::<Option<CalendarEvent>>(CACHE_KEY).flatten();
            }
        };

        let event = fetch().await;
        if let Err(e) = self.cache.write(CACHE_KEY, &event, now) {
            warn!("Failed to write schedule cache: {}", e);
        }
        event
    }

    fn upcoming(&self, event: CalendarEvent, now: DateTime<Utc>) -> UpcomingEvent {
        UpcomingEvent {
            time: self.timezone.clock_time(event.start),
            summary: event.summary,
            minutes_until: (event.start - now).num_seconds() / 60,
        }
    }
}

fn has_ended(event: &CalendarEvent, now: DateTime<Utc>) -> bool {
    event.end.is_some_and(|end| now > end)
}

/// Whether line 1 shows the event during this second
pub fn is_schedule_turn(now: DateTime<Utc>) -> bool {
    now.timestamp().rem_euclid(2) == 1
}

/// `(now)`, `(in 30m)`, `(in 1h15m)`, `(in 2h)`
pub fn format_time_until(minutes: i64) -> String {
    if minutes <= 0 {
        "(now)".to_string()
    } else if minutes < 60 {
        format!("(in {minutes}m)")
    } else {
        let (hours, mins) = (minutes / 60, minutes % 60);
        if mins > 0 {
            format!("(in {hours}h{mins}m)")
        } else {
            format!("(in {hours}h)")
        }
    }
}

pub fn schedule_tone(minutes_until: i64) -> Tone {
    if minutes_until <= 0 {
        Tone::BrightGreen
    } else if minutes_until <= 10 {
        Tone::BrightRed
    } else if minutes_until <= 30 {
        Tone::BrightYellow
    } else {
        Tone::BrightWhite
    }
}

/// `📅 14:00 Standup (in 30m)`, with the summary cut to fit `width`
pub fn format_schedule_line(palette: &Palette, event: &UpcomingEvent, width: usize) -> String {
    let prefix = format!("📅 {} ", event.time);
    let suffix = format!(" {}", format_time_until(event.minutes_until));
    let available = width.saturating_sub(display_width(&prefix) + display_width(&suffix) + 2);
    let summary = truncate_to_width(&event.summary, available);
    palette.paint(
        &format!("{prefix}{summary}{suffix}"),
        schedule_tone(event.minutes_until),
    )
}
