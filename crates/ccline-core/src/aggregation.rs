//! Per-window statistics with deduplication
//!
//! The same logical event can be logged more than once, e.g. in a session's
//! own transcript and again in a resumed or forked one. [`aggregate`] counts
//! each event once, using [`Record::dedup_key`].
//!
//! Only records whose offset from the window start falls in `[0, duration]`
//! count. That is exactly the span the detector assigns to a window, so a
//! record logged on the closing instant still counts, in the last bucket.
//! The same bound applies to token totals, message counts and the timeline,
//! so the timeline always sums to `total_tokens`.

use chrono::{DateTime, TimeDelta, Utc};
use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use tracing::debug;

use crate::types::{Record, RecordType, TokenCounts};
use crate::window::{Window, window_is_active};

/// Number of timeline buckets across one window
pub const TIMELINE_BUCKETS: usize = 20;

/// Width of one timeline bucket
pub const BUCKET_MINUTES: i64 = 15;

/// Message counts by record type
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct MessageCounts {
    pub user: u64,
    pub assistant: u64,
    pub error: u64,
}

/// Aggregated usage for one window
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WindowStatistics {
    pub start: DateTime<Utc>,
    pub nominal_end: DateTime<Utc>,
    pub actual_end: DateTime<Utc>,
    pub last_record: DateTime<Utc>,
    /// Per-class token totals
    pub tokens: TokenCounts,
    /// Always `tokens.total()`
    pub total_tokens: u64,
    pub messages: MessageCounts,
    /// Records dropped because their key had already been counted
    pub skipped_duplicates: u64,
    /// Token volume per 15-minute bucket
    pub timeline: [u64; TIMELINE_BUCKETS],
    pub is_active: bool,
    pub duration_seconds: i64,
}

impl WindowStatistics {
    /// Statistics of a window with no countable records
    pub fn empty(window: &Window) -> Self {
        Self {
            start: window.start,
            nominal_end: window.nominal_end,
            actual_end: window.actual_end,
            last_record: window.last_record,
            tokens: TokenCounts::default(),
            total_tokens: 0,
            messages: MessageCounts::default(),
            skipped_duplicates: 0,
            timeline: [0; TIMELINE_BUCKETS],
            is_active: window.is_active,
            duration_seconds: window.duration_seconds(),
        }
    }

    /// Re-evaluate the time-dependent fields against a new `now`
    ///
    /// Used when statistics come out of the cache: the token data is still
    /// valid but activity and elapsed time have moved on.
    pub fn refreshed_at(mut self, now: DateTime<Utc>) -> Self {
        let duration = self.nominal_end - self.start;
        self.is_active = window_is_active(self.last_record, self.nominal_end, duration, now);
        self.actual_end = if self.is_active { now } else { self.last_record };
        self.duration_seconds = (self.actual_end - self.start).num_seconds();
        self
    }

    /// Tokens per minute over the elapsed part of the window
    pub fn burn_rate_per_minute(&self) -> f64 {
        let seconds = self.duration_seconds.max(1) as f64;
        self.total_tokens as f64 / seconds * 60.0
    }

    /// Position inside the five-hour cycle, 0..100
    pub fn progress_percent(&self) -> f64 {
        let window_hours = (self.nominal_end - self.start).num_seconds() as f64 / 3600.0;
        if window_hours <= 0.0 {
            return 0.0;
        }
        let hours_elapsed = self.duration_seconds.max(0) as f64 / 3600.0;
        (hours_elapsed % window_hours) / window_hours * 100.0
    }
}

/// Timeline bucket for an offset from the window start, or `None` outside the span
fn bucket_index(offset: TimeDelta, span: TimeDelta) -> Option<usize> {
    if offset < TimeDelta::zero() || offset > span {
        return None;
    }
    let index = offset.num_minutes() / BUCKET_MINUTES;
    Some((index as usize).min(TIMELINE_BUCKETS - 1))
}

/// Compute statistics for one window
pub fn aggregate(window: &Window) -> WindowStatistics {
    let span = window.nominal_end - window.start;
    let mut stats = WindowStatistics::empty(window);
    let mut seen = HashSet::new();

    for record in &window.records {
        let Some(bucket) = bucket_index(record.timestamp - window.start, span) else {
            continue;
        };

        if let Some(key) = record.dedup_key()
            && !seen.insert(key)
        {
            stats.skipped_duplicates += 1;
            continue;
        }

        count_record(&mut stats, record, bucket);
    }

    stats.total_tokens = stats.tokens.total();
    debug!(
        "Aggregated window {}: {} tokens, {} duplicates skipped",
        window.start, stats.total_tokens, stats.skipped_duplicates
    );
    stats
}

fn count_record(stats: &mut WindowStatistics, record: &Record, bucket: usize) {
    match record.record_type {
        RecordType::User => stats.messages.user += 1,
        RecordType::Assistant => stats.messages.assistant += 1,
        RecordType::Error | RecordType::Other => {}
    }
    if record.has_error {
        stats.messages.error += 1;
    }

    if let Some(usage) = record.billable_usage() {
        stats.tokens += usage;
        stats.timeline[bucket] += usage.total();
    }
}
