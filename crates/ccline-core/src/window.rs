//! Five-hour usage window detection
//!
//! Usage is accounted in fixed five-hour windows. A window opens at the top of
//! the hour of its first record and closes when a record arrives more than
//! five hours after the window start, or more than five hours after the
//! previous record. Both conditions are needed: a steady trickle must still
//! split at five hours, and a long idle gap must split even when the total
//! span is short.
//!
//! Windows are recomputed from records on every call and evaluated against a
//! caller-supplied `now`, so the last window can flip from active to closed
//! between two calls over the same data.

use chrono::{DateTime, TimeDelta, Utc};
use tracing::debug;

use crate::types::{Record, SessionId};

/// Length of one accounting window
pub const WINDOW_HOURS: i64 = 5;

/// Records older than this cannot influence the current window
pub const LOOKBACK_HOURS: i64 = 6;

/// Truncate a timestamp to the start of its UTC hour
///
/// ```
/// use ccline_core::window::floor_to_hour;
/// use chrono::{TimeZone, Timelike, Utc};
///
/// let ts = Utc.with_ymd_and_hms(2025, 1, 15, 10, 42, 17).unwrap();
/// let floored = floor_to_hour(ts);
/// assert_eq!(floored.hour(), 10);
/// assert_eq!(floored.minute(), 0);
/// ```
pub fn floor_to_hour(timestamp: DateTime<Utc>) -> DateTime<Utc> {
    let seconds = timestamp.timestamp();
    DateTime::from_timestamp(seconds - seconds.rem_euclid(3600), 0).unwrap_or(timestamp)
}

/// A group of chronologically adjacent records
#[derive(Debug, Clone, PartialEq)]
pub struct Window {
    /// First record's timestamp floored to the hour
    pub start: DateTime<Utc>,
    /// `start` plus the window duration
    pub nominal_end: DateTime<Utc>,
    /// `now` for the active window, last record otherwise
    pub actual_end: DateTime<Utc>,
    /// Timestamp of the newest record
    pub last_record: DateTime<Utc>,
    pub is_active: bool,
    /// Records in chronological order
    pub records: Vec<Record>,
}

impl Window {
    fn close(
        start: DateTime<Utc>,
        records: Vec<Record>,
        duration: TimeDelta,
        now: DateTime<Utc>,
    ) -> Self {
        let last_record = records.last().map(|r| r.timestamp).unwrap_or(start);
        let nominal_end = start + duration;
        let is_active = window_is_active(last_record, nominal_end, duration, now);
        Self {
            start,
            nominal_end,
            actual_end: if is_active { now } else { last_record },
            last_record,
            is_active,
            records,
        }
    }

    /// Elapsed seconds: up to `now` while active, up to the last record once closed
    pub fn duration_seconds(&self) -> i64 {
        (self.actual_end - self.start).num_seconds()
    }

    /// True when any record in the window came from `session_id`
    pub fn contains_session(&self, session_id: &SessionId) -> bool {
        self.records.iter().any(|r| r.belongs_to(session_id))
    }
}

/// Activity rule shared by detection and by cached statistics
pub fn window_is_active(
    last_record: DateTime<Utc>,
    nominal_end: DateTime<Utc>,
    duration: TimeDelta,
    now: DateTime<Utc>,
) -> bool {
    now - last_record < duration && now < nominal_end
}

/// Splits a sorted record sequence into windows
#[derive(Debug, Clone)]
pub struct WindowDetector {
    duration: TimeDelta,
    lookback: Option<TimeDelta>,
}

impl Default for WindowDetector {
    fn default() -> Self {
        Self {
            duration: TimeDelta::hours(WINDOW_HOURS),
            lookback: Some(TimeDelta::hours(LOOKBACK_HOURS)),
        }
    }
}

impl WindowDetector {
    pub fn new(duration: TimeDelta) -> Self {
        Self {
            duration,
            lookback: None,
        }
    }

    /// Drop records older than `now - lookback` before windowing
    pub fn with_lookback(mut self, lookback: Option<TimeDelta>) -> Self {
        self.lookback = lookback;
        self
    }

    pub fn duration(&self) -> TimeDelta {
        self.duration
    }

    /// Partition `records` (sorted by timestamp) into windows
    ///
    /// Every record that survives the lookback filter lands in exactly one
    /// window. Empty input gives no windows.
    pub fn detect(&self, records: Vec<Record>, now: DateTime<Utc>) -> Vec<Window> {
        let cutoff = self.lookback.map(|lookback| now - lookback);
        let mut windows = Vec::new();
        let mut current_start: Option<DateTime<Utc>> = None;
        let mut buffer: Vec<Record> = Vec::new();

        for record in records {
            if cutoff.is_some_and(|cutoff| record.timestamp < cutoff) {
                continue;
            }

            let Some(start) = current_start else {
                current_start = Some(floor_to_hour(record.timestamp));
                buffer.push(record);
                continue;
            };

            let since_start = record.timestamp - start;
            let since_last = buffer
                .last()
                .map(|last| record.timestamp - last.timestamp)
                .unwrap_or_default();

            if since_start > self.duration || since_last > self.duration {
                let closed = std::mem::take(&mut buffer);
                windows.push(Window::close(start, closed, self.duration, now));
                current_start = Some(floor_to_hour(record.timestamp));
            }
            buffer.push(record);
        }

        if let Some(start) = current_start
            && !buffer.is_empty()
        {
            windows.push(Window::close(start, buffer, self.duration, now));
        }

        debug!("Detected {} usage windows", windows.len());
        windows
    }
}

/// Pick the window to report for a session
///
/// Prefers the most recent window holding one of the session's records and
/// falls back to the most recent active window. The fallback can show another
/// session's window, e.g. for a brand-new session with no records yet.
pub fn select_window<'a>(windows: &'a [Window], session_id: Option<&SessionId>) -> Option<&'a Window> {
    session_id
        .and_then(|session_id| windows.iter().rev().find(|w| w.contains_session(session_id)))
        .or_else(|| windows.iter().rev().find(|w| w.is_active))
}
