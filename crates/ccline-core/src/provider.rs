//! Source of usage records
//!
//! The usage service only needs two things from a log store: every record
//! newer than some instant, and the transcript of one session. Keeping this
//! behind a trait lets the service run against fixtures in tests.

use crate::error::Result;
use crate::types::{Record, SessionId};
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use std::path::PathBuf;

#[async_trait]
pub trait RecordSource: Send + Sync {
    /// Records with a timestamp at or after `since`, sorted by timestamp
    ///
    /// `None` loads everything. Implementations may return records older
    /// than `since` when they cannot filter cheaply.
    async fn load_records(&self, since: Option<DateTime<Utc>>) -> Result<Vec<Record>>;

    /// Transcript file of a session, if one exists
    async fn find_session_transcript(&self, session_id: &SessionId) -> Option<PathBuf>;
}
