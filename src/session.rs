//! Usage statistics for the current session
//!
//! [`UsageService`] ties the record source, the window detector, the
//! aggregator and the TTL cache together. Window selection prefers the
//! window holding the session's own records and otherwise falls back to the
//! most recent active window; for a brand-new session this can show another
//! session's window, so the figures are approximate.

use ccline_core::aggregation::{WindowStatistics, aggregate};
use ccline_core::cache::TtlCache;
use ccline_core::provider::RecordSource;
use ccline_core::types::{ConversationUsage, SessionId};
use ccline_core::window::{WindowDetector, select_window};
use ccline_provider_claude::DataLoader;
use chrono::{DateTime, TimeDelta, Utc};
use std::path::{Path, PathBuf};
use tracing::{debug, warn};

/// Cache key used when the payload has no session id
const ANONYMOUS_SESSION: &str = "-";

pub struct UsageService<S: RecordSource> {
    source: S,
    detector: WindowDetector,
    lookback: TimeDelta,
    cache: TtlCache,
}

impl<S: RecordSource> UsageService<S> {
    pub fn new(source: S, cache_path: impl Into<PathBuf>, cache_ttl: TimeDelta) -> Self {
        Self {
            source,
            detector: WindowDetector::default(),
            lookback: TimeDelta::hours(6),
            cache: TtlCache::new(cache_path, cache_ttl),
        }
    }

    pub fn with_detector(mut self, detector: WindowDetector) -> Self {
        self.detector = detector;
        self
    }

    pub fn with_lookback(mut self, lookback: TimeDelta) -> Self {
        self.lookback = lookback;
        self
    }

    /// Statistics of the window this session belongs to
    ///
    /// `None` when no window could be determined. Loader and cache problems
    /// are logged and treated the same way.
    pub async fn window_statistics(
        &self,
        session_id: Option<&SessionId>,
        now: DateTime<Utc>,
    ) -> Option<WindowStatistics> {
        let key = session_id.map_or(ANONYMOUS_SESSION, SessionId::as_str);
        if let Some(cached) = self.cache.read::<WindowStatistics>(key, now) {
            debug!("Window statistics served from cache for {}", key);
            return Some(cached.refreshed_at(now));
        }

        let records = match self.source.load_records(Some(now - self.lookback)).await {
            Ok(records) => records,
            Err(e) => {
                warn!("Failed to load usage records: {}", e);
                return None;
            }
        };

        let windows = self.detector.detect(records, now);
        let window = select_window(&windows, session_id)?;
        let stats = aggregate(window);
        debug!(
            "Selected window starting {} with {} tokens (active: {})",
            stats.start, stats.total_tokens, stats.is_active
        );

        if let Err(e) = self.cache.write(key, &stats, now) {
            warn!("Failed to write window cache: {}", e);
        }
        Some(stats)
    }

    /// Token footprint and message counts of the current conversation
    ///
    /// `transcript_path` from the payload wins over a directory search.
    pub async fn conversation_usage(
        &self,
        session_id: Option<&SessionId>,
        transcript_path: Option<&Path>,
    ) -> ConversationUsage {
        let path = match (transcript_path, session_id) {
            (Some(path), _) => Some(path.to_path_buf()),
            (None, Some(id)) => self.source.find_session_transcript(id).await,
            (None, None) => None,
        };
        match path {
            Some(path) => DataLoader::load_conversation_usage(&path).await,
            None => {
                debug!("No transcript for this session");
                ConversationUsage::default()
            }
        }
    }
}
