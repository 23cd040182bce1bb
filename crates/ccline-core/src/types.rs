//! Core domain types for ccline
//!
//! This module holds the strongly-typed identifiers, the canonical [`Record`]
//! produced from one JSONL line, and the raw serde structures that sit at the
//! ingestion boundary. Usage payloads arrive in several field-naming schemes;
//! [`RawUsage::normalize`] is the only place that knows about them; everything
//! downstream works with [`TokenCounts`].

use chrono::{DateTime, NaiveDateTime, Utc};
use serde::{Deserialize, Deserializer, Serialize};
use serde_json::Value;
use std::fmt;
use std::ops::{Add, AddAssign};
use std::path::{Path, PathBuf};
use tracing::trace;

use crate::error::{CclineError, Result};

/// Strongly-typed model name wrapper
///
/// # Examples
/// ```
/// use ccline_core::types::ModelName;
///
/// let model = ModelName::new("claude-sonnet-4-6");
/// assert_eq!(model.as_str(), "claude-sonnet-4-6");
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ModelName(String);

impl ModelName {
    /// Create a new ModelName from any string-like type
    pub fn new(name: impl Into<String>) -> Self {
        Self(name.into())
    }

    /// Get the inner string value
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for ModelName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Strongly-typed session ID wrapper
///
/// A session id names one conversation; its transcript lives at
/// `projects/<project>/<session_id>.jsonl`.
///
/// # Examples
/// ```
/// use ccline_core::types::SessionId;
///
/// let session = SessionId::new("550e8400-e29b-41d4-a716-446655440000");
/// assert_eq!(session.as_str(), "550e8400-e29b-41d4-a716-446655440000");
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct SessionId(String);

impl SessionId {
    /// Create a new SessionId
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    /// Get the inner string
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for SessionId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl AsRef<str> for SessionId {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

/// Token counts split by token class
///
/// # Examples
/// ```
/// use ccline_core::types::TokenCounts;
///
/// let tokens = TokenCounts::new(100, 50, 10, 5);
/// assert_eq!(tokens.total(), 165);
///
/// let combined = tokens + TokenCounts::new(50, 25, 5, 2);
/// assert_eq!(combined.input_tokens, 150);
/// ```
#[derive(Debug, Default, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
pub struct TokenCounts {
    /// Input tokens used
    pub input_tokens: u64,
    /// Output tokens generated
    pub output_tokens: u64,
    /// Cache write (creation) tokens
    pub cache_creation_tokens: u64,
    /// Cache read tokens
    pub cache_read_tokens: u64,
}

impl TokenCounts {
    /// Create new TokenCounts
    pub fn new(
        input_tokens: u64,
        output_tokens: u64,
        cache_creation_tokens: u64,
        cache_read_tokens: u64,
    ) -> Self {
        Self {
            input_tokens,
            output_tokens,
            cache_creation_tokens,
            cache_read_tokens,
        }
    }

    /// Sum of all four token classes
    pub fn total(&self) -> u64 {
        self.input_tokens + self.output_tokens + self.cache_creation_tokens + self.cache_read_tokens
    }

    /// True when every class is zero
    pub fn is_empty(&self) -> bool {
        self.total() == 0
    }
}

impl Add for TokenCounts {
    type Output = Self;

    fn add(self, other: Self) -> Self {
        Self {
            input_tokens: self.input_tokens + other.input_tokens,
            output_tokens: self.output_tokens + other.output_tokens,
            cache_creation_tokens: self.cache_creation_tokens + other.cache_creation_tokens,
            cache_read_tokens: self.cache_read_tokens + other.cache_read_tokens,
        }
    }
}

impl AddAssign for TokenCounts {
    fn add_assign(&mut self, other: Self) {
        self.input_tokens += other.input_tokens;
        self.output_tokens += other.output_tokens;
        self.cache_creation_tokens += other.cache_creation_tokens;
        self.cache_read_tokens += other.cache_read_tokens;
    }
}

/// Kind of event a record describes
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum RecordType {
    /// A user turn
    User,
    /// An assistant turn, possibly carrying usage
    Assistant,
    /// A standalone error event
    Error,
    /// Anything else (summaries, system notes, ...)
    Other,
}

impl RecordType {
    fn classify(raw: &RawRecord) -> Self {
        match raw.entry_type.as_deref() {
            Some("user") => Self::User,
            Some("assistant") => Self::Assistant,
            Some("error") => Self::Error,
            _ => Self::Other,
        }
    }
}

/// Read a token count without failing on odd values.
///
/// Negative numbers clamp to 0, fractions truncate, non-numbers count as absent.
fn lenient_count<'de, D>(deserializer: D) -> std::result::Result<Option<u64>, D::Error>
where
    D: Deserializer<'de>,
{
    let value = Option::<Value>::deserialize(deserializer)?;
    Ok(value.as_ref().and_then(count_from_value))
}

fn count_from_value(value: &Value) -> Option<u64> {
    let Value::Number(n) = value else {
        return None;
    };
    n.as_u64()
        .or_else(|| n.as_i64().map(|v| v.max(0) as u64))
        .or_else(|| n.as_f64().map(|f| if f > 0.0 { f as u64 } else { 0 }))
}

/// `{"ephemeral_5m_input_tokens": N}` nested shape; an object without the key counts as 0
fn ephemeral_count(value: Option<&Value>) -> Option<u64> {
    let object = value?.as_object()?;
    Some(
        object
            .get("ephemeral_5m_input_tokens")
            .and_then(count_from_value)
            .unwrap_or(0),
    )
}

/// Usage block as it appears on the wire, in any of the accepted schemes
#[derive(Debug, Clone, Default, Deserialize)]
pub struct RawUsage {
    #[serde(default, deserialize_with = "lenient_count")]
    pub input_tokens: Option<u64>,
    #[serde(default, rename = "inputTokens", deserialize_with = "lenient_count")]
    pub input_tokens_camel: Option<u64>,
    #[serde(default, deserialize_with = "lenient_count")]
    pub output_tokens: Option<u64>,
    #[serde(default, rename = "outputTokens", deserialize_with = "lenient_count")]
    pub output_tokens_camel: Option<u64>,
    #[serde(default, deserialize_with = "lenient_count")]
    pub cache_creation_input_tokens: Option<u64>,
    #[serde(default)]
    pub cache_creation: Option<Value>,
    #[serde(
        default,
        rename = "cacheCreationInputTokens",
        deserialize_with = "lenient_count"
    )]
    pub cache_creation_input_tokens_camel: Option<u64>,
    #[serde(
        default,
        rename = "cacheCreationTokens",
        deserialize_with = "lenient_count"
    )]
    pub cache_creation_tokens_camel: Option<u64>,
    #[serde(default, deserialize_with = "lenient_count")]
    pub cache_read_input_tokens: Option<u64>,
    #[serde(default)]
    pub cache_read: Option<Value>,
    #[serde(
        default,
        rename = "cacheReadInputTokens",
        deserialize_with = "lenient_count"
    )]
    pub cache_read_input_tokens_camel: Option<u64>,
    #[serde(default, rename = "cacheReadTokens", deserialize_with = "lenient_count")]
    pub cache_read_tokens_camel: Option<u64>,
}

impl RawUsage {
    /// Map any accepted naming scheme onto the canonical four classes
    ///
    /// Flat snake_case wins, then the nested ephemeral object, then camelCase.
    ///
    /// ```
    /// use ccline_core::types::RawUsage;
    ///
    /// let raw: RawUsage = serde_json::from_str(
    ///     r#"{"input_tokens": 10, "cache_read": {"ephemeral_5m_input_tokens": 7}}"#,
    /// ).unwrap();
    /// let tokens = raw.normalize();
    /// assert_eq!(tokens.input_tokens, 10);
    /// assert_eq!(tokens.cache_read_tokens, 7);
    /// ```
    pub fn normalize(&self) -> TokenCounts {
        let cache_creation = self
            .cache_creation_input_tokens
            .or_else(|| ephemeral_count(self.cache_creation.as_ref()))
            .or_else(|| {
                self.cache_creation_input_tokens_camel
                    .filter(|&n| n > 0)
                    .or(self.cache_creation_tokens_camel)
            });
        let cache_read = self
            .cache_read_input_tokens
            .or_else(|| ephemeral_count(self.cache_read.as_ref()))
            .or_else(|| {
                self.cache_read_input_tokens_camel
                    .filter(|&n| n > 0)
                    .or(self.cache_read_tokens_camel)
            });

        TokenCounts {
            input_tokens: self.input_tokens.or(self.input_tokens_camel).unwrap_or(0),
            output_tokens: self.output_tokens.or(self.output_tokens_camel).unwrap_or(0),
            cache_creation_tokens: cache_creation.unwrap_or(0),
            cache_read_tokens: cache_read.unwrap_or(0),
        }
    }
}

/// Message body of a raw record
#[derive(Debug, Clone, Default, Deserialize)]
pub struct RawMessage {
    /// API message id (shared by every line of one response)
    #[serde(default)]
    pub id: Option<String>,
    /// Model used
    #[serde(default)]
    pub model: Option<String>,
    /// Usage data
    #[serde(default)]
    pub usage: Option<RawUsage>,
}

/// Raw JSONL line from a session transcript
#[derive(Debug, Clone, Default, Deserialize)]
pub struct RawRecord {
    /// Timestamp string, RFC 3339 or naive
    #[serde(default)]
    pub timestamp: Option<String>,
    /// Session ID
    #[serde(rename = "sessionId", default)]
    pub session_id: Option<String>,
    /// Entry type
    #[serde(rename = "type", default)]
    pub entry_type: Option<String>,
    /// Message containing model and usage
    #[serde(default)]
    pub message: Option<RawMessage>,
    /// Usage placed at the top level by older schema versions
    #[serde(default)]
    pub usage: Option<RawUsage>,
    /// Unique identifier for the event
    #[serde(default)]
    pub uuid: Option<String>,
    /// Request ID (used for deduplication)
    #[serde(rename = "requestId", default)]
    pub request_id: Option<String>,
    /// Flag indicating if this is an API error message
    #[serde(rename = "isApiErrorMessage", default)]
    pub is_api_error_message: Option<bool>,
    /// Error payload, when the event is an error
    #[serde(default)]
    pub error: Option<Value>,
}

/// Parse a log timestamp into UTC
///
/// Accepts RFC 3339 with `Z` or an explicit offset. Timestamps without any
/// zone designator are taken to be UTC already.
///
/// ```
/// use ccline_core::types::parse_timestamp;
///
/// let zulu = parse_timestamp("2025-01-15T10:30:00Z").unwrap();
/// let naive = parse_timestamp("2025-01-15T10:30:00").unwrap();
/// assert_eq!(zulu, naive);
/// ```
pub fn parse_timestamp(text: &str) -> Result<DateTime<Utc>> {
    let text = text.trim();
    if let Ok(dt) = DateTime::parse_from_rfc3339(text) {
        return Ok(dt.with_timezone(&Utc));
    }
    for format in ["%Y-%m-%dT%H:%M:%S%.f", "%Y-%m-%d %H:%M:%S%.f"] {
        if let Ok(naive) = NaiveDateTime::parse_from_str(text, format) {
            return Ok(naive.and_utc());
        }
    }
    Err(CclineError::InvalidTimestamp(text.to_string()))
}

/// Identity used to spot the same event recorded more than once
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum DedupKey {
    /// Both message id and request id are known
    Message {
        message_id: String,
        request_id: String,
    },
    /// Fallback when the precise identity is missing
    SessionInstant {
        session_id: SessionId,
        timestamp: DateTime<Utc>,
    },
}

/// One usage-log event in canonical form
///
/// Records are immutable after loading. `source_file` is kept for debugging
/// only and never takes part in deduplication.
#[derive(Debug, Clone, PartialEq)]
pub struct Record {
    pub timestamp: DateTime<Utc>,
    pub session_id: Option<SessionId>,
    pub record_type: RecordType,
    /// Set for error events and for turns that carry an error payload
    pub has_error: bool,
    /// Token usage, present on assistant turns that reported it
    pub usage: Option<TokenCounts>,
    pub model: Option<ModelName>,
    pub message_id: Option<String>,
    pub request_id: Option<String>,
    pub source_file: Option<PathBuf>,
}

impl Record {
    /// Create a bare record; the `with_*` methods fill in the rest
    pub fn new(timestamp: DateTime<Utc>, record_type: RecordType) -> Self {
        Self {
            timestamp,
            session_id: None,
            record_type,
            has_error: record_type == RecordType::Error,
            usage: None,
            model: None,
            message_id: None,
            request_id: None,
            source_file: None,
        }
    }

    pub fn with_session(mut self, session_id: impl Into<String>) -> Self {
        self.session_id = Some(SessionId::new(session_id));
        self
    }

    /// Mark the record as carrying an error, keeping its type
    pub fn with_error(mut self) -> Self {
        self.has_error = true;
        self
    }

    pub fn with_usage(mut self, usage: TokenCounts) -> Self {
        self.usage = Some(usage);
        self
    }

    pub fn with_ids(mut self, message_id: impl Into<String>, request_id: impl Into<String>) -> Self {
        self.message_id = Some(message_id.into());
        self.request_id = Some(request_id.into());
        self
    }

    pub fn with_model(mut self, model: impl Into<String>) -> Self {
        self.model = Some(ModelName::new(model));
        self
    }

    /// Build a canonical record from its raw form
    ///
    /// Returns `None` when the timestamp is missing or unreadable.
    pub fn from_raw(raw: RawRecord, source_file: Option<&Path>) -> Option<Self> {
        let timestamp = match raw.timestamp.as_deref().map(parse_timestamp) {
            Some(Ok(ts)) => ts,
            Some(Err(e)) => {
                trace!("Skipping record with bad timestamp: {}", e);
                return None;
            }
            None => {
                trace!("Skipping record without timestamp");
                return None;
            }
        };

        let record_type = RecordType::classify(&raw);
        let has_error = record_type == RecordType::Error
            || raw.error.as_ref().is_some_and(|e| !e.is_null())
            || raw.is_api_error_message.unwrap_or(false);
        let message = raw.message.unwrap_or_default();
        let usage = message.usage.or(raw.usage).map(|u| u.normalize());
        let model = message
            .model
            .filter(|m| m != "<synthetic>")
            .map(ModelName::new);

        Some(Self {
            timestamp,
            session_id: raw.session_id.map(SessionId::new),
            record_type,
            has_error,
            usage,
            model,
            message_id: message.id.or(raw.uuid),
            request_id: raw.request_id,
            source_file: source_file.map(Path::to_path_buf),
        })
    }

    /// Parse one JSONL line; bad lines yield `None`
    pub fn parse_line(line: &str, source_file: Option<&Path>) -> Option<Self> {
        let line = line.trim();
        if line.is_empty() {
            return None;
        }
        match serde_json::from_str::<RawRecord>(line) {
            Ok(raw) => Self::from_raw(raw, source_file),
            Err(e) => {
                trace!("Skipping malformed line: {}", e);
                None
            }
        }
    }

    /// Deduplication key in priority order
    ///
    /// `(message_id, request_id)` when both are present, otherwise
    /// `(session_id, timestamp)`; `None` means the record is always counted.
    pub fn dedup_key(&self) -> Option<DedupKey> {
        match (&self.message_id, &self.request_id, &self.session_id) {
            (Some(message_id), Some(request_id), _) => Some(DedupKey::Message {
                message_id: message_id.clone(),
                request_id: request_id.clone(),
            }),
            (_, _, Some(session_id)) => Some(DedupKey::SessionInstant {
                session_id: session_id.clone(),
                timestamp: self.timestamp,
            }),
            _ => None,
        }
    }

    /// Usage of an assistant turn, the only kind that contributes tokens
    pub fn billable_usage(&self) -> Option<TokenCounts> {
        match self.record_type {
            RecordType::Assistant => self.usage,
            _ => None,
        }
    }

    pub fn belongs_to(&self, session_id: &SessionId) -> bool {
        self.session_id.as_ref() == Some(session_id)
    }
}

/// Token footprint of the conversation since its last reset
///
/// Claude Code writes cumulative usage on each assistant turn, so the last
/// non-zero usage is the current context size.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ConversationUsage {
    pub tokens: TokenCounts,
    pub user_messages: u64,
    pub assistant_messages: u64,
    pub error_count: u64,
}

impl ConversationUsage {
    /// Fold one transcript record into the running state
    pub fn observe(&mut self, record: &Record) {
        match record.record_type {
            RecordType::User => self.user_messages += 1,
            RecordType::Assistant => {
                self.assistant_messages += 1;
                if let Some(usage) = record.usage.filter(|u| !u.is_empty()) {
                    self.tokens = usage;
                }
            }
            RecordType::Error | RecordType::Other => {}
        }
        if record.has_error {
            self.error_count += 1;
        }
    }

    pub fn total_messages(&self) -> u64 {
        self.user_messages + self.assistant_messages
    }

    pub fn total_tokens(&self) -> u64 {
        self.tokens.total()
    }
}
