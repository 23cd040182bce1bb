//! Shared helpers for ccline integration tests
//!
//! Builds Claude Code transcript lines and lays them out the way Claude Code
//! does: `<claude_dir>/projects/<project>/<session_id>.jsonl`.

#![allow(dead_code)]

use ccline::cli::{LineSelection, RenderArgs};
use ccline::config::{EnvSnapshot, StatuslineConfig};
use ccline_terminal::DisplayMode;
use chrono::{DateTime, TimeZone, Utc};
use std::fs;
use std::path::{Path, PathBuf};
use tempfile::TempDir;

pub const TEST_MODEL: &str = "claude-sonnet-4-5-20250929";

/// A fixed instant on 2025-06-02, UTC
pub fn at(hour: u32, minute: u32) -> DateTime<Utc> {
    Utc.with_ymd_and_hms(2025, 6, 2, hour, minute, 0).unwrap()
}

/// Builder for one transcript line
pub struct RecordLineBuilder {
    entry_type: &'static str,
    session_id: String,
    timestamp: DateTime<Utc>,
    model: String,
    input_tokens: u64,
    output_tokens: u64,
    cache_creation_tokens: u64,
    cache_read_tokens: u64,
    message_id: Option<String>,
    request_id: Option<String>,
    api_error: bool,
}

impl RecordLineBuilder {
    pub fn assistant(session_id: &str, timestamp: DateTime<Utc>) -> Self {
        Self {
            entry_type: "assistant",
            session_id: session_id.to_string(),
            timestamp,
            model: TEST_MODEL.to_string(),
            input_tokens: 100,
            output_tokens: 50,
            cache_creation_tokens: 0,
            cache_read_tokens: 0,
            message_id: None,
            request_id: None,
            api_error: false,
        }
    }

    pub fn user(session_id: &str, timestamp: DateTime<Utc>) -> Self {
        Self {
            entry_type: "user",
            ..Self::assistant(session_id, timestamp)
        }
    }

    pub fn with_tokens(mut self, input: u64, output: u64) -> Self {
        self.input_tokens = input;
        self.output_tokens = output;
        self
    }

    pub fn with_cache_tokens(mut self, creation: u64, read: u64) -> Self {
        self.cache_creation_tokens = creation;
        self.cache_read_tokens = read;
        self
    }

    pub fn with_ids(mut self, message_id: &str, request_id: &str) -> Self {
        self.message_id = Some(message_id.to_string());
        self.request_id = Some(request_id.to_string());
        self
    }

    pub fn api_error(mut self) -> Self {
        self.api_error = true;
        self
    }

    #[allow(clippy::wrong_self_convention)]
    pub fn to_jsonl(self) -> String {
        let mut line = serde_json::json!({
            "type": self.entry_type,
            "sessionId": self.session_id,
            "timestamp": self.timestamp.to_rfc3339(),
        });
        if self.entry_type == "assistant" {
            line["message"] = serde_json::json!({
                "model": self.model,
                "usage": {
                    "input_tokens": self.input_tokens,
                    "output_tokens": self.output_tokens,
                    "cache_creation_input_tokens": self.cache_creation_tokens,
                    "cache_read_input_tokens": self.cache_read_tokens,
                },
            });
            if let Some(id) = self.message_id {
                line["message"]["id"] = id.into();
            }
        }
        if let Some(id) = self.request_id {
            line["requestId"] = id.into();
        }
        if self.api_error {
            line["isApiErrorMessage"] = true.into();
        }
        line.to_string()
    }
}

/// Write `lines` to `<claude_dir>/projects/<project>/<session_id>.jsonl`
pub fn write_transcript(claude_dir: &Path, project: &str, session_id: &str, lines: &[String]) -> PathBuf {
    let dir = claude_dir.join("projects").join(project);
    fs::create_dir_all(&dir).unwrap();
    let path = dir.join(format!("{session_id}.jsonl"));
    let mut body = lines.join("\n");
    body.push('\n');
    fs::write(&path, body).unwrap();
    path
}

/// Configuration pinned to UTC, no color and a fixed width
pub fn test_config(claude_dir: &Path, mode: DisplayMode, columns: usize) -> StatuslineConfig {
    let args = RenderArgs {
        claude_dir: Some(claude_dir.to_path_buf()),
        display_mode: Some(mode),
        no_color: true,
        utc: true,
        show: Some(LineSelection::all()),
        ..RenderArgs::default()
    };
    let env = EnvSnapshot {
        columns: Some(columns.to_string()),
        ..EnvSnapshot::default()
    };
    StatuslineConfig::resolve(&args, &env).unwrap()
}

/// A Claude data directory with one active session
///
/// `session-a` has two turns in the window starting at 09:00; the second
/// turn is also logged in a resumed transcript.
pub fn active_session_dir() -> TempDir {
    let dir = TempDir::new().unwrap();
    let first = RecordLineBuilder::assistant("session-a", at(9, 10))
        .with_tokens(1_000, 500)
        .with_ids("msg_1", "req_1")
        .to_jsonl();
    let second = RecordLineBuilder::assistant("session-a", at(10, 40))
        .with_tokens(2_000, 1_000)
        .with_cache_tokens(500, 40_000)
        .with_ids("msg_2", "req_2")
        .to_jsonl();

    write_transcript(
        dir.path(),
        "-home-me-proj",
        "session-a",
        &[
            RecordLineBuilder::user("session-a", at(9, 9)).to_jsonl(),
            first,
            RecordLineBuilder::user("session-a", at(10, 39)).to_jsonl(),
            second.clone(),
        ],
    );
    write_transcript(dir.path(), "-home-me-proj", "session-b", &[second]);
    dir
}
