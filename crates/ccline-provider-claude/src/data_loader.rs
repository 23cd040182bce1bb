//! Discovery and parsing of Claude Code usage logs
//!
//! Claude Code appends one JSON object per line to
//! `<claude_dir>/projects/<project>/<session_id>.jsonl`. The loader walks
//! that tree, skips files whose modification time predates the requested
//! cutoff, and streams the remaining files line by line.
//!
//! Nothing in a log file is trusted: unreadable files, malformed lines and
//! records without a timestamp are skipped and logged at `trace!`.
//!
//! # Examples
//!
//! ```no_run
//! use ccline_provider_claude::DataLoader;
//! use chrono::{TimeDelta, Utc};
//!
//! # async fn example() -> ccline_core::Result<()> {
//! let loader = DataLoader::new(DataLoader::default_claude_dir().unwrap());
//! let since = Utc::now() - TimeDelta::hours(6);
//! let records = loader.load_records(Some(since)).await?;
//! println!("{} records in the last six hours", records.len());
//! # Ok(())
//! # }
//! ```

use async_trait::async_trait;
use ccline_core::error::{CclineError, Result};
use ccline_core::provider::RecordSource;
use ccline_core::types::{ConversationUsage, Record, SessionId};
use chrono::{DateTime, Utc};
use futures::StreamExt;
use futures::stream::Stream;
use std::path::{Path, PathBuf};
use std::time::SystemTime;
use tokio::io::{AsyncBufReadExt, BufReader};
use tokio_stream::wrappers::SplitStream;
use tracing::{debug, trace};
use walkdir::WalkDir;

const PROJECTS_DIR: &str = "projects";

/// Loader for one or more Claude data directories
#[derive(Debug, Clone)]
pub struct DataLoader {
    claude_paths: Vec<PathBuf>,
}

impl DataLoader {
    /// Loader over a single Claude data directory (usually `~/.claude`)
    pub fn new(claude_dir: impl Into<PathBuf>) -> Self {
        Self {
            claude_paths: vec![claude_dir.into()],
        }
    }

    /// Loader over several data directories
    pub fn with_paths(claude_paths: Vec<PathBuf>) -> Self {
        Self { claude_paths }
    }

    /// `~/.claude`, if a home directory is known
    pub fn default_claude_dir() -> Option<PathBuf> {
        dirs::home_dir().map(|home| home.join(".claude"))
    }

    pub fn paths(&self) -> &[PathBuf] {
        &self.claude_paths
    }

    /// Every `projects/*/*.jsonl` file, optionally limited to recent writes
    ///
    /// Missing directories contribute no files.
    pub async fn find_jsonl_files(&self, since: Option<DateTime<Utc>>) -> Result<Vec<PathBuf>> {
        let cutoff = since.map(SystemTime::from);
        let mut jsonl_files = Vec::new();

        for base_path in &self.claude_paths {
            let projects = base_path.join(PROJECTS_DIR);
            if !projects.is_dir() {
                debug!("No projects directory under {}", base_path.display());
                continue;
            }

            let files = tokio::task::spawn_blocking(move || {
                WalkDir::new(projects)
                    .min_depth(2)
                    .max_depth(2)
                    .into_iter()
                    .filter_map(|e| e.ok())
                    .filter(|entry| entry.file_type().is_file())
                    .map(|entry| entry.into_path())
                    .filter(|path| is_jsonl(path) && modified_since(path, cutoff))
                    .collect::<Vec<_>>()
            })
            .await
            .map_err(|e| CclineError::Io(std::io::Error::other(e.to_string())))?;

            jsonl_files.extend(files);
        }

        debug!("Found {} JSONL files to scan", jsonl_files.len());
        Ok(jsonl_files)
    }

    /// Stream the records of one file
    ///
    /// Lines are split on raw bytes, so a line that is not valid UTF-8 is
    /// skipped like any other malformed line. A file that cannot be opened,
    /// or fails mid-read, simply ends the stream.
    pub fn parse_jsonl_stream(path: PathBuf) -> impl Stream<Item = Record> {
        async_stream::stream! {
            let file = match tokio::fs::File::open(&path).await {
                Ok(file) => file,
                Err(e) => {
                    debug!("Skipping unreadable file {}: {}", path.display(), e);
                    return;
                }
            };

            let mut lines = SplitStream::new(BufReader::new(file).split(b'\n'));
            let mut line_number = 0usize;
            while let Some(line) = lines.next().await {
                line_number += 1;
                let bytes = match line {
                    Ok(bytes) => bytes,
                    Err(e) => {
                        debug!("Read error in {} at line {}: {}", path.display(), line_number, e);
                        break;
                    }
                };
                // Invalid UTF-8 only spoils its own line
                let line = String::from_utf8_lossy(&bytes);
                match Record::parse_line(&line, Some(&path)) {
                    Some(record) => yield record,
                    None => trace!("Skipped line {} in {}", line_number, path.display()),
                }
            }
        }
    }

    /// All records from files touched since `since`, sorted by timestamp
    pub async fn load_records(&self, since: Option<DateTime<Utc>>) -> Result<Vec<Record>> {
        let files = self.find_jsonl_files(since).await?;
        let mut records = Vec::new();

        for path in files {
            let stream = Self::parse_jsonl_stream(path);
            tokio::pin!(stream);
            while let Some(record) = stream.next().await {
                records.push(record);
            }
        }

        // Stable, so same-instant records keep file order
        records.sort_by_key(|r| r.timestamp);
        debug!("Loaded {} records", records.len());
        Ok(records)
    }

    /// `projects/*/<session_id>.jsonl` in the first directory that has it
    pub async fn find_session_transcript(&self, session_id: &SessionId) -> Option<PathBuf> {
        let file_name = format!("{}.jsonl", session_id.as_str());
        let roots: Vec<PathBuf> = self
            .claude_paths
            .iter()
            .map(|p| p.join(PROJECTS_DIR))
            .collect();

        tokio::task::spawn_blocking(move || {
            roots.into_iter().find_map(|projects| {
                WalkDir::new(projects)
                    .min_depth(2)
                    .max_depth(2)
                    .into_iter()
                    .filter_map(|e| e.ok())
                    .find(|entry| entry.file_name().to_str() == Some(file_name.as_str()))
                    .map(|entry| entry.into_path())
            })
        })
        .await
        .ok()
        .flatten()
    }

    /// Conversation totals from one transcript; zeros when it cannot be read
    pub async fn load_conversation_usage(path: &Path) -> ConversationUsage {
        let mut usage = ConversationUsage::default();
        let stream = Self::parse_jsonl_stream(path.to_path_buf());
        tokio::pin!(stream);
        while let Some(record) = stream.next().await {
            usage.observe(&record);
        }
        usage
    }
}

#[async_trait]
impl RecordSource for DataLoader {
    async fn load_records(&self, since: Option<DateTime<Utc>>) -> Result<Vec<Record>> {
        DataLoader::load_records(self, since).await
    }

    async fn find_session_transcript(&self, session_id: &SessionId) -> Option<PathBuf> {
        DataLoader::find_session_transcript(self, session_id).await
    }
}

fn is_jsonl(path: &Path) -> bool {
    path.extension().and_then(|s| s.to_str()) == Some("jsonl")
}

fn modified_since(path: &Path, cutoff: Option<SystemTime>) -> bool {
    let Some(cutoff) = cutoff else {
        return true;
    };
    path.metadata()
        .and_then(|m| m.modified())
        .is_ok_and(|modified| modified >= cutoff)
}
