//! Diagnostic log for errors that reach the top level
//!
//! stdout belongs to Claude Code, so failures are written to
//! `<claude_dir>/statusline-error.log` together with the payload that
//! caused them.

use chrono::Local;
use std::fs::{self, OpenOptions};
use std::io::Write;
use std::path::Path;

pub const ERROR_LOG_FILE: &str = "statusline-error.log";

/// Append one entry: local time, the full error chain and the raw input
pub fn append_error(path: &Path, error: &anyhow::Error, payload: &str) -> std::io::Result<()> {
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent)?;
    }
    let mut file = OpenOptions::new().create(true).append(true).open(path)?;
    writeln!(
        file,
        "[{}] {:?}\nInput: {}\n",
        Local::now().format("%Y-%m-%d %H:%M:%S"),
        error,
        payload.trim_end()
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use anyhow::Context;
    use tempfile::TempDir;

    #[test]
    fn test_entries_are_appended() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("nested").join(ERROR_LOG_FILE);

        let first: anyhow::Result<()> = Err(anyhow::anyhow!("disk full")).context("writing cache");
        append_error(&path, &first.unwrap_err(), "{\"session_id\":\"a\"}\n").unwrap();
        append_error(&path, &anyhow::anyhow!("second"), "").unwrap();

        let log = fs::read_to_string(&path).unwrap();
        assert!(log.contains("writing cache"));
        assert!(log.contains("disk full"));
        assert!(log.contains("Input: {\"session_id\":\"a\"}\n"));
        assert!(log.contains("second"));
        assert_eq!(log.matches("Input:").count(), 2);
    }
}
