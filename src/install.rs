//! `ccline install`: point Claude Code's statusline at this binary
//!
//! Only the `statusLine` key of `settings.json` is touched. An existing file
//! is copied to `settings.json.backup` first, and a file that is not valid
//! JSON is left alone.

use ccline_core::cache::write_atomic;
use ccline_core::error::{CclineError, Result};
use serde_json::{Value, json};
use std::fs;
use std::path::{Path, PathBuf};
use tracing::debug;

use crate::cli::LineSelection;

pub const SETTINGS_FILE: &str = "settings.json";

/// What an install did (or, for a dry run, would do)
#[derive(Debug, Clone)]
pub struct InstallReport {
    pub settings_path: PathBuf,
    pub backup_path: Option<PathBuf>,
    /// A `statusLine` entry was already present and got replaced
    pub replaced_existing: bool,
    pub settings: Value,
    pub written: bool,
}

/// The command Claude Code should run
pub fn statusline_command(executable: &Path, show: Option<&LineSelection>) -> String {
    let mut command = executable.display().to_string();
    if command.contains(' ') {
        command = format!("\"{command}\"");
    }
    if let Some(show) = show.filter(|s| !s.is_all()) {
        command.push_str(&format!(" --show {show}"));
    }
    command
}

/// `settings` with its `statusLine` entry set to run `command`
pub fn apply_statusline(mut settings: Value, command: &str) -> Result<(Value, bool)> {
    let object = settings.as_object_mut().ok_or_else(|| {
        CclineError::Config("settings.json must contain a JSON object".to_string())
    })?;
    let replaced = object
        .insert(
            "statusLine".to_string(),
            json!({
                "type": "command",
                "command": command,
                "padding": 0,
            }),
        )
        .is_some();
    Ok((settings, replaced))
}

/// `<claude_dir>/settings.json`; the data directory must already exist
pub fn default_settings_path(claude_dir: &Path) -> Result<PathBuf> {
    if !claude_dir.is_dir() {
        return Err(CclineError::NoClaudeDirectory(claude_dir.to_path_buf()));
    }
    Ok(claude_dir.join(SETTINGS_FILE))
}

pub fn backup_path(settings_path: &Path) -> PathBuf {
    settings_path.with_extension("json.backup")
}

pub fn install(settings_path: &Path, command: &str, dry_run: bool) -> Result<InstallReport> {
    let existing = match fs::read_to_string(settings_path) {
        Ok(text) => Some(text),
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => None,
        Err(e) => return Err(e.into()),
    };

    let current = match &existing {
        Some(text) if !text.trim().is_empty() => serde_json::from_str(text).map_err(|e| {
            CclineError::Config(format!(
                "invalid JSON in {}: {e}. Fix it and run install again",
                settings_path.display()
            ))
        })?,
        _ => json!({}),
    };
    let (settings, replaced_existing) = apply_statusline(current, command)?;

    let mut report = InstallReport {
        settings_path: settings_path.to_path_buf(),
        backup_path: None,
        replaced_existing,
        settings,
        written: false,
    };
    if dry_run {
        return Ok(report);
    }

    if existing.is_some() {
        let backup = backup_path(settings_path);
        fs::copy(settings_path, &backup)?;
        debug!("Backed up settings to {}", backup.display());
        report.backup_path = Some(backup);
    }

    if let Some(parent) = settings_path.parent() {
        fs::create_dir_all(parent)?;
    }
    let mut body = serde_json::to_string_pretty(&report.settings)?;
    body.push('\n');
    write_atomic(settings_path, body.as_bytes())?;
    report.written = true;
    Ok(report)
}
