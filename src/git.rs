//! Git branch and working-tree status for line 1
//!
//! The branch comes straight from `.git/HEAD`, so a repository without a
//! `git` binary still shows it. Status counts need `git status --porcelain`,
//! which is given one second before the probe gives up.

use crate::command::run_with_timeout;
use std::path::{Path, PathBuf};
use std::time::Duration;
use tokio::process::Command;
use tracing::debug;

const STATUS_TIMEOUT: Duration = Duration::from_secs(1);

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct GitInfo {
    /// `None` outside a repository or on a detached HEAD
    pub branch: Option<String>,
    pub modified: usize,
    pub untracked: usize,
}

impl GitInfo {
    /// Probe the repository at `dir`; any failure yields an empty result
    pub async fn probe(dir: &Path) -> Self {
        let Some(git_dir) = resolve_git_dir(dir).await else {
            return Self::default();
        };
        let branch = tokio::fs::read_to_string(git_dir.join("HEAD"))
            .await
            .ok()
            .and_then(|head| parse_head(&head));
        let (modified, untracked) = porcelain_status(dir).await.unwrap_or_default();
        Self {
            branch,
            modified,
            untracked,
        }
    }
}

/// `.git` is either the git directory or a file pointing at one (worktrees)
async fn resolve_git_dir(dir: &Path) -> Option<PathBuf> {
    let dot_git = dir.join(".git");
    let metadata = tokio::fs::metadata(&dot_git).await.ok()?;
    if metadata.is_dir() {
        return Some(dot_git);
    }
    let content = tokio::fs::read_to_string(&dot_git).await.ok()?;
    let target = content.trim().strip_prefix("gitdir:")?.trim();
    let target = Path::new(target);
    Some(if target.is_absolute() {
        target.to_path_buf()
    } else {
        dir.join(target)
    })
}

/// Branch name from the contents of `HEAD`
pub fn parse_head(head: &str) -> Option<String> {
    head.trim()
        .strip_prefix("ref: refs/heads/")
        .filter(|name| !name.is_empty())
        .map(str::to_string)
}

/// `(modified, untracked)` counts from `git status --porcelain` output
pub fn parse_porcelain(output: &str) -> (usize, usize) {
    output.lines().fold((0, 0), |(modified, untracked), line| {
        if line.starts_with(" M") || line.starts_with('M') {
            (modified + 1, untracked)
        } else if line.starts_with("??") {
            (modified, untracked + 1)
        } else {
            (modified, untracked)
        }
    })
}

async fn porcelain_status(dir: &Path) -> Option<(usize, usize)> {
    let mut command = Command::new("git");
    command.args(["status", "--porcelain"]).current_dir(dir);

    run_with_timeout(command, STATUS_TIMEOUT)
        .await
        .inspect_err(|e| debug!("git status unavailable: {}", e))
        .ok()
        .map(|out| parse_porcelain(&out))
}
