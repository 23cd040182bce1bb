//! Cross-process refresh lock
//!
//! Several statusline processes can start at once (one per terminal). Only
//! the one holding the lock may refresh an expensive cache; the others serve
//! whatever is cached. The lock file holds the owner's PID and is reclaimed
//! when that process is gone, the content is unreadable, or the file is
//! older than `max_age`.
//!
//! The file is created by hard-linking a fully written temp file, so other
//! processes never see it empty.

use std::fs;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};
use std::time::{Duration, SystemTime};
use tracing::{debug, warn};

use crate::error::Result;

/// Default age after which a lock is considered abandoned
pub const DEFAULT_LOCK_MAX_AGE: Duration = Duration::from_secs(60);

/// Held lock; the file is removed on drop if it is still ours
#[derive(Debug)]
pub struct PidLockGuard {
    path: PathBuf,
    pid: u32,
}

impl Drop for PidLockGuard {
    fn drop(&mut self) {
        if read_pid(&self.path) == Some(self.pid)
            && let Err(e) = fs::remove_file(&self.path)
        {
            warn!("Failed to release lock {}: {}", self.path.display(), e);
        }
    }
}

pub struct PidLock;

impl PidLock {
    /// Try to take the lock at `path` without waiting
    ///
    /// `Ok(None)` means a live process holds it.
    pub fn try_acquire(path: &Path, max_age: Duration) -> Result<Option<PidLockGuard>> {
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent)?;
        }
        let pid = std::process::id();

        // The pid is written to a private file first and then linked into
        // place, so the lock file never exists without its content
        let staged = staging_path(path);
        fs::write(&staged, pid.to_string())?;
        let result = Self::link_into_place(&staged, path, pid, max_age);
        if let Err(e) = fs::remove_file(&staged) {
            debug!("Failed to remove {}: {}", staged.display(), e);
        }
        result
    }

    fn link_into_place(
        staged: &Path,
        path: &Path,
        pid: u32,
        max_age: Duration,
    ) -> Result<Option<PidLockGuard>> {
        // One retry after removing a stale lock
        for _ in 0..2 {
            match fs::hard_link(staged, path) {
                Ok(()) => {
                    debug!("Acquired lock {}", path.display());
                    return Ok(Some(PidLockGuard {
                        path: path.to_path_buf(),
                        pid,
                    }));
                }
                Err(e) if e.kind() == ErrorKind::AlreadyExists => {
                    if !is_stale(path, max_age) {
                        debug!("Lock {} is held by another process", path.display());
                        return Ok(None);
                    }
                    debug!("Reclaiming stale lock {}", path.display());
                    match fs::remove_file(path) {
                        Ok(()) => {}
                        Err(e) if e.kind() == ErrorKind::NotFound => {}
                        Err(e) => return Err(e.into()),
                    }
                }
                Err(e) => return Err(e.into()),
            }
        }
        Ok(None)
    }
}

fn staging_path(path: &Path) -> PathBuf {
    let name = path
        .file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_else(|| "lock".to_string());
    path.with_file_name(format!(".{}.{}.tmp", name, uuid::Uuid::new_v4()))
}

fn read_pid(path: &Path) -> Option<u32> {
    fs::read_to_string(path).ok()?.trim().parse().ok()
}

fn is_stale(path: &Path, max_age: Duration) -> bool {
    let too_old = fs::metadata(path)
        .and_then(|m| m.modified())
        .ok()
        .and_then(|modified| SystemTime::now().duration_since(modified).ok())
        .is_some_and(|age| age > max_age);
    if too_old {
        return true;
    }
    match read_pid(path) {
        Some(pid) => !process_alive(pid),
        None => true,
    }
}

/// Whether a process with `pid` exists
#[cfg(unix)]
pub fn process_alive(pid: u32) -> bool {
    let Ok(pid) = libc::pid_t::try_from(pid) else {
        return false;
    };
    if pid <= 0 {
        return false;
    }
    // Signal 0 only checks for existence; EPERM means it exists under another user
    let rc = unsafe { libc::kill(pid, 0) };
    rc == 0 || std::io::Error::last_os_error().raw_os_error() == Some(libc::EPERM)
}

#[cfg(not(unix))]
pub fn process_alive(_pid: u32) -> bool {
    true
}
