//! Advisory file locking for the central config.
//!
//! A portable `O_CREAT|O_EXCL` sentinel file holding the owner's PID.
//! Acquisition polls every 50ms for up to 5 seconds; a lock whose owner is
//! no longer alive (zero-signal probe on unix, mtime age elsewhere) is
//! considered stale and removed.

use std::path::{Path, PathBuf};
use std::time::{Duration, Instant};

use anyhow::{Context, Result};

use crate::domain::error::ConfigStoreError;

/// Total time to wait for the lock.
pub const LOCK_TIMEOUT: Duration = Duration::from_secs(5);

/// Poll interval while waiting.
pub const LOCK_RETRY: Duration = Duration::from_millis(50);

/// Age past which a lock is stale on platforms without a process probe.
const STALE_AGE: Duration = Duration::from_secs(60);

/// A held advisory lock. Dropping it removes the sentinel file.
#[derive(Debug)]
pub struct FileLock {
    path: PathBuf,
}

impl FileLock {
    /// Acquire the lock, blocking up to `LOCK_TIMEOUT`.
    ///
    /// # Errors
    ///
    /// Returns `ConfigStoreError::LockContention` when the lock stays held
    /// past the timeout, or an I/O error for anything unexpected.
    pub fn acquire(path: &Path) -> Result<Self> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)
                .with_context(|| format!("creating {}", parent.display()))?;
        }

        let deadline = Instant::now() + LOCK_TIMEOUT;
        loop {
            match try_create(path) {
                Ok(()) => return Ok(Self { path: path.to_path_buf() }),
                Err(e) if e.kind() == std::io::ErrorKind::AlreadyExists => {
                    if is_stale(path) {
                        // Dead owner: reclaim and retry immediately.
                        let _ = std::fs::remove_file(path);
                        continue;
                    }
                    if Instant::now() >= deadline {
                        return Err(ConfigStoreError::LockContention {
                            waited_ms: LOCK_TIMEOUT.as_millis() as u64,
                        }
                        .into());
                    }
                    std::thread::sleep(LOCK_RETRY);
                }
                Err(e) => {
                    return Err(anyhow::Error::from(e)
                        .context(format!("creating lock {}", path.display())));
                }
            }
        }
    }
}

impl Drop for FileLock {
    fn drop(&mut self) {
        let _ = std::fs::remove_file(&self.path);
    }
}

fn try_create(path: &Path) -> std::io::Result<()> {
    use std::io::Write;
    let mut file = std::fs::OpenOptions::new()
        .write(true)
        .create_new(true)
        .open(path)?;
    write!(file, "{}", std::process::id())?;
    Ok(())
}

/// A lock is stale when its recorded PID refers to no live process. An
/// unreadable or unparseable PID falls back to the age check.
fn is_stale(path: &Path) -> bool {
    let pid = std::fs::read_to_string(path)
        .ok()
        .and_then(|s| s.trim().parse::<u32>().ok());

    #[cfg(unix)]
    {
        if let Some(pid) = pid {
            // Zero signal: delivery is not attempted, only liveness is checked.
            let alive = unsafe { libc::kill(pid as libc::pid_t, 0) } == 0
                || std::io::Error::last_os_error().raw_os_error() == Some(libc::EPERM);
            return !alive;
        }
    }

    #[cfg(not(unix))]
    let _ = pid;

    match std::fs::metadata(path).and_then(|m| m.modified()) {
        Ok(modified) => std::time::SystemTime::now()
            .duration_since(modified)
            .map(|age| age > STALE_AGE)
            .unwrap_or(false),
        Err(_) => true,
    }
}

// ── Unit tests ───────────────────────────────────────────────────────────────
