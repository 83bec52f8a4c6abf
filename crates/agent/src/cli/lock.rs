//! Cross-process history lock.
//!
//! Cron may start a run while the previous one is still going. Every command
//! that writes history takes an `fs2` exclusive lock on `<history>.lock`
//! first; a second process fails fast instead of interleaving appends.

use std::fs::{self, File, OpenOptions};
use std::io::Write;
use std::path::Path;

use fs2::FileExt;

/// Lock `path`, recording the current PID in it.
///
/// The lock is held as long as the returned [`File`] is alive.
pub fn acquire_history_lock(path: &Path) -> anyhow::Result<File> {
    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        fs::create_dir_all(parent)?;
    }

    let file = OpenOptions::new()
        .create(true)
        .truncate(false)
        .write(true)
        .read(true)
        .open(path)
        .map_err(|e| anyhow::anyhow!("opening lock file {}: {e}", path.display()))?;

    file.try_lock_exclusive().map_err(|_| {
        let holder = fs::read_to_string(path).unwrap_or_default();
        anyhow::anyhow!(
            "another tidings process is using this history (lock {} held by pid {})",
            path.display(),
            holder.trim()
        )
    })?;

    file.set_len(0)?;
    {
        let mut f = &file;
        writeln!(f, "{}", std::process::id())?;
        f.flush()?;
    }

    tracing::debug!(path = %path.display(), "history lock acquired");
    Ok(file)
}

// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━
// Tests
// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━
