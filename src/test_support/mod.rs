//! Internal helpers re-exported for integration tests.
//!
//! Besides log capture, this module provides a scripted [`Transport`]
//! replacement and filesystem helpers for ageing cached files and spotting
//! staging files left behind by a download.
//!
//! [`Transport`]: crate::Transport

mod logging;
mod transport;

pub use logging::{capture_info_logs, capture_warn_logs};
pub use transport::{ScriptedResponse, ScriptedTransport};

use camino::{Utf8Path, Utf8PathBuf};
use filetime::{FileTime, set_file_mtime};
use std::io;
use std::time::{Duration, SystemTime};

use crate::fetch::STAGING_MARKER;

/// Lists staging files in `dir`, i.e. names containing `.part_`.
///
/// Returns an empty list when `dir` cannot be read.
#[must_use]
pub fn staging_residue(dir: &Utf8Path) -> Vec<Utf8PathBuf> {
    let Ok(entries) = dir.read_dir_utf8() else {
        return Vec::new();
    };
    let mut residue: Vec<Utf8PathBuf> = entries
        .filter_map(Result::ok)
        .filter(|entry| entry.file_name().contains(STAGING_MARKER))
        .map(|entry| entry.path().to_path_buf())
        .collect();
    residue.sort();
    residue
}

/// Sets the modification time of `path` to `age` before now.
///
/// # Errors
///
/// Returns an I/O error when the time cannot be represented or applied.
pub fn age_file(path: &Utf8Path, age: Duration) -> io::Result<()> {
    let modified = SystemTime::now()
        .checked_sub(age)
        .ok_or_else(|| io::Error::new(io::ErrorKind::InvalidInput, "age predates the epoch"))?;
    set_file_mtime(path, FileTime::from_system_time(modified))
}

/// Shorthand for a whole number of days.
#[must_use]
pub const fn days(count: u64) -> Duration {
    Duration::from_secs(count.saturating_mul(86_400))
}
