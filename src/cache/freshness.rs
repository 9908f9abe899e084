//! Staleness evaluation for the published dataset.
//!
//! Decides from the canonical file's modification time alone whether a
//! refresh is due. Evaluation never touches the network.

use camino::{Utf8Path, Utf8PathBuf};
use std::fs;
use std::io::ErrorKind;
use std::time::{Duration, SystemTime};
use tracing::debug;

use super::LOG_TARGET;
use crate::error::{AcquireError, Result};

/// Number of seconds in one grace-period day.
const SECONDS_PER_DAY: u64 = 86_400;

/// Outcome of a staleness evaluation.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FreshnessDecision {
    /// No file is published at the canonical path.
    Missing,
    /// A file exists but is older than the grace period, or a refresh was forced.
    Stale,
    /// A file exists and is within the grace period.
    Fresh,
}

impl FreshnessDecision {
    /// Returns `true` when the dataset must be downloaded before serving it.
    #[must_use]
    pub const fn needs_refresh(self) -> bool {
        matches!(self, Self::Missing | Self::Stale)
    }
}

/// The currently published artefact.
#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) struct CacheEntry {
    canonical_path: Utf8PathBuf,
    last_modified: SystemTime,
}

impl CacheEntry {
    /// Reads the canonical file's metadata, returning `None` when it is absent.
    ///
    /// # Errors
    ///
    /// Returns [`AcquireError::Filesystem`] when the metadata cannot be read
    /// for any reason other than the file not existing.
    pub fn inspect(canonical_path: &Utf8Path) -> Result<Option<Self>> {
        let metadata = match fs::metadata(canonical_path) {
            Ok(metadata) => metadata,
            Err(err) if err.kind() == ErrorKind::NotFound => return Ok(None),
            Err(err) => {
                return Err(AcquireError::filesystem(
                    "failed to read cached dataset metadata",
                    canonical_path,
                    err,
                ));
            }
        };
        let last_modified = metadata.modified().map_err(|err| {
            AcquireError::filesystem(
                "failed to read cached dataset modification time",
                canonical_path,
                err,
            )
        })?;
        Ok(Some(Self {
            canonical_path: canonical_path.to_path_buf(),
            last_modified,
        }))
    }

    /// Path of the published file.
    #[must_use]
    pub fn canonical_path(&self) -> &Utf8Path {
        &self.canonical_path
    }

    /// Age of the file at `now`. A modification time in the future counts as zero.
    #[must_use]
    pub fn age_at(&self, now: SystemTime) -> Duration {
        now.duration_since(self.last_modified)
            .unwrap_or(Duration::ZERO)
    }

    /// Age of the file at `now` in whole days, rounded down.
    #[must_use]
    pub fn age_days_at(&self, now: SystemTime) -> u64 {
        self.age_at(now).as_secs().div_euclid(SECONDS_PER_DAY)
    }
}

/// Evaluates whether the dataset at `canonical_path` needs a refresh.
///
/// Rules are applied in order: an absent file is [`FreshnessDecision::Missing`];
/// `force` makes an existing file [`FreshnessDecision::Stale`]; a file whose age
/// in whole days exceeds `grace_period_days` is stale; anything else is
/// [`FreshnessDecision::Fresh`].
///
/// # Errors
///
/// Returns [`AcquireError::Filesystem`] when the file's metadata cannot be read.
pub fn evaluate(
    canonical_path: &Utf8Path,
    grace_period_days: u32,
    force: bool,
) -> Result<FreshnessDecision> {
    evaluate_at(canonical_path, grace_period_days, force, SystemTime::now())
}

/// Same as [`evaluate`] with an explicit clock.
///
/// # Errors
///
/// Returns [`AcquireError::Filesystem`] when the file's metadata cannot be read.
pub fn evaluate_at(
    canonical_path: &Utf8Path,
    grace_period_days: u32,
    force: bool,
    now: SystemTime,
) -> Result<FreshnessDecision> {
    let Some(entry) = CacheEntry::inspect(canonical_path)? else {
        debug!(target: LOG_TARGET, path = %canonical_path, "cached dataset missing");
        return Ok(FreshnessDecision::Missing);
    };

    if force {
        debug!(target: LOG_TARGET, path = %entry.canonical_path(), "refresh forced");
        return Ok(FreshnessDecision::Stale);
    }

    let age_days = entry.age_days_at(now);
    let decision = if age_days > u64::from(grace_period_days) {
        FreshnessDecision::Stale
    } else {
        FreshnessDecision::Fresh
    };
    debug!(
        target: LOG_TARGET,
        path = %entry.canonical_path(),
        age_days,
        grace_period_days,
        ?decision,
        "evaluated cached dataset age"
    );
    Ok(decision)
}
