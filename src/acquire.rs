//! Orchestrates freshness checks, downloads and publishing for one dataset.

use camino::{Utf8Path, Utf8PathBuf};
use color_eyre::eyre::eyre;
use tracing::{debug, info};

use crate::cache::{DatasetSlot, FreshnessDecision, ensure_data_home, evaluate, publish};
use crate::cancel::CancelToken;
use crate::dataset::RemoteDataset;
use crate::error::{AcquireError, ConfigError, Result};
use crate::fetch::{HttpTransport, RetryPolicy, Transport, fetch};
use crate::fs::ensure_dir_exists;

const LOG_TARGET: &str = "sch_datasets::acquire";

/// Per-call settings for [`Acquirer::acquire`].
///
/// # Examples
///
/// ```
/// use sch_datasets::{AcquireOptions, RetryPolicy};
///
/// let options = AcquireOptions::new("/srv/sch")
///     .with_grace_period_days(30)
///     .with_force_download(true);
/// assert_eq!(options.grace_period_days(), 30);
/// assert!(options.force_download());
/// assert!(options.download_if_missing());
/// assert_eq!(options.retry_policy(), &RetryPolicy::default());
/// ```
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AcquireOptions {
    cache_dir: Utf8PathBuf,
    grace_period_days: u32,
    download_if_missing: bool,
    force_download: bool,
    retry_policy: RetryPolicy,
}

impl AcquireOptions {
    /// Age in whole days after which a cached dataset is refreshed by default.
    pub const DEFAULT_GRACE_PERIOD_DAYS: u32 = 180;

    /// Options caching into `cache_dir` with every other setting defaulted.
    #[must_use]
    pub fn new(cache_dir: impl Into<Utf8PathBuf>) -> Self {
        Self {
            cache_dir: cache_dir.into(),
            grace_period_days: Self::DEFAULT_GRACE_PERIOD_DAYS,
            download_if_missing: true,
            force_download: false,
            retry_policy: RetryPolicy::default(),
        }
    }

    /// Options caching directly into the resolved data home, which is created
    /// when absent.
    ///
    /// # Errors
    ///
    /// Returns [`AcquireError::Filesystem`] when the data home cannot be
    /// created.
    pub fn from_data_home(explicit: Option<&Utf8Path>) -> Result<Self> {
        ensure_data_home(explicit).map(Self::new)
    }

    /// Sets the grace period in whole days.
    #[must_use]
    pub const fn with_grace_period_days(mut self, days: u32) -> Self {
        self.grace_period_days = days;
        self
    }

    /// Sets whether a missing dataset may be downloaded.
    #[must_use]
    pub const fn with_download_if_missing(mut self, enabled: bool) -> Self {
        self.download_if_missing = enabled;
        self
    }

    /// Sets whether an existing dataset is refreshed regardless of age.
    #[must_use]
    pub const fn with_force_download(mut self, enabled: bool) -> Self {
        self.force_download = enabled;
        self
    }

    /// Replaces the retry policy.
    #[must_use]
    pub const fn with_retry_policy(mut self, policy: RetryPolicy) -> Self {
        self.retry_policy = policy;
        self
    }

    /// Directory holding the canonical file and its staging files.
    #[must_use]
    pub fn cache_dir(&self) -> &Utf8Path {
        &self.cache_dir
    }

    /// Grace period in whole days.
    #[must_use]
    pub const fn grace_period_days(&self) -> u32 {
        self.grace_period_days
    }

    /// Whether a missing dataset may be downloaded.
    #[must_use]
    pub const fn download_if_missing(&self) -> bool {
        self.download_if_missing
    }

    /// Whether an existing dataset is refreshed regardless of age.
    #[must_use]
    pub const fn force_download(&self) -> bool {
        self.force_download
    }

    /// Retry policy applied to downloads.
    #[must_use]
    pub const fn retry_policy(&self) -> &RetryPolicy {
        &self.retry_policy
    }
}

/// Makes a current copy of a remote dataset available locally.
#[derive(Debug)]
pub struct Acquirer<T> {
    transport: T,
    cancel: CancelToken,
}

impl<T: Transport> Acquirer<T> {
    /// Creates an acquirer fetching through `transport`.
    #[must_use]
    pub fn new(transport: T) -> Self {
        Self {
            transport,
            cancel: CancelToken::new(),
        }
    }

    /// Attaches a token that aborts in-flight downloads when cancelled.
    #[must_use]
    pub fn with_cancel(mut self, cancel: CancelToken) -> Self {
        self.cancel = cancel;
        self
    }

    /// Borrows the underlying transport.
    #[must_use]
    pub const fn transport(&self) -> &T {
        &self.transport
    }

    /// Returns the canonical path of `dataset`, downloading it first when it
    /// is missing, older than the grace period, or a refresh is forced.
    ///
    /// A fresh cached copy is returned without any network access. On every
    /// failure the previously published file, if any, is left untouched.
    ///
    /// # Errors
    ///
    /// - [`AcquireError::NotFoundLocally`] when the dataset is missing and
    ///   `download_if_missing` is disabled; nothing is created on disk
    /// - [`AcquireError::DownloadFailed`] and [`AcquireError::Cancelled`] from
    ///   the download
    /// - [`AcquireError::Filesystem`] and [`AcquireError::Integrity`] from
    ///   inspecting or publishing the cache
    pub fn acquire(
        &self,
        dataset: &RemoteDataset,
        options: &AcquireOptions,
    ) -> Result<Utf8PathBuf> {
        let slot = DatasetSlot::new(options.cache_dir(), dataset);
        let decision = evaluate(
            slot.canonical(),
            options.grace_period_days(),
            options.force_download(),
        )?;

        match decision {
            FreshnessDecision::Fresh => {
                debug!(
                    target: LOG_TARGET,
                    path = %slot.canonical(),
                    "cached dataset is fresh"
                );
                return Ok(slot.into_canonical());
            }
            FreshnessDecision::Missing if !options.download_if_missing() => {
                return Err(AcquireError::NotFoundLocally {
                    path: slot.into_canonical(),
                });
            }
            FreshnessDecision::Missing | FreshnessDecision::Stale => {}
        }

        let url = dataset.url();
        info!(
            target: LOG_TARGET,
            url = %url,
            path = %slot.canonical(),
            reason = refresh_reason(decision, options.force_download()),
            "refreshing dataset"
        );

        ensure_dir_exists(slot.staging_dir())?;
        let staged = fetch(
            &self.transport,
            &url,
            slot.canonical(),
            options.retry_policy(),
            &self.cancel,
        )?;
        publish(staged, slot.canonical())?;
        Ok(slot.into_canonical())
    }
}

fn refresh_reason(decision: FreshnessDecision, forced: bool) -> &'static str {
    match decision {
        FreshnessDecision::Missing => "missing",
        FreshnessDecision::Stale if forced => "forced",
        FreshnessDecision::Stale | FreshnessDecision::Fresh => "expired",
    }
}

/// Acquires the SCH certified-products dataset over HTTPS.
///
/// Downloads can be interrupted with `SIGINT` once
/// [`install_interrupt_handler`](crate::install_interrupt_handler) has run.
///
/// # Errors
///
/// Returns [`AcquireError::Config`] when the HTTP client cannot be built, and
/// otherwise the errors of [`Acquirer::acquire`].
///
/// # Examples
///
/// ```no_run
/// use sch_datasets::{AcquireOptions, fetch_sch_database};
///
/// let options = AcquireOptions::from_data_home(None)?;
/// let archive = fetch_sch_database(&options)?;
/// println!("{archive}");
/// # Ok::<(), sch_datasets::AcquireError>(())
/// ```
pub fn fetch_sch_database(options: &AcquireOptions) -> Result<Utf8PathBuf> {
    let transport = HttpTransport::new().map_err(|err| ConfigError::from(eyre!(err)))?;
    Acquirer::new(transport)
        .with_cancel(CancelToken::interruptible())
        .acquire(&RemoteDataset::sch(), options)
}
