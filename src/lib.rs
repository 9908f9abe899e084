//! Keeps a local copy of a remotely published dataset current.
//!
//! The library resolves a data home, decides whether the cached copy is
//! missing or older than its grace period, downloads a replacement with
//! bounded retries into a private staging file, and atomically renames it
//! over the canonical path. Readers of the canonical path never observe a
//! partially written file.

mod acquire;
mod cache;
mod cancel;
mod dataset;
mod error;
mod fetch;
mod fs;
#[doc(hidden)]
pub mod test_support;

pub use acquire::{AcquireOptions, Acquirer, fetch_sch_database};
pub use cache::{
    DATA_HOME_ENV, DataHomeLayout, FreshnessDecision, ensure_data_home, resolve_data_home,
};
pub use cancel::{CancelToken, install_interrupt_handler, interrupted};
pub use dataset::{RemoteDataset, SCH_BASE_URL, SCH_FILENAME};
pub use error::{
    AcquireError, AcquireErrorKind, ConfigError, ConfigResult, Result, TransportError,
    TransportErrorKind,
};
pub use fetch::{HttpTransport, RetryPolicy, Transport};

use color_eyre::eyre::eyre;
use ortho_config::OrthoConfig;
use serde::{Deserialize, Serialize};

use camino::Utf8PathBuf;
use std::ffi::OsString;
use std::time::Duration;

/// Captures dataset settings supplied via `SCH_*` environment variables.
#[derive(Debug, Clone, Serialize, Deserialize, OrthoConfig, Default)]
#[ortho_config(prefix = "SCH")]
///
/// # Examples
/// ```
/// use sch_datasets::DatasetsCfg;
///
/// let cfg = DatasetsCfg::default();
/// assert!(cfg.datahome.is_none());
/// assert!(cfg.retries.is_none());
/// ```
pub struct DatasetsCfg {
    /// Data home root; the SCH archive is cached in its `sch` subdirectory.
    pub datahome: Option<Utf8PathBuf>,
    /// Base URL the archive is downloaded from.
    pub url: Option<String>,
    /// Age in whole days after which the cached archive is refreshed.
    pub grace_period_days: Option<u32>,
    /// Retries allowed after the first download attempt.
    pub retries: Option<u32>,
    /// Pause between download attempts, in seconds.
    pub retry_delay_secs: Option<f64>,
    /// Bound on a single HTTP request, in seconds.
    pub timeout_secs: Option<u64>,
    /// Whether a missing archive may be downloaded.
    pub download_if_missing: Option<bool>,
    /// Whether the archive is refreshed regardless of age.
    pub force_download: Option<bool>,
}

impl DatasetsCfg {
    /// Loads configuration from environment variables without parsing CLI arguments.
    ///
    /// # Errors
    ///
    /// Returns a [`ConfigError`] when a variable cannot be parsed.
    pub fn load() -> ConfigResult<Self> {
        let args = [OsString::from("sch-datasets")];
        Self::load_from_iter(args).map_err(|err| ConfigError::from(eyre!(err)))
    }

    /// Builds acquisition options, creating the data home layout on disk.
    ///
    /// # Errors
    ///
    /// Returns [`AcquireError::Config`] when the retry delay is negative or
    /// not finite, and [`AcquireError::Filesystem`] when the data home cannot
    /// be created.
    pub fn to_options(&self) -> Result<AcquireOptions> {
        let policy = self.retry_policy()?;
        let root = resolve_data_home(self.datahome.as_deref());
        let layout = DataHomeLayout::ensure(root)?;

        let mut options = AcquireOptions::new(layout.sch()).with_retry_policy(policy);
        if let Some(days) = self.grace_period_days {
            options = options.with_grace_period_days(days);
        }
        if let Some(enabled) = self.download_if_missing {
            options = options.with_download_if_missing(enabled);
        }
        if let Some(enabled) = self.force_download {
            options = options.with_force_download(enabled);
        }
        Ok(options)
    }

    /// Describes the SCH archive, honouring a configured base URL.
    #[must_use]
    pub fn to_dataset(&self) -> RemoteDataset {
        match self.url.as_deref().map(str::trim) {
            Some(url) if !url.is_empty() => RemoteDataset::sch().with_base_url(url),
            _ => RemoteDataset::sch(),
        }
    }

    /// Builds the HTTP transport with the configured timeout.
    ///
    /// # Errors
    ///
    /// Returns a [`ConfigError`] when the timeout is zero or the HTTP client
    /// cannot be initialised.
    pub fn to_transport(&self) -> ConfigResult<HttpTransport> {
        let timeout = match self.timeout_secs {
            Some(0) => return Err(ConfigError::from(eyre!("SCH_TIMEOUT_SECS must be positive"))),
            Some(secs) => Duration::from_secs(secs),
            None => HttpTransport::DEFAULT_TIMEOUT,
        };
        HttpTransport::with_timeout(timeout).map_err(|err| ConfigError::from(eyre!(err)))
    }

    fn retry_policy(&self) -> ConfigResult<RetryPolicy> {
        let retries = self.retries.unwrap_or(RetryPolicy::DEFAULT_MAX_RETRIES);
        self.retry_delay_secs.map_or_else(
            || Ok(RetryPolicy::new(retries, RetryPolicy::DEFAULT_DELAY)),
            |secs| RetryPolicy::from_secs_f64(retries, secs),
        )
    }
}
