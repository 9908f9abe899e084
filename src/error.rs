//! Domain error types for dataset acquisition.

use camino::{Utf8Path, Utf8PathBuf};
use color_eyre::Report;
use std::error::Error as StdError;
use std::io;
use thiserror::Error;

/// Result alias for operations that may return an [`AcquireError`].
pub type Result<T> = std::result::Result<T, AcquireError>;

/// Result alias for configuration fallible operations.
pub type ConfigResult<T> = std::result::Result<T, ConfigError>;

/// Top-level error exposed by the crate.
#[derive(Debug, Error)]
pub enum AcquireError {
    /// The dataset is absent from the cache and downloading was disabled.
    #[error("{path} is not available locally; enable download_if_missing to fetch it")]
    NotFoundLocally {
        /// Canonical path that was expected to hold the dataset.
        path: Utf8PathBuf,
    },
    /// The network transfer failed permanently or exhausted its retries.
    #[error("failed to download {url} after {attempts} attempt(s)")]
    DownloadFailed {
        /// Remote location being fetched.
        url: String,
        /// Number of attempts made, including the first.
        attempts: u32,
        /// Last transport failure observed.
        #[source]
        source: TransportError,
    },
    /// A local filesystem operation failed. These are never retried.
    #[error("{context}: {path}")]
    Filesystem {
        /// Short description of the operation that failed.
        context: &'static str,
        /// Path the operation targeted.
        path: Utf8PathBuf,
        /// Underlying I/O error.
        #[source]
        source: io::Error,
    },
    /// The publish step reported success but the canonical file is missing.
    #[error("published dataset is missing from {path}; the cache storage may be corrupt")]
    Integrity {
        /// Canonical path that should exist after publishing.
        path: Utf8PathBuf,
    },
    /// The caller cancelled the download. The staging file has been removed.
    #[error("download of {url} was cancelled during attempt {attempts}")]
    Cancelled {
        /// Remote location being fetched.
        url: String,
        /// Attempt in progress when the cancellation was observed.
        attempts: u32,
    },
    /// Indicates configuration parsing or validation failed.
    #[error("configuration failed")]
    Config(#[from] ConfigError),
}

/// Categorises acquisition failures so callers can branch without matching
/// on variant payloads.
#[derive(Debug, Clone, Copy, Eq, PartialEq)]
pub enum AcquireErrorKind {
    /// See [`AcquireError::NotFoundLocally`].
    NotFoundLocally,
    /// See [`AcquireError::DownloadFailed`].
    DownloadFailed,
    /// See [`AcquireError::Filesystem`].
    Filesystem,
    /// See [`AcquireError::Integrity`].
    Integrity,
    /// See [`AcquireError::Cancelled`].
    Cancelled,
    /// See [`AcquireError::Config`].
    Config,
}

impl AcquireError {
    /// Builds a filesystem error for `path`.
    pub(crate) fn filesystem(
        context: &'static str,
        path: impl AsRef<Utf8Path>,
        source: io::Error,
    ) -> Self {
        Self::Filesystem {
            context,
            path: path.as_ref().to_path_buf(),
            source,
        }
    }

    /// Returns the semantic category for this failure.
    #[must_use]
    pub const fn kind(&self) -> AcquireErrorKind {
        match self {
            Self::NotFoundLocally { .. } => AcquireErrorKind::NotFoundLocally,
            Self::DownloadFailed { .. } => AcquireErrorKind::DownloadFailed,
            Self::Filesystem { .. } => AcquireErrorKind::Filesystem,
            Self::Integrity { .. } => AcquireErrorKind::Integrity,
            Self::Cancelled { .. } => AcquireErrorKind::Cancelled,
            Self::Config(_) => AcquireErrorKind::Config,
        }
    }
}

/// Whether a transport failure may succeed if the request is repeated.
#[derive(Debug, Clone, Copy, Eq, PartialEq)]
pub enum TransportErrorKind {
    /// Timeouts, refused connections, truncated bodies, error statuses.
    Transient,
    /// Requests that cannot be built, such as malformed URLs.
    Permanent,
}

/// Failure reported by a [`Transport`](crate::Transport) while fetching a
/// remote resource.
#[derive(Debug, Error)]
#[error("{message}")]
pub struct TransportError {
    kind: TransportErrorKind,
    message: String,
    #[source]
    source: Option<Box<dyn StdError + Send + Sync + 'static>>,
}

impl TransportError {
    /// Creates a failure that the fetcher will retry while budget remains.
    #[must_use]
    pub fn transient(message: impl Into<String>) -> Self {
        Self {
            kind: TransportErrorKind::Transient,
            message: message.into(),
            source: None,
        }
    }

    /// Creates a failure that aborts the fetch immediately.
    #[must_use]
    pub fn permanent(message: impl Into<String>) -> Self {
        Self {
            kind: TransportErrorKind::Permanent,
            message: message.into(),
            source: None,
        }
    }

    /// Attaches the underlying cause.
    #[must_use]
    pub fn with_source(mut self, source: impl Into<Box<dyn StdError + Send + Sync>>) -> Self {
        self.source = Some(source.into());
        self
    }

    /// Returns whether the failure is transient or permanent.
    #[must_use]
    pub const fn kind(&self) -> TransportErrorKind {
        self.kind
    }

    /// Returns `true` when the failure is worth retrying.
    #[must_use]
    pub const fn is_transient(&self) -> bool {
        matches!(self.kind, TransportErrorKind::Transient)
    }
}

/// Captures configuration failures.
#[derive(Debug, Error)]
#[error(transparent)]
pub struct ConfigError(#[from] Report);
