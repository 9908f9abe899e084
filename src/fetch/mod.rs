//! Retry-backed download of a remote resource into a private staging file.
//!
//! The fetcher never touches the canonical cache path. It streams the response
//! into a uniquely named [`StagingFile`] beside it and hands that file back
//! only once the payload is complete and synced; every failure path drops the
//! staging file, which deletes it.

mod retry;
mod staging;
mod transport;

pub use retry::{FetchState, RetryBudget, RetryPolicy};
pub use staging::StagingFile;
pub use transport::{HttpTransport, Transport};

pub(crate) use staging::{STAGING_MARKER, split_canonical};

use camino::Utf8Path;
use std::io::{ErrorKind, Read};
use std::thread;
use std::time::{Duration, Instant};
use tracing::{debug, info, warn};

use crate::cancel::CancelToken;
use crate::error::{AcquireError, Result, TransportError};

/// Observability target for fetch operations.
const LOG_TARGET: &str = "sch_datasets::fetch";

/// Size of each body chunk copied into the staging file.
const CHUNK_SIZE: usize = 64 * 1024;

/// Longest uninterrupted sleep while waiting to retry.
const CANCEL_POLL_INTERVAL: Duration = Duration::from_millis(100);

/// Downloads `url` into a new staging file beside `canonical`.
///
/// The staging file is named after `canonical`'s file name, never after the
/// URL, so it matches the dataset it will replace.
///
/// Transient transport failures are retried up to `policy.max_retries()`
/// times, each retry preceded by a warning and a pause of `policy.delay()`.
/// Permanent failures, local write errors and cancellation abort immediately.
///
/// # Errors
///
/// - [`AcquireError::DownloadFailed`] when the retries are exhausted or the
///   request cannot be built
/// - [`AcquireError::Filesystem`] when the staging file cannot be created,
///   written or synced
/// - [`AcquireError::Cancelled`] when `cancel` fires
///
/// In every error case the staging file has already been deleted.
pub fn fetch<T: Transport + ?Sized>(
    transport: &T,
    url: &str,
    canonical: &Utf8Path,
    policy: &RetryPolicy,
    cancel: &CancelToken,
) -> Result<StagingFile> {
    let mut staging = StagingFile::beside(canonical)?;
    let mut budget = RetryBudget::new(policy);
    let mut last_error: Option<TransportError> = None;
    let mut state = FetchState::start();

    debug!(
        target: LOG_TARGET,
        url,
        staging = %staging.path(),
        max_retries = policy.max_retries(),
        "starting download"
    );

    loop {
        state = match state {
            FetchState::Attempting { attempt } => {
                ensure_not_cancelled(cancel, url, attempt)?;
                match attempt_transfer(transport, url, &mut staging, cancel, attempt) {
                    Ok(bytes) => {
                        debug!(target: LOG_TARGET, url, attempt, bytes, "transfer complete");
                        FetchState::Succeeded { attempts: attempt }
                    }
                    Err(AttemptError::Network(err)) if err.is_transient() => {
                        last_error = Some(err);
                        budget.after_transient_failure(attempt)
                    }
                    Err(AttemptError::Network(err)) => {
                        return Err(download_failed(url, attempt, err));
                    }
                    Err(AttemptError::Local(err)) => return Err(err),
                }
            }
            FetchState::Retrying { attempt, remaining } => {
                warn!(
                    target: LOG_TARGET,
                    url,
                    attempt,
                    remaining,
                    error = last_error.as_ref().map(tracing::field::display),
                    "retrying download"
                );
                pause(policy.delay(), cancel, url, attempt)?;
                staging.truncate()?;
                FetchState::next_attempt(attempt)
            }
            FetchState::Succeeded { attempts } => {
                staging.sync()?;
                info!(
                    target: LOG_TARGET,
                    url,
                    attempts,
                    staging = %staging.path(),
                    "download staged"
                );
                return Ok(staging);
            }
            FetchState::Exhausted { attempts } => {
                let err = last_error
                    .take()
                    .unwrap_or_else(|| TransportError::transient("retry budget exhausted"));
                return Err(download_failed(url, attempts, err));
            }
        };
    }
}

/// Failure of a single attempt, split by whether it may be retried.
enum AttemptError {
    Network(TransportError),
    Local(AcquireError),
}

/// Streams one response body into `staging`, returning the byte count.
fn attempt_transfer<T: Transport + ?Sized>(
    transport: &T,
    url: &str,
    staging: &mut StagingFile,
    cancel: &CancelToken,
    attempt: u32,
) -> std::result::Result<u64, AttemptError> {
    let mut body = transport.open(url).map_err(AttemptError::Network)?;
    let mut buffer = vec![0_u8; CHUNK_SIZE];
    let mut written: u64 = 0;

    loop {
        ensure_not_cancelled(cancel, url, attempt).map_err(AttemptError::Local)?;
        let read = match body.read(&mut buffer) {
            Ok(0) => return Ok(written),
            Ok(read) => read,
            Err(err) if err.kind() == ErrorKind::Interrupted => continue,
            Err(err) => {
                return Err(AttemptError::Network(
                    TransportError::transient(format!("failed to read response body from {url}"))
                        .with_source(err),
                ));
            }
        };
        let chunk = buffer.get(..read).unwrap_or_default();
        staging.write_chunk(chunk).map_err(AttemptError::Local)?;
        written = written.saturating_add(u64::try_from(read).unwrap_or(u64::MAX));
    }
}

fn ensure_not_cancelled(cancel: &CancelToken, url: &str, attempt: u32) -> Result<()> {
    if cancel.is_cancelled() {
        warn!(target: LOG_TARGET, url, attempt, "download cancelled");
        return Err(AcquireError::Cancelled {
            url: url.to_owned(),
            attempts: attempt,
        });
    }
    Ok(())
}

/// Sleeps for `delay`, waking periodically to honour cancellation.
fn pause(delay: Duration, cancel: &CancelToken, url: &str, attempt: u32) -> Result<()> {
    let started = Instant::now();
    loop {
        ensure_not_cancelled(cancel, url, attempt)?;
        let remaining = delay.saturating_sub(started.elapsed());
        if remaining.is_zero() {
            return Ok(());
        }
        thread::sleep(remaining.min(CANCEL_POLL_INTERVAL));
    }
}

fn download_failed(url: &str, attempts: u32, source: TransportError) -> AcquireError {
    AcquireError::DownloadFailed {
        url: url.to_owned(),
        attempts,
        source,
    }
}
