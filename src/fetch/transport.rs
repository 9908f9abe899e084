//! Network transports used by the fetcher.

use reqwest::StatusCode;
use reqwest::blocking::Client;
use std::io::Read;
use std::time::Duration;

use crate::error::TransportError;

/// Opens a remote resource for reading.
///
/// The fetcher owns retries, staging and cancellation; a transport only
/// performs one request per call and classifies its failures as transient or
/// permanent. Errors raised while reading the returned body are treated as
/// transient.
pub trait Transport {
    /// Starts a transfer of `url`, returning a reader over the response body.
    ///
    /// # Errors
    ///
    /// Returns a [`TransportError`] when the request cannot be sent or the
    /// server does not answer with a success status.
    fn open(&self, url: &str) -> Result<Box<dyn Read + '_>, TransportError>;
}

impl<T: Transport + ?Sized> Transport for &T {
    fn open(&self, url: &str) -> Result<Box<dyn Read + '_>, TransportError> {
        (**self).open(url)
    }
}

/// HTTP(S) transport backed by a blocking `reqwest` client.
#[derive(Debug, Clone)]
pub struct HttpTransport {
    client: Client,
}

impl HttpTransport {
    /// Bound on a whole request, body included, unless configured otherwise.
    pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(300);

    /// Bound on establishing the connection.
    const CONNECT_TIMEOUT: Duration = Duration::from_secs(30);

    /// Creates a transport using [`HttpTransport::DEFAULT_TIMEOUT`].
    ///
    /// # Errors
    ///
    /// Returns a permanent [`TransportError`] when the HTTP client cannot be
    /// initialised, for example because the TLS backend fails to load.
    pub fn new() -> Result<Self, TransportError> {
        Self::with_timeout(Self::DEFAULT_TIMEOUT)
    }

    /// Creates a transport whose requests give up after `timeout`.
    ///
    /// # Errors
    ///
    /// Returns a permanent [`TransportError`] when the HTTP client cannot be
    /// initialised.
    pub fn with_timeout(timeout: Duration) -> Result<Self, TransportError> {
        let client = Client::builder()
            .timeout(timeout)
            .connect_timeout(Self::CONNECT_TIMEOUT.min(timeout))
            .user_agent(concat!(env!("CARGO_PKG_NAME"), "/", env!("CARGO_PKG_VERSION")))
            .build()
            .map_err(|err| {
                TransportError::permanent("failed to initialise HTTP client").with_source(err)
            })?;
        Ok(Self { client })
    }
}

impl Transport for HttpTransport {
    fn open(&self, url: &str) -> Result<Box<dyn Read + '_>, TransportError> {
        let response = self
            .client
            .get(url)
            .send()
            .map_err(|err| classify_request_error(url, err))?;
        let status = response.status();
        if !status.is_success() {
            return Err(classify_status(url, status));
        }
        Ok(Box::new(response))
    }
}

/// Only requests that could not be built, such as malformed URLs, fail the
/// same way again; everything else is retried.
fn classify_request_error(url: &str, err: reqwest::Error) -> TransportError {
    let error = if err.is_builder() {
        TransportError::permanent(format!("invalid request for {url}"))
    } else if err.is_timeout() {
        TransportError::transient(format!("request to {url} timed out"))
    } else if err.is_connect() {
        TransportError::transient(format!("failed to connect to {url}"))
    } else {
        TransportError::transient(format!("request to {url} failed"))
    };
    error.with_source(err)
}

/// Maps a non-success status to a transport failure.
///
/// Every error status is retried while budget remains, client errors
/// included.
fn classify_status(url: &str, status: StatusCode) -> TransportError {
    TransportError::transient(format!("{url} answered with HTTP {status}"))
}
