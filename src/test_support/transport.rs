//! Scripted transport standing in for the network in tests.

use std::collections::VecDeque;
use std::io::{self, Cursor, Read};
use std::sync::atomic::{AtomicU32, Ordering};
use std::sync::{Mutex, PoisonError};

use crate::error::{TransportError, TransportErrorKind};
use crate::fetch::Transport;

/// Outcome of one scripted request.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ScriptedResponse {
    /// The request succeeds with this body.
    Body(Vec<u8>),
    /// The request fails before any byte is received.
    Fail(TransportErrorKind),
    /// The request succeeds but the connection drops after these bytes.
    Truncated(Vec<u8>),
}

impl ScriptedResponse {
    /// A successful response carrying `bytes`.
    #[must_use]
    pub fn body(bytes: impl Into<Vec<u8>>) -> Self {
        Self::Body(bytes.into())
    }

    /// A failure the fetcher retries.
    #[must_use]
    pub const fn transient() -> Self {
        Self::Fail(TransportErrorKind::Transient)
    }

    /// A failure the fetcher does not retry.
    #[must_use]
    pub const fn permanent() -> Self {
        Self::Fail(TransportErrorKind::Permanent)
    }

    /// A response whose body breaks off after `bytes`.
    #[must_use]
    pub fn truncated(bytes: impl Into<Vec<u8>>) -> Self {
        Self::Truncated(bytes.into())
    }
}

/// Transport replaying a fixed list of responses in order.
///
/// Requests beyond the script fail permanently, so a test that expects no
/// network access can pass an empty script and assert on
/// [`ScriptedTransport::calls`].
#[derive(Debug, Default)]
pub struct ScriptedTransport {
    script: Mutex<VecDeque<ScriptedResponse>>,
    urls: Mutex<Vec<String>>,
    calls: AtomicU32,
}

impl ScriptedTransport {
    /// Creates a transport answering with `script`, one entry per request.
    #[must_use]
    pub fn new(script: impl IntoIterator<Item = ScriptedResponse>) -> Self {
        Self {
            script: Mutex::new(script.into_iter().collect()),
            ..Self::default()
        }
    }

    /// Number of requests made so far.
    #[must_use]
    pub fn calls(&self) -> u32 {
        self.calls.load(Ordering::SeqCst)
    }

    /// URLs requested so far, in order.
    #[must_use]
    pub fn requested_urls(&self) -> Vec<String> {
        self.urls
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    /// Responses not yet consumed.
    #[must_use]
    pub fn remaining(&self) -> usize {
        self.script
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .len()
    }
}

impl Transport for ScriptedTransport {
    fn open(&self, url: &str) -> Result<Box<dyn Read + '_>, TransportError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        self.urls
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .push(url.to_owned());
        let next = self
            .script
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .pop_front();

        match next {
            Some(ScriptedResponse::Body(bytes)) => Ok(Box::new(Cursor::new(bytes))),
            Some(ScriptedResponse::Truncated(bytes)) => {
                Ok(Box::new(Cursor::new(bytes).chain(ConnectionReset)))
            }
            Some(ScriptedResponse::Fail(TransportErrorKind::Transient)) => Err(
                TransportError::transient(format!("scripted transient failure for {url}")),
            ),
            Some(ScriptedResponse::Fail(TransportErrorKind::Permanent)) => Err(
                TransportError::permanent(format!("scripted permanent failure for {url}")),
            ),
            None => Err(TransportError::permanent(format!(
                "no scripted response left for {url}"
            ))),
        }
    }
}

/// Reader that fails as if the peer reset the connection.
struct ConnectionReset;

impl Read for ConnectionReset {
    fn read(&mut self, _buf: &mut [u8]) -> io::Result<usize> {
        Err(io::Error::new(
            io::ErrorKind::ConnectionReset,
            "connection reset mid-body",
        ))
    }
}
