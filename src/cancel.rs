//! Cooperative cancellation for in-flight downloads.
//!
//! A [`CancelToken`] is polled by the fetcher before every attempt, between
//! body chunks and while waiting to retry. When it fires, the fetch returns
//! [`AcquireError::Cancelled`](crate::AcquireError::Cancelled) after its
//! staging file has been removed.

use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

/// Set by the `SIGINT` handler installed through [`install_interrupt_handler`].
static INTERRUPTED: AtomicBool = AtomicBool::new(false);

/// Shared cancellation flag.
///
/// Clones observe the same flag, so one clone can be handed to a worker while
/// another stays with the caller.
///
/// # Examples
///
/// ```
/// use sch_datasets::CancelToken;
///
/// let token = CancelToken::new();
/// let worker_view = token.clone();
/// token.cancel();
/// assert!(worker_view.is_cancelled());
/// ```
#[derive(Debug, Clone, Default)]
pub struct CancelToken {
    flag: Arc<AtomicBool>,
    interruptible: bool,
}

impl CancelToken {
    /// Creates a token that only fires when [`CancelToken::cancel`] is called.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Creates a token that also fires when the process receives `SIGINT`
    /// after [`install_interrupt_handler`] has run.
    #[must_use]
    pub fn interruptible() -> Self {
        Self {
            interruptible: true,
            ..Self::default()
        }
    }

    /// Requests cancellation.
    pub fn cancel(&self) {
        self.flag.store(true, Ordering::SeqCst);
    }

    /// Returns `true` once cancellation has been requested.
    #[must_use]
    pub fn is_cancelled(&self) -> bool {
        self.flag.load(Ordering::SeqCst) || (self.interruptible && interrupted())
    }
}

/// Returns `true` once the process has received `SIGINT` with the handler installed.
#[must_use]
pub fn interrupted() -> bool {
    INTERRUPTED.load(Ordering::SeqCst)
}

/// Routes the first `SIGINT` to interruptible [`CancelToken`]s.
///
/// The handler only records the signal; downloads notice it at their next
/// checkpoint, delete their staging file and return. A second `SIGINT` uses the
/// default disposition and terminates the process.
///
/// # Errors
///
/// Returns the OS error when the signal disposition cannot be changed.
#[cfg(unix)]
pub fn install_interrupt_handler() -> std::io::Result<()> {
    use nix::sys::signal::{SaFlags, SigAction, SigHandler, SigSet, Signal, sigaction};

    extern "C" fn on_interrupt(_signal: nix::libc::c_int) {
        INTERRUPTED.store(true, Ordering::SeqCst);
    }

    let action = SigAction::new(
        SigHandler::Handler(on_interrupt),
        SaFlags::SA_RESTART | SaFlags::SA_RESETHAND,
        SigSet::empty(),
    );
    // SAFETY: `on_interrupt` only performs an atomic store, which is
    // async-signal-safe, and the previous disposition is intentionally
    // discarded.
    unsafe { sigaction(Signal::SIGINT, &action) }
        .map(drop)
        .map_err(std::io::Error::from)
}

/// Interrupt routing is only available on Unix; elsewhere this is a no-op.
///
/// # Errors
///
/// Never fails on this platform.
#[cfg(not(unix))]
pub fn install_interrupt_handler() -> std::io::Result<()> {
    Ok(())
}
