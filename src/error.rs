#[cfg(doc)]
use crate::{Warded, Warden};
use thiserror::Error;

/// The reason an acquisition failed.
///
/// Acquisitions never panic. Every accessor on [`Warded`] returns a
/// `Result` and the caller decides how to react to a refused lock.
#[derive(Copy, Clone, Debug, PartialEq, Eq, Error)]
pub enum AcquireError {
    /// The thread's [`Warden`] vetoed the acquisition because the locks the
    /// thread already holds could otherwise end up in a deadlocked lock
    /// graph.
    #[error("the warden refused the lock")]
    Refused,
    /// A `try_` accessor was used and the lock could not be granted without
    /// waiting.
    #[error("the lock is busy")]
    WouldBlock,
    /// The lock can never be granted in the requested mode, either because
    /// the container uses the broken strategy or because the strategy does
    /// not support the mode at all.
    #[error("the lock is broken")]
    Broken,
}
