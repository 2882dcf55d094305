#[cfg(doc)]
use crate::Warded;
use {
    crate::{
        error::AcquireError,
        guard::LockHold,
        raw::{RawLock, Strategy},
        warden::{Mode, Warden},
    },
    static_assertions::{assert_impl_all, assert_not_impl_any},
    std::fmt::{Debug, Formatter},
};

#[cfg(test)]
mod tests;

/// A process-wide coordinator for taking several containers at once.
///
/// On its own, a warden forbids most combinations of held locks, because
/// another thread could be acquiring the same containers in the opposite
/// order. The multi-lock makes such combinations safe: every `*_multi`
/// accessor on a [`Warded`] container takes the multi-lock in read mode
/// first, so a thread that [claims](Self::claim) it exclusively knows that
/// no other thread can start a new acquisition. The containers the claiming
/// thread wants are then either idle or will become idle, and the warden's
/// idle rule admits them even though the thread already holds locks.
///
/// The claim can be dropped as soon as the additional containers are
/// locked; the per-container locks stay behind.
///
/// The multi-lock is deliberately process-wide. Construct it at program
/// start (`new` is `const`, so a `static` works) and pass it by reference
/// to every thread.
///
/// # Example
///
/// ```
/// use warded::{MultiLock, Warded};
///
/// static MULTI: MultiLock = MultiLock::new();
///
/// let x = Warded::new(1);
/// let y = Warded::new(2);
/// let warden = x.new_warden();
///
/// // Claim the multi-lock, take both containers, release the claim.
/// let claim = MULTI.claim(&warden).unwrap();
/// let mut a = x.write_multi(&MULTI, &warden).unwrap();
/// let mut b = y.write_multi(&MULTI, &warden).unwrap();
/// drop(claim);
///
/// std::mem::swap(&mut *a, &mut *b);
/// drop((a, b));
///
/// assert_eq!(*x.read().unwrap(), 2);
/// assert_eq!(*y.read().unwrap(), 1);
/// ```
pub struct MultiLock {
    lock: RawLock,
}

assert_impl_all!(MultiLock: Send, Sync);

impl MultiLock {
    /// Creates a multi-lock.
    pub const fn new() -> Self {
        MultiLock {
            lock: RawLock::new(Strategy::ReadWrite),
        }
    }

    /// Claims the multi-lock exclusively, blocking until every in-flight
    /// `*_multi` acquisition has finished.
    ///
    /// While the returned guard exists, `*_multi` accessors of all other
    /// threads block before touching their container, and the claiming
    /// thread can take as many containers as it needs. The claim is
    /// recorded with the warden as a write lock.
    pub fn claim<'a>(&'a self, warden: &'a Warden) -> Result<MultiGuard<'a>, AcquireError> {
        self.claim_guard(warden, true)
    }

    /// Claims the multi-lock exclusively or fails with
    /// [`WouldBlock`](AcquireError::WouldBlock) if that would require
    /// waiting.
    pub fn try_claim<'a>(&'a self, warden: &'a Warden) -> Result<MultiGuard<'a>, AcquireError> {
        self.claim_guard(warden, false)
    }

    fn claim_guard<'a>(
        &'a self,
        warden: &'a Warden,
        block: bool,
    ) -> Result<MultiGuard<'a>, AcquireError> {
        let hold = LockHold::acquire(&self.lock, None, Some(warden), Mode::Write, block)?;
        Ok(MultiGuard { _hold: hold })
    }

    pub(crate) fn raw(&self) -> &RawLock {
        &self.lock
    }
}

impl Default for MultiLock {
    fn default() -> Self {
        Self::new()
    }
}

impl Debug for MultiLock {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("MultiLock").finish_non_exhaustive()
    }
}

/// An exclusive claim of a [`MultiLock`], released on drop.
///
/// This object is created by [`MultiLock::claim`] and has no payload; its
/// existence is what keeps other threads' `*_multi` accessors blocked.
pub struct MultiGuard<'a> {
    _hold: LockHold<'a>,
}

assert_not_impl_any!(MultiGuard<'_>: Send, Sync);

impl Debug for MultiGuard<'_> {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("MultiGuard").finish_non_exhaustive()
    }
}
