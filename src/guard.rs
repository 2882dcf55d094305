#[cfg(doc)]
use crate::Warded;
use {
    crate::{
        error::AcquireError,
        raw::RawLock,
        warden::{Mode, Warden},
    },
    opera::{PhantomNotSend, PhantomNotSync},
    static_assertions::assert_not_impl_any,
    std::{
        fmt::{Debug, Formatter},
        ops::{Deref, DerefMut},
        ptr::NonNull,
        rc::Rc,
    },
};


/// A held lock, released exactly once when dropped.
///
/// Release order is the inverse of acquisition: the container's lock first,
/// then the multi-lock read that was taken before it. The multi-lock is
/// released with a `None` warden because multi-lock reads are never
/// recorded with the warden.
pub(crate) struct LockHold<'a> {
    lock: &'a RawLock,
    multi: Option<&'a RawLock>,
    warden: Option<&'a Warden>,
    mode: Mode,
    _phantom_not_send: PhantomNotSend,
    _phantom_not_sync: PhantomNotSync,
}

impl<'a> LockHold<'a> {
    /// Takes the multi-lock in read mode as a test, then the container's
    /// lock in the requested mode.
    pub(crate) fn acquire(
        lock: &'a RawLock,
        multi: Option<&'a RawLock>,
        warden: Option<&'a Warden>,
        mode: Mode,
        block: bool,
    ) -> Result<LockHold<'a>, AcquireError> {
        if let Some(multi) = multi {
            multi.acquire(warden, Mode::Read, block, true)?;
        }
        if let Err(err) = lock.acquire(warden, mode, block, false) {
            // The multi-lock read was taken but never recorded with the
            // warden; the release mirrors that.
            if let Some(multi) = multi {
                multi.release(None, Mode::Read);
            }
            return Err(err);
        }
        Ok(LockHold {
            lock,
            multi,
            warden,
            mode,
            _phantom_not_send: Default::default(),
            _phantom_not_sync: Default::default(),
        })
    }
}

impl Drop for LockHold<'_> {
    fn drop(&mut self) {
        self.lock.release(self.warden, self.mode);
        if let Some(multi) = self.multi {
            multi.release(None, Mode::Read);
        }
    }
}

/// Shared access to the value of a [`Warded`] container.
///
/// The guard's existence represents a held read lock. Cloning the guard
/// extends the hold; the lock is released when the last clone is dropped.
/// The share count is not atomic because guards must stay on the thread
/// that acquired them, which the type enforces.
///
/// # Example
///
/// ```
/// use warded::Warded;
///
/// let container = Warded::new(1);
/// let guard = container.read().unwrap();
/// let shared = guard.clone();
/// drop(guard);
/// // The clone still holds the lock.
/// assert!(container.try_write().is_err());
/// drop(shared);
/// assert!(container.try_write().is_ok());
/// ```
pub struct ReadGuard<'a, T>
where
    T: ?Sized,
{
    hold: Rc<LockHold<'a>>,
    value: NonNull<T>,
}

/// Exclusive access to the value of a [`Warded`] container.
///
/// The guard's existence represents a held write lock; the lock is released
/// when the guard is dropped. Unlike [`ReadGuard`], the guard cannot be
/// cloned: it hands out `&mut` to the value, which must stay unique.
///
/// # Example
///
/// ```
/// use warded::Warded;
///
/// let container = Warded::new(1);
/// let mut guard = container.write().unwrap();
/// *guard = 2;
/// drop(guard);
/// assert_eq!(*container.read().unwrap(), 2);
/// ```
pub struct WriteGuard<'a, T>
where
    T: ?Sized,
{
    _hold: LockHold<'a>,
    value: NonNull<T>,
}

assert_not_impl_any!(LockHold<'_>: Send, Sync);
assert_not_impl_any!(ReadGuard<'_, ()>: Send, Sync);
assert_not_impl_any!(WriteGuard<'_, ()>: Send, Sync);

impl<'a, T> ReadGuard<'a, T>
where
    T: ?Sized,
{
    pub(crate) fn new(hold: LockHold<'a>, value: NonNull<T>) -> Self {
        ReadGuard {
            hold: Rc::new(hold),
            value,
        }
    }
}

impl<'a, T> WriteGuard<'a, T>
where
    T: ?Sized,
{
    pub(crate) fn new(hold: LockHold<'a>, value: NonNull<T>) -> Self {
        WriteGuard { _hold: hold, value }
    }
}

impl<T> Clone for ReadGuard<'_, T>
where
    T: ?Sized,
{
    fn clone(&self) -> Self {
        ReadGuard {
            hold: self.hold.clone(),
            value: self.value,
        }
    }
}

impl<T> Deref for ReadGuard<'_, T>
where
    T: ?Sized,
{
    type Target = T;

    fn deref(&self) -> &T {
        // SAFETY: - The hold keeps the container's lock in read mode for as
        //           long as any share of this guard exists.
        //         - The lock admits no writer in the meantime, so no `&mut`
        //           to the value can exist.
        unsafe { self.value.as_ref() }
    }
}

impl<T> Deref for WriteGuard<'_, T>
where
    T: ?Sized,
{
    type Target = T;

    fn deref(&self) -> &T {
        // SAFETY: - The hold keeps the container's lock in write mode for
        //           as long as this guard exists, and the guard cannot be
        //           cloned.
        //         - No other reference to the value can exist.
        unsafe { self.value.as_ref() }
    }
}

impl<T> DerefMut for WriteGuard<'_, T>
where
    T: ?Sized,
{
    fn deref_mut(&mut self) -> &mut T {
        // SAFETY: - Dito, and the `&mut self` receiver makes this borrow
        //           exclusive among uses of the guard itself.
        unsafe { self.value.as_mut() }
    }
}

impl<T> Debug for ReadGuard<'_, T>
where
    T: ?Sized + Debug,
{
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        Debug::fmt(&**self, f)
    }
}

impl<T> Debug for WriteGuard<'_, T>
where
    T: ?Sized + Debug,
{
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        Debug::fmt(&**self, f)
    }
}
