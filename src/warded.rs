use {
    crate::{
        error::AcquireError,
        guard::{LockHold, ReadGuard, WriteGuard},
        multi::MultiLock,
        raw::{RawLock, Strategy},
        warden::{Mode, Warden},
    },
    debug_fn::debug_fn,
    static_assertions::assert_impl_all,
    std::{
        cell::UnsafeCell,
        fmt::{Debug, Formatter},
        ptr::{self, NonNull},
    },
};


/// A value bound to the lock that protects it.
///
/// The contained value is only reachable through a guard, so it is
/// impossible to read or mutate it without holding a compatible lock. The
/// lock flavor is chosen with a [`Strategy`] at construction and cannot
/// change afterwards.
///
/// Accessors come in three families, each with a blocking and a `try_`
/// variant:
///
/// - [`read`](Self::read) and [`write`](Self::write) take the lock without
///   any deadlock prevention.
/// - [`read_with`](Self::read_with) and [`write_with`](Self::write_with)
///   route the acquisition through the calling thread's [`Warden`], which
///   refuses locks that could deadlock.
/// - [`read_multi`](Self::read_multi) and [`write_multi`](Self::write_multi)
///   additionally pass through a [`MultiLock`], allowing some thread to
///   claim the multi-lock and take several containers at once.
///
/// # Example
///
/// ```
/// use std::thread;
/// use warded::Warded;
///
/// let counter = Warded::new(0);
/// thread::scope(|scope| {
///     for _ in 0..4 {
///         scope.spawn(|| {
///             *counter.write().unwrap() += 1;
///         });
///     }
/// });
/// assert_eq!(counter.into_inner(), 4);
/// ```
pub struct Warded<T>
where
    T: ?Sized,
{
    lock: RawLock,
    value: UnsafeCell<T>,
}

assert_impl_all!(Warded<u32>: Send, Sync);

// SAFETY: - The container owns the value and a write guard can move `&mut T`
//           access to whichever thread holds it, so sending the container
//           itself requires T: Send.
unsafe impl<T> Send for Warded<T> where T: ?Sized + Send {}

// SAFETY: - Sharing the container shares `&T` through read guards on
//           multiple threads at once (T: Sync) and hands `&mut T` to single
//           threads through write guards (T: Send).
//         - The lock state itself is either atomic or behind a mutex.
unsafe impl<T> Sync for Warded<T> where T: ?Sized + Send + Sync {}

impl<T> Warded<T> {
    /// Creates a container with the default read/write lock strategy.
    pub const fn new(value: T) -> Self {
        Self::with_strategy(value, Strategy::ReadWrite)
    }

    /// Creates a container with the given lock strategy.
    ///
    /// # Example
    ///
    /// ```
    /// use warded::{Strategy, Warded};
    ///
    /// let container = Warded::with_strategy(1, Strategy::ReadOnly);
    /// assert!(container.read().is_ok());
    /// assert!(container.write().is_err());
    /// ```
    pub const fn with_strategy(value: T, strategy: Strategy) -> Self {
        Warded {
            lock: RawLock::new(strategy),
            value: UnsafeCell::new(value),
        }
    }

    /// Unwraps the value, consuming the container.
    pub fn into_inner(self) -> T {
        self.value.into_inner()
    }
}

impl<T> Warded<T>
where
    T: ?Sized,
{
    /// Returns the lock strategy this container was created with.
    pub fn strategy(&self) -> Strategy {
        self.lock.strategy()
    }

    /// Creates a warden whose policy matches this container's strategy.
    ///
    /// # Example
    ///
    /// ```
    /// use warded::{Policy, Strategy, Warded};
    ///
    /// let container = Warded::with_strategy(1, Strategy::ReadOnly);
    /// assert_eq!(container.new_warden().policy(), Policy::ReadOnly);
    /// ```
    pub fn new_warden(&self) -> Warden {
        Warden::new(self.lock.strategy().into())
    }

    /// Returns a mutable reference to the contained value.
    ///
    /// No lock is taken; the `&mut` receiver already proves that no guard
    /// exists.
    pub fn get_mut(&mut self) -> &mut T {
        self.value.get_mut()
    }

    /// Acquires shared access, blocking while a writer holds or awaits the
    /// lock.
    ///
    /// # Example
    ///
    /// ```
    /// use warded::Warded;
    ///
    /// let container = Warded::new(1);
    /// assert_eq!(*container.read().unwrap(), 1);
    /// ```
    pub fn read(&self) -> Result<ReadGuard<'_, T>, AcquireError> {
        self.read_guard(None, None, true)
    }

    /// Acquires shared access or fails with
    /// [`WouldBlock`](AcquireError::WouldBlock) if that would require
    /// waiting.
    pub fn try_read(&self) -> Result<ReadGuard<'_, T>, AcquireError> {
        self.read_guard(None, None, false)
    }

    /// Acquires exclusive access, blocking until all other holders have
    /// released the lock.
    ///
    /// # Example
    ///
    /// ```
    /// use warded::Warded;
    ///
    /// let container = Warded::new(1);
    /// *container.write().unwrap() = 2;
    /// assert_eq!(*container.read().unwrap(), 2);
    /// ```
    pub fn write(&self) -> Result<WriteGuard<'_, T>, AcquireError> {
        self.write_guard(None, None, true)
    }

    /// Acquires exclusive access or fails with
    /// [`WouldBlock`](AcquireError::WouldBlock) if that would require
    /// waiting.
    pub fn try_write(&self) -> Result<WriteGuard<'_, T>, AcquireError> {
        self.write_guard(None, None, false)
    }

    /// Acquires shared access through the calling thread's warden.
    ///
    /// The warden refuses the acquisition if the locks the thread already
    /// holds could lead to a deadlock; see [`Warden`].
    pub fn read_with<'a>(&'a self, warden: &'a Warden) -> Result<ReadGuard<'a, T>, AcquireError> {
        self.read_guard(None, Some(warden), true)
    }

    /// Non-blocking variant of [`read_with`](Self::read_with).
    pub fn try_read_with<'a>(
        &'a self,
        warden: &'a Warden,
    ) -> Result<ReadGuard<'a, T>, AcquireError> {
        self.read_guard(None, Some(warden), false)
    }

    /// Acquires exclusive access through the calling thread's warden.
    pub fn write_with<'a>(&'a self, warden: &'a Warden) -> Result<WriteGuard<'a, T>, AcquireError> {
        self.write_guard(None, Some(warden), true)
    }

    /// Non-blocking variant of [`write_with`](Self::write_with).
    pub fn try_write_with<'a>(
        &'a self,
        warden: &'a Warden,
    ) -> Result<WriteGuard<'a, T>, AcquireError> {
        self.write_guard(None, Some(warden), false)
    }

    /// Acquires shared access through a multi-lock and the calling thread's
    /// warden.
    ///
    /// The multi-lock is taken in read mode first and blocks while another
    /// thread has [claimed](MultiLock::claim) it. It is not recorded with
    /// the warden; it is ambient coordination, not one of the thread's held
    /// locks.
    pub fn read_multi<'a>(
        &'a self,
        multi: &'a MultiLock,
        warden: &'a Warden,
    ) -> Result<ReadGuard<'a, T>, AcquireError> {
        self.read_guard(Some(multi), Some(warden), true)
    }

    /// Non-blocking variant of [`read_multi`](Self::read_multi).
    pub fn try_read_multi<'a>(
        &'a self,
        multi: &'a MultiLock,
        warden: &'a Warden,
    ) -> Result<ReadGuard<'a, T>, AcquireError> {
        self.read_guard(Some(multi), Some(warden), false)
    }

    /// Acquires exclusive access through a multi-lock and the calling
    /// thread's warden.
    ///
    /// See [`read_multi`](Self::read_multi) for the multi-lock handling.
    pub fn write_multi<'a>(
        &'a self,
        multi: &'a MultiLock,
        warden: &'a Warden,
    ) -> Result<WriteGuard<'a, T>, AcquireError> {
        self.write_guard(Some(multi), Some(warden), true)
    }

    /// Non-blocking variant of [`write_multi`](Self::write_multi).
    pub fn try_write_multi<'a>(
        &'a self,
        multi: &'a MultiLock,
        warden: &'a Warden,
    ) -> Result<WriteGuard<'a, T>, AcquireError> {
        self.write_guard(Some(multi), Some(warden), false)
    }

    /// Copies the value of `source` into this container.
    ///
    /// The source is read-locked, then this container is write-locked, and
    /// the value is cloned across. If either lock cannot be taken, this
    /// function panics by contract; only use it where nothing but a panic
    /// could follow from the failure anyway.
    #[deprecated(note = "lock failure panics; take explicit guards instead")]
    pub fn copy_from(&self, source: &Warded<T>)
    where
        T: Clone + Sized,
    {
        // Copying a container into itself would deadlock on its own lock.
        if ptr::eq(self, source) {
            return;
        }
        let from = source.read().expect("source container cannot be locked");
        let mut to = self.write().expect("destination container cannot be locked");
        (*to).clone_from(&from);
    }

    fn read_guard<'a>(
        &'a self,
        multi: Option<&'a MultiLock>,
        warden: Option<&'a Warden>,
        block: bool,
    ) -> Result<ReadGuard<'a, T>, AcquireError> {
        let hold = self.hold(multi, warden, Mode::Read, block)?;
        // SAFETY: - UnsafeCell::get never returns null.
        let value = unsafe { NonNull::new_unchecked(self.value.get()) };
        Ok(ReadGuard::new(hold, value))
    }

    fn write_guard<'a>(
        &'a self,
        multi: Option<&'a MultiLock>,
        warden: Option<&'a Warden>,
        block: bool,
    ) -> Result<WriteGuard<'a, T>, AcquireError> {
        let hold = self.hold(multi, warden, Mode::Write, block)?;
        // SAFETY: - Dito.
        let value = unsafe { NonNull::new_unchecked(self.value.get()) };
        Ok(WriteGuard::new(hold, value))
    }

    fn hold<'a>(
        &'a self,
        multi: Option<&'a MultiLock>,
        warden: Option<&'a Warden>,
        mode: Mode,
        block: bool,
    ) -> Result<LockHold<'a>, AcquireError> {
        LockHold::acquire(&self.lock, multi.map(MultiLock::raw), warden, mode, block)
    }

    #[cfg(test)]
    pub(crate) fn raw(&self) -> &RawLock {
        &self.lock
    }
}

impl<T> Default for Warded<T>
where
    T: Default,
{
    fn default() -> Self {
        Self::new(T::default())
    }
}

impl<T> From<T> for Warded<T> {
    fn from(value: T) -> Self {
        Self::new(value)
    }
}

impl<T> Debug for Warded<T>
where
    T: ?Sized + Debug,
{
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Warded")
            .field("strategy", &self.strategy())
            .field(
                "value",
                &debug_fn(|fmt| {
                    if let Ok(guard) = self.try_read() {
                        Debug::fmt(&*guard, fmt)
                    } else {
                        fmt.write_str("<locked>")
                    }
                }),
            )
            .finish_non_exhaustive()
    }
}
