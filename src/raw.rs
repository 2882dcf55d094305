#[cfg(doc)]
use crate::Warded;
use {
    crate::{
        error::AcquireError,
        warden::{Mode, Policy, Warden},
    },
    parking_lot::{Condvar, Mutex, RawMutex, lock_api::RawMutex as RawMutexTrait},
    std::sync::atomic::{
        AtomicBool, AtomicU32,
        Ordering::Relaxed,
    },
};


/// The lock flavor of a [`Warded`] container, chosen at construction.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum Strategy {
    /// Any number of concurrent readers or a single writer. Once a writer
    /// has declared intent, new readers queue behind it. The default.
    ReadWrite,
    /// Any number of concurrent readers and never a writer. Acquisitions
    /// never block.
    ReadOnly,
    /// A single thread at a time, with every acquisition counted as a
    /// write for deadlock-prevention purposes.
    WriteOnly,
    /// Every acquisition fails. Useful for testing pathological cases.
    Broken,
}

impl From<Strategy> for Policy {
    /// The warden policy whose rules mirror the lock strategy.
    fn from(strategy: Strategy) -> Self {
        match strategy {
            Strategy::ReadWrite => Policy::ReadWrite,
            Strategy::ReadOnly => Policy::ReadOnly,
            Strategy::WriteOnly => Policy::WriteOnly,
            Strategy::Broken => Policy::Broken,
        }
    }
}

/// The per-container lock state.
///
/// Every acquisition first consults the caller's warden, passing it whether
/// a writer is waiting on this lock (`lock_out`) and whether the lock
/// currently has any holder (`in_use`). Only after the warden permits the
/// request does the lock itself grant or queue it.
pub(crate) enum RawLock {
    Rw(RwState),
    Read(ReadState),
    Write(WriteState),
    Broken,
}

impl RawLock {
    pub(crate) const fn new(strategy: Strategy) -> Self {
        match strategy {
            Strategy::ReadWrite => RawLock::Rw(RwState {
                inner: Mutex::new(RwInner {
                    readers: 0,
                    readers_waiting: 0,
                    writer: false,
                    writer_waiting: false,
                    writer_token: 0,
                }),
                read_wait: Condvar::new(),
                write_wait: Condvar::new(),
            }),
            Strategy::ReadOnly => RawLock::Read(ReadState {
                readers: AtomicU32::new(0),
            }),
            Strategy::WriteOnly => RawLock::Write(WriteState {
                mutex: RawMutex::INIT,
                locked: AtomicBool::new(false),
            }),
            Strategy::Broken => RawLock::Broken,
        }
    }

    pub(crate) fn strategy(&self) -> Strategy {
        match self {
            RawLock::Rw(_) => Strategy::ReadWrite,
            RawLock::Read(_) => Strategy::ReadOnly,
            RawLock::Write(_) => Strategy::WriteOnly,
            RawLock::Broken => Strategy::Broken,
        }
    }

    /// Acquires the lock in the given mode.
    ///
    /// On success, a read acquisition returns the post-increment reader
    /// count and a write acquisition returns 0. With `test`, the warden is
    /// consulted but the acquisition is not recorded with it; the lock
    /// itself is taken either way.
    pub(crate) fn acquire(
        &self,
        warden: Option<&Warden>,
        mode: Mode,
        block: bool,
        test: bool,
    ) -> Result<u32, AcquireError> {
        match self {
            RawLock::Rw(rw) => rw.acquire(warden, mode, block, test),
            RawLock::Read(rd) => rd.acquire(warden, mode, test),
            RawLock::Write(wr) => wr.acquire(warden, block, test),
            RawLock::Broken => Err(AcquireError::Broken),
        }
    }

    /// Releases a lock previously acquired in the given mode and returns
    /// the post-decrement reader count.
    ///
    /// A `None` warden means the acquisition was never recorded with a
    /// warden and no warden release is owed.
    pub(crate) fn release(&self, warden: Option<&Warden>, mode: Mode) -> u32 {
        match self {
            RawLock::Rw(rw) => rw.release(warden, mode),
            RawLock::Read(rd) => rd.release(warden, mode),
            RawLock::Write(wr) => wr.release(warden),
            RawLock::Broken => unreachable!("broken locks are never held"),
        }
    }

    #[cfg(test)]
    pub(crate) fn rw(&self) -> &RwState {
        match self {
            RawLock::Rw(rw) => rw,
            _ => panic!("not a read/write lock"),
        }
    }
}

fn register(
    warden: Option<&Warden>,
    mode: Mode,
    block: bool,
    lock_out: bool,
    in_use: bool,
    test: bool,
) -> bool {
    warden.map_or(true, |warden| {
        warden.register(mode, block, lock_out, in_use, test)
    })
}

fn release_auth(warden: Option<&Warden>, mode: Mode) {
    if let Some(warden) = warden {
        warden.release(mode);
    }
}

pub(crate) struct RwInner {
    pub(crate) readers: u32,
    pub(crate) readers_waiting: u32,
    pub(crate) writer: bool,
    pub(crate) writer_waiting: bool,
    // Identity of the warden that holds the write lock, 0 if none. The
    // current writer may take reads on its own lock; the multi-lock
    // protocol depends on this.
    pub(crate) writer_token: usize,
}

pub(crate) struct RwState {
    pub(crate) inner: Mutex<RwInner>,
    read_wait: Condvar,
    write_wait: Condvar,
}

impl RwState {
    fn acquire(
        &self,
        warden: Option<&Warden>,
        mode: Mode,
        block: bool,
        test: bool,
    ) -> Result<u32, AcquireError> {
        let mut inner = self.inner.lock();
        let token = warden.map_or(0, Warden::token);
        // The current writer may take test reads on its own lock; the
        // multi-lock protocol depends on this. Only test acquisitions are
        // exempted: a recorded read next to the caller's own write guard
        // would alias the payload.
        let writer_reads = test && token != 0 && inner.writer_token == token && mode.is_read();
        // The writer's own reads are invisible to the warden, the lock is
        // effectively idle for it.
        let (lock_out, in_use) = if writer_reads {
            (false, false)
        } else {
            (inner.writer_waiting, inner.writer || inner.readers > 0)
        };
        if !register(warden, mode, block, lock_out, in_use, test) {
            return Err(AcquireError::Refused);
        }
        let must_block =
            inner.writer || inner.writer_waiting || (!mode.is_read() && inner.readers > 0);
        if !writer_reads && !block && must_block {
            if !test {
                release_auth(warden, mode);
            }
            return Err(AcquireError::WouldBlock);
        }
        match mode {
            Mode::Read => {
                inner.readers_waiting += 1;
                // The warden is expected to have refused the request if the
                // caller already holds a lock and a writer is waiting.
                if !writer_reads {
                    while inner.writer || inner.writer_waiting {
                        self.read_wait.wait(&mut inner);
                    }
                }
                inner.readers_waiting -= 1;
                inner.readers += 1;
                debug_assert!(writer_reads || (!inner.writer && !inner.writer_waiting));
                Ok(inner.readers)
            }
            Mode::Write => {
                // Line up behind any earlier writer. A write release
                // broadcasts on read_wait, which is where the queue waits.
                inner.readers_waiting += 1;
                while inner.writer_waiting {
                    self.read_wait.wait(&mut inner);
                }
                inner.readers_waiting -= 1;
                // Intent is now published, no new readers are admitted
                // until this write completes.
                inner.writer_waiting = true;
                while inner.writer || inner.readers > 0 {
                    self.write_wait.wait(&mut inner);
                }
                inner.writer_waiting = false;
                inner.writer = true;
                inner.writer_token = token;
                Ok(0)
            }
        }
    }

    fn release(&self, warden: Option<&Warden>, mode: Mode) -> u32 {
        let mut inner = self.inner.lock();
        let token = warden.map_or(0, Warden::token);
        release_auth(warden, mode);
        match mode {
            Mode::Read => {
                debug_assert!(inner.readers > 0);
                // A warden-less release can legally meet a writer: the
                // multi-lock's reads are released without a warden and may
                // outlive the claim that took them.
                debug_assert!(token == 0 || !inner.writer || inner.writer_token == token);
                inner.readers -= 1;
                if inner.readers == 0 && inner.writer_waiting {
                    self.write_wait.notify_all();
                }
                inner.readers
            }
            Mode::Write => {
                debug_assert!(inner.writer);
                debug_assert!(inner.readers == 0 || (token != 0 && inner.writer_token == token));
                inner.writer = false;
                inner.writer_token = 0;
                if inner.writer_waiting {
                    self.write_wait.notify_all();
                }
                if inner.readers_waiting > 0 {
                    self.read_wait.notify_all();
                }
                0
            }
        }
    }
}

pub(crate) struct ReadState {
    pub(crate) readers: AtomicU32,
}

impl ReadState {
    fn acquire(&self, warden: Option<&Warden>, mode: Mode, test: bool) -> Result<u32, AcquireError> {
        if !mode.is_read() {
            return Err(AcquireError::Broken);
        }
        // The lock never blocks and never admits writers, so the warden
        // sees it as idle.
        if !register(warden, mode, true, false, false, test) {
            return Err(AcquireError::Refused);
        }
        Ok(self.readers.fetch_add(1, Relaxed) + 1)
    }

    fn release(&self, warden: Option<&Warden>, mode: Mode) -> u32 {
        debug_assert!(mode.is_read());
        release_auth(warden, mode);
        let readers = self.readers.fetch_sub(1, Relaxed);
        debug_assert!(readers > 0);
        readers - 1
    }
}

pub(crate) struct WriteState {
    mutex: RawMutex,
    // Shadows the mutex for warden hints and assertions. Mutated only while
    // the mutex is held.
    pub(crate) locked: AtomicBool,
}

impl WriteState {
    fn acquire(&self, warden: Option<&Warden>, block: bool, test: bool) -> Result<u32, AcquireError> {
        // Write mode is passed regardless of the request because this lock
        // locks out readers as well.
        let locked = self.locked.load(Relaxed);
        if !register(warden, Mode::Write, block, locked, locked, test) {
            return Err(AcquireError::Refused);
        }
        if block {
            self.mutex.lock();
        } else if !self.mutex.try_lock() {
            if !test {
                release_auth(warden, Mode::Write);
            }
            return Err(AcquireError::WouldBlock);
        }
        debug_assert!(!self.locked.load(Relaxed));
        self.locked.store(true, Relaxed);
        Ok(0)
    }

    fn release(&self, warden: Option<&Warden>) -> u32 {
        // The acquisition was recorded as a write no matter which mode was
        // requested.
        release_auth(warden, Mode::Write);
        debug_assert!(self.locked.load(Relaxed));
        self.locked.store(false, Relaxed);
        // SAFETY: - The shadow flag was set under the mutex, so the mutex is
        //           locked.
        //         - Guards release exactly once, on the drop of their last
        //           share.
        unsafe {
            self.mutex.unlock();
        }
        0
    }
}
