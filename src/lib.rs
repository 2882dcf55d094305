//! This crate provides the [`Warded`] container, which binds a value to the
//! lock that protects it, and the [`Warden`] type, which refuses lock
//! acquisitions that could deadlock.
//!
//! # Motivation
//!
//! Locks that live next to the data they protect make it easy to access the
//! data without holding the lock, and locks that are acquired in
//! inconsistent orders across threads deadlock. This crate addresses both:
//!
//! 1. The value inside a [`Warded`] container is only reachable through a
//!    guard, so unlocked access is impossible by construction.
//! 2. Each thread carries a [`Warden`] that counts the locks the thread
//!    holds and vetoes acquisitions that are incompatible with them. A
//!    thread that already holds a lock is, for example, refused any lock
//!    that a writer is waiting for, because the writer may be waiting on
//!    something the thread holds.
//!
//! A refused or contended acquisition is an `Err` value, never a panic, so
//! threads can back off and retry instead of deadlocking.
//!
//! Containers come in four lock flavors ([`Strategy`]): the default
//! read/write lock with writer priority, a read-only lock, a write-only
//! lock, and a broken lock that refuses everything. Wardens come in four
//! matching policies ([`Policy`]) which may be mixed freely with any
//! container flavor.
//!
//! When a thread legitimately needs several containers at once, the
//! per-thread rules are too strict. The [`MultiLock`] solves this: a thread
//! that claims it exclusively blocks all other threads from starting new
//! acquisitions and can then lock any number of containers without risking
//! a deadlock.
//!
//! # Example
//!
//! ```
//! use std::thread;
//! use warded::{Policy, Warded, Warden};
//!
//! let account = Warded::new(100);
//!
//! thread::scope(|scope| {
//!     scope.spawn(|| {
//!         let warden = Warden::new(Policy::ReadWrite);
//!         let mut balance = account.write_with(&warden).unwrap();
//!         *balance -= 30;
//!     });
//! });
//!
//! assert_eq!(*account.read().unwrap(), 70);
//! ```
pub use {
    error::AcquireError,
    guard::{ReadGuard, WriteGuard},
    multi::{MultiGuard, MultiLock},
    raw::Strategy,
    warded::Warded,
    warden::{Mode, Policy, Warden},
};

mod error;
mod guard;
mod multi;
mod raw;
mod warded;
mod warden;
