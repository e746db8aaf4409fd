//! Mutexes that report who is holding or waiting on them
//!
//! [`MutexD`] and [`RwMutexD`] behave like their `parking_lot` counterparts
//! but tally outstanding lock requests by caller location. Printing the lock
//! while a program appears stuck shows which call sites hold or wait on it.

use parking_lot::{Mutex, MutexGuard, RwLock, RwLockReadGuard, RwLockWriteGuard};
use std::fmt;
use std::ops::{Deref, DerefMut};
use std::panic::Location;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Access {
    Write,
    Read,
}

/// Outstanding requests per (caller, access), in first-seen order
#[derive(Debug, Default)]
struct Tally {
    entries: Mutex<Vec<(&'static Location<'static>, Access, usize)>>,
}

impl Tally {
    fn request(&self, caller: &'static Location<'static>, access: Access) {
        let mut entries = self.entries.lock();
        match entries.iter_mut().find(|(loc, acc, _)| *loc == caller && *acc == access) {
            Some(entry) => entry.2 += 1,
            None => entries.push((caller, access, 1)),
        }
    }

    fn release(&self, caller: &'static Location<'static>, access: Access) {
        let mut entries = self.entries.lock();
        if let Some(pos) = entries.iter().position(|(loc, acc, _)| *loc == caller && *acc == access) {
            entries[pos].2 -= 1;
            if entries[pos].2 == 0 {
                entries.remove(pos);
            }
        }
    }

    fn outstanding(&self) -> usize {
        self.entries.lock().iter().map(|(_, _, n)| n).sum()
    }
}

impl fmt::Display for Tally {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let entries = self.entries.lock();
        for (i, (caller, access, n)) in entries.iter().enumerate() {
            if i > 0 {
                writeln!(f)?;
            }
            let kind = match access {
                Access::Write => "locks",
                Access::Read => "read locks",
            };
            write!(f, "{} {} requested by {}:{}", n, kind, caller.file(), caller.line())?;
        }
        Ok(())
    }
}

/// Releases its tally entry when dropped
struct Ticket<'a> {
    tally: &'a Tally,
    caller: &'static Location<'static>,
    access: Access,
}

impl Drop for Ticket<'_> {
    fn drop(&mut self) {
        self.tally.release(self.caller, self.access);
    }
}

//===========================================================================
// MutexD
//===========================================================================

/// A mutex that records which call sites requested it.
#[derive(Default)]
pub struct MutexD<T> {
    inner: Mutex<T>,
    tally: Tally,
}

pub struct MutexDGuard<'a, T> {
    guard: MutexGuard<'a, T>,
    _ticket: Ticket<'a>,
}

impl<T> MutexD<T> {
    pub fn new(value: T) -> Self {
        Self {
            inner: Mutex::new(value),
            tally: Tally::default(),
        }
    }

    /// Block until the lock is acquired. The caller is tallied from the
    /// moment of the request until the guard is dropped.
    #[track_caller]
    pub fn lock(&self) -> MutexDGuard<'_, T> {
        let caller = Location::caller();
        self.tally.request(caller, Access::Write);
        let ticket = Ticket {
            tally: &self.tally,
            caller,
            access: Access::Write,
        };
        MutexDGuard {
            guard: self.inner.lock(),
            _ticket: ticket,
        }
    }

    /// Number of requests currently holding or waiting for the lock
    pub fn outstanding(&self) -> usize {
        self.tally.outstanding()
    }

    pub fn into_inner(self) -> T {
        self.inner.into_inner()
    }
}

impl<T> fmt::Display for MutexD<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt::Display::fmt(&self.tally, f)
    }
}

impl<T> Deref for MutexDGuard<'_, T> {
    type Target = T;

    fn deref(&self) -> &T {
        &self.guard
    }
}

impl<T> DerefMut for MutexDGuard<'_, T> {
    fn deref_mut(&mut self) -> &mut T {
        &mut self.guard
    }
}

//===========================================================================
// RwMutexD
//===========================================================================

/// A read/write lock that records which call sites requested it, with
/// readers and writers tallied separately.
#[derive(Default)]
pub struct RwMutexD<T> {
    inner: RwLock<T>,
    tally: Tally,
}

pub struct RwMutexDReadGuard<'a, T> {
    guard: RwLockReadGuard<'a, T>,
    _ticket: Ticket<'a>,
}

pub struct RwMutexDWriteGuard<'a, T> {
    guard: RwLockWriteGuard<'a, T>,
    _ticket: Ticket<'a>,
}

impl<T> RwMutexD<T> {
    pub fn new(value: T) -> Self {
        Self {
            inner: RwLock::new(value),
            tally: Tally::default(),
        }
    }

    #[track_caller]
    fn ticket(&self, access: Access) -> Ticket<'_> {
        let caller = Location::caller();
        self.tally.request(caller, access);
        Ticket {
            tally: &self.tally,
            caller,
            access,
        }
    }

    /// Exclusive lock
    #[track_caller]
    pub fn write(&self) -> RwMutexDWriteGuard<'_, T> {
        let ticket = self.ticket(Access::Write);
        RwMutexDWriteGuard {
            guard: self.inner.write(),
            _ticket: ticket,
        }
    }

    /// Shared lock
    #[track_caller]
    pub fn read(&self) -> RwMutexDReadGuard<'_, T> {
        let ticket = self.ticket(Access::Read);
        RwMutexDReadGuard {
            guard: self.inner.read(),
            _ticket: ticket,
        }
    }

    pub fn outstanding(&self) -> usize {
        self.tally.outstanding()
    }

    pub fn into_inner(self) -> T {
        self.inner.into_inner()
    }
}

impl<T> fmt::Display for RwMutexD<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt::Display::fmt(&self.tally, f)
    }
}

impl<T> Deref for RwMutexDReadGuard<'_, T> {
    type Target = T;

    fn deref(&self) -> &T {
        &self.guard
    }
}

impl<T> Deref for RwMutexDWriteGuard<'_, T> {
    type Target = T;

    fn deref(&self) -> &T {
        &self.guard
    }
}

impl<T> DerefMut for RwMutexDWriteGuard<'_, T> {
    fn deref_mut(&mut self) -> &mut T {
        &mut self.guard
    }
}
