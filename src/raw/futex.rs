use std::io;
use std::fmt::{Debug, Formatter, Result as FmtResult};
use std::sync::atomic::{AtomicU32, Ordering};
use lock_wrappers::raw::Mutex;
use crate::sys::{futex_wait, futex_wake};

const UNLOCKED: u32 = 0;
const LOCKED: u32 = 1;
const CONTENDED: u32 = 2;

/// A simple mutual exclusion lock (mutex).
///
/// This is not designed for direct use but as a building block for locks.
///
/// Thus, it is not reentrant and it may misbehave if used incorrectly
/// (i.e. you can release even if someone else is holding it).
/// It's also not fair.
pub struct Futex {
    futex: AtomicU32,
}

impl Futex {
    /// Creates a new, unlocked instance.
    pub const fn new() -> Futex {
        Futex { futex: AtomicU32::new(UNLOCKED) }
    }

    #[inline(never)]
    fn lock_slow(&self) {
        // once we sleep we can't know whether others sleep too,
        // so every acquisition from here on claims CONTENDED
        while self.futex.swap(CONTENDED, Ordering::Acquire) != UNLOCKED {
            match futex_wait(&self.futex, CONTENDED, None) {
                Err(ref e) if e.kind() == io::ErrorKind::WouldBlock => (),
                Err(ref e) if e.kind() == io::ErrorKind::Interrupted => (),
                Ok(_) => (),
                Err(e) => panic!("futex wait failed: {}", e),
            }
        }
    }
}

impl Mutex for Futex {
    type LockState = ();

    /// Acquires the lock.
    ///
    /// This blocks until the lock is ours.
    #[inline]
    fn lock(&self) {
        if self.futex.compare_exchange(UNLOCKED, LOCKED, Ordering::Acquire, Ordering::Relaxed).is_err() {
            self.lock_slow();
        }
    }

    /// Attempts to acquire the lock without blocking.
    fn try_lock(&self) -> Option<()> {
        self.futex.compare_exchange(UNLOCKED, LOCKED, Ordering::Acquire, Ordering::Relaxed)
            .ok()
            .map(|_| ())
    }

    /// Releases the lock.
    #[inline]
    fn unlock(&self, _: ()) {
        if self.futex.swap(UNLOCKED, Ordering::Release) == CONTENDED {
            // someone might be sleeping - wake one of them up
            futex_wake(&self.futex, 1).unwrap();
        }
    }
}

impl Default for Futex {
    fn default() -> Futex {
        Futex::new()
    }
}

impl Debug for Futex {
    fn fmt(&self, f: &mut Formatter) -> FmtResult {
        write!(f, "Futex@{:p} (={})", &self.futex as *const _, self.futex.load(Ordering::SeqCst))
    }
}
