use std::io;
use std::fmt::{Debug, Formatter, Result as FmtResult};
use std::sync::atomic::{AtomicU32, Ordering};
use std::time::Duration;
use crate::sys::{futex_wait, futex_wake};

/// Outcome of a single sleep on a [`Gate`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Wake {
    /// Released, interrupted or spuriously woken. Re-check your condition.
    Woken,
    /// The timeout elapsed without a release.
    TimedOut,
}

/// A wait queue that only ever releases everyone at once.
///
/// Waiters sample the generation with [`Gate::generation`] while holding the
/// lock that protects their wait condition, drop that lock and then call
/// [`Gate::wait`]. A release bumps the generation, so a release that
/// happens between sampling and sleeping is never lost.
///
/// Releasing must happen under the same lock the waiters sampled under.
pub struct Gate {
    seq: AtomicU32,
}

impl Gate {
    /// Creates a new instance with no waiters.
    pub const fn new() -> Gate {
        Gate { seq: AtomicU32::new(0) }
    }

    /// Current generation. Pass it to [`Gate::wait`].
    #[inline]
    pub fn generation(&self) -> u32 {
        self.seq.load(Ordering::Relaxed)
    }

    /// Sleeps until the generation moves past `generation`.
    ///
    /// May return early.
    pub fn wait(&self, generation: u32, timeout: Option<Duration>) -> Wake {
        match futex_wait(&self.seq, generation, timeout) {
            Ok(_) => Wake::Woken,
            Err(ref e) if e.kind() == io::ErrorKind::WouldBlock => Wake::Woken,
            Err(ref e) if e.kind() == io::ErrorKind::Interrupted => Wake::Woken,
            Err(ref e) if e.kind() == io::ErrorKind::TimedOut => Wake::TimedOut,
            Err(e) => panic!("futex wait failed: {}", e),
        }
    }

    /// Wakes every thread sleeping on this gate (broadcast-release).
    pub fn release_all(&self) -> usize {
        self.seq.fetch_add(1, Ordering::Release);
        futex_wake(&self.seq, i32::MAX).unwrap() as usize
    }
}

impl Default for Gate {
    fn default() -> Gate {
        Gate::new()
    }
}

impl Debug for Gate {
    fn fmt(&self, f: &mut Formatter) -> FmtResult {
        write!(f, "Gate@{:p} (gen={})", &self.seq as *const _, self.seq.load(Ordering::SeqCst))
    }
}
