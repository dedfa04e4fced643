use std::cell::UnsafeCell;
use std::mem;
use std::ops::{Deref, DerefMut};
use std::time::Duration;
use lock_wrappers::raw::Mutex as _;
use crate::raw::{Futex, Gate, Wake};

/// Data protected by a [`Futex`].
///
/// Unlike `std::sync::Mutex` this never poisons: a guard dropped during a
/// panic simply releases the lock.
pub struct Mutex<T> {
    mutex: Futex,
    data: UnsafeCell<T>,
}

unsafe impl<T: Send> Send for Mutex<T> { }
unsafe impl<T: Send> Sync for Mutex<T> { }

impl<T> Mutex<T> {
    pub fn new(t: T) -> Mutex<T> {
        Mutex {
            mutex: Futex::new(),
            data: UnsafeCell::new(t),
        }
    }

    pub fn lock(&self) -> MutexGuard<T> {
        self.mutex.lock();
        MutexGuard { mutex: self }
    }

    pub fn try_lock(&self) -> Option<MutexGuard<T>> {
        self.mutex.try_lock().map(|()| MutexGuard { mutex: self })
    }
}

impl<T: Default> Default for Mutex<T> {
    /// Creates a `Mutex<T>`, with the `Default` value for T.
    fn default() -> Mutex<T> {
        Mutex::new(Default::default())
    }
}

#[must_use]
pub struct MutexGuard<'a, T: 'a> {
    mutex: &'a Mutex<T>
}

impl<'a, T: 'a> MutexGuard<'a, T> {
    /// Releases the lock, sleeps on `gate` and takes the lock again.
    ///
    /// The gate generation is sampled before the lock is dropped, so a
    /// release issued under this lock after that point always wakes us.
    pub fn park(self, gate: &Gate, timeout: Option<Duration>) -> (MutexGuard<'a, T>, Wake) {
        let mutex = self.mutex;
        let generation = gate.generation();
        mem::forget(self);
        mutex.mutex.unlock(());

        let wake = gate.wait(generation, timeout);

        mutex.mutex.lock();
        (MutexGuard { mutex }, wake)
    }
}

impl<'a, T: 'a> Drop for MutexGuard<'a, T> {
    fn drop(&mut self) {
        self.mutex.mutex.unlock(());
    }
}

impl<'a, T: 'a> Deref for MutexGuard<'a, T> {
    type Target = T;

    fn deref(&self) -> &T {
        unsafe { &*self.mutex.data.get() }
    }
}

impl<'a, T: 'a> DerefMut for MutexGuard<'a, T> {
    fn deref_mut(&mut self) -> &mut T {
        unsafe { &mut *self.mutex.data.get() }
    }
}
