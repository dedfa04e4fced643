mod futex;
mod gate;

pub use self::futex::Futex;
pub use self::gate::{Gate, Wake};

#[cfg(test)]
mod tests {
    use std::thread;
    use std::time::{Duration, Instant};
    use std::sync::Arc;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use lock_wrappers::raw::Mutex;
    use super::*;

    #[test]
    fn futex() {
        let futex = Arc::new(Futex::new());
        let futex2 = futex.clone();
        futex.lock();
        assert!(futex.try_lock().is_none());
        thread::spawn(move || {
            thread::sleep(Duration::from_millis(100));
            futex2.unlock(());
        }).join().unwrap();
        futex.lock();
        futex.unlock(());
        assert!(futex.try_lock().is_some());
        futex.unlock(());
    }

    #[test]
    fn futex_contended() {
        let futex = Arc::new(Futex::new());
        let counter = Arc::new(AtomicUsize::new(0));
        let threads: Vec<_> = (0..4).map(|_| {
            let futex = futex.clone();
            let counter = counter.clone();
            thread::spawn(move || {
                for _ in 0..1000 {
                    futex.lock();
                    // non-atomic read-modify-write, only safe under the lock
                    let v = counter.load(Ordering::Relaxed);
                    counter.store(v + 1, Ordering::Relaxed);
                    futex.unlock(());
                }
            })
        }).collect();
        for t in threads {
            t.join().unwrap();
        }
        assert_eq!(counter.load(Ordering::SeqCst), 4000);
    }

    #[test]
    fn gate_release_wakes_sleeper() {
        let gate = Arc::new(Gate::new());
        let gate2 = gate.clone();
        let generation = gate.generation();
        let sleeper = thread::spawn(move || {
            loop {
                gate2.wait(generation, None);
                if gate2.generation() != generation {
                    break;
                }
            }
        });
        thread::sleep(Duration::from_millis(50));
        gate.release_all();
        sleeper.join().unwrap();
    }

    #[test]
    fn gate_stale_generation_returns_immediately() {
        let gate = Gate::new();
        let generation = gate.generation();
        gate.release_all();
        assert_eq!(gate.wait(generation, Some(Duration::from_secs(5))), Wake::Woken);
    }

    #[test]
    fn gate_times_out() {
        let gate = Gate::new();
        let start = Instant::now();
        let mut wake = Wake::Woken;
        while wake == Wake::Woken && start.elapsed() < Duration::from_secs(5) {
            wake = gate.wait(gate.generation(), Some(Duration::from_millis(20)));
        }
        assert_eq!(wake, Wake::TimedOut);
    }
}
