use std::thread;
use std::time::Duration;
use rand::Rng;
use crate::group::WorkerId;

/// Which part of a worker's cycle a pause stands for.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Phase {
    /// Time spent outside, before asking to enter.
    Work,
    /// Time spent holding occupancy.
    Use,
}

/// Simulates the external delays of a worker's cycle.
pub trait Pacer: Send + Sync {
    fn pause(&self, worker: WorkerId, phase: Phase);
}

/// Sleeps for a uniformly random time up to a per-phase maximum.
#[derive(Debug, Clone, Copy)]
pub struct RandomPacer {
    max_work: Duration,
    max_use: Duration,
}

impl RandomPacer {
    pub fn new(max_work: Duration, max_use: Duration) -> RandomPacer {
        RandomPacer { max_work, max_use }
    }
}

impl Pacer for RandomPacer {
    fn pause(&self, _: WorkerId, phase: Phase) {
        let max = match phase {
            Phase::Work => self.max_work,
            Phase::Use => self.max_use,
        };
        let micros = max.as_micros().min(u64::MAX as u128) as u64;
        if micros == 0 {
            return;
        }
        let micros = rand::thread_rng().gen_range(0..=micros);
        thread::sleep(Duration::from_micros(micros));
    }
}

/// Never pauses.
#[derive(Debug, Clone, Copy, Default)]
pub struct NoDelay;

impl Pacer for NoDelay {
    fn pause(&self, _: WorkerId, _: Phase) {}
}
