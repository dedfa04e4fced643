//! Group mutual exclusion with alternating turns.
//!
//! Any number of workers of the same [`Group`] may hold the lock at once,
//! but never workers of both groups. To keep one group from starving the
//! other, the last worker of a group to leave hands the turn to the other
//! group if it has waiters, and while a group holds the turn with waiters
//! pending, newcomers of the opposite group queue up behind them.
//!
//! A group may still refill itself while it holds the turn, so overtaking
//! is bounded by one occupancy period after the opposite group starts
//! waiting.
//!
//! All bookkeeping lives behind one futex lock (the admission lock). Blocked
//! workers sleep on a per-group [`Gate`] that is only ever broadcast, since
//! any number of same-group workers can be admitted together.

use std::collections::BTreeMap;
use std::fmt::{Debug, Formatter, Result as FmtResult};
use std::time::{Duration, Instant};
use tracing::{debug, info, trace, warn};

use crate::error::WaitTimedOut;
use crate::group::{Group, Population, WorkerId};
use crate::mutex::Mutex;
use crate::raw::{Gate, Wake};

/// Result of asking for admission.
#[must_use]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Admission {
    /// The caller holds occupancy until it calls [`GroupMutex::leave`].
    Admitted,
    /// The lock is shut down. The caller must not use the resource.
    Aborted,
}

#[derive(Debug, Clone, Copy, Default)]
struct Slot {
    visits: u64,
    admitted: bool,
}

struct State {
    inside: [usize; 2],
    waiting: [usize; 2],
    turn: Option<Group>,
    shut_down: bool,
    slots: [Vec<Slot>; 2],
}

impl State {
    fn new(population: Population) -> State {
        State {
            inside: [0; 2],
            waiting: [0; 2],
            turn: None,
            shut_down: false,
            slots: [
                vec![Slot::default(); population.of(Group::A)],
                vec![Slot::default(); population.of(Group::B)],
            ],
        }
    }

    fn slot_mut(&mut self, worker: WorkerId) -> &mut Slot {
        &mut self.slots[worker.group.index()][worker.index]
    }

    /// The admission rule: nobody of the other group inside, and the other
    /// group does not hold the turn with workers still waiting.
    fn admissible(&self, group: Group) -> bool {
        let other = group.other();
        self.inside[other.index()] == 0
            && !(self.turn == Some(other) && self.waiting[other.index()] > 0)
    }

    fn admit(&mut self, worker: WorkerId) -> Admission {
        let g = worker.group.index();
        debug_assert_eq!(self.inside[worker.group.other().index()], 0);
        self.inside[g] += 1;
        self.turn = Some(worker.group);
        let slot = self.slot_mut(worker);
        slot.visits += 1;
        slot.admitted = true;
        trace!(%worker, inside = self.inside[g], "admitted");
        Admission::Admitted
    }
}

#[derive(Clone, Copy)]
enum Wait {
    Never,
    Forever,
    Until(Instant),
}

enum Attempt {
    Done(Admission),
    WouldBlock,
    TimedOut,
}

/// A lock that admits any number of workers of one group at a time.
///
/// Share it between worker threads with an `Arc`.
pub struct GroupMutex {
    state: Mutex<State>,
    gates: [Gate; 2],
    population: Population,
}

impl GroupMutex {
    /// Creates a new instance for the given population, with no one inside
    /// and no turn assigned.
    pub fn new(population: Population) -> GroupMutex {
        GroupMutex {
            state: Mutex::new(State::new(population)),
            gates: [Gate::new(), Gate::new()],
            population,
        }
    }

    pub fn population(&self) -> Population {
        self.population
    }

    /// Acquires occupancy for `worker`.
    ///
    /// This blocks while the other group is inside, or while the other group
    /// holds the turn and still has waiters. Returns [`Admission::Aborted`]
    /// once [`shutdown`](Self::shutdown) has been called.
    ///
    /// # Panics
    ///
    /// If `worker` is already admitted or is not part of the population.
    pub fn enter(&self, worker: WorkerId) -> Admission {
        match self.acquire(worker, Wait::Forever) {
            Attempt::Done(admission) => admission,
            Attempt::WouldBlock | Attempt::TimedOut => unreachable!(),
        }
    }

    /// Like [`enter`](Self::enter), but returns `None` instead of blocking.
    pub fn try_enter(&self, worker: WorkerId) -> Option<Admission> {
        match self.acquire(worker, Wait::Never) {
            Attempt::Done(admission) => Some(admission),
            Attempt::WouldBlock => None,
            Attempt::TimedOut => unreachable!(),
        }
    }

    /// Like [`enter`](Self::enter), but gives up after `timeout`.
    ///
    /// A worker that is admissible when its deadline passes is still
    /// admitted.
    pub fn enter_timeout(&self, worker: WorkerId, timeout: Duration) -> Result<Admission, WaitTimedOut> {
        // too far out to represent is as good as forever
        let wait = match Instant::now().checked_add(timeout) {
            Some(deadline) => Wait::Until(deadline),
            None => Wait::Forever,
        };
        match self.acquire(worker, wait) {
            Attempt::Done(admission) => Ok(admission),
            Attempt::TimedOut => {
                warn!(%worker, ?timeout, "gave up waiting for admission");
                Err(WaitTimedOut(timeout))
            }
            Attempt::WouldBlock => unreachable!(),
        }
    }

    /// Acquires occupancy and returns a guard that leaves on drop.
    ///
    /// `None` means the lock was shut down.
    pub fn occupy(&self, worker: WorkerId) -> Option<Occupancy> {
        match self.enter(worker) {
            Admission::Admitted => Some(Occupancy { mutex: self, worker }),
            Admission::Aborted => None,
        }
    }

    fn check_known(&self, worker: WorkerId) {
        assert!(self.population.contains(worker), "unknown worker {}", worker);
    }

    fn acquire(&self, worker: WorkerId, wait: Wait) -> Attempt {
        let group = worker.group;
        let g = group.index();
        self.check_known(worker);

        let mut state = self.state.lock();
        assert!(!state.slot_mut(worker).admitted, "worker {} entered while already admitted", worker);

        if state.shut_down {
            trace!(%worker, "aborted");
            return Attempt::Done(Admission::Aborted);
        }
        if state.admissible(group) {
            return Attempt::Done(state.admit(worker));
        }
        if let Wait::Never = wait {
            return Attempt::WouldBlock;
        }

        state.waiting[g] += 1;
        trace!(%worker, waiting = state.waiting[g], turn = ?state.turn, "waiting");

        let attempt = loop {
            let timeout = match wait {
                Wait::Until(deadline) => {
                    let now = Instant::now();
                    if now >= deadline {
                        break Attempt::TimedOut;
                    }
                    Some(deadline - now)
                }
                _ => None,
            };

            let (guard, wake) = state.park(&self.gates[g], timeout);
            state = guard;

            if state.shut_down {
                break Attempt::Done(Admission::Aborted);
            }
            if state.admissible(group) {
                break Attempt::Done(Admission::Admitted);
            }
            if wake == Wake::TimedOut {
                break Attempt::TimedOut;
            }
        };

        // short of shutdown a waiter only withdraws while inadmissible, and
        // then the other group's waiters never depend on our waiting count
        state.waiting[g] -= 1;
        match attempt {
            Attempt::Done(Admission::Admitted) => Attempt::Done(state.admit(worker)),
            withdrawn => {
                trace!(%worker, "stopped waiting");
                withdrawn
            }
        }
    }

    /// Releases occupancy held by `worker`.
    ///
    /// The last worker of a group to leave hands the turn to the other group
    /// and wakes all of its waiters. Never blocks on anything but the
    /// admission lock.
    ///
    /// # Panics
    ///
    /// If `worker` does not currently hold occupancy.
    pub fn leave(&self, worker: WorkerId) {
        let group = worker.group;
        let other = group.other();
        self.check_known(worker);

        let mut state = self.state.lock();
        let slot = state.slot_mut(worker);
        assert!(slot.admitted, "worker {} left without holding occupancy", worker);
        slot.admitted = false;

        state.inside[group.index()] -= 1;
        trace!(%worker, inside = state.inside[group.index()], "left");

        if state.inside[group.index()] == 0 && state.waiting[other.index()] > 0 {
            state.turn = Some(other);
            debug!(from = %group, to = %other, waiting = state.waiting[other.index()], "turn handed over");
            self.gates[other.index()].release_all();
        }
    }

    /// Releases every blocked worker without admitting it. All pending and
    /// future calls to [`enter`](Self::enter) return
    /// [`Admission::Aborted`]. Workers already inside keep their occupancy
    /// and may still [`leave`](Self::leave).
    ///
    /// Calling this more than once has no further effect.
    pub fn shutdown(&self) {
        let mut state = self.state.lock();
        if state.shut_down {
            return;
        }
        state.shut_down = true;
        info!(waiting_a = state.waiting[0], waiting_b = state.waiting[1], "shutting down");
        for gate in &self.gates {
            gate.release_all();
        }
    }

    pub fn is_shut_down(&self) -> bool {
        self.state.lock().shut_down
    }

    /// A consistent copy of the bookkeeping, taken under the admission lock.
    pub fn snapshot(&self) -> Snapshot {
        let state = self.state.lock();
        let visits = self.population.workers()
            .map(|w| (w, state.slots[w.group.index()][w.index].visits))
            .collect();
        Snapshot {
            inside: state.inside,
            waiting: state.waiting,
            turn: state.turn,
            shut_down: state.shut_down,
            visits,
        }
    }
}

impl Debug for GroupMutex {
    fn fmt(&self, f: &mut Formatter) -> FmtResult {
        match self.state.try_lock() {
            Some(state) => write!(f, "GroupMutex@{:p} (inside={:?} waiting={:?} turn={:?})",
                                  self as *const _, state.inside, state.waiting, state.turn),
            None => write!(f, "GroupMutex@{:p} (locked)", self as *const _),
        }
    }
}

/// Occupancy held by one worker. Leaves the [`GroupMutex`] on drop.
#[must_use]
pub struct Occupancy<'a> {
    mutex: &'a GroupMutex,
    worker: WorkerId,
}

impl<'a> Occupancy<'a> {
    pub fn worker(&self) -> WorkerId {
        self.worker
    }
}

impl<'a> Drop for Occupancy<'a> {
    fn drop(&mut self) {
        self.mutex.leave(self.worker);
    }
}

/// Point-in-time view of a [`GroupMutex`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Snapshot {
    inside: [usize; 2],
    waiting: [usize; 2],
    turn: Option<Group>,
    shut_down: bool,
    visits: BTreeMap<WorkerId, u64>,
}

impl Snapshot {
    pub fn inside(&self, group: Group) -> usize {
        self.inside[group.index()]
    }

    pub fn waiting(&self, group: Group) -> usize {
        self.waiting[group.index()]
    }

    /// The group that last held or was handed priority, if any.
    pub fn turn(&self) -> Option<Group> {
        self.turn
    }

    pub fn is_shut_down(&self) -> bool {
        self.shut_down
    }

    /// `false` if both groups are inside, which must never happen.
    pub fn is_exclusive(&self) -> bool {
        self.inside[0] == 0 || self.inside[1] == 0
    }

    /// Successful admissions per worker.
    pub fn visits(&self) -> &BTreeMap<WorkerId, u64> {
        &self.visits
    }

    pub fn visits_of(&self, worker: WorkerId) -> u64 {
        self.visits.get(&worker).copied().unwrap_or(0)
    }

    pub fn total_visits(&self) -> u64 {
        self.visits.values().sum()
    }
}
