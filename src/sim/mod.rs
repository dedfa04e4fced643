//! Unisex bathroom simulation: one thread per worker, all sharing a
//! [`GroupMutex`].
//!
//! Each worker loops: pause outside, enter, pause inside, leave. The run
//! ends on its [`StopCondition`] or when a [`Stopper`] fires, after which the
//! lock is shut down and every worker is joined.

mod config;
mod pacer;

pub use self::config::{SimulationConfig, StopCondition};
pub use self::pacer::{NoDelay, Pacer, Phase, RandomPacer};

use std::collections::BTreeMap;
use std::fmt::{Display, Formatter, Result as FmtResult};
use std::sync::mpsc::{self, Receiver, RecvTimeoutError, Sender};
use std::sync::Arc;
use std::thread::{self, JoinHandle};
use std::time::{Duration, Instant};
use tracing::{debug, error, info};

use crate::error::{Result, SimulationError};
use crate::group::{Group, WorkerId};
use crate::group_mutex::GroupMutex;

enum Event {
    Stop,
    Finished(WorkerId),
}

/// Ends a running [`Simulation`] early. Cheap to clone.
#[derive(Clone)]
pub struct Stopper {
    tx: Sender<Event>,
}

impl Stopper {
    pub fn stop(&self) {
        // the run may already be over
        let _ = self.tx.send(Event::Stop);
    }
}

// reports the worker as finished even if it unwinds
struct Finished {
    tx: Sender<Event>,
    worker: WorkerId,
}

impl Drop for Finished {
    fn drop(&mut self) {
        let _ = self.tx.send(Event::Finished(self.worker));
    }
}

pub struct Simulation {
    config: SimulationConfig,
    mutex: Arc<GroupMutex>,
    tx: Sender<Event>,
    rx: Receiver<Event>,
}

impl Simulation {
    pub fn new(config: SimulationConfig) -> Result<Simulation> {
        config.validate()?;
        let (tx, rx) = mpsc::channel();
        Ok(Simulation {
            mutex: Arc::new(GroupMutex::new(config.population)),
            config,
            tx,
            rx,
        })
    }

    pub fn config(&self) -> &SimulationConfig {
        &self.config
    }

    /// The lock shared by all workers, e.g. for sampling snapshots.
    pub fn controller(&self) -> Arc<GroupMutex> {
        self.mutex.clone()
    }

    pub fn stopper(&self) -> Stopper {
        Stopper { tx: self.tx.clone() }
    }

    /// Runs the simulation to completion on the calling thread.
    pub fn run(self, pacer: Arc<dyn Pacer>) -> Result<Report> {
        let start = Instant::now();
        let population = self.config.population;
        let cycles = match self.config.stop {
            StopCondition::Cycles(n) => Some(n),
            StopCondition::After(_) => None,
        };
        info!(group_a = population.of(Group::A), group_b = population.of(Group::B),
              stop = ?self.config.stop, "simulation starting");

        let mut handles: Vec<(WorkerId, JoinHandle<()>)> = Vec::with_capacity(population.total());
        for worker in population.workers() {
            match self.spawn(worker, pacer.clone(), cycles) {
                Ok(handle) => handles.push((worker, handle)),
                Err(source) => {
                    self.mutex.shutdown();
                    join_all(handles);
                    return Err(SimulationError::Spawn { worker: worker.to_string(), source });
                }
            }
        }

        let deadline = match self.config.stop {
            StopCondition::After(d) => Some(start + d),
            StopCondition::Cycles(_) => None,
        };
        self.wait(handles.len(), deadline);

        self.mutex.shutdown();
        let panicked = join_all(handles);
        let report = Report {
            visits: self.mutex.snapshot().visits().clone(),
            elapsed: start.elapsed(),
            panicked,
        };
        info!(visits = report.total_visits(), elapsed = ?report.elapsed, "simulation complete");
        Ok(report)
    }

    fn spawn(&self, worker: WorkerId, pacer: Arc<dyn Pacer>, cycles: Option<u64>) -> std::io::Result<JoinHandle<()>> {
        let mutex = self.mutex.clone();
        let finished = Finished { tx: self.tx.clone(), worker };
        thread::Builder::new()
            .name(format!("worker-{}", worker))
            .spawn(move || {
                let _finished = finished;
                run_worker(&mutex, &*pacer, worker, cycles);
            })
    }

    // returns when the deadline passes, a stop is requested or every worker is done
    fn wait(&self, mut running: usize, deadline: Option<Instant>) {
        while running > 0 {
            let event = match deadline {
                Some(deadline) => {
                    let now = Instant::now();
                    if now >= deadline {
                        break;
                    }
                    match self.rx.recv_timeout(deadline - now) {
                        Ok(event) => event,
                        Err(RecvTimeoutError::Timeout) => break,
                        Err(RecvTimeoutError::Disconnected) => break,
                    }
                }
                None => match self.rx.recv() {
                    Ok(event) => event,
                    Err(_) => break,
                },
            };
            match event {
                Event::Stop => {
                    info!("stop requested");
                    break;
                }
                Event::Finished(worker) => {
                    debug!(%worker, "worker done");
                    running -= 1;
                }
            }
        }
    }
}

fn run_worker(mutex: &GroupMutex, pacer: &dyn Pacer, worker: WorkerId, cycles: Option<u64>) {
    let mut visits = 0u64;
    while cycles.map_or(true, |n| visits < n) {
        pacer.pause(worker, Phase::Work);
        match mutex.occupy(worker) {
            Some(_occupancy) => pacer.pause(worker, Phase::Use),
            None => {
                debug!(%worker, visits, "aborted");
                return;
            }
        }
        visits += 1;
    }
    debug!(%worker, visits, "finished all cycles");
}

fn join_all(handles: Vec<(WorkerId, JoinHandle<()>)>) -> Vec<WorkerId> {
    let mut panicked = Vec::new();
    for (worker, handle) in handles {
        if handle.join().is_err() {
            error!(%worker, "worker panicked");
            panicked.push(worker);
        }
    }
    panicked
}

/// Outcome of a [`Simulation`] run.
#[derive(Debug, Clone)]
pub struct Report {
    pub visits: BTreeMap<WorkerId, u64>,
    pub elapsed: Duration,
    /// Workers whose thread panicked. The rest of the run is unaffected.
    pub panicked: Vec<WorkerId>,
}

impl Report {
    pub fn total_visits(&self) -> u64 {
        self.visits.values().sum()
    }

    pub fn visits_of(&self, group: Group) -> u64 {
        self.visits.iter()
            .filter(|(w, _)| w.group == group)
            .map(|(_, v)| v)
            .sum()
    }
}

impl Display for Report {
    fn fmt(&self, f: &mut Formatter) -> FmtResult {
        writeln!(f, "Simulation complete after {:.1?}.", self.elapsed)?;
        for (worker, visits) in &self.visits {
            writeln!(f, "Worker {} entered {} times.", worker, visits)?;
        }
        write!(f, "Total: {} (A: {}, B: {})", self.total_visits(),
               self.visits_of(Group::A), self.visits_of(Group::B))
    }
}
