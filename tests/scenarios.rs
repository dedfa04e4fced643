use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::{Arc, Barrier};
use std::thread;
use std::time::{Duration, Instant};

use grouplock::sim::{NoDelay, RandomPacer, Simulation, SimulationConfig, StopCondition};
use grouplock::{Admission, Group, GroupMutex, Population, WorkerId};

fn zero_delay(a: usize, b: usize, stop: StopCondition) -> SimulationConfig {
    SimulationConfig {
        population: Population::new(a, b),
        max_work: Duration::ZERO,
        max_use: Duration::ZERO,
        stop,
    }
}

#[test]
fn two_by_two_hundred_cycles() {
    let sim = Simulation::new(zero_delay(2, 2, StopCondition::Cycles(100))).unwrap();
    let controller = sim.controller();

    let done = Arc::new(AtomicBool::new(false));
    let sampler = {
        let controller = controller.clone();
        let done = done.clone();
        thread::spawn(move || {
            let mut samples = 0usize;
            while !done.load(Ordering::Acquire) {
                let snap = controller.snapshot();
                assert!(snap.is_exclusive(), "both groups inside: {:?}", snap);
                samples += 1;
            }
            samples
        })
    };

    let report = sim.run(Arc::new(NoDelay)).unwrap();
    done.store(true, Ordering::Release);
    assert!(sampler.join().unwrap() > 0);

    assert_eq!(report.total_visits(), 400);
    for worker in Population::new(2, 2).workers() {
        assert_eq!(report.visits[&worker], 100);
    }
    assert_eq!(controller.snapshot().total_visits(), 400);
}

#[test]
fn groups_never_overlap_inside() {
    let mutex = Arc::new(GroupMutex::new(Population::new(3, 3)));
    let inside = Arc::new([AtomicUsize::new(0), AtomicUsize::new(0)]);
    let admissions = Arc::new(AtomicUsize::new(0));

    let threads: Vec<_> = Population::new(3, 3).workers().map(|worker| {
        let mutex = mutex.clone();
        let inside = inside.clone();
        let admissions = admissions.clone();
        thread::spawn(move || {
            let (mine, theirs) = match worker.group {
                Group::A => (&inside[0], &inside[1]),
                Group::B => (&inside[1], &inside[0]),
            };
            for _ in 0..200 {
                assert_eq!(mutex.enter(worker), Admission::Admitted);
                mine.fetch_add(1, Ordering::SeqCst);
                assert_eq!(theirs.load(Ordering::SeqCst), 0, "{} found the other group inside", worker);
                admissions.fetch_add(1, Ordering::Relaxed);
                thread::yield_now();
                mine.fetch_sub(1, Ordering::SeqCst);
                mutex.leave(worker);
            }
        })
    }).collect();

    for t in threads {
        t.join().unwrap();
    }
    assert_eq!(admissions.load(Ordering::SeqCst), 1200);
    assert_eq!(mutex.snapshot().total_visits(), 1200);
}

#[test]
fn same_group_occupies_together() {
    let mutex = Arc::new(GroupMutex::new(Population::new(2, 0)));
    let barrier = Arc::new(Barrier::new(3));

    let threads: Vec<_> = (0..2).map(|i| {
        let mutex = mutex.clone();
        let barrier = barrier.clone();
        thread::spawn(move || {
            let worker = WorkerId::new(Group::A, i);
            assert_eq!(mutex.enter(worker), Admission::Admitted);
            barrier.wait();
            barrier.wait();
            mutex.leave(worker);
        })
    }).collect();

    barrier.wait();
    assert_eq!(mutex.snapshot().inside(Group::A), 2);
    barrier.wait();
    for t in threads {
        t.join().unwrap();
    }
    assert_eq!(mutex.snapshot().inside(Group::A), 0);
}

#[test]
fn shutdown_releases_everyone_promptly() {
    let sim = Simulation::new(SimulationConfig {
        population: Population::new(10, 10),
        max_work: Duration::from_millis(5),
        max_use: Duration::from_millis(20),
        stop: StopCondition::After(Duration::from_millis(200)),
    }).unwrap();
    let controller = sim.controller();

    let start = Instant::now();
    let report = sim.run(Arc::new(RandomPacer::new(Duration::from_millis(5), Duration::from_millis(20)))).unwrap();
    assert!(start.elapsed() < Duration::from_secs(10));
    assert!(report.panicked.is_empty());

    let snap = controller.snapshot();
    assert!(snap.is_shut_down());
    assert_eq!(snap.inside(Group::A) + snap.inside(Group::B), 0);
    assert_eq!(snap.waiting(Group::A) + snap.waiting(Group::B), 0);
    assert_eq!(snap.total_visits(), report.total_visits());

    // nothing gets in after shutdown
    assert_eq!(controller.enter(WorkerId::new(Group::A, 0)), Admission::Aborted);
    assert_eq!(controller.snapshot().total_visits(), report.total_visits());
}

struct PanicsInside(WorkerId);

impl grouplock::sim::Pacer for PanicsInside {
    fn pause(&self, worker: WorkerId, phase: grouplock::sim::Phase) {
        if worker == self.0 && phase == grouplock::sim::Phase::Use {
            panic!("{} fell over inside", worker);
        }
    }
}

#[test]
fn panicked_worker_does_not_wedge_the_rest() {
    let unlucky = WorkerId::new(Group::A, 0);
    let sim = Simulation::new(zero_delay(2, 2, StopCondition::Cycles(20))).unwrap();
    let controller = sim.controller();
    let report = sim.run(Arc::new(PanicsInside(unlucky))).unwrap();

    assert_eq!(report.panicked, vec![unlucky]);
    assert_eq!(report.visits[&unlucky], 1);
    assert_eq!(report.total_visits(), 61);
    // the occupancy guard left on unwind
    let snap = controller.snapshot();
    assert_eq!(snap.inside(Group::A), 0);
    assert_eq!(snap.inside(Group::B), 0);
}
