use std::fmt::{Display, Formatter, Result as FmtResult};

/// One of the two populations contending for the resource.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum Group {
    A,
    B,
}

impl Group {
    pub const ALL: [Group; 2] = [Group::A, Group::B];

    /// The opposite group.
    #[inline]
    pub fn other(self) -> Group {
        match self {
            Group::A => Group::B,
            Group::B => Group::A,
        }
    }

    #[inline]
    pub(crate) fn index(self) -> usize {
        match self {
            Group::A => 0,
            Group::B => 1,
        }
    }
}

impl Display for Group {
    fn fmt(&self, f: &mut Formatter) -> FmtResult {
        match *self {
            Group::A => f.write_str("A"),
            Group::B => f.write_str("B"),
        }
    }
}

/// Identity of a single worker: its group and its index within that group.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct WorkerId {
    pub group: Group,
    pub index: usize,
}

impl WorkerId {
    pub fn new(group: Group, index: usize) -> WorkerId {
        WorkerId { group, index }
    }
}

impl Display for WorkerId {
    fn fmt(&self, f: &mut Formatter) -> FmtResult {
        write!(f, "{}{}", self.group, self.index)
    }
}

/// Number of workers in each group.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct Population {
    counts: [usize; 2],
}

impl Population {
    pub fn new(a: usize, b: usize) -> Population {
        Population { counts: [a, b] }
    }

    #[inline]
    pub fn of(&self, group: Group) -> usize {
        self.counts[group.index()]
    }

    pub fn total(&self) -> usize {
        self.counts[0] + self.counts[1]
    }

    pub fn contains(&self, worker: WorkerId) -> bool {
        worker.index < self.of(worker.group)
    }

    /// Every worker, group A first.
    pub fn workers(&self) -> impl Iterator<Item = WorkerId> + '_ {
        Group::ALL.iter().flat_map(move |&group| {
            (0..self.of(group)).map(move |index| WorkerId::new(group, index))
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn other_flips() {
        assert_eq!(Group::A.other(), Group::B);
        assert_eq!(Group::B.other().other(), Group::B);
    }

    #[test]
    fn population_enumerates_workers() {
        let population = Population::new(2, 1);
        let workers: Vec<_> = population.workers().collect();
        assert_eq!(workers, vec![
            WorkerId::new(Group::A, 0),
            WorkerId::new(Group::A, 1),
            WorkerId::new(Group::B, 0),
        ]);
        assert_eq!(population.total(), 3);
        assert!(population.contains(WorkerId::new(Group::B, 0)));
        assert!(!population.contains(WorkerId::new(Group::B, 1)));
    }

    #[test]
    fn worker_display() {
        assert_eq!(WorkerId::new(Group::B, 7).to_string(), "B7");
    }
}
