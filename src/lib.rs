//! Linux futex-based group mutual exclusion.
//!
//! [`GroupMutex`] lets any number of workers of one [`Group`] in at once
//! while keeping the two groups apart, with a turn rule that stops either
//! group from starving the other. [`sim`] drives the classic unisex bathroom
//! simulation on top of it.

#[cfg(not(target_os = "linux"))]
compile_error!("grouplock is built on Linux futexes");

mod sys;
pub mod raw;
mod mutex;
mod group;
mod group_mutex;
pub mod error;
pub mod sim;

pub use mutex::{Mutex, MutexGuard};
pub use group::{Group, Population, WorkerId};
pub use group_mutex::{Admission, GroupMutex, Occupancy, Snapshot};
pub use error::WaitTimedOut;
