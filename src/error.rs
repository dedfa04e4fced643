//! Error types for the lock and the simulation driver.

use std::io;
use std::time::Duration;
use thiserror::Error;

/// Returned by [`GroupMutex::enter_timeout`](crate::GroupMutex::enter_timeout)
/// when the deadline passed before the worker could be admitted.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
#[error("timed out after {0:?} waiting for admission")]
pub struct WaitTimedOut(pub Duration);

/// Invalid simulation settings.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ConfigError {
    /// Neither group has any workers.
    #[error("population is empty: at least one worker is required")]
    EmptyPopulation,

    /// Cycle-bounded runs need at least one cycle per worker.
    #[error("cycle count must be positive")]
    ZeroCycles,

    /// Time-bounded runs need a non-zero duration.
    #[error("run duration must be positive")]
    ZeroDuration,
}

/// Errors that prevent a simulation from running to completion.
#[derive(Debug, Error)]
pub enum SimulationError {
    #[error("invalid configuration: {0}")]
    Config(#[from] ConfigError),

    #[error("failed to spawn worker {worker}: {source}")]
    Spawn {
        worker: String,
        #[source]
        source: io::Error,
    },
}

/// Result type alias for simulation operations
pub type Result<T> = std::result::Result<T, SimulationError>;
