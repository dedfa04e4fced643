use std::time::Duration;
use crate::error::ConfigError;
use crate::group::Population;

/// When a simulation run ends.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StopCondition {
    /// Shut down after a wall-clock duration.
    After(Duration),
    /// Every worker makes this many visits, then the run shuts down.
    Cycles(u64),
}

/// Settings for a [`Simulation`](super::Simulation) run.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SimulationConfig {
    pub population: Population,
    /// Upper bound of the pause before each `enter`.
    pub max_work: Duration,
    /// Upper bound of the time spent inside.
    pub max_use: Duration,
    pub stop: StopCondition,
}

impl SimulationConfig {
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.population.total() == 0 {
            return Err(ConfigError::EmptyPopulation);
        }
        match self.stop {
            StopCondition::Cycles(0) => Err(ConfigError::ZeroCycles),
            StopCondition::After(d) if d.is_zero() => Err(ConfigError::ZeroDuration),
            _ => Ok(()),
        }
    }
}

impl Default for SimulationConfig {
    fn default() -> SimulationConfig {
        SimulationConfig {
            population: Population::new(25, 25),
            max_work: Duration::from_secs(4),
            max_use: Duration::from_millis(500),
            stop: StopCondition::After(Duration::from_secs(30)),
        }
    }
}
