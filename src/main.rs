use std::env;
use std::sync::Arc;
use std::time::Duration;
use anyhow::Result;
use clap::Parser;
use tracing_subscriber::filter::LevelFilter;
use tracing_subscriber::EnvFilter;
use grouplock::Population;
use grouplock::sim::{RandomPacer, Simulation, SimulationConfig, StopCondition};

#[derive(Parser)]
#[command(name = "bathroom")]
#[command(about = "Unisex bathroom simulation on a group mutual exclusion lock")]
struct Cli {
    /// Number of men (group A)
    #[arg(long, default_value_t = 25)]
    men: usize,

    /// Number of women (group B)
    #[arg(long, default_value_t = 25)]
    women: usize,

    /// Stop after this many seconds
    #[arg(long, default_value_t = 30, conflicts_with = "cycles")]
    duration_secs: u64,

    /// Stop once every worker has visited this many times
    #[arg(long)]
    cycles: Option<u64>,

    /// Longest pause outside the bathroom, in milliseconds
    #[arg(long, default_value_t = 4000)]
    max_work_ms: u64,

    /// Longest stay inside the bathroom, in milliseconds
    #[arg(long, default_value_t = 500)]
    max_use_ms: u64,
}

impl Cli {
    fn config(&self) -> SimulationConfig {
        SimulationConfig {
            population: Population::new(self.men, self.women),
            max_work: Duration::from_millis(self.max_work_ms),
            max_use: Duration::from_millis(self.max_use_ms),
            stop: match self.cycles {
                Some(n) => StopCondition::Cycles(n),
                None => StopCondition::After(Duration::from_secs(self.duration_secs)),
            },
        }
    }
}

/// `directives` in `RUST_LOG` syntax; INFO when empty.
fn log_filter(directives: &str) -> EnvFilter {
    EnvFilter::builder()
        .with_default_directive(LevelFilter::INFO.into())
        .parse_lossy(directives)
}

fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(log_filter(&env::var(EnvFilter::DEFAULT_ENV).unwrap_or_default()))
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();
    let config = cli.config();
    let pacer = Arc::new(RandomPacer::new(config.max_work, config.max_use));
    let report = Simulation::new(config)?.run(pacer)?;

    println!("{}", report);
    if !report.panicked.is_empty() {
        anyhow::bail!("{} worker(s) panicked", report.panicked.len());
    }
    Ok(())
}
