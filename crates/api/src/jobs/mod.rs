//! Background job scheduler and job implementations.

mod pool_metrics;
mod retirement_sweep;
mod scheduler;

pub use pool_metrics::PoolMetricsJob;
pub use retirement_sweep::RetirementSweepJob;
pub use scheduler::{Job, JobFrequency, JobScheduler};
