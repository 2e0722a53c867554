//! Publishes connection pool gauges for the party store.

use sqlx::PgPool;

use super::scheduler::{Job, JobFrequency};

const SAMPLE_INTERVAL_SECS: u64 = 10;

/// Samples the pool behind `PgPartyStore` so saturation shows up next to the
/// query duration histograms.
pub struct PoolMetricsJob {
    pool: PgPool,
}

impl PoolMetricsJob {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait::async_trait]
impl Job for PoolMetricsJob {
    fn name(&self) -> &'static str {
        "pool_metrics"
    }

    fn frequency(&self) -> JobFrequency {
        JobFrequency::Seconds(SAMPLE_INTERVAL_SECS)
    }

    async fn execute(&self) -> Result<(), String> {
        if self.pool.is_closed() {
            return Err("Database pool is closed".to_string());
        }
        persistence::metrics::record_pool_metrics(&self.pool);
        tracing::trace!(
            size = self.pool.size(),
            idle = self.pool.num_idle(),
            "Pool gauges sampled"
        );
        Ok(())
    }
}
