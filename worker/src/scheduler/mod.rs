pub mod schedule;
pub mod scheduled_worker;

use anyhow::Result;
use async_trait::async_trait;

use crate::usecases::JobReport;

/// A unit of periodic work. `run` must be safe to call while a previous run is still going.
#[async_trait]
pub trait Job: Send + Sync {
    fn name(&self) -> &'static str;

    async fn run(&self) -> Result<JobReport>;
}
