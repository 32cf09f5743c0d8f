// src/exec/dummy.rs

use async_trait::async_trait;
use tracing::debug;

use crate::dag::job::Job;
use crate::errors::Result;
use crate::exec::Executor;

/// No-op executor backing `dummy` jobs, which exist purely as
/// synchronization points in the DAG.
#[derive(Debug, Default)]
pub struct DummyExec;

impl DummyExec {
    pub fn new() -> Self {
        Self
    }
}

#[async_trait]
impl Executor for DummyExec {
    async fn setup(&self) -> Result<()> {
        Ok(())
    }

    async fn run(&self, job: &Job) -> Result<()> {
        debug!(job = %job.name, "dummy job, nothing to do");
        Ok(())
    }
}
