// src/exec/mod.rs

//! Job executors.
//!
//! Each enabled engine registers one [`Executor`] in the
//! [`ExecutorRegistry`], keyed by [`JobType`]. Executors are set up once per
//! run before the first job dispatches; `run` must be safe to call
//! concurrently on distinct jobs.
//!
//! - [`process`] is the shared child-process plumbing (spawn, stream
//!   stdout/stderr into the logs, translate exit codes).
//! - [`dummy`], [`script`], [`hadoop`], [`hive`], [`odps`] are the concrete
//!   engines.

pub mod dummy;
pub mod hadoop;
pub mod hive;
pub mod odps;
pub mod process;
pub mod script;

use std::collections::HashMap;
use std::sync::Arc;

use async_trait::async_trait;

use crate::config::RunConfig;
use crate::dag::job::{Job, JobType};
use crate::errors::{PipedagError, Result};

pub use dummy::DummyExec;
pub use hadoop::HadoopExec;
pub use hive::HiveExec;
pub use odps::OdpsExec;
pub use script::ScriptExec;

/// Uniform contract every engine implements.
#[async_trait]
pub trait Executor: Send + Sync {
    /// One-shot per-run initialization (check binaries, warm credentials).
    async fn setup(&self) -> Result<()>;

    /// Execute a resolved job to completion. Any error marks the job
    /// `Failed` and counts toward its retries.
    async fn run(&self, job: &Job) -> Result<()>;
}

/// Job type → executor table.
#[derive(Default)]
pub struct ExecutorRegistry {
    executors: HashMap<JobType, Arc<dyn Executor>>,
}

impl ExecutorRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Build the registry for a run: dummy and script are always present,
    /// the big-data engines only when enabled in the configuration.
    pub fn from_config(cfg: &RunConfig) -> Self {
        let mut registry = Self::new();
        registry.register(JobType::Dummy, Arc::new(DummyExec::new()));
        registry.register(JobType::Script, Arc::new(ScriptExec::new()));

        if cfg.hadoop {
            registry.register(JobType::Hadoop, Arc::new(HadoopExec::new()));
        }
        if cfg.hive {
            registry.register(JobType::Hive, Arc::new(HiveExec::new()));
        }
        if cfg.odps {
            registry.register(JobType::Odps, Arc::new(OdpsExec::new()));
        }

        registry
    }

    pub fn register(&mut self, job_type: JobType, executor: Arc<dyn Executor>) {
        self.executors.insert(job_type, executor);
    }

    pub fn contains(&self, job_type: JobType) -> bool {
        self.executors.contains_key(&job_type)
    }

    pub fn lookup(&self, job_type: JobType) -> Result<Arc<dyn Executor>> {
        self.executors
            .get(&job_type)
            .cloned()
            .ok_or_else(|| PipedagError::NoExecutorForType(job_type.to_string()))
    }

    /// Set up every registered executor. Any failure aborts the run before
    /// the first job dispatches.
    pub async fn setup_all(&self) -> Result<()> {
        for executor in self.executors.values() {
            executor.setup().await?;
        }
        Ok(())
    }
}
