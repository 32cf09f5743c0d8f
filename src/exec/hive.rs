// src/exec/hive.rs

use anyhow::anyhow;
use async_trait::async_trait;
use tracing::info;

use crate::dag::job::Job;
use crate::errors::Result;
use crate::exec::process::{resolve_binary, run_command};
use crate::exec::Executor;

/// Runs Hive queries: either an inline `hql` attribute or a `file` attribute
/// pointing at a query file.
#[derive(Debug, Default)]
pub struct HiveExec;

impl HiveExec {
    pub fn new() -> Self {
        Self
    }

    fn binary(&self) -> Result<String> {
        resolve_binary("HIVE_BIN", "hive")
    }
}

#[async_trait]
impl Executor for HiveExec {
    async fn setup(&self) -> Result<()> {
        self.binary().map(|_| ())
    }

    async fn run(&self, job: &Job) -> Result<()> {
        let args = if let Some(hql) = job.attrs.get("hql") {
            vec!["-e".to_string(), hql.clone()]
        } else if let Some(file) = job.attrs.get("file") {
            vec!["-f".to_string(), file.clone()]
        } else {
            return Err(anyhow!("hive job '{}' has neither hql nor file attribute", job.name).into());
        };

        info!(job = %job.name, "launching hive query");
        run_command(&job.name, &self.binary()?, &args).await
    }
}
