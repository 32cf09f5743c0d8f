// src/exec/odps.rs

use anyhow::anyhow;
use async_trait::async_trait;
use tracing::info;

use crate::dag::job::Job;
use crate::errors::Result;
use crate::exec::process::{resolve_binary, run_command};
use crate::exec::Executor;

/// Runs ODPS commands through `odpscmd`: either an inline `cmd` attribute or
/// a `file` attribute pointing at a script.
#[derive(Debug, Default)]
pub struct OdpsExec;

impl OdpsExec {
    pub fn new() -> Self {
        Self
    }

    fn binary(&self) -> Result<String> {
        resolve_binary("ODPS_BIN", "odpscmd")
    }
}

#[async_trait]
impl Executor for OdpsExec {
    async fn setup(&self) -> Result<()> {
        self.binary().map(|_| ())
    }

    async fn run(&self, job: &Job) -> Result<()> {
        let args = if let Some(cmd) = job.attrs.get("cmd") {
            vec!["-e".to_string(), cmd.clone()]
        } else if let Some(file) = job.attrs.get("file") {
            vec!["-f".to_string(), file.clone()]
        } else {
            return Err(anyhow!("odps job '{}' has neither cmd nor file attribute", job.name).into());
        };

        info!(job = %job.name, "launching odps command");
        run_command(&job.name, &self.binary()?, &args).await
    }
}
