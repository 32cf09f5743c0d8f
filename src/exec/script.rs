// src/exec/script.rs

use anyhow::anyhow;
use async_trait::async_trait;

use crate::dag::job::Job;
use crate::errors::Result;
use crate::exec::process::{resolve_binary, run_shell};
use crate::exec::Executor;

/// Runs a job's `cmd` attribute through the local shell.
#[derive(Debug, Default)]
pub struct ScriptExec;

impl ScriptExec {
    pub fn new() -> Self {
        Self
    }
}

#[async_trait]
impl Executor for ScriptExec {
    async fn setup(&self) -> Result<()> {
        resolve_binary("PIPEDAG_SHELL", "sh").map(|_| ())
    }

    async fn run(&self, job: &Job) -> Result<()> {
        let cmd = job
            .attrs
            .get("cmd")
            .ok_or_else(|| anyhow!("script job '{}' has no cmd attribute", job.name))?;
        run_shell(&job.name, cmd).await
    }
}
