// src/exec/hadoop.rs

use anyhow::anyhow;
use async_trait::async_trait;
use tracing::info;

use crate::dag::job::Job;
use crate::errors::Result;
use crate::exec::process::{resolve_binary, run_command};
use crate::exec::Executor;

/// Launches Hadoop streaming jobs.
///
/// A hadoop job's attributes name the streaming jar plus `mapper`,
/// `reducer`, `input`, `output`; `files` is an optional comma-separated list
/// shipped alongside the job.
#[derive(Debug, Default)]
pub struct HadoopExec;

impl HadoopExec {
    pub fn new() -> Self {
        Self
    }

    fn binary(&self) -> Result<String> {
        resolve_binary("HADOOP_BIN", "hadoop")
    }
}

#[async_trait]
impl Executor for HadoopExec {
    async fn setup(&self) -> Result<()> {
        self.binary().map(|_| ())
    }

    async fn run(&self, job: &Job) -> Result<()> {
        let mut args = vec![
            "jar".to_string(),
            require_attr(job, "jar")?.clone(),
            "-input".to_string(),
            require_attr(job, "input")?.clone(),
            "-output".to_string(),
            require_attr(job, "output")?.clone(),
            "-mapper".to_string(),
            require_attr(job, "mapper")?.clone(),
            "-reducer".to_string(),
            require_attr(job, "reducer")?.clone(),
        ];

        if let Some(files) = job.attrs.get("files") {
            for file in files.split(',').filter(|f| !f.is_empty()) {
                args.push("-file".to_string());
                args.push(file.to_string());
            }
        }

        info!(job = %job.name, "launching hadoop streaming job");
        run_command(&job.name, &self.binary()?, &args).await
    }
}

fn require_attr<'a>(job: &'a Job, key: &str) -> Result<&'a String> {
    job.attrs
        .get(key)
        .ok_or_else(|| anyhow!("hadoop job '{}' has no {key} attribute", job.name).into())
}
