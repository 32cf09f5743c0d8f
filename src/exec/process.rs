// src/exec/process.rs

//! Shared child-process plumbing.

use std::path::Path;
use std::process::Stdio;

use anyhow::Context;
use tokio::io::{AsyncBufReadExt, BufReader};
use tokio::process::Command;
use tracing::{debug, error, info};

use crate::errors::{PipedagError, Result};

/// Spawn a child process and drive it to completion.
///
/// Stdout is streamed line-by-line to info logs and stderr to error logs,
/// both tagged with the job name. Exit status 0 is success; anything else is
/// an `Exec` error carrying the code.
pub async fn run_command(job_name: &str, program: &str, args: &[String]) -> Result<()> {
    debug!(job = %job_name, program, ?args, "spawning child process");

    let mut cmd = Command::new(program);
    cmd.args(args)
        .stdout(Stdio::piped())
        .stderr(Stdio::piped())
        .kill_on_drop(true);

    let mut child = cmd
        .spawn()
        .with_context(|| format!("spawning process for job '{job_name}'"))?;

    let stderr_task = child.stderr.take().map(|stderr| {
        let job = job_name.to_string();
        tokio::spawn(async move {
            let mut lines = BufReader::new(stderr).lines();
            while let Ok(Some(line)) = lines.next_line().await {
                if !line.is_empty() {
                    error!(job = %job, "{line}");
                }
            }
        })
    });

    if let Some(stdout) = child.stdout.take() {
        let mut lines = BufReader::new(stdout).lines();
        while let Ok(Some(line)) = lines.next_line().await {
            if !line.is_empty() {
                info!(job = %job_name, "{line}");
            }
        }
    }

    let status = child
        .wait()
        .await
        .with_context(|| format!("waiting for process of job '{job_name}'"))?;

    if let Some(task) = stderr_task {
        let _ = task.await;
    }

    if status.success() {
        Ok(())
    } else {
        Err(PipedagError::Exec {
            job: job_name.to_string(),
            code: status.code().unwrap_or(-1),
        })
    }
}

/// Run a command line through the shell.
pub async fn run_shell(job_name: &str, command_line: &str) -> Result<()> {
    run_command(
        job_name,
        "sh",
        &["-c".to_string(), command_line.to_string()],
    )
    .await
}

/// Resolve an engine binary: an env override wins, otherwise the default
/// name is looked up on `PATH`.
pub fn resolve_binary(env_override: &str, default: &str) -> Result<String> {
    let name = std::env::var(env_override).unwrap_or_else(|_| default.to_string());

    let found = if name.contains('/') {
        Path::new(&name).is_file()
    } else {
        on_path(&name)
    };

    if found {
        Ok(name)
    } else {
        Err(PipedagError::Setup(format!(
            "binary '{name}' not found (set {env_override} to override)"
        )))
    }
}

fn on_path(name: &str) -> bool {
    let Ok(paths) = std::env::var("PATH") else {
        return false;
    };
    std::env::split_paths(&paths).any(|dir| dir.join(name).is_file())
}
