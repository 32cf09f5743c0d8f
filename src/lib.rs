// src/lib.rs

pub mod cli;
pub mod config;
pub mod dag;
pub mod errors;
pub mod exec;
pub mod flow;
pub mod logging;
pub mod sched;
pub mod status;

use tracing::info;

use crate::cli::CliArgs;
use crate::config::RunConfig;
use crate::dag::Dag;
use crate::errors::Result;
use crate::sched::Scheduler;
use crate::status::StatusTracker;

/// High-level entry point used by `main.rs`.
///
/// This wires together:
/// - run configuration from the CLI
/// - the workflow parser
/// - the DAG
/// - the status tracker
/// - the wave scheduler
pub async fn run(args: CliArgs) -> Result<()> {
    let cfg = RunConfig::from_args(args)?;
    info!(
        flow = %cfg.entry_file,
        work = ?cfg.work_path,
        name = %cfg.node_name,
        bizdate = %cfg.bizdate,
        max_retry = cfg.max_retry,
        "starting run"
    );

    let jobs = flow::parse_flow(&cfg.entry_file, &cfg.work_path)?;
    let mut dag = Dag::from_jobs(jobs)?;

    let tracker = StatusTracker::open(&cfg.meta_path, &cfg.node_name)?;
    let scheduler = Scheduler::new(&cfg, tracker).await?;
    scheduler.run(&mut dag).await
}
