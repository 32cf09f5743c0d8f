// src/sched/scheduler.rs

//! The wave loop.
//!
//! Repeatedly: scan in-degrees for ready jobs, dispatch them all
//! concurrently, join at a barrier, then sequentially update fail counts and
//! successor in-degrees. The loop ends when a freshly generated ready queue
//! is empty.

use std::sync::{Arc, Mutex};

use anyhow::anyhow;
use tracing::{debug, error, info, warn};

use crate::config::RunConfig;
use crate::dag::builtins::Builtins;
use crate::dag::graph::{resolve_job, Dag};
use crate::dag::job::{Job, JobStatus, JobType};
use crate::errors::{PipedagError, Result};
use crate::exec::ExecutorRegistry;
use crate::status::StatusTracker;

pub struct Scheduler {
    registry: Arc<ExecutorRegistry>,
    tracker: Arc<Mutex<StatusTracker>>,
    max_retry: u32,
    bizdate: String,
}

impl Scheduler {
    /// Build a scheduler for a run: registers the enabled executors and sets
    /// them all up. Any setup failure aborts construction.
    pub async fn new(cfg: &RunConfig, tracker: StatusTracker) -> Result<Self> {
        let registry = ExecutorRegistry::from_config(cfg);
        registry.setup_all().await?;
        Ok(Self::with_registry(
            registry,
            tracker,
            cfg.max_retry,
            cfg.bizdate.clone(),
        ))
    }

    /// Build a scheduler around an already-populated registry.
    ///
    /// Unlike [`Scheduler::new`], this does not run executor setup; the
    /// caller owns that.
    pub fn with_registry(
        registry: ExecutorRegistry,
        tracker: StatusTracker,
        max_retry: u32,
        bizdate: impl Into<String>,
    ) -> Self {
        Self {
            registry: Arc::new(registry),
            tracker: Arc::new(Mutex::new(tracker)),
            max_retry,
            bizdate: bizdate.into(),
        }
    }

    /// Drive the DAG to quiescence.
    ///
    /// Succeeds iff no job has pending failures and every job reached
    /// `Finished`; otherwise returns `SomeJobsFailed` naming the failed and
    /// the never-finished jobs.
    pub async fn run(&self, dag: &mut Dag) -> Result<()> {
        self.check_dag(dag)?;

        let mut wave = 0u32;
        let mut queue = self.gen_run_queue(dag);
        while !queue.is_empty() {
            wave += 1;
            self.run_wave(&queue, dag, wave).await?;

            for name in &queue {
                self.update_fail_count(dag, name);
                self.update_dependences(dag, name);
            }

            queue = self.gen_run_queue(dag);
        }

        let (failed, report) = {
            let tracker = self.tracker.lock().expect("tracker lock poisoned");
            (tracker.failed_jobs(), tracker.to_json())
        };
        info!(%report, "final job report");

        let mut unfinished: Vec<String> = dag
            .jobs
            .values()
            .filter(|job| job.status != JobStatus::Finished && !failed.contains(&job.name))
            .map(|job| job.name.clone())
            .collect();
        unfinished.sort();

        if failed.is_empty() && unfinished.is_empty() {
            info!("all jobs done");
            Ok(())
        } else {
            error!(?failed, ?unfinished, "some jobs failed");
            Err(PipedagError::SomeJobsFailed { failed, unfinished })
        }
    }

    /// Verify every job's type has a registered executor before anything
    /// runs.
    fn check_dag(&self, dag: &Dag) -> Result<()> {
        for job in dag.jobs.values() {
            if !self.registry.contains(job.job_type) {
                return Err(PipedagError::NoExecutorForType(job.job_type.to_string()));
            }
        }
        Ok(())
    }

    /// Scan in-degrees for jobs that may run now.
    ///
    /// A job is ready when its in-degree is zero, it is neither `Finished`
    /// nor `Started`, and it has retries left. Retry-exhausted jobs are
    /// logged once per scan but never enqueued again.
    fn gen_run_queue(&self, dag: &Dag) -> Vec<String> {
        let tracker = self.tracker.lock().expect("tracker lock poisoned");

        let mut queue = Vec::new();
        for (name, in_degree) in &dag.in_degrees {
            let job = dag
                .jobs
                .get(name)
                .expect("in-degree entry with no corresponding job");

            let fails = tracker.fail_count(name);
            if *in_degree == 0
                && job.status != JobStatus::Finished
                && job.status != JobStatus::Started
                && fails < self.max_retry
            {
                queue.push(name.clone());
            }
            if fails >= self.max_retry {
                error!(
                    job = %name,
                    max_retry = self.max_retry,
                    "job reached max retry times"
                );
            }
        }

        queue.sort();
        queue
    }

    /// Launch every job in the queue concurrently and wait for all of them
    /// to settle, then fold the settled statuses back into the DAG.
    async fn run_wave(&self, queue: &[String], dag: &mut Dag, wave: u32) -> Result<()> {
        info!(wave, jobs = queue.len(), "dispatching wave");

        let mut handles = Vec::with_capacity(queue.len());
        for name in queue {
            let job = dag
                .jobs
                .get(name)
                .cloned()
                .expect("ready job missing from DAG");

            handles.push(tokio::spawn(dispatch_job(
                job,
                Arc::clone(&self.registry),
                Arc::clone(&self.tracker),
                dag.builtins.clone(),
                self.bizdate.clone(),
            )));
        }

        // Barrier: every worker settles before any bookkeeping happens.
        let mut settled = Vec::with_capacity(handles.len());
        for handle in handles {
            settled.push(
                handle
                    .await
                    .map_err(|e| anyhow!("wave worker panicked: {e}"))?,
            );
        }

        // Only the status flows back into the DAG. Workers resolve attrs on
        // their own clone; the DAG keeps the templates so a retry re-resolves
        // against fresh builtins.
        for result in settled {
            let settled_job = result?;
            let job = dag
                .jobs
                .get_mut(&settled_job.name)
                .expect("settled job missing from DAG");
            job.status = settled_job.status;
        }

        Ok(())
    }

    fn update_fail_count(&self, dag: &Dag, name: &str) {
        let job = &dag.jobs[name];
        let mut tracker = self.tracker.lock().expect("tracker lock poisoned");
        match job.status {
            JobStatus::Failed => {
                error!(job = %name, "job failed");
                tracker.record_failure(name);
            }
            JobStatus::Finished => tracker.clear_failures(name),
            _ => {}
        }
    }

    /// Apply the edge-decrement rule to each successor of a settled job.
    ///
    /// Successors whose in-degree is already zero are skipped; otherwise a
    /// retrying predecessor would decrement them twice.
    fn update_dependences(&self, dag: &mut Dag, name: &str) {
        let (status, posts) = {
            let job = &dag.jobs[name];
            (job.status, job.post.clone())
        };
        let fails = {
            self.tracker
                .lock()
                .expect("tracker lock poisoned")
                .fail_count(name)
        };

        for post in posts {
            let in_degree = *dag
                .in_degrees
                .get(&post)
                .expect("successor missing from in-degree table");
            if in_degree == 0 {
                continue;
            }

            let satisfied = match status {
                JobStatus::Finished => true,
                JobStatus::Failed => {
                    fails >= self.max_retry
                        && dag.relation(name, &post).is_some_and(|r| r.non_strict)
                }
                _ => false,
            };

            if satisfied {
                debug!(job = %name, successor = %post, "decrementing in-degree");
                dag.in_degrees.insert(post, in_degree - 1);
            }
        }
    }
}

/// Per-job dispatch, run on its own worker within a wave.
///
/// Worker-internal failures (resolution, execution) settle the job as
/// `Failed` and do not escape; persistence failures do, aborting the run.
async fn dispatch_job(
    mut job: Job,
    registry: Arc<ExecutorRegistry>,
    tracker: Arc<Mutex<StatusTracker>>,
    builtins: Builtins,
    bizdate: String,
) -> Result<Job> {
    info!(job = %job.name, "run job");

    builtins.set_bizdate(&bizdate);
    {
        let tracker = tracker.lock().expect("tracker lock poisoned");
        builtins.set_job_report(&tracker.to_json());
    }

    if let Err(err) = resolve_job(&builtins, &mut job) {
        error!(job = %job.name, error = %err, "variable resolution failed");
        job.status = JobStatus::Failed;
        persist_status(&tracker, &builtins, &job)?;
        return Ok(job);
    }

    if job.job_type == JobType::Dummy {
        job.status = JobStatus::Finished;
        persist_status(&tracker, &builtins, &job)?;
        return Ok(job);
    }

    // Preflight guarantees this; a miss here is a programming error and
    // aborts the run.
    let executor = registry.lookup(job.job_type)?;

    let persisted = {
        let tracker = tracker.lock().expect("tracker lock poisoned");
        tracker.get_status(&job)
    };
    debug!(job = %job.name, status = %persisted, "checked persisted job status");

    match persisted {
        JobStatus::Finished => {
            info!(job = %job.name, "job is already finished, skip");
            job.status = JobStatus::Finished;
            return Ok(job);
        }
        JobStatus::Started => {
            warn!(job = %job.name, "job is already started, skip: another run may own it");
            job.status = JobStatus::Started;
            return Ok(job);
        }
        _ => {}
    }

    job.status = JobStatus::Started;
    persist_status(&tracker, &builtins, &job)?;

    match executor.run(&job).await {
        Ok(()) => job.status = JobStatus::Finished,
        Err(err) => {
            error!(job = %job.name, error = %err, "job execution failed");
            job.status = JobStatus::Failed;
        }
    }

    persist_status(&tracker, &builtins, &job)?;
    debug!(job = %job.name, status = %job.status, "job settled");
    Ok(job)
}

/// Write the job's status through the tracker and republish the job report
/// under the same lock, so readers never observe the two out of sync.
fn persist_status(
    tracker: &Mutex<StatusTracker>,
    builtins: &Builtins,
    job: &Job,
) -> Result<()> {
    let mut tracker = tracker.lock().expect("tracker lock poisoned");
    tracker.set_status(job)?;
    builtins.set_job_report(&tracker.to_json());
    Ok(())
}
