// src/status/tracker.rs

use std::collections::HashMap;
use std::path::Path;

use crate::dag::job::{Job, JobStatus};
use crate::errors::Result;
use crate::status::store::StatusStore;

/// Write-through status tracker.
///
/// Terminal statuses live in the persistent store and survive process exits;
/// fail counters are process-local, so retries do not survive a restart
/// (survivors are `Finished` jobs, which get skipped).
#[derive(Debug)]
pub struct StatusTracker {
    store: StatusStore,
    fails: HashMap<String, u32>,
}

impl StatusTracker {
    pub fn open(meta_dir: &Path, run_name: &str) -> Result<Self> {
        Ok(Self {
            store: StatusStore::open(meta_dir, run_name)?,
            fails: HashMap::new(),
        })
    }

    /// The persisted status for a job, `NotStarted` if none.
    pub fn get_status(&self, job: &Job) -> JobStatus {
        self.store.get(&job.name).unwrap_or(JobStatus::NotStarted)
    }

    /// Write the job's current status through to the persistent store.
    pub fn set_status(&mut self, job: &Job) -> Result<()> {
        self.store.set(&job.name, job.status)
    }

    /// Stable ordered serialization of the persisted statuses.
    ///
    /// This is the value of the `jobreport` builtin.
    pub fn to_json(&self) -> String {
        serde_json::to_string(self.store.snapshot()).expect("status map serializes")
    }

    pub fn fail_count(&self, job_name: &str) -> u32 {
        self.fails.get(job_name).copied().unwrap_or(0)
    }

    pub fn record_failure(&mut self, job_name: &str) {
        *self.fails.entry(job_name.to_string()).or_insert(0) += 1;
    }

    pub fn clear_failures(&mut self, job_name: &str) {
        self.fails.remove(job_name);
    }

    /// True when no job has a pending failure count.
    pub fn is_clean(&self) -> bool {
        self.fails.is_empty()
    }

    /// Names with a non-zero failure count, sorted.
    pub fn failed_jobs(&self) -> Vec<String> {
        let mut names: Vec<String> = self.fails.keys().cloned().collect();
        names.sort();
        names
    }
}
