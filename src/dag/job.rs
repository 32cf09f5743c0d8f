// src/dag/job.rs

//! Job node types.

use std::collections::BTreeMap;
use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

/// Closed set of job types. The dispatcher refuses anything else.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum JobType {
    /// No-op synchronization point.
    Dummy,
    /// Local shell script.
    Script,
    /// Hadoop streaming job.
    Hadoop,
    /// Hive query.
    Hive,
    /// ODPS query.
    Odps,
}

impl JobType {
    /// Attribute keys a job of this type must carry after parsing.
    ///
    /// Each inner slice is an "any of" group: at least one key of the group
    /// must be present.
    pub fn required_attrs(self) -> &'static [&'static [&'static str]] {
        match self {
            JobType::Dummy => &[],
            JobType::Script => &[&["cmd"]],
            JobType::Hadoop => &[&["jar"], &["mapper"], &["reducer"], &["input"], &["output"]],
            JobType::Hive => &[&["hql", "file"]],
            JobType::Odps => &[&["cmd", "file"]],
        }
    }
}

impl FromStr for JobType {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "dummy" => Ok(JobType::Dummy),
            "script" => Ok(JobType::Script),
            "hadoop" => Ok(JobType::Hadoop),
            "hive" => Ok(JobType::Hive),
            "odps" => Ok(JobType::Odps),
            other => Err(format!("unknown job type: {other}")),
        }
    }
}

impl fmt::Display for JobType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            JobType::Dummy => "dummy",
            JobType::Script => "script",
            JobType::Hadoop => "hadoop",
            JobType::Hive => "hive",
            JobType::Odps => "odps",
        };
        f.write_str(s)
    }
}

/// Per-job lifecycle state.
///
/// `Finished` and `Failed` are persisted across runs; `Started` persists too,
/// and on recovery means "another run may own this job". `NotStarted` is the
/// in-memory default and never needs to be stored.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum JobStatus {
    NotStarted,
    Started,
    Finished,
    Failed,
}

impl fmt::Display for JobStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            JobStatus::NotStarted => "NotStarted",
            JobStatus::Started => "Started",
            JobStatus::Finished => "Finished",
            JobStatus::Failed => "Failed",
        };
        f.write_str(s)
    }
}

/// A node in the DAG.
#[derive(Debug, Clone)]
pub struct Job {
    /// Unique name within the DAG.
    pub name: String,

    pub job_type: JobType,

    /// Resolved variables bound into the job (inputs, outputs, parameters).
    ///
    /// Values may still contain builtin references (`${bizdate}`,
    /// `${jobreport}`) until [`crate::dag::Dag::resolve_job`] runs.
    pub attrs: BTreeMap<String, String>,

    /// Names of predecessor jobs.
    pub pre: Vec<String>,

    /// Subset of `pre` whose edges are non-strict: this job may proceed once
    /// the predecessor has either finished or exhausted its retries.
    pub non_strict: Vec<String>,

    /// Names of successor jobs. Populated when the DAG is built.
    pub post: Vec<String>,

    pub status: JobStatus,
}

impl Job {
    pub fn new(name: impl Into<String>, job_type: JobType) -> Self {
        Self {
            name: name.into(),
            job_type,
            attrs: BTreeMap::new(),
            pre: Vec::new(),
            non_strict: Vec::new(),
            post: Vec::new(),
            status: JobStatus::NotStarted,
        }
    }

    /// Check that every required attribute for this job's type is present.
    ///
    /// Returns the first missing "any of" group on failure.
    pub fn check_required_attrs(&self) -> Result<(), String> {
        for group in self.job_type.required_attrs() {
            if !group.iter().any(|key| self.attrs.contains_key(*key)) {
                return Err(format!(
                    "job '{}' (type {}) is missing required attribute {}",
                    self.name,
                    self.job_type,
                    group.join(" or ")
                ));
            }
        }
        Ok(())
    }
}
