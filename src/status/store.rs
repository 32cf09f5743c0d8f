// src/status/store.rs

use std::collections::BTreeMap;
use std::fs::{self, File};
use std::io::Write;
use std::path::{Path, PathBuf};

use tracing::debug;

use crate::dag::job::JobStatus;
use crate::errors::{PipedagError, Result};

/// Durable job name → status mapping, one JSON file per run name.
///
/// Writes go to a temp file in the same directory, are fsynced, then renamed
/// over the target, so a record is durable before `set` returns.
#[derive(Debug)]
pub struct StatusStore {
    path: PathBuf,
    statuses: BTreeMap<String, JobStatus>,
}

impl StatusStore {
    /// Open (or create) the store for the given run name under `meta_dir`.
    pub fn open(meta_dir: &Path, run_name: &str) -> Result<Self> {
        fs::create_dir_all(meta_dir).map_err(|e| {
            PipedagError::Persist(format!("creating meta directory {meta_dir:?}: {e}"))
        })?;

        let path = meta_dir.join(format!("{run_name}.status.json"));
        let statuses = if path.exists() {
            let contents = fs::read_to_string(&path)
                .map_err(|e| PipedagError::Persist(format!("reading status file {path:?}: {e}")))?;
            serde_json::from_str(&contents)
                .map_err(|e| PipedagError::Persist(format!("decoding status file {path:?}: {e}")))?
        } else {
            BTreeMap::new()
        };

        debug!(file = ?path, records = statuses.len(), "opened status store");
        Ok(Self { path, statuses })
    }

    pub fn get(&self, job_name: &str) -> Option<JobStatus> {
        self.statuses.get(job_name).copied()
    }

    /// Record a status and block until it is durable.
    pub fn set(&mut self, job_name: &str, status: JobStatus) -> Result<()> {
        self.statuses.insert(job_name.to_string(), status);
        self.persist()
    }

    /// The full ordered mapping, for snapshots.
    pub fn snapshot(&self) -> &BTreeMap<String, JobStatus> {
        &self.statuses
    }

    fn persist(&self) -> Result<()> {
        let contents = serde_json::to_string_pretty(&self.statuses)
            .map_err(|e| PipedagError::Persist(format!("encoding statuses: {e}")))?;

        let tmp = self.path.with_extension("json.tmp");
        let write = || -> std::io::Result<()> {
            let mut file = File::create(&tmp)?;
            file.write_all(contents.as_bytes())?;
            file.sync_all()?;
            fs::rename(&tmp, &self.path)
        };
        write().map_err(|e| {
            PipedagError::Persist(format!("writing status file {:?}: {e}", self.path))
        })
    }
}
