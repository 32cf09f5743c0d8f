// src/config/model.rs

use std::path::PathBuf;

use chrono::{Duration, Utc};

use crate::cli::CliArgs;
use crate::errors::{PipedagError, Result};

/// Validated run configuration.
///
/// This is the bundle the scheduler and parser consume; everything here comes
/// from [`CliArgs`], with defaults filled in.
#[derive(Debug, Clone)]
pub struct RunConfig {
    /// Root directory of the workflow files.
    pub work_path: PathBuf,

    /// Directory for the persistent status store.
    pub meta_path: PathBuf,

    /// Entry workflow file, relative to `work_path`.
    pub entry_file: String,

    /// Run name; namespaces status records under `meta_path`.
    pub node_name: String,

    /// Business date bound into jobs as the `bizdate` builtin.
    pub bizdate: String,

    /// Maximum consecutive failures per job within one run.
    pub max_retry: u32,

    /// Engine toggles.
    pub hadoop: bool,
    pub hive: bool,
    pub odps: bool,
}

impl RunConfig {
    /// Build and validate a run configuration from parsed CLI arguments.
    pub fn from_args(args: CliArgs) -> Result<Self> {
        let cfg = Self {
            work_path: PathBuf::from(args.work),
            meta_path: PathBuf::from(args.meta),
            entry_file: args.flow,
            node_name: args.name,
            bizdate: args.bizdate.unwrap_or_else(default_bizdate),
            max_retry: args.max_retry,
            hadoop: args.hadoop,
            hive: args.hive,
            odps: args.odps,
        };
        cfg.validate()?;
        Ok(cfg)
    }

    fn validate(&self) -> Result<()> {
        if self.entry_file.is_empty() {
            return Err(PipedagError::Config(
                "entry workflow file (--flow) must not be empty".to_string(),
            ));
        }
        if self.node_name.is_empty() {
            return Err(PipedagError::Config(
                "run name (--name) must not be empty".to_string(),
            ));
        }
        if self.max_retry == 0 {
            return Err(PipedagError::Config(
                "--max-retry must be >= 1 (got 0)".to_string(),
            ));
        }
        if !self.work_path.is_dir() {
            return Err(PipedagError::Config(format!(
                "work directory does not exist: {:?}",
                self.work_path
            )));
        }
        Ok(())
    }
}

/// Default business date: yesterday, `YYYYMMDD`.
fn default_bizdate() -> String {
    (Utc::now() - Duration::days(1)).format("%Y%m%d").to_string()
}
