// src/dag/builtins.rs

//! Shared late-bound context substituted into job attributes at dispatch.
//!
//! Updates are serialized behind a lock so that a resolving job always
//! observes a self-consistent snapshot, even while other wave workers are
//! publishing fresh job reports.

use std::collections::BTreeMap;
use std::sync::{Arc, RwLock};

/// Builtin variable name for the business date.
pub const BIZDATE: &str = "bizdate";

/// Builtin variable name for the latest tracker snapshot.
pub const JOB_REPORT: &str = "jobreport";

/// Shared builtin context owned by the DAG.
///
/// Cloning is cheap; all clones point at the same underlying map.
#[derive(Debug, Clone, Default)]
pub struct Builtins {
    vars: Arc<RwLock<BTreeMap<String, String>>>,
}

impl Builtins {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn set_bizdate(&self, bizdate: &str) {
        self.set(BIZDATE, bizdate);
    }

    pub fn set_job_report(&self, report: &str) {
        self.set(JOB_REPORT, report);
    }

    fn set(&self, name: &str, value: &str) {
        let mut vars = self.vars.write().expect("builtins lock poisoned");
        vars.insert(name.to_string(), value.to_string());
    }

    /// A self-consistent copy of the current builtin variables.
    pub fn snapshot(&self) -> BTreeMap<String, String> {
        self.vars.read().expect("builtins lock poisoned").clone()
    }

    /// Names the variable calculator must leave unresolved at parse time.
    pub fn reserved_names() -> [&'static str; 2] {
        [BIZDATE, JOB_REPORT]
    }
}
