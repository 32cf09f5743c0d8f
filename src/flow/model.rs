// src/flow/model.rs

use serde::Deserialize;

/// A step file: groups jobs and includes upstream steps.
///
/// ```toml
/// name = "daily-report"
/// vars = ["root=/data/${bizdate}"]
///
/// [[dep]]
/// res = "upstream.step.toml"
/// vars = ["mode=full"]
///
/// [[job]]
/// res = "clean.job.toml"
/// vars = ["input=${root}/raw"]
/// ```
#[derive(Debug, Clone, Deserialize)]
pub struct StepFile {
    pub name: String,

    /// Step-scope `key=expression` bindings.
    #[serde(default)]
    pub vars: Vec<String>,

    /// Upstream step files to include.
    #[serde(default)]
    pub dep: Vec<DepRef>,

    /// Job files belonging to this step.
    #[serde(default)]
    pub job: Vec<JobRef>,
}

/// Reference to an included step file, with local variable bindings.
#[derive(Debug, Clone, Deserialize)]
pub struct DepRef {
    pub res: String,

    #[serde(default)]
    pub vars: Vec<String>,
}

/// Reference to a job file, with local variable bindings.
#[derive(Debug, Clone, Deserialize)]
pub struct JobRef {
    pub res: String,

    #[serde(default)]
    pub vars: Vec<String>,
}

/// A job file.
///
/// ```toml
/// name = "clean"
/// type = "script"
/// pre = ["ingest"]
/// non_strict = ["ingest"]
/// vars = ["cmd=clean.sh ${input}"]
/// ```
#[derive(Debug, Clone, Deserialize)]
pub struct JobFile {
    pub name: String,

    #[serde(rename = "type")]
    pub job_type: String,

    /// Predecessor job names.
    #[serde(default)]
    pub pre: Vec<String>,

    /// Subset of `pre` whose edges tolerate upstream retry exhaustion.
    #[serde(default)]
    pub non_strict: Vec<String>,

    #[serde(default)]
    pub vars: Vec<String>,
}
