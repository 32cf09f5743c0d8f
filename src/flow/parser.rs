// src/flow/parser.rs

use std::collections::BTreeMap;
use std::fs;
use std::path::{Path, PathBuf};
use std::str::FromStr;

use tracing::debug;

use crate::dag::builtins::Builtins;
use crate::dag::job::{Job, JobType};
use crate::errors::{PipedagError, Result};
use crate::flow::calc::{vars_to_map, Calc};
use crate::flow::model::{JobFile, StepFile};

/// Parse the entry step file (relative to `workdir`) and every file it
/// includes, returning the flat job set for the DAG.
///
/// Variable scoping is three layers, inner shadowing outer: predefined vars
/// from the including file, then step `vars`, then the local `[[dep]]` /
/// `[[job]]` `vars`. Builtin names (`bizdate`, `jobreport`) stay unresolved
/// for late binding.
pub fn parse_flow(entry: &str, workdir: &Path) -> Result<Vec<Job>> {
    let mut jobs = Vec::new();
    let mut include_stack = Vec::new();
    parse_step_file(entry, workdir, &BTreeMap::new(), &mut include_stack, &mut jobs)?;
    debug!(entry, jobs = jobs.len(), "parsed workflow");
    Ok(jobs)
}

fn parse_step_file(
    entry: &str,
    workdir: &Path,
    predefined: &BTreeMap<String, String>,
    include_stack: &mut Vec<PathBuf>,
    out: &mut Vec<Job>,
) -> Result<()> {
    let path = workdir.join(entry);
    if include_stack.contains(&path) {
        return Err(PipedagError::Parse(format!(
            "recursive include of step file {path:?}"
        )));
    }
    include_stack.push(path.clone());

    let step: StepFile = read_toml(&path)?;
    debug!(step = %step.name, file = ?path, "parsing step");

    let step_vars = parse_vars(&step.vars, &path)?;
    let step_scope = eval_scope(&[predefined, &step_vars], &path)?;

    for job_ref in &step.job {
        let local = parse_vars(&job_ref.vars, &path)?;
        let scope = eval_scope(&[&step_scope, &local], &path)?;
        out.push(parse_job_file(&job_ref.res, workdir, &scope)?);
    }

    for dep_ref in &step.dep {
        let local = parse_vars(&dep_ref.vars, &path)?;
        let scope = eval_scope(&[&step_scope, &local], &path)?;
        parse_step_file(&dep_ref.res, workdir, &scope, include_stack, out)?;
    }

    include_stack.pop();
    Ok(())
}

fn parse_job_file(
    entry: &str,
    workdir: &Path,
    predefined: &BTreeMap<String, String>,
) -> Result<Job> {
    let path = workdir.join(entry);
    let file: JobFile = read_toml(&path)?;

    let job_type = JobType::from_str(&file.job_type)
        .map_err(|e| PipedagError::Parse(format!("{e} (in {path:?})")))?;

    let local = parse_vars(&file.vars, &path)?;
    let attrs = eval_scope(&[predefined, &local], &path)?;

    let mut job = Job::new(file.name, job_type);
    job.attrs = attrs;
    job.pre = file.pre;
    job.non_strict = file.non_strict;
    job.check_required_attrs().map_err(PipedagError::Parse)?;

    debug!(job = %job.name, job_type = %job.job_type, file = ?path, "parsed job");
    Ok(job)
}

fn read_toml<T: serde::de::DeserializeOwned>(path: &Path) -> Result<T> {
    let contents = fs::read_to_string(path)
        .map_err(|e| PipedagError::Parse(format!("reading workflow file {path:?}: {e}")))?;
    toml::from_str(&contents)
        .map_err(|e| PipedagError::Parse(format!("parsing workflow file {path:?}: {e}")))
}

fn parse_vars(bindings: &[String], path: &Path) -> Result<BTreeMap<String, String>> {
    vars_to_map(bindings).map_err(|e| PipedagError::Parse(format!("{e} (in {path:?})")))
}

fn eval_scope(
    layers: &[&BTreeMap<String, String>],
    path: &Path,
) -> Result<BTreeMap<String, String>> {
    let mut calc = Calc::deferring(Builtins::reserved_names());
    for layer in layers {
        calc.add_var_map((*layer).clone());
    }
    calc.eval()
        .map_err(|e| PipedagError::Parse(format!("{e} (in {path:?})")))
}
