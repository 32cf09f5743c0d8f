// src/dag/graph.rs

use std::collections::HashMap;

use petgraph::algo::toposort;
use petgraph::graphmap::DiGraphMap;
use tracing::debug;

use crate::dag::builtins::Builtins;
use crate::dag::job::Job;
use crate::errors::{PipedagError, Result};
use crate::flow::calc::Calc;

/// Edge metadata for `source -> target`.
///
/// Strict (default): the target requires the source to finish. Non-strict:
/// the target may proceed once the source has either finished or exhausted
/// its retries.
#[derive(Debug, Clone, Copy, Default)]
pub struct Relation {
    pub non_strict: bool,
}

/// The job DAG.
///
/// Topology is immutable once built; `in_degrees` is the only part the
/// scheduler mutates while driving the run.
#[derive(Debug)]
pub struct Dag {
    /// All jobs, keyed by name.
    pub jobs: HashMap<String, Job>,

    /// Edge metadata: `relations[source][target]`.
    pub relations: HashMap<String, HashMap<String, Relation>>,

    /// Remaining unsatisfied in-edge count per job.
    pub in_degrees: HashMap<String, usize>,

    /// Shared context for late-bound attribute resolution.
    pub builtins: Builtins,
}

impl Dag {
    /// Build a DAG from parser output.
    ///
    /// Checks name uniqueness and predecessor references, populates successor
    /// lists and in-degrees, and rejects cycles.
    pub fn from_jobs(jobs: Vec<Job>) -> Result<Self> {
        let mut map: HashMap<String, Job> = HashMap::new();
        for job in jobs {
            if map.contains_key(&job.name) {
                return Err(PipedagError::Parse(format!(
                    "duplicate job name: {}",
                    job.name
                )));
            }
            map.insert(job.name.clone(), job);
        }

        // Validate predecessor references and edge flags.
        for job in map.values() {
            for pre in &job.pre {
                if !map.contains_key(pre) {
                    return Err(PipedagError::Parse(format!(
                        "job '{}' references unknown predecessor '{}'",
                        job.name, pre
                    )));
                }
                if pre == &job.name {
                    return Err(PipedagError::Parse(format!(
                        "job '{}' cannot depend on itself",
                        job.name
                    )));
                }
            }
            for ns in &job.non_strict {
                if !job.pre.contains(ns) {
                    return Err(PipedagError::Parse(format!(
                        "job '{}' marks '{}' as non-strict but does not list it in pre",
                        job.name, ns
                    )));
                }
            }
        }

        // Populate successor lists and edge relations from `pre`.
        let names: Vec<String> = map.keys().cloned().collect();
        let mut relations: HashMap<String, HashMap<String, Relation>> = HashMap::new();
        for name in &names {
            let (pres, non_strict) = {
                let job = &map[name];
                (job.pre.clone(), job.non_strict.clone())
            };
            for pre in pres {
                let relation = Relation {
                    non_strict: non_strict.contains(&pre),
                };
                relations
                    .entry(pre.clone())
                    .or_default()
                    .insert(name.clone(), relation);
                map.get_mut(&pre)
                    .expect("validated predecessor missing")
                    .post
                    .push(name.clone());
            }
        }

        let in_degrees: HashMap<String, usize> = map
            .values()
            .map(|job| (job.name.clone(), job.pre.len()))
            .collect();

        reject_cycles(&map)?;

        debug!(
            jobs = map.len(),
            edges = relations.values().map(|m| m.len()).sum::<usize>(),
            "built job DAG"
        );

        Ok(Self {
            jobs: map,
            relations,
            in_degrees,
            builtins: Builtins::new(),
        })
    }

    /// Materialize a job's final attribute values from the current builtins.
    ///
    /// Called immediately before dispatch so the job observes the up-to-date
    /// `jobreport` of everything completed before it.
    pub fn resolve_job(&self, job: &mut Job) -> Result<()> {
        resolve_job(&self.builtins, job)
    }

    /// The relation on edge `source -> target`, if the edge exists.
    pub fn relation(&self, source: &str, target: &str) -> Option<Relation> {
        self.relations
            .get(source)
            .and_then(|targets| targets.get(target))
            .copied()
    }
}

/// Substitute the given builtins into a job's attribute templates.
///
/// Free function so wave workers can resolve against a cloned [`Builtins`]
/// handle without holding the DAG itself.
pub fn resolve_job(builtins: &Builtins, job: &mut Job) -> Result<()> {
    let mut calc = Calc::new();
    calc.add_var_map(builtins.snapshot());
    calc.add_var_map(job.attrs.clone());

    let resolved = calc.eval().map_err(|reason| PipedagError::Resolve {
        job: job.name.clone(),
        reason,
    })?;

    for (key, value) in job.attrs.iter_mut() {
        if let Some(new) = resolved.get(key) {
            *value = new.clone();
        }
    }
    Ok(())
}

fn reject_cycles(jobs: &HashMap<String, Job>) -> Result<()> {
    // Edge direction: pre -> job.
    let mut graph: DiGraphMap<&str, ()> = DiGraphMap::new();

    for name in jobs.keys() {
        graph.add_node(name.as_str());
    }
    for job in jobs.values() {
        for pre in &job.pre {
            graph.add_edge(pre.as_str(), job.name.as_str(), ());
        }
    }

    match toposort(&graph, None) {
        Ok(_order) => Ok(()),
        Err(cycle) => Err(PipedagError::Cycle(cycle.node_id().to_string())),
    }
}
