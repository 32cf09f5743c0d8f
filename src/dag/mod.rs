// src/dag/mod.rs

//! DAG model.
//!
//! - [`job`] holds the job node types: [`Job`], [`JobType`], [`JobStatus`].
//! - [`graph`] holds the [`Dag`] itself: jobs, edge relations, in-degrees,
//!   cycle rejection, and late-bound attribute resolution.
//! - [`builtins`] is the shared runtime context (`bizdate`, `jobreport`)
//!   substituted into job attributes at dispatch time.

pub mod builtins;
pub mod graph;
pub mod job;

pub use builtins::Builtins;
pub use graph::{Dag, Relation};
pub use job::{Job, JobStatus, JobType};
