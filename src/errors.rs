// src/errors.rs

//! Crate-wide error taxonomy.
//!
//! Errors that happen inside a wave worker are converted into a `Failed` job
//! status and never escape the wave; everything in this enum that reaches
//! `main` ends the process with a non-zero exit.

use thiserror::Error;

#[derive(Error, Debug)]
pub enum PipedagError {
    #[error("configuration error: {0}")]
    Config(String),

    #[error("parse error: {0}")]
    Parse(String),

    #[error("cycle detected in job DAG involving '{0}'")]
    Cycle(String),

    #[error("no executor registered for job type '{0}'")]
    NoExecutorForType(String),

    #[error("executor setup failed: {0}")]
    Setup(String),

    #[error("variable resolution failed for job '{job}': {reason}")]
    Resolve { job: String, reason: String },

    #[error("job '{job}' exited with code {code}")]
    Exec { job: String, code: i32 },

    #[error("status persistence failed: {0}")]
    Persist(String),

    #[error("some jobs failed: failed={failed:?}, unfinished={unfinished:?}")]
    SomeJobsFailed {
        failed: Vec<String>,
        unfinished: Vec<String>,
    },

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error(transparent)]
    Other(#[from] anyhow::Error),
}

pub type Result<T> = std::result::Result<T, PipedagError>;
