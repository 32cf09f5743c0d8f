// src/cli.rs

//! CLI argument parsing using `clap`.

use clap::Parser;

/// Command-line arguments for `pipedag`.
#[derive(Debug, Clone, Parser)]
#[command(
    name = "pipedag",
    version,
    about = "Run batch data-processing jobs as a DAG with retries and resumable status tracking.",
    long_about = None
)]
pub struct CliArgs {
    /// Root directory of the workflow files.
    #[arg(short, long, value_name = "DIR", default_value = ".")]
    pub work: String,

    /// Directory for persistent run status.
    #[arg(short, long, value_name = "DIR", default_value = "meta")]
    pub meta: String,

    /// Entry workflow file, relative to the work directory.
    #[arg(short, long, value_name = "FILE")]
    pub flow: String,

    /// Run name; namespaces the persistent status records.
    #[arg(short, long, value_name = "NAME", default_value = "noname")]
    pub name: String,

    /// Business date bound into jobs as the `bizdate` builtin (YYYYMMDD).
    ///
    /// If omitted, defaults to yesterday.
    #[arg(long, value_name = "YYYYMMDD")]
    pub bizdate: Option<String>,

    /// Maximum consecutive failures per job before it is given up this run.
    #[arg(long, value_name = "N", default_value_t = 3)]
    pub max_retry: u32,

    /// Enable the Hadoop executor.
    #[arg(long)]
    pub hadoop: bool,

    /// Enable the Hive executor.
    #[arg(long)]
    pub hive: bool,

    /// Enable the ODPS executor.
    #[arg(long)]
    pub odps: bool,

    /// Use verbose (debug-level) output.
    #[arg(short, long)]
    pub verbose: bool,
}

/// Convenience wrapper around `CliArgs::parse()`.
pub fn parse() -> CliArgs {
    CliArgs::parse()
}
