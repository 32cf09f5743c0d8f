use std::collections::BTreeMap;
use std::sync::atomic::{AtomicU32, Ordering};
use std::sync::{Arc, Mutex};

use async_trait::async_trait;

use pipedag::dag::{Dag, Job, JobStatus, JobType};
use pipedag::errors::{PipedagError, Result};
use pipedag::exec::{DummyExec, Executor, ExecutorRegistry};
use pipedag::sched::Scheduler;
use pipedag::status::{StatusStore, StatusTracker};

/// Shared run log so tests can assert cross-executor ordering.
#[derive(Clone, Default)]
struct TestLog(Arc<Mutex<Vec<String>>>);

impl TestLog {
    fn new() -> Self {
        Self::default()
    }

    fn push(&self, name: &str) {
        self.0.lock().unwrap().push(name.to_string());
    }

    fn entries(&self) -> Vec<String> {
        self.0.lock().unwrap().clone()
    }
}

/// Always succeeds; records every run.
struct OkExec {
    log: TestLog,
}

#[async_trait]
impl Executor for OkExec {
    async fn setup(&self) -> Result<()> {
        Ok(())
    }

    async fn run(&self, job: &Job) -> Result<()> {
        self.log.push(&job.name);
        Ok(())
    }
}

/// Always fails; records every attempt.
struct FailExec {
    log: TestLog,
}

#[async_trait]
impl Executor for FailExec {
    async fn setup(&self) -> Result<()> {
        Ok(())
    }

    async fn run(&self, job: &Job) -> Result<()> {
        self.log.push(&job.name);
        Err(PipedagError::Exec {
            job: job.name.clone(),
            code: 1,
        })
    }
}

/// Fails the first `fail_times` attempts, then succeeds.
struct FlakyExec {
    log: TestLog,
    fail_times: u32,
    attempts: AtomicU32,
}

#[async_trait]
impl Executor for FlakyExec {
    async fn setup(&self) -> Result<()> {
        Ok(())
    }

    async fn run(&self, job: &Job) -> Result<()> {
        self.log.push(&job.name);
        let attempt = self.attempts.fetch_add(1, Ordering::SeqCst);
        if attempt < self.fail_times {
            Err(PipedagError::Exec {
                job: job.name.clone(),
                code: 1,
            })
        } else {
            Ok(())
        }
    }
}

/// Succeeds and captures the resolved attributes each job ran with.
struct CaptureExec {
    log: TestLog,
    seen: Mutex<BTreeMap<String, BTreeMap<String, String>>>,
}

#[async_trait]
impl Executor for CaptureExec {
    async fn setup(&self) -> Result<()> {
        Ok(())
    }

    async fn run(&self, job: &Job) -> Result<()> {
        self.log.push(&job.name);
        self.seen
            .lock()
            .unwrap()
            .insert(job.name.clone(), job.attrs.clone());
        Ok(())
    }
}

fn job(name: &str, job_type: JobType, pre: &[&str]) -> Job {
    let mut j = Job::new(name, job_type);
    j.pre = pre.iter().map(|s| s.to_string()).collect();
    if job_type == JobType::Script {
        j.attrs.insert("cmd".to_string(), format!("run {name}"));
    }
    j
}

fn open_tracker(dir: &tempfile::TempDir) -> StatusTracker {
    StatusTracker::open(dir.path(), "test").unwrap()
}

fn persisted(dir: &tempfile::TempDir, name: &str) -> Option<JobStatus> {
    StatusStore::open(dir.path(), "test").unwrap().get(name)
}

#[tokio::test]
async fn linear_chain_runs_in_order_and_persists() {
    let dir = tempfile::tempdir().unwrap();
    let log = TestLog::new();

    let mut registry = ExecutorRegistry::new();
    registry.register(JobType::Script, Arc::new(OkExec { log: log.clone() }));

    let mut dag = Dag::from_jobs(vec![
        job("A", JobType::Script, &[]),
        job("B", JobType::Script, &["A"]),
        job("C", JobType::Script, &["B"]),
    ])
    .unwrap();

    let scheduler = Scheduler::with_registry(registry, open_tracker(&dir), 3, "20240101");
    scheduler.run(&mut dag).await.unwrap();

    assert_eq!(log.entries(), vec!["A", "B", "C"]);
    for name in ["A", "B", "C"] {
        assert_eq!(dag.jobs[name].status, JobStatus::Finished);
        assert_eq!(persisted(&dir, name), Some(JobStatus::Finished));
    }
}

#[tokio::test]
async fn dummy_chain_finishes_and_persists() {
    let dir = tempfile::tempdir().unwrap();

    let mut registry = ExecutorRegistry::new();
    registry.register(JobType::Dummy, Arc::new(DummyExec::new()));

    let mut dag = Dag::from_jobs(vec![
        job("A", JobType::Dummy, &[]),
        job("B", JobType::Dummy, &["A"]),
        job("C", JobType::Dummy, &["B"]),
    ])
    .unwrap();

    let scheduler = Scheduler::with_registry(registry, open_tracker(&dir), 3, "20240101");
    scheduler.run(&mut dag).await.unwrap();

    for name in ["A", "B", "C"] {
        assert_eq!(dag.jobs[name].status, JobStatus::Finished);
        assert_eq!(persisted(&dir, name), Some(JobStatus::Finished));
    }
}

#[tokio::test]
async fn empty_dag_succeeds_immediately() {
    let dir = tempfile::tempdir().unwrap();
    let registry = ExecutorRegistry::new();
    let mut dag = Dag::from_jobs(vec![]).unwrap();

    let scheduler = Scheduler::with_registry(registry, open_tracker(&dir), 3, "20240101");
    scheduler.run(&mut dag).await.unwrap();
}

#[tokio::test]
async fn flaky_job_retries_until_success() {
    let dir = tempfile::tempdir().unwrap();
    let log = TestLog::new();

    let mut registry = ExecutorRegistry::new();
    registry.register(
        JobType::Script,
        Arc::new(FlakyExec {
            log: log.clone(),
            fail_times: 2,
            attempts: AtomicU32::new(0),
        }),
    );

    let mut dag = Dag::from_jobs(vec![job("A", JobType::Script, &[])]).unwrap();

    let scheduler = Scheduler::with_registry(registry, open_tracker(&dir), 3, "20240101");
    scheduler.run(&mut dag).await.unwrap();

    // Two failing waves, then the succeeding one.
    assert_eq!(log.entries(), vec!["A", "A", "A"]);
    assert_eq!(persisted(&dir, "A"), Some(JobStatus::Finished));
}

#[tokio::test]
async fn retry_exhaustion_blocks_strict_successor() {
    let dir = tempfile::tempdir().unwrap();
    let log = TestLog::new();

    let mut registry = ExecutorRegistry::new();
    registry.register(JobType::Script, Arc::new(FailExec { log: log.clone() }));

    let mut dag = Dag::from_jobs(vec![
        job("A", JobType::Script, &[]),
        job("B", JobType::Script, &["A"]),
    ])
    .unwrap();

    let scheduler = Scheduler::with_registry(registry, open_tracker(&dir), 3, "20240101");
    let err = scheduler.run(&mut dag).await.unwrap_err();

    match err {
        PipedagError::SomeJobsFailed { failed, unfinished } => {
            assert_eq!(failed, vec!["A"]);
            assert_eq!(unfinished, vec!["B"]);
        }
        other => panic!("unexpected error: {other:?}"),
    }

    // A attempted exactly max_retry times; B never ran.
    assert_eq!(log.entries(), vec!["A", "A", "A"]);
    assert_eq!(persisted(&dir, "A"), Some(JobStatus::Failed));
    assert_eq!(persisted(&dir, "B"), None);
    assert_eq!(dag.jobs["B"].status, JobStatus::NotStarted);
}

#[tokio::test]
async fn retry_exhaustion_releases_non_strict_successor() {
    let dir = tempfile::tempdir().unwrap();
    let log = TestLog::new();

    let mut registry = ExecutorRegistry::new();
    registry.register(JobType::Script, Arc::new(FailExec { log: log.clone() }));
    registry.register(JobType::Hive, Arc::new(OkExec { log: log.clone() }));

    let mut fallback = job("B", JobType::Hive, &["A"]);
    fallback.non_strict = vec!["A".to_string()];
    fallback.attrs.insert("hql".to_string(), "select 1".to_string());

    let mut dag = Dag::from_jobs(vec![job("A", JobType::Script, &[]), fallback]).unwrap();

    let scheduler = Scheduler::with_registry(registry, open_tracker(&dir), 3, "20240101");
    let err = scheduler.run(&mut dag).await.unwrap_err();

    // B runs exactly once, after A's three exhausted attempts.
    assert_eq!(log.entries(), vec!["A", "A", "A", "B"]);
    assert_eq!(persisted(&dir, "B"), Some(JobStatus::Finished));

    // The run still fails because A failed.
    match err {
        PipedagError::SomeJobsFailed { failed, unfinished } => {
            assert_eq!(failed, vec!["A"]);
            assert!(unfinished.is_empty());
        }
        other => panic!("unexpected error: {other:?}"),
    }
}

#[tokio::test]
async fn resume_skips_finished_and_started_jobs() {
    let dir = tempfile::tempdir().unwrap();

    // A previous run finished A and B, and was killed while C was running.
    {
        let mut store = StatusStore::open(dir.path(), "test").unwrap();
        store.set("A", JobStatus::Finished).unwrap();
        store.set("B", JobStatus::Finished).unwrap();
        store.set("C", JobStatus::Started).unwrap();
    }

    let log = TestLog::new();
    let mut registry = ExecutorRegistry::new();
    registry.register(JobType::Script, Arc::new(OkExec { log: log.clone() }));

    let mut dag = Dag::from_jobs(vec![
        job("A", JobType::Script, &[]),
        job("B", JobType::Script, &["A"]),
        job("C", JobType::Script, &["B"]),
        job("D", JobType::Script, &["C"]),
    ])
    .unwrap();

    let scheduler = Scheduler::with_registry(registry, open_tracker(&dir), 3, "20240101");
    let err = scheduler.run(&mut dag).await.unwrap_err();

    // Nothing re-ran: A and B are already finished, C is owned elsewhere,
    // and D stays blocked behind C.
    assert!(log.entries().is_empty());
    assert_eq!(dag.jobs["C"].status, JobStatus::Started);
    assert_eq!(dag.jobs["D"].status, JobStatus::NotStarted);

    match err {
        PipedagError::SomeJobsFailed { failed, unfinished } => {
            assert!(failed.is_empty());
            assert_eq!(unfinished, vec!["C", "D"]);
        }
        other => panic!("unexpected error: {other:?}"),
    }
}

#[tokio::test]
async fn rerun_after_success_is_a_no_op() {
    let dir = tempfile::tempdir().unwrap();
    let log = TestLog::new();

    let jobs = || {
        vec![
            job("A", JobType::Script, &[]),
            job("B", JobType::Script, &["A"]),
        ]
    };

    for expected_runs in [2, 0] {
        let mut registry = ExecutorRegistry::new();
        registry.register(JobType::Script, Arc::new(OkExec { log: log.clone() }));

        let mut dag = Dag::from_jobs(jobs()).unwrap();
        let scheduler = Scheduler::with_registry(registry, open_tracker(&dir), 3, "20240101");
        scheduler.run(&mut dag).await.unwrap();

        let runs = log.entries().len();
        log.0.lock().unwrap().clear();
        assert_eq!(runs, expected_runs);
    }
}

#[tokio::test]
async fn diamond_successor_resolves_fresh_job_report() {
    let dir = tempfile::tempdir().unwrap();
    let log = TestLog::new();
    let capture = Arc::new(CaptureExec {
        log: log.clone(),
        seen: Mutex::new(BTreeMap::new()),
    });

    let mut registry = ExecutorRegistry::new();
    registry.register(JobType::Dummy, Arc::new(DummyExec::new()));
    registry.register(JobType::Script, Arc::clone(&capture) as Arc<dyn Executor>);

    let mut sink = job("D", JobType::Script, &["B", "C"]);
    sink.attrs
        .insert("report".to_string(), "${jobreport}".to_string());
    sink.attrs.insert("date".to_string(), "${bizdate}".to_string());

    let mut dag = Dag::from_jobs(vec![
        job("A", JobType::Dummy, &[]),
        job("B", JobType::Script, &["A"]),
        job("C", JobType::Script, &["A"]),
        sink,
    ])
    .unwrap();

    let scheduler = Scheduler::with_registry(registry, open_tracker(&dir), 3, "20240101");
    scheduler.run(&mut dag).await.unwrap();

    let seen = capture.seen.lock().unwrap();
    let report = &seen["D"]["report"];
    assert!(report.contains("\"B\":\"Finished\""), "stale report: {report}");
    assert!(report.contains("\"C\":\"Finished\""), "stale report: {report}");
    assert_eq!(seen["D"]["date"], "20240101");
}

#[tokio::test]
async fn unknown_job_type_aborts_preflight() {
    let dir = tempfile::tempdir().unwrap();
    let log = TestLog::new();

    let mut registry = ExecutorRegistry::new();
    registry.register(JobType::Script, Arc::new(OkExec { log: log.clone() }));

    let mut query = job("Q", JobType::Hive, &[]);
    query.attrs.insert("hql".to_string(), "select 1".to_string());

    let mut dag = Dag::from_jobs(vec![job("A", JobType::Script, &[]), query]).unwrap();

    let scheduler = Scheduler::with_registry(registry, open_tracker(&dir), 3, "20240101");
    let err = scheduler.run(&mut dag).await.unwrap_err();

    assert!(matches!(err, PipedagError::NoExecutorForType(_)));
    // Preflight failed before anything ran.
    assert!(log.entries().is_empty());
    assert_eq!(persisted(&dir, "A"), None);
}

#[tokio::test]
async fn unresolved_variable_fails_the_job_not_the_run() {
    let dir = tempfile::tempdir().unwrap();
    let log = TestLog::new();

    let mut registry = ExecutorRegistry::new();
    registry.register(JobType::Script, Arc::new(OkExec { log: log.clone() }));

    let mut broken = job("A", JobType::Script, &[]);
    broken
        .attrs
        .insert("cmd".to_string(), "echo ${no_such_var}".to_string());

    let mut dag = Dag::from_jobs(vec![broken]).unwrap();

    let scheduler = Scheduler::with_registry(registry, open_tracker(&dir), 2, "20240101");
    let err = scheduler.run(&mut dag).await.unwrap_err();

    match err {
        PipedagError::SomeJobsFailed { failed, .. } => assert_eq!(failed, vec!["A"]),
        other => panic!("unexpected error: {other:?}"),
    }
    // Resolution failed before the executor was ever invoked.
    assert!(log.entries().is_empty());
    assert_eq!(persisted(&dir, "A"), Some(JobStatus::Failed));
}
