use pipedag::dag::{Dag, Job, JobType};
use pipedag::errors::PipedagError;

fn job(name: &str, pre: &[&str]) -> Job {
    let mut j = Job::new(name, JobType::Dummy);
    j.pre = pre.iter().map(|s| s.to_string()).collect();
    j
}

#[test]
fn computes_posts_and_in_degrees() {
    let dag = Dag::from_jobs(vec![
        job("A", &[]),
        job("B", &["A"]),
        job("C", &["A"]),
        job("D", &["B", "C"]),
    ])
    .unwrap();

    assert_eq!(dag.in_degrees["A"], 0);
    assert_eq!(dag.in_degrees["B"], 1);
    assert_eq!(dag.in_degrees["C"], 1);
    assert_eq!(dag.in_degrees["D"], 2);

    let mut posts = dag.jobs["A"].post.clone();
    posts.sort();
    assert_eq!(posts, vec!["B", "C"]);
    assert!(!dag.relation("A", "B").unwrap().non_strict);
    assert!(dag.relation("B", "A").is_none());
}

#[test]
fn rejects_cycles() {
    let err = Dag::from_jobs(vec![job("A", &["C"]), job("B", &["A"]), job("C", &["B"])])
        .unwrap_err();
    assert!(matches!(err, PipedagError::Cycle(_)), "got: {err:?}");
}

#[test]
fn rejects_self_dependency() {
    let err = Dag::from_jobs(vec![job("A", &["A"])]).unwrap_err();
    assert!(matches!(err, PipedagError::Parse(_)), "got: {err:?}");
}

#[test]
fn rejects_duplicate_job_names() {
    let err = Dag::from_jobs(vec![job("A", &[]), job("A", &[])]).unwrap_err();
    assert!(matches!(err, PipedagError::Parse(_)), "got: {err:?}");
}

#[test]
fn rejects_unknown_predecessor() {
    let err = Dag::from_jobs(vec![job("A", &["ghost"])]).unwrap_err();
    assert!(matches!(err, PipedagError::Parse(_)), "got: {err:?}");
}

#[test]
fn rejects_non_strict_outside_pre() {
    let mut b = job("B", &["A"]);
    b.non_strict = vec!["C".to_string()];
    let err = Dag::from_jobs(vec![job("A", &[]), b, job("C", &[])]).unwrap_err();
    assert!(matches!(err, PipedagError::Parse(_)), "got: {err:?}");
}

#[test]
fn resolve_job_substitutes_builtins() {
    let dag = Dag::from_jobs(vec![job("A", &[])]).unwrap();
    dag.builtins.set_bizdate("20240101");
    dag.builtins.set_job_report("{}");

    let mut target = Job::new("T", JobType::Script);
    target
        .attrs
        .insert("cmd".to_string(), "run.sh --date=${bizdate}".to_string());
    target
        .attrs
        .insert("report".to_string(), "${jobreport}".to_string());

    dag.resolve_job(&mut target).unwrap();
    assert_eq!(target.attrs["cmd"], "run.sh --date=20240101");
    assert_eq!(target.attrs["report"], "{}");
}

#[test]
fn resolve_job_fails_on_unknown_reference() {
    let dag = Dag::from_jobs(vec![job("A", &[])]).unwrap();
    dag.builtins.set_bizdate("20240101");

    let mut target = Job::new("T", JobType::Script);
    target
        .attrs
        .insert("cmd".to_string(), "echo ${missing}".to_string());

    let err = dag.resolve_job(&mut target).unwrap_err();
    assert!(matches!(err, PipedagError::Resolve { .. }), "got: {err:?}");
}
