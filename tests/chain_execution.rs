// tests/chain_execution.rs

mod common;
use crate::common::{TestResult, init_tracing};

use std::sync::Arc;
use std::time::Duration;

use crontask::engine::ChainExecutor;
use crontask::exec::{OutputResolver, RunError, SubprocessRunner};
use crontask::types::ProgramSpec;
use crontask_test_utils::builders::program;
use crontask_test_utils::capture_writer::CaptureWriterFactory;
use crontask_test_utils::fake_spawner::{FakeSpawner, Script};

fn executor(spawner: Arc<FakeSpawner>) -> ChainExecutor {
    let output = OutputResolver::new(None, None, CaptureWriterFactory::new());
    let runner = SubprocessRunner::new(spawner, output, None);
    ChainExecutor::new(runner, "chain-test")
}

fn chain(cmds: &[&str]) -> Vec<ProgramSpec> {
    cmds.iter().map(|c| program(c, c, &[])).collect()
}

#[tokio::test]
async fn all_steps_succeed_in_order() -> TestResult {
    init_tracing();

    let spawner = FakeSpawner::new();
    let exec = executor(spawner.clone());

    let outcome = exec.run_chain(1, &chain(&["fetch", "build", "publish"])).await;

    assert!(outcome.is_success());
    assert!(outcome.error.is_none());
    assert_eq!(spawner.commands(), vec!["fetch", "build", "publish"]);
    assert_eq!(outcome.steps.len(), 3);
    assert!(outcome.steps.iter().all(|s| s.succeeded));
    Ok(())
}

#[tokio::test]
async fn failing_step_stops_the_chain() -> TestResult {
    init_tracing();

    let spawner = FakeSpawner::new();
    spawner.on("build", Script::exit(3));
    let exec = executor(spawner.clone());

    let outcome = exec
        .run_chain(4, &chain(&["fetch", "build", "publish", "cleanup"]))
        .await;

    assert!(!outcome.is_success());
    assert_eq!(spawner.commands(), vec!["fetch", "build"]);

    let err = outcome.error.as_ref().ok_or("expected chain error")?;
    assert_eq!(err.step, 1);
    assert_eq!(err.remark, "build");
    assert!(matches!(err.source, RunError::Exit { code: Some(3), .. }));
    assert_eq!(
        err.to_string(),
        "step:1 exec failed, err:['build' exited with exit code 3]"
    );

    assert_eq!(outcome.steps.len(), 2);
    assert!(outcome.steps[0].succeeded);
    assert!(!outcome.steps[1].succeeded);
    Ok(())
}

#[tokio::test]
async fn spawn_failure_on_first_step_runs_nothing_else() -> TestResult {
    init_tracing();

    let spawner = FakeSpawner::new();
    spawner.on("missing", Script::spawn_error());
    let exec = executor(spawner.clone());

    let outcome = exec.run_chain(1, &chain(&["missing", "after"])).await;

    let err = outcome.error.ok_or("expected chain error")?;
    assert_eq!(err.step, 0);
    assert!(matches!(err.source, RunError::Spawn { .. }));
    assert_eq!(spawner.commands(), vec!["missing"]);
    Ok(())
}

#[tokio::test]
async fn last_step_failure_reports_its_index() -> TestResult {
    let spawner = FakeSpawner::new();
    spawner.on("c", Script::exit(1));
    let exec = executor(spawner.clone());

    let outcome = exec.run_chain(1, &chain(&["a", "b", "c"])).await;

    assert_eq!(outcome.error.ok_or("expected chain error")?.step, 2);
    assert_eq!(spawner.calls().len(), 3);
    Ok(())
}

#[tokio::test]
async fn chain_time_covers_every_step() {
    let spawner = FakeSpawner::new();
    spawner.on("a", Script::succeed().delay(Duration::from_millis(30)));
    spawner.on("b", Script::succeed().delay(Duration::from_millis(40)));
    let exec = executor(spawner);

    let outcome = exec.run_chain(1, &chain(&["a", "b"])).await;

    let step_sum: Duration = outcome.steps.iter().map(|s| s.elapsed).sum();
    assert!(outcome.elapsed >= step_sum);
    assert!(outcome.elapsed >= Duration::from_millis(70));
}

#[tokio::test]
async fn steps_receive_their_own_args_and_workdir() {
    let spawner = FakeSpawner::new();
    let exec = executor(spawner.clone());

    let programs = vec![
        program("dump", "pg_dump", &["--all", "-f", "/tmp/db.sql"]).with_workdir("/var/backups"),
        program("ship", "rsync", &["-a", "/tmp/db.sql", "remote:"]),
    ];
    let outcome = exec.run_chain(1, &programs).await;
    assert!(outcome.is_success());

    let calls = spawner.calls();
    assert_eq!(calls[0].args, vec!["--all", "-f", "/tmp/db.sql"]);
    assert_eq!(calls[0].workdir, "/var/backups");
    assert_eq!(calls[1].args, vec!["-a", "/tmp/db.sql", "remote:"]);
    assert_eq!(calls[1].workdir, "");
}

#[tokio::test]
async fn credential_is_applied_to_every_step() {
    use crontask::types::Credential;

    let spawner = FakeSpawner::new();
    let output = OutputResolver::new(None, None, CaptureWriterFactory::new());
    let cred = Credential { uid: 1000, gid: 100 };
    let runner = SubprocessRunner::new(spawner.clone(), output, Some(cred));
    let exec = ChainExecutor::new(runner, "as-user");

    exec.run_chain(1, &chain(&["a", "b"])).await;

    assert!(spawner.calls().iter().all(|c| c.credential == Some(cred)));
}
