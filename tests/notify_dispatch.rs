// tests/notify_dispatch.rs

mod common;
use crate::common::{TestResult, fake_tasker, init_tracing};

use std::time::Duration;

use crontask::engine::{HookKind, NotifyDispatcher, TemplateVars, TriggerOutcome, render_args};
use crontask::exec::{OutputResolver, SubprocessRunner};
use crontask::types::NotifyHooks;
use crontask_test_utils::builders::{TaskerConfigBuilder, program};
use crontask_test_utils::capture_writer::CaptureWriterFactory;
use crontask_test_utils::fake_spawner::{FakeSpawner, Script};

fn strings(args: &[&str]) -> Vec<String> {
    args.iter().map(|s| s.to_string()).collect()
}

fn all_hooks() -> TaskerConfigBuilder {
    TaskerConfigBuilder::new()
        .on_finish(program("finish", "finish-hook", &[]))
        .on_failure(program("fail", "failure-hook", &[]))
        .on_success(program("succ", "success-hook", &[]))
}

#[tokio::test]
async fn success_fires_finish_then_success() {
    init_tracing();

    let spawner = FakeSpawner::new();
    let (tasker, _) = fake_tasker(all_hooks().step("job").build(), spawner.clone());

    let outcome = tasker.on_trigger().await;

    assert!(matches!(outcome, TriggerOutcome::Finished { succeeded: true, .. }));
    assert_eq!(spawner.commands(), vec!["job", "finish-hook", "success-hook"]);
}

#[tokio::test]
async fn failure_fires_finish_then_failure() {
    init_tracing();

    let spawner = FakeSpawner::new();
    spawner.on("job", Script::exit(2));
    let (tasker, _) = fake_tasker(all_hooks().step("job").build(), spawner.clone());

    let outcome = tasker.on_trigger().await;

    assert!(matches!(outcome, TriggerOutcome::Finished { succeeded: false, .. }));
    assert_eq!(spawner.commands(), vec!["job", "finish-hook", "failure-hook"]);
}

#[tokio::test]
async fn no_hooks_configured_fires_nothing() {
    let spawner = FakeSpawner::new();
    spawner.on("job", Script::exit(1));
    let cfg = TaskerConfigBuilder::new().step("job").build();
    assert!(cfg.hooks.is_empty());
    let (tasker, _) = fake_tasker(cfg, spawner.clone());

    tasker.on_trigger().await;

    assert_eq!(spawner.commands(), vec!["job"]);
}

#[tokio::test]
async fn only_failure_hook_stays_quiet_on_success() {
    let spawner = FakeSpawner::new();
    let cfg = TaskerConfigBuilder::new()
        .step("job")
        .on_failure(program("fail", "failure-hook", &[]))
        .build();
    let (tasker, _) = fake_tasker(cfg, spawner.clone());

    tasker.on_trigger().await;

    assert_eq!(spawner.commands(), vec!["job"]);
}

#[tokio::test]
async fn hook_args_are_rendered_for_the_run() -> TestResult {
    init_tracing();

    let spawner = FakeSpawner::new();
    spawner.on("job", Script::exit(2));
    let cfg = TaskerConfigBuilder::new()
        .task_name("nightly")
        .step("job")
        .on_failure(program(
            "alert",
            "alert",
            &["--id=$RUNID", "--name=$TASK", "--ok=$SUCC", "--cost=$RUNTIME", "--err=$ERRMSG"],
        ))
        .build();
    let (tasker, _) = fake_tasker(cfg, spawner.clone());

    tasker.on_trigger().await;

    let calls = spawner.calls();
    let hook = calls
        .iter()
        .find(|c| c.command == "alert")
        .ok_or("alert hook was not run")?;
    assert_eq!(hook.args[0], "--id=1");
    assert_eq!(hook.args[1], "--name=nightly");
    assert_eq!(hook.args[2], "--ok=false");

    let cost = hook.args[3]
        .strip_prefix("--cost=")
        .and_then(|v| v.strip_suffix("ms"))
        .ok_or("unexpected runtime format")?;
    assert!(cost.parse::<u128>().is_ok(), "runtime should be integral ms: {cost}");

    assert_eq!(
        hook.args[4],
        "--err=step:0 exec failed, err:['job' exited with exit code 2]"
    );
    Ok(())
}

#[tokio::test]
async fn error_message_is_empty_on_success() {
    let spawner = FakeSpawner::new();
    let cfg = TaskerConfigBuilder::new()
        .step("job")
        .on_success(program("ok", "ok-hook", &["[$ERRMSG]", "$SUCC"]))
        .build();
    let (tasker, _) = fake_tasker(cfg, spawner.clone());

    tasker.on_trigger().await;

    let calls = spawner.calls();
    assert_eq!(calls[1].args, vec!["[]", "true"]);
}

#[tokio::test]
async fn failing_hook_does_not_change_the_outcome() {
    init_tracing();

    let spawner = FakeSpawner::new();
    spawner.on("finish-hook", Script::exit(9));
    let (tasker, _) = fake_tasker(all_hooks().step("job").build(), spawner.clone());

    let outcome = tasker.on_trigger().await;

    assert!(matches!(outcome, TriggerOutcome::Finished { run_id: 1, succeeded: true, .. }));
    assert_eq!(spawner.commands(), vec!["job", "finish-hook", "success-hook"]);
    assert!(!tasker.is_running());

    let next = tasker.on_trigger().await;
    assert!(matches!(next, TriggerOutcome::Finished { run_id: 2, .. }));
}

#[tokio::test]
async fn dispatcher_reports_attempted_hooks() {
    let spawner = FakeSpawner::new();
    spawner.on("failure-hook", Script::spawn_error());
    let hooks = NotifyHooks {
        on_success: Some(program("succ", "success-hook", &[])),
        on_failure: Some(program("fail", "failure-hook", &[])),
        on_finish: Some(program("finish", "finish-hook", &[])),
    };
    let output = OutputResolver::new(None, None, CaptureWriterFactory::new());
    let dispatcher = NotifyDispatcher::new(hooks, SubprocessRunner::new(spawner, output, None));

    let fired = dispatcher
        .dispatch(3, "t", Duration::from_millis(12), None)
        .await;
    assert_eq!(fired, vec![HookKind::Finish, HookKind::Success]);

    let kinds: Vec<_> = dispatcher.select(true).into_iter().map(|(k, _)| k).collect();
    assert_eq!(kinds, vec![HookKind::Finish, HookKind::Failure]);
}

#[test]
fn renders_run_id_and_task_name() {
    let vars = TemplateVars::new(7, "nightly", Duration::from_millis(1500), None);
    let rendered = render_args(&strings(&["--id=$RUNID", "--name=$TASK"]), &vars);
    assert_eq!(rendered, vec!["--id=7", "--name=nightly"]);
}

#[test]
fn renders_every_occurrence_and_keeps_unknown_tokens() {
    let vars = TemplateVars::new(42, "sync", Duration::from_millis(250), None);
    let rendered = render_args(
        &strings(&["$RUNID-$RUNID", "$HOME/$TASK", "cost $RUNTIME", "$", "100$"]),
        &vars,
    );
    assert_eq!(rendered, vec!["42-42", "$HOME/sync", "cost 250ms", "$", "100$"]);
}

#[test]
fn substituted_values_are_not_expanded_again() {
    let vars = TemplateVars::new(5, "$RUNID", Duration::ZERO, None);
    let rendered = render_args(&strings(&["$TASK", "$TASK$RUNID"]), &vars);
    assert_eq!(rendered, vec!["$RUNID", "$RUNID5"]);
}

#[test]
fn hook_kinds_display_as_config_names() {
    assert_eq!(HookKind::Finish.to_string(), "on_finish");
    assert_eq!(HookKind::Failure.to_string(), "on_failure");
    assert_eq!(HookKind::Success.to_string(), "on_success");
}
