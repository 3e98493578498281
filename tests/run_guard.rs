// tests/run_guard.rs

mod common;
use crate::common::{fake_tasker, init_tracing};

use std::collections::HashSet;
use std::sync::{Arc, Barrier};
use std::time::Duration;

use crontask::engine::{RunGuard, TriggerOutcome};
use crontask_test_utils::builders::TaskerConfigBuilder;
use crontask_test_utils::fake_spawner::{FakeSpawner, Script};

#[test]
fn guard_admits_once_until_released() {
    let guard = RunGuard::new();
    assert!(!guard.is_running());

    assert!(guard.try_admit());
    assert!(guard.is_running());
    assert!(!guard.try_admit(), "second admission while running must fail");

    guard.release();
    assert!(!guard.is_running());
    assert!(guard.try_admit());
}

#[test]
fn permit_releases_on_drop() {
    let guard = RunGuard::new();
    {
        let permit = guard.acquire();
        assert!(permit.is_some());
        assert!(guard.acquire().is_none());
    }
    assert!(!guard.is_running());
}

#[test]
fn failed_acquire_does_not_release_the_holder() {
    let guard = RunGuard::new();
    let _held = guard.acquire().expect("first acquire");
    for _ in 0..3 {
        assert!(guard.acquire().is_none());
    }
    assert!(guard.is_running());
}

#[test]
fn permit_releases_when_holder_panics() {
    let guard = Arc::new(RunGuard::new());
    let g = Arc::clone(&guard);

    let joined = std::thread::spawn(move || {
        let _permit = g.acquire().expect("admitted");
        panic!("fault while holding the guard");
    })
    .join();

    assert!(joined.is_err());
    assert!(!guard.is_running());
    assert!(guard.try_admit());
}

#[test]
fn racing_admissions_have_a_single_winner() {
    const THREADS: usize = 16;
    let guard = Arc::new(RunGuard::new());
    let barrier = Arc::new(Barrier::new(THREADS));

    let handles: Vec<_> = (0..THREADS)
        .map(|_| {
            let guard = Arc::clone(&guard);
            let barrier = Arc::clone(&barrier);
            std::thread::spawn(move || {
                barrier.wait();
                guard.try_admit()
            })
        })
        .collect();

    let winners = handles
        .into_iter()
        .map(|h| h.join().unwrap())
        .filter(|admitted| *admitted)
        .count();
    assert_eq!(winners, 1);
}

#[tokio::test]
async fn trigger_during_run_is_skipped_not_queued() {
    init_tracing();

    let spawner = FakeSpawner::new();
    spawner.on("slow", Script::succeed().delay(Duration::from_millis(200)));
    let cfg = TaskerConfigBuilder::new().step("slow").build();
    let (tasker, _) = fake_tasker(cfg, spawner.clone());

    let (first, second) = tokio::join!(tasker.on_trigger(), async {
        tokio::time::sleep(Duration::from_millis(20)).await;
        tasker.on_trigger().await
    });

    assert!(matches!(first, TriggerOutcome::Finished { run_id: 1, succeeded: true, .. }));
    assert_eq!(second, TriggerOutcome::Skipped);
    assert!(!tasker.is_running());
    assert_eq!(spawner.commands(), vec!["slow".to_string()]);

    // Nothing was deferred: the skipped trigger never runs later.
    tokio::time::sleep(Duration::from_millis(50)).await;
    assert_eq!(spawner.calls().len(), 1);
}

#[tokio::test]
async fn run_ids_start_at_one_and_do_not_skip_on_dropped_triggers() {
    init_tracing();

    let spawner = FakeSpawner::new();
    spawner.on("slow", Script::succeed().delay(Duration::from_millis(100)));
    let cfg = TaskerConfigBuilder::new().step("slow").build();
    let (tasker, _) = fake_tasker(cfg, spawner);

    assert_eq!(tasker.last_run_id(), 0);

    let (a, b) = tokio::join!(tasker.on_trigger(), async {
        tokio::time::sleep(Duration::from_millis(10)).await;
        tasker.on_trigger().await
    });
    assert!(matches!(a, TriggerOutcome::Finished { run_id: 1, .. }));
    assert_eq!(b, TriggerOutcome::Skipped);

    let c = tasker.on_trigger().await;
    assert!(matches!(c, TriggerOutcome::Finished { run_id: 2, .. }));
    assert_eq!(tasker.last_run_id(), 2);
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn concurrent_triggers_never_run_chains_in_parallel() {
    init_tracing();

    let spawner = FakeSpawner::new();
    spawner.on("work", Script::succeed().delay(Duration::from_millis(30)));
    let cfg = TaskerConfigBuilder::new().step("work").build();
    let (tasker, _) = fake_tasker(cfg, spawner.clone());

    let handles: Vec<_> = (0..20u64)
        .map(|i| {
            let tasker = Arc::clone(&tasker);
            tokio::spawn(async move {
                tokio::time::sleep(Duration::from_millis(i * 7)).await;
                tasker.on_trigger().await
            })
        })
        .collect();

    let mut ids = Vec::new();
    let mut skipped = 0;
    for h in handles {
        match h.await.unwrap() {
            TriggerOutcome::Finished { run_id, .. } => ids.push(run_id),
            TriggerOutcome::Skipped => skipped += 1,
        }
    }

    assert_eq!(spawner.max_concurrency(), 1);
    assert!(!ids.is_empty());
    assert_eq!(ids.len() + skipped, 20);
    assert_eq!(spawner.calls().len(), ids.len());

    let unique: HashSet<_> = ids.iter().copied().collect();
    assert_eq!(unique.len(), ids.len(), "run ids must never repeat");
    let mut sorted = ids.clone();
    sorted.sort_unstable();
    assert_eq!(sorted, (1..=ids.len() as u64).collect::<Vec<_>>());
    assert!(!tasker.is_running());
}
