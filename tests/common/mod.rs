#![allow(dead_code)]

use std::sync::Arc;
use std::time::Duration;

use crontask::engine::Tasker;
use crontask::exec::{ProcessSpawner, RotatingWriterFactory};
use crontask::types::TaskerConfig;
use crontask_test_utils::capture_writer::CaptureWriterFactory;
use crontask_test_utils::fake_spawner::FakeSpawner;
use crontask_test_utils::schedule::IntervalSchedule;

pub use crontask_test_utils::init_tracing;

pub type TestResult = Result<(), Box<dyn std::error::Error>>;

/// Tasker wired to fakes: hourly interval schedule (never fires during a
/// test), the given spawner and an in-memory writer factory.
pub fn fake_tasker(
    config: TaskerConfig,
    spawner: Arc<FakeSpawner>,
) -> (Arc<Tasker>, Arc<CaptureWriterFactory>) {
    let writers = CaptureWriterFactory::new();
    let tasker = tasker_with(config, spawner, writers.clone());
    (tasker, writers)
}

pub fn tasker_with(
    config: TaskerConfig,
    spawner: Arc<dyn ProcessSpawner>,
    writers: Arc<dyn RotatingWriterFactory>,
) -> Arc<Tasker> {
    let schedule = IntervalSchedule::new(Duration::from_secs(3600), usize::MAX);
    Arc::new(
        Tasker::with_components(config, Box::new(schedule), spawner, writers)
            .expect("valid tasker config"),
    )
}
