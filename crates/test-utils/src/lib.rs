//! Shared fixtures for the `crontask` integration tests: config builders,
//! a scripted process spawner, an in-memory rotating writer and finite
//! schedules.

pub mod builders;
pub mod capture_writer;
pub mod fake_spawner;
pub mod schedule;

use std::future::Future;
use std::sync::Once;
use std::time::Duration;

use tracing_subscriber::{EnvFilter, fmt};

static TRACING: Once = Once::new();

/// Route test logs through the harness writer, once per test binary.
///
/// The filter comes from `CRONTASK_LOG` (same variable as the daemon),
/// defaulting to `info`. Output shows up only for failing tests unless run
/// with `--nocapture`.
pub fn init_tracing() {
    TRACING.call_once(|| {
        let filter = EnvFilter::try_from_env("CRONTASK_LOG")
            .unwrap_or_else(|_| EnvFilter::new("info"));

        fmt()
            .with_env_filter(filter)
            .with_test_writer()
            .with_target(false)
            .init();
    });
}

/// Await `f`, failing the test if it takes longer than five seconds.
pub async fn with_timeout<F, T>(f: F) -> T
where
    F: Future<Output = T>,
{
    tokio::time::timeout(Duration::from_secs(5), f)
        .await
        .expect("test timed out after 5s")
}
