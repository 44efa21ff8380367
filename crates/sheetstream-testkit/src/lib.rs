//! Test helpers shared by the sheetstream crates.

mod fake;

pub use fake::{FakeSheets, RecordedRequest, RequestKind};

use tracing_subscriber::EnvFilter;

/// Install a test-friendly tracing subscriber once; later calls are no-ops.
///
/// Honors `RUST_LOG`, defaulting to `warn`.
pub fn init_tracing() {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn"));
    let _ = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_test_writer()
        .try_init();
}
