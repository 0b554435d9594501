#![allow(dead_code)]

use facets::VoronoiCell;

/// Installs a log subscriber writing through the test harness. Filter with
/// `RUST_LOG`, e.g. `RUST_LOG=facets=trace`.
pub fn init_tracing() {
    let env_filter = tracing_subscriber::EnvFilter::from_default_env()
        .add_directive(tracing_subscriber::filter::LevelFilter::WARN.into());
    let _ = tracing_subscriber::fmt()
        .with_env_filter(env_filter)
        .with_test_writer()
        .try_init();
}

/// The cube `[-1, 1]^3`.
#[allow(clippy::unwrap_used)]
pub fn cube() -> VoronoiCell {
    let mut cell = VoronoiCell::new();
    cell.init_box(-1.0, 1.0, -1.0, 1.0, -1.0, 1.0).unwrap();
    cell
}
