use oracle_core::serialization::write_json_artifact;
use serde::Serialize;
use std::path::Path;
use std::time::Duration;
use tracing_subscriber::EnvFilter;

/// Logs go to stderr; `RUST_LOG` takes precedence over `-v`.
pub(super) fn init_tracing(verbosity: u8) {
    let default_level = match verbosity {
        0 => "warn",
        1 => "info",
        _ => "debug",
    };
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level));
    let _ = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_target(false)
        .try_init();
}

pub(super) fn render_timing(elapsed: Duration, points: u64) -> String {
    let seconds = elapsed.as_secs_f64();
    let per_point = if points == 0 {
        0.0
    } else {
        seconds * 1.0e6 / points as f64
    };
    format!(
        "Elapsed time: {:.3} s\nTime per point: {:.3} us",
        seconds, per_point
    )
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub(super) struct RunSummary {
    pub(super) points: u64,
    pub(super) success: u64,
    pub(super) failure: u64,
    pub(super) ignored: u64,
    pub(super) outside: u64,
    pub(super) covered_volumes: usize,
    pub(super) declared_volumes: i64,
    pub(super) elapsed_seconds: f64,
    pub(super) failed_points_path: String,
}

pub(super) fn write_run_summary(path: &Path, summary: &RunSummary) -> anyhow::Result<()> {
    write_json_artifact(path, summary)?;
    Ok(())
}
