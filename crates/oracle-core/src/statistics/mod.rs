//! Outcome tally of a comparison run.

use crate::domain::{FailedPoint, OracleError, OracleResult, Outcome, PtracRecord};
use crate::oracle::Classification;
use crate::serialization::write_json_artifact;
use std::collections::BTreeSet;
use std::fmt::Write as _;
use std::path::{Path, PathBuf};

const FAILED_POINTS_EXTENSION: &str = "failedpoints.json";

#[derive(Debug, Clone, Default, PartialEq)]
pub struct Statistics {
    success: u64,
    failure: u64,
    ignored: u64,
    outside: u64,
    covered_ranks: BTreeSet<i64>,
    failed_points: Vec<FailedPoint>,
    declared_volumes: i64,
}

impl Statistics {
    pub fn new(declared_volumes: i64) -> Self {
        Self {
            declared_volumes,
            ..Self::default()
        }
    }

    pub fn record_outcome(&mut self, outcome: Outcome) {
        match outcome {
            Outcome::Success => self.success += 1,
            Outcome::Failure => self.failure += 1,
            Outcome::Ignored => self.ignored += 1,
            Outcome::Outside => self.outside += 1,
        }
    }

    /// Books one classified point: the outcome counter, the covered rank and,
    /// for failures, the point details.
    pub fn record(&mut self, record: &PtracRecord, classification: &Classification) {
        self.record_outcome(classification.outcome);
        if classification.rank >= 0 {
            self.covered_ranks.insert(classification.rank);
        }
        if classification.outcome == Outcome::Failure {
            self.failed_points.push(FailedPoint {
                position: record.position,
                mcnp_point_id: record.point_id,
                mcnp_cell_id: record.cell_id,
                mcnp_material_id: record.material_id,
                color: classification.surface_distance.unwrap_or(f64::INFINITY),
                rank: classification.rank,
            });
        }
    }

    pub fn count(&self, outcome: Outcome) -> u64 {
        match outcome {
            Outcome::Success => self.success,
            Outcome::Failure => self.failure,
            Outcome::Ignored => self.ignored,
            Outcome::Outside => self.outside,
        }
    }

    pub fn total(&self) -> u64 {
        self.success + self.failure + self.ignored + self.outside
    }

    pub fn covered_ranks(&self) -> &BTreeSet<i64> {
        &self.covered_ranks
    }

    pub fn declared_volumes(&self) -> i64 {
        self.declared_volumes
    }

    pub fn failed_points(&self) -> &[FailedPoint] {
        &self.failed_points
    }

    pub fn percentage(&self, outcome: Outcome) -> f64 {
        let total = self.total();
        if total == 0 {
            return 0.0;
        }
        100.0 * self.count(outcome) as f64 / total as f64
    }

    pub fn render_report(&self) -> String {
        let mut report = String::new();
        let _ = writeln!(report, "Points processed: {}", self.total());
        for outcome in [
            Outcome::Success,
            Outcome::Failure,
            Outcome::Ignored,
            Outcome::Outside,
        ] {
            let _ = writeln!(
                report,
                "{:<8} {:>10} ({:6.2}%)",
                outcome.as_str(),
                self.count(outcome),
                self.percentage(outcome)
            );
        }
        let _ = writeln!(
            report,
            "Volumes covered: {} / {}",
            self.covered_ranks.len(),
            self.declared_volumes
        );
        report
    }

    /// Writes the failed points as a JSON array.
    pub fn write_failed_points(&self, path: &Path) -> OracleResult<()> {
        write_json_artifact(path, &self.failed_points).map_err(|source| {
            OracleError::io_system(
                "IO.FAILED_POINTS_WRITE",
                format!(
                    "failed to write failed points to '{}': {}",
                    path.display(),
                    source
                ),
            )
        })?;
        tracing::info!(
            path = %path.display(),
            failures = self.failed_points.len(),
            "wrote failed points"
        );
        Ok(())
    }
}

/// `model.t4` -> `model.failedpoints.json`, next to the primary input.
pub fn failed_points_path(primary_input: &Path) -> PathBuf {
    primary_input.with_extension(FAILED_POINTS_EXTENSION)
}
