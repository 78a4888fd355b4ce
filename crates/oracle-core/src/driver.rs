use crate::domain::OracleResult;
use crate::geometry::VolumeEngine;
use crate::mcnp::McnpInput;
use crate::oracle::EquivalenceOracle;
use crate::ptrac::PtracReader;
use crate::statistics::Statistics;
use std::time::{Duration, Instant};

const PROGRESS_INTERVAL: Duration = Duration::from_secs(5);

struct ProgressReporter {
    max_points: u64,
    last_report: Instant,
}

impl ProgressReporter {
    fn new(max_points: u64) -> Self {
        Self {
            max_points,
            last_report: Instant::now(),
        }
    }

    fn tick(&mut self, processed: u64) {
        if self.last_report.elapsed() < PROGRESS_INTERVAL {
            return;
        }
        self.last_report = Instant::now();
        if self.max_points == u64::MAX {
            tracing::info!("Progress: {}", processed);
        } else {
            tracing::info!("Progress: {} / {}", processed, self.max_points);
        }
    }
}

/// Classifies every history of `reader`, in file order, until the trace is
/// exhausted or `max_points` histories were read. Returns the number of
/// processed points.
pub fn run_comparison<E: VolumeEngine + ?Sized>(
    reader: &mut dyn PtracReader,
    mcnp: &McnpInput,
    oracle: &mut EquivalenceOracle<'_, E>,
    statistics: &mut Statistics,
    max_points: u64,
) -> OracleResult<u64> {
    let mut progress = ProgressReporter::new(max_points);
    let mut processed = 0_u64;

    while reader.read_next(max_points)? {
        let record = *reader.current_record();
        let signature = mcnp.density_signature(record.cell_id)?;
        let classification = oracle.classify(&record, &signature)?;
        tracing::debug!(
            point = record.point_id,
            cell = record.cell_id,
            signature = %signature,
            rank = classification.rank,
            outcome = %classification.outcome,
            "classified point"
        );
        statistics.record(&record, &classification);
        processed += 1;
        progress.tick(processed);
    }

    tracing::info!(
        processed,
        associations = oracle.associations().len(),
        "comparison finished"
    );
    Ok(processed)
}
