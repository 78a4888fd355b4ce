//! Run configuration threaded into the oracle and the comparison driver.

use crate::domain::{OracleError, OracleResult, PtracFormat};
use serde::{Deserialize, Serialize};

/// Surface distance below which a composition mismatch is forgiven.
pub const DEFAULT_DELTA: f64 = 1.0e-7;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct OracleConfig {
    pub delta: f64,
    pub max_points: u64,
    /// Learn MCNP signature to composition associations from the first
    /// occurrence instead of seeding them from the composition names.
    pub guess_material_assocs: bool,
    pub ptrac_format: PtracFormat,
}

impl Default for OracleConfig {
    fn default() -> Self {
        Self {
            delta: DEFAULT_DELTA,
            max_points: u64::MAX,
            guess_material_assocs: false,
            ptrac_format: PtracFormat::Ascii,
        }
    }
}

impl OracleConfig {
    pub fn validate(&self) -> OracleResult<()> {
        if !self.delta.is_finite() || self.delta < 0.0 {
            return Err(OracleError::input_validation(
                "INPUT.DELTA",
                format!("delta must be a finite non-negative distance, got {}", self.delta),
            ));
        }
        Ok(())
    }

    /// Number of histories to scan: `max_points`, capped by the NPS declared
    /// in the MCNP input when there is one.
    pub fn point_budget(&self, declared_nps: Option<u64>) -> u64 {
        declared_nps.map_or(self.max_points, |nps| nps.min(self.max_points))
    }
}
