pub mod errors;

pub use errors::{ExitDisposition, OracleError, OracleErrorCategory, OracleResult};

use serde::{Deserialize, Serialize};
use std::fmt::{Display, Formatter};
use std::str::FromStr;

/// Event code MCNP writes for the source emission that starts a history.
pub const SOURCE_EVENT: i32 = 1000;
/// Event code MCNP writes for the terminal bank that closes a history.
pub const TERMINAL_EVENT: i32 = 9000;

/// Density string stored for cells without material.
pub const VOID_DENSITY: &str = "void";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PtracFormat {
    #[default]
    Ascii,
    Binary,
}

impl PtracFormat {
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Ascii => "ascii",
            Self::Binary => "binary",
        }
    }
}

impl Display for PtracFormat {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        f.write_str((*self).as_str())
    }
}

impl FromStr for PtracFormat {
    type Err = OracleError;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        match value.trim().to_ascii_lowercase().as_str() {
            "ascii" | "text" => Ok(Self::Ascii),
            "binary" | "bin" => Ok(Self::Binary),
            other => Err(OracleError::input_validation(
                "INPUT.PTRAC_FORMAT",
                format!("unknown PTRAC format '{}', expected 'ascii' or 'binary'", other),
            )),
        }
    }
}

/// State of one particle history as seen by MCNP right after emission.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct PtracRecord {
    pub point_id: u64,
    pub event_id: i32,
    pub cell_id: u32,
    pub material_id: u32,
    pub position: [f64; 3],
}

/// Normalized material signature of an MCNP cell.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct CellSignature {
    pub material_id: u32,
    pub density: String,
}

impl CellSignature {
    pub fn new(material_id: u32, density: impl Into<String>) -> Self {
        Self {
            material_id,
            density: density.into(),
        }
    }

    pub fn void() -> Self {
        Self::new(0, VOID_DENSITY)
    }

    pub fn is_void(&self) -> bool {
        self.material_id == 0
    }

    /// Key used by the equivalence map, `<materialID>_<density>`.
    pub fn key(&self) -> String {
        format!("{}_{}", self.material_id, self.density)
    }
}

impl Display for CellSignature {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}_{}", self.material_id, self.density)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Outcome {
    Success,
    Failure,
    Ignored,
    Outside,
}

impl Outcome {
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Success => "SUCCESS",
            Self::Failure => "FAILURE",
            Self::Ignored => "IGNORED",
            Self::Outside => "OUTSIDE",
        }
    }
}

impl Display for Outcome {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        f.write_str((*self).as_str())
    }
}

/// A sampled point where the two geometries disagree away from any surface.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FailedPoint {
    pub position: [f64; 3],
    pub mcnp_point_id: u64,
    pub mcnp_cell_id: u32,
    pub mcnp_material_id: u32,
    /// Scalar used by visualization tools to colour the point; carries the
    /// probed distance to the nearest surface.
    pub color: f64,
    pub rank: i64,
}
