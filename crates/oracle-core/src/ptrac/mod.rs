//! Decoders for MCNP particle-track (PTRAC) output.
//!
//! Both decoders hand out one [`PtracRecord`] per particle history: the state
//! of the particle right after its source event. Which decoder to use is
//! decided once, from the declared [`PtracFormat`].

mod ascii;
mod binary;
pub mod record;

pub use ascii::{ASCII_HEADER_LINES, AsciiPtracReader};
pub use binary::{BinaryPtracReader, PtracRecordIndices};

use crate::domain::{OracleError, OracleResult, PtracFormat, PtracRecord};
use std::fs::File;
use std::io::BufReader;
use std::path::Path;

/// PTRAC variable ID of the next-event type.
pub const EVENT_VARIABLE_ID: i32 = 7;
/// PTRAC variable ID of the cell number.
pub const CELL_VARIABLE_ID: i32 = 17;
/// PTRAC variable ID of the material number.
pub const MATERIAL_VARIABLE_ID: i32 = 18;
/// PTRAC variable IDs of the x, y and z coordinates.
pub const POSITION_VARIABLE_IDS: [i32; 3] = [20, 21, 22];

pub trait PtracReader {
    /// Decodes the next complete history.
    ///
    /// Returns `Ok(false)` without side effects once the stream is exhausted
    /// or `max_points` histories have already been read.
    fn read_next(&mut self, max_points: u64) -> OracleResult<bool>;

    /// The history decoded by the last successful [`PtracReader::read_next`].
    fn current_record(&self) -> &PtracRecord;

    fn points_read(&self) -> u64;
}

pub fn open_ptrac(path: &Path, format: PtracFormat) -> OracleResult<Box<dyn PtracReader>> {
    let file = File::open(path).map_err(|source| {
        OracleError::io_system(
            "IO.PTRAC_OPEN",
            format!("failed to open PTRAC file '{}': {}", path.display(), source),
        )
    })?;
    let reader = BufReader::new(file);

    let decoder: Box<dyn PtracReader> = match format {
        PtracFormat::Ascii => Box::new(AsciiPtracReader::new(reader)?),
        PtracFormat::Binary => Box::new(BinaryPtracReader::new(reader)?),
    };
    tracing::info!(path = %path.display(), %format, "opened PTRAC file");
    Ok(decoder)
}

/// Integer fields are sometimes written in floating-point notation; those are
/// truncated toward zero.
pub(crate) fn parse_integer_token(token: &str) -> Option<i64> {
    if let Ok(value) = token.parse::<i64>() {
        return Some(value);
    }
    let value = token.replace(['D', 'd'], "E").parse::<f64>().ok()?;
    truncate_to_i64(value)
}

pub(crate) fn truncate_to_i64(value: f64) -> Option<i64> {
    if !value.is_finite() {
        return None;
    }
    let truncated = value.trunc();
    if truncated < i64::MIN as f64 || truncated > i64::MAX as f64 {
        return None;
    }
    Some(truncated as i64)
}

pub(crate) fn narrow_field<T: TryFrom<i64>>(
    value: i64,
    placeholder: &'static str,
    field: &str,
) -> OracleResult<T> {
    T::try_from(value).map_err(|_| {
        OracleError::format(
            placeholder,
            format!("{} value {} is out of range", field, value),
        )
    })
}
