use super::{
    CELL_VARIABLE_ID, MATERIAL_VARIABLE_ID, PtracReader, narrow_field, parse_integer_token,
};
use crate::domain::{OracleError, OracleResult, PtracRecord};
use std::io::BufRead;

/// Number of header lines MCNP writes ahead of the first history.
pub const ASCII_HEADER_LINES: usize = 8;

const FIELD_COUNTS_LINE: usize = 5;
const VARIABLE_IDS_LINE: usize = 6;

/// Line-oriented PTRAC decoder.
///
/// Every history spans three lines: `point event`, the cell/material line
/// and the `x y z` line.
#[derive(Debug)]
pub struct AsciiPtracReader<R> {
    inner: R,
    line_number: usize,
    cell_line_field_count: usize,
    record: PtracRecord,
    points_read: u64,
    exhausted: bool,
}

impl<R: BufRead> AsciiPtracReader<R> {
    pub fn new(inner: R) -> OracleResult<Self> {
        Self::with_header_lines(inner, ASCII_HEADER_LINES)
    }

    pub fn with_header_lines(inner: R, header_lines: usize) -> OracleResult<Self> {
        if header_lines != ASCII_HEADER_LINES {
            return Err(OracleError::format(
                "FORMAT.PTRAC_HEADER",
                format!(
                    "ASCII PTRAC header must span {} lines, got {}",
                    ASCII_HEADER_LINES, header_lines
                ),
            ));
        }

        let mut reader = Self {
            inner,
            line_number: 0,
            cell_line_field_count: 0,
            record: PtracRecord::default(),
            points_read: 0,
            exhausted: false,
        };

        let mut header = Vec::with_capacity(header_lines);
        for _ in 0..header_lines {
            let line = reader.next_line()?.ok_or_else(|| {
                OracleError::format(
                    "FORMAT.PTRAC_HEADER",
                    format!(
                        "ASCII PTRAC header ends after {} of {} lines",
                        reader.line_number, header_lines
                    ),
                )
            })?;
            header.push(line);
        }

        reader.cell_line_field_count = parse_header_layout(&header)?;
        tracing::debug!(
            fields = reader.cell_line_field_count,
            "parsed ASCII PTRAC header"
        );
        Ok(reader)
    }

    fn next_line(&mut self) -> OracleResult<Option<String>> {
        let mut line = String::new();
        let read = self.inner.read_line(&mut line).map_err(|source| {
            OracleError::io_system(
                "IO.PTRAC_READ",
                format!(
                    "failed to read PTRAC line {}: {}",
                    self.line_number + 1,
                    source
                ),
            )
        })?;
        if read == 0 {
            return Ok(None);
        }
        self.line_number += 1;
        Ok(Some(line.trim_end_matches(['\r', '\n']).to_string()))
    }

    /// A missing or blank line where history data is expected ends the stream.
    fn next_data_line(&mut self) -> OracleResult<Option<String>> {
        Ok(self.next_line()?.filter(|line| !line.trim().is_empty()))
    }

    fn decode_history(&mut self) -> OracleResult<Option<PtracRecord>> {
        let Some(event_line) = self.next_data_line()? else {
            return Ok(None);
        };
        let event_tokens = event_line.split_whitespace().collect::<Vec<_>>();
        if event_tokens.len() < 2 {
            return Err(self.line_error(&event_line, "expected point ID and event ID"));
        }
        let point_id = self.integer_field(&event_line, event_tokens[0], "point ID")?;
        let event_id = self.integer_field(&event_line, event_tokens[1], "event ID")?;

        let Some(cell_line) = self.next_data_line()? else {
            return Ok(None);
        };
        let cell_tokens = cell_line.split_whitespace().collect::<Vec<_>>();
        if cell_tokens.len() < self.cell_line_field_count {
            return Err(self.line_error(
                &cell_line,
                &format!(
                    "expected {} fields on the cell/material line, found {}",
                    self.cell_line_field_count,
                    cell_tokens.len()
                ),
            ));
        }
        let cell_id = self.integer_field(
            &cell_line,
            cell_tokens[self.cell_line_field_count - 2],
            "cell ID",
        )?;
        let material_id = self.integer_field(
            &cell_line,
            cell_tokens[self.cell_line_field_count - 1],
            "material ID",
        )?;

        let Some(position_line) = self.next_data_line()? else {
            return Ok(None);
        };
        let coordinates = position_line
            .split_whitespace()
            .take(3)
            .map(|token| token.replace(['D', 'd'], "E").parse::<f64>())
            .collect::<Result<Vec<_>, _>>()
            .map_err(|_| self.line_error(&position_line, "unparseable coordinate"))?;
        if coordinates.len() < 3 {
            return Err(self.line_error(&position_line, "expected three coordinates"));
        }

        Ok(Some(PtracRecord {
            point_id: narrow_field(point_id, "FORMAT.PTRAC_FIELD", "point ID")?,
            event_id: narrow_field(event_id, "FORMAT.PTRAC_FIELD", "event ID")?,
            cell_id: narrow_field(cell_id, "FORMAT.PTRAC_FIELD", "cell ID")?,
            material_id: narrow_field(material_id, "FORMAT.PTRAC_FIELD", "material ID")?,
            position: [coordinates[0], coordinates[1], coordinates[2]],
        }))
    }

    fn integer_field(&self, line: &str, token: &str, field: &str) -> OracleResult<i64> {
        parse_integer_token(token)
            .ok_or_else(|| self.line_error(line, &format!("unparseable {} '{}'", field, token)))
    }

    fn line_error(&self, line: &str, message: &str) -> OracleError {
        OracleError::format(
            "FORMAT.PTRAC_FIELD",
            format!(
                "PTRAC line {}: {} in '{}'",
                self.line_number,
                message,
                line.trim()
            ),
        )
    }
}

impl<R: BufRead> PtracReader for AsciiPtracReader<R> {
    fn read_next(&mut self, max_points: u64) -> OracleResult<bool> {
        if self.exhausted || self.points_read >= max_points {
            return Ok(false);
        }

        match self.decode_history()? {
            Some(record) => {
                self.record = record;
                self.points_read += 1;
                Ok(true)
            }
            None => {
                self.exhausted = true;
                Ok(false)
            }
        }
    }

    fn current_record(&self) -> &PtracRecord {
        &self.record
    }

    fn points_read(&self) -> u64 {
        self.points_read
    }
}

/// Returns the field count of the cell/material line after checking that
/// its last two slots carry the cell and material variable IDs.
fn parse_header_layout(header: &[String]) -> OracleResult<usize> {
    let counts = header[FIELD_COUNTS_LINE]
        .split_whitespace()
        .take(2)
        .map(parse_integer_token)
        .collect::<Option<Vec<_>>>()
        .filter(|counts| counts.len() == 2 && counts.iter().all(|count| *count >= 0))
        .ok_or_else(|| {
            OracleError::format(
                "FORMAT.PTRAC_HEADER",
                format!(
                    "header line {} should declare two field counts, got '{}'",
                    FIELD_COUNTS_LINE + 1,
                    header[FIELD_COUNTS_LINE].trim()
                ),
            )
        })?;
    let event_line_fields = counts[0] as usize;
    let cell_line_fields = counts[1] as usize;
    let declared_slots = event_line_fields + cell_line_fields;

    if cell_line_fields < 2 {
        return Err(OracleError::format(
            "FORMAT.PTRAC_HEADER",
            format!(
                "cell/material line must hold at least 2 fields, header declares {}",
                cell_line_fields
            ),
        ));
    }

    let variable_ids = header[VARIABLE_IDS_LINE]
        .split_whitespace()
        .map(parse_integer_token)
        .collect::<Option<Vec<_>>>()
        .ok_or_else(|| {
            OracleError::format(
                "FORMAT.PTRAC_HEADER",
                format!(
                    "header line {} holds a non-numeric variable ID: '{}'",
                    VARIABLE_IDS_LINE + 1,
                    header[VARIABLE_IDS_LINE].trim()
                ),
            )
        })?;
    if variable_ids.len() < declared_slots {
        return Err(OracleError::format(
            "FORMAT.PTRAC_HEADER",
            format!(
                "header declares {} variable slots but line {} lists {} IDs",
                declared_slots,
                VARIABLE_IDS_LINE + 1,
                variable_ids.len()
            ),
        ));
    }

    let cell_slot = variable_ids[declared_slots - 2];
    let material_slot = variable_ids[declared_slots - 1];
    if cell_slot != i64::from(CELL_VARIABLE_ID) || material_slot != i64::from(MATERIAL_VARIABLE_ID)
    {
        return Err(OracleError::format(
            "FORMAT.PTRAC_LAYOUT",
            format!(
                "cell/material line must end with variable IDs {} and {}, found {} and {}",
                CELL_VARIABLE_ID, MATERIAL_VARIABLE_ID, cell_slot, material_slot
            ),
        ));
    }

    Ok(cell_line_fields)
}
