use super::record::{FortranRecord, FortranRecordReader};
use super::{
    CELL_VARIABLE_ID, EVENT_VARIABLE_ID, MATERIAL_VARIABLE_ID, POSITION_VARIABLE_IDS, PtracReader,
    narrow_field, truncate_to_i64,
};
use crate::domain::{OracleError, OracleResult, PtracRecord, SOURCE_EVENT, TERMINAL_EVENT};
use std::collections::VecDeque;
use std::io::Read;

/// Descriptive records (marker, code/version banner, title) ahead of the
/// input echo.
const SKIPPED_HEADER_RECORDS: usize = 3;

/// Slot layout of the per-history data records, resolved once from the
/// header's variable-ID table.
///
/// `event`, `cell` and `material` index the long-typed block; `position`
/// indexes the double-typed block, which follows the long block inside
/// each data record.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PtracRecordIndices {
    pub nps_field_count: usize,
    pub long_count: usize,
    pub double_count: usize,
    pub event: usize,
    pub cell: usize,
    pub material: usize,
    pub position: [usize; 3],
}

impl PtracRecordIndices {
    /// `variable_ids` lists the NPS-line IDs, then the long IDs, then the
    /// double IDs.
    pub fn from_variable_ids(
        nps_field_count: usize,
        long_count: usize,
        double_count: usize,
        variable_ids: &[i32],
    ) -> OracleResult<Self> {
        let declared = nps_field_count + long_count + double_count;
        if variable_ids.len() < declared {
            return Err(OracleError::format(
                "FORMAT.PTRAC_HEADER",
                format!(
                    "variable-ID record lists {} IDs, header declares {}",
                    variable_ids.len(),
                    declared
                ),
            ));
        }

        let long_ids = &variable_ids[nps_field_count..nps_field_count + long_count];
        let double_ids = &variable_ids[nps_field_count + long_count..declared];

        Ok(Self {
            nps_field_count,
            long_count,
            double_count,
            event: slot_of(long_ids, EVENT_VARIABLE_ID, "event type")?,
            cell: slot_of(long_ids, CELL_VARIABLE_ID, "cell")?,
            material: slot_of(long_ids, MATERIAL_VARIABLE_ID, "material")?,
            position: [
                slot_of(double_ids, POSITION_VARIABLE_IDS[0], "x")?,
                slot_of(double_ids, POSITION_VARIABLE_IDS[1], "y")?,
                slot_of(double_ids, POSITION_VARIABLE_IDS[2], "z")?,
            ],
        })
    }

    pub fn data_field_count(&self) -> usize {
        self.long_count + self.double_count
    }
}

fn slot_of(ids: &[i32], variable_id: i32, name: &str) -> OracleResult<usize> {
    ids.iter()
        .position(|id| *id == variable_id)
        .ok_or_else(|| {
            OracleError::format(
                "FORMAT.PTRAC_LAYOUT",
                format!(
                    "PTRAC header does not declare the {} variable (ID {})",
                    name, variable_id
                ),
            )
        })
}

/// Decoder for the Fortran unformatted PTRAC layout.
#[derive(Debug)]
pub struct BinaryPtracReader<R> {
    records: FortranRecordReader<R>,
    indices: PtracRecordIndices,
    record: PtracRecord,
    points_read: u64,
    exhausted: bool,
}

impl<R: Read> BinaryPtracReader<R> {
    pub fn new(inner: R) -> OracleResult<Self> {
        let mut records = FortranRecordReader::new(inner);

        for _ in 0..SKIPPED_HEADER_RECORDS {
            require_header_record(&mut records, "descriptive header")?;
        }
        let echoed = skip_input_echo(&mut records)?;

        let counts = require_header_record(&mut records, "variable counts")?.i32_values()?;
        if counts.len() < 3 || counts[..3].iter().any(|count| *count < 0) {
            return Err(OracleError::format(
                "FORMAT.PTRAC_HEADER",
                format!(
                    "variable-count record should start with three non-negative counts, got {:?}",
                    counts
                ),
            ));
        }
        let nps_field_count = counts[0] as usize;
        let long_count = counts[1] as usize;
        let double_count = counts[2] as usize;
        if nps_field_count < 2 {
            return Err(OracleError::format(
                "FORMAT.PTRAC_HEADER",
                format!(
                    "NPS line must carry point and event fields, header declares {} field(s)",
                    nps_field_count
                ),
            ));
        }

        let variable_ids = require_header_record(&mut records, "variable IDs")?.i32_values()?;
        let indices = PtracRecordIndices::from_variable_ids(
            nps_field_count,
            long_count,
            double_count,
            &variable_ids,
        )?;

        tracing::debug!(
            echoed_values = echoed,
            longs = long_count,
            doubles = double_count,
            "parsed binary PTRAC header"
        );

        Ok(Self {
            records,
            indices,
            record: PtracRecord::default(),
            points_read: 0,
            exhausted: false,
        })
    }

    pub fn indices(&self) -> &PtracRecordIndices {
        &self.indices
    }

    fn decode_history(&mut self) -> OracleResult<Option<PtracRecord>> {
        let Some(nps_record) = self.records.next_record()? else {
            return Ok(None);
        };
        let nps_values = nps_record.i32_values()?;
        if nps_values.len() < 2 {
            return Err(OracleError::format(
                "FORMAT.PTRAC_NPS",
                format!(
                    "NPS record {} holds {} value(s), expected point and event",
                    nps_record.index,
                    nps_values.len()
                ),
            ));
        }
        let point_id: u64 = narrow_field(i64::from(nps_values[0]), "FORMAT.PTRAC_NPS", "point ID")?;
        let first_event = nps_values[1];
        if first_event != SOURCE_EVENT {
            return Err(OracleError::format(
                "FORMAT.PTRAC_DESYNC",
                format!(
                    "history {} starts with event {}, expected source event {}",
                    point_id, first_event, SOURCE_EVENT
                ),
            ));
        }

        let mut previous_event = first_event;
        let mut retained = None;
        loop {
            let Some(data_record) = self.records.next_record()? else {
                tracing::debug!(point_id, "PTRAC stream ends inside a history");
                return Ok(None);
            };
            let values = self.data_values(&data_record)?;
            let event = self.long_field(&data_record, &values, self.indices.event, "event")?;

            if previous_event == SOURCE_EVENT && retained.is_none() {
                retained = Some(PtracRecord {
                    point_id,
                    event_id: previous_event,
                    cell_id: narrow_field(
                        self.long_field(&data_record, &values, self.indices.cell, "cell")?,
                        "FORMAT.PTRAC_FIELD",
                        "cell ID",
                    )?,
                    material_id: narrow_field(
                        self.long_field(&data_record, &values, self.indices.material, "material")?,
                        "FORMAT.PTRAC_FIELD",
                        "material ID",
                    )?,
                    position: self
                        .indices
                        .position
                        .map(|slot| values[self.indices.long_count + slot]),
                });
            }

            previous_event = narrow_field(event, "FORMAT.PTRAC_FIELD", "event type")?;
            if previous_event == TERMINAL_EVENT {
                break;
            }
        }

        Ok(retained)
    }

    fn data_values(&self, record: &FortranRecord) -> OracleResult<Vec<f64>> {
        let values = record.f64_values()?;
        if values.len() < self.indices.data_field_count() {
            return Err(OracleError::format(
                "FORMAT.PTRAC_FIELD",
                format!(
                    "data record {} holds {} value(s), header declares {}",
                    record.index,
                    values.len(),
                    self.indices.data_field_count()
                ),
            ));
        }
        Ok(values)
    }

    /// Long-typed fields are stored as doubles and truncated back.
    fn long_field(
        &self,
        record: &FortranRecord,
        values: &[f64],
        slot: usize,
        name: &str,
    ) -> OracleResult<i64> {
        truncate_to_i64(values[slot]).ok_or_else(|| {
            OracleError::format(
                "FORMAT.PTRAC_FIELD",
                format!(
                    "data record {} holds a non-integral {} field {}",
                    record.index, name, values[slot]
                ),
            )
        })
    }
}

impl<R: Read> PtracReader for BinaryPtracReader<R> {
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

fn require_header_record<R: Read>(
    records: &mut FortranRecordReader<R>,
    what: &str,
) -> OracleResult<FortranRecord> {
    records.next_record()?.ok_or_else(|| {
        OracleError::format(
            "FORMAT.PTRAC_HEADER",
            format!(
                "binary PTRAC header ends before the {} record (after {} records)",
                what,
                records.records_read()
            ),
        )
    })
}

/// Walks the echoed input block: a group count, then for every group a field
/// count followed by that many values. All of them are 4-byte floats and the
/// block may span several records.
fn skip_input_echo<R: Read>(records: &mut FortranRecordReader<R>) -> OracleResult<usize> {
    let mut cursor = EchoCursor {
        records,
        pending: VecDeque::new(),
        consumed: 0,
    };

    let group_count = cursor.next_count("input echo group count")?;
    for group in 0..group_count {
        let field_count = cursor.next_count(&format!("input echo group {} size", group + 1))?;
        for _ in 0..field_count {
            cursor.next_value()?;
        }
    }

    if !cursor.pending.is_empty() {
        tracing::debug!(
            leftover = cursor.pending.len(),
            "discarding trailing values of the input echo record"
        );
    }
    Ok(cursor.consumed)
}

struct EchoCursor<'a, R> {
    records: &'a mut FortranRecordReader<R>,
    pending: VecDeque<f32>,
    consumed: usize,
}

impl<R: Read> EchoCursor<'_, R> {
    fn next_value(&mut self) -> OracleResult<f32> {
        while self.pending.is_empty() {
            let record = require_header_record(self.records, "input echo")?;
            self.pending.extend(record.f32_values()?);
        }
        self.consumed += 1;
        self.pending.pop_front().ok_or_else(|| {
            OracleError::internal("SYS.PTRAC_ECHO", "input echo cursor lost its buffered values")
        })
    }

    /// Counts are integers written as floats.
    fn next_count(&mut self, what: &str) -> OracleResult<usize> {
        let value = self.next_value()?;
        truncate_to_i64(f64::from(value))
            .filter(|count| *count >= 0)
            .map(|count| count as usize)
            .ok_or_else(|| {
                OracleError::format(
                    "FORMAT.PTRAC_HEADER",
                    format!("{} must be a non-negative count, got {}", what, value),
                )
            })
    }
}

#[cfg(test)]
mod tests {
    use super::{BinaryPtracReader, PtracRecordIndices};
    use crate::domain::OracleErrorCategory;
    use crate::ptrac::PtracReader;
    use crate::ptrac::record::push_record;
    use std::collections::VecDeque;
    use std::io::{Cursor, Read};

    /// Serves its chunks one after the other, reporting end of file between
    /// two chunks like a trace that is still being written.
    struct GrowingTrace {
        chunks: VecDeque<Cursor<Vec<u8>>>,
    }

    impl Read for GrowingTrace {
        fn read(&mut self, buffer: &mut [u8]) -> std::io::Result<usize> {
            let Some(chunk) = self.chunks.front_mut() else {
                return Ok(0);
            };
            let read = chunk.read(buffer)?;
            if read == 0 {
                self.chunks.pop_front();
            }
            Ok(read)
        }
    }

    fn i32s(values: &[i32]) -> Vec<u8> {
        values.iter().flat_map(|value| value.to_le_bytes()).collect()
    }

    fn f32s(values: &[f32]) -> Vec<u8> {
        values.iter().flat_map(|value| value.to_le_bytes()).collect()
    }

    fn f64s(values: &[f64]) -> Vec<u8> {
        values.iter().flat_map(|value| value.to_le_bytes()).collect()
    }

    /// Long block: event(7), cell(17), material(18); double block: x, y, z.
    fn header() -> Vec<u8> {
        let mut bytes = Vec::new();
        push_record(&mut bytes, &i32s(&[-1]));
        push_record(&mut bytes, b"mcnp    6.2     01/01/19");
        push_record(&mut bytes, b"binary slab");
        // two groups, the second one spilling into a second record
        push_record(&mut bytes, &f32s(&[2.0, 1.0, 5.0, 3.0, 1.0]));
        push_record(&mut bytes, &f32s(&[0.0, 4.0]));
        push_record(&mut bytes, &i32s(&[2, 3, 3, 0, 0]));
        push_record(&mut bytes, &i32s(&[1, 7, 7, 17, 18, 20, 21, 22]));
        bytes
    }

    fn history(bytes: &mut Vec<u8>, point: i32, events: &[(f64, f64, f64, [f64; 3])]) {
        push_record(bytes, &i32s(&[point, 1000]));
        for (event, cell, material, position) in events {
            push_record(
                bytes,
                &f64s(&[*event, *cell, *material, position[0], position[1], position[2]]),
            );
        }
    }

    #[test]
    fn resolves_slot_layout_from_header() {
        let reader = BinaryPtracReader::new(Cursor::new(header())).expect("valid header");
        assert_eq!(
            *reader.indices(),
            PtracRecordIndices {
                nps_field_count: 2,
                long_count: 3,
                double_count: 3,
                event: 0,
                cell: 1,
                material: 2,
                position: [0, 1, 2],
            }
        );
    }

    #[test]
    fn retains_the_state_right_after_the_source_event() {
        let mut bytes = header();
        history(
            &mut bytes,
            1,
            &[
                (3000.0, 3001.0, 1.0, [12.024, -72.882, 1.0883]),
                (4000.0, 2001.0, 2.0, [0.5, 0.5, 0.5]),
                (9000.0, 1000.0, 0.0, [9.0, 9.0, 9.0]),
            ],
        );
        history(&mut bytes, 2, &[(9000.0, 2001.0, 2.0, [0.43281, -1.367, -0.096474])]);

        let mut reader = BinaryPtracReader::new(Cursor::new(bytes)).expect("valid header");
        assert!(reader.read_next(10).unwrap());
        let record = *reader.current_record();
        assert_eq!(record.point_id, 1);
        assert_eq!(record.event_id, 1000);
        assert_eq!(record.cell_id, 3001);
        assert_eq!(record.material_id, 1);
        assert_eq!(record.position, [12.024, -72.882, 1.0883]);

        assert!(reader.read_next(10).unwrap());
        assert_eq!(reader.current_record().point_id, 2);
        assert_eq!(reader.current_record().cell_id, 2001);

        assert!(!reader.read_next(10).unwrap());
        assert_eq!(reader.points_read(), 2);
    }

    #[test]
    fn history_not_starting_at_source_is_fatal() {
        let mut bytes = header();
        push_record(&mut bytes, &i32s(&[1, 3000]));

        let mut reader = BinaryPtracReader::new(Cursor::new(bytes)).expect("valid header");
        let error = reader.read_next(10).expect_err("desynchronized stream");
        assert_eq!(error.category(), OracleErrorCategory::FormatError);
        assert_eq!(error.placeholder(), "FORMAT.PTRAC_DESYNC");
    }

    #[test]
    fn stream_ending_inside_a_history_is_not_an_error() {
        let mut bytes = header();
        history(&mut bytes, 1, &[(3000.0, 3001.0, 1.0, [0.0, 0.0, 0.0])]);

        let mut reader = BinaryPtracReader::new(Cursor::new(bytes)).expect("valid header");
        assert!(!reader.read_next(10).unwrap());
        assert_eq!(reader.points_read(), 0);
    }

    #[test]
    fn end_of_stream_is_final() {
        let mut first = header();
        history(&mut first, 1, &[(9000.0, 3001.0, 1.0, [1.0, 2.0, 3.0])]);
        let mut second = Vec::new();
        history(&mut second, 2, &[(9000.0, 2001.0, 2.0, [4.0, 5.0, 6.0])]);

        let trace = GrowingTrace {
            chunks: VecDeque::from([Cursor::new(first), Cursor::new(second)]),
        };
        let mut reader = BinaryPtracReader::new(trace).expect("valid header");

        assert!(reader.read_next(10).unwrap());
        assert!(!reader.read_next(10).unwrap());
        assert!(!reader.read_next(10).unwrap());
        assert_eq!(reader.current_record().point_id, 1);
        assert_eq!(reader.points_read(), 1);
    }

    #[test]
    fn missing_position_variable_is_fatal() {
        let mut bytes = Vec::new();
        push_record(&mut bytes, &i32s(&[-1]));
        push_record(&mut bytes, b"banner");
        push_record(&mut bytes, b"title");
        push_record(&mut bytes, &f32s(&[0.0]));
        push_record(&mut bytes, &i32s(&[2, 3, 3]));
        push_record(&mut bytes, &i32s(&[1, 7, 7, 17, 18, 20, 21, 23]));

        let error = BinaryPtracReader::new(Cursor::new(bytes)).expect_err("missing z");
        assert_eq!(error.placeholder(), "FORMAT.PTRAC_LAYOUT");
        assert!(error.message().contains("ID 22"));
    }

    #[test]
    fn corrupted_record_marker_is_fatal() {
        let mut bytes = header();
        bytes.extend_from_slice(&8_i32.to_le_bytes());
        bytes.extend_from_slice(&i32s(&[1, 1000]));
        bytes.extend_from_slice(&4_i32.to_le_bytes());

        let mut reader = BinaryPtracReader::new(Cursor::new(bytes)).expect("valid header");
        let error = reader.read_next(10).expect_err("corrupt record");
        assert_eq!(error.placeholder(), "FORMAT.PTRAC_RECORD_LENGTH");
    }
}
