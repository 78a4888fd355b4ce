//! Fortran unformatted sequential records: `[i32 len][payload][i32 len]`.

use crate::domain::OracleError;
use std::io::{ErrorKind, Read};

const LENGTH_MARKER_BYTES: usize = std::mem::size_of::<i32>();

#[derive(Debug, thiserror::Error)]
pub enum RecordError {
    #[error("failed to read PTRAC record {index}: {source}")]
    Io {
        index: usize,
        source: std::io::Error,
    },
    #[error("record {index} length mismatch: leading marker {leading}, trailing marker {trailing}")]
    LengthMismatch {
        index: usize,
        leading: i32,
        trailing: i32,
    },
    #[error("record {index} declares a negative length {length}")]
    NegativeLength { index: usize, length: i32 },
    #[error("record {index} payload of {length} bytes is not a multiple of {width}-byte fields")]
    Misaligned {
        index: usize,
        length: usize,
        width: usize,
    },
}

impl From<RecordError> for OracleError {
    fn from(error: RecordError) -> Self {
        match error {
            RecordError::Io { .. } => OracleError::io_system("IO.PTRAC_READ", error.to_string()),
            RecordError::LengthMismatch { .. } => {
                OracleError::format("FORMAT.PTRAC_RECORD_LENGTH", error.to_string())
            }
            RecordError::NegativeLength { .. } => {
                OracleError::format("FORMAT.PTRAC_RECORD_LENGTH", error.to_string())
            }
            RecordError::Misaligned { .. } => {
                OracleError::format("FORMAT.PTRAC_RECORD_PAYLOAD", error.to_string())
            }
        }
    }
}

/// One framed record, with its position in the stream kept for diagnostics.
#[derive(Debug, Clone, PartialEq)]
pub struct FortranRecord {
    pub index: usize,
    pub payload: Vec<u8>,
}

impl FortranRecord {
    pub fn i32_values(&self) -> Result<Vec<i32>, RecordError> {
        self.chunks::<4>()
            .map(|chunks| chunks.map(i32::from_le_bytes).collect())
    }

    pub fn f32_values(&self) -> Result<Vec<f32>, RecordError> {
        self.chunks::<4>()
            .map(|chunks| chunks.map(f32::from_le_bytes).collect())
    }

    pub fn f64_values(&self) -> Result<Vec<f64>, RecordError> {
        self.chunks::<8>()
            .map(|chunks| chunks.map(f64::from_le_bytes).collect())
    }

    fn chunks<const WIDTH: usize>(
        &self,
    ) -> Result<impl Iterator<Item = [u8; WIDTH]> + '_, RecordError> {
        if self.payload.len() % WIDTH != 0 {
            return Err(RecordError::Misaligned {
                index: self.index,
                length: self.payload.len(),
                width: WIDTH,
            });
        }

        Ok(self.payload.chunks_exact(WIDTH).map(|chunk| {
            let mut value = [0_u8; WIDTH];
            value.copy_from_slice(chunk);
            value
        }))
    }
}

#[derive(Debug)]
pub struct FortranRecordReader<R> {
    inner: R,
    records_read: usize,
}

impl<R: Read> FortranRecordReader<R> {
    pub fn new(inner: R) -> Self {
        Self {
            inner,
            records_read: 0,
        }
    }

    pub fn records_read(&self) -> usize {
        self.records_read
    }

    /// Returns `Ok(None)` once the stream ends, including an end that falls
    /// inside a record.
    pub fn next_record(&mut self) -> Result<Option<FortranRecord>, RecordError> {
        let index = self.records_read;

        let Some(leading) = self.read_marker(index)? else {
            return Ok(None);
        };
        if leading < 0 {
            return Err(RecordError::NegativeLength {
                index,
                length: leading,
            });
        }

        // the declared length is untrusted until the payload is actually read
        let mut payload = Vec::new();
        self.inner
            .by_ref()
            .take(u64::from(leading.unsigned_abs()))
            .read_to_end(&mut payload)
            .map_err(|source| RecordError::Io { index, source })?;
        if payload.len() < leading as usize {
            tracing::debug!(record = index, "PTRAC stream ends inside a record payload");
            return Ok(None);
        }

        let Some(trailing) = self.read_marker(index)? else {
            tracing::debug!(record = index, "PTRAC stream ends before a trailing marker");
            return Ok(None);
        };
        if trailing != leading {
            return Err(RecordError::LengthMismatch {
                index,
                leading,
                trailing,
            });
        }

        self.records_read += 1;
        Ok(Some(FortranRecord { index, payload }))
    }

    fn read_marker(&mut self, index: usize) -> Result<Option<i32>, RecordError> {
        let mut marker = [0_u8; LENGTH_MARKER_BYTES];
        if self.fill(&mut marker, index)? < LENGTH_MARKER_BYTES {
            return Ok(None);
        }
        Ok(Some(i32::from_le_bytes(marker)))
    }

    fn fill(&mut self, buffer: &mut [u8], index: usize) -> Result<usize, RecordError> {
        let mut filled = 0;
        while filled < buffer.len() {
            match self.inner.read(&mut buffer[filled..]) {
                Ok(0) => break,
                Ok(read) => filled += read,
                Err(source) if source.kind() == ErrorKind::Interrupted => continue,
                Err(source) => return Err(RecordError::Io { index, source }),
            }
        }
        Ok(filled)
    }
}

pub fn push_record(target: &mut Vec<u8>, payload: &[u8]) {
    let length = payload.len() as i32;
    target.extend_from_slice(&length.to_le_bytes());
    target.extend_from_slice(payload);
    target.extend_from_slice(&length.to_le_bytes());
}
