//! Streaming commit log reader.

use crate::error::{CoreError, CoreResult};
use crate::wal::record::{
    LogRecord, LogRecordType, CRC_SIZE, HEADER_BODY_SIZE, HEADER_SIZE, LOG_MAGIC, LOG_VERSION,
};
use metakv_storage::StorageBackend;
use parking_lot::MutexGuard;

/// Iterator over `(offset, record)` pairs, one record read at a time.
///
/// A header cut short by the end of the backend, or a checksummed header
/// whose payload is cut short, ends iteration cleanly;
/// [`LogIterator::valid_end`] then reports where the last complete record
/// stopped. Anything else wrong with a record is an error and ends iteration.
pub struct LogIterator<'a> {
    backend: MutexGuard<'a, Box<dyn StorageBackend>>,
    total_size: u64,
    offset: u64,
    finished: bool,
}

impl<'a> LogIterator<'a> {
    /// Starts reading at `start_offset`.
    ///
    /// # Errors
    ///
    /// Returns an error if the backend size cannot be read.
    pub fn new(
        backend: MutexGuard<'a, Box<dyn StorageBackend>>,
        start_offset: u64,
    ) -> CoreResult<Self> {
        let total_size = backend.size()?;
        Ok(Self {
            backend,
            total_size,
            offset: start_offset,
            finished: false,
        })
    }

    /// End of the last complete record read so far.
    #[must_use]
    pub fn valid_end(&self) -> u64 {
        self.offset
    }

    /// Size of the backend when iteration started.
    #[must_use]
    pub fn total_size(&self) -> u64 {
        self.total_size
    }

    /// Gives the locked backend back, e.g. to truncate a torn tail.
    pub(crate) fn into_backend(self) -> MutexGuard<'a, Box<dyn StorageBackend>> {
        self.backend
    }

    fn remaining(&self) -> u64 {
        self.total_size - self.offset
    }

    fn read_record(&mut self) -> CoreResult<Option<(u64, LogRecord)>> {
        let start = self.offset;
        if self.remaining() < HEADER_SIZE as u64 {
            return Ok(None);
        }

        let header = self.backend.read_at(start, HEADER_SIZE)?;
        if header[0..4] != LOG_MAGIC {
            return Err(CoreError::log_corruption(format!(
                "invalid magic at offset {start}"
            )));
        }
        let version = u16::from_le_bytes([header[4], header[5]]);
        if version == 0 || version > LOG_VERSION {
            return Err(CoreError::log_corruption(format!(
                "unsupported version {version} at offset {start}"
            )));
        }
        let record_type = LogRecordType::from_byte(header[6]).ok_or_else(|| {
            CoreError::log_corruption(format!(
                "unknown record type {} at offset {start}",
                header[6]
            ))
        })?;
        let stored_header = u32::from_le_bytes([header[11], header[12], header[13], header[14]]);
        let computed_header = crc32fast::hash(&header[..HEADER_BODY_SIZE]);
        if stored_header != computed_header {
            return Err(CoreError::ChecksumMismatch {
                offset: start,
                expected: stored_header,
                actual: computed_header,
            });
        }
        let payload_len =
            u64::from(u32::from_le_bytes([header[7], header[8], header[9], header[10]]));

        let body_len = payload_len + CRC_SIZE as u64;
        if self.remaining() - (HEADER_SIZE as u64) < body_len {
            return Ok(None);
        }

        let body = self
            .backend
            .read_at(start + HEADER_SIZE as u64, body_len as usize)?;
        let (payload, crc_bytes) = body.split_at(payload_len as usize);
        let stored = u32::from_le_bytes([crc_bytes[0], crc_bytes[1], crc_bytes[2], crc_bytes[3]]);

        let mut hasher = crc32fast::Hasher::new();
        hasher.update(&header);
        hasher.update(payload);
        let computed = hasher.finalize();
        if stored != computed {
            return Err(CoreError::ChecksumMismatch {
                offset: start,
                expected: stored,
                actual: computed,
            });
        }

        let record = LogRecord::decode_payload(record_type, payload)?;
        self.offset = start + HEADER_SIZE as u64 + body_len;
        Ok(Some((start, record)))
    }
}

impl Iterator for LogIterator<'_> {
    type Item = CoreResult<(u64, LogRecord)>;

    fn next(&mut self) -> Option<Self::Item> {
        if self.finished {
            return None;
        }
        match self.read_record() {
            Ok(Some(item)) => Some(Ok(item)),
            Ok(None) => {
                self.finished = true;
                None
            }
            Err(err) => {
                self.finished = true;
                Some(Err(err))
            }
        }
    }
}
