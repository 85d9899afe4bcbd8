//! Commit log record types and payload encoding.

use crate::error::{CoreError, CoreResult};
use crate::types::{LogIndex, Revision, TxnId};

/// Magic bytes opening every record.
pub const LOG_MAGIC: [u8; 4] = *b"MKVL";

/// Current record format version.
pub const LOG_VERSION: u16 = 1;

/// Envelope header: magic (4) + version (2) + type (1) + length (4) +
/// header crc32 (4).
pub(crate) const HEADER_SIZE: usize = 15;

/// Header bytes covered by the header checksum.
pub(crate) const HEADER_BODY_SIZE: usize = 11;

/// Trailing checksum size.
pub(crate) const CRC_SIZE: usize = 4;

const OP_PUT: u8 = 1;
const OP_DELETE: u8 = 2;

/// Type byte of a record.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(u8)]
pub enum LogRecordType {
    /// A committed write session.
    Commit = 1,
    /// All key data dropped.
    Clear = 2,
}

impl LogRecordType {
    /// Parses a type byte.
    pub fn from_byte(b: u8) -> Option<Self> {
        match b {
            1 => Some(Self::Commit),
            2 => Some(Self::Clear),
            _ => None,
        }
    }

    /// The type byte.
    #[must_use]
    pub const fn as_byte(self) -> u8 {
        self as u8
    }
}

/// One mutation inside a commit.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LogOp {
    /// A new value for `key`.
    Put {
        /// Key.
        key: Vec<u8>,
        /// Value, possibly empty.
        value: Vec<u8>,
        /// Revision stamped on the write.
        revision: Revision,
    },
    /// A tombstone for `key`.
    Delete {
        /// Key.
        key: Vec<u8>,
        /// Revision stamped on the tombstone.
        revision: Revision,
    },
}

impl LogOp {
    /// The key this op touches.
    #[must_use]
    pub fn key(&self) -> &[u8] {
        match self {
            Self::Put { key, .. } | Self::Delete { key, .. } => key,
        }
    }

    /// The revision stamped on this op.
    #[must_use]
    pub fn revision(&self) -> Revision {
        match self {
            Self::Put { revision, .. } | Self::Delete { revision, .. } => *revision,
        }
    }
}

/// A commit log record.
///
/// A whole write session is one record, so a record is either fully in the
/// log (committed) or absent.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LogRecord {
    /// A committed session.
    Commit {
        /// Session identifier.
        txid: TxnId,
        /// Watermark advanced by this commit, if it was log-gated.
        applied: Option<LogIndex>,
        /// Mutations in submission order.
        ops: Vec<LogOp>,
    },
    /// Every key was dropped. Revision counter and watermark are kept.
    Clear {
        /// Session identifier.
        txid: TxnId,
    },
}

impl LogRecord {
    /// Returns the record type.
    #[must_use]
    pub fn record_type(&self) -> LogRecordType {
        match self {
            Self::Commit { .. } => LogRecordType::Commit,
            Self::Clear { .. } => LogRecordType::Clear,
        }
    }

    /// Returns the session identifier.
    #[must_use]
    pub fn txid(&self) -> TxnId {
        match self {
            Self::Commit { txid, .. } | Self::Clear { txid } => *txid,
        }
    }

    /// Encodes the payload (without the envelope).
    ///
    /// # Errors
    ///
    /// Returns an error if a key or value does not fit a 4-byte length.
    pub fn encode_payload(&self) -> CoreResult<Vec<u8>> {
        let mut buf = Vec::new();
        match self {
            Self::Clear { txid } => {
                buf.extend_from_slice(&txid.as_u64().to_le_bytes());
            }
            Self::Commit { txid, applied, ops } => {
                buf.extend_from_slice(&txid.as_u64().to_le_bytes());
                match applied {
                    Some(index) => {
                        buf.push(1);
                        buf.extend_from_slice(&index.as_u64().to_le_bytes());
                    }
                    None => buf.push(0),
                }
                put_len(&mut buf, ops.len())?;
                for op in ops {
                    match op {
                        LogOp::Put {
                            key,
                            value,
                            revision,
                        } => {
                            buf.push(OP_PUT);
                            buf.extend_from_slice(&revision.as_u64().to_le_bytes());
                            put_bytes(&mut buf, key)?;
                            put_bytes(&mut buf, value)?;
                        }
                        LogOp::Delete { key, revision } => {
                            buf.push(OP_DELETE);
                            buf.extend_from_slice(&revision.as_u64().to_le_bytes());
                            put_bytes(&mut buf, key)?;
                        }
                    }
                }
            }
        }
        Ok(buf)
    }

    /// Decodes a payload of the given type.
    ///
    /// # Errors
    ///
    /// Returns [`CoreError::LogCorruption`] if the payload is short, has
    /// trailing bytes or carries an unknown op tag.
    pub fn decode_payload(record_type: LogRecordType, payload: &[u8]) -> CoreResult<Self> {
        let mut reader = PayloadReader::new(payload);
        let record = match record_type {
            LogRecordType::Clear => Self::Clear {
                txid: TxnId::new(reader.u64()?),
            },
            LogRecordType::Commit => {
                let txid = TxnId::new(reader.u64()?);
                let applied = match reader.u8()? {
                    0 => None,
                    1 => Some(LogIndex::new(reader.u64()?)),
                    flag => {
                        return Err(CoreError::log_corruption(format!(
                            "invalid applied-index flag {flag}"
                        )))
                    }
                };
                let count = reader.u32()? as usize;
                let mut ops = Vec::with_capacity(count.min(1024));
                for _ in 0..count {
                    let tag = reader.u8()?;
                    let revision = Revision::new(reader.u64()?);
                    let key = reader.bytes()?;
                    let op = match tag {
                        OP_PUT => LogOp::Put {
                            key,
                            value: reader.bytes()?,
                            revision,
                        },
                        OP_DELETE => LogOp::Delete { key, revision },
                        other => {
                            return Err(CoreError::log_corruption(format!(
                                "unknown op tag {other}"
                            )))
                        }
                    };
                    ops.push(op);
                }
                Self::Commit { txid, applied, ops }
            }
        };
        reader.finish(record_type)?;
        Ok(record)
    }

    /// Encodes the full record: envelope, payload and checksum.
    ///
    /// # Errors
    ///
    /// Returns an error if the payload cannot be encoded.
    pub fn encode(&self) -> CoreResult<Vec<u8>> {
        let payload = self.encode_payload()?;
        let len = u32::try_from(payload.len())
            .map_err(|_| CoreError::invalid_operation("commit record payload too large"))?;

        let mut data = Vec::with_capacity(HEADER_SIZE + payload.len() + CRC_SIZE);
        data.extend_from_slice(&LOG_MAGIC);
        data.extend_from_slice(&LOG_VERSION.to_le_bytes());
        data.push(self.record_type().as_byte());
        data.extend_from_slice(&len.to_le_bytes());
        let header_crc = crc32fast::hash(&data);
        data.extend_from_slice(&header_crc.to_le_bytes());
        data.extend_from_slice(&payload);
        let crc = crc32fast::hash(&data);
        data.extend_from_slice(&crc.to_le_bytes());
        Ok(data)
    }
}

fn put_len(buf: &mut Vec<u8>, len: usize) -> CoreResult<()> {
    let len = u32::try_from(len).map_err(|_| {
        CoreError::invalid_operation(format!("length {len} does not fit a commit record"))
    })?;
    buf.extend_from_slice(&len.to_le_bytes());
    Ok(())
}

fn put_bytes(buf: &mut Vec<u8>, bytes: &[u8]) -> CoreResult<()> {
    put_len(buf, bytes.len())?;
    buf.extend_from_slice(bytes);
    Ok(())
}

struct PayloadReader<'a> {
    payload: &'a [u8],
    pos: usize,
}

impl<'a> PayloadReader<'a> {
    fn new(payload: &'a [u8]) -> Self {
        Self { payload, pos: 0 }
    }

    fn take(&mut self, n: usize) -> CoreResult<&'a [u8]> {
        let end = self
            .pos
            .checked_add(n)
            .filter(|&end| end <= self.payload.len())
            .ok_or_else(|| {
                CoreError::log_corruption(format!(
                    "payload ends at {} but {} more bytes were expected at {}",
                    self.payload.len(),
                    n,
                    self.pos
                ))
            })?;
        let slice = &self.payload[self.pos..end];
        self.pos = end;
        Ok(slice)
    }

    fn u8(&mut self) -> CoreResult<u8> {
        Ok(self.take(1)?[0])
    }

    fn u32(&mut self) -> CoreResult<u32> {
        let mut raw = [0u8; 4];
        raw.copy_from_slice(self.take(4)?);
        Ok(u32::from_le_bytes(raw))
    }

    fn u64(&mut self) -> CoreResult<u64> {
        let mut raw = [0u8; 8];
        raw.copy_from_slice(self.take(8)?);
        Ok(u64::from_le_bytes(raw))
    }

    fn bytes(&mut self) -> CoreResult<Vec<u8>> {
        let len = self.u32()? as usize;
        Ok(self.take(len)?.to_vec())
    }

    fn finish(&self, record_type: LogRecordType) -> CoreResult<()> {
        if self.pos != self.payload.len() {
            return Err(CoreError::log_corruption(format!(
                "trailing bytes in {record_type:?} record: used {}, got {}",
                self.pos,
                self.payload.len()
            )));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample_commit() -> LogRecord {
        LogRecord::Commit {
            txid: TxnId::new(3),
            applied: Some(LogIndex::new(0)),
            ops: vec![
                LogOp::Put {
                    key: b"a".to_vec(),
                    value: Vec::new(),
                    revision: Revision::new(4),
                },
                LogOp::Delete {
                    key: b"b".to_vec(),
                    revision: Revision::new(5),
                },
            ],
        }
    }

    #[test]
    fn commit_payload_decodes() {
        let record = sample_commit();
        let payload = record.encode_payload().unwrap();
        let decoded = LogRecord::decode_payload(LogRecordType::Commit, &payload).unwrap();
        assert_eq!(decoded, record);
        assert_eq!(decoded.txid(), TxnId::new(3));
    }

    #[test]
    fn applied_index_zero_is_distinct_from_none() {
        let none = LogRecord::Commit {
            txid: TxnId::new(1),
            applied: None,
            ops: Vec::new(),
        };
        let payload = none.encode_payload().unwrap();
        let decoded = LogRecord::decode_payload(LogRecordType::Commit, &payload).unwrap();
        assert!(matches!(decoded, LogRecord::Commit { applied: None, .. }));
    }

    #[test]
    fn envelope_layout() {
        let data = LogRecord::Clear { txid: TxnId::new(9) }.encode().unwrap();
        assert_eq!(&data[0..4], b"MKVL");
        assert_eq!(u16::from_le_bytes([data[4], data[5]]), LOG_VERSION);
        assert_eq!(data[6], LogRecordType::Clear.as_byte());
        assert_eq!(u32::from_le_bytes([data[7], data[8], data[9], data[10]]), 8);
        let header_crc = u32::from_le_bytes([data[11], data[12], data[13], data[14]]);
        assert_eq!(header_crc, crc32fast::hash(&data[..HEADER_BODY_SIZE]));
        assert_eq!(data.len(), HEADER_SIZE + 8 + CRC_SIZE);
        let crc = u32::from_le_bytes([data[23], data[24], data[25], data[26]]);
        assert_eq!(crc, crc32fast::hash(&data[..23]));
    }

    #[test]
    fn short_payload_is_corruption() {
        let payload = sample_commit().encode_payload().unwrap();
        let result =
            LogRecord::decode_payload(LogRecordType::Commit, &payload[..payload.len() - 1]);
        assert!(matches!(result, Err(CoreError::LogCorruption { .. })));
    }

    #[test]
    fn trailing_bytes_are_corruption() {
        let mut payload = LogRecord::Clear { txid: TxnId::new(1) }
            .encode_payload()
            .unwrap();
        payload.push(0);
        let result = LogRecord::decode_payload(LogRecordType::Clear, &payload);
        assert!(matches!(result, Err(CoreError::LogCorruption { .. })));
    }

    #[test]
    fn unknown_op_tag_is_corruption() {
        let mut payload = sample_commit().encode_payload().unwrap();
        // txid (8) + flag (1) + index (8) + count (4) puts the first tag at 21
        payload[21] = 7;
        let result = LogRecord::decode_payload(LogRecordType::Commit, &payload);
        assert!(matches!(result, Err(CoreError::LogCorruption { .. })));
    }

    #[test]
    fn record_type_bytes() {
        for t in [LogRecordType::Commit, LogRecordType::Clear] {
            assert_eq!(LogRecordType::from_byte(t.as_byte()), Some(t));
        }
        assert_eq!(LogRecordType::from_byte(0), None);
        assert_eq!(LogRecordType::from_byte(3), None);
    }
}
