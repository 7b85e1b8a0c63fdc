//! Records and their addresses within the queue.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use thiserror::Error;

/// Size of the big-endian length prefix in front of every stored record.
pub(crate) const RECORD_HEADER_SIZE: u64 = 4;

/// Address of a record: the segment it lives in plus the byte offset of its
/// start within that segment.
///
/// Ordering by `(segment_id, offset)` is the queue's delivery order.
/// `RecordId::START` (segment 0, offset 0) is the distinguished
/// start-of-queue sentinel.
#[derive(
    Debug, Clone, Copy, Default, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize,
)]
pub struct RecordId {
    /// Segment the record lives in.
    pub segment_id: u64,
    /// Byte offset of the record start within the segment.
    pub offset: u64,
}

impl RecordId {
    /// Start-of-queue sentinel.
    pub const START: Self = Self {
        segment_id: 0,
        offset: 0,
    };

    /// Creates a record ID from a segment ID and byte offset.
    #[must_use]
    pub const fn new(segment_id: u64, offset: u64) -> Self {
        Self { segment_id, offset }
    }
}

impl fmt::Display for RecordId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}", self.segment_id, self.offset)
    }
}

/// Error returned when parsing a [`RecordId`] from its `segment:offset`
/// string form fails.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("invalid record id `{input}`, expected `segment:offset`")]
pub struct ParseRecordIdError {
    input: String,
}

impl FromStr for RecordId {
    type Err = ParseRecordIdError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let err = || ParseRecordIdError {
            input: s.to_string(),
        };
        let (segment, offset) = s.split_once(':').ok_or_else(err)?;
        Ok(Self {
            segment_id: segment.parse().map_err(|_| err())?,
            offset: offset.parse().map_err(|_| err())?,
        })
    }
}

/// A record returned by dequeue.
///
/// `next_id` is the position immediately after this record, accounting for
/// any segment advancement the read triggered. Consumers persist it
/// externally and hand it back to `seek` (or the constructor) to resume,
/// which gives at-least-once delivery without the queue tracking consumer
/// identity.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Record {
    /// Address of this record.
    pub id: RecordId,
    /// Raw payload bytes.
    pub data: Vec<u8>,
    /// Address of the record that follows this one.
    pub next_id: RecordId,
}

impl Record {
    /// Returns `true` when this is the empty record signalling a queue with
    /// nothing enqueued yet.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.data.is_empty()
    }
}
