//! Error types for queue operations.

use std::io;
use thiserror::Error;

/// Result type for queue operations.
pub type QueueResult<T> = Result<T, QueueError>;

/// Identifies which cursor holds a segment open.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CursorKind {
    /// The consumer-side cursor.
    Read,
    /// The producer-side cursor.
    Write,
}

impl std::fmt::Display for CursorKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            CursorKind::Read => f.write_str("read"),
            CursorKind::Write => f.write_str("write"),
        }
    }
}

/// Errors that can occur during queue operations.
#[derive(Debug, Error)]
pub enum QueueError {
    /// I/O error from the underlying filesystem.
    ///
    /// Listing, creating, opening, stating, or writing a segment failed.
    /// These are fatal to the calling operation and never retried
    /// internally.
    #[error("I/O error: {0}")]
    Io(#[from] io::Error),

    /// The current read segment has no more records.
    ///
    /// This is the end-of-data condition, not damage: the caller is
    /// expected to try again later. When a newer segment already exists the
    /// cursor has been advanced to it internally, so the next dequeue
    /// continues there.
    #[error("end of segment {segment_id}")]
    EndOfSegment {
        /// Segment that was exhausted.
        segment_id: u64,
    },

    /// The segment targeted by a direct read does not exist on disk.
    ///
    /// Only dequeue surfaces this; seeking to a not-yet-written segment is
    /// tolerated silently.
    #[error("segment {segment_id} does not exist")]
    SegmentMissing {
        /// Segment that was not found.
        segment_id: u64,
    },

    /// A record extends past the end of its segment.
    ///
    /// The length prefix was incomplete, or the declared payload length
    /// exceeds the remaining bytes. Hard failure; the cursor position must
    /// not be assumed to have advanced.
    #[error("truncated record in segment {segment_id} at offset {offset}: expected {expected} more bytes")]
    TruncatedRecord {
        /// Segment containing the damaged record.
        segment_id: u64,
        /// Offset of the record start within the segment.
        offset: u64,
        /// Bytes the record still required.
        expected: usize,
    },

    /// Retention refused to delete a segment that is currently open.
    ///
    /// Carries the number of segments deleted before the sweep stopped.
    #[error("{cursor} segment {segment_id} is open, deleted {deleted} segment(s) before stopping")]
    SegmentInUse {
        /// Segment held open by a cursor.
        segment_id: u64,
        /// Cursor holding it.
        cursor: CursorKind,
        /// Segments deleted before the conflict.
        deleted: usize,
    },

    /// A payload does not fit the 4-byte length prefix.
    #[error("record of {size} bytes exceeds the maximum encodable length")]
    RecordTooLarge {
        /// Payload size in bytes.
        size: usize,
    },
}

impl QueueError {
    /// Returns `true` for the end-of-data condition a consumer retries on.
    #[must_use]
    pub fn is_end_of_segment(&self) -> bool {
        matches!(self, Self::EndOfSegment { .. })
    }
}
