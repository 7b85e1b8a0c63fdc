//! Queue configuration.

use crate::record::RecordId;
use std::path::PathBuf;

/// Default target capacity of a segment file: 10 MiB.
pub const DEFAULT_SEGMENT_CAPACITY: u64 = 10 * 1024 * 1024;

/// Configuration for opening a queue.
#[derive(Debug, Clone)]
pub struct Config {
    /// Directory holding the segment files. Created if missing.
    pub dir: PathBuf,

    /// Target capacity of a segment file in bytes.
    ///
    /// This is a soft limit: rotation is decided before a write using the
    /// size recorded after the previous write, so a segment may exceed the
    /// capacity by one trailing record. Changing the capacity after records
    /// were written under the old value misaligns the reader's
    /// end-of-segment check and can skip records; reset the queue directory
    /// instead. A value of 0 falls back to the default.
    pub segment_capacity: u64,

    /// Position the read cursor starts from.
    ///
    /// `RecordId::START` reads from the beginning of the queue; a position
    /// saved from an earlier `next_id` resumes after that record.
    pub start: RecordId,
}

impl Config {
    /// Creates a configuration for the given queue directory with default
    /// capacity, reading from the start of the queue.
    #[must_use]
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self {
            dir: dir.into(),
            segment_capacity: DEFAULT_SEGMENT_CAPACITY,
            start: RecordId::START,
        }
    }

    /// Sets the target segment capacity in bytes.
    #[must_use]
    pub fn segment_capacity(mut self, bytes: u64) -> Self {
        self.segment_capacity = bytes;
        self
    }

    /// Sets the record position the first dequeue resumes from.
    #[must_use]
    pub fn start(mut self, id: RecordId) -> Self {
        self.start = id;
        self
    }
}
