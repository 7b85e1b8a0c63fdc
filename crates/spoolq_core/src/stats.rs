//! Queue statistics snapshot.

use serde::Serialize;

/// Point-in-time view of a queue's on-disk and cursor state.
///
/// Produced by `DiskQueue::stats` without mutating anything. Serializable
/// so operators can export it as JSON.
#[derive(Debug, Clone, Serialize)]
pub struct QueueStats {
    /// Queue name, the final component of the directory path.
    pub name: String,
    /// Queue directory.
    pub dir: String,
    /// Configured segment capacity in bytes.
    pub segment_capacity: u64,

    /// Number of segment files on disk.
    pub segments: usize,
    /// Oldest segment ID, 0 when the directory is empty.
    pub first_segment_id: u64,
    /// Newest segment ID, 0 when the directory is empty.
    pub last_segment_id: u64,

    /// Read cursor segment, 0 when not yet positioned.
    pub read_segment_id: u64,
    /// Next byte offset the read cursor will read from.
    pub read_offset: u64,

    /// Write cursor segment, 0 when not yet positioned.
    pub write_segment_id: u64,
    /// Bytes recorded in the current write segment so far.
    pub write_segment_size: u64,
}
