//! Segment file naming and directory discovery.
//!
//! A queue directory holds segment files named `1.log`, `2.log`, and so on;
//! the stem is the segment ID. IDs are dense and ascending: segments are only
//! created by incrementing the highest ID and only deleted from the oldest
//! end, so the on-disk set is always a contiguous range. Files not matching
//! the naming convention are ignored.

use crate::error::QueueResult;
use std::fs;
use std::path::{Path, PathBuf};

/// Extension carried by every segment file.
const SEGMENT_EXT: &str = "log";

/// Returns the file name for a segment ID, e.g. `7` becomes `7.log`.
pub(crate) fn segment_file_name(id: u64) -> String {
    format!("{id}.{SEGMENT_EXT}")
}

/// Returns the full path of a segment file inside the queue directory.
pub(crate) fn segment_path(dir: &Path, id: u64) -> PathBuf {
    dir.join(segment_file_name(id))
}

/// Extracts the segment ID from a file name.
///
/// Accepts exactly `<positive integer>.log`; anything else is not a segment
/// file. Sorting must treat the stem as an integer: lexical order puts
/// `10.log` before `2.log`.
pub(crate) fn parse_segment_id(name: &str) -> Option<u64> {
    let stem = name.strip_suffix(SEGMENT_EXT)?.strip_suffix('.')?;
    match stem.parse::<u64>() {
        Ok(0) | Err(_) => None,
        Ok(id) => Some(id),
    }
}

/// Lists the segment IDs present in the directory, ascending.
///
/// Any directory-listing error is fatal to the calling operation and is
/// propagated unchanged.
pub(crate) fn list_segment_ids(dir: &Path) -> QueueResult<Vec<u64>> {
    let mut ids = Vec::new();
    for entry in fs::read_dir(dir)? {
        let entry = entry?;
        let name = entry.file_name();
        let Some(name) = name.to_str() else {
            continue;
        };
        if let Some(id) = parse_segment_id(name) {
            ids.push(id);
        }
    }
    ids.sort_unstable();
    Ok(ids)
}

/// Returns the first and last segment IDs, or `(0, 0)` when no segments
/// exist.
pub(crate) fn edge_segment_ids(dir: &Path) -> QueueResult<(u64, u64)> {
    let ids = list_segment_ids(dir)?;
    match (ids.first(), ids.last()) {
        (Some(&first), Some(&last)) => Ok((first, last)),
        _ => Ok((0, 0)),
    }
}
