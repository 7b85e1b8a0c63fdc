//! Write path: segment rotation and record append.

use crate::error::{QueueError, QueueResult};
use crate::record::RECORD_HEADER_SIZE;
use crate::segment;
use std::fs::{File, OpenOptions};
use std::io::{self, Write};
use std::path::Path;
use tracing::debug;

/// Producer-side cursor over the segment directory.
///
/// `size` is the in-progress size of the open segment as recorded after the
/// previous successful write. [`prepare`](WriteCursor::prepare) checks it
/// against the capacity *before* the next write, so a segment may overshoot
/// the capacity by exactly one trailing record; the overflow triggers
/// rotation on the following call. This deferred rotation is part of the
/// queue's contract.
#[derive(Debug)]
pub(crate) enum WriteCursor {
    /// No write segment chosen yet; the next enqueue inspects the
    /// directory.
    Unpositioned,
    /// Appending to `segment_id`. `file` is `None` when the handle was
    /// released (close, or a forced clean) and reopens lazily.
    Positioned {
        /// Segment being appended to.
        segment_id: u64,
        /// Size recorded after the previous successful write.
        size: u64,
        /// Open append handle, if any.
        file: Option<File>,
    },
}

impl WriteCursor {
    /// Ensures an append handle is open on the right segment, rotating to a
    /// new segment when the recorded size has reached the capacity.
    pub(crate) fn prepare(&mut self, dir: &Path, capacity: u64) -> QueueResult<()> {
        match self {
            WriteCursor::Unpositioned => {
                let (_, last) = segment::edge_segment_ids(dir)?;
                if last == 0 {
                    // Empty directory: the queue starts at segment 1.
                    *self = Self::open_segment(dir, 1, 0)?;
                    return Ok(());
                }

                let size = std::fs::metadata(segment::segment_path(dir, last))?.len();
                if size >= capacity {
                    *self = Self::open_segment(dir, last + 1, 0)?;
                } else {
                    *self = Self::open_segment(dir, last, size)?;
                }
                Ok(())
            }
            WriteCursor::Positioned {
                segment_id,
                size,
                file,
            } => {
                if *size >= capacity {
                    let next = *segment_id + 1;
                    debug!(from = *segment_id, to = next, "rotating write segment");
                    *self = Self::open_segment(dir, next, 0)?;
                    return Ok(());
                }

                if file.is_none() {
                    *file = Some(Self::open_file(dir, *segment_id)?);
                }
                Ok(())
            }
        }
    }

    /// Appends one length-prefixed record to the prepared segment.
    ///
    /// The in-progress size is bumped only after the whole encoded record
    /// was written.
    pub(crate) fn append(&mut self, payload: &[u8]) -> QueueResult<()> {
        let len = u32::try_from(payload.len()).map_err(|_| QueueError::RecordTooLarge {
            size: payload.len(),
        })?;

        match self {
            WriteCursor::Positioned {
                size,
                file: Some(file),
                ..
            } => {
                let mut buf = Vec::with_capacity(RECORD_HEADER_SIZE as usize + payload.len());
                buf.extend_from_slice(&len.to_be_bytes());
                buf.extend_from_slice(payload);
                file.write_all(&buf)?;

                *size += buf.len() as u64;
                Ok(())
            }
            _ => Err(QueueError::Io(io::Error::new(
                io::ErrorKind::Other,
                "write segment is not open",
            ))),
        }
    }

    /// Segment the cursor is positioned at, 0 when unpositioned.
    pub(crate) fn segment_id(&self) -> u64 {
        match self {
            WriteCursor::Unpositioned => 0,
            WriteCursor::Positioned { segment_id, .. } => *segment_id,
        }
    }

    /// Size recorded for the current segment, 0 when unpositioned.
    pub(crate) fn in_progress_size(&self) -> u64 {
        match self {
            WriteCursor::Unpositioned => 0,
            WriteCursor::Positioned { size, .. } => *size,
        }
    }

    /// Whether this cursor holds an open handle on the given segment.
    pub(crate) fn has_open_handle_on(&self, id: u64) -> bool {
        matches!(
            self,
            WriteCursor::Positioned { segment_id, file: Some(_), .. } if *segment_id == id
        )
    }

    /// Drops the handle and forgets the in-progress size. Used when
    /// retention deletes the segment out from under the cursor.
    pub(crate) fn revoke_handle(&mut self) {
        if let WriteCursor::Positioned { size, file, .. } = self {
            *file = None;
            *size = 0;
        }
    }

    /// Drops the handle but keeps position and size, so a later enqueue
    /// reopens the same segment and continues. Returns whether a handle was
    /// open.
    pub(crate) fn close_handle(&mut self) -> bool {
        if let WriteCursor::Positioned { file, .. } = self {
            return file.take().is_some();
        }
        false
    }

    /// Returns the cursor to its initial unset state; the next enqueue
    /// starts fresh at segment 1.
    pub(crate) fn reset(&mut self) {
        *self = WriteCursor::Unpositioned;
    }

    fn open_segment(dir: &Path, segment_id: u64, size: u64) -> QueueResult<WriteCursor> {
        let file = Self::open_file(dir, segment_id)?;
        Ok(WriteCursor::Positioned {
            segment_id,
            size,
            file: Some(file),
        })
    }

    fn open_file(dir: &Path, segment_id: u64) -> QueueResult<File> {
        let path = segment::segment_path(dir, segment_id);
        let file = OpenOptions::new().append(true).create(true).open(&path)?;
        debug!(path = %path.display(), "opened segment for write");
        Ok(file)
    }
}
