//! Read path: sequential record reads, segment advancement, and seeking.

use crate::error::{QueueError, QueueResult};
use crate::record::{Record, RecordId, RECORD_HEADER_SIZE};
use crate::segment;
use std::fs::{File, OpenOptions};
use std::io::{self, Read, Seek, SeekFrom};
use std::path::Path;
use tracing::{debug, warn};

/// Consumer-side cursor over the segment directory.
///
/// The position (segment, offset) can outlive the file handle: seeking to a
/// segment that has not been written yet leaves `file` unset, and the next
/// dequeue retries opening it.
#[derive(Debug)]
pub(crate) enum ReadCursor {
    /// Never positioned; the next dequeue discovers the first available
    /// segment.
    Unpositioned,
    /// Reading `segment_id` at `offset`. `file` is `None` until the segment
    /// is opened (or after it was closed by an advance, a close, or a
    /// forced clean).
    Positioned {
        /// Segment being read.
        segment_id: u64,
        /// Next byte offset to read from.
        offset: u64,
        /// Open read handle, if any.
        file: Option<File>,
    },
}

impl ReadCursor {
    /// Reads the next record, lazily positioning and opening the cursor.
    ///
    /// Returns the empty record when the queue has never been written.
    /// Returns [`QueueError::EndOfSegment`] at the tail of the current
    /// segment; when a newer segment already exists the cursor is advanced
    /// internally first, so the following call reads from it.
    pub(crate) fn next_record(&mut self, dir: &Path, capacity: u64) -> QueueResult<Record> {
        if matches!(self, ReadCursor::Unpositioned) {
            let (first, _) = segment::edge_segment_ids(dir)?;
            if first == 0 {
                // Nothing has been enqueued yet. Distinct from running out
                // of records at the tail, which is an EndOfSegment error.
                return Ok(Record::default());
            }
            *self = ReadCursor::Positioned {
                segment_id: first,
                offset: 0,
                file: None,
            };
        }

        let ReadCursor::Positioned {
            segment_id,
            offset,
            file,
        } = self
        else {
            // Unpositioned was resolved above; nothing to read.
            return Ok(Record::default());
        };

        let handle = match file {
            Some(handle) => handle,
            None => {
                let opened = match open_at(dir, *segment_id, *offset) {
                    Ok(opened) => opened,
                    Err(err) if err.kind() == io::ErrorKind::NotFound => {
                        warn!(segment = *segment_id, "read segment does not exist");
                        return Err(QueueError::SegmentMissing {
                            segment_id: *segment_id,
                        });
                    }
                    Err(err) => return Err(err.into()),
                };
                file.insert(opened)
            }
        };

        // Length prefix. Zero bytes available at the boundary is the benign
        // end-of-data signal; a partial prefix is damage.
        let mut prefix = [0u8; RECORD_HEADER_SIZE as usize];
        let filled = read_available(handle, &mut prefix)?;
        if filled == 0 {
            let exhausted = *segment_id;
            let (_, last) = segment::edge_segment_ids(dir)?;
            if last > exhausted {
                // A newer segment exists: move the cursor there for the
                // next call. This call still reports the boundary.
                *file = None;
                *offset = 0;
                *segment_id = exhausted + 1;
                debug!(
                    from = exhausted,
                    to = exhausted + 1,
                    "read cursor advanced to next segment"
                );
            }
            return Err(QueueError::EndOfSegment {
                segment_id: exhausted,
            });
        }
        if filled < prefix.len() {
            return Err(QueueError::TruncatedRecord {
                segment_id: *segment_id,
                offset: *offset,
                expected: prefix.len() - filled,
            });
        }

        let len = u32::from_be_bytes(prefix) as usize;
        let mut data = vec![0u8; len];
        if let Err(err) = handle.read_exact(&mut data) {
            if err.kind() == io::ErrorKind::UnexpectedEof {
                return Err(QueueError::TruncatedRecord {
                    segment_id: *segment_id,
                    offset: *offset,
                    expected: len,
                });
            }
            return Err(err.into());
        }

        let id = RecordId::new(*segment_id, *offset);
        *offset += RECORD_HEADER_SIZE + len as u64;

        // Normal end-of-segment transition, taken eagerly. If the
        // configured capacity changed since the segment was written this
        // check misfires and records are skipped or misread.
        if *offset >= capacity {
            *file = None;
            *offset = 0;
            *segment_id += 1;
            debug!(segment = *segment_id, "read cursor moved to next segment");
        }

        Ok(Record {
            id,
            data,
            next_id: RecordId::new(*segment_id, *offset),
        })
    }

    /// Unconditionally repositions the cursor.
    ///
    /// Seeking to segment 0 returns the cursor to its unset state, so the
    /// next dequeue rediscovers the first available segment. A target
    /// segment that does not exist on disk yet is tolerated: the position
    /// sticks and the next dequeue retries opening it.
    pub(crate) fn seek(&mut self, dir: &Path, id: RecordId) -> QueueResult<()> {
        if id.segment_id == 0 {
            *self = ReadCursor::Unpositioned;
            return Ok(());
        }

        // The position sticks regardless of whether the segment opens.
        let mut file = None;
        let result = match open_at(dir, id.segment_id, id.offset) {
            Ok(opened) => {
                debug!(
                    segment = id.segment_id,
                    offset = id.offset,
                    "seeked read cursor"
                );
                file = Some(opened);
                Ok(())
            }
            Err(err) if err.kind() == io::ErrorKind::NotFound => {
                warn!(
                    segment = id.segment_id,
                    "read segment does not exist yet, seek position kept"
                );
                Ok(())
            }
            Err(err) => Err(err.into()),
        };

        *self = ReadCursor::Positioned {
            segment_id: id.segment_id,
            offset: id.offset,
            file,
        };
        result
    }

    /// Cursor position as `(segment_id, offset)`, `(0, 0)` when unset.
    pub(crate) fn position(&self) -> (u64, u64) {
        match self {
            ReadCursor::Unpositioned => (0, 0),
            ReadCursor::Positioned {
                segment_id, offset, ..
            } => (*segment_id, *offset),
        }
    }

    /// Whether this cursor holds an open handle on the given segment.
    pub(crate) fn has_open_handle_on(&self, id: u64) -> bool {
        matches!(
            self,
            ReadCursor::Positioned { segment_id, file: Some(_), .. } if *segment_id == id
        )
    }

    /// Drops the handle, keeping the position. Used when retention deletes
    /// the segment out from under the cursor.
    pub(crate) fn revoke_handle(&mut self) {
        if let ReadCursor::Positioned { file, .. } = self {
            *file = None;
        }
    }

    /// Drops the handle but keeps the position. Returns whether a handle
    /// was open.
    pub(crate) fn close_handle(&mut self) -> bool {
        if let ReadCursor::Positioned { file, .. } = self {
            return file.take().is_some();
        }
        false
    }

    /// Returns the cursor to its initial unset state.
    pub(crate) fn reset(&mut self) {
        *self = ReadCursor::Unpositioned;
    }
}

/// Opens a segment for reading and seeks to the given offset.
fn open_at(dir: &Path, segment_id: u64, offset: u64) -> io::Result<File> {
    let path = segment::segment_path(dir, segment_id);
    let mut file = OpenOptions::new().read(true).open(path)?;
    file.seek(SeekFrom::Start(offset))?;
    Ok(file)
}

/// Fills `buf` with as many bytes as the file still has, returning how many
/// were read. Unlike `read_exact` this distinguishes a clean end of file
/// (0 bytes) from a short tail.
fn read_available(file: &mut File, buf: &mut [u8]) -> io::Result<usize> {
    let mut filled = 0;
    while filled < buf.len() {
        match file.read(&mut buf[filled..]) {
            Ok(0) => break,
            Ok(n) => filled += n,
            Err(err) if err.kind() == io::ErrorKind::Interrupted => continue,
            Err(err) => return Err(err),
        }
    }
    Ok(filled)
}
