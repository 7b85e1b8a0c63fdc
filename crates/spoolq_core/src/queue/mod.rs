//! The queue: producer and consumer cursors, retention, introspection.

mod reader;
mod writer;

use crate::config::{Config, DEFAULT_SEGMENT_CAPACITY};
use crate::error::{CursorKind, QueueError, QueueResult};
use crate::record::{Record, RecordId};
use crate::segment;
use crate::stats::QueueStats;
use parking_lot::Mutex;
use reader::ReadCursor;
use std::fs;
use std::path::{Path, PathBuf};
use tracing::{debug, info, warn};
use writer::WriteCursor;

/// A segmented, disk-backed append-only record queue.
///
/// Records are stored in fixed-capacity segment files under one directory.
/// Producers append with [`enqueue`](Self::enqueue), consumers read in
/// order with [`dequeue`](Self::dequeue) and can resume from an externally
/// persisted [`RecordId`] via [`seek`](Self::seek) or
/// [`Config::start`](crate::Config). [`clean`](Self::clean) bounds disk
/// usage by deleting the oldest segments.
///
/// # Concurrency
///
/// Each cursor sits behind its own lock: calls against the same cursor
/// serialize, while one producer and one consumer can operate at the same
/// time. `clean`, `stats`, and `close` take both cursors.
///
/// # Durability
///
/// No explicit flush or sync is performed; durability is whatever the
/// filesystem provides for a completed write. Unsynced writes may be lost
/// on a crash.
pub struct DiskQueue {
    /// Queue name, the final component of the directory path.
    name: String,
    /// Directory holding the segment files.
    dir: PathBuf,
    /// Target segment capacity in bytes (soft limit, see `Config`).
    segment_capacity: u64,

    writer: Mutex<WriteCursor>,
    reader: Mutex<ReadCursor>,
}

impl DiskQueue {
    /// Opens a queue over the configured directory, creating it if needed,
    /// and pins the read cursor to the configured start position.
    ///
    /// A start position pointing at a segment that does not exist yet is
    /// tolerated; the first dequeue will retry opening it.
    ///
    /// # Errors
    ///
    /// Returns an error if the directory cannot be created or the start
    /// segment exists but cannot be opened.
    pub fn open(config: Config) -> QueueResult<Self> {
        fs::create_dir_all(&config.dir)?;

        let name = config
            .dir
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_default();
        let segment_capacity = if config.segment_capacity == 0 {
            DEFAULT_SEGMENT_CAPACITY
        } else {
            config.segment_capacity
        };

        let queue = Self {
            name,
            dir: config.dir,
            segment_capacity,
            writer: Mutex::new(WriteCursor::Unpositioned),
            reader: Mutex::new(ReadCursor::Unpositioned),
        };

        info!(
            name = %queue.name,
            capacity = queue.segment_capacity,
            "opening queue"
        );
        queue.reader.lock().seek(&queue.dir, config.start)?;

        Ok(queue)
    }

    /// Appends one record to the queue.
    ///
    /// Rotation to a new segment happens before the write when the size
    /// recorded after the *previous* write reached the capacity, so a
    /// segment may overshoot the capacity by one trailing record.
    ///
    /// Not safe for concurrent invocation with itself; concurrent calls
    /// serialize on the write cursor.
    ///
    /// # Errors
    ///
    /// Any I/O error while listing, opening, stating, or writing segments
    /// is propagated unchanged. [`QueueError::RecordTooLarge`] if the
    /// payload does not fit the 4-byte length prefix.
    pub fn enqueue(&self, payload: &[u8]) -> QueueResult<()> {
        let mut writer = self.writer.lock();
        writer.prepare(&self.dir, self.segment_capacity)?;
        writer.append(payload)
    }

    /// Reads the next record in delivery order.
    ///
    /// Returns an empty [`Record`] (no error) when the queue has never been
    /// written. Returns [`QueueError::EndOfSegment`] when the current
    /// segment is exhausted; if a newer segment already exists the cursor
    /// has advanced to it and the next call reads from there, otherwise the
    /// caller should try again later. Returns
    /// [`QueueError::SegmentMissing`] when the cursor points at a segment
    /// that is not on disk.
    ///
    /// # Errors
    ///
    /// See above; additionally [`QueueError::TruncatedRecord`] for damaged
    /// segments and `Io` for any other filesystem failure.
    pub fn dequeue(&self) -> QueueResult<Record> {
        self.reader
            .lock()
            .next_record(&self.dir, self.segment_capacity)
    }

    /// Repositions the read cursor to the given record address.
    ///
    /// Seeking to [`RecordId::START`] rewinds to the beginning of the
    /// queue. A target segment that does not exist yet is tolerated: the
    /// position represents "caught up to data not yet written" and the
    /// next dequeue retries opening it.
    ///
    /// # Errors
    ///
    /// Returns an error only when the target segment exists but cannot be
    /// opened.
    pub fn seek(&self, id: RecordId) -> QueueResult<()> {
        self.reader.lock().seek(&self.dir, id)
    }

    /// Deletes the oldest segments until at most `retain_max` remain.
    ///
    /// Returns the number of segments deleted. A candidate segment held
    /// open by a cursor stops the sweep with
    /// [`QueueError::SegmentInUse`] unless `force` is set, which closes the
    /// handle first. After a forced sweep with `retain_max == 0` both
    /// cursors reset, so the next enqueue starts fresh at segment 1 and the
    /// next dequeue rediscovers the first segment.
    ///
    /// Takes both cursors; must not race enqueue or dequeue semantics-wise,
    /// which the locks enforce.
    ///
    /// # Errors
    ///
    /// [`QueueError::SegmentInUse`] on an unforced conflict (carrying the
    /// partial count); any filesystem error propagated unchanged.
    pub fn clean(&self, retain_max: usize, force: bool) -> QueueResult<usize> {
        let mut reader = self.reader.lock();
        let mut writer = self.writer.lock();

        let segments = segment::list_segment_ids(&self.dir)?;
        if segments.len() <= retain_max {
            debug!(
                segments = segments.len(),
                retain_max, "segment count within retention, nothing to clean"
            );
            return Ok(0);
        }

        let candidates = &segments[..segments.len() - retain_max];
        let mut deleted = 0;
        for &id in candidates {
            if reader.has_open_handle_on(id) {
                if !force {
                    return Err(QueueError::SegmentInUse {
                        segment_id: id,
                        cursor: CursorKind::Read,
                        deleted,
                    });
                }
                reader.revoke_handle();
                warn!(segment = id, "force closed read segment");
            }

            if writer.has_open_handle_on(id) {
                if !force {
                    return Err(QueueError::SegmentInUse {
                        segment_id: id,
                        cursor: CursorKind::Write,
                        deleted,
                    });
                }
                writer.revoke_handle();
                warn!(segment = id, "force closed write segment");
            }

            fs::remove_file(segment::segment_path(&self.dir, id))?;
            deleted += 1;
        }

        if retain_max == 0 && force {
            // Everything is gone; start fresh at segment 1.
            reader.reset();
            writer.reset();
            debug!("cursors reset after full clean");
        }

        debug!(
            total = segments.len(),
            retain_max, deleted, "clean finished"
        );
        Ok(deleted)
    }

    /// Returns a snapshot of the queue's on-disk and cursor state.
    ///
    /// # Errors
    ///
    /// Returns an error if the directory cannot be listed.
    pub fn stats(&self) -> QueueResult<QueueStats> {
        let reader = self.reader.lock();
        let writer = self.writer.lock();

        let segments = segment::list_segment_ids(&self.dir)?;
        let (first_segment_id, last_segment_id) = match (segments.first(), segments.last()) {
            (Some(&first), Some(&last)) => (first, last),
            _ => (0, 0),
        };
        let (read_segment_id, read_offset) = reader.position();

        Ok(QueueStats {
            name: self.name.clone(),
            dir: self.dir.display().to_string(),
            segment_capacity: self.segment_capacity,
            segments: segments.len(),
            first_segment_id,
            last_segment_id,
            read_segment_id,
            read_offset,
            write_segment_id: writer.segment_id(),
            write_segment_size: writer.in_progress_size(),
        })
    }

    /// Releases any open segment handles. Idempotent; cursor positions are
    /// kept, so the queue stays usable and reopens segments lazily.
    pub fn close(&self) {
        let mut reader = self.reader.lock();
        let mut writer = self.writer.lock();

        if writer.close_handle() {
            info!(name = %self.name, "closed write segment");
        }
        if reader.close_handle() {
            info!(name = %self.name, "closed read segment");
        }
    }

    /// Queue name, the final component of the directory path.
    #[must_use]
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Directory holding the segment files.
    #[must_use]
    pub fn dir(&self) -> &Path {
        &self.dir
    }
}

impl std::fmt::Debug for DiskQueue {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("DiskQueue")
            .field("name", &self.name)
            .field("dir", &self.dir)
            .field("segment_capacity", &self.segment_capacity)
            .finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;
    use tempfile::tempdir;

    fn open(dir: &Path, capacity: u64) -> DiskQueue {
        DiskQueue::open(Config::new(dir).segment_capacity(capacity)).unwrap()
    }

    #[test]
    fn open_uses_directory_name_and_default_capacity() {
        let tmp = tempdir().unwrap();
        let dir = tmp.path().join("events");

        let queue = DiskQueue::open(Config::new(&dir).segment_capacity(0)).unwrap();
        assert_eq!(queue.name(), "events");
        assert!(dir.is_dir());

        let stats = queue.stats().unwrap();
        assert_eq!(stats.segment_capacity, DEFAULT_SEGMENT_CAPACITY);
        assert_eq!(stats.segments, 0);
    }

    #[test]
    fn enqueue_writes_length_prefixed_record() {
        let tmp = tempdir().unwrap();
        let queue = open(tmp.path(), 10);

        queue.enqueue(b"Hello").unwrap();
        queue.close();

        let data = fs::read(tmp.path().join("1.log")).unwrap();
        assert_eq!(data.len(), 9);
        assert_eq!(&data[..4], &5u32.to_be_bytes());
        assert_eq!(&data[4..], b"Hello");
    }

    #[test]
    fn enqueue_appends_to_existing_segment_across_reopen() {
        let tmp = tempdir().unwrap();
        {
            let queue = open(tmp.path(), 100);
            queue.enqueue(b"Hello").unwrap();
        }

        let queue = open(tmp.path(), 100);
        queue.enqueue(b"World").unwrap();

        let data = fs::read(tmp.path().join("1.log")).unwrap();
        assert_eq!(data.len(), 18);
        assert_eq!(&data[9..13], &5u32.to_be_bytes());
        assert_eq!(&data[13..], b"World");
    }

    #[test]
    fn rotation_is_deferred_until_the_write_after_overflow() {
        let tmp = tempdir().unwrap();
        let queue = open(tmp.path(), 10);

        // 6 + 7 = 13 encoded bytes, both land in segment 1: the capacity
        // check looks at the size before each write.
        queue.enqueue(b"Hi").unwrap();
        queue.enqueue(b"Hey").unwrap();
        assert_eq!(fs::read(tmp.path().join("1.log")).unwrap().len(), 13);
        assert!(!tmp.path().join("2.log").exists());

        // The overflow is handled on the next call, before its write.
        queue.enqueue(b"Yo").unwrap();
        assert_eq!(fs::read(tmp.path().join("1.log")).unwrap().len(), 13);
        assert_eq!(fs::read(tmp.path().join("2.log")).unwrap().len(), 6);
    }

    #[test]
    fn rotation_starts_new_segment_on_reopen_when_last_is_full() {
        let tmp = tempdir().unwrap();
        {
            let queue = open(tmp.path(), 10);
            queue.enqueue(b"Loreum\r\nIpsium").unwrap();
        }

        // Segment 1 is already over capacity, so a fresh instance rotates
        // before its first write.
        let queue = open(tmp.path(), 10);
        queue.enqueue(b"Aruba").unwrap();

        assert_eq!(fs::read(tmp.path().join("1.log")).unwrap().len(), 18);
        let data = fs::read(tmp.path().join("2.log")).unwrap();
        assert_eq!(&data[..4], &5u32.to_be_bytes());
        assert_eq!(&data[4..], b"Aruba");
    }

    #[test]
    fn dequeue_returns_records_in_order_with_addresses() {
        let tmp = tempdir().unwrap();
        let queue = open(tmp.path(), 5);

        let payloads: [&[u8]; 3] = [b"Hello", b"World", b"Loreum"];
        for payload in payloads {
            queue.enqueue(payload).unwrap();
        }

        // Capacity 5 forces one record per segment, so each read also
        // exercises the eager end-of-segment advance.
        let expected = [
            (RecordId::new(1, 0), RecordId::new(2, 0)),
            (RecordId::new(2, 0), RecordId::new(3, 0)),
            (RecordId::new(3, 0), RecordId::new(4, 0)),
        ];
        for (payload, (id, next_id)) in payloads.iter().zip(expected) {
            let rec = queue.dequeue().unwrap();
            assert_eq!(rec.data, *payload);
            assert_eq!(rec.id, id);
            assert_eq!(rec.next_id, next_id);
        }
    }

    #[test]
    fn dequeue_on_fresh_queue_returns_empty_record() {
        let tmp = tempdir().unwrap();
        let queue = open(tmp.path(), 10);

        let rec = queue.dequeue().unwrap();
        assert!(rec.is_empty());
        assert_eq!(rec.id, RecordId::START);

        // Still empty on repeat calls.
        assert!(queue.dequeue().unwrap().is_empty());
    }

    #[test]
    fn dequeue_resumes_from_saved_position() {
        let tmp = tempdir().unwrap();
        let payloads: [&[u8]; 6] = [b"alpha", b"bravo", b"charl", b"delta", b"echos", b"foxtr"];
        {
            let queue = open(tmp.path(), 10);
            for payload in payloads {
                queue.enqueue(payload).unwrap();
            }
        }
        // Two records per segment, three segments.
        assert!(tmp.path().join("3.log").exists());

        let saved = {
            let queue = open(tmp.path(), 10);
            queue.dequeue().unwrap();
            queue.dequeue().unwrap();
            let third = queue.dequeue().unwrap();
            assert_eq!(third.data, b"charl");
            third.next_id
        };

        // A new instance resumes exactly after the persisted position.
        let queue = DiskQueue::open(
            Config::new(tmp.path())
                .segment_capacity(10)
                .start(saved),
        )
        .unwrap();
        let rec = queue.dequeue().unwrap();
        assert_eq!(rec.data, b"delta");
        assert_eq!(rec.id, saved);
    }

    #[test]
    fn seek_redelivers_consumed_record() {
        let tmp = tempdir().unwrap();
        let queue = open(tmp.path(), 5);
        queue.enqueue(b"Hello").unwrap();
        queue.enqueue(b"World").unwrap();

        let start = RecordId::new(2, 0);
        queue.seek(start).unwrap();
        let first = queue.dequeue().unwrap();
        assert_eq!(first.data, b"World");

        queue.seek(start).unwrap();
        let again = queue.dequeue().unwrap();
        assert_eq!(again, first);
    }

    #[test]
    fn seek_to_start_rewinds_to_first_segment() {
        let tmp = tempdir().unwrap();
        let queue = open(tmp.path(), 5);
        queue.enqueue(b"Hello").unwrap();
        queue.enqueue(b"World").unwrap();

        queue.dequeue().unwrap();
        queue.dequeue().unwrap();

        queue.seek(RecordId::START).unwrap();
        assert_eq!(queue.dequeue().unwrap().data, b"Hello");
    }

    #[test]
    fn dequeue_at_missing_segment_is_an_error() {
        let tmp = tempdir().unwrap();
        {
            let queue = open(tmp.path(), 5);
            for payload in [b"Hello".as_slice(), b"World", b"Loreum"] {
                queue.enqueue(payload).unwrap();
            }
        }

        // Seeking past the last segment is tolerated at open time, but a
        // direct read of the missing segment surfaces the error.
        let queue = DiskQueue::open(
            Config::new(tmp.path())
                .segment_capacity(5)
                .start(RecordId::new(4, 10)),
        )
        .unwrap();
        match queue.dequeue() {
            Err(QueueError::SegmentMissing { segment_id }) => assert_eq!(segment_id, 4),
            other => panic!("expected SegmentMissing, got {other:?}"),
        }
    }

    #[test]
    fn end_of_segment_at_tail_keeps_cursor_until_writer_catches_up() {
        let tmp = tempdir().unwrap();
        let queue = open(tmp.path(), 100);
        queue.enqueue(b"Hello").unwrap();

        assert_eq!(queue.dequeue().unwrap().data, b"Hello");

        // Drained: no newer segment exists, so the cursor stays put.
        match queue.dequeue() {
            Err(QueueError::EndOfSegment { segment_id }) => assert_eq!(segment_id, 1),
            other => panic!("expected EndOfSegment, got {other:?}"),
        }

        // A later write to the same segment becomes readable in place.
        queue.enqueue(b"World").unwrap();
        let rec = queue.dequeue().unwrap();
        assert_eq!(rec.data, b"World");
        assert_eq!(rec.id, RecordId::new(1, 9));
    }

    #[test]
    fn end_of_segment_advances_cursor_when_newer_segment_exists() {
        let tmp = tempdir().unwrap();
        {
            let queue = open(tmp.path(), 10);
            queue.enqueue(b"Hi").unwrap();
            queue.enqueue(b"Hey").unwrap();
            queue.enqueue(b"Yo").unwrap();
        }

        // Read under a larger capacity than the segments were written
        // with: the eager advance no longer fires at the old boundary, so
        // the reader runs into the end of segment 1 while segment 2
        // already exists.
        let queue = open(tmp.path(), 20);
        assert_eq!(queue.dequeue().unwrap().data, b"Hi");
        assert_eq!(queue.dequeue().unwrap().data, b"Hey");

        // The boundary call reports end-of-data but advances internally.
        match queue.dequeue() {
            Err(QueueError::EndOfSegment { segment_id }) => assert_eq!(segment_id, 1),
            other => panic!("expected EndOfSegment, got {other:?}"),
        }

        // The very next call reads the first record of the new segment.
        let rec = queue.dequeue().unwrap();
        assert_eq!(rec.data, b"Yo");
        assert_eq!(rec.id, RecordId::new(2, 0));
    }

    #[test]
    fn seek_to_future_segment_waits_for_the_writer() {
        let tmp = tempdir().unwrap();

        // Pin the reader to a position that does not exist yet.
        let queue = DiskQueue::open(
            Config::new(tmp.path())
                .segment_capacity(18)
                .start(RecordId::new(2, 9)),
        )
        .unwrap();

        for _ in 0..3 {
            queue.enqueue(b"Trail").unwrap();
        }
        // Segment 2 exists but ends exactly at the pinned offset.
        assert!(queue.dequeue().unwrap_err().is_end_of_segment());

        queue.enqueue(b"Trail").unwrap();
        let rec = queue.dequeue().unwrap();
        assert_eq!(rec.data, b"Trail");
        assert_eq!(rec.id, RecordId::new(2, 9));
        assert_eq!(rec.next_id, RecordId::new(3, 0));
    }

    #[test]
    fn clean_retains_most_recent_segments() {
        let tmp = tempdir().unwrap();
        let queue = open(tmp.path(), 5);
        for payload in [b"Hello".as_slice(), b"World", b"Loreum"] {
            queue.enqueue(payload).unwrap();
        }

        // All three retained: no-op.
        assert_eq!(queue.clean(3, false).unwrap(), 0);

        // Only the oldest goes.
        assert_eq!(queue.clean(2, false).unwrap(), 1);
        assert!(!tmp.path().join("1.log").exists());
        assert!(tmp.path().join("2.log").exists());

        // Unforced full clean deletes segment 2, then stops at the open
        // write segment and reports the partial count.
        match queue.clean(0, false) {
            Err(QueueError::SegmentInUse {
                segment_id,
                cursor,
                deleted,
            }) => {
                assert_eq!(segment_id, 3);
                assert_eq!(cursor, CursorKind::Write);
                assert_eq!(deleted, 1);
            }
            other => panic!("expected SegmentInUse, got {other:?}"),
        }
        assert!(!tmp.path().join("2.log").exists());
        assert!(tmp.path().join("3.log").exists());

        // Forced, it closes the handle and finishes.
        assert_eq!(queue.clean(0, true).unwrap(), 1);
        assert!(!tmp.path().join("3.log").exists());
    }

    #[test]
    fn clean_stops_at_open_read_segment() {
        let tmp = tempdir().unwrap();
        let queue = open(tmp.path(), 100);
        queue.enqueue(b"Hello").unwrap();
        queue.dequeue().unwrap();

        match queue.clean(0, false) {
            Err(QueueError::SegmentInUse {
                segment_id,
                cursor,
                deleted,
            }) => {
                assert_eq!(segment_id, 1);
                assert_eq!(cursor, CursorKind::Read);
                assert_eq!(deleted, 0);
            }
            other => panic!("expected SegmentInUse, got {other:?}"),
        }
        assert!(tmp.path().join("1.log").exists());
    }

    #[test]
    fn forced_full_clean_resets_the_queue() {
        let tmp = tempdir().unwrap();
        let queue = open(tmp.path(), 5);
        let payloads: [&[u8]; 3] = [b"Hello", b"World", b"Loreum"];
        for payload in payloads {
            queue.enqueue(payload).unwrap();
        }
        queue.dequeue().unwrap();

        queue.clean(0, true).unwrap();
        assert_eq!(segment::list_segment_ids(tmp.path()).unwrap(), Vec::<u64>::new());

        // Both cursors start fresh: enqueue recreates segment 1 and
        // dequeue rediscovers it.
        for payload in payloads {
            queue.enqueue(payload).unwrap();
        }
        assert!(tmp.path().join("1.log").exists());
        for payload in payloads {
            assert_eq!(queue.dequeue().unwrap().data, payload);
        }
    }

    #[test]
    fn stats_reflect_directory_and_cursors() {
        let tmp = tempdir().unwrap();
        let dir = tmp.path().join("events");
        let queue = DiskQueue::open(Config::new(&dir).segment_capacity(5)).unwrap();
        for payload in [b"Hello".as_slice(), b"World", b"Loreum"] {
            queue.enqueue(payload).unwrap();
        }

        let stats = queue.stats().unwrap();
        assert_eq!(stats.name, "events");
        assert_eq!(stats.segment_capacity, 5);
        assert_eq!(stats.segments, 3);
        assert_eq!(stats.first_segment_id, 1);
        assert_eq!(stats.last_segment_id, 3);
        assert_eq!(stats.read_segment_id, 0);
        assert_eq!(stats.read_offset, 0);
        assert_eq!(stats.write_segment_id, 3);
        assert_eq!(stats.write_segment_size, 10);

        // Reading moves only the read-side numbers.
        queue.dequeue().unwrap();
        let stats = queue.stats().unwrap();
        assert_eq!(stats.read_segment_id, 2);
        assert_eq!(stats.read_offset, 0);
        assert_eq!(stats.write_segment_id, 3);
    }

    #[test]
    fn close_is_idempotent_and_queue_stays_usable() {
        let tmp = tempdir().unwrap();
        let queue = open(tmp.path(), 100);
        queue.enqueue(b"Hello").unwrap();
        queue.dequeue().unwrap();

        queue.close();
        queue.close();

        // Handles reopen lazily; the write continues at the recorded size.
        queue.enqueue(b"World").unwrap();
        assert_eq!(fs::read(tmp.path().join("1.log")).unwrap().len(), 18);
        assert_eq!(queue.dequeue().unwrap().data, b"World");
    }

    proptest! {
        #![proptest_config(ProptestConfig::with_cases(64))]

        #[test]
        fn dequeue_preserves_enqueue_order(
            payloads in prop::collection::vec(prop::collection::vec(any::<u8>(), 1..64), 1..40),
        ) {
            let tmp = tempdir().unwrap();
            let queue = open(tmp.path(), 128);
            for payload in &payloads {
                queue.enqueue(payload).unwrap();
            }

            let mut boundary_hits = 0usize;
            let mut last_id = None;
            let mut got = Vec::new();
            while got.len() < payloads.len() {
                match queue.dequeue() {
                    Ok(rec) => {
                        if let Some(prev) = last_id {
                            prop_assert!(rec.id > prev, "record ids must increase");
                        }
                        last_id = Some(rec.id);
                        got.push(rec.data);
                    }
                    Err(err) if err.is_end_of_segment() => {
                        boundary_hits += 1;
                        prop_assert!(
                            boundary_hits <= payloads.len() + 1,
                            "dequeue made no progress"
                        );
                    }
                    Err(err) => prop_assert!(false, "unexpected error: {err}"),
                }
            }
            prop_assert_eq!(got, payloads);
        }
    }
}
