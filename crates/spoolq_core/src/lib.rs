//! # spoolq core
//!
//! A segmented, disk-backed append-only record queue: a durable FIFO log
//! that persists variable-length byte records to fixed-capacity segment
//! files and lets a consumer resume from an externally persisted position.
//!
//! ## On-disk layout
//!
//! ```text
//! <queue dir>/
//! ├─ 1.log        # oldest segment
//! ├─ 2.log
//! └─ 3.log        # newest segment, currently appended to
//! ```
//!
//! Each segment is a sequence of records stored as a 4-byte big-endian
//! length prefix followed by the raw payload bytes. Segment IDs are dense
//! and ascending: new segments only appear at the high end, deletions only
//! happen at the low end, so the set on disk is always contiguous.
//!
//! ## Addressing and resumption
//!
//! Every dequeued [`Record`] carries its own address and the address of the
//! record after it as [`RecordId`]s (`segment:offset` pairs). A consumer
//! that persists `next_id` externally can later resume exactly there via
//! [`Config::start`] or [`DiskQueue::seek`], giving at-least-once delivery
//! without the queue tracking consumers.
//!
//! ## Known limitation
//!
//! The segment capacity is part of the read contract: the consumer's eager
//! end-of-segment advance compares offsets against the *configured*
//! capacity. Changing the capacity for a directory that already holds data
//! written under another value makes that check misfire and can skip
//! records. Reset the directory when changing the capacity.
//!
//! ## Example
//!
//! ```no_run
//! use spoolq_core::{Config, DiskQueue};
//!
//! # fn main() -> Result<(), spoolq_core::QueueError> {
//! let queue = DiskQueue::open(Config::new("/var/lib/myapp/events"))?;
//! queue.enqueue(b"hello")?;
//!
//! // Persist rec.next_id somewhere to resume after a restart.
//! let rec = queue.dequeue()?;
//! println!("read {} bytes at {}", rec.data.len(), rec.id);
//! # Ok(())
//! # }
//! ```

#![deny(unsafe_code)]
#![warn(missing_docs)]

mod config;
mod error;
mod queue;
mod record;
mod segment;
mod stats;

pub use config::{Config, DEFAULT_SEGMENT_CAPACITY};
pub use error::{CursorKind, QueueError, QueueResult};
pub use queue::DiskQueue;
pub use record::{ParseRecordIdError, Record, RecordId};
pub use stats::QueueStats;

/// Version of the spoolq core crate.
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
