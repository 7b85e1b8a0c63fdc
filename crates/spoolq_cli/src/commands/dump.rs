//! Dump command implementation.

use serde::Serialize;
use spoolq_core::{Config, DiskQueue, RecordId};
use std::path::Path;

/// Record representation for output.
#[derive(Debug, Serialize)]
pub struct RecordInfo {
    /// Record address, `segment:offset`.
    pub id: String,
    /// Address of the following record.
    pub next_id: String,
    /// Payload size in bytes.
    pub size: usize,
    /// Payload, lossily decoded as UTF-8.
    pub data: String,
}

/// Runs the dump command.
pub fn run(
    dir: &Path,
    from: Option<RecordId>,
    limit: Option<usize>,
    segment_capacity: Option<u64>,
    format: &str,
) -> Result<(), Box<dyn std::error::Error>> {
    if !dir.is_dir() {
        return Err(format!("no queue directory at {}", dir.display()).into());
    }

    let mut config = Config::new(dir);
    if let Some(capacity) = segment_capacity {
        config = config.segment_capacity(capacity);
    }
    if let Some(from) = from {
        config = config.start(from);
    }

    let queue = DiskQueue::open(config)?;
    let records = read_records(&queue, limit)?;

    match format {
        "json" => {
            println!("{}", serde_json::to_string_pretty(&records)?);
        }
        _ => {
            print_text_output(&records);
        }
    }

    Ok(())
}

fn read_records(
    queue: &DiskQueue,
    limit: Option<usize>,
) -> Result<Vec<RecordInfo>, Box<dyn std::error::Error>> {
    let max_records = limit.unwrap_or(usize::MAX);
    let mut records = Vec::new();
    let mut at_boundary = false;

    while records.len() < max_records {
        match queue.dequeue() {
            Ok(rec) => {
                if rec.is_empty() {
                    break;
                }
                at_boundary = false;
                records.push(RecordInfo {
                    id: rec.id.to_string(),
                    next_id: rec.next_id.to_string(),
                    size: rec.data.len(),
                    data: String::from_utf8_lossy(&rec.data).into_owned(),
                });
            }
            Err(err) if err.is_end_of_segment() => {
                // The first boundary may just mean the cursor crossed into
                // a newer segment; a second in a row is the real tail.
                if at_boundary {
                    break;
                }
                at_boundary = true;
            }
            Err(err) => return Err(err.into()),
        }
    }

    Ok(records)
}

fn print_text_output(records: &[RecordInfo]) {
    if records.is_empty() {
        println!("No records");
        return;
    }

    for rec in records {
        println!("{}  ->  {}  {} bytes", rec.id, rec.next_id, rec.size);
        println!("    {}", rec.data);
    }
    println!();
    println!("{} record(s)", records.len());
}
