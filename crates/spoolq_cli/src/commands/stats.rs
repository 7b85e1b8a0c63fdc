//! Stats command implementation.

use spoolq_core::{Config, DiskQueue, QueueStats};
use std::path::Path;

/// Runs the stats command.
pub fn run(dir: &Path, format: &str) -> Result<(), Box<dyn std::error::Error>> {
    if !dir.is_dir() {
        return Err(format!("no queue directory at {}", dir.display()).into());
    }

    let queue = DiskQueue::open(Config::new(dir))?;
    let stats = queue.stats()?;

    match format {
        "json" => {
            println!("{}", serde_json::to_string_pretty(&stats)?);
        }
        _ => {
            print_text_output(&stats);
        }
    }

    Ok(())
}

fn print_text_output(stats: &QueueStats) {
    println!("Queue: {}", stats.name);
    println!("Dir:   {}", stats.dir);
    println!();
    println!("Segments:");
    println!("  capacity: {}", format_size(stats.segment_capacity));
    println!("  count:    {}", stats.segments);
    println!("  first:    {}", stats.first_segment_id);
    println!("  last:     {}", stats.last_segment_id);
    println!();
    println!("Cursors:");
    println!(
        "  read:  segment {} offset {}",
        stats.read_segment_id, stats.read_offset
    );
    println!(
        "  write: segment {} size {}",
        stats.write_segment_id,
        format_size(stats.write_segment_size)
    );
}

fn format_size(bytes: u64) -> String {
    if bytes < 1024 {
        format!("{bytes} B")
    } else if bytes < 1024 * 1024 {
        format!("{:.1} KB", bytes as f64 / 1024.0)
    } else if bytes < 1024 * 1024 * 1024 {
        format!("{:.1} MB", bytes as f64 / (1024.0 * 1024.0))
    } else {
        format!("{:.1} GB", bytes as f64 / (1024.0 * 1024.0 * 1024.0))
    }
}
