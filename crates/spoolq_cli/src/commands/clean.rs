//! Clean command implementation.

use spoolq_core::{Config, DiskQueue};
use std::path::Path;
use tracing::info;

/// Runs the clean command.
pub fn run(dir: &Path, retain: usize, force: bool) -> Result<(), Box<dyn std::error::Error>> {
    if !dir.is_dir() {
        return Err(format!("no queue directory at {}", dir.display()).into());
    }

    info!("cleaning {} down to {} segment(s)", dir.display(), retain);

    let queue = DiskQueue::open(Config::new(dir))?;
    let deleted = queue.clean(retain, force)?;

    if deleted == 0 {
        println!("Nothing to delete");
    } else {
        println!("Deleted {deleted} segment(s)");
    }

    Ok(())
}
