// Memory capacity probe from /proc/meminfo

use anyhow::{Context, Result};
use std::fs::File;
use std::io::{BufRead, BufReader};
use std::path::Path;

/// Read total physical memory in bytes. Probed once at startup; a failure
/// degrades the aggregate display to an unknown capacity, never aborts.
pub fn memory_capacity() -> Result<u64> {
    capacity_from_path(Path::new("/proc/meminfo"))
}

fn capacity_from_path(path: &Path) -> Result<u64> {
    let file = File::open(path).with_context(|| format!("Failed to open {}", path.display()))?;
    let reader = BufReader::new(file);

    for line in reader.lines() {
        let line = line?;
        let mut parts = line.split_whitespace();

        if parts.next() != Some("MemTotal:") {
            continue;
        }

        let kb: u64 = parts
            .next()
            .context("MemTotal line missing value")?
            .parse()
            .context("Failed to parse MemTotal")?;
        return Ok(kb * 1024);
    }

    anyhow::bail!("MemTotal not found in {}", path.display())
}
