// System-wide rollups computed fresh from each snapshot

use crate::table::Snapshot;

/// Totals across the whole snapshot. Recomputed every cycle rather than
/// updated incrementally, so it can never drift from the table.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SystemAggregate {
    pub process_count: usize,
    /// Unclamped sum of per-row CPU percent; exceeds 100 on multi-core.
    pub total_cpu_percent: f64,
    pub total_memory_bytes: u64,
    /// Physical memory capacity, probed once at startup. `None` when the
    /// probe failed (display degrades, aggregation still works).
    pub capacity_bytes: Option<u64>,
}

/// Pure rollup of a snapshot plus the startup capacity probe result.
pub fn aggregate(snapshot: &Snapshot, capacity_bytes: Option<u64>) -> SystemAggregate {
    let total_cpu_percent = snapshot.rows().iter().map(|r| r.cpu_percent).sum();
    let total_memory_bytes = snapshot.rows().iter().map(|r| r.memory_bytes).sum();

    SystemAggregate {
        process_count: snapshot.len(),
        total_cpu_percent,
        total_memory_bytes,
        capacity_bytes,
    }
}
