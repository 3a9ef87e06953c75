// Snapshot reconciliation - diff a raw process query against the previous table

use crate::monitor::RawProcess;
use crate::table::{ProcessRow, Snapshot};
use std::collections::HashMap;
use std::time::Instant;

/// Reconcile a freshly queried set of raw process records against the
/// previous snapshot.
///
/// Rows whose identity exists in `prev` keep that identity and get a CPU
/// percentage computed from the tick delta since the previous capture.
/// Identities that vanished are dropped, new ones are added with 0.0 CPU
/// (no baseline yet). Output identities are unique; a duplicate identity
/// in the raw input keeps the first record seen.
pub fn reconcile(
    prev: &Snapshot,
    raw: Vec<RawProcess>,
    now: Instant,
    ticks_per_sec: u64,
) -> Snapshot {
    let prev_by_identity: HashMap<_, _> =
        prev.rows().iter().map(|r| (r.identity, r)).collect();

    let elapsed_secs = prev
        .captured_at()
        .map(|at| now.saturating_duration_since(at).as_secs_f64());

    let mut seen = HashMap::with_capacity(raw.len());
    let mut rows = Vec::with_capacity(raw.len());

    for rec in raw {
        if seen.insert(rec.identity, ()).is_some() {
            log::debug!("duplicate identity {} in raw query, keeping first", rec.identity);
            continue;
        }

        let cpu_percent = match (prev_by_identity.get(&rec.identity), elapsed_secs) {
            (Some(old), Some(elapsed)) => {
                cpu_percent(old.cpu_ticks, rec.cpu_ticks, elapsed, ticks_per_sec)
            }
            // First sighting, or first snapshot overall: no baseline
            _ => 0.0,
        };

        rows.push(ProcessRow {
            identity: rec.identity,
            name: rec.name,
            cpu_percent,
            memory_bytes: rec.memory_bytes,
            status: rec.status,
            cpu_ticks: rec.cpu_ticks,
        });
    }

    Snapshot::new(rows, now)
}

/// CPU percentage over one refresh interval from cumulative tick counters.
/// Not clamped: a multi-threaded process legitimately exceeds 100%.
fn cpu_percent(prev_ticks: u64, now_ticks: u64, elapsed_secs: f64, ticks_per_sec: u64) -> f64 {
    if elapsed_secs <= 0.0 || ticks_per_sec == 0 {
        return 0.0;
    }
    let delta = now_ticks.saturating_sub(prev_ticks) as f64;
    delta / ticks_per_sec as f64 / elapsed_secs * 100.0
}
