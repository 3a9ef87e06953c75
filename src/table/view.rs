// Filter/sort view - what the presentation layer actually renders

use crate::table::{ProcessRow, Snapshot};
use regex::Regex;
use std::cmp::Ordering;

/// Column the table is ordered by.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SortKey {
    Cpu,
    Memory,
    Name,
    Pid,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SortDirection {
    Ascending,
    Descending,
}

/// Operator-controlled view state. Persists across refresh cycles until
/// explicitly changed or cleared.
#[derive(Debug, Clone)]
pub struct FilterState {
    pub query: Option<String>,
    pub sort_key: SortKey,
    pub sort_dir: SortDirection,
}

impl Default for FilterState {
    fn default() -> Self {
        Self {
            query: None,
            sort_key: SortKey::Cpu,
            sort_dir: SortDirection::Descending,
        }
    }
}

impl FilterState {
    pub fn set_query(&mut self, query: &str) {
        let trimmed = query.trim();
        if trimmed.is_empty() {
            self.query = None;
        } else {
            self.query = Some(trimmed.to_lowercase());
        }
    }

    pub fn clear_query(&mut self) {
        self.query = None;
    }

    pub fn set_sort(&mut self, key: SortKey, dir: SortDirection) {
        self.sort_key = key;
        self.sort_dir = dir;
    }
}

/// Produce the ordered rows to display: ignore patterns excluded first, then
/// the case-insensitive substring query, then a stable sort by the active key
/// with ties broken by identity so equal metrics never flicker between
/// refreshes.
pub fn visible_rows<'a>(
    snapshot: &'a Snapshot,
    filter: &FilterState,
    ignore: &[Regex],
) -> Vec<&'a ProcessRow> {
    let mut rows: Vec<&ProcessRow> = snapshot
        .rows()
        .iter()
        .filter(|r| !ignore.iter().any(|p| p.is_match(&r.name)))
        .filter(|r| match &filter.query {
            Some(q) => r.name.to_lowercase().contains(q.as_str()),
            None => true,
        })
        .collect();

    rows.sort_by(|a, b| {
        let by_key = match filter.sort_key {
            SortKey::Cpu => a
                .cpu_percent
                .partial_cmp(&b.cpu_percent)
                .unwrap_or(Ordering::Equal),
            SortKey::Memory => a.memory_bytes.cmp(&b.memory_bytes),
            SortKey::Name => a.name.cmp(&b.name),
            SortKey::Pid => a.identity.pid.cmp(&b.identity.pid),
        };
        let by_key = match filter.sort_dir {
            SortDirection::Ascending => by_key,
            SortDirection::Descending => by_key.reverse(),
        };
        by_key.then_with(|| a.identity.cmp(&b.identity))
    });

    rows
}

/// Display classification derived from a row's current metrics. The two
/// conditions are independent; a row can be elevated on either, both, or
/// neither. Never cached: recomputed from the row every frame.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct StatusTier {
    pub cpu_elevated: bool,
    pub mem_elevated: bool,
}

impl StatusTier {
    pub const fn is_elevated(self) -> bool {
        self.cpu_elevated || self.mem_elevated
    }
}

pub fn status_tier(row: &ProcessRow, cpu_threshold: f64, mem_threshold_bytes: u64) -> StatusTier {
    StatusTier {
        cpu_elevated: row.cpu_percent > cpu_threshold,
        mem_elevated: row.memory_bytes > mem_threshold_bytes,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::monitor::RawProcess;
    use crate::table::{reconcile, ProcStatus, ProcessIdentity};
    use std::time::Instant;

    fn snap(rows: Vec<(i32, u64, &str, u64)>) -> Snapshot {
        let raw = rows
            .into_iter()
            .map(|(pid, start, name, mem)| RawProcess {
                identity: ProcessIdentity::new(pid, start),
                name: name.to_string(),
                cpu_ticks: 0,
                memory_bytes: mem,
                status: ProcStatus::Running,
            })
            .collect();
        reconcile(&Snapshot::empty(), raw, Instant::now(), 100)
    }

    #[test]
    fn test_filter_case_insensitive_substring() {
        let snapshot = snap(vec![(1, 0, "Spotify", 0), (2, 0, "Slack", 0)]);
        let mut filter = FilterState::default();
        filter.set_query("spot");

        let rows = visible_rows(&snapshot, &filter, &[]);
        assert_eq!(rows.len(), 1);
        assert_eq!(rows[0].name, "Spotify");
    }

    #[test]
    fn test_empty_query_matches_all() {
        let snapshot = snap(vec![(1, 0, "a", 0), (2, 0, "b", 0)]);
        let mut filter = FilterState::default();
        filter.set_query("   ");
        assert!(filter.query.is_none());
        assert_eq!(visible_rows(&snapshot, &filter, &[]).len(), 2);
    }

    #[test]
    fn test_clear_query_restores_all_rows() {
        let snapshot = snap(vec![(1, 0, "firefox", 0), (2, 0, "bash", 0)]);
        let mut filter = FilterState::default();
        filter.set_query("fire");
        assert_eq!(visible_rows(&snapshot, &filter, &[]).len(), 1);
        filter.clear_query();
        assert_eq!(visible_rows(&snapshot, &filter, &[]).len(), 2);
    }

    #[test]
    fn test_ignore_patterns_exclude_rows() {
        let snapshot = snap(vec![(1, 0, "kworker/0:1", 0), (2, 0, "firefox", 0)]);
        let ignore = vec![Regex::new("^kworker").unwrap()];
        let rows = visible_rows(&snapshot, &FilterState::default(), &ignore);
        assert_eq!(rows.len(), 1);
        assert_eq!(rows[0].name, "firefox");
    }

    #[test]
    fn test_default_sort_memory_descending_by_key() {
        let snapshot = snap(vec![(1, 0, "a", 100), (2, 0, "b", 300), (3, 0, "c", 200)]);
        let filter = FilterState {
            query: None,
            sort_key: SortKey::Memory,
            sort_dir: SortDirection::Descending,
        };
        let rows = visible_rows(&snapshot, &filter, &[]);
        let mems: Vec<u64> = rows.iter().map(|r| r.memory_bytes).collect();
        assert_eq!(mems, vec![300, 200, 100]);
    }

    #[test]
    fn test_equal_metrics_tie_break_by_identity() {
        // All rows equal on the sort key; order must come from identity
        let snapshot = snap(vec![(30, 0, "c", 50), (10, 0, "a", 50), (20, 0, "b", 50)]);
        let filter = FilterState {
            query: None,
            sort_key: SortKey::Memory,
            sort_dir: SortDirection::Descending,
        };
        let rows = visible_rows(&snapshot, &filter, &[]);
        let pids: Vec<i32> = rows.iter().map(|r| r.identity.pid).collect();
        assert_eq!(pids, vec![10, 20, 30]);
    }

    #[test]
    fn test_sort_deterministic_across_invocations() {
        let snapshot = snap(vec![
            (5, 0, "e", 10),
            (1, 0, "a", 10),
            (3, 0, "c", 99),
            (2, 0, "b", 10),
        ]);
        let filter = FilterState::default();
        let first: Vec<_> = visible_rows(&snapshot, &filter, &[])
            .iter()
            .map(|r| r.identity)
            .collect();
        let second: Vec<_> = visible_rows(&snapshot, &filter, &[])
            .iter()
            .map(|r| r.identity)
            .collect();
        assert_eq!(first, second);
    }

    #[test]
    fn test_sort_name_ascending() {
        let snapshot = snap(vec![(1, 0, "zsh", 0), (2, 0, "bash", 0), (3, 0, "mail", 0)]);
        let filter = FilterState {
            query: None,
            sort_key: SortKey::Name,
            sort_dir: SortDirection::Ascending,
        };
        let names: Vec<&str> = visible_rows(&snapshot, &filter, &[])
            .iter()
            .map(|r| r.name.as_str())
            .collect();
        assert_eq!(names, vec!["bash", "mail", "zsh"]);
    }

    #[test]
    fn test_status_tier_independent_conditions() {
        const GIB: u64 = 1 << 30;
        let snapshot = snap(vec![(1, 0, "a", 2 * GIB), (2, 0, "b", 100)]);
        let low = status_tier(snapshot.get(ProcessIdentity::new(2, 0)).unwrap(), 50.0, GIB);
        assert!(!low.is_elevated());

        let high_mem = status_tier(snapshot.get(ProcessIdentity::new(1, 0)).unwrap(), 50.0, GIB);
        assert!(high_mem.mem_elevated);
        assert!(!high_mem.cpu_elevated);
        assert!(high_mem.is_elevated());
    }

    #[test]
    fn test_status_tier_thresholds_are_strict() {
        let snapshot = snap(vec![(1, 0, "edge", 1 << 30)]);
        let row = snapshot.get(ProcessIdentity::new(1, 0)).unwrap();
        // Exactly at the threshold is not elevated
        let tier = status_tier(row, 0.0, 1 << 30);
        assert!(!tier.mem_elevated);
    }
}
