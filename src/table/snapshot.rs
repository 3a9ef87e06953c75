// Snapshot types - the reconciled process table and its row identity

use std::time::Instant;

/// Identity of a logical process: pid plus the kernel's start time in clock
/// ticks. Two records with the same pid but different start ticks are
/// different processes (the pid was reused).
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct ProcessIdentity {
    pub pid: i32,
    pub start_ticks: u64,
}

impl ProcessIdentity {
    pub const fn new(pid: i32, start_ticks: u64) -> Self {
        Self { pid, start_ticks }
    }
}

impl std::fmt::Display for ProcessIdentity {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}@{}", self.pid, self.start_ticks)
    }
}

/// Process lifecycle status, from the state field of /proc/<pid>/stat
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ProcStatus {
    Running,
    Sleeping,
    Stopped,
    Zombie,
    Other,
}

impl ProcStatus {
    pub const fn from_stat_char(c: char) -> Self {
        match c {
            'R' => Self::Running,
            'S' | 'D' | 'I' => Self::Sleeping,
            'T' | 't' => Self::Stopped,
            'Z' => Self::Zombie,
            _ => Self::Other,
        }
    }

    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Running => "running",
            Self::Sleeping => "sleeping",
            Self::Stopped => "stopped",
            Self::Zombie => "zombie",
            Self::Other => "unknown",
        }
    }
}

/// One row of the reconciled table.
///
/// `cpu_ticks` is the cumulative utime+stime counter carried so the next
/// reconciliation can compute a CPU percentage from the delta.
#[derive(Debug, Clone)]
pub struct ProcessRow {
    pub identity: ProcessIdentity,
    pub name: String,
    pub cpu_percent: f64,
    pub memory_bytes: u64,
    pub status: ProcStatus,
    pub(crate) cpu_ticks: u64,
}

/// A complete, consistent set of process rows captured at one instant.
/// Replaced atomically every refresh; only the immediately previous
/// snapshot is ever retained, for diffing.
#[derive(Debug, Clone)]
pub struct Snapshot {
    rows: Vec<ProcessRow>,
    captured_at: Option<Instant>,
}

impl Snapshot {
    pub const fn empty() -> Self {
        Self {
            rows: Vec::new(),
            captured_at: None,
        }
    }

    pub(crate) fn new(rows: Vec<ProcessRow>, captured_at: Instant) -> Self {
        Self {
            rows,
            captured_at: Some(captured_at),
        }
    }

    pub fn rows(&self) -> &[ProcessRow] {
        &self.rows
    }

    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    pub const fn captured_at(&self) -> Option<Instant> {
        self.captured_at
    }

    /// Look up a row by identity.
    pub fn get(&self, identity: ProcessIdentity) -> Option<&ProcessRow> {
        self.rows.iter().find(|r| r.identity == identity)
    }

    pub fn contains(&self, identity: ProcessIdentity) -> bool {
        self.get(identity).is_some()
    }
}

impl Default for Snapshot {
    fn default() -> Self {
        Self::empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_identity_pid_reuse_is_distinct() {
        let a = ProcessIdentity::new(100, 5000);
        let b = ProcessIdentity::new(100, 9000);
        assert_ne!(a, b);
        assert_eq!(a, ProcessIdentity::new(100, 5000));
    }

    #[test]
    fn test_identity_ordering_breaks_ties_by_start() {
        let a = ProcessIdentity::new(100, 5000);
        let b = ProcessIdentity::new(100, 9000);
        assert!(a < b);
    }

    #[test]
    fn test_status_from_stat_char() {
        assert_eq!(ProcStatus::from_stat_char('R'), ProcStatus::Running);
        assert_eq!(ProcStatus::from_stat_char('S'), ProcStatus::Sleeping);
        assert_eq!(ProcStatus::from_stat_char('Z'), ProcStatus::Zombie);
        assert_eq!(ProcStatus::from_stat_char('T'), ProcStatus::Stopped);
        assert_eq!(ProcStatus::from_stat_char('X'), ProcStatus::Other);
    }

    #[test]
    fn test_empty_snapshot() {
        let snap = Snapshot::empty();
        assert!(snap.is_empty());
        assert!(snap.captured_at().is_none());
        assert!(!snap.contains(ProcessIdentity::new(1, 0)));
    }
}
