// Raw process queries from /proc

use crate::table::{ProcStatus, ProcessIdentity};
use anyhow::{Context, Result};
use procfs::process::Process;
use std::fs;

/// One process as the OS reports it, before reconciliation. CPU is the
/// cumulative utime+stime tick counter; percentages are derived later from
/// deltas between snapshots.
#[derive(Debug, Clone)]
pub struct RawProcess {
    pub identity: ProcessIdentity,
    pub name: String,
    pub cpu_ticks: u64,
    pub memory_bytes: u64,
    pub status: ProcStatus,
}

/// Source of raw process records. The procfs implementation is the only
/// production one; tests substitute fakes.
pub trait ProcessSource {
    /// Query the current set of processes. A failure here is transient:
    /// callers keep the previous snapshot rather than showing an empty table.
    fn query(&mut self) -> Result<Vec<RawProcess>>;

    /// Kernel clock ticks per second, for CPU percentage math.
    fn ticks_per_second(&self) -> u64;
}

/// Production source backed by /proc.
pub struct ProcfsSource {
    include_kernel_threads: bool,
    page_size: u64,
    ticks_per_sec: u64,
}

impl ProcfsSource {
    pub fn new(include_kernel_threads: bool) -> Self {
        Self {
            include_kernel_threads,
            page_size: procfs::page_size(),
            ticks_per_sec: procfs::ticks_per_second(),
        }
    }

    fn read(&self, pid: i32) -> Result<RawProcess> {
        let process = Process::new(pid)?;
        let stat = process.stat()?;

        Ok(RawProcess {
            identity: ProcessIdentity::new(pid, stat.starttime),
            name: stat.comm,
            cpu_ticks: stat.utime + stat.stime,
            memory_bytes: stat.rss as u64 * self.page_size,
            status: ProcStatus::from_stat_char(stat.state),
        })
    }

    /// Kernel threads have no command line.
    fn is_kernel_thread(pid: i32) -> bool {
        Process::new(pid)
            .and_then(|p| p.cmdline())
            .map(|args| args.is_empty())
            .unwrap_or(true)
    }
}

impl ProcessSource for ProcfsSource {
    fn query(&mut self) -> Result<Vec<RawProcess>> {
        let entries = fs::read_dir("/proc").context("Failed to read /proc")?;
        let mut records = Vec::new();

        for entry in entries {
            let entry = entry.context("Failed to read /proc entry")?;
            let file_name = entry.file_name();
            let name = file_name.to_string_lossy();

            let Ok(pid) = name.parse::<i32>() else {
                continue;
            };

            if !self.include_kernel_threads && Self::is_kernel_thread(pid) {
                continue;
            }

            // Processes exit between the directory walk and the stat read;
            // skip them rather than failing the whole query.
            if let Ok(rec) = self.read(pid) {
                records.push(rec);
            }
        }

        Ok(records)
    }

    fn ticks_per_second(&self) -> u64 {
        self.ticks_per_sec
    }
}
