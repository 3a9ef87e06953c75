// Command-line argument parsing

use clap::{Parser, ValueEnum};

/// Column names accepted on the command line; mapped to the table's sort
/// key in `Config::from_args`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum SortField {
    Cpu,
    Mem,
    Name,
    Pid,
}

/// procwatch - live process monitor and killer
///
/// Keeps a continuously refreshed, ranked table of running processes and
/// terminates selected ones with SIGTERM, escalating to SIGKILL only after
/// the target is verified still alive past the grace period.
#[derive(Parser, Debug)]
#[command(name = "procwatch")]
#[command(version = env!("CARGO_PKG_VERSION"))]
#[command(about = "Live process monitor with kill escalation", long_about = None)]
pub struct Args {
    /// Refresh interval in seconds (default: 2)
    #[arg(short = 'i', long = "interval", value_name = "SECONDS")]
    pub interval: Option<u64>,

    /// Grace period in milliseconds to wait after SIGTERM before checking
    /// whether the target exited (default: 1500)
    #[arg(short = 'g', long = "grace", value_name = "MILLIS")]
    pub grace_ms: Option<u64>,

    /// Maximum signal attempts per kill request before giving up (default: 3)
    #[arg(long = "max-attempts", value_name = "COUNT")]
    pub max_attempts: Option<u32>,

    /// CPU percent above which a row is marked elevated (default: 50)
    #[arg(long = "cpu-tier", value_name = "PERCENT")]
    pub cpu_tier: Option<f64>,

    /// Resident memory in MiB above which a row is marked elevated
    /// (default: 1024)
    #[arg(long = "mem-tier", value_name = "MIB")]
    pub mem_tier_mib: Option<u64>,

    /// Hide processes matching this regex (can be used multiple times)
    #[arg(long = "ignore", value_name = "REGEX")]
    pub ignore: Vec<String>,

    /// Include kernel threads in the table
    #[arg(short = 'k', long = "kernel-threads")]
    pub kernel_threads: bool,

    /// Escalate to SIGKILL automatically when a graceful kill is verified
    /// unsuccessful, instead of asking first
    #[arg(long = "auto-escalate")]
    pub auto_escalate: bool,

    /// Initial name filter, case-insensitive substring
    #[arg(short = 'f', long = "filter", value_name = "QUERY")]
    pub filter: Option<String>,

    /// Sort column (default: cpu)
    #[arg(short = 's', long = "sort", value_name = "COLUMN", value_enum)]
    pub sort: Option<SortField>,

    /// Sort ascending instead of descending
    #[arg(long = "ascending")]
    pub ascending: bool,

    /// Number of refresh frames to print, then exit; 0 runs until Ctrl-C
    /// (default: 0)
    #[arg(short = 'n', long = "iterations", value_name = "COUNT")]
    pub iterations: Option<u64>,

    /// One-shot mode: kill this pid and exit instead of monitoring
    #[arg(long = "kill", value_name = "PID")]
    pub kill: Option<i32>,

    /// With --kill, send SIGKILL immediately instead of SIGTERM
    #[arg(long = "force")]
    pub force: bool,

    /// Dry run mode - don't actually send signals, just report what would
    /// be sent
    #[arg(long = "dryrun")]
    pub dry_run: bool,

    /// Enable debug logging
    #[arg(short = 'd', long = "debug")]
    pub debug: bool,
}

impl Args {
    /// Parse arguments from command line
    pub fn parse_args() -> Self {
        Self::parse()
    }
}
