// Configuration module

mod args;
mod env;

pub use args::{Args, SortField};

use crate::table::{SortDirection, SortKey};
use anyhow::{bail, Context, Result};
use regex::{Regex, RegexBuilder};
use std::time::Duration;

/// Maximum allowed length for regex patterns to prevent ReDoS attacks
const MAX_REGEX_PATTERN_LENGTH: usize = 256;

/// Maximum compiled regex size in bytes (10MB) to prevent memory exhaustion
const REGEX_SIZE_LIMIT: usize = 10 * (1 << 20);

/// Compile a regex pattern with safety limits: pattern length capped and a
/// compiled size limit so a hostile pattern cannot exhaust memory.
fn compile_safe_regex(pattern: &str) -> Result<Regex> {
    if pattern.len() > MAX_REGEX_PATTERN_LENGTH {
        bail!(
            "Regex pattern too long (max {} chars): {}...",
            MAX_REGEX_PATTERN_LENGTH,
            &pattern[..50.min(pattern.len())]
        );
    }

    RegexBuilder::new(pattern)
        .size_limit(REGEX_SIZE_LIMIT)
        .build()
        .context(format!("Invalid regex pattern: {pattern}"))
}

/// Validated runtime configuration.
#[derive(Debug, Clone)]
pub struct Config {
    /// Periodic refresh cadence
    pub refresh_interval: Duration,
    /// Wait after a signal before verifying the target exited
    pub grace_period: Duration,
    /// Signal deliveries allowed per kill request
    pub max_attempts: u32,

    // Status tier thresholds
    pub cpu_tier_percent: f64,
    pub mem_tier_bytes: u64,

    // View
    pub ignore: Vec<Regex>,
    pub kernel_threads: bool,
    pub sort_key: SortKey,
    pub sort_dir: SortDirection,
    pub initial_query: Option<String>,

    // Behavior flags
    pub auto_escalate: bool,
    pub dry_run: bool,
    pub debug: bool,

    /// Frames to print in batch mode; `None` runs until interrupted
    pub iterations: Option<u64>,
}

impl Config {
    /// Create configuration from command-line arguments
    pub fn from_args(args: Args) -> Result<Self> {
        let mut config = Self::default();

        if let Some(interval) = args.interval {
            config.refresh_interval = Duration::from_secs(interval);
        }
        if let Some(grace_ms) = args.grace_ms {
            config.grace_period = Duration::from_millis(grace_ms);
        }
        if let Some(max_attempts) = args.max_attempts {
            config.max_attempts = max_attempts;
        }

        if let Some(cpu_tier) = args.cpu_tier {
            config.cpu_tier_percent = cpu_tier;
        }
        if let Some(mib) = args.mem_tier_mib {
            config.mem_tier_bytes = mib * (1 << 20);
        }

        // Compile regex patterns with safety limits (ReDoS protection)
        for pattern in args.ignore {
            config.ignore.push(compile_safe_regex(&pattern)?);
        }
        config.kernel_threads = args.kernel_threads;

        config.sort_key = match args.sort {
            Some(SortField::Cpu) | None => SortKey::Cpu,
            Some(SortField::Mem) => SortKey::Memory,
            Some(SortField::Name) => SortKey::Name,
            Some(SortField::Pid) => SortKey::Pid,
        };
        config.sort_dir = if args.ascending {
            SortDirection::Ascending
        } else {
            SortDirection::Descending
        };
        config.initial_query = args.filter;

        config.auto_escalate = args.auto_escalate;
        config.dry_run = args.dry_run;
        config.debug = args.debug;

        config.iterations = match args.iterations {
            Some(0) | None => None,
            Some(n) => Some(n),
        };

        // Apply environment variable overrides
        config = env::apply_env_overrides(config)?;

        config.validate()?;

        Ok(config)
    }

    /// Validate configuration values
    fn validate(&self) -> Result<()> {
        if self.refresh_interval.is_zero() {
            bail!("refresh interval must be at least 1 second");
        }
        if self.grace_period.is_zero() {
            bail!("grace period must be positive");
        }
        if self.max_attempts == 0 {
            bail!("max attempts must be at least 1");
        }
        if self.cpu_tier_percent < 0.0 {
            bail!("cpu tier threshold must not be negative");
        }
        if self.mem_tier_bytes == 0 {
            bail!("memory tier threshold must be positive");
        }
        Ok(())
    }
}

impl Default for Config {
    fn default() -> Self {
        Self {
            refresh_interval: Duration::from_secs(2),
            grace_period: Duration::from_millis(1500),
            max_attempts: 3,
            cpu_tier_percent: 50.0,          // >50% CPU is elevated
            mem_tier_bytes: 1024 * (1 << 20), // >1 GiB resident is elevated
            ignore: Vec::new(),
            kernel_threads: false,
            sort_key: SortKey::Cpu,
            sort_dir: SortDirection::Descending,
            initial_query: None,
            auto_escalate: false,
            dry_run: false,
            debug: false,
            iterations: None,
        }
    }
}
