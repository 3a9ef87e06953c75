// Environment variable configuration support

use super::Config;
use anyhow::Result;
use std::env;
use std::time::Duration;

/// Apply environment variable overrides to configuration
pub fn apply_env_overrides(mut config: Config) -> Result<Config> {
    if let Ok(val) = env::var("PROCWATCH_INTERVAL") {
        config.refresh_interval = Duration::from_secs(val.parse()?);
    }
    if let Ok(val) = env::var("PROCWATCH_GRACE_MS") {
        config.grace_period = Duration::from_millis(val.parse()?);
    }
    if let Ok(val) = env::var("PROCWATCH_MAX_ATTEMPTS") {
        config.max_attempts = val.parse()?;
    }

    // Status tier thresholds
    if let Ok(val) = env::var("PROCWATCH_CPU_TIER") {
        config.cpu_tier_percent = val.parse()?;
    }
    if let Ok(val) = env::var("PROCWATCH_MEM_TIER_MIB") {
        config.mem_tier_bytes = val.parse::<u64>()? * (1 << 20);
    }

    // Behavior flags
    if let Ok(val) = env::var("PROCWATCH_AUTO_ESCALATE") {
        config.auto_escalate = parse_bool(&val)?;
    }
    if let Ok(val) = env::var("PROCWATCH_KERNEL_THREADS") {
        config.kernel_threads = parse_bool(&val)?;
    }
    if let Ok(val) = env::var("PROCWATCH_DRY_RUN") {
        config.dry_run = parse_bool(&val)?;
    }
    if let Ok(val) = env::var("PROCWATCH_DEBUG") {
        config.debug = parse_bool(&val)?;
    }

    Ok(config)
}

/// Parse boolean value from string
/// Accepts: true/false, 1/0, yes/no, on/off (case-insensitive)
fn parse_bool(s: &str) -> Result<bool> {
    match s.to_lowercase().as_str() {
        "true" | "1" | "yes" | "on" => Ok(true),
        "false" | "0" | "no" | "off" => Ok(false),
        _ => anyhow::bail!("Invalid boolean value: {}", s),
    }
}
