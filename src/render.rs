// Batch table output - thin presentation glue over engine frames

use crate::engine::Frame;
use crate::sanitize_for_log;
use crate::table::StatusTier;

/// Format bytes as human-readable memory string.
pub fn format_memory(bytes: u64) -> String {
    const KB: u64 = 1024;
    const MB: u64 = KB * 1024;
    const GB: u64 = MB * 1024;

    if bytes < KB {
        format!("{bytes} B")
    } else if bytes < MB {
        format!("{:.1} KB", bytes as f64 / KB as f64)
    } else if bytes < GB {
        format!("{:.1} MB", bytes as f64 / MB as f64)
    } else {
        format!("{:.2} GB", bytes as f64 / GB as f64)
    }
}

/// Format CPU percentage.
pub fn format_cpu(percent: f64) -> String {
    format!("{percent:.1}%")
}

fn tier_marker(tier: StatusTier) -> &'static str {
    match (tier.cpu_elevated, tier.mem_elevated) {
        (true, true) => "CM",
        (true, false) => "C",
        (false, true) => "M",
        (false, false) => "-",
    }
}

/// Print one frame as a plain table, top-like batch mode.
pub fn print_frame(frame: &Frame) {
    let capacity = frame
        .aggregate
        .capacity_bytes
        .map_or_else(|| "unknown".to_string(), format_memory);

    let mut banner = String::new();
    if frame.degraded {
        banner.push_str(" [DEGRADED: process list unavailable]");
    } else if frame.stale {
        banner.push_str(" [stale]");
    }

    println!(
        "Procs: {} | CPU: {} | Mem: {} / {}{}",
        frame.aggregate.process_count,
        format_cpu(frame.aggregate.total_cpu_percent),
        format_memory(frame.aggregate.total_memory_bytes),
        capacity,
        banner,
    );

    if let Some(notice) = &frame.notice {
        println!("* {notice}");
    }

    println!(
        "{:<4} {:<28} {:>8} {:>8} {:>10}  {}",
        "TIER", "NAME", "PID", "CPU%", "MEMORY", "STATUS"
    );
    for fr in &frame.rows {
        println!(
            "{:<4} {:<28} {:>8} {:>8} {:>10}  {}",
            tier_marker(fr.tier),
            sanitize_for_log(&fr.row.name),
            fr.row.identity.pid,
            format_cpu(fr.row.cpu_percent),
            format_memory(fr.row.memory_bytes),
            fr.row.status.as_str(),
        );
    }
    println!();
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_format_memory() {
        assert_eq!(format_memory(512), "512 B");
        assert_eq!(format_memory(1536), "1.5 KB");
        assert_eq!(format_memory(5 * 1024 * 1024), "5.0 MB");
        assert_eq!(format_memory(3 * 1024 * 1024 * 1024), "3.00 GB");
    }

    #[test]
    fn test_format_cpu() {
        assert_eq!(format_cpu(12.34), "12.3%");
        assert_eq!(format_cpu(0.0), "0.0%");
    }

    #[test]
    fn test_tier_marker() {
        let tier = |cpu_elevated, mem_elevated| StatusTier {
            cpu_elevated,
            mem_elevated,
        };
        assert_eq!(tier_marker(tier(false, false)), "-");
        assert_eq!(tier_marker(tier(true, false)), "C");
        assert_eq!(tier_marker(tier(false, true)), "M");
        assert_eq!(tier_marker(tier(true, true)), "CM");
    }
}
