// procwatch - Main entry point

use procwatch::config::{Args, Config};
use procwatch::engine::Engine;
use procwatch::killer::{self, KillRequest, KillStrength, KillUpdate, OsSignaller};
use procwatch::monitor::{memory_capacity, ProcfsSource};
use procwatch::table::ProcessIdentity;
use procwatch::{render, sanitize_for_log};
use std::process;
use std::sync::atomic::Ordering;
use std::sync::Arc;

/// Setup logging based on configuration
fn setup_logging(debug: bool) {
    let log_level = if debug { "debug" } else { "info" };

    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or(log_level))
        .format_timestamp_secs()
        .init();
}

/// Resolve a bare pid into a full identity plus display name.
fn resolve_identity(pid: i32) -> anyhow::Result<(ProcessIdentity, String)> {
    let stat = procfs::process::Process::new(pid)?.stat()?;
    Ok((ProcessIdentity::new(pid, stat.starttime), stat.comm))
}

/// One-shot kill mode: resolve, signal, verify, exit.
fn one_shot_kill(pid: i32, force: bool, config: &Config) -> i32 {
    let (identity, name) = match resolve_identity(pid) {
        Ok(resolved) => resolved,
        Err(e) => {
            eprintln!("Cannot resolve pid {pid}: {e}");
            return 1;
        }
    };

    let strength = if force {
        KillStrength::Forced
    } else {
        KillStrength::Graceful
    };

    if config.dry_run {
        println!(
            "DRY RUN: would send {} to {} ({})",
            strength.as_str(),
            identity,
            sanitize_for_log(&name)
        );
        return 0;
    }

    let request = KillRequest::new(identity, name.clone(), strength, config.max_attempts);
    let update = killer::execute(
        request,
        &OsSignaller,
        config.grace_period,
        config.auto_escalate,
    );

    match update {
        KillUpdate::Finished { outcome, .. } => {
            println!("{} ({}): {}", identity, sanitize_for_log(&name), outcome.describe());
            i32::from(outcome != killer::KillOutcome::Succeeded)
        }
        KillUpdate::AwaitingEscalation { .. } => {
            eprintln!(
                "{} ({}) is still running after SIGTERM; re-run with --force or --auto-escalate",
                identity,
                sanitize_for_log(&name)
            );
            1
        }
    }
}

fn run_monitor(config: Config) -> anyhow::Result<()> {
    let capacity = match memory_capacity() {
        Ok(bytes) => Some(bytes),
        Err(e) => {
            log::warn!("Memory capacity probe failed: {e:#}. Showing capacity as unknown.");
            None
        }
    };

    let source = ProcfsSource::new(config.kernel_threads);
    let iterations = config.iterations;
    let mut engine = Engine::new(config, source, Arc::new(OsSignaller), capacity);

    let running = engine.running_flag();
    ctrlc::set_handler(move || {
        log::info!("Received shutdown signal");
        running.store(false, Ordering::SeqCst);
    })?;

    engine.run(render::print_frame, iterations)
}

fn main() {
    let args = Args::parse_args();

    setup_logging(args.debug);

    let kill_target = args.kill;
    let force = args.force;

    let config = match Config::from_args(args) {
        Ok(cfg) => cfg,
        Err(e) => {
            eprintln!("Configuration error: {e}");
            eprintln!("Use --help for usage information");
            process::exit(1);
        }
    };

    if let Some(pid) = kill_target {
        process::exit(one_shot_kill(pid, force, &config));
    }

    if let Err(e) = run_monitor(config) {
        eprintln!("Fatal error: {e}");
        process::exit(1);
    }
}
