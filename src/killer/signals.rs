// Signal delivery for process termination

use crate::table::ProcessIdentity;
use nix::sys::signal::{self, Signal};
use nix::unistd::Pid;
use procfs::process::Process;

/// Requested termination strength.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum KillStrength {
    /// SIGTERM: the target may catch it and exit on its own terms
    Graceful,
    /// SIGKILL: unconditional, cannot be intercepted
    Forced,
}

impl KillStrength {
    pub const fn signal(self) -> Signal {
        match self {
            Self::Graceful => Signal::SIGTERM,
            Self::Forced => Signal::SIGKILL,
        }
    }

    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Graceful => "SIGTERM",
            Self::Forced => "SIGKILL",
        }
    }
}

/// Outcome of one signal delivery attempt.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SignalOutcome {
    Delivered,
    /// ESRCH: the target was already gone
    NoSuchProcess,
    /// EPERM: the OS rejected the delivery
    PermissionDenied,
    Error(String),
}

/// Seam between the kill state machine driver and the OS. Tests substitute
/// fakes; `OsSignaller` is the only production implementation.
pub trait Signaller: Send + Sync {
    fn send(&self, identity: ProcessIdentity, strength: KillStrength) -> SignalOutcome;

    /// Liveness by identity, not just pid: a reused pid with a different
    /// start time counts as gone.
    fn alive(&self, identity: ProcessIdentity) -> bool;
}

pub struct OsSignaller;

impl Signaller for OsSignaller {
    fn send(&self, identity: ProcessIdentity, strength: KillStrength) -> SignalOutcome {
        log::debug!(
            "Sending {} to process {}",
            strength.as_str(),
            identity
        );

        // kill(2) addresses a pid, so a reuse between the liveness check and
        // this call can still mis-target; the window is inherent to the API.
        match signal::kill(Pid::from_raw(identity.pid), strength.signal()) {
            Ok(()) => SignalOutcome::Delivered,
            Err(nix::errno::Errno::ESRCH) => SignalOutcome::NoSuchProcess,
            Err(nix::errno::Errno::EPERM) => SignalOutcome::PermissionDenied,
            Err(e) => SignalOutcome::Error(format!("signal error: {e}")),
        }
    }

    fn alive(&self, identity: ProcessIdentity) -> bool {
        Process::new(identity.pid)
            .and_then(|p| p.stat())
            .map(|stat| stat.starttime == identity.start_ticks)
            .unwrap_or(false)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_strength_maps_to_signal() {
        assert_eq!(KillStrength::Graceful.signal(), Signal::SIGTERM);
        assert_eq!(KillStrength::Forced.signal(), Signal::SIGKILL);
    }

    #[test]
    fn test_send_to_nonexistent_process() {
        // Pid 999999 should not exist
        let outcome = OsSignaller.send(ProcessIdentity::new(999_999, 0), KillStrength::Forced);
        assert_eq!(outcome, SignalOutcome::NoSuchProcess);
    }

    #[test]
    fn test_alive_rejects_reused_pid() {
        let pid = std::process::id() as i32;
        let real_start = Process::new(pid).unwrap().stat().unwrap().starttime;
        assert!(OsSignaller.alive(ProcessIdentity::new(pid, real_start)));
        // Same pid, wrong start time: the logical process is gone
        assert!(!OsSignaller.alive(ProcessIdentity::new(pid, real_start + 1)));
    }

    #[test]
    fn test_alive_nonexistent_pid() {
        assert!(!OsSignaller.alive(ProcessIdentity::new(999_999, 0)));
    }
}
