// Threaded driver for the kill state machine
//
// The grace-period wait must not block refresh or input handling, so each
// request runs on its own worker thread and reports its terminal update
// through a callback (the engine feeds it back over its message channel).
// Threads are detached: a shutdown mid-verify abandons the wait, and the
// signal already sent stays sent.

use crate::killer::machine::{KillAction, KillEvent, KillOutcome, KillRequest};
use crate::killer::signals::Signaller;
use std::sync::Arc;
use std::thread;
use std::time::{Duration, Instant};

/// What a running request reports back to its owner.
#[derive(Debug, Clone)]
pub enum KillUpdate {
    /// Graceful attempt verified the target alive; the request is parked
    /// until the operator confirms or declines forced retry (unless the
    /// auto-escalate policy already confirmed it).
    AwaitingEscalation { request: KillRequest },
    Finished {
        request: KillRequest,
        outcome: KillOutcome,
    },
}

/// Run a request to its next reportable update, blocking the calling thread
/// through the grace period. `spawn_kill` is the non-blocking wrapper.
pub fn execute<S: Signaller + ?Sized>(
    mut request: KillRequest,
    signaller: &S,
    grace: Duration,
    auto_escalate: bool,
) -> KillUpdate {
    let first = request.on_event(KillEvent::LivenessChecked(
        signaller.alive(request.identity),
    ));
    drive(request, first, signaller, grace, auto_escalate)
}

/// Resume a request parked in `Escalate` after the operator confirmed the
/// forced retry.
pub fn resume_confirmed<S: Signaller + ?Sized>(
    mut request: KillRequest,
    signaller: &S,
    grace: Duration,
) -> KillUpdate {
    let first = request.on_event(KillEvent::EscalationConfirmed);
    drive(request, first, signaller, grace, true)
}

fn drive<S: Signaller + ?Sized>(
    mut request: KillRequest,
    mut action: KillAction,
    signaller: &S,
    grace: Duration,
    auto_escalate: bool,
) -> KillUpdate {
    loop {
        action = match action {
            KillAction::CheckLiveness => {
                let alive = signaller.alive(request.identity);
                request.on_event(KillEvent::LivenessChecked(alive))
            }
            KillAction::SendSignal(strength) => {
                log::info!(
                    "Sending {} to {} ({})",
                    strength.as_str(),
                    request.identity,
                    crate::sanitize_for_log(&request.name)
                );
                let outcome = signaller.send(request.identity, strength);
                request.on_event(KillEvent::Signalled(outcome))
            }
            KillAction::AwaitGrace => {
                wait_grace(signaller, &request, grace);
                request.on_event(KillEvent::GraceElapsed)
            }
            KillAction::AwaitOperator => {
                if auto_escalate {
                    log::warn!(
                        "{} ({}) survived SIGTERM, auto-escalating to SIGKILL",
                        request.identity,
                        crate::sanitize_for_log(&request.name)
                    );
                    request.on_event(KillEvent::EscalationConfirmed)
                } else {
                    return KillUpdate::AwaitingEscalation { request };
                }
            }
            KillAction::Finish(outcome) => {
                log::info!(
                    "Kill request for {} ({}) finished after {} attempt(s): {}",
                    request.identity,
                    crate::sanitize_for_log(&request.name),
                    request.attempts,
                    outcome.describe()
                );
                return KillUpdate::Finished { request, outcome };
            }
        };
    }
}

/// Wait out the grace period, polling so an early exit shortens the wait.
fn wait_grace<S: Signaller + ?Sized>(signaller: &S, request: &KillRequest, grace: Duration) {
    const POLL_STEP: Duration = Duration::from_millis(100);
    let deadline = Instant::now() + grace;

    loop {
        let remaining = deadline.saturating_duration_since(Instant::now());
        if remaining.is_zero() {
            return;
        }
        thread::sleep(remaining.min(POLL_STEP));
        if !signaller.alive(request.identity) {
            return;
        }
    }
}

/// Start a request on a detached worker thread; `notify` receives exactly
/// one update.
pub fn spawn_kill<S, F>(
    request: KillRequest,
    signaller: Arc<S>,
    grace: Duration,
    auto_escalate: bool,
    notify: F,
) where
    S: Signaller + 'static,
    F: FnOnce(KillUpdate) + Send + 'static,
{
    thread::spawn(move || {
        let update = execute(request, signaller.as_ref(), grace, auto_escalate);
        notify(update);
    });
}

/// Restart a parked request after operator confirmation, detached like
/// `spawn_kill`.
pub fn spawn_escalation<S, F>(request: KillRequest, signaller: Arc<S>, grace: Duration, notify: F)
where
    S: Signaller + 'static,
    F: FnOnce(KillUpdate) + Send + 'static,
{
    thread::spawn(move || {
        let update = resume_confirmed(request, signaller.as_ref(), grace);
        notify(update);
    });
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::killer::machine::{FailReason, KillPhase};
    use crate::killer::signals::{KillStrength, SignalOutcome};
    use crate::table::ProcessIdentity;
    use std::sync::atomic::{AtomicU32, Ordering};
    use std::sync::mpsc;

    /// Target that stays alive for a configured number of liveness checks
    /// after the first signal, then disappears.
    struct FakeSignaller {
        dies_after_signals: u32,
        signals: AtomicU32,
        send_outcome: SignalOutcome,
    }

    impl FakeSignaller {
        fn dies_after(n: u32) -> Self {
            Self {
                dies_after_signals: n,
                signals: AtomicU32::new(0),
                send_outcome: SignalOutcome::Delivered,
            }
        }
    }

    impl Signaller for FakeSignaller {
        fn send(&self, _identity: ProcessIdentity, _strength: KillStrength) -> SignalOutcome {
            self.signals.fetch_add(1, Ordering::SeqCst);
            self.send_outcome.clone()
        }

        fn alive(&self, _identity: ProcessIdentity) -> bool {
            self.signals.load(Ordering::SeqCst) < self.dies_after_signals
        }
    }

    fn request(strength: KillStrength) -> KillRequest {
        KillRequest::new(ProcessIdentity::new(42, 7), "victim".to_string(), strength, 3)
    }

    const GRACE: Duration = Duration::from_millis(10);

    #[test]
    fn test_graceful_kill_dies_in_grace_period() {
        let signaller = FakeSignaller::dies_after(1);
        let update = execute(request(KillStrength::Graceful), &signaller, GRACE, false);
        match update {
            KillUpdate::Finished { outcome, request } => {
                assert_eq!(outcome, KillOutcome::Succeeded);
                assert_eq!(request.attempts, 1);
            }
            KillUpdate::AwaitingEscalation { .. } => panic!("unexpected escalation"),
        }
    }

    #[test]
    fn test_vanished_before_signal_is_abandoned() {
        let signaller = FakeSignaller::dies_after(0);
        let update = execute(request(KillStrength::Graceful), &signaller, GRACE, false);
        match update {
            KillUpdate::Finished { outcome, .. } => assert_eq!(outcome, KillOutcome::Abandoned),
            KillUpdate::AwaitingEscalation { .. } => panic!("unexpected escalation"),
        }
        assert_eq!(signaller.signals.load(Ordering::SeqCst), 0);
    }

    #[test]
    fn test_survivor_parks_for_operator() {
        let signaller = FakeSignaller::dies_after(5);
        let update = execute(request(KillStrength::Graceful), &signaller, GRACE, false);
        match update {
            KillUpdate::AwaitingEscalation { request } => {
                assert_eq!(request.phase(), KillPhase::Escalate);
                assert_eq!(request.attempts, 1);
            }
            KillUpdate::Finished { .. } => panic!("expected escalation"),
        }
    }

    #[test]
    fn test_auto_escalate_retries_with_forced() {
        // Survives the SIGTERM, dies after the second (forced) signal
        let signaller = FakeSignaller::dies_after(2);
        let update = execute(request(KillStrength::Graceful), &signaller, GRACE, true);
        match update {
            KillUpdate::Finished { outcome, request } => {
                assert_eq!(outcome, KillOutcome::Succeeded);
                assert_eq!(request.attempts, 2);
                assert_eq!(request.strength, KillStrength::Forced);
            }
            KillUpdate::AwaitingEscalation { .. } => panic!("auto-escalate should not park"),
        }
    }

    #[test]
    fn test_resume_confirmed_sends_forced() {
        let signaller = FakeSignaller::dies_after(5);
        let parked = match execute(request(KillStrength::Graceful), &signaller, GRACE, false) {
            KillUpdate::AwaitingEscalation { request } => request,
            KillUpdate::Finished { .. } => panic!("expected escalation"),
        };

        // Target dies once the second signal lands
        let signaller2 = FakeSignaller::dies_after(0);
        let update = resume_confirmed(parked, &signaller2, GRACE);
        match update {
            KillUpdate::Finished { outcome, request } => {
                assert_eq!(outcome, KillOutcome::Succeeded);
                assert_eq!(request.strength, KillStrength::Forced);
                assert_eq!(request.attempts, 2);
            }
            KillUpdate::AwaitingEscalation { .. } => panic!("unexpected second escalation"),
        }
    }

    #[test]
    fn test_forced_survivor_is_hard_failure() {
        let signaller = FakeSignaller::dies_after(10);
        let update = execute(request(KillStrength::Forced), &signaller, GRACE, true);
        match update {
            KillUpdate::Finished { outcome, .. } => {
                assert_eq!(outcome, KillOutcome::Failed(FailReason::SurvivedForced));
            }
            KillUpdate::AwaitingEscalation { .. } => panic!("forced kills never escalate"),
        }
    }

    #[test]
    fn test_permission_denied_surfaces_as_failed() {
        let signaller = FakeSignaller {
            dies_after_signals: 10,
            signals: AtomicU32::new(0),
            send_outcome: SignalOutcome::PermissionDenied,
        };
        let update = execute(request(KillStrength::Graceful), &signaller, GRACE, false);
        match update {
            KillUpdate::Finished { outcome, .. } => {
                assert_eq!(outcome, KillOutcome::Failed(FailReason::PermissionDenied));
            }
            KillUpdate::AwaitingEscalation { .. } => panic!("no escalation on EPERM"),
        }
    }

    #[test]
    fn test_spawned_kill_reports_over_channel() {
        let signaller = Arc::new(FakeSignaller::dies_after(1));
        let (tx, rx) = mpsc::channel();
        spawn_kill(
            request(KillStrength::Graceful),
            signaller,
            GRACE,
            false,
            move |update| {
                let _ = tx.send(update);
            },
        );

        let update = rx.recv_timeout(Duration::from_secs(5)).unwrap();
        match update {
            KillUpdate::Finished { outcome, .. } => assert_eq!(outcome, KillOutcome::Succeeded),
            KillUpdate::AwaitingEscalation { .. } => panic!("unexpected escalation"),
        }
    }
}
