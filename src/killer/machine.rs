// Kill escalation state machine
//
// Requested -> SignalSent -> Verifying -> {Succeeded | Escalate | Failed | Abandoned}
//
// The machine does no I/O: each event returns the next action the driver
// must perform (check liveness, send a signal, wait out a grace period,
// ask the operator), so the whole escalation policy is testable without
// processes or clocks.

use crate::killer::signals::{KillStrength, SignalOutcome};
use crate::table::ProcessIdentity;
use std::time::Instant;

/// Why a request ended in `Failed`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FailReason {
    /// EPERM from the OS; never retried automatically
    PermissionDenied,
    /// Target outlived a SIGKILL and its verification window
    SurvivedForced,
    /// Attempt cap reached; stops infinite escalation loops
    AttemptsExhausted,
    SignalError,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum KillOutcome {
    Succeeded,
    Failed(FailReason),
    /// Target vanished before we acted, or the operator declined escalation
    Abandoned,
}

impl KillOutcome {
    pub const fn describe(self) -> &'static str {
        match self {
            Self::Succeeded => "terminated",
            Self::Failed(FailReason::PermissionDenied) => "permission denied",
            Self::Failed(FailReason::SurvivedForced) => "survived SIGKILL",
            Self::Failed(FailReason::AttemptsExhausted) => "attempt limit reached",
            Self::Failed(FailReason::SignalError) => "signal delivery error",
            Self::Abandoned => "abandoned",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum KillPhase {
    Requested,
    SignalSent,
    Verifying,
    /// Graceful attempt verified the target alive; awaiting confirmation
    /// to retry with forced strength
    Escalate,
    Done(KillOutcome),
}

/// What the driver observed.
#[derive(Debug, Clone)]
pub enum KillEvent {
    LivenessChecked(bool),
    Signalled(SignalOutcome),
    GraceElapsed,
    EscalationConfirmed,
    EscalationDeclined,
}

/// What the driver must do next.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum KillAction {
    CheckLiveness,
    SendSignal(KillStrength),
    AwaitGrace,
    AwaitOperator,
    Finish(KillOutcome),
}

/// One operator-initiated termination request, created when a row is
/// selected and destroyed once a terminal outcome is reached.
#[derive(Debug, Clone)]
pub struct KillRequest {
    pub identity: ProcessIdentity,
    pub name: String,
    pub strength: KillStrength,
    pub issued_at: Instant,
    pub attempts: u32,
    max_attempts: u32,
    phase: KillPhase,
}

impl KillRequest {
    pub fn new(
        identity: ProcessIdentity,
        name: String,
        strength: KillStrength,
        max_attempts: u32,
    ) -> Self {
        Self {
            identity,
            name,
            strength,
            issued_at: Instant::now(),
            attempts: 0,
            max_attempts: max_attempts.max(1),
            phase: KillPhase::Requested,
        }
    }

    pub const fn phase(&self) -> KillPhase {
        self.phase
    }

    pub const fn outcome(&self) -> Option<KillOutcome> {
        match self.phase {
            KillPhase::Done(outcome) => Some(outcome),
            _ => None,
        }
    }

    /// Advance the machine with one observation and get the next action.
    /// Events that do not apply to the current phase leave it unchanged and
    /// re-issue the action the phase is waiting on.
    pub fn on_event(&mut self, event: KillEvent) -> KillAction {
        match (self.phase, event) {
            // A stale selection: the row vanished between render and key press
            (KillPhase::Requested, KillEvent::LivenessChecked(false)) => {
                self.finish(KillOutcome::Abandoned)
            }
            (KillPhase::Requested, KillEvent::LivenessChecked(true)) => self.send_current(),

            (KillPhase::SignalSent, KillEvent::Signalled(outcome)) => match outcome {
                SignalOutcome::Delivered => {
                    self.phase = KillPhase::Verifying;
                    KillAction::AwaitGrace
                }
                // Already gone counts as success
                SignalOutcome::NoSuchProcess => self.finish(KillOutcome::Succeeded),
                SignalOutcome::PermissionDenied => {
                    self.finish(KillOutcome::Failed(FailReason::PermissionDenied))
                }
                SignalOutcome::Error(msg) => {
                    log::warn!("signal delivery to {} failed: {}", self.identity, msg);
                    self.finish(KillOutcome::Failed(FailReason::SignalError))
                }
            },

            (KillPhase::Verifying, KillEvent::GraceElapsed) => KillAction::CheckLiveness,
            (KillPhase::Verifying, KillEvent::LivenessChecked(false)) => {
                self.finish(KillOutcome::Succeeded)
            }
            (KillPhase::Verifying, KillEvent::LivenessChecked(true)) => match self.strength {
                // The only retry path, and it is never silent: the phase is
                // observable until someone confirms
                KillStrength::Graceful => {
                    self.phase = KillPhase::Escalate;
                    KillAction::AwaitOperator
                }
                // Forcing is already the strongest action available
                KillStrength::Forced => {
                    self.finish(KillOutcome::Failed(FailReason::SurvivedForced))
                }
            },

            (KillPhase::Escalate, KillEvent::EscalationConfirmed) => {
                self.strength = KillStrength::Forced;
                self.send_current()
            }
            (KillPhase::Escalate, KillEvent::EscalationDeclined) => {
                self.finish(KillOutcome::Abandoned)
            }

            (phase, event) => {
                log::debug!("ignoring {event:?} in phase {phase:?}");
                self.pending_action()
            }
        }
    }

    /// Enter SignalSent, counting the attempt against the configured cap.
    fn send_current(&mut self) -> KillAction {
        if self.attempts >= self.max_attempts {
            return self.finish(KillOutcome::Failed(FailReason::AttemptsExhausted));
        }
        self.attempts += 1;
        self.phase = KillPhase::SignalSent;
        KillAction::SendSignal(self.strength)
    }

    fn finish(&mut self, outcome: KillOutcome) -> KillAction {
        self.phase = KillPhase::Done(outcome);
        KillAction::Finish(outcome)
    }

    /// The action the current phase is waiting on.
    fn pending_action(&self) -> KillAction {
        match self.phase {
            KillPhase::Requested => KillAction::CheckLiveness,
            KillPhase::SignalSent => KillAction::SendSignal(self.strength),
            KillPhase::Verifying => KillAction::AwaitGrace,
            KillPhase::Escalate => KillAction::AwaitOperator,
            KillPhase::Done(outcome) => KillAction::Finish(outcome),
        }
    }
}
