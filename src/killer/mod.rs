// Kill module - signal delivery and the escalation state machine

mod controller;
mod machine;
pub mod signals;

pub use controller::{execute, resume_confirmed, spawn_escalation, spawn_kill, KillUpdate};
pub use machine::{FailReason, KillAction, KillEvent, KillOutcome, KillPhase, KillRequest};
pub use signals::{KillStrength, OsSignaller, SignalOutcome, Signaller};
