// Engine service - single owner of snapshot and filter state
//
// One thread owns everything: operator intents and kill-controller updates
// arrive on the same channel, drained against the next refresh deadline.
// That gives the single-active-refresh guarantee without locks; the only
// other threads are detached kill-verification waits.

use crate::config::Config;
use crate::killer::{self, KillEvent, KillRequest, KillStrength, KillUpdate, Signaller};
use crate::monitor::ProcessSource;
use crate::sanitize_for_log;
use crate::table::{
    aggregate, reconcile, status_tier, visible_rows, FilterState, ProcessIdentity, ProcessRow,
    Snapshot, SortDirection, SortKey, StatusTier, SystemAggregate,
};
use anyhow::Result;
use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::mpsc::{self, Receiver, RecvTimeoutError, Sender};
use std::sync::Arc;
use std::time::Instant;

/// Consecutive failed refreshes before the degraded banner state is raised.
const DEGRADED_AFTER_FAILURES: u32 = 5;

/// Everything the presentation layer may ask of the core.
#[derive(Debug, Clone)]
pub enum OperatorIntent {
    Refresh,
    SetFilter(String),
    ClearFilter,
    SetSort(SortKey, SortDirection),
    RequestKill(ProcessIdentity, KillStrength),
    ConfirmEscalation(ProcessIdentity),
    DeclineEscalation(ProcessIdentity),
    Quit,
}

enum EngineMsg {
    Intent(OperatorIntent),
    Kill(KillUpdate),
}

enum Flow {
    Continue,
    RefreshNow,
    Quit,
}

/// Cloneable sender half for the presentation layer. Dropping all handles
/// does not stop the engine; send `Quit` for that.
#[derive(Clone)]
pub struct EngineHandle {
    tx: Sender<EngineMsg>,
}

impl EngineHandle {
    pub fn intent(&self, intent: OperatorIntent) {
        let _ = self.tx.send(EngineMsg::Intent(intent));
    }
}

/// One row as handed to the presentation layer, tier already derived.
#[derive(Debug, Clone)]
pub struct FrameRow {
    pub row: ProcessRow,
    pub tier: StatusTier,
}

/// Everything a single render frame needs. Values, not references: the
/// engine's own table can be swapped while a frame is still on screen.
#[derive(Debug, Clone)]
pub struct Frame {
    pub rows: Vec<FrameRow>,
    pub aggregate: SystemAggregate,
    /// Last query failed; rows are from the previous successful refresh
    pub stale: bool,
    /// Every recent refresh failed; the table cannot be trusted at all
    pub degraded: bool,
    /// Kill outcome or escalation prompt for the status line
    pub notice: Option<String>,
}

pub struct Engine<S: ProcessSource, K: Signaller + 'static> {
    config: Config,
    source: S,
    signaller: Arc<K>,
    capacity_bytes: Option<u64>,
    snapshot: Snapshot,
    filter: FilterState,
    stale: bool,
    consecutive_failures: u32,
    pending_escalations: HashMap<ProcessIdentity, KillRequest>,
    notice: Option<String>,
    tx: Sender<EngineMsg>,
    rx: Receiver<EngineMsg>,
    running: Arc<AtomicBool>,
}

impl<S: ProcessSource, K: Signaller + 'static> Engine<S, K> {
    pub fn new(config: Config, source: S, signaller: Arc<K>, capacity_bytes: Option<u64>) -> Self {
        let (tx, rx) = mpsc::channel();
        let filter = FilterState {
            query: None,
            sort_key: config.sort_key,
            sort_dir: config.sort_dir,
        };
        let mut engine = Self {
            config,
            source,
            signaller,
            capacity_bytes,
            snapshot: Snapshot::empty(),
            filter,
            stale: false,
            consecutive_failures: 0,
            pending_escalations: HashMap::new(),
            notice: None,
            tx,
            rx,
            running: Arc::new(AtomicBool::new(true)),
        };
        if let Some(query) = engine.config.initial_query.clone() {
            engine.filter.set_query(&query);
        }
        engine
    }

    pub fn handle(&self) -> EngineHandle {
        EngineHandle {
            tx: self.tx.clone(),
        }
    }

    /// Shared flag for the Ctrl-C handler.
    pub fn running_flag(&self) -> Arc<AtomicBool> {
        Arc::clone(&self.running)
    }

    /// Query the source and reconcile into a fresh snapshot. On a transient
    /// query failure the previous snapshot stays in place and the frame is
    /// marked stale instead of flashing an empty table.
    fn refresh(&mut self) {
        match self.source.query() {
            Ok(raw) => {
                let ticks = self.source.ticks_per_second();
                self.snapshot = reconcile(&self.snapshot, raw, Instant::now(), ticks);
                self.stale = false;
                self.consecutive_failures = 0;
            }
            Err(e) => {
                self.consecutive_failures += 1;
                self.stale = true;
                log::warn!(
                    "process query failed ({} consecutive): {e:#}",
                    self.consecutive_failures
                );
            }
        }
    }

    fn frame(&self) -> Frame {
        let rows = visible_rows(&self.snapshot, &self.filter, &self.config.ignore)
            .into_iter()
            .map(|row| FrameRow {
                tier: status_tier(row, self.config.cpu_tier_percent, self.config.mem_tier_bytes),
                row: row.clone(),
            })
            .collect();

        Frame {
            rows,
            aggregate: aggregate(&self.snapshot, self.capacity_bytes),
            stale: self.stale,
            degraded: self.consecutive_failures >= DEGRADED_AFTER_FAILURES,
            notice: self.notice.clone(),
        }
    }

    fn handle_msg(&mut self, msg: EngineMsg) -> Flow {
        match msg {
            EngineMsg::Intent(intent) => self.handle_intent(intent),
            EngineMsg::Kill(update) => self.handle_kill_update(update),
        }
    }

    fn handle_intent(&mut self, intent: OperatorIntent) -> Flow {
        match intent {
            OperatorIntent::Refresh => Flow::RefreshNow,
            OperatorIntent::SetFilter(query) => {
                self.filter.set_query(&query);
                Flow::Continue
            }
            OperatorIntent::ClearFilter => {
                self.filter.clear_query();
                Flow::Continue
            }
            OperatorIntent::SetSort(key, dir) => {
                self.filter.set_sort(key, dir);
                Flow::Continue
            }
            OperatorIntent::RequestKill(identity, strength) => {
                self.request_kill(identity, strength);
                Flow::Continue
            }
            OperatorIntent::ConfirmEscalation(identity) => {
                self.confirm_escalation(identity);
                Flow::Continue
            }
            OperatorIntent::DeclineEscalation(identity) => {
                self.decline_escalation(identity);
                Flow::Continue
            }
            OperatorIntent::Quit => {
                self.running.store(false, Ordering::SeqCst);
                Flow::Quit
            }
        }
    }

    fn request_kill(&mut self, identity: ProcessIdentity, strength: KillStrength) {
        // Stale selection: the row vanished between render and key event
        let Some(row) = self.snapshot.get(identity) else {
            self.notice = Some(format!("process {identity} already gone"));
            return;
        };
        let name = row.name.clone();

        if self.config.dry_run {
            log::info!(
                "DRY RUN: would send {} to {} ({})",
                strength.as_str(),
                identity,
                sanitize_for_log(&name)
            );
            self.notice = Some(format!(
                "DRY RUN: {} not sent to {}",
                strength.as_str(),
                sanitize_for_log(&name)
            ));
            return;
        }

        let request = KillRequest::new(identity, name, strength, self.config.max_attempts);
        let tx = self.tx.clone();
        killer::spawn_kill(
            request,
            Arc::clone(&self.signaller),
            self.config.grace_period,
            self.config.auto_escalate,
            move |update| {
                let _ = tx.send(EngineMsg::Kill(update));
            },
        );
    }

    fn confirm_escalation(&mut self, identity: ProcessIdentity) {
        let Some(request) = self.pending_escalations.remove(&identity) else {
            log::debug!("no pending escalation for {identity}");
            return;
        };
        let tx = self.tx.clone();
        killer::spawn_escalation(
            request,
            Arc::clone(&self.signaller),
            self.config.grace_period,
            move |update| {
                let _ = tx.send(EngineMsg::Kill(update));
            },
        );
    }

    fn decline_escalation(&mut self, identity: ProcessIdentity) {
        let Some(mut request) = self.pending_escalations.remove(&identity) else {
            return;
        };
        // Pure transition, no thread needed
        request.on_event(KillEvent::EscalationDeclined);
        self.notice = Some(format!(
            "{} ({}) left running",
            identity,
            sanitize_for_log(&request.name)
        ));
    }

    fn handle_kill_update(&mut self, update: KillUpdate) -> Flow {
        match update {
            KillUpdate::AwaitingEscalation { request } => {
                self.notice = Some(format!(
                    "{} ({}) survived SIGTERM after {} attempt(s); confirm forced kill",
                    request.identity,
                    sanitize_for_log(&request.name),
                    request.attempts
                ));
                self.pending_escalations.insert(request.identity, request);
                Flow::Continue
            }
            KillUpdate::Finished { request, outcome } => {
                self.notice = Some(format!(
                    "{} ({}): {}",
                    request.identity,
                    sanitize_for_log(&request.name),
                    outcome.describe()
                ));
                // Out-of-band refresh so the row disappears without waiting
                // for the next periodic tick
                Flow::RefreshNow
            }
        }
    }

    /// Main loop: refresh, present, then wait for intents until the next
    /// tick deadline. `max_frames` bounds batch runs; `None` runs until
    /// Quit or the running flag clears.
    pub fn run<F: FnMut(&Frame)>(&mut self, mut present: F, max_frames: Option<u64>) -> Result<()> {
        let mut frames: u64 = 0;

        self.refresh();
        loop {
            let frame = self.frame();
            present(&frame);
            self.notice = None;
            frames += 1;

            if max_frames.is_some_and(|max| frames >= max) {
                return Ok(());
            }
            if !self.running.load(Ordering::SeqCst) {
                return Ok(());
            }

            let deadline = Instant::now() + self.config.refresh_interval;
            loop {
                let timeout = deadline.saturating_duration_since(Instant::now());
                if timeout.is_zero() {
                    break;
                }
                match self.rx.recv_timeout(timeout) {
                    Ok(msg) => match self.handle_msg(msg) {
                        Flow::Continue => {}
                        Flow::RefreshNow => break,
                        Flow::Quit => return Ok(()),
                    },
                    Err(RecvTimeoutError::Timeout) => break,
                    // The engine holds its own sender, so this is unreachable
                    // in practice; treat it as a tick anyway
                    Err(RecvTimeoutError::Disconnected) => break,
                }
            }

            if !self.running.load(Ordering::SeqCst) {
                return Ok(());
            }
            self.refresh();
        }
    }
}
