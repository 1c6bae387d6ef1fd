//! Session runtime
//!
//! One task per session drives the transition engine. It wakes on three
//! sources: a periodic schedule check, commands (override changes, remote
//! documents, player reports) and settle timers for in-flight transitions.
//! All engine work happens on this task, so evaluations never interleave.

use std::sync::Arc;

use liveswitch_core::{
    AdminStatePatch, LogEntry, Mode, Origin, OverrideChange, PlayerEvent, PlayerEventSink, Transition,
};
use tokio::sync::{broadcast, mpsc};
use tokio::time::Instant;
use tracing::{debug, info, warn};

use crate::state::AppState;

/// Event fan-out depth
const EVENT_QUEUE: usize = 256;

/// Requests to the session task
#[derive(Debug)]
enum SessionCommand {
    SetGoLive(bool),
    SelectSlot(Option<String>),
    ApplyRemote(AdminStatePatch),
    Player { slot_id: String, event: PlayerEvent },
    Evaluate,
    Shutdown,
}

/// What the session did
#[derive(Debug, Clone)]
pub enum SessionEvent {
    /// The override changed (locally or from another session)
    OverrideChanged(OverrideChange),
    /// A transition started; its notice is now visible
    TransitionStarted(Transition),
    /// A transition settled into the registry
    TransitionSettled { slot_id: String, mode: Mode },
    /// A log entry was appended
    LogAppended { entry: LogEntry, origin: Origin },
    /// A slot's attendee count changed
    AttendeesUpdated { slot_id: String, count: u32 },
    /// The session task stopped
    Stopped,
}

/// Handle to a running session
#[derive(Clone)]
pub struct SessionHandle {
    state: AppState,
    cmd_tx: mpsc::UnboundedSender<SessionCommand>,
    event_tx: broadcast::Sender<SessionEvent>,
}

impl SessionHandle {
    /// Start the session task; the first schedule check runs immediately
    pub fn start(state: AppState) -> Self {
        let (cmd_tx, cmd_rx) = mpsc::unbounded_channel();
        let (event_tx, _) = broadcast::channel(EVENT_QUEUE);

        info!(session_id = %state.session_id, slots = state.webinar().slots().len(), "Session started");
        tokio::spawn(session_task(state.clone(), cmd_rx, event_tx.clone()));

        Self {
            state,
            cmd_tx,
            event_tx,
        }
    }

    pub fn state(&self) -> &AppState {
        &self.state
    }

    /// Receive everything the session does from now on
    pub fn subscribe(&self) -> broadcast::Receiver<SessionEvent> {
        self.event_tx.subscribe()
    }

    /// Admin Go Live toggle
    pub fn set_go_live(&self, enabled: bool) {
        self.send(SessionCommand::SetGoLive(enabled));
    }

    /// Admin slot selection
    pub fn select_slot(&self, slot_id: Option<String>) {
        self.send(SessionCommand::SelectSlot(slot_id));
    }

    /// Admin state document received from another session; absent fields
    /// keep their local value
    pub fn apply_remote(&self, doc: AdminStatePatch) {
        self.send(SessionCommand::ApplyRemote(doc));
    }

    /// Report from a player surface
    pub fn report(&self, slot_id: impl Into<String>, event: PlayerEvent) {
        self.send(SessionCommand::Player {
            slot_id: slot_id.into(),
            event,
        });
    }

    /// Re-run the schedule check now
    pub fn evaluate(&self) {
        self.send(SessionCommand::Evaluate);
    }

    pub fn shutdown(&self) {
        self.send(SessionCommand::Shutdown);
    }

    pub fn is_running(&self) -> bool {
        !self.cmd_tx.is_closed()
    }

    fn send(&self, cmd: SessionCommand) {
        if self.cmd_tx.send(cmd).is_err() {
            debug!("Session task not running, command dropped");
        }
    }
}

impl PlayerEventSink for SessionHandle {
    fn emit(&self, slot_id: &str, event: PlayerEvent) {
        self.report(slot_id, event);
    }
}

/// Session task state that lives outside the shared webinar state
struct Runtime {
    state: AppState,
    events: broadcast::Sender<SessionEvent>,
    settle_delay: std::time::Duration,
    /// Started transitions and when they settle
    pending: Vec<(Instant, Transition)>,
}

impl Runtime {
    fn publish(&self, event: SessionEvent) {
        // No receivers is fine
        let _ = self.events.send(event);
    }

    /// Run `f` against the webinar state, then publish any log entries it
    /// appended
    fn with_log<T>(
        &self,
        origin: Origin,
        f: impl FnOnce(&mut liveswitch_core::WebinarState) -> T,
    ) -> T {
        let (result, appended) = {
            let mut webinar = self.state.webinar();
            let mark = webinar.log_mark();
            let result = f(&mut *webinar);
            (result, webinar.logs_since(mark))
        };
        for entry in appended {
            self.publish(SessionEvent::LogAppended { entry, origin });
        }
        result
    }

    fn start_transitions(&mut self, started: Vec<Transition>) {
        let settle_at = Instant::now() + self.settle_delay;
        for transition in started {
            self.pending.push((settle_at, transition.clone()));
            self.publish(SessionEvent::TransitionStarted(transition));
        }
    }

    fn evaluate_all(&mut self) {
        let now = self.state.clock.now();
        let started = self.with_log(Origin::Local, |w| w.evaluate_all(now));
        self.start_transitions(started);
    }

    fn evaluate_slot(&mut self, slot_id: &str) {
        let now = self.state.clock.now();
        let started = self.with_log(Origin::Local, |w| w.evaluate_slot(slot_id, now));
        self.start_transitions(started.into_iter().collect());
    }

    fn next_settle(&self) -> Option<Instant> {
        self.pending.iter().map(|(at, _)| *at).min()
    }

    /// Settle every due transition, then re-evaluate those slots
    fn settle_due(&mut self) {
        let now = Instant::now();
        let (due, waiting): (Vec<_>, Vec<_>) =
            self.pending.drain(..).partition(|(at, _)| *at <= now);
        self.pending = waiting;

        for (_, transition) in due {
            let wall_now = self.state.clock.now();
            let settled = self.state.webinar().settle(&transition, wall_now);
            if let Some(mode) = settled {
                self.publish(SessionEvent::TransitionSettled {
                    slot_id: transition.slot_id.clone(),
                    mode,
                });
                // Admin changes made while in flight apply now
                self.evaluate_slot(&transition.slot_id);
            }
        }
    }

    fn handle(&mut self, cmd: SessionCommand) -> bool {
        match cmd {
            SessionCommand::SetGoLive(enabled) => {
                let now = self.state.clock.now();
                let change = self.with_log(Origin::Local, |w| {
                    w.set_go_live(enabled, Origin::Local, now)
                });
                self.publish(SessionEvent::OverrideChanged(change));
                self.evaluate_all();
            }
            SessionCommand::SelectSlot(slot_id) => {
                let change = self.state.webinar().set_active_slot(slot_id, Origin::Local);
                self.publish(SessionEvent::OverrideChanged(change));
                self.evaluate_all();
            }
            SessionCommand::ApplyRemote(doc) => {
                let now = self.state.clock.now();
                let changes = self.with_log(Origin::Remote, |w| w.apply_remote(&doc, now));
                if changes.is_empty() {
                    debug!("Remote admin state matches local, nothing to apply");
                } else {
                    for change in changes {
                        self.publish(SessionEvent::OverrideChanged(change));
                    }
                    self.evaluate_all();
                }
            }
            SessionCommand::Player { slot_id, event } => {
                let now = self.state.clock.now();
                if let PlayerEvent::AttendeeCount(count) = event {
                    let count = count.min(self.state.config.webinar.max_attendees);
                    if self.state.webinar().record_attendee_count(&slot_id, count) {
                        self.publish(SessionEvent::AttendeesUpdated { slot_id, count });
                    }
                } else {
                    self.with_log(Origin::Local, |w| w.apply_player_event(&slot_id, &event, now));
                }
            }
            SessionCommand::Evaluate => self.evaluate_all(),
            SessionCommand::Shutdown => return false,
        }
        true
    }
}

async fn sleep_until_or_forever(at: Option<Instant>) {
    match at {
        Some(at) => tokio::time::sleep_until(at).await,
        None => std::future::pending().await,
    }
}

/// Main session task
async fn session_task(
    state: AppState,
    mut cmd_rx: mpsc::UnboundedReceiver<SessionCommand>,
    events: broadcast::Sender<SessionEvent>,
) {
    let mut runtime = Runtime {
        settle_delay: state.config.webinar.settle_delay(),
        state,
        events,
        pending: Vec::new(),
    };

    let mut schedule = tokio::time::interval(runtime.state.config.webinar.schedule_check_interval());
    schedule.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Delay);

    loop {
        let next_settle = runtime.next_settle();

        tokio::select! {
            _ = schedule.tick() => {
                debug!("Schedule check");
                runtime.evaluate_all();
            }

            cmd = cmd_rx.recv() => {
                match cmd {
                    Some(cmd) => {
                        if !runtime.handle(cmd) {
                            break;
                        }
                    }
                    None => break,
                }
            }

            _ = sleep_until_or_forever(next_settle) => {
                runtime.settle_due();
            }
        }
    }

    if !runtime.pending.is_empty() {
        warn!(pending = runtime.pending.len(), "Session stopped with transitions in flight");
    }
    runtime.publish(SessionEvent::Stopped);
    info!(session_id = %runtime.state.session_id, "Session stopped");
}

/// Sink that forwards player reports to a session
pub fn player_sink(session: &SessionHandle) -> Arc<dyn PlayerEventSink> {
    Arc::new(session.clone())
}
