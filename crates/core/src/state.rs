//! Webinar state - the registry, activity log, override and engine together
//!
//! All mutation for one session goes through here so the registry only ever
//! sees mode writes from the engine and count writes from telemetry.

use chrono::{DateTime, Utc};

use crate::activity::ActivityLog;
use crate::engine::{ModeTransitionEngine, Transition};
use crate::error::{Error, Result};
use crate::invariants::{assert_slot_invariants, check_schedule};
use crate::live_override::{GlobalLiveOverride, Origin, OverrideChange};
use crate::models::{
    AdminStatePatch, LogEntry, Mode, NewLogEntry, Phase, SlotUpdate, TransitionState, WebinarSlot,
};
use crate::registry::SlotRegistry;
use crate::surfaces::PlayerEvent;

#[derive(Debug, Default)]
pub struct WebinarState {
    registry: SlotRegistry,
    log: ActivityLog,
    live_override: GlobalLiveOverride,
    engine: ModeTransitionEngine,
}

impl WebinarState {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_log_capacity(capacity: usize) -> Self {
        Self {
            log: ActivityLog::with_capacity(capacity),
            ..Self::default()
        }
    }

    /// Bulk-load slots and reset their machines.
    ///
    /// Slots are accepted as given; a switch time before the start time is
    /// reported but not rejected.
    pub fn initialize_slots(&mut self, slots: Vec<WebinarSlot>) {
        for slot in &slots {
            assert_slot_invariants(slot);
            if let Err(e) = check_schedule(slot) {
                tracing::warn!(slot_id = %slot.id, error = %e, "Loaded slot with inconsistent schedule");
            }
        }
        self.registry.initialize(slots);
        self.engine.load(self.registry.all());
    }

    pub fn slots(&self) -> &[WebinarSlot] {
        self.registry.all()
    }

    pub fn slot(&self, slot_id: &str) -> Result<&WebinarSlot> {
        self.registry
            .get(slot_id)
            .ok_or_else(|| Error::NotFound(format!("slot {}", slot_id)))
    }

    pub fn registry(&self) -> &SlotRegistry {
        &self.registry
    }

    pub fn live_override(&self) -> &GlobalLiveOverride {
        &self.live_override
    }

    pub fn activity(&self) -> &ActivityLog {
        &self.log
    }

    /// Latest `n` log entries, most recent first
    pub fn recent_logs(&self, n: usize) -> Vec<LogEntry> {
        self.log.recent(n)
    }

    /// Position in the log; pass to [`WebinarState::logs_since`] later
    pub fn log_mark(&self) -> u64 {
        self.log.appended()
    }

    pub fn logs_since(&self, mark: u64) -> Vec<LogEntry> {
        self.log.since(mark)
    }

    pub fn append_log(&mut self, entry: NewLogEntry) -> LogEntry {
        self.log.append(entry).clone()
    }

    /// Store an attendee count reported by a player surface
    pub fn record_attendee_count(&mut self, slot_id: &str, count: u32) -> bool {
        self.registry.update(&SlotUpdate::attendees(slot_id, count))
    }

    /// Route a player report to the registry or the log.
    ///
    /// Returns the log entry written, if any.
    pub fn apply_player_event(
        &mut self,
        slot_id: &str,
        event: &PlayerEvent,
        now: DateTime<Utc>,
    ) -> Option<LogEntry> {
        if let PlayerEvent::AttendeeCount(count) = event {
            self.record_attendee_count(slot_id, *count);
            return None;
        }
        let entry = event.log_entry(slot_id)?.at(now);
        Some(self.append_log(entry))
    }

    /// Set the Go Live flag (always logged)
    pub fn set_go_live(&mut self, enabled: bool, origin: Origin, now: DateTime<Utc>) -> OverrideChange {
        self.live_override.set(enabled, origin, &mut self.log, now)
    }

    pub fn set_active_slot(&mut self, slot_id: Option<String>, origin: Origin) -> OverrideChange {
        if let Some(id) = &slot_id {
            if !self.registry.contains(id) {
                tracing::warn!(slot_id = %id, "Selected slot is not registered");
            }
        }
        self.live_override.set_active_slot(slot_id, origin)
    }

    /// Apply an admin state document received from another session.
    ///
    /// Only fields present in the document that differ from the local
    /// override are applied, so echoes of our own writes and repeated
    /// snapshots change nothing.
    pub fn apply_remote(&mut self, doc: &AdminStatePatch, now: DateTime<Utc>) -> Vec<OverrideChange> {
        let mut changes = Vec::new();

        if let Some(slot_id) = &doc.active_slot_id {
            if self.live_override.active_slot_id() != slot_id.as_deref() {
                changes.push(self.set_active_slot(slot_id.clone(), Origin::Remote));
            }
        }
        if let Some(enabled) = doc.is_go_live_enabled {
            if self.live_override.is_enabled() != enabled {
                changes.push(self.set_go_live(enabled, Origin::Remote, now));
            }
        }

        changes
    }

    pub fn evaluate_slot(&mut self, slot_id: &str, now: DateTime<Utc>) -> Option<Transition> {
        let slot = self.registry.get(slot_id)?;
        self.engine
            .evaluate(slot, &self.live_override, &mut self.log, now)
    }

    pub fn evaluate_all(&mut self, now: DateTime<Utc>) -> Vec<Transition> {
        self.engine
            .evaluate_all(&self.registry, &self.live_override, &mut self.log, now)
    }

    pub fn settle(&mut self, transition: &Transition, now: DateTime<Utc>) -> Option<Mode> {
        self.engine.settle(transition, &mut self.registry, now)
    }

    pub fn transition_state(&self, slot_id: &str) -> TransitionState {
        self.engine.transition_state(slot_id)
    }

    pub fn phase(&self, slot_id: &str) -> Option<Phase> {
        self.engine.phase(slot_id)
    }

    pub fn in_flight(&self) -> Vec<Transition> {
        self.engine.in_flight().cloned().collect()
    }
}
