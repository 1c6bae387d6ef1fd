//! Mode transition engine
//!
//! One state machine per slot, cycling `Replay -> TransitioningToLive -> Live
//! -> TransitioningToReplay -> Replay`. Evaluation decides whether a
//! transition should start; settling commits it. The engine never sleeps:
//! the session runtime owns the settle delay and calls [`ModeTransitionEngine::settle`]
//! when it elapses.
//!
//! Triggers, checked only while the slot is settled:
//! - scheduled: switch time reached, slot in `Replay`, override not forcing replay
//! - admin-on: Go Live enabled, slot active, slot in `Replay`
//! - admin-off: Go Live disabled, slot active, slot in `Live` held by the admin
//!
//! A slot is *held by the admin* when its settled mode came from an admin
//! trigger, or when Go Live was enabled while it was active and already live.
//! The override forces replay on a held slot in `Replay` while it stays active
//! with Go Live disabled.

use std::collections::HashMap;

use chrono::{DateTime, Utc};

use crate::activity::ActivityLog;
use crate::invariants::assert_machine_invariants;
use crate::live_override::GlobalLiveOverride;
use crate::models::{
    LogEvent, Mode, NewLogEntry, Phase, SlotUpdate, TransitionReason, TransitionState, WebinarSlot,
};
use crate::registry::SlotRegistry;

/// A started transition awaiting its settle delay
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Transition {
    pub slot_id: String,
    pub target: Mode,
    pub reason: TransitionReason,
    pub started_at: DateTime<Utc>,
    /// Engine-wide sequence, used to reject stale settle calls
    pub sequence: u64,
}

/// State machine for one slot
#[derive(Debug, Clone)]
pub struct SlotMachine {
    pub(crate) phase: Phase,
    pub(crate) held_by_admin: bool,
    pub(crate) transition: TransitionState,
    pub(crate) in_flight: Option<Transition>,
}

impl SlotMachine {
    /// Machine for a slot in its loaded mode
    pub fn from_mode(mode: Mode) -> Self {
        Self {
            phase: Phase::settled(mode),
            held_by_admin: false,
            transition: TransitionState::idle(),
            in_flight: None,
        }
    }

    pub fn phase(&self) -> Phase {
        self.phase
    }

    pub fn transition_state(&self) -> &TransitionState {
        &self.transition
    }

    pub fn in_flight(&self) -> Option<&Transition> {
        self.in_flight.as_ref()
    }

    pub fn is_held_by_admin(&self) -> bool {
        self.held_by_admin
    }
}

/// Decide which trigger, if any, fires for a settled slot.
///
/// Pure: reads the machine, slot and override, changes nothing.
pub fn decide(
    machine: &SlotMachine,
    slot: &WebinarSlot,
    live_override: &GlobalLiveOverride,
    now: DateTime<Utc>,
) -> Option<TransitionReason> {
    let active = live_override.is_active(&slot.id);
    let enabled = live_override.is_enabled();

    match machine.phase {
        Phase::TransitioningToLive | Phase::TransitioningToReplay => None,
        Phase::Replay => {
            if active && enabled {
                return Some(TransitionReason::AdminOverride);
            }
            let forced_replay = active && !enabled && machine.held_by_admin;
            if slot.switch_due(now) && !forced_replay {
                Some(TransitionReason::Scheduled)
            } else {
                None
            }
        }
        Phase::Live => {
            if active && !enabled && machine.held_by_admin {
                Some(TransitionReason::AdminDisabledOverride)
            } else {
                None
            }
        }
    }
}

/// Per-slot transition engine
#[derive(Debug, Default)]
pub struct ModeTransitionEngine {
    machines: HashMap<String, SlotMachine>,
    next_sequence: u64,
}

impl ModeTransitionEngine {
    pub fn new() -> Self {
        Self::default()
    }

    /// Reset machines from the slots' loaded modes
    pub fn load(&mut self, slots: &[WebinarSlot]) {
        self.machines = slots
            .iter()
            .map(|s| (s.id.clone(), SlotMachine::from_mode(s.current_mode)))
            .collect();
    }

    pub fn machine(&self, slot_id: &str) -> Option<&SlotMachine> {
        self.machines.get(slot_id)
    }

    pub fn phase(&self, slot_id: &str) -> Option<Phase> {
        self.machines.get(slot_id).map(|m| m.phase)
    }

    /// Viewer-facing transition notice for a slot (idle if unknown)
    pub fn transition_state(&self, slot_id: &str) -> TransitionState {
        self.machines
            .get(slot_id)
            .map(|m| m.transition.clone())
            .unwrap_or_default()
    }

    /// Transitions currently waiting to settle
    pub fn in_flight(&self) -> impl Iterator<Item = &Transition> {
        self.machines.values().filter_map(|m| m.in_flight.as_ref())
    }

    /// Evaluate one slot and start a transition if a trigger fires.
    ///
    /// Records the triggering reason in the log immediately. Returns `None`
    /// while a transition is in flight.
    pub fn evaluate(
        &mut self,
        slot: &WebinarSlot,
        live_override: &GlobalLiveOverride,
        log: &mut ActivityLog,
        now: DateTime<Utc>,
    ) -> Option<Transition> {
        let machine = self
            .machines
            .entry(slot.id.clone())
            .or_insert_with(|| SlotMachine::from_mode(slot.current_mode));

        if machine.phase.is_transitioning() {
            tracing::debug!(slot_id = %slot.id, phase = ?machine.phase, "Transition in flight, skipping evaluation");
            return None;
        }

        // Go Live on an already-live active slot: the admin now owns it
        if machine.phase == Phase::Live
            && live_override.is_enabled()
            && live_override.is_active(&slot.id)
        {
            machine.held_by_admin = true;
        }

        let reason = decide(machine, slot, live_override, now)?;
        let target = reason.target();

        self.next_sequence += 1;
        let transition = Transition {
            slot_id: slot.id.clone(),
            target,
            reason,
            started_at: now,
            sequence: self.next_sequence,
        };

        machine.phase = Phase::towards(target);
        machine.transition = TransitionState::switching_to(target);
        machine.in_flight = Some(transition.clone());
        assert_machine_invariants(&slot.id, machine);

        log.append(
            NewLogEntry::new(slot.id.clone(), LogEvent::ModeSwitched, reason.describe()).at(now),
        );
        tracing::info!(slot_id = %slot.id, target = %target, reason = ?reason, "Transition started");

        Some(transition)
    }

    /// Evaluate every registered slot independently
    pub fn evaluate_all(
        &mut self,
        registry: &SlotRegistry,
        live_override: &GlobalLiveOverride,
        log: &mut ActivityLog,
        now: DateTime<Utc>,
    ) -> Vec<Transition> {
        registry
            .all()
            .iter()
            .filter_map(|slot| self.evaluate(slot, live_override, log, now))
            .collect()
    }

    /// Commit an in-flight transition into the registry.
    ///
    /// Returns the committed mode, or `None` if `transition` is not the
    /// slot's current in-flight transition.
    pub fn settle(
        &mut self,
        transition: &Transition,
        registry: &mut SlotRegistry,
        now: DateTime<Utc>,
    ) -> Option<Mode> {
        let machine = self.machines.get_mut(&transition.slot_id)?;
        match &machine.in_flight {
            Some(current) if current.sequence == transition.sequence => {}
            _ => {
                tracing::debug!(slot_id = %transition.slot_id, "Ignoring stale settle");
                return None;
            }
        }

        let target = transition.target;
        registry.update(&SlotUpdate::mode_switch(
            transition.slot_id.clone(),
            target,
            now,
        ));

        machine.phase = Phase::settled(target);
        machine.held_by_admin = transition.reason.is_admin();
        machine.transition = TransitionState::idle();
        machine.in_flight = None;
        assert_machine_invariants(&transition.slot_id, machine);

        tracing::info!(slot_id = %transition.slot_id, mode = %target, "Transition settled");
        Some(target)
    }
}
