//! Developer guardrails and invariants
//!
//! Debug assertions for detecting impossible states during development.
//! These checks are compiled out in release builds. Schedule validation is
//! the one checked (non-debug) rule, applied to configured slots.

use crate::engine::SlotMachine;
use crate::error::{Error, Result};
use crate::models::WebinarSlot;

/// Validate that a slot machine's phase, notice and in-flight record agree
pub fn assert_machine_invariants(slot_id: &str, machine: &SlotMachine) {
    let transitioning = machine.phase().is_transitioning();

    // Idle notice implies nothing in flight
    debug_assert_eq!(
        machine.transition_state().is_transitioning,
        transitioning,
        "Slot {} notice disagrees with phase {:?}",
        slot_id,
        machine.phase()
    );

    debug_assert_eq!(
        machine.in_flight().is_some(),
        transitioning,
        "Slot {} in-flight record disagrees with phase {:?}",
        slot_id,
        machine.phase()
    );

    if let Some(t) = machine.in_flight() {
        debug_assert_eq!(
            t.target,
            machine.transition_state().target_mode,
            "Slot {} notice targets the wrong mode",
            slot_id
        );
    }
}

/// Validate that a slot's identity fields are present
pub fn assert_slot_invariants(slot: &WebinarSlot) {
    debug_assert!(!slot.id.trim().is_empty(), "Slot has empty id");
    debug_assert!(
        !slot.name.trim().is_empty(),
        "Slot {} has empty name",
        slot.id
    );
}

/// Check that a slot switches no earlier than it starts
pub fn check_schedule(slot: &WebinarSlot) -> Result<()> {
    if slot.scheduled_switch_time < slot.scheduled_start_time {
        return Err(Error::InvalidSchedule {
            slot_id: slot.id.clone(),
            start: slot.scheduled_start_time,
            switch: slot.scheduled_switch_time,
        });
    }
    Ok(())
}
