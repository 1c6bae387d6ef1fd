//! Slot registry - the set of webinar slots and their observable state
//!
//! Slots are bulk-loaded once at startup and never removed. Mutation is by
//! partial update only; the transition engine writes mode and switch time,
//! attendee telemetry writes counts.

use crate::models::{SlotUpdate, WebinarSlot};

/// Slot registry - central store of webinar slots, in load order
#[derive(Debug, Default, Clone)]
pub struct SlotRegistry {
    slots: Vec<WebinarSlot>,
}

impl SlotRegistry {
    /// Create an empty registry
    pub fn new() -> Self {
        Self { slots: Vec::new() }
    }

    /// Replace all content with the given slots
    pub fn initialize(&mut self, slots: Vec<WebinarSlot>) {
        for slot in &slots {
            tracing::debug!(slot_id = %slot.id, mode = %slot.current_mode, "Loaded slot");
        }
        tracing::info!(count = slots.len(), "Slot registry initialized");
        self.slots = slots;
    }

    /// All slots in load order
    pub fn all(&self) -> &[WebinarSlot] {
        &self.slots
    }

    /// Get a slot by ID
    pub fn get(&self, slot_id: &str) -> Option<&WebinarSlot> {
        self.slots.iter().find(|s| s.id == slot_id)
    }

    /// Check if a slot is registered
    pub fn contains(&self, slot_id: &str) -> bool {
        self.get(slot_id).is_some()
    }

    /// Get all slot IDs
    pub fn slot_ids(&self) -> impl Iterator<Item = &str> {
        self.slots.iter().map(|s| s.id.as_str())
    }

    /// Merge an update into the matching slot.
    ///
    /// Unknown IDs are ignored; returns whether a slot was updated.
    pub fn update(&mut self, update: &SlotUpdate) -> bool {
        match self.slots.iter_mut().find(|s| s.id == update.id) {
            Some(slot) => {
                slot.apply(update);
                true
            }
            None => {
                tracing::debug!(slot_id = %update.id, "Ignoring update for unknown slot");
                false
            }
        }
    }

    /// Get number of registered slots
    pub fn len(&self) -> usize {
        self.slots.len()
    }

    /// Check if registry is empty
    pub fn is_empty(&self) -> bool {
        self.slots.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::Mode;
    use chrono::{Duration, Utc};

    fn make_slot(id: &str) -> WebinarSlot {
        let now = Utc::now();
        WebinarSlot::new(id, format!("Slot {}", id), now, now + Duration::minutes(75))
    }

    #[test]
    fn test_initialize_replaces_content() {
        let mut registry = SlotRegistry::new();
        registry.initialize(vec![make_slot("a"), make_slot("b")]);
        assert_eq!(registry.len(), 2);

        registry.initialize(vec![make_slot("c")]);
        assert_eq!(registry.len(), 1);
        assert!(registry.contains("c"));
        assert!(!registry.contains("a"));
    }

    #[test]
    fn test_update_unknown_id_is_noop() {
        let mut registry = SlotRegistry::new();
        registry.initialize(vec![make_slot("a")]);
        let before = registry.all().to_vec();

        let updated = registry.update(&SlotUpdate::attendees("missing", 5));

        assert!(!updated);
        assert_eq!(registry.len(), 1);
        assert_eq!(registry.all(), before.as_slice());
    }

    #[test]
    fn test_partial_update() {
        let mut registry = SlotRegistry::new();
        registry.initialize(vec![make_slot("a"), make_slot("b")]);

        assert!(registry.update(&SlotUpdate::attendees("b", 42)));

        let b = registry.get("b").unwrap();
        assert_eq!(b.attendee_count, 42);
        assert_eq!(b.current_mode, Mode::Replay);
        assert_eq!(registry.get("a").unwrap().attendee_count, 0);
    }

    #[test]
    fn test_order_preserved() {
        let mut registry = SlotRegistry::new();
        registry.initialize(vec![make_slot("z"), make_slot("a"), make_slot("m")]);
        let ids: Vec<&str> = registry.slot_ids().collect();
        assert_eq!(ids, vec!["z", "a", "m"]);
    }
}
