//! Global Live Override - admin-controlled Go Live flag and active slot
//!
//! Holds no transition logic. Every change is tagged with where it came
//! from so the sync bridge only re-broadcasts local changes.

use chrono::{DateTime, Utc};

use crate::activity::ActivityLog;
use crate::models::{AdminState, AdminStatePatch, LogEvent, NewLogEntry, SYSTEM_SLOT_ID};

/// Where an override change originated
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Origin {
    /// This session (admin surface)
    Local,
    /// Another session, delivered by the realtime transport
    Remote,
}

/// A change applied to the override
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum OverrideChange {
    GoLive { enabled: bool, origin: Origin },
    ActiveSlot { slot_id: Option<String>, origin: Origin },
}

impl OverrideChange {
    pub fn origin(&self) -> Origin {
        match self {
            OverrideChange::GoLive { origin, .. } | OverrideChange::ActiveSlot { origin, .. } => {
                *origin
            }
        }
    }

    pub fn is_local(&self) -> bool {
        self.origin() == Origin::Local
    }

    /// Partial write describing this change
    pub fn to_patch(&self) -> AdminStatePatch {
        match self {
            OverrideChange::GoLive { enabled, .. } => AdminStatePatch::go_live(*enabled),
            OverrideChange::ActiveSlot { slot_id, .. } => {
                AdminStatePatch::active_slot(slot_id.clone())
            }
        }
    }
}

/// The process-wide Go Live flag plus selected slot
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct GlobalLiveOverride {
    enabled: bool,
    active_slot_id: Option<String>,
}

impl GlobalLiveOverride {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn is_enabled(&self) -> bool {
        self.enabled
    }

    pub fn active_slot_id(&self) -> Option<&str> {
        self.active_slot_id.as_deref()
    }

    /// Is this slot the admin-selected slot?
    pub fn is_active(&self, slot_id: &str) -> bool {
        self.active_slot_id.as_deref() == Some(slot_id)
    }

    /// Document view of the override
    pub fn snapshot(&self) -> AdminState {
        AdminState {
            is_go_live_enabled: self.enabled,
            active_slot_id: self.active_slot_id.clone(),
        }
    }

    /// Set the Go Live flag and log the admin action, attributed to the
    /// active slot if any
    pub fn set(
        &mut self,
        enabled: bool,
        origin: Origin,
        log: &mut ActivityLog,
        now: DateTime<Utc>,
    ) -> OverrideChange {
        self.enabled = enabled;

        let slot_id = self
            .active_slot_id
            .clone()
            .unwrap_or_else(|| SYSTEM_SLOT_ID.to_string());
        let details = format!("Go Live {}", if enabled { "enabled" } else { "disabled" });
        log.append(NewLogEntry::new(slot_id, LogEvent::AdminAction, details).at(now));

        tracing::info!(enabled, origin = ?origin, "Go Live override set");
        OverrideChange::GoLive { enabled, origin }
    }

    /// Select (or clear) the active slot
    pub fn set_active_slot(&mut self, slot_id: Option<String>, origin: Origin) -> OverrideChange {
        self.active_slot_id = slot_id.clone();
        tracing::info!(slot_id = ?slot_id, origin = ?origin, "Active slot set");
        OverrideChange::ActiveSlot { slot_id, origin }
    }
}
