//! Activity log entry model

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Slot id used for events not tied to a slot
pub const SYSTEM_SLOT_ID: &str = "system";

/// Kind of logged event
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum LogEvent {
    AttendeeJoined,
    AttendeeLeft,
    ModeSwitched,
    AdminAction,
}

impl LogEvent {
    pub fn as_str(&self) -> &'static str {
        match self {
            LogEvent::AttendeeJoined => "attendee_joined",
            LogEvent::AttendeeLeft => "attendee_left",
            LogEvent::ModeSwitched => "mode_switched",
            LogEvent::AdminAction => "admin_action",
        }
    }
}

impl std::fmt::Display for LogEvent {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A stored activity log entry. Never mutated after creation.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LogEntry {
    pub id: Uuid,
    pub slot_id: String,
    pub timestamp: DateTime<Utc>,
    pub event: LogEvent,
    pub details: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub attendee_count: Option<u32>,
}

impl LogEntry {
    pub fn is_system(&self) -> bool {
        self.slot_id == SYSTEM_SLOT_ID
    }

    pub fn format_timestamp(&self) -> String {
        self.timestamp.format("%b %d, %Y %H:%M").to_string()
    }

    /// Remote record layout (id travels as the document key)
    pub fn to_record(&self) -> LogRecord {
        LogRecord {
            slot_id: self.slot_id.clone(),
            timestamp: self.timestamp,
            event: self.event,
            details: self.details.clone(),
            attendee_count: self.attendee_count,
        }
    }
}

/// An entry awaiting an id (and possibly a timestamp)
#[derive(Debug, Clone, PartialEq)]
pub struct NewLogEntry {
    pub slot_id: String,
    pub timestamp: Option<DateTime<Utc>>,
    pub event: LogEvent,
    pub details: String,
    pub attendee_count: Option<u32>,
}

impl NewLogEntry {
    pub fn new(slot_id: impl Into<String>, event: LogEvent, details: impl Into<String>) -> Self {
        Self {
            slot_id: slot_id.into(),
            timestamp: None,
            event,
            details: details.into(),
            attendee_count: None,
        }
    }

    pub fn system(event: LogEvent, details: impl Into<String>) -> Self {
        Self::new(SYSTEM_SLOT_ID, event, details)
    }

    pub fn at(mut self, timestamp: DateTime<Utc>) -> Self {
        self.timestamp = Some(timestamp);
        self
    }

    pub fn with_attendees(mut self, count: u32) -> Self {
        self.attendee_count = Some(count);
        self
    }
}

/// Log entry as written to the remote log collection
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LogRecord {
    pub slot_id: String,
    pub timestamp: DateTime<Utc>,
    pub event: LogEvent,
    pub details: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub attendee_count: Option<u32>,
}
