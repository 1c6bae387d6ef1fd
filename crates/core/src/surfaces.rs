//! Player surface capabilities
//!
//! The replay and live players are external widgets. They are driven through
//! these traits and report back through a [`PlayerEventSink`]; nothing in the
//! engine depends on a concrete widget.

use std::sync::Arc;

use serde::Deserialize;

use crate::error::SurfaceError;
use crate::models::{LiveSessionConfig, LogEvent, NewLogEntry};
use crate::utils::origin_of;

/// Something a player surface reports
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PlayerEvent {
    /// Audience size changed
    AttendeeCount(u32),
    /// Viewer joined or a session step succeeded
    Joined {
        details: String,
        attendee_count: Option<u32>,
    },
    /// Viewer left the session
    Left { details: String },
    /// A call-to-action was clicked
    CtaClicked(String),
    /// Other log-worthy surface notice
    Notice(String),
}

impl PlayerEvent {
    pub fn joined(details: impl Into<String>) -> Self {
        PlayerEvent::Joined {
            details: details.into(),
            attendee_count: None,
        }
    }

    /// Log entry for this event; attendee counts are telemetry, not log entries
    pub fn log_entry(&self, slot_id: &str) -> Option<NewLogEntry> {
        let entry = match self {
            PlayerEvent::AttendeeCount(_) => return None,
            PlayerEvent::Joined {
                details,
                attendee_count,
            } => {
                let entry = NewLogEntry::new(slot_id, LogEvent::AttendeeJoined, details.clone());
                match attendee_count {
                    Some(count) => entry.with_attendees(*count),
                    None => entry,
                }
            }
            PlayerEvent::Left { details } => {
                NewLogEntry::new(slot_id, LogEvent::AttendeeLeft, details.clone())
            }
            PlayerEvent::CtaClicked(name) => NewLogEntry::new(
                slot_id,
                LogEvent::AdminAction,
                format!("CTA clicked: {}", name),
            ),
            PlayerEvent::Notice(details) => {
                NewLogEntry::new(slot_id, LogEvent::AdminAction, details.clone())
            }
        };
        Some(entry)
    }

    /// Parse a message posted by an embedded replay widget.
    ///
    /// Messages from any origin other than the replay source's, non-JSON
    /// payloads and unknown message types are ignored.
    pub fn parse_message(origin: &str, replay_source: &str, raw: &str) -> Option<Self> {
        let expected = origin_of(replay_source)?;
        if origin_of(origin)? != expected {
            return None;
        }

        match serde_json::from_str::<WidgetMessage>(raw).ok()? {
            WidgetMessage::AttendeeCount { count } => Some(PlayerEvent::AttendeeCount(count)),
            WidgetMessage::CtaClicked { cta_name } => Some(PlayerEvent::CtaClicked(cta_name)),
        }
    }
}

#[derive(Debug, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
enum WidgetMessage {
    AttendeeCount {
        count: u32,
    },
    CtaClicked {
        #[serde(rename = "ctaName")]
        cta_name: String,
    },
}

/// Receiver of player reports. Must not block.
pub trait PlayerEventSink: Send + Sync {
    fn emit(&self, slot_id: &str, event: PlayerEvent);
}

/// Pre-recorded content player
pub trait ReplaySurface: Send {
    /// Start rendering `source` for a slot
    fn load(
        &mut self,
        slot_id: &str,
        source: &str,
        sink: Arc<dyn PlayerEventSink>,
    ) -> Result<(), SurfaceError>;

    /// Stop rendering and release the widget
    fn unload(&mut self);
}

/// Real-time session player
pub trait LiveSurface: Send {
    /// Initialize, join and start a live session.
    ///
    /// Each step fails with its own [`SurfaceError`] variant.
    fn connect(
        &mut self,
        slot_id: &str,
        config: &LiveSessionConfig,
        sink: Arc<dyn PlayerEventSink>,
    ) -> Result<(), SurfaceError>;

    /// Leave the session
    fn disconnect(&mut self);
}

#[cfg(test)]
mod tests {
    use super::*;

    const SOURCE: &str = "https://demo.everwebinar.com/session/sales-training-12345";

    #[test]
    fn test_parse_attendee_count() {
        let event = PlayerEvent::parse_message(
            "https://demo.everwebinar.com",
            SOURCE,
            r#"{"type":"attendee_count","count":17}"#,
        );
        assert_eq!(event, Some(PlayerEvent::AttendeeCount(17)));
    }

    #[test]
    fn test_parse_cta() {
        let event = PlayerEvent::parse_message(
            "https://demo.everwebinar.com",
            SOURCE,
            r#"{"type":"cta_clicked","ctaName":"Download Guide"}"#,
        )
        .unwrap();

        let entry = event.log_entry("morning").unwrap();
        assert_eq!(entry.details, "CTA clicked: Download Guide");
        assert_eq!(entry.event, LogEvent::AdminAction);
    }

    #[test]
    fn test_malformed_messages_ignored() {
        let origin = "https://demo.everwebinar.com";
        assert!(PlayerEvent::parse_message(origin, SOURCE, "not json").is_none());
        assert!(PlayerEvent::parse_message(origin, SOURCE, r#"{"type":"volume","level":3}"#).is_none());
        assert!(PlayerEvent::parse_message(origin, SOURCE, r#"{"type":"attendee_count","count":-1}"#).is_none());
        assert!(PlayerEvent::parse_message(
            "https://evil.example",
            SOURCE,
            r#"{"type":"attendee_count","count":3}"#
        )
        .is_none());
    }

    #[test]
    fn test_attendee_count_not_logged() {
        assert!(PlayerEvent::AttendeeCount(3).log_entry("a").is_none());
    }
}
