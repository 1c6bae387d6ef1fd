//! Live session credentials handed to the live player surface

use serde::{Deserialize, Serialize};

use super::WebinarSlot;
use crate::utils::extract_meeting_number;

/// Participant role in a live session
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[repr(u8)]
pub enum LiveRole {
    #[default]
    Attendee = 0,
    Host = 1,
}

impl LiveRole {
    pub fn as_number(self) -> u8 {
        self as u8
    }
}

/// Credentials for establishing a live session
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LiveSessionConfig {
    pub meeting_number: String,
    pub user_name: String,
    pub user_email: String,
    #[serde(default)]
    pub access_code: Option<String>,
    /// Where the participant lands after the session ends
    pub leave_url: String,
    pub role: LiveRole,
}

impl LiveSessionConfig {
    /// Attendee credentials for a slot
    pub fn for_slot(
        slot: &WebinarSlot,
        user_name: impl Into<String>,
        user_email: impl Into<String>,
        leave_url: impl Into<String>,
    ) -> Self {
        Self {
            meeting_number: extract_meeting_number(&slot.live_url),
            user_name: user_name.into(),
            user_email: user_email.into(),
            access_code: None,
            leave_url: leave_url.into(),
            role: LiveRole::Attendee,
        }
    }

    pub fn with_access_code(mut self, code: Option<String>) -> Self {
        self.access_code = code.filter(|c| !c.is_empty());
        self
    }

    pub fn as_host(mut self) -> Self {
        self.role = LiveRole::Host;
        self
    }

    pub fn has_meeting(&self) -> bool {
        !self.meeting_number.is_empty()
    }
}
