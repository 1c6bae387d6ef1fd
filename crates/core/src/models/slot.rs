//! Webinar slot model - one scheduled webinar occurrence

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Presentation mode of a slot
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum Mode {
    /// Pre-recorded content
    #[default]
    Replay,
    /// Real-time session
    Live,
}

impl Mode {
    pub fn as_str(&self) -> &'static str {
        match self {
            Mode::Replay => "replay",
            Mode::Live => "live",
        }
    }

    /// Badge text shown on player and dashboard
    pub fn badge(&self) -> &'static str {
        match self {
            Mode::Replay => "REPLAY",
            Mode::Live => "LIVE",
        }
    }

    pub fn opposite(self) -> Self {
        match self {
            Mode::Replay => Mode::Live,
            Mode::Live => Mode::Replay,
        }
    }
}

impl std::fmt::Display for Mode {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A schedulable webinar slot
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct WebinarSlot {
    pub id: String,
    pub name: String,
    /// Replay content reference
    #[serde(alias = "everwebinarUrl")]
    pub replay_url: String,
    /// Live session reference
    #[serde(alias = "zoomUrl")]
    pub live_url: String,
    pub scheduled_start_time: DateTime<Utc>,
    /// Instant at which replay yields to live absent an override
    pub scheduled_switch_time: DateTime<Utc>,
    pub is_active: bool,
    pub current_mode: Mode,
    pub attendee_count: u32,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub last_switch_time: Option<DateTime<Utc>>,
}

impl WebinarSlot {
    pub fn new(
        id: impl Into<String>,
        name: impl Into<String>,
        scheduled_start_time: DateTime<Utc>,
        scheduled_switch_time: DateTime<Utc>,
    ) -> Self {
        Self {
            id: id.into(),
            name: name.into(),
            replay_url: String::new(),
            live_url: String::new(),
            scheduled_start_time,
            scheduled_switch_time,
            is_active: true,
            current_mode: Mode::Replay,
            attendee_count: 0,
            last_switch_time: None,
        }
    }

    pub fn with_sources(mut self, replay_url: impl Into<String>, live_url: impl Into<String>) -> Self {
        self.replay_url = replay_url.into();
        self.live_url = live_url.into();
        self
    }

    pub fn with_mode(mut self, mode: Mode) -> Self {
        self.current_mode = mode;
        self
    }

    /// Has the scheduled switch instant been reached?
    pub fn switch_due(&self, now: DateTime<Utc>) -> bool {
        now >= self.scheduled_switch_time
    }

    /// Merge the supplied fields, leaving the rest untouched
    pub fn apply(&mut self, update: &SlotUpdate) {
        if let Some(name) = &update.name {
            self.name = name.clone();
        }
        if let Some(is_active) = update.is_active {
            self.is_active = is_active;
        }
        if let Some(mode) = update.current_mode {
            self.current_mode = mode;
        }
        if let Some(count) = update.attendee_count {
            self.attendee_count = count;
        }
        if let Some(at) = update.last_switch_time {
            self.last_switch_time = Some(at);
        }
    }
}

/// Partial update addressed to one slot
#[derive(Debug, Clone, Default, PartialEq)]
pub struct SlotUpdate {
    pub id: String,
    pub name: Option<String>,
    pub is_active: Option<bool>,
    pub current_mode: Option<Mode>,
    pub attendee_count: Option<u32>,
    pub last_switch_time: Option<DateTime<Utc>>,
}

impl SlotUpdate {
    pub fn new(id: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            ..Default::default()
        }
    }

    /// Mode commit written by the transition engine
    pub fn mode_switch(id: impl Into<String>, mode: Mode, at: DateTime<Utc>) -> Self {
        Self {
            current_mode: Some(mode),
            last_switch_time: Some(at),
            ..Self::new(id)
        }
    }

    /// Attendee telemetry
    pub fn attendees(id: impl Into<String>, count: u32) -> Self {
        Self {
            attendee_count: Some(count),
            ..Self::new(id)
        }
    }

    pub fn touches_mode(&self) -> bool {
        self.current_mode.is_some()
    }
}
