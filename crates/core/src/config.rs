//! Session configuration
//!
//! Loaded from `liveswitch.toml`. Every field has a default, so an empty file
//! (or no file at all) yields a working setup.

use std::path::{Path, PathBuf};
use std::time::Duration;

use chrono::{DateTime, Utc};
use directories::ProjectDirs;
use serde::{Deserialize, Serialize};

use crate::activity::DEFAULT_LOG_CAPACITY;
use crate::error::{Error, Result};
use crate::invariants::check_schedule;
use crate::models::{Mode, WebinarSlot};
use crate::utils::{is_valid_live_url, is_valid_replay_url};

pub const CONFIG_FILE_NAME: &str = "liveswitch.toml";

/// Top-level configuration
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    pub webinar: WebinarSettings,
    pub admin: AdminSettings,
    pub sync: SyncSettings,
    pub viewer: ViewerSettings,
    pub slots: Vec<SlotConfig>,
}

/// Scheduling behaviour
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct WebinarSettings {
    /// Delay between starting and settling a transition
    pub settle_delay_ms: u64,
    /// Periodic schedule check interval
    pub schedule_check_secs: u64,
    pub log_capacity: usize,
    pub max_attendees: u32,
    pub default_duration_mins: u32,
    /// Use the simulated replay player instead of the embedded widget
    pub use_mock_replay: bool,
}

impl Default for WebinarSettings {
    fn default() -> Self {
        Self {
            settle_delay_ms: 2000,
            schedule_check_secs: 60,
            log_capacity: DEFAULT_LOG_CAPACITY,
            max_attendees: 1000,
            default_duration_mins: 90,
            use_mock_replay: false,
        }
    }
}

impl WebinarSettings {
    pub fn settle_delay(&self) -> Duration {
        Duration::from_millis(self.settle_delay_ms)
    }

    pub fn schedule_check_interval(&self) -> Duration {
        Duration::from_secs(self.schedule_check_secs.max(1))
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct AdminSettings {
    pub password: String,
}

impl Default for AdminSettings {
    fn default() -> Self {
        Self {
            password: "admin123".to_string(),
        }
    }
}

/// Realtime document hub settings
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SyncSettings {
    pub hub_addr: String,
    pub admin_state_key: String,
    pub log_collection: String,
}

impl Default for SyncSettings {
    fn default() -> Self {
        Self {
            hub_addr: "127.0.0.1:7440".to_string(),
            admin_state_key: "admin/state".to_string(),
            log_collection: "logs".to_string(),
        }
    }
}

/// Identity presented to the live session
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ViewerSettings {
    pub display_name: String,
    pub email: String,
    pub leave_url: String,
}

impl Default for ViewerSettings {
    fn default() -> Self {
        Self {
            display_name: "Webinar Attendee".to_string(),
            email: "attendee@webinar.com".to_string(),
            leave_url: "http://localhost:3000".to_string(),
        }
    }
}

/// A `[[slots]]` entry
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SlotConfig {
    pub id: String,
    pub name: String,
    #[serde(default)]
    pub replay_url: String,
    #[serde(default)]
    pub live_url: String,
    pub scheduled_start_time: DateTime<Utc>,
    pub scheduled_switch_time: DateTime<Utc>,
    #[serde(default)]
    pub access_code: Option<String>,
    #[serde(default)]
    pub current_mode: Mode,
}

impl SlotConfig {
    pub fn to_slot(&self) -> WebinarSlot {
        WebinarSlot::new(
            self.id.clone(),
            self.name.clone(),
            self.scheduled_start_time,
            self.scheduled_switch_time,
        )
        .with_sources(self.replay_url.clone(), self.live_url.clone())
        .with_mode(self.current_mode)
    }
}

impl Config {
    /// Load configuration from a file
    pub fn load(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)?;
        let config = Self::from_toml_str(&content)?;
        tracing::info!(path = %path.display(), slots = config.slots.len(), "Loaded configuration");
        Ok(config)
    }

    pub fn from_toml_str(content: &str) -> Result<Self> {
        Ok(toml::from_str(content)?)
    }

    /// Platform config location
    pub fn default_path() -> Result<PathBuf> {
        let dirs = ProjectDirs::from("dev", "liveswitch", "liveswitch").ok_or_else(|| {
            Error::Io(std::io::Error::new(
                std::io::ErrorKind::NotFound,
                "Could not determine config directory",
            ))
        })?;

        Ok(dirs.config_dir().join(CONFIG_FILE_NAME))
    }

    /// Load from the default path, falling back to defaults if absent
    pub fn load_or_default() -> Result<Self> {
        let path = Self::default_path()?;
        if path.exists() {
            Self::load(&path)
        } else {
            tracing::debug!(path = %path.display(), "No configuration file, using defaults");
            Ok(Self::default())
        }
    }

    /// Configured slots, in file order, with validated schedules
    pub fn slots(&self) -> Result<Vec<WebinarSlot>> {
        let mut seen = std::collections::HashSet::new();
        let mut slots = Vec::with_capacity(self.slots.len());

        for entry in &self.slots {
            if entry.id.trim().is_empty() || entry.name.trim().is_empty() {
                return Err(Error::Config("Slot id and name must not be empty".into()));
            }
            if !seen.insert(entry.id.as_str()) {
                return Err(Error::Config(format!("Duplicate slot id '{}'", entry.id)));
            }
            let slot = entry.to_slot();
            check_schedule(&slot)?;
            if !slot.replay_url.is_empty() && !is_valid_replay_url(&slot.replay_url) {
                tracing::warn!(slot_id = %slot.id, url = %slot.replay_url, "Unrecognized replay source");
            }
            if !slot.live_url.is_empty() && !is_valid_live_url(&slot.live_url) {
                tracing::warn!(slot_id = %slot.id, url = %slot.live_url, "Unrecognized live source");
            }
            slots.push(slot);
        }

        Ok(slots)
    }

    /// Access code configured for a slot, if any
    pub fn access_code(&self, slot_id: &str) -> Option<&str> {
        self.slots
            .iter()
            .find(|s| s.id == slot_id)
            .and_then(|s| s.access_code.as_deref())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const SAMPLE: &str = r#"
[webinar]
settle_delay_ms = 500

[[slots]]
id = "morning_sales_training"
name = "Morning Webinar - Sales Training"
replay_url = "https://demo.everwebinar.com/session/sales-training-12345"
live_url = "https://zoom.us/j/123456789"
scheduled_start_time = "2026-10-19T09:00:00Z"
scheduled_switch_time = "2026-10-19T10:15:00Z"
access_code = "abc"
"#;

    #[test]
    fn test_empty_config_uses_defaults() {
        let config = Config::from_toml_str("").unwrap();
        assert_eq!(config, Config::default());
        assert_eq!(config.webinar.settle_delay(), Duration::from_millis(2000));
        assert_eq!(config.webinar.log_capacity, 100);
        assert_eq!(config.sync.admin_state_key, "admin/state");
    }

    #[test]
    fn test_parse_slots() {
        let config = Config::from_toml_str(SAMPLE).unwrap();
        assert_eq!(config.webinar.settle_delay_ms, 500);
        assert_eq!(config.webinar.schedule_check_secs, 60);

        let slots = config.slots().unwrap();
        assert_eq!(slots.len(), 1);
        assert_eq!(slots[0].current_mode, Mode::Replay);
        assert_eq!(slots[0].live_url, "https://zoom.us/j/123456789");
        assert_eq!(config.access_code("morning_sales_training"), Some("abc"));
    }

    #[test]
    fn test_switch_before_start_rejected() {
        let bad = SAMPLE.replace("10:15:00Z", "08:00:00Z");
        let config = Config::from_toml_str(&bad).unwrap();
        assert!(matches!(config.slots(), Err(Error::InvalidSchedule { .. })));
    }

    #[test]
    fn test_duplicate_ids_rejected() {
        let doubled = format!("{}\n{}", SAMPLE, &SAMPLE[SAMPLE.find("[[slots]]").unwrap()..]);
        let config = Config::from_toml_str(&doubled).unwrap();
        assert!(matches!(config.slots(), Err(Error::Config(_))));
    }

    #[test]
    fn test_load_from_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join(CONFIG_FILE_NAME);
        std::fs::write(&path, SAMPLE).unwrap();

        let config = Config::load(&path).unwrap();
        assert_eq!(config.slots.len(), 1);
        assert!(Config::load(&dir.path().join("missing.toml")).is_err());
    }
}
