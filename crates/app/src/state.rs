//! Application state management

use std::path::PathBuf;
use std::sync::{Arc, Mutex, MutexGuard};

use directories::ProjectDirs;
use liveswitch_core::sample::sample_slots;
use liveswitch_core::{
    AdminGate, Clock, Config, Error, PasswordGate, Result, SystemClock, WebinarSlot, WebinarState,
};
use tracing::info;
use uuid::Uuid;

/// Everything one webinar session owns
#[derive(Clone)]
pub struct AppState {
    pub session_id: Uuid,
    pub config: Arc<Config>,
    pub webinar: Arc<Mutex<WebinarState>>,
    pub clock: Arc<dyn Clock>,
    pub gate: Arc<dyn AdminGate>,
}

impl AppState {
    /// Session state from configuration, with configured slots loaded
    pub fn new(config: Config) -> Result<Self> {
        Self::with_clock(config, Arc::new(SystemClock))
    }

    /// With no `[[slots]]` configured, the demo schedule is loaded
    pub fn with_clock(config: Config, clock: Arc<dyn Clock>) -> Result<Self> {
        let slots = if config.slots.is_empty() {
            info!("No slots configured, loading demo schedule");
            sample_slots(clock.now())
        } else {
            config.slots()?
        };
        let gate = PasswordGate::new(&config.admin.password)?;

        let mut webinar = WebinarState::with_log_capacity(config.webinar.log_capacity);
        webinar.initialize_slots(slots);

        Ok(Self {
            session_id: Uuid::new_v4(),
            config: Arc::new(config),
            webinar: Arc::new(Mutex::new(webinar)),
            clock,
            gate: Arc::new(gate),
        })
    }

    /// Replace the loaded slots (unvalidated)
    pub fn load_slots(&self, slots: Vec<WebinarSlot>) {
        self.webinar().initialize_slots(slots);
    }

    /// Lock the webinar state, recovering from a poisoned lock
    pub fn webinar(&self) -> MutexGuard<'_, WebinarState> {
        self.webinar.lock().unwrap_or_else(|e| e.into_inner())
    }

    pub fn data_path() -> Result<PathBuf> {
        let dirs = ProjectDirs::from("dev", "liveswitch", "liveswitch").ok_or_else(|| {
            Error::Io(std::io::Error::new(
                std::io::ErrorKind::NotFound,
                "Could not determine data directory",
            ))
        })?;

        Ok(dirs.data_dir().to_path_buf())
    }

    /// Where a persistent hub keeps its database
    pub fn hub_database_path() -> Result<PathBuf> {
        let dir = Self::data_path()?;
        std::fs::create_dir_all(&dir)?;
        Ok(dir.join("hub.db"))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_new_loads_configured_slots() {
        let config = Config::from_toml_str(
            r#"
[[slots]]
id = "morning"
name = "Morning"
scheduled_start_time = "2026-10-19T09:00:00Z"
scheduled_switch_time = "2026-10-19T10:15:00Z"
"#,
        )
        .unwrap();

        let state = AppState::new(config).unwrap();
        assert_eq!(state.webinar().slots().len(), 1);
        assert!(state.gate.verify("admin123"));
    }

    #[test]
    fn test_demo_schedule_without_slots() {
        let state = AppState::new(Config::default()).unwrap();
        let webinar = state.webinar();
        assert_eq!(webinar.slots().len(), 3);
        assert!(webinar.slot("morning_sales_training").is_ok());
    }

    #[test]
    fn test_invalid_schedule_rejected() {
        let config = Config::from_toml_str(
            r#"
[[slots]]
id = "morning"
name = "Morning"
scheduled_start_time = "2026-10-19T09:00:00Z"
scheduled_switch_time = "2026-10-19T08:00:00Z"
"#,
        )
        .unwrap();

        assert!(matches!(
            AppState::new(config),
            Err(Error::InvalidSchedule { .. })
        ));
    }
}
