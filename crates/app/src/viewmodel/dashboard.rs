//! Admin dashboard view model

use liveswitch_core::utils::time_remaining_label;
use liveswitch_core::{Error, LogEntry, Result, WebinarSlot};
use tracing::{info, warn};

use crate::session::SessionHandle;

/// Entries shown in the recent activity panel
pub const RECENT_ACTIVITY: usize = 10;

/// One slot in the slot list
#[derive(Debug, Clone, PartialEq)]
pub struct SlotCard {
    pub id: String,
    pub name: String,
    pub badge: &'static str,
    pub selected: bool,
    pub switching: bool,
    pub attendee_count: u32,
    pub starts_at: String,
    /// "1h 15m remaining" until the scheduled switch
    pub switch_label: String,
}

/// Status panel for the selected slot
#[derive(Debug, Clone, PartialEq)]
pub struct SlotStatus {
    pub name: String,
    pub badge: &'static str,
    pub attendee_count: u32,
    pub last_switch: Option<String>,
}

/// One row of the activity panel
#[derive(Debug, Clone, PartialEq)]
pub struct LogLine {
    pub time: String,
    pub slot_id: String,
    pub event: String,
    pub details: String,
    pub attendee_count: Option<u32>,
}

impl From<&LogEntry> for LogLine {
    fn from(entry: &LogEntry) -> Self {
        Self {
            time: entry.format_timestamp(),
            slot_id: entry.slot_id.clone(),
            event: entry.event.to_string(),
            details: entry.details.clone(),
            attendee_count: entry.attendee_count,
        }
    }
}

pub struct AdminDashboard {
    session: SessionHandle,
    authenticated: bool,
    login_error: Option<String>,
}

impl AdminDashboard {
    pub fn new(session: SessionHandle) -> Self {
        Self {
            session,
            authenticated: false,
            login_error: None,
        }
    }

    /// Check the shared admin secret
    pub fn login(&mut self, attempt: &str) -> bool {
        self.authenticated = self.session.state().gate.verify(attempt);
        if self.authenticated {
            info!(session_id = %self.session.state().session_id, "Admin logged in");
            self.login_error = None;
        } else {
            self.login_error = Some("Invalid password".to_string());
        }
        self.authenticated
    }

    pub fn logout(&mut self) {
        self.authenticated = false;
    }

    pub fn is_authenticated(&self) -> bool {
        self.authenticated
    }

    pub fn login_error(&self) -> Option<&str> {
        self.login_error.as_deref()
    }

    fn require_admin(&self) -> Result<()> {
        if self.authenticated {
            Ok(())
        } else {
            warn!("Admin control used without login");
            Err(Error::Authentication("admin login required".into()))
        }
    }

    pub fn is_go_live_enabled(&self) -> bool {
        self.session.state().webinar().live_override().is_enabled()
    }

    pub fn active_slot_id(&self) -> Option<String> {
        self.session
            .state()
            .webinar()
            .live_override()
            .active_slot_id()
            .map(str::to_string)
    }

    pub fn set_go_live(&self, enabled: bool) -> Result<()> {
        self.require_admin()?;
        self.session.set_go_live(enabled);
        Ok(())
    }

    /// Flip Go Live; returns the new value
    pub fn toggle_go_live(&self) -> Result<bool> {
        let enabled = !self.is_go_live_enabled();
        self.set_go_live(enabled)?;
        Ok(enabled)
    }

    /// Select the slot Go Live applies to
    pub fn select_slot(&self, slot_id: Option<&str>) -> Result<()> {
        self.require_admin()?;
        if let Some(id) = slot_id {
            self.session.state().webinar().slot(id)?;
        }
        self.session.select_slot(slot_id.map(str::to_string));
        Ok(())
    }

    pub fn slot_cards(&self) -> Vec<SlotCard> {
        let state = self.session.state();
        let now = state.clock.now();
        let webinar = state.webinar();
        let selected = webinar.live_override().active_slot_id();

        webinar
            .slots()
            .iter()
            .map(|slot| SlotCard {
                id: slot.id.clone(),
                name: slot.name.clone(),
                badge: slot.current_mode.badge(),
                selected: selected == Some(slot.id.as_str()),
                switching: webinar.transition_state(&slot.id).is_transitioning,
                attendee_count: slot.attendee_count,
                starts_at: slot.scheduled_start_time.format("%H:%M").to_string(),
                switch_label: time_remaining_label(now, slot.scheduled_switch_time),
            })
            .collect()
    }

    /// Status of the selected slot, if any
    pub fn selected_status(&self) -> Option<SlotStatus> {
        let webinar = self.session.state().webinar();
        let id = webinar.live_override().active_slot_id()?;
        let slot: &WebinarSlot = webinar.slot(id).ok()?;
        Some(SlotStatus {
            name: slot.name.clone(),
            badge: slot.current_mode.badge(),
            attendee_count: slot.attendee_count,
            last_switch: slot
                .last_switch_time
                .map(|t| t.format("%b %d, %Y %H:%M").to_string()),
        })
    }

    /// Most recent activity first
    pub fn recent_activity(&self) -> Vec<LogLine> {
        self.session
            .state()
            .webinar()
            .recent_logs(RECENT_ACTIVITY)
            .iter()
            .map(LogLine::from)
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::state::AppState;
    use chrono::{Duration as ChronoDuration, Utc};
    use liveswitch_core::{Config, ManualClock, Mode};
    use std::sync::Arc;
    use std::time::Duration;

    fn dashboard() -> AdminDashboard {
        let now = Utc::now();
        let state =
            AppState::with_clock(Config::default(), Arc::new(ManualClock::new(now))).unwrap();
        state.load_slots(vec![
            WebinarSlot::new("morning", "Morning", now, now + ChronoDuration::minutes(75)),
            WebinarSlot::new("afternoon", "Afternoon", now, now + ChronoDuration::hours(5)),
        ]);
        AdminDashboard::new(SessionHandle::start(state))
    }

    #[tokio::test(start_paused = true)]
    async fn test_controls_need_login() {
        let mut dash = dashboard();
        assert!(matches!(dash.set_go_live(true), Err(Error::Authentication(_))));

        assert!(!dash.login("wrong"));
        assert_eq!(dash.login_error(), Some("Invalid password"));
        assert!(dash.login("admin123"));
        assert!(dash.login_error().is_none());

        dash.logout();
        assert!(dash.select_slot(Some("morning")).is_err());
    }

    #[tokio::test(start_paused = true)]
    async fn test_select_unknown_slot() {
        let mut dash = dashboard();
        dash.login("admin123");
        assert!(matches!(
            dash.select_slot(Some("nope")),
            Err(Error::NotFound(_))
        ));
    }

    #[tokio::test(start_paused = true)]
    async fn test_go_live_from_dashboard() {
        let mut dash = dashboard();
        dash.login("admin123");
        dash.select_slot(Some("morning")).unwrap();
        assert!(dash.toggle_go_live().unwrap());
        tokio::time::sleep(Duration::from_secs(3)).await;

        assert!(dash.is_go_live_enabled());
        let status = dash.selected_status().unwrap();
        assert_eq!(status.badge, Mode::Live.badge());
        assert!(status.last_switch.is_some());

        let cards = dash.slot_cards();
        assert_eq!(cards.len(), 2);
        assert!(cards[0].selected && !cards[1].selected);
        assert_eq!(cards[1].badge, "REPLAY");
        assert_eq!(cards[0].switch_label, "1h 15m remaining");

        let activity = dash.recent_activity();
        assert_eq!(activity[0].event, "mode_switched");
        assert_eq!(activity[1].details, "Go Live enabled");
    }

    #[tokio::test(start_paused = true)]
    async fn test_recent_activity_capped() {
        let mut dash = dashboard();
        dash.login("admin123");
        for i in 0..12 {
            dash.set_go_live(i % 2 == 0).unwrap();
        }
        tokio::time::sleep(Duration::from_millis(10)).await;
        assert_eq!(dash.recent_activity().len(), RECENT_ACTIVITY);
    }
}
