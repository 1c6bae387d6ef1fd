//! Player view model
//!
//! Shows one slot: the replay or live surface matching the slot's visible
//! mode, the switching notice while a transition is in flight, and the
//! attendee status line. Surfaces are mounted and torn down here, never by
//! the engine.

use std::sync::Arc;
use std::time::Duration;

use liveswitch_core::utils::countdown;
use liveswitch_core::{
    Config, LiveSessionConfig, LiveSurface, Mode, PlayerEvent, PlayerEventSink, ReplaySurface,
    WebinarSlot,
};
use tracing::{info, warn};

use crate::mock_replay::MockReplayPlayer;
use crate::session::{player_sink, SessionEvent, SessionHandle};

/// What the player screen shows
#[derive(Debug, Clone, PartialEq)]
pub enum PlayerScreen {
    /// No slot with this id; blocking
    NotFound { slot_id: String },
    /// A surface failed; `retry()` tries again
    Error { message: String },
    Replay(PlayerStatus),
    Live(PlayerStatus),
}

/// Everything drawn around the surface
#[derive(Debug, Clone, PartialEq)]
pub struct PlayerStatus {
    pub slot_name: String,
    /// "REPLAY" or "LIVE"
    pub badge: &'static str,
    pub attendee_count: u32,
    /// Switching notice, while a transition is in flight
    pub overlay: Option<String>,
    /// Time left until the scheduled switch (replay only)
    pub countdown: Option<String>,
}

impl PlayerStatus {
    /// "LIVE • 12 attendees"
    pub fn status_line(&self) -> String {
        format!("{} • {} attendees", self.badge, self.attendee_count)
    }
}

/// Replay surface selected by configuration; `None` when the embedding
/// supplies its own
pub fn configured_replay(config: &Config) -> Option<Box<dyn ReplaySurface>> {
    if config.webinar.use_mock_replay {
        let minutes = u64::from(config.webinar.default_duration_mins);
        Some(Box::new(MockReplayPlayer::with_duration(Duration::from_secs(minutes * 60))))
    } else {
        None
    }
}

pub struct PlayerView {
    session: SessionHandle,
    slot_id: String,
    replay: Box<dyn ReplaySurface>,
    live: Box<dyn LiveSurface>,
    /// Surface currently up
    mounted: Option<Mode>,
    error: Option<String>,
}

impl PlayerView {
    pub fn new(
        session: SessionHandle,
        slot_id: impl Into<String>,
        replay: Box<dyn ReplaySurface>,
        live: Box<dyn LiveSurface>,
    ) -> Self {
        Self {
            session,
            slot_id: slot_id.into(),
            replay,
            live,
            mounted: None,
            error: None,
        }
    }

    pub fn slot_id(&self) -> &str {
        &self.slot_id
    }

    pub fn mounted(&self) -> Option<Mode> {
        self.mounted
    }

    fn sink(&self) -> Arc<dyn PlayerEventSink> {
        player_sink(&self.session)
    }

    fn slot(&self) -> Option<WebinarSlot> {
        self.session.state().webinar().slot(&self.slot_id).ok().cloned()
    }

    /// Current screen
    pub fn screen(&self) -> PlayerScreen {
        let state = self.session.state();
        let webinar = state.webinar();

        let Ok(slot) = webinar.slot(&self.slot_id) else {
            return PlayerScreen::NotFound {
                slot_id: self.slot_id.clone(),
            };
        };
        if let Some(message) = &self.error {
            return PlayerScreen::Error {
                message: message.clone(),
            };
        }

        let transition = webinar.transition_state(&self.slot_id);
        let visible = webinar
            .phase(&self.slot_id)
            .map_or(slot.current_mode, |p| p.visible_mode());

        let mut status = PlayerStatus {
            slot_name: slot.name.clone(),
            badge: visible.badge(),
            attendee_count: slot.attendee_count,
            overlay: transition
                .is_transitioning
                .then(|| transition.transition_message.clone()),
            countdown: None,
        };

        match visible {
            Mode::Replay => {
                let left = countdown(state.clock.now(), slot.scheduled_switch_time);
                status.countdown = (!left.reached()).then(|| left.display());
                PlayerScreen::Replay(status)
            }
            Mode::Live => PlayerScreen::Live(status),
        }
    }

    /// Bring the mounted surface in line with the slot's visible mode
    pub fn sync(&mut self) {
        if self.error.is_some() {
            return;
        }
        let Some(slot) = self.slot() else {
            self.unmount();
            return;
        };

        let visible = self
            .session
            .state()
            .webinar()
            .phase(&self.slot_id)
            .map_or(slot.current_mode, |p| p.visible_mode());
        if self.mounted == Some(visible) {
            return;
        }

        self.unmount();
        match visible {
            Mode::Replay => self.mount_replay(&slot),
            Mode::Live => self.mount_live(&slot),
        }
    }

    /// Re-sync after a session event concerning this slot
    pub fn handle_event(&mut self, event: &SessionEvent) {
        let concerns_us = match event {
            SessionEvent::TransitionStarted(t) => t.slot_id == self.slot_id,
            SessionEvent::TransitionSettled { slot_id, .. } => *slot_id == self.slot_id,
            _ => false,
        };
        if concerns_us {
            self.sync();
        }
    }

    /// Clear a surface error and mount again
    pub fn retry(&mut self) {
        info!(slot_id = %self.slot_id, "Retrying player surface");
        self.error = None;
        self.mounted = None;
        self.sync();
    }

    /// Tear down whatever is mounted
    pub fn leave(&mut self) {
        self.unmount();
    }

    fn mount_replay(&mut self, slot: &WebinarSlot) {
        let sink = self.sink();
        match self.replay.load(&slot.id, &slot.replay_url, sink) {
            Ok(()) => {
                self.mounted = Some(Mode::Replay);
                self.session.report(
                    &slot.id,
                    PlayerEvent::Joined {
                        details: "Replay session loaded".to_string(),
                        attendee_count: Some(1),
                    },
                );
            }
            Err(e) => {
                warn!(slot_id = %slot.id, error = %e, "Replay surface failed");
                self.error = Some(e.to_string());
            }
        }
    }

    fn mount_live(&mut self, slot: &WebinarSlot) {
        let config = &self.session.state().config;
        let credentials = LiveSessionConfig::for_slot(
            slot,
            config.viewer.display_name.clone(),
            config.viewer.email.clone(),
            config.viewer.leave_url.clone(),
        )
        .with_access_code(config.access_code(&slot.id).map(str::to_string));

        let sink = self.sink();
        match self.live.connect(&slot.id, &credentials, sink) {
            Ok(()) => self.mounted = Some(Mode::Live),
            Err(e) => {
                warn!(slot_id = %slot.id, error = %e, "Live surface failed");
                self.session.report(
                    &slot.id,
                    PlayerEvent::Notice(format!("Live session initialization error: {}", e)),
                );
                self.error = Some(e.to_string());
            }
        }
    }

    fn unmount(&mut self) {
        match self.mounted.take() {
            Some(Mode::Replay) => self.replay.unload(),
            Some(Mode::Live) => {
                self.live.disconnect();
                self.session.report(
                    &self.slot_id,
                    PlayerEvent::Left {
                        details: "Left live session".to_string(),
                    },
                );
            }
            None => {}
        }
    }
}

impl Drop for PlayerView {
    fn drop(&mut self) {
        self.unmount();
    }
}
