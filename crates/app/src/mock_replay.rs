//! Simulated replay player for demos and tests
//!
//! Grows a fake audience at random intervals and advances a playback
//! position once per second while playing.

use std::sync::{Arc, Mutex, MutexGuard};
use std::time::Duration;

use liveswitch_core::{PlayerEvent, PlayerEventSink, ReplaySurface, SurfaceError};
use rand::Rng;
use tokio::task::JoinHandle;
use tracing::{debug, info};

/// Audience never grows past this
pub const MAX_SIMULATED_ATTENDEES: u32 = 150;

/// Length of the simulated recording unless configured
pub const DEFAULT_DURATION: Duration = Duration::from_secs(90 * 60);

#[derive(Default)]
struct Playback {
    slot_id: Option<String>,
    sink: Option<Arc<dyn PlayerEventSink>>,
    attendees: u32,
    playing: bool,
    position: Duration,
    task: Option<JoinHandle<()>>,
}

/// Replay surface that plays nothing. Clones share one player.
#[derive(Clone)]
pub struct MockReplayPlayer {
    inner: Arc<Mutex<Playback>>,
    duration: Duration,
}

impl Default for MockReplayPlayer {
    fn default() -> Self {
        Self::with_duration(DEFAULT_DURATION)
    }
}

impl MockReplayPlayer {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_duration(duration: Duration) -> Self {
        Self {
            inner: Arc::default(),
            duration,
        }
    }

    fn lock(&self) -> MutexGuard<'_, Playback> {
        self.inner.lock().unwrap_or_else(|e| e.into_inner())
    }

    pub fn play(&self) {
        self.lock().playing = true;
    }

    pub fn is_playing(&self) -> bool {
        self.lock().playing
    }

    pub fn is_loaded(&self) -> bool {
        self.lock().task.is_some()
    }

    pub fn attendees(&self) -> u32 {
        self.lock().attendees
    }

    pub fn position(&self) -> Duration {
        self.lock().position
    }

    /// Playback progress in percent
    pub fn progress(&self) -> f32 {
        if self.duration.is_zero() {
            return 100.0;
        }
        self.position().as_secs_f32() / self.duration.as_secs_f32() * 100.0
    }

    /// "mm:ss / mm:ss"
    pub fn time_label(&self) -> String {
        format!(
            "{} / {}",
            format_clock(self.position()),
            format_clock(self.duration)
        )
    }

    /// Viewer clicked a call-to-action
    pub fn click_cta(&self, name: &str) {
        let (slot_id, sink) = {
            let inner = self.lock();
            (inner.slot_id.clone(), inner.sink.clone())
        };
        if let (Some(slot_id), Some(sink)) = (slot_id, sink) {
            sink.emit(&slot_id, PlayerEvent::CtaClicked(name.to_string()));
        }
    }
}

fn format_clock(d: Duration) -> String {
    let secs = d.as_secs();
    format!("{:02}:{:02}", secs / 60, secs % 60)
}

fn next_growth_delay() -> Duration {
    Duration::from_millis(rand::thread_rng().gen_range(5_000..15_000))
}

async fn simulate(player: MockReplayPlayer) {
    let mut playback = tokio::time::interval(Duration::from_secs(1));
    let growth = tokio::time::sleep(next_growth_delay());
    tokio::pin!(growth);

    loop {
        tokio::select! {
            _ = playback.tick() => {
                let mut inner = player.lock();
                if inner.playing {
                    inner.position = (inner.position + Duration::from_secs(1)).min(player.duration);
                }
            }

            _ = &mut growth => {
                let step = rand::thread_rng().gen_range(0..=2);
                let report = {
                    let mut inner = player.lock();
                    inner.attendees = (inner.attendees + step).min(MAX_SIMULATED_ATTENDEES);
                    inner
                        .slot_id
                        .clone()
                        .zip(inner.sink.clone())
                        .map(|(slot_id, sink)| (slot_id, sink, inner.attendees))
                };
                if let Some((slot_id, sink, count)) = report {
                    debug!(slot_id = %slot_id, count, "Simulated attendee count");
                    sink.emit(&slot_id, PlayerEvent::AttendeeCount(count));
                }
                growth.as_mut().reset(tokio::time::Instant::now() + next_growth_delay());
            }
        }
    }
}

impl ReplaySurface for MockReplayPlayer {
    fn load(
        &mut self,
        slot_id: &str,
        source: &str,
        sink: Arc<dyn PlayerEventSink>,
    ) -> Result<(), SurfaceError> {
        let runtime = tokio::runtime::Handle::try_current()
            .map_err(|e| SurfaceError::ReplayLoad(e.to_string()))?;

        self.unload();
        {
            let mut inner = self.lock();
            inner.slot_id = Some(slot_id.to_string());
            inner.sink = Some(sink);
            inner.task = Some(runtime.spawn(simulate(self.clone())));
        }

        info!(slot_id = %slot_id, source = %source, "Simulated replay loaded");
        Ok(())
    }

    fn unload(&mut self) {
        let mut inner = self.lock();
        if let Some(task) = inner.task.take() {
            task.abort();
        }
        *inner = Playback::default();
    }
}
