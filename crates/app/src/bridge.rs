//! Realtime sync bridge
//!
//! Keeps the Go Live override consistent across sessions through a
//! [`RealtimeTransport`]. Local override changes are written as partial
//! updates of the shared admin state document; documents written by other
//! sessions are applied to the local override with remote origin, so they
//! are never written back. Local log entries are mirrored to the log
//! collection. Transport failures are logged and local state is kept.

use std::collections::VecDeque;
use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;

use liveswitch_core::{AdminState, AdminStatePatch, Database, LogEntry, Origin, OverrideChange};
use liveswitch_net::hub::DEFAULT_ARCHIVE_CAPACITY;
use liveswitch_net::{Hub, HubClient, RealtimeTransport, Subscription};
use serde_json::Value;
use tokio::sync::{broadcast, oneshot};
use tokio::task::JoinHandle;
use tracing::{debug, info, warn};

use crate::session::{SessionEvent, SessionHandle};
use crate::state::AppState;

/// Reconnect backoff delays in milliseconds
const RECONNECT_DELAYS_MS: [u64; 5] = [500, 1000, 2000, 5000, 10000];

/// Own writes not yet seen coming back
const MAX_PENDING_ECHOES: usize = 32;

/// Running bridge between one session and a transport
pub struct RealtimeSyncBridge {
    stop_tx: Option<oneshot::Sender<()>>,
    task: Option<JoinHandle<()>>,
}

impl RealtimeSyncBridge {
    /// Subscribe to the admin state document and start mirroring
    pub fn start(session: &SessionHandle, transport: Arc<dyn RealtimeTransport>) -> Self {
        let sync = &session.state().config.sync;
        let admin_key = sync.admin_state_key.clone();
        let log_collection = sync.log_collection.clone();

        // Subscribe before the first local change can be published
        let events = session.subscribe();
        let subscription = match transport.subscribe(&admin_key) {
            Ok(sub) => Some(sub),
            Err(e) => {
                warn!(key = %admin_key, error = %e, "Could not subscribe to admin state, running local only");
                None
            }
        };

        let (stop_tx, stop_rx) = oneshot::channel();
        let mirror = Mirror {
            session: session.clone(),
            transport,
            admin_key,
            log_collection,
            shadow: AdminState::default(),
            echoes: VecDeque::new(),
        };

        info!(key = %mirror.admin_key, "Sync bridge started");
        let task = tokio::spawn(bridge_task(mirror, subscription, events, stop_rx));

        Self {
            stop_tx: Some(stop_tx),
            task: Some(task),
        }
    }

    /// Unsubscribe and wait for the bridge task to finish
    pub async fn stop(mut self) {
        if let Some(stop_tx) = self.stop_tx.take() {
            let _ = stop_tx.send(());
        }
        if let Some(task) = self.task.take() {
            if let Err(e) = task.await {
                warn!(error = %e, "Sync bridge task failed");
            }
        }
    }

    pub fn is_running(&self) -> bool {
        self.task.as_ref().is_some_and(|t| !t.is_finished())
    }
}

impl Drop for RealtimeSyncBridge {
    fn drop(&mut self) {
        if let Some(stop_tx) = self.stop_tx.take() {
            let _ = stop_tx.send(());
        }
    }
}

/// Connect to a hub, retrying with backoff.
///
/// Gives up after `attempts` tries and returns `None`; the caller keeps
/// running without sync.
pub async fn connect_hub(addr: SocketAddr, attempts: usize) -> Option<HubClient> {
    for attempt in 0..attempts {
        match HubClient::connect(addr).await {
            Ok(client) => {
                info!(addr = %addr, attempt = attempt + 1, "Connected to hub");
                return Some(client);
            }
            Err(e) => {
                let delay_ms = RECONNECT_DELAYS_MS[attempt.min(RECONNECT_DELAYS_MS.len() - 1)];
                warn!(addr = %addr, attempt = attempt + 1, error = %e, delay_ms, "Hub connection failed");
                if attempt + 1 < attempts {
                    tokio::time::sleep(Duration::from_millis(delay_ms)).await;
                }
            }
        }
    }
    warn!(addr = %addr, "Giving up on hub, sync disabled");
    None
}

/// Start a hub on the configured address that keeps its documents in the
/// data directory
pub async fn start_hub(state: &AppState) -> liveswitch_net::Result<Hub> {
    let addr: SocketAddr = state.config.sync.hub_addr.parse()?;
    let db = Database::open(AppState::hub_database_path()?)?;
    Hub::start_with_storage(addr, db, DEFAULT_ARCHIVE_CAPACITY).await
}

struct Mirror {
    session: SessionHandle,
    transport: Arc<dyn RealtimeTransport>,
    admin_key: String,
    log_collection: String,
    /// Admin state as this bridge last wrote or received it
    shadow: AdminState,
    /// States produced by our own writes, oldest first
    echoes: VecDeque<AdminState>,
}

impl Mirror {
    fn write_change(&mut self, change: &OverrideChange) {
        self.write_patch(change.to_patch());
    }

    /// Rewrite the whole override after missed session events
    fn resync(&mut self) {
        let snapshot = self.session.state().webinar().live_override().snapshot();
        info!(key = %self.admin_key, "Rewriting admin state after missed events");
        self.write_patch(AdminStatePatch::from(snapshot));
    }

    fn write_patch(&mut self, patch: AdminStatePatch) {
        let fields = match serde_json::to_value(&patch) {
            Ok(Value::Object(fields)) => fields,
            Ok(_) => return,
            Err(e) => {
                warn!(error = %e, "Could not encode admin state patch");
                return;
            }
        };

        patch.merge_into(&mut self.shadow);
        match self.transport.write_fields(&self.admin_key, fields) {
            Ok(()) => {
                debug!(key = %self.admin_key, patch = ?patch, "Admin state written");
                self.echoes.push_back(self.shadow.clone());
                if self.echoes.len() > MAX_PENDING_ECHOES {
                    self.echoes.pop_front();
                }
            }
            Err(e) => warn!(key = %self.admin_key, error = %e, "Admin state write failed, keeping local state"),
        }
    }

    fn mirror_log(&self, entry: &LogEntry) {
        let mut record = match serde_json::to_value(entry.to_record()) {
            Ok(record) => record,
            Err(e) => {
                warn!(error = %e, "Could not encode log record");
                return;
            }
        };
        if let Value::Object(fields) = &mut record {
            fields.insert("id".to_string(), Value::String(entry.id.to_string()));
        }
        if let Err(e) = self.transport.append_log(&self.log_collection, record) {
            warn!(collection = %self.log_collection, error = %e, "Log mirror write failed");
        }
    }

    fn receive(&mut self, doc: Value) {
        let patch: AdminStatePatch = match serde_json::from_value(doc) {
            Ok(patch) => patch,
            Err(e) => {
                warn!(key = %self.admin_key, error = %e, "Ignoring malformed admin state");
                return;
            }
        };
        let mut state = self.shadow.clone();
        patch.merge_into(&mut state);

        // Our own earlier write coming back after a newer one was made
        if let Some(pos) = self.echoes.iter().position(|s| *s == state) {
            self.echoes.drain(..=pos);
            if !self.echoes.is_empty() {
                debug!("Skipping stale echo of own write");
                return;
            }
        }

        self.shadow = state;
        self.session.apply_remote(patch);
    }

    /// Returns false when the session is gone
    fn handle_event(&mut self, event: SessionEvent) -> bool {
        match event {
            SessionEvent::OverrideChanged(change) if change.is_local() => {
                self.write_change(&change);
            }
            SessionEvent::LogAppended {
                entry,
                origin: Origin::Local,
            } => self.mirror_log(&entry),
            SessionEvent::Stopped => return false,
            _ => {}
        }
        true
    }
}

async fn next_document(subscription: &mut Option<Subscription>) -> Option<Value> {
    match subscription {
        Some(sub) => sub.next().await,
        None => std::future::pending().await,
    }
}

async fn bridge_task(
    mut mirror: Mirror,
    mut subscription: Option<Subscription>,
    mut events: broadcast::Receiver<SessionEvent>,
    mut stop_rx: oneshot::Receiver<()>,
) {
    loop {
        // Session events first so our own writes are known before their echoes
        tokio::select! {
            biased;

            _ = &mut stop_rx => {
                debug!("Sync bridge stop requested");
                break;
            }

            event = events.recv() => {
                match event {
                    Ok(event) => {
                        if !mirror.handle_event(event) {
                            break;
                        }
                    }
                    Err(broadcast::error::RecvError::Lagged(skipped)) => {
                        warn!(skipped, "Sync bridge fell behind session events");
                        mirror.resync();
                    }
                    Err(broadcast::error::RecvError::Closed) => break,
                }
            }

            doc = next_document(&mut subscription) => {
                match doc {
                    Some(doc) => mirror.receive(doc),
                    None => {
                        warn!(key = %mirror.admin_key, "Admin state subscription closed, running local only");
                        subscription = None;
                    }
                }
            }
        }
    }

    // Unsubscribes
    drop(subscription);
    info!(key = %mirror.admin_key, "Sync bridge stopped");
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{Duration as ChronoDuration, Utc};
    use liveswitch_core::{Config, ManualClock, Mode, WebinarSlot};
    use liveswitch_net::MemoryTransport;
    use serde_json::json;

    fn session() -> SessionHandle {
        let now = Utc::now();
        let state =
            AppState::with_clock(Config::default(), Arc::new(ManualClock::new(now))).unwrap();
        state.load_slots(vec![WebinarSlot::new(
            "morning",
            "Morning",
            now,
            now + ChronoDuration::minutes(75),
        )]);
        SessionHandle::start(state)
    }

    async fn settle() {
        tokio::time::sleep(Duration::from_millis(2100)).await;
    }

    #[tokio::test(start_paused = true)]
    async fn test_local_change_written() {
        let transport = MemoryTransport::new();
        let session = session();
        let _bridge = RealtimeSyncBridge::start(&session, Arc::new(transport.clone()));

        session.select_slot(Some("morning".into()));
        session.set_go_live(true);
        settle().await;

        assert_eq!(
            transport.document("admin/state"),
            Some(json!({"activeSlotId": "morning", "isGoLiveEnabled": true}))
        );
        // Go Live entry and the mode switch
        assert_eq!(transport.logs("logs").len(), 2);
    }

    #[tokio::test(start_paused = true)]
    async fn test_remote_document_applied() {
        let transport = MemoryTransport::new();
        let session = session();
        let _bridge = RealtimeSyncBridge::start(&session, Arc::new(transport.clone()));
        tokio::time::sleep(Duration::from_millis(10)).await;

        let mut fields = serde_json::Map::new();
        fields.insert("activeSlotId".into(), json!("morning"));
        fields.insert("isGoLiveEnabled".into(), json!(true));
        transport.write_fields("admin/state", fields).unwrap();
        settle().await;

        let webinar = session.state().webinar();
        assert!(webinar.live_override().is_enabled());
        assert_eq!(webinar.slot("morning").unwrap().current_mode, Mode::Live);
        drop(webinar);

        // The remote Go Live entry is not mirrored back, the mode switch is
        let logs = transport.logs("logs");
        assert_eq!(logs.len(), 1);
        assert_eq!(logs[0]["event"], json!("mode_switched"));
    }

    #[tokio::test(start_paused = true)]
    async fn test_write_failure_keeps_local_state() {
        let transport = MemoryTransport::new();
        transport.set_failing(true);
        let session = session();
        let _bridge = RealtimeSyncBridge::start(&session, Arc::new(transport.clone()));

        session.select_slot(Some("morning".into()));
        session.set_go_live(true);
        settle().await;

        assert_eq!(transport.document("admin/state"), None);
        assert_eq!(
            session.state().webinar().slot("morning").unwrap().current_mode,
            Mode::Live
        );
    }

    #[tokio::test(start_paused = true)]
    async fn test_stop_unsubscribes() {
        let transport = MemoryTransport::new();
        let session = session();
        let bridge = RealtimeSyncBridge::start(&session, Arc::new(transport.clone()));
        assert_eq!(transport.subscriber_count("admin/state"), 1);

        bridge.stop().await;
        assert_eq!(transport.subscriber_count("admin/state"), 0);
    }

    #[tokio::test(start_paused = true)]
    async fn test_malformed_document_ignored() {
        let transport = MemoryTransport::new();
        let session = session();
        let _bridge = RealtimeSyncBridge::start(&session, Arc::new(transport.clone()));

        let mut fields = serde_json::Map::new();
        fields.insert("isGoLiveEnabled".into(), json!("yes"));
        transport.write_fields("admin/state", fields).unwrap();
        tokio::time::sleep(Duration::from_millis(10)).await;

        assert!(!session.state().webinar().live_override().is_enabled());
    }

    #[tokio::test]
    async fn test_start_hub_rejects_bad_address() {
        let mut config = Config::default();
        config.sync.hub_addr = "not an address".to_string();
        let state = AppState::with_clock(config, Arc::new(ManualClock::new(Utc::now()))).unwrap();

        let result = start_hub(&state).await;
        assert!(matches!(result, Err(liveswitch_net::Error::Address(_))));
    }

    #[tokio::test(start_paused = true)]
    async fn test_partial_remote_document_keeps_go_live() {
        let transport = MemoryTransport::new();
        let session = session();
        {
            let mut webinar = session.state().webinar();
            webinar.set_active_slot(Some("morning".into()), Origin::Local);
            webinar.set_go_live(true, Origin::Local, Utc::now());
        }
        let _bridge = RealtimeSyncBridge::start(&session, Arc::new(transport.clone()));

        // Another session only ever wrote the slot selection
        let mut fields = serde_json::Map::new();
        fields.insert("activeSlotId".into(), json!(null));
        transport.write_fields("admin/state", fields).unwrap();
        tokio::time::sleep(Duration::from_millis(10)).await;

        let webinar = session.state().webinar();
        assert!(webinar.live_override().is_enabled());
        assert_eq!(webinar.live_override().active_slot_id(), None);
    }

    #[tokio::test(start_paused = true)]
    async fn test_resync_writes_full_override() {
        let transport = MemoryTransport::new();
        let session = session();
        {
            let mut webinar = session.state().webinar();
            webinar.set_active_slot(Some("morning".into()), Origin::Local);
            webinar.set_go_live(true, Origin::Local, Utc::now());
        }
        let mut mirror = Mirror {
            session: session.clone(),
            transport: Arc::new(transport.clone()),
            admin_key: "admin/state".to_string(),
            log_collection: "logs".to_string(),
            shadow: AdminState::default(),
            echoes: VecDeque::new(),
        };

        mirror.resync();

        assert_eq!(
            transport.document("admin/state"),
            Some(json!({"activeSlotId": "morning", "isGoLiveEnabled": true}))
        );
        // The write comes back as our own echo and changes nothing
        mirror.receive(json!({"activeSlotId": "morning", "isGoLiveEnabled": true}));
        assert!(mirror.echoes.is_empty());
    }
}
