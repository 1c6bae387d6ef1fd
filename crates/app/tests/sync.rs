//! Two sessions kept in step through a shared transport

use std::sync::Arc;
use std::time::Duration;

use chrono::{Duration as ChronoDuration, Utc};
use liveswitch_app::{AppState, RealtimeSyncBridge, SessionEvent, SessionHandle};
use liveswitch_core::{Clock, Config, LogEvent, ManualClock, Mode, WebinarSlot};
use liveswitch_net::{Hub, HubClient, MemoryTransport, RealtimeTransport};

fn slots(clock: &ManualClock) -> Vec<WebinarSlot> {
    let now = clock.now();
    vec![
        WebinarSlot::new("morning", "Morning Sales Training", now, now + ChronoDuration::minutes(75)),
        WebinarSlot::new("afternoon", "Afternoon Product Demo", now, now + ChronoDuration::hours(5)),
    ]
}

fn session(config: Config, clock: &ManualClock) -> SessionHandle {
    let state = AppState::with_clock(config, Arc::new(clock.clone())).unwrap();
    state.load_slots(slots(clock));
    SessionHandle::start(state)
}

fn mode(session: &SessionHandle, slot_id: &str) -> Mode {
    session.state().webinar().slot(slot_id).unwrap().current_mode
}

fn go_live_enabled(session: &SessionHandle) -> bool {
    session.state().webinar().live_override().is_enabled()
}

#[tokio::test(start_paused = true)]
async fn test_admin_go_live_reaches_other_session() {
    let clock = ManualClock::new(Utc::now());
    let transport: Arc<dyn RealtimeTransport> = Arc::new(MemoryTransport::new());

    let admin = session(Config::default(), &clock);
    let viewer = session(Config::default(), &clock);
    let _admin_bridge = RealtimeSyncBridge::start(&admin, transport.clone());
    let _viewer_bridge = RealtimeSyncBridge::start(&viewer, transport.clone());
    let mut viewer_events = viewer.subscribe();

    admin.select_slot(Some("morning".into()));
    admin.set_go_live(true);
    tokio::time::sleep(Duration::from_millis(100)).await;

    assert!(go_live_enabled(&viewer));
    assert_eq!(
        viewer.state().webinar().live_override().active_slot_id(),
        Some("morning")
    );

    tokio::time::sleep(Duration::from_secs(3)).await;
    for s in [&admin, &viewer] {
        assert_eq!(mode(s, "morning"), Mode::Live);
        assert_eq!(mode(s, "afternoon"), Mode::Replay);
    }

    // The viewer applied remote changes only and wrote nothing back
    while let Ok(event) = viewer_events.try_recv() {
        if let SessionEvent::OverrideChanged(change) = event {
            assert!(!change.is_local());
        }
    }
}

#[tokio::test(start_paused = true)]
async fn test_go_live_off_reverts_both_sessions() {
    let clock = ManualClock::new(Utc::now());
    let transport: Arc<dyn RealtimeTransport> = Arc::new(MemoryTransport::new());

    let admin = session(Config::default(), &clock);
    let viewer = session(Config::default(), &clock);
    let _a = RealtimeSyncBridge::start(&admin, transport.clone());
    let _b = RealtimeSyncBridge::start(&viewer, transport.clone());

    admin.select_slot(Some("morning".into()));
    admin.set_go_live(true);
    tokio::time::sleep(Duration::from_secs(3)).await;
    admin.set_go_live(false);
    tokio::time::sleep(Duration::from_secs(3)).await;

    for s in [&admin, &viewer] {
        assert!(!go_live_enabled(s));
        assert_eq!(mode(s, "morning"), Mode::Replay);
        let switches = s
            .state()
            .webinar()
            .activity()
            .iter()
            .filter(|e| e.event == LogEvent::ModeSwitched)
            .count();
        assert_eq!(switches, 2);
    }
}

#[tokio::test(start_paused = true)]
async fn test_late_joiner_gets_current_state() {
    let clock = ManualClock::new(Utc::now());
    let transport: Arc<dyn RealtimeTransport> = Arc::new(MemoryTransport::new());

    let admin = session(Config::default(), &clock);
    let _a = RealtimeSyncBridge::start(&admin, transport.clone());
    admin.select_slot(Some("afternoon".into()));
    admin.set_go_live(true);
    tokio::time::sleep(Duration::from_secs(3)).await;

    let late = session(Config::default(), &clock);
    let _b = RealtimeSyncBridge::start(&late, transport.clone());
    tokio::time::sleep(Duration::from_secs(3)).await;

    assert!(go_live_enabled(&late));
    assert_eq!(mode(&late, "afternoon"), Mode::Live);
}

#[tokio::test(start_paused = true)]
async fn test_schedule_is_per_session() {
    let clock = ManualClock::new(Utc::now());
    let transport: Arc<dyn RealtimeTransport> = Arc::new(MemoryTransport::new());

    let first = session(Config::default(), &clock);
    let second = session(Config::default(), &clock);
    let _a = RealtimeSyncBridge::start(&first, transport.clone());
    let _b = RealtimeSyncBridge::start(&second, transport.clone());

    clock.advance(ChronoDuration::minutes(76));
    first.evaluate();
    second.evaluate();
    tokio::time::sleep(Duration::from_secs(3)).await;

    for s in [&first, &second] {
        assert_eq!(mode(s, "morning"), Mode::Live);
        assert_eq!(mode(s, "afternoon"), Mode::Replay);
    }
}

#[tokio::test]
async fn test_sessions_over_hub() {
    let hub = Hub::start("127.0.0.1:0".parse().unwrap()).await.unwrap();
    let clock = ManualClock::new(Utc::now());

    let mut config = Config::default();
    config.webinar.settle_delay_ms = 50;

    let admin = session(config.clone(), &clock);
    let viewer = session(config, &clock);
    let admin_link: Arc<dyn RealtimeTransport> =
        Arc::new(HubClient::connect(hub.addr()).await.unwrap());
    let viewer_link: Arc<dyn RealtimeTransport> =
        Arc::new(HubClient::connect(hub.addr()).await.unwrap());
    let _a = RealtimeSyncBridge::start(&admin, admin_link);
    let _b = RealtimeSyncBridge::start(&viewer, viewer_link);
    tokio::time::sleep(Duration::from_millis(100)).await;

    admin.select_slot(Some("morning".into()));
    admin.set_go_live(true);

    let mut converged = false;
    for _ in 0..100 {
        if mode(&viewer, "morning") == Mode::Live {
            converged = true;
            break;
        }
        tokio::time::sleep(Duration::from_millis(20)).await;
    }
    assert!(converged, "viewer never went live");
    assert_eq!(mode(&viewer, "afternoon"), Mode::Replay);

    let doc = hub.document("admin/state").await.unwrap();
    assert_eq!(doc["isGoLiveEnabled"], serde_json::json!(true));
    assert_eq!(doc["activeSlotId"], serde_json::json!("morning"));

    // Both sessions mirrored their own mode switch
    let mut switches = 0;
    for _ in 0..50 {
        switches = hub
            .logs("logs")
            .await
            .iter()
            .filter(|r| r["event"] == "mode_switched")
            .count();
        if switches == 2 {
            break;
        }
        tokio::time::sleep(Duration::from_millis(20)).await;
    }
    assert_eq!(switches, 2);

    hub.shutdown();
}
