//! Liveswitch session runtime
//!
//! Runs the transition engine for one webinar session and keeps it in step
//! with other sessions.
//!
//! - **Session**: `SessionHandle`, the per-session task (schedule tick,
//!   admin changes, settle timers)
//! - **Bridge**: `RealtimeSyncBridge`, Go Live sync and log mirroring over a
//!   `RealtimeTransport`
//! - **View models**: the player screen and the admin dashboard
//! - **MockReplayPlayer**: simulated replay surface
//!
//! # Usage
//!
//! ```ignore
//! liveswitch_app::logging::init();
//!
//! let state = AppState::new(Config::load_or_default()?)?;
//! let session = SessionHandle::start(state);
//! let bridge = RealtimeSyncBridge::start(&session, Arc::new(MemoryTransport::new()));
//!
//! let mut dashboard = AdminDashboard::new(session.clone());
//! dashboard.login("admin123");
//! dashboard.select_slot(Some("morning_sales_training"))?;
//! dashboard.set_go_live(true)?;
//! ```

pub mod bridge;
pub mod logging;
pub mod mock_replay;
pub mod session;
pub mod state;
pub mod viewmodel;

pub use bridge::{connect_hub, start_hub, RealtimeSyncBridge};
pub use mock_replay::MockReplayPlayer;
pub use session::{SessionEvent, SessionHandle};
pub use state::AppState;
pub use viewmodel::{AdminDashboard, PlayerScreen, PlayerView};
