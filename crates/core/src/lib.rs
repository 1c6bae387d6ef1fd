//! Liveswitch Core Library
//!
//! Slot registry, activity log, Go Live override and the mode transition
//! engine, plus configuration and document storage for the sync hub.

pub mod activity;
pub mod auth;
pub mod clock;
pub mod config;
pub mod engine;
pub mod error;
pub mod invariants;
pub mod live_override;
pub mod models;
pub mod registry;
pub mod sample;
pub mod state;
pub mod storage;
pub mod surfaces;
pub mod utils;

pub use activity::{ActivityLog, DEFAULT_LOG_CAPACITY};
pub use auth::{AdminGate, PasswordGate};
pub use clock::{Clock, ManualClock, SystemClock};
pub use config::Config;
pub use engine::{ModeTransitionEngine, Transition};
pub use error::{Error, Result, SurfaceError};
pub use live_override::{GlobalLiveOverride, Origin, OverrideChange};
pub use models::*;
pub use registry::SlotRegistry;
pub use state::WebinarState;
pub use storage::Database;
pub use surfaces::{LiveSurface, PlayerEvent, PlayerEventSink, ReplaySurface};
