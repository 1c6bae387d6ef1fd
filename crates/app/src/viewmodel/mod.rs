//! View models for the player and admin screens

mod dashboard;
mod player;

pub use dashboard::{AdminDashboard, LogLine, SlotCard, SlotStatus, RECENT_ACTIVITY};
pub use player::{configured_replay, PlayerScreen, PlayerStatus, PlayerView};
