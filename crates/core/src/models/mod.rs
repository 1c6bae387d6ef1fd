//! Data models for Liveswitch

mod admin;
mod live;
mod log;
mod slot;
mod transition;

pub use admin::*;
pub use live::*;
pub use log::*;
pub use slot::*;
pub use transition::*;
