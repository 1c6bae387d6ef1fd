//! Liveswitch Network Library
//!
//! Realtime document transport shared by webinar sessions.
//!
//! # Architecture
//!
//! - **Transport**: `RealtimeTransport`, the interface the sync bridge uses
//! - **MemoryTransport**: in-process transport for a single process or tests
//! - **Hub**: TCP server holding shared documents and log archives
//! - **HubClient**: `RealtimeTransport` over a hub connection
//! - **Protocol**: Length-prefixed JSON messages
//!
//! # Usage
//!
//! ```ignore
//! let hub = Hub::start("127.0.0.1:7440".parse()?).await?;
//! let client = HubClient::connect(hub.addr()).await?;
//!
//! let mut sub = client.subscribe("admin/state")?;
//! while let Some(doc) = sub.next().await {
//!     // apply doc
//! }
//! ```

pub mod client;
pub mod error;
mod frame;
pub mod hub;
pub mod protocol;
pub mod transport;

pub use client::{ConnectionState, HubClient};
pub use error::{Error, Result};
pub use hub::Hub;
pub use protocol::Message;
pub use transport::{MemoryTransport, RealtimeTransport, Subscription};

/// Default port for Liveswitch hubs
pub const DEFAULT_PORT: u16 = 7440;
