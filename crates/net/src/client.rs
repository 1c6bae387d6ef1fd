//! TCP client for a document hub
//!
//! One connection task owns the socket. Local subscriptions are multiplexed
//! over a single hub subscription per key.

use std::collections::HashMap;
use std::net::SocketAddr;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use serde_json::{Map, Value};
use tokio::io::WriteHalf;
use tokio::net::TcpStream;
use tokio::sync::{mpsc, watch};
use tracing::{debug, info, warn};

use crate::error::{Error, Result};
use crate::frame::{forward_frames, write_frame};
use crate::protocol::Message;
use crate::transport::{RealtimeTransport, Subscription};

/// Inbound frame queue depth
const INBOUND_QUEUE: usize = 64;

/// Connection state
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConnectionState {
    Connected,
    Disconnected,
}

enum ClientCommand {
    Send(Message),
    Subscribe {
        key: String,
        id: u64,
        tx: mpsc::UnboundedSender<Value>,
    },
    Unsubscribe {
        key: String,
        id: u64,
    },
    Disconnect,
}

/// Client handle for a hub connection
pub struct HubClient {
    cmd_tx: mpsc::UnboundedSender<ClientCommand>,
    state_rx: watch::Receiver<ConnectionState>,
    next_id: Arc<AtomicU64>,
}

impl HubClient {
    /// Connect to a hub
    pub async fn connect(addr: SocketAddr) -> Result<Self> {
        info!(addr = %addr, "Connecting to hub");

        let stream = TcpStream::connect(addr).await?;
        let (reader, writer) = tokio::io::split(stream);

        let (inbound_tx, inbound_rx) = mpsc::channel(INBOUND_QUEUE);
        let (cmd_tx, cmd_rx) = mpsc::unbounded_channel();
        let (state_tx, state_rx) = watch::channel(ConnectionState::Connected);

        tokio::spawn(forward_frames(reader, inbound_tx));
        tokio::spawn(connection_task(writer, inbound_rx, cmd_rx, state_tx));

        Ok(HubClient {
            cmd_tx,
            state_rx,
            next_id: Arc::new(AtomicU64::new(1)),
        })
    }

    /// Get current connection state
    pub fn connection_state(&self) -> ConnectionState {
        *self.state_rx.borrow()
    }

    /// Wait until the connection is gone
    pub async fn closed(&self) {
        let mut rx = self.state_rx.clone();
        let _ = rx.wait_for(|s| *s == ConnectionState::Disconnected).await;
    }

    /// Send a ping
    pub fn ping(&self) -> Result<()> {
        self.send(ClientCommand::Send(Message::Ping))
    }

    /// Disconnect from the hub
    pub fn disconnect(&self) {
        let _ = self.cmd_tx.send(ClientCommand::Disconnect);
    }

    fn send(&self, cmd: ClientCommand) -> Result<()> {
        self.cmd_tx.send(cmd).map_err(|_| Error::NotConnected)
    }
}

impl RealtimeTransport for HubClient {
    fn subscribe(&self, key: &str) -> Result<Subscription> {
        let id = self.next_id.fetch_add(1, Ordering::Relaxed);
        let (tx, rx) = mpsc::unbounded_channel();
        self.send(ClientCommand::Subscribe {
            key: key.to_string(),
            id,
            tx,
        })?;

        let cmd_tx = self.cmd_tx.clone();
        let owned_key = key.to_string();
        Ok(Subscription::new(key, rx, move || {
            let _ = cmd_tx.send(ClientCommand::Unsubscribe { key: owned_key, id });
        }))
    }

    fn write_fields(&self, key: &str, fields: Map<String, Value>) -> Result<()> {
        self.send(ClientCommand::Send(Message::UpdateFields {
            key: key.to_string(),
            fields,
        }))
    }

    fn append_log(&self, collection: &str, record: Value) -> Result<()> {
        self.send(ClientCommand::Send(Message::AppendLog {
            collection: collection.to_string(),
            record,
        }))
    }
}

/// Local subscribers and the last value seen per key
#[derive(Default)]
struct Subscribers {
    by_key: HashMap<String, Vec<(u64, mpsc::UnboundedSender<Value>)>>,
    last: HashMap<String, Value>,
}

impl Subscribers {
    /// Add a subscriber; returns true if the hub must be asked for this key
    fn add(&mut self, key: String, id: u64, tx: mpsc::UnboundedSender<Value>) -> bool {
        if let Some(value) = self.last.get(&key) {
            let _ = tx.send(value.clone());
        }
        let subs = self.by_key.entry(key).or_default();
        subs.push((id, tx));
        subs.len() == 1
    }

    /// Remove a subscriber; returns true if nobody watches this key anymore
    fn remove(&mut self, key: &str, id: u64) -> bool {
        let Some(subs) = self.by_key.get_mut(key) else {
            return false;
        };
        subs.retain(|(sub_id, _)| *sub_id != id);
        if subs.is_empty() {
            self.by_key.remove(key);
            self.last.remove(key);
            true
        } else {
            false
        }
    }

    fn deliver(&mut self, key: String, body: Value) {
        if let Some(subs) = self.by_key.get_mut(&key) {
            subs.retain(|(_, tx)| tx.send(body.clone()).is_ok());
            self.last.insert(key, body);
        }
    }
}

/// Main connection task
async fn connection_task(
    mut writer: WriteHalf<TcpStream>,
    mut inbound: mpsc::Receiver<Result<Message>>,
    mut cmd_rx: mpsc::UnboundedReceiver<ClientCommand>,
    state_tx: watch::Sender<ConnectionState>,
) {
    let mut subscribers = Subscribers::default();

    loop {
        tokio::select! {
            frame = inbound.recv() => {
                match frame {
                    Some(Ok(msg)) => {
                        if !handle_hub_message(msg, &mut subscribers) {
                            break;
                        }
                    }
                    Some(Err(Error::ConnectionClosed)) | None => {
                        debug!("Hub closed connection");
                        break;
                    }
                    Some(Err(e)) => {
                        warn!(error = %e, "Read error");
                        break;
                    }
                }
            }

            cmd = cmd_rx.recv() => {
                let outgoing = match cmd {
                    Some(ClientCommand::Send(msg)) => Some(msg),
                    Some(ClientCommand::Subscribe { key, id, tx }) => {
                        if subscribers.add(key.clone(), id, tx) {
                            Some(Message::Subscribe { key })
                        } else {
                            None
                        }
                    }
                    Some(ClientCommand::Unsubscribe { key, id }) => {
                        if subscribers.remove(&key, id) {
                            Some(Message::Unsubscribe { key })
                        } else {
                            None
                        }
                    }
                    Some(ClientCommand::Disconnect) | None => {
                        debug!("Disconnect requested");
                        break;
                    }
                };

                if let Some(msg) = outgoing {
                    if let Err(e) = write_frame(&mut writer, &msg).await {
                        warn!(error = %e, "Write error");
                        break;
                    }
                }
            }
        }
    }

    let _ = state_tx.send(ConnectionState::Disconnected);
    info!("Disconnected from hub");
}

/// Handle a message from the hub; returns false when the connection should end
fn handle_hub_message(msg: Message, subscribers: &mut Subscribers) -> bool {
    match msg {
        Message::Snapshot { key, body } => {
            debug!(key = %key, "Received snapshot");
            subscribers.deliver(key, body);
        }
        Message::Error { reason } => {
            warn!(reason = %reason, "Hub rejected request");
        }
        Message::Pong => {
            debug!("Received pong");
        }
        Message::Shutdown => {
            info!("Hub is shutting down");
            return false;
        }
        _ => {
            debug!("Ignoring unexpected message");
        }
    }
    true
}
