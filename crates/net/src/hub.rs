//! TCP document hub
//!
//! Sessions connect, subscribe to documents and write partial updates. The hub
//! merges every write, pushes the merged document to all subscribers, and
//! keeps a bounded archive of log records. With storage attached, documents
//! and records survive restarts.

use std::collections::{HashMap, HashSet, VecDeque};
use std::net::SocketAddr;
use std::sync::{Arc, Mutex};

use liveswitch_core::storage::Database;
use serde_json::{Map, Value};
use tokio::io::WriteHalf;
use tokio::net::{TcpListener, TcpStream};
use tokio::sync::{broadcast, mpsc, RwLock};
use tracing::{debug, error, info, warn};
use uuid::Uuid;

use crate::error::{Error, Result};
use crate::frame::{read_frame, write_frame};
use crate::protocol::Message;

/// Records kept per log collection
pub const DEFAULT_ARCHIVE_CAPACITY: usize = 1000;

/// Outbound queue depth per connection
const PEER_QUEUE: usize = 64;

/// Collection used for keys without a `collection/` prefix
const DEFAULT_COLLECTION: &str = "documents";

struct Peer {
    tx: mpsc::Sender<Message>,
    subscriptions: HashSet<String>,
}

struct HubState {
    peers: HashMap<Uuid, Peer>,
    documents: HashMap<String, Map<String, Value>>,
    logs: HashMap<String, VecDeque<Value>>,
    archive_capacity: usize,
    storage: Option<Arc<Mutex<Database>>>,
}

impl HubState {
    /// Senders of every peer subscribed to `key`
    fn subscribers(&self, key: &str) -> Vec<mpsc::Sender<Message>> {
        self.peers
            .values()
            .filter(|p| p.subscriptions.contains(key))
            .map(|p| p.tx.clone())
            .collect()
    }

    /// Cached document, loading it from storage on first use
    fn document(&mut self, key: &str) -> Option<&Map<String, Value>> {
        if !self.documents.contains_key(key) {
            if let Some(doc) = self.load_document(key) {
                self.documents.insert(key.to_string(), doc);
            }
        }
        self.documents.get(key)
    }

    fn load_document(&self, key: &str) -> Option<Map<String, Value>> {
        let storage = self.storage.as_ref()?;
        let db = storage.lock().unwrap_or_else(|e| e.into_inner());
        let (collection, name) = storage_key(key);
        match db.documents().get(collection, name) {
            Ok(Some(stored)) => match stored.body {
                Value::Object(map) => Some(map),
                _ => {
                    warn!(key, "Stored document is not an object");
                    None
                }
            },
            Ok(None) => None,
            Err(e) => {
                warn!(key, error = %e, "Failed to load document");
                None
            }
        }
    }

    /// Merge fields into a document and persist it
    fn merge(&mut self, key: &str, fields: Map<String, Value>) -> (Value, Result<()>) {
        self.document(key);
        let doc = self.documents.entry(key.to_string()).or_default();
        for (field, value) in fields {
            doc.insert(field, value);
        }
        let body = Value::Object(doc.clone());

        let persisted = match &self.storage {
            Some(storage) => {
                let db = storage.lock().unwrap_or_else(|e| e.into_inner());
                let (collection, name) = storage_key(key);
                db.documents()
                    .put(collection, name, &body)
                    .map_err(Error::from)
            }
            None => Ok(()),
        };
        (body, persisted)
    }

    fn append_log(&mut self, collection: &str, record: Value) -> Result<()> {
        let capacity = self.archive_capacity;
        let records = self.logs.entry(collection.to_string()).or_default();
        if records.len() >= capacity {
            records.pop_front();
        }
        records.push_back(record.clone());

        if let Some(storage) = &self.storage {
            let db = storage.lock().unwrap_or_else(|e| e.into_inner());
            let archive = db.log_archive();
            archive.append(collection, &record)?;
            archive.prune(collection, capacity)?;
        }
        Ok(())
    }
}

/// Split `collection/name`; bare keys land in the default collection
fn storage_key(key: &str) -> (&str, &str) {
    key.split_once('/').unwrap_or((DEFAULT_COLLECTION, key))
}

/// Hub handle
pub struct Hub {
    addr: SocketAddr,
    state: Arc<RwLock<HubState>>,
    shutdown_tx: broadcast::Sender<()>,
}

impl Hub {
    /// Start an in-memory hub
    pub async fn start(addr: SocketAddr) -> Result<Self> {
        Self::start_inner(addr, None, DEFAULT_ARCHIVE_CAPACITY).await
    }

    /// Start a hub backed by a database
    pub async fn start_with_storage(
        addr: SocketAddr,
        db: Database,
        archive_capacity: usize,
    ) -> Result<Self> {
        Self::start_inner(addr, Some(db), archive_capacity).await
    }

    async fn start_inner(
        addr: SocketAddr,
        db: Option<Database>,
        archive_capacity: usize,
    ) -> Result<Self> {
        let listener = TcpListener::bind(addr).await?;
        let bound_addr = listener.local_addr()?;

        info!(addr = %bound_addr, persistent = db.is_some(), "Hub started");

        let (shutdown_tx, _) = broadcast::channel(1);
        let state = Arc::new(RwLock::new(HubState {
            peers: HashMap::new(),
            documents: HashMap::new(),
            logs: HashMap::new(),
            archive_capacity: archive_capacity.max(1),
            storage: db.map(|db| Arc::new(Mutex::new(db))),
        }));

        let shutdown_rx = shutdown_tx.subscribe();
        tokio::spawn(accept_loop(listener, state.clone(), shutdown_rx));

        Ok(Hub {
            addr: bound_addr,
            state,
            shutdown_tx,
        })
    }

    /// Get the hub's bound address
    pub fn addr(&self) -> SocketAddr {
        self.addr
    }

    /// Current value of a document
    pub async fn document(&self, key: &str) -> Option<Value> {
        let mut state = self.state.write().await;
        state.document(key).cloned().map(Value::Object)
    }

    /// Archived log records, oldest first
    pub async fn logs(&self, collection: &str) -> Vec<Value> {
        let state = self.state.read().await;
        state
            .logs
            .get(collection)
            .map(|r| r.iter().cloned().collect())
            .unwrap_or_default()
    }

    pub async fn peer_count(&self) -> usize {
        self.state.read().await.peers.len()
    }

    /// Shutdown the hub
    pub fn shutdown(&self) {
        let _ = self.shutdown_tx.send(());
        info!("Hub shutdown initiated");
    }
}

/// Accept incoming connections
async fn accept_loop(
    listener: TcpListener,
    state: Arc<RwLock<HubState>>,
    mut shutdown_rx: broadcast::Receiver<()>,
) {
    loop {
        tokio::select! {
            result = listener.accept() => {
                match result {
                    Ok((stream, addr)) => {
                        debug!(addr = %addr, "New connection");
                        tokio::spawn(handle_connection(stream, addr, state.clone()));
                    }
                    Err(e) => {
                        error!(error = %e, "Accept failed");
                    }
                }
            }
            _ = shutdown_rx.recv() => {
                info!("Accept loop shutting down");
                let peers: Vec<_> = state.read().await.peers.values().map(|p| p.tx.clone()).collect();
                for tx in peers {
                    let _ = tx.send(Message::Shutdown).await;
                }
                break;
            }
        }
    }
}

/// Handle a single session connection
async fn handle_connection(stream: TcpStream, addr: SocketAddr, state: Arc<RwLock<HubState>>) {
    let (mut reader, writer) = tokio::io::split(stream);
    let peer_id = Uuid::new_v4();

    let (msg_tx, msg_rx) = mpsc::channel(PEER_QUEUE);
    state.write().await.peers.insert(
        peer_id,
        Peer {
            tx: msg_tx,
            subscriptions: HashSet::new(),
        },
    );
    let writer_handle = tokio::spawn(writer_task(writer, msg_rx));

    info!(addr = %addr, peer_id = %peer_id, "Session connected");

    loop {
        match read_frame(&mut reader).await {
            Ok(msg) => handle_message(msg, peer_id, &state).await,
            Err(Error::ConnectionClosed) => {
                debug!(peer_id = %peer_id, "Connection closed");
                break;
            }
            Err(e) => {
                warn!(peer_id = %peer_id, error = %e, "Read error");
                break;
            }
        }
    }

    writer_handle.abort();
    state.write().await.peers.remove(&peer_id);

    info!(peer_id = %peer_id, "Session disconnected");
}

/// Writer task - sends messages to the session
async fn writer_task(mut writer: WriteHalf<TcpStream>, mut rx: mpsc::Receiver<Message>) {
    while let Some(msg) = rx.recv().await {
        if let Err(e) = write_frame(&mut writer, &msg).await {
            debug!(error = %e, "Write failed");
            break;
        }
    }
}

/// Handle an incoming message
async fn handle_message(msg: Message, peer_id: Uuid, state: &Arc<RwLock<HubState>>) {
    let mut outbound: Vec<(mpsc::Sender<Message>, Message)> = Vec::new();

    {
        let mut s = state.write().await;
        let reply_to = s.peers.get(&peer_id).map(|p| p.tx.clone());

        match msg {
            Message::Subscribe { key } => {
                debug!(peer_id = %peer_id, key = %key, "Subscribe");
                if let Some(peer) = s.peers.get_mut(&peer_id) {
                    peer.subscriptions.insert(key.clone());
                }
                let current = s.document(&key).cloned();
                if let (Some(tx), Some(doc)) = (reply_to, current) {
                    outbound.push((
                        tx,
                        Message::Snapshot {
                            key,
                            body: Value::Object(doc),
                        },
                    ));
                }
            }
            Message::Unsubscribe { key } => {
                if let Some(peer) = s.peers.get_mut(&peer_id) {
                    peer.subscriptions.remove(&key);
                }
            }
            Message::UpdateFields { key, fields } => {
                let (body, persisted) = s.merge(&key, fields);
                if let Err(e) = persisted {
                    warn!(key = %key, error = %e, "Failed to persist document");
                    if let Some(tx) = reply_to {
                        outbound.push((
                            tx,
                            Message::Error {
                                reason: format!("Failed to persist {}: {}", key, e),
                            },
                        ));
                    }
                }
                for tx in s.subscribers(&key) {
                    outbound.push((
                        tx,
                        Message::Snapshot {
                            key: key.clone(),
                            body: body.clone(),
                        },
                    ));
                }
                debug!(key = %key, "Document updated");
            }
            Message::AppendLog { collection, record } => {
                if let Err(e) = s.append_log(&collection, record) {
                    warn!(collection = %collection, error = %e, "Failed to archive log record");
                    if let Some(tx) = reply_to {
                        outbound.push((
                            tx,
                            Message::Error {
                                reason: format!("Failed to archive record: {}", e),
                            },
                        ));
                    }
                }
            }
            Message::Ping => {
                if let Some(tx) = reply_to {
                    outbound.push((tx, Message::Pong));
                }
            }
            _ => {
                debug!(peer_id = %peer_id, "Ignoring unexpected message type");
            }
        }
    }

    for (tx, msg) in outbound {
        if tx.send(msg).await.is_err() {
            debug!("Failed to queue message for session");
        }
    }
}
