//! Realtime document transport
//!
//! A transport holds keyed JSON documents and append-only log collections
//! shared by every connected session. Subscribers receive the current value
//! of a document (if any) immediately, then every value after a change.

use std::collections::HashMap;
use std::sync::{Arc, Mutex, MutexGuard, Weak};

use serde_json::{Map, Value};
use tokio::sync::mpsc;

use crate::error::{Error, Result};

/// Live view of one document. Dropping it unsubscribes.
pub struct Subscription {
    key: String,
    updates: mpsc::UnboundedReceiver<Value>,
    cancel: Option<Box<dyn FnOnce() + Send>>,
}

impl Subscription {
    pub fn new(
        key: impl Into<String>,
        updates: mpsc::UnboundedReceiver<Value>,
        cancel: impl FnOnce() + Send + 'static,
    ) -> Self {
        Self {
            key: key.into(),
            updates,
            cancel: Some(Box::new(cancel)),
        }
    }

    pub fn key(&self) -> &str {
        &self.key
    }

    /// Next document value; `None` once the transport is gone
    pub async fn next(&mut self) -> Option<Value> {
        self.updates.recv().await
    }

    /// Next already-delivered value, without waiting
    pub fn try_next(&mut self) -> Option<Value> {
        self.updates.try_recv().ok()
    }
}

impl Drop for Subscription {
    fn drop(&mut self) {
        if let Some(cancel) = self.cancel.take() {
            cancel();
        }
    }
}

impl std::fmt::Debug for Subscription {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Subscription").field("key", &self.key).finish()
    }
}

/// Shared document store used by the sync bridge
pub trait RealtimeTransport: Send + Sync {
    /// Watch a document
    fn subscribe(&self, key: &str) -> Result<Subscription>;

    /// Merge top-level fields into a document, creating it if absent
    fn write_fields(&self, key: &str, fields: Map<String, Value>) -> Result<()>;

    /// Append a record to a log collection
    fn append_log(&self, collection: &str, record: Value) -> Result<()>;
}

#[derive(Default)]
struct MemoryInner {
    documents: HashMap<String, Map<String, Value>>,
    subscribers: HashMap<String, Vec<(u64, mpsc::UnboundedSender<Value>)>>,
    logs: HashMap<String, Vec<Value>>,
    next_id: u64,
    failing: bool,
}

impl MemoryInner {
    fn publish(&mut self, key: &str) {
        let Some(doc) = self.documents.get(key) else {
            return;
        };
        let body = Value::Object(doc.clone());
        if let Some(subs) = self.subscribers.get_mut(key) {
            subs.retain(|(_, tx)| tx.send(body.clone()).is_ok());
        }
    }
}

/// In-process transport; clones share the same documents
#[derive(Clone, Default)]
pub struct MemoryTransport {
    inner: Arc<Mutex<MemoryInner>>,
}

impl MemoryTransport {
    pub fn new() -> Self {
        Self::default()
    }

    fn lock(&self) -> MutexGuard<'_, MemoryInner> {
        self.inner.lock().unwrap_or_else(|e| e.into_inner())
    }

    /// Make every subsequent write fail (or succeed again)
    pub fn set_failing(&self, failing: bool) {
        self.lock().failing = failing;
    }

    pub fn document(&self, key: &str) -> Option<Value> {
        self.lock().documents.get(key).cloned().map(Value::Object)
    }

    pub fn logs(&self, collection: &str) -> Vec<Value> {
        self.lock().logs.get(collection).cloned().unwrap_or_default()
    }

    pub fn subscriber_count(&self, key: &str) -> usize {
        self.lock().subscribers.get(key).map_or(0, Vec::len)
    }

    fn unsubscribe(inner: &Weak<Mutex<MemoryInner>>, key: &str, id: u64) {
        let Some(inner) = inner.upgrade() else {
            return;
        };
        let mut inner = inner.lock().unwrap_or_else(|e| e.into_inner());
        if let Some(subs) = inner.subscribers.get_mut(key) {
            subs.retain(|(sub_id, _)| *sub_id != id);
        }
    }
}

impl RealtimeTransport for MemoryTransport {
    fn subscribe(&self, key: &str) -> Result<Subscription> {
        let (tx, rx) = mpsc::unbounded_channel();
        let id = {
            let mut inner = self.lock();
            inner.next_id += 1;
            let id = inner.next_id;
            if let Some(doc) = inner.documents.get(key) {
                let _ = tx.send(Value::Object(doc.clone()));
            }
            inner
                .subscribers
                .entry(key.to_string())
                .or_default()
                .push((id, tx));
            id
        };

        let weak = Arc::downgrade(&self.inner);
        let owned_key = key.to_string();
        Ok(Subscription::new(key, rx, move || {
            MemoryTransport::unsubscribe(&weak, &owned_key, id)
        }))
    }

    fn write_fields(&self, key: &str, fields: Map<String, Value>) -> Result<()> {
        let mut inner = self.lock();
        if inner.failing {
            return Err(Error::NotConnected);
        }
        let doc = inner.documents.entry(key.to_string()).or_default();
        for (field, value) in fields {
            doc.insert(field, value);
        }
        inner.publish(key);
        Ok(())
    }

    fn append_log(&self, collection: &str, record: Value) -> Result<()> {
        let mut inner = self.lock();
        if inner.failing {
            return Err(Error::NotConnected);
        }
        inner
            .logs
            .entry(collection.to_string())
            .or_default()
            .push(record);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn fields(v: Value) -> Map<String, Value> {
        match v {
            Value::Object(m) => m,
            _ => panic!("expected object"),
        }
    }

    #[test]
    fn test_subscriber_gets_current_value_then_changes() {
        let transport = MemoryTransport::new();
        transport
            .write_fields("admin/state", fields(json!({"isGoLiveEnabled": false})))
            .unwrap();

        let mut sub = transport.subscribe("admin/state").unwrap();
        assert_eq!(sub.try_next(), Some(json!({"isGoLiveEnabled": false})));

        transport
            .write_fields("admin/state", fields(json!({"activeSlotId": "morning"})))
            .unwrap();
        assert_eq!(
            sub.try_next(),
            Some(json!({"isGoLiveEnabled": false, "activeSlotId": "morning"}))
        );
        assert_eq!(sub.try_next(), None);
    }

    #[test]
    fn test_missing_document_sends_nothing() {
        let transport = MemoryTransport::new();
        let mut sub = transport.subscribe("admin/state").unwrap();
        assert_eq!(sub.try_next(), None);
    }

    #[test]
    fn test_drop_unsubscribes() {
        let transport = MemoryTransport::new();
        let sub = transport.subscribe("admin/state").unwrap();
        assert_eq!(transport.subscriber_count("admin/state"), 1);
        drop(sub);
        assert_eq!(transport.subscriber_count("admin/state"), 0);
    }

    #[test]
    fn test_failing_writes() {
        let transport = MemoryTransport::new();
        transport.set_failing(true);
        assert!(transport.append_log("logs", json!({})).is_err());
        assert!(transport.write_fields("k", Map::new()).is_err());

        transport.set_failing(false);
        transport.append_log("logs", json!({"n": 1})).unwrap();
        assert_eq!(transport.logs("logs"), vec![json!({"n": 1})]);
    }
}
