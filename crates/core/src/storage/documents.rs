//! Keyed JSON documents (one row per collection/key)

use chrono::{DateTime, Utc};
use rusqlite::{params, Connection, OptionalExtension};
use serde_json::{Map, Value};

use crate::error::Result;
use crate::storage::parse::{parse_body, parse_datetime};

/// A stored document with its last write time
#[derive(Debug, Clone, PartialEq)]
pub struct StoredDocument {
    pub collection: String,
    pub key: String,
    pub body: Value,
    pub updated_at: DateTime<Utc>,
}

pub struct DocumentStore<'a> {
    conn: &'a Connection,
}

impl<'a> DocumentStore<'a> {
    pub fn new(conn: &'a Connection) -> Self {
        Self { conn }
    }

    pub fn get(&self, collection: &str, key: &str) -> Result<Option<StoredDocument>> {
        let doc = self
            .conn
            .query_row(
                "SELECT body, updated_at FROM documents WHERE collection = ?1 AND key = ?2",
                params![collection, key],
                |row| {
                    let body: String = row.get(0)?;
                    let updated_at: String = row.get(1)?;
                    Ok(StoredDocument {
                        collection: collection.to_string(),
                        key: key.to_string(),
                        body: parse_body(&body)?,
                        updated_at: parse_datetime(&updated_at)?,
                    })
                },
            )
            .optional()?;
        Ok(doc)
    }

    /// Replace a document wholesale
    pub fn put(&self, collection: &str, key: &str, body: &Value) -> Result<()> {
        self.conn.execute(
            "INSERT OR REPLACE INTO documents (collection, key, body, updated_at)
             VALUES (?1, ?2, ?3, ?4)",
            params![
                collection,
                key,
                serde_json::to_string(body)?,
                Utc::now().to_rfc3339()
            ],
        )?;
        Ok(())
    }

    /// Merge top-level fields into a document, creating it if absent.
    ///
    /// Returns the merged body.
    pub fn merge(&self, collection: &str, key: &str, fields: &Map<String, Value>) -> Result<Value> {
        let mut body = match self.get(collection, key)?.map(|d| d.body) {
            Some(Value::Object(existing)) => existing,
            _ => Map::new(),
        };
        for (field, value) in fields {
            body.insert(field.clone(), value.clone());
        }
        let merged = Value::Object(body);
        self.put(collection, key, &merged)?;
        Ok(merged)
    }

    pub fn delete(&self, collection: &str, key: &str) -> Result<bool> {
        let n = self.conn.execute(
            "DELETE FROM documents WHERE collection = ?1 AND key = ?2",
            params![collection, key],
        )?;
        Ok(n > 0)
    }

    /// All documents in a collection, by key
    pub fn list(&self, collection: &str) -> Result<Vec<StoredDocument>> {
        let mut stmt = self.conn.prepare(
            "SELECT key, body, updated_at FROM documents WHERE collection = ?1 ORDER BY key",
        )?;
        let docs = stmt
            .query_map(params![collection], |row| {
                let key: String = row.get(0)?;
                let body: String = row.get(1)?;
                let updated_at: String = row.get(2)?;
                Ok(StoredDocument {
                    collection: collection.to_string(),
                    key,
                    body: parse_body(&body)?,
                    updated_at: parse_datetime(&updated_at)?,
                })
            })?
            .collect::<std::result::Result<Vec<_>, _>>()?;
        Ok(docs)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::storage::Database;
    use serde_json::json;

    fn fields(v: Value) -> Map<String, Value> {
        match v {
            Value::Object(m) => m,
            _ => panic!("expected object"),
        }
    }

    #[test]
    fn test_merge_keeps_untouched_fields() {
        let db = Database::open_in_memory().unwrap();
        let store = db.documents();

        store
            .merge("admin", "state", &fields(json!({"isGoLiveEnabled": false, "activeSlotId": "morning"})))
            .unwrap();
        let merged = store
            .merge("admin", "state", &fields(json!({"isGoLiveEnabled": true})))
            .unwrap();

        assert_eq!(merged, json!({"isGoLiveEnabled": true, "activeSlotId": "morning"}));
        assert_eq!(store.get("admin", "state").unwrap().unwrap().body, merged);
    }

    #[test]
    fn test_missing_document() {
        let db = Database::open_in_memory().unwrap();
        assert!(db.documents().get("admin", "state").unwrap().is_none());
        assert!(!db.documents().delete("admin", "state").unwrap());
    }

    #[test]
    fn test_list_by_collection() {
        let db = Database::open_in_memory().unwrap();
        let store = db.documents();
        store.put("admin", "b", &json!({"n": 2})).unwrap();
        store.put("admin", "a", &json!({"n": 1})).unwrap();
        store.put("other", "c", &json!({})).unwrap();

        let keys: Vec<_> = store.list("admin").unwrap().into_iter().map(|d| d.key).collect();
        assert_eq!(keys, vec!["a", "b"]);
    }
}
