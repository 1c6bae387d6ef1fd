//! Append-only log archive, bounded per collection

use chrono::Utc;
use rusqlite::{params, Connection};
use serde_json::Value;

use crate::error::Result;
use crate::storage::parse::parse_body;

pub struct LogArchive<'a> {
    conn: &'a Connection,
}

impl<'a> LogArchive<'a> {
    pub fn new(conn: &'a Connection) -> Self {
        Self { conn }
    }

    /// Append a record; returns its row id
    pub fn append(&self, collection: &str, record: &Value) -> Result<i64> {
        self.conn.execute(
            "INSERT INTO log_records (collection, body, created_at) VALUES (?1, ?2, ?3)",
            params![
                collection,
                serde_json::to_string(record)?,
                Utc::now().to_rfc3339()
            ],
        )?;
        Ok(self.conn.last_insert_rowid())
    }

    /// Latest `limit` records, most recent first
    pub fn recent(&self, collection: &str, limit: usize) -> Result<Vec<Value>> {
        let mut stmt = self.conn.prepare(
            "SELECT body FROM log_records WHERE collection = ?1 ORDER BY id DESC LIMIT ?2",
        )?;
        let records = stmt
            .query_map(params![collection, limit as i64], |row| {
                let body: String = row.get(0)?;
                parse_body(&body)
            })?
            .collect::<std::result::Result<Vec<_>, _>>()?;
        Ok(records)
    }

    pub fn count(&self, collection: &str) -> Result<u64> {
        let n: i64 = self.conn.query_row(
            "SELECT COUNT(*) FROM log_records WHERE collection = ?1",
            params![collection],
            |row| row.get(0),
        )?;
        Ok(n as u64)
    }

    /// Drop all but the newest `keep` records; returns how many were removed
    pub fn prune(&self, collection: &str, keep: usize) -> Result<usize> {
        let removed = self.conn.execute(
            "DELETE FROM log_records WHERE collection = ?1 AND id NOT IN (
                SELECT id FROM log_records WHERE collection = ?1 ORDER BY id DESC LIMIT ?2
            )",
            params![collection, keep as i64],
        )?;
        if removed > 0 {
            tracing::debug!(collection, removed, "Pruned log archive");
        }
        Ok(removed)
    }
}

#[cfg(test)]
mod tests {
    use crate::storage::Database;
    use serde_json::json;

    #[test]
    fn test_recent_is_newest_first() {
        let db = Database::open_in_memory().unwrap();
        let archive = db.log_archive();
        for i in 0..3 {
            archive.append("logs", &json!({"n": i})).unwrap();
        }

        let recent = archive.recent("logs", 2).unwrap();
        assert_eq!(recent, vec![json!({"n": 2}), json!({"n": 1})]);
    }

    #[test]
    fn test_prune_keeps_newest() {
        let db = Database::open_in_memory().unwrap();
        let archive = db.log_archive();
        for i in 0..5 {
            archive.append("logs", &json!({"n": i})).unwrap();
        }
        archive.append("other", &json!({})).unwrap();

        assert_eq!(archive.prune("logs", 2).unwrap(), 3);
        assert_eq!(archive.count("logs").unwrap(), 2);
        assert_eq!(archive.count("other").unwrap(), 1);
        assert_eq!(archive.recent("logs", 10).unwrap()[1], json!({"n": 3}));
    }
}
