//! SQLite storage for the sync hub

mod archive;
mod documents;
mod migrations;
mod parse;

use rusqlite::Connection;
use std::path::Path;
use tracing::instrument;

use crate::error::Result;

pub use archive::LogArchive;
pub use documents::{DocumentStore, StoredDocument};

/// Main database handle
pub struct Database {
    conn: Connection,
}

impl Database {
    /// Open or create database at the given path
    #[instrument(skip(path), fields(path = %path.as_ref().display()))]
    pub fn open<P: AsRef<Path>>(path: P) -> Result<Self> {
        let conn = Connection::open(path)?;
        let db = Self { conn };
        db.init()?;
        Ok(db)
    }

    /// Open in-memory database (for testing)
    #[instrument]
    pub fn open_in_memory() -> Result<Self> {
        let conn = Connection::open_in_memory()?;
        let db = Self { conn };
        db.init()?;
        Ok(db)
    }

    fn init(&self) -> Result<()> {
        migrations::run_migrations(&self.conn)
    }

    /// Get current schema version
    pub fn schema_version(&self) -> u32 {
        self.conn
            .query_row("SELECT MAX(version) FROM schema_migrations", [], |row| {
                row.get::<_, Option<u32>>(0)
            })
            .ok()
            .flatten()
            .unwrap_or(0)
    }

    pub fn documents(&self) -> DocumentStore<'_> {
        DocumentStore::new(&self.conn)
    }

    pub fn log_archive(&self) -> LogArchive<'_> {
        LogArchive::new(&self.conn)
    }
}
