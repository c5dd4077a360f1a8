use super::Backend;
use crate::document::Document;
use crate::error::Result;
use rusqlite::{params, Connection, OptionalExtension};
use std::path::Path;

/// The document as a single row in an SQLite database.
///
/// Each save is one upsert statement, which SQLite applies atomically.
pub struct SqliteBackend {
    conn: Connection,
}

impl SqliteBackend {
    /// Open or create the database at the given path.
    pub fn open(path: &Path) -> Result<Self> {
        let conn = Connection::open(path)?;
        let backend = SqliteBackend { conn };
        backend.initialize_tables()?;
        Ok(backend)
    }

    /// Open an in-memory database (for testing).
    pub fn open_in_memory() -> Result<Self> {
        let conn = Connection::open_in_memory()?;
        let backend = SqliteBackend { conn };
        backend.initialize_tables()?;
        Ok(backend)
    }

    fn initialize_tables(&self) -> Result<()> {
        self.conn.execute_batch(
            "
            CREATE TABLE IF NOT EXISTS document (
                id INTEGER PRIMARY KEY CHECK (id = 1),
                version INTEGER NOT NULL,
                data_json TEXT NOT NULL,
                updated_at TEXT NOT NULL DEFAULT (datetime('now'))
            );
            ",
        )?;
        Ok(())
    }

    /// When the document was last written, as SQLite's `datetime('now')`.
    pub fn last_updated(&self) -> Result<Option<String>> {
        let result = self
            .conn
            .query_row("SELECT updated_at FROM document WHERE id = 1", [], |row| {
                row.get(0)
            })
            .optional()?;
        Ok(result)
    }
}

impl Backend for SqliteBackend {
    fn name(&self) -> &'static str {
        "sqlite"
    }

    fn load(&self) -> Result<Option<Document>> {
        let raw: Option<String> = self
            .conn
            .query_row("SELECT data_json FROM document WHERE id = 1", [], |row| {
                row.get(0)
            })
            .optional()?;
        match raw {
            Some(raw) => Ok(Some(Document::from_json(&raw)?)),
            None => Ok(None),
        }
    }

    fn save(&self, doc: &Document) -> Result<()> {
        let data_json = doc.to_json(false)?;
        self.conn.execute(
            "INSERT INTO document (id, version, data_json, updated_at)
             VALUES (1, ?1, ?2, datetime('now'))
             ON CONFLICT(id) DO UPDATE SET
                version = excluded.version,
                data_json = excluded.data_json,
                updated_at = excluded.updated_at",
            params![doc.version as i64, data_json],
        )?;
        Ok(())
    }
}
