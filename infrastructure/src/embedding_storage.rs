use anyhow::Context;
use domain::error::QuestionCacheError;
use rusqlite::{params, Connection, OptionalExtension, Result as SqlResult};
use shared::types::Result;
use std::path::{Path, PathBuf};
use std::time::{SystemTime, UNIX_EPOCH};

/// A row of the `embeddings` table.
#[derive(Debug, Clone, PartialEq)]
pub struct StoredEmbedding {
    pub id: String,
    pub vector: Vec<f32>,
    pub content: String,
    pub metadata: Option<String>,
}

/// SQLite file holding embedded collections and a small key-value table.
pub struct EmbeddingStorage {
    conn: Connection,
    path: PathBuf,
}

impl EmbeddingStorage {
    pub fn new(db_path: impl AsRef<Path>) -> Result<Self> {
        let path = db_path.as_ref().to_path_buf();
        if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
            std::fs::create_dir_all(parent)
                .with_context(|| format!("Failed creating {}", parent.display()))?;
        }
        let conn = Connection::open(&path)
            .with_context(|| format!("Failed opening database at {}", path.display()))?;
        Self::setup_db(&conn)?;
        Ok(Self { conn, path })
    }

    fn setup_db(conn: &Connection) -> SqlResult<()> {
        conn.execute_batch(
            "
            PRAGMA journal_mode=WAL;
            PRAGMA synchronous=NORMAL;
            PRAGMA foreign_keys=ON;
            CREATE TABLE IF NOT EXISTS collections (
                id INTEGER PRIMARY KEY,
                name TEXT NOT NULL UNIQUE,
                model TEXT NOT NULL
            );
            CREATE TABLE IF NOT EXISTS embeddings (
                collection_id INTEGER NOT NULL REFERENCES collections(id) ON DELETE CASCADE,
                id TEXT NOT NULL,
                embedding BLOB NOT NULL,
                content TEXT NOT NULL,
                metadata TEXT,
                updated INTEGER NOT NULL,
                PRIMARY KEY (collection_id, id)
            );
            CREATE TABLE IF NOT EXISTS kv (
                key TEXT PRIMARY KEY,
                value TEXT NOT NULL
            );
        ",
        )
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Return the collection id for `name`, creating it on first use.
    /// A collection is bound to the embedding model that first populated it.
    pub fn ensure_collection(&self, name: &str, model: &str) -> Result<i64> {
        self.conn.execute(
            "INSERT OR IGNORE INTO collections (name, model) VALUES (?1, ?2)",
            params![name, model],
        )?;
        let (id, stored_model): (i64, String) = self.conn.query_row(
            "SELECT id, model FROM collections WHERE name = ?1",
            [name],
            |row| Ok((row.get(0)?, row.get(1)?)),
        )?;
        if stored_model != model {
            return Err(QuestionCacheError::InvalidConfig(format!(
                "collection '{name}' was embedded with '{stored_model}', not '{model}'; \
                 clear the cache to switch embedding models"
            ))
            .into());
        }
        Ok(id)
    }

    pub fn has_embedding(&self, collection_id: i64, id: &str) -> Result<bool> {
        let found = self
            .conn
            .query_row(
                "SELECT 1 FROM embeddings WHERE collection_id = ?1 AND id = ?2",
                params![collection_id, id],
                |_| Ok(()),
            )
            .optional()?;
        Ok(found.is_some())
    }

    /// Insert rows, leaving any existing row with the same id untouched.
    /// Returns how many rows were actually written.
    pub fn insert_embeddings(&self, collection_id: i64, embeddings: &[StoredEmbedding]) -> Result<usize> {
        let updated = SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .map(|d| d.as_secs() as i64)
            .unwrap_or_default();
        let tx = self.conn.unchecked_transaction()?;
        let mut written = 0;
        {
            let mut stmt = tx.prepare(
                "INSERT OR IGNORE INTO embeddings (collection_id, id, embedding, content, metadata, updated)
                 VALUES (?1, ?2, ?3, ?4, ?5, ?6)",
            )?;
            for embedding in embeddings {
                let vector_bytes = serde_json::to_vec(&embedding.vector)?;
                written += stmt.execute(params![
                    collection_id,
                    embedding.id,
                    vector_bytes,
                    embedding.content,
                    embedding.metadata,
                    updated
                ])?;
            }
        }
        tx.commit()?;
        Ok(written)
    }

    pub fn get_embedding(&self, collection_id: i64, id: &str) -> Result<Option<StoredEmbedding>> {
        let mut stmt = self.conn.prepare(
            "SELECT id, embedding, content, metadata FROM embeddings WHERE collection_id = ?1 AND id = ?2",
        )?;
        let mut rows = stmt.query(params![collection_id, id])?;
        match rows.next()? {
            Some(row) => Ok(Some(Self::read_row(row)?)),
            None => Ok(None),
        }
    }

    pub fn get_all_embeddings(&self, collection_id: i64) -> Result<Vec<StoredEmbedding>> {
        let mut stmt = self.conn.prepare(
            "SELECT id, embedding, content, metadata FROM embeddings WHERE collection_id = ?1",
        )?;
        let mut rows = stmt.query([collection_id])?;
        let mut embeddings = Vec::new();
        while let Some(row) = rows.next()? {
            embeddings.push(Self::read_row(row)?);
        }
        Ok(embeddings)
    }

    fn read_row(row: &rusqlite::Row<'_>) -> Result<StoredEmbedding> {
        let vector_bytes: Vec<u8> = row.get(1)?;
        Ok(StoredEmbedding {
            id: row.get(0)?,
            vector: serde_json::from_slice(&vector_bytes)?,
            content: row.get(2)?,
            metadata: row.get(3)?,
        })
    }

    pub fn count_embeddings(&self, collection_id: i64) -> Result<usize> {
        let count: i64 = self.conn.query_row(
            "SELECT COUNT(*) FROM embeddings WHERE collection_id = ?1",
            [collection_id],
            |row| row.get(0),
        )?;
        Ok(count as usize)
    }

    /// Drop a collection and every row embedded into it, whatever model it
    /// was built with. Returns how many rows were removed; 0 if it never existed.
    pub fn delete_collection(&self, name: &str) -> Result<usize> {
        let tx = self.conn.unchecked_transaction()?;
        let removed = tx.execute(
            "DELETE FROM embeddings WHERE collection_id IN (SELECT id FROM collections WHERE name = ?1)",
            [name],
        )?;
        tx.execute("DELETE FROM collections WHERE name = ?1", [name])?;
        tx.commit()?;
        Ok(removed)
    }

    pub fn get_kv(&self, key: &str) -> Result<Option<String>> {
        let value = self
            .conn
            .query_row("SELECT value FROM kv WHERE key = ?1", [key], |row| row.get(0))
            .optional()?;
        Ok(value)
    }

    pub fn upsert_kv(&self, key: &str, value: &str) -> Result<()> {
        self.conn.execute(
            "INSERT OR REPLACE INTO kv (key, value) VALUES (?1, ?2)",
            params![key, value],
        )?;
        Ok(())
    }

    /// Flush and release the connection.
    pub fn close(self) -> Result<()> {
        self.conn.execute_batch("PRAGMA optimize;")?;
        self.conn
            .close()
            .map_err(|(_, e)| anyhow::Error::new(e).context("Failed closing database"))
    }
}
