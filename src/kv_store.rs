use anyhow::{Context, Result};
use async_trait::async_trait;
use chrono::Utc;
use match_tracker::KeyValueStore;
use parking_lot::Mutex;
use rusqlite::{params, Connection, OptionalExtension};
use std::path::Path;
use std::sync::Arc;

/// Single-table SQLite key-value store. Calls run on the blocking pool.
pub struct SqliteStore {
    conn: Arc<Mutex<Connection>>,
}

impl SqliteStore {
    pub fn open(path: impl AsRef<Path>) -> Result<Self> {
        let db_path = path.as_ref();
        if let Some(parent) = db_path.parent() {
            std::fs::create_dir_all(parent).ok();
        }
        let conn = Connection::open(db_path).context("open sqlite db")?;
        conn.pragma_update(None, "journal_mode", "WAL").ok();
        conn.pragma_update(None, "synchronous", "NORMAL").ok();
        Self::init(conn)
    }

    pub fn in_memory() -> Result<Self> {
        Self::init(Connection::open_in_memory().context("open in-memory sqlite")?)
    }

    fn init(conn: Connection) -> Result<Self> {
        conn.execute_batch(
            r#"
            CREATE TABLE IF NOT EXISTS kv (
                key        TEXT PRIMARY KEY,
                value      TEXT NOT NULL,
                updated_at TEXT NOT NULL
            );
            "#,
        )
        .context("init kv schema")?;
        Ok(Self { conn: Arc::new(Mutex::new(conn)) })
    }
}

#[async_trait]
impl KeyValueStore for SqliteStore {
    async fn get(&self, key: &str) -> Result<Option<String>> {
        let conn = Arc::clone(&self.conn);
        let key = key.to_string();
        tokio::task::spawn_blocking(move || {
            conn.lock()
                .query_row("SELECT value FROM kv WHERE key = ?1", params![key], |row| row.get(0))
                .optional()
                .with_context(|| format!("kv get {key}"))
        })
        .await
        .context("kv get task")?
    }

    async fn set(&self, key: &str, value: &str) -> Result<()> {
        let conn = Arc::clone(&self.conn);
        let key = key.to_string();
        let value = value.to_string();
        tokio::task::spawn_blocking(move || {
            conn.lock()
                .execute(
                    r#"
                    INSERT INTO kv (key, value, updated_at) VALUES (?1, ?2, ?3)
                    ON CONFLICT(key) DO UPDATE SET value = excluded.value, updated_at = excluded.updated_at
                    "#,
                    params![key, value, Utc::now().to_rfc3339()],
                )
                .with_context(|| format!("kv set {key}"))?;
            Ok(())
        })
        .await
        .context("kv set task")?
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn set_overwrites_and_get_reads_back() {
        let store = SqliteStore::in_memory().unwrap();
        assert_eq!(store.get("tracked").await.unwrap(), None);
        store.set("tracked", "{}").await.unwrap();
        store.set("tracked", r#"{"p1":{}}"#).await.unwrap();
        assert_eq!(store.get("tracked").await.unwrap().as_deref(), Some(r#"{"p1":{}}"#));
    }

    #[tokio::test]
    async fn file_store_survives_reopen() {
        let path = std::env::temp_dir().join(format!("rift-watch-kv-{}.sqlite", std::process::id()));
        {
            let store = SqliteStore::open(&path).unwrap();
            store.set("puuid:zoe#vn2", "abc").await.unwrap();
        }
        let reopened = SqliteStore::open(&path).unwrap();
        assert_eq!(reopened.get("puuid:zoe#vn2").await.unwrap().as_deref(), Some("abc"));
        for suffix in ["", "-wal", "-shm"] {
            std::fs::remove_file(format!("{}{suffix}", path.display())).ok();
        }
    }
}
