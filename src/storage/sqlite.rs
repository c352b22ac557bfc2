//! SQLite 键值后端
//!
//! 单表 `kv_store(key, value, updated_at)`，进度文档与版本号各占一行。

use std::path::Path;
use std::sync::{Mutex, MutexGuard};

use rusqlite::{params, Connection, OptionalExtension};

use crate::storage::{KeyValueStore, StorageError, StorageResult};

const INIT_SCHEMA: &str = "
CREATE TABLE IF NOT EXISTS kv_store (
    key        TEXT PRIMARY KEY NOT NULL,
    value      TEXT NOT NULL,
    updated_at TEXT NOT NULL DEFAULT (datetime('now'))
);
";

/// SQLite 后端
pub struct SqliteStore {
    connection: Mutex<Connection>,
    db_path: String,
}

impl SqliteStore {
    /// 打开（或创建）数据库文件
    ///
    /// 启用 WAL 模式并建表。
    ///
    /// # Example
    /// ```ignore
    /// let store = SqliteStore::new("./data/progress.db")?;
    /// ```
    pub fn new<P: AsRef<Path>>(db_path: P) -> StorageResult<Self> {
        let path_str = db_path.as_ref().to_string_lossy().to_string();
        let connection = Connection::open(&db_path)?;

        connection.execute_batch(
            "PRAGMA journal_mode=WAL;
             PRAGMA synchronous=NORMAL;",
        )?;
        connection.execute_batch(INIT_SCHEMA)?;

        Ok(Self {
            connection: Mutex::new(connection),
            db_path: path_str,
        })
    }

    /// 创建内存数据库（用于测试）
    pub fn in_memory() -> StorageResult<Self> {
        let connection = Connection::open_in_memory()?;
        connection.execute_batch(INIT_SCHEMA)?;

        Ok(Self {
            connection: Mutex::new(connection),
            db_path: ":memory:".to_string(),
        })
    }

    pub fn db_path(&self) -> &str {
        &self.db_path
    }

    fn get_connection(&self) -> StorageResult<MutexGuard<'_, Connection>> {
        self.connection
            .lock()
            .map_err(|e| StorageError::LockError(e.to_string()))
    }
}

impl KeyValueStore for SqliteStore {
    fn get(&self, key: &str) -> StorageResult<Option<String>> {
        let conn = self.get_connection()?;
        let value = conn
            .query_row("SELECT value FROM kv_store WHERE key = ?1", [key], |row| {
                row.get(0)
            })
            .optional()?;
        Ok(value)
    }

    fn set(&self, key: &str, value: &str) -> StorageResult<()> {
        let conn = self.get_connection()?;
        conn.execute(
            "INSERT OR REPLACE INTO kv_store (key, value, updated_at) VALUES (?1, ?2, datetime('now'))",
            params![key, value],
        )?;
        Ok(())
    }

    fn remove(&self, key: &str) -> StorageResult<bool> {
        let conn = self.get_connection()?;
        let affected = conn.execute("DELETE FROM kv_store WHERE key = ?1", [key])?;
        Ok(affected > 0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_in_memory_path() {
        let store = SqliteStore::in_memory().expect("Failed to create in-memory database");
        assert_eq!(store.db_path(), ":memory:");
    }

    #[test]
    fn test_kv_operations() {
        let store = SqliteStore::in_memory().expect("Failed to create in-memory database");

        store.set("test_key", "test_value").expect("Failed to set value");
        assert_eq!(store.get("test_key").unwrap(), Some("test_value".to_string()));

        // 覆盖写入
        store.set("test_key", "updated_value").unwrap();
        assert_eq!(store.get("test_key").unwrap(), Some("updated_value".to_string()));

        assert!(store.remove("test_key").unwrap());
        assert_eq!(store.get("test_key").unwrap(), None);
        assert!(!store.remove("test_key").unwrap());
    }

    #[test]
    fn test_file_database_persists_across_reopen() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("progress.db");

        {
            let store = SqliteStore::new(&path).unwrap();
            store.set("elis-english-version", "1.0.0").unwrap();
        }

        let reopened = SqliteStore::new(&path).unwrap();
        assert_eq!(
            reopened.get("elis-english-version").unwrap().as_deref(),
            Some("1.0.0")
        );
    }
}
