//! 本地进度存储模块
//!
//! 进度以单个 JSON 文档保存在固定的键下，另有一个键保存 schema 版本号。
//! 提供：
//! - 可替换的键值后端（内存 / 文件目录 / SQLite）
//! - 带版本检查与默认值合并的加载逻辑
//! - 失败只记录日志、不向调用方抛出的保存逻辑

// ============================================================
// 子模块声明
// ============================================================

pub mod defaults;
pub mod file;
pub mod memory;
pub mod models;
pub mod progress_store;
pub mod sqlite;

// ============================================================
// 重新导出主要类型
// ============================================================

pub use file::FileStore;
pub use memory::MemoryStore;
pub use models::*;
pub use progress_store::{ProgressStore, CURRENT_VERSION, PROGRESS_KEY, VERSION_KEY};
pub use sqlite::SqliteStore;

use thiserror::Error;

// ============================================================
// 错误类型定义
// ============================================================

/// 存储模块错误类型
#[derive(Error, Debug)]
pub enum StorageError {
    #[error("database error: {0}")]
    Database(#[from] rusqlite::Error),

    #[error("serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("io error: {0}")]
    Io(#[from] std::io::Error),

    #[error("lock acquisition failed: {0}")]
    LockError(String),

    #[error("invalid storage key: {0}")]
    InvalidKey(String),
}

pub type StorageResult<T> = Result<T, StorageError>;

// ============================================================
// KeyValueStore - 键值后端
// ============================================================

/// 字符串键值后端
///
/// 语义与浏览器的 localStorage 相同：整体读取、整体覆盖。
pub trait KeyValueStore: Send + Sync {
    fn get(&self, key: &str) -> StorageResult<Option<String>>;

    fn set(&self, key: &str, value: &str) -> StorageResult<()>;

    /// 删除键，返回是否确实删除了数据
    fn remove(&self, key: &str) -> StorageResult<bool>;
}

impl<T: KeyValueStore + ?Sized> KeyValueStore for Box<T> {
    fn get(&self, key: &str) -> StorageResult<Option<String>> {
        (**self).get(key)
    }

    fn set(&self, key: &str, value: &str) -> StorageResult<()> {
        (**self).set(key, value)
    }

    fn remove(&self, key: &str) -> StorageResult<bool> {
        (**self).remove(key)
    }
}
