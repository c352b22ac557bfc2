use std::fmt;
use std::path::PathBuf;
use std::str::FromStr;

use crate::storage::{FileStore, KeyValueStore, MemoryStore, SqliteStore, StorageResult};

const APP_DIR_NAME: &str = "elis-english";
const SQLITE_FILE_NAME: &str = "progress.db";
const FILE_STORE_DIR_NAME: &str = "progress";
const DEFAULT_LOG_LEVEL: &str = "info";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum StoreBackend {
    #[default]
    Sqlite,
    File,
    Memory,
}

impl StoreBackend {
    pub const fn as_str(self) -> &'static str {
        match self {
            StoreBackend::Sqlite => "sqlite",
            StoreBackend::File => "file",
            StoreBackend::Memory => "memory",
        }
    }

    pub fn parse(value: &str) -> Option<Self> {
        match value.trim().to_ascii_lowercase().as_str() {
            "sqlite" => Some(StoreBackend::Sqlite),
            "file" | "json" => Some(StoreBackend::File),
            "memory" => Some(StoreBackend::Memory),
            _ => None,
        }
    }
}

impl fmt::Display for StoreBackend {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for StoreBackend {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::parse(s).ok_or_else(|| format!("unknown store backend: {s}"))
    }
}

#[derive(Debug, Clone)]
pub struct Config {
    pub data_dir: PathBuf,
    pub store_backend: StoreBackend,
    pub log_level: String,
}

impl Config {
    pub fn from_env() -> Self {
        let data_dir = std::env::var("ELIS_DATA_DIR")
            .ok()
            .filter(|value| !value.trim().is_empty())
            .map(PathBuf::from)
            .unwrap_or_else(default_data_dir);

        let store_backend = store_backend_or_default(std::env::var("ELIS_STORE").ok().as_deref());
        let log_level = log_level_from_env();

        Self {
            data_dir,
            store_backend,
            log_level,
        }
    }

    pub fn sqlite_path(&self) -> PathBuf {
        self.data_dir.join(SQLITE_FILE_NAME)
    }

    pub fn file_store_dir(&self) -> PathBuf {
        self.data_dir.join(FILE_STORE_DIR_NAME)
    }

    /// 按配置打开存储后端，必要时创建数据目录
    pub fn open_store(&self) -> StorageResult<Box<dyn KeyValueStore>> {
        let store: Box<dyn KeyValueStore> = match self.store_backend {
            StoreBackend::Sqlite => {
                std::fs::create_dir_all(&self.data_dir)?;
                Box::new(SqliteStore::new(self.sqlite_path())?)
            }
            StoreBackend::File => Box::new(FileStore::new(self.file_store_dir())?),
            StoreBackend::Memory => Box::new(MemoryStore::new()),
        };
        tracing::debug!(backend = %self.store_backend, dir = %self.data_dir.display(), "store opened");
        Ok(store)
    }
}

/// 日志级别，取自 `RUST_LOG`
///
/// 在读取其余配置之前用于初始化日志，解析配置时的警告才不会丢失。
pub fn log_level_from_env() -> String {
    std::env::var("RUST_LOG").unwrap_or_else(|_| DEFAULT_LOG_LEVEL.to_string())
}

fn store_backend_or_default(value: Option<&str>) -> StoreBackend {
    match value {
        Some(value) => StoreBackend::parse(value).unwrap_or_else(|| {
            tracing::warn!(value = %value, "unknown ELIS_STORE, falling back to sqlite");
            StoreBackend::Sqlite
        }),
        None => StoreBackend::default(),
    }
}

fn default_data_dir() -> PathBuf {
    dirs::data_local_dir()
        .unwrap_or_else(|| PathBuf::from("."))
        .join(APP_DIR_NAME)
}
