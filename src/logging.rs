//! 日志初始化
//!
//! 终端日志写到 stderr，stdout 留给命令输出。设置 `ENABLE_FILE_LOGS=true`
//! 时另外按天滚动写入 `LOG_DIR`（默认 `./logs`）。

use std::path::PathBuf;

use tracing_appender::non_blocking::WorkerGuard;
use tracing_appender::rolling::{RollingFileAppender, Rotation};
use tracing_subscriber::{fmt, layer::SubscriberExt, util::SubscriberInitExt, EnvFilter, Layer};

const LOG_FILE_PREFIX: &str = "elis-english.log";
const DEFAULT_LOG_DIR: &str = "./logs";

/// 持有后台写线程，drop 时刷新剩余日志
pub struct FileLogGuard {
    _guard: WorkerGuard,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LogSettings {
    pub level: String,
    pub file_dir: Option<PathBuf>,
}

impl LogSettings {
    pub fn from_env(level: &str) -> Self {
        let enabled = std::env::var("ENABLE_FILE_LOGS")
            .map(|v| v == "true" || v == "1")
            .unwrap_or(false);
        let file_dir = enabled.then(|| {
            std::env::var("LOG_DIR")
                .map(PathBuf::from)
                .unwrap_or_else(|_| PathBuf::from(DEFAULT_LOG_DIR))
        });
        Self {
            level: level.to_string(),
            file_dir,
        }
    }
}

fn build_filter(level: &str) -> EnvFilter {
    EnvFilter::try_new(level).unwrap_or_else(|_| EnvFilter::new("info"))
}

/// 安装全局 subscriber
///
/// 已经安装过（例如测试中重复调用）时保持原样。
pub fn init_tracing(log_level: &str) -> Option<FileLogGuard> {
    init_with(&LogSettings::from_env(log_level))
}

pub fn init_with(settings: &LogSettings) -> Option<FileLogGuard> {
    let stderr_layer = fmt::layer()
        .with_writer(std::io::stderr)
        .with_target(false);

    let mut guard = None;
    let file_layer = match &settings.file_dir {
        Some(dir) => match std::fs::create_dir_all(dir) {
            Ok(()) => {
                let appender = RollingFileAppender::new(Rotation::DAILY, dir, LOG_FILE_PREFIX);
                let (writer, worker) = tracing_appender::non_blocking(appender);
                guard = Some(FileLogGuard { _guard: worker });
                Some(
                    fmt::layer()
                        .with_writer(writer)
                        .with_ansi(false)
                        .with_target(true)
                        .boxed(),
                )
            }
            Err(err) => {
                eprintln!("failed to create log directory {}: {err}", dir.display());
                None
            }
        },
        None => None,
    };

    let installed = tracing_subscriber::registry()
        .with(build_filter(&settings.level))
        .with(stderr_layer)
        .with(file_layer)
        .try_init();

    if installed.is_err() {
        return None;
    }
    guard
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_repeated_init_does_not_panic() {
        let settings = LogSettings {
            level: "warn".into(),
            file_dir: None,
        };
        let _ = init_with(&settings);
        assert!(init_with(&settings).is_none());
    }
}
