//! Eli's English 学习进度核心
//!
//! 进度存储、连续天数、积分与徽章、对话引擎和导师报告。

pub mod cli;
pub mod clock;
pub mod config;
pub mod lesson;
pub mod logging;
pub mod services;
pub mod state;
pub mod storage;

pub use clock::{Clock, FixedClock, SystemClock};
pub use lesson::{GameType, Lesson, LessonCatalog, LessonSource, Theme};
pub use services::activity::{ActivityInput, RecordOutcome};
pub use state::ProgressContext;
pub use storage::{ProgressRecord, ProgressStore};
