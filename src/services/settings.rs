//! 导师设置
//!
//! 与其他服务一样，返回修改后的新进度，由调用方提交。

use thiserror::Error;

use crate::lesson::{GameType, Theme};
use crate::storage::ProgressRecord;

/// 每日目标上限（分钟）
pub const MAX_DAILY_GOAL_MINUTES: u32 = 24 * 60;

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum SettingsError {
    #[error("daily goal must be between 1 and {max} minutes, got {got}")]
    InvalidGoal { got: u32, max: u32 },
}

pub fn set_theme(record: &ProgressRecord, theme: Theme) -> ProgressRecord {
    let mut next = record.clone();
    next.settings.current_theme = theme;
    next
}

pub fn toggle_audio(record: &ProgressRecord) -> ProgressRecord {
    let mut next = record.clone();
    next.settings.audio_enabled = !next.settings.audio_enabled;
    next
}

pub fn toggle_microphone(record: &ProgressRecord) -> ProgressRecord {
    let mut next = record.clone();
    next.settings.microphone_enabled = !next.settings.microphone_enabled;
    next
}

pub fn is_game_enabled(record: &ProgressRecord, game: GameType) -> bool {
    record.settings.enabled_games.contains(&game)
}

/// 启用或停用某个游戏类型，启用时保持 [`GameType::ALL`] 中的顺序
pub fn set_game_enabled(record: &ProgressRecord, game: GameType, enabled: bool) -> ProgressRecord {
    let mut next = record.clone();
    let games = &mut next.settings.enabled_games;
    if enabled {
        if !games.contains(&game) {
            games.push(game);
            games.sort_by_key(|g| GameType::ALL.iter().position(|known| known == g));
        }
    } else {
        games.retain(|g| *g != game);
    }
    next
}

pub fn set_daily_goal(record: &ProgressRecord, minutes: u32) -> Result<ProgressRecord, SettingsError> {
    if minutes == 0 || minutes > MAX_DAILY_GOAL_MINUTES {
        return Err(SettingsError::InvalidGoal {
            got: minutes,
            max: MAX_DAILY_GOAL_MINUTES,
        });
    }
    let mut next = record.clone();
    next.profile.target_daily_minutes = minutes;
    Ok(next)
}

/// 记录导师手动解锁的课程，重复解锁无效果
pub fn unlock_lesson(record: &ProgressRecord, lesson_id: &str) -> ProgressRecord {
    let mut next = record.clone();
    if !next.lessons_unlocked.iter().any(|id| id == lesson_id) {
        next.lessons_unlocked.push(lesson_id.to_string());
    }
    next
}
