use std::collections::HashSet;

use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};

use crate::lesson::{LessonSource, Theme};
use crate::storage::{BadgeId, ProgressRecord};

pub const WEEK_STREAK_DAYS: u32 = 7;
pub const WORD_MASTER_WORDS: usize = 100;
pub const THEME_LESSON_TARGET: usize = 5;

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BadgeProgress {
    pub badge_id: String,
    pub current_value: f64,
    pub target_value: f64,
    pub percentage: f64,
}

/// 一次评估的结果：新的进度与本次新解锁的徽章
#[derive(Debug, Clone)]
pub struct BadgeEvaluation {
    pub record: ProgressRecord,
    pub newly_unlocked: Vec<BadgeId>,
}

/// 检查所有未解锁徽章，满足条件的解锁
///
/// 徽章只会从锁定变为解锁，已解锁的徽章不会被修改。主题徽章需要
/// 课程来源才能判断，`lessons` 为 `None` 时保持锁定。
pub fn evaluate_badges(
    record: &ProgressRecord,
    today: NaiveDate,
    now: DateTime<Utc>,
    lessons: Option<&dyn LessonSource>,
) -> BadgeEvaluation {
    let mut next = record.clone();
    let mut newly_unlocked = Vec::new();

    for id in BadgeId::ALL {
        if next.is_unlocked(id) {
            continue;
        }
        if check_badge_eligibility(id, &next, today, lessons) && unlock_badge(&mut next, id, now) {
            newly_unlocked.push(id);
        }
    }

    if !newly_unlocked.is_empty() {
        let ids: Vec<&str> = newly_unlocked.iter().map(|id| id.as_str()).collect();
        tracing::info!(badges = ?ids, "badges unlocked");
    }

    BadgeEvaluation {
        record: next,
        newly_unlocked,
    }
}

pub fn check_badge_eligibility(
    id: BadgeId,
    record: &ProgressRecord,
    today: NaiveDate,
    lessons: Option<&dyn LessonSource>,
) -> bool {
    let current = current_value(id, record, today, lessons);
    match current {
        Some(value) => value >= target_value(id),
        None => false,
    }
}

/// 解锁指定徽章，已解锁或不在目录中时返回 false
pub fn unlock_badge(record: &mut ProgressRecord, id: BadgeId, now: DateTime<Utc>) -> bool {
    let Some(badge) = record.badges.iter_mut().find(|badge| badge.id == id.as_str()) else {
        tracing::warn!(badge = id.as_str(), "badge missing from catalog");
        return false;
    };
    if badge.unlocked {
        return false;
    }
    badge.unlocked = true;
    badge.earned_at = Some(now);
    true
}

pub fn get_badge_progress(
    record: &ProgressRecord,
    id: BadgeId,
    today: NaiveDate,
    lessons: Option<&dyn LessonSource>,
) -> BadgeProgress {
    let target_value = target_value(id);
    let current_value = if record.is_unlocked(id) {
        target_value
    } else {
        current_value(id, record, today, lessons).unwrap_or(0.0)
    };
    let percentage = (current_value / target_value * 100.0).min(100.0);

    BadgeProgress {
        badge_id: id.as_str().to_string(),
        current_value,
        target_value,
        percentage,
    }
}

/// 某主题下已完成的不同课程数（在保留的每日记录范围内）
pub fn completed_lessons_for_theme(
    record: &ProgressRecord,
    theme: Theme,
    lessons: &dyn LessonSource,
) -> usize {
    let mut seen = HashSet::new();
    record
        .daily_history
        .iter()
        .flat_map(|bucket| bucket.lessons_completed.iter())
        .filter(|lesson_id| seen.insert(lesson_id.as_str()))
        .filter(|lesson_id| {
            lessons
                .lesson(lesson_id.as_str())
                .is_some_and(|lesson| lesson.theme == theme)
        })
        .count()
}

fn target_value(id: BadgeId) -> f64 {
    match id {
        BadgeId::FirstLesson | BadgeId::PerfectScore => 1.0,
        BadgeId::WeekStreak => f64::from(WEEK_STREAK_DAYS),
        BadgeId::WordMaster => WORD_MASTER_WORDS as f64,
        BadgeId::KpopStar | BadgeId::HogwartsOwl | BadgeId::SkiStar => THEME_LESSON_TARGET as f64,
    }
}

fn current_value(
    id: BadgeId,
    record: &ProgressRecord,
    today: NaiveDate,
    lessons: Option<&dyn LessonSource>,
) -> Option<f64> {
    let today_bucket = record.bucket_for(today);
    let value = match id {
        BadgeId::FirstLesson => {
            let completed = today_bucket.is_some_and(|bucket| !bucket.lessons_completed.is_empty());
            if completed { 1.0 } else { 0.0 }
        }
        BadgeId::PerfectScore => {
            let perfect = today_bucket.is_some_and(|bucket| bucket.has_perfect_score());
            if perfect { 1.0 } else { 0.0 }
        }
        BadgeId::WeekStreak => f64::from(record.streak.current_streak),
        BadgeId::WordMaster => record.distinct_words() as f64,
        BadgeId::KpopStar | BadgeId::HogwartsOwl | BadgeId::SkiStar => {
            let theme = id.theme_target()?;
            completed_lessons_for_theme(record, theme, lessons?) as f64
        }
    };
    Some(value)
}
