//! 活动记录
//!
//! 所有函数都接收当前进度的只读引用并返回新的进度值，由调用方
//! （[`crate::state::ProgressContext`]）组合后一次性提交与保存。

use chrono::{DateTime, NaiveDate, Utc};

use crate::lesson::{GameType, LessonSource};
use crate::services::badge::{evaluate_badges, BadgeEvaluation};
use crate::services::streak::update_streak;
use crate::storage::{
    ActivityEvent, BadgeId, DailyBucket, ProgressRecord, WordStat, DAILY_HISTORY_LIMIT,
};

const MAX_SCORE: f64 = 100.0;

/// 小游戏 `onComplete` 上报的一次活动
#[derive(Debug, Clone, PartialEq)]
pub struct ActivityInput {
    pub lesson_id: String,
    pub game_type: GameType,
    /// 0-100，超出范围会被截断
    pub score: f64,
    pub vocabulary_used: Vec<String>,
    pub mistakes: Vec<String>,
}

impl ActivityInput {
    pub fn new(lesson_id: impl Into<String>, game_type: GameType, score: f64) -> Self {
        Self {
            lesson_id: lesson_id.into(),
            game_type,
            score,
            vocabulary_used: Vec::new(),
            mistakes: Vec::new(),
        }
    }

    pub fn with_vocabulary<I, S>(mut self, ids: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.vocabulary_used = ids.into_iter().map(Into::into).collect();
        self
    }

    pub fn with_mistakes<I, S>(mut self, ids: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.mistakes = ids.into_iter().map(Into::into).collect();
        self
    }
}

/// 一次记录事务的结果
#[derive(Debug, Clone)]
pub struct RecordOutcome {
    pub record: ProgressRecord,
    pub newly_unlocked: Vec<BadgeId>,
    pub points_earned: u32,
}

pub fn clamp_score(score: f64) -> f64 {
    if score.is_nan() {
        return 0.0;
    }
    score.clamp(0.0, MAX_SCORE)
}

/// 取得今天的记录，不存在时插入到最前面并淘汰超出上限的旧记录
pub fn today_bucket_mut(record: &mut ProgressRecord, today: NaiveDate) -> &mut DailyBucket {
    if let Some(pos) = record.daily_history.iter().position(|bucket| bucket.date == today) {
        return &mut record.daily_history[pos];
    }

    // 时钟回拨时同样插入首位，首位始终是最近写入的记录，淘汰不会删掉它
    record.daily_history.insert(0, DailyBucket::new(today));
    if record.daily_history.len() > DAILY_HISTORY_LIMIT {
        let evicted = record.daily_history.len() - DAILY_HISTORY_LIMIT;
        record.daily_history.truncate(DAILY_HISTORY_LIMIT);
        tracing::debug!(evicted, "evicted oldest daily buckets");
    }
    &mut record.daily_history[0]
}

/// 记录活动本身：事件、积分、单词统计（不含连续天数与徽章）
pub fn apply_activity(
    record: &ProgressRecord,
    activity: &ActivityInput,
    now: DateTime<Utc>,
) -> (ProgressRecord, u32) {
    let mut next = record.clone();
    let score = clamp_score(activity.score);
    if score != activity.score {
        tracing::warn!(
            raw = activity.score,
            clamped = score,
            lesson = %activity.lesson_id,
            "activity score out of range"
        );
    }
    let points = score.round() as u32;

    let mut words: Vec<&str> = Vec::with_capacity(activity.vocabulary_used.len());
    for id in &activity.vocabulary_used {
        if !words.contains(&id.as_str()) {
            words.push(id.as_str());
        }
    }

    {
        let bucket = today_bucket_mut(&mut next, now.date_naive());
        bucket.activities_completed.push(ActivityEvent {
            lesson_id: activity.lesson_id.clone(),
            game_type: activity.game_type,
            score,
            completed_at: now,
            mistakes: activity.mistakes.clone(),
        });
        bucket.points_earned = bucket.points_earned.saturating_add(points);
        for id in &words {
            bucket.add_word(id);
        }
    }
    next.total_points = next.total_points.saturating_add(u64::from(points));

    for id in words {
        let correct = !activity.mistakes.iter().any(|mistake| mistake == id);
        next.word_performance
            .entry(id.to_string())
            .or_insert_with(|| WordStat::new(id, now))
            .record_review(correct, now);
    }

    (next, points)
}

/// 完整的活动记录流程：活动 → 连续天数 → 徽章
pub fn record_activity(
    record: &ProgressRecord,
    activity: &ActivityInput,
    now: DateTime<Utc>,
    lessons: Option<&dyn LessonSource>,
) -> RecordOutcome {
    let today = now.date_naive();
    let (mut next, points_earned) = apply_activity(record, activity, now);
    next.streak = update_streak(&next.streak, today);

    let BadgeEvaluation {
        record,
        newly_unlocked,
    } = evaluate_badges(&next, today, now, lessons);

    tracing::info!(
        lesson = %activity.lesson_id,
        game = %activity.game_type,
        points = points_earned,
        streak = record.streak.current_streak,
        "activity recorded"
    );

    RecordOutcome {
        record,
        newly_unlocked,
        points_earned,
    }
}

pub fn apply_lesson_complete(
    record: &ProgressRecord,
    lesson_id: &str,
    minutes_spent: u32,
    today: NaiveDate,
) -> ProgressRecord {
    let mut next = record.clone();
    {
        let bucket = today_bucket_mut(&mut next, today);
        bucket.add_lesson(lesson_id);
        bucket.minutes_spent = bucket.minutes_spent.saturating_add(minutes_spent);
    }
    next.total_minutes = next.total_minutes.saturating_add(u64::from(minutes_spent));
    next
}

/// 记录课程完成并检查徽章
///
/// 不更新连续天数：同一次学习中应已先记录过活动。
pub fn record_lesson_complete(
    record: &ProgressRecord,
    lesson_id: &str,
    minutes_spent: u32,
    now: DateTime<Utc>,
    lessons: Option<&dyn LessonSource>,
) -> RecordOutcome {
    let today = now.date_naive();
    let next = apply_lesson_complete(record, lesson_id, minutes_spent, today);
    let BadgeEvaluation {
        record,
        newly_unlocked,
    } = evaluate_badges(&next, today, now, lessons);

    tracing::info!(lesson = %lesson_id, minutes = minutes_spent, "lesson completed");

    RecordOutcome {
        record,
        newly_unlocked,
        points_earned: 0,
    }
}
