//! 进度报告
//!
//! 只读派生：困难单词、近 7 天平均时长、主题使用情况，以及导出给
//! 导师的 JSON / Markdown 报告。

use std::collections::BTreeMap;
use std::fmt::Write as _;

use chrono::{DateTime, NaiveDate, Utc};
use serde::Serialize;

use crate::lesson::{LessonSource, Theme};
use crate::storage::{DailyBucket, ProgressRecord, UserProfile};

pub const DIFFICULT_MIN_REVIEWS: u32 = 3;
pub const DIFFICULT_ERROR_RATE: f64 = 0.3;
pub const RECENT_DAYS: usize = 7;
pub const MARKDOWN_WORD_LIMIT: usize = 10;

const NO_DIFFICULT_WORDS: &str = "No difficult words identified yet!";

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct DifficultWord {
    pub vocabulary_id: String,
    pub error_rate: f64,
    pub times_reviewed: u32,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ReportSummary {
    pub total_days: usize,
    pub total_minutes: u64,
    pub total_points: u64,
    pub current_streak: u32,
    pub longest_streak: u32,
    pub badges_earned: usize,
    pub badges_total: usize,
    pub average_daily_minutes: u32,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ProgressReport {
    pub generated_at: DateTime<Utc>,
    pub profile: UserProfile,
    pub summary: ReportSummary,
    pub recent_activity: Vec<DailyBucket>,
    pub difficult_words: Vec<DifficultWord>,
    pub theme_usage: BTreeMap<Theme, u32>,
}

/// 复习至少 3 次且错误率高于 30% 的单词，错误率从高到低
pub fn difficult_words(record: &ProgressRecord) -> Vec<DifficultWord> {
    let mut words: Vec<DifficultWord> = record
        .word_performance
        .values()
        .filter(|stat| stat.times_reviewed >= DIFFICULT_MIN_REVIEWS)
        .map(|stat| DifficultWord {
            vocabulary_id: stat.vocabulary_id.clone(),
            error_rate: stat.error_rate(),
            times_reviewed: stat.times_reviewed,
        })
        .filter(|word| word.error_rate > DIFFICULT_ERROR_RATE)
        .collect();

    words.sort_by(|a, b| {
        b.error_rate
            .total_cmp(&a.error_rate)
            .then_with(|| a.vocabulary_id.cmp(&b.vocabulary_id))
    });
    words
}

/// 最近 7 条每日记录的平均分钟数（四舍五入），没有记录时为 0
pub fn average_daily_minutes(record: &ProgressRecord) -> u32 {
    let recent = recent_days(record);
    if recent.is_empty() {
        return 0;
    }
    let total: u64 = recent.iter().map(|day| u64::from(day.minutes_spent)).sum();
    (total as f64 / recent.len() as f64).round() as u32
}

/// 各主题学习分钟数
///
/// 按每日记录中完成的课程累加课程的预计时长，同一课程在不同日期
/// 完成会重复计入。四个主题总是存在。
pub fn theme_usage(record: &ProgressRecord, lessons: &dyn LessonSource) -> BTreeMap<Theme, u32> {
    let mut usage: BTreeMap<Theme, u32> = Theme::ALL.iter().map(|theme| (*theme, 0)).collect();
    for lesson_id in record
        .daily_history
        .iter()
        .flat_map(|day| day.lessons_completed.iter())
    {
        match lessons.lesson(lesson_id.as_str()) {
            Some(lesson) => {
                let minutes = usage.entry(lesson.theme).or_insert(0);
                *minutes = minutes.saturating_add(lesson.estimated_minutes);
            }
            None => tracing::debug!(lesson = %lesson_id, "completed lesson not in catalog"),
        }
    }
    usage
}

/// 今天的统计，没有记录时返回空记录
pub fn today_stats(record: &ProgressRecord, today: NaiveDate) -> DailyBucket {
    record
        .bucket_for(today)
        .cloned()
        .unwrap_or_else(|| DailyBucket::new(today))
}

/// 今日分钟数占每日目标的百分比，上限 100
pub fn daily_goal_progress(record: &ProgressRecord, today: NaiveDate) -> f64 {
    let goal = record.profile.target_daily_minutes;
    if goal == 0 {
        return 0.0;
    }
    let spent = record.bucket_for(today).map_or(0, |day| day.minutes_spent);
    (f64::from(spent) / f64::from(goal) * 100.0).min(100.0)
}

pub fn export_json(record: &ProgressRecord) -> Result<String, serde_json::Error> {
    serde_json::to_string_pretty(record)
}

pub fn export_markdown(record: &ProgressRecord, generated_on: NaiveDate) -> String {
    let mut out = String::new();
    let earned: Vec<_> = record.unlocked_badges().collect();

    // 写入 String 不会失败
    let _ = writeln!(out, "# {}'s English Learning Progress Report", record.profile.name);
    let _ = writeln!(out);
    let _ = writeln!(out, "**Generated**: {}", generated_on.format("%Y-%m-%d"));
    let _ = writeln!(out);

    let _ = writeln!(out, "## Summary");
    let _ = writeln!(out);
    let _ = writeln!(out, "- **Total Practice Time**: {} minutes", record.total_minutes);
    let _ = writeln!(out, "- **Total Points**: {}", record.total_points);
    let _ = writeln!(out, "- **Current Streak**: {} days 🔥", record.streak.current_streak);
    let _ = writeln!(out, "- **Longest Streak**: {} days", record.streak.longest_streak);
    let _ = writeln!(
        out,
        "- **Badges Earned**: {} / {}",
        earned.len(),
        record.badges.len()
    );
    let _ = writeln!(out);

    let _ = writeln!(out, "## Recent Activity (Last 7 Days)");
    let _ = writeln!(out);
    let recent = recent_days(record);
    if recent.is_empty() {
        let _ = writeln!(out, "No activity recorded yet.");
    } else {
        let _ = writeln!(out, "| Date | Minutes | Lessons | Words Reviewed | Points |");
        let _ = writeln!(out, "|------|---------|---------|----------------|--------|");
        for day in recent {
            let _ = writeln!(
                out,
                "| {} | {} | {} | {} | {} |",
                day.date.format("%Y-%m-%d"),
                day.minutes_spent,
                day.lessons_completed.len(),
                day.words_reviewed.len(),
                day.points_earned
            );
        }
    }
    let _ = writeln!(out);

    let _ = writeln!(out, "## Earned Badges");
    let _ = writeln!(out);
    for badge in &earned {
        let _ = writeln!(out, "- {} **{}**: {}", badge.icon, badge.name, badge.description);
    }
    let _ = writeln!(out);

    let _ = writeln!(out, "## Challenging Words");
    let _ = writeln!(out);
    let words = difficult_words(record);
    if words.is_empty() {
        let _ = writeln!(out, "{NO_DIFFICULT_WORDS}");
    } else {
        for word in words.iter().take(MARKDOWN_WORD_LIMIT) {
            let _ = writeln!(
                out,
                "- Word ID: {} ({}% error rate)",
                word.vocabulary_id,
                (word.error_rate * 100.0).round() as u32
            );
        }
    }

    out
}

pub fn build_report(
    record: &ProgressRecord,
    lessons: Option<&dyn LessonSource>,
    generated_at: DateTime<Utc>,
) -> ProgressReport {
    let theme_usage = match lessons {
        Some(lessons) => theme_usage(record, lessons),
        None => Theme::ALL.iter().map(|theme| (*theme, 0)).collect(),
    };

    ProgressReport {
        generated_at,
        profile: record.profile.clone(),
        summary: ReportSummary {
            total_days: record.daily_history.len(),
            total_minutes: record.total_minutes,
            total_points: record.total_points,
            current_streak: record.streak.current_streak,
            longest_streak: record.streak.longest_streak,
            badges_earned: record.unlocked_badges().count(),
            badges_total: record.badges.len(),
            average_daily_minutes: average_daily_minutes(record),
        },
        recent_activity: recent_days(record).to_vec(),
        difficult_words: difficult_words(record),
        theme_usage,
    }
}

fn recent_days(record: &ProgressRecord) -> &[DailyBucket] {
    let end = record.daily_history.len().min(RECENT_DAYS);
    &record.daily_history[..end]
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::lesson::{DifficultyLevel, Lesson, LessonCatalog};
    use crate::storage::{BadgeId, WordStat};

    fn day(offset: i64, minutes: u32) -> DailyBucket {
        let date = NaiveDate::from_ymd_opt(2026, 10, 18).unwrap() - chrono::Duration::days(offset);
        let mut bucket = DailyBucket::new(date);
        bucket.minutes_spent = minutes;
        bucket
    }

    fn stat(id: &str, correct: u32, incorrect: u32) -> WordStat {
        WordStat {
            vocabulary_id: id.to_string(),
            times_reviewed: correct + incorrect,
            times_correct: correct,
            times_incorrect: incorrect,
            last_reviewed_at: Utc::now(),
        }
    }

    fn lesson(id: &str, theme: Theme, minutes: u32) -> Lesson {
        Lesson {
            id: id.to_string(),
            title: id.to_string(),
            theme,
            difficulty_level: DifficultyLevel::A0,
            estimated_minutes: minutes,
            vocabulary: Vec::new(),
            dialogue_character: None,
            dialogue_tree: None,
            games: Vec::new(),
            unlocked: true,
        }
    }

    #[test]
    fn test_difficult_words_threshold_and_order() {
        let mut record = ProgressRecord::default();
        for s in [
            stat("easy", 9, 1),
            stat("few", 0, 2),
            stat("border", 7, 3),
            stat("hard", 1, 3),
            stat("mid", 3, 2),
        ] {
            record.word_performance.insert(s.vocabulary_id.clone(), s);
        }

        let ids: Vec<String> = difficult_words(&record)
            .into_iter()
            .map(|w| w.vocabulary_id)
            .collect();
        assert_eq!(ids, vec!["hard", "mid"]);
    }

    #[test]
    fn test_average_daily_minutes_uses_newest_seven() {
        let mut record = ProgressRecord::default();
        assert_eq!(average_daily_minutes(&record), 0);

        record.daily_history = (0..10).map(|i| day(i, if i < 7 { 10 } else { 100 })).collect();
        assert_eq!(average_daily_minutes(&record), 10);

        record.daily_history = vec![day(0, 5), day(1, 6)];
        assert_eq!(average_daily_minutes(&record), 6);
    }

    #[test]
    fn test_theme_usage_counts_each_day() {
        let catalog = LessonCatalog::new(
            vec![lesson("k1", Theme::Kpop, 5), lesson("s1", Theme::Skiing, 8)],
            Vec::new(),
        );
        let mut record = ProgressRecord::default();
        let mut today = day(0, 0);
        today.add_lesson("k1");
        today.add_lesson("unknown");
        let mut yesterday = day(1, 0);
        yesterday.add_lesson("k1");
        yesterday.add_lesson("s1");
        record.daily_history = vec![today, yesterday];

        let usage = theme_usage(&record, &catalog);
        assert_eq!(usage.len(), 4);
        assert_eq!(usage[&Theme::Kpop], 10);
        assert_eq!(usage[&Theme::Skiing], 8);
        assert_eq!(usage[&Theme::HarryPotter], 0);
        assert_eq!(usage[&Theme::General], 0);
    }

    #[test]
    fn test_markdown_for_fresh_record() {
        let record = ProgressRecord::default();
        let md = export_markdown(&record, NaiveDate::from_ymd_opt(2026, 10, 18).unwrap());
        assert!(md.starts_with("# Eli's English Learning Progress Report"));
        assert!(md.contains("**Generated**: 2026-10-18"));
        assert!(md.contains("- **Badges Earned**: 0 / 7"));
        assert!(md.contains(NO_DIFFICULT_WORDS));
    }

    #[test]
    fn test_markdown_lists_badges_and_words() {
        let mut record = ProgressRecord::default();
        crate::services::badge::unlock_badge(&mut record, BadgeId::FirstLesson, Utc::now());
        record.daily_history = vec![day(0, 15)];
        record.word_performance.insert("cat".into(), stat("cat", 1, 2));

        let md = export_markdown(&record, NaiveDate::from_ymd_opt(2026, 10, 18).unwrap());
        let badge = record.badge(BadgeId::FirstLesson).unwrap();
        assert!(md.contains(&format!("- {} **{}**: {}", badge.icon, badge.name, badge.description)));
        assert!(md.contains("| 2026-10-18 | 15 | 0 | 0 | 0 |"));
        assert!(md.contains("- Word ID: cat (67% error rate)"));
        assert!(!md.contains(NO_DIFFICULT_WORDS));
    }

    #[test]
    fn test_export_json_round_trips() {
        let record = ProgressRecord::default();
        let json = export_json(&record).unwrap();
        assert!(json.contains('\n'));
        let parsed: ProgressRecord = serde_json::from_str(&json).unwrap();
        assert_eq!(parsed, record);
    }

    #[test]
    fn test_daily_goal_progress_caps_at_hundred() {
        let mut record = ProgressRecord::default();
        let today = NaiveDate::from_ymd_opt(2026, 10, 18).unwrap();
        assert_eq!(daily_goal_progress(&record, today), 0.0);
        record.daily_history = vec![day(0, 15)];
        assert_eq!(daily_goal_progress(&record, today), 50.0);
        record.daily_history = vec![day(0, 90)];
        assert_eq!(daily_goal_progress(&record, today), 100.0);
        assert_eq!(today_stats(&record, today).minutes_spent, 90);
    }
}
