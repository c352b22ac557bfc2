//! 学习进度数据模型
//!
//! 定义持久化文档 `ProgressRecord` 及其子结构。字段名在序列化时使用
//! camelCase，与已存储的进度文档保持一致。

use std::collections::BTreeMap;

use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};

use crate::lesson::{GameType, Theme};
use crate::storage::defaults;

/// 每日记录最多保留的天数
pub const DAILY_HISTORY_LIMIT: usize = 30;

// ============================================================
// UserProfile - 学习者档案
// ============================================================

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct UserProfile {
    pub name: String,
    pub native_language: String,
    /// 每日学习目标（分钟）
    pub target_daily_minutes: u32,
}

impl Default for UserProfile {
    fn default() -> Self {
        Self {
            name: defaults::DEFAULT_LEARNER_NAME.to_string(),
            native_language: defaults::DEFAULT_NATIVE_LANGUAGE.to_string(),
            target_daily_minutes: defaults::DEFAULT_DAILY_MINUTES,
        }
    }
}

// ============================================================
// StreakData - 连续学习天数
// ============================================================

/// 连续学习状态
///
/// 始终满足 `longest_streak >= current_streak`。`last_activity_date`
/// 以 `YYYY-MM-DD` 存储，首次活动前为空字符串。
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct StreakData {
    pub current_streak: u32,
    pub longest_streak: u32,
    #[serde(with = "date_or_empty")]
    pub last_activity_date: Option<NaiveDate>,
}

// ============================================================
// ActivityEvent / DailyBucket - 每日记录
// ============================================================

/// 一次完成的小游戏活动，记录后不可修改
///
/// 旧文档中缺失的字段取默认值（时间为 Unix 纪元）。
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct ActivityEvent {
    pub lesson_id: String,
    pub game_type: GameType,
    /// 0-100
    pub score: f64,
    pub completed_at: DateTime<Utc>,
    /// 答错的词汇 id
    pub mistakes: Vec<String>,
}

/// 某一天的学习汇总
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DailyBucket {
    pub date: NaiveDate,
    #[serde(default)]
    pub minutes_spent: u32,
    #[serde(default)]
    pub lessons_completed: Vec<String>,
    #[serde(default)]
    pub words_reviewed: Vec<String>,
    #[serde(default)]
    pub points_earned: u32,
    #[serde(default)]
    pub activities_completed: Vec<ActivityEvent>,
}

impl DailyBucket {
    pub fn new(date: NaiveDate) -> Self {
        Self {
            date,
            minutes_spent: 0,
            lessons_completed: Vec::new(),
            words_reviewed: Vec::new(),
            points_earned: 0,
            activities_completed: Vec::new(),
        }
    }

    /// 记录完成的课程，已存在时返回 false
    pub fn add_lesson(&mut self, lesson_id: &str) -> bool {
        push_unique(&mut self.lessons_completed, lesson_id)
    }

    /// 记录复习过的词汇，已存在时返回 false
    pub fn add_word(&mut self, vocabulary_id: &str) -> bool {
        push_unique(&mut self.words_reviewed, vocabulary_id)
    }

    pub fn has_perfect_score(&self) -> bool {
        self.activities_completed
            .iter()
            .any(|activity| activity.score >= defaults::PERFECT_SCORE)
    }
}

fn push_unique(items: &mut Vec<String>, value: &str) -> bool {
    if items.iter().any(|item| item == value) {
        return false;
    }
    items.push(value.to_string());
    true
}

// ============================================================
// Badge - 徽章
// ============================================================

/// 徽章目录中的固定 id
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum BadgeId {
    FirstLesson,
    WeekStreak,
    KpopStar,
    HogwartsOwl,
    SkiStar,
    WordMaster,
    PerfectScore,
}

impl BadgeId {
    pub const ALL: [BadgeId; 7] = [
        BadgeId::FirstLesson,
        BadgeId::WeekStreak,
        BadgeId::KpopStar,
        BadgeId::HogwartsOwl,
        BadgeId::SkiStar,
        BadgeId::WordMaster,
        BadgeId::PerfectScore,
    ];

    pub const fn as_str(self) -> &'static str {
        match self {
            BadgeId::FirstLesson => "first-lesson",
            BadgeId::WeekStreak => "week-streak",
            BadgeId::KpopStar => "kpop-star",
            BadgeId::HogwartsOwl => "hogwarts-owl",
            BadgeId::SkiStar => "ski-star",
            BadgeId::WordMaster => "word-master",
            BadgeId::PerfectScore => "perfect-score",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|id| id.as_str() == s)
    }

    /// 主题徽章对应的课程主题
    pub const fn theme_target(self) -> Option<Theme> {
        match self {
            BadgeId::KpopStar => Some(Theme::Kpop),
            BadgeId::HogwartsOwl => Some(Theme::HarryPotter),
            BadgeId::SkiStar => Some(Theme::Skiing),
            _ => None,
        }
    }
}

/// 徽章
///
/// 目录内徽章的展示字段以目录为准，存档只提供 `unlocked` 和 `earned_at`。
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Badge {
    pub id: String,
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub description: String,
    #[serde(default)]
    pub theme: Theme,
    #[serde(default)]
    pub icon: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub earned_at: Option<DateTime<Utc>>,
    #[serde(default)]
    pub unlocked: bool,
}

// ============================================================
// WordStat - 单词表现
// ============================================================

/// 单个词汇的答题统计
///
/// 始终满足 `times_reviewed == times_correct + times_incorrect`。
/// `vocabulary_id` 缺失时由 `word_performance` 的键补齐。
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct WordStat {
    pub vocabulary_id: String,
    pub times_reviewed: u32,
    pub times_correct: u32,
    pub times_incorrect: u32,
    pub last_reviewed_at: DateTime<Utc>,
}

impl WordStat {
    pub fn new(vocabulary_id: &str, now: DateTime<Utc>) -> Self {
        Self {
            vocabulary_id: vocabulary_id.to_string(),
            times_reviewed: 0,
            times_correct: 0,
            times_incorrect: 0,
            last_reviewed_at: now,
        }
    }

    /// 记录一次复习，正确与错误互斥
    pub fn record_review(&mut self, correct: bool, at: DateTime<Utc>) {
        self.times_reviewed = self.times_reviewed.saturating_add(1);
        if correct {
            self.times_correct = self.times_correct.saturating_add(1);
        } else {
            self.times_incorrect = self.times_incorrect.saturating_add(1);
        }
        self.last_reviewed_at = at;
    }

    pub fn error_rate(&self) -> f64 {
        if self.times_reviewed == 0 {
            return 0.0;
        }
        f64::from(self.times_incorrect) / f64::from(self.times_reviewed)
    }
}

// ============================================================
// UserSettings - 设置
// ============================================================

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct UserSettings {
    /// 导师 PIN（本地共享密钥）
    pub pin: String,
    pub enabled_games: Vec<GameType>,
    pub current_theme: Theme,
    pub audio_enabled: bool,
    pub microphone_enabled: bool,
}

impl Default for UserSettings {
    fn default() -> Self {
        Self {
            pin: defaults::DEFAULT_PIN.to_string(),
            enabled_games: GameType::ALL.to_vec(),
            current_theme: Theme::General,
            audio_enabled: true,
            microphone_enabled: true,
        }
    }
}

// ============================================================
// ProgressRecord - 根聚合
// ============================================================

/// 一次安装对应的全部学习进度
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct ProgressRecord {
    pub profile: UserProfile,
    pub total_points: u64,
    pub total_minutes: u64,
    pub streak: StreakData,
    /// 最新的一天在前，最多 [`DAILY_HISTORY_LIMIT`] 条
    pub daily_history: Vec<DailyBucket>,
    pub badges: Vec<Badge>,
    pub word_performance: BTreeMap<String, WordStat>,
    pub lessons_unlocked: Vec<String>,
    pub settings: UserSettings,
}

impl Default for ProgressRecord {
    fn default() -> Self {
        Self {
            profile: UserProfile::default(),
            total_points: 0,
            total_minutes: 0,
            streak: StreakData::default(),
            daily_history: Vec::new(),
            badges: defaults::default_badges(),
            word_performance: BTreeMap::new(),
            lessons_unlocked: Vec::new(),
            settings: UserSettings::default(),
        }
    }
}

impl ProgressRecord {
    pub fn bucket_for(&self, date: NaiveDate) -> Option<&DailyBucket> {
        self.daily_history.iter().find(|bucket| bucket.date == date)
    }

    pub fn badge(&self, id: BadgeId) -> Option<&Badge> {
        self.badges.iter().find(|badge| badge.id == id.as_str())
    }

    pub fn is_unlocked(&self, id: BadgeId) -> bool {
        self.badge(id).is_some_and(|badge| badge.unlocked)
    }

    pub fn unlocked_badges(&self) -> impl Iterator<Item = &Badge> {
        self.badges.iter().filter(|badge| badge.unlocked)
    }

    pub fn distinct_words(&self) -> usize {
        self.word_performance.len()
    }

    /// 按目录整理徽章（旧文档兼容），返回补齐数量
    ///
    /// 已存在的目录徽章重新套用目录中的展示字段，缺失的徽章追加在末尾。
    pub fn ensure_badge_catalog(&mut self) -> usize {
        let mut added = 0;
        for template in defaults::default_badges() {
            match self.badges.iter_mut().find(|badge| badge.id == template.id) {
                Some(stored) => {
                    stored.name = template.name;
                    stored.description = template.description;
                    stored.theme = template.theme;
                    stored.icon = template.icon;
                }
                None => {
                    self.badges.push(template);
                    added += 1;
                }
            }
        }
        added
    }

    /// 用 `word_performance` 的键补齐缺失的词汇 id
    pub fn backfill_word_ids(&mut self) -> usize {
        let mut filled = 0;
        for (key, stat) in self.word_performance.iter_mut() {
            if stat.vocabulary_id.is_empty() {
                stat.vocabulary_id = key.clone();
                filled += 1;
            }
        }
        filled
    }
}

// ============================================================
// 日期序列化：`YYYY-MM-DD` 或空字符串
// ============================================================

pub(crate) mod date_or_empty {
    use chrono::NaiveDate;
    use serde::{Deserialize, Deserializer, Serializer};

    const FORMAT: &str = "%Y-%m-%d";

    pub fn serialize<S>(value: &Option<NaiveDate>, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        match value {
            Some(date) => serializer.serialize_str(&date.format(FORMAT).to_string()),
            None => serializer.serialize_str(""),
        }
    }

    pub fn deserialize<'de, D>(deserializer: D) -> Result<Option<NaiveDate>, D::Error>
    where
        D: Deserializer<'de>,
    {
        let raw = Option::<String>::deserialize(deserializer)?;
        let Some(raw) = raw else {
            return Ok(None);
        };
        let trimmed = raw.trim();
        if trimmed.is_empty() {
            return Ok(None);
        }

        // 兼容完整的 ISO 时间戳，只取日期部分
        let date_part = trimmed.get(..10).unwrap_or(trimmed);
        match NaiveDate::parse_from_str(date_part, FORMAT) {
            Ok(date) => Ok(Some(date)),
            Err(err) => {
                tracing::warn!(value = %raw, error = %err, "unparsable lastActivityDate, treating as empty");
                Ok(None)
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_record_shape() {
        let record = ProgressRecord::default();
        assert_eq!(record.profile.name, "Eli");
        assert_eq!(record.settings.pin, "1234");
        assert_eq!(record.settings.enabled_games.len(), 8);
        assert_eq!(record.badges.len(), BadgeId::ALL.len());
        assert!(record.badges.iter().all(|b| !b.unlocked && b.earned_at.is_none()));
        assert_eq!(record.streak.last_activity_date, None);
    }

    #[test]
    fn test_streak_date_serialization() {
        let streak = StreakData::default();
        let json = serde_json::to_value(&streak).unwrap();
        assert_eq!(json["lastActivityDate"], "");

        let streak = StreakData {
            current_streak: 2,
            longest_streak: 5,
            last_activity_date: NaiveDate::from_ymd_opt(2026, 10, 18),
        };
        let json = serde_json::to_value(&streak).unwrap();
        assert_eq!(json["lastActivityDate"], "2026-10-18");
        assert_eq!(json["currentStreak"], 2);
    }

    #[test]
    fn test_streak_date_lenient_parse() {
        let streak: StreakData = serde_json::from_str(
            r#"{"currentStreak":1,"longestStreak":1,"lastActivityDate":"2026-10-18T08:00:00.000Z"}"#,
        )
        .unwrap();
        assert_eq!(streak.last_activity_date, NaiveDate::from_ymd_opt(2026, 10, 18));

        let streak: StreakData =
            serde_json::from_str(r#"{"currentStreak":1,"longestStreak":3,"lastActivityDate":"soon"}"#)
                .unwrap();
        assert_eq!(streak.last_activity_date, None);
        assert_eq!(streak.longest_streak, 3);
    }

    #[test]
    fn test_bucket_dedup() {
        let mut bucket = DailyBucket::new(NaiveDate::from_ymd_opt(2026, 10, 18).unwrap());
        assert!(bucket.add_lesson("l1"));
        assert!(!bucket.add_lesson("l1"));
        assert!(bucket.add_word("w1"));
        assert!(!bucket.add_word("w1"));
        assert_eq!(bucket.lessons_completed, vec!["l1"]);
    }

    #[test]
    fn test_word_stat_error_rate() {
        let now = Utc::now();
        let mut stat = WordStat::new("w1", now);
        assert_eq!(stat.error_rate(), 0.0);
        stat.record_review(true, now);
        stat.record_review(false, now);
        assert_eq!(stat.times_reviewed, 2);
        assert_eq!(stat.times_correct + stat.times_incorrect, stat.times_reviewed);
        assert!((stat.error_rate() - 0.5).abs() < f64::EPSILON);
    }

    #[test]
    fn test_ensure_badge_catalog_appends_missing() {
        let mut record = ProgressRecord::default();
        record.badges.retain(|b| b.id != "ski-star");
        assert_eq!(record.ensure_badge_catalog(), 1);
        assert!(record.badge(BadgeId::SkiStar).is_some());
        assert_eq!(record.ensure_badge_catalog(), 0);
    }

    #[test]
    fn test_partial_badge_takes_catalog_display_fields() {
        let mut record = ProgressRecord::default();
        record.badges = vec![serde_json::from_str(r#"{"id":"kpop-star","unlocked":true}"#).unwrap()];
        assert_eq!(record.ensure_badge_catalog(), BadgeId::ALL.len() - 1);

        let badge = record.badge(BadgeId::KpopStar).unwrap();
        assert!(badge.unlocked);
        assert_eq!(badge.theme, Theme::Kpop);
        assert_eq!(badge.icon, "🎤");
        assert_eq!(badge.name, "Eli the K-pop Star");
    }

    #[test]
    fn test_partial_word_stat_defaults() {
        let stat: WordStat = serde_json::from_str(r#"{"timesReviewed":2,"timesIncorrect":2}"#).unwrap();
        assert_eq!(stat.times_correct, 0);
        assert_eq!(stat.vocabulary_id, "");

        let mut record = ProgressRecord::default();
        record.word_performance.insert("w7".into(), stat);
        assert_eq!(record.backfill_word_ids(), 1);
        assert_eq!(record.word_performance["w7"].vocabulary_id, "w7");
        assert_eq!(record.backfill_word_ids(), 0);
    }

    #[test]
    fn test_partial_activity_event_defaults() {
        let event: ActivityEvent = serde_json::from_str(r#"{"lessonId":"l1","score":80}"#).unwrap();
        assert_eq!(event.game_type, GameType::Flashcard);
        assert_eq!(event.completed_at, DateTime::<Utc>::default());
        assert!(event.mistakes.is_empty());
    }

    #[test]
    fn test_badge_id_parse() {
        for id in BadgeId::ALL {
            assert_eq!(BadgeId::parse(id.as_str()), Some(id));
        }
        assert_eq!(BadgeId::parse("unknown"), None);
        assert_eq!(BadgeId::SkiStar.theme_target(), Some(Theme::Skiing));
        assert_eq!(BadgeId::WordMaster.theme_target(), None);
    }
}
