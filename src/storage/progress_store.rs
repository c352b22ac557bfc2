//! ProgressStore - 进度文档的加载与保存

use chrono::NaiveDate;
use serde::de::Error as _;
use serde_json::Value;
use tracing::{debug, error, info, warn};

use crate::storage::models::ProgressRecord;
use crate::storage::{KeyValueStore, StorageResult};

/// 进度文档的存储键
pub const PROGRESS_KEY: &str = "elis-english-progress";
/// schema 版本号的存储键
pub const VERSION_KEY: &str = "elis-english-version";
/// 当前 schema 版本，不一致时整体重置为默认值
pub const CURRENT_VERSION: &str = "1.0.0";

/// 合并时需要向下多合并一层的字段
const DEEP_MERGED_FIELDS: &[&str] = &["settings"];
const DAILY_HISTORY_FIELD: &str = "dailyHistory";

pub struct ProgressStore {
    backend: Box<dyn KeyValueStore>,
}

impl ProgressStore {
    pub fn new<S: KeyValueStore + 'static>(backend: S) -> Self {
        Self {
            backend: Box::new(backend),
        }
    }

    pub fn from_boxed(backend: Box<dyn KeyValueStore>) -> Self {
        Self { backend }
    }

    /// 加载进度
    ///
    /// - 没有存档或版本号不一致：生成默认值并写回
    /// - 存档无法解析：与没有存档相同处理
    /// - 后端读取失败：记录日志，返回内存中的默认值
    ///
    /// 对于能解析但字段不全的旧文档，逐字段覆盖在默认值之上，
    /// `settings` 再向下合并一层。嵌套对象缺失的字段取默认值，
    /// 不会导致整份存档被重置。
    pub fn load(&self) -> ProgressRecord {
        match self.try_load() {
            Ok(record) => record,
            Err(err) => {
                warn!(error = %err, "failed to load progress, using in-memory defaults");
                ProgressRecord::default()
            }
        }
    }

    fn try_load(&self) -> StorageResult<ProgressRecord> {
        let stored = self.backend.get(PROGRESS_KEY)?;
        let version = self.backend.get(VERSION_KEY)?;

        let stored = match stored {
            Some(doc) if version.as_deref() == Some(CURRENT_VERSION) => doc,
            Some(_) => {
                info!(stored_version = ?version, current = CURRENT_VERSION, "progress schema version changed, resetting");
                return self.initialize_defaults();
            }
            None => {
                debug!("no stored progress, initializing defaults");
                return self.initialize_defaults();
            }
        };

        match parse_with_defaults(&stored) {
            Ok(record) => Ok(record),
            Err(err) => {
                warn!(error = %err, "stored progress is corrupt, resetting to defaults");
                self.initialize_defaults()
            }
        }
    }

    fn initialize_defaults(&self) -> StorageResult<ProgressRecord> {
        let record = ProgressRecord::default();
        self.try_save(&record)?;
        self.backend.set(VERSION_KEY, CURRENT_VERSION)?;
        Ok(record)
    }

    /// 整体覆盖保存，失败只记录日志
    pub fn save(&self, record: &ProgressRecord) {
        if let Err(err) = self.try_save(record) {
            error!(error = %err, "failed to save progress");
        }
    }

    pub fn try_save(&self, record: &ProgressRecord) -> StorageResult<()> {
        let doc = serde_json::to_string(record)?;
        self.backend.set(PROGRESS_KEY, &doc)
    }

    /// 删除进度与版本号
    pub fn clear(&self) -> StorageResult<()> {
        self.backend.remove(PROGRESS_KEY)?;
        self.backend.remove(VERSION_KEY)?;
        Ok(())
    }

    /// 清空后重新生成默认进度
    pub fn reset(&self) -> ProgressRecord {
        if let Err(err) = self.clear() {
            warn!(error = %err, "failed to clear stored progress");
        }
        info!("progress reset to defaults");
        self.load()
    }
}

/// 解析存档并与默认值合并
pub fn parse_with_defaults(raw: &str) -> Result<ProgressRecord, serde_json::Error> {
    let stored: Value = serde_json::from_str(raw)?;
    let Value::Object(stored) = stored else {
        return Err(serde_json::Error::custom("progress document is not an object"));
    };

    let mut merged = serde_json::to_value(ProgressRecord::default())?;
    if let Value::Object(base) = &mut merged {
        for (key, value) in stored {
            if value.is_null() {
                continue;
            }

            if DEEP_MERGED_FIELDS.contains(&key.as_str()) {
                match (base.get_mut(&key), value) {
                    (Some(Value::Object(base_inner)), Value::Object(overlay)) => {
                        base_inner.extend(overlay);
                    }
                    (_, other) => {
                        warn!(field = %key, value = %other, "ignoring non-object value for merged field");
                    }
                }
                continue;
            }

            let value = if key == DAILY_HISTORY_FIELD {
                retain_dated_buckets(value)
            } else {
                value
            };
            base.insert(key, value);
        }
    }

    let mut record: ProgressRecord = serde_json::from_value(merged)?;
    let added = record.ensure_badge_catalog();
    if added > 0 {
        debug!(added, "appended badges missing from stored catalog");
    }
    let filled = record.backfill_word_ids();
    if filled > 0 {
        debug!(filled, "filled vocabulary ids from word performance keys");
    }
    Ok(record)
}

/// 去掉没有有效日期的每日记录，其余记录原样保留
fn retain_dated_buckets(value: Value) -> Value {
    let buckets = match value {
        Value::Array(buckets) => buckets,
        other => return other,
    };
    let total = buckets.len();
    let kept: Vec<Value> = buckets
        .into_iter()
        .filter(|bucket| {
            bucket
                .get("date")
                .and_then(Value::as_str)
                .is_some_and(|date| date.parse::<NaiveDate>().is_ok())
        })
        .collect();
    if kept.len() < total {
        warn!(dropped = total - kept.len(), "dropping daily buckets without a valid date");
    }
    Value::Array(kept)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::lesson::Theme;
    use crate::storage::{BadgeId, MemoryStore};

    fn store_with(progress: Option<&str>, version: Option<&str>) -> (ProgressStore, MemoryStore) {
        let backend = MemoryStore::new();
        if let Some(doc) = progress {
            backend.set(PROGRESS_KEY, doc).unwrap();
        }
        if let Some(v) = version {
            backend.set(VERSION_KEY, v).unwrap();
        }
        (ProgressStore::new(backend.clone()), backend)
    }

    #[test]
    fn test_first_load_persists_defaults() {
        let (store, backend) = store_with(None, None);
        let record = store.load();
        assert_eq!(record, ProgressRecord::default());
        assert_eq!(backend.get(VERSION_KEY).unwrap().as_deref(), Some(CURRENT_VERSION));
        assert!(backend.get(PROGRESS_KEY).unwrap().is_some());
    }

    #[test]
    fn test_load_is_idempotent() {
        let (store, _) = store_with(None, None);
        let first = store.load();
        let second = store.load();
        assert_eq!(first, second);
    }

    #[test]
    fn test_version_mismatch_resets() {
        let mut record = ProgressRecord::default();
        record.total_points = 500;
        let doc = serde_json::to_string(&record).unwrap();
        let (store, backend) = store_with(Some(&doc), Some("0.9.0"));

        let loaded = store.load();
        assert_eq!(loaded.total_points, 0);
        assert_eq!(backend.get(VERSION_KEY).unwrap().as_deref(), Some(CURRENT_VERSION));
    }

    #[test]
    fn test_corrupt_document_falls_back_to_defaults() {
        let (store, backend) = store_with(Some("{not json"), Some(CURRENT_VERSION));
        let loaded = store.load();
        assert_eq!(loaded, ProgressRecord::default());

        let rewritten = backend.get(PROGRESS_KEY).unwrap().unwrap();
        assert!(serde_json::from_str::<Value>(&rewritten).is_ok());
    }

    #[test]
    fn test_partial_document_merges_over_defaults() {
        let doc = r#"{
            "totalPoints": 250,
            "settings": { "pin": "9876", "audioEnabled": false }
        }"#;
        let (store, _) = store_with(Some(doc), Some(CURRENT_VERSION));
        let loaded = store.load();

        assert_eq!(loaded.total_points, 250);
        assert_eq!(loaded.settings.pin, "9876");
        assert!(!loaded.settings.audio_enabled);
        // settings 中未出现的字段保持默认
        assert!(loaded.settings.microphone_enabled);
        assert_eq!(loaded.settings.current_theme, Theme::General);
        assert_eq!(loaded.profile.name, "Eli");
        assert_eq!(loaded.badges.len(), BadgeId::ALL.len());
    }

    #[test]
    fn test_null_fields_keep_defaults() {
        let doc = r#"{"profile": null, "settings": null, "totalMinutes": 12}"#;
        let record = parse_with_defaults(doc).unwrap();
        assert_eq!(record.profile.name, "Eli");
        assert_eq!(record.settings.pin, "1234");
        assert_eq!(record.total_minutes, 12);
    }

    #[test]
    fn test_nested_entries_missing_fields_are_kept() {
        let doc = r#"{
            "totalPoints": 900,
            "badges": [{ "id": "first-lesson", "unlocked": true }],
            "wordPerformance": { "w1": { "timesReviewed": 3, "timesCorrect": 1, "timesIncorrect": 2 } },
            "dailyHistory": [
                { "date": "2026-10-18", "activitiesCompleted": [{ "lessonId": "l1", "score": 100 }] },
                { "minutesSpent": 5 }
            ]
        }"#;
        let record = parse_with_defaults(doc).unwrap();

        assert_eq!(record.total_points, 900);
        let badge = record.badge(BadgeId::FirstLesson).unwrap();
        assert!(badge.unlocked);
        assert_eq!(badge.name, "Eli's First Steps");
        assert_eq!(record.badges.len(), BadgeId::ALL.len());

        let stat = &record.word_performance["w1"];
        assert_eq!(stat.vocabulary_id, "w1");
        assert_eq!(stat.times_incorrect, 2);

        assert_eq!(record.daily_history.len(), 1);
        assert!(record.daily_history[0].has_perfect_score());
    }

    #[test]
    fn test_non_object_document_is_corrupt() {
        assert!(parse_with_defaults("[1,2,3]").is_err());
        assert!(parse_with_defaults("\"text\"").is_err());
    }

    #[test]
    fn test_complete_record_merge_is_noop() {
        let mut record = ProgressRecord::default();
        record.total_points = 42;
        record.settings.pin = "2468".into();
        let doc = serde_json::to_string(&record).unwrap();
        assert_eq!(parse_with_defaults(&doc).unwrap(), record);
    }

    #[test]
    fn test_reset_recreates_defaults() {
        let (store, _) = store_with(None, None);
        let mut record = store.load();
        record.total_points = 77;
        store.save(&record);
        assert_eq!(store.load().total_points, 77);

        let fresh = store.reset();
        assert_eq!(fresh, ProgressRecord::default());
        assert_eq!(store.load().total_points, 0);
    }
}
