//! 应用级进度上下文
//!
//! 由应用根持有，替代全局缓存：加载一次，之后每次更新都是
//! "计算新值 → 保存 → 替换"。

use std::sync::Arc;

use crate::clock::{Clock, SystemClock};
use crate::lesson::LessonSource;
use crate::services::activity::{self, ActivityInput, RecordOutcome};
use crate::services::session::SessionEvent;
use crate::storage::{KeyValueStore, ProgressRecord, ProgressStore};

pub struct ProgressContext {
    store: ProgressStore,
    record: ProgressRecord,
    clock: Arc<dyn Clock>,
    lessons: Option<Arc<dyn LessonSource>>,
}

impl ProgressContext {
    /// 从存储加载进度
    pub fn load(store: ProgressStore) -> Self {
        Self::load_with_clock(store, Arc::new(SystemClock))
    }

    pub fn load_with_clock(store: ProgressStore, clock: Arc<dyn Clock>) -> Self {
        let record = store.load();
        tracing::debug!(
            points = record.total_points,
            days = record.daily_history.len(),
            "progress context loaded"
        );
        Self {
            store,
            record,
            clock,
            lessons: None,
        }
    }

    pub fn from_backend<S: KeyValueStore + 'static>(backend: S, clock: Arc<dyn Clock>) -> Self {
        Self::load_with_clock(ProgressStore::new(backend), clock)
    }

    pub fn with_lessons(mut self, lessons: Arc<dyn LessonSource>) -> Self {
        self.lessons = Some(lessons);
        self
    }

    pub fn record(&self) -> &ProgressRecord {
        &self.record
    }

    pub fn clock(&self) -> &dyn Clock {
        self.clock.as_ref()
    }

    pub fn lessons(&self) -> Option<&dyn LessonSource> {
        self.lessons.as_deref()
    }

    pub fn record_activity(&mut self, input: &ActivityInput) -> RecordOutcome {
        let outcome = activity::record_activity(&self.record, input, self.clock.now(), self.lessons());
        self.commit(outcome.record.clone());
        outcome
    }

    pub fn record_lesson_complete(&mut self, lesson_id: &str, minutes_spent: u32) -> RecordOutcome {
        let outcome = activity::record_lesson_complete(
            &self.record,
            lesson_id,
            minutes_spent,
            self.clock.now(),
            self.lessons(),
        );
        self.commit(outcome.record.clone());
        outcome
    }

    /// 应用一个纯更新函数并提交
    pub fn update<F>(&mut self, f: F) -> &ProgressRecord
    where
        F: FnOnce(&ProgressRecord) -> ProgressRecord,
    {
        let next = f(&self.record);
        self.commit(next);
        &self.record
    }

    /// 可能失败的更新，失败时进度不变
    pub fn try_update<F, E>(&mut self, f: F) -> Result<&ProgressRecord, E>
    where
        F: FnOnce(&ProgressRecord) -> Result<ProgressRecord, E>,
    {
        let next = f(&self.record)?;
        self.commit(next);
        Ok(&self.record)
    }

    /// 处理会话的延迟事件
    pub fn apply_session_event(&mut self, event: SessionEvent) -> RecordOutcome {
        match event {
            SessionEvent::ActivityCompleted(input) => self.record_activity(&input),
        }
    }

    /// 重新从存储读取
    pub fn refresh(&mut self) -> &ProgressRecord {
        self.record = self.store.load();
        &self.record
    }

    pub fn reset(&mut self) -> &ProgressRecord {
        self.record = self.store.reset();
        &self.record
    }

    fn commit(&mut self, next: ProgressRecord) {
        self.store.save(&next);
        self.record = next;
    }
}
