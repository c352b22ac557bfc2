//! 会话内的延迟状态转换
//!
//! 小游戏在给出反馈后会延迟一段时间再上报完成。每个会话持有自己的
//! 关闭通道，会话结束（`cancel` 或 drop）后尚未触发的回调不会再执行。

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;

use parking_lot::Mutex;
use tokio::sync::{broadcast, mpsc};
use tokio::task::JoinHandle;
use tracing::{debug, warn};

use crate::lesson::{GameType, Lesson};
use crate::services::activity::ActivityInput;
use crate::services::dialogue::{DialogueEngine, DialogueError, DialogueState};

/// 对话完成后等待多久再上报
pub const COMPLETION_DELAY: Duration = Duration::from_millis(1500);
/// 对话完成即满分
pub const COMPLETION_SCORE: f64 = 100.0;

// ============================================================
// SessionTimers
// ============================================================

pub struct SessionTimers {
    shutdown_tx: broadcast::Sender<()>,
    cancelled: Arc<AtomicBool>,
    handles: Mutex<Vec<JoinHandle<()>>>,
}

impl SessionTimers {
    pub fn new() -> Self {
        let (shutdown_tx, _) = broadcast::channel(1);
        Self {
            shutdown_tx,
            cancelled: Arc::new(AtomicBool::new(false)),
            handles: Mutex::new(Vec::new()),
        }
    }

    /// 在 `delay` 之后执行 `f`
    ///
    /// 已取消或当前不在 tokio 运行时中时不会调度，返回 false。
    pub fn schedule<F>(&self, delay: Duration, f: F) -> bool
    where
        F: FnOnce() + Send + 'static,
    {
        if self.is_cancelled() {
            debug!("session already cancelled, transition dropped");
            return false;
        }
        let Ok(runtime) = tokio::runtime::Handle::try_current() else {
            warn!("no tokio runtime available, delayed transition dropped");
            return false;
        };

        let mut shutdown_rx = self.shutdown_tx.subscribe();
        let cancelled = Arc::clone(&self.cancelled);
        let handle = runtime.spawn(async move {
            tokio::select! {
                _ = shutdown_rx.recv() => {
                    debug!("delayed transition cancelled");
                }
                _ = tokio::time::sleep(delay) => {
                    if !cancelled.load(Ordering::Acquire) {
                        f();
                    }
                }
            }
        });

        let mut handles = self.handles.lock();
        handles.retain(|handle| !handle.is_finished());
        handles.push(handle);
        true
    }

    /// 取消所有未触发的转换，之后的 `schedule` 调用都会被忽略
    pub fn cancel(&self) {
        if self.cancelled.swap(true, Ordering::AcqRel) {
            return;
        }
        let _ = self.shutdown_tx.send(());
        let handles: Vec<JoinHandle<()>> = self.handles.lock().drain(..).collect();
        let aborted = handles.len();
        for handle in handles {
            handle.abort();
        }
        debug!(aborted, "session timers cancelled");
    }

    pub fn is_cancelled(&self) -> bool {
        self.cancelled.load(Ordering::Acquire)
    }

    /// 尚未完成的转换数量
    pub fn pending(&self) -> usize {
        self.handles
            .lock()
            .iter()
            .filter(|handle| !handle.is_finished())
            .count()
    }
}

impl Default for SessionTimers {
    fn default() -> Self {
        Self::new()
    }
}

impl Drop for SessionTimers {
    fn drop(&mut self) {
        self.cancel();
    }
}

// ============================================================
// DialogueSession
// ============================================================

#[derive(Debug, Clone, PartialEq)]
pub enum SessionEvent {
    ActivityCompleted(ActivityInput),
}

/// 一次对话小游戏
///
/// 走到终止节点后延迟 [`COMPLETION_DELAY`] 发送一次
/// [`SessionEvent::ActivityCompleted`]；在此之前放弃会话则不会发送。
pub struct DialogueSession {
    lesson_id: String,
    vocabulary: Vec<String>,
    engine: DialogueEngine,
    timers: SessionTimers,
    events: mpsc::UnboundedSender<SessionEvent>,
    completion_scheduled: bool,
    delay: Duration,
}

impl DialogueSession {
    pub fn new(
        lesson_id: impl Into<String>,
        engine: DialogueEngine,
        vocabulary: Vec<String>,
        events: mpsc::UnboundedSender<SessionEvent>,
    ) -> Self {
        Self {
            lesson_id: lesson_id.into(),
            vocabulary,
            engine,
            timers: SessionTimers::new(),
            events,
            completion_scheduled: false,
            delay: COMPLETION_DELAY,
        }
    }

    /// 从课程的对话游戏配置创建会话
    pub fn from_lesson(
        lesson: &Lesson,
        events: mpsc::UnboundedSender<SessionEvent>,
    ) -> Result<Self, DialogueError> {
        let game = lesson
            .games
            .iter()
            .find(|game| game.game_type == GameType::Dialogue);
        let start_id = game
            .and_then(|game| game.dialogue_start_id.clone())
            .or_else(|| {
                lesson
                    .dialogue_tree
                    .as_ref()
                    .and_then(|tree| tree.first())
                    .map(|node| node.id.clone())
            })
            .ok_or_else(|| DialogueError::StartNodeMissing(lesson.id.clone()))?;

        let tree = lesson.dialogue_tree.clone().unwrap_or_default();
        if !tree.iter().any(|node| node.id == start_id) {
            return Err(DialogueError::StartNodeMissing(start_id));
        }

        let vocabulary = game.map(|game| game.vocabulary.clone()).unwrap_or_default();

        Ok(Self::new(
            lesson.id.clone(),
            DialogueEngine::new(tree, &start_id),
            vocabulary,
            events,
        ))
    }

    pub fn with_delay(mut self, delay: Duration) -> Self {
        self.delay = delay;
        self
    }

    pub fn state(&self) -> DialogueState {
        self.engine.current_state()
    }

    pub fn engine(&self) -> &DialogueEngine {
        &self.engine
    }

    pub fn completion_scheduled(&self) -> bool {
        self.completion_scheduled
    }

    /// 选择一个回答；到达终止节点时安排完成上报
    pub fn choose(&mut self, choice_id: &str) -> bool {
        if !self.engine.make_choice(choice_id) {
            return false;
        }
        if self.engine.is_complete() && !self.completion_scheduled {
            self.schedule_completion();
        }
        true
    }

    fn schedule_completion(&mut self) {
        let input = ActivityInput::new(self.lesson_id.clone(), GameType::Dialogue, COMPLETION_SCORE)
            .with_vocabulary(self.vocabulary.iter().cloned());
        let events = self.events.clone();
        let lesson_id = self.lesson_id.clone();

        self.completion_scheduled = self.timers.schedule(self.delay, move || {
            if events.send(SessionEvent::ActivityCompleted(input)).is_err() {
                warn!(lesson = %lesson_id, "session event receiver dropped");
            }
        });
    }

    /// 放弃会话，未触发的完成上报被取消
    pub fn abandon(&self) {
        self.timers.cancel();
    }

    pub fn is_abandoned(&self) -> bool {
        self.timers.is_cancelled()
    }
}
