use std::time::Duration;

use tokio::sync::mpsc;

use elis_english_core::services::session::{DialogueSession, SessionEvent, COMPLETION_DELAY};
use elis_english_core::storage::BadgeId;
use elis_english_core::GameType;

mod common;

use common::{date, dialogue_lesson, test_context};

#[tokio::test(start_paused = true)]
async fn test_completion_reported_after_delay() {
    let (tx, mut rx) = mpsc::unbounded_channel();
    let mut session = DialogueSession::from_lesson(&dialogue_lesson(), tx).unwrap();

    // 绕一圈再结束
    assert!(session.choose("again"));
    assert!(!session.completion_scheduled());
    assert!(session.choose("bye"));
    assert!(session.state().is_complete);
    assert!(session.completion_scheduled());

    tokio::time::sleep(COMPLETION_DELAY - Duration::from_millis(1)).await;
    assert!(rx.try_recv().is_err());

    tokio::time::sleep(Duration::from_millis(2)).await;
    let event = rx.try_recv().expect("completion event");
    let SessionEvent::ActivityCompleted(input) = event;
    assert_eq!(input.lesson_id, "kpop-dialogue");
    assert_eq!(input.game_type, GameType::Dialogue);
    assert_eq!(input.score, 100.0);
    assert_eq!(input.vocabulary_used, vec!["hello", "bye"]);
}

#[tokio::test(start_paused = true)]
async fn test_abandoned_session_never_reports() {
    let (tx, mut rx) = mpsc::unbounded_channel();
    let mut session = DialogueSession::from_lesson(&dialogue_lesson(), tx).unwrap();
    assert!(session.choose("bye"));
    session.abandon();

    tokio::time::sleep(COMPLETION_DELAY * 3).await;
    assert!(rx.try_recv().is_err());
    assert!(session.is_abandoned());
}

#[tokio::test(start_paused = true)]
async fn test_dropped_session_never_reports() {
    let (tx, mut rx) = mpsc::unbounded_channel();
    {
        let mut session = DialogueSession::from_lesson(&dialogue_lesson(), tx).unwrap();
        assert!(session.choose("bye"));
    }
    tokio::time::sleep(COMPLETION_DELAY * 3).await;
    // 会话与回调都已释放，通道关闭且没有事件
    assert!(rx.recv().await.is_none());
}

#[tokio::test(start_paused = true)]
async fn test_invalid_choice_does_not_schedule() {
    let (tx, _rx) = mpsc::unbounded_channel();
    let mut session = DialogueSession::from_lesson(&dialogue_lesson(), tx).unwrap();
    let before = session.state();
    assert!(!session.choose("shout"));
    assert_eq!(session.state(), before);
    assert!(!session.completion_scheduled());
}

#[tokio::test(start_paused = true)]
async fn test_completion_event_updates_progress() {
    let (mut ctx, _, _) = test_context(date(2026, 10, 18));
    let (tx, mut rx) = mpsc::unbounded_channel();
    let mut session = DialogueSession::from_lesson(&dialogue_lesson(), tx).unwrap();
    session.choose("bye");

    let event = rx.recv().await.expect("completion event");
    let outcome = ctx.apply_session_event(event);

    assert_eq!(outcome.points_earned, 100);
    assert!(outcome.newly_unlocked.contains(&BadgeId::PerfectScore));
    assert_eq!(ctx.record().word_performance["hello"].times_correct, 1);
    assert_eq!(ctx.record().streak.current_streak, 1);
}

#[test]
fn test_lesson_without_dialogue_is_rejected() {
    let (tx, _rx) = mpsc::unbounded_channel();
    let lesson = common::lesson("plain", elis_english_core::Theme::General, 5);
    assert!(DialogueSession::from_lesson(&lesson, tx).is_err());
}

#[tokio::test(start_paused = true)]
async fn test_completion_reports_game_vocabulary_as_configured() {
    let mut lesson = dialogue_lesson();
    lesson.games[0].vocabulary = vec!["bye".into(), "concert".into(), "hello".into()];

    let (tx, mut rx) = mpsc::unbounded_channel();
    let mut session = DialogueSession::from_lesson(&lesson, tx).unwrap();
    assert!(session.choose("bye"));

    tokio::time::sleep(COMPLETION_DELAY + Duration::from_millis(1)).await;
    let SessionEvent::ActivityCompleted(input) = rx.try_recv().expect("completion event");
    // 不在课程词汇表中的 id 也保留，顺序不变
    assert_eq!(input.vocabulary_used, vec!["bye", "concert", "hello"]);
}
