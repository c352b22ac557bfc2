#![allow(dead_code)]

use std::sync::Arc;

use chrono::NaiveDate;

use elis_english_core::lesson::{
    DialogueChoice, DialogueMessage, DialogueNode, DifficultyLevel, GameConfig, Lesson,
    LessonCatalog, Theme, VocabularyItem,
};
use elis_english_core::storage::MemoryStore;
use elis_english_core::{FixedClock, GameType, ProgressContext};

pub fn date(y: i32, m: u32, d: u32) -> NaiveDate {
    NaiveDate::from_ymd_opt(y, m, d).expect("valid date")
}

pub fn test_context(start: NaiveDate) -> (ProgressContext, MemoryStore, Arc<FixedClock>) {
    let backend = MemoryStore::new();
    let clock = Arc::new(FixedClock::at_date(start));
    let ctx = ProgressContext::from_backend(backend.clone(), clock.clone());
    (ctx, backend, clock)
}

pub fn lesson(id: &str, theme: Theme, minutes: u32) -> Lesson {
    Lesson {
        id: id.to_string(),
        title: format!("Lesson {id}"),
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

fn dialogue_node(id: &str, text: &str, choices: &[(&str, &str)]) -> DialogueNode {
    DialogueNode {
        id: id.to_string(),
        message: DialogueMessage {
            id: id.to_string(),
            speaker: "Jisoo".to_string(),
            text: text.to_string(),
            audio: None,
        },
        choices: (!choices.is_empty()).then(|| {
            choices
                .iter()
                .map(|(choice_id, target)| DialogueChoice {
                    id: choice_id.to_string(),
                    text: format!("answer {choice_id}"),
                    next_message_id: target.to_string(),
                })
                .collect()
        }),
    }
}

/// 带对话游戏的课程：hello → (again → hello | bye)
pub fn dialogue_lesson() -> Lesson {
    let mut lesson = lesson("kpop-dialogue", Theme::Kpop, 6);
    lesson.vocabulary = ["hello", "bye"]
        .iter()
        .map(|word| VocabularyItem {
            id: word.to_string(),
            english: word.to_string(),
            croatian: word.to_string(),
            image: None,
            audio: None,
        })
        .collect();
    lesson.dialogue_tree = Some(vec![
        dialogue_node("hello", "Hi! Do you like K-pop?", &[("again", "hello"), ("bye", "end")]),
        dialogue_node("end", "See you at the concert!", &[]),
    ]);
    lesson.games = vec![GameConfig {
        game_type: GameType::Dialogue,
        id: None,
        vocabulary: vec!["hello".into(), "bye".into()],
        dialogue_start_id: Some("hello".into()),
        settings: None,
        grid_size: None,
    }];
    lesson
}

pub fn theme_catalog() -> LessonCatalog {
    let mut lessons: Vec<Lesson> = (0..5)
        .map(|i| lesson(&format!("hp-{i}"), Theme::HarryPotter, 10))
        .collect();
    lessons.push(lesson("ski-0", Theme::Skiing, 8));
    lessons.push(dialogue_lesson());
    LessonCatalog::new(lessons, Vec::new())
}
