//! 课程内容类型与课程来源
//!
//! 课程 JSON 由外部加载，本模块只定义只读的数据结构，以及进度引擎
//! 需要的查询接口 [`LessonSource`]（按 id 查找、按主题过滤）。

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

// ============================================================
// 枚举：主题 / 难度 / 游戏类型
// ============================================================

/// 课程主题
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Theme {
    Kpop,
    HarryPotter,
    Skiing,
    #[default]
    General,
}

impl Theme {
    pub const ALL: [Theme; 4] = [Theme::Kpop, Theme::HarryPotter, Theme::Skiing, Theme::General];

    pub const fn as_str(self) -> &'static str {
        match self {
            Theme::Kpop => "kpop",
            Theme::HarryPotter => "harry_potter",
            Theme::Skiing => "skiing",
            Theme::General => "general",
        }
    }

    pub const fn label(self) -> &'static str {
        match self {
            Theme::Kpop => "K-pop",
            Theme::HarryPotter => "Harry Potter",
            Theme::Skiing => "Skiing",
            Theme::General => "General",
        }
    }
}

impl fmt::Display for Theme {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Theme {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Theme::ALL
            .into_iter()
            .find(|theme| theme.as_str().eq_ignore_ascii_case(s.trim()))
            .ok_or_else(|| format!("unknown theme: {s}"))
    }
}

/// CEFR 难度等级
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum DifficultyLevel {
    A0,
    A1,
    A2,
}

/// 小游戏类型
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum GameType {
    #[default]
    Flashcard,
    MultipleChoice,
    DragAndDrop,
    Memory,
    LetterScramble,
    FillInTheGap,
    Dialogue,
    VoiceLesson,
}

impl GameType {
    pub const ALL: [GameType; 8] = [
        GameType::Flashcard,
        GameType::MultipleChoice,
        GameType::DragAndDrop,
        GameType::Memory,
        GameType::LetterScramble,
        GameType::FillInTheGap,
        GameType::Dialogue,
        GameType::VoiceLesson,
    ];

    pub const fn as_str(self) -> &'static str {
        match self {
            GameType::Flashcard => "flashcard",
            GameType::MultipleChoice => "multiple-choice",
            GameType::DragAndDrop => "drag-and-drop",
            GameType::Memory => "memory",
            GameType::LetterScramble => "letter-scramble",
            GameType::FillInTheGap => "fill-in-the-gap",
            GameType::Dialogue => "dialogue",
            GameType::VoiceLesson => "voice-lesson",
        }
    }
}

impl fmt::Display for GameType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for GameType {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        GameType::ALL
            .into_iter()
            .find(|game| game.as_str().eq_ignore_ascii_case(s.trim()))
            .ok_or_else(|| format!("unknown game type: {s}"))
    }
}

// ============================================================
// 词汇与对话
// ============================================================

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct VocabularyItem {
    pub id: String,
    pub english: String,
    pub croatian: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub image: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub audio: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DialogueMessage {
    pub id: String,
    pub speaker: String,
    pub text: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub audio: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DialogueChoice {
    pub id: String,
    pub text: String,
    pub next_message_id: String,
}

/// 对话图中的一个节点
///
/// 没有 `choices`（或为空）的节点是终止节点。节点之间可以成环。
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DialogueNode {
    pub id: String,
    pub message: DialogueMessage,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub choices: Option<Vec<DialogueChoice>>,
}

impl DialogueNode {
    pub fn choices(&self) -> &[DialogueChoice] {
        self.choices.as_deref().unwrap_or(&[])
    }

    pub fn is_terminal(&self) -> bool {
        self.choices().is_empty()
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DialogueCharacter {
    pub name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub avatar: Option<String>,
    pub theme: Theme,
}

// ============================================================
// 课程
// ============================================================

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MultipleChoiceSettings {
    pub mode: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub question_count: Option<u32>,
}

/// 课程中的一个游戏活动配置
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GameConfig {
    #[serde(rename = "type")]
    pub game_type: GameType,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id: Option<String>,
    /// 本活动使用的词汇 id
    #[serde(default)]
    pub vocabulary: Vec<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub dialogue_start_id: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub settings: Option<MultipleChoiceSettings>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub grid_size: Option<u8>,
}

fn default_unlocked() -> bool {
    true
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Lesson {
    pub id: String,
    pub title: String,
    pub theme: Theme,
    pub difficulty_level: DifficultyLevel,
    pub estimated_minutes: u32,
    #[serde(default)]
    pub vocabulary: Vec<VocabularyItem>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub dialogue_character: Option<DialogueCharacter>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub dialogue_tree: Option<Vec<DialogueNode>>,
    #[serde(default)]
    pub games: Vec<GameConfig>,
    /// 导师可在设置中锁定课程，缺省为解锁
    #[serde(default = "default_unlocked")]
    pub unlocked: bool,
}

impl Lesson {
    /// 按活动配置筛选出本课程的词汇
    pub fn vocabulary_for(&self, game: &GameConfig) -> Vec<&VocabularyItem> {
        self.vocabulary
            .iter()
            .filter(|item| game.vocabulary.contains(&item.id))
            .collect()
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum CorrectAnswer {
    Index(u32),
    Text(String),
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ComprehensionQuestion {
    pub id: String,
    #[serde(rename = "type")]
    pub question_type: String,
    pub question: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub options: Option<Vec<String>>,
    pub correct_answer: CorrectAnswer,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct VoiceLessonStep {
    pub id: String,
    pub transcript: String,
    pub audio_file: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub image: Option<String>,
    #[serde(default)]
    pub questions: Vec<ComprehensionQuestion>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct VoiceLesson {
    pub id: String,
    pub title: String,
    pub theme: Theme,
    pub level: DifficultyLevel,
    pub estimated_minutes: u32,
    #[serde(default)]
    pub steps: Vec<VoiceLessonStep>,
}

// ============================================================
// LessonSource - 课程来源
// ============================================================

/// 只读课程来源
pub trait LessonSource: Send + Sync {
    fn lessons(&self) -> &[Lesson];

    fn voice_lessons(&self) -> &[VoiceLesson];

    fn lesson(&self, id: &str) -> Option<&Lesson> {
        self.lessons().iter().find(|lesson| lesson.id == id)
    }

    fn voice_lesson(&self, id: &str) -> Option<&VoiceLesson> {
        self.voice_lessons().iter().find(|lesson| lesson.id == id)
    }

    fn lessons_by_theme(&self, theme: Theme) -> Vec<&Lesson> {
        self.lessons()
            .iter()
            .filter(|lesson| lesson.theme == theme)
            .collect()
    }
}

/// 内存课程目录，课程按难度排序
#[derive(Debug, Clone, Default)]
pub struct LessonCatalog {
    lessons: Vec<Lesson>,
    voice_lessons: Vec<VoiceLesson>,
}

impl LessonCatalog {
    pub fn new(mut lessons: Vec<Lesson>, mut voice_lessons: Vec<VoiceLesson>) -> Self {
        lessons.sort_by_key(|lesson| lesson.difficulty_level);
        voice_lessons.sort_by_key(|lesson| lesson.level);
        Self {
            lessons,
            voice_lessons,
        }
    }

    /// 从课程 JSON 数组解析
    pub fn from_json(lessons_json: &str) -> Result<Self, serde_json::Error> {
        let lessons: Vec<Lesson> = serde_json::from_str(lessons_json)?;
        Ok(Self::new(lessons, Vec::new()))
    }

    pub fn with_voice_lessons(self, voice_lessons: Vec<VoiceLesson>) -> Self {
        Self::new(self.lessons, voice_lessons)
    }

    pub fn is_empty(&self) -> bool {
        self.lessons.is_empty() && self.voice_lessons.is_empty()
    }
}

impl LessonSource for LessonCatalog {
    fn lessons(&self) -> &[Lesson] {
        &self.lessons
    }

    fn voice_lessons(&self) -> &[VoiceLesson] {
        &self.voice_lessons
    }
}
