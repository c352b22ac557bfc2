//! 默认值与徽章目录

use crate::lesson::Theme;
use crate::storage::models::{Badge, BadgeId};

pub const DEFAULT_LEARNER_NAME: &str = "Eli";
pub const DEFAULT_NATIVE_LANGUAGE: &str = "Croatian";
pub const DEFAULT_DAILY_MINUTES: u32 = 30;
pub const DEFAULT_PIN: &str = "1234";

/// 满分
pub const PERFECT_SCORE: f64 = 100.0;

fn badge(id: BadgeId, name: &str, description: &str, theme: Theme, icon: &str) -> Badge {
    Badge {
        id: id.as_str().to_string(),
        name: name.to_string(),
        description: description.to_string(),
        theme,
        icon: icon.to_string(),
        earned_at: None,
        unlocked: false,
    }
}

/// 固定的徽章目录，全部为锁定状态
pub fn default_badges() -> Vec<Badge> {
    vec![
        badge(
            BadgeId::FirstLesson,
            "Eli's First Steps",
            "Complete your first lesson",
            Theme::General,
            "⭐",
        ),
        badge(
            BadgeId::WeekStreak,
            "Eli's Winning Streak",
            "Practice for 7 days in a row",
            Theme::General,
            "🔥",
        ),
        badge(
            BadgeId::KpopStar,
            "Eli the K-pop Star",
            "Complete 5 K-pop lessons",
            Theme::Kpop,
            "🎤",
        ),
        badge(
            BadgeId::HogwartsOwl,
            "Eli's Hogwarts Owl",
            "Complete 5 Harry Potter lessons",
            Theme::HarryPotter,
            "🦉",
        ),
        badge(
            BadgeId::SkiStar,
            "Eli the Ski Star",
            "Complete 5 skiing lessons",
            Theme::Skiing,
            "⛷️",
        ),
        badge(
            BadgeId::WordMaster,
            "Eli's Vocabulary Champion",
            "Learn 100 new words",
            Theme::General,
            "📚",
        ),
        badge(
            BadgeId::PerfectScore,
            "Eli's Perfect Performance",
            "Get 100% on any lesson",
            Theme::General,
            "💯",
        ),
    ]
}
