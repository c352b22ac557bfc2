//! `elis-english` 命令行
//!
//! 面向导师的本地工具：查看进度、补录活动、导出报告、修改设置。
//! 导出、重置和设置类命令需要导师 PIN。

use std::path::{Path, PathBuf};
use std::sync::Arc;

use clap::{Parser, Subcommand, ValueEnum};
use thiserror::Error;
use tokio::sync::mpsc;

use crate::clock::SystemClock;
use crate::config::{Config, StoreBackend};
use crate::lesson::{GameType, LessonCatalog, LessonSource, Theme};
use crate::services::activity::{ActivityInput, RecordOutcome};
use crate::services::badge::get_badge_progress;
use crate::services::dialogue::{DialogueError, DialogueState};
use crate::services::report::{self, daily_goal_progress};
use crate::services::session::DialogueSession;
use crate::services::settings::{self, SettingsError};
use crate::services::tutor::{self, TutorError};
use crate::state::ProgressContext;
use crate::storage::{BadgeId, ProgressStore, StorageError};

#[derive(Debug, Error)]
pub enum CliError {
    #[error(transparent)]
    Tutor(#[from] TutorError),
    #[error(transparent)]
    Settings(#[from] SettingsError),
    #[error(transparent)]
    Dialogue(#[from] DialogueError),
    #[error("storage error: {0}")]
    Storage(#[from] StorageError),
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),
    #[error("serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
    #[error("{0}")]
    InvalidArgument(String),
}

#[derive(Debug, Parser)]
#[command(name = "elis-english")]
#[command(about = "Progress tracking and tutor tools for Eli's English", long_about = None)]
#[command(version)]
pub struct Cli {
    /// Directory holding the progress store
    #[arg(long, global = true, env = "ELIS_DATA_DIR")]
    pub data_dir: Option<PathBuf>,

    /// Storage backend
    #[arg(long, global = true, value_parser = parse_backend)]
    pub store: Option<StoreBackend>,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum ExportFormat {
    Json,
    Markdown,
}

#[derive(Debug, Subcommand)]
pub enum Commands {
    /// Show a summary of the current progress
    Show {
        /// Lesson catalog JSON, enables theme badge progress
        #[arg(long)]
        lessons: Option<PathBuf>,
    },
    /// Record a completed mini-game activity
    RecordActivity {
        #[arg(long)]
        lesson: String,
        #[arg(long, value_parser = parse_game)]
        game: GameType,
        /// Score between 0 and 100
        #[arg(long)]
        score: f64,
        /// Vocabulary ids used, comma separated
        #[arg(long, value_delimiter = ',')]
        words: Vec<String>,
        /// Vocabulary ids answered wrong, comma separated
        #[arg(long, value_delimiter = ',')]
        mistakes: Vec<String>,
        #[arg(long)]
        lessons: Option<PathBuf>,
    },
    /// Record a completed lesson
    CompleteLesson {
        #[arg(long)]
        lesson: String,
        #[arg(long)]
        minutes: u32,
        #[arg(long)]
        lessons: Option<PathBuf>,
    },
    /// Play a lesson dialogue with a fixed sequence of choices
    PlayDialogue {
        /// Lesson catalog JSON
        #[arg(long)]
        lessons: PathBuf,
        #[arg(long)]
        lesson: String,
        /// Choice ids in order, comma separated
        #[arg(long, value_delimiter = ',')]
        choices: Vec<String>,
    },
    /// Export the progress document or a markdown report
    Export {
        #[arg(long)]
        pin: String,
        #[arg(long, value_enum, default_value = "markdown")]
        format: ExportFormat,
        /// Write to a file instead of stdout
        #[arg(long)]
        output: Option<PathBuf>,
    },
    /// Print the structured progress report as JSON
    Report {
        #[arg(long)]
        pin: String,
        #[arg(long)]
        lessons: Option<PathBuf>,
    },
    /// Change tutor settings
    Settings {
        #[arg(long)]
        pin: String,
        #[arg(long, value_parser = parse_theme)]
        theme: Option<Theme>,
        #[arg(long)]
        toggle_audio: bool,
        #[arg(long)]
        toggle_microphone: bool,
        #[arg(long, value_parser = parse_game)]
        enable_game: Vec<GameType>,
        #[arg(long, value_parser = parse_game)]
        disable_game: Vec<GameType>,
        /// Daily practice goal in minutes
        #[arg(long)]
        daily_goal: Option<u32>,
        #[arg(long)]
        unlock_lesson: Vec<String>,
    },
    /// Erase all progress
    Reset {
        #[arg(long)]
        pin: String,
    },
    /// Change the tutor PIN
    SetPin {
        #[arg(long)]
        pin: String,
        #[arg(long = "new")]
        new_pin: String,
    },
}

fn parse_backend(value: &str) -> Result<StoreBackend, String> {
    value.parse()
}

fn parse_game(value: &str) -> Result<GameType, String> {
    value.parse()
}

fn parse_theme(value: &str) -> Result<Theme, String> {
    value.parse()
}

impl Cli {
    /// 命令行参数覆盖环境配置
    pub fn apply_overrides(&self, mut config: Config) -> Config {
        if let Some(dir) = &self.data_dir {
            config.data_dir = dir.clone();
        }
        if let Some(store) = self.store {
            config.store_backend = store;
        }
        config
    }
}

pub async fn run(cli: Cli, config: Config) -> Result<(), CliError> {
    let config = cli.apply_overrides(config);
    let backend = config.open_store()?;
    let ctx = ProgressContext::load_with_clock(ProgressStore::from_boxed(backend), Arc::new(SystemClock));
    execute(cli.command, ctx).await
}

/// 在给定上下文上执行命令
pub async fn execute(command: Commands, mut ctx: ProgressContext) -> Result<(), CliError> {
    match command {
        Commands::Show { lessons } => {
            if let Some(catalog) = load_catalog(lessons.as_deref())? {
                ctx = ctx.with_lessons(catalog);
            }
            print_summary(&ctx);
        }
        Commands::RecordActivity {
            lesson,
            game,
            score,
            words,
            mistakes,
            lessons,
        } => {
            if !(0.0..=100.0).contains(&score) {
                return Err(CliError::InvalidArgument(format!(
                    "score must be between 0 and 100, got {score}"
                )));
            }
            if let Some(catalog) = load_catalog(lessons.as_deref())? {
                ctx = ctx.with_lessons(catalog);
            }
            let input = ActivityInput::new(lesson, game, score)
                .with_vocabulary(words)
                .with_mistakes(mistakes);
            let outcome = ctx.record_activity(&input);
            println!("+{} points", outcome.points_earned);
            print_unlocked(&ctx, &outcome);
        }
        Commands::CompleteLesson {
            lesson,
            minutes,
            lessons,
        } => {
            if let Some(catalog) = load_catalog(lessons.as_deref())? {
                ctx = ctx.with_lessons(catalog);
            }
            let outcome = ctx.record_lesson_complete(&lesson, minutes);
            println!("Lesson {lesson} completed ({minutes} minutes)");
            print_unlocked(&ctx, &outcome);
        }
        Commands::PlayDialogue {
            lessons,
            lesson,
            choices,
        } => {
            let catalog = load_catalog(Some(lessons.as_path()))?
                .ok_or_else(|| CliError::InvalidArgument("lesson catalog required".into()))?;
            play_dialogue(ctx.with_lessons(catalog), &lesson, &choices).await?;
        }
        Commands::Export {
            pin,
            format,
            output,
        } => {
            tutor::verify_pin(&ctx.record().settings, &pin)?;
            let content = match format {
                ExportFormat::Json => report::export_json(ctx.record())?,
                ExportFormat::Markdown => report::export_markdown(ctx.record(), ctx.clock().today()),
            };
            match output {
                Some(path) => {
                    std::fs::write(&path, content)?;
                    println!("Exported to {}", path.display());
                }
                None => println!("{content}"),
            }
        }
        Commands::Report { pin, lessons } => {
            tutor::verify_pin(&ctx.record().settings, &pin)?;
            let catalog = load_catalog(lessons.as_deref())?;
            let report = report::build_report(
                ctx.record(),
                catalog.as_deref(),
                ctx.clock().now(),
            );
            println!("{}", serde_json::to_string_pretty(&report)?);
        }
        Commands::Settings {
            pin,
            theme,
            toggle_audio,
            toggle_microphone,
            enable_game,
            disable_game,
            daily_goal,
            unlock_lesson,
        } => {
            tutor::verify_pin(&ctx.record().settings, &pin)?;
            ctx.try_update(|record| -> Result<_, SettingsError> {
                let mut next = record.clone();
                if let Some(theme) = theme {
                    next = settings::set_theme(&next, theme);
                }
                if toggle_audio {
                    next = settings::toggle_audio(&next);
                }
                if toggle_microphone {
                    next = settings::toggle_microphone(&next);
                }
                for game in &enable_game {
                    next = settings::set_game_enabled(&next, *game, true);
                }
                for game in &disable_game {
                    next = settings::set_game_enabled(&next, *game, false);
                }
                if let Some(minutes) = daily_goal {
                    next = settings::set_daily_goal(&next, minutes)?;
                }
                for lesson_id in &unlock_lesson {
                    next = settings::unlock_lesson(&next, lesson_id);
                }
                Ok(next)
            })?;
            let current = &ctx.record().settings;
            println!(
                "Theme: {} | audio: {} | microphone: {} | games: {}",
                current.current_theme.label(),
                on_off(current.audio_enabled),
                on_off(current.microphone_enabled),
                current.enabled_games.len()
            );
        }
        Commands::Reset { pin } => {
            tutor::verify_pin(&ctx.record().settings, &pin)?;
            ctx.reset();
            println!("Progress reset");
        }
        Commands::SetPin { pin, new_pin } => {
            ctx.try_update(|record| tutor::change_pin(record, &pin, &new_pin))?;
            println!("PIN updated");
        }
    }
    Ok(())
}

async fn play_dialogue(
    mut ctx: ProgressContext,
    lesson_id: &str,
    choices: &[String],
) -> Result<(), CliError> {
    let lesson = ctx
        .lessons()
        .and_then(|source| source.lesson(lesson_id))
        .cloned()
        .ok_or_else(|| CliError::InvalidArgument(format!("unknown lesson: {lesson_id}")))?;

    let (tx, mut rx) = mpsc::unbounded_channel();
    let mut session = DialogueSession::from_lesson(&lesson, tx)?;
    print_dialogue_line(&session.state());

    for choice in choices {
        if !session.choose(choice) {
            return Err(CliError::InvalidArgument(format!("choice not available: {choice}")));
        }
        print_dialogue_line(&session.state());
    }

    if !session.completion_scheduled() {
        println!("Dialogue not finished, no points recorded");
        return Ok(());
    }

    // 发送端在会话内，等到完成事件后再结束会话
    if let Some(event) = rx.recv().await {
        let outcome = ctx.apply_session_event(event);
        println!("+{} points", outcome.points_earned);
        print_unlocked(&ctx, &outcome);
    }
    drop(session);
    Ok(())
}

fn print_dialogue_line(state: &DialogueState) {
    if let Some(message) = &state.message {
        println!("{}: {}", message.speaker, message.text);
    }
    for choice in &state.choices {
        println!("  [{}] {}", choice.id, choice.text);
    }
}

fn load_catalog(path: Option<&Path>) -> Result<Option<Arc<dyn LessonSource>>, CliError> {
    let Some(path) = path else {
        return Ok(None);
    };
    let raw = std::fs::read_to_string(path)?;
    let catalog = LessonCatalog::from_json(&raw)?;
    tracing::debug!(path = %path.display(), lessons = catalog.lessons().len(), "lesson catalog loaded");
    Ok(Some(Arc::new(catalog)))
}

fn print_summary(ctx: &ProgressContext) {
    let record = ctx.record();
    let today = ctx.clock().today();
    println!("Learner: {} ({})", record.profile.name, record.profile.native_language);
    println!("Points: {}", record.total_points);
    println!("Practice time: {} minutes", record.total_minutes);
    println!(
        "Streak: {} days (longest {})",
        record.streak.current_streak, record.streak.longest_streak
    );
    println!(
        "Today's goal: {:.0}% of {} minutes",
        daily_goal_progress(record, today),
        record.profile.target_daily_minutes
    );
    println!("Average (last 7 days): {} minutes", report::average_daily_minutes(record));
    println!("Badges:");
    for id in BadgeId::ALL {
        let Some(badge) = record.badge(id) else {
            continue;
        };
        let progress = get_badge_progress(record, id, today, ctx.lessons());
        let mark = if badge.unlocked { "x" } else { " " };
        println!(
            "  [{mark}] {} {} ({:.0}%)",
            badge.icon, badge.name, progress.percentage
        );
    }
}

fn print_unlocked(ctx: &ProgressContext, outcome: &RecordOutcome) {
    for id in &outcome.newly_unlocked {
        if let Some(badge) = ctx.record().badge(*id) {
            println!("New badge: {} {}", badge.icon, badge.name);
        }
    }
}

fn on_off(value: bool) -> &'static str {
    if value {
        "on"
    } else {
        "off"
    }
}
