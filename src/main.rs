use anyhow::Result;
use clap::{Parser, Subcommand};
use std::path::PathBuf;

use rewards_ledger::config::RewardsConfig;
use rewards_ledger::rewards::{
    sources, AchievementContext, Currency, Identity, LessonAttempt, RewardsManager,
};

mod cli;

use cli::ledger::LedgerOp;
use cli::quests::QuestCommand;
use cli::CliContext;

#[derive(Parser)]
#[command(name = "rewards")]
#[command(about = "Rewards ledger - XP, gems, streaks, quests and achievements")]
#[command(version)]
struct Cli {
    /// Path to the database (defaults to ~/.rewards/rewards.db)
    #[arg(long, global = true)]
    db: Option<PathBuf>,

    /// Path to the config file (defaults to ~/.rewards/config.toml)
    #[arg(short, long, global = true)]
    config: Option<PathBuf>,

    /// User to act as
    #[arg(short, long, global = true)]
    user: Option<String>,

    /// Print results as JSON
    #[arg(long, global = true)]
    json: bool,

    /// Enable verbose logging
    #[arg(short, long, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Write the default config and create the database
    Init {
        /// Overwrite existing config file
        #[arg(long)]
        force: bool,
    },

    /// Show balances, streak and level
    Status {
        /// Set the active course
        #[arg(long)]
        course: Option<String>,
    },

    /// Award XP (bonuses apply to lesson and practice sources)
    AwardXp {
        amount: u32,
        #[arg(long, default_value = sources::PRACTICE)]
        source: String,
        #[arg(long = "ref")]
        source_ref: Option<String>,
    },

    /// Spend XP
    SpendXp {
        amount: u32,
        #[arg(long, default_value = sources::SHOP)]
        source: String,
        #[arg(long = "ref")]
        source_ref: Option<String>,
    },

    /// Award gems
    AwardGems {
        amount: u32,
        #[arg(long, default_value = sources::AD_REWARD)]
        source: String,
        #[arg(long = "ref")]
        source_ref: Option<String>,
    },

    /// Spend gems
    SpendGems {
        amount: u32,
        #[arg(long, default_value = sources::SHOP)]
        source: String,
        #[arg(long = "ref")]
        source_ref: Option<String>,
    },

    /// Record today's activity against the streak
    Streak {
        /// The activity failed (resets the streak)
        #[arg(long)]
        failed: bool,
    },

    /// Daily quests
    #[command(subcommand)]
    Quest(QuestCommand),

    /// Monthly quests
    #[command(subcommand)]
    MonthlyQuest(QuestCommand),

    /// List achievements, or evaluate one trigger context
    Achievements {
        #[arg(long, value_parser = cli::parse_achievement_context)]
        evaluate: Option<AchievementContext>,

        /// Trigger value (streak length, courses completed)
        #[arg(long, requires = "evaluate")]
        value: Option<u64>,
    },

    /// Run the full lesson completion pipeline
    CompleteLesson {
        lesson_id: String,

        /// First attempt at this lesson
        #[arg(long)]
        first: bool,

        /// No mistakes
        #[arg(long)]
        perfect: bool,

        #[arg(long, default_value_t = 0)]
        correct: u32,

        #[arg(long, default_value_t = 0)]
        total: u32,
    },

    /// Refill hearts with gems
    RefillHearts,

    /// Claim the daily Pro bonus
    ProBonus,

    /// Buy a shop item (lists items when none given)
    Buy { item: Option<String> },

    /// Claim the reward for a watched ad
    AdReward,

    /// Show ledger entries, newest first
    History {
        #[arg(long, value_parser = cli::parse_currency)]
        currency: Option<Currency>,

        #[arg(long, default_value_t = 20)]
        limit: u32,
    },

    /// Compare balances against ledger sums
    Audit,

    /// Start or cancel a subscription
    Subscribe {
        /// Days from now until expiry
        #[arg(long, conflicts_with = "cancel")]
        days: Option<i64>,

        #[arg(long)]
        cancel: bool,
    },
}

fn load_config(path: Option<&PathBuf>) -> Result<RewardsConfig> {
    if let Some(path) = path {
        return RewardsConfig::from_file(path);
    }
    let global = RewardsConfig::global_config_dir().join("config.toml");
    if global.exists() {
        return RewardsConfig::from_file(&global);
    }
    RewardsConfig::from_dir(&PathBuf::from("."))
}

fn main() -> Result<()> {
    let cli = Cli::parse();

    // Initialize logging
    let log_level = if cli.verbose { "debug" } else { "warn" };
    tracing_subscriber::fmt()
        .with_writer(std::io::stderr)
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(log_level)),
        )
        .init();

    let db_path = cli.db.clone().unwrap_or_else(RewardsConfig::default_db_path);

    if let Commands::Init { force } = cli.command {
        return cli::init::init_command(cli.config, &db_path, force);
    }

    let config = load_config(cli.config.as_ref())?;
    let identity = Identity::from(cli.user);
    let rewards = RewardsManager::open(&db_path, config)?;
    if matches!(identity, Identity::User(_)) && !matches!(cli.command, Commands::Status { .. }) {
        rewards.ensure_progress(&identity, None)?;
    }

    let ctx = CliContext {
        rewards,
        identity,
        json: cli.json,
    };

    match cli.command {
        Commands::Init { .. } => {}
        Commands::Status { course } => {
            cli::progress::status_command(&ctx, course.as_deref())?;
        }
        Commands::AwardXp {
            amount,
            source,
            source_ref,
        } => {
            cli::ledger::balance_command(&ctx, LedgerOp::AwardXp, amount, &source, source_ref.as_deref())?;
        }
        Commands::SpendXp {
            amount,
            source,
            source_ref,
        } => {
            cli::ledger::balance_command(&ctx, LedgerOp::SpendXp, amount, &source, source_ref.as_deref())?;
        }
        Commands::AwardGems {
            amount,
            source,
            source_ref,
        } => {
            cli::ledger::balance_command(&ctx, LedgerOp::AwardGems, amount, &source, source_ref.as_deref())?;
        }
        Commands::SpendGems {
            amount,
            source,
            source_ref,
        } => {
            cli::ledger::balance_command(&ctx, LedgerOp::SpendGems, amount, &source, source_ref.as_deref())?;
        }
        Commands::Streak { failed } => {
            cli::progress::streak_command(&ctx, failed)?;
        }
        Commands::Quest(command) => {
            cli::quests::daily_quest_command(&ctx, command)?;
        }
        Commands::MonthlyQuest(command) => {
            cli::quests::monthly_quest_command(&ctx, command)?;
        }
        Commands::Achievements { evaluate, value } => {
            cli::progress::achievements_command(&ctx, evaluate, value)?;
        }
        Commands::CompleteLesson {
            lesson_id,
            first,
            perfect,
            correct,
            total,
        } => {
            let mut attempt = LessonAttempt::new(lesson_id, first, perfect);
            attempt.correct_challenges = correct;
            attempt.total_challenges = total;
            if total > 0 {
                attempt.score = correct * 100 / total;
            }
            cli::progress::complete_lesson_command(&ctx, &attempt)?;
        }
        Commands::RefillHearts => {
            cli::shop::refill_hearts_command(&ctx)?;
        }
        Commands::ProBonus => {
            cli::shop::pro_bonus_command(&ctx)?;
        }
        Commands::Buy { item } => {
            cli::shop::buy_command(&ctx, item.as_deref())?;
        }
        Commands::AdReward => {
            cli::shop::ad_reward_command(&ctx)?;
        }
        Commands::History { currency, limit } => {
            cli::ledger::history_command(&ctx, currency, limit)?;
        }
        Commands::Audit => {
            cli::ledger::audit_command(&ctx)?;
        }
        Commands::Subscribe { days, cancel } => {
            let days = if cancel { None } else { Some(days.unwrap_or(30)) };
            cli::progress::subscribe_command(&ctx, days)?;
        }
    }

    Ok(())
}
