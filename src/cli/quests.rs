//! Daily and monthly quest commands

use anyhow::Result;
use clap::Subcommand;
use serde::Serialize;

use rewards_ledger::rewards::{QuestDefinition, QuestType, QuestUpdate};

use super::{parse_quest_type, CliContext};

#[derive(Subcommand)]
pub enum QuestCommand {
    /// List the current quests with your progress
    List,

    /// Create the current quests from the configured templates
    Provision,

    /// Add progress to every current quest of a type
    Progress {
        #[arg(value_parser = parse_quest_type)]
        quest_type: QuestType,

        #[arg(default_value_t = 1)]
        increment: u32,
    },
}

#[derive(Serialize)]
struct QuestLine<'a> {
    quest: &'a QuestDefinition,
    current: u32,
    completed: bool,
}

pub fn daily_quest_command(ctx: &CliContext, command: QuestCommand) -> Result<()> {
    match command {
        QuestCommand::List => {
            let quests = ctx.rewards.daily_quests(&ctx.identity)?;
            print_quests(ctx, &quests)
        }
        QuestCommand::Provision => {
            let created = ctx.rewards.provision_daily_quests()?;
            ctx.emit(&created, |created| {
                println!("{} daily quest(s) available today", created.len());
            })
        }
        QuestCommand::Progress {
            quest_type,
            increment,
        } => {
            let update = ctx
                .rewards
                .update_quest_progress(&ctx.identity, quest_type, increment)?;
            print_update(ctx, &update)
        }
    }
}

pub fn monthly_quest_command(ctx: &CliContext, command: QuestCommand) -> Result<()> {
    match command {
        QuestCommand::List => {
            let quests = ctx.rewards.monthly_quests(&ctx.identity)?;
            print_quests(ctx, &quests)
        }
        QuestCommand::Provision => {
            let quest = ctx.rewards.ensure_monthly_quest()?;
            ctx.emit(&quest, |q| println!("Monthly quest: {} (target {})", q.title, q.target))
        }
        QuestCommand::Progress {
            quest_type,
            increment,
        } => {
            let update = ctx
                .rewards
                .update_monthly_quest_progress(&ctx.identity, quest_type, increment)?;
            print_update(ctx, &update)
        }
    }
}

fn print_quests(ctx: &CliContext, quests: &[(QuestDefinition, u32, bool)]) -> Result<()> {
    let lines: Vec<QuestLine<'_>> = quests
        .iter()
        .map(|(quest, current, completed)| QuestLine {
            quest,
            current: *current,
            completed: *completed,
        })
        .collect();

    ctx.emit(&lines, |lines| {
        if lines.is_empty() {
            println!("No quests.");
            return;
        }
        for line in lines {
            let mark = if line.completed { "x" } else { " " };
            println!(
                "  [{mark}] {:<28} {:>4}/{:<4}",
                line.quest.title,
                line.current.min(line.quest.target),
                line.quest.target
            );
        }
    })
}

fn print_update(ctx: &CliContext, update: &QuestUpdate) -> Result<()> {
    ctx.emit(update, |u| {
        println!("{} quest(s) advanced", u.matched);
        for quest in &u.completed {
            let r = quest.reward;
            println!(
                "  Completed: {} (+{} XP, +{} gems, +{} hearts)",
                quest.title, r.xp, r.gems, r.hearts
            );
        }
        for warning in &u.warnings {
            println!("  warning: {} failed: {}", warning.step, warning.message);
        }
    })
}
