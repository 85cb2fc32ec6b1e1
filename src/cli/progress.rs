//! Progress commands: status, streak, lessons, achievements, subscription

use anyhow::Result;

use rewards_ledger::rewards::{AchievementContext, LessonAttempt, StepStatus};

use super::CliContext;

pub fn status_command(ctx: &CliContext, course: Option<&str>) -> Result<()> {
    ctx.rewards.ensure_progress(&ctx.identity, course)?;
    let snapshot = ctx.rewards.snapshot(&ctx.identity)?;

    ctx.emit(&snapshot, |s| {
        let p = &s.progress;
        println!("{}  Level {} - {}", p.user_id, s.level, s.title);
        match s.next_level_xp {
            Some(next) => println!(
                "  XP earned: {} ({:.0}% to {next})",
                p.total_xp_earned,
                s.progress_to_next() * 100.0
            ),
            None => println!("  XP earned: {} (max level)", p.total_xp_earned),
        }
        println!("  XP: {}  Gems: {}  Hearts: {}", p.xp, p.gems, p.hearts);
        println!("  Streak: {} (longest {})", p.streak, p.longest_streak);
        println!(
            "  Lessons: {} ({} perfect)",
            p.lessons_completed, p.perfect_lessons
        );
        if let Some(course) = &p.active_course_id {
            println!("  Course: {course}");
        }
        if s.subscription_active {
            println!("  Pro: active");
        }
    })
}

pub fn streak_command(ctx: &CliContext, failed: bool) -> Result<()> {
    let update = ctx.rewards.update_streak(&ctx.identity, !failed)?;

    ctx.emit(&update, |u| {
        println!("Streak: {} -> {} ({:?})", u.previous, u.streak, u.transition);
        if let Some(bonus) = &u.weekly_bonus {
            println!("  Weekly bonus: +{} XP", bonus.applied);
        }
        if let Some(gems) = &u.daily_gems {
            println!("  Daily streak gems: +{}", gems.applied);
        }
    })
}

pub fn complete_lesson_command(ctx: &CliContext, attempt: &LessonAttempt) -> Result<()> {
    let summary = ctx.rewards.process_lesson_completion(&ctx.identity, attempt)?;

    ctx.emit(&summary, |s| {
        println!("Lesson {} (attempt {})", s.lesson_id, s.attempt);
        println!("  +{} XP", s.xp);
        if s.gems > 0 {
            println!("  +{} gems", s.gems);
        }
        println!("  Streak: {}", s.new_streak);
        for quest in &s.completed_quests {
            println!("  Quest complete: {}", quest.title);
        }
        for unlocked in &s.achievements {
            println!("  Achievement: {}", unlocked.achievement.title);
        }
        for report in &s.steps {
            if let StepStatus::Recovered(message) = &report.status {
                println!("  warning: {:?} failed: {message}", report.step);
            }
        }
    })
}

pub fn achievements_command(
    ctx: &CliContext,
    evaluate: Option<AchievementContext>,
    value: Option<u64>,
) -> Result<()> {
    if let Some(context) = evaluate {
        let unlocked = ctx
            .rewards
            .evaluate_achievements(&ctx.identity, context, value)?;
        return ctx.emit(&unlocked, |unlocked| {
            if unlocked.is_empty() {
                println!("Nothing new unlocked.");
            }
            for u in unlocked {
                println!(
                    "Unlocked: {} (+{} XP, +{} gems)",
                    u.achievement.title, u.achievement.xp_reward, u.achievement.gems_reward
                );
            }
        });
    }

    let statuses = ctx.rewards.achievements(&ctx.identity)?;
    ctx.emit(&statuses, |statuses| {
        let unlocked = statuses.iter().filter(|s| s.unlocked).count();
        println!("Achievements ({unlocked}/{}):\n", statuses.len());
        for s in statuses {
            let mark = if s.unlocked { "x" } else { " " };
            println!(
                "  [{mark}] {:<20} {}",
                s.achievement.title, s.achievement.description
            );
        }
    })
}

pub fn subscribe_command(ctx: &CliContext, days: Option<i64>) -> Result<()> {
    let until = days.map(|d| ctx.rewards.clock().now() + chrono::Duration::days(d));
    ctx.rewards.set_subscription(&ctx.identity, until)?;

    ctx.emit(&until, |until| match until {
        Some(t) => println!("Subscription active until {}", t.format("%Y-%m-%d")),
        None => println!("Subscription cancelled."),
    })
}
