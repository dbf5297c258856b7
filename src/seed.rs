//! Seed data - challenge and achievement catalogs plus a demo user
//!
//! Idempotent: challenges are keyed by title, achievements by code, so
//! re-running `vitaquest seed` is safe.

use anyhow::{bail, Context, Result};
use chrono::Utc;
use rusqlite::Connection;
use uuid::Uuid;

use crate::db::GameDb;
use crate::engine::achievements::Requirement;

struct SeedChallenge {
    title: &'static str,
    description: &'static str,
    category: &'static str,
    kind: &'static str,
    difficulty: &'static str,
    points: i64,
    xp_reward: i64,
    target: f64,
    unit: &'static str,
    icon: &'static str,
}

static CHALLENGES: &[SeedChallenge] = &[
    SeedChallenge {
        title: "Morning Walk",
        description: "Walk 10,000 steps today",
        category: "health",
        kind: "daily",
        difficulty: "easy",
        points: 50,
        xp_reward: 100,
        target: 10000.0,
        unit: "steps",
        icon: "🚶",
    },
    SeedChallenge {
        title: "Water Intake",
        description: "Drink 8 glasses of water",
        category: "health",
        kind: "daily",
        difficulty: "easy",
        points: 30,
        xp_reward: 50,
        target: 8.0,
        unit: "glasses",
        icon: "💧",
    },
    SeedChallenge {
        title: "Budget Tracker",
        description: "Log your daily expenses",
        category: "financial",
        kind: "daily",
        difficulty: "easy",
        points: 40,
        xp_reward: 80,
        target: 1.0,
        unit: "task",
        icon: "💰",
    },
    SeedChallenge {
        title: "Workout Warrior",
        description: "Complete 5 workout sessions this week",
        category: "health",
        kind: "weekly",
        difficulty: "medium",
        points: 200,
        xp_reward: 500,
        target: 5.0,
        unit: "sessions",
        icon: "💪",
    },
    SeedChallenge {
        title: "Savings Goal",
        description: "Save $100 this week",
        category: "wealth",
        kind: "weekly",
        difficulty: "medium",
        points: 150,
        xp_reward: 400,
        target: 100.0,
        unit: "dollars",
        icon: "🏦",
    },
    SeedChallenge {
        title: "Policy Review",
        description: "Review your insurance policies",
        category: "insurance",
        kind: "weekly",
        difficulty: "easy",
        points: 100,
        xp_reward: 200,
        target: 1.0,
        unit: "task",
        icon: "🛡️",
    },
    SeedChallenge {
        title: "Investment Start",
        description: "Make your first investment",
        category: "wealth",
        kind: "monthly",
        difficulty: "medium",
        points: 300,
        xp_reward: 800,
        target: 1.0,
        unit: "investment",
        icon: "📈",
    },
    SeedChallenge {
        title: "Wellness Share",
        description: "Share health tips with friends",
        category: "social",
        kind: "weekly",
        difficulty: "easy",
        points: 80,
        xp_reward: 150,
        target: 5.0,
        unit: "shares",
        icon: "🤝",
    },
    SeedChallenge {
        title: "Aktivo Score Boost",
        description: "Improve your Aktivo health score",
        category: "aktivo",
        kind: "weekly",
        difficulty: "medium",
        points: 180,
        xp_reward: 450,
        target: 10.0,
        unit: "points",
        icon: "⚡",
    },
];

struct SeedAchievement {
    code: &'static str,
    title: &'static str,
    description: &'static str,
    icon: &'static str,
    category: &'static str,
    rarity: &'static str,
    requirement: &'static str,
    threshold: i64,
    points: i64,
}

static ACHIEVEMENTS: &[SeedAchievement] = &[
    SeedAchievement {
        code: "first_steps",
        title: "First Steps",
        description: "Complete your first challenge",
        icon: "🎯",
        category: "milestone",
        rarity: "common",
        requirement: "challenges_completed",
        threshold: 1,
        points: 100,
    },
    SeedAchievement {
        code: "health_enthusiast",
        title: "Health Enthusiast",
        description: "Complete 10 health challenges",
        icon: "❤️",
        category: "health",
        rarity: "rare",
        requirement: "health_challenges",
        threshold: 10,
        points: 250,
    },
    SeedAchievement {
        code: "wellness_master",
        title: "Wellness Master",
        description: "Complete 50 challenges",
        icon: "🏆",
        category: "milestone",
        rarity: "epic",
        requirement: "challenges_completed",
        threshold: 50,
        points: 1000,
    },
    SeedAchievement {
        code: "penny_saver",
        title: "Penny Saver",
        description: "Complete your first wealth challenge",
        icon: "🪙",
        category: "wealth",
        rarity: "common",
        requirement: "wealth_challenges",
        threshold: 1,
        points: 100,
    },
    SeedAchievement {
        code: "financial_guru",
        title: "Financial Guru",
        description: "Complete 20 wealth challenges",
        icon: "💎",
        category: "wealth",
        rarity: "epic",
        requirement: "wealth_challenges",
        threshold: 20,
        points: 750,
    },
    SeedAchievement {
        code: "level_10",
        title: "Level 10",
        description: "Reach level 10",
        icon: "🔟",
        category: "milestone",
        rarity: "rare",
        requirement: "level",
        threshold: 10,
        points: 500,
    },
    SeedAchievement {
        code: "point_collector",
        title: "Point Collector",
        description: "Earn 10,000 lifetime points",
        icon: "⭐",
        category: "milestone",
        rarity: "epic",
        requirement: "total_points",
        threshold: 10000,
        points: 1000,
    },
    SeedAchievement {
        code: "team_player",
        title: "Team Player",
        description: "Complete 5 social challenges",
        icon: "👥",
        category: "social",
        rarity: "rare",
        requirement: "social_challenges",
        threshold: 5,
        points: 300,
    },
    SeedAchievement {
        code: "week_streak",
        title: "On a Roll",
        description: "Keep a 7-day activity streak",
        icon: "🔥",
        category: "milestone",
        rarity: "rare",
        requirement: "streak_days",
        threshold: 7,
        points: 350,
    },
];

/// Insert the challenge and achievement catalogs.
pub fn seed_catalog(db: &GameDb) -> Result<(usize, usize)> {
    // Reject a catalog the evaluator couldn't process
    for achievement in ACHIEVEMENTS {
        if Requirement::parse(achievement.requirement).is_none() {
            bail!(
                "achievement '{}' has unknown requirement '{}'",
                achievement.code,
                achievement.requirement
            );
        }
    }

    let conn = db.conn();
    let now_ms = Utc::now().timestamp_millis();

    let mut challenges = 0;
    for c in CHALLENGES {
        challenges += conn
            .execute(
                "INSERT OR IGNORE INTO challenges
                 (title, description, category, kind, difficulty, points, xp_reward, target, unit, icon, created_at)
                 VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11)",
                rusqlite::params![
                    c.title,
                    c.description,
                    c.category,
                    c.kind,
                    c.difficulty,
                    c.points,
                    c.xp_reward,
                    c.target,
                    c.unit,
                    c.icon,
                    now_ms,
                ],
            )
            .context("seeding challenges")?;
    }

    let mut achievements = 0;
    for a in ACHIEVEMENTS {
        achievements += conn
            .execute(
                "INSERT OR IGNORE INTO achievements
                 (code, title, description, icon, category, rarity, requirement, threshold, points)
                 VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9)",
                rusqlite::params![
                    a.code,
                    a.title,
                    a.description,
                    a.icon,
                    a.category,
                    a.rarity,
                    a.requirement,
                    a.threshold,
                    a.points,
                ],
            )
            .context("seeding achievements")?;
    }

    Ok((challenges, achievements))
}

/// Create a user (or fetch the existing one) and return its API token.
pub fn ensure_user(db: &GameDb, username: &str) -> Result<String> {
    let conn = db.conn();
    if let Some(token) = existing_token(&conn, username)? {
        return Ok(token);
    }

    let token = Uuid::new_v4().to_string();
    conn.execute(
        "INSERT INTO users (username, api_token, created_at) VALUES (?1, ?2, ?3)",
        rusqlite::params![username, token, Utc::now().timestamp_millis()],
    )
    .with_context(|| format!("creating user '{username}'"))?;
    Ok(token)
}

fn existing_token(conn: &Connection, username: &str) -> Result<Option<String>> {
    use rusqlite::OptionalExtension;
    Ok(conn
        .query_row(
            "SELECT api_token FROM users WHERE username = ?1",
            [username],
            |r| r.get(0),
        )
        .optional()?)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_seed_is_idempotent() {
        let db = GameDb::open_in_memory().unwrap();
        let (c1, a1) = seed_catalog(&db).unwrap();
        assert_eq!(c1, CHALLENGES.len());
        assert_eq!(a1, ACHIEVEMENTS.len());

        let (c2, a2) = seed_catalog(&db).unwrap();
        assert_eq!(c2, 0);
        assert_eq!(a2, 0);
    }

    #[test]
    fn test_all_requirements_parse() {
        for a in ACHIEVEMENTS {
            assert!(
                Requirement::parse(a.requirement).is_some(),
                "bad requirement on {}",
                a.code
            );
        }
    }

    #[test]
    fn test_ensure_user_returns_stable_token() {
        let db = GameDb::open_in_memory().unwrap();
        let t1 = ensure_user(&db, "demo").unwrap();
        let t2 = ensure_user(&db, "demo").unwrap();
        assert_eq!(t1, t2);
    }
}
