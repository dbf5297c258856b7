//! Achievement evaluation
//!
//! Scans the full catalog against a user's counters and unlocks whatever is
//! newly satisfied. The catalog is small and static, so the full scan per
//! completion is fine. The unique (user, achievement) index is the
//! idempotency guard: a double insert fails loudly instead of duplicating.

use rusqlite::Connection;

use crate::domain::{AchievementRecord, Category, UserRecord};
use crate::error::EngineError;

/// Typed counter an achievement requirement is checked against.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Requirement {
    /// Total challenges completed, any category.
    ChallengesCompleted,
    /// Challenges completed in one category.
    CategoryChallenges(Category),
    /// Current level.
    Level,
    /// Lifetime points earned.
    TotalPoints,
    /// Current global streak length.
    StreakDays,
}

impl Requirement {
    /// Parse a catalog requirement token. Unknown tokens are a seed-time
    /// error, not a silent skip.
    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "challenges_completed" => Some(Self::ChallengesCompleted),
            "level" => Some(Self::Level),
            "total_points" => Some(Self::TotalPoints),
            "streak_days" => Some(Self::StreakDays),
            other => {
                let category = other.strip_suffix("_challenges")?;
                Category::parse(category).map(Self::CategoryChallenges)
            }
        }
    }
}

/// An achievement that was just unlocked.
#[derive(Debug, Clone)]
pub struct Unlock {
    pub achievement: AchievementRecord,
    pub unlocked_at: i64,
}

fn achievement_from_row(row: &rusqlite::Row<'_>) -> rusqlite::Result<AchievementRecord> {
    Ok(AchievementRecord {
        id: row.get("id")?,
        code: row.get("code")?,
        title: row.get("title")?,
        description: row.get("description")?,
        icon: row.get("icon")?,
        category: row.get("category")?,
        rarity: row.get("rarity")?,
        requirement: row.get("requirement")?,
        threshold: row.get("threshold")?,
        points: row.get("points")?,
    })
}

/// Load the whole achievement catalog.
pub fn catalog(conn: &Connection) -> rusqlite::Result<Vec<AchievementRecord>> {
    let mut stmt = conn.prepare("SELECT * FROM achievements ORDER BY id")?;
    let rows = stmt.query_map([], achievement_from_row)?;
    rows.collect()
}

/// Achievement ids already unlocked by a user.
pub fn unlocked_ids(conn: &Connection, user_id: i64) -> rusqlite::Result<Vec<i64>> {
    let mut stmt = conn.prepare("SELECT achievement_id FROM user_achievements WHERE user_id = ?1")?;
    let rows = stmt.query_map([user_id], |r| r.get(0))?;
    rows.collect()
}

/// Unlocked (achievement_id, unlocked_at) pairs for a user.
pub fn unlocks_for(conn: &Connection, user_id: i64) -> rusqlite::Result<Vec<(i64, i64)>> {
    let mut stmt = conn.prepare(
        "SELECT achievement_id, unlocked_at FROM user_achievements WHERE user_id = ?1",
    )?;
    let rows = stmt.query_map([user_id], |r| Ok((r.get(0)?, r.get(1)?)))?;
    rows.collect()
}

fn completed_in_category(
    conn: &Connection,
    user_id: i64,
    category: Category,
) -> rusqlite::Result<i64> {
    conn.query_row(
        "SELECT COUNT(*) FROM user_progress p
         JOIN challenges c ON c.id = p.challenge_id
         WHERE p.user_id = ?1 AND p.status = 'completed' AND c.category = ?2",
        rusqlite::params![user_id, category.as_str()],
        |r| r.get(0),
    )
}

/// Evaluate the catalog for a user and insert unlock rows for everything
/// newly satisfied.
///
/// Counters are read from the passed-in user snapshot (the engine has
/// already applied this completion's credit to it). The caller credits
/// `achievement.points` and bumps `achievements_unlocked`; this function
/// only decides and records the unlocks, so every user-counter write stays
/// inside the engine's single commit path.
pub fn evaluate(
    conn: &Connection,
    user: &UserRecord,
    now_ms: i64,
) -> Result<Vec<Unlock>, EngineError> {
    let unlocked = unlocked_ids(conn, user.id)?;
    let mut unlocks = Vec::new();

    for achievement in catalog(conn)? {
        if unlocked.contains(&achievement.id) {
            continue;
        }

        let Some(requirement) = Requirement::parse(&achievement.requirement) else {
            // Seed validates tokens; an unknown one here means a hand-edited
            // catalog. Surface it rather than guessing.
            return Err(EngineError::BadCatalog {
                requirement: achievement.requirement.clone(),
            });
        };

        let counter = match requirement {
            Requirement::ChallengesCompleted => user.stats.challenges_completed,
            Requirement::CategoryChallenges(category) => {
                completed_in_category(conn, user.id, category)?
            }
            Requirement::Level => user.level,
            Requirement::TotalPoints => user.stats.total_points,
            Requirement::StreakDays => user.streak_current,
        };

        if counter >= achievement.threshold {
            conn.execute(
                "INSERT INTO user_achievements (user_id, achievement_id, unlocked_at)
                 VALUES (?1, ?2, ?3)",
                rusqlite::params![user.id, achievement.id, now_ms],
            )?;
            unlocks.push(Unlock {
                achievement,
                unlocked_at: now_ms,
            });
        }
    }

    Ok(unlocks)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_requirement_parse() {
        assert_eq!(
            Requirement::parse("challenges_completed"),
            Some(Requirement::ChallengesCompleted)
        );
        assert_eq!(Requirement::parse("level"), Some(Requirement::Level));
        assert_eq!(
            Requirement::parse("total_points"),
            Some(Requirement::TotalPoints)
        );
        assert_eq!(
            Requirement::parse("wealth_challenges"),
            Some(Requirement::CategoryChallenges(Category::Wealth))
        );
        assert_eq!(
            Requirement::parse("health_challenges"),
            Some(Requirement::CategoryChallenges(Category::Health))
        );
        assert_eq!(Requirement::parse("family_helped"), None);
        assert_eq!(Requirement::parse(""), None);
    }
}
