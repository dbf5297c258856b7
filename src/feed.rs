//! Audit/activity feed writer
//!
//! Appends lifecycle events (completions, level-ups, unlocks) for the
//! user-facing feed and for later behavioral analysis. Entries are immutable
//! once written and are never a source of truth for points.

use chrono::{DateTime, Utc};
use rusqlite::Connection;
use tracing::warn;
use uuid::Uuid;

use crate::domain::{
    ActivityKind, ActivityRecord, AchievementRecord, ChallengeRecord, UserId,
};
use crate::engine::levels::LevelUp;

/// Append one entry. Called inside the engine's transaction so an aborted
/// completion leaves no trace.
pub fn record(conn: &Connection, entry: &ActivityRecord) -> rusqlite::Result<()> {
    let metadata = entry
        .metadata
        .as_ref()
        .map(|m| m.to_string());
    conn.execute(
        "INSERT INTO activities (id, user_id, kind, title, description, icon, points, metadata, created_at)
         VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9)",
        rusqlite::params![
            entry.id,
            entry.user_id,
            entry.kind.as_str(),
            entry.title,
            entry.description,
            entry.icon,
            entry.points,
            metadata,
            entry.created_at,
        ],
    )?;
    Ok(())
}

/// Most recent feed entries for a user, newest first. An entry whose kind is
/// no longer recognized is skipped, never misclassified.
pub fn recent(conn: &Connection, user_id: UserId, limit: u32) -> rusqlite::Result<Vec<ActivityRecord>> {
    let mut stmt = conn.prepare(
        "SELECT id, user_id, kind, title, description, icon, points, metadata, created_at
         FROM activities WHERE user_id = ?1 ORDER BY created_at DESC, id DESC LIMIT ?2",
    )?;
    let rows = stmt.query_map(rusqlite::params![user_id, limit], |row| {
        let kind_token: String = row.get("kind")?;
        let Some(kind) = ActivityKind::parse(&kind_token) else {
            warn!("[vitaquest:feed] skipping entry with unknown kind '{kind_token}'");
            return Ok(None);
        };
        let metadata: Option<String> = row.get("metadata")?;
        Ok(Some(ActivityRecord {
            id: row.get("id")?,
            user_id: row.get("user_id")?,
            kind,
            title: row.get("title")?,
            description: row.get("description")?,
            icon: row.get("icon")?,
            points: row.get("points")?,
            metadata: metadata.and_then(|m| serde_json::from_str(&m).ok()),
            created_at: row.get("created_at")?,
        }))
    })?;
    rows.filter_map(|r| r.transpose()).collect()
}

/// Event for a completed challenge. Carries what the behavioral layer needs:
/// category, difficulty, the final per-challenge streak, and the reported
/// activity.
pub fn challenge_completed(
    user_id: UserId,
    challenge: &ChallengeRecord,
    streak: i64,
    activity_type: &str,
    amount: f64,
    now: DateTime<Utc>,
) -> ActivityRecord {
    ActivityRecord {
        id: Uuid::new_v4().to_string(),
        user_id,
        kind: ActivityKind::ChallengeCompleted,
        title: format!("Completed: {}", challenge.title),
        description: challenge.description.clone(),
        icon: challenge.icon.clone(),
        points: challenge.points,
        metadata: Some(serde_json::json!({
            "challenge_id": challenge.id,
            "category": challenge.category.as_str(),
            "difficulty": challenge.difficulty.as_str(),
            "streak": streak,
            "activity_type": activity_type,
            "amount": amount,
        })),
        created_at: now.timestamp_millis(),
    }
}

/// Event for a level boundary crossing, carrying old/new level and the bonus.
pub fn level_up(user_id: UserId, up: &LevelUp, now: DateTime<Utc>) -> ActivityRecord {
    ActivityRecord {
        id: Uuid::new_v4().to_string(),
        user_id,
        kind: ActivityKind::LevelUp,
        title: format!("Leveled up to {}!", up.new_level),
        description: format!(
            "Reached level {} (from {}), +{} bonus points",
            up.new_level, up.old_level, up.bonus
        ),
        icon: "⬆️".to_string(),
        points: up.bonus,
        metadata: Some(serde_json::json!({
            "old_level": up.old_level,
            "new_level": up.new_level,
            "bonus": up.bonus,
        })),
        created_at: now.timestamp_millis(),
    }
}

/// Event for a newly unlocked achievement.
pub fn achievement_unlocked(
    user_id: UserId,
    achievement: &AchievementRecord,
    now: DateTime<Utc>,
) -> ActivityRecord {
    ActivityRecord {
        id: Uuid::new_v4().to_string(),
        user_id,
        kind: ActivityKind::AchievementUnlocked,
        title: format!("Achievement unlocked: {}", achievement.title),
        description: achievement.description.clone(),
        icon: achievement.icon.clone(),
        points: achievement.points,
        metadata: Some(serde_json::json!({
            "achievement_id": achievement.id,
            "code": achievement.code,
            "rarity": achievement.rarity,
        })),
        created_at: now.timestamp_millis(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::GameDb;

    #[test]
    fn test_record_and_recent() {
        let db = GameDb::open_in_memory().unwrap();
        let conn = db.conn();
        conn.execute(
            "INSERT INTO users (username, api_token, created_at) VALUES ('a', 't', 0)",
            [],
        )
        .unwrap();

        let up = LevelUp {
            old_level: 1,
            new_level: 2,
            bonus: 100,
        };
        let entry = level_up(1, &up, Utc::now());
        record(&conn, &entry).unwrap();

        let feed = recent(&conn, 1, 10).unwrap();
        assert_eq!(feed.len(), 1);
        assert_eq!(feed[0].kind, ActivityKind::LevelUp);
        assert_eq!(feed[0].points, 100);
        let meta = feed[0].metadata.as_ref().unwrap();
        assert_eq!(meta["new_level"], 2);
    }

    #[test]
    fn test_unknown_kind_is_skipped_not_misread() {
        let db = GameDb::open_in_memory().unwrap();
        let conn = db.conn();
        conn.execute(
            "INSERT INTO users (username, api_token, created_at) VALUES ('a', 't', 0)",
            [],
        )
        .unwrap();

        conn.execute(
            "INSERT INTO activities (id, user_id, kind, title, created_at)
             VALUES ('x-1', 1, 'reward_redeemed', 'Old entry', 1)",
            [],
        )
        .unwrap();
        let up = LevelUp {
            old_level: 1,
            new_level: 2,
            bonus: 100,
        };
        record(&conn, &level_up(1, &up, Utc::now())).unwrap();

        let feed = recent(&conn, 1, 10).unwrap();
        assert_eq!(feed.len(), 1);
        assert_eq!(feed[0].kind, ActivityKind::LevelUp);
    }
}
