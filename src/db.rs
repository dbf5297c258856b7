//! SQLite database connection and schema management
//!
//! Manages the game database (default `~/.vitaquest/vitaquest.db`) with
//! automatic schema migration. Row-mapping helpers live here so the engine
//! can reuse them inside its transaction.

use std::path::Path;
use std::sync::{Arc, Mutex};

use anyhow::{Context, Result};
use rusqlite::{Connection, OptionalExtension, Row};

use crate::domain::{
    Category, ChallengeId, ChallengeKind, ChallengeRecord, Difficulty, ProgressRecord,
    ProgressStatus, UserId, UserRecord, UserStats,
};

/// Database wrapper shared across handler threads.
#[derive(Clone)]
pub struct GameDb {
    conn: Arc<Mutex<Connection>>,
}

impl GameDb {
    /// Open or create the database at a specific path.
    pub fn open(path: &Path) -> Result<Self> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)
                .with_context(|| format!("Failed to create data dir: {}", parent.display()))?;
        }

        let conn = Connection::open(path)
            .with_context(|| format!("Failed to open database: {}", path.display()))?;

        // WAL so reads don't block the write path
        conn.pragma_update(None, "journal_mode", "WAL")?;
        conn.pragma_update(None, "synchronous", "NORMAL")?;
        conn.pragma_update(None, "foreign_keys", "ON")?;

        let db = Self {
            conn: Arc::new(Mutex::new(conn)),
        };
        db.init_schema()?;
        Ok(db)
    }

    /// Open an in-memory database (tests).
    pub fn open_in_memory() -> Result<Self> {
        let conn = Connection::open_in_memory()?;
        conn.pragma_update(None, "foreign_keys", "ON")?;
        let db = Self {
            conn: Arc::new(Mutex::new(conn)),
        };
        db.init_schema()?;
        Ok(db)
    }

    /// Get the connection guard. The whole progress pipeline for a request
    /// holds this for the duration of its transaction.
    pub fn conn(&self) -> std::sync::MutexGuard<'_, Connection> {
        self.conn.lock().expect("Game DB lock poisoned")
    }

    fn init_schema(&self) -> Result<()> {
        let conn = self.conn();
        conn.execute_batch(SCHEMA_SQL)?;
        drop(conn);
        self.run_migrations()?;
        Ok(())
    }

    fn run_migrations(&self) -> Result<()> {
        let conn = self.conn();

        let version: i32 = conn
            .query_row(
                "SELECT COALESCE(MAX(version), 0) FROM schema_version",
                [],
                |r| r.get(0),
            )
            .unwrap_or(0);

        // Migration 2: optimistic-concurrency tag on user_progress
        if version < 2 {
            let has_version: bool = conn
                .prepare("SELECT COUNT(*) FROM pragma_table_info('user_progress') WHERE name = 'version'")
                .and_then(|mut s| s.query_row([], |r| r.get::<_, i32>(0)))
                .map(|c| c > 0)
                .unwrap_or(false);

            if !has_version {
                conn.execute_batch(
                    "ALTER TABLE user_progress ADD COLUMN version INTEGER NOT NULL DEFAULT 0;",
                )?;
            }
            conn.execute("INSERT OR REPLACE INTO schema_version VALUES (2)", [])?;
        }

        Ok(())
    }
}

/// SQL schema for the game database
const SCHEMA_SQL: &str = r#"
-- Users (identity plus the counters the completion engine maintains)
CREATE TABLE IF NOT EXISTS users (
    id INTEGER PRIMARY KEY AUTOINCREMENT,
    username TEXT NOT NULL UNIQUE,
    api_token TEXT NOT NULL UNIQUE,
    points INTEGER NOT NULL DEFAULT 0,
    xp INTEGER NOT NULL DEFAULT 0,
    level INTEGER NOT NULL DEFAULT 1,
    streak_current INTEGER NOT NULL DEFAULT 0,
    streak_longest INTEGER NOT NULL DEFAULT 0,
    last_activity_day TEXT,
    challenges_completed INTEGER NOT NULL DEFAULT 0,
    total_points INTEGER NOT NULL DEFAULT 0,
    achievements_unlocked INTEGER NOT NULL DEFAULT 0,
    rewards_redeemed INTEGER NOT NULL DEFAULT 0,
    created_at INTEGER NOT NULL
);
CREATE INDEX IF NOT EXISTS idx_users_token ON users(api_token);

-- Challenge templates (immutable during a progress update)
CREATE TABLE IF NOT EXISTS challenges (
    id INTEGER PRIMARY KEY AUTOINCREMENT,
    title TEXT NOT NULL UNIQUE,
    description TEXT NOT NULL DEFAULT '',
    category TEXT NOT NULL,
    kind TEXT NOT NULL DEFAULT 'daily',
    difficulty TEXT NOT NULL DEFAULT 'medium',
    points INTEGER NOT NULL DEFAULT 10,
    xp_reward INTEGER NOT NULL DEFAULT 50,
    target REAL NOT NULL,
    unit TEXT NOT NULL DEFAULT 'count',
    icon TEXT NOT NULL DEFAULT '',
    is_active INTEGER NOT NULL DEFAULT 1,
    created_at INTEGER NOT NULL
);
CREATE INDEX IF NOT EXISTS idx_challenges_category ON challenges(category);

-- One progress row per (user, challenge)
CREATE TABLE IF NOT EXISTS user_progress (
    id INTEGER PRIMARY KEY AUTOINCREMENT,
    user_id INTEGER NOT NULL REFERENCES users(id),
    challenge_id INTEGER NOT NULL REFERENCES challenges(id),
    progress REAL NOT NULL DEFAULT 0,
    target REAL NOT NULL,
    status TEXT NOT NULL DEFAULT 'active',
    streak INTEGER NOT NULL DEFAULT 0,
    started_at INTEGER NOT NULL,
    last_updated INTEGER NOT NULL,
    completed_at INTEGER,
    version INTEGER NOT NULL DEFAULT 0,
    UNIQUE(user_id, challenge_id)
);
CREATE INDEX IF NOT EXISTS idx_progress_user ON user_progress(user_id);

-- Append-only audit feed
CREATE TABLE IF NOT EXISTS activities (
    id TEXT PRIMARY KEY,
    user_id INTEGER NOT NULL REFERENCES users(id),
    kind TEXT NOT NULL,
    title TEXT NOT NULL,
    description TEXT NOT NULL DEFAULT '',
    icon TEXT NOT NULL DEFAULT '',
    points INTEGER NOT NULL DEFAULT 0,
    metadata TEXT,
    created_at INTEGER NOT NULL
);
CREATE INDEX IF NOT EXISTS idx_activities_user ON activities(user_id, created_at);

-- Achievement catalog
CREATE TABLE IF NOT EXISTS achievements (
    id INTEGER PRIMARY KEY AUTOINCREMENT,
    code TEXT NOT NULL UNIQUE,
    title TEXT NOT NULL,
    description TEXT NOT NULL DEFAULT '',
    icon TEXT NOT NULL DEFAULT '',
    category TEXT NOT NULL DEFAULT 'milestone',
    rarity TEXT NOT NULL DEFAULT 'common',
    requirement TEXT NOT NULL,
    threshold INTEGER NOT NULL,
    points INTEGER NOT NULL DEFAULT 100
);

-- Per-user unlocks, at most one per (user, achievement)
CREATE TABLE IF NOT EXISTS user_achievements (
    user_id INTEGER NOT NULL REFERENCES users(id),
    achievement_id INTEGER NOT NULL REFERENCES achievements(id),
    unlocked_at INTEGER NOT NULL,
    UNIQUE(user_id, achievement_id)
);

-- Schema version
CREATE TABLE IF NOT EXISTS schema_version (version INTEGER PRIMARY KEY);
INSERT OR IGNORE INTO schema_version VALUES (1);
"#;

// ---- row mapping helpers -------------------------------------------------

pub fn user_from_row(row: &Row<'_>) -> rusqlite::Result<UserRecord> {
    Ok(UserRecord {
        id: row.get("id")?,
        username: row.get("username")?,
        points: row.get("points")?,
        xp: row.get("xp")?,
        level: row.get("level")?,
        streak_current: row.get("streak_current")?,
        streak_longest: row.get("streak_longest")?,
        last_activity_day: row.get("last_activity_day")?,
        stats: UserStats {
            challenges_completed: row.get("challenges_completed")?,
            total_points: row.get("total_points")?,
            achievements_unlocked: row.get("achievements_unlocked")?,
            rewards_redeemed: row.get("rewards_redeemed")?,
        },
    })
}

pub fn challenge_from_row(row: &Row<'_>) -> rusqlite::Result<ChallengeRecord> {
    let category: String = row.get("category")?;
    let kind: String = row.get("kind")?;
    let difficulty: String = row.get("difficulty")?;
    Ok(ChallengeRecord {
        id: row.get("id")?,
        title: row.get("title")?,
        description: row.get("description")?,
        category: Category::parse(&category).unwrap_or(Category::Health),
        kind: ChallengeKind::parse(&kind).unwrap_or(ChallengeKind::Daily),
        difficulty: Difficulty::parse(&difficulty).unwrap_or(Difficulty::Medium),
        points: row.get("points")?,
        xp_reward: row.get("xp_reward")?,
        target: row.get("target")?,
        unit: row.get("unit")?,
        icon: row.get("icon")?,
        is_active: row.get::<_, i64>("is_active")? != 0,
    })
}

pub fn progress_from_row(row: &Row<'_>) -> rusqlite::Result<ProgressRecord> {
    let status: String = row.get("status")?;
    Ok(ProgressRecord {
        id: row.get("id")?,
        user_id: row.get("user_id")?,
        challenge_id: row.get("challenge_id")?,
        progress: row.get("progress")?,
        target: row.get("target")?,
        status: ProgressStatus::parse(&status).unwrap_or(ProgressStatus::Active),
        streak: row.get("streak")?,
        started_at: row.get("started_at")?,
        last_updated: row.get("last_updated")?,
        completed_at: row.get("completed_at")?,
        version: row.get("version")?,
    })
}

// ---- read helpers (usable on a plain connection or inside a transaction) --

pub fn user_by_token(conn: &Connection, token: &str) -> rusqlite::Result<Option<UserRecord>> {
    conn.query_row(
        "SELECT * FROM users WHERE api_token = ?1",
        [token],
        user_from_row,
    )
    .optional()
}

pub fn user_by_id(conn: &Connection, id: UserId) -> rusqlite::Result<Option<UserRecord>> {
    conn.query_row("SELECT * FROM users WHERE id = ?1", [id], user_from_row)
        .optional()
}

pub fn challenge_by_id(
    conn: &Connection,
    id: ChallengeId,
) -> rusqlite::Result<Option<ChallengeRecord>> {
    conn.query_row(
        "SELECT * FROM challenges WHERE id = ?1",
        [id],
        challenge_from_row,
    )
    .optional()
}

pub fn progress_for(
    conn: &Connection,
    user_id: UserId,
    challenge_id: ChallengeId,
) -> rusqlite::Result<Option<ProgressRecord>> {
    conn.query_row(
        "SELECT * FROM user_progress WHERE user_id = ?1 AND challenge_id = ?2",
        [user_id, challenge_id],
        progress_from_row,
    )
    .optional()
}

pub fn active_challenges(conn: &Connection) -> rusqlite::Result<Vec<ChallengeRecord>> {
    let mut stmt =
        conn.prepare("SELECT * FROM challenges WHERE is_active = 1 ORDER BY created_at DESC, id")?;
    let rows = stmt.query_map([], challenge_from_row)?;
    rows.collect()
}

pub fn progress_for_user(
    conn: &Connection,
    user_id: UserId,
    status: Option<ProgressStatus>,
) -> rusqlite::Result<Vec<ProgressRecord>> {
    match status {
        Some(status) => {
            let mut stmt = conn.prepare(
                "SELECT * FROM user_progress WHERE user_id = ?1 AND status = ?2 ORDER BY last_updated DESC",
            )?;
            let rows = stmt.query_map(
                rusqlite::params![user_id, status.as_str()],
                progress_from_row,
            )?;
            rows.collect()
        }
        None => {
            let mut stmt = conn.prepare(
                "SELECT * FROM user_progress WHERE user_id = ?1 ORDER BY last_updated DESC",
            )?;
            let rows = stmt.query_map([user_id], progress_from_row)?;
            rows.collect()
        }
    }
}
