//! Core domain records and enums
//!
//! These structures mirror the rows stored in the game database. String
//! enums carry `as_str`/`parse` pairs for storage round-trips.

use serde::{Deserialize, Serialize};

pub type UserId = i64;
pub type ChallengeId = i64;
pub type AchievementId = i64;

/// Challenge category. Each category has its own set of legal activity
/// types (see `rules`).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Category {
    Health,
    Wealth,
    Financial,
    Insurance,
    Aktivo,
    Social,
}

impl Category {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Health => "health",
            Self::Wealth => "wealth",
            Self::Financial => "financial",
            Self::Insurance => "insurance",
            Self::Aktivo => "aktivo",
            Self::Social => "social",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "health" => Some(Self::Health),
            "wealth" => Some(Self::Wealth),
            "financial" => Some(Self::Financial),
            "insurance" => Some(Self::Insurance),
            "aktivo" => Some(Self::Aktivo),
            "social" => Some(Self::Social),
            _ => None,
        }
    }

    pub fn all() -> &'static [Category] {
        &[
            Self::Health,
            Self::Wealth,
            Self::Financial,
            Self::Insurance,
            Self::Aktivo,
            Self::Social,
        ]
    }
}

/// Challenge cadence.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ChallengeKind {
    Daily,
    Weekly,
    Monthly,
    Milestone,
    Community,
}

impl ChallengeKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Daily => "daily",
            Self::Weekly => "weekly",
            Self::Monthly => "monthly",
            Self::Milestone => "milestone",
            Self::Community => "community",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "daily" => Some(Self::Daily),
            "weekly" => Some(Self::Weekly),
            "monthly" => Some(Self::Monthly),
            "milestone" => Some(Self::Milestone),
            "community" => Some(Self::Community),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Difficulty {
    Easy,
    Medium,
    Hard,
    Expert,
}

impl Difficulty {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Easy => "easy",
            Self::Medium => "medium",
            Self::Hard => "hard",
            Self::Expert => "expert",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "easy" => Some(Self::Easy),
            "medium" => Some(Self::Medium),
            "hard" => Some(Self::Hard),
            "expert" => Some(Self::Expert),
            _ => None,
        }
    }
}

/// Lifecycle of a user's challenge instance. `Completed` and `Abandoned`
/// are terminal.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ProgressStatus {
    Active,
    Completed,
    Failed,
    Abandoned,
}

impl ProgressStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Active => "active",
            Self::Completed => "completed",
            Self::Failed => "failed",
            Self::Abandoned => "abandoned",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "active" => Some(Self::Active),
            "completed" => Some(Self::Completed),
            "failed" => Some(Self::Failed),
            "abandoned" => Some(Self::Abandoned),
            _ => None,
        }
    }
}

/// How a reported amount is merged into stored progress.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum UpdateAction {
    /// Replace the stored progress with the amount.
    Set,
    /// Add the amount to the stored progress.
    Increment,
}

/// Mutable per-user counters. Only the completion engine writes these.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct UserStats {
    pub challenges_completed: i64,
    pub total_points: i64,
    pub achievements_unlocked: i64,
    pub rewards_redeemed: i64,
}

/// A user row. Points are the redeemable currency; XP only ever grows and
/// the level is derived from it.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct UserRecord {
    pub id: UserId,
    pub username: String,
    pub points: i64,
    pub xp: i64,
    pub level: i64,
    pub streak_current: i64,
    pub streak_longest: i64,
    /// Last day (YYYY-MM-DD) that counted towards the global streak.
    pub last_activity_day: Option<String>,
    pub stats: UserStats,
}

/// A challenge template. Read-only input to the progress pipeline.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ChallengeRecord {
    pub id: ChallengeId,
    pub title: String,
    pub description: String,
    pub category: Category,
    pub kind: ChallengeKind,
    pub difficulty: Difficulty,
    pub points: i64,
    pub xp_reward: i64,
    pub target: f64,
    pub unit: String,
    pub icon: String,
    pub is_active: bool,
}

/// One user's instance of a challenge. Unique per (user, challenge).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ProgressRecord {
    pub id: i64,
    pub user_id: UserId,
    pub challenge_id: ChallengeId,
    pub progress: f64,
    /// Copied from the challenge at join time; never changes afterwards.
    pub target: f64,
    pub status: ProgressStatus,
    /// Consecutive-day update counter for this challenge alone.
    pub streak: i64,
    pub started_at: i64,
    pub last_updated: i64,
    pub completed_at: Option<i64>,
    /// Optimistic concurrency tag, bumped on every write.
    #[serde(skip_serializing)]
    pub version: i64,
}

/// A catalog achievement. `requirement` is parsed into a typed
/// `engine::achievements::Requirement` when evaluated.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AchievementRecord {
    pub id: AchievementId,
    pub code: String,
    pub title: String,
    pub description: String,
    pub icon: String,
    pub category: String,
    pub rarity: String,
    pub requirement: String,
    pub threshold: i64,
    pub points: i64,
}

/// Kind of audit-feed entry.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ActivityKind {
    ChallengeCompleted,
    LevelUp,
    AchievementUnlocked,
}

impl ActivityKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::ChallengeCompleted => "challenge_completed",
            Self::LevelUp => "level_up",
            Self::AchievementUnlocked => "achievement_unlocked",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "challenge_completed" => Some(Self::ChallengeCompleted),
            "level_up" => Some(Self::LevelUp),
            "achievement_unlocked" => Some(Self::AchievementUnlocked),
            _ => None,
        }
    }
}

/// An append-only audit/feed event. Immutable once written; never a source
/// of truth for points.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ActivityRecord {
    pub id: String,
    pub user_id: UserId,
    pub kind: ActivityKind,
    pub title: String,
    pub description: String,
    pub icon: String,
    pub points: i64,
    pub metadata: Option<serde_json::Value>,
    pub created_at: i64,
}

/// Body of a progress-update request.
#[derive(Debug, Clone, Deserialize)]
pub struct ProgressUpdate {
    pub amount: f64,
    pub action: UpdateAction,
    #[serde(alias = "activityType")]
    pub activity_type: String,
    #[serde(default)]
    pub metadata: Option<serde_json::Value>,
}
