//! Progress engine - validate, accumulate, complete
//!
//! Orchestrates the whole progress-update pipeline for one (user, challenge)
//! pair. Every stage runs inside a single IMMEDIATE transaction; the update
//! of the progress row is a compare-and-swap on its version column, and a
//! lost race retries the whole sequence from the top. Either the full
//! sequence commits (progress, status flip, credits, feed events, unlocks)
//! or none of it does.
//!
//! This module is the only writer of user counters (points, xp, level,
//! streak, stats). Nothing else in the crate updates the users table.

pub mod accumulate;
pub mod achievements;
pub mod levels;

use chrono::{DateTime, NaiveDate, Utc};
use rusqlite::{Connection, TransactionBehavior};
use tracing::{debug, warn};

use crate::db::{self, GameDb};
use crate::domain::{
    AchievementRecord, ChallengeId, ProgressRecord, ProgressStatus, ProgressUpdate, UserId,
    UserRecord,
};
use crate::error::EngineError;
use crate::{feed, rules};
use levels::LevelUp;

/// Result of one progress update.
#[derive(Debug, Clone)]
pub struct ProgressOutcome {
    pub progress: ProgressRecord,
    pub completed: bool,
    /// Base challenge reward credited by this call. Zero unless the call
    /// triggered completion. A level-up bonus is reported in `level_up`,
    /// not folded in here.
    pub points_earned: i64,
    pub xp_earned: i64,
    pub level_up: Option<LevelUp>,
    pub unlocked: Vec<AchievementRecord>,
    pub message: String,
}

pub struct ProgressEngine {
    db: GameDb,
    max_retries: u32,
}

impl ProgressEngine {
    pub fn new(db: GameDb, max_retries: u32) -> Self {
        Self { db, max_retries }
    }

    /// Create the progress row for a (user, challenge) pair. The target is
    /// copied from the challenge here and never changes afterwards.
    pub fn join_challenge(
        &self,
        user_id: UserId,
        challenge_id: ChallengeId,
    ) -> Result<ProgressRecord, EngineError> {
        let now_ms = Utc::now().timestamp_millis();
        let mut conn = self.db.conn();
        let tx = conn.transaction_with_behavior(TransactionBehavior::Immediate)?;

        let challenge =
            db::challenge_by_id(&tx, challenge_id)?.ok_or(EngineError::ChallengeNotFound)?;
        if db::progress_for(&tx, user_id, challenge_id)?.is_some() {
            return Err(EngineError::AlreadyJoined);
        }

        tx.execute(
            "INSERT INTO user_progress (user_id, challenge_id, target, status, started_at, last_updated)
             VALUES (?1, ?2, ?3, 'active', ?4, ?4)",
            rusqlite::params![user_id, challenge_id, challenge.target, now_ms],
        )?;
        let record = db::progress_for(&tx, user_id, challenge_id)?.ok_or(EngineError::NotJoined)?;
        tx.commit()?;
        Ok(record)
    }

    /// Run a progress update at the current time.
    pub fn update_progress(
        &self,
        user_id: UserId,
        challenge_id: ChallengeId,
        update: &ProgressUpdate,
    ) -> Result<ProgressOutcome, EngineError> {
        self.update_progress_at(user_id, challenge_id, update, Utc::now())
    }

    /// Run a progress update at an explicit time (tests drive the clock).
    ///
    /// A version conflict retries the whole sequence up to the configured
    /// budget; once spent it surfaces as `Conflict` and the caller may retry.
    pub fn update_progress_at(
        &self,
        user_id: UserId,
        challenge_id: ChallengeId,
        update: &ProgressUpdate,
        now: DateTime<Utc>,
    ) -> Result<ProgressOutcome, EngineError> {
        let mut attempt = 0u32;
        loop {
            match self.try_update(user_id, challenge_id, update, now) {
                Err(EngineError::Conflict) if attempt < self.max_retries => {
                    attempt += 1;
                    warn!(
                        "[vitaquest:engine] version conflict on user={} challenge={}, retry {}/{}",
                        user_id, challenge_id, attempt, self.max_retries
                    );
                }
                other => return other,
            }
        }
    }

    fn try_update(
        &self,
        user_id: UserId,
        challenge_id: ChallengeId,
        update: &ProgressUpdate,
        now: DateTime<Utc>,
    ) -> Result<ProgressOutcome, EngineError> {
        let mut conn = self.db.conn();
        let tx = conn.transaction_with_behavior(TransactionBehavior::Immediate)?;
        let outcome = run_update(&tx, user_id, challenge_id, update, now)?;
        tx.commit()?;
        Ok(outcome)
    }
}

/// The update sequence proper. Runs with a transaction already open.
fn run_update(
    tx: &Connection,
    user_id: UserId,
    challenge_id: ChallengeId,
    update: &ProgressUpdate,
    now: DateTime<Utc>,
) -> Result<ProgressOutcome, EngineError> {
    // Stage 1: validate before touching anything
    let challenge = db::challenge_by_id(tx, challenge_id)?.ok_or(EngineError::ChallengeNotFound)?;
    rules::validate(challenge.category, &update.activity_type, update.amount)?;

    // Stage 2: accumulate
    let mut progress = db::progress_for(tx, user_id, challenge_id)?.ok_or(EngineError::NotJoined)?;
    let expected_version = progress.version;
    accumulate::apply(&mut progress, update.amount, update.action, now)?;

    let completed = progress.progress >= progress.target;
    if completed {
        progress.status = ProgressStatus::Completed;
        progress.completed_at = Some(now.timestamp_millis());
    }

    // Compare-and-swap on the row version; a concurrent writer means the
    // whole sequence must be re-run against fresh state.
    let affected = tx.execute(
        "UPDATE user_progress
         SET progress = ?1, status = ?2, streak = ?3, last_updated = ?4,
             completed_at = ?5, version = version + 1
         WHERE id = ?6 AND version = ?7",
        rusqlite::params![
            progress.progress,
            progress.status.as_str(),
            progress.streak,
            progress.last_updated,
            progress.completed_at,
            progress.id,
            expected_version,
        ],
    )?;
    if affected == 0 {
        return Err(EngineError::Conflict);
    }
    progress.version = expected_version + 1;

    if !completed {
        debug!(
            "[vitaquest:engine] progress user={} challenge={} {}/{}",
            user_id, challenge_id, progress.progress, progress.target
        );
        return Ok(ProgressOutcome {
            progress,
            completed: false,
            points_earned: 0,
            xp_earned: 0,
            level_up: None,
            unlocked: Vec::new(),
            message: "Progress updated".to_string(),
        });
    }

    // Stage 3: completion and reward
    let mut user = db::user_by_id(tx, user_id)?
        .ok_or(EngineError::Persistence(rusqlite::Error::QueryReturnedNoRows))?;

    user.points += challenge.points;
    user.xp += challenge.xp_reward;
    user.stats.challenges_completed += 1;
    user.stats.total_points += challenge.points;

    apply_global_streak(&mut user, now.date_naive());

    let new_level = levels::level_for_xp(user.xp);
    let mut leveled = None;
    if new_level > user.level {
        let up = LevelUp {
            old_level: user.level,
            new_level,
            bonus: levels::level_up_bonus(new_level),
        };
        user.level = new_level;
        user.points += up.bonus;
        user.stats.total_points += up.bonus;
        feed::record(tx, &feed::level_up(user_id, &up, now))?;
        leveled = Some(up);
    }

    feed::record(
        tx,
        &feed::challenge_completed(
            user_id,
            &challenge,
            progress.streak,
            &update.activity_type,
            update.amount,
            now,
        ),
    )?;

    // Stage 4: achievement cascade
    let unlocks = achievements::evaluate(tx, &user, now.timestamp_millis())?;
    for unlock in &unlocks {
        user.points += unlock.achievement.points;
        user.stats.total_points += unlock.achievement.points;
        user.stats.achievements_unlocked += 1;
        feed::record(tx, &feed::achievement_unlocked(user_id, &unlock.achievement, now))?;
    }

    write_user(tx, &user)?;

    debug!(
        "[vitaquest:engine] completed user={} challenge={} points=+{} xp=+{} unlocks={}",
        user_id,
        challenge_id,
        challenge.points,
        challenge.xp_reward,
        unlocks.len()
    );

    Ok(ProgressOutcome {
        progress,
        completed: true,
        points_earned: challenge.points,
        xp_earned: challenge.xp_reward,
        level_up: leveled,
        unlocked: unlocks.into_iter().map(|u| u.achievement).collect(),
        message: format!(
            "Challenge completed! You earned {} points.",
            challenge.points
        ),
    })
}

/// Global (cross-challenge) streak: one count per calendar day with at least
/// one completion. Yesterday extends, today is already counted, anything
/// older restarts at 1. Tracks the longest-streak high-water mark.
fn apply_global_streak(user: &mut UserRecord, today: NaiveDate) {
    let today_str = today.format("%Y-%m-%d").to_string();

    let counted_today = user.last_activity_day.as_deref() == Some(today_str.as_str());
    if !counted_today {
        let continues = user
            .last_activity_day
            .as_deref()
            .and_then(|d| NaiveDate::parse_from_str(d, "%Y-%m-%d").ok())
            .map(|d| (today - d).num_days() == 1)
            .unwrap_or(false);

        user.streak_current = if continues { user.streak_current + 1 } else { 1 };
        user.last_activity_day = Some(today_str);
    }

    user.streak_longest = user.streak_longest.max(user.streak_current);
}

/// Persist the user's counters. Deliberately private to this module - the
/// completion path is the single writer.
fn write_user(tx: &Connection, user: &UserRecord) -> rusqlite::Result<()> {
    tx.execute(
        "UPDATE users
         SET points = ?1, xp = ?2, level = ?3,
             streak_current = ?4, streak_longest = ?5, last_activity_day = ?6,
             challenges_completed = ?7, total_points = ?8, achievements_unlocked = ?9
         WHERE id = ?10",
        rusqlite::params![
            user.points,
            user.xp,
            user.level,
            user.streak_current,
            user.streak_longest,
            user.last_activity_day,
            user.stats.challenges_completed,
            user.stats.total_points,
            user.stats.achievements_unlocked,
            user.id,
        ],
    )?;
    Ok(())
}
