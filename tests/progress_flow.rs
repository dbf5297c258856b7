//! End-to-end tests for the seeded catalog and the progress pipeline

use std::sync::{Arc, Barrier};
use std::thread;

use chrono::{DateTime, TimeZone, Utc};
use tempfile::TempDir;

use vitaquest::db::{self, GameDb};
use vitaquest::domain::{ProgressStatus, ProgressUpdate, UpdateAction};
use vitaquest::engine::ProgressEngine;
use vitaquest::error::EngineError;
use vitaquest::seed;

/// Fresh on-disk database with the full seed catalog and one user.
fn setup() -> (TempDir, GameDb, ProgressEngine, i64) {
    let temp_dir = TempDir::new().expect("Failed to create temp dir");
    let db = GameDb::open(&temp_dir.path().join("game.db")).expect("Failed to open db");
    seed::seed_catalog(&db).expect("Failed to seed catalog");
    let token = seed::ensure_user(&db, "walker").expect("Failed to create user");

    let user = db::user_by_token(&db.conn(), &token)
        .expect("token lookup")
        .expect("user exists");
    let engine = ProgressEngine::new(db.clone(), 3);
    (temp_dir, db, engine, user.id)
}

fn challenge_id(db: &GameDb, title: &str) -> i64 {
    db.conn()
        .query_row("SELECT id FROM challenges WHERE title = ?1", [title], |r| {
            r.get(0)
        })
        .expect("seeded challenge present")
}

fn report(amount: f64, activity: &str) -> ProgressUpdate {
    ProgressUpdate {
        amount,
        action: UpdateAction::Increment,
        activity_type: activity.to_string(),
        metadata: None,
    }
}

fn at(day: u32) -> DateTime<Utc> {
    Utc.with_ymd_and_hms(2026, 5, day, 9, 0, 0).unwrap()
}

#[test]
fn test_walk_to_completion_and_first_steps_unlock() {
    let (_tmp, db, engine, user_id) = setup();
    let walk = challenge_id(&db, "Morning Walk");

    engine.join_challenge(user_id, walk).expect("join");
    let partial = engine
        .update_progress_at(user_id, walk, &report(9000.0, "steps"), at(1))
        .expect("partial update");
    assert!(!partial.completed);
    assert_eq!(partial.points_earned, 0);

    let done = engine
        .update_progress_at(user_id, walk, &report(1500.0, "steps"), at(1))
        .expect("completing update");
    assert!(done.completed);
    assert_eq!(done.progress.progress, 10000.0);
    assert_eq!(done.points_earned, 50);
    assert_eq!(done.xp_earned, 100);

    // First completion unlocks the seeded first_steps achievement
    let codes: Vec<_> = done.unlocked.iter().map(|a| a.code.as_str()).collect();
    assert!(codes.contains(&"first_steps"));

    let user = db::user_by_id(&db.conn(), user_id).unwrap().unwrap();
    assert_eq!(user.stats.challenges_completed, 1);
    assert_eq!(user.points, 50 + 100); // challenge + achievement
    assert_eq!(user.streak_current, 1);
}

#[test]
fn test_activity_must_match_challenge_category() {
    let (_tmp, db, engine, user_id) = setup();
    let walk = challenge_id(&db, "Morning Walk");

    engine.join_challenge(user_id, walk).expect("join");
    let err = engine
        .update_progress_at(user_id, walk, &report(100.0, "savings"), at(1))
        .unwrap_err();
    assert!(matches!(err, EngineError::ActivityNotAllowed { .. }));

    // Rejected report leaves the row untouched
    let rec = db::progress_for(&db.conn(), user_id, walk).unwrap().unwrap();
    assert_eq!(rec.progress, 0.0);
}

#[test]
fn test_completed_challenge_rejects_further_reports() {
    let (_tmp, db, engine, user_id) = setup();
    let water = challenge_id(&db, "Water Intake");

    engine.join_challenge(user_id, water).expect("join");
    engine
        .update_progress_at(user_id, water, &report(5.0, "water"), at(1))
        .expect("first glasses");
    engine
        .update_progress_at(user_id, water, &report(3.0, "water"), at(1))
        .expect("complete");

    let err = engine
        .update_progress_at(user_id, water, &report(1.0, "water"), at(1))
        .unwrap_err();
    assert!(matches!(err, EngineError::AlreadyCompleted));

    let user = db::user_by_id(&db.conn(), user_id).unwrap().unwrap();
    assert_eq!(user.stats.challenges_completed, 1);
}

#[test]
fn test_daily_reports_build_a_challenge_streak() {
    let (_tmp, db, engine, user_id) = setup();
    let workout = challenge_id(&db, "Workout Warrior"); // target 5 sessions

    engine.join_challenge(user_id, workout).expect("join");
    engine
        .update_progress_at(user_id, workout, &report(1.0, "workout"), at(1))
        .unwrap();
    engine
        .update_progress_at(user_id, workout, &report(1.0, "workout"), at(2))
        .unwrap();
    let third = engine
        .update_progress_at(user_id, workout, &report(1.0, "workout"), at(3))
        .unwrap();

    assert_eq!(third.progress.streak, 3);
    assert_eq!(third.progress.progress, 3.0);
    assert_eq!(third.progress.status, ProgressStatus::Active);

    // A gap resets the per-challenge streak
    let after_gap = engine
        .update_progress_at(user_id, workout, &report(1.0, "workout"), at(7))
        .unwrap();
    assert_eq!(after_gap.progress.streak, 1);
}

#[test]
fn test_completions_on_consecutive_days_extend_global_streak() {
    let (_tmp, db, engine, user_id) = setup();
    let walk = challenge_id(&db, "Morning Walk");
    let water = challenge_id(&db, "Water Intake");

    engine.join_challenge(user_id, walk).expect("join walk");
    engine.join_challenge(user_id, water).expect("join water");

    engine
        .update_progress_at(user_id, walk, &report(10000.0, "steps"), at(1))
        .expect("complete walk");
    engine
        .update_progress_at(user_id, water, &report(5.0, "water"), at(2))
        .expect("water partial");
    engine
        .update_progress_at(user_id, water, &report(3.0, "water"), at(2))
        .expect("complete water");

    let user = db::user_by_id(&db.conn(), user_id).unwrap().unwrap();
    assert_eq!(user.streak_current, 2);
    assert_eq!(user.streak_longest, 2);
    assert_eq!(user.last_activity_day.as_deref(), Some("2026-05-02"));
}

#[test]
fn test_racing_completing_updates_credit_exactly_once() {
    let (_tmp, db, engine, user_id) = setup();
    let walk = challenge_id(&db, "Morning Walk");
    engine.join_challenge(user_id, walk).expect("join");

    // Two threads submit the same completing update at once; only one may
    // observe progress < target and credit the reward.
    let engine = Arc::new(engine);
    let barrier = Arc::new(Barrier::new(2));
    let mut handles = Vec::new();
    for _ in 0..2 {
        let engine = Arc::clone(&engine);
        let barrier = Arc::clone(&barrier);
        handles.push(thread::spawn(move || {
            barrier.wait();
            engine.update_progress_at(user_id, walk, &report(10000.0, "steps"), at(1))
        }));
    }
    let results: Vec<_> = handles
        .into_iter()
        .map(|h| h.join().expect("worker thread"))
        .collect();

    let completions = results
        .iter()
        .filter(|r| matches!(r, Ok(outcome) if outcome.completed))
        .count();
    assert_eq!(completions, 1);
    for result in &results {
        if let Err(err) = result {
            assert!(matches!(
                err,
                EngineError::AlreadyCompleted | EngineError::Conflict
            ));
        }
    }

    let user = db::user_by_id(&db.conn(), user_id).unwrap().unwrap();
    assert_eq!(user.stats.challenges_completed, 1);
    assert_eq!(user.xp, 100);
    assert_eq!(user.points, 50 + 100); // one reward, one first_steps unlock
}

#[test]
fn test_set_action_is_absolute_and_clamped() {
    let (_tmp, db, engine, user_id) = setup();
    let walk = challenge_id(&db, "Morning Walk");

    engine.join_challenge(user_id, walk).expect("join");
    let set = |amount: f64| ProgressUpdate {
        amount,
        action: UpdateAction::Set,
        activity_type: "steps".to_string(),
        metadata: None,
    };

    engine.update_progress_at(user_id, walk, &set(6000.0), at(1)).unwrap();
    // Absolute mode replaces the stored value outright
    let lowered = engine
        .update_progress_at(user_id, walk, &set(2000.0), at(1))
        .unwrap();
    assert_eq!(lowered.progress.progress, 2000.0);

    // An overshooting set completes at exactly the target
    let done = engine
        .update_progress_at(user_id, walk, &set(12000.0), at(1))
        .unwrap();
    assert!(done.completed);
    assert_eq!(done.progress.progress, 10000.0);
}
