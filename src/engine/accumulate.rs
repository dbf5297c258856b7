//! Progress accumulation
//!
//! Merges a validated amount into a progress record and maintains the
//! per-challenge day streak. Pure over the record; the engine persists the
//! result inside its transaction.

use chrono::{DateTime, Utc};

use crate::domain::{ProgressRecord, ProgressStatus, UpdateAction};
use crate::error::EngineError;

/// Apply a validated amount to an active progress record.
///
/// Progress is clamped to `[0, target]` in both modes - an overshooting
/// increment lands exactly on the target. The streak counts consecutive
/// update days: a gap resets it, repeated same-day updates don't inflate it.
/// `last_updated` moves to `now` unconditionally.
pub fn apply(
    record: &mut ProgressRecord,
    amount: f64,
    action: UpdateAction,
    now: DateTime<Utc>,
) -> Result<(), EngineError> {
    match record.status {
        ProgressStatus::Active => {}
        ProgressStatus::Completed => return Err(EngineError::AlreadyCompleted),
        status => return Err(EngineError::NotActive { status }),
    }

    let raw = match action {
        UpdateAction::Set => amount,
        UpdateAction::Increment => record.progress + amount,
    };
    record.progress = raw.clamp(0.0, record.target);

    record.streak = next_streak(record.streak, record.last_updated, now);
    record.last_updated = now.timestamp_millis();

    Ok(())
}

/// Streak transition based on whole calendar days between updates.
fn next_streak(streak: i64, last_updated_ms: i64, now: DateTime<Utc>) -> i64 {
    // A fresh record has never counted a day
    if streak == 0 {
        return 1;
    }

    let last = DateTime::<Utc>::from_timestamp_millis(last_updated_ms)
        .map(|t| t.date_naive())
        .unwrap_or_else(|| now.date_naive());
    let elapsed_days = (now.date_naive() - last).num_days();

    match elapsed_days {
        0 => streak,
        1 => streak + 1,
        _ => 1,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn record(progress: f64, target: f64) -> ProgressRecord {
        ProgressRecord {
            id: 1,
            user_id: 1,
            challenge_id: 1,
            progress,
            target,
            status: ProgressStatus::Active,
            streak: 0,
            started_at: 0,
            last_updated: 0,
            completed_at: None,
            version: 0,
        }
    }

    fn day(d: u32) -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2026, 3, d, 9, 0, 0).unwrap()
    }

    #[test]
    fn test_increment_clamps_at_target() {
        let mut rec = record(9000.0, 10000.0);
        apply(&mut rec, 1500.0, UpdateAction::Increment, day(1)).unwrap();
        assert_eq!(rec.progress, 10000.0);
    }

    #[test]
    fn test_set_clamps_at_target() {
        let mut rec = record(0.0, 100.0);
        apply(&mut rec, 250.0, UpdateAction::Set, day(1)).unwrap();
        assert_eq!(rec.progress, 100.0);
    }

    #[test]
    fn test_progress_never_decreases_under_increment() {
        let mut rec = record(50.0, 100.0);
        for _ in 0..10 {
            let before = rec.progress;
            apply(&mut rec, 7.0, UpdateAction::Increment, day(1)).unwrap();
            assert!(rec.progress >= before);
            assert!(rec.progress <= rec.target);
        }
    }

    #[test]
    fn test_rejects_completed_record() {
        let mut rec = record(100.0, 100.0);
        rec.status = ProgressStatus::Completed;
        let err = apply(&mut rec, 1.0, UpdateAction::Increment, day(1)).unwrap_err();
        assert!(matches!(err, EngineError::AlreadyCompleted));
    }

    #[test]
    fn test_rejects_abandoned_record() {
        let mut rec = record(10.0, 100.0);
        rec.status = ProgressStatus::Abandoned;
        let err = apply(&mut rec, 1.0, UpdateAction::Increment, day(1)).unwrap_err();
        assert!(matches!(err, EngineError::NotActive { .. }));
    }

    #[test]
    fn test_streak_increments_on_consecutive_days() {
        let mut rec = record(0.0, 100.0);
        apply(&mut rec, 1.0, UpdateAction::Increment, day(1)).unwrap();
        assert_eq!(rec.streak, 1);
        apply(&mut rec, 1.0, UpdateAction::Increment, day(2)).unwrap();
        assert_eq!(rec.streak, 2);
        apply(&mut rec, 1.0, UpdateAction::Increment, day(3)).unwrap();
        assert_eq!(rec.streak, 3);
    }

    #[test]
    fn test_streak_unchanged_same_day() {
        let mut rec = record(0.0, 100.0);
        apply(&mut rec, 1.0, UpdateAction::Increment, day(1)).unwrap();
        apply(&mut rec, 1.0, UpdateAction::Increment, day(1)).unwrap();
        apply(&mut rec, 1.0, UpdateAction::Increment, day(1)).unwrap();
        assert_eq!(rec.streak, 1);
    }

    #[test]
    fn test_streak_resets_after_gap() {
        let mut rec = record(0.0, 100.0);
        apply(&mut rec, 1.0, UpdateAction::Increment, day(1)).unwrap();
        apply(&mut rec, 1.0, UpdateAction::Increment, day(2)).unwrap();
        assert_eq!(rec.streak, 2);
        apply(&mut rec, 1.0, UpdateAction::Increment, day(5)).unwrap();
        assert_eq!(rec.streak, 1);
    }

    #[test]
    fn test_last_updated_always_moves() {
        let mut rec = record(0.0, 100.0);
        apply(&mut rec, 1.0, UpdateAction::Increment, day(1)).unwrap();
        let first = rec.last_updated;
        apply(&mut rec, 1.0, UpdateAction::Increment, day(1)).unwrap();
        assert_eq!(rec.last_updated, first);
        apply(&mut rec, 1.0, UpdateAction::Increment, day(2)).unwrap();
        assert!(rec.last_updated > first);
    }
}
