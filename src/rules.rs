//! Activity validation rules
//!
//! Two static tables drive the validator: a per-category whitelist of
//! activity tokens, and per-activity ceilings capping how much a single
//! update may report. The ceiling is the anti-cheat line - a day of steps
//! can be posted in one go, but not a year of them. Activities with no
//! explicit ceiling fall back to `DEFAULT_CEILING`.
//!
//! Validation is a pure predicate over caller input and the challenge
//! template; it runs before any persistent mutation.

use std::collections::HashMap;

use once_cell::sync::Lazy;

use crate::domain::Category;
use crate::error::EngineError;

/// Ceiling for activity types without an explicit entry.
pub const DEFAULT_CEILING: f64 = 100.0;

/// Allowed activity tokens per category.
pub static CATEGORY_ACTIVITIES: &[(Category, &[&str])] = &[
    (
        Category::Health,
        &["steps", "workout", "water", "sleep", "meditation"],
    ),
    (Category::Wealth, &["savings", "investment", "budget_log"]),
    (
        Category::Financial,
        &["expense_log", "budget_review", "debt_payment"],
    ),
    (
        Category::Insurance,
        &["policy_review", "document_upload", "claim_filed"],
    ),
    (Category::Aktivo, &["health_score", "activity_completed"]),
    (
        Category::Social,
        &["share", "family_activity", "group_challenge"],
    ),
];

/// Maximum amount accepted in one update, per activity token.
pub static ACTIVITY_CEILINGS: &[(&str, f64)] = &[
    ("steps", 20000.0),
    ("workout", 3.0),
    ("water", 5.0),
    ("sleep", 12.0),
    ("meditation", 120.0),
    ("savings", 1000.0),
    ("investment", 5000.0),
    ("budget_log", 1.0),
    ("expense_log", 1.0),
    ("budget_review", 1.0),
    ("debt_payment", 1000.0),
    ("policy_review", 1.0),
    ("document_upload", 5.0),
    ("claim_filed", 1.0),
    ("health_score", 100.0),
    ("activity_completed", 10.0),
    ("share", 10.0),
    ("family_activity", 3.0),
    ("group_challenge", 1.0),
];

/// Activity tokens legal for a category.
pub fn allowed_activities(category: Category) -> &'static [&'static str] {
    CATEGORY_ACTIVITIES
        .iter()
        .find(|(c, _)| *c == category)
        .map(|(_, acts)| *acts)
        .unwrap_or(&[])
}

static CEILINGS: Lazy<HashMap<&'static str, f64>> =
    Lazy::new(|| ACTIVITY_CEILINGS.iter().copied().collect());

/// Per-update ceiling for an activity token.
pub fn ceiling_for(activity: &str) -> f64 {
    CEILINGS.get(activity).copied().unwrap_or(DEFAULT_CEILING)
}

/// Validate a reported activity against a challenge's category.
///
/// Checks, in order: the amount is a positive finite number, the activity
/// token is in the category's whitelist, and the amount is at or under the
/// token's ceiling. Rejections echo back the allowed set or the ceiling so
/// the caller can correct the request.
pub fn validate(category: Category, activity: &str, amount: f64) -> Result<(), EngineError> {
    if !amount.is_finite() || amount <= 0.0 {
        return Err(EngineError::InvalidAmount { amount });
    }

    let allowed = allowed_activities(category);
    if !allowed.contains(&activity) {
        return Err(EngineError::ActivityNotAllowed {
            activity: activity.to_string(),
            category,
            allowed: allowed.to_vec(),
        });
    }

    let ceiling = ceiling_for(activity);
    if amount > ceiling {
        return Err(EngineError::AmountOverCeiling {
            activity: activity.to_string(),
            amount,
            ceiling,
        });
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_tables_well_formed() {
        // One whitelist per category, and every category covered
        for cat in Category::all() {
            let entries = CATEGORY_ACTIVITIES.iter().filter(|(c, _)| c == cat).count();
            assert_eq!(entries, 1, "category {:?} must appear exactly once", cat);
            assert!(!allowed_activities(*cat).is_empty());
        }

        // Every ceiling token is reachable through some whitelist
        for (activity, ceiling) in ACTIVITY_CEILINGS {
            assert!(*ceiling > 0.0);
            let reachable = CATEGORY_ACTIVITIES
                .iter()
                .any(|(_, acts)| acts.contains(activity));
            assert!(reachable, "ceiling for unused activity '{}'", activity);
        }
    }

    #[test]
    fn test_ceiling_values() {
        assert_eq!(ceiling_for("steps"), 20000.0);
        assert_eq!(ceiling_for("water"), 5.0);
        assert_eq!(ceiling_for("meditation"), 120.0);
        assert_eq!(ceiling_for("debt_payment"), 1000.0);
        assert_eq!(ceiling_for("health_score"), 100.0);
        assert_eq!(ceiling_for("group_challenge"), 1.0);
        assert_eq!(ceiling_for("never_heard_of_it"), DEFAULT_CEILING);
    }

    #[test]
    fn test_accepts_within_ceiling() {
        assert!(validate(Category::Health, "steps", 20000.0).is_ok());
        assert!(validate(Category::Health, "steps", 1.0).is_ok());
        assert!(validate(Category::Wealth, "savings", 1000.0).is_ok());
        assert!(validate(Category::Insurance, "policy_review", 1.0).is_ok());
    }

    #[test]
    fn test_rejects_over_ceiling() {
        let err = validate(Category::Health, "steps", 25000.0).unwrap_err();
        match err {
            EngineError::AmountOverCeiling { ceiling, .. } => {
                assert_eq!(ceiling, 20000.0);
            }
            other => panic!("unexpected error: {other:?}"),
        }

        assert!(validate(Category::Health, "workout", 4.0).is_err());
        assert!(validate(Category::Financial, "expense_log", 2.0).is_err());
    }

    #[test]
    fn test_rejects_wrong_category() {
        let err = validate(Category::Wealth, "steps", 100.0).unwrap_err();
        match err {
            EngineError::ActivityNotAllowed { allowed, .. } => {
                assert!(allowed.contains(&"savings"));
                assert!(!allowed.contains(&"steps"));
            }
            other => panic!("unexpected error: {other:?}"),
        }
    }

    #[test]
    fn test_rejects_bad_amounts() {
        assert!(validate(Category::Health, "steps", 0.0).is_err());
        assert!(validate(Category::Health, "steps", -5.0).is_err());
        assert!(validate(Category::Health, "steps", f64::NAN).is_err());
        assert!(validate(Category::Health, "steps", f64::INFINITY).is_err());
    }
}
