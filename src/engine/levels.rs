//! XP and level math
//!
//! Levels are a pure function of XP: every 1000 XP is one level, starting at
//! level 1. Crossing a boundary grants a one-time bonus of 50 points per new
//! level.

pub const XP_PER_LEVEL: i64 = 1000;
pub const BONUS_PER_LEVEL: i64 = 50;

/// Level for a given XP total.
pub fn level_for_xp(xp: i64) -> i64 {
    xp / XP_PER_LEVEL + 1
}

/// Points credited when a user first reaches `new_level`.
pub fn level_up_bonus(new_level: i64) -> i64 {
    new_level * BONUS_PER_LEVEL
}

/// XP still needed to reach the next level.
pub fn xp_to_next_level(xp: i64) -> i64 {
    let current = level_for_xp(xp);
    current * XP_PER_LEVEL - xp
}

/// A level boundary crossing.
#[derive(Debug, Clone, PartialEq, Eq, serde::Serialize)]
pub struct LevelUp {
    pub old_level: i64,
    pub new_level: i64,
    pub bonus: i64,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_level_for_xp() {
        assert_eq!(level_for_xp(0), 1);
        assert_eq!(level_for_xp(999), 1);
        assert_eq!(level_for_xp(1000), 2);
        assert_eq!(level_for_xp(1050), 2);
        assert_eq!(level_for_xp(9999), 10);
    }

    #[test]
    fn test_level_up_bonus() {
        assert_eq!(level_up_bonus(2), 100);
        assert_eq!(level_up_bonus(10), 500);
    }

    #[test]
    fn test_xp_to_next_level() {
        assert_eq!(xp_to_next_level(0), 1000);
        assert_eq!(xp_to_next_level(950), 50);
        assert_eq!(xp_to_next_level(1000), 1000);
    }
}
