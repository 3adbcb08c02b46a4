use chrono::NaiveDate;

// per-child earning ceiling for one calendar day, independent of spend activity
pub const TOKEN_DAILY_CAP: i64 = 100;

/// Whether `today` falls on a later calendar day than the account's last
/// reset. Day-boundary comparison, not a rolling 24h window.
pub fn is_new_day(last_reset: NaiveDate, today: NaiveDate) -> bool {
    today > last_reset
}

/// Tokens actually awardable from a base reward given what was already earned
/// today. Clamped to the remaining daily headroom, never negative.
pub fn compute_award(base_reward: i64, daily_earned: i64, daily_cap: i64) -> i64 {
    base_reward.max(0).min((daily_cap - daily_earned).max(0))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn full_award_when_under_cap() {
        assert_eq!(compute_award(10, 0, 100), 10);
        assert_eq!(compute_award(30, 70, 100), 30);
    }

    #[test]
    fn partial_award_when_crossing_cap() {
        assert_eq!(compute_award(30, 90, 100), 10);
        assert_eq!(compute_award(100, 1, 100), 99);
    }

    #[test]
    fn zero_award_at_or_over_cap() {
        assert_eq!(compute_award(10, 100, 100), 0);
        assert_eq!(compute_award(10, 150, 100), 0);
    }

    #[test]
    fn never_negative() {
        assert_eq!(compute_award(-5, 0, 100), 0);
        assert_eq!(compute_award(0, 0, 100), 0);
    }

    #[test]
    fn idempotent_over_same_inputs() {
        let first = compute_award(42, 80, 100);
        let second = compute_award(42, 80, 100);
        assert_eq!(first, second);
    }

    #[test]
    fn day_boundary_comparison() {
        let yesterday = NaiveDate::from_ymd_opt(2025, 6, 1).unwrap();
        let today = NaiveDate::from_ymd_opt(2025, 6, 2).unwrap();

        assert!(is_new_day(yesterday, today));
        assert!(!is_new_day(today, today));
        // a clock that went backwards must not reset the counter
        assert!(!is_new_day(today, yesterday));
    }
}
