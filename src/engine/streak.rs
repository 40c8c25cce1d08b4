// src/engine/streak.rs

use crate::models::IncentiveConfig;
use chrono::{Duration, NaiveDate};
use rust_decimal::Decimal;
use std::collections::BTreeSet;

#[derive(Debug, Clone, PartialEq)]
pub struct StreakSummary {
    pub current_streak: u32,
    pub longest_streak: u32,
    /// 0, 7, 14 or 30 — the highest tier the current streak has reached.
    pub tier: u32,
    /// The single configured amount for `tier`, not a sum of passed tiers.
    pub bonus_amount: Decimal,
}

impl StreakSummary {
    fn none() -> Self {
        Self {
            current_streak: 0,
            longest_streak: 0,
            tier: 0,
            bonus_amount: Decimal::ZERO,
        }
    }
}

/// Walk the activity log day by day up to `as_of`. One missed day inside any
/// rolling 7-day window is tolerated; a second miss in the same window resets
/// the current streak to zero starting the day after. Active days increment
/// the streak, tolerated misses neither increment nor break it.
pub fn compute(
    active_days: &[NaiveDate],
    as_of: NaiveDate,
    config: &IncentiveConfig,
) -> StreakSummary {
    let days: BTreeSet<NaiveDate> = active_days.iter().copied().filter(|d| *d <= as_of).collect();
    let Some(&first) = days.iter().next() else {
        return StreakSummary::none();
    };

    let mut current: u32 = 0;
    let mut longest: u32 = 0;
    let mut misses: Vec<NaiveDate> = Vec::new();

    let mut day = first;
    while day <= as_of {
        if days.contains(&day) {
            current += 1;
            longest = longest.max(current);
        } else {
            // Keep only misses inside the 7-day window ending today.
            misses.retain(|m| day - *m < Duration::days(7));
            if misses.is_empty() {
                misses.push(day);
            } else {
                current = 0;
                misses.clear();
            }
        }
        match day.succ_opt() {
            Some(next) => day = next,
            None => break,
        }
    }

    let (tier, bonus_amount) = if current >= 30 {
        (30, config.streak_bonus_30)
    } else if current >= 14 {
        (14, config.streak_bonus_14)
    } else if current >= 7 {
        (7, config.streak_bonus_7)
    } else {
        (0, Decimal::ZERO)
    };

    StreakSummary {
        current_streak: current,
        longest_streak: longest,
        tier,
        bonus_amount,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::IncentiveConfig;
    use chrono::Utc;
    use rust_decimal_macros::dec;
    use uuid::Uuid;

    fn config() -> IncentiveConfig {
        IncentiveConfig {
            id: Uuid::new_v4(),
            organization_id: Uuid::new_v4(),
            review_bonus_per_review: dec!(100),
            streak_bonus_7: dec!(500),
            streak_bonus_14: dec!(1000),
            streak_bonus_30: dec!(2500),
            penalty_ceiling_percentage: dec!(50),
            late_arrival_percentage: dec!(5),
            missed_follow_up_percentage: dec!(10),
            unapproved_absence_percentage: dec!(15),
            compliance_shortfall_base_percentage: dec!(5),
            default_monthly_target: dec!(1000000),
            salary_cap_enabled: true,
            pool_top_share: dec!(20),
            pool_second_share: dec!(12),
            pool_third_share: dec!(8),
            pool_manager_share: dec!(20),
            pool_support_staff_share: dec!(20),
            pool_others_share: dec!(20),
            created_at: Utc::now(),
            updated_at: Utc::now(),
        }
    }

    fn d(day: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(2026, 1, day).unwrap()
    }

    fn run(days: &[u32], as_of: u32) -> StreakSummary {
        let dates: Vec<NaiveDate> = days.iter().map(|&x| d(x)).collect();
        compute(&dates, d(as_of), &config())
    }

    #[test]
    fn empty_log_has_no_streak() {
        assert_eq!(compute(&[], d(31), &config()), StreakSummary::none());
    }

    #[test]
    fn unbroken_week_reaches_tier_seven() {
        let s = run(&[1, 2, 3, 4, 5, 6, 7], 7);
        assert_eq!(s.current_streak, 7);
        assert_eq!(s.tier, 7);
        assert_eq!(s.bonus_amount, dec!(500));
    }

    #[test]
    fn one_miss_per_window_is_free() {
        // Day 4 missed, streak survives; 7 active days in total.
        let s = run(&[1, 2, 3, 5, 6, 7, 8], 8);
        assert_eq!(s.current_streak, 7);
        assert_eq!(s.tier, 7);
    }

    #[test]
    fn second_miss_in_same_window_resets() {
        // Misses on days 4 and 6 fall in one 7-day window.
        let s = run(&[1, 2, 3, 5, 7, 8, 9], 9);
        assert_eq!(s.current_streak, 3); // restarted on day 7
        assert_eq!(s.tier, 0);
        assert_eq!(s.bonus_amount, dec!(0));
    }

    #[test]
    fn misses_in_separate_windows_both_tolerated() {
        // Miss on day 4, then again on day 12 — more than 7 days apart.
        let active: Vec<u32> = (1..=15).filter(|x| *x != 4 && *x != 12).collect();
        let s = run(&active, 15);
        assert_eq!(s.current_streak, 13);
    }

    #[test]
    fn tier_is_monotonic_in_streak_length() {
        let fourteen: Vec<u32> = (1..=14).collect();
        let seven: Vec<u32> = (1..=7).collect();
        let at_14 = run(&fourteen, 14);
        let at_7 = run(&seven, 7);
        assert!(at_14.tier >= at_7.tier);
        assert_eq!(at_14.tier, 14);
        assert_eq!(at_14.bonus_amount, dec!(1000));
    }

    #[test]
    fn tier_thirty_bonus_replaces_lower_tiers() {
        let active: Vec<u32> = (1..=30).collect();
        let s = run(&active, 30);
        assert_eq!(s.tier, 30);
        assert_eq!(s.bonus_amount, dec!(2500));
    }

    #[test]
    fn longest_streak_survives_reset() {
        // 10 straight days, then two misses back to back, then 2 active days.
        let mut active: Vec<u32> = (1..=10).collect();
        active.extend([13, 14]);
        let s = run(&active, 14);
        assert_eq!(s.longest_streak, 10);
        assert_eq!(s.current_streak, 2);
    }

    #[test]
    fn trailing_misses_after_last_activity_can_reset() {
        let s = run(&[1, 2, 3], 10);
        assert_eq!(s.current_streak, 0);
        assert_eq!(s.longest_streak, 3);
    }
}
