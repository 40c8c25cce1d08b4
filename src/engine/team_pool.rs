// src/engine/team_pool.rs

use crate::models::{IncentiveConfig, PoolAllocation};
use chrono::{DateTime, Utc};
use rust_decimal::{Decimal, RoundingStrategy};
use rust_decimal_macros::dec;
use uuid::Uuid;

/// A sales rep's month of revenue, before ranking.
#[derive(Debug, Clone, PartialEq)]
pub struct PoolCandidate {
    pub user_id: Uuid,
    pub revenue: Decimal,
    /// Timestamp of the rep's first win-sale in the month; the deterministic
    /// tie-break for equal revenue.
    pub first_sale_at: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct PoolBreakdown {
    pub performer_allocations: Vec<PoolAllocation>,
    pub manager_amount: Decimal,
    pub manager_count: usize,
    pub support_staff_amount: Decimal,
    pub support_staff_count: usize,
    pub others_amount: Decimal,
    pub others_count: usize,
}

impl PoolBreakdown {
    pub fn total_paid(&self) -> Decimal {
        self.performer_allocations
            .iter()
            .map(|a| a.amount)
            .sum::<Decimal>()
            + self.manager_amount
            + self.support_staff_amount
            + self.others_amount
    }
}

/// Rank candidates by revenue descending; ties break on earliest first
/// win-sale, then user id.
pub fn rank(mut candidates: Vec<PoolCandidate>) -> Vec<PoolCandidate> {
    candidates.sort_by(|a, b| {
        b.revenue
            .cmp(&a.revenue)
            .then(a.first_sale_at.cmp(&b.first_sale_at))
            .then(a.user_id.cmp(&b.user_id))
    });
    candidates
}

/// Allocate the pool across ranked performers and role buckets. Share
/// percentages were validated to sum to 100 when the config was written and
/// are trusted here. Every amount is floored to whole units, so the paid
/// total can never exceed the pool; shares of empty buckets stay
/// undistributed.
pub fn distribute(
    total_pool: Decimal,
    ranked_reps: &[PoolCandidate],
    manager_count: usize,
    support_staff_count: usize,
    config: &IncentiveConfig,
) -> PoolBreakdown {
    let hundred = dec!(100);
    let floor = |d: Decimal| d.round_dp_with_strategy(0, RoundingStrategy::ToZero);

    let rank_shares = [
        config.pool_top_share,
        config.pool_second_share,
        config.pool_third_share,
    ];

    let performer_allocations: Vec<PoolAllocation> = ranked_reps
        .iter()
        .take(3)
        .enumerate()
        .map(|(i, candidate)| PoolAllocation {
            user_id: candidate.user_id,
            rank: (i + 1) as u32,
            revenue: candidate.revenue,
            share_percentage: rank_shares[i],
            amount: floor(total_pool * rank_shares[i] / hundred),
        })
        .collect();

    let split_equally = |share: Decimal, count: usize| -> Decimal {
        if count == 0 {
            return Decimal::ZERO;
        }
        let per_head = floor(total_pool * share / hundred / Decimal::from(count as u64));
        per_head * Decimal::from(count as u64)
    };

    let manager_amount = split_equally(config.pool_manager_share, manager_count);
    let support_staff_amount =
        split_equally(config.pool_support_staff_share, support_staff_count);
    let others_count = ranked_reps.len().saturating_sub(3);
    let others_amount = split_equally(config.pool_others_share, others_count);

    PoolBreakdown {
        performer_allocations,
        manager_amount,
        manager_count,
        support_staff_amount,
        support_staff_count,
        others_amount,
        others_count,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

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

    fn candidate(revenue: Decimal, day: u32) -> PoolCandidate {
        PoolCandidate {
            user_id: Uuid::new_v4(),
            revenue,
            first_sale_at: Utc.with_ymd_and_hms(2026, 1, day, 10, 0, 0).unwrap(),
        }
    }

    #[test]
    fn worked_example_top_performer_gets_twenty_thousand() {
        let ranked = rank(vec![
            candidate(dec!(900000), 3),
            candidate(dec!(700000), 5),
            candidate(dec!(500000), 2),
            candidate(dec!(300000), 8),
            candidate(dec!(100000), 9),
        ]);
        let breakdown = distribute(dec!(100000), &ranked, 1, 2, &config());

        assert_eq!(breakdown.performer_allocations[0].amount, dec!(20000));
        assert_eq!(breakdown.performer_allocations[1].amount, dec!(12000));
        assert_eq!(breakdown.performer_allocations[2].amount, dec!(8000));
        assert_eq!(breakdown.manager_amount, dec!(20000));
        assert_eq!(breakdown.support_staff_amount, dec!(20000));
        assert_eq!(breakdown.others_amount, dec!(20000));
        assert_eq!(breakdown.others_count, 2);
        assert_eq!(breakdown.total_paid(), dec!(100000));
    }

    #[test]
    fn total_paid_never_exceeds_pool_under_uneven_splits() {
        // 3 support staff splitting 20% of 100,001 forces flooring.
        let ranked = rank(vec![
            candidate(dec!(900000), 1),
            candidate(dec!(800000), 2),
            candidate(dec!(700000), 3),
            candidate(dec!(600000), 4),
        ]);
        let breakdown = distribute(dec!(100001), &ranked, 2, 3, &config());
        assert!(breakdown.total_paid() <= dec!(100001));
    }

    #[test]
    fn equal_revenue_ties_break_on_earliest_sale() {
        let early = candidate(dec!(500000), 2);
        let late = candidate(dec!(500000), 20);
        let ranked = rank(vec![late.clone(), early.clone()]);
        assert_eq!(ranked[0].user_id, early.user_id);
        assert_eq!(ranked[1].user_id, late.user_id);
    }

    #[test]
    fn empty_buckets_leave_their_share_undistributed() {
        let ranked = rank(vec![candidate(dec!(500000), 1)]);
        let breakdown = distribute(dec!(100000), &ranked, 0, 0, &config());

        assert_eq!(breakdown.performer_allocations.len(), 1);
        assert_eq!(breakdown.manager_amount, dec!(0));
        assert_eq!(breakdown.support_staff_amount, dec!(0));
        assert_eq!(breakdown.others_amount, dec!(0));
        assert_eq!(breakdown.total_paid(), dec!(20000));
    }

    #[test]
    fn fewer_than_three_reps_only_fill_available_ranks() {
        let ranked = rank(vec![candidate(dec!(500000), 1), candidate(dec!(400000), 2)]);
        let breakdown = distribute(dec!(100000), &ranked, 1, 0, &config());
        assert_eq!(breakdown.performer_allocations.len(), 2);
        assert_eq!(breakdown.performer_allocations[1].share_percentage, dec!(12));
        assert_eq!(breakdown.others_count, 0);
    }
}
