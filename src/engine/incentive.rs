// src/engine/incentive.rs

use crate::engine::{commission, penalty, review, round_currency, streak};
use crate::models::{CommissionRate, IncentiveConfig, PenaltyRecord, Sale};
use chrono::NaiveDate;
use rust_decimal::Decimal;
use rust_decimal_macros::dec;
use serde::Serialize;
use utoipa::ToSchema;

/// Everything the aggregator needs, fetched up front by the caller. The
/// config snapshot rides along so the whole computation stays pure.
pub struct IncentiveInputs<'a> {
    pub sales: &'a [Sale],
    pub activity_days: &'a [NaiveDate],
    pub penalties: &'a [PenaltyRecord],
    pub rates: &'a [CommissionRate],
    pub target_amount: Decimal,
    pub monthly_salary: Decimal,
    /// Streak walk horizon, normally the last day of the target month.
    pub as_of: NaiveDate,
    pub config: &'a IncentiveConfig,
}

#[derive(Debug, Clone, PartialEq, Serialize, ToSchema)]
pub struct IncentiveBreakdown {
    pub gross_commission: Decimal,
    pub current_streak: u32,
    pub longest_streak: u32,
    pub streak_tier: u32,
    pub streak_bonus: Decimal,
    pub review_count: u32,
    pub review_bonus: Decimal,
    pub total_bonuses: Decimal,
    pub penalty_count: i32,
    pub penalty_percentage: Decimal,
    pub penalty_amount: Decimal,
    pub net_incentive: Decimal,
    pub target_amount: Decimal,
    pub achieved_amount: Decimal,
    pub target_met: bool,
    pub salary_cap_applied: bool,
    pub capped_amount: Option<Decimal>,
    /// Sale categories with no matching rate and no "Default" fallback.
    /// Those sales earned nothing; surfaced here rather than swallowed.
    pub unrated_categories: Vec<String>,
}

impl IncentiveBreakdown {
    /// The amount a manager would approve unmodified: the capped figure when
    /// the salary cap fired, otherwise the net incentive.
    pub fn payable(&self) -> Decimal {
        self.capped_amount.unwrap_or(self.net_incentive)
    }
}

/// Combine commission, bonuses, penalties, the minimum-target gate and the
/// salary cap into one breakdown. Monetary fields are rounded to whole
/// currency units here, at the edge, so recomputation with the same inputs
/// is byte-identical.
pub fn calculate(inputs: &IncentiveInputs<'_>) -> IncentiveBreakdown {
    let hundred = dec!(100);

    let mut gross_commission = Decimal::ZERO;
    let mut achieved_amount = Decimal::ZERO;
    let mut unrated_categories: Vec<String> = Vec::new();

    for sale in inputs.sales {
        achieved_amount += sale.sale_price;
        let outcome = commission::resolve(&sale.category, sale.sale_price, inputs.rates);
        if outcome.source == commission::RateSource::Unmatched
            && !unrated_categories.contains(&sale.category)
        {
            unrated_categories.push(sale.category.clone());
        }
        gross_commission += outcome.amount;
    }

    let streak_summary = streak::compute(inputs.activity_days, inputs.as_of, inputs.config);
    let (review_count, review_bonus) =
        review::compute(inputs.sales, inputs.config.review_bonus_per_review);
    let total_bonuses = streak_summary.bonus_amount + review_bonus;

    let penalty_percentage = penalty::total_percentage(
        inputs.penalties,
        inputs.config.penalty_ceiling_percentage,
    );
    let penalty_base = gross_commission + total_bonuses;
    let penalty_amount = penalty_base * penalty_percentage / hundred;

    let mut net_incentive = (penalty_base - penalty_amount).max(Decimal::ZERO);

    // Minimum-target gate: the breakdown above is still recorded for
    // transparency, but payout drops to zero.
    let target_met = achieved_amount >= inputs.target_amount;
    if !target_met {
        net_incentive = Decimal::ZERO;
    }

    net_incentive = round_currency(net_incentive);

    let (salary_cap_applied, capped_amount) =
        if inputs.config.salary_cap_enabled && net_incentive > inputs.monthly_salary {
            (true, Some(round_currency(inputs.monthly_salary)))
        } else {
            (false, None)
        };

    IncentiveBreakdown {
        gross_commission: round_currency(gross_commission),
        current_streak: streak_summary.current_streak,
        longest_streak: streak_summary.longest_streak,
        streak_tier: streak_summary.tier,
        streak_bonus: round_currency(streak_summary.bonus_amount),
        review_count,
        review_bonus: round_currency(review_bonus),
        total_bonuses: round_currency(total_bonuses),
        penalty_count: penalty::counted(inputs.penalties) as i32,
        penalty_percentage,
        penalty_amount: round_currency(penalty_amount),
        net_incentive,
        target_amount: inputs.target_amount,
        achieved_amount: round_currency(achieved_amount),
        target_met,
        salary_cap_applied,
        capped_amount,
        unrated_categories,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{PenaltyStatus, PenaltyType, ReviewStatus};
    use chrono::Utc;
    use uuid::Uuid;

    fn config(salary_cap_enabled: bool) -> IncentiveConfig {
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
            salary_cap_enabled,
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

    fn sale(category: &str, price: Decimal, review: ReviewStatus) -> Sale {
        Sale {
            id: Uuid::new_v4(),
            organization_id: Uuid::new_v4(),
            user_id: Uuid::new_v4(),
            category: category.to_string(),
            sale_price: price,
            review_status: review,
            created_at: Utc::now(),
        }
    }

    fn rate(category: &str, pct: Decimal) -> CommissionRate {
        CommissionRate {
            id: Uuid::new_v4(),
            organization_id: Uuid::new_v4(),
            category: category.to_string(),
            commission_percentage: pct,
            multiplier: dec!(1),
            min_sale_price: dec!(0),
            premium_threshold: dec!(99999999),
            is_active: true,
            created_at: Utc::now(),
            updated_at: Utc::now(),
        }
    }

    fn active_penalty(pct: Decimal) -> PenaltyRecord {
        PenaltyRecord {
            id: Uuid::new_v4(),
            organization_id: Uuid::new_v4(),
            user_id: Uuid::new_v4(),
            month: "2026-01".to_string(),
            penalty_type: PenaltyType::LateArrival,
            penalty_percentage: pct,
            severity: None,
            description: None,
            status: PenaltyStatus::Active,
            dispute_reason: None,
            resolution_notes: None,
            created_at: Utc::now(),
            updated_at: Utc::now(),
        }
    }

    fn as_of() -> NaiveDate {
        NaiveDate::from_ymd_opt(2026, 1, 31).unwrap()
    }

    #[test]
    fn worked_example_two_penalties() {
        // gross 10,000 + bonuses 500, penalties 10% + 15%:
        // penalty_amount = 10500 * 0.25 = 2625, net = 7875.
        let sales = vec![sale("Electric", dec!(1000000), ReviewStatus::NotQualified)];
        let rates = vec![rate("Electric", dec!(1))];
        let penalties = vec![active_penalty(dec!(10)), active_penalty(dec!(15))];
        // A 7-day streak running right up to the horizon.
        let activity: Vec<NaiveDate> = (25..=31)
            .map(|d| NaiveDate::from_ymd_opt(2026, 1, d).unwrap())
            .collect();
        let cfg = config(false);

        let breakdown = calculate(&IncentiveInputs {
            sales: &sales,
            activity_days: &activity,
            penalties: &penalties,
            rates: &rates,
            target_amount: dec!(500000),
            monthly_salary: dec!(30000),
            as_of: as_of(),
            config: &cfg,
        });

        assert_eq!(breakdown.gross_commission, dec!(10000));
        assert_eq!(breakdown.streak_bonus, dec!(500));
        assert_eq!(breakdown.total_bonuses, dec!(500));
        assert_eq!(breakdown.penalty_percentage, dec!(25));
        assert_eq!(breakdown.penalty_amount, dec!(2625));
        assert_eq!(breakdown.net_incentive, dec!(7875));
        assert!(breakdown.target_met);
    }

    #[test]
    fn missed_target_gates_payout_to_zero_but_keeps_breakdown() {
        let sales = vec![sale("Electric", dec!(900000), ReviewStatus::Qualified)];
        let rates = vec![rate("Electric", dec!(1))];
        let cfg = config(false);

        let breakdown = calculate(&IncentiveInputs {
            sales: &sales,
            activity_days: &[],
            penalties: &[],
            rates: &rates,
            target_amount: dec!(1000000),
            monthly_salary: dec!(30000),
            as_of: as_of(),
            config: &cfg,
        });

        assert_eq!(breakdown.net_incentive, dec!(0));
        assert!(!breakdown.target_met);
        // Transparency: the components are still there.
        assert_eq!(breakdown.gross_commission, dec!(9000));
        assert_eq!(breakdown.review_bonus, dec!(100));
    }

    #[test]
    fn salary_cap_flags_and_records_the_capped_amount() {
        let sales = vec![sale("Electric", dec!(5000000), ReviewStatus::NotQualified)];
        let rates = vec![rate("Electric", dec!(2))];
        let cfg = config(true);

        let breakdown = calculate(&IncentiveInputs {
            sales: &sales,
            activity_days: &[],
            penalties: &[],
            rates: &rates,
            target_amount: dec!(1000000),
            monthly_salary: dec!(40000),
            as_of: as_of(),
            config: &cfg,
        });

        assert_eq!(breakdown.net_incentive, dec!(100000));
        assert!(breakdown.salary_cap_applied);
        assert_eq!(breakdown.capped_amount, Some(dec!(40000)));
        assert_eq!(breakdown.payable(), dec!(40000));
    }

    #[test]
    fn nuclear_penalty_forfeits_everything() {
        let sales = vec![sale("Electric", dec!(2000000), ReviewStatus::Qualified)];
        let rates = vec![rate("Electric", dec!(1))];
        let mut nuclear = active_penalty(dec!(100));
        nuclear.penalty_type = PenaltyType::ClientDisrespect;
        let penalties = vec![nuclear, active_penalty(dec!(10))];
        let cfg = config(false);

        let breakdown = calculate(&IncentiveInputs {
            sales: &sales,
            activity_days: &[],
            penalties: &penalties,
            rates: &rates,
            target_amount: dec!(1000000),
            monthly_salary: dec!(30000),
            as_of: as_of(),
            config: &cfg,
        });

        assert_eq!(breakdown.penalty_percentage, dec!(100));
        assert_eq!(breakdown.net_incentive, dec!(0));
    }

    #[test]
    fn unrated_categories_are_surfaced() {
        let sales = vec![
            sale("Plumbing", dec!(600000), ReviewStatus::NotQualified),
            sale("Plumbing", dec!(500000), ReviewStatus::NotQualified),
        ];
        let cfg = config(false);

        let breakdown = calculate(&IncentiveInputs {
            sales: &sales,
            activity_days: &[],
            penalties: &[],
            rates: &[],
            target_amount: dec!(1000000),
            monthly_salary: dec!(30000),
            as_of: as_of(),
            config: &cfg,
        });

        assert_eq!(breakdown.gross_commission, dec!(0));
        assert_eq!(breakdown.unrated_categories, vec!["Plumbing".to_string()]);
        // Revenue still counts toward the target even without a rate.
        assert!(breakdown.target_met);
    }

    #[test]
    fn recomputation_with_same_inputs_is_identical() {
        let sales = vec![sale("Electric", dec!(1234567), ReviewStatus::Qualified)];
        let rates = vec![rate("Electric", dec!(0.7))];
        let penalties = vec![active_penalty(dec!(10))];
        let activity: Vec<NaiveDate> = (1..=20)
            .map(|d| NaiveDate::from_ymd_opt(2026, 1, d).unwrap())
            .collect();
        let cfg = config(true);

        let inputs = IncentiveInputs {
            sales: &sales,
            activity_days: &activity,
            penalties: &penalties,
            rates: &rates,
            target_amount: dec!(1000000),
            monthly_salary: dec!(30000),
            as_of: as_of(),
            config: &cfg,
        };

        assert_eq!(calculate(&inputs), calculate(&inputs));
    }

    #[test]
    fn net_never_goes_negative() {
        let cfg = config(false);
        let breakdown = calculate(&IncentiveInputs {
            sales: &[],
            activity_days: &[],
            penalties: &[active_penalty(dec!(40))],
            rates: &[],
            target_amount: dec!(0),
            monthly_salary: dec!(30000),
            as_of: as_of(),
            config: &cfg,
        });
        assert_eq!(breakdown.net_incentive, dec!(0));
    }
}
