// src/engine/commission.rs

use crate::models::CommissionRate;
use rust_decimal::Decimal;
use rust_decimal_macros::dec;

/// Where the applied rate came from. `Unmatched` sales contribute zero but
/// are surfaced to the caller instead of being silently swallowed.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RateSource {
    Category,
    DefaultRate,
    Unmatched,
}

#[derive(Debug, Clone, PartialEq)]
pub struct CommissionOutcome {
    pub amount: Decimal,
    pub percentage: Decimal,
    pub multiplier_applied: bool,
    pub source: RateSource,
    /// False when the sale price sits below the rate's minimum.
    pub qualified: bool,
}

impl CommissionOutcome {
    fn zero(source: RateSource) -> Self {
        Self {
            amount: Decimal::ZERO,
            percentage: Decimal::ZERO,
            multiplier_applied: false,
            source,
            qualified: false,
        }
    }
}

/// Resolve the commission for one win-sale against the organization's active
/// rates. Exact category match first, then the rate named "Default"; range
/// validation happened when the rates were written, so stored values are
/// trusted here.
pub fn resolve(category: &str, sale_price: Decimal, rates: &[CommissionRate]) -> CommissionOutcome {
    let (rate, source) = match find_rate(category, rates) {
        Some(pair) => pair,
        None => return CommissionOutcome::zero(RateSource::Unmatched),
    };

    if sale_price < rate.min_sale_price {
        return CommissionOutcome {
            percentage: rate.commission_percentage,
            ..CommissionOutcome::zero(source)
        };
    }

    let mut amount = sale_price * rate.commission_percentage / dec!(100);
    let multiplier_applied = sale_price >= rate.premium_threshold && rate.multiplier > dec!(1);
    if multiplier_applied {
        amount *= rate.multiplier;
    }

    CommissionOutcome {
        amount,
        percentage: rate.commission_percentage,
        multiplier_applied,
        source,
        qualified: true,
    }
}

fn find_rate<'a>(
    category: &str,
    rates: &'a [CommissionRate],
) -> Option<(&'a CommissionRate, RateSource)> {
    let active = || rates.iter().filter(|r| r.is_active);

    if let Some(rate) = active().find(|r| r.category.eq_ignore_ascii_case(category)) {
        return Some((rate, RateSource::Category));
    }
    active()
        .find(|r| r.category.eq_ignore_ascii_case("Default"))
        .map(|r| (r, RateSource::DefaultRate))
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;
    use uuid::Uuid;

    fn rate(category: &str, pct: Decimal, multiplier: Decimal, min: Decimal, premium: Decimal) -> CommissionRate {
        CommissionRate {
            id: Uuid::new_v4(),
            organization_id: Uuid::new_v4(),
            category: category.to_string(),
            commission_percentage: pct,
            multiplier,
            min_sale_price: min,
            premium_threshold: premium,
            is_active: true,
            created_at: Utc::now(),
            updated_at: Utc::now(),
        }
    }

    #[test]
    fn electric_premium_sale_matches_worked_example() {
        // 0.7% at 1.5x above ₹50,000: 60000 * 0.007 * 1.5 = 630
        let rates = vec![rate("Electric", dec!(0.7), dec!(1.5), dec!(0), dec!(50000))];
        let out = resolve("Electric", dec!(60000), &rates);
        assert_eq!(out.amount, dec!(630));
        assert!(out.multiplier_applied);
        assert_eq!(out.source, RateSource::Category);
    }

    #[test]
    fn premium_commission_is_exactly_multiplier_times_base() {
        let rates = vec![rate("Electric", dec!(2), dec!(1.5), dec!(0), dec!(50000))];
        let below = resolve("Electric", dec!(49999), &rates);
        let above = resolve("Electric", dec!(49999) * dec!(2), &rates);
        // Same price would earn m times more above the threshold; verify the
        // factor directly on a fixed price instead.
        assert!(!below.multiplier_applied);
        assert!(above.multiplier_applied);

        let base = resolve(
            "Electric",
            dec!(50000),
            &[rate("Electric", dec!(2), dec!(1), dec!(0), dec!(999999))],
        );
        let premium = resolve("Electric", dec!(50000), &rates);
        assert_eq!(premium.amount, base.amount * dec!(1.5));
    }

    #[test]
    fn below_minimum_price_earns_nothing() {
        let rates = vec![rate("Furniture", dec!(5), dec!(2), dec!(10000), dec!(50000))];
        let out = resolve("Furniture", dec!(9999), &rates);
        assert_eq!(out.amount, Decimal::ZERO);
        assert!(!out.qualified);
        assert_eq!(out.source, RateSource::Category);
    }

    #[test]
    fn falls_back_to_default_rate() {
        let rates = vec![rate("Default", dec!(1), dec!(1), dec!(0), dec!(1000000))];
        let out = resolve("Plumbing", dec!(20000), &rates);
        assert_eq!(out.amount, dec!(200));
        assert_eq!(out.source, RateSource::DefaultRate);
    }

    #[test]
    fn unmatched_category_is_surfaced_not_swallowed() {
        let out = resolve("Plumbing", dec!(20000), &[]);
        assert_eq!(out.amount, Decimal::ZERO);
        assert_eq!(out.source, RateSource::Unmatched);
    }

    #[test]
    fn inactive_rates_are_ignored() {
        let mut r = rate("Electric", dec!(2), dec!(1), dec!(0), dec!(50000));
        r.is_active = false;
        let out = resolve("Electric", dec!(60000), &[r]);
        assert_eq!(out.source, RateSource::Unmatched);
    }

    #[test]
    fn category_match_is_case_insensitive() {
        let rates = vec![rate("Electric", dec!(1), dec!(1), dec!(0), dec!(1000000))];
        assert_eq!(resolve("electric", dec!(10000), &rates).source, RateSource::Category);
    }
}
