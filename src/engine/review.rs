// src/engine/review.rs

use crate::models::{ReviewStatus, Sale};
use rust_decimal::Decimal;

/// Per-review bonus for the month's qualified reviews. Pending reviews earn
/// nothing until triaged, which is why month finalization is an explicit
/// manager action rather than automatic.
pub fn compute(sales: &[Sale], per_review_amount: Decimal) -> (u32, Decimal) {
    let count = sales
        .iter()
        .filter(|s| s.review_status == ReviewStatus::Qualified)
        .count() as u32;
    (count, Decimal::from(count) * per_review_amount)
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;
    use rust_decimal_macros::dec;
    use uuid::Uuid;

    fn sale(review_status: ReviewStatus) -> Sale {
        Sale {
            id: Uuid::new_v4(),
            organization_id: Uuid::new_v4(),
            user_id: Uuid::new_v4(),
            category: "Electric".to_string(),
            sale_price: dec!(10000),
            review_status,
            created_at: Utc::now(),
        }
    }

    #[test]
    fn only_qualified_reviews_count() {
        let sales = vec![
            sale(ReviewStatus::Qualified),
            sale(ReviewStatus::Pending),
            sale(ReviewStatus::NotQualified),
            sale(ReviewStatus::Qualified),
        ];
        let (count, amount) = compute(&sales, dec!(100));
        assert_eq!(count, 2);
        assert_eq!(amount, dec!(200));
    }

    #[test]
    fn no_sales_means_no_bonus() {
        assert_eq!(compute(&[], dec!(100)), (0, dec!(0)));
    }
}
