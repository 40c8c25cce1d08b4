// src/engine/mod.rs
//
// Pure calculation core. Every function here takes its inputs (including the
// organization's config snapshot) as explicit parameters and performs no I/O;
// the services layer does the fetching and persisting.

pub mod commission;
pub mod incentive;
pub mod penalty;
pub mod period;
pub mod review;
pub mod streak;
pub mod team_pool;

use rust_decimal::{Decimal, RoundingStrategy};

/// Round to whole currency units. Applied once at the persistence/response
/// edge, never between intermediate steps, so rounding error does not
/// compound across sales.
pub fn round_currency(amount: Decimal) -> Decimal {
    amount.round_dp_with_strategy(0, RoundingStrategy::MidpointAwayFromZero)
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    #[test]
    fn rounds_half_away_from_zero() {
        assert_eq!(round_currency(dec!(629.5)), dec!(630));
        assert_eq!(round_currency(dec!(629.49)), dec!(629));
        assert_eq!(round_currency(dec!(0)), dec!(0));
    }
}
