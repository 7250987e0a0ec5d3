//! Half-up decimal rounding shared by the calendar and the metric calculators.

use rust_decimal::prelude::{FromPrimitive, ToPrimitive};
use rust_decimal::{Decimal, RoundingStrategy};

/// Round `value` to `places` decimals, halves away from zero.
pub fn round_half_up(value: f64, places: u32) -> f64 {
    Decimal::from_f64(value)
        .map(|d| to_f64(d, places))
        .unwrap_or(0.0)
}

/// `numerator / denominator` rounded half-up, `0.0` when the denominator is zero.
pub fn ratio(numerator: i64, denominator: i64, places: u32) -> f64 {
    Decimal::from(numerator)
        .checked_div(Decimal::from(denominator))
        .map(|d| to_f64(d, places))
        .unwrap_or(0.0)
}

fn to_f64(value: Decimal, places: u32) -> f64 {
    value
        .round_dp_with_strategy(places, RoundingStrategy::MidpointAwayFromZero)
        .to_f64()
        .unwrap_or(0.0)
}
