//! Common numeric helpers used across the platform

use rust_decimal::{Decimal, RoundingStrategy};

/// Decimal places for every weight, percentage or amount surfaced outside
/// the engine's internal chaining
pub const SURFACED_DECIMALS: u32 = 2;

/// Round a surfaced value to two decimals, half-up.
///
/// Intermediate chaining never calls this; only values placed into a
/// result record do.
pub fn round2(value: Decimal) -> Decimal {
    value.round_dp_with_strategy(SURFACED_DECIMALS, RoundingStrategy::MidpointAwayFromZero)
}

/// Default tolerance for `original - discount == final` checks (one cent)
pub fn default_consistency_epsilon() -> Decimal {
    Decimal::new(1, 2)
}

/// Check two values are equal within `epsilon` (inclusive)
pub fn within_tolerance(left: Decimal, right: Decimal, epsilon: Decimal) -> bool {
    (left - right).abs() <= epsilon
}

/// Check a percentage lies in the closed range [0, 100]
pub fn is_valid_percentage(value: Decimal) -> bool {
    value >= Decimal::ZERO && value <= Decimal::ONE_HUNDRED
}
