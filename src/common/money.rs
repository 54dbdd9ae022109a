//! Cent rounding and amount formatting.
//!
//! Two rounding rules are in play. Model output is scaled by 100 and rounded
//! in binary (`round_cents`). The closed-form formula rounds the exact decimal
//! value of the float to two places (`round_decimal_cents`); the two disagree
//! whenever the scaling by 100 lands on or across a half cent.

/// Magnitude above which every f64 is a multiple of 1/8 and scaling by 100
/// may no longer be exact.
const EXACT_SCALE_LIMIT: f64 = (1u64 << 49) as f64;

/// Round `amount * 100` to the nearest integer, ties to even, then scale back.
pub fn round_cents(amount: f64) -> f64 {
    (amount * 100.0).round_ties_even() / 100.0
}

/// Round the exact decimal expansion of `amount` to two places, ties to even.
pub fn round_decimal_cents(amount: f64) -> f64 {
    if !amount.is_finite() {
        return amount;
    }
    // Only multiples of 1/8 can sit exactly on a half cent. For those the
    // scaled value is exact, so binary rounding gives the decimal answer.
    if (amount * 8.0).fract() == 0.0 && amount.abs() < EXACT_SCALE_LIMIT {
        return round_cents(amount);
    }
    // Fixed precision formatting rounds the exact decimal value.
    format!("{amount:.2}").parse().unwrap_or(amount)
}

/// Render an amount the way the CLI prints it: always with a fractional part.
pub fn format_amount(amount: f64) -> String {
    format!("{amount:?}")
}
