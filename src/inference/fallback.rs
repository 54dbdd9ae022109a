//! Closed-form reimbursement estimate used when no model is available.
//!
//! The constants, including the lower rate for trips of exactly four days and
//! the 0.8 scaling of the tiered receipts, reproduce the reference formula.

use crate::common::money::round_decimal_cents;
use crate::data::domain::TripRecord;

const DAILY_RATE: f64 = 95.0;
const FOUR_DAY_RATE: f64 = 85.0;
const MILEAGE_RATE: f64 = 0.45;
const RECEIPT_SCALE: f64 = 0.8;

/// Receipt tiers as (upper bound of the tier width, rate). The last tier is open.
const FIRST_TIER: (f64, f64) = (500.0, 0.95);
const SECOND_TIER: (f64, f64) = (1000.0, 0.75);
const TOP_RATE: f64 = 0.55;

/// Negative durations are not rejected; they yield a negative per diem.
pub fn per_diem(duration_days: i64) -> f64 {
    let rate = if duration_days == 4 {
        FOUR_DAY_RATE
    } else {
        DAILY_RATE
    };
    duration_days as f64 * rate
}

pub fn mileage(miles_traveled: f64) -> f64 {
    miles_traveled * MILEAGE_RATE
}

/// Piecewise-linear receipt reimbursement before scaling.
pub fn tiered_receipts(receipts: f64) -> f64 {
    let first_cap = FIRST_TIER.0;
    let second_cap = first_cap + SECOND_TIER.0;

    let mut total = receipts.min(first_cap) * FIRST_TIER.1;
    if receipts > first_cap {
        total += (receipts - first_cap).min(SECOND_TIER.0) * SECOND_TIER.1;
    }
    if receipts > second_cap {
        total += (receipts - second_cap) * TOP_RATE;
    }
    total
}

/// Deterministic estimate, rounded to cents on its exact decimal value.
pub fn fallback(record: &TripRecord) -> f64 {
    round_decimal_cents(
        per_diem(record.duration_days)
            + mileage(record.miles_traveled)
            + tiered_receipts(record.receipts_amount) * RECEIPT_SCALE,
    )
}

#[cfg(test)]
mod tests {
    use proptest::prelude::*;

    use super::*;

    #[test]
    fn four_day_trips_use_the_lower_rate() {
        assert_eq!(fallback(&TripRecord::new(3, 0.0, 0.0)), 285.0);
        assert_eq!(fallback(&TripRecord::new(4, 0.0, 0.0)), 340.0);
        assert_eq!(fallback(&TripRecord::new(5, 0.0, 0.0)), 475.0);
    }

    #[test]
    fn short_trip_with_small_receipts() {
        // 285 per diem + 45 mileage + 0.8 * 190 receipts
        assert_eq!(fallback(&TripRecord::new(3, 100.0, 200.0)), 482.0);
    }

    #[test]
    fn receipts_cross_every_tier() {
        assert_eq!(tiered_receipts(2000.0), 1500.0);
        assert_eq!(fallback(&TripRecord::new(0, 0.0, 2000.0)), 1200.0);
    }

    #[test]
    fn tier_edges() {
        assert_eq!(tiered_receipts(500.0), 475.0);
        assert_eq!(tiered_receipts(1500.0), 1225.0);
    }

    #[test]
    fn result_is_rounded_to_cents() {
        let amount = fallback(&TripRecord::new(1, 1.0, 1.01));
        assert_eq!(amount, round_decimal_cents(amount));
        assert_eq!(amount, 96.22);
    }

    #[test]
    fn half_cent_sums_round_on_their_decimal_value() {
        assert_eq!(fallback(&TripRecord::new(0, 0.7, 249.25)), 189.75);
        assert_eq!(fallback(&TripRecord::new(0, 0.7, 747.75)), 528.97);
        assert_eq!(fallback(&TripRecord::new(0, 0.7, 1046.85)), 708.43);
    }

    #[test]
    fn negative_duration_is_carried_through() {
        assert_eq!(per_diem(-3), -285.0);
        assert_eq!(fallback(&TripRecord::new(-3, 10.0, 10.0)), -272.9);
    }

    proptest! {
        #[test]
        fn repeated_calls_are_bit_identical(
            days in 0i64..30,
            miles in 0.0f64..2000.0,
            receipts in 0.0f64..3000.0,
        ) {
            let record = TripRecord::new(days, miles, receipts);
            prop_assert_eq!(fallback(&record).to_bits(), fallback(&record).to_bits());
        }

        #[test]
        fn non_decreasing_in_receipts(
            days in 0i64..30,
            miles in 0.0f64..2000.0,
            receipts in 0.0f64..3000.0,
            extra in 0.0f64..1000.0,
        ) {
            let low = fallback(&TripRecord::new(days, miles, receipts));
            let high = fallback(&TripRecord::new(days, miles, receipts + extra));
            prop_assert!(high >= low);
        }

        #[test]
        fn non_decreasing_in_miles(
            days in 0i64..30,
            miles in 0.0f64..2000.0,
            extra in 0.0f64..1000.0,
            receipts in 0.0f64..3000.0,
        ) {
            let low = fallback(&TripRecord::new(days, miles, receipts));
            let high = fallback(&TripRecord::new(days, miles + extra, receipts));
            prop_assert!(high >= low);
        }
    }
}
