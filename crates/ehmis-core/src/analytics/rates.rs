//! Mortality and ratio engine.
//!
//! rate = events / denominator x scale. Mortality rates always use live
//! births for the same org unit and period; proportions (IPT3 per ANC1, KMC
//! per LBW baby, ...) use the denominator named by their definition.

use rust_decimal::Decimal;
use rust_decimal_macros::dec;

use crate::catalog::{Polarity, RateDefinition, RateScale};
use crate::error::AnalyticsError;
use crate::models::{scale_for_display, CellValue, ColorCategory, RateResult, RawCounts};
use crate::period::MonthBucket;

/// Higher-is-better values at or above this share of target are yellow.
const HIGHER_YELLOW_FACTOR: Decimal = dec!(0.7);

/// Lower-is-better values up to this multiple of target are yellow.
const LOWER_YELLOW_FACTOR: Decimal = dec!(1.5);

pub fn rate_per(events: Decimal, denominator: Decimal, scale: RateScale) -> Result<Decimal, AnalyticsError> {
    if denominator.is_zero() {
        return Err(AnalyticsError::DivisionByZero("rate denominator"));
    }
    let ratio = events
        .checked_div(denominator)
        .ok_or(AnalyticsError::Overflow("rate"))?;
    scale_for_display(ratio, scale.factor(), "rate")
}

/// Colour a value against its performance target.
pub fn achievement_color(value: CellValue, target: Decimal, polarity: Polarity) -> ColorCategory {
    let CellValue::Value(value) = value else {
        return ColorCategory::Gray;
    };
    match polarity {
        Polarity::HigherIsBetter => {
            if value >= target {
                ColorCategory::Green
            } else if value >= target * HIGHER_YELLOW_FACTOR {
                ColorCategory::Yellow
            } else {
                ColorCategory::Red
            }
        }
        Polarity::LowerIsBetter => {
            if value <= target {
                ColorCategory::Green
            } else if value <= target * LOWER_YELLOW_FACTOR {
                ColorCategory::Yellow
            } else {
                ColorCategory::Red
            }
        }
    }
}

/// Evaluate a rate definition over the period's buckets.
pub fn compute_rate(definition: &RateDefinition, counts: &RawCounts, buckets: &[MonthBucket]) -> RateResult {
    let numerator = counts.total_of(buckets, definition.numerator);
    let denominator = counts.total(buckets, definition.denominator);
    let value = CellValue::from_result(rate_per(numerator, denominator, definition.scale))
        .unwrap_or(CellValue::NotAvailable);

    RateResult {
        key: definition.key.to_string(),
        display_name: definition.display_name.to_string(),
        numerator,
        denominator,
        value,
        target: definition.target,
        color: achievement_color(value, definition.target, definition.polarity),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::catalog::IndicatorCatalog;

    #[test]
    fn test_rate_per_thousand() {
        assert_eq!(rate_per(dec!(3), dec!(1000), RateScale::PerThousand).unwrap(), dec!(3.0));
    }

    #[test]
    fn test_rate_per_hundred_thousand() {
        assert_eq!(
            rate_per(dec!(2), dec!(4000), RateScale::PerHundredThousand).unwrap(),
            dec!(50.0)
        );
    }

    #[test]
    fn test_zero_live_births() {
        assert!(matches!(
            rate_per(dec!(1), Decimal::ZERO, RateScale::PerThousand),
            Err(AnalyticsError::DivisionByZero(_))
        ));
    }

    #[test]
    fn test_rate_overflow_is_cell_local() {
        let result = rate_per(Decimal::MAX, dec!(1), RateScale::PerHundredThousand);
        assert_eq!(result, Err(AnalyticsError::Overflow("rate")));
        assert_eq!(CellValue::from_result(result), Ok(CellValue::NotAvailable));
    }

    #[test]
    fn test_achievement_color_higher_is_better() {
        let target = dec!(60);
        assert_eq!(achievement_color(CellValue::Value(dec!(60)), target, Polarity::HigherIsBetter), ColorCategory::Green);
        assert_eq!(achievement_color(CellValue::Value(dec!(42)), target, Polarity::HigherIsBetter), ColorCategory::Yellow);
        assert_eq!(achievement_color(CellValue::Value(dec!(41.99)), target, Polarity::HigherIsBetter), ColorCategory::Red);
        assert_eq!(achievement_color(CellValue::NotAvailable, target, Polarity::HigherIsBetter), ColorCategory::Gray);
    }

    #[test]
    fn test_achievement_color_lower_is_better() {
        let target = dec!(12);
        assert_eq!(achievement_color(CellValue::Value(dec!(12)), target, Polarity::LowerIsBetter), ColorCategory::Green);
        assert_eq!(achievement_color(CellValue::Value(dec!(18)), target, Polarity::LowerIsBetter), ColorCategory::Yellow);
        assert_eq!(achievement_color(CellValue::Value(dec!(18.01)), target, Polarity::LowerIsBetter), ColorCategory::Red);
    }

    #[test]
    fn test_perinatal_sums_numerator_codes() {
        let bucket: MonthBucket = "202401".parse().unwrap();
        let mut counts = RawCounts::new();
        counts.add(bucket, "105-DL02", dec!(1000));
        counts.add(bucket, "105-DL07", dec!(4));
        counts.add(bucket, "105-DL09", dec!(6));

        let definition = IndicatorCatalog::global().rate("perinatal_mortality").unwrap();
        let result = compute_rate(definition, &counts, &[bucket]);
        assert_eq!(result.numerator, dec!(10));
        assert_eq!(result.value, CellValue::Value(dec!(10)));
        assert_eq!(result.color, ColorCategory::Green);
    }

    #[test]
    fn test_kmc_without_lbw_is_not_available() {
        let bucket: MonthBucket = "202401".parse().unwrap();
        let counts = RawCounts::new();
        let definition = IndicatorCatalog::global().rate("kmc_initiation").unwrap();
        let result = compute_rate(definition, &counts, &[bucket]);
        assert_eq!(result.value, CellValue::NotAvailable);
        assert_eq!(result.color, ColorCategory::Gray);
    }
}
