//! Dropout engine.
//!
//! Dropout % = (first dose - last dose) / first dose x 100. Negative values
//! (more last doses than first) are reported as they are.

use rust_decimal::Decimal;
use rust_decimal_macros::dec;

use crate::catalog::{DropoutPair, IndicatorCatalog};
use crate::error::AnalyticsError;
use crate::models::{scale_for_display, CellValue, DropoutResult, DropoutStatus, RawCounts};
use crate::period::MonthBucket;

/// Dropout above this share of first doses needs follow-up.
pub const DROPOUT_CEILING: Decimal = dec!(10);

pub fn dropout_percentage(first_dose: Decimal, last_dose: Decimal) -> Result<Decimal, AnalyticsError> {
    if first_dose.is_zero() {
        return Err(AnalyticsError::DivisionByZero("first dose count"));
    }
    let ratio = first_dose
        .checked_sub(last_dose)
        .ok_or(AnalyticsError::Overflow("dose difference"))?
        .checked_div(first_dose)
        .ok_or(AnalyticsError::Overflow("dropout percentage"))?;
    scale_for_display(ratio, dec!(100), "dropout percentage")
}

pub fn dropout_status(percentage: CellValue) -> DropoutStatus {
    match percentage {
        CellValue::NotAvailable => DropoutStatus::NotAvailable,
        CellValue::Value(v) if v < Decimal::ZERO => DropoutStatus::Negative,
        CellValue::Value(v) if v > DROPOUT_CEILING => DropoutStatus::High,
        CellValue::Value(_) => DropoutStatus::Acceptable,
    }
}

pub fn compute_dropout(pair: &DropoutPair, first_dose: Decimal, last_dose: Decimal) -> DropoutResult {
    // Only cell errors can occur here, so this never rejects
    let percentage = CellValue::from_result(dropout_percentage(first_dose, last_dose))
        .unwrap_or(CellValue::NotAvailable);
    DropoutResult {
        label: pair.label.to_string(),
        first_code: pair.first.to_string(),
        last_code: pair.last.to_string(),
        first_count: first_dose,
        last_count: last_dose,
        percentage,
        status: dropout_status(percentage),
    }
}

/// Dropout for every catalogued pair over the period's buckets.
pub fn compute_dropouts(
    catalog: &IndicatorCatalog,
    counts: &RawCounts,
    buckets: &[MonthBucket],
) -> Vec<DropoutResult> {
    catalog
        .dropout_pairs()
        .iter()
        .map(|pair| {
            compute_dropout(
                pair,
                counts.total(buckets, pair.first),
                counts.total(buckets, pair.last),
            )
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_dropout_values() {
        assert_eq!(dropout_percentage(dec!(100), dec!(80)).unwrap(), dec!(20.00));
        assert_eq!(dropout_percentage(dec!(100), dec!(120)).unwrap(), dec!(-20.00));
        assert_eq!(
            dropout_percentage(Decimal::ZERO, dec!(5)),
            Err(AnalyticsError::DivisionByZero("first dose count"))
        );
    }

    #[test]
    fn test_extreme_counts_are_not_available() {
        let pair = &IndicatorCatalog::global().dropout_pairs()[0];
        let result = compute_dropout(pair, Decimal::MIN, Decimal::MAX);
        assert_eq!(result.percentage, CellValue::NotAvailable);
        assert_eq!(
            dropout_percentage(Decimal::MIN, Decimal::MAX),
            Err(AnalyticsError::Overflow("dose difference"))
        );
    }

    #[test]
    fn test_negative_dropout_not_clamped() {
        let pair = &IndicatorCatalog::global().dropout_pairs()[0];
        let result = compute_dropout(pair, dec!(100), dec!(120));
        assert_eq!(result.percentage.to_string(), "-20.00");
        assert_eq!(result.status, DropoutStatus::Negative);
    }

    #[test]
    fn test_zero_first_dose_is_not_available() {
        let pair = &IndicatorCatalog::global().dropout_pairs()[0];
        let result = compute_dropout(pair, Decimal::ZERO, Decimal::ZERO);
        assert_eq!(result.percentage, CellValue::NotAvailable);
        assert_eq!(result.status, DropoutStatus::NotAvailable);
    }

    #[test]
    fn test_status_thresholds() {
        assert_eq!(dropout_status(CellValue::Value(dec!(10))), DropoutStatus::Acceptable);
        assert_eq!(dropout_status(CellValue::Value(dec!(10.01))), DropoutStatus::High);
        assert_eq!(dropout_status(CellValue::Value(dec!(0))), DropoutStatus::Acceptable);
    }

    #[test]
    fn test_compute_dropouts_over_buckets() {
        let buckets: Vec<MonthBucket> = vec!["202401".parse().unwrap(), "202402".parse().unwrap()];
        let mut counts = RawCounts::new();
        counts.add(buckets[0], "105-CL10", dec!(60));
        counts.add(buckets[1], "105-CL10", dec!(40));
        counts.add(buckets[0], "105-CL12", dec!(45));
        counts.add(buckets[1], "105-CL12", dec!(45));

        let results = compute_dropouts(IndicatorCatalog::global(), &counts, &buckets);
        assert_eq!(results.len(), 9);
        assert_eq!(results[0].label, "DPT1 to DPT3");
        assert_eq!(results[0].percentage, CellValue::Value(dec!(10)));
        // Pairs with nothing reported have a zero first dose
        assert_eq!(results[1].percentage, CellValue::NotAvailable);
    }
}
