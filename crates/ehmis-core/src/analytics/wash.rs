//! WASH household indicators.
//!
//! DHIS2 reports these as ready-made percentages per month. The period value
//! is the mean of the months that reported; unreported months are left out
//! rather than averaged in as zero.

use rust_decimal::Decimal;
use rust_decimal_macros::dec;
use serde::Serialize;

use crate::catalog::WashIndicator;
use crate::models::{round_display, CellValue, ColorCategory, RawCounts};
use crate::period::MonthBucket;

/// Values above this are reporting errors.
const WASH_CEILING: Decimal = dec!(100);

/// Lower bound of the yellow band.
const WASH_YELLOW_THRESHOLD: Decimal = dec!(50);

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct WashResult {
    pub key: String,
    pub display_name: String,
    pub short_name: String,
    pub value: CellValue,
    pub target: Decimal,
    pub color: ColorCategory,
    pub reported_months: usize,
}

/// Blue above 100 %, green at target, yellow from 50 %, otherwise red.
pub fn wash_color(value: CellValue, target: Decimal) -> ColorCategory {
    match value {
        CellValue::NotAvailable => ColorCategory::Gray,
        CellValue::Value(v) if v > WASH_CEILING => ColorCategory::Blue,
        CellValue::Value(v) if v >= target => ColorCategory::Green,
        CellValue::Value(v) if v >= WASH_YELLOW_THRESHOLD => ColorCategory::Yellow,
        CellValue::Value(_) => ColorCategory::Red,
    }
}

/// Mean of the reported values, or `N/A` when no month reported.
pub fn average_reported(values: &[Decimal]) -> CellValue {
    if values.is_empty() {
        return CellValue::NotAvailable;
    }
    let sum: Decimal = values.iter().sum();
    CellValue::Value(round_display(sum / Decimal::from(values.len())))
}

pub fn compute_wash(indicator: &WashIndicator, counts: &RawCounts, buckets: &[MonthBucket]) -> WashResult {
    let reported = counts.reported_values(buckets, indicator.key);
    let value = average_reported(&reported);
    WashResult {
        key: indicator.key.to_string(),
        display_name: indicator.display_name.to_string(),
        short_name: indicator.short_name.to_string(),
        value,
        target: indicator.target,
        color: wash_color(value, indicator.target),
        reported_months: reported.len(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::catalog::IndicatorCatalog;

    #[test]
    fn test_wash_colors() {
        let target = dec!(75);
        assert_eq!(wash_color(CellValue::Value(dec!(100.5)), target), ColorCategory::Blue);
        assert_eq!(wash_color(CellValue::Value(dec!(100)), target), ColorCategory::Green);
        assert_eq!(wash_color(CellValue::Value(dec!(75)), target), ColorCategory::Green);
        assert_eq!(wash_color(CellValue::Value(dec!(50)), target), ColorCategory::Yellow);
        assert_eq!(wash_color(CellValue::Value(dec!(49.99)), target), ColorCategory::Red);
        assert_eq!(wash_color(CellValue::NotAvailable, target), ColorCategory::Gray);
    }

    #[test]
    fn test_average_skips_unreported_months() {
        let buckets: Vec<MonthBucket> = ["202401", "202402", "202403"]
            .iter()
            .map(|s| s.parse().unwrap())
            .collect();
        let mut counts = RawCounts::new();
        counts.add(buckets[0], "WASH_LATRINES", dec!(70));
        counts.add(buckets[2], "WASH_LATRINES", dec!(81));

        let indicator = IndicatorCatalog::global().wash_indicator("WASH_LATRINES").unwrap();
        let result = compute_wash(indicator, &counts, &buckets);
        assert_eq!(result.value, CellValue::Value(dec!(75.5)));
        assert_eq!(result.reported_months, 2);
        assert_eq!(result.color, ColorCategory::Green);
    }

    #[test]
    fn test_nothing_reported() {
        assert_eq!(average_reported(&[]), CellValue::NotAvailable);
    }
}
