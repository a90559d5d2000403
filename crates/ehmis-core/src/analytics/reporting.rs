//! HMIS 033b weekly reporting rates.
//!
//! DHIS2 computes the rate itself (reports received / reports expected), so
//! this only colours each week and summarises the run. Weeks with no value
//! stay in the table as `N/A` and are left out of the summary.

use std::collections::BTreeMap;

use rust_decimal::Decimal;
use rust_decimal_macros::dec;
use serde::Serialize;

use crate::models::{round_display, CellValue, ColorCategory};
use crate::period::WeekBucket;

/// Lower bound of the green band.
pub const REPORTING_GREEN_THRESHOLD: Decimal = dec!(90);

/// Lower bound of the yellow band.
pub const REPORTING_YELLOW_THRESHOLD: Decimal = dec!(70);

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct WeeklyRate {
    pub week: WeekBucket,
    pub label: String,
    pub rate: CellValue,
    pub color: ColorCategory,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ReportingSummary {
    pub average: CellValue,
    pub reported_weeks: usize,
    pub total_weeks: usize,
    pub weeks_at_or_above_90: usize,
    pub weeks_below_70: usize,
}

pub fn reporting_color(rate: CellValue) -> ColorCategory {
    match rate {
        CellValue::NotAvailable => ColorCategory::Gray,
        CellValue::Value(v) if v >= REPORTING_GREEN_THRESHOLD => ColorCategory::Green,
        CellValue::Value(v) if v >= REPORTING_YELLOW_THRESHOLD => ColorCategory::Yellow,
        CellValue::Value(_) => ColorCategory::Red,
    }
}

/// One row per requested week, most recent first.
pub fn weekly_rates(weeks: &[WeekBucket], values: &BTreeMap<WeekBucket, Decimal>) -> Vec<WeeklyRate> {
    let mut rows: Vec<WeeklyRate> = weeks
        .iter()
        .map(|&week| {
            let rate = values
                .get(&week)
                .map(|v| CellValue::Value(round_display(*v)))
                .unwrap_or(CellValue::NotAvailable);
            WeeklyRate {
                week,
                label: week.label(),
                rate,
                color: reporting_color(rate),
            }
        })
        .collect();
    rows.sort_by(|a, b| b.week.cmp(&a.week));
    rows
}

pub fn summarize(rows: &[WeeklyRate]) -> ReportingSummary {
    let reported: Vec<Decimal> = rows.iter().filter_map(|r| r.rate.value()).collect();
    let average = if reported.is_empty() {
        CellValue::NotAvailable
    } else {
        let sum: Decimal = reported.iter().sum();
        CellValue::Value(round_display(sum / Decimal::from(reported.len())))
    };
    ReportingSummary {
        average,
        reported_weeks: reported.len(),
        total_weeks: rows.len(),
        weeks_at_or_above_90: reported.iter().filter(|v| **v >= REPORTING_GREEN_THRESHOLD).count(),
        weeks_below_70: reported.iter().filter(|v| **v < REPORTING_YELLOW_THRESHOLD).count(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn week(n: u32) -> WeekBucket {
        WeekBucket::new(2024, n).unwrap()
    }

    #[test]
    fn test_color_bands() {
        assert_eq!(reporting_color(CellValue::Value(dec!(90))), ColorCategory::Green);
        assert_eq!(reporting_color(CellValue::Value(dec!(89.99))), ColorCategory::Yellow);
        assert_eq!(reporting_color(CellValue::Value(dec!(70))), ColorCategory::Yellow);
        assert_eq!(reporting_color(CellValue::Value(dec!(69.99))), ColorCategory::Red);
        assert_eq!(reporting_color(CellValue::NotAvailable), ColorCategory::Gray);
    }

    #[test]
    fn test_rows_are_most_recent_first_with_gaps() {
        let weeks = [week(1), week(2), week(3)];
        let values = BTreeMap::from([(week(1), dec!(95.5)), (week(3), dec!(64))]);
        let rows = weekly_rates(&weeks, &values);

        assert_eq!(rows.len(), 3);
        assert_eq!(rows[0].week, week(3));
        assert_eq!(rows[0].color, ColorCategory::Red);
        assert_eq!(rows[1].rate, CellValue::NotAvailable);
        assert_eq!(rows[2].rate, CellValue::Value(dec!(95.5)));
        assert_eq!(rows[2].color, ColorCategory::Green);
    }

    #[test]
    fn test_summary_skips_missing_weeks() {
        let weeks = [week(1), week(2), week(3), week(4)];
        let values = BTreeMap::from([(week(1), dec!(100)), (week(2), dec!(92)), (week(4), dec!(60))]);
        let summary = summarize(&weekly_rates(&weeks, &values));

        assert_eq!(summary.average, CellValue::Value(dec!(84)));
        assert_eq!(summary.reported_weeks, 3);
        assert_eq!(summary.total_weeks, 4);
        assert_eq!(summary.weeks_at_or_above_90, 2);
        assert_eq!(summary.weeks_below_70, 1);
    }

    #[test]
    fn test_summary_of_nothing_reported() {
        let summary = summarize(&weekly_rates(&[week(1)], &BTreeMap::new()));
        assert_eq!(summary.average, CellValue::NotAvailable);
        assert_eq!(summary.weeks_below_70, 0);
    }
}
