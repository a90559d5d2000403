//! Engine outputs.
//!
//! These records are recomputed on every request and never persisted; they
//! serialize to JSON for the `--export` command.

use std::fmt;

use rust_decimal::{Decimal, RoundingStrategy};
use serde::{Serialize, Serializer};

use crate::error::AnalyticsError;
use crate::period::{MonthBucket, PeriodSpec};

/// Decimal places shown for every percentage and rate.
pub const DISPLAY_DECIMALS: u32 = 2;

/// Round half away from zero to two places, the way the values are shown.
pub fn round_display(value: Decimal) -> Decimal {
    value.round_dp_with_strategy(DISPLAY_DECIMALS, RoundingStrategy::MidpointAwayFromZero)
}

/// `ratio x factor` rounded for display; `Overflow` when the product does
/// not fit in a `Decimal`.
pub fn scale_for_display(ratio: Decimal, factor: Decimal, what: &'static str) -> Result<Decimal, AnalyticsError> {
    ratio
        .checked_mul(factor)
        .map(round_display)
        .ok_or(AnalyticsError::Overflow(what))
}

// ============================================================================
// Cell values
// ============================================================================

/// A computed cell. `NotAvailable` replaces any per-cell failure so one bad
/// cell never aborts a table.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CellValue {
    Value(Decimal),
    NotAvailable,
}

impl CellValue {
    /// Convert an engine result into a cell. Cell-local errors become
    /// `NotAvailable`; anything else is returned to the caller.
    pub fn from_result(result: Result<Decimal, AnalyticsError>) -> Result<Self, AnalyticsError> {
        match result {
            Ok(value) => Ok(CellValue::Value(value)),
            Err(e) if e.is_cell_error() => Ok(CellValue::NotAvailable),
            Err(e) => Err(e),
        }
    }

    pub fn value(&self) -> Option<Decimal> {
        match self {
            CellValue::Value(v) => Some(*v),
            CellValue::NotAvailable => None,
        }
    }

    pub fn is_available(&self) -> bool {
        matches!(self, CellValue::Value(_))
    }
}

impl fmt::Display for CellValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            CellValue::Value(v) => write!(f, "{:.2}", round_display(*v)),
            CellValue::NotAvailable => write!(f, "N/A"),
        }
    }
}

impl Serialize for CellValue {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&self.to_string())
    }
}

// ============================================================================
// Colours
// ============================================================================

/// Display category for a cell.
///
/// Coverage uses only the three RED tiers. `Blue` marks WASH values above
/// 100 % (a data error) and `Gray` marks cells with no value.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum ColorCategory {
    Green,
    Yellow,
    Red,
    Blue,
    Gray,
}

impl ColorCategory {
    pub fn name(&self) -> &'static str {
        match self {
            ColorCategory::Green => "green",
            ColorCategory::Yellow => "yellow",
            ColorCategory::Red => "red",
            ColorCategory::Blue => "blue",
            ColorCategory::Gray => "gray",
        }
    }
}

// ============================================================================
// Coverage and dropout
// ============================================================================

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CoverageResult {
    pub org_unit: String,
    pub period: PeriodSpec,
    pub indicator_code: String,
    /// Doses administered.
    pub numerator: Decimal,
    /// Target population for the period.
    pub denominator: Decimal,
    pub percentage: CellValue,
    pub color: ColorCategory,
}

/// How a dropout rate reads against the national 10 % ceiling.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum DropoutStatus {
    Acceptable,
    High,
    /// Later dose exceeds the first; a data-quality signal.
    Negative,
    NotAvailable,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct DropoutResult {
    pub label: String,
    pub first_code: String,
    pub last_code: String,
    pub first_count: Decimal,
    pub last_count: Decimal,
    pub percentage: CellValue,
    pub status: DropoutStatus,
}

// ============================================================================
// Rates
// ============================================================================

/// A rate-per-N or proportion against a performance target.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RateResult {
    pub key: String,
    pub display_name: String,
    pub numerator: Decimal,
    pub denominator: Decimal,
    pub value: CellValue,
    pub target: Decimal,
    pub color: ColorCategory,
}

// ============================================================================
// Trends and forecasts
// ============================================================================

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct TrendPoint {
    pub period: MonthBucket,
    pub value: f64,
    pub outlier: bool,
    /// `None` when the point was not evaluated, or when the rest of the
    /// series has zero spread and the deviation is unbounded.
    pub z_score: Option<f64>,
}

impl TrendPoint {
    pub fn new(period: MonthBucket, value: f64) -> Self {
        Self {
            period,
            value,
            outlier: false,
            z_score: None,
        }
    }
}

/// Period-ascending series for one (org unit, indicator) pair.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct TrendSeries {
    pub org_unit: String,
    pub indicator_code: String,
    pub points: Vec<TrendPoint>,
}

impl TrendSeries {
    /// Build a series, sorting points by period.
    pub fn new(org_unit: &str, indicator_code: &str, mut points: Vec<TrendPoint>) -> Self {
        points.sort_by_key(|p| p.period);
        Self {
            org_unit: org_unit.to_string(),
            indicator_code: indicator_code.to_string(),
            points,
        }
    }

    pub fn values(&self) -> Vec<f64> {
        self.points.iter().map(|p| p.value).collect()
    }

    pub fn outliers(&self) -> impl Iterator<Item = &TrendPoint> {
        self.points.iter().filter(|p| p.outlier)
    }

    pub fn len(&self) -> usize {
        self.points.len()
    }

    pub fn is_empty(&self) -> bool {
        self.points.is_empty()
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ForecastPoint {
    pub period: MonthBucket,
    pub index: f64,
    pub value: f64,
}

/// A fitted OLS line and its projections. Projections are never clamped.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Forecast {
    pub slope: f64,
    pub intercept: f64,
    pub points: Vec<ForecastPoint>,
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    #[test]
    fn test_cell_value_display() {
        assert_eq!(CellValue::Value(dec!(100)).to_string(), "100.00");
        assert_eq!(CellValue::Value(dec!(-20.5)).to_string(), "-20.50");
        assert_eq!(CellValue::NotAvailable.to_string(), "N/A");
    }

    #[test]
    fn test_cell_value_display_rounds_half_away_from_zero() {
        assert_eq!(CellValue::Value(dec!(82.456)).to_string(), "82.46");
        assert_eq!(CellValue::Value(dec!(2.345)).to_string(), "2.35");
        assert_eq!(CellValue::Value(dec!(-2.345)).to_string(), "-2.35");
    }

    #[test]
    fn test_scale_for_display_overflow() {
        assert_eq!(scale_for_display(dec!(0.82456), dec!(100), "coverage"), Ok(dec!(82.46)));
        assert_eq!(
            scale_for_display(Decimal::MAX, dec!(100), "coverage"),
            Err(AnalyticsError::Overflow("coverage"))
        );
    }

    #[test]
    fn test_cell_value_from_result() {
        let ok = CellValue::from_result(Ok(dec!(12.34))).unwrap();
        assert_eq!(ok.value(), Some(dec!(12.34)));

        let na = CellValue::from_result(Err(AnalyticsError::DivisionByZero("first dose"))).unwrap();
        assert_eq!(na, CellValue::NotAvailable);

        let rejected = CellValue::from_result(Err(AnalyticsError::UnknownIndicator("X".to_string())));
        assert!(rejected.is_err());
    }

    #[test]
    fn test_round_display_half_away_from_zero() {
        assert_eq!(round_display(dec!(2.345)), dec!(2.35));
        assert_eq!(round_display(dec!(-2.345)), dec!(-2.35));
        assert_eq!(round_display(dec!(94.994)), dec!(94.99));
    }

    #[test]
    fn test_cell_value_serializes_as_string() {
        let json = serde_json::to_string(&[CellValue::Value(dec!(95)), CellValue::NotAvailable]).unwrap();
        assert_eq!(json, r#"["95.00","N/A"]"#);
    }

    #[test]
    fn test_trend_series_sorted_by_period() {
        let later = TrendPoint::new("202403".parse().unwrap(), 3.0);
        let earlier = TrendPoint::new("202401".parse().unwrap(), 1.0);
        let series = TrendSeries::new("GUL", "105-CL01", vec![later, earlier]);
        assert_eq!(series.values(), vec![1.0, 3.0]);
    }
}
