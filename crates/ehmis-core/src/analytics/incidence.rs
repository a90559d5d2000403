//! Malaria incidence and burden classification.
//!
//! Incidence is confirmed cases per 1,000 population. Org units are ranked
//! into quartiles of the valid incidences; with fewer than four values the
//! split falls back to above/below the median.

use rust_decimal::prelude::ToPrimitive;
use rust_decimal::Decimal;
use serde::Serialize;

use crate::analytics::rates::rate_per;
use crate::catalog::RateScale;
use crate::models::CellValue;

/// Values needed for a quartile split.
const MIN_QUARTILE_VALUES: usize = 4;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum BurdenClass {
    Q1,
    Q2,
    Q3,
    Q4,
    BelowMedian,
    AboveMedian,
    NoData,
}

impl BurdenClass {
    pub fn label(&self) -> &'static str {
        match self {
            BurdenClass::Q1 => "Q1 (Low)",
            BurdenClass::Q2 => "Q2 (Moderate)",
            BurdenClass::Q3 => "Q3 (Elevated)",
            BurdenClass::Q4 => "Q4 (High)",
            BurdenClass::BelowMedian => "Below Median",
            BurdenClass::AboveMedian => "Above Median",
            BurdenClass::NoData => "No Data",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum BurdenThresholds {
    Quartiles { q25: f64, q50: f64, q75: f64 },
    Median { median: f64 },
    None,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct BurdenEntry {
    pub org_unit: String,
    pub name: String,
    pub cases: Decimal,
    pub population: Option<u64>,
    pub incidence: CellValue,
    pub class: BurdenClass,
}

/// Cases per 1,000; `N/A` without a population.
pub fn incidence_per_thousand(cases: Decimal, population: Option<u64>) -> CellValue {
    match population {
        Some(p) if p > 0 => CellValue::from_result(rate_per(cases, Decimal::from(p), RateScale::PerThousand))
            .unwrap_or(CellValue::NotAvailable),
        _ => CellValue::NotAvailable,
    }
}

/// Linear-interpolated percentile of ascending `sorted` values, `p` in 0..=100.
pub fn percentile(sorted: &[f64], p: f64) -> f64 {
    if sorted.is_empty() {
        return 0.0;
    }
    let rank = (p / 100.0) * (sorted.len() - 1) as f64;
    let lower = rank.floor() as usize;
    let upper = rank.ceil() as usize;
    let weight = rank - lower as f64;
    sorted[lower] + (sorted[upper] - sorted[lower]) * weight
}

/// Assign each entry its burden class and return the thresholds used.
pub fn classify_burden(entries: &mut [BurdenEntry]) -> BurdenThresholds {
    let mut valid: Vec<f64> = entries
        .iter()
        .filter_map(|e| e.incidence.value().and_then(|v| v.to_f64()))
        .collect();
    valid.sort_by(|a, b| a.total_cmp(b));

    let thresholds = if valid.is_empty() {
        BurdenThresholds::None
    } else if valid.len() < MIN_QUARTILE_VALUES {
        BurdenThresholds::Median {
            median: percentile(&valid, 50.0),
        }
    } else {
        BurdenThresholds::Quartiles {
            q25: percentile(&valid, 25.0),
            q50: percentile(&valid, 50.0),
            q75: percentile(&valid, 75.0),
        }
    };

    for entry in entries.iter_mut() {
        let value = entry.incidence.value().and_then(|v| v.to_f64());
        entry.class = match (value, thresholds) {
            (None, _) | (_, BurdenThresholds::None) => BurdenClass::NoData,
            (Some(v), BurdenThresholds::Median { median }) => {
                if v <= median {
                    BurdenClass::BelowMedian
                } else {
                    BurdenClass::AboveMedian
                }
            }
            (Some(v), BurdenThresholds::Quartiles { q25, q50, q75 }) => {
                if v <= q25 {
                    BurdenClass::Q1
                } else if v <= q50 {
                    BurdenClass::Q2
                } else if v <= q75 {
                    BurdenClass::Q3
                } else {
                    BurdenClass::Q4
                }
            }
        };
    }
    thresholds
}

/// Highest incidence first; entries without data go last.
pub fn rank_by_incidence(entries: &mut [BurdenEntry]) {
    entries.sort_by(|a, b| match (a.incidence.value(), b.incidence.value()) {
        (Some(x), Some(y)) => y.cmp(&x),
        (Some(_), None) => std::cmp::Ordering::Less,
        (None, Some(_)) => std::cmp::Ordering::Greater,
        (None, None) => a.name.cmp(&b.name),
    });
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    fn entry(id: &str, cases: Decimal, population: Option<u64>) -> BurdenEntry {
        BurdenEntry {
            org_unit: id.to_string(),
            name: id.to_string(),
            cases,
            population,
            incidence: incidence_per_thousand(cases, population),
            class: BurdenClass::NoData,
        }
    }

    #[test]
    fn test_incidence_per_thousand() {
        assert_eq!(incidence_per_thousand(dec!(250), Some(100_000)), CellValue::Value(dec!(2.5)));
        assert_eq!(incidence_per_thousand(dec!(250), Some(0)), CellValue::NotAvailable);
        assert_eq!(incidence_per_thousand(dec!(250), None), CellValue::NotAvailable);
    }

    #[test]
    fn test_percentile_matches_linear_interpolation() {
        let values = [1.0, 2.0, 3.0, 4.0];
        assert_eq!(percentile(&values, 25.0), 1.75);
        assert_eq!(percentile(&values, 50.0), 2.5);
        assert_eq!(percentile(&values, 75.0), 3.25);
    }

    #[test]
    fn test_quartile_classification() {
        let mut entries = vec![
            entry("A", dec!(100), Some(100_000)),
            entry("B", dec!(200), Some(100_000)),
            entry("C", dec!(300), Some(100_000)),
            entry("D", dec!(400), Some(100_000)),
            entry("E", dec!(400), None),
        ];
        let thresholds = classify_burden(&mut entries);
        assert_eq!(thresholds, BurdenThresholds::Quartiles { q25: 1.75, q50: 2.5, q75: 3.25 });
        let classes: Vec<BurdenClass> = entries.iter().map(|e| e.class).collect();
        assert_eq!(
            classes,
            vec![BurdenClass::Q1, BurdenClass::Q2, BurdenClass::Q3, BurdenClass::Q4, BurdenClass::NoData]
        );
    }

    #[test]
    fn test_median_fallback() {
        let mut entries = vec![
            entry("A", dec!(100), Some(100_000)),
            entry("B", dec!(300), Some(100_000)),
        ];
        assert_eq!(classify_burden(&mut entries), BurdenThresholds::Median { median: 2.0 });
        assert_eq!(entries[0].class, BurdenClass::BelowMedian);
        assert_eq!(entries[1].class, BurdenClass::AboveMedian);
    }

    #[test]
    fn test_rank_by_incidence() {
        let mut entries = vec![
            entry("A", dec!(100), Some(100_000)),
            entry("B", dec!(1), None),
            entry("C", dec!(300), Some(100_000)),
        ];
        rank_by_incidence(&mut entries);
        let order: Vec<&str> = entries.iter().map(|e| e.org_unit.as_str()).collect();
        assert_eq!(order, vec!["C", "A", "B"]);
    }
}
