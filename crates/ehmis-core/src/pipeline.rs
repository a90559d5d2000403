//! Report assembly.
//!
//! Turns one request's fetched counts into the records the dashboard shows.
//! Everything here is synchronous and pure; fetching happens before, in the
//! API client.

use std::collections::{BTreeMap, HashMap};

use rust_decimal::prelude::ToPrimitive;
use rust_decimal::Decimal;
use serde::Serialize;
use tracing::debug;

use crate::analytics::{
    achievement_color, base_population, classify_burden, compute_coverage, compute_dropouts,
    compute_rate, compute_wash, flag_outliers, forecast_series, incidence_per_thousand,
    rank_by_incidence, summarize, weekly_rates, BurdenClass, BurdenEntry, BurdenThresholds,
    OutlierConfig, ReportingSummary, WashResult, WeeklyRate,
};
use crate::catalog::{Category, IndicatorCatalog, PopulationRegistry, REPORTING_RATE_NAME};
use crate::error::AnalyticsError;
use crate::models::{
    CellValue, ColorCategory, CoverageResult, DropoutResult, Forecast, OrgUnitLevel, OrgUnitTree,
    RateResult, RawCounts, TrendPoint, TrendSeries,
};
use crate::period::{group_by_quarter, PeriodSpec, QuarterBucket, ResolvedPeriod, WeekBucket};

/// Everything a report needs besides the counts.
#[derive(Clone, Copy)]
pub struct ReportContext<'a> {
    pub tree: &'a OrgUnitTree,
    pub registry: &'a PopulationRegistry,
    pub catalog: &'a IndicatorCatalog,
    pub outliers: OutlierConfig,
    pub horizon: usize,
}

// ============================================================================
// EPI
// ============================================================================

#[derive(Debug, Clone, Serialize)]
pub struct IndicatorCoverage {
    pub key: String,
    pub display_name: String,
    pub total: CoverageResult,
    /// Monthly coverage; months whose coverage is `N/A` are left out.
    pub trend: TrendSeries,
    pub forecast: Option<Forecast>,
}

#[derive(Debug, Clone, Serialize)]
pub struct EpiReport {
    pub org_unit: String,
    pub org_unit_name: String,
    pub period: String,
    pub population: u64,
    pub coverage: Vec<IndicatorCoverage>,
    pub dropouts: Vec<DropoutResult>,
}

impl EpiReport {
    pub fn outlier_count(&self) -> usize {
        self.coverage.iter().map(|c| c.trend.outliers().count()).sum()
    }
}

/// Monthly coverage series for one indicator, outlier-flagged.
pub fn coverage_trend(
    ctx: &ReportContext<'_>,
    org_unit: &str,
    period: &ResolvedPeriod,
    counts: &RawCounts,
    code: &str,
) -> Result<TrendSeries, AnalyticsError> {
    let mut points = Vec::with_capacity(period.buckets.len());
    for &bucket in &period.buckets {
        let month = PeriodSpec::Month {
            year: bucket.year(),
            month: bucket.month(),
        }
        .resolve()?;
        let result = compute_coverage(
            ctx.tree,
            ctx.registry,
            ctx.catalog,
            org_unit,
            &month,
            code,
            counts.get(bucket, code),
        )?;
        if let Some(value) = result.percentage.value().and_then(|v| v.to_f64()) {
            points.push(TrendPoint::new(bucket, value));
        }
    }
    let mut series = TrendSeries::new(org_unit, code, points);
    flag_outliers(&mut series, ctx.outliers);
    Ok(series)
}

pub fn build_epi_report(
    ctx: &ReportContext<'_>,
    org_unit: &str,
    period: &ResolvedPeriod,
    counts: &RawCounts,
) -> Result<EpiReport, AnalyticsError> {
    let unit = ctx.tree.get(org_unit)?;
    let population = base_population(ctx.tree, ctx.registry, org_unit)?;

    let mut coverage = Vec::new();
    for meta in ctx.catalog.by_category(Category::Epi) {
        let total = compute_coverage(
            ctx.tree,
            ctx.registry,
            ctx.catalog,
            org_unit,
            period,
            meta.code,
            counts.total(&period.buckets, meta.code),
        )?;
        let trend = coverage_trend(ctx, org_unit, period, counts, meta.code)?;
        let forecast = match forecast_series(&trend, ctx.horizon) {
            Ok(forecast) => Some(forecast),
            Err(e) => {
                debug!(indicator = meta.code, error = %e, "Forecast skipped");
                None
            }
        };
        coverage.push(IndicatorCoverage {
            key: meta.key.to_string(),
            display_name: meta.display_name.to_string(),
            total,
            trend,
            forecast,
        });
    }

    Ok(EpiReport {
        org_unit: unit.id.clone(),
        org_unit_name: unit.name.clone(),
        period: period.label(),
        population,
        coverage,
        dropouts: compute_dropouts(ctx.catalog, counts, &period.buckets),
    })
}

// ============================================================================
// Maternal
// ============================================================================

/// A population-based maternal indicator coloured against its own goal.
#[derive(Debug, Clone, Serialize)]
pub struct MaternalCoverage {
    pub key: String,
    pub display_name: String,
    pub count: Decimal,
    pub percentage: CellValue,
    pub target: Decimal,
    pub color: ColorCategory,
}

#[derive(Debug, Clone, Serialize)]
pub struct MaternalQuarter {
    pub quarter: QuarterBucket,
    pub label: String,
    /// Divisor of the annual target; above 4 when the selection covers only
    /// part of the quarter.
    pub divisor: u32,
    pub coverage: Vec<MaternalCoverage>,
    pub rates: Vec<RateResult>,
}

#[derive(Debug, Clone, Serialize)]
pub struct MaternalReport {
    pub org_unit: String,
    pub org_unit_name: String,
    pub category: Category,
    pub population: u64,
    pub quarters: Vec<MaternalQuarter>,
}

const MONTHS_PER_QUARTER: usize = 3;

/// Quarterly rows for ANC, intrapartum or PNC. Quarters the period only
/// partly covers are pro-rated to the months it does cover.
pub fn build_maternal_report(
    ctx: &ReportContext<'_>,
    org_unit: &str,
    period: &ResolvedPeriod,
    counts: &RawCounts,
    category: Category,
) -> Result<MaternalReport, AnalyticsError> {
    let unit = ctx.tree.get(org_unit)?;
    let population = base_population(ctx.tree, ctx.registry, org_unit)?;
    let population_indicators: Vec<_> = ctx
        .catalog
        .by_category(category)
        .into_iter()
        .filter(|m| m.has_population_target())
        .collect();
    let rate_definitions = ctx.catalog.rates(category);

    let mut quarters = Vec::new();
    for (quarter, months) in group_by_quarter(&period.buckets) {
        let quarter_period = ResolvedPeriod::quarter_slice(quarter, &months)?;

        let mut coverage = Vec::with_capacity(population_indicators.len());
        for meta in &population_indicators {
            let count = counts.total(&months, meta.code);
            let result = compute_coverage(
                ctx.tree,
                ctx.registry,
                ctx.catalog,
                org_unit,
                &quarter_period,
                meta.code,
                count,
            )?;
            coverage.push(MaternalCoverage {
                key: meta.key.to_string(),
                display_name: meta.display_name.to_string(),
                count,
                percentage: result.percentage,
                target: meta.performance_target,
                color: achievement_color(result.percentage, meta.performance_target, meta.polarity),
            });
        }

        let rates = rate_definitions
            .iter()
            .map(|definition| compute_rate(definition, counts, &months))
            .collect();

        let label = if months.len() < MONTHS_PER_QUARTER {
            format!("{} ({} of {} months)", quarter.label(), months.len(), MONTHS_PER_QUARTER)
        } else {
            quarter.label()
        };
        quarters.push(MaternalQuarter {
            quarter,
            label,
            divisor: quarter_period.divisor,
            coverage,
            rates,
        });
    }

    Ok(MaternalReport {
        org_unit: unit.id.clone(),
        org_unit_name: unit.name.clone(),
        category,
        population,
        quarters,
    })
}

// ============================================================================
// WASH
// ============================================================================

#[derive(Debug, Clone, Serialize)]
pub struct WashReport {
    pub org_unit: String,
    pub org_unit_name: String,
    pub period: String,
    pub indicators: Vec<WashResult>,
}

pub fn build_wash_report(
    ctx: &ReportContext<'_>,
    org_unit: &str,
    period: &ResolvedPeriod,
    counts: &RawCounts,
) -> Result<WashReport, AnalyticsError> {
    let unit = ctx.tree.get(org_unit)?;
    Ok(WashReport {
        org_unit: unit.id.clone(),
        org_unit_name: unit.name.clone(),
        period: period.label(),
        indicators: ctx
            .catalog
            .wash_indicators()
            .iter()
            .map(|indicator| compute_wash(indicator, counts, &period.buckets))
            .collect(),
    })
}

// ============================================================================
// Malaria burden
// ============================================================================

#[derive(Debug, Clone, Serialize)]
pub struct BurdenReport {
    pub parent: String,
    pub period: String,
    pub thresholds: BurdenThresholds,
    pub entries: Vec<BurdenEntry>,
}

/// Population an org unit can be divided by on its own. Sub-district units
/// have no estimate unless they are facilities with a catchment.
fn own_population(ctx: &ReportContext<'_>, org_unit: &str) -> Result<Option<u64>, AnalyticsError> {
    let unit = ctx.tree.get(org_unit)?;
    let has_estimate = unit.level <= OrgUnitLevel::District
        || (unit.is_facility()
            && (unit.custom_catchment.is_some() || ctx.registry.custom_catchment(&unit.id).is_some()));
    if !has_estimate {
        return Ok(None);
    }
    let population = base_population(ctx.tree, ctx.registry, org_unit)?;
    Ok((population > 0).then_some(population))
}

/// Incidence per child of `parent`, ranked and classified.
pub fn build_burden_report(
    ctx: &ReportContext<'_>,
    parent: &str,
    period: &ResolvedPeriod,
    cases_by_unit: &HashMap<String, Decimal>,
) -> Result<BurdenReport, AnalyticsError> {
    ctx.tree.get(parent)?;

    let mut entries = Vec::new();
    for child in ctx.tree.children(parent) {
        let cases = cases_by_unit.get(&child.id).copied().unwrap_or(Decimal::ZERO);
        let population = own_population(ctx, &child.id)?;
        entries.push(BurdenEntry {
            org_unit: child.id.clone(),
            name: child.name.clone(),
            cases,
            population,
            incidence: incidence_per_thousand(cases, population),
            class: BurdenClass::NoData,
        });
    }

    let thresholds = classify_burden(&mut entries);
    rank_by_incidence(&mut entries);

    Ok(BurdenReport {
        parent: parent.to_string(),
        period: period.label(),
        thresholds,
        entries,
    })
}

// ============================================================================
// Weekly reporting
// ============================================================================

#[derive(Debug, Clone, Serialize)]
pub struct ReportingReport {
    pub org_unit: String,
    pub org_unit_name: String,
    pub indicator: String,
    pub period: String,
    pub weeks: Vec<WeeklyRate>,
    pub summary: ReportingSummary,
}

/// HMIS 033b completeness for every ISO week of the period.
pub fn build_reporting_report(
    ctx: &ReportContext<'_>,
    org_unit: &str,
    period: &ResolvedPeriod,
    rates: &BTreeMap<WeekBucket, Decimal>,
) -> Result<ReportingReport, AnalyticsError> {
    let unit = ctx.tree.get(org_unit)?;
    let weeks = weekly_rates(&period.weeks(), rates);
    let summary = summarize(&weeks);
    debug!(
        org_unit,
        weeks = summary.total_weeks,
        reported = summary.reported_weeks,
        "Built reporting report"
    );
    Ok(ReportingReport {
        org_unit: unit.id.clone(),
        org_unit_name: unit.name.clone(),
        indicator: REPORTING_RATE_NAME.to_string(),
        period: period.label(),
        weeks,
        summary,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::analytics::DEFAULT_HORIZON;
    use crate::models::OrgUnit;
    use crate::period::MonthBucket;
    use crate::test_support::sample_tree;
    use rust_decimal_macros::dec;

    fn context<'a>(tree: &'a OrgUnitTree, registry: &'a PopulationRegistry) -> ReportContext<'a> {
        ReportContext {
            tree,
            registry,
            catalog: IndicatorCatalog::global(),
            outliers: OutlierConfig::epi(2.0),
            horizon: DEFAULT_HORIZON,
        }
    }

    fn month(s: &str) -> MonthBucket {
        s.parse().unwrap()
    }

    #[test]
    fn test_epi_report_shapes() {
        let tree = sample_tree();
        let registry = PopulationRegistry::new();
        let ctx = context(&tree, &registry);
        let period: ResolvedPeriod = "202401-202406".parse::<PeriodSpec>().unwrap().resolve().unwrap();

        let mut counts = RawCounts::new();
        for (i, bucket) in period.buckets.iter().enumerate() {
            counts.add(*bucket, "105-CL10", dec!(500) + Decimal::from(i as u32 * 10));
            counts.add(*bucket, "105-CL12", dec!(450));
        }

        let report = build_epi_report(&ctx, "GUL", &period, &counts).unwrap();
        assert_eq!(report.population, 135_373);
        assert_eq!(report.coverage.len(), 28);
        assert_eq!(report.dropouts.len(), 9);

        let dpt1 = report.coverage.iter().find(|c| c.key == "DPT1").unwrap();
        assert_eq!(dpt1.trend.len(), 6);
        let forecast = dpt1.forecast.as_ref().unwrap();
        assert_eq!(forecast.points.len(), 3);
        assert!(forecast.slope > 0.0);

        let dpt_dropout = &report.dropouts[0];
        assert!(dpt_dropout.percentage.is_available());
    }

    #[test]
    fn test_epi_report_unknown_org_unit() {
        let tree = sample_tree();
        let registry = PopulationRegistry::new();
        let period = PeriodSpec::Year { year: 2024 }.resolve().unwrap();
        let err = build_epi_report(&context(&tree, &registry), "NOPE", &period, &RawCounts::new()).unwrap_err();
        assert_eq!(err, AnalyticsError::UnknownOrgUnit("NOPE".to_string()));
    }

    #[test]
    fn test_maternal_report_quarters() {
        let tree = sample_tree();
        let registry = PopulationRegistry::new();
        let ctx = context(&tree, &registry);
        let period = "202401-202406".parse::<PeriodSpec>().unwrap().resolve().unwrap();

        let mut counts = RawCounts::new();
        counts.add(month("202401"), "105-AN01a", dec!(500));
        counts.add(month("202402"), "105-AN01a", dec!(500));
        counts.add(month("202402"), "105-AN04c", dec!(850));

        let report = build_maternal_report(&ctx, "GUL", &period, &counts, Category::Anc).unwrap();
        assert_eq!(report.quarters.len(), 2);
        let q1 = &report.quarters[0];
        assert_eq!(q1.label, "Jan-Mar 2024");

        let ipt3 = q1.rates.iter().find(|r| r.key == "ipt3").unwrap();
        assert_eq!(ipt3.value, CellValue::Value(dec!(85)));
        assert_eq!(ipt3.color, ColorCategory::Green);

        // Second quarter has no ANC1 so every ANC1-based proportion is N/A
        let q2 = &report.quarters[1];
        assert!(q2.rates.iter().all(|r| r.value == CellValue::NotAvailable));

        let anc1 = q1.coverage.iter().find(|c| c.key == "ANC1").unwrap();
        // 135,373 x 5 % / 4 = 1,692.16 expected pregnancies per quarter
        assert_eq!(anc1.percentage, CellValue::Value(dec!(59.10)));
        assert_eq!(anc1.color, ColorCategory::Red);
    }

    #[test]
    fn test_maternal_single_month_uses_monthly_target() {
        let tree = sample_tree();
        let registry = PopulationRegistry::new();
        let ctx = context(&tree, &registry);
        let period = PeriodSpec::Month { year: 2024, month: 3 }.resolve().unwrap();

        // 135,373 x 5 % / 12 = 564.05 expected pregnancies per month
        let mut counts = RawCounts::new();
        counts.add(month("202403"), "105-AN01a", dec!(564.05));

        let report = build_maternal_report(&ctx, "GUL", &period, &counts, Category::Anc).unwrap();
        assert_eq!(report.quarters.len(), 1);
        let q1 = &report.quarters[0];
        assert_eq!(q1.divisor, 12);
        assert_eq!(q1.label, "Jan-Mar 2024 (1 of 3 months)");
        let anc1 = q1.coverage.iter().find(|c| c.key == "ANC1").unwrap();
        assert_eq!(anc1.percentage, CellValue::Value(dec!(100.00)));
    }

    #[test]
    fn test_maternal_partial_quarters_are_pro_rated() {
        let tree = sample_tree();
        let registry = PopulationRegistry::new();
        let ctx = context(&tree, &registry);
        // Feb-Mar is two months of Q1, Apr-Jun the whole of Q2, Jul one month of Q3
        let period = "202402-202407".parse::<PeriodSpec>().unwrap().resolve().unwrap();

        let mut counts = RawCounts::new();
        for bucket in &period.buckets {
            counts.add(*bucket, "105-AN01a", dec!(564.05));
        }

        let report = build_maternal_report(&ctx, "GUL", &period, &counts, Category::Anc).unwrap();
        let divisors: Vec<u32> = report.quarters.iter().map(|q| q.divisor).collect();
        assert_eq!(divisors, vec![6, 4, 12]);
        for quarter in &report.quarters {
            let anc1 = quarter.coverage.iter().find(|c| c.key == "ANC1").unwrap();
            assert_eq!(anc1.percentage, CellValue::Value(dec!(100.00)), "{}", quarter.label);
        }
        assert_eq!(report.quarters[1].label, "Apr-Jun 2024");
    }

    #[test]
    fn test_wash_report() {
        let tree = sample_tree();
        let registry = PopulationRegistry::new();
        let period = PeriodSpec::Quarter { year: 2024, quarter: 1 }.resolve().unwrap();
        let mut counts = RawCounts::new();
        counts.add(month("202401"), "WASH_ODF", dec!(120));
        let report = build_wash_report(&context(&tree, &registry), "GUL", &period, &counts).unwrap();
        assert_eq!(report.indicators.len(), 5);
        let odf = report.indicators.iter().find(|w| w.key == "WASH_ODF").unwrap();
        assert_eq!(odf.color, ColorCategory::Blue);
        let latrines = report.indicators.iter().find(|w| w.key == "WASH_LATRINES").unwrap();
        assert_eq!(latrines.value, CellValue::NotAvailable);
    }

    fn national_tree() -> OrgUnitTree {
        let mut tree = OrgUnitTree::new();
        tree.extend([
            OrgUnit::new("UG", "MOH - Uganda", OrgUnitLevel::National, None),
            OrgUnit::new("ACH", "Acholi Region", OrgUnitLevel::Region, Some("UG")),
            OrgUnit::new("LAN", "Lango Region", OrgUnitLevel::Region, Some("UG")),
            OrgUnit::new("GUL", "Gulu District", OrgUnitLevel::District, Some("ACH")),
            OrgUnit::new("AMU", "Amuru District", OrgUnitLevel::District, Some("ACH")),
            OrgUnit::new("LIR", "Lira District", OrgUnitLevel::District, Some("LAN")),
        ]);
        tree
    }

    #[test]
    fn test_burden_report_for_national_regions() {
        let tree = national_tree();
        let registry = PopulationRegistry::new();
        let period = PeriodSpec::Month { year: 2024, month: 3 }.resolve().unwrap();
        // Acholi = Gulu 135,373 + Amuru 240,814; Lango = Lira 242,216
        let cases = HashMap::from([
            ("ACH".to_string(), dec!(3761.87)),
            ("LAN".to_string(), dec!(4844.32)),
        ]);
        let report = build_burden_report(&context(&tree, &registry), "UG", &period, &cases).unwrap();

        assert_eq!(report.entries.len(), 2);
        assert_eq!(report.entries[0].org_unit, "LAN");
        assert_eq!(report.entries[0].population, Some(242_216));
        assert_eq!(report.entries[0].incidence, CellValue::Value(dec!(20)));
        assert_eq!(report.entries[0].class, BurdenClass::AboveMedian);
        assert_eq!(report.entries[1].population, Some(376_187));
        assert_eq!(report.entries[1].incidence, CellValue::Value(dec!(10)));
        assert_eq!(report.entries[1].class, BurdenClass::BelowMedian);
        assert_eq!(report.thresholds, BurdenThresholds::Median { median: 15.0 });
    }

    #[test]
    fn test_regions_without_districts_have_no_burden() {
        let mut tree = OrgUnitTree::new();
        tree.extend([
            OrgUnit::new("UG", "MOH - Uganda", OrgUnitLevel::National, None),
            OrgUnit::new("ACH", "Acholi Region", OrgUnitLevel::Region, Some("UG")),
        ]);
        let registry = PopulationRegistry::new();
        let period = PeriodSpec::Month { year: 2024, month: 3 }.resolve().unwrap();
        let cases = HashMap::from([("ACH".to_string(), dec!(5000))]);
        let report = build_burden_report(&context(&tree, &registry), "UG", &period, &cases).unwrap();
        assert_eq!(report.entries[0].population, None);
        assert_eq!(report.entries[0].class, BurdenClass::NoData);
    }

    #[test]
    fn test_reporting_report_for_a_month() {
        let tree = sample_tree();
        let registry = PopulationRegistry::new();
        let period = PeriodSpec::Month { year: 2024, month: 1 }.resolve().unwrap();
        let week = |n| WeekBucket::new(2024, n).unwrap();
        let rates = BTreeMap::from([
            (week(1), dec!(96.4)),
            (week(2), dec!(88)),
            (week(3), dec!(71.25)),
            (week(5), dec!(52)),
            // Outside January, ignored
            (week(9), dec!(10)),
        ]);

        let report = build_reporting_report(&context(&tree, &registry), "GUL", &period, &rates).unwrap();
        assert_eq!(report.indicator, "HMIS 033b - Reporting Rate");
        assert_eq!(report.weeks.len(), 5);
        assert_eq!(report.weeks[0].week, week(5));
        assert_eq!(report.weeks[0].color, ColorCategory::Red);
        assert_eq!(report.weeks[1].rate, CellValue::NotAvailable);
        assert_eq!(report.weeks[4].color, ColorCategory::Green);

        // (96.4 + 88 + 71.25 + 52) / 4
        assert_eq!(report.summary.average, CellValue::Value(dec!(76.91)));
        assert_eq!(report.summary.reported_weeks, 4);
        assert_eq!(report.summary.weeks_at_or_above_90, 1);
        assert_eq!(report.summary.weeks_below_70, 1);
    }

    #[test]
    fn test_burden_report_for_region() {
        let tree = sample_tree();
        let registry = PopulationRegistry::new();
        let period = PeriodSpec::Month { year: 2024, month: 3 }.resolve().unwrap();
        let cases = HashMap::from([
            ("GUL".to_string(), dec!(1353.73)),
            ("AMU".to_string(), dec!(481.628)),
        ]);
        let report = build_burden_report(&context(&tree, &registry), "ACH", &period, &cases).unwrap();
        assert_eq!(report.entries.len(), 2);
        assert_eq!(report.entries[0].org_unit, "GUL");
        assert_eq!(report.entries[0].incidence, CellValue::Value(dec!(10)));
        assert_eq!(report.entries[1].incidence, CellValue::Value(dec!(2)));
        assert_eq!(report.entries[0].class, BurdenClass::AboveMedian);
    }
}
