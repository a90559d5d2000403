//! Coverage engine.
//!
//! coverage % = doses / target population x 100, where the target population
//! is the base population x the indicator's target share / 100 / the period
//! divisor. Arithmetic stays in `Decimal` until the final two-place rounding.

use rust_decimal::Decimal;
use rust_decimal_macros::dec;
use tracing::{debug, warn};

use crate::catalog::{IndicatorCatalog, PopulationRegistry};
use crate::error::AnalyticsError;
use crate::models::{
    round_display, scale_for_display, CellValue, ColorCategory, CoverageResult, OrgUnitLevel,
    OrgUnitTree,
};
use crate::period::ResolvedPeriod;

/// Lower bound of the green tier.
pub const GREEN_THRESHOLD: Decimal = dec!(95);

/// Lower bound of the yellow tier.
pub const YELLOW_THRESHOLD: Decimal = dec!(70);

/// RED categorisation. Lower bounds are inclusive; green has no upper bound.
pub fn coverage_color(percentage: Decimal) -> ColorCategory {
    if percentage >= GREEN_THRESHOLD {
        ColorCategory::Green
    } else if percentage >= YELLOW_THRESHOLD {
        ColorCategory::Yellow
    } else {
        ColorCategory::Red
    }
}

/// Colour for a cell; `N/A` is gray.
pub fn cell_color(cell: CellValue) -> ColorCategory {
    match cell {
        CellValue::Value(v) => coverage_color(v),
        CellValue::NotAvailable => ColorCategory::Gray,
    }
}

/// Annual base population pro-rated to the period.
pub fn target_population(base: u64, target_pct: Decimal, divisor: u32) -> Decimal {
    if divisor == 0 {
        return Decimal::ZERO;
    }
    Decimal::from(base) * target_pct / dec!(100) / Decimal::from(divisor)
}

/// `raw / target x 100`, rounded for display.
pub fn coverage_percentage(raw: Decimal, target: Decimal) -> Result<Decimal, AnalyticsError> {
    if target <= Decimal::ZERO {
        return Err(AnalyticsError::DivisionByZero("target population"));
    }
    let ratio = raw
        .checked_div(target)
        .ok_or(AnalyticsError::Overflow("coverage percentage"))?;
    scale_for_display(ratio, dec!(100), "coverage percentage")
}

/// Population an org unit's targets are drawn from.
///
/// - facilities with a custom catchment use it
/// - units above district level sum their districts
/// - everything else inherits its district's UBOS estimate
///
/// An unmatched district name yields zero, which surfaces as `N/A`.
pub fn base_population(
    tree: &OrgUnitTree,
    registry: &PopulationRegistry,
    org_unit: &str,
) -> Result<u64, AnalyticsError> {
    let unit = tree.get(org_unit)?;

    if unit.is_facility() {
        if let Some(catchment) = unit
            .custom_catchment
            .or_else(|| registry.custom_catchment(&unit.id))
        {
            debug!(org_unit = %unit.id, catchment, "Using custom catchment");
            return Ok(catchment);
        }
    }

    if unit.level.is_above_district() {
        let districts = tree.districts_under(&unit.id);
        if districts.is_empty() && unit.level == OrgUnitLevel::National {
            return Ok(registry.national_total());
        }
        return Ok(districts
            .iter()
            .map(|d| registry.population(&d.name).unwrap_or(0))
            .sum());
    }

    let Some(district) = tree.district_of(&unit.id)? else {
        warn!(org_unit = %unit.id, "No district ancestor in tree");
        return Ok(0);
    };
    match registry.population(&district.name) {
        Some(population) => Ok(population),
        None => {
            warn!(district = %district.name, "District not found in UBOS table");
            Ok(0)
        }
    }
}

/// Coverage for one (org unit, period, indicator) cell.
///
/// A zero target renders as `N/A`. Unknown indicator codes and org units
/// reject the request.
pub fn compute_coverage(
    tree: &OrgUnitTree,
    registry: &PopulationRegistry,
    catalog: &IndicatorCatalog,
    org_unit: &str,
    period: &ResolvedPeriod,
    indicator_code: &str,
    raw_count: Decimal,
) -> Result<CoverageResult, AnalyticsError> {
    let meta = catalog.get(indicator_code)?;
    let base = base_population(tree, registry, org_unit)?;
    let target = target_population(base, meta.target_population_pct, period.divisor);
    let percentage = CellValue::from_result(coverage_percentage(raw_count, target))?;

    Ok(CoverageResult {
        org_unit: org_unit.to_string(),
        period: period.spec,
        indicator_code: meta.code.to_string(),
        numerator: raw_count,
        denominator: round_display(target),
        percentage,
        color: cell_color(percentage),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{OrgUnit, OrgUnitLevel};
    use crate::period::PeriodSpec;
    use crate::test_support::sample_tree;

    fn month() -> ResolvedPeriod {
        PeriodSpec::Month { year: 2024, month: 1 }.resolve().unwrap()
    }

    #[test]
    fn test_color_boundaries() {
        assert_eq!(coverage_color(dec!(95.0)), ColorCategory::Green);
        assert_eq!(coverage_color(dec!(94.9)), ColorCategory::Yellow);
        assert_eq!(coverage_color(dec!(70.0)), ColorCategory::Yellow);
        assert_eq!(coverage_color(dec!(69.9)), ColorCategory::Red);
        assert_eq!(coverage_color(dec!(250)), ColorCategory::Green);
        assert_eq!(coverage_color(dec!(-5)), ColorCategory::Red);
    }

    #[test]
    fn test_color_partition_is_total() {
        let mut p = dec!(-10);
        while p <= dec!(150) {
            let c = coverage_color(p);
            assert!(matches!(c, ColorCategory::Green | ColorCategory::Yellow | ColorCategory::Red));
            p += dec!(0.1);
        }
    }

    #[test]
    fn test_overflowing_count_is_not_available() {
        let result = coverage_percentage(Decimal::MAX, dec!(50));
        assert_eq!(result, Err(AnalyticsError::Overflow("coverage percentage")));
        assert_eq!(CellValue::from_result(result), Ok(CellValue::NotAvailable));
    }

    #[test]
    fn test_raw_equal_to_target_is_exactly_100() {
        let catalog = IndicatorCatalog::global();
        let registry = PopulationRegistry::new();
        let tree = sample_tree();
        let period = month();

        for meta in catalog.by_category(crate::catalog::Category::Epi) {
            for org_unit in ["GUL", "FAC", "ACH"] {
                let base = base_population(&tree, &registry, org_unit).unwrap();
                let target = target_population(base, meta.target_population_pct, period.divisor);
                let result = compute_coverage(&tree, &registry, catalog, org_unit, &period, meta.code, target).unwrap();
                assert_eq!(result.percentage, CellValue::Value(dec!(100)));
                assert_eq!(result.percentage.to_string(), "100.00");
                assert_eq!(result.color, ColorCategory::Green);
            }
        }
    }

    #[test]
    fn test_gulu_dpt3_monthly() {
        // 135,373 x 4.3 % / 12 = 485.09... children per month
        let result = compute_coverage(
            &sample_tree(),
            &PopulationRegistry::new(),
            IndicatorCatalog::global(),
            "GUL",
            &month(),
            "105-CL12",
            dec!(400),
        )
        .unwrap();
        assert_eq!(result.denominator, dec!(485.09));
        assert_eq!(result.percentage, CellValue::Value(dec!(82.46)));
        assert_eq!(result.color, ColorCategory::Yellow);
    }

    #[test]
    fn test_facility_catchment_overrides_district() {
        let mut tree = sample_tree();
        tree.insert(
            OrgUnit::new("FAC2", "Lalogi HC IV", OrgUnitLevel::Facility, Some("PAR")).with_catchment(12_000),
        );
        let registry = PopulationRegistry::new();
        assert_eq!(base_population(&tree, &registry, "FAC2").unwrap(), 12_000);
        assert_eq!(base_population(&tree, &registry, "FAC").unwrap(), 135_373);

        let mut registry = PopulationRegistry::new();
        registry.set_catchment("FAC", 6_000);
        assert_eq!(base_population(&tree, &registry, "FAC").unwrap(), 6_000);
    }

    #[test]
    fn test_region_sums_its_districts() {
        let base = base_population(&sample_tree(), &PopulationRegistry::new(), "ACH").unwrap();
        assert_eq!(base, 135_373 + 240_814);
    }

    #[test]
    fn test_zero_target_is_not_available() {
        let mut tree = OrgUnitTree::new();
        tree.insert(OrgUnit::new("X", "Atlantis District", OrgUnitLevel::District, None));
        let result = compute_coverage(
            &tree,
            &PopulationRegistry::new(),
            IndicatorCatalog::global(),
            "X",
            &month(),
            "105-CL01",
            dec!(10),
        )
        .unwrap();
        assert_eq!(result.percentage, CellValue::NotAvailable);
        assert_eq!(result.color, ColorCategory::Gray);
        assert_eq!(result.percentage.to_string(), "N/A");
    }

    #[test]
    fn test_lookup_misses_reject_request() {
        let tree = sample_tree();
        let registry = PopulationRegistry::new();
        let catalog = IndicatorCatalog::global();
        assert!(matches!(
            compute_coverage(&tree, &registry, catalog, "GUL", &month(), "105-XX99", dec!(1)),
            Err(AnalyticsError::UnknownIndicator(_))
        ));
        assert!(matches!(
            compute_coverage(&tree, &registry, catalog, "NOPE", &month(), "105-CL01", dec!(1)),
            Err(AnalyticsError::UnknownOrgUnit(_))
        ));
    }
}
