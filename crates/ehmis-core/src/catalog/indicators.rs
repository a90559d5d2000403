//! Indicator metadata.
//!
//! Three kinds of entries live here:
//! - `IndicatorMeta`: one per DHIS2 data element code, with the share of the
//!   total population that forms its target group
//! - `RateDefinition`: derived ratios over other codes (ANC, intrapartum and
//!   PNC proportions, mortality rates)
//! - `DropoutPair` and `WashIndicator`: fixed dose pairs and the
//!   pre-calculated CHW household indicators
//!
//! The catalog is built once behind a `OnceLock` and shared read-only.

use std::collections::HashMap;
use std::sync::OnceLock;

use rust_decimal::Decimal;
use rust_decimal_macros::dec;
use serde::Serialize;

use crate::error::AnalyticsError;

// ============================================================================
// Constants
// ============================================================================

/// Share of the population under one year, used for infant antigens.
const INFANT_TARGET_PCT: Decimal = dec!(4.3);

/// Share of the population expected to be born in a year; birth doses.
const BIRTH_TARGET_PCT: Decimal = dec!(4.85);

/// Expected pregnancies are 5 % of the population.
const EXPECTED_PREGNANCY_PCT: Decimal = dec!(5);

/// National EPI coverage goal.
const EPI_PERFORMANCE_TARGET: Decimal = dec!(95);

/// CHW household WASH goal.
const WASH_PERFORMANCE_TARGET: Decimal = dec!(75);

/// Confirmed malaria cases data element.
pub const MALARIA_CASES_CODE: &str = "033B-CD01a";

/// HMIS 033b weekly surveillance dataset, as its DHIS2 reporting-rate
/// metric (`<dataSet>.REPORTING_RATE`).
pub const REPORTING_RATE_ID: &str = "C4oUitImBPK.REPORTING_RATE";
pub const REPORTING_RATE_NAME: &str = "HMIS 033b - Reporting Rate";

/// DHIS2 code prefixes fetched per category.
pub const EPI_CODE_PREFIX: &str = "105-CL";
pub const ANC_CODE_PREFIX: &str = "105-AN";
pub const DELIVERY_CODE_PREFIX: &str = "105-DL";
pub const PNC_CODE_PREFIX: &str = "105-PN";

pub const ANC1_CODE: &str = "105-AN01a";
pub const LIVE_BIRTHS_CODE: &str = "105-DL02";

// ============================================================================
// Types
// ============================================================================

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Category {
    Epi,
    Anc,
    Intrapartum,
    Pnc,
    Wash,
    Malaria,
}

impl Category {
    pub fn name(&self) -> &'static str {
        match self {
            Category::Epi => "EPI",
            Category::Anc => "ANC",
            Category::Intrapartum => "Intrapartum",
            Category::Pnc => "PNC",
            Category::Wash => "WASH",
            Category::Malaria => "Malaria",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Polarity {
    HigherIsBetter,
    LowerIsBetter,
}

/// Multiplier applied to a ratio.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum RateScale {
    Percent,
    PerThousand,
    PerHundredThousand,
}

impl RateScale {
    pub fn factor(&self) -> Decimal {
        match self {
            RateScale::Percent => dec!(100),
            RateScale::PerThousand => dec!(1000),
            RateScale::PerHundredThousand => dec!(100000),
        }
    }

    pub fn unit(&self) -> &'static str {
        match self {
            RateScale::Percent => "%",
            RateScale::PerThousand => "per 1,000",
            RateScale::PerHundredThousand => "per 100,000",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct IndicatorMeta {
    pub code: &'static str,
    pub key: &'static str,
    pub display_name: &'static str,
    pub category: Category,
    /// Percent of the total population forming the target group. Zero when
    /// the element has no population denominator.
    pub target_population_pct: Decimal,
    /// Goal used for target-relative colouring.
    pub performance_target: Decimal,
    pub polarity: Polarity,
}

impl IndicatorMeta {
    pub fn has_population_target(&self) -> bool {
        self.target_population_pct > Decimal::ZERO
    }
}

/// A ratio over other data elements, e.g. KMC initiations per LBW baby.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RateDefinition {
    pub key: &'static str,
    pub display_name: &'static str,
    pub category: Category,
    /// Summed to form the numerator.
    pub numerator: &'static [&'static str],
    pub denominator: &'static str,
    pub scale: RateScale,
    pub target: Decimal,
    pub polarity: Polarity,
}

/// First and last dose of a multi-dose series.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct DropoutPair {
    pub label: &'static str,
    pub first: &'static str,
    pub last: &'static str,
}

/// A CHW household indicator DHIS2 already reports as a percentage. These
/// have no stable code, so they are found by display-name search.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct WashIndicator {
    pub key: &'static str,
    pub display_name: &'static str,
    pub short_name: &'static str,
    pub search_pattern: &'static str,
    pub target: Decimal,
}

// ============================================================================
// Static tables
// ============================================================================

fn epi(code: &'static str, key: &'static str, display_name: &'static str, pct: Decimal) -> IndicatorMeta {
    IndicatorMeta {
        code,
        key,
        display_name,
        category: Category::Epi,
        target_population_pct: pct,
        performance_target: EPI_PERFORMANCE_TARGET,
        polarity: Polarity::HigherIsBetter,
    }
}

fn element(
    code: &'static str,
    key: &'static str,
    display_name: &'static str,
    category: Category,
    pct: Decimal,
    target: Decimal,
) -> IndicatorMeta {
    IndicatorMeta {
        code,
        key,
        display_name,
        category,
        target_population_pct: pct,
        performance_target: target,
        polarity: Polarity::HigherIsBetter,
    }
}

fn epi_indicators() -> Vec<IndicatorMeta> {
    vec![
        epi("105-CL01", "BCG", "BCG", BIRTH_TARGET_PCT),
        epi("105-CL02", "HEPB_BIRTH", "Hepatitis B birth dose", BIRTH_TARGET_PCT),
        epi("105-CL03", "PAB", "Protected at birth", BIRTH_TARGET_PCT),
        epi("105-CL04", "OPV0", "Polio 0", BIRTH_TARGET_PCT),
        epi("105-CL05", "OPV1", "Polio 1", INFANT_TARGET_PCT),
        epi("105-CL06", "OPV2", "Polio 2", INFANT_TARGET_PCT),
        epi("105-CL07", "OPV3", "Polio 3", INFANT_TARGET_PCT),
        epi("105-CL08", "IPV1", "IPV 1", INFANT_TARGET_PCT),
        epi("105-CL09", "IPV2", "IPV 2", INFANT_TARGET_PCT),
        epi("105-CL10", "DPT1", "DPT-HepB-Hib 1", INFANT_TARGET_PCT),
        epi("105-CL11", "DPT2", "DPT-HepB-Hib 2", INFANT_TARGET_PCT),
        epi("105-CL12", "DPT3", "DPT-HepB-Hib 3", INFANT_TARGET_PCT),
        epi("105-CL13", "PCV1", "PCV 1", INFANT_TARGET_PCT),
        epi("105-CL14", "PCV2", "PCV 2", INFANT_TARGET_PCT),
        epi("105-CL15", "PCV3", "PCV 3", INFANT_TARGET_PCT),
        epi("105-CL16", "ROTA1", "Rotavirus 1", INFANT_TARGET_PCT),
        epi("105-CL17", "ROTA2", "Rotavirus 2", INFANT_TARGET_PCT),
        epi("105-CL18", "ROTA3", "Rotavirus 3", INFANT_TARGET_PCT),
        epi("105-CL19", "MALARIA1", "Malaria vaccine 1", INFANT_TARGET_PCT),
        epi("105-CL20", "MALARIA2", "Malaria vaccine 2", INFANT_TARGET_PCT),
        epi("105-CL21", "MALARIA3", "Malaria vaccine 3", INFANT_TARGET_PCT),
        epi("105-CL22", "YELLOW_FEVER", "Yellow fever", INFANT_TARGET_PCT),
        epi("105-CL23", "MR1", "Measles-Rubella 1", INFANT_TARGET_PCT),
        epi("105-CL24", "FULLY_IMMUNIZED_1YR", "Fully immunized by 1 year", INFANT_TARGET_PCT),
        epi("105-CL25", "LLINS", "LLINs given", INFANT_TARGET_PCT),
        epi("105-CL26", "MALARIA4", "Malaria vaccine 4", INFANT_TARGET_PCT),
        epi("105-CL27", "MR2", "Measles-Rubella 2", INFANT_TARGET_PCT),
        epi("105-CL28", "FULLY_IMMUNIZED_2YR", "Fully immunized by 2 years", INFANT_TARGET_PCT),
    ]
}

fn maternal_elements() -> Vec<IndicatorMeta> {
    use Category::{Anc, Intrapartum, Pnc};
    let none = Decimal::ZERO;
    vec![
        element("105-AN01a", "ANC1", "ANC 1st visit", Anc, EXPECTED_PREGNANCY_PCT, dec!(100)),
        element("105-AN01b", "ANC1_FIRST_TRIMESTER", "ANC 1st visit in 1st trimester", Anc, none, dec!(45)),
        element("105-AN02", "ANC4", "ANC 4th visit", Anc, EXPECTED_PREGNANCY_PCT, dec!(60)),
        element("105-AN03", "ANC8", "ANC 8th visit", Anc, EXPECTED_PREGNANCY_PCT, dec!(20)),
        element("105-AN04a", "IPT1", "IPT 1st dose", Anc, none, none),
        element("105-AN04b", "IPT2", "IPT 2nd dose", Anc, none, none),
        element("105-AN04c", "IPT3", "IPT 3rd dose", Anc, none, dec!(85)),
        element("105-AN05", "HB_TESTED", "Hb tested", Anc, none, dec!(75)),
        element("105-AN06", "IRON_FOLIC", "Iron/folic acid given", Anc, none, dec!(75)),
        element("105-AN07", "ULTRASOUND", "Ultrasound done", Anc, none, dec!(40)),
        element("105-AN08", "TEEN_ANC1", "Teen pregnancies at ANC1", Anc, none, dec!(15)),
        element("105-DL01", "DELIVERIES", "Deliveries in unit", Intrapartum, EXPECTED_PREGNANCY_PCT, dec!(68)),
        element("105-DL02", "LIVE_BIRTHS", "Live births", Intrapartum, none, none),
        element("105-DL03", "LBW", "Low birth weight babies", Intrapartum, none, none),
        element("105-DL04", "KMC", "KMC initiated", Intrapartum, none, none),
        element("105-DL05", "ASPHYXIA", "Babies with birth asphyxia", Intrapartum, none, none),
        element("105-DL06", "RESUSCITATED", "Babies resuscitated", Intrapartum, none, none),
        element("105-DL07", "FRESH_STILLBIRTH", "Fresh stillbirths", Intrapartum, none, none),
        element("105-DL08", "MACERATED_STILLBIRTH", "Macerated stillbirths", Intrapartum, none, none),
        element("105-DL09", "NEONATAL_DEATH", "Neonatal deaths", Intrapartum, none, none),
        element("105-DL10", "MATERNAL_DEATH", "Maternal deaths", Intrapartum, none, none),
        element("105-PN01", "BREASTFED_1HR", "Breastfed within 1 hour", Pnc, none, none),
        element("105-PN02", "PNC_24HRS", "PNC within 24 hours", Pnc, none, none),
        element("105-PN03", "PNC_6DAYS", "PNC at 6 days", Pnc, none, none),
        element("105-PN04", "PNC_6WEEKS", "PNC at 6 weeks", Pnc, none, none),
        element(MALARIA_CASES_CODE, "MALARIA_CONFIRMED", "Malaria (confirmed) cases", Category::Malaria, none, none),
    ]
}

#[allow(clippy::too_many_arguments)]
fn rate(
    key: &'static str,
    display_name: &'static str,
    category: Category,
    numerator: &'static [&'static str],
    denominator: &'static str,
    scale: RateScale,
    target: Decimal,
    polarity: Polarity,
) -> RateDefinition {
    RateDefinition {
        key,
        display_name,
        category,
        numerator,
        denominator,
        scale,
        target,
        polarity,
    }
}

fn rate_definitions() -> Vec<RateDefinition> {
    use Category::{Anc, Intrapartum, Pnc};
    use Polarity::{HigherIsBetter as Higher, LowerIsBetter as Lower};
    use RateScale::{Percent, PerHundredThousand, PerThousand};

    vec![
        rate("anc1_first_trimester", "ANC1 in 1st trimester", Anc, &["105-AN01b"], ANC1_CODE, Percent, dec!(45), Higher),
        rate("ipt3", "IPT3 coverage", Anc, &["105-AN04c"], ANC1_CODE, Percent, dec!(85), Higher),
        rate("hb_testing", "Hb testing", Anc, &["105-AN05"], ANC1_CODE, Percent, dec!(75), Higher),
        rate("iron_folic", "Iron/folic acid", Anc, &["105-AN06"], ANC1_CODE, Percent, dec!(75), Higher),
        rate("ultrasound", "Ultrasound", Anc, &["105-AN07"], ANC1_CODE, Percent, dec!(40), Higher),
        rate("teen_pregnancy", "Teen pregnancy", Anc, &["105-AN08"], ANC1_CODE, Percent, dec!(15), Lower),
        rate("lbw", "Low birth weight", Intrapartum, &["105-DL03"], LIVE_BIRTHS_CODE, Percent, dec!(5), Lower),
        rate("kmc_initiation", "KMC initiation", Intrapartum, &["105-DL04"], "105-DL03", Percent, dec!(100), Higher),
        rate("birth_asphyxia", "Birth asphyxia", Intrapartum, &["105-DL05"], LIVE_BIRTHS_CODE, Percent, dec!(1), Lower),
        rate("resuscitated", "Asphyxia resuscitated", Intrapartum, &["105-DL06"], "105-DL05", Percent, dec!(100), Higher),
        rate("fresh_stillbirth", "Fresh stillbirth rate", Intrapartum, &["105-DL07"], LIVE_BIRTHS_CODE, PerThousand, dec!(5), Lower),
        rate("neonatal_mortality", "Neonatal mortality rate", Intrapartum, &["105-DL09"], LIVE_BIRTHS_CODE, PerThousand, dec!(5), Lower),
        rate("perinatal_mortality", "Perinatal mortality rate", Intrapartum, &["105-DL07", "105-DL09"], LIVE_BIRTHS_CODE, PerThousand, dec!(12), Lower),
        rate("maternal_mortality", "Maternal mortality ratio", Intrapartum, &["105-DL10"], LIVE_BIRTHS_CODE, PerHundredThousand, dec!(20), Lower),
        rate("breastfeeding_1hr", "Breastfed within 1 hour", Pnc, &["105-PN01"], LIVE_BIRTHS_CODE, Percent, dec!(90), Higher),
        rate("pnc_24hrs", "PNC within 24 hours", Pnc, &["105-PN02"], LIVE_BIRTHS_CODE, Percent, dec!(90), Higher),
        rate("pnc_6days", "PNC at 6 days", Pnc, &["105-PN03"], LIVE_BIRTHS_CODE, Percent, dec!(70), Higher),
        rate("pnc_6weeks", "PNC at 6 weeks", Pnc, &["105-PN04"], LIVE_BIRTHS_CODE, Percent, dec!(70), Higher),
    ]
}

fn dropout_pairs() -> Vec<DropoutPair> {
    let pair = |label, first, last| DropoutPair { label, first, last };
    vec![
        pair("DPT1 to DPT3", "105-CL10", "105-CL12"),
        pair("Polio1 to Polio3", "105-CL05", "105-CL07"),
        pair("BCG to MR1", "105-CL01", "105-CL23"),
        pair("PCV1 to PCV3", "105-CL13", "105-CL15"),
        pair("Rota1 to Rota3", "105-CL16", "105-CL18"),
        pair("Malaria1 to Malaria2", "105-CL19", "105-CL20"),
        pair("Malaria2 to Malaria3", "105-CL20", "105-CL21"),
        pair("Malaria3 to Malaria4", "105-CL21", "105-CL26"),
        pair("Malaria1 to Malaria4", "105-CL19", "105-CL26"),
    ]
}

fn wash_indicators() -> Vec<WashIndicator> {
    let wash = |key, display_name, short_name, search_pattern| WashIndicator {
        key,
        display_name,
        short_name,
        search_pattern,
        target: WASH_PERFORMANCE_TARGET,
    };
    vec![
        wash(
            "WASH_LATRINES",
            "Households with Latrines",
            "Latrines",
            "CHW - proportion of households with latrines",
        ),
        wash(
            "WASH_IMPROVED_LATRINES",
            "Households with Improved Latrines",
            "Improved Latrines",
            "CHW - proportion of households with Improved latrines",
        ),
        wash(
            "WASH_HANDWASHING",
            "Households with Handwashing Facilities",
            "Handwashing",
            "CHW - proportion of households with handwashing facilities",
        ),
        wash(
            "WASH_SAFE_WATER",
            "Households with Safe Drinking Water",
            "Safe Water",
            "CHW - proportion of households with source safe drinking water",
        ),
        wash(
            "WASH_ODF",
            "Open Defecation Free Households",
            "ODF",
            // DHIS2 spells it this way
            "CHW - proportion of households that are open defeacation free",
        ),
    ]
}

// ============================================================================
// Catalog
// ============================================================================

pub struct IndicatorCatalog {
    indicators: Vec<IndicatorMeta>,
    by_code: HashMap<&'static str, usize>,
    rates: Vec<RateDefinition>,
    dropout_pairs: Vec<DropoutPair>,
    wash: Vec<WashIndicator>,
}

impl IndicatorCatalog {
    /// The process-wide catalog.
    pub fn global() -> &'static IndicatorCatalog {
        static CATALOG: OnceLock<IndicatorCatalog> = OnceLock::new();
        CATALOG.get_or_init(IndicatorCatalog::build)
    }

    fn build() -> Self {
        let indicators: Vec<IndicatorMeta> = epi_indicators()
            .into_iter()
            .chain(maternal_elements())
            .collect();
        let by_code = indicators
            .iter()
            .enumerate()
            .map(|(i, meta)| (meta.code, i))
            .collect();
        Self {
            indicators,
            by_code,
            rates: rate_definitions(),
            dropout_pairs: dropout_pairs(),
            wash: wash_indicators(),
        }
    }

    pub fn get(&self, code: &str) -> Result<&IndicatorMeta, AnalyticsError> {
        self.by_code
            .get(code)
            .map(|&i| &self.indicators[i])
            .ok_or_else(|| AnalyticsError::UnknownIndicator(code.to_string()))
    }

    /// Look up by short key, e.g. `DPT3`.
    pub fn by_key(&self, key: &str) -> Result<&IndicatorMeta, AnalyticsError> {
        self.indicators
            .iter()
            .find(|m| m.key.eq_ignore_ascii_case(key))
            .ok_or_else(|| AnalyticsError::UnknownIndicator(key.to_string()))
    }

    /// Indicators of one category, in catalog order.
    pub fn by_category(&self, category: Category) -> Vec<&IndicatorMeta> {
        self.indicators
            .iter()
            .filter(|m| m.category == category)
            .collect()
    }

    pub fn codes(&self, category: Category) -> Vec<&'static str> {
        self.by_category(category).iter().map(|m| m.code).collect()
    }

    pub fn rates(&self, category: Category) -> Vec<&RateDefinition> {
        self.rates.iter().filter(|r| r.category == category).collect()
    }

    pub fn rate(&self, key: &str) -> Result<&RateDefinition, AnalyticsError> {
        self.rates
            .iter()
            .find(|r| r.key == key)
            .ok_or_else(|| AnalyticsError::UnknownIndicator(key.to_string()))
    }

    pub fn dropout_pairs(&self) -> &[DropoutPair] {
        &self.dropout_pairs
    }

    pub fn wash_indicators(&self) -> &[WashIndicator] {
        &self.wash
    }

    pub fn wash_indicator(&self, key: &str) -> Result<&WashIndicator, AnalyticsError> {
        self.wash
            .iter()
            .find(|w| w.key == key)
            .ok_or_else(|| AnalyticsError::UnknownIndicator(key.to_string()))
    }

    pub fn len(&self) -> usize {
        self.indicators.len()
    }

    pub fn is_empty(&self) -> bool {
        self.indicators.is_empty()
    }
}
