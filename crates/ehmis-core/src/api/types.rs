//! DHIS2 wire types and their conversion into domain models.

use std::collections::{BTreeMap, HashMap};

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

use crate::models::{OrgUnit, OrgUnitLevel, RawCounts};
use crate::period::{MonthBucket, WeekBucket};

use super::ApiError;

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub(crate) struct MeResponse {
    pub id: String,
    #[serde(default)]
    pub username: Option<String>,
    pub display_name: String,
    #[serde(default)]
    pub organisation_units: Vec<IdRef>,
}

#[derive(Debug, Clone, Deserialize)]
pub(crate) struct IdRef {
    pub id: String,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub(crate) struct OrgUnitResponse {
    pub id: String,
    pub display_name: String,
    pub level: u8,
    #[serde(default)]
    pub parent: Option<IdRef>,
    #[serde(default)]
    pub ancestors: Vec<OrgUnitResponse>,
    #[serde(default)]
    pub children: Vec<OrgUnitResponse>,
}

impl OrgUnitResponse {
    fn to_org_unit(&self, parent: Option<&str>) -> Option<OrgUnit> {
        let Some(level) = OrgUnitLevel::from_level(self.level) else {
            warn!(org_unit = %self.id, level = self.level, "Skipping org unit with unknown level");
            return None;
        };
        let parent = parent.or(self.parent.as_ref().map(|p| p.id.as_str()));
        Some(OrgUnit::new(&self.id, &self.display_name, level, parent))
    }

    /// The unit, its ancestors and its children as tree nodes.
    ///
    /// DHIS2 lists ancestors root first without parent links, so each one is
    /// parented to the ancestor before it.
    pub fn into_org_units(self) -> Vec<OrgUnit> {
        let mut units = Vec::with_capacity(1 + self.ancestors.len() + self.children.len());
        let mut previous: Option<String> = None;
        for ancestor in &self.ancestors {
            if let Some(unit) = ancestor.to_org_unit(previous.as_deref()) {
                previous = Some(unit.id.clone());
                units.push(unit);
            }
        }
        let parent = self.parent.as_ref().map(|p| p.id.clone()).or(previous);
        if let Some(unit) = self.to_org_unit(parent.as_deref()) {
            units.push(unit);
        }
        units.extend(self.children.iter().filter_map(|c| c.to_org_unit(Some(&self.id))));
        units
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DataElement {
    pub id: String,
    pub code: String,
    pub display_name: String,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub(crate) struct DataElementsResponse {
    #[serde(default)]
    pub data_elements: Vec<DataElement>,
}

/// An indicator found by name, e.g. a WASH proportion.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct IndicatorRef {
    pub id: String,
    pub display_name: String,
}

#[derive(Debug, Deserialize)]
pub(crate) struct IndicatorsResponse {
    #[serde(default)]
    pub indicators: Vec<IndicatorRef>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct AnalyticsHeader {
    pub name: String,
}

/// `/analytics` JSON: column headers plus string rows.
#[derive(Debug, Clone, Deserialize)]
pub struct AnalyticsResponse {
    #[serde(default)]
    pub headers: Vec<AnalyticsHeader>,
    #[serde(default)]
    pub rows: Vec<Vec<String>>,
}

struct Columns {
    dx: usize,
    pe: usize,
    ou: Option<usize>,
    value: usize,
}

impl AnalyticsResponse {
    fn columns(&self) -> Result<Columns, ApiError> {
        let find = |name: &str| self.headers.iter().position(|h| h.name == name);
        let (Some(dx), Some(pe)) = (find("dx"), find("pe")) else {
            return Err(ApiError::InvalidResponse(
                "analytics response is missing dx/pe headers".to_string(),
            ));
        };
        // The value column is last unless named
        let value = find("value").unwrap_or(self.headers.len().saturating_sub(1));
        Ok(Columns {
            dx,
            pe,
            ou: find("ou"),
            value,
        })
    }

    fn parse_value(raw: &str) -> Decimal {
        raw.trim().parse().unwrap_or_else(|_| {
            debug!(value = raw, "Unparsable analytics value, reading as zero");
            Decimal::ZERO
        })
    }

    /// Fold the rows into monthly counts. `codes` maps DHIS2 ids to the
    /// codes the catalog uses; unmapped ids are kept verbatim.
    pub fn to_raw_counts(&self, codes: &HashMap<String, String>) -> Result<RawCounts, ApiError> {
        let columns = self.columns()?;
        let mut counts = RawCounts::new();
        for row in &self.rows {
            let (Some(dx), Some(pe), Some(value)) =
                (row.get(columns.dx), row.get(columns.pe), row.get(columns.value))
            else {
                debug!(row = ?row, "Skipping short analytics row");
                continue;
            };
            let Ok(bucket) = pe.parse::<MonthBucket>() else {
                debug!(period = %pe, "Skipping non-monthly analytics row");
                continue;
            };
            let code = codes.get(dx).map(String::as_str).unwrap_or(dx);
            counts.add(bucket, code, Self::parse_value(value));
        }
        Ok(counts)
    }

    /// One value per ISO week; rows for other period types are skipped.
    pub fn weekly_values(&self) -> Result<BTreeMap<WeekBucket, Decimal>, ApiError> {
        let columns = self.columns()?;
        let mut values = BTreeMap::new();
        for row in &self.rows {
            let (Some(pe), Some(value)) = (row.get(columns.pe), row.get(columns.value)) else {
                debug!(row = ?row, "Skipping short analytics row");
                continue;
            };
            match pe.parse::<WeekBucket>() {
                Ok(week) => {
                    values.insert(week, Self::parse_value(value));
                }
                Err(_) => debug!(period = %pe, "Skipping non-weekly analytics row"),
            }
        }
        Ok(values)
    }

    /// Sum every row per org unit, across periods and data elements.
    pub fn totals_by_org_unit(&self) -> Result<HashMap<String, Decimal>, ApiError> {
        let columns = self.columns()?;
        let Some(ou_column) = columns.ou else {
            return Err(ApiError::InvalidResponse(
                "analytics response is missing the ou header".to_string(),
            ));
        };
        let mut totals: HashMap<String, Decimal> = HashMap::new();
        for row in &self.rows {
            if let (Some(ou), Some(value)) = (row.get(ou_column), row.get(columns.value)) {
                *totals.entry(ou.clone()).or_default() += Self::parse_value(value);
            }
        }
        Ok(totals)
    }
}
