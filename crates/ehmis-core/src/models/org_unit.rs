//! Administrative hierarchy.
//!
//! DHIS2 organises Uganda's health system as a six-level tree. Only district
//! nodes carry a population denominator (from the UBOS table); facilities may
//! carry a custom catchment that overrides the inherited district figure.

use std::collections::HashMap;

use serde::{Deserialize, Serialize};
use tracing::warn;

use crate::error::AnalyticsError;

/// Upper bound on ancestor walks; the hierarchy has six levels.
const MAX_TREE_DEPTH: usize = 6;

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum OrgUnitLevel {
    National,
    Region,
    District,
    SubCounty,
    Parish,
    Facility,
}

impl OrgUnitLevel {
    /// Map a DHIS2 `level` number (1 = national) to a level.
    pub fn from_level(level: u8) -> Option<Self> {
        match level {
            1 => Some(OrgUnitLevel::National),
            2 => Some(OrgUnitLevel::Region),
            3 => Some(OrgUnitLevel::District),
            4 => Some(OrgUnitLevel::SubCounty),
            5 => Some(OrgUnitLevel::Parish),
            6 => Some(OrgUnitLevel::Facility),
            _ => None,
        }
    }

    pub fn number(&self) -> u8 {
        match self {
            OrgUnitLevel::National => 1,
            OrgUnitLevel::Region => 2,
            OrgUnitLevel::District => 3,
            OrgUnitLevel::SubCounty => 4,
            OrgUnitLevel::Parish => 5,
            OrgUnitLevel::Facility => 6,
        }
    }

    pub fn name(&self) -> &'static str {
        match self {
            OrgUnitLevel::National => "National",
            OrgUnitLevel::Region => "Region",
            OrgUnitLevel::District => "District",
            OrgUnitLevel::SubCounty => "Sub-county",
            OrgUnitLevel::Parish => "Parish",
            OrgUnitLevel::Facility => "Facility",
        }
    }

    /// Levels above district aggregate the populations of their districts.
    pub fn is_above_district(&self) -> bool {
        *self < OrgUnitLevel::District
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct OrgUnit {
    pub id: String,
    pub name: String,
    pub level: OrgUnitLevel,
    pub parent: Option<String>,
    #[serde(default)]
    pub custom_catchment: Option<u64>,
}

impl OrgUnit {
    pub fn new(id: &str, name: &str, level: OrgUnitLevel, parent: Option<&str>) -> Self {
        Self {
            id: id.to_string(),
            name: name.to_string(),
            level,
            parent: parent.map(str::to_string),
            custom_catchment: None,
        }
    }

    pub fn with_catchment(mut self, catchment: u64) -> Self {
        self.custom_catchment = Some(catchment);
        self
    }

    pub fn is_facility(&self) -> bool {
        self.level == OrgUnitLevel::Facility
    }
}

/// The org units known to one request, indexed by id.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct OrgUnitTree {
    units: HashMap<String, OrgUnit>,
}

impl OrgUnitTree {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add or replace a unit. A catchment on a non-facility node is dropped.
    pub fn insert(&mut self, mut unit: OrgUnit) {
        if unit.custom_catchment.is_some() && !unit.is_facility() {
            warn!(
                org_unit = %unit.id,
                level = unit.level.name(),
                "Ignoring custom catchment on non-facility org unit"
            );
            unit.custom_catchment = None;
        }
        self.units.insert(unit.id.clone(), unit);
    }

    pub fn extend(&mut self, units: impl IntoIterator<Item = OrgUnit>) {
        for unit in units {
            self.insert(unit);
        }
    }

    pub fn get(&self, id: &str) -> Result<&OrgUnit, AnalyticsError> {
        self.units
            .get(id)
            .ok_or_else(|| AnalyticsError::UnknownOrgUnit(id.to_string()))
    }

    pub fn units(&self) -> impl Iterator<Item = &OrgUnit> {
        self.units.values()
    }

    pub fn contains(&self, id: &str) -> bool {
        self.units.contains_key(id)
    }

    pub fn len(&self) -> usize {
        self.units.len()
    }

    pub fn is_empty(&self) -> bool {
        self.units.is_empty()
    }

    /// Ancestors of `id`, nearest first. Parents missing from the tree end
    /// the walk.
    pub fn ancestors(&self, id: &str) -> Result<Vec<&OrgUnit>, AnalyticsError> {
        let mut current = self.get(id)?;
        let mut chain = Vec::new();
        while let Some(parent_id) = current.parent.as_deref() {
            if chain.len() >= MAX_TREE_DEPTH {
                break;
            }
            match self.units.get(parent_id) {
                Some(parent) => {
                    chain.push(parent);
                    current = parent;
                }
                None => break,
            }
        }
        Ok(chain)
    }

    /// The district the unit belongs to; a district is its own district.
    pub fn district_of(&self, id: &str) -> Result<Option<&OrgUnit>, AnalyticsError> {
        let unit = self.get(id)?;
        if unit.level == OrgUnitLevel::District {
            return Ok(Some(unit));
        }
        Ok(self
            .ancestors(id)?
            .into_iter()
            .find(|a| a.level == OrgUnitLevel::District))
    }

    /// Direct children of `id`, sorted by name.
    pub fn children(&self, id: &str) -> Vec<&OrgUnit> {
        let mut children: Vec<&OrgUnit> = self
            .units
            .values()
            .filter(|u| u.parent.as_deref() == Some(id))
            .collect();
        children.sort_by(|a, b| a.name.cmp(&b.name));
        children
    }

    /// Children of `id` above district level with no children of their own
    /// in the tree. Their districts must be loaded before their population
    /// can be summed.
    pub fn unexpanded_children(&self, id: &str) -> Vec<&OrgUnit> {
        self.children(id)
            .into_iter()
            .filter(|child| child.level.is_above_district())
            .filter(|child| self.children(&child.id).is_empty())
            .collect()
    }

    /// District-level descendants of `id` present in the tree.
    pub fn districts_under(&self, id: &str) -> Vec<&OrgUnit> {
        let mut districts: Vec<&OrgUnit> = self
            .units
            .values()
            .filter(|u| u.level == OrgUnitLevel::District)
            .filter(|u| {
                self.ancestors(&u.id)
                    .map(|chain| chain.iter().any(|a| a.id == id))
                    .unwrap_or(false)
            })
            .collect();
        districts.sort_by(|a, b| a.name.cmp(&b.name));
        districts
    }

    /// Breadcrumb of names from the root down to `id`.
    pub fn path_display(&self, id: &str) -> String {
        let Ok(unit) = self.get(id) else {
            return id.to_string();
        };
        let mut names: Vec<&str> = self
            .ancestors(id)
            .map(|chain| chain.iter().map(|a| a.name.as_str()).collect())
            .unwrap_or_default();
        names.reverse();
        names.push(unit.name.as_str());
        names.join(" / ")
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_support::sample_tree;

    #[test]
    fn test_district_of_walks_up() {
        let tree = sample_tree();
        assert_eq!(tree.district_of("FAC").unwrap().unwrap().id, "GUL");
        assert_eq!(tree.district_of("GUL").unwrap().unwrap().id, "GUL");
        assert!(tree.district_of("ACH").unwrap().is_none());
    }

    #[test]
    fn test_unexpanded_children_of_national_root() {
        let mut tree = OrgUnitTree::new();
        tree.extend([
            OrgUnit::new("UG", "MOH - Uganda", OrgUnitLevel::National, None),
            OrgUnit::new("ACH", "Acholi Region", OrgUnitLevel::Region, Some("UG")),
            OrgUnit::new("LAN", "Lango Region", OrgUnitLevel::Region, Some("UG")),
        ]);
        let pending: Vec<&str> = tree.unexpanded_children("UG").iter().map(|u| u.id.as_str()).collect();
        assert_eq!(pending, vec!["ACH", "LAN"]);

        tree.insert(OrgUnit::new("GUL", "Gulu District", OrgUnitLevel::District, Some("ACH")));
        let pending: Vec<&str> = tree.unexpanded_children("UG").iter().map(|u| u.id.as_str()).collect();
        assert_eq!(pending, vec!["LAN"]);

        // Districts below a region are leaves for population purposes
        assert!(sample_tree().unexpanded_children("ACH").is_empty());
    }

    #[test]
    fn test_unknown_org_unit() {
        let tree = sample_tree();
        assert_eq!(
            tree.get("NOPE").unwrap_err(),
            AnalyticsError::UnknownOrgUnit("NOPE".to_string())
        );
    }

    #[test]
    fn test_catchment_only_on_facilities() {
        let mut tree = OrgUnitTree::new();
        tree.insert(OrgUnit::new("D", "Gulu", OrgUnitLevel::District, None).with_catchment(500));
        tree.insert(OrgUnit::new("F", "Awach HC IV", OrgUnitLevel::Facility, Some("D")).with_catchment(500));
        assert_eq!(tree.get("D").unwrap().custom_catchment, None);
        assert_eq!(tree.get("F").unwrap().custom_catchment, Some(500));
    }

    #[test]
    fn test_districts_under_region() {
        let tree = sample_tree();
        let names: Vec<&str> = tree.districts_under("ACH").iter().map(|d| d.id.as_str()).collect();
        assert_eq!(names, vec!["AMU", "GUL"]);
        assert_eq!(tree.districts_under("UG").len(), 2);
        assert!(tree.districts_under("GUL").is_empty());
    }

    #[test]
    fn test_path_display() {
        let tree = sample_tree();
        assert_eq!(
            tree.path_display("BUN"),
            "MOH - Uganda / Acholi Region / Gulu District / Bungatira Subcounty"
        );
    }

    #[test]
    fn test_level_numbers_round_trip() {
        for n in 1..=6 {
            assert_eq!(OrgUnitLevel::from_level(n).unwrap().number(), n);
        }
        assert!(OrgUnitLevel::from_level(7).is_none());
        assert!(OrgUnitLevel::Region.is_above_district());
        assert!(!OrgUnitLevel::District.is_above_district());
    }
}
