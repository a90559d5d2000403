//! Shared fixtures for unit tests.

use crate::models::{OrgUnit, OrgUnitLevel, OrgUnitTree};

/// Uganda / Acholi / Gulu down to one facility, plus Amuru as a sibling
/// district.
pub fn sample_tree() -> OrgUnitTree {
    let mut tree = OrgUnitTree::new();
    tree.extend([
        OrgUnit::new("UG", "MOH - Uganda", OrgUnitLevel::National, None),
        OrgUnit::new("ACH", "Acholi Region", OrgUnitLevel::Region, Some("UG")),
        OrgUnit::new("GUL", "Gulu District", OrgUnitLevel::District, Some("ACH")),
        OrgUnit::new("AMU", "Amuru District", OrgUnitLevel::District, Some("ACH")),
        OrgUnit::new("BUN", "Bungatira Subcounty", OrgUnitLevel::SubCounty, Some("GUL")),
        OrgUnit::new("PAR", "Lukwir Parish", OrgUnitLevel::Parish, Some("BUN")),
        OrgUnit::new("FAC", "Awach HC IV", OrgUnitLevel::Facility, Some("PAR")),
    ]);
    tree
}
