//! Data models for the analytics core.
//!
//! - `OrgUnit`, `OrgUnitTree`: the six-level administrative hierarchy
//! - `RawCounts`: fetched counts keyed by month and data element code
//! - Result types: `CoverageResult`, `DropoutResult`, `RateResult`,
//!   `TrendSeries` and `Forecast`, plus the `CellValue` sentinel

pub mod counts;
pub mod org_unit;
pub mod results;

pub use counts::RawCounts;
pub use org_unit::{OrgUnit, OrgUnitLevel, OrgUnitTree};
pub use results::{
    round_display, scale_for_display, CellValue, ColorCategory, CoverageResult, DropoutResult,
    DropoutStatus, Forecast, ForecastPoint, RateResult, TrendPoint, TrendSeries,
};
