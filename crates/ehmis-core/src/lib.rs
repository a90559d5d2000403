//! Core analytics for the Uganda eHMIS (DHIS2) coverage dashboard.
//!
//! This crate provides:
//! - `period`: month/quarter/year/custom period resolution and ISO weeks
//! - `catalog`: UBOS district populations and the indicator catalog
//! - `analytics`: coverage, dropout, rate, outlier, forecast, WASH and
//!   malaria incidence engines, plus weekly 033b reporting rates
//! - `pipeline`: report assembly for the dashboard tabs
//! - `api`, `auth`, `cache`, `config`: DHIS2 access, sessions, the
//!   encrypted response cache and settings
//!
//! The engines are pure and synchronous. Only `api` touches the network.

pub mod analytics;
pub mod api;
pub mod auth;
pub mod cache;
pub mod catalog;
pub mod config;
pub mod error;
pub mod models;
pub mod period;
pub mod pipeline;
pub mod utils;

#[cfg(test)]
pub(crate) mod test_support;

pub use config::Config;
pub use error::AnalyticsError;
pub use period::{PeriodSpec, RelativePeriod, ResolvedPeriod};
pub use pipeline::{
    build_burden_report, build_epi_report, build_maternal_report, build_reporting_report,
    build_wash_report, BurdenReport, EpiReport, MaternalReport, ReportContext, ReportingReport,
    WashReport,
};
