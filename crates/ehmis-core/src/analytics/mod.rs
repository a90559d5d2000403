//! Analytics engines.
//!
//! Every engine is a pure synchronous function over already-fetched data.
//! Per-cell failures come back as [`CellValue::NotAvailable`](crate::models::CellValue);
//! catalog misses come back as errors.

pub mod coverage;
pub mod dropout;
pub mod forecast;
pub mod incidence;
pub mod outliers;
pub mod rates;
pub mod reporting;
pub mod wash;

pub use coverage::{base_population, compute_coverage, coverage_color, coverage_percentage, target_population};
pub use dropout::{compute_dropout, compute_dropouts, dropout_percentage};
pub use forecast::{fit_ols, forecast_series, project, DEFAULT_HORIZON};
pub use incidence::{classify_burden, incidence_per_thousand, rank_by_incidence, BurdenClass, BurdenEntry, BurdenThresholds};
pub use outliers::{flag_outliers, OutlierConfig, DEFAULT_Z_THRESHOLD};
pub use rates::{achievement_color, compute_rate, rate_per};
pub use reporting::{reporting_color, summarize, weekly_rates, ReportingSummary, WeeklyRate};
pub use wash::{compute_wash, wash_color, WashResult};
