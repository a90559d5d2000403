//! DHIS2 web API access.
//!
//! `Dhis2Client` speaks to the instance; `DataLoader` puts the encrypted
//! response cache in front of it and fans requests out concurrently.

pub mod client;
pub mod error;
pub mod loader;
pub mod types;

pub use client::{Dhis2Client, DEFAULT_BASE_URL, DEFAULT_TIMEOUT_SECS};
pub use error::ApiError;
pub use loader::{DataLoader, ReportInputs};
pub use types::{AnalyticsResponse, DataElement, IndicatorRef};
