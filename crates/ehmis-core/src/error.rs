//! Failure taxonomy for the analytics core.
//!
//! Per-cell failures (`DivisionByZero`, `Overflow`) are converted into
//! [`CellValue::NotAvailable`](crate::models::CellValue) at the engine
//! boundary. Lookup misses against the static catalogs reject the whole
//! request and are returned to the caller.

use thiserror::Error;

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum AnalyticsError {
    #[error("Invalid period: {0}")]
    InvalidPeriod(String),

    #[error("Division by zero: {0} is zero")]
    DivisionByZero(&'static str),

    #[error("Overflow: {0} is out of range")]
    Overflow(&'static str),

    #[error("Insufficient history: {available} point(s), at least {required} required")]
    InsufficientHistory { available: usize, required: usize },

    #[error("Unknown indicator: {0}")]
    UnknownIndicator(String),

    #[error("Unknown org unit: {0}")]
    UnknownOrgUnit(String),
}

impl AnalyticsError {
    /// Whether the error is local to one computed cell.
    ///
    /// Cell errors render as "N/A"; everything else rejects the request.
    pub fn is_cell_error(&self) -> bool {
        matches!(
            self,
            AnalyticsError::DivisionByZero(_) | AnalyticsError::Overflow(_)
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_cell_local_errors() {
        assert!(AnalyticsError::DivisionByZero("target population").is_cell_error());
        assert!(AnalyticsError::Overflow("coverage").is_cell_error());
        assert!(!AnalyticsError::UnknownIndicator("105-XX01".to_string()).is_cell_error());
        assert!(!AnalyticsError::InvalidPeriod("2024Q5".to_string()).is_cell_error());
    }

    #[test]
    fn test_insufficient_history_message() {
        let err = AnalyticsError::InsufficientHistory { available: 1, required: 2 };
        assert_eq!(
            err.to_string(),
            "Insufficient history: 1 point(s), at least 2 required"
        );
    }
}
