//! Ordinary-least-squares forecasting over period index.
//!
//! Projections are returned as fitted, including values below 0 or above
//! 100 %.

use crate::error::AnalyticsError;
use crate::models::{Forecast, ForecastPoint, TrendSeries};

/// Points needed to fit a line.
pub const MIN_HISTORY: usize = 2;

/// Periods projected when the caller does not ask for a horizon.
pub const DEFAULT_HORIZON: usize = 3;

/// Fit `value = slope x index + intercept`. When every index is equal the
/// slope is zero and the intercept is the mean value.
pub fn fit_ols(points: &[(f64, f64)]) -> Result<(f64, f64), AnalyticsError> {
    if points.len() < MIN_HISTORY {
        return Err(AnalyticsError::InsufficientHistory {
            available: points.len(),
            required: MIN_HISTORY,
        });
    }

    let n = points.len() as f64;
    let x_mean = points.iter().map(|(x, _)| x).sum::<f64>() / n;
    let y_mean = points.iter().map(|(_, y)| y).sum::<f64>() / n;

    let numerator: f64 = points.iter().map(|(x, y)| (x - x_mean) * (y - y_mean)).sum();
    let denominator: f64 = points.iter().map(|(x, _)| (x - x_mean).powi(2)).sum();

    let slope = if denominator == 0.0 { 0.0 } else { numerator / denominator };
    Ok((slope, y_mean - slope * x_mean))
}

/// Evaluate the fitted line at each of `at`.
pub fn project(points: &[(f64, f64)], at: &[f64]) -> Result<Vec<f64>, AnalyticsError> {
    let (slope, intercept) = fit_ols(points)?;
    Ok(at.iter().map(|x| slope * x + intercept).collect())
}

/// Fit a series (history numbered 1..=n) and project the next `horizon`
/// months.
pub fn forecast_series(series: &TrendSeries, horizon: usize) -> Result<Forecast, AnalyticsError> {
    let history: Vec<(f64, f64)> = series
        .points
        .iter()
        .enumerate()
        .map(|(i, p)| ((i + 1) as f64, p.value))
        .collect();
    let (slope, intercept) = fit_ols(&history)?;

    let mut period = series
        .points
        .last()
        .map(|p| p.period)
        .ok_or(AnalyticsError::InsufficientHistory {
            available: 0,
            required: MIN_HISTORY,
        })?;

    let points = (1..=horizon)
        .map(|step| {
            period = period.next();
            let index = (history.len() + step) as f64;
            ForecastPoint {
                period,
                index,
                value: slope * index + intercept,
            }
        })
        .collect();

    Ok(Forecast {
        slope,
        intercept,
        points,
    })
}
