//! Trend and outlier analysis.
//!
//! Each point is scored against the mean and sample standard deviation of
//! the *other* points in the series. Scoring against the full series caps
//! |Z| at (n-1)/sqrt(n), so a single spike in a short series could never
//! cross the threshold.
//!
//! Series values are never altered; only the `outlier` and `z_score` fields
//! of each point are written.

use tracing::debug;

use crate::models::TrendSeries;

/// Flag points whose |Z| exceeds this.
pub const DEFAULT_Z_THRESHOLD: f64 = 2.0;

/// Series shorter than this are passed through unflagged.
pub const MIN_SERIES_LEN: usize = 3;

/// Integrated Child Health Days run in April and October and inflate EPI
/// counts for those months.
pub const ICHD_MONTHS: [u32; 2] = [4, 10];

/// Added to the threshold in campaign months.
pub const ICHD_THRESHOLD_BONUS: f64 = 1.0;

/// Spread at or below this is treated as zero.
const ZERO_SPREAD: f64 = 1e-9;

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct OutlierConfig {
    pub threshold: f64,
    /// Relax the threshold in ICHD campaign months.
    pub campaign_aware: bool,
}

impl Default for OutlierConfig {
    fn default() -> Self {
        Self {
            threshold: DEFAULT_Z_THRESHOLD,
            campaign_aware: false,
        }
    }
}

impl OutlierConfig {
    pub fn epi(threshold: f64) -> Self {
        Self {
            threshold,
            campaign_aware: true,
        }
    }

    fn threshold_for(&self, month: u32) -> f64 {
        if self.campaign_aware && ICHD_MONTHS.contains(&month) {
            self.threshold + ICHD_THRESHOLD_BONUS
        } else {
            self.threshold
        }
    }
}

fn mean(values: &[f64]) -> f64 {
    values.iter().sum::<f64>() / values.len() as f64
}

/// Sample standard deviation (n - 1). Needs at least two values.
fn sample_std_dev(values: &[f64]) -> f64 {
    let m = mean(values);
    let sum_sq: f64 = values.iter().map(|v| (v - m).powi(2)).sum();
    (sum_sq / (values.len() as f64 - 1.0)).sqrt()
}

/// How a point compares to the rest of its series.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Deviation {
    Score(f64),
    /// The other points have zero spread and this one differs from them.
    Unbounded,
}

/// Leave-one-out deviation for each value. `None` when the series is too
/// short to evaluate or has no spread at all.
pub fn deviations(values: &[f64]) -> Option<Vec<Deviation>> {
    if values.len() < MIN_SERIES_LEN || sample_std_dev(values) <= ZERO_SPREAD {
        return None;
    }

    let scored = (0..values.len())
        .map(|i| {
            let others: Vec<f64> = values
                .iter()
                .enumerate()
                .filter(|&(j, _)| j != i)
                .map(|(_, &v)| v)
                .collect();
            let centre = mean(&others);
            let spread = sample_std_dev(&others);
            if spread <= ZERO_SPREAD {
                if (values[i] - centre).abs() <= ZERO_SPREAD {
                    Deviation::Score(0.0)
                } else {
                    Deviation::Unbounded
                }
            } else {
                Deviation::Score((values[i] - centre) / spread)
            }
        })
        .collect();
    Some(scored)
}

/// Annotate the series in place with outlier flags and Z-scores.
pub fn flag_outliers(series: &mut TrendSeries, config: OutlierConfig) {
    for point in &mut series.points {
        point.outlier = false;
        point.z_score = None;
    }

    let Some(scored) = deviations(&series.values()) else {
        if series.len() >= MIN_SERIES_LEN {
            for point in &mut series.points {
                point.z_score = Some(0.0);
            }
        }
        return;
    };

    for (point, deviation) in series.points.iter_mut().zip(scored) {
        let threshold = config.threshold_for(point.period.month());
        match deviation {
            Deviation::Score(z) => {
                point.z_score = Some((z * 100.0).round() / 100.0);
                point.outlier = z.abs() > threshold;
            }
            Deviation::Unbounded => {
                point.outlier = true;
            }
        }
        if point.outlier {
            debug!(
                org_unit = %series.org_unit,
                indicator = %series.indicator_code,
                period = %point.period,
                value = point.value,
                "Outlier flagged"
            );
        }
    }
}
