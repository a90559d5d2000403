//! Period resolution.
//!
//! A [`PeriodSpec`] is what the user picked (a month, a quarter, a year, a
//! trailing twelve months, or an explicit half-open date range). Resolving it
//! yields the divisor used to pro-rate annual target populations and the
//! ordered monthly buckets to fetch from DHIS2.
//!
//! Weekly surveillance data (HMIS 033b) is bucketed by ISO week; the weeks
//! of a selection are those whose Monday falls inside it.
//!
//! DHIS2 period identifiers are accepted as input: `202401`, `2024Q1`,
//! `2024`, `202401-202406` (inclusive month range) and the relative keywords
//! `THIS_MONTH`, `LAST_MONTH`, `THIS_QUARTER`, `LAST_QUARTER`, `THIS_YEAR`,
//! `LAST_YEAR` and `LAST_12_MONTHS`.

use std::fmt;
use std::str::FromStr;

use chrono::{Datelike, Days, NaiveDate, Weekday};
use serde::{Deserialize, Serialize};

use crate::error::AnalyticsError;

// ============================================================================
// Constants
// ============================================================================

/// Divisor for a single month of an annual target.
pub const MONTHLY_DIVISOR: u32 = 12;

/// Divisor for a single quarter of an annual target.
pub const QUARTERLY_DIVISOR: u32 = 4;

/// Divisor for a full year.
pub const ANNUAL_DIVISOR: u32 = 1;

const MONTH_ABBREVIATIONS: [&str; 12] = [
    "Jan", "Feb", "Mar", "Apr", "May", "Jun", "Jul", "Aug", "Sep", "Oct", "Nov", "Dec",
];

// ============================================================================
// Monthly buckets
// ============================================================================

/// One elementary calendar month. Displays as the DHIS2 `pe` id (`YYYYMM`).
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(into = "String", try_from = "String")]
pub struct MonthBucket {
    year: i32,
    month: u32,
}

impl MonthBucket {
    pub fn new(year: i32, month: u32) -> Result<Self, AnalyticsError> {
        if !(1..=12).contains(&month) {
            return Err(AnalyticsError::InvalidPeriod(format!(
                "month {} out of range in {}",
                month, year
            )));
        }
        Ok(Self { year, month })
    }

    pub fn from_date(date: NaiveDate) -> Self {
        Self {
            year: date.year(),
            month: date.month(),
        }
    }

    pub fn year(&self) -> i32 {
        self.year
    }

    pub fn month(&self) -> u32 {
        self.month
    }

    /// Calendar quarter (1-4) the month falls in.
    pub fn quarter(&self) -> u32 {
        (self.month - 1) / 3 + 1
    }

    pub fn first_day(&self) -> NaiveDate {
        // month is validated on construction, day 1 always exists
        NaiveDate::from_ymd_opt(self.year, self.month, 1).unwrap_or(NaiveDate::MIN)
    }

    pub fn next(&self) -> Self {
        if self.month == 12 {
            Self { year: self.year + 1, month: 1 }
        } else {
            Self { year: self.year, month: self.month + 1 }
        }
    }

    pub fn prev(&self) -> Self {
        if self.month == 1 {
            Self { year: self.year - 1, month: 12 }
        } else {
            Self { year: self.year, month: self.month - 1 }
        }
    }

    /// Months elapsed since year zero; used for range arithmetic.
    fn ordinal(&self) -> i64 {
        self.year as i64 * 12 + (self.month as i64 - 1)
    }

    /// Short human label, e.g. `Jan 2024`.
    pub fn label(&self) -> String {
        format!("{} {}", MONTH_ABBREVIATIONS[(self.month - 1) as usize], self.year)
    }
}

impl fmt::Display for MonthBucket {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:04}{:02}", self.year, self.month)
    }
}

impl FromStr for MonthBucket {
    type Err = AnalyticsError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let s = s.trim();
        if s.len() != 6 || !s.chars().all(|c| c.is_ascii_digit()) {
            return Err(AnalyticsError::InvalidPeriod(format!(
                "expected YYYYMM, got '{}'",
                s
            )));
        }
        let year: i32 = s[..4]
            .parse()
            .map_err(|_| AnalyticsError::InvalidPeriod(s.to_string()))?;
        let month: u32 = s[4..]
            .parse()
            .map_err(|_| AnalyticsError::InvalidPeriod(s.to_string()))?;
        Self::new(year, month)
    }
}

impl From<MonthBucket> for String {
    fn from(bucket: MonthBucket) -> Self {
        bucket.to_string()
    }
}

impl TryFrom<String> for MonthBucket {
    type Error = AnalyticsError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        value.parse()
    }
}

/// A calendar quarter, used to group monthly buckets for quarterly tables.
/// Displays as the DHIS2 `pe` id (`YYYYQn`).
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(into = "String", try_from = "String")]
pub struct QuarterBucket {
    year: i32,
    quarter: u32,
}

impl QuarterBucket {
    pub fn new(year: i32, quarter: u32) -> Result<Self, AnalyticsError> {
        if !(1..=4).contains(&quarter) {
            return Err(AnalyticsError::InvalidPeriod(format!(
                "quarter {} out of range in {}",
                quarter, year
            )));
        }
        Ok(Self { year, quarter })
    }

    pub fn of(month: MonthBucket) -> Self {
        Self {
            year: month.year(),
            quarter: month.quarter(),
        }
    }

    pub fn year(&self) -> i32 {
        self.year
    }

    pub fn quarter(&self) -> u32 {
        self.quarter
    }

    pub fn first_month(&self) -> MonthBucket {
        MonthBucket {
            year: self.year,
            month: (self.quarter - 1) * 3 + 1,
        }
    }

    pub fn contains(&self, month: MonthBucket) -> bool {
        Self::of(month) == *self
    }

    /// Label such as `Jan-Mar 2024`.
    pub fn label(&self) -> String {
        let first = ((self.quarter - 1) * 3) as usize;
        format!(
            "{}-{} {}",
            MONTH_ABBREVIATIONS[first],
            MONTH_ABBREVIATIONS[first + 2],
            self.year
        )
    }
}

impl fmt::Display for QuarterBucket {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}Q{}", self.year, self.quarter)
    }
}

impl FromStr for QuarterBucket {
    type Err = AnalyticsError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let s = s.trim();
        let invalid = || AnalyticsError::InvalidPeriod(format!("expected YYYYQn, got '{}'", s));
        let (year, quarter) = s.split_once('Q').ok_or_else(invalid)?;
        let year: i32 = year.parse().map_err(|_| invalid())?;
        let quarter: u32 = quarter.parse().map_err(|_| invalid())?;
        Self::new(year, quarter)
    }
}

impl From<QuarterBucket> for String {
    fn from(bucket: QuarterBucket) -> Self {
        bucket.to_string()
    }
}

impl TryFrom<String> for QuarterBucket {
    type Error = AnalyticsError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        value.parse()
    }
}

/// One ISO week, the unit of DHIS2 weekly periods. Displays as the `pe` id
/// (`2024W5`).
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(into = "String", try_from = "String")]
pub struct WeekBucket {
    year: i32,
    week: u32,
}

impl WeekBucket {
    pub fn new(year: i32, week: u32) -> Result<Self, AnalyticsError> {
        if NaiveDate::from_isoywd_opt(year, week, Weekday::Mon).is_none() {
            return Err(AnalyticsError::InvalidPeriod(format!(
                "week {} out of range in {}",
                week, year
            )));
        }
        Ok(Self { year, week })
    }

    /// The ISO week containing `date`; late December can belong to the
    /// next year's week 1.
    pub fn from_date(date: NaiveDate) -> Self {
        let iso = date.iso_week();
        Self {
            year: iso.year(),
            week: iso.week(),
        }
    }

    pub fn year(&self) -> i32 {
        self.year
    }

    pub fn week(&self) -> u32 {
        self.week
    }

    pub fn monday(&self) -> NaiveDate {
        // validated on construction
        NaiveDate::from_isoywd_opt(self.year, self.week, Weekday::Mon).unwrap_or(NaiveDate::MIN)
    }

    /// Label such as `W5 2024 (29 Jan)`.
    pub fn label(&self) -> String {
        format!("W{} {} ({})", self.week, self.year, self.monday().format("%d %b"))
    }
}

impl fmt::Display for WeekBucket {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}W{}", self.year, self.week)
    }
}

impl FromStr for WeekBucket {
    type Err = AnalyticsError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let s = s.trim();
        let invalid = || AnalyticsError::InvalidPeriod(format!("expected YYYYWn, got '{}'", s));
        let (year, week) = s.split_once('W').ok_or_else(invalid)?;
        let year: i32 = year.parse().map_err(|_| invalid())?;
        let week: u32 = week.parse().map_err(|_| invalid())?;
        Self::new(year, week)
    }
}

impl From<WeekBucket> for String {
    fn from(bucket: WeekBucket) -> Self {
        bucket.to_string()
    }
}

impl TryFrom<String> for WeekBucket {
    type Error = AnalyticsError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        value.parse()
    }
}

/// Semicolon-joined DHIS2 `pe` dimension for weekly buckets.
pub fn weekly_dimension(weeks: &[WeekBucket]) -> String {
    weeks.iter().map(|w| w.to_string()).collect::<Vec<_>>().join(";")
}

/// Group ascending monthly buckets by calendar quarter, preserving order.
pub fn group_by_quarter(buckets: &[MonthBucket]) -> Vec<(QuarterBucket, Vec<MonthBucket>)> {
    let mut groups: Vec<(QuarterBucket, Vec<MonthBucket>)> = Vec::new();
    for &bucket in buckets {
        let quarter = QuarterBucket::of(bucket);
        match groups.last_mut() {
            Some((q, months)) if *q == quarter => months.push(bucket),
            _ => groups.push((quarter, vec![bucket])),
        }
    }
    groups
}

// ============================================================================
// Period specifications
// ============================================================================

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Granularity {
    Month,
    Quarter,
    Year,
    Custom,
}

/// A user-selected reporting period.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum PeriodSpec {
    Month { year: i32, month: u32 },
    Quarter { year: i32, quarter: u32 },
    Year { year: i32 },
    /// Twelve months ending with (and including) `last`. Treated as annual.
    TrailingYear { last: MonthBucket },
    /// Half-open `[start, end)`; both ends must fall on the first of a month.
    Custom { start: NaiveDate, end: NaiveDate },
}

/// The outcome of resolving a [`PeriodSpec`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ResolvedPeriod {
    pub spec: PeriodSpec,
    pub granularity: Granularity,
    pub divisor: u32,
    pub buckets: Vec<MonthBucket>,
}

impl ResolvedPeriod {
    /// Semicolon-joined DHIS2 `pe` dimension for the buckets.
    pub fn dhis2_dimension(&self) -> String {
        self.buckets
            .iter()
            .map(|b| b.to_string())
            .collect::<Vec<_>>()
            .join(";")
    }

    pub fn first(&self) -> Option<MonthBucket> {
        self.buckets.first().copied()
    }

    pub fn last(&self) -> Option<MonthBucket> {
        self.buckets.last().copied()
    }

    pub fn label(&self) -> String {
        self.spec.label()
    }

    /// ISO weeks whose Monday falls inside the period, in order.
    pub fn weeks(&self) -> Vec<WeekBucket> {
        let (Some(first), Some(last)) = (self.first(), self.last()) else {
            return Vec::new();
        };
        let end = last.next().first_day();
        let start = first.first_day();
        let to_monday = (7 - start.weekday().num_days_from_monday()) % 7;
        let mut day = start.checked_add_days(Days::new(u64::from(to_monday)));

        let mut weeks = Vec::new();
        while let Some(monday) = day.filter(|d| *d < end) {
            weeks.push(WeekBucket::from_date(monday));
            day = monday.checked_add_days(Days::new(7));
        }
        weeks
    }

    /// The months of one calendar quarter a longer selection covers.
    ///
    /// The divisor follows the months present, so the annual target is
    /// pro-rated to one month (12), two months (6) or the whole quarter (4).
    /// `months` must be ascending, distinct and inside `quarter`.
    pub fn quarter_slice(quarter: QuarterBucket, months: &[MonthBucket]) -> Result<Self, AnalyticsError> {
        let (Some(&first), Some(&last)) = (months.first(), months.last()) else {
            return Err(AnalyticsError::InvalidPeriod(format!("no months in {}", quarter)));
        };
        let ascending = months.windows(2).all(|pair| pair[0] < pair[1]);
        if !ascending || !months.iter().all(|&m| quarter.contains(m)) {
            return Err(AnalyticsError::InvalidPeriod(format!(
                "months do not form a slice of {}",
                quarter
            )));
        }

        let spec = match months.len() {
            1 => PeriodSpec::Month {
                year: first.year(),
                month: first.month(),
            },
            3 => PeriodSpec::Quarter {
                year: quarter.year(),
                quarter: quarter.quarter(),
            },
            _ => PeriodSpec::Custom {
                start: first.first_day(),
                end: last.next().first_day(),
            },
        };

        Ok(ResolvedPeriod {
            spec,
            granularity: spec.granularity(),
            divisor: MONTHLY_DIVISOR / months.len() as u32,
            buckets: months.to_vec(),
        })
    }
}

impl PeriodSpec {
    pub fn granularity(&self) -> Granularity {
        match self {
            PeriodSpec::Month { .. } => Granularity::Month,
            PeriodSpec::Quarter { .. } => Granularity::Quarter,
            PeriodSpec::Year { .. } | PeriodSpec::TrailingYear { .. } => Granularity::Year,
            PeriodSpec::Custom { .. } => Granularity::Custom,
        }
    }

    /// Resolve into a divisor and the ordered monthly buckets it covers.
    pub fn resolve(&self) -> Result<ResolvedPeriod, AnalyticsError> {
        let (divisor, buckets) = match *self {
            PeriodSpec::Month { year, month } => {
                (MONTHLY_DIVISOR, vec![MonthBucket::new(year, month)?])
            }
            PeriodSpec::Quarter { year, quarter } => {
                let first = QuarterBucket::new(year, quarter)?.first_month();
                (QUARTERLY_DIVISOR, month_run(first, 3))
            }
            PeriodSpec::Year { year } => (ANNUAL_DIVISOR, month_run(MonthBucket::new(year, 1)?, 12)),
            PeriodSpec::TrailingYear { last } => {
                let mut first = last;
                for _ in 0..11 {
                    first = first.prev();
                }
                (ANNUAL_DIVISOR, month_run(first, 12))
            }
            PeriodSpec::Custom { start, end } => {
                let months = whole_months(start, end)?;
                (months, month_run(MonthBucket::from_date(start), months))
            }
        };

        Ok(ResolvedPeriod {
            spec: *self,
            granularity: self.granularity(),
            divisor,
            buckets,
        })
    }

    /// Human label, e.g. `Jan 2024`, `Q1 2024`, `2024`, `Jan 2024 - Jun 2024`.
    pub fn label(&self) -> String {
        match *self {
            PeriodSpec::Month { year, month } => MonthBucket::new(year, month)
                .map(|b| b.label())
                .unwrap_or_else(|_| format!("{}-{:02}", year, month)),
            PeriodSpec::Quarter { year, quarter } => format!("Q{} {}", quarter, year),
            PeriodSpec::Year { year } => year.to_string(),
            PeriodSpec::TrailingYear { last } => format!("12 months to {}", last.label()),
            PeriodSpec::Custom { start, end } => {
                let last = MonthBucket::from_date(end).prev();
                format!("{} - {}", MonthBucket::from_date(start).label(), last.label())
            }
        }
    }

    /// Parse a DHIS2 period id or a relative keyword, anchoring relative
    /// keywords at `today`.
    pub fn parse(input: &str, today: NaiveDate) -> Result<Self, AnalyticsError> {
        if let Ok(relative) = input.parse::<RelativePeriod>() {
            return Ok(relative.resolve(today));
        }
        input.parse()
    }
}

impl FromStr for PeriodSpec {
    type Err = AnalyticsError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let s = s.trim();
        let invalid = || AnalyticsError::InvalidPeriod(format!("unrecognised period '{}'", s));

        if let Some((from, to)) = s.split_once('-') {
            let first: MonthBucket = from.parse()?;
            let last: MonthBucket = to.parse()?;
            if last < first {
                return Err(AnalyticsError::InvalidPeriod(format!(
                    "range end {} precedes start {}",
                    last, first
                )));
            }
            return Ok(PeriodSpec::Custom {
                start: first.first_day(),
                end: last.next().first_day(),
            });
        }

        if s.contains('Q') {
            let quarter: QuarterBucket = s.parse()?;
            return Ok(PeriodSpec::Quarter {
                year: quarter.year(),
                quarter: quarter.quarter(),
            });
        }

        if !s.chars().all(|c| c.is_ascii_digit()) {
            return Err(invalid());
        }
        match s.len() {
            4 => Ok(PeriodSpec::Year {
                year: s.parse().map_err(|_| invalid())?,
            }),
            6 => {
                let bucket: MonthBucket = s.parse()?;
                Ok(PeriodSpec::Month {
                    year: bucket.year(),
                    month: bucket.month(),
                })
            }
            _ => Err(invalid()),
        }
    }
}

/// DHIS2 relative period keywords.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RelativePeriod {
    ThisMonth,
    LastMonth,
    ThisQuarter,
    LastQuarter,
    ThisYear,
    LastYear,
    Last12Months,
}

impl RelativePeriod {
    pub fn resolve(&self, today: NaiveDate) -> PeriodSpec {
        let current = MonthBucket::from_date(today);
        match self {
            RelativePeriod::ThisMonth => PeriodSpec::Month {
                year: current.year(),
                month: current.month(),
            },
            RelativePeriod::LastMonth => {
                let prev = current.prev();
                PeriodSpec::Month {
                    year: prev.year(),
                    month: prev.month(),
                }
            }
            RelativePeriod::ThisQuarter => PeriodSpec::Quarter {
                year: current.year(),
                quarter: current.quarter(),
            },
            RelativePeriod::LastQuarter => {
                if current.quarter() == 1 {
                    PeriodSpec::Quarter { year: current.year() - 1, quarter: 4 }
                } else {
                    PeriodSpec::Quarter {
                        year: current.year(),
                        quarter: current.quarter() - 1,
                    }
                }
            }
            RelativePeriod::ThisYear => PeriodSpec::Year { year: current.year() },
            RelativePeriod::LastYear => PeriodSpec::Year { year: current.year() - 1 },
            RelativePeriod::Last12Months => PeriodSpec::TrailingYear {
                last: current.prev(),
            },
        }
    }

    pub fn keyword(&self) -> &'static str {
        match self {
            RelativePeriod::ThisMonth => "THIS_MONTH",
            RelativePeriod::LastMonth => "LAST_MONTH",
            RelativePeriod::ThisQuarter => "THIS_QUARTER",
            RelativePeriod::LastQuarter => "LAST_QUARTER",
            RelativePeriod::ThisYear => "THIS_YEAR",
            RelativePeriod::LastYear => "LAST_YEAR",
            RelativePeriod::Last12Months => "LAST_12_MONTHS",
        }
    }
}

impl FromStr for RelativePeriod {
    type Err = AnalyticsError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_uppercase().as_str() {
            "THIS_MONTH" => Ok(RelativePeriod::ThisMonth),
            "LAST_MONTH" => Ok(RelativePeriod::LastMonth),
            "THIS_QUARTER" => Ok(RelativePeriod::ThisQuarter),
            "LAST_QUARTER" => Ok(RelativePeriod::LastQuarter),
            "THIS_YEAR" => Ok(RelativePeriod::ThisYear),
            "LAST_YEAR" => Ok(RelativePeriod::LastYear),
            "LAST_12_MONTHS" => Ok(RelativePeriod::Last12Months),
            other => Err(AnalyticsError::InvalidPeriod(format!(
                "unknown relative period '{}'",
                other
            ))),
        }
    }
}

fn month_run(first: MonthBucket, count: u32) -> Vec<MonthBucket> {
    let mut buckets = Vec::with_capacity(count as usize);
    let mut current = first;
    for _ in 0..count {
        buckets.push(current);
        current = current.next();
    }
    buckets
}

/// Number of whole months in `[start, end)`, or `InvalidPeriod` when either
/// end is not month-aligned or the range is empty.
fn whole_months(start: NaiveDate, end: NaiveDate) -> Result<u32, AnalyticsError> {
    if start.day() != 1 || end.day() != 1 {
        return Err(AnalyticsError::InvalidPeriod(format!(
            "custom range {} to {} does not cover whole months",
            start, end
        )));
    }
    let months = MonthBucket::from_date(end).ordinal() - MonthBucket::from_date(start).ordinal();
    if months <= 0 {
        return Err(AnalyticsError::InvalidPeriod(format!(
            "custom range {} to {} is empty",
            start, end
        )));
    }
    u32::try_from(months).map_err(|_| AnalyticsError::InvalidPeriod(format!("range too long: {} months", months)))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn date(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    #[test]
    fn test_divisors_by_granularity() {
        let month = PeriodSpec::Month { year: 2024, month: 3 }.resolve().unwrap();
        let quarter = PeriodSpec::Quarter { year: 2024, quarter: 2 }.resolve().unwrap();
        let year = PeriodSpec::Year { year: 2024 }.resolve().unwrap();
        assert_eq!(month.divisor, 12);
        assert_eq!(quarter.divisor, 4);
        assert_eq!(year.divisor, 1);
        assert_eq!(quarter.buckets.len(), 3);
        assert_eq!(year.buckets.len(), 12);
    }

    #[test]
    fn test_custom_six_whole_months() {
        let spec = PeriodSpec::Custom {
            start: date(2024, 1, 1),
            end: date(2024, 7, 1),
        };
        let resolved = spec.resolve().unwrap();
        assert_eq!(resolved.divisor, 6);
        assert_eq!(resolved.buckets.first().unwrap().to_string(), "202401");
        assert_eq!(resolved.buckets.last().unwrap().to_string(), "202406");
    }

    #[test]
    fn test_custom_fractional_month_is_invalid() {
        let spec = PeriodSpec::Custom {
            start: date(2024, 1, 1),
            end: date(2024, 7, 15),
        };
        assert!(matches!(spec.resolve(), Err(AnalyticsError::InvalidPeriod(_))));

        let spec = PeriodSpec::Custom {
            start: date(2024, 1, 10),
            end: date(2024, 7, 1),
        };
        assert!(matches!(spec.resolve(), Err(AnalyticsError::InvalidPeriod(_))));
    }

    #[test]
    fn test_custom_empty_or_inverted_is_invalid() {
        let same = PeriodSpec::Custom {
            start: date(2024, 3, 1),
            end: date(2024, 3, 1),
        };
        let inverted = PeriodSpec::Custom {
            start: date(2024, 6, 1),
            end: date(2024, 3, 1),
        };
        assert!(same.resolve().is_err());
        assert!(inverted.resolve().is_err());
    }

    #[test]
    fn test_custom_range_crosses_year_boundary() {
        let spec = PeriodSpec::Custom {
            start: date(2023, 11, 1),
            end: date(2024, 2, 1),
        };
        let resolved = spec.resolve().unwrap();
        assert_eq!(resolved.dhis2_dimension(), "202311;202312;202401");
    }

    #[test]
    fn test_parse_dhis2_ids() {
        assert_eq!(
            "202402".parse::<PeriodSpec>().unwrap(),
            PeriodSpec::Month { year: 2024, month: 2 }
        );
        assert_eq!(
            "2024Q3".parse::<PeriodSpec>().unwrap(),
            PeriodSpec::Quarter { year: 2024, quarter: 3 }
        );
        assert_eq!("2023".parse::<PeriodSpec>().unwrap(), PeriodSpec::Year { year: 2023 });
        assert_eq!(
            "202401-202406".parse::<PeriodSpec>().unwrap(),
            PeriodSpec::Custom {
                start: date(2024, 1, 1),
                end: date(2024, 7, 1)
            }
        );
    }

    #[test]
    fn test_parse_rejects_malformed() {
        assert!("202413".parse::<PeriodSpec>().is_err());
        assert!("2024Q5".parse::<PeriodSpec>().is_err());
        assert!("24".parse::<PeriodSpec>().is_err());
        assert!("202406-202401".parse::<PeriodSpec>().is_err());
        assert!("soon".parse::<PeriodSpec>().is_err());
    }

    #[test]
    fn test_relative_periods() {
        let today = date(2024, 1, 17);
        assert_eq!(
            PeriodSpec::parse("LAST_MONTH", today).unwrap(),
            PeriodSpec::Month { year: 2023, month: 12 }
        );
        assert_eq!(
            PeriodSpec::parse("LAST_QUARTER", today).unwrap(),
            PeriodSpec::Quarter { year: 2023, quarter: 4 }
        );
        assert_eq!(
            PeriodSpec::parse("this_quarter", today).unwrap(),
            PeriodSpec::Quarter { year: 2024, quarter: 1 }
        );

        let trailing = PeriodSpec::parse("LAST_12_MONTHS", today).unwrap().resolve().unwrap();
        assert_eq!(trailing.divisor, 1);
        assert_eq!(trailing.buckets.len(), 12);
        assert_eq!(trailing.first().unwrap().to_string(), "202301");
        assert_eq!(trailing.last().unwrap().to_string(), "202312");
    }

    #[test]
    fn test_group_by_quarter() {
        let resolved = "202402-202407".parse::<PeriodSpec>().unwrap().resolve().unwrap();
        let groups = group_by_quarter(&resolved.buckets);
        assert_eq!(groups.len(), 3);
        assert_eq!(groups[0].0.label(), "Jan-Mar 2024");
        assert_eq!(groups[0].1.len(), 2);
        assert_eq!(groups[1].1.len(), 3);
        assert_eq!(groups[2].0.to_string(), "2024Q3");
    }

    #[test]
    fn test_quarter_bucket_rejects_out_of_range() {
        assert!(QuarterBucket::new(2024, 0).is_err());
        assert!(QuarterBucket::new(2024, 5).is_err());
        assert!(serde_json::from_str::<QuarterBucket>("\"2024Q0\"").is_err());
        assert!(serde_json::from_str::<QuarterBucket>("\"2024Q5\"").is_err());

        let q4 = QuarterBucket::new(2023, 4).unwrap();
        assert_eq!(q4.label(), "Oct-Dec 2023");
        assert_eq!(serde_json::to_string(&q4).unwrap(), "\"2023Q4\"");
        assert_eq!(serde_json::from_str::<QuarterBucket>("\"2023Q4\"").unwrap(), q4);
    }

    #[test]
    fn test_quarter_slice_divisor_follows_months_present() {
        let resolved = "202402-202407".parse::<PeriodSpec>().unwrap().resolve().unwrap();
        let groups = group_by_quarter(&resolved.buckets);

        let two = ResolvedPeriod::quarter_slice(groups[0].0, &groups[0].1).unwrap();
        assert_eq!(two.divisor, 6);
        assert_eq!(two.label(), "Feb 2024 - Mar 2024");

        let three = ResolvedPeriod::quarter_slice(groups[1].0, &groups[1].1).unwrap();
        assert_eq!(three.divisor, 4);
        assert_eq!(three.spec, PeriodSpec::Quarter { year: 2024, quarter: 2 });

        let one = ResolvedPeriod::quarter_slice(groups[2].0, &groups[2].1).unwrap();
        assert_eq!(one.divisor, 12);
        assert_eq!(one.spec, PeriodSpec::Month { year: 2024, month: 7 });
    }

    #[test]
    fn test_quarter_slice_rejects_foreign_months() {
        let q1 = QuarterBucket::new(2024, 1).unwrap();
        let april = MonthBucket::new(2024, 4).unwrap();
        let jan = MonthBucket::new(2024, 1).unwrap();
        assert!(ResolvedPeriod::quarter_slice(q1, &[]).is_err());
        assert!(ResolvedPeriod::quarter_slice(q1, &[april]).is_err());
        assert!(ResolvedPeriod::quarter_slice(q1, &[jan, jan]).is_err());
    }

    #[test]
    fn test_weeks_start_on_mondays_inside_the_period() {
        let january = PeriodSpec::Month { year: 2024, month: 1 }.resolve().unwrap();
        let weeks = january.weeks();
        assert_eq!(weeks.len(), 5);
        assert_eq!(weeks[0].to_string(), "2024W1");
        assert_eq!(weeks[4].to_string(), "2024W5");
        assert_eq!(weeks[4].label(), "W5 2024 (29 Jan)");

        // February 2024 starts on a Thursday, so its first Monday is the 5th
        let february = PeriodSpec::Month { year: 2024, month: 2 }.resolve().unwrap();
        assert_eq!(february.weeks()[0].monday(), date(2024, 2, 5));

        let quarter = PeriodSpec::Quarter { year: 2024, quarter: 1 }.resolve().unwrap();
        assert_eq!(quarter.weeks().len(), 13);
        assert_eq!(
            weekly_dimension(&quarter.weeks()[..2]),
            "2024W1;2024W2"
        );
    }

    #[test]
    fn test_week_belonging_to_next_iso_year() {
        let december = PeriodSpec::Month { year: 2024, month: 12 }.resolve().unwrap();
        let weeks = december.weeks();
        assert_eq!(weeks.len(), 5);
        assert_eq!(weeks.last().unwrap().to_string(), "2025W1");
        assert_eq!(weeks.last().unwrap().monday(), date(2024, 12, 30));
    }

    #[test]
    fn test_week_bucket_parsing() {
        assert_eq!("2024W5".parse::<WeekBucket>().unwrap(), WeekBucket::new(2024, 5).unwrap());
        assert!("2024W0".parse::<WeekBucket>().is_err());
        assert!("2024W54".parse::<WeekBucket>().is_err());
        assert!("202405".parse::<WeekBucket>().is_err());
        // 2020 had 53 ISO weeks, 2021 did not
        assert!(WeekBucket::new(2020, 53).is_ok());
        assert!(WeekBucket::new(2021, 53).is_err());
        let week = WeekBucket::new(2024, 12).unwrap();
        assert_eq!(serde_json::to_string(&week).unwrap(), "\"2024W12\"");
    }

    #[test]
    fn test_month_bucket_serializes_as_period_id() {
        let bucket = MonthBucket::new(2024, 4).unwrap();
        assert_eq!(serde_json::to_string(&bucket).unwrap(), "\"202404\"");
        let back: MonthBucket = serde_json::from_str("\"202404\"").unwrap();
        assert_eq!(back, bucket);
    }
}
