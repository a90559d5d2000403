//! Fetched dose/event counts for one org unit.
//!
//! Counts are keyed by monthly bucket and data element code. A key that was
//! never reported reads as zero; [`RawCounts::is_reported`] still tells the
//! two apart for callers that want to show the gap.

use std::collections::BTreeMap;

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use crate::period::MonthBucket;

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct RawCounts {
    values: BTreeMap<MonthBucket, BTreeMap<String, Decimal>>,
}

impl RawCounts {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a value, summing with anything already stored under the key.
    pub fn add(&mut self, bucket: MonthBucket, code: &str, value: Decimal) {
        *self
            .values
            .entry(bucket)
            .or_default()
            .entry(code.to_string())
            .or_insert(Decimal::ZERO) += value;
    }

    pub fn get(&self, bucket: MonthBucket, code: &str) -> Decimal {
        self.values
            .get(&bucket)
            .and_then(|codes| codes.get(code))
            .copied()
            .unwrap_or(Decimal::ZERO)
    }

    pub fn is_reported(&self, bucket: MonthBucket, code: &str) -> bool {
        self.values
            .get(&bucket)
            .is_some_and(|codes| codes.contains_key(code))
    }

    /// Sum of `code` across `buckets`.
    pub fn total(&self, buckets: &[MonthBucket], code: &str) -> Decimal {
        buckets.iter().map(|&b| self.get(b, code)).sum()
    }

    /// Sum of several codes across `buckets`.
    pub fn total_of(&self, buckets: &[MonthBucket], codes: &[&str]) -> Decimal {
        codes.iter().map(|code| self.total(buckets, code)).sum()
    }

    /// One value per bucket, in bucket order.
    pub fn series(&self, buckets: &[MonthBucket], code: &str) -> Vec<(MonthBucket, Decimal)> {
        buckets.iter().map(|&b| (b, self.get(b, code))).collect()
    }

    /// Only the buckets that reported `code`, in bucket order.
    pub fn reported_values(&self, buckets: &[MonthBucket], code: &str) -> Vec<Decimal> {
        buckets
            .iter()
            .filter(|&&b| self.is_reported(b, code))
            .map(|&b| self.get(b, code))
            .collect()
    }

    /// How many of `buckets` reported `code`.
    pub fn reported_count(&self, buckets: &[MonthBucket], code: &str) -> usize {
        buckets.iter().filter(|&&b| self.is_reported(b, code)).count()
    }

    pub fn merge(&mut self, other: RawCounts) {
        for (bucket, codes) in other.values {
            for (code, value) in codes {
                self.add(bucket, &code, value);
            }
        }
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }
}
