//! Aggregation of enriched records into grouped buckets and the four named
//! output datasets
//!
//! Bucket values are sums and counts only, so the fold is commutative and
//! associative: the final numbers do not depend on record order.

use std::collections::BTreeMap;

use chrono::{DateTime, DurationRound, TimeDelta, Utc};
use serde::{Deserialize, Serialize};

use crate::record::{EnrichedRecord, StatusClass};

/// Time granularity for the bucket key
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum TimeBucket {
    Hour,
    Day,
}

impl TimeBucket {
    pub fn truncate(&self, ts: DateTime<Utc>) -> DateTime<Utc> {
        let step = match self {
            TimeBucket::Hour => TimeDelta::hours(1),
            TimeBucket::Day => TimeDelta::days(1),
        };
        ts.duration_trunc(step).unwrap_or(ts)
    }
}

impl Default for TimeBucket {
    fn default() -> Self {
        TimeBucket::Hour
    }
}

/// Grouping dimensions beyond the time bucket
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Dimension {
    Country,
    StatusClass,
    IsBot,
}

/// Grouping key. Dimensions not selected in the configuration stay `None`
/// for every record, so they do not split buckets.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
pub struct BucketKey {
    pub bucket_start: DateTime<Utc>,
    pub country: Option<String>,
    pub status_class: Option<StatusClass>,
    pub is_bot: Option<bool>,
}

/// Running accumulator for one grouping key
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct AggregateBucket {
    pub requests: u64,
    pub total_bytes: u64,
    pub response_time_sum_ms: f64,
    pub response_time_count: u64,
    pub bot_requests: u64,
}

impl AggregateBucket {
    fn fold(&mut self, record: &EnrichedRecord) {
        self.requests += 1;
        self.total_bytes += record.record.bytes_sent;
        self.response_time_sum_ms += record.record.response_time_ms;
        self.response_time_count += 1;
        if record.is_bot {
            self.bot_requests += 1;
        }
    }

    /// Mean response time, or `None` for an empty bucket (never divides
    /// by zero)
    pub fn mean_response_time_ms(&self) -> Option<f64> {
        if self.response_time_count == 0 {
            None
        } else {
            Some(self.response_time_sum_ms / self.response_time_count as f64)
        }
    }
}

/// One materialized aggregation output row
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SummaryRow {
    pub bucket_start: DateTime<Utc>,
    pub country: Option<String>,
    pub status_class: Option<StatusClass>,
    pub is_bot: Option<bool>,
    pub requests: u64,
    pub total_bytes: u64,
    pub mean_response_time_ms: Option<f64>,
    pub bot_requests: u64,
}

/// The four named output datasets of one batch
#[derive(Debug, Default)]
pub struct BatchDatasets {
    pub cleaned: Vec<EnrichedRecord>,
    pub bots: Vec<EnrichedRecord>,
    pub errors: Vec<EnrichedRecord>,
    pub aggregations: Vec<SummaryRow>,
}

/// Folds enriched records into buckets and partitions them into datasets
#[derive(Debug, Clone)]
pub struct Aggregator {
    time_bucket: TimeBucket,
    dimensions: Vec<Dimension>,
}

impl Aggregator {
    pub fn new(time_bucket: TimeBucket, dimensions: &[Dimension]) -> Self {
        Self {
            time_bucket,
            dimensions: dimensions.to_vec(),
        }
    }

    fn key_for(&self, record: &EnrichedRecord) -> BucketKey {
        let mut key = BucketKey {
            bucket_start: self.time_bucket.truncate(record.record.timestamp),
            country: None,
            status_class: None,
            is_bot: None,
        };
        for dimension in &self.dimensions {
            match dimension {
                Dimension::Country => key.country = record.country.clone(),
                Dimension::StatusClass => key.status_class = Some(record.status_class()),
                Dimension::IsBot => key.is_bot = Some(record.is_bot),
            }
        }
        key
    }

    /// Fold records into buckets. Ordered map, so output rows are
    /// deterministic.
    pub fn aggregate(&self, records: &[EnrichedRecord]) -> BTreeMap<BucketKey, AggregateBucket> {
        let mut buckets: BTreeMap<BucketKey, AggregateBucket> = BTreeMap::new();
        for record in records {
            buckets.entry(self.key_for(record)).or_default().fold(record);
        }
        buckets
    }

    pub fn summarize(buckets: BTreeMap<BucketKey, AggregateBucket>) -> Vec<SummaryRow> {
        buckets
            .into_iter()
            .filter(|(_, bucket)| bucket.requests > 0)
            .map(|(key, bucket)| SummaryRow {
                bucket_start: key.bucket_start,
                country: key.country,
                status_class: key.status_class,
                is_bot: key.is_bot,
                requests: bucket.requests,
                total_bytes: bucket.total_bytes,
                mean_response_time_ms: bucket.mean_response_time_ms(),
                bot_requests: bucket.bot_requests,
            })
            .collect()
    }

    /// Build all four datasets. A record may land in several: a 503 from a
    /// crawler shows up in cleaned, errors, and bots at once.
    pub fn partition(&self, records: Vec<EnrichedRecord>) -> BatchDatasets {
        let aggregations = Self::summarize(self.aggregate(&records));
        let bots = records.iter().filter(|r| r.is_bot).cloned().collect();
        let errors = records.iter().filter(|r| r.is_error()).cloned().collect();

        BatchDatasets {
            bots,
            errors,
            aggregations,
            cleaned: records,
        }
    }
}
