//! Batch pipeline orchestration
//!
//! One run is a pure left-to-right transformation: raw lines → parsed
//! records → cleaned records → enriched records → datasets. Per-record
//! errors are isolated and counted; only input acquisition, cache, and
//! dataset-write errors abort the run, and they do so before any partial
//! output is surfaced.

use serde::Serialize;
use thiserror::Error;
use tracing::{debug, info};
use uuid::Uuid;

use crate::aggregate::Aggregator;
use crate::geo::{CacheError, GeoCache, Resolver};
use crate::observability::Metrics;
use crate::output::{DatasetWriter, WriteError};
use crate::record::{CleanOutcome, Cleaner, LineParser};
use crate::source::{LogSource, SourceError};

#[derive(Debug, Error)]
pub enum PipelineError {
    #[error("Input source unreadable: {0}")]
    Source(#[from] SourceError),

    #[error("Geolocation cache error: {0}")]
    Cache(#[from] CacheError),

    #[error("Dataset write failed: {0}")]
    Write(#[from] WriteError),
}

pub type Result<T> = std::result::Result<T, PipelineError>;

/// Per-run completion report
#[derive(Debug, Clone, Serialize)]
pub struct BatchSummary {
    pub run_id: String,
    pub lines_read: u64,
    pub parse_failures: u64,
    pub records_dropped: u64,
    pub quality_repairs: u64,
    pub cache_hits: u64,
    pub lookups_attempted: u64,
    pub lookup_failures: u64,
    pub cleaned_rows: u64,
    pub bot_rows: u64,
    pub error_rows: u64,
    pub aggregation_rows: u64,
    /// Total addresses in the geolocation cache after this run
    pub cached_addresses: u64,
}

pub struct Pipeline {
    parser: LineParser,
    cleaner: Cleaner,
    resolver: Resolver,
    aggregator: Aggregator,
    writer: DatasetWriter,
    cache: GeoCache,
}

impl Pipeline {
    pub fn new(
        parser: LineParser,
        cleaner: Cleaner,
        resolver: Resolver,
        aggregator: Aggregator,
        writer: DatasetWriter,
        cache: GeoCache,
    ) -> Self {
        Self {
            parser,
            cleaner,
            resolver,
            aggregator,
            writer,
            cache,
        }
    }

    /// Execute one batch over the source
    pub async fn run(&self, source: &LogSource) -> Result<BatchSummary> {
        let run_id = Uuid::new_v4().to_string();
        let metrics = Metrics::new();
        info!(run_id, "Starting batch run");

        let lines = source.read_lines().await?;
        metrics.lines_read(lines.len() as u64);

        let mut raws = Vec::with_capacity(lines.len());
        for line in &lines {
            match self.parser.parse(line) {
                Ok(raw) => raws.push(raw),
                Err(e) => {
                    metrics.parse_failure();
                    debug!(error = %e, "Dropped unparsable line");
                }
            }
        }

        let mut cleaned = Vec::with_capacity(raws.len());
        for raw in raws {
            match self.cleaner.clean(raw) {
                CleanOutcome::Kept { record, repairs } => {
                    if repairs > 0 {
                        metrics.quality_repairs(repairs as u64);
                    }
                    cleaned.push(record);
                }
                CleanOutcome::Dropped(reason) => {
                    metrics.record_dropped();
                    debug!(%reason, "Dropped record");
                }
            }
        }

        let enriched = self.resolver.enrich(cleaned, &metrics).await?;
        let datasets = self.aggregator.partition(enriched);

        self.writer.write_all(&run_id, &datasets).await?;
        self.cache.persist()?;
        let cached_addresses = self.cache.len()? as u64;

        let snapshot = metrics.snapshot();
        let summary = BatchSummary {
            run_id,
            lines_read: snapshot.lines_read,
            parse_failures: snapshot.parse_failures,
            records_dropped: snapshot.records_dropped,
            quality_repairs: snapshot.quality_repairs,
            cache_hits: snapshot.cache_hits,
            lookups_attempted: snapshot.lookups_attempted,
            lookup_failures: snapshot.lookup_failures,
            cleaned_rows: datasets.cleaned.len() as u64,
            bot_rows: datasets.bots.len() as u64,
            error_rows: datasets.errors.len() as u64,
            aggregation_rows: datasets.aggregations.len() as u64,
            cached_addresses,
        };

        info!(
            run_id = summary.run_id,
            lines = summary.lines_read,
            parse_failures = summary.parse_failures,
            dropped = summary.records_dropped,
            repairs = summary.quality_repairs,
            cache_hits = summary.cache_hits,
            lookups = summary.lookups_attempted,
            lookup_failures = summary.lookup_failures,
            cleaned = summary.cleaned_rows,
            cached_addresses = summary.cached_addresses,
            "Batch completed"
        );

        Ok(summary)
    }
}
