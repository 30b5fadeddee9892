//! Enrichment resolver: cache-first geolocation with deduplicated,
//! bounded-concurrency external lookups

use std::collections::{BTreeSet, HashMap};
use std::sync::Arc;

use chrono::Utc;
use tokio::sync::Semaphore;
use tokio::task::JoinSet;
use tracing::{error, info, warn};

use crate::bot::BotClassifier;
use crate::observability::Metrics;
use crate::record::{EnrichedRecord, LogRecord};

use super::cache::{GeoCache, GeoCacheEntry};
use super::client::{GeoLookup, LookupError};
use super::error::Result;

/// Resolver behavior knobs
#[derive(Debug, Clone)]
pub struct ResolverConfig {
    /// Maximum in-flight external lookups
    pub concurrency: usize,
    /// Whether a failure cached by an earlier run is retried this run.
    /// Within one batch a failure is never retried.
    pub retry_cached_failures: bool,
}

impl Default for ResolverConfig {
    fn default() -> Self {
        Self {
            concurrency: 4,
            retry_cached_failures: true,
        }
    }
}

/// Resolves geolocation for a batch of cleaned records and attaches the
/// automated-traffic flag.
///
/// External lookups are issued at most once per unique IP per batch: the
/// batch's addresses are partitioned against the cache up front, and only
/// the misses are dispatched. Every outcome, success or failure, lands in
/// the cache before any record is enriched.
pub struct Resolver {
    cache: GeoCache,
    lookup: Arc<dyn GeoLookup>,
    classifier: BotClassifier,
    config: ResolverConfig,
}

impl Resolver {
    pub fn new(
        cache: GeoCache,
        lookup: Arc<dyn GeoLookup>,
        classifier: BotClassifier,
        config: ResolverConfig,
    ) -> Self {
        Self {
            cache,
            lookup,
            classifier,
            config,
        }
    }

    pub async fn enrich(
        &self,
        records: Vec<LogRecord>,
        metrics: &Metrics,
    ) -> Result<Vec<EnrichedRecord>> {
        let unique_ips: BTreeSet<&str> = records.iter().map(|r| r.client_ip.as_str()).collect();

        let mut resolved: HashMap<String, GeoCacheEntry> = HashMap::new();
        let mut pending: Vec<String> = Vec::new();

        // Partition against the cache once, before any dispatch. Cache
        // state seen here predates the batch, so a cached failure is only
        // a retry candidate under the cross-run retry policy.
        for ip in unique_ips {
            match self.cache.lookup(ip)? {
                Some(entry) if entry.success || !self.config.retry_cached_failures => {
                    metrics.cache_hit();
                    resolved.insert(ip.to_string(), entry);
                }
                _ => pending.push(ip.to_string()),
            }
        }

        if !pending.is_empty() {
            info!(
                addresses = pending.len(),
                cached = resolved.len(),
                "Resolving geolocation for new addresses"
            );
            self.resolve_pending(pending, &mut resolved, metrics)
                .await?;
        }

        let enriched = records
            .into_iter()
            .map(|record| {
                let entry = resolved.get(&record.client_ip);
                let is_bot = self.classifier.is_bot(&record.user_agent);
                EnrichedRecord {
                    country: entry.and_then(|e| e.country.clone()),
                    region: entry.and_then(|e| e.region.clone()),
                    city: entry.and_then(|e| e.city.clone()),
                    is_bot,
                    record,
                }
            })
            .collect();

        Ok(enriched)
    }

    /// Fan out lookups for cache misses under the concurrency bound, then
    /// store every outcome. Cache writes happen on this task, serialized.
    async fn resolve_pending(
        &self,
        pending: Vec<String>,
        resolved: &mut HashMap<String, GeoCacheEntry>,
        metrics: &Metrics,
    ) -> Result<()> {
        let semaphore = Arc::new(Semaphore::new(self.config.concurrency.max(1)));
        let mut tasks: JoinSet<(String, super::client::Result<_>)> = JoinSet::new();

        for ip in pending {
            let semaphore = Arc::clone(&semaphore);
            let lookup = Arc::clone(&self.lookup);
            tasks.spawn(async move {
                let _permit = match semaphore.acquire_owned().await {
                    Ok(permit) => permit,
                    Err(_) => {
                        return (
                            ip,
                            Err(LookupError::Transport("concurrency limiter closed".into())),
                        );
                    }
                };
                let outcome = lookup.resolve(&ip).await;
                (ip, outcome)
            });
        }

        while let Some(joined) = tasks.join_next().await {
            let (ip, outcome) = match joined {
                Ok(pair) => pair,
                Err(e) => {
                    error!(error = %e, "Lookup task panicked");
                    continue;
                }
            };

            metrics.lookup_attempted();
            let entry = match outcome {
                Ok(location) => GeoCacheEntry::resolved(location, Utc::now()),
                Err(e) => {
                    metrics.lookup_failed();
                    warn!(ip, error = %e, "Geolocation lookup failed");
                    GeoCacheEntry::failed(Utc::now())
                }
            };

            self.cache.store(&ip, &entry)?;
            resolved.insert(ip, entry);
        }

        Ok(())
    }
}
