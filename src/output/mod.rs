//! Dataset writer: persists the four batch datasets as NDJSON
//!
//! Thin collaborator behind the aggregator. Column schemas are the serde
//! shapes of [`EnrichedRecord`](crate::record::EnrichedRecord) and
//! [`SummaryRow`](crate::aggregate::SummaryRow) and stay stable across runs.

use std::sync::Arc;

use bytes::Bytes;
use object_store::{ObjectStore, path::Path as StoragePath};
use serde::Serialize;
use thiserror::Error;
use tracing::info;

use crate::aggregate::BatchDatasets;

#[derive(Debug, Error)]
pub enum WriteError {
    #[error("Object store error: {0}")]
    ObjectStore(#[from] object_store::Error),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}

pub type Result<T> = std::result::Result<T, WriteError>;

/// Object keys of the datasets written for one run
#[derive(Debug, Clone)]
pub struct WrittenDatasets {
    pub cleaned: String,
    pub bots: String,
    pub errors: String,
    pub aggregations: String,
}

pub struct DatasetWriter {
    store: Arc<dyn ObjectStore>,
    prefix: String,
}

impl DatasetWriter {
    pub fn new(store: Arc<dyn ObjectStore>, prefix: impl Into<String>) -> Self {
        Self {
            store,
            prefix: prefix.into().trim_end_matches('/').to_string(),
        }
    }

    /// Write all four datasets under `{prefix}/{run_id}/`
    pub async fn write_all(&self, run_id: &str, datasets: &BatchDatasets) -> Result<WrittenDatasets> {
        Ok(WrittenDatasets {
            cleaned: self.write_rows(run_id, "cleaned", &datasets.cleaned).await?,
            bots: self.write_rows(run_id, "bot_traffic", &datasets.bots).await?,
            errors: self.write_rows(run_id, "errors", &datasets.errors).await?,
            aggregations: self
                .write_rows(run_id, "aggregations", &datasets.aggregations)
                .await?,
        })
    }

    async fn write_rows<T: Serialize>(&self, run_id: &str, name: &str, rows: &[T]) -> Result<String> {
        let mut buf = Vec::new();
        for row in rows {
            serde_json::to_writer(&mut buf, row)?;
            buf.push(b'\n');
        }

        let key = format!("{}/{}/{}.ndjson", self.prefix, run_id, name);
        self.store
            .put(&StoragePath::from(key.clone()), Bytes::from(buf).into())
            .await?;

        info!(key, rows = rows.len(), "Dataset written");
        Ok(key)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::aggregate::{Aggregator, Dimension, TimeBucket};
    use crate::record::{EnrichedRecord, LogRecord};
    use chrono::{TimeZone, Utc};
    use object_store::memory::InMemory;

    fn sample_record(status: u16, is_bot: bool) -> EnrichedRecord {
        EnrichedRecord {
            record: LogRecord {
                timestamp: Utc.with_ymd_and_hms(2024, 1, 1, 0, 0, 1).unwrap(),
                client_ip: "203.0.113.5".to_string(),
                path: "/index.html".to_string(),
                method: "GET".to_string(),
                status,
                response_time_ms: 150.0,
                bytes_sent: 512,
                user_agent: "Mozilla/5.0".to_string(),
            },
            country: Some("US".to_string()),
            region: None,
            city: None,
            is_bot,
        }
    }

    async fn read_lines(store: &InMemory, key: &str) -> Vec<String> {
        let data = store
            .get(&StoragePath::from(key))
            .await
            .unwrap()
            .bytes()
            .await
            .unwrap();
        String::from_utf8(data.to_vec())
            .unwrap()
            .lines()
            .map(String::from)
            .collect()
    }

    #[tokio::test]
    async fn test_write_all_datasets() {
        let store = Arc::new(InMemory::new());
        let writer = DatasetWriter::new(store.clone(), "datasets/");

        let aggregator = Aggregator::new(TimeBucket::Hour, &[Dimension::Country]);
        let datasets = aggregator.partition(vec![
            sample_record(200, false),
            sample_record(503, true),
        ]);

        let written = writer.write_all("run-1", &datasets).await.unwrap();
        assert_eq!(written.cleaned, "datasets/run-1/cleaned.ndjson");

        let cleaned = read_lines(&store, &written.cleaned).await;
        assert_eq!(cleaned.len(), 2);
        let bots = read_lines(&store, &written.bots).await;
        assert_eq!(bots.len(), 1);
        let errors = read_lines(&store, &written.errors).await;
        assert_eq!(errors.len(), 1);

        // Rows parse back with the flattened record schema
        let row: serde_json::Value = serde_json::from_str(&cleaned[0]).unwrap();
        assert_eq!(row["client_ip"], "203.0.113.5");
        assert_eq!(row["status"], 200);
        assert_eq!(row["country"], "US");
        assert_eq!(row["is_bot"], false);
    }

    #[tokio::test]
    async fn test_empty_datasets_still_written() {
        let store = Arc::new(InMemory::new());
        let writer = DatasetWriter::new(store.clone(), "datasets");

        let written = writer
            .write_all("run-2", &BatchDatasets::default())
            .await
            .unwrap();
        assert!(read_lines(&store, &written.aggregations).await.is_empty());
    }
}
