//! Raw log acquisition from object storage
//!
//! Thin collaborator in front of the pipeline. Any listing or read failure
//! here is fatal to the run: the batch aborts before writing any output.

use std::sync::Arc;

use object_store::{ObjectStore, path::Path as StoragePath};
use thiserror::Error;
use tracing::info;

#[derive(Debug, Error)]
pub enum SourceError {
    #[error("Object store error: {0}")]
    ObjectStore(#[from] object_store::Error),

    #[error("Object {key} is not valid UTF-8")]
    Encoding { key: String },
}

pub type Result<T> = std::result::Result<T, SourceError>;

/// Reads every log object under a prefix and splits it into lines
pub struct LogSource {
    store: Arc<dyn ObjectStore>,
    prefix: StoragePath,
}

impl LogSource {
    pub fn new(store: Arc<dyn ObjectStore>, prefix: &str) -> Self {
        Self {
            store,
            prefix: StoragePath::from(prefix),
        }
    }

    /// Fetch the whole batch of raw lines. The prefix is walked
    /// recursively, so date-partitioned layouts like `logs/2024/06/a.log`
    /// are included. Blank lines are skipped; objects are read in key
    /// order so batches are reproducible.
    pub async fn read_lines(&self) -> Result<Vec<String>> {
        let mut objects = Vec::new();
        let mut prefixes = vec![self.prefix.clone()];
        while let Some(prefix) = prefixes.pop() {
            let listing = self.store.list_with_delimiter(Some(&prefix)).await?;
            objects.extend(listing.objects);
            prefixes.extend(listing.common_prefixes);
        }
        objects.sort_by(|a, b| a.location.cmp(&b.location));

        let mut lines = Vec::new();
        for meta in objects {
            let data = self.store.get(&meta.location).await?.bytes().await?;
            let text = String::from_utf8(data.to_vec()).map_err(|_| SourceError::Encoding {
                key: meta.location.to_string(),
            })?;

            let before = lines.len();
            lines.extend(
                text.lines()
                    .filter(|line| !line.trim().is_empty())
                    .map(String::from),
            );
            info!(key = %meta.location, lines = lines.len() - before, "Read log object");
        }

        Ok(lines)
    }
}
