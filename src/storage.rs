//! Object storage backends for log input and dataset output
//! Uses Apache Arrow object_store crate

use std::sync::Arc;

use object_store::ObjectStore;
use object_store::aws::AmazonS3Builder;
use object_store::local::LocalFileSystem;
use object_store::memory::InMemory;
use thiserror::Error;

use crate::config::{StoreConfig, StoreProvider};

#[derive(Debug, Error)]
pub enum StorageError {
    #[error("Object store error: {0}")]
    ObjectStore(#[from] object_store::Error),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

pub type Result<T> = std::result::Result<T, StorageError>;

/// Build an object store from configuration. Local creates its root
/// directory if missing; memory is for tests and dry runs.
pub fn open_store(config: &StoreConfig) -> Result<Arc<dyn ObjectStore>> {
    match config.provider {
        StoreProvider::Local => {
            std::fs::create_dir_all(&config.root)?;
            Ok(Arc::new(LocalFileSystem::new_with_prefix(&config.root)?))
        }
        StoreProvider::Memory => Ok(Arc::new(InMemory::new())),
        StoreProvider::S3 => {
            let mut builder = AmazonS3Builder::new().with_bucket_name(&config.bucket);
            if let Some(region) = &config.region {
                builder = builder.with_region(region);
            }
            if let Some(endpoint) = &config.endpoint {
                builder = builder.with_endpoint(endpoint);
            }
            if let Some(access_key) = &config.access_key {
                builder = builder.with_access_key_id(access_key);
            }
            if let Some(secret_key) = &config.secret_key {
                builder = builder.with_secret_access_key(secret_key);
            }
            Ok(Arc::new(builder.build()?))
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_open_memory_store() {
        let config = StoreConfig {
            provider: StoreProvider::Memory,
            ..StoreConfig::default()
        };
        assert!(open_store(&config).is_ok());
    }

    #[test]
    fn test_open_local_store_creates_root() {
        let temp_dir = TempDir::new().unwrap();
        let root = temp_dir.path().join("objects");
        let config = StoreConfig {
            provider: StoreProvider::Local,
            root: root.clone(),
            ..StoreConfig::default()
        };
        assert!(open_store(&config).is_ok());
        assert!(root.is_dir());
    }
}
