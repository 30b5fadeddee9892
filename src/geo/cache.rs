use std::path::Path;

use chrono::{DateTime, Utc};
use fjall::{Config, Keyspace, PartitionCreateOptions, PartitionHandle};
use serde::{Deserialize, Serialize};
use tracing::{debug, info};

use super::client::GeoLocation;
use super::error::Result;

/// Last known resolution outcome for one client IP. Failed lookups are
/// cached too, so a known-unresolvable address is not retried on every
/// record that carries it.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GeoCacheEntry {
    pub country: Option<String>,
    pub region: Option<String>,
    pub city: Option<String>,
    pub resolved_at: DateTime<Utc>,
    pub success: bool,
}

impl GeoCacheEntry {
    pub fn resolved(location: GeoLocation, resolved_at: DateTime<Utc>) -> Self {
        Self {
            country: location.country,
            region: location.region,
            city: location.city,
            resolved_at,
            success: true,
        }
    }

    pub fn failed(resolved_at: DateTime<Utc>) -> Self {
        Self {
            country: None,
            region: None,
            city: None,
            resolved_at,
            success: false,
        }
    }
}

/// Fjall-backed persistent IP-to-geolocation cache.
///
/// At most one entry per IP; `store` overwrites. Reads observe writes made
/// earlier in the same process, and `persist` makes the batch's writes
/// durable across process lifetimes.
#[derive(Clone)]
pub struct GeoCache {
    keyspace: Keyspace,
    entries: PartitionHandle,
}

impl GeoCache {
    /// Open or create a cache at the given path
    pub fn open<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        info!("Opening geolocation cache at: {}", path.display());

        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }

        let keyspace = Config::new(path).open()?;
        let entries = keyspace.open_partition("geo", PartitionCreateOptions::default())?;

        Ok(Self { keyspace, entries })
    }

    /// Look up the cached outcome for an IP. `None` means never attempted;
    /// an entry with `success == false` means attempted and failed.
    pub fn lookup(&self, ip: &str) -> Result<Option<GeoCacheEntry>> {
        match self.entries.get(ip.as_bytes())? {
            Some(value) => {
                let entry = serde_json::from_slice(&value)?;
                Ok(Some(entry))
            }
            None => Ok(None),
        }
    }

    /// Store or overwrite the outcome for an IP
    pub fn store(&self, ip: &str, entry: &GeoCacheEntry) -> Result<()> {
        let value = serde_json::to_vec(entry)?;
        self.entries.insert(ip.as_bytes(), value)?;
        debug!(ip, success = entry.success, "Cached geolocation outcome");
        Ok(())
    }

    /// Flush all pending writes to disk
    pub fn persist(&self) -> Result<()> {
        self.keyspace.persist(fjall::PersistMode::SyncAll)?;
        Ok(())
    }

    /// Number of cached addresses
    pub fn len(&self) -> Result<usize> {
        let mut count = 0;
        for item in self.entries.iter() {
            item?;
            count += 1;
        }
        Ok(count)
    }

    pub fn is_empty(&self) -> Result<bool> {
        Ok(self.len()? == 0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    fn create_test_cache() -> (GeoCache, TempDir) {
        let temp_dir = TempDir::new().unwrap();
        let cache = GeoCache::open(temp_dir.path().join("geo_cache")).unwrap();
        (cache, temp_dir)
    }

    fn sample_entry(success: bool) -> GeoCacheEntry {
        if success {
            GeoCacheEntry::resolved(
                GeoLocation {
                    country: Some("US".to_string()),
                    region: Some("California".to_string()),
                    city: Some("San Jose".to_string()),
                },
                Utc::now(),
            )
        } else {
            GeoCacheEntry::failed(Utc::now())
        }
    }

    #[test]
    fn test_open_cache() {
        let temp_dir = TempDir::new().unwrap();
        assert!(GeoCache::open(temp_dir.path().join("geo_cache")).is_ok());
    }

    #[test]
    fn test_read_your_writes() {
        let (cache, _temp) = create_test_cache();
        let entry = sample_entry(true);

        cache.store("203.0.113.5", &entry).unwrap();
        let retrieved = cache.lookup("203.0.113.5").unwrap();

        assert_eq!(retrieved, Some(entry));
    }

    #[test]
    fn test_never_attempted_is_none() {
        let (cache, _temp) = create_test_cache();
        assert_eq!(cache.lookup("198.51.100.9").unwrap(), None);
    }

    #[test]
    fn test_failure_distinct_from_absent() {
        let (cache, _temp) = create_test_cache();
        cache.store("198.51.100.9", &sample_entry(false)).unwrap();

        let entry = cache.lookup("198.51.100.9").unwrap().unwrap();
        assert!(!entry.success);
        assert_eq!(entry.country, None);
    }

    #[test]
    fn test_store_overwrites() {
        let (cache, _temp) = create_test_cache();
        cache.store("203.0.113.5", &sample_entry(false)).unwrap();
        cache.store("203.0.113.5", &sample_entry(true)).unwrap();

        let entry = cache.lookup("203.0.113.5").unwrap().unwrap();
        assert!(entry.success);
        assert_eq!(cache.len().unwrap(), 1);
    }

    #[test]
    fn test_survives_reopen() {
        let temp_dir = TempDir::new().unwrap();
        let path = temp_dir.path().join("geo_cache");
        let entry = sample_entry(true);

        {
            let cache = GeoCache::open(&path).unwrap();
            cache.store("203.0.113.5", &entry).unwrap();
            cache.persist().unwrap();
        }

        let cache = GeoCache::open(&path).unwrap();
        assert_eq!(cache.lookup("203.0.113.5").unwrap(), Some(entry));
    }
}
