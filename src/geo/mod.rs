//! Geolocation enrichment: persistent cache, external lookup client, and
//! the batch resolver
//!
//! The cache is the single source of truth for "have we resolved this IP
//! before", including failures. The resolver consults it first and issues
//! at most one external lookup per unique address per batch.

pub mod cache;
pub mod client;
pub mod error;
pub mod resolver;

pub use cache::{GeoCache, GeoCacheEntry};
pub use client::{GeoClientConfig, GeoLocation, GeoLookup, HttpGeoClient, LookupError};
pub use error::{CacheError, Result};
pub use resolver::{Resolver, ResolverConfig};
