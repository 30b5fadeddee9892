//! Semantic validation beyond what serde can express

use thiserror::Error;

use super::models::Config;

#[derive(Debug, Error)]
pub enum ValidationError {
    #[error("lookup.concurrency must be at least 1")]
    ZeroLookupConcurrency,

    #[error("lookup.timeout_secs must be at least 1")]
    ZeroLookupTimeout,

    #[error("lookup.endpoint must not be empty")]
    EmptyLookupEndpoint,

    #[error("cache.path must not be empty")]
    EmptyCachePath,

    #[error("bot.patterns must not contain blank entries")]
    BlankBotPattern,

    #[error("aggregate.dimensions contains a duplicate")]
    DuplicateDimension,

    #[error("{field} must not be empty")]
    EmptyPrefix { field: &'static str },
}

pub fn validate(config: &Config) -> Result<(), ValidationError> {
    if config.lookup.concurrency == 0 {
        return Err(ValidationError::ZeroLookupConcurrency);
    }
    if config.lookup.timeout_secs == 0 {
        return Err(ValidationError::ZeroLookupTimeout);
    }
    if config.lookup.endpoint.trim().is_empty() {
        return Err(ValidationError::EmptyLookupEndpoint);
    }
    if config.cache.path.as_os_str().is_empty() {
        return Err(ValidationError::EmptyCachePath);
    }
    if config.bot.patterns.iter().any(|p| p.trim().is_empty()) {
        return Err(ValidationError::BlankBotPattern);
    }

    let dims = &config.aggregate.dimensions;
    for (i, dim) in dims.iter().enumerate() {
        if dims[i + 1..].contains(dim) {
            return Err(ValidationError::DuplicateDimension);
        }
    }

    if config.input.prefix.trim().is_empty() {
        return Err(ValidationError::EmptyPrefix {
            field: "input.prefix",
        });
    }
    if config.output.prefix.trim().is_empty() {
        return Err(ValidationError::EmptyPrefix {
            field: "output.prefix",
        });
    }

    Ok(())
}
