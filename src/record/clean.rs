//! Record cleaning and normalization

use chrono::Utc;
use thiserror::Error;

use super::LogRecord;
use super::parse::RawRecord;

/// Why a record was dropped instead of cleaned
#[derive(Debug, Error, PartialEq, Eq)]
pub enum DropReason {
    #[error("missing client ip")]
    MissingClientIp,

    #[error("missing request path")]
    MissingPath,

    #[error("status code out of range: {0}")]
    InvalidStatus(i32),

    #[error("health-check user agent")]
    HealthCheckAgent,
}

/// Result of cleaning one raw record. `repairs` counts recoverable
/// anomalies that were coerced to a default (data-quality events).
#[derive(Debug, PartialEq)]
pub enum CleanOutcome {
    Kept { record: LogRecord, repairs: u32 },
    Dropped(DropReason),
}

/// Deterministic, stateless cleaner. Drops unrecoverable records, repairs
/// recoverable anomalies, and normalizes timestamps to UTC.
#[derive(Debug, Clone, Default)]
pub struct Cleaner {
    drop_user_agents: Vec<String>,
}

impl Cleaner {
    /// `drop_user_agents` are case-insensitive substrings (health checkers,
    /// probes) whose traffic is excluded entirely.
    pub fn new(drop_user_agents: &[String]) -> Self {
        Self {
            drop_user_agents: drop_user_agents
                .iter()
                .map(|s| s.to_ascii_lowercase())
                .collect(),
        }
    }

    pub fn clean(&self, raw: RawRecord) -> CleanOutcome {
        if raw.client_ip.trim().is_empty() || raw.client_ip == "-" {
            return CleanOutcome::Dropped(DropReason::MissingClientIp);
        }
        if raw.path.trim().is_empty() || raw.path == "-" {
            return CleanOutcome::Dropped(DropReason::MissingPath);
        }
        if !(100..=599).contains(&raw.status) {
            return CleanOutcome::Dropped(DropReason::InvalidStatus(raw.status));
        }

        let ua_lower = raw.user_agent.to_ascii_lowercase();
        if self.drop_user_agents.iter().any(|p| ua_lower.contains(p)) {
            return CleanOutcome::Dropped(DropReason::HealthCheckAgent);
        }

        let mut repairs = 0;

        let bytes_sent = if raw.bytes_sent < 0 {
            repairs += 1;
            0
        } else {
            raw.bytes_sent as u64
        };

        let response_time_ms = if raw.response_time_ms.is_finite() && raw.response_time_ms >= 0.0 {
            raw.response_time_ms
        } else {
            repairs += 1;
            0.0
        };

        let record = LogRecord {
            timestamp: raw.timestamp.with_timezone(&Utc),
            client_ip: raw.client_ip,
            path: raw.path,
            method: raw.method,
            status: raw.status as u16,
            response_time_ms,
            bytes_sent,
            user_agent: raw.user_agent,
        };

        CleanOutcome::Kept { record, repairs }
    }
}
