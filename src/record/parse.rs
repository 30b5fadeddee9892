//! Access-log line parsing

use chrono::{DateTime, FixedOffset};
use serde::{Deserialize, Serialize};
use thiserror::Error;

#[derive(Debug, Error)]
pub enum ParseError {
    #[error("empty line")]
    Empty,

    #[error("expected at least {expected} fields, found {found}")]
    FieldCount { expected: usize, found: usize },

    #[error("unparsable timestamp: {0}")]
    Timestamp(String),

    #[error("non-numeric {field}: {value}")]
    Numeric { field: &'static str, value: String },
}

pub type Result<T> = std::result::Result<T, ParseError>;

/// Number of fields the canonical line format defines. Extra trailing
/// fields are ignored so newer log schemas keep parsing.
pub const FIELD_COUNT: usize = 8;

/// Field separator used by the log source
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Delimiter {
    Comma,
    Space,
}

impl Delimiter {
    pub fn as_char(&self) -> char {
        match self {
            Delimiter::Comma => ',',
            Delimiter::Space => ' ',
        }
    }
}

impl Default for Delimiter {
    fn default() -> Self {
        Delimiter::Comma
    }
}

/// One parsed line before cleaning. Numeric fields are unchecked (may be
/// negative) and the timestamp keeps its original UTC offset; the cleaner
/// owns repair and normalization.
#[derive(Debug, Clone, PartialEq)]
pub struct RawRecord {
    pub timestamp: DateTime<FixedOffset>,
    pub client_ip: String,
    pub path: String,
    pub method: String,
    pub status: i32,
    pub response_time_ms: f64,
    pub bytes_sent: i64,
    pub user_agent: String,
}

/// Parser for one raw log line. Pure: no side effects, no shared state.
#[derive(Debug, Clone)]
pub struct LineParser {
    delimiter: Delimiter,
}

impl LineParser {
    pub fn new(delimiter: Delimiter) -> Self {
        Self { delimiter }
    }

    pub fn delimiter(&self) -> Delimiter {
        self.delimiter
    }

    /// Parse one line into a [`RawRecord`]
    pub fn parse(&self, line: &str) -> Result<RawRecord> {
        let line = line.trim();
        if line.is_empty() {
            return Err(ParseError::Empty);
        }

        let fields = split_delimited(line, self.delimiter.as_char());
        if fields.len() < FIELD_COUNT {
            return Err(ParseError::FieldCount {
                expected: FIELD_COUNT,
                found: fields.len(),
            });
        }

        let timestamp = DateTime::parse_from_rfc3339(&fields[0])
            .map_err(|_| ParseError::Timestamp(fields[0].clone()))?;

        let status = parse_number::<i32>("status", &fields[4])?;
        let response_time_ms = parse_number::<f64>("response_time_ms", &fields[5])?;
        let bytes_sent = parse_number::<i64>("bytes_sent", &fields[6])?;

        Ok(RawRecord {
            timestamp,
            client_ip: fields[1].clone(),
            path: fields[2].clone(),
            method: fields[3].clone(),
            status,
            response_time_ms,
            bytes_sent,
            user_agent: fields[7].clone(),
        })
    }
}

fn parse_number<T: std::str::FromStr>(field: &'static str, value: &str) -> Result<T> {
    value.parse().map_err(|_| ParseError::Numeric {
        field,
        value: value.to_string(),
    })
}

/// Split a line on `delim`, honoring double-quoted fields so user agents
/// containing the delimiter stay intact. A doubled quote inside a quoted
/// field is a literal quote; enclosing quotes are stripped. Runs of the
/// space delimiter collapse; empty comma fields are preserved.
fn split_delimited(line: &str, delim: char) -> Vec<String> {
    let mut fields = Vec::new();
    let mut current = String::new();
    let mut in_quotes = false;
    let mut chars = line.chars().peekable();

    while let Some(ch) = chars.next() {
        match ch {
            '"' if in_quotes => {
                if chars.peek() == Some(&'"') {
                    chars.next();
                    current.push('"');
                } else {
                    in_quotes = false;
                }
            }
            '"' => in_quotes = true,
            c if c == delim && !in_quotes => {
                if delim == ' ' && current.is_empty() {
                    continue;
                }
                fields.push(std::mem::take(&mut current));
            }
            c => current.push(c),
        }
    }

    if !current.is_empty() || delim != ' ' {
        fields.push(current);
    }

    fields
}

/// Quote a field for re-serialization if it contains the delimiter or a
/// quote. Embedded quotes are doubled, mirroring `split_delimited`.
pub(crate) fn quote_field(value: &str, delim: char) -> String {
    if value.contains(delim) || value.contains('"') {
        format!("\"{}\"", value.replace('"', "\"\""))
    } else {
        value.to_string()
    }
}
