//! CSV parser for the vendor meter export.
//!
//! The export is a `;`-separated table whose first column carries the device
//! timestamp and whose cumulative meter column sits at a fixed position in
//! the full layout. Trimmed-down exports are handled by matching normalized
//! header names instead. Rows that cannot be parsed are dropped, not fatal.

use std::fmt;

use chrono::{NaiveDate, NaiveDateTime, NaiveTime};
use csv::StringRecord;
use thiserror::Error;
use tracing::{info, warn};

use crate::stats::Reading;

/// Position of the device timestamp in every export layout.
const TIMESTAMP_COLUMN_INDEX: usize = 0;

/// Position of the cumulative meter column in the full export layout.
const METER_COLUMN_INDEX: usize = 18;

/// Timestamp shapes observed across export versions, tried in order.
const TIMESTAMP_FORMATS: [&str; 5] = [
    "%Y-%m-%d %H:%M:%S",
    "%Y-%m-%dT%H:%M:%S",
    "%Y-%m-%d %H:%M",
    "%d/%m/%Y %H:%M:%S",
    "%d/%m/%Y %H:%M",
];

#[derive(Debug, Error)]
pub enum ParseError {
    #[error("could not read export CSV: {0}")]
    Csv(#[from] csv::Error),
    #[error("could not locate the meter column; headers found: [{headers}]")]
    ColumnNotFound { headers: String },
    #[error("no usable rows in export ({dropped} dropped for unparsable timestamp or meter value)")]
    NoUsableRows { dropped: usize },
}

/// One way of locating the meter column. Rules are tried in order and the
/// first match wins; the winning rule is logged for diagnostics.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ColumnRule {
    /// The column sits at this position in the full export layout.
    Index(usize),
    /// The normalized header name contains this fragment.
    NameContains(&'static str),
}

impl fmt::Display for ColumnRule {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ColumnRule::Index(i) => write!(f, "fixed column index {i}"),
            ColumnRule::NameContains(fragment) => write!(f, "header contains \"{fragment}\""),
        }
    }
}

/// The resolution order: full layouts resolve by position, trimmed exports
/// by progressively looser name fragments.
const METER_COLUMN_RULES: [ColumnRule; 4] = [
    ColumnRule::Index(METER_COLUMN_INDEX),
    ColumnRule::NameContains("hidrometro"),
    ColumnRule::NameContains("hidro"),
    ColumnRule::NameContains("hidr"),
];

/// Folds a header name for matching: accents stripped, lower-cased, spaces,
/// underscores, and hyphens removed, anything non-ASCII dropped.
fn normalize_header(raw: &str) -> String {
    raw.chars()
        .map(fold_accent)
        .flat_map(char::to_lowercase)
        .filter(|c| c.is_ascii() && !matches!(c, ' ' | '_' | '-'))
        .collect()
}

fn fold_accent(c: char) -> char {
    match c {
        'á' | 'à' | 'â' | 'ã' | 'ä' | 'Á' | 'À' | 'Â' | 'Ã' | 'Ä' => 'a',
        'é' | 'è' | 'ê' | 'ë' | 'É' | 'È' | 'Ê' | 'Ë' => 'e',
        'í' | 'ì' | 'î' | 'ï' | 'Í' | 'Ì' | 'Î' | 'Ï' => 'i',
        'ó' | 'ò' | 'ô' | 'õ' | 'ö' | 'Ó' | 'Ò' | 'Ô' | 'Õ' | 'Ö' => 'o',
        'ú' | 'ù' | 'û' | 'ü' | 'Ú' | 'Ù' | 'Û' | 'Ü' => 'u',
        'ç' | 'Ç' => 'c',
        'ñ' | 'Ñ' => 'n',
        _ => c,
    }
}

/// Resolves the meter column and reports which rule matched.
///
/// # Errors
///
/// Returns [`ParseError::ColumnNotFound`] with the normalized header list
/// when no rule matches.
pub fn resolve_meter_column(headers: &StringRecord) -> Result<(usize, ColumnRule), ParseError> {
    let normalized: Vec<String> = headers.iter().map(normalize_header).collect();

    for rule in METER_COLUMN_RULES {
        match rule {
            ColumnRule::Index(index) => {
                if headers.len() > index {
                    return Ok((index, rule));
                }
            }
            ColumnRule::NameContains(fragment) => {
                if let Some(index) = normalized.iter().position(|h| h.contains(fragment)) {
                    return Ok((index, rule));
                }
            }
        }
    }

    Err(ParseError::ColumnNotFound {
        headers: normalized.join(", "),
    })
}

fn parse_timestamp(raw: &str) -> Option<NaiveDateTime> {
    let raw = raw.trim();

    for format in TIMESTAMP_FORMATS {
        if let Ok(ts) = NaiveDateTime::parse_from_str(raw, format) {
            return Some(ts);
        }
    }

    // Date-only rows count as midnight
    NaiveDate::parse_from_str(raw, "%Y-%m-%d")
        .or_else(|_| NaiveDate::parse_from_str(raw, "%d/%m/%Y"))
        .ok()
        .map(|d| d.and_time(NaiveTime::MIN))
}

/// Meter values use a dot decimal separator in recent exports and a comma
/// in older ones; non-finite and empty values are treated as missing.
fn parse_value(raw: &str) -> Option<f64> {
    let raw = raw.trim();
    if raw.is_empty() {
        return None;
    }

    raw.parse::<f64>()
        .ok()
        .or_else(|| raw.replace(',', ".").parse().ok())
        .filter(|v| v.is_finite())
}

/// Parses raw export bytes into readings.
///
/// Rows with an unparsable timestamp or meter value are dropped with a
/// warning; parsing only fails when the meter column cannot be located or
/// nothing usable remains.
pub fn parse_readings(bytes: &[u8]) -> Result<Vec<Reading>, ParseError> {
    // Exports are nominally Latin-1; lossy decoding is fine because the
    // columns we read are numeric or ASCII timestamps, and header matching
    // strips non-ASCII anyway.
    let text = String::from_utf8_lossy(bytes);

    let mut reader = csv::ReaderBuilder::new()
        .delimiter(b';')
        .flexible(true)
        .from_reader(text.as_bytes());

    let headers = reader.headers()?.clone();
    let (meter_index, rule) = resolve_meter_column(&headers)?;
    info!(column = meter_index, rule = %rule, "meter column resolved");

    let mut readings = Vec::new();
    let mut dropped = 0usize;

    for record in reader.records() {
        let record = record?;

        let timestamp = record.get(TIMESTAMP_COLUMN_INDEX).and_then(parse_timestamp);
        let value = record.get(meter_index).and_then(parse_value);

        match (timestamp, value) {
            (Some(timestamp), Some(value)) => readings.push(Reading { timestamp, value }),
            _ => dropped += 1,
        }
    }

    if dropped > 0 {
        warn!(dropped, kept = readings.len(), "dropped unparsable export rows");
    }
    if readings.is_empty() {
        return Err(ParseError::NoUsableRows { dropped });
    }

    Ok(readings)
}
