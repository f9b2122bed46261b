use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

use chrono::{DateTime, SecondsFormat};
use serde::Serialize;
use sweep_core::{Source, SubdomainRecord, Timestamp};

use crate::persist::{AtomicFileWriter, PersistError};

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ExportDocument {
    pub timestamp: String,
    pub total_count: usize,
    pub subdomains: Vec<ExportEntry>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ExportEntry {
    pub domain: String,
    pub source: Source,
    pub found_at: String,
}

#[derive(Debug, thiserror::Error)]
pub enum ExportError {
    #[error("persist error: {0}")]
    Persist(#[from] PersistError),
    #[error("cannot encode export: {0}")]
    Encode(#[from] serde_json::Error),
}

/// One entry per domain, ascending. When a domain appears more than once
/// the first record wins.
pub fn build_export(records: &[SubdomainRecord], now: Timestamp) -> ExportDocument {
    let mut by_domain: BTreeMap<&str, &SubdomainRecord> = BTreeMap::new();
    for record in records {
        by_domain.entry(record.domain.as_str()).or_insert(record);
    }

    let subdomains: Vec<ExportEntry> = by_domain
        .into_values()
        .map(|record| ExportEntry {
            domain: record.domain.clone(),
            source: record.source,
            found_at: format_timestamp(record.timestamp),
        })
        .collect();

    ExportDocument {
        timestamp: format_timestamp(now),
        total_count: subdomains.len(),
        subdomains,
    }
}

/// `subdomains_<now>.json` inside `dir`, pretty-printed.
pub fn export_filename(now: Timestamp) -> String {
    format!("subdomains_{now}.json")
}

pub fn write_export(
    dir: &Path,
    document: &ExportDocument,
    now: Timestamp,
) -> Result<PathBuf, ExportError> {
    let json = serde_json::to_string_pretty(document)?;
    let writer = AtomicFileWriter::new(dir.to_path_buf());
    Ok(writer.write(&export_filename(now), &json)?)
}

/// Epoch milliseconds as RFC 3339 UTC with millisecond precision. Values
/// outside chrono's range fall back to the raw number.
pub fn format_timestamp(millis: Timestamp) -> String {
    i64::try_from(millis)
        .ok()
        .and_then(DateTime::from_timestamp_millis)
        .map(|at| at.to_rfc3339_opts(SecondsFormat::Millis, true))
        .unwrap_or_else(|| millis.to_string())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn timestamps_are_utc_millis() {
        assert_eq!(format_timestamp(0), "1970-01-01T00:00:00.000Z");
        assert_eq!(
            format_timestamp(1_700_000_000_123),
            "2023-11-14T22:13:20.123Z"
        );
    }

    #[test]
    fn out_of_range_timestamp_is_kept_numeric() {
        assert_eq!(format_timestamp(u64::MAX), u64::MAX.to_string());
    }
}
