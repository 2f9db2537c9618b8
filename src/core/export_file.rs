//! Reading the comma-separated export files the analytics tool produces.

use crate::core::Measurement;
use crate::utils::error::{EtlError, Result};
use std::path::Path;

const PARTIAL_DOWNLOAD_SUFFIXES: [&str; 3] = [".crdownload", ".tmp", ".part"];

/// Browser placeholder for a download still in flight.
pub fn is_partial_download(name: &str) -> bool {
    PARTIAL_DOWNLOAD_SUFFIXES
        .iter()
        .any(|suffix| name.ends_with(suffix))
}

/// Accepts `rows` when it lies in `[floor, expected]`, where `floor` is 99% of
/// `expected`, or `expected - 1` when 99% would be below one row.
pub fn row_count_acceptable(expected: usize, rows: usize) -> bool {
    let expected_f = expected as f64;
    let scaled = expected_f * 0.99;
    let floor = if scaled >= 1.0 { scaled } else { expected_f - 1.0 };
    rows <= expected && rows as f64 >= floor
}

/// Data rows after the header. A torn last line still counts, as it does in a
/// line count; anything unreadable after it is ignored.
pub fn count_data_rows(bytes: &[u8]) -> usize {
    let mut reader = csv::ReaderBuilder::new()
        .has_headers(true)
        .flexible(true)
        .from_reader(bytes);
    reader.byte_records().map_while(|r| r.ok()).count()
}

fn parse_optional<T: std::str::FromStr>(
    raw: Option<&str>,
    column: &str,
    line: u64,
    path: &Path,
) -> Result<Option<T>> {
    let value = raw.map(str::trim).unwrap_or("");
    if value.is_empty() {
        return Ok(None);
    }
    value
        .parse()
        .map(Some)
        .map_err(|_| EtlError::InputFileMalformed {
            path: path.to_path_buf(),
            reason: format!("line {}: {} '{}' is not a whole number", line, column, value),
        })
}

/// Parses an export into measurements, columns located by header name.
///
/// The `Country` value is taken verbatim from the file; blank `Difficulty` or
/// `Volume` cells become `None`.
pub fn parse_export(bytes: &[u8], path: &Path) -> Result<Vec<Measurement>> {
    let mut reader = csv::ReaderBuilder::new()
        .has_headers(true)
        .flexible(true)
        .from_reader(bytes);

    let headers = reader.headers()?.clone();
    let column = |name: &str| -> Result<usize> {
        headers
            .iter()
            .position(|h| h.trim() == name)
            .ok_or_else(|| EtlError::InputFileMalformed {
                path: path.to_path_buf(),
                reason: format!("missing '{}' column", name),
            })
    };
    let keyword_idx = column("Keyword")?;
    let country_idx = column("Country")?;
    let difficulty_idx = column("Difficulty")?;
    let volume_idx = column("Volume")?;

    let mut measurements = Vec::new();
    for record in reader.records() {
        let record = record?;
        let line = record.position().map(|p| p.line()).unwrap_or(0);
        measurements.push(Measurement {
            keyword: record.get(keyword_idx).unwrap_or("").to_string(),
            country: record.get(country_idx).unwrap_or("").to_string(),
            difficulty: parse_optional(record.get(difficulty_idx), "Difficulty", line, path)?,
            volume: parse_optional(record.get(volume_idx), "Volume", line, path)?,
        });
    }

    Ok(measurements)
}
