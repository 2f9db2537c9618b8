//! Operator-supplied input tables: countries with coefficients and phrases with groups.
//!
//! Both are semicolon-separated with a header row; columns are positional.

use crate::core::{Country, Phrase};
use crate::utils::error::{EtlError, Result};
use std::path::Path;

fn two_column_rows(bytes: &[u8], path: &Path) -> Result<Vec<(String, String)>> {
    let mut reader = csv::ReaderBuilder::new()
        .delimiter(b';')
        .has_headers(true)
        .flexible(true)
        .trim(csv::Trim::All)
        .from_reader(bytes);

    let mut rows = Vec::new();
    for record in reader.records() {
        let record = record?;
        if record.iter().all(str::is_empty) {
            continue;
        }
        if record.len() < 2 {
            let line = record.position().map(|p| p.line()).unwrap_or(0);
            return Err(EtlError::InputFileMalformed {
                path: path.to_path_buf(),
                reason: format!("line {}: expected two ';'-separated columns", line),
            });
        }
        rows.push((record[0].to_string(), record[1].to_string()));
    }

    if rows.is_empty() {
        return Err(EtlError::InputFileEmpty {
            path: path.to_path_buf(),
        });
    }
    Ok(rows)
}

/// `name;coefficient`. Coefficients accept either `.` or `,` as decimal separator.
///
/// A repeated name keeps its first position and takes the last coefficient.
pub fn parse_countries(bytes: &[u8], path: &Path) -> Result<Vec<Country>> {
    let mut countries: Vec<Country> = Vec::new();

    for (name, raw) in two_column_rows(bytes, path)? {
        let coefficient = raw.replace(',', ".").parse::<f64>().map_err(|_| {
            EtlError::InputFileMalformed {
                path: path.to_path_buf(),
                reason: format!("coefficient '{}' for {} is not a number", raw, name),
            }
        })?;

        match countries.iter_mut().find(|c| c.name == name) {
            Some(existing) => {
                tracing::warn!(
                    "⚠️ {} listed more than once in {}; using coefficient {}",
                    name,
                    path.display(),
                    coefficient
                );
                existing.coefficient = coefficient;
            }
            None => countries.push(Country::new(name, coefficient)),
        }
    }

    Ok(countries)
}

/// `query;group`
pub fn parse_phrases(bytes: &[u8], path: &Path) -> Result<Vec<Phrase>> {
    Ok(two_column_rows(bytes, path)?
        .into_iter()
        .map(|(query, group)| Phrase::new(query, group))
        .collect())
}

pub fn read_countries(path: &Path) -> Result<Vec<Country>> {
    let bytes = std::fs::read(path)?;
    parse_countries(&bytes, path)
}

pub fn read_phrases(path: &Path) -> Result<Vec<Phrase>> {
    let bytes = std::fs::read(path)?;
    parse_phrases(&bytes, path)
}
