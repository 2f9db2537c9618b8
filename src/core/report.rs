//! Semicolon-separated output tables.

use crate::core::{Country, CountryMetrics, GroupAggregate, Measurement, ScoredRow};
use crate::utils::error::{EtlError, Result};
use std::path::{Path, PathBuf};

pub const MEASUREMENT_COLUMNS: [&str; 4] = ["Keyword", "Country", "Difficulty", "Volume"];

fn writer() -> csv::Writer<Vec<u8>> {
    csv::WriterBuilder::new()
        .delimiter(b';')
        .has_headers(false)
        .from_writer(Vec::new())
}

fn into_bytes(writer: csv::Writer<Vec<u8>>) -> Result<Vec<u8>> {
    writer.into_inner().map_err(|e| EtlError::IoError(e.into_error()))
}

/// Spreadsheet-friendly number: decimal comma instead of a point. Whole
/// values carry no fraction and small ones are never written as exponents.
pub fn decimal_comma(value: f64) -> String {
    value.to_string().replace('.', ",")
}

/// `out/output.csv` + `processed` -> `out/output_processed.csv`.
pub fn derived_path(measurements_path: &str, suffix: &str) -> String {
    let path = Path::new(measurements_path);
    let stem = path
        .file_stem()
        .map(|s| s.to_string_lossy().into_owned())
        .unwrap_or_default();
    let file_name = format!("{}_{}.csv", stem, suffix);
    match path.parent() {
        Some(parent) if !parent.as_os_str().is_empty() => {
            parent.join(file_name).to_string_lossy().into_owned()
        }
        _ => file_name,
    }
}

pub fn measurement_header() -> Result<Vec<u8>> {
    let mut w = writer();
    w.write_record(MEASUREMENT_COLUMNS)?;
    into_bytes(w)
}

pub fn measurement_rows(measurements: &[Measurement]) -> Result<Vec<u8>> {
    let mut w = writer();
    for m in measurements {
        w.write_record([
            m.keyword.clone(),
            m.country.clone(),
            m.difficulty.map(|d| d.to_string()).unwrap_or_default(),
            m.volume.map(|v| v.to_string()).unwrap_or_default(),
        ])?;
    }
    into_bytes(w)
}

/// Reads back a measurement table written by [`measurement_header`] and
/// [`measurement_rows`].
pub fn parse_measurement_table(bytes: &[u8], path: &Path) -> Result<Vec<Measurement>> {
    let mut reader = csv::ReaderBuilder::new()
        .delimiter(b';')
        .has_headers(true)
        .flexible(true)
        .from_reader(bytes);

    let malformed = |reason: String| EtlError::InputFileMalformed {
        path: PathBuf::from(path),
        reason,
    };

    let mut measurements = Vec::new();
    for record in reader.records() {
        let record = record?;
        if record.len() < MEASUREMENT_COLUMNS.len() {
            return Err(malformed(format!(
                "expected {} columns, found {}",
                MEASUREMENT_COLUMNS.len(),
                record.len()
            )));
        }
        let number = |idx: usize| -> Result<Option<u64>> {
            match record[idx].trim() {
                "" => Ok(None),
                raw => raw
                    .parse()
                    .map(Some)
                    .map_err(|_| malformed(format!("'{}' is not a whole number", raw))),
            }
        };
        let difficulty = number(2)?
            .map(u32::try_from)
            .transpose()
            .map_err(|_| malformed(format!("difficulty '{}' out of range", &record[2])))?;
        measurements.push(Measurement {
            keyword: record[0].to_string(),
            country: record[1].to_string(),
            difficulty,
            volume: number(3)?,
        });
    }

    Ok(measurements)
}

fn metric_columns(countries: &[Country]) -> Vec<String> {
    let mut columns = Vec::with_capacity(countries.len() * 3 + 1);
    for prefix in ["Volume", "Difficulty", "Score"] {
        for country in countries {
            columns.push(format!("{}_{}", prefix, country.name));
        }
    }
    columns.push("Total_Score".to_string());
    columns
}

fn metric_cells(metrics: &[CountryMetrics], total_score: f64) -> Vec<String> {
    let mut cells = Vec::with_capacity(metrics.len() * 3 + 1);
    cells.extend(metrics.iter().map(|m| m.volume.to_string()));
    cells.extend(metrics.iter().map(|m| m.difficulty.to_string()));
    cells.extend(metrics.iter().map(|m| decimal_comma(m.score)));
    cells.push(decimal_comma(total_score));
    cells
}

/// `Query;Volume_<c>…;Difficulty_<c>…;Score_<c>…;Total_Score`
pub fn scored_table(countries: &[Country], rows: &[ScoredRow]) -> Result<Vec<u8>> {
    let mut w = writer();
    let mut header = vec!["Query".to_string()];
    header.extend(metric_columns(countries));
    w.write_record(&header)?;

    for row in rows {
        let mut record = vec![row.query.clone()];
        record.extend(metric_cells(&row.metrics, row.total_score));
        w.write_record(&record)?;
    }
    into_bytes(w)
}

/// Same columns as [`scored_table`], keyed by group.
pub fn pivot_table(countries: &[Country], groups: &[GroupAggregate]) -> Result<Vec<u8>> {
    let mut w = writer();
    let mut header = vec!["Group".to_string()];
    header.extend(metric_columns(countries));
    w.write_record(&header)?;

    for group in groups {
        let mut record = vec![group.group.clone()];
        record.extend(metric_cells(&group.metrics, group.total_score));
        w.write_record(&record)?;
    }
    into_bytes(w)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_decimal_comma() {
        assert_eq!(decimal_comma(12.5), "12,5");
        assert_eq!(decimal_comma(0.0), "0");
        assert_eq!(decimal_comma(1500.0), "1500");
        // never switches to exponent form
        assert_eq!(decimal_comma(0.00001), "0,00001");
    }

    #[test]
    fn test_derived_path() {
        assert_eq!(derived_path("output.csv", "processed"), "output_processed.csv");
        assert_eq!(derived_path("out/run.1.csv", "pivot"), "out/run.1_pivot.csv");
        assert_eq!(derived_path("results", "pivot"), "results_pivot.csv");
    }

    #[test]
    fn test_measurement_table_round_trip_keeps_unknowns() {
        let rows = vec![
            Measurement::new("running shoes", "US", Some(12), None),
            Measurement::new("a;b", "DE", None, Some(40)),
        ];
        let mut bytes = measurement_header().unwrap();
        bytes.extend(measurement_rows(&rows).unwrap());

        let text = String::from_utf8(bytes.clone()).unwrap();
        assert!(text.starts_with("Keyword;Country;Difficulty;Volume\n"));
        assert!(text.contains("running shoes;US;12;\n"));

        assert_eq!(parse_measurement_table(&bytes, Path::new("output.csv")).unwrap(), rows);
    }

    #[test]
    fn test_scored_table_layout() {
        let countries = vec![Country::new("US", 1.0), Country::new("DE", 0.5)];
        let rows = vec![ScoredRow {
            query: "shoes".to_string(),
            group: "g".to_string(),
            metrics: vec![
                CountryMetrics { volume: 100, difficulty: 20, score: 80.5 },
                CountryMetrics { volume: 1, difficulty: 45, score: 0.25 },
            ],
            total_score: 80.625,
        }];

        let text = String::from_utf8(scored_table(&countries, &rows).unwrap()).unwrap();
        let lines: Vec<&str> = text.lines().collect();

        assert_eq!(
            lines[0],
            "Query;Volume_US;Volume_DE;Difficulty_US;Difficulty_DE;Score_US;Score_DE;Total_Score"
        );
        assert_eq!(lines[1], "shoes;100;1;20;45;80,5;0,25;80,625");
    }

    #[test]
    fn test_pivot_table_layout() {
        let countries = vec![Country::new("US", 1.0)];
        let groups = vec![GroupAggregate {
            group: "footwear".to_string(),
            metrics: vec![CountryMetrics { volume: 60, difficulty: 40, score: 3.5 }],
            total_score: 3.5,
        }];

        let text = String::from_utf8(pivot_table(&countries, &groups).unwrap()).unwrap();

        assert_eq!(text, "Group;Volume_US;Difficulty_US;Score_US;Total_Score\nfootwear;60;40;3,5;3,5\n");
    }
}
