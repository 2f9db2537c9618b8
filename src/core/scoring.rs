use crate::core::{Country, CountryMetrics, Measurement, Phrase, ScoredRow};
use std::collections::HashMap;

/// Volumes in `1..=10` all count as a single unit.
pub fn compress_volume(volume: u64) -> u64 {
    if (1..=10).contains(&volume) {
        1
    } else {
        volume
    }
}

pub fn volume_score(volume: u64, max_volume: u64) -> f64 {
    if max_volume != 0 {
        volume as f64 / max_volume as f64 * 100.0
    } else {
        0.0
    }
}

pub fn difficulty_score(difficulty: u32) -> f64 {
    100.0 - f64::from(difficulty)
}

/// Largest known volume per country name.
fn max_volumes<'a>(measurements: &'a [Measurement]) -> HashMap<&'a str, u64> {
    let mut max = HashMap::new();
    for m in measurements {
        if let Some(volume) = m.volume {
            let entry = max.entry(m.country.as_str()).or_insert(0);
            if volume > *entry {
                *entry = volume;
            }
        }
    }
    max
}

/// Measurements grouped by lowercased keyword, each bucket in input order.
fn index_by_keyword(measurements: &[Measurement]) -> HashMap<String, Vec<&Measurement>> {
    let mut index: HashMap<String, Vec<&Measurement>> = HashMap::new();
    for m in measurements {
        index.entry(m.keyword.to_lowercase()).or_default().push(m);
    }
    index
}

/// Scores every phrase against the measurements, one row per phrase in input order.
///
/// For each country the first measurement with a known volume gives the raw
/// volume (compressed by [`compress_volume`]) and the first one with a known
/// difficulty gives the difficulty. A country without any known difficulty
/// falls back to the highest difficulty seen for the phrase in any country.
/// The per-country score multiplies both weights with both normalized scores;
/// the total is the coefficient-weighted sum of the per-country scores.
pub fn score(
    measurements: &[Measurement],
    phrases: &[Phrase],
    countries: &[Country],
    volume_weight: f64,
    difficulty_weight: f64,
) -> Vec<ScoredRow> {
    let max_volume = max_volumes(measurements);
    let index = index_by_keyword(measurements);
    let no_results: Vec<&Measurement> = Vec::new();

    let mut rows = Vec::with_capacity(phrases.len());
    for (i, phrase) in phrases.iter().enumerate() {
        let results = index
            .get(&phrase.query.to_lowercase())
            .unwrap_or(&no_results);

        let fallback_difficulty = results
            .iter()
            .filter_map(|m| m.difficulty)
            .max()
            .unwrap_or(0);

        let mut metrics = Vec::with_capacity(countries.len());
        let mut total_score = 0.0;
        for country in countries {
            let in_country = || results.iter().filter(|m| m.country == country.name);

            let volume = in_country()
                .find_map(|m| m.volume)
                .map(compress_volume)
                .unwrap_or(0);
            let difficulty = in_country()
                .find_map(|m| m.difficulty)
                .unwrap_or(fallback_difficulty);

            let country_max = max_volume.get(country.name.as_str()).copied().unwrap_or(0);
            let score = volume_weight
                * volume_score(volume, country_max)
                * difficulty_weight
                * difficulty_score(difficulty);

            total_score += country.coefficient * score;
            metrics.push(CountryMetrics {
                volume,
                difficulty,
                score,
            });
        }

        rows.push(ScoredRow {
            query: phrase.query.clone(),
            group: phrase.group.clone(),
            metrics,
            total_score,
        });

        if (i + 1) % 100 == 0 {
            tracing::debug!("Scored {}/{} phrases", i + 1, phrases.len());
        }
    }

    rows
}
