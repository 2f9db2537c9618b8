use serde::{Deserialize, Serialize};

/// One raw observation exported by the analytics tool.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Measurement {
    pub keyword: String,
    pub country: String,
    pub difficulty: Option<u32>,
    pub volume: Option<u64>,
}

impl Measurement {
    pub fn new(
        keyword: impl Into<String>,
        country: impl Into<String>,
        difficulty: Option<u32>,
        volume: Option<u64>,
    ) -> Self {
        Self {
            keyword: keyword.into(),
            country: country.into(),
            difficulty,
            volume,
        }
    }

    /// Deduplication key within one run.
    pub fn key(&self) -> (&str, &str) {
        (&self.keyword, &self.country)
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Phrase {
    pub query: String,
    pub group: String,
}

impl Phrase {
    pub fn new(query: impl Into<String>, group: impl Into<String>) -> Self {
        Self {
            query: query.into(),
            group: group.into(),
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct Country {
    pub name: String,
    pub coefficient: f64,
}

impl Country {
    pub fn new(name: impl Into<String>, coefficient: f64) -> Self {
        Self {
            name: name.into(),
            coefficient,
        }
    }
}

/// Values of one country's `Volume_`, `Difficulty_` and `Score_` columns.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct CountryMetrics {
    pub volume: u64,
    pub difficulty: u32,
    pub score: f64,
}

/// Scored phrase. `metrics` is parallel to the country list it was scored with.
#[derive(Debug, Clone, PartialEq)]
pub struct ScoredRow {
    pub query: String,
    pub group: String,
    pub metrics: Vec<CountryMetrics>,
    pub total_score: f64,
}

#[derive(Debug, Clone, PartialEq)]
pub struct GroupAggregate {
    pub group: String,
    pub metrics: Vec<CountryMetrics>,
    pub total_score: f64,
}

/// Output of the transform stage.
#[derive(Debug, Clone)]
pub struct ScoringResult {
    pub countries: Vec<Country>,
    pub scored_rows: Vec<ScoredRow>,
    pub groups: Vec<GroupAggregate>,
}

/// Paths written by the load stage.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RunOutputs {
    pub measurements: String,
    pub scored: String,
    pub pivot: String,
}
