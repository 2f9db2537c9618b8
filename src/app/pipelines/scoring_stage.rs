use crate::core::aggregate::aggregate;
use crate::core::report::{derived_path, pivot_table, scored_table};
use crate::core::scoring;
use crate::core::{ConfigProvider, Country, Measurement, Phrase, RunOutputs, ScoringResult, Storage};
use crate::utils::error::Result;

/// Transform and load stages shared by the online and offline runs.
#[derive(Debug, Clone)]
pub struct ScoringStage {
    countries: Vec<Country>,
    phrases: Vec<Phrase>,
    volume_weight: f64,
    difficulty_weight: f64,
    measurements_path: String,
}

impl ScoringStage {
    pub fn new<C: ConfigProvider>(config: &C, countries: Vec<Country>, phrases: Vec<Phrase>) -> Self {
        Self {
            countries,
            phrases,
            volume_weight: config.volume_weight(),
            difficulty_weight: config.difficulty_weight(),
            measurements_path: config.measurements_path().to_string(),
        }
    }

    pub fn countries(&self) -> &[Country] {
        &self.countries
    }

    pub fn phrases(&self) -> &[Phrase] {
        &self.phrases
    }

    pub fn measurements_path(&self) -> &str {
        &self.measurements_path
    }

    pub fn country_names(&self) -> Vec<String> {
        self.countries.iter().map(|c| c.name.clone()).collect()
    }

    pub fn queries(&self) -> Vec<String> {
        self.phrases.iter().map(|p| p.query.clone()).collect()
    }

    pub fn transform(&self, measurements: &[Measurement]) -> ScoringResult {
        tracing::debug!(
            "Scoring {} phrases against {} measurements (weights {} / {})",
            self.phrases.len(),
            measurements.len(),
            self.volume_weight,
            self.difficulty_weight
        );
        let scored_rows = scoring::score(
            measurements,
            &self.phrases,
            &self.countries,
            self.volume_weight,
            self.difficulty_weight,
        );
        let groups = aggregate(&scored_rows);

        ScoringResult {
            countries: self.countries.clone(),
            scored_rows,
            groups,
        }
    }

    /// Writes `<stem>_processed.csv` and `<stem>_pivot.csv` next to the
    /// measurement table.
    pub async fn load<S: Storage>(&self, storage: &S, result: ScoringResult) -> Result<RunOutputs> {
        let scored = derived_path(&self.measurements_path, "processed");
        let pivot = derived_path(&self.measurements_path, "pivot");

        let scored_bytes = scored_table(&result.countries, &result.scored_rows)?;
        storage.write_file(&scored, &scored_bytes).await?;

        let pivot_bytes = pivot_table(&result.countries, &result.groups)?;
        storage.write_file(&pivot, &pivot_bytes).await?;

        Ok(RunOutputs {
            measurements: self.measurements_path.clone(),
            scored,
            pivot,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::app::pipelines::test_support::{MockConfig, MockStorage};

    fn stage() -> ScoringStage {
        ScoringStage::new(
            &MockConfig::new("out/output.csv"),
            vec![Country::new("US", 1.0), Country::new("DE", 0.5)],
            vec![
                Phrase::new("running shoes", "shoes"),
                Phrase::new("trail shoes", "shoes"),
                Phrase::new("rain jacket", "jackets"),
            ],
        )
    }

    #[test]
    fn test_transform_groups_in_first_seen_order() {
        let measurements = vec![
            Measurement::new("running shoes", "US", Some(40), Some(1000)),
            Measurement::new("trail shoes", "US", Some(20), Some(500)),
            Measurement::new("rain jacket", "DE", Some(10), Some(300)),
        ];

        let result = stage().transform(&measurements);

        assert_eq!(result.scored_rows.len(), 3);
        let groups: Vec<&str> = result.groups.iter().map(|g| g.group.as_str()).collect();
        assert_eq!(groups, vec!["shoes", "jackets"]);
        assert_eq!(result.groups[0].metrics[0].volume, 1500);
        assert_eq!(result.groups[0].metrics[0].difficulty, 40);
    }

    #[tokio::test]
    async fn test_load_writes_both_tables() {
        let storage = MockStorage::new();
        let stage = stage();
        let result = stage.transform(&[]);

        let outputs = stage.load(&storage, result).await.unwrap();

        assert_eq!(outputs.scored, "out/output_processed.csv");
        assert_eq!(outputs.pivot, "out/output_pivot.csv");

        let scored = String::from_utf8(storage.get_file(&outputs.scored).await.unwrap()).unwrap();
        assert!(scored.starts_with("Query;Volume_US;Volume_DE;"));
        assert_eq!(scored.lines().count(), 4);

        let pivot = String::from_utf8(storage.get_file(&outputs.pivot).await.unwrap()).unwrap();
        assert!(pivot.starts_with("Group;"));
        assert_eq!(pivot.lines().count(), 3);
    }
}
