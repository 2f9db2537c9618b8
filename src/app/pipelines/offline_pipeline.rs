use crate::app::pipelines::scoring_stage::ScoringStage;
use crate::core::acquisition::dedup_measurements;
use crate::core::export_file::{is_partial_download, parse_export};
use crate::core::report::{measurement_header, measurement_rows};
use crate::core::{DownloadArea, Measurement, Pipeline, RunOutputs, ScoringResult, Storage};
use crate::utils::error::Result;
use async_trait::async_trait;
use std::collections::HashMap;

/// Rebuilds the measurement table from exports already sitting in the
/// download directory, then scores it. No browser involved.
pub struct OfflinePipeline<D: DownloadArea, S: Storage> {
    downloads: D,
    storage: S,
    stage: ScoringStage,
    country_codes: HashMap<String, String>,
}

impl<D: DownloadArea, S: Storage> OfflinePipeline<D, S> {
    pub fn new(downloads: D, storage: S, stage: ScoringStage) -> Self {
        Self {
            downloads,
            storage,
            stage,
            country_codes: HashMap::new(),
        }
    }

    /// Export country codes (matched as-is, then lowercased) to country names.
    pub fn with_country_codes(mut self, country_codes: HashMap<String, String>) -> Self {
        self.country_codes = country_codes;
        self
    }

    async fn export_names(&self) -> Result<Vec<String>> {
        let mut names: Vec<String> = self
            .downloads
            .list()
            .await?
            .into_iter()
            .filter(|name| !is_partial_download(name))
            .collect();
        names.sort();
        Ok(names)
    }

    pub async fn has_exports(&self) -> Result<bool> {
        Ok(!self.export_names().await?.is_empty())
    }

    fn country_name(&self, code: &str) -> String {
        self.country_codes
            .get(code)
            .or_else(|| self.country_codes.get(&code.to_lowercase()))
            .cloned()
            .unwrap_or_else(|| code.to_string())
    }
}

#[async_trait]
impl<D: DownloadArea, S: Storage> Pipeline for OfflinePipeline<D, S> {
    async fn extract(&self) -> Result<Vec<Measurement>> {
        let sink = self.stage.measurements_path();
        self.storage.write_file(sink, &measurement_header()?).await?;

        let names = self.export_names().await?;
        let total = names.len();
        let mut output = Vec::new();

        for (i, name) in names.iter().enumerate() {
            let bytes = self.downloads.read(name).await?;
            let mut parsed = parse_export(&bytes, &self.downloads.location(name))?;
            for m in &mut parsed {
                m.country = self.country_name(&m.country);
            }
            let batch = dedup_measurements(parsed);

            self.storage.append_file(sink, &measurement_rows(&batch)?).await?;
            output.extend(batch);
            tracing::info!(
                "[{}/{}] {}: {} measurements so far",
                i + 1,
                total,
                name,
                output.len()
            );
        }

        Ok(output)
    }

    async fn transform(&self, data: Vec<Measurement>) -> Result<ScoringResult> {
        Ok(self.stage.transform(&data))
    }

    async fn load(&self, result: ScoringResult) -> Result<RunOutputs> {
        self.stage.load(&self.storage, result).await
    }
}
