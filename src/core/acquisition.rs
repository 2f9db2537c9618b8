use crate::core::export::ExportCoordinator;
use crate::core::report::{measurement_header, measurement_rows, parse_measurement_table};
use crate::core::{DownloadArea, ExportAutomation, Measurement, Storage};
use crate::utils::error::Result;
use std::collections::HashSet;
use std::path::Path;
use std::time::Duration;

/// Keeps the first measurement of every `(keyword, country)` pair, in order.
pub fn dedup_measurements(measurements: Vec<Measurement>) -> Vec<Measurement> {
    let mut seen: HashSet<(String, String)> = HashSet::new();
    measurements
        .into_iter()
        .filter(|m| {
            let (keyword, country) = m.key();
            seen.insert((keyword.to_string(), country.to_string()))
        })
        .collect()
}

/// Acquires every country in turn and appends each accepted batch to the
/// measurement table as soon as it is complete.
pub struct AcquisitionPipeline<A: ExportAutomation, D: DownloadArea, S: Storage> {
    coordinator: ExportCoordinator<A, D>,
    storage: S,
    sink_path: String,
    resume: bool,
    pause_between_countries: Duration,
}

impl<A: ExportAutomation, D: DownloadArea, S: Storage> AcquisitionPipeline<A, D, S> {
    pub fn new(coordinator: ExportCoordinator<A, D>, storage: S, sink_path: impl Into<String>) -> Self {
        Self {
            coordinator,
            storage,
            sink_path: sink_path.into(),
            resume: false,
            pause_between_countries: Duration::ZERO,
        }
    }

    /// Reuse the countries already present in the measurement table.
    pub fn with_resume(mut self, resume: bool) -> Self {
        self.resume = resume;
        self
    }

    pub fn with_pause(mut self, pause: Duration) -> Self {
        self.pause_between_countries = pause;
        self
    }

    pub fn coordinator(&self) -> &ExportCoordinator<A, D> {
        &self.coordinator
    }

    pub fn storage(&self) -> &S {
        &self.storage
    }

    async fn previous_run(&self) -> Result<Vec<Measurement>> {
        let bytes = self.storage.read_file(&self.sink_path).await?;
        parse_measurement_table(&bytes, Path::new(&self.sink_path))
    }

    pub async fn run(&self, countries: &[String], phrases: &[String]) -> Result<Vec<Measurement>> {
        let mut output = Vec::new();

        if self.resume && self.storage.exists(&self.sink_path).await {
            output = self.previous_run().await?;
            tracing::info!(
                "♻️ Resuming: {} measurements already in {}",
                output.len(),
                self.sink_path
            );
        } else {
            self.storage
                .write_file(&self.sink_path, &measurement_header()?)
                .await?;
        }
        let mut finished: HashSet<String> = output.iter().map(|m| m.country.clone()).collect();

        let total = countries.len();
        let mut acquired_any = false;
        for (i, country) in countries.iter().enumerate() {
            if finished.contains(country) {
                tracing::info!("[{}/{}] {}: already acquired, skipping", i + 1, total, country);
                continue;
            }
            if acquired_any && !self.pause_between_countries.is_zero() {
                tokio::time::sleep(self.pause_between_countries).await;
            }

            let raw = self.coordinator.acquire(country, phrases).await?;
            let batch = dedup_measurements(raw);

            self.storage
                .append_file(&self.sink_path, &measurement_rows(&batch)?)
                .await?;
            tracing::info!("[{}/{}] {}: {} rows", i + 1, total, country, batch.len());

            output.extend(batch);
            finished.insert(country.clone());
            acquired_any = true;
        }

        Ok(output)
    }
}
