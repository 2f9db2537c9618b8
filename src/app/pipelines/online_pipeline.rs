use crate::app::pipelines::scoring_stage::ScoringStage;
use crate::core::acquisition::AcquisitionPipeline;
use crate::core::{
    DownloadArea, ExportAutomation, Measurement, Pipeline, RunOutputs, ScoringResult, Storage,
};
use crate::utils::error::Result;
use async_trait::async_trait;

/// Acquires measurements through the browser, then scores them.
pub struct OnlinePipeline<A: ExportAutomation, D: DownloadArea, S: Storage> {
    acquisition: AcquisitionPipeline<A, D, S>,
    stage: ScoringStage,
}

impl<A: ExportAutomation, D: DownloadArea, S: Storage> OnlinePipeline<A, D, S> {
    pub fn new(acquisition: AcquisitionPipeline<A, D, S>, stage: ScoringStage) -> Self {
        Self { acquisition, stage }
    }

    pub fn acquisition(&self) -> &AcquisitionPipeline<A, D, S> {
        &self.acquisition
    }
}

#[async_trait]
impl<A: ExportAutomation, D: DownloadArea, S: Storage> Pipeline for OnlinePipeline<A, D, S> {
    async fn extract(&self) -> Result<Vec<Measurement>> {
        tracing::info!(
            "🌍 Acquiring {} phrases in {} countries",
            self.stage.phrases().len(),
            self.stage.countries().len()
        );
        self.acquisition
            .run(&self.stage.country_names(), &self.stage.queries())
            .await
    }

    async fn transform(&self, data: Vec<Measurement>) -> Result<ScoringResult> {
        Ok(self.stage.transform(&data))
    }

    async fn load(&self, result: ScoringResult) -> Result<RunOutputs> {
        self.stage.load(self.acquisition.storage(), result).await
    }
}
