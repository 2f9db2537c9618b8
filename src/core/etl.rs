use crate::core::{Pipeline, RunOutputs};
use crate::utils::error::Result;
use crate::utils::monitor::SystemMonitor;

pub struct EtlEngine<P: Pipeline> {
    pipeline: P,
    monitor: SystemMonitor,
}

impl<P: Pipeline> EtlEngine<P> {
    pub fn new(pipeline: P) -> Self {
        Self::new_with_monitoring(pipeline, false)
    }

    pub fn new_with_monitoring(pipeline: P, monitor_enabled: bool) -> Self {
        Self {
            pipeline,
            monitor: SystemMonitor::new(monitor_enabled),
        }
    }

    pub fn pipeline(&self) -> &P {
        &self.pipeline
    }

    pub async fn run(&self) -> Result<RunOutputs> {
        tracing::info!("🚀 Starting keyword run");
        self.monitor.log_stats("Start");

        // Extract
        let measurements = self.pipeline.extract().await?;
        tracing::info!("📥 Collected {} measurements", measurements.len());
        self.monitor.log_stats("Acquisition");

        // Transform
        let scored = self.pipeline.transform(measurements).await?;
        tracing::info!(
            "🔧 Scored {} phrases into {} groups",
            scored.scored_rows.len(),
            scored.groups.len()
        );
        self.monitor.log_stats("Scoring");

        // Load
        let outputs = self.pipeline.load(scored).await?;
        tracing::info!("💾 Scores saved to {}", outputs.scored);
        tracing::info!("💾 Group pivot saved to {}", outputs.pivot);
        self.monitor.log_final_stats();

        Ok(outputs)
    }
}
