use crate::domain::model::{Measurement, RunOutputs, ScoringResult};
use crate::utils::error::Result;
use async_trait::async_trait;
use std::path::PathBuf;
use thiserror::Error;

pub trait Storage: Send + Sync {
    fn read_file(&self, path: &str) -> impl std::future::Future<Output = Result<Vec<u8>>> + Send;
    fn write_file(
        &self,
        path: &str,
        data: &[u8],
    ) -> impl std::future::Future<Output = Result<()>> + Send;
    fn append_file(
        &self,
        path: &str,
        data: &[u8],
    ) -> impl std::future::Future<Output = Result<()>> + Send;
    fn exists(&self, path: &str) -> impl std::future::Future<Output = bool> + Send;
}

pub trait ConfigProvider: Send + Sync {
    fn measurements_path(&self) -> &str;
    fn volume_weight(&self) -> f64;
    fn difficulty_weight(&self) -> f64;
}

/// Failures raised by the browser automation layer.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum AutomationError {
    #[error("element not found: {0}")]
    ElementNotFound(String),

    #[error("click intercepted: {0}")]
    ClickIntercepted(String),

    #[error("timed out waiting for {0}")]
    WaitTimeout(String),

    #[error("browser session failure: {0}")]
    Session(String),
}

pub type AutomationResult<T> = std::result::Result<T, AutomationError>;

/// The keyword-explorer page as seen by the export coordinator.
///
/// Calls happen in the order `submit`, `reported_row_count`, `trigger_export`,
/// `export_cap_indicator`, `confirm_export`; the download lands in the
/// [`DownloadArea`] the coordinator is polling.
#[async_trait]
pub trait ExportAutomation: Send + Sync {
    async fn submit(&self, country: &str, phrases: &[String]) -> AutomationResult<()>;

    /// Total row count the page reports for the submitted query.
    async fn reported_row_count(&self) -> AutomationResult<usize>;

    /// Opens the export dialog.
    async fn trigger_export(&self) -> AutomationResult<()>;

    /// True when the dialog says the result set was cut at the export cap.
    async fn export_cap_indicator(&self) -> AutomationResult<bool>;

    /// Starts the download.
    async fn confirm_export(&self) -> AutomationResult<()>;

    /// Saves whatever the session can show about its current state.
    async fn capture_diagnostic(&self, label: &str) -> Option<PathBuf>;
}

/// Directory the browser downloads exports into.
#[async_trait]
pub trait DownloadArea: Send + Sync {
    async fn list(&self) -> std::io::Result<Vec<String>>;
    async fn size(&self, name: &str) -> std::io::Result<u64>;
    async fn read(&self, name: &str) -> std::io::Result<Vec<u8>>;
    fn location(&self, name: &str) -> PathBuf;
}

#[async_trait]
pub trait Pipeline: Send + Sync {
    async fn extract(&self) -> Result<Vec<Measurement>>;
    async fn transform(&self, data: Vec<Measurement>) -> Result<ScoringResult>;
    async fn load(&self, result: ScoringResult) -> Result<RunOutputs>;
}
