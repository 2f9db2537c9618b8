pub mod acquisition;
pub mod aggregate;
pub mod etl;
pub mod export;
pub mod export_file;
pub mod inputs;
pub mod report;
pub mod scoring;

pub use crate::domain::model::{
    Country, CountryMetrics, GroupAggregate, Measurement, Phrase, RunOutputs, ScoredRow,
    ScoringResult,
};
pub use crate::domain::ports::{
    AutomationError, AutomationResult, ConfigProvider, DownloadArea, ExportAutomation, Pipeline,
    Storage,
};
pub use crate::utils::error::Result;
