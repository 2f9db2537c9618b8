pub mod adapters;
pub mod app;
pub mod config;
pub mod core;
pub mod domain;
pub mod utils;

#[cfg(feature = "cli")]
pub use config::CliConfig;

pub use adapters::{download_dir::LocalDownloadDir, storage::LocalStorage};
pub use app::pipelines::{OfflinePipeline, OnlinePipeline, ScoringStage};
pub use config::{credentials::Credentials, toml_config::TomlConfig};
pub use self::core::etl::EtlEngine;
pub use utils::error::{EtlError, Result};
