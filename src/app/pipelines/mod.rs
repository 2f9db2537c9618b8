pub mod offline_pipeline;
pub mod online_pipeline;
pub mod scoring_stage;

pub use offline_pipeline::OfflinePipeline;
pub use online_pipeline::OnlinePipeline;
pub use scoring_stage::ScoringStage;

#[cfg(test)]
pub(crate) mod test_support {
    use crate::core::{ConfigProvider, Storage};
    use crate::utils::error::{EtlError, Result};
    use std::collections::HashMap;
    use std::sync::Arc;
    use tokio::sync::Mutex;

    #[derive(Clone, Default)]
    pub struct MockStorage {
        files: Arc<Mutex<HashMap<String, Vec<u8>>>>,
    }

    impl MockStorage {
        pub fn new() -> Self {
            Self::default()
        }

        pub async fn get_file(&self, path: &str) -> Option<Vec<u8>> {
            let files = self.files.lock().await;
            files.get(path).cloned()
        }
    }

    impl Storage for MockStorage {
        async fn read_file(&self, path: &str) -> Result<Vec<u8>> {
            let files = self.files.lock().await;
            files.get(path).cloned().ok_or_else(|| {
                EtlError::IoError(std::io::Error::new(
                    std::io::ErrorKind::NotFound,
                    format!("File not found: {}", path),
                ))
            })
        }

        async fn write_file(&self, path: &str, data: &[u8]) -> Result<()> {
            let mut files = self.files.lock().await;
            files.insert(path.to_string(), data.to_vec());
            Ok(())
        }

        async fn append_file(&self, path: &str, data: &[u8]) -> Result<()> {
            let mut files = self.files.lock().await;
            files.entry(path.to_string()).or_default().extend_from_slice(data);
            Ok(())
        }

        async fn exists(&self, path: &str) -> bool {
            self.files.lock().await.contains_key(path)
        }
    }

    pub struct MockConfig {
        measurements_path: String,
    }

    impl MockConfig {
        pub fn new(measurements_path: &str) -> Self {
            Self {
                measurements_path: measurements_path.to_string(),
            }
        }
    }

    impl ConfigProvider for MockConfig {
        fn measurements_path(&self) -> &str {
            &self.measurements_path
        }

        fn volume_weight(&self) -> f64 {
            1.0
        }

        fn difficulty_weight(&self) -> f64 {
            1.0
        }
    }
}
