use crate::core::Storage;
use crate::utils::error::Result;
use std::path::{Path, PathBuf};
use tokio::io::AsyncWriteExt;

#[derive(Debug, Clone)]
pub struct LocalStorage {
    base_path: String,
}

impl LocalStorage {
    pub fn new(base_path: impl Into<String>) -> Self {
        Self {
            base_path: base_path.into(),
        }
    }

    fn full_path(&self, path: &str) -> PathBuf {
        Path::new(&self.base_path).join(path)
    }

    async fn ensure_parent(path: &Path) -> Result<()> {
        if let Some(parent) = path.parent() {
            if !parent.as_os_str().is_empty() {
                tokio::fs::create_dir_all(parent).await?;
            }
        }
        Ok(())
    }
}

impl Storage for LocalStorage {
    async fn read_file(&self, path: &str) -> Result<Vec<u8>> {
        let data = tokio::fs::read(self.full_path(path)).await?;
        Ok(data)
    }

    async fn write_file(&self, path: &str, data: &[u8]) -> Result<()> {
        let full_path = self.full_path(path);
        Self::ensure_parent(&full_path).await?;
        tokio::fs::write(full_path, data).await?;
        Ok(())
    }

    async fn append_file(&self, path: &str, data: &[u8]) -> Result<()> {
        let full_path = self.full_path(path);
        Self::ensure_parent(&full_path).await?;
        let mut file = tokio::fs::OpenOptions::new()
            .create(true)
            .append(true)
            .open(full_path)
            .await?;
        file.write_all(data).await?;
        file.flush().await?;
        Ok(())
    }

    async fn exists(&self, path: &str) -> bool {
        tokio::fs::try_exists(self.full_path(path))
            .await
            .unwrap_or(false)
    }
}
