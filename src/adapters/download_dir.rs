use crate::core::DownloadArea;
use async_trait::async_trait;
use std::io;
use std::path::{Path, PathBuf};

/// The directory the browser saves exports into.
#[derive(Debug, Clone)]
pub struct LocalDownloadDir {
    root: PathBuf,
}

impl LocalDownloadDir {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Creates the directory; `wipe` removes whatever a previous run left.
    pub async fn prepare(&self, wipe: bool) -> io::Result<()> {
        if wipe && tokio::fs::try_exists(&self.root).await? {
            tokio::fs::remove_dir_all(&self.root).await?;
        }
        tokio::fs::create_dir_all(&self.root).await
    }

    pub async fn is_empty(&self) -> io::Result<bool> {
        match tokio::fs::read_dir(&self.root).await {
            Ok(mut entries) => Ok(entries.next_entry().await?.is_none()),
            Err(e) if e.kind() == io::ErrorKind::NotFound => Ok(true),
            Err(e) => Err(e),
        }
    }
}

#[async_trait]
impl DownloadArea for LocalDownloadDir {
    async fn list(&self) -> io::Result<Vec<String>> {
        let mut names = Vec::new();
        let mut entries = tokio::fs::read_dir(&self.root).await?;
        while let Some(entry) = entries.next_entry().await? {
            if entry.file_type().await?.is_file() {
                names.push(entry.file_name().to_string_lossy().into_owned());
            }
        }
        Ok(names)
    }

    async fn size(&self, name: &str) -> io::Result<u64> {
        Ok(tokio::fs::metadata(self.root.join(name)).await?.len())
    }

    async fn read(&self, name: &str) -> io::Result<Vec<u8>> {
        tokio::fs::read(self.root.join(name)).await
    }

    fn location(&self, name: &str) -> PathBuf {
        self.root.join(name)
    }
}
