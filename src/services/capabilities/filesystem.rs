//! Local Filesystem
//!
//! `FileSystemCapability` over `tokio::fs`.

use std::path::Path;

use async_trait::async_trait;

use automation_hub_core::{CoreError, CoreResult, DirEntry, FileSystemCapability};

/// Filesystem access against the local disk.
#[derive(Debug, Clone, Default)]
pub struct LocalFileSystem;

impl LocalFileSystem {
    pub fn new() -> Self {
        Self
    }

    /// Whether anything exists at `path`.
    pub async fn exists(&self, path: &Path) -> bool {
        tokio::fs::try_exists(path).await.unwrap_or(false)
    }
}

fn not_found_or_io(path: &Path, err: std::io::Error) -> CoreError {
    if err.kind() == std::io::ErrorKind::NotFound {
        CoreError::not_found(path.display().to_string())
    } else {
        CoreError::Io(err)
    }
}

#[async_trait]
impl FileSystemCapability for LocalFileSystem {
    async fn read_file(&self, path: &Path) -> CoreResult<String> {
        tokio::fs::read_to_string(path)
            .await
            .map_err(|e| not_found_or_io(path, e))
    }

    async fn write_file(&self, path: &Path, content: &str) -> CoreResult<()> {
        if let Some(parent) = path.parent() {
            if !parent.as_os_str().is_empty() {
                tokio::fs::create_dir_all(parent).await?;
            }
        }
        tokio::fs::write(path, content).await?;
        Ok(())
    }

    async fn delete_file(&self, path: &Path) -> CoreResult<()> {
        tokio::fs::remove_file(path)
            .await
            .map_err(|e| not_found_or_io(path, e))
    }

    async fn list_directory(&self, path: &Path) -> CoreResult<Vec<DirEntry>> {
        let mut reader = tokio::fs::read_dir(path)
            .await
            .map_err(|e| not_found_or_io(path, e))?;

        let mut entries = Vec::new();
        while let Some(entry) = reader.next_entry().await? {
            let metadata = entry.metadata().await?;
            entries.push(DirEntry {
                name: entry.file_name().to_string_lossy().into_owned(),
                path: entry.path(),
                is_dir: metadata.is_dir(),
                size: if metadata.is_dir() { 0 } else { metadata.len() },
            });
        }
        entries.sort_by(|a, b| a.name.cmp(&b.name));
        Ok(entries)
    }

    async fn directory_exists(&self, path: &Path) -> bool {
        tokio::fs::metadata(path)
            .await
            .map(|m| m.is_dir())
            .unwrap_or(false)
    }
}
