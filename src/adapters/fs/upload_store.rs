use async_trait::async_trait;
use tracing::debug;

use crate::application::ports::DatasetStorePort;
use crate::config::UploadFolders;
use crate::domain::dataset::{DatasetSplit, SplitStats};
use crate::domain::errors::{DomainError, DomainResult};

/// Store respaldado por las carpetas locales `datasets/{train,valid,test}`.
pub struct FsDatasetStore {
    folders: UploadFolders,
}

impl FsDatasetStore {
    pub fn new(folders: UploadFolders) -> Self {
        Self { folders }
    }

    /// Crea las carpetas de subida que falten.
    pub fn bootstrap(folders: UploadFolders) -> DomainResult<Self> {
        folders.ensure()?;
        Ok(Self::new(folders))
    }
}

#[async_trait]
impl DatasetStorePort for FsDatasetStore {
    async fn split_stats(&self, split: DatasetSplit) -> DomainResult<Option<SplitStats>> {
        let folder = self.folders.folder(split);
        let mut entries = tokio::fs::read_dir(folder).await.map_err(|e| {
            DomainError::OperationFailed(format!("{}: {e}", folder.display()))
        })?;

        let mut stats = SplitStats { file_count: 0, total_size: 0 };
        while let Some(entry) = entries.next_entry().await? {
            // Sigue symlinks; los enlaces rotos no cuentan como fichero.
            let Ok(meta) = tokio::fs::metadata(entry.path()).await else {
                continue;
            };
            if meta.is_file() {
                stats.file_count += 1;
                stats.total_size += meta.len();
            }
        }

        Ok((stats.file_count > 0).then_some(stats))
    }

    async fn save_file(&self, split: DatasetSplit, filename: &str, bytes: &[u8]) -> DomainResult<()> {
        let path = self.folders.folder(split).join(filename);
        tokio::fs::write(&path, bytes).await?;
        debug!("Guardado {} ({} bytes)", path.display(), bytes.len());
        Ok(())
    }
}
