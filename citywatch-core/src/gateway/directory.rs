use std::{path::PathBuf, sync::Arc};
use tokio::sync::OnceCell;

use crate::{error::DirectoryError, model::CityDirectoryEntry};

/// Small sample shipped with the binary for use without a full dataset.
const BUNDLED_CITIES: &str = include_str!("../../assets/city.list.json");

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DirectorySource {
    Bundled,
    File(PathBuf),
}

/// City directory loaded on first use and kept for the process lifetime.
#[derive(Debug, Clone)]
pub struct CityDirectory {
    source: DirectorySource,
    cache: Arc<OnceCell<Arc<[CityDirectoryEntry]>>>,
}

impl CityDirectory {
    pub fn new(source: DirectorySource) -> Self {
        Self { source, cache: Arc::new(OnceCell::new()) }
    }

    pub fn source(&self) -> &DirectorySource {
        &self.source
    }

    pub async fn load(&self) -> Result<Arc<[CityDirectoryEntry]>, DirectoryError> {
        let entries = self.cache.get_or_try_init(|| self.read_source()).await?;
        Ok(Arc::clone(entries))
    }

    async fn read_source(&self) -> Result<Arc<[CityDirectoryEntry]>, DirectoryError> {
        let entries: Vec<CityDirectoryEntry> = match &self.source {
            DirectorySource::Bundled => serde_json::from_str(BUNDLED_CITIES)?,
            DirectorySource::File(path) => {
                let bytes = tokio::fs::read(path)
                    .await
                    .map_err(|source| DirectoryError::Io { path: path.clone(), source })?;
                serde_json::from_slice(&bytes)?
            }
        };

        tracing::debug!(count = entries.len(), source = ?self.source, "loaded city directory");
        Ok(entries.into())
    }
}
