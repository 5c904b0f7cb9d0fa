//! File-system storage
//!
//! Raw bytes keyed by [`Filename`] inside one directory. The directory is
//! created on first write. Writes land in a temporary sibling file and are
//! renamed into place, so readers never observe a partial blob.

use crate::error::{Result, StorageError};
use crate::storage::{NamedStorage, ReadableStorage, WritableStorage};
use async_trait::async_trait;
use std::fmt;
use std::path::{Path, PathBuf};
use tokio::fs;

/// A single file name, without directory components
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct Filename(String);

impl Filename {
    /// Create a file name
    ///
    /// # Errors
    /// [`StorageError::KeyMapping`] for empty names, `.`/`..`, or names
    /// containing a path separator
    pub fn new(name: impl Into<String>) -> Result<Self> {
        let name = name.into();
        let invalid = name.is_empty()
            || name == "."
            || name == ".."
            || name.contains('/')
            || name.contains('\\');
        if invalid {
            return Err(StorageError::KeyMapping(format!("{name:?} is not a file name")));
        }
        Ok(Self(name))
    }

    /// The file name
    #[inline]
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for Filename {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Byte storage backed by files in a directory
#[derive(Debug, Clone)]
pub struct FileSystemStorage {
    directory: PathBuf,
    name: String,
}

impl FileSystemStorage {
    /// Create storage rooted at `directory`
    #[must_use]
    pub fn new(directory: impl Into<PathBuf>) -> Self {
        let directory = directory.into();
        let name = format!("disk:{}", directory.display());
        Self { directory, name }
    }

    /// Set diagnostic name
    #[inline]
    #[must_use]
    pub fn with_name(mut self, name: impl Into<String>) -> Self {
        self.name = name.into();
        self
    }

    /// Root directory
    #[inline]
    #[must_use]
    pub fn directory(&self) -> &Path {
        &self.directory
    }

    fn path_for(&self, filename: &Filename) -> PathBuf {
        self.directory.join(filename.as_str())
    }
}

impl NamedStorage for FileSystemStorage {
    fn storage_name(&self) -> &str {
        &self.name
    }
}

#[async_trait]
impl ReadableStorage<Filename, Vec<u8>> for FileSystemStorage {
    async fn retrieve(&self, key: Filename) -> Result<Vec<u8>> {
        fs::read(self.path_for(&key))
            .await
            .map_err(|err| StorageError::from_io(&self.name, &key, &err))
    }
}

#[async_trait]
impl WritableStorage<Filename, Vec<u8>> for FileSystemStorage {
    async fn set(&self, value: Vec<u8>, key: Filename) -> Result<()> {
        let io_error = |err: std::io::Error| StorageError::from_io(&self.name, &key, &err);

        fs::create_dir_all(&self.directory).await.map_err(io_error)?;

        let temp = self
            .directory
            .join(format!(".{}.{}.tmp", key.as_str(), uuid::Uuid::new_v4().simple()));
        fs::write(&temp, &value).await.map_err(io_error)?;

        if let Err(err) = fs::rename(&temp, self.path_for(&key)).await {
            // best effort, the rename error is what matters
            let _ = fs::remove_file(&temp).await;
            return Err(io_error(err));
        }

        tracing::trace!(storage = %self.name, file = %key, bytes = value.len(), "wrote file");
        Ok(())
    }
}
