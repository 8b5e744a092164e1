//! Flat-directory blob storage for uploaded and generated images.

use std::path::PathBuf;

use tracing::info;
use uuid::Uuid;

use crate::error::FitroomError;

/// Write-once blob storage backed by a single flat directory.
///
/// Filenames are `<prefix>_<uuid>.png`, so concurrent writers never collide
/// and nothing needs locking. There is no listing and no deletion; the
/// directory grows until someone cleans it out by hand. Callers must keep
/// the filename returned by [`BlobStore::put`] to get the bytes back.
#[derive(Clone, Debug)]
pub struct BlobStore {
    dir: PathBuf,
}

impl BlobStore {
    /// Opens a store rooted at `dir`, creating the directory if needed.
    pub async fn open(dir: impl Into<PathBuf>) -> Result<Self, FitroomError> {
        let dir = dir.into();
        tokio::fs::create_dir_all(&dir).await?;
        Ok(Self { dir })
    }

    fn new_filename(prefix: &str) -> String {
        format!("{}_{}.png", prefix, Uuid::new_v4())
    }

    /// Writes `bytes` under a fresh `<prefix>_<uuid>.png` name and returns
    /// the filename.
    pub async fn put(&self, bytes: &[u8], prefix: &str) -> Result<String, FitroomError> {
        let filename = Self::new_filename(prefix);
        tokio::fs::write(self.dir.join(&filename), bytes).await?;
        info!("Saved image: {}", filename);
        Ok(filename)
    }

    /// Reads a stored blob back.
    ///
    /// Filenames holding path separators or parent-directory tokens are
    /// rejected as not-found before the filesystem is touched.
    pub async fn get(&self, filename: &str) -> Result<Vec<u8>, FitroomError> {
        if !is_safe_filename(filename) {
            return Err(FitroomError::NotFound(filename.to_string()));
        }
        match tokio::fs::read(self.dir.join(filename)).await {
            Ok(bytes) => Ok(bytes),
            Err(err) if err.kind() == std::io::ErrorKind::NotFound => {
                Err(FitroomError::NotFound(filename.to_string()))
            }
            Err(err) => Err(err.into()),
        }
    }

    /// Filesystem metadata for a stored blob, subject to the same filename
    /// validation as [`BlobStore::get`].
    pub async fn metadata(&self, filename: &str) -> Result<std::fs::Metadata, FitroomError> {
        if !is_safe_filename(filename) {
            return Err(FitroomError::NotFound(filename.to_string()));
        }
        match tokio::fs::metadata(self.dir.join(filename)).await {
            Ok(metadata) => Ok(metadata),
            Err(err) if err.kind() == std::io::ErrorKind::NotFound => {
                Err(FitroomError::NotFound(filename.to_string()))
            }
            Err(err) => Err(err.into()),
        }
    }
}

fn is_safe_filename(filename: &str) -> bool {
    !filename.is_empty()
        && !filename.contains('/')
        && !filename.contains('\\')
        && !filename.contains("..")
}
