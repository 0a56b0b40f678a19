//! Disk-backed delivery cache
//!
//! Cache files are keyed by document id and written once per cold delivery.
//! A writer streams into a uniquely named temp file and commits with an
//! atomic rename, so a partial write is never visible under the final name.
//! Concurrent cold requests for the same id each write their own temp file;
//! the last rename wins and every rename installs one complete copy. There
//! is no eviction.

use std::path::{Path, PathBuf};

use tokio::fs::File;
use tokio::io::AsyncWriteExt;
use uuid::Uuid;

/// Cache directory handle, injected into the delivery path.
#[derive(Debug, Clone)]
pub struct DeliveryCache {
    dir: PathBuf,
}

impl DeliveryCache {
    /// Open (and create if needed) the cache directory.
    pub fn new(dir: impl AsRef<Path>) -> std::io::Result<Self> {
        let dir = dir.as_ref().to_path_buf();
        std::fs::create_dir_all(&dir)?;
        Ok(Self { dir })
    }

    /// Return the cached file path for a document id, if a committed copy
    /// exists.
    pub async fn lookup(&self, id: &str) -> Option<PathBuf> {
        let path = self.final_path(id);
        match tokio::fs::try_exists(&path).await {
            Ok(true) => Some(path),
            _ => None,
        }
    }

    /// Begin a write for a document id. Nothing is visible under the final
    /// name until the returned writer is committed.
    pub async fn begin_write(&self, id: &str) -> std::io::Result<CacheWriter> {
        let tmp_path = self
            .dir
            .join(format!("{}.{}.tmp", id, Uuid::new_v4().simple()));
        let file = File::create(&tmp_path).await?;

        Ok(CacheWriter {
            tmp_path,
            final_path: self.final_path(id),
            file: Some(file),
            committed: false,
        })
    }

    fn final_path(&self, id: &str) -> PathBuf {
        self.dir.join(format!("{}.pdf", id))
    }

    #[cfg(test)]
    pub fn dir(&self) -> &Path {
        &self.dir
    }
}

/// In-progress cache write. Dropping an uncommitted writer removes its
/// temp file, which is how client disconnects and mid-stream faults clean
/// up without leaving orphans.
#[derive(Debug)]
pub struct CacheWriter {
    tmp_path: PathBuf,
    final_path: PathBuf,
    file: Option<File>,
    committed: bool,
}

impl CacheWriter {
    pub async fn write(&mut self, chunk: &[u8]) -> std::io::Result<()> {
        if let Some(file) = self.file.as_mut() {
            file.write_all(chunk).await?;
        }
        Ok(())
    }

    /// Flush and atomically rename the temp file into place.
    pub async fn commit(mut self) -> std::io::Result<()> {
        if let Some(mut file) = self.file.take() {
            file.flush().await?;
            drop(file);
            tokio::fs::rename(&self.tmp_path, &self.final_path).await?;
        }
        self.committed = true;
        Ok(())
    }
}

impl Drop for CacheWriter {
    fn drop(&mut self) {
        if !self.committed {
            self.file.take();
            let _ = std::fs::remove_file(&self.tmp_path);
        }
    }
}
