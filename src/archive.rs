//! Durable trace artifacts.
//!
//! Every supported request leaves exactly one file behind. On success it is
//! the published YAML; otherwise it is a [`TraceRecord`] describing what
//! happened.
use std::io::ErrorKind;
use std::path::PathBuf;
use std::sync::Mutex;

use async_trait::async_trait;
use bytes::Bytes;
use serde::Serialize;
use thiserror::Error;
use tokio::io::AsyncWriteExt;

use crate::routing::ArchiveTarget;

#[derive(Debug, Error)]
pub enum StorageError {
    #[error("failed to write {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("archive file {0} already exists")]
    AlreadyExists(PathBuf),

    #[error("failed to encode trace record: {0}")]
    Encode(String),

    #[error("archive rejected the write: {0}")]
    Rejected(String),
}

/// Persists an artifact under a derived file name.
#[async_trait]
pub trait Archiver: Send + Sync {
    /// Writes `content` to `target`, returning the path written.
    async fn archive(&self, target: &ArchiveTarget, content: Bytes)
        -> Result<PathBuf, StorageError>;
}

/// Writes artifacts to the local filesystem, creating the directory on
/// demand. Never overwrites an existing file.
#[derive(Debug, Clone, Copy, Default)]
pub struct FsArchiver;

#[async_trait]
impl Archiver for FsArchiver {
    async fn archive(
        &self,
        target: &ArchiveTarget,
        content: Bytes,
    ) -> Result<PathBuf, StorageError> {
        let path = target.path();
        let io_err = |source: std::io::Error| StorageError::Io {
            path: path.clone(),
            source,
        };

        tokio::fs::create_dir_all(&target.directory)
            .await
            .map_err(|source| StorageError::Io {
                path: target.directory.clone(),
                source,
            })?;

        let mut file = match tokio::fs::OpenOptions::new()
            .write(true)
            .create_new(true)
            .open(&path)
            .await
        {
            Ok(file) => file,
            Err(e) if e.kind() == ErrorKind::AlreadyExists => {
                return Err(StorageError::AlreadyExists(path.clone()));
            }
            Err(e) => return Err(io_err(e)),
        };
        file.write_all(&content).await.map_err(io_err)?;
        file.flush().await.map_err(io_err)?;

        tracing::debug!(path = %path.display(), bytes = content.len(), "archive_written");
        Ok(path)
    }
}

/// Keeps artifacts in memory.
#[derive(Debug, Default)]
pub struct MemoryArchiver {
    written: Mutex<Vec<(PathBuf, Bytes)>>,
    refuse_with: Option<String>,
}

impl MemoryArchiver {
    pub fn new() -> Self {
        Self::default()
    }

    /// An archiver whose every write fails with [`StorageError::Rejected`].
    pub fn refusing(message: impl Into<String>) -> Self {
        Self {
            written: Mutex::default(),
            refuse_with: Some(message.into()),
        }
    }

    pub fn written(&self) -> Vec<(PathBuf, Bytes)> {
        self.written
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
            .clone()
    }
}

#[async_trait]
impl Archiver for MemoryArchiver {
    async fn archive(
        &self,
        target: &ArchiveTarget,
        content: Bytes,
    ) -> Result<PathBuf, StorageError> {
        if let Some(reason) = &self.refuse_with {
            return Err(StorageError::Rejected(reason.clone()));
        }
        let path = target.path();
        let mut written = self
            .written
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner());
        if written.iter().any(|(existing, _)| existing == &path) {
            return Err(StorageError::AlreadyExists(path.clone()));
        }
        written.push((path.clone(), content));
        Ok(path)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum TraceStatus {
    /// The conversion failed and the body went to the dead-letter target.
    Failed,
    /// The dispatch was dropped before it could finalize.
    Abandoned,
}

/// Archived in place of a YAML payload when there is none to keep.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct TraceRecord {
    pub status: TraceStatus,
    pub file_name: String,
    pub content_type: String,
    pub pipeline: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub stage: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub cause: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub err_file_name: Option<String>,
}

impl TraceRecord {
    pub fn to_yaml(&self) -> Result<Bytes, StorageError> {
        serde_yaml::to_string(self)
            .map(Bytes::from)
            .map_err(|e| StorageError::Encode(e.to_string()))
    }
}

#[cfg(test)]
mod tests {
    use tempfile::tempdir;

    use super::*;

    #[tokio::test]
    async fn fs_archiver_creates_directory_and_writes() {
        let dir = tempdir().unwrap();
        let target = ArchiveTarget::for_upload(dir.path().join("outputs"), "orders.csv", 9, "yaml");

        let path = FsArchiver
            .archive(&target, Bytes::from_static(b"format: csv\n"))
            .await
            .unwrap();

        assert_eq!(path, dir.path().join("outputs/orders.csv-9.yaml"));
        assert_eq!(std::fs::read(&path).unwrap(), b"format: csv\n");
    }

    #[tokio::test]
    async fn fs_archiver_never_overwrites() {
        let dir = tempdir().unwrap();
        let target = ArchiveTarget::for_upload(dir.path(), "a.json", 1, "yaml");
        FsArchiver.archive(&target, Bytes::from_static(b"first")).await.unwrap();

        let err = FsArchiver
            .archive(&target, Bytes::from_static(b"second"))
            .await
            .unwrap_err();
        assert!(matches!(err, StorageError::AlreadyExists(_)));
        assert_eq!(std::fs::read(target.path()).unwrap(), b"first");
    }

    #[tokio::test]
    async fn fs_archiver_reports_unwritable_directory() {
        let dir = tempdir().unwrap();
        let blocker = dir.path().join("not-a-dir");
        std::fs::write(&blocker, b"").unwrap();

        let target = ArchiveTarget::for_upload(&blocker, "x.csv", 1, "yaml");
        let err = FsArchiver.archive(&target, Bytes::new()).await.unwrap_err();
        assert!(matches!(err, StorageError::Io { .. }));
    }

    #[test]
    fn trace_record_yaml_uses_wire_names() {
        let record = TraceRecord {
            status: TraceStatus::Failed,
            file_name: "orders.csv".into(),
            content_type: "text/csv".into(),
            pipeline: "csv".into(),
            stage: Some("parse".into()),
            cause: Some("malformed csv body".into()),
            err_file_name: Some("orders-1-error.txt".into()),
        };
        let yaml = record.to_yaml().unwrap();
        let text = std::str::from_utf8(&yaml).unwrap();
        assert!(text.starts_with("status: failed\n"), "{text}");
        assert!(text.contains("fileName: orders.csv"), "{text}");
        assert!(text.contains("errFileName: orders-1-error.txt"), "{text}");
    }
}
