use super::{field_matches, PostingStore};
use crate::error::StoreError;
use crate::models::{Posting, StoredPosting};
use async_trait::async_trait;
use chrono::Utc;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicU64, Ordering};
use tokio::io::AsyncWriteExt;
use tracing::{debug, warn};

/// Distinguishes staging files of concurrent writers in one process
static STAGING_SEQ: AtomicU64 = AtomicU64::new(0);

/// One pretty-printed JSON file per document: `<root>/<collection>/<id>.json`.
///
/// A document is written in full to a staging file, then hard-linked into
/// place. Linking fails if the target exists, so two writers racing on the
/// same id produce exactly one document, and a crash mid-write never leaves
/// a truncated `<id>.json` behind. An existing file that is empty or not
/// valid JSON counts as absent and is replaced.
pub struct JsonFileStore {
    root: PathBuf,
}

impl JsonFileStore {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    fn document_path(&self, collection: &str, id: &str) -> PathBuf {
        self.root.join(collection).join(format!("{id}.json"))
    }

    fn staging_path(&self, collection: &str, id: &str) -> PathBuf {
        let seq = STAGING_SEQ.fetch_add(1, Ordering::Relaxed);
        self.root
            .join(collection)
            .join(format!(".{id}.{}.{seq}.tmp", std::process::id()))
    }

    /// Parsed document at `path`; `None` when missing, empty or unreadable
    async fn read_document(path: &Path) -> Result<Option<serde_json::Value>, StoreError> {
        let raw = match tokio::fs::read(path).await {
            Ok(raw) => raw,
            Err(err) if err.kind() == ErrorKind::NotFound => return Ok(None),
            Err(err) => return Err(err.into()),
        };

        match serde_json::from_slice::<serde_json::Value>(&raw) {
            Ok(document) => Ok(Some(document)),
            Err(err) => {
                warn!(path = %path.display(), error = %err, "Ignoring unreadable document");
                Ok(None)
            }
        }
    }

    async fn write_staged(path: &Path, json: &str) -> Result<(), StoreError> {
        let mut file = tokio::fs::OpenOptions::new()
            .write(true)
            .create_new(true)
            .open(path)
            .await?;
        file.write_all(json.as_bytes()).await?;
        file.sync_all().await?;
        Ok(())
    }

    /// Move a fully written staging file to `path` unless a readable
    /// document already sits there
    async fn link_into_place(staged: &Path, path: &Path, id: &str) -> Result<bool, StoreError> {
        match tokio::fs::hard_link(staged, path).await {
            Ok(()) => Ok(true),
            Err(err) if err.kind() == ErrorKind::AlreadyExists => {
                if Self::read_document(path).await?.is_some() {
                    debug!(id, "Document already exists, not overwriting");
                    return Ok(false);
                }
                warn!(id, path = %path.display(), "Replacing damaged document");
                tokio::fs::rename(staged, path).await?;
                Ok(true)
            }
            Err(err) => Err(err.into()),
        }
    }

    async fn scan_for(&self, collection: &str, field: &str, value: &str) -> Result<bool, StoreError> {
        let dir = self.root.join(collection);
        let mut entries = match tokio::fs::read_dir(&dir).await {
            Ok(entries) => entries,
            Err(err) if err.kind() == ErrorKind::NotFound => return Ok(false),
            Err(err) => return Err(err.into()),
        };

        while let Some(entry) = entries.next_entry().await? {
            let path = entry.path();
            if path.extension().and_then(|ext| ext.to_str()) != Some("json") {
                continue;
            }

            if let Some(document) = Self::read_document(&path).await? {
                if field_matches(&document, field, value) {
                    return Ok(true);
                }
            }
        }
        Ok(false)
    }
}

#[async_trait]
impl PostingStore for JsonFileStore {
    async fn exists(&self, collection: &str, field: &str, value: &str) -> Result<bool, StoreError> {
        if field == "id" {
            let path = self.document_path(collection, value);
            return Ok(Self::read_document(&path).await?.is_some());
        }
        self.scan_for(collection, field, value).await
    }

    async fn insert(&self, collection: &str, posting: &Posting) -> Result<bool, StoreError> {
        tokio::fs::create_dir_all(self.root.join(collection)).await?;

        let document = StoredPosting {
            posting: posting.clone(),
            created_at: Utc::now(),
        };
        let json = serde_json::to_string_pretty(&document)?;

        let path = self.document_path(collection, &posting.id);
        let staged = self.staging_path(collection, &posting.id);

        let outcome = match Self::write_staged(&staged, &json).await {
            Ok(()) => Self::link_into_place(&staged, &path, &posting.id).await,
            Err(err) => Err(err),
        };

        // After a rename the staging file is gone; NotFound is expected
        if let Err(err) = tokio::fs::remove_file(&staged).await {
            if err.kind() != ErrorKind::NotFound {
                warn!(path = %staged.display(), error = %err, "Failed to remove staging file");
            }
        }
        outcome
    }

    fn backend_name(&self) -> &'static str {
        "json-file"
    }
}
