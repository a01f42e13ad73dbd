//! # Object Storage
//!
//! Binary payloads (audio, covers, avatars) are kept outside the record
//! store. The core only ever sees the resulting `MediaRef`.
//!
//! `LocalObjectStore` writes objects under `root/<folder>/<uuid>` and hands
//! out URLs below a configurable base; the HTTP server serves `root` at
//! `/media`.

use audioly_core::{MediaRef, SocialError};
use std::path::{Component, Path, PathBuf};

/// Maximum size of a single stored object (25 MB).
pub const MAX_OBJECT_SIZE: usize = 25 * 1024 * 1024;

/// Storage for binary media.
pub trait ObjectStore: Send + Sync {
    /// Store `payload` in `folder` and return its reference.
    fn upload(&self, payload: &[u8], folder: &str) -> Result<MediaRef, SocialError>;

    /// Remove a stored object. Removing a missing object succeeds.
    fn delete(&self, media: &MediaRef) -> Result<(), SocialError>;
}

/// Object store backed by a local directory.
#[derive(Debug, Clone)]
pub struct LocalObjectStore {
    root: PathBuf,
    base_url: String,
}

/// Accept only plain relative paths (no `..`, no absolute components).
fn is_plain_relative(path: &Path) -> bool {
    path.components().all(|c| matches!(c, Component::Normal(_)))
}

impl LocalObjectStore {
    /// Create a store rooted at `root`, creating the directory if needed.
    pub fn new(root: impl Into<PathBuf>, base_url: impl Into<String>) -> Result<Self, SocialError> {
        let root = root.into();
        std::fs::create_dir_all(&root).map_err(|e| {
            SocialError::Storage(format!("cannot create media dir '{}': {}", root.display(), e))
        })?;
        Ok(Self {
            root,
            base_url: base_url.into().trim_end_matches('/').to_string(),
        })
    }

    /// Directory served under `/media`.
    pub fn root(&self) -> &Path {
        &self.root
    }

    fn resolve(&self, storage_id: &str) -> Result<PathBuf, SocialError> {
        let relative = Path::new(storage_id);
        if storage_id.is_empty() || !is_plain_relative(relative) {
            return Err(SocialError::InvalidInput(format!(
                "invalid storage id '{}'",
                storage_id
            )));
        }
        Ok(self.root.join(relative))
    }
}

impl ObjectStore for LocalObjectStore {
    fn upload(&self, payload: &[u8], folder: &str) -> Result<MediaRef, SocialError> {
        if payload.is_empty() {
            return Err(SocialError::InvalidInput("empty media payload".into()));
        }
        if payload.len() > MAX_OBJECT_SIZE {
            return Err(SocialError::InvalidInput(format!(
                "media payload exceeds {} bytes",
                MAX_OBJECT_SIZE
            )));
        }

        let storage_id = format!("{}/{}", folder, uuid::Uuid::new_v4().simple());
        let path = self.resolve(&storage_id)?;
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)
                .map_err(|e| SocialError::Storage(format!("media dir: {}", e)))?;
        }
        std::fs::write(&path, payload)
            .map_err(|e| SocialError::Storage(format!("media write: {}", e)))?;

        let url = format!("{}/{}", self.base_url, storage_id);
        Ok(MediaRef::new(url, storage_id))
    }

    fn delete(&self, media: &MediaRef) -> Result<(), SocialError> {
        let path = self.resolve(&media.storage_id)?;
        match std::fs::remove_file(&path) {
            Ok(()) => Ok(()),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(()),
            Err(e) => Err(SocialError::Storage(format!("media delete: {}", e))),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use audioly_core::primitives::AUDIO_FOLDER;

    #[test]
    fn upload_then_delete() {
        let dir = tempfile::tempdir().expect("tempdir");
        let store = LocalObjectStore::new(dir.path(), "http://host/media/").expect("store");

        let media = store.upload(b"RIFF....", AUDIO_FOLDER).expect("upload");
        assert!(media.storage_id.starts_with("audioly/audio/"));
        assert_eq!(media.url, format!("http://host/media/{}", media.storage_id));

        let path = dir.path().join(&media.storage_id);
        assert_eq!(std::fs::read(&path).expect("read"), b"RIFF....");

        store.delete(&media).expect("delete");
        assert!(!path.exists());
        store.delete(&media).expect("delete twice");
    }

    #[test]
    fn rejects_empty_payload_and_traversal() {
        let dir = tempfile::tempdir().expect("tempdir");
        let store = LocalObjectStore::new(dir.path(), "http://host/media").expect("store");

        assert!(store.upload(b"", AUDIO_FOLDER).is_err());
        assert!(store.delete(&MediaRef::new("x", "../escape")).is_err());
        assert!(store.delete(&MediaRef::new("x", "/etc/passwd")).is_err());
    }
}
