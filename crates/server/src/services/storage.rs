//! Local file storage for profile avatars.
//!
//! Files live under `{root}/avatars/` and are served by the router at
//! `/storage`, so the public URL of `{root}/avatars/x.png` is
//! `/storage/avatars/x.png`.

use std::path::{Path, PathBuf};

use thiserror::Error;
use tracing::instrument;
use uuid::Uuid;

use ledgerdesk_core::ProfileId;

use crate::config::StorageConfig;

/// URL prefix the storage root is mounted at.
pub const STORAGE_URL_PREFIX: &str = "/storage";

const AVATAR_DIR: &str = "avatars";

/// Errors that can occur while storing uploads.
#[derive(Debug, Error)]
pub enum StorageError {
    /// Upload exceeds the configured limit.
    #[error("file exceeds the {max} byte limit")]
    TooLarge { max: usize },

    /// Content type isn't an accepted image type.
    #[error("unsupported file type: {0}")]
    UnsupportedType(String),

    /// The multipart body had no file part.
    #[error("no file was uploaded")]
    MissingFile,

    /// Filesystem failure.
    #[error("storage I/O error: {0}")]
    Io(#[from] std::io::Error),
}

/// File extension for an accepted image MIME type.
#[must_use]
pub fn image_extension(content_type: &str) -> Option<&'static str> {
    match content_type.trim().to_ascii_lowercase().as_str() {
        "image/jpeg" | "image/jpg" => Some("jpg"),
        "image/png" => Some("png"),
        "image/gif" => Some("gif"),
        "image/webp" => Some("webp"),
        _ => None,
    }
}

/// Avatar file store rooted at a directory.
#[derive(Debug, Clone)]
pub struct AvatarStore {
    root: PathBuf,
    max_bytes: usize,
}

impl AvatarStore {
    /// Create a store rooted at `root`.
    #[must_use]
    pub const fn new(root: PathBuf, max_bytes: usize) -> Self {
        Self { root, max_bytes }
    }

    /// Create a store from configuration.
    #[must_use]
    pub fn from_config(config: &StorageConfig) -> Self {
        Self::new(config.root.clone(), config.max_upload_bytes)
    }

    /// Directory served under [`STORAGE_URL_PREFIX`].
    #[must_use]
    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Maximum accepted upload size in bytes.
    #[must_use]
    pub const fn max_bytes(&self) -> usize {
        self.max_bytes
    }

    /// Persist an avatar and return its public URL.
    ///
    /// The bytes are staged in a temp file first and copied into place; the
    /// temp file is removed whether or not the copy succeeds.
    ///
    /// # Errors
    ///
    /// Returns `StorageError::TooLarge` or `StorageError::UnsupportedType`
    /// for rejected uploads, `StorageError::Io` if writing fails.
    #[instrument(skip(self, bytes), fields(size = bytes.len()))]
    pub async fn store_avatar(
        &self,
        user_id: ProfileId,
        content_type: &str,
        bytes: &[u8],
    ) -> Result<String, StorageError> {
        if bytes.len() > self.max_bytes {
            return Err(StorageError::TooLarge {
                max: self.max_bytes,
            });
        }
        let ext = image_extension(content_type)
            .ok_or_else(|| StorageError::UnsupportedType(content_type.to_string()))?;

        let file_name = format!("{user_id}-{}.{ext}", Uuid::new_v4());
        let temp_path = std::env::temp_dir().join(format!("ledgerdesk-upload-{file_name}"));

        tokio::fs::write(&temp_path, bytes).await?;
        let copied = self.copy_into_place(&temp_path, &file_name).await;
        if let Err(e) = tokio::fs::remove_file(&temp_path).await {
            tracing::warn!(path = %temp_path.display(), error = %e, "Temp upload not removed");
        }
        copied?;

        tracing::info!(%user_id, file = %file_name, "Avatar stored");
        Ok(format!("{STORAGE_URL_PREFIX}/{AVATAR_DIR}/{file_name}"))
    }

    async fn copy_into_place(&self, temp_path: &Path, file_name: &str) -> std::io::Result<()> {
        let dir = self.root.join(AVATAR_DIR);
        tokio::fs::create_dir_all(&dir).await?;
        tokio::fs::copy(temp_path, dir.join(file_name)).await?;
        Ok(())
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    fn scratch_root() -> PathBuf {
        std::env::temp_dir().join(format!("ledgerdesk-storage-test-{}", Uuid::new_v4()))
    }

    #[test]
    fn test_image_extension() {
        assert_eq!(image_extension("image/jpeg"), Some("jpg"));
        assert_eq!(image_extension("IMAGE/PNG"), Some("png"));
        assert_eq!(image_extension("image/webp"), Some("webp"));
        assert_eq!(image_extension("image/svg+xml"), None);
        assert_eq!(image_extension("application/pdf"), None);
    }

    #[tokio::test]
    async fn test_store_avatar_writes_file() {
        let root = scratch_root();
        let store = AvatarStore::new(root.clone(), 1024);
        let user = ProfileId::generate();

        let url = store.store_avatar(user, "image/png", b"\x89PNG").await.unwrap();

        let prefix = format!("/storage/avatars/{user}-");
        assert!(url.starts_with(&prefix));
        assert!(url.ends_with(".png"));

        let relative = url.trim_start_matches("/storage/");
        let written = tokio::fs::read(root.join(relative)).await.unwrap();
        assert_eq!(written, b"\x89PNG");

        tokio::fs::remove_dir_all(root).await.unwrap();
    }

    #[tokio::test]
    async fn test_store_avatar_rejections() {
        let root = scratch_root();
        let store = AvatarStore::new(root.clone(), 4);
        let user = ProfileId::generate();

        assert!(matches!(
            store.store_avatar(user, "image/png", b"12345").await,
            Err(StorageError::TooLarge { max: 4 })
        ));
        assert!(matches!(
            store.store_avatar(user, "text/plain", b"hi").await,
            Err(StorageError::UnsupportedType(_))
        ));
        assert!(!root.exists());
    }
}
