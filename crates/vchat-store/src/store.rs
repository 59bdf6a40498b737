//! Uploads directory store.

use std::path::{Path, PathBuf};

use chrono::Utc;
use tracing::{debug, info};

use vchat_models::{MediaAsset, VideoMime};

use crate::error::{StorageError, StoreResult};

/// Upload size ceiling: 25 MiB.
pub const MAX_UPLOAD_BYTES: u64 = 25 * 1024 * 1024;

/// Filesystem store for uploaded videos.
///
/// Files accumulate for the lifetime of the deployment; nothing reclaims
/// them.
#[derive(Debug, Clone)]
pub struct MediaStore {
    root: PathBuf,
}

impl MediaStore {
    /// Create a store rooted at the given directory.
    ///
    /// The directory is created on the first write, not here.
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    /// Create a store from the `UPLOAD_DIR` environment variable.
    pub fn from_env() -> Self {
        let root = std::env::var("UPLOAD_DIR").unwrap_or_else(|_| "uploads".to_string());
        Self::new(root)
    }

    /// The uploads directory.
    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Validate and write an uploaded video, returning its descriptor.
    ///
    /// The size ceiling is checked before any write, so a rejected upload
    /// leaves nothing on disk.
    pub async fn store(
        &self,
        bytes: &[u8],
        declared_mime: &str,
        original_name: &str,
    ) -> StoreResult<MediaAsset> {
        let mime = VideoMime::from_mime(declared_mime)
            .ok_or_else(|| StorageError::unsupported_mime(declared_mime))?;

        if bytes.is_empty() {
            return Err(StorageError::EmptyUpload);
        }

        let size = bytes.len() as u64;
        if size > MAX_UPLOAD_BYTES {
            return Err(StorageError::TooLarge {
                size,
                limit: MAX_UPLOAD_BYTES,
            });
        }

        let filename = generate_filename(mime);
        let path = self.root.join(&filename);

        tokio::fs::create_dir_all(&self.root).await?;
        tokio::fs::write(&path, bytes).await?;

        info!(
            filename = %filename,
            original = %original_name,
            size,
            mime = %mime,
            "Stored uploaded video"
        );

        Ok(MediaAsset {
            filename,
            path,
            size_bytes: size,
            mime,
        })
    }

    /// Resolve a stored filename to its path.
    pub fn resolve(&self, filename: &str) -> StoreResult<PathBuf> {
        validate_filename(filename)?;

        let path = self.root.join(filename);
        if !path.is_file() {
            return Err(StorageError::not_found(filename));
        }
        Ok(path)
    }

    /// Look up a stored file and rebuild its descriptor.
    pub async fn open(&self, filename: &str) -> StoreResult<MediaAsset> {
        let path = self.resolve(filename)?;

        let ext = path
            .extension()
            .and_then(|e| e.to_str())
            .unwrap_or_default();
        let mime = VideoMime::from_extension(ext)
            .ok_or_else(|| StorageError::unsupported_mime(ext))?;

        let meta = tokio::fs::metadata(&path).await?;

        Ok(MediaAsset {
            filename: filename.to_string(),
            path,
            size_bytes: meta.len(),
            mime,
        })
    }

    /// Read the full contents of a stored file.
    pub async fn read(&self, filename: &str) -> StoreResult<Vec<u8>> {
        let path = self.resolve(filename)?;
        debug!(filename = %filename, "Reading stored video");
        Ok(tokio::fs::read(path).await?)
    }
}

/// Collision-resistant name: `<unix-millis>-<random-u32>.<ext>`.
fn generate_filename(mime: VideoMime) -> String {
    format!(
        "{}-{}.{}",
        Utc::now().timestamp_millis(),
        rand::random::<u32>(),
        mime.extension()
    )
}

/// Reject names that could escape the uploads directory.
fn validate_filename(filename: &str) -> StoreResult<()> {
    if filename.is_empty()
        || filename.contains('/')
        || filename.contains('\\')
        || filename.contains("..")
    {
        return Err(StorageError::invalid_name(filename));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    #[tokio::test]
    async fn test_store_supported_mimetypes() {
        let dir = tempdir().unwrap();
        let store = MediaStore::new(dir.path());

        for (mime, ext) in [
            ("video/mp4", "mp4"),
            ("video/webm", "webm"),
            ("video/quicktime", "mov"),
            ("video/x-msvideo", "avi"),
        ] {
            let asset = store.store(b"fake video", mime, "clip").await.unwrap();
            assert!(
                asset.filename.ends_with(&format!(".{ext}")),
                "{} should produce a .{ext} name, got {}",
                mime,
                asset.filename
            );
            assert!(asset.path.is_file());
            assert_eq!(asset.size_bytes, 10);
        }
    }

    #[tokio::test]
    async fn test_store_rejects_unsupported_mime() {
        let dir = tempdir().unwrap();
        let store = MediaStore::new(dir.path());

        let err = store.store(b"data", "text/plain", "notes.txt").await.unwrap_err();
        assert!(matches!(err, StorageError::UnsupportedMime(_)));
        assert!(err.to_string().contains("video file"));
    }

    #[tokio::test]
    async fn test_store_rejects_empty_upload() {
        let dir = tempdir().unwrap();
        let store = MediaStore::new(dir.path());

        let err = store.store(b"", "video/mp4", "clip.mp4").await.unwrap_err();
        assert!(matches!(err, StorageError::EmptyUpload));
    }

    #[tokio::test]
    async fn test_store_rejects_oversize_and_leaves_nothing_on_disk() {
        let dir = tempdir().unwrap();
        let store = MediaStore::new(dir.path());

        let oversized = vec![0u8; (MAX_UPLOAD_BYTES + 1) as usize];
        let err = store
            .store(&oversized, "video/mp4", "big.mp4")
            .await
            .unwrap_err();
        assert!(matches!(err, StorageError::TooLarge { .. }));

        // Rejection happens before any write.
        let entries: Vec<_> = std::fs::read_dir(dir.path())
            .map(|rd| rd.collect())
            .unwrap_or_default();
        assert!(entries.is_empty());
    }

    #[tokio::test]
    async fn test_resolve_missing_file_is_not_found() {
        let dir = tempdir().unwrap();
        let store = MediaStore::new(dir.path());

        let err = store.resolve("123-456.mp4").unwrap_err();
        assert!(matches!(err, StorageError::NotFound(_)));
    }

    #[tokio::test]
    async fn test_resolve_rejects_traversal() {
        let dir = tempdir().unwrap();
        let store = MediaStore::new(dir.path());

        for name in ["../etc/passwd", "a/b.mp4", "..", ""] {
            let err = store.resolve(name).unwrap_err();
            assert!(matches!(err, StorageError::InvalidName(_)), "{name}");
        }
    }

    #[tokio::test]
    async fn test_open_round_trips_stored_asset() {
        let dir = tempdir().unwrap();
        let store = MediaStore::new(dir.path());

        let stored = store
            .store(b"fake video", "video/webm", "clip.webm")
            .await
            .unwrap();
        let opened = store.open(&stored.filename).await.unwrap();
        assert_eq!(opened, stored);
    }

    #[tokio::test]
    async fn test_read_returns_stored_bytes() {
        let dir = tempdir().unwrap();
        let store = MediaStore::new(dir.path());

        let stored = store.store(b"abc123", "video/mp4", "clip.mp4").await.unwrap();
        let bytes = store.read(&stored.filename).await.unwrap();
        assert_eq!(bytes, b"abc123");
    }

    #[tokio::test]
    async fn test_generated_names_are_distinct() {
        let dir = tempdir().unwrap();
        let store = MediaStore::new(dir.path());

        let a = store.store(b"a", "video/mp4", "a.mp4").await.unwrap();
        let b = store.store(b"b", "video/mp4", "b.mp4").await.unwrap();
        assert_ne!(a.filename, b.filename);
    }
}
