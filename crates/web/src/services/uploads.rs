//! Product image uploads.
//!
//! Images are written to a local directory and served back under `/images`.
//! Only PNG and JPEG uploads are kept; anything else is dropped as if no file
//! had been attached.

use std::path::{Path, PathBuf};

use axum::body::Bytes;
use chrono::{DateTime, Utc};
use thiserror::Error;

/// MIME types accepted for product images.
pub const ACCEPTED_IMAGE_TYPES: [&str; 3] = ["image/png", "image/jpg", "image/jpeg"];

/// Upload body limit (5 MiB).
pub const MAX_UPLOAD_BYTES: usize = 5 * 1024 * 1024;

/// Errors that can occur while storing or removing images.
#[derive(Debug, Error)]
pub enum UploadError {
    #[error("failed to write image {path}: {source}")]
    Write {
        path: PathBuf,
        source: std::io::Error,
    },
    #[error("failed to remove image {path}: {source}")]
    Remove {
        path: PathBuf,
        source: std::io::Error,
    },
}

/// A file received from a multipart form that passed the type filter.
#[derive(Debug, Clone)]
pub struct UploadedImage {
    pub file_name: String,
    pub content_type: String,
    pub bytes: Bytes,
}

impl UploadedImage {
    /// Keep the upload only if it is a non-empty PNG or JPEG.
    #[must_use]
    pub fn accept(file_name: Option<&str>, content_type: Option<&str>, bytes: Bytes) -> Option<Self> {
        let content_type = content_type?.trim().to_ascii_lowercase();
        if !ACCEPTED_IMAGE_TYPES.contains(&content_type.as_str()) || bytes.is_empty() {
            return None;
        }

        Some(Self {
            file_name: file_name.unwrap_or("image").to_owned(),
            content_type,
            bytes,
        })
    }
}

/// Directory-backed image storage.
#[derive(Debug, Clone)]
pub struct ImageStore {
    dir: PathBuf,
}

impl ImageStore {
    #[must_use]
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    #[must_use]
    pub fn dir(&self) -> &Path {
        &self.dir
    }

    /// Write the image and return the stored file name.
    ///
    /// # Errors
    ///
    /// Returns `UploadError::Write` if the directory or file cannot be written.
    pub async fn save(&self, image: &UploadedImage) -> Result<String, UploadError> {
        let name = stored_name(&image.file_name, Utc::now());
        let path = self.dir.join(&name);

        tokio::fs::create_dir_all(&self.dir)
            .await
            .map_err(|source| UploadError::Write {
                path: self.dir.clone(),
                source,
            })?;
        tokio::fs::write(&path, &image.bytes)
            .await
            .map_err(|source| UploadError::Write {
                path: path.clone(),
                source,
            })?;

        tracing::debug!(file = %name, bytes = image.bytes.len(), "Stored product image");
        Ok(name)
    }

    /// Delete a stored image. A file that is already gone is not an error.
    ///
    /// # Errors
    ///
    /// Returns `UploadError::Remove` for any other I/O failure.
    pub async fn remove(&self, name: &str) -> Result<(), UploadError> {
        // Stored names never contain separators; anything else is not ours
        if name.is_empty() || name.contains(['/', '\\']) || name.starts_with('.') {
            tracing::warn!(file = %name, "Refusing to remove image outside the images directory");
            return Ok(());
        }

        let path = self.dir.join(name);
        match tokio::fs::remove_file(&path).await {
            Ok(()) => Ok(()),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                tracing::warn!(file = %name, "Image already removed");
                Ok(())
            }
            Err(source) => Err(UploadError::Remove { path, source }),
        }
    }
}

/// `<UTC timestamp>-<sanitized original name>`.
///
/// The timestamp uses `-` instead of `:` so names are valid on every
/// filesystem and in URLs.
#[must_use]
pub fn stored_name(original: &str, now: DateTime<Utc>) -> String {
    format!(
        "{}-{}",
        now.format("%Y-%m-%dT%H-%M-%S%.3fZ"),
        sanitize_file_name(original)
    )
}

/// Strip any path and replace characters outside `[A-Za-z0-9._-]`.
fn sanitize_file_name(original: &str) -> String {
    let base = original
        .rsplit(['/', '\\'])
        .next()
        .unwrap_or_default()
        .trim();

    let cleaned: String = base
        .chars()
        .map(|c| {
            if c.is_ascii_alphanumeric() || matches!(c, '.' | '-' | '_') {
                c
            } else {
                '_'
            }
        })
        .collect();

    let cleaned = cleaned.trim_start_matches('.');
    if cleaned.is_empty() {
        "image".to_owned()
    } else {
        cleaned.to_owned()
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use chrono::TimeZone;

    use super::*;

    fn png(name: &str) -> UploadedImage {
        UploadedImage::accept(Some(name), Some("image/png"), Bytes::from_static(b"\x89PNG")).unwrap()
    }

    #[test]
    fn test_accept_filters_by_mime_type() {
        let bytes = Bytes::from_static(b"data");
        assert!(UploadedImage::accept(Some("a.png"), Some("image/png"), bytes.clone()).is_some());
        assert!(UploadedImage::accept(Some("a.jpg"), Some("image/jpg"), bytes.clone()).is_some());
        assert!(UploadedImage::accept(Some("a.jpg"), Some("IMAGE/JPEG"), bytes.clone()).is_some());
        assert!(UploadedImage::accept(Some("a.gif"), Some("image/gif"), bytes.clone()).is_none());
        assert!(UploadedImage::accept(Some("a.txt"), Some("text/plain"), bytes.clone()).is_none());
        assert!(UploadedImage::accept(Some("a.png"), None, bytes).is_none());
    }

    #[test]
    fn test_accept_rejects_empty_file() {
        assert!(UploadedImage::accept(Some("a.png"), Some("image/png"), Bytes::new()).is_none());
    }

    #[test]
    fn test_stored_name() {
        let now = Utc.with_ymd_and_hms(2024, 3, 9, 14, 5, 7).unwrap();
        assert_eq!(stored_name("cat.png", now), "2024-03-09T14-05-07.000Z-cat.png");
    }

    #[test]
    fn test_sanitize_file_name() {
        assert_eq!(sanitize_file_name("my photo (1).jpg"), "my_photo__1_.jpg");
        assert_eq!(sanitize_file_name("../../etc/passwd"), "passwd");
        assert_eq!(sanitize_file_name("C:\\Users\\me\\pic.png"), "pic.png");
        assert_eq!(sanitize_file_name(".hidden.png"), "hidden.png");
        assert_eq!(sanitize_file_name(""), "image");
        assert_eq!(sanitize_file_name("dir/"), "image");
    }

    #[tokio::test]
    async fn test_save_and_remove() {
        let dir = tempfile::tempdir().unwrap();
        let store = ImageStore::new(dir.path().join("images"));

        let name = store.save(&png("cat.png")).await.unwrap();
        assert!(name.ends_with("-cat.png"));
        let path = store.dir().join(&name);
        assert_eq!(tokio::fs::read(&path).await.unwrap(), b"\x89PNG");

        store.remove(&name).await.unwrap();
        assert!(!path.exists());

        // Removing twice is fine
        store.remove(&name).await.unwrap();
    }

    #[tokio::test]
    async fn test_remove_ignores_paths_outside_store() {
        let dir = tempfile::tempdir().unwrap();
        let outside = dir.path().join("keep.png");
        tokio::fs::write(&outside, b"x").await.unwrap();

        let store = ImageStore::new(dir.path().join("images"));
        store.remove("../keep.png").await.unwrap();
        assert!(outside.exists());
    }
}
