//! Recipe image storage.
//!
//! Images arrive as `data:image/<ext>;base64,<data>` strings. [`decode_data_url`] turns one
//! into bytes, and a [`MediaStorage`] backend persists them under a storage key such as
//! `recipes/<uuid>.png`. Recipes store only the key; responses render it with
//! [`MediaStorage::url_for`].

use async_trait::async_trait;
use base64::{Engine as _, engine::general_purpose};
use std::path::PathBuf;
use thiserror::Error;
use tokio::fs;
use tokio::io::AsyncWriteExt;

const ALLOWED_EXTENSIONS: &[&str] = &["png", "jpeg", "jpg", "gif", "webp"];

#[derive(Debug, Error, PartialEq, Eq)]
pub enum ImageError {
    #[error("Image must be a data URL of the form data:image/<type>;base64,<data>.")]
    Malformed,
    #[error("Unsupported image type '{0}'. Use png, jpeg, gif or webp.")]
    UnsupportedType(String),
    #[error("Image data is not valid base64.")]
    InvalidBase64,
    #[error("Image is empty.")]
    Empty,
    #[error("Image is larger than {max} bytes.")]
    TooLarge { max: usize },
}

/// A decoded upload, ready to store.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DecodedImage {
    pub extension: String,
    pub bytes: Vec<u8>,
}

/// Parse and decode a base64 image data URL, rejecting payloads over `max_bytes`.
pub fn decode_data_url(input: &str, max_bytes: usize) -> Result<DecodedImage, ImageError> {
    let rest = input.trim().strip_prefix("data:image/").ok_or(ImageError::Malformed)?;
    let (extension, data) = rest.split_once(";base64,").ok_or(ImageError::Malformed)?;

    let extension = extension.to_ascii_lowercase();
    if !ALLOWED_EXTENSIONS.contains(&extension.as_str()) {
        return Err(ImageError::UnsupportedType(extension));
    }

    // base64 expands 3 bytes to 4 chars; reject obviously oversized input before decoding
    if data.len() / 4 * 3 > max_bytes + 3 {
        return Err(ImageError::TooLarge { max: max_bytes });
    }

    let bytes = general_purpose::STANDARD
        .decode(data.trim())
        .map_err(|_| ImageError::InvalidBase64)?;
    if bytes.is_empty() {
        return Err(ImageError::Empty);
    }
    if bytes.len() > max_bytes {
        return Err(ImageError::TooLarge { max: max_bytes });
    }

    Ok(DecodedImage { extension, bytes })
}

/// Storage backend for uploaded media.
#[async_trait]
pub trait MediaStorage: Send + Sync {
    /// Store an image under `<folder>/<uuid>.<ext>` and return that storage key
    async fn store(&self, folder: &str, image: &DecodedImage) -> anyhow::Result<String>;

    /// Delete a stored file. Missing files are not an error.
    async fn delete(&self, storage_key: &str) -> anyhow::Result<()>;

    /// Public URL for a storage key
    fn url_for(&self, storage_key: &str) -> String;
}

/// Stores media in a local directory that is served as static files.
pub struct LocalMediaStorage {
    root: PathBuf,
    base_url: String,
}

impl LocalMediaStorage {
    pub fn new(root: PathBuf, base_url: impl Into<String>) -> Self {
        Self {
            root,
            base_url: base_url.into().trim_end_matches('/').to_string(),
        }
    }

    /// Keys come from our own `store`, but stored values are still data; never leave the root.
    fn full_path(&self, storage_key: &str) -> Option<PathBuf> {
        if storage_key.split('/').any(|part| part.is_empty() || part == "." || part == "..") {
            return None;
        }
        Some(self.root.join(storage_key))
    }
}

#[async_trait]
impl MediaStorage for LocalMediaStorage {
    async fn store(&self, folder: &str, image: &DecodedImage) -> anyhow::Result<String> {
        let storage_key = format!("{folder}/{}.{}", uuid::Uuid::new_v4(), image.extension);
        let full_path = self
            .full_path(&storage_key)
            .ok_or_else(|| anyhow::anyhow!("invalid storage folder '{folder}'"))?;

        if let Some(parent) = full_path.parent() {
            fs::create_dir_all(parent).await?;
        }

        let mut file = fs::File::create(&full_path).await?;
        file.write_all(&image.bytes).await?;
        file.sync_all().await?;

        tracing::debug!(storage_key = %storage_key, size = image.bytes.len(), "Stored image");
        Ok(storage_key)
    }

    async fn delete(&self, storage_key: &str) -> anyhow::Result<()> {
        let Some(full_path) = self.full_path(storage_key) else {
            return Ok(());
        };

        match fs::remove_file(&full_path).await {
            Ok(()) => Ok(()),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(()),
            Err(e) => Err(e.into()),
        }
    }

    fn url_for(&self, storage_key: &str) -> String {
        format!("{}/{}", self.base_url, storage_key)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    // 1x1 transparent png
    const PNG_DATA_URL: &str =
        "data:image/png;base64,iVBORw0KGgoAAAANSUhEUgAAAAEAAAABCAYAAAAfFcSJAAAADUlEQVR42mNkYPhfDwAChwGA60e6kgAAAABJRU5ErkJggg==";

    #[test]
    fn test_decode_valid_png() {
        let image = decode_data_url(PNG_DATA_URL, 1024).unwrap();
        assert_eq!(image.extension, "png");
        assert_eq!(&image.bytes[1..4], b"PNG");
    }

    #[test]
    fn test_decode_rejects_bad_input() {
        assert_eq!(decode_data_url("not an image", 1024), Err(ImageError::Malformed));
        assert_eq!(
            decode_data_url("data:image/bmp;base64,AAAA", 1024),
            Err(ImageError::UnsupportedType("bmp".to_string()))
        );
        assert_eq!(decode_data_url("data:image/png;base64,@@@@", 1024), Err(ImageError::InvalidBase64));
        assert_eq!(decode_data_url("data:image/png;base64,", 1024), Err(ImageError::Empty));
        assert_eq!(decode_data_url(PNG_DATA_URL, 10), Err(ImageError::TooLarge { max: 10 }));
    }

    #[tokio::test]
    async fn test_local_store_and_delete() {
        let dir = tempfile::tempdir().unwrap();
        let storage = LocalMediaStorage::new(dir.path().to_path_buf(), "/media/");
        let image = decode_data_url(PNG_DATA_URL, 1024).unwrap();

        let key = storage.store("recipes", &image).await.unwrap();
        assert!(key.starts_with("recipes/"));
        assert!(key.ends_with(".png"));
        assert_eq!(storage.url_for(&key), format!("/media/{key}"));

        let on_disk = std::fs::read(dir.path().join(&key)).unwrap();
        assert_eq!(on_disk, image.bytes);

        storage.delete(&key).await.unwrap();
        assert!(!dir.path().join(&key).exists());
        // second delete is a no-op
        storage.delete(&key).await.unwrap();
    }

    #[tokio::test]
    async fn test_delete_ignores_keys_outside_root() {
        let dir = tempfile::tempdir().unwrap();
        let storage = LocalMediaStorage::new(dir.path().join("media"), "/media");
        assert!(storage.delete("../secret.txt").await.is_ok());
    }
}
