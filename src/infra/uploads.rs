//! Campaign picture storage.
//!
//! Uploaded pictures land on the filesystem under a date-sharded directory
//! with a sanitized, uuid-prefixed filename. The stored path, prefixed with
//! `/uploads/`, becomes the campaign's picture reference.

use std::path::{Component, Path, PathBuf};

use bytes::Bytes;
use sha2::{Digest, Sha256};
use slug::slugify;
use thiserror::Error;
use tokio::{fs, io::AsyncWriteExt};
use uuid::Uuid;

/// Errors that can occur while interacting with the picture storage backend.
#[derive(Debug, Error)]
pub enum PictureStorageError {
    #[error("invalid stored path")]
    InvalidPath,
    #[error(transparent)]
    Io(#[from] std::io::Error),
    #[error("uploaded picture is empty")]
    EmptyPayload,
}

/// Result of storing a picture payload.
#[derive(Debug, Clone)]
pub struct StoredPicture {
    pub stored_path: String,
    pub checksum: String,
    pub size_bytes: u64,
}

impl StoredPicture {
    /// The public reference recorded on the campaign.
    pub fn public_path(&self) -> String {
        format!("/uploads/{}", self.stored_path)
    }
}

/// Filesystem-backed picture storage.
#[derive(Debug)]
pub struct PictureStorage {
    root: PathBuf,
}

impl PictureStorage {
    /// Initialise storage rooted at the provided directory, creating it if necessary.
    pub fn new(root: PathBuf) -> Result<Self, std::io::Error> {
        std::fs::create_dir_all(&root)?;
        Ok(Self { root })
    }

    /// Store the provided payload and return metadata describing the stored asset.
    pub async fn store(
        &self,
        original_name: &str,
        data: Bytes,
    ) -> Result<StoredPicture, PictureStorageError> {
        if data.is_empty() {
            return Err(PictureStorageError::EmptyPayload);
        }

        let stored_path = self.build_stored_path(original_name);
        let absolute = self.resolve(&stored_path)?;

        if let Some(parent) = absolute.parent() {
            fs::create_dir_all(parent).await?;
        }

        let mut hasher = Sha256::new();
        hasher.update(&data);
        let checksum = hex_from_bytes(&hasher.finalize());
        let size_bytes = data.len() as u64;

        let mut file = fs::File::create(&absolute).await?;
        file.write_all(&data).await?;
        file.flush().await?;

        Ok(StoredPicture {
            stored_path,
            checksum,
            size_bytes,
        })
    }

    /// Attempt to read the stored payload into memory.
    pub async fn read(&self, stored_path: &str) -> Result<Bytes, PictureStorageError> {
        let absolute = self.resolve(stored_path)?;
        let data = fs::read(absolute).await?;
        Ok(Bytes::from(data))
    }

    /// Remove the stored payload. Missing files are treated as success.
    pub async fn delete(&self, stored_path: &str) -> Result<(), PictureStorageError> {
        let absolute = self.resolve(stored_path)?;
        match fs::remove_file(&absolute).await {
            Ok(_) => Ok(()),
            Err(err) if err.kind() == std::io::ErrorKind::NotFound => Ok(()),
            Err(err) => Err(PictureStorageError::Io(err)),
        }
    }

    /// Resolve the absolute filesystem path for a stored picture.
    fn resolve(&self, stored_path: &str) -> Result<PathBuf, PictureStorageError> {
        let relative = Path::new(stored_path);
        if relative.is_absolute()
            || relative
                .components()
                .any(|component| matches!(component, Component::ParentDir | Component::Prefix(_)))
        {
            return Err(PictureStorageError::InvalidPath);
        }

        Ok(self.root.join(relative))
    }

    fn build_stored_path(&self, original_name: &str) -> String {
        let (year, month, day) = time::OffsetDateTime::now_utc().to_calendar_date();
        let directory = format!("{year}/{:02}/{:02}", month as u8, day);
        let identifier = Uuid::new_v4();
        let filename = sanitize_filename(original_name);
        format!("{directory}/{identifier}-{filename}")
    }
}

fn sanitize_filename(original: &str) -> String {
    let path = Path::new(original);
    let stem = path
        .file_stem()
        .and_then(|value| value.to_str())
        .unwrap_or("picture");
    let mut base = slugify(stem);
    if base.is_empty() {
        base = "picture".to_string();
    }

    let extension = path
        .extension()
        .and_then(|value| value.to_str())
        .map(|value| value.trim_matches('.').to_ascii_lowercase())
        .filter(|value| !value.is_empty());

    match extension {
        Some(ext) => format!("{base}.{ext}"),
        None => base,
    }
}

fn hex_from_bytes(bytes: &[u8]) -> String {
    use std::fmt::Write as FmtWrite;

    let mut output = String::with_capacity(bytes.len() * 2);
    for byte in bytes {
        let _ = FmtWrite::write_fmt(&mut output, format_args!("{byte:02x}"));
    }
    output
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn store_and_read_roundtrip() {
        let dir = tempfile::tempdir().expect("tempdir");
        let storage = PictureStorage::new(dir.path().to_path_buf()).expect("storage");

        let stored = storage
            .store("Campaign Banner.JPG", Bytes::from_static(b"payload"))
            .await
            .expect("store");

        assert!(stored.stored_path.ends_with("-campaign-banner.jpg"));
        assert!(stored.public_path().starts_with("/uploads/"));
        assert_eq!(stored.size_bytes, 7);

        let data = storage.read(&stored.stored_path).await.expect("read");
        assert_eq!(data, Bytes::from_static(b"payload"));
    }

    #[tokio::test]
    async fn empty_payload_is_rejected() {
        let dir = tempfile::tempdir().expect("tempdir");
        let storage = PictureStorage::new(dir.path().to_path_buf()).expect("storage");

        let err = storage
            .store("empty.png", Bytes::new())
            .await
            .expect_err("empty payload");
        assert!(matches!(err, PictureStorageError::EmptyPayload));
    }

    #[tokio::test]
    async fn traversal_paths_are_rejected() {
        let dir = tempfile::tempdir().expect("tempdir");
        let storage = PictureStorage::new(dir.path().to_path_buf()).expect("storage");

        let err = storage.read("../outside.jpg").await.expect_err("traversal");
        assert!(matches!(err, PictureStorageError::InvalidPath));
    }

    #[tokio::test]
    async fn delete_is_idempotent() {
        let dir = tempfile::tempdir().expect("tempdir");
        let storage = PictureStorage::new(dir.path().to_path_buf()).expect("storage");

        storage.delete("2024/01/01/missing.jpg").await.expect("noop");
    }
}
