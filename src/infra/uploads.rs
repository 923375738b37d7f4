//! Media storage for post images.

use std::path::{Component, Path, PathBuf};

use bytes::Bytes;
use imagesize::ImageType;
use sha2::{Digest, Sha256};
use slug::slugify;
use thiserror::Error;
use tokio::{fs, io::AsyncWriteExt};
use uuid::Uuid;

/// Directory below the media root that holds post images.
pub const POST_IMAGE_DIR: &str = "posts";

#[derive(Debug, Error)]
pub enum UploadStorageError {
    #[error("invalid stored path")]
    InvalidPath,
    #[error(transparent)]
    Io(#[from] std::io::Error),
    #[error("uploaded file is empty")]
    EmptyPayload,
    #[error("uploaded file is not a supported image")]
    NotAnImage,
}

/// What an image header says about the payload.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ImageInfo {
    pub width: usize,
    pub height: usize,
    /// File extension matching the detected format.
    pub extension: &'static str,
}

/// Result of storing an upload payload.
#[derive(Debug, Clone)]
pub struct StoredUpload {
    pub stored_path: String,
    pub checksum: String,
    pub size_bytes: u64,
}

/// Checks that `data` starts with the header of a browser-displayable image.
pub fn inspect_image(data: &[u8]) -> Result<ImageInfo, UploadStorageError> {
    if data.is_empty() {
        return Err(UploadStorageError::EmptyPayload);
    }
    let kind = imagesize::image_type(data).map_err(|_| UploadStorageError::NotAnImage)?;
    let extension = image_extension(kind).ok_or(UploadStorageError::NotAnImage)?;
    let size = imagesize::blob_size(data).map_err(|_| UploadStorageError::NotAnImage)?;
    if size.width == 0 || size.height == 0 {
        return Err(UploadStorageError::NotAnImage);
    }
    Ok(ImageInfo {
        width: size.width,
        height: size.height,
        extension,
    })
}

fn image_extension(kind: ImageType) -> Option<&'static str> {
    match kind {
        ImageType::Gif => Some("gif"),
        ImageType::Png => Some("png"),
        ImageType::Jpeg => Some("jpg"),
        ImageType::Webp => Some("webp"),
        ImageType::Bmp => Some("bmp"),
        ImageType::Ico => Some("ico"),
        _ => None,
    }
}

/// Filesystem-backed media storage.
#[derive(Debug)]
pub struct UploadStorage {
    root: PathBuf,
}

impl UploadStorage {
    /// Initialise storage rooted at the provided directory, creating it if necessary.
    pub fn new(root: PathBuf) -> Result<Self, std::io::Error> {
        std::fs::create_dir_all(&root)?;
        Ok(Self { root })
    }

    /// Validate and store a post image, returning its path relative to the media root.
    ///
    /// The stored extension follows the sniffed format, never the client's filename,
    /// so `/media/` always serves an image content type.
    pub async fn store_image(
        &self,
        original_name: &str,
        data: Bytes,
    ) -> Result<StoredUpload, UploadStorageError> {
        let info = inspect_image(&data)?;
        self.store(POST_IMAGE_DIR, original_name, info.extension, data)
            .await
    }

    /// Store a fully-buffered payload under `directory`.
    async fn store(
        &self,
        directory: &str,
        original_name: &str,
        extension: &str,
        data: Bytes,
    ) -> Result<StoredUpload, UploadStorageError> {
        if data.is_empty() {
            return Err(UploadStorageError::EmptyPayload);
        }

        let stored_path = build_stored_path(directory, original_name, extension);
        let absolute = self.resolve(&stored_path)?;
        if let Some(parent) = absolute.parent() {
            fs::create_dir_all(parent).await?;
        }

        let mut file = fs::File::create(&absolute).await?;
        if let Err(err) = file.write_all(&data).await {
            drop(file);
            let _ = fs::remove_file(&absolute).await;
            return Err(err.into());
        }
        file.flush().await?;

        let checksum = hex::encode(Sha256::digest(&data));
        Ok(StoredUpload {
            stored_path,
            checksum,
            size_bytes: data.len() as u64,
        })
    }

    pub async fn read(&self, stored_path: &str) -> Result<Bytes, UploadStorageError> {
        let absolute = self.resolve(stored_path)?;
        let data = fs::read(absolute).await?;
        Ok(Bytes::from(data))
    }

    /// Remove the stored payload. Missing files are treated as success.
    pub async fn delete(&self, stored_path: &str) -> Result<(), UploadStorageError> {
        let absolute = self.resolve(stored_path)?;
        match fs::remove_file(&absolute).await {
            Ok(_) => Ok(()),
            Err(err) if err.kind() == std::io::ErrorKind::NotFound => Ok(()),
            Err(err) => Err(UploadStorageError::Io(err)),
        }
    }

    fn resolve(&self, stored_path: &str) -> Result<PathBuf, UploadStorageError> {
        let relative = Path::new(stored_path);
        if stored_path.is_empty()
            || relative.is_absolute()
            || relative
                .components()
                .any(|component| !matches!(component, Component::Normal(_)))
        {
            return Err(UploadStorageError::InvalidPath);
        }

        Ok(self.root.join(relative))
    }
}

fn build_stored_path(directory: &str, original_name: &str, extension: &str) -> String {
    let identifier = Uuid::new_v4().simple();
    let stem = filename_stem(original_name);
    format!("{directory}/{identifier}-{stem}.{extension}")
}

/// Slugged stem of the client's filename; its extension is dropped.
fn filename_stem(original: &str) -> String {
    let stem = Path::new(original)
        .file_stem()
        .and_then(|value| value.to_str())
        .map(slugify)
        .unwrap_or_default();
    if stem.is_empty() {
        "upload".to_string()
    } else {
        stem
    }
}
