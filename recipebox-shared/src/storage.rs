/// Recipe image validation and storage
///
/// Uploads are decoded before anything is written, so a file that is not a
/// real image never reaches the media root. Stored images get a fresh UUID
/// name under `uploads/recipe/`; the client's filename only contributes
/// its extension.
///
/// # Example
///
/// ```no_run
/// use recipebox_shared::storage::{recipe_image_path, validate_image, ImageStore, LocalImageStore};
///
/// # async fn example(bytes: Vec<u8>) -> Result<(), Box<dyn std::error::Error>> {
/// let store = LocalImageStore::new("./media", "/media");
///
/// let format = validate_image(&bytes)?;
/// let path = recipe_image_path(Some("photo.JPG"), format);
/// store.save(&path, &bytes).await?;
///
/// println!("{}", store.url(&path));
/// # Ok(())
/// # }
/// ```

use std::path::{Path, PathBuf};

use async_trait::async_trait;
use image::ImageFormat;
use uuid::Uuid;

/// Directory, relative to the media root, holding recipe images
pub const RECIPE_IMAGE_DIR: &str = "uploads/recipe";

/// Error type for image handling
#[derive(Debug, thiserror::Error)]
pub enum StorageError {
    /// Upload could not be decoded as an image
    #[error("Upload a valid image. The file you uploaded was either not an image or a corrupted image.")]
    NotAnImage,

    /// Decoded format is not one we accept
    #[error("Unsupported image format: {0:?}")]
    UnsupportedFormat(ImageFormat),

    /// Filesystem failure
    #[error("Storage I/O error: {0}")]
    Io(#[from] std::io::Error),
}

const ACCEPTED_FORMATS: &[ImageFormat] = &[
    ImageFormat::Png,
    ImageFormat::Jpeg,
    ImageFormat::Gif,
    ImageFormat::WebP,
    ImageFormat::Bmp,
];

/// Checks that `bytes` hold a complete, decodable image
///
/// Returns the detected format. Sniffing alone is not enough: a valid
/// header followed by garbage is rejected by the full decode.
pub fn validate_image(bytes: &[u8]) -> Result<ImageFormat, StorageError> {
    let format = image::guess_format(bytes).map_err(|_| StorageError::NotAnImage)?;

    if !ACCEPTED_FORMATS.contains(&format) {
        return Err(StorageError::UnsupportedFormat(format));
    }

    image::load_from_memory_with_format(bytes, format).map_err(|_| StorageError::NotAnImage)?;

    Ok(format)
}

/// Builds `uploads/recipe/<uuid>.<ext>` for a new upload
///
/// The extension comes from the client's filename, lower-cased, when it
/// has a plain alphanumeric one; otherwise from the detected format.
pub fn recipe_image_path(original_filename: Option<&str>, format: ImageFormat) -> String {
    let ext = original_filename
        .and_then(|name| Path::new(name).extension())
        .and_then(|ext| ext.to_str())
        .filter(|ext| !ext.is_empty() && ext.chars().all(|c| c.is_ascii_alphanumeric()))
        .map(str::to_ascii_lowercase)
        .unwrap_or_else(|| default_extension(format).to_string());

    format!("{}/{}.{}", RECIPE_IMAGE_DIR, Uuid::new_v4(), ext)
}

fn default_extension(format: ImageFormat) -> &'static str {
    format.extensions_str().first().copied().unwrap_or("img")
}

/// Where recipe images live
#[async_trait]
pub trait ImageStore: Send + Sync {
    /// Writes `bytes` at `path`, relative to the store root
    async fn save(&self, path: &str, bytes: &[u8]) -> Result<(), StorageError>;

    /// Removes a stored image; a missing file is not an error
    async fn delete(&self, path: &str) -> Result<(), StorageError>;

    /// Public URL for a stored path
    fn url(&self, path: &str) -> String;
}

/// Images on the local filesystem, served under `base_url`
#[derive(Debug, Clone)]
pub struct LocalImageStore {
    root: PathBuf,
    base_url: String,
}

impl LocalImageStore {
    pub fn new(root: impl Into<PathBuf>, base_url: impl Into<String>) -> Self {
        Self {
            root: root.into(),
            base_url: base_url.into().trim_end_matches('/').to_string(),
        }
    }

    fn full_path(&self, path: &str) -> PathBuf {
        self.root.join(path)
    }
}

#[async_trait]
impl ImageStore for LocalImageStore {
    async fn save(&self, path: &str, bytes: &[u8]) -> Result<(), StorageError> {
        let full_path = self.full_path(path);
        if let Some(parent) = full_path.parent() {
            tokio::fs::create_dir_all(parent).await?;
        }

        tokio::fs::write(&full_path, bytes).await?;
        tracing::debug!(path, size = bytes.len(), "Stored image");
        Ok(())
    }

    async fn delete(&self, path: &str) -> Result<(), StorageError> {
        match tokio::fs::remove_file(self.full_path(path)).await {
            Ok(()) => Ok(()),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(()),
            Err(e) => Err(e.into()),
        }
    }

    fn url(&self, path: &str) -> String {
        format!("{}/{}", self.base_url, path)
    }
}
