pub mod catalog;

pub use catalog::CatalogScanner;

use std::path::Path;

use async_trait::async_trait;
use retro_core::error::RetroError;
use retro_core::models::item::DraftItem;

/// An uploaded picture handed to image recognition.
#[derive(Debug, Clone)]
pub struct ImageInput {
    pub file_name: String,
    pub bytes: Vec<u8>,
}

impl ImageInput {
    /// Read an image from disk.
    pub fn from_path(path: &Path) -> Result<Self, RetroError> {
        if !path.exists() {
            return Err(RetroError::PathNotFound {
                path: path.to_path_buf(),
            });
        }
        let bytes = std::fs::read(path)?;
        let file_name = path
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_default();
        Ok(Self { file_name, bytes })
    }
}

/// Trait for resolving a scanned code or picture into a catalog draft.
///
/// A provider answers `Ok(None)` when nothing matches; deciding whether that
/// is an error is left to the caller.
#[async_trait]
pub trait ScanProvider: Send + Sync {
    /// Look up an item by a barcode or ISBN fragment.
    async fn lookup_barcode(&self, code: &str) -> Result<Option<DraftItem>, RetroError>;

    /// Identify the item shown in a picture.
    async fn recognize_image(&self, image: &ImageInput) -> Result<Option<DraftItem>, RetroError>;
}
