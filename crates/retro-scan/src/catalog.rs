use std::sync::Arc;

use async_trait::async_trait;
use rand::Rng;

use retro_core::error::RetroError;
use retro_core::models::item::DraftItem;
use retro_core::repository::CatalogRepository;

use crate::{ImageInput, ScanProvider};

/// Scan provider that resolves every lookup against the local catalog.
///
/// Barcodes match the first book whose ISBN contains the code. Image
/// recognition ignores the picture and picks an item uniformly at random.
pub struct CatalogScanner {
    catalog: Arc<dyn CatalogRepository>,
}

impl CatalogScanner {
    pub fn new(catalog: Arc<dyn CatalogRepository>) -> Self {
        Self { catalog }
    }
}

fn pick_index(len: usize) -> usize {
    rand::rng().random_range(0..len)
}

#[async_trait]
impl ScanProvider for CatalogScanner {
    async fn lookup_barcode(&self, code: &str) -> Result<Option<DraftItem>, RetroError> {
        let hit = self.catalog.find_item_by_isbn_fragment(code)?;
        match &hit {
            Some(item) => tracing::debug!(code, item = %item.id, "barcode matched"),
            None => tracing::debug!(code, "barcode matched nothing"),
        }
        Ok(hit.as_ref().map(DraftItem::from_item))
    }

    async fn recognize_image(&self, image: &ImageInput) -> Result<Option<DraftItem>, RetroError> {
        let items = self.catalog.list_items()?;
        if items.is_empty() {
            return Ok(None);
        }
        let item = &items[pick_index(items.len())];
        tracing::debug!(
            file = %image.file_name,
            bytes = image.bytes.len(),
            item = %item.id,
            "image recognized"
        );
        Ok(Some(DraftItem::from_item(item)))
    }
}
